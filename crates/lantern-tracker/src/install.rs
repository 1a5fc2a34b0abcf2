// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! First-run detection for install tracking.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::storage::{install_key, KeyValueStorage};

/// Checks whether this is the first run ever seen for the namespace and
/// marks it as seen.
///
/// Idempotent: returns true at most once per namespace per storage. When
/// storage cannot be read the run is treated as already seen — a
/// duplicate install event is worse than a missing one — and the failure
/// is logged. Marker write failures are logged and may cause the check
/// to fire again after a restart.
pub async fn check_first_run(
	storage: &dyn KeyValueStorage,
	namespace: &str,
	now: DateTime<Utc>,
) -> bool {
	let key = install_key(namespace);

	match storage.get(&key).await {
		Ok(Some(_)) => false,
		Ok(None) => {
			if let Err(e) = storage.set(&key, &now.to_rfc3339()).await {
				warn!(
					namespace = %namespace,
					error = %e,
					"failed to write install marker"
				);
			}

			debug!(namespace = %namespace, "first run detected");
			true
		}
		Err(e) => {
			warn!(
				namespace = %namespace,
				error = %e,
				"failed to read install marker, skipping install tracking"
			);
			false
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::storage::{FailingStorage, InMemoryStorage};

	fn at(secs: i64) -> DateTime<Utc> {
		DateTime::from_timestamp(secs, 0).unwrap()
	}

	#[tokio::test]
	async fn test_first_run_fires_once() {
		let storage = InMemoryStorage::new();

		assert!(check_first_run(&storage, "app", at(0)).await);
		assert!(!check_first_run(&storage, "app", at(1)).await);
		assert!(!check_first_run(&storage, "app", at(100)).await);
	}

	#[tokio::test]
	async fn test_namespaces_have_independent_markers() {
		let storage = InMemoryStorage::new();

		assert!(check_first_run(&storage, "app1", at(0)).await);
		assert!(check_first_run(&storage, "app2", at(0)).await);
	}

	#[tokio::test]
	async fn test_unreadable_storage_skips_install() {
		assert!(!check_first_run(&FailingStorage, "app", at(0)).await);
		assert!(!check_first_run(&FailingStorage, "app", at(1)).await);
	}

	#[tokio::test]
	async fn test_marker_records_timestamp() {
		let storage = InMemoryStorage::new();
		check_first_run(&storage, "app", at(0)).await;

		let marker = storage.get(&install_key("app")).await.unwrap().unwrap();
		assert_eq!(marker, at(0).to_rfc3339());
	}
}
