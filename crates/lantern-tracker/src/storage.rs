// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The key-value storage collaborator backing session state and the
//! event queue.
//!
//! Storage is injected into the tracker at construction time. Hosts with
//! a platform store implement [`KeyValueStorage`] themselves; otherwise
//! [`FileStorage`] persists to the device filesystem and
//! [`InMemoryStorage`] keeps everything ephemeral.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use lantern_tracker_core::StorageMechanism;

use crate::error::Result;

/// Asynchronous string store keyed by name.
///
/// Both tracker components treat a failed read as an absent value and a
/// failed write as a lost update; implementations only need to report
/// failures, never to retry.
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
	async fn get(&self, key: &str) -> Result<Option<String>>;
	async fn set(&self, key: &str, value: &str) -> Result<()>;

	/// Tag describing how durable this backend is; stamped into the
	/// session context of every event.
	fn mechanism(&self) -> StorageMechanism {
		StorageMechanism::KeyValue
	}
}

/// Storage key holding the session state record for a namespace.
pub fn session_key(namespace: &str) -> String {
	format!("lantern_{namespace}_session")
}

/// Storage key holding the buffered event list for a namespace.
pub fn events_key(namespace: &str) -> String {
	format!("lantern_{namespace}_events")
}

/// Storage key holding the first-run marker for a namespace.
pub fn install_key(namespace: &str) -> String {
	format!("lantern_{namespace}_install")
}

/// Ephemeral in-process storage.
///
/// Nothing survives a restart; useful for tests and for hosts that
/// explicitly opt out of durability.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
	entries: Mutex<HashMap<String, String>>,
}

impl InMemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl KeyValueStorage for InMemoryStorage {
	async fn get(&self, key: &str) -> Result<Option<String>> {
		Ok(self.entries.lock().await.get(key).cloned())
	}

	async fn set(&self, key: &str, value: &str) -> Result<()> {
		self
			.entries
			.lock()
			.await
			.insert(key.to_string(), value.to_string());
		Ok(())
	}

	fn mechanism(&self) -> StorageMechanism {
		StorageMechanism::Memory
	}
}

/// File-backed storage: one JSON document per key under a directory.
///
/// Writes go through a temp file and rename so a crash mid-write leaves
/// the previous record intact.
pub struct FileStorage {
	dir: PathBuf,
}

impl FileStorage {
	/// Opens storage rooted at the given directory, creating it if
	/// needed.
	pub fn open(dir: PathBuf) -> Result<Self> {
		std::fs::create_dir_all(&dir)?;

		info!(dir = %dir.display(), "initialized file storage");

		Ok(Self { dir })
	}

	/// Keys may contain namespace text chosen by the host; everything
	/// outside a conservative character set maps to `_` to keep file
	/// names portable.
	fn key_path(&self, key: &str) -> PathBuf {
		let name: String = key
			.chars()
			.map(|c| {
				if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
					c
				} else {
					'_'
				}
			})
			.collect();
		self.dir.join(format!("{name}.json"))
	}
}

#[async_trait]
impl KeyValueStorage for FileStorage {
	async fn get(&self, key: &str) -> Result<Option<String>> {
		let path = self.key_path(key);

		if !path.exists() {
			debug!(key = key, path = %path.display(), "storage record not found");
			return Ok(None);
		}

		let contents = tokio::fs::read_to_string(&path).await?;
		Ok(Some(contents))
	}

	async fn set(&self, key: &str, value: &str) -> Result<()> {
		tokio::fs::create_dir_all(&self.dir).await?;

		let path = self.key_path(key);
		let tmp_path = path.with_extension("json.tmp");

		tokio::fs::write(&tmp_path, value).await?;
		tokio::fs::rename(&tmp_path, &path).await?;

		debug!(key = key, path = %path.display(), "wrote storage record");

		Ok(())
	}

	fn mechanism(&self) -> StorageMechanism {
		StorageMechanism::File
	}
}

/// Storage that always fails; stands in for a broken platform store.
#[cfg(test)]
pub(crate) struct FailingStorage;

#[cfg(test)]
#[async_trait]
impl KeyValueStorage for FailingStorage {
	async fn get(&self, _key: &str) -> Result<Option<String>> {
		Err(crate::error::TrackerError::Backend(
			"storage offline".to_string(),
		))
	}

	async fn set(&self, _key: &str, _value: &str) -> Result<()> {
		Err(crate::error::TrackerError::Backend(
			"storage offline".to_string(),
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[tokio::test]
	async fn test_in_memory_roundtrip() {
		let storage = InMemoryStorage::new();

		assert!(storage.get("missing").await.unwrap().is_none());

		storage.set("k", "v1").await.unwrap();
		assert_eq!(storage.get("k").await.unwrap(), Some("v1".to_string()));

		storage.set("k", "v2").await.unwrap();
		assert_eq!(storage.get("k").await.unwrap(), Some("v2".to_string()));
	}

	#[tokio::test]
	async fn test_file_storage_roundtrip() {
		let tmp = TempDir::new().unwrap();
		let storage = FileStorage::open(tmp.path().to_path_buf()).unwrap();

		assert!(storage.get("lantern_app_session").await.unwrap().is_none());

		storage.set("lantern_app_session", r#"{"a":1}"#).await.unwrap();
		assert_eq!(
			storage.get("lantern_app_session").await.unwrap(),
			Some(r#"{"a":1}"#.to_string())
		);
	}

	#[tokio::test]
	async fn test_file_storage_overwrites() {
		let tmp = TempDir::new().unwrap();
		let storage = FileStorage::open(tmp.path().to_path_buf()).unwrap();

		storage.set("k", "first").await.unwrap();
		storage.set("k", "second").await.unwrap();

		assert_eq!(storage.get("k").await.unwrap(), Some("second".to_string()));
	}

	#[tokio::test]
	async fn test_file_storage_sanitizes_keys() {
		let tmp = TempDir::new().unwrap();
		let storage = FileStorage::open(tmp.path().to_path_buf()).unwrap();

		storage.set("ns/with:odd chars", "v").await.unwrap();
		assert_eq!(
			storage.get("ns/with:odd chars").await.unwrap(),
			Some("v".to_string())
		);

		// The record landed inside the root, not in a subdirectory.
		let names: Vec<_> = std::fs::read_dir(tmp.path())
			.unwrap()
			.map(|e| e.unwrap().file_name().into_string().unwrap())
			.collect();
		assert_eq!(names, vec!["ns_with_odd_chars.json".to_string()]);
	}

	#[test]
	fn test_key_scheme_is_namespaced() {
		assert_eq!(session_key("app"), "lantern_app_session");
		assert_eq!(events_key("app"), "lantern_app_events");
		assert_eq!(install_key("app"), "lantern_app_install");
	}

	#[test]
	fn test_mechanisms() {
		assert_eq!(InMemoryStorage::new().mechanism(), StorageMechanism::Memory);
		let tmp = TempDir::new().unwrap();
		let storage = FileStorage::open(tmp.path().to_path_buf()).unwrap();
		assert_eq!(storage.mechanism(), StorageMechanism::File);
	}
}
