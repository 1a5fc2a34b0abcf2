// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the tracker and its components.

use std::time::Duration;

/// Configuration for session expiry.
#[derive(Debug, Clone)]
pub struct SessionConfig {
	/// Inactivity gap that ends a session while the app is foregrounded.
	pub foreground_timeout: Duration,
	/// Inactivity gap that ends a session while the app is backgrounded.
	pub background_timeout: Duration,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			foreground_timeout: Duration::from_secs(1800),
			background_timeout: Duration::from_secs(300),
		}
	}
}

/// Configuration for the persisted event queue.
#[derive(Debug, Clone)]
pub struct EventStoreConfig {
	/// Maximum number of buffered events before dropping oldest.
	pub max_size: usize,
	/// When false the queue is memory-only: nothing is loaded from or
	/// written to storage.
	pub use_storage: bool,
}

impl Default for EventStoreConfig {
	fn default() -> Self {
		Self {
			max_size: 1000,
			use_storage: true,
		}
	}
}

/// Configuration for one tracker instance.
///
/// The namespace partitions all persisted state; two trackers with
/// different namespaces never share identifiers, counters, or queue
/// contents.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
	pub namespace: String,
	pub session: SessionConfig,
	pub event_store: EventStoreConfig,
	/// Track an `application_install` event on the first run ever seen
	/// for this namespace.
	pub install_autotracking: bool,
}

impl TrackerConfig {
	/// Creates a configuration with defaults for the given namespace.
	pub fn new(namespace: impl Into<String>) -> Self {
		Self {
			namespace: namespace.into(),
			session: SessionConfig::default(),
			event_store: EventStoreConfig::default(),
			install_autotracking: false,
		}
	}
}
