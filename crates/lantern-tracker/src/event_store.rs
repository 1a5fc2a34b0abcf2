// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The persisted, bounded, ordered event queue.
//!
//! Buffered events survive process restarts until delivery removes them.
//! The queue is size-bounded with drop-oldest eviction: under sustained
//! overflow the newest events win. Every mutation rewrites the full
//! entry list to storage — the backend has no append or delta API, so a
//! single overwrite is the unit of crash consistency. This caps `add`
//! latency at O(queue length); keep `max_size` small relative to payload
//! size.
//!
//! As with session state, persistence is best-effort: an unreadable or
//! malformed record loads as an empty queue, and a failed write leaves
//! the in-memory queue authoritative for the rest of the process
//! lifetime.

use std::sync::Arc;

use tracing::{info, warn};

use lantern_tracker_core::{EventPayload, EventStoreEntry};

use crate::config::EventStoreConfig;
use crate::error::Result;
use crate::storage::{events_key, KeyValueStorage};

/// Size-bounded, ordered buffer of finalized event payloads for one
/// namespace. Insertion order is delivery priority, oldest first.
pub struct EventStore {
	namespace: String,
	max_size: usize,
	use_storage: bool,
	storage: Arc<dyn KeyValueStorage>,
	entries: tokio::sync::Mutex<Vec<EventStoreEntry>>,
}

impl EventStore {
	/// Creates the queue for a namespace, restoring any previously
	/// persisted entries.
	///
	/// When `config.use_storage` is false the queue starts empty and
	/// never touches storage. A restored list longer than `max_size` is
	/// truncated oldest-first.
	pub async fn initialize(
		namespace: impl Into<String>,
		config: EventStoreConfig,
		storage: Arc<dyn KeyValueStorage>,
	) -> Self {
		let namespace = namespace.into();

		let mut entries = if config.use_storage {
			match Self::load_persisted(storage.as_ref(), &namespace).await {
				Ok(entries) => entries,
				Err(e) => {
					warn!(
						namespace = %namespace,
						error = %e,
						"failed to load event queue, starting empty"
					);
					Vec::new()
				}
			}
		} else {
			Vec::new()
		};

		if entries.len() > config.max_size {
			let excess = entries.len() - config.max_size;
			entries.drain(..excess);
			warn!(
				namespace = %namespace,
				dropped = excess,
				"restored event queue exceeded capacity, dropped oldest"
			);
		}

		info!(
			namespace = %namespace,
			count = entries.len(),
			max_size = config.max_size,
			"initialized event store"
		);

		Self {
			namespace,
			max_size: config.max_size,
			use_storage: config.use_storage,
			storage,
			entries: tokio::sync::Mutex::new(entries),
		}
	}

	async fn load_persisted(
		storage: &dyn KeyValueStorage,
		namespace: &str,
	) -> Result<Vec<EventStoreEntry>> {
		let Some(raw) = storage.get(&events_key(namespace)).await? else {
			return Ok(Vec::new());
		};

		let entries: Vec<EventStoreEntry> = serde_json::from_str(&raw)?;
		Ok(entries)
	}

	/// Appends an entry and returns the post-mutation count.
	///
	/// Evicts from the head when the queue is full; each dropped event is
	/// logged. The full queue is synced to storage before returning.
	pub async fn add(&self, entry: EventStoreEntry) -> usize {
		let mut entries = self.entries.lock().await;

		entries.push(entry);
		while entries.len() > self.max_size {
			let dropped = entries.remove(0);
			warn!(
				namespace = %self.namespace,
				queued_at = ?dropped.queued_at,
				"dropped oldest event due to queue overflow"
			);
		}

		let count = entries.len();
		self.sync(&entries).await;

		count
	}

	/// Removes the `n` oldest entries, or all of them if fewer remain.
	///
	/// Call after successful delivery of the head of the queue. Syncs the
	/// remaining entries to storage.
	pub async fn remove_head(&self, n: usize) {
		let mut entries = self.entries.lock().await;

		let n = n.min(entries.len());
		if n > 0 {
			entries.drain(..n);
		}

		self.sync(&entries).await;
	}

	/// Returns the number of buffered entries.
	pub async fn count(&self) -> usize {
		self.entries.lock().await.len()
	}

	/// Returns the buffered entries, oldest first.
	pub async fn get_all(&self) -> Vec<EventStoreEntry> {
		self.entries.lock().await.clone()
	}

	/// Returns just the payload bodies, oldest first.
	pub async fn get_all_payloads(&self) -> Vec<EventPayload> {
		self
			.entries
			.lock()
			.await
			.iter()
			.map(|entry| entry.payload.clone())
			.collect()
	}

	/// Returns an iterator over a snapshot of the current entries.
	///
	/// Mutations made after this call are not observed; call again for a
	/// fresh snapshot.
	pub async fn iter(&self) -> std::vec::IntoIter<EventStoreEntry> {
		self.entries.lock().await.clone().into_iter()
	}

	/// Overwrites the namespace's durable record with the full entry
	/// list. No-op when persistence is disabled.
	async fn sync(&self, entries: &[EventStoreEntry]) {
		if !self.use_storage {
			return;
		}

		let json = match serde_json::to_string(entries) {
			Ok(json) => json,
			Err(e) => {
				warn!(namespace = %self.namespace, error = %e, "failed to encode event queue");
				return;
			}
		};

		if let Err(e) = self.storage.set(&events_key(&self.namespace), &json).await {
			warn!(
				namespace = %self.namespace,
				error = %e,
				"failed to persist event queue, keeping in-memory entries"
			);
		}
	}
}
