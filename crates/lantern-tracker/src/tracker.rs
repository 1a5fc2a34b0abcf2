// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The tracker facade composing the session state machine and the
//! persisted event queue for one namespace.
//!
//! Applications running several trackers keep their own
//! namespace-to-instance map; nothing here is process-global.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use lantern_tracker_core::{
	EventId, EventPayload, EventStoreEntry, SessionId, SessionState, UserId,
};

use crate::config::TrackerConfig;
use crate::event_store::EventStore;
use crate::install::check_first_run;
use crate::session::{LifecycleSignal, SessionTracker};
use crate::storage::KeyValueStorage;

/// Payload key carrying the session context entry on outgoing events.
pub const SESSION_CONTEXT_KEY: &str = "client_session";

/// Payload key carrying the pipeline-assigned event id.
pub const EVENT_ID_KEY: &str = "event_id";

/// Event name tracked on the first run of an install-autotracking
/// namespace.
pub const INSTALL_EVENT_NAME: &str = "application_install";

/// A client-side tracker instance for one namespace.
pub struct Tracker {
	namespace: String,
	session: SessionTracker,
	event_store: EventStore,
}

impl Tracker {
	/// Builds the session tracker and event queue over the injected
	/// storage handle, and tracks the install event on a first run when
	/// configured.
	pub async fn new(config: TrackerConfig, storage: Arc<dyn KeyValueStorage>) -> Self {
		let now = Utc::now();

		let session = SessionTracker::initialize(
			config.namespace.clone(),
			config.session,
			storage.clone(),
			now,
		)
		.await;
		let event_store =
			EventStore::initialize(config.namespace.clone(), config.event_store, storage.clone())
				.await;

		let tracker = Self {
			namespace: config.namespace,
			session,
			event_store,
		};

		if config.install_autotracking
			&& check_first_run(storage.as_ref(), &tracker.namespace, now).await
		{
			tracker
				.track(EventPayload::new().insert("event_name", INSTALL_EVENT_NAME))
				.await;
		}

		tracker
	}

	/// Tracks one event: stamps the session context, buffers the
	/// finalized payload, and returns the new queue depth.
	pub async fn track(&self, payload: EventPayload) -> usize {
		self.track_at(payload, EventId::new(), Utc::now()).await
	}

	/// Tracks one event with a caller-assigned id and timestamp.
	///
	/// Event pipelines that stamp their own ids and clock call this
	/// directly; [`Self::track`] is the convenience wrapper over it.
	pub async fn track_at(
		&self,
		mut payload: EventPayload,
		event_id: EventId,
		now: DateTime<Utc>,
	) -> usize {
		let context = self.session.on_event(event_id, now).await;

		match serde_json::to_value(&context) {
			Ok(value) => payload.set(SESSION_CONTEXT_KEY, value),
			Err(e) => warn!(
				namespace = %self.namespace,
				error = %e,
				"failed to encode session context, tracking event without it"
			),
		}
		payload.set(EVENT_ID_KEY, event_id.to_string());

		self.event_store.add(EventStoreEntry::new(payload, now)).await
	}

	/// Drops the `n` oldest buffered events after their successful
	/// delivery.
	pub async fn remove_delivered(&self, n: usize) {
		self.event_store.remove_head(n).await;
	}

	/// Signals that the host application entered the background.
	pub fn enter_background(&self) {
		self.session.on_lifecycle(LifecycleSignal::Background);
	}

	/// Signals that the host application entered the foreground.
	pub fn enter_foreground(&self) {
		self.session.on_lifecycle(LifecycleSignal::Foreground);
	}

	/// Returns the namespace this tracker is partitioned under.
	pub fn namespace(&self) -> &str {
		&self.namespace
	}

	/// Returns the session state machine.
	pub fn session(&self) -> &SessionTracker {
		&self.session
	}

	/// Returns the persisted event queue.
	pub fn event_store(&self) -> &EventStore {
		&self.event_store
	}

	/// Returns a copy of the latest session state.
	pub async fn session_state(&self) -> SessionState {
		self.session.session_state().await
	}

	/// Returns the current session id.
	pub async fn session_id(&self) -> SessionId {
		self.session.session_id().await
	}

	/// Returns the current session index.
	pub async fn session_index(&self) -> u32 {
		self.session.session_index().await
	}

	/// Returns the user id for this namespace.
	pub async fn user_id(&self) -> UserId {
		self.session.user_id().await
	}

	/// Returns the number of buffered events awaiting delivery.
	pub async fn pending_count(&self) -> usize {
		self.event_store.count().await
	}
}
