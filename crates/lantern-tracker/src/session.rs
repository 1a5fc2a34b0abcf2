// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The session state machine.
//!
//! One [`SessionTracker`] owns the session identity, counters, and
//! timing for a single namespace. Every tracked event passes through
//! [`SessionTracker::on_event`], which decides whether the inactivity
//! gap ended the previous session, stamps the event's context, and
//! persists the updated state. Foreground/background transitions only
//! select which timeout the next check consults.
//!
//! Persistence is best-effort by design: an unreadable or malformed
//! record degrades to a fresh first-ever session, and a failed write
//! leaves the in-memory state authoritative for the rest of the process
//! lifetime. Session tracking never blocks event tracking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, warn};

use lantern_tracker_core::{EventId, SessionContext, SessionId, SessionState, UserId};

use crate::config::SessionConfig;
use crate::error::Result;
use crate::storage::{session_key, KeyValueStorage};

/// Host application lifecycle transitions relevant to session expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleSignal {
	/// The application entered the foreground.
	Foreground,
	/// The application entered the background.
	Background,
}

/// Session state machine for one tracker namespace.
pub struct SessionTracker {
	namespace: String,
	config: SessionConfig,
	storage: Arc<dyn KeyValueStorage>,
	state: tokio::sync::Mutex<SessionState>,
	background: AtomicBool,
}

impl SessionTracker {
	/// Loads any persisted state for the namespace and starts a session.
	///
	/// Constructing a tracker is itself a session boundary: when a
	/// persisted record exists, the new session continues its user id
	/// and index; otherwise this is the namespace's first session ever.
	/// Read failures and malformed records degrade to the fresh case.
	/// The resulting state is persisted before this returns.
	pub async fn initialize(
		namespace: impl Into<String>,
		config: SessionConfig,
		storage: Arc<dyn KeyValueStorage>,
		now: DateTime<Utc>,
	) -> Self {
		let namespace = namespace.into();
		let mechanism = storage.mechanism();

		let state = match Self::load_persisted(storage.as_ref(), &namespace).await {
			Ok(Some(previous)) => {
				let state = SessionState::next(&previous, mechanism, now);
				info!(
					namespace = %namespace,
					session_index = state.session_index,
					"continuing session state from storage"
				);
				state
			}
			Ok(None) => {
				let state = SessionState::first(mechanism, now);
				info!(
					namespace = %namespace,
					user_id = %state.user_id,
					"created first session state for namespace"
				);
				state
			}
			Err(e) => {
				warn!(
					namespace = %namespace,
					error = %e,
					"failed to load session state, starting fresh"
				);
				SessionState::first(mechanism, now)
			}
		};

		let tracker = Self {
			namespace,
			config,
			storage,
			state: tokio::sync::Mutex::new(state),
			background: AtomicBool::new(false),
		};

		let state = tracker.state.lock().await;
		tracker.persist(&state).await;
		drop(state);

		tracker
	}

	async fn load_persisted(
		storage: &dyn KeyValueStorage,
		namespace: &str,
	) -> Result<Option<SessionState>> {
		let Some(raw) = storage.get(&session_key(namespace)).await? else {
			return Ok(None);
		};

		let state: SessionState = serde_json::from_str(&raw)?;
		Ok(Some(state))
	}

	/// Records a lifecycle transition.
	///
	/// Only flips which timeout the next activity check consults; never
	/// touches the session index or the activity clock. Last write wins
	/// when racing with [`Self::on_event`].
	pub fn on_lifecycle(&self, signal: LifecycleSignal) {
		let background = matches!(signal, LifecycleSignal::Background);
		self.background.store(background, Ordering::SeqCst);

		debug!(namespace = %self.namespace, background, "lifecycle signal");
	}

	/// Returns true while the host application is backgrounded.
	pub fn is_background(&self) -> bool {
		self.background.load(Ordering::SeqCst)
	}

	/// Processes one tracked event and returns its session context.
	///
	/// Performs the activity check first: an inactivity gap of at least
	/// the applicable timeout rolls over to a new session before the
	/// event is counted. The updated state is persisted before the
	/// context is returned; a failed write is logged and the in-memory
	/// state stays authoritative.
	pub async fn on_event(&self, event_id: EventId, now: DateTime<Utc>) -> SessionContext {
		let timeout = if self.background.load(Ordering::SeqCst) {
			self.config.background_timeout
		} else {
			self.config.foreground_timeout
		};
		let timeout = TimeDelta::from_std(timeout).unwrap_or(TimeDelta::MAX);

		let mut state = self.state.lock().await;

		if state.should_roll(now, timeout) {
			state.roll();
			info!(
				namespace = %self.namespace,
				session_index = state.session_index,
				"inactivity timeout expired, started new session"
			);
		}

		let context = state.record_event(event_id, now);
		self.persist(&state).await;

		context
	}

	/// Returns a copy of the latest session state.
	pub async fn session_state(&self) -> SessionState {
		self.state.lock().await.clone()
	}

	/// Returns the current session id.
	pub async fn session_id(&self) -> SessionId {
		self.state.lock().await.session_id
	}

	/// Returns the current session index.
	pub async fn session_index(&self) -> u32 {
		self.state.lock().await.session_index
	}

	/// Returns the user id for this namespace.
	pub async fn user_id(&self) -> UserId {
		self.state.lock().await.user_id
	}

	/// Returns the namespace this tracker is partitioned under.
	pub fn namespace(&self) -> &str {
		&self.namespace
	}

	async fn persist(&self, state: &SessionState) {
		let json = match serde_json::to_string(state) {
			Ok(json) => json,
			Err(e) => {
				warn!(namespace = %self.namespace, error = %e, "failed to encode session state");
				return;
			}
		};

		if let Err(e) = self.storage.set(&session_key(&self.namespace), &json).await {
			warn!(
				namespace = %self.namespace,
				error = %e,
				"failed to persist session state, keeping in-memory state"
			);
		}
	}
}
