// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session identity and lifecycle state.
//!
//! A session is a bounded span of user activity. The tracker holds one
//! [`SessionState`] per namespace, persists it after every mutation, and
//! derives a [`SessionContext`] snapshot for each outgoing event. State
//! transitions here are pure; storage and clock wiring live in the SDK
//! crate.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TrackerCoreError;

/// Stable opaque identifier for the device user within one namespace.
///
/// Generated once when a namespace first tracks and never regenerated
/// while the namespace exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
	#[must_use]
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for UserId {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Display for UserId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for UserId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// Unique identifier for a single session.
///
/// Regenerated on every new session; time-ordered so that session ids
/// sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
	#[must_use]
	pub fn new() -> Self {
		Self(Uuid::now_v7())
	}
}

impl Default for SessionId {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Display for SessionId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for SessionId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// Unique identifier assigned to a tracked event by the event pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
	#[must_use]
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for EventId {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Display for EventId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for EventId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// Descriptive tag of the persistence backend holding session state.
///
/// Constant for a given storage implementation; reported in the session
/// context so downstream consumers can tell how durable the counters are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageMechanism {
	/// JSON files on the device filesystem
	File,
	/// Process memory only, lost on restart
	Memory,
	/// Host-provided key-value store
	KeyValue,
}

impl std::fmt::Display for StorageMechanism {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			StorageMechanism::File => write!(f, "FILE"),
			StorageMechanism::Memory => write!(f, "MEMORY"),
			StorageMechanism::KeyValue => write!(f, "KEY_VALUE"),
		}
	}
}

impl std::str::FromStr for StorageMechanism {
	type Err = TrackerCoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"FILE" => Ok(StorageMechanism::File),
			"MEMORY" => Ok(StorageMechanism::Memory),
			"KEY_VALUE" => Ok(StorageMechanism::KeyValue),
			_ => Err(TrackerCoreError::InvalidStorageMechanism(s.to_string())),
		}
	}
}

/// Full session state for one tracker namespace.
///
/// This is the persisted record shape. Fields added after the first
/// release are optional or defaulted so older records stay readable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
	pub user_id: UserId,
	pub session_id: SessionId,
	/// Session id of the immediately preceding session, absent for the
	/// first session ever observed for the namespace.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub previous_session_id: Option<SessionId>,
	/// Strictly increasing, starts at 1 for the first session.
	pub session_index: u32,
	/// Events seen in the current session; 0 until the first event.
	#[serde(default)]
	pub event_index: u32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub first_event_id: Option<EventId>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub first_event_timestamp: Option<DateTime<Utc>>,
	pub storage_mechanism: StorageMechanism,
	/// Timestamp of the last processed activity; drives the inactivity
	/// timeout comparison.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub last_activity_at: Option<DateTime<Utc>>,
}

impl SessionState {
	/// Creates the first-ever session for a namespace.
	#[must_use]
	pub fn first(storage_mechanism: StorageMechanism, now: DateTime<Utc>) -> Self {
		Self {
			user_id: UserId::new(),
			session_id: SessionId::new(),
			previous_session_id: None,
			session_index: 1,
			event_index: 0,
			first_event_id: None,
			first_event_timestamp: None,
			storage_mechanism,
			last_activity_at: Some(now),
		}
	}

	/// Creates a new session continuing from a previously persisted one.
	///
	/// The user id carries over; the session index keeps increasing across
	/// process restarts.
	#[must_use]
	pub fn next(
		previous: &SessionState,
		storage_mechanism: StorageMechanism,
		now: DateTime<Utc>,
	) -> Self {
		Self {
			user_id: previous.user_id,
			session_id: SessionId::new(),
			previous_session_id: Some(previous.session_id),
			session_index: previous.session_index.saturating_add(1),
			event_index: 0,
			first_event_id: None,
			first_event_timestamp: None,
			storage_mechanism,
			last_activity_at: Some(now),
		}
	}

	/// Returns true when the inactivity gap requires a new session.
	///
	/// A gap equal to the timeout already rolls the session; the
	/// comparison is on wall-clock time, never event counts. A missing
	/// activity timestamp always rolls.
	#[must_use]
	pub fn should_roll(&self, now: DateTime<Utc>, timeout: TimeDelta) -> bool {
		match self.last_activity_at {
			Some(last) => now.signed_duration_since(last) >= timeout,
			None => true,
		}
	}

	/// Rolls over to a new session in place.
	///
	/// The event index resets together with the session index increment;
	/// the first-event fields stay unset until the next recorded event.
	pub fn roll(&mut self) {
		self.previous_session_id = Some(self.session_id);
		self.session_id = SessionId::new();
		self.session_index = self.session_index.saturating_add(1);
		self.event_index = 0;
		self.first_event_id = None;
		self.first_event_timestamp = None;
	}

	/// Records one tracked event and returns the context snapshot to
	/// attach to it.
	///
	/// The first event of a session fixes `first_event_id` and
	/// `first_event_timestamp` until the next rollover.
	pub fn record_event(&mut self, event_id: EventId, now: DateTime<Utc>) -> SessionContext {
		self.event_index = self.event_index.saturating_add(1);
		if self.first_event_id.is_none() {
			self.first_event_id = Some(event_id);
			self.first_event_timestamp = Some(now);
		}
		self.last_activity_at = Some(now);

		SessionContext {
			user_id: self.user_id,
			session_id: self.session_id,
			previous_session_id: self.previous_session_id,
			session_index: self.session_index,
			event_index: self.event_index,
			storage_mechanism: self.storage_mechanism,
			first_event_id: self.first_event_id.unwrap_or(event_id),
			first_event_timestamp: self.first_event_timestamp.unwrap_or(now),
		}
	}
}

/// Immutable session snapshot attached as a context entry to each
/// outgoing event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
	pub user_id: UserId,
	pub session_id: SessionId,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub previous_session_id: Option<SessionId>,
	pub session_index: u32,
	pub event_index: u32,
	pub storage_mechanism: StorageMechanism,
	pub first_event_id: EventId,
	pub first_event_timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn at(secs: i64) -> DateTime<Utc> {
		DateTime::from_timestamp(secs, 0).unwrap()
	}

	#[test]
	fn test_first_session_starts_at_index_one() {
		let state = SessionState::first(StorageMechanism::Memory, at(0));
		assert_eq!(state.session_index, 1);
		assert_eq!(state.event_index, 0);
		assert!(state.previous_session_id.is_none());
		assert!(state.first_event_id.is_none());
		assert_eq!(state.last_activity_at, Some(at(0)));
	}

	#[test]
	fn test_next_session_continues_counters() {
		let first = SessionState::first(StorageMechanism::File, at(0));
		let next = SessionState::next(&first, StorageMechanism::File, at(100));

		assert_eq!(next.user_id, first.user_id);
		assert_ne!(next.session_id, first.session_id);
		assert_eq!(next.previous_session_id, Some(first.session_id));
		assert_eq!(next.session_index, 2);
		assert_eq!(next.event_index, 0);
	}

	#[test]
	fn test_should_roll_at_exact_timeout() {
		let state = SessionState::first(StorageMechanism::Memory, at(0));
		let timeout = TimeDelta::seconds(5);

		assert!(!state.should_roll(at(4), timeout));
		assert!(state.should_roll(at(5), timeout));
		assert!(state.should_roll(at(10), timeout));
	}

	#[test]
	fn test_should_roll_without_activity_timestamp() {
		let mut state = SessionState::first(StorageMechanism::Memory, at(0));
		state.last_activity_at = None;

		assert!(state.should_roll(at(0), TimeDelta::seconds(5)));
	}

	#[test]
	fn test_roll_resets_event_index_with_session_increment() {
		let mut state = SessionState::first(StorageMechanism::Memory, at(0));
		state.record_event(EventId::new(), at(1));
		state.record_event(EventId::new(), at(2));
		assert_eq!(state.event_index, 2);

		let old_session = state.session_id;
		state.roll();

		assert_eq!(state.session_index, 2);
		assert_eq!(state.event_index, 0);
		assert_eq!(state.previous_session_id, Some(old_session));
		assert!(state.first_event_id.is_none());
		assert!(state.first_event_timestamp.is_none());
	}

	#[test]
	fn test_record_event_fixes_first_event_fields() {
		let mut state = SessionState::first(StorageMechanism::Memory, at(0));
		let first_id = EventId::new();

		let ctx1 = state.record_event(first_id, at(1));
		assert_eq!(ctx1.event_index, 1);
		assert_eq!(ctx1.first_event_id, first_id);
		assert_eq!(ctx1.first_event_timestamp, at(1));

		let ctx2 = state.record_event(EventId::new(), at(2));
		assert_eq!(ctx2.event_index, 2);
		assert_eq!(ctx2.first_event_id, first_id);
		assert_eq!(ctx2.first_event_timestamp, at(1));
		assert_eq!(state.last_activity_at, Some(at(2)));
	}

	#[test]
	fn test_session_state_serde_roundtrip() {
		let mut state = SessionState::first(StorageMechanism::File, at(0));
		state.record_event(EventId::new(), at(3));

		let json = serde_json::to_string(&state).unwrap();
		let parsed: SessionState = serde_json::from_str(&json).unwrap();

		assert_eq!(parsed.user_id, state.user_id);
		assert_eq!(parsed.session_id, state.session_id);
		assert_eq!(parsed.session_index, state.session_index);
		assert_eq!(parsed.event_index, state.event_index);
		assert_eq!(parsed.first_event_id, state.first_event_id);
		assert_eq!(parsed.last_activity_at, state.last_activity_at);
	}

	#[test]
	fn test_session_state_reads_older_record_shape() {
		// A record written before the event counters existed.
		let json = format!(
			r#"{{"userId":"{}","sessionId":"{}","sessionIndex":7,"storageMechanism":"FILE"}}"#,
			Uuid::new_v4(),
			Uuid::now_v7(),
		);

		let parsed: SessionState = serde_json::from_str(&json).unwrap();
		assert_eq!(parsed.session_index, 7);
		assert_eq!(parsed.event_index, 0);
		assert!(parsed.previous_session_id.is_none());
		assert!(parsed.first_event_id.is_none());
		assert!(parsed.last_activity_at.is_none());
	}

	#[test]
	fn test_session_context_serializes_camel_case() {
		let mut state = SessionState::first(StorageMechanism::KeyValue, at(0));
		let ctx = state.record_event(EventId::new(), at(0));

		let value = serde_json::to_value(&ctx).unwrap();
		assert!(value.get("userId").is_some());
		assert!(value.get("sessionId").is_some());
		assert_eq!(value["sessionIndex"], 1);
		assert_eq!(value["eventIndex"], 1);
		assert_eq!(value["storageMechanism"], "KEY_VALUE");
		assert!(value.get("firstEventId").is_some());
		assert!(value.get("firstEventTimestamp").is_some());
		// Absent on the first session ever.
		assert!(value.get("previousSessionId").is_none());
	}

	#[test]
	fn test_storage_mechanism_display() {
		assert_eq!(StorageMechanism::File.to_string(), "FILE");
		assert_eq!(StorageMechanism::Memory.to_string(), "MEMORY");
		assert_eq!(StorageMechanism::KeyValue.to_string(), "KEY_VALUE");
	}

	#[test]
	fn test_storage_mechanism_parse_invalid() {
		let err = "COOKIE".parse::<StorageMechanism>();
		assert!(matches!(
			err,
			Err(TrackerCoreError::InvalidStorageMechanism(_))
		));
	}

	proptest! {
		#[test]
		fn session_id_roundtrip(uuid_bytes in any::<[u8; 16]>()) {
			let uuid = Uuid::from_bytes(uuid_bytes);
			let id = SessionId(uuid);
			let s = id.to_string();
			let parsed: SessionId = s.parse().unwrap();
			prop_assert_eq!(id, parsed);
		}

		#[test]
		fn user_id_roundtrip(uuid_bytes in any::<[u8; 16]>()) {
			let uuid = Uuid::from_bytes(uuid_bytes);
			let id = UserId(uuid);
			let s = id.to_string();
			let parsed: UserId = s.parse().unwrap();
			prop_assert_eq!(id, parsed);
		}

		#[test]
		fn storage_mechanism_roundtrip(mechanism in prop_oneof![
			Just(StorageMechanism::File),
			Just(StorageMechanism::Memory),
			Just(StorageMechanism::KeyValue),
		]) {
			let s = mechanism.to_string();
			let parsed: StorageMechanism = s.parse().unwrap();
			prop_assert_eq!(mechanism, parsed);
		}

		#[test]
		fn event_index_steps_by_one_within_session(gaps in proptest::collection::vec(0i64..4, 1..20)) {
			// Gaps below the timeout never roll the session.
			let timeout = TimeDelta::seconds(5);
			let mut state = SessionState::first(StorageMechanism::Memory, at(0));
			let mut clock = 0i64;

			for (i, gap) in gaps.iter().enumerate() {
				clock += gap;
				let now = at(clock);
				prop_assert!(!state.should_roll(now, timeout));
				let ctx = state.record_event(EventId::new(), now);
				prop_assert_eq!(ctx.session_index, 1);
				prop_assert_eq!(ctx.event_index, (i + 1) as u32);
			}
		}

		#[test]
		fn rollover_happens_exactly_once_per_large_gap(gap in 5i64..1000) {
			let timeout = TimeDelta::seconds(5);
			let mut state = SessionState::first(StorageMechanism::Memory, at(0));
			state.record_event(EventId::new(), at(0));
			let first_session = state.session_id;

			let now = at(gap);
			prop_assert!(state.should_roll(now, timeout));
			state.roll();
			let ctx = state.record_event(EventId::new(), now);

			prop_assert_eq!(ctx.session_index, 2);
			prop_assert_eq!(ctx.event_index, 1);
			prop_assert_eq!(ctx.previous_session_id, Some(first_session));
			// The next event right after does not roll again.
			prop_assert!(!state.should_roll(now, timeout));
		}
	}
}
