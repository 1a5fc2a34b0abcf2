// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Finalized event payloads and the entries buffered by the event store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A finalized tracking payload: the key-value pairs of one event as
/// produced by the event pipeline.
///
/// # Example
///
/// ```
/// use lantern_tracker_core::EventPayload;
///
/// let payload = EventPayload::new()
///     .insert("event_name", "screen_view")
///     .insert("screen", "checkout")
///     .insert("engaged", true);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventPayload {
	inner: Map<String, Value>,
}

impl EventPayload {
	/// Creates a new empty payload.
	pub fn new() -> Self {
		Self { inner: Map::new() }
	}

	/// Inserts a key-value pair into the payload.
	///
	/// The value can be any type that implements `Into<serde_json::Value>`,
	/// including strings, numbers, booleans, arrays, and nested objects.
	pub fn insert<K, V>(mut self, key: K, value: V) -> Self
	where
		K: Into<String>,
		V: Into<Value>,
	{
		self.inner.insert(key.into(), value.into());
		self
	}

	/// Inserts a key-value pair in place.
	pub fn set<K, V>(&mut self, key: K, value: V)
	where
		K: Into<String>,
		V: Into<Value>,
	{
		self.inner.insert(key.into(), value.into());
	}

	/// Merges another payload into this one.
	///
	/// If both contain the same key, the value from `other` takes
	/// precedence.
	pub fn merge(mut self, other: EventPayload) -> Self {
		for (k, v) in other.inner {
			self.inner.insert(k, v);
		}
		self
	}

	/// Returns true if the payload is empty.
	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	/// Returns the number of key-value pairs.
	pub fn len(&self) -> usize {
		self.inner.len()
	}

	/// Gets a value by key.
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.inner.get(key)
	}

	/// Converts the payload into a `serde_json::Value`.
	pub fn into_value(self) -> Value {
		Value::Object(self.inner)
	}
}

impl From<EventPayload> for Value {
	fn from(payload: EventPayload) -> Self {
		payload.into_value()
	}
}

impl From<Value> for EventPayload {
	fn from(value: Value) -> Self {
		match value {
			Value::Object(map) => Self { inner: map },
			_ => Self::new(),
		}
	}
}

impl From<Map<String, Value>> for EventPayload {
	fn from(map: Map<String, Value>) -> Self {
		Self { inner: map }
	}
}

/// One buffered element of the persisted event queue.
///
/// Insertion order is delivery priority, oldest first. This is the
/// persisted record shape; fields added after the first release are
/// defaulted so older queue records stay readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStoreEntry {
	pub payload: EventPayload,
	/// When the entry entered the queue; absent on records written by
	/// older builds.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub queued_at: Option<DateTime<Utc>>,
}

impl EventStoreEntry {
	/// Creates an entry queued at the given time.
	pub fn new(payload: EventPayload, queued_at: DateTime<Utc>) -> Self {
		Self {
			payload,
			queued_at: Some(queued_at),
		}
	}
}
