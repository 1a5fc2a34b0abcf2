// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client-side mobile tracker SDK for Lantern product analytics.
//!
//! The SDK decides which visit session every tracked event belongs to
//! and guarantees that buffered events survive process restarts until a
//! delivery layer drains them. Two components do the real work, both
//! partitioned by namespace:
//!
//! - [`SessionTracker`] — the session state machine. Consumes activity
//!   and foreground/background signals, rolls sessions on inactivity
//!   timeouts, and stamps a session context onto every outgoing event.
//! - [`EventStore`] — the persisted, bounded, ordered event queue with
//!   drop-oldest eviction.
//!
//! Both persist through an injected [`KeyValueStorage`] collaborator and
//! keep tracking best-effort when persistence is broken. [`Tracker`]
//! composes the two for hosts that want a single handle; event pipelines
//! with their own sequencing drive the components directly.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use lantern_tracker::{EventPayload, InMemoryStorage, Tracker, TrackerConfig};
//!
//! # async fn demo() {
//! let storage = Arc::new(InMemoryStorage::new());
//! let tracker = Tracker::new(TrackerConfig::new("my-app"), storage).await;
//!
//! let queued = tracker
//!     .track(EventPayload::new().insert("event_name", "screen_view"))
//!     .await;
//! assert_eq!(queued, 1);
//! # }
//! ```

pub mod config;
pub mod error;
pub mod event_store;
pub mod install;
pub mod session;
pub mod storage;
pub mod tracker;

pub use config::{EventStoreConfig, SessionConfig, TrackerConfig};
pub use error::{Result, TrackerError};
pub use event_store::EventStore;
pub use install::check_first_run;
pub use session::{LifecycleSignal, SessionTracker};
pub use storage::{FileStorage, InMemoryStorage, KeyValueStorage};
pub use tracker::Tracker;

pub use lantern_tracker_core::{
	EventId, EventPayload, EventStoreEntry, SessionContext, SessionId, SessionState,
	StorageMechanism, UserId,
};
