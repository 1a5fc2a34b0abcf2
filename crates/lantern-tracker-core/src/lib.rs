// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Lantern mobile tracker.
//!
//! This crate provides the shared domain types for client-side event
//! tracking: session identity and lifecycle state, the session context
//! entry attached to outgoing events, and the buffered event payloads
//! held by the persisted event store. It is used by the tracker SDK
//! (`lantern-tracker`) and carries no I/O of its own.
//!
//! # Overview
//!
//! A *session* is a bounded span of user activity identified by a
//! [`SessionId`], ended by inactivity exceeding a timeout. Sessions are
//! partitioned by *namespace*: independent tracker instances never share
//! identifiers or counters. Each tracked event receives a
//! [`SessionContext`] snapshot describing the session it belongs to.

pub mod error;
pub mod event;
pub mod session;

pub use error::TrackerCoreError;
pub use event::{EventPayload, EventStoreEntry};
pub use session::{
	EventId, SessionContext, SessionId, SessionState, StorageMechanism, UserId,
};
