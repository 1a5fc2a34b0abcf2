// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the tracker SDK.
//!
//! Persistence failures are recoverable by policy: the session tracker
//! and event store log them and keep their in-memory state authoritative
//! rather than blocking event tracking. These errors surface only through
//! the storage trait and the fallible internals behind it.

use thiserror::Error;

/// Tracker SDK errors.
#[derive(Debug, Error)]
pub enum TrackerError {
	/// Storage I/O failed.
	#[error("storage I/O failed: {0}")]
	Io(#[from] std::io::Error),

	/// A host-provided storage backend reported a failure.
	#[error("storage backend error: {0}")]
	Backend(String),

	/// A persisted record could not be decoded.
	#[error("malformed persisted record: {0}")]
	MalformedRecord(#[from] serde_json::Error),
}

/// Result type alias for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;
