// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the tracker core.

use thiserror::Error;

/// Errors that can occur when parsing tracker core types.
#[derive(Debug, Error)]
pub enum TrackerCoreError {
	/// Invalid storage mechanism string
	#[error("invalid storage mechanism: {0}")]
	InvalidStorageMechanism(String),
}
