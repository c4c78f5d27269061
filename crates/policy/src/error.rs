// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for artifact and blob handling

use thiserror::Error;

/// Result type alias for policy operations
pub type PolicyResult<T> = Result<T, PolicyError>;

/// Errors from parsing, validating, or encoding policies
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to parse policy artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("artifact function '{function}' is invalid: {reason}")]
    InvalidFunction { function: String, reason: String },

    #[error("function index {index} out of range ({count} functions in artifact)")]
    FunctionIndexOutOfRange { index: usize, count: usize },

    #[error("install blob truncated: expected {expected} bytes, got {actual}")]
    TruncatedBlob { expected: usize, actual: usize },

    #[error("install blob has {extra} trailing bytes")]
    TrailingBytes { extra: usize },

    #[error("install blob carries unknown id-mode tag {value}")]
    UnknownIdMode { value: u32 },
}
