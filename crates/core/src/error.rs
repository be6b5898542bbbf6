// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for sl-core operations.

use thiserror::Error;

/// All possible errors that can occur in sl-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown event type: '{0}'\n  hint: recognized types are: notification:new, appointment:created, appointment:updated, appointment:deleted")]
    UnknownEventType(String),

    #[error("invalid date: '{0}'\n  hint: dates use the YYYY-MM-DD format")]
    InvalidDate(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for sl-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
