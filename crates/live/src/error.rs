// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::sync::ApiError;

/// All possible errors that can occur in the salon-live library.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid endpoint '{0}'\n  hint: the realtime endpoint must be a ws:// or wss:// URL")]
    InvalidEndpoint(String),

    #[error("invalid api url '{0}'\n  hint: the api base url must be an http:// or https:// URL")]
    InvalidApiUrl(String),

    #[error(transparent)]
    Core(#[from] sl_core::Error),

    #[error("api error: {0}")]
    Api(#[from] ApiError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for salon-live operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
