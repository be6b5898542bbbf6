// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot of the externally owned session store.

use serde::{Deserialize, Serialize};

/// Authentication state as seen by the live-update layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub is_authenticated: bool,
    #[serde(default)]
    pub token: Option<String>,
}

impl SessionState {
    /// A signed-in session holding `token`.
    pub fn authenticated(token: impl Into<String>) -> Self {
        SessionState {
            is_authenticated: true,
            token: Some(token.into()),
        }
    }

    /// A signed-out session.
    pub fn anonymous() -> Self {
        SessionState::default()
    }

    /// The token usable for the live connection, if any.
    pub fn credential(&self) -> Option<&str> {
        if !self.is_authenticated {
            return None;
        }
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
