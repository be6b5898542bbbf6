// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Notification payload pushed with `notification:new`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::deserialize_id;

/// A user-facing notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Category tag, e.g. `appointment` or `system`.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// Creates an unread notification with just an id and title.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Notification {
            id: id.into(),
            title: title.into(),
            message: None,
            kind: None,
            is_read: false,
            created_at: None,
        }
    }
}

#[cfg(test)]
#[path = "notification_tests.rs"]
mod tests;
