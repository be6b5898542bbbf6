// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The closed set of event types pushed by the server.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Server-pushed event types recognized by the live-update layer.
///
/// The set is closed: frames carrying any other tag are dropped on receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventType {
    /// A notification was created for the current user.
    #[serde(rename = "notification:new")]
    NotificationNew,
    /// An appointment was booked.
    #[serde(rename = "appointment:created")]
    AppointmentCreated,
    /// An appointment was changed.
    #[serde(rename = "appointment:updated")]
    AppointmentUpdated,
    /// An appointment was cancelled or removed.
    #[serde(rename = "appointment:deleted")]
    AppointmentDeleted,
}

impl EventType {
    /// Number of recognized event types.
    pub const COUNT: usize = 4;

    /// Every recognized event type, in index order.
    pub const ALL: [EventType; EventType::COUNT] = [
        EventType::NotificationNew,
        EventType::AppointmentCreated,
        EventType::AppointmentUpdated,
        EventType::AppointmentDeleted,
    ];

    /// Dense index in `0..COUNT`, stable for the lifetime of the process.
    pub fn index(self) -> usize {
        match self {
            EventType::NotificationNew => 0,
            EventType::AppointmentCreated => 1,
            EventType::AppointmentUpdated => 2,
            EventType::AppointmentDeleted => 3,
        }
    }

    /// The tag used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::NotificationNew => "notification:new",
            EventType::AppointmentCreated => "appointment:created",
            EventType::AppointmentUpdated => "appointment:updated",
            EventType::AppointmentDeleted => "appointment:deleted",
        }
    }

    /// Returns true for the appointment lifecycle events.
    pub fn is_appointment(self) -> bool {
        matches!(
            self,
            EventType::AppointmentCreated
                | EventType::AppointmentUpdated
                | EventType::AppointmentDeleted
        )
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::UnknownEventType(s.to_string()))
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
