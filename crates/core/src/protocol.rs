// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket protocol frames for the live-update connection.
//!
//! The protocol is simple:
//! - Every frame is a JSON text message `{"type": "<tag>", "data": <payload>}`
//! - Server pushes one of the [`EventType`] tags
//! - Client may send any tag with any payload; the server decides what it accepts

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::event::EventType;

/// One frame on the wire, before its type tag is resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    /// Free-form type tag.
    #[serde(rename = "type")]
    pub kind: String,

    /// Opaque payload. Missing `data` decodes as `null`.
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// Creates an envelope for the given tag and payload.
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Envelope {
            kind: kind.into(),
            data,
        }
    }

    /// Resolves the tag against the recognized event types.
    pub fn event_type(&self) -> Result<EventType> {
        self.kind.parse()
    }

    /// Serializes the envelope to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserializes an envelope from JSON.
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

/// A server-pushed frame whose tag is one of the recognized event types.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    pub event_type: EventType,
    pub data: Value,
}

impl InboundEvent {
    /// Decodes one text frame.
    ///
    /// Returns [`Error::Json`](crate::Error::Json) for malformed frames and
    /// [`Error::UnknownEventType`](crate::Error::UnknownEventType) for
    /// well-formed frames with a tag outside the recognized set.
    pub fn parse(text: &str) -> Result<Self> {
        let envelope = Envelope::from_json(text)?;
        let event_type = envelope.event_type()?;
        Ok(InboundEvent {
            event_type,
            data: envelope.data,
        })
    }
}

impl From<InboundEvent> for Envelope {
    fn from(event: InboundEvent) -> Self {
        Envelope::new(event.event_type.as_str(), event.data)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
