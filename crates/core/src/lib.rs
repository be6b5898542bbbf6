// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! sl-core: Shared types for the salon live-update layer
//!
//! This crate provides the wire protocol, the closed set of pushed event
//! types, and the payload models reconciled by the `salon-live` client.
//! It performs no I/O.

pub mod appointment;
pub mod error;
pub mod event;
mod id;
pub mod notification;
pub mod protocol;
pub mod session;

pub use appointment::{Appointment, AppointmentScope};
pub use error::{Error, Result};
pub use event::EventType;
pub use notification::Notification;
pub use protocol::{Envelope, InboundEvent};
pub use session::SessionState;
