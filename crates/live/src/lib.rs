// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! salon_live - Real-time sync layer for the salon dashboard.
//!
//! Keeps the dashboard's notifications and appointments consistent with the
//! server while a user is signed in, using one authenticated push connection.
//!
//! # Main Components
//!
//! - [`ConnectionManager`] - Owns the socket, reconnects after a fixed delay
//! - [`EventBus`] - Routes pushed frames to handlers by [`EventType`](sl_core::EventType)
//! - [`sync`] - Coordinators that reconcile caches incrementally or by refetch
//! - [`AuthBinding`] - Connects on login, tears down on logout
//! - [`LiveSession`] - Wires all of the above for one session
//!
//! # Usage
//!
//! ```rust,ignore
//! use salon_live::{Config, LiveSession};
//!
//! let config = Config::discover(None)?;
//! let session = LiveSession::from_config(&config, today)?;
//! session.apply_session(&SessionState::authenticated(token));
//! // ...
//! session.teardown();
//! ```

pub mod auth;
pub mod bus;
pub mod config;
pub mod connection;
pub mod error;
pub mod session;
pub mod sync;
pub mod transport;

#[cfg(test)]
mod test_helpers;


pub use auth::{AuthBinding, Transition};
pub use bus::{EventBus, HandlerError, HandlerId, HandlerResult, Subscription};
pub use config::Config;
pub use connection::{connection_url, ConnectionConfig, ConnectionManager, ConnectionState};
pub use error::{Error, Result};
pub use session::LiveSession;
pub use sync::{
    ApiError, AppointmentCache, AppointmentSync, AppointmentsApi, Coordinator, HttpAppointmentsApi,
    NotificationCache, NotificationSync,
};
pub use transport::{Transport, TransportError, WebSocketTransport};
