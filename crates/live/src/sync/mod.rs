// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync coordinators that keep in-memory caches in step with pushed events.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────┐     ┌───────────────────┐
//! │  EventBus   │────►│ NotificationSync │────►│ NotificationCache │
//! │             │     └──────────────────┘     └───────────────────┘
//! │             │     ┌──────────────────┐     ┌───────────────────┐
//! │             │────►│  AppointmentSync │────►│  AppointmentCache │
//! └─────────────┘     └────────┬─────────┘     └───────────────────┘
//!                              │ refetch
//!                              ▼
//!                     ┌──────────────────┐
//!                     │ AppointmentsApi  │
//!                     └──────────────────┘
//! ```
//!
//! # Strategies
//!
//! - Incremental: apply the pushed payload to the cache, recompute aggregates
//! - Authoritative refetch: treat the push as invalidation, read the scoped
//!   list from the API and replace the cache wholesale
//!
//! Each cache is written by exactly one coordinator and observed by the UI
//! through a `watch` channel.

mod api;
mod appointments;
mod notifications;

pub use api::{ApiError, ApiFuture, AppointmentsApi, HttpAppointmentsApi};
pub use appointments::{AppointmentCache, AppointmentSync, AppointmentView, Refetch};
pub use notifications::{NotificationCache, NotificationFeed, NotificationSync};

use crate::bus::{EventBus, Subscription};

/// A consumer that subscribes to bus events while its session is active.
pub trait Coordinator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Register this coordinator's handlers on `bus`.
    ///
    /// The caller owns the returned subscriptions and removes them on logout.
    fn activate(&self, bus: &EventBus) -> Vec<Subscription>;
}
