// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Composition root for one signed-in dashboard session.
//!
//! A [`LiveSession`] owns every piece of the live-update layer: the event bus,
//! the connection manager, both caches with their coordinators, and the auth
//! binding. Consumers receive it by reference; nothing here is global.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use sl_core::{EventType, SessionState};
use tokio::sync::watch;
use tracing::info;

use crate::auth::{AuthBinding, Transition};
use crate::bus::{EventBus, HandlerResult, Subscription};
use crate::config::Config;
use crate::connection::{ConnectionConfig, ConnectionManager, ConnectionState};
use crate::error::Result;
use crate::sync::{
    AppointmentCache, AppointmentSync, AppointmentsApi, HttpAppointmentsApi, NotificationCache,
    NotificationSync,
};
use crate::transport::{Transport, WebSocketTransport};

pub struct LiveSession<T: Transport = WebSocketTransport> {
    manager: ConnectionManager<T>,
    notifications: NotificationCache,
    appointments: AppointmentSync,
    auth: AuthBinding<T>,
}

impl LiveSession<WebSocketTransport> {
    /// Session over real WebSocket connections.
    pub fn new(config: ConnectionConfig, api: Arc<dyn AppointmentsApi>, selected_date: NaiveDate) -> Self {
        Self::with_manager(ConnectionManager::new(config, EventBus::new()), api, selected_date)
    }

    /// Session wired to the endpoint and read API named in `config`.
    pub fn from_config(config: &Config, selected_date: NaiveDate) -> Result<Self> {
        config.validate()?;
        let api = HttpAppointmentsApi::new(&config.api.base_url, config.api.timeout())?;
        Ok(Self::new(config.to_connection_config(), Arc::new(api), selected_date))
    }
}

impl<T: Transport> LiveSession<T> {
    /// Wire coordinators and auth around an existing manager.
    pub fn with_manager(
        manager: ConnectionManager<T>,
        api: Arc<dyn AppointmentsApi>,
        selected_date: NaiveDate,
    ) -> Self {
        let notifications = NotificationCache::new();
        let appointments = AppointmentSync::new(AppointmentCache::new(selected_date), Arc::clone(&api));
        let auth = AuthBinding::new(manager.clone())
            .with_coordinator(Arc::new(NotificationSync::new(notifications.clone())))
            .with_coordinator(Arc::new(appointments.clone()))
            .with_api(api);
        LiveSession {
            manager,
            notifications,
            appointments,
            auth,
        }
    }

    pub fn bus(&self) -> &EventBus {
        self.manager.bus()
    }

    pub fn connection(&self) -> &ConnectionManager<T> {
        &self.manager
    }

    pub fn state(&self) -> ConnectionState {
        self.manager.state()
    }

    pub fn notifications(&self) -> &NotificationCache {
        &self.notifications
    }

    pub fn appointments(&self) -> &AppointmentCache {
        self.appointments.cache()
    }

    /// The appointments coordinator, for manual refreshes and date changes.
    pub fn appointment_sync(&self) -> &AppointmentSync {
        &self.appointments
    }

    pub fn auth(&self) -> &AuthBinding<T> {
        &self.auth
    }

    /// Observe one event type. See [`EventBus::subscribe`].
    pub fn subscribe<F>(&self, event_type: EventType, handler: F) -> Subscription
    where
        F: Fn(&Value) -> HandlerResult + Send + Sync + 'static,
    {
        self.bus().subscribe(event_type, handler)
    }

    /// Send an outbound frame. Dropped unless the connection is open.
    pub fn send(&self, kind: &str, data: impl Serialize) {
        self.manager.send(kind, data);
    }

    pub fn apply_session(&self, session: &SessionState) -> Transition {
        self.auth.apply(session)
    }

    /// Drive the session from an external session store.
    pub async fn run(&self, sessions: watch::Receiver<SessionState>) {
        self.auth.run(sessions).await;
    }

    /// End the session: disconnect, drop every session subscription and
    /// empty both caches. Safe to call more than once.
    pub fn teardown(&self) {
        self.auth.logout();
        self.notifications.clear();
        self.appointments.cache().clear();
        info!("live session torn down");
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
