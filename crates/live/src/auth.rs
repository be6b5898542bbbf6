// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Binds the live connection to the external session store.
//!
//! | Previous       | Next                   | Effect                                   |
//! |----------------|------------------------|------------------------------------------|
//! | signed out     | signed in              | activate coordinators, set token, connect |
//! | signed in      | signed in, new token   | set token (connect if never connected)    |
//! | signed in      | signed out             | disconnect, unsubscribe, forget token     |
//!
//! Anything else is a no-op.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sl_core::SessionState;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::bus::Subscription;
use crate::connection::{ConnectionManager, ConnectionState};
use crate::sync::{AppointmentsApi, Coordinator};
use crate::transport::{Transport, WebSocketTransport};

/// What [`AuthBinding::apply`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Login,
    TokenRotated,
    Logout,
    Unchanged,
}

#[derive(Default)]
struct Bound {
    token: Option<String>,
    subscriptions: Vec<Subscription>,
}

pub struct AuthBinding<T: Transport = WebSocketTransport> {
    manager: ConnectionManager<T>,
    coordinators: Vec<Arc<dyn Coordinator>>,
    api: Option<Arc<dyn AppointmentsApi>>,
    bound: Mutex<Bound>,
}

impl<T: Transport> AuthBinding<T> {
    pub fn new(manager: ConnectionManager<T>) -> Self {
        AuthBinding {
            manager,
            coordinators: Vec::new(),
            api: None,
            bound: Mutex::new(Bound::default()),
        }
    }

    /// Coordinator activated on login and deactivated on logout.
    pub fn with_coordinator(mut self, coordinator: Arc<dyn Coordinator>) -> Self {
        self.coordinators.push(coordinator);
        self
    }

    /// Read API that should follow the session token.
    pub fn with_api(mut self, api: Arc<dyn AppointmentsApi>) -> Self {
        self.api = Some(api);
        self
    }

    fn bound(&self) -> MutexGuard<'_, Bound> {
        self.bound.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_signed_in(&self) -> bool {
        self.bound().token.is_some()
    }

    /// Number of bus subscriptions owned by the current session.
    pub fn subscription_count(&self) -> usize {
        self.bound().subscriptions.len()
    }

    /// Apply a session snapshot.
    pub fn apply(&self, session: &SessionState) -> Transition {
        let mut bound = self.bound();
        let next = session.credential();

        match (bound.token.as_deref(), next) {
            (None, Some(token)) => {
                let token = token.to_string();
                for coordinator in &self.coordinators {
                    let subs = coordinator.activate(self.manager.bus());
                    debug!(coordinator = coordinator.name(), count = subs.len(), "activated");
                    bound.subscriptions.extend(subs);
                }
                self.forward_token(Some(token.clone()));
                self.manager.set_credential(token.clone());
                bound.token = Some(token);
                self.manager.connect();
                info!("signed in, connecting");
                Transition::Login
            }
            (Some(current), Some(token)) if current != token => {
                let token = token.to_string();
                self.forward_token(Some(token.clone()));
                self.manager.set_credential(token.clone());
                bound.token = Some(token);
                if self.manager.state() == ConnectionState::Idle {
                    self.manager.connect();
                }
                debug!("session token rotated");
                Transition::TokenRotated
            }
            (Some(_), None) => {
                self.logout_locked(&mut bound);
                Transition::Logout
            }
            _ => Transition::Unchanged,
        }
    }

    /// Force a logout regardless of the last applied session.
    pub fn logout(&self) {
        let mut bound = self.bound();
        self.logout_locked(&mut bound);
    }

    fn logout_locked(&self, bound: &mut Bound) {
        self.manager.disconnect();
        let count = bound.subscriptions.len();
        for sub in bound.subscriptions.drain(..) {
            sub.unsubscribe();
        }
        self.manager.clear_credential();
        self.forward_token(None);
        if bound.token.take().is_some() {
            info!(subscriptions = count, "signed out");
        }
    }

    fn forward_token(&self, token: Option<String>) {
        if let Some(api) = &self.api {
            api.set_token(token);
        }
    }

    /// Follow `sessions` until its sender is dropped, then sign out.
    pub async fn run(&self, mut sessions: watch::Receiver<SessionState>) {
        loop {
            let session = sessions.borrow_and_update().clone();
            self.apply(&session);
            if sessions.changed().await.is_err() {
                break;
            }
        }
        debug!("session source closed");
        self.logout();
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
