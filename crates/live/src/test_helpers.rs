// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for live-update tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::Value;
use sl_core::{Appointment, AppointmentScope, EventType};
use tokio::sync::{mpsc, Semaphore};

use crate::bus::{EventBus, Subscription};
use crate::connection::{ConnectionConfig, ConnectionManager, ConnectionState};
use crate::sync::{ApiError, ApiFuture, AppointmentsApi};
use crate::transport::Transport;
use crate::transport_tests::{MockRemote, MockTransport};

pub const TEST_ENDPOINT: &str = "ws://salon.test/ws";

/// A manager wired to `remote` with the default 5 second reconnect delay.
pub fn mock_manager(remote: &MockRemote, bus: &EventBus) -> ConnectionManager<MockTransport> {
    let remote = remote.clone();
    ConnectionManager::with_transport(
        ConnectionConfig {
            endpoint: TEST_ENDPOINT.to_string(),
            ..ConnectionConfig::default()
        },
        bus.clone(),
        move || remote.transport(),
    )
}

/// Wait (at most one second of virtual time) until `manager` reaches `state`.
pub async fn wait_for_state<T: Transport>(manager: &ConnectionManager<T>, state: ConnectionState) {
    let mut changes = manager.state_changes();
    let reached = tokio::time::timeout(Duration::from_secs(1), async {
        changes.wait_for(|s| *s == state).await.is_ok()
    })
    .await;
    assert!(
        matches!(reached, Ok(true)),
        "never reached {state:?}, stuck at {:?}",
        manager.state()
    );
}

/// Poll `condition` while letting other tasks run, failing after ~200ms.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition not met in time");
}

/// Forward every payload dispatched for `event_type` into a channel.
pub fn forward(bus: &EventBus, event_type: EventType) -> (Subscription, mpsc::UnboundedReceiver<Value>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sub = bus.subscribe(event_type, move |payload| {
        tx.send(payload.clone())?;
        Ok(())
    });
    (sub, rx)
}

/// Receive the next forwarded payload, failing after one second.
pub async fn next_payload(rx: &mut mpsc::UnboundedReceiver<Value>) -> Value {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for payload")
        .expect("channel closed")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[derive(Default)]
struct ApiInner {
    by_date: HashMap<NaiveDate, Vec<Appointment>>,
    failures: usize,
    requests: Vec<AppointmentScope>,
    tokens: Vec<Option<String>>,
    gate: Option<Arc<Semaphore>>,
}

/// Scripted read API. Answers each scope with whatever `set_day` stored.
#[derive(Clone, Default)]
pub struct MockApi {
    inner: Arc<Mutex<ApiInner>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_day(&self, date: NaiveDate, items: Vec<Appointment>) {
        self.inner.lock().unwrap().by_date.insert(date, items);
    }

    /// The next `n` reads fail as if the network were down.
    pub fn fail_next(&self, n: usize) {
        self.inner.lock().unwrap().failures = n;
    }

    /// Hold every read until [`MockApi::release`] is called.
    pub fn hold(&self) {
        self.inner.lock().unwrap().gate = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let `n` held reads complete.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.inner.lock().unwrap().gate {
            gate.add_permits(n);
        }
    }

    pub fn requests(&self) -> Vec<AppointmentScope> {
        self.inner.lock().unwrap().requests.clone()
    }

    pub fn tokens(&self) -> Vec<Option<String>> {
        self.inner.lock().unwrap().tokens.clone()
    }
}

impl AppointmentsApi for MockApi {
    fn get_appointments(&self, scope: AppointmentScope) -> ApiFuture<'_, Vec<Appointment>> {
        Box::pin(async move {
            let gate = {
                let mut inner = self.inner.lock().unwrap();
                inner.requests.push(scope);
                inner.gate.clone()
            };
            if let Some(gate) = gate {
                gate.acquire().await.unwrap().forget();
            }
            let mut inner = self.inner.lock().unwrap();
            if inner.failures > 0 {
                inner.failures -= 1;
                return Err(ApiError::Connection("mock network down".to_string()));
            }
            Ok(inner.by_date.get(&scope.date).cloned().unwrap_or_default())
        })
    }

    fn set_token(&self, token: Option<String>) {
        self.inner.lock().unwrap().tokens.push(token);
    }
}
