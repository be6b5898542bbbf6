// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::time::Duration;

use serde_json::json;
use sl_core::EventType;

use super::*;
use crate::bus::EventBus;
use crate::sync::{AppointmentCache, AppointmentSync, NotificationCache, NotificationSync};
use crate::test_helpers::{date, mock_manager, wait_for_state, MockApi};
use crate::transport_tests::{MockRemote, MockTransport};

struct Fixture {
    remote: MockRemote,
    bus: EventBus,
    manager: ConnectionManager<MockTransport>,
    api: MockApi,
    notifications: NotificationCache,
    binding: AuthBinding<MockTransport>,
}

fn setup() -> Fixture {
    let remote = MockRemote::new();
    let bus = EventBus::new();
    let manager = mock_manager(&remote, &bus);
    let api = MockApi::new();
    let notifications = NotificationCache::new();
    let appointments = AppointmentSync::new(AppointmentCache::new(date(2024, 1, 10)), Arc::new(api.clone()));
    let binding = AuthBinding::new(manager.clone())
        .with_coordinator(Arc::new(NotificationSync::new(notifications.clone())))
        .with_coordinator(Arc::new(appointments))
        .with_api(Arc::new(api.clone()));
    Fixture {
        remote,
        bus,
        manager,
        api,
        notifications,
        binding,
    }
}

fn total_handlers(bus: &EventBus) -> usize {
    EventType::ALL.iter().map(|t| bus.handler_count(*t)).sum()
}

#[tokio::test(start_paused = true)]
async fn login_activates_and_connects() {
    let f = setup();

    assert_eq!(f.binding.apply(&SessionState::authenticated("tok123")), Transition::Login);
    wait_for_state(&f.manager, ConnectionState::Open).await;

    assert!(f.binding.is_signed_in());
    assert_eq!(f.binding.subscription_count(), 4);
    assert_eq!(total_handlers(&f.bus), 4);
    assert_eq!(f.remote.urls(), ["ws://salon.test/ws?token=tok123"]);
    assert_eq!(f.api.tokens(), [Some("tok123".to_string())]);
}

#[tokio::test(start_paused = true)]
async fn pushed_events_reach_caches_after_login() {
    let f = setup();
    f.binding.apply(&SessionState::authenticated("tok123"));
    wait_for_state(&f.manager, ConnectionState::Open).await;

    f.remote
        .push_text(r#"{"type":"notification:new","data":{"id":"5","title":"X","isRead":false}}"#);
    crate::test_helpers::eventually(|| f.notifications.unread_count() == 1).await;
}

#[tokio::test(start_paused = true)]
async fn repeated_snapshot_is_unchanged() {
    let f = setup();
    f.binding.apply(&SessionState::authenticated("tok123"));
    wait_for_state(&f.manager, ConnectionState::Open).await;

    assert_eq!(f.binding.apply(&SessionState::authenticated("tok123")), Transition::Unchanged);
    assert_eq!(f.remote.connect_count(), 1);
    assert_eq!(f.binding.subscription_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn signed_out_snapshots_do_nothing() {
    let f = setup();

    let with_token_but_signed_out = SessionState {
        is_authenticated: false,
        token: Some("tok123".to_string()),
    };
    assert_eq!(f.binding.apply(&with_token_but_signed_out), Transition::Unchanged);
    assert_eq!(f.binding.apply(&SessionState::authenticated("")), Transition::Unchanged);
    assert_eq!(f.binding.apply(&SessionState::anonymous()), Transition::Unchanged);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(f.manager.state(), ConnectionState::Idle);
    assert_eq!(f.remote.connect_count(), 0);
    assert_eq!(total_handlers(&f.bus), 0);
}

#[tokio::test(start_paused = true)]
async fn rotated_token_is_used_on_next_reconnect() {
    let f = setup();
    f.binding.apply(&SessionState::authenticated("A"));
    wait_for_state(&f.manager, ConnectionState::Open).await;

    assert_eq!(f.binding.apply(&SessionState::authenticated("B")), Transition::TokenRotated);
    assert_eq!(f.manager.state(), ConnectionState::Open);
    assert_eq!(f.remote.connect_count(), 1);
    assert_eq!(f.api.tokens().last(), Some(&Some("B".to_string())));

    f.remote.push_close();
    wait_for_state(&f.manager, ConnectionState::Closed).await;
    tokio::time::sleep(Duration::from_millis(5001)).await;
    wait_for_state(&f.manager, ConnectionState::Open).await;
    assert_eq!(
        f.remote.urls(),
        ["ws://salon.test/ws?token=A", "ws://salon.test/ws?token=B"]
    );
}

#[tokio::test(start_paused = true)]
async fn logout_disconnects_and_unsubscribes() {
    let f = setup();
    f.binding.apply(&SessionState::authenticated("tok123"));
    wait_for_state(&f.manager, ConnectionState::Open).await;

    assert_eq!(f.binding.apply(&SessionState::anonymous()), Transition::Logout);

    assert_eq!(f.manager.state(), ConnectionState::Closed);
    assert!(!f.manager.has_credential());
    assert!(!f.binding.is_signed_in());
    assert_eq!(f.binding.subscription_count(), 0);
    assert_eq!(total_handlers(&f.bus), 0);
    assert_eq!(f.api.tokens().last(), Some(&None));

    // stale handlers no longer write to the cache
    f.bus.dispatch(EventType::NotificationNew, &json!({"id": "5", "title": "X"}));
    assert!(f.notifications.is_empty());

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(f.remote.connect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn logout_keeps_other_consumers() {
    let f = setup();
    let other = f.bus.subscribe(EventType::NotificationNew, |_| Ok(()));
    f.binding.apply(&SessionState::authenticated("tok123"));
    wait_for_state(&f.manager, ConnectionState::Open).await;

    f.binding.apply(&SessionState::anonymous());
    assert_eq!(f.bus.handler_count(EventType::NotificationNew), 1);
    assert!(other.unsubscribe());
}

#[tokio::test(start_paused = true)]
async fn logout_cancels_pending_reconnect() {
    let f = setup();
    f.binding.apply(&SessionState::authenticated("tok123"));
    wait_for_state(&f.manager, ConnectionState::Open).await;
    f.remote.push_close();
    wait_for_state(&f.manager, ConnectionState::Closed).await;
    assert!(f.manager.reconnect_pending());

    f.binding.apply(&SessionState::anonymous());
    assert!(!f.manager.reconnect_pending());
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(f.remote.connect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn second_login_starts_fresh() {
    let f = setup();
    f.binding.apply(&SessionState::authenticated("first"));
    wait_for_state(&f.manager, ConnectionState::Open).await;
    f.binding.apply(&SessionState::anonymous());

    assert_eq!(f.binding.apply(&SessionState::authenticated("second")), Transition::Login);
    wait_for_state(&f.manager, ConnectionState::Open).await;
    assert_eq!(f.binding.subscription_count(), 4);
    assert_eq!(total_handlers(&f.bus), 4);
    assert_eq!(
        f.remote.urls(),
        ["ws://salon.test/ws?token=first", "ws://salon.test/ws?token=second"]
    );
}

#[tokio::test(start_paused = true)]
async fn run_follows_session_channel() {
    let f = setup();
    let (tx, rx) = watch::channel(SessionState::anonymous());
    let binding = Arc::new(f.binding);
    let task = tokio::spawn({
        let binding = Arc::clone(&binding);
        async move { binding.run(rx).await }
    });

    tx.send(SessionState::authenticated("tok123")).unwrap();
    wait_for_state(&f.manager, ConnectionState::Open).await;
    assert!(binding.is_signed_in());

    tx.send(SessionState::anonymous()).unwrap();
    wait_for_state(&f.manager, ConnectionState::Closed).await;
    assert!(!binding.is_signed_in());

    tx.send(SessionState::authenticated("again")).unwrap();
    wait_for_state(&f.manager, ConnectionState::Open).await;

    drop(tx);
    task.await.unwrap();
    assert_eq!(f.manager.state(), ConnectionState::Closed);
    assert!(!binding.is_signed_in());
    assert_eq!(total_handlers(&f.bus), 0);
}
