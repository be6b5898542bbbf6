// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end tests of a live session against a real WebSocket server.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use futures_util::{SinkExt, StreamExt};
use salon_live::sync::ApiFuture;
use salon_live::{AppointmentsApi, ConnectionConfig, ConnectionState, LiveSession};
use serde_json::{json, Value};
use sl_core::{Appointment, AppointmentScope, SessionState};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(5);

/// One client socket as seen by the server.
struct Peer {
    uri: String,
    outbound: mpsc::UnboundedSender<Message>,
    inbound: mpsc::UnboundedReceiver<String>,
}

impl Peer {
    fn push(&self, frame: Value) {
        self.outbound
            .send(Message::Text(frame.to_string().into()))
            .unwrap();
    }
}

/// Accepts WebSocket clients on an ephemeral port and hands each one back.
async fn start_server() -> (String, mpsc::UnboundedReceiver<Peer>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("ws://{}/ws", listener.local_addr().unwrap());
    let (peers_tx, peers_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let mut uri = String::new();
            let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                uri = req.uri().to_string();
                Ok(resp)
            };
            let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
                continue;
            };
            let (mut sink, mut source) = ws.split();
            let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
            let (in_tx, in_rx) = mpsc::unbounded_channel();

            tokio::spawn(async move {
                while let Some(msg) = out_rx.recv().await {
                    if sink.send(msg).await.is_err() {
                        break;
                    }
                }
            });
            tokio::spawn(async move {
                while let Some(Ok(Message::Text(text))) = source.next().await {
                    if in_tx.send(text.as_str().to_owned()).is_err() {
                        break;
                    }
                }
            });

            let peer = Peer {
                uri,
                outbound: out_tx,
                inbound: in_rx,
            };
            if peers_tx.send(peer).is_err() {
                break;
            }
        }
    });

    (endpoint, peers_rx)
}

async fn next_peer(peers: &mut mpsc::UnboundedReceiver<Peer>) -> Peer {
    tokio::time::timeout(WAIT, peers.recv())
        .await
        .expect("no client connected")
        .expect("server stopped")
}

/// Read API that serves a fixed list and counts calls.
#[derive(Default)]
struct FixedApi {
    items: Vec<Appointment>,
    calls: Mutex<Vec<AppointmentScope>>,
}

impl AppointmentsApi for FixedApi {
    fn get_appointments(&self, scope: AppointmentScope) -> ApiFuture<'_, Vec<Appointment>> {
        self.calls.lock().unwrap().push(scope);
        let items = self.items.clone();
        Box::pin(async move { Ok(items) })
    }
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
}

fn session(endpoint: &str, api: Arc<FixedApi>) -> LiveSession {
    let config = ConnectionConfig {
        endpoint: endpoint.to_string(),
        reconnect_delay: Duration::from_millis(100),
        connect_timeout: Duration::from_secs(2),
    };
    LiveSession::new(config, api, day())
}

async fn wait_for_state(session: &LiveSession, state: ConnectionState) {
    let mut changes = session.connection().state_changes();
    tokio::time::timeout(WAIT, changes.wait_for(|s| *s == state))
        .await
        .expect("state not reached")
        .unwrap();
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not met");
}

#[tokio::test]
async fn test_session_mirrors_server_pushes() {
    let (endpoint, mut peers) = start_server().await;
    let api = Arc::new(FixedApi {
        items: vec![Appointment::new("1", day()), Appointment::new("2", day())],
        ..FixedApi::default()
    });
    let session = session(&endpoint, Arc::clone(&api));

    session.apply_session(&SessionState::authenticated("tok 123"));
    let peer = next_peer(&mut peers).await;
    assert_eq!(peer.uri, "/ws?token=tok+123");
    wait_for_state(&session, ConnectionState::Open).await;

    peer.push(json!({"type": "notification:new", "data": {"id": "5", "title": "X", "isRead": false}}));
    wait_until(|| session.notifications().unread_count() == 1).await;

    peer.push(json!({"type": "appointment:updated", "data": {"id": "9"}}));
    wait_until(|| session.appointments().appointments().len() == 2).await;
    assert_eq!(api.calls.lock().unwrap()[0].date, day());

    session.teardown();
}

#[tokio::test]
async fn test_outbound_messages_reach_server() {
    let (endpoint, mut peers) = start_server().await;
    let session = session(&endpoint, Arc::new(FixedApi::default()));

    session.apply_session(&SessionState::authenticated("tok123"));
    let mut peer = next_peer(&mut peers).await;
    wait_for_state(&session, ConnectionState::Open).await;

    session.send("typing", json!({"room": "front-desk"}));
    let frame = tokio::time::timeout(WAIT, peer.inbound.recv())
        .await
        .expect("no frame")
        .expect("socket closed");
    let frame: Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(frame, json!({"type": "typing", "data": {"room": "front-desk"}}));

    session.teardown();
}

#[tokio::test]
async fn test_server_close_triggers_reconnect() {
    let (endpoint, mut peers) = start_server().await;
    let session = session(&endpoint, Arc::new(FixedApi::default()));

    session.apply_session(&SessionState::authenticated("tok123"));
    let first = next_peer(&mut peers).await;
    wait_for_state(&session, ConnectionState::Open).await;

    first.outbound.send(Message::Close(None)).unwrap();
    let second = next_peer(&mut peers).await;
    assert_eq!(second.uri, "/ws?token=tok123");
    wait_for_state(&session, ConnectionState::Open).await;

    second.push(json!({"type": "notification:new", "data": {"id": "1", "title": "again"}}));
    wait_until(|| session.notifications().unread_count() == 1).await;

    session.teardown();
}

#[tokio::test]
async fn test_teardown_closes_socket_and_stays_closed() {
    let (endpoint, mut peers) = start_server().await;
    let session = session(&endpoint, Arc::new(FixedApi::default()));

    session.apply_session(&SessionState::authenticated("tok123"));
    let mut peer = next_peer(&mut peers).await;
    wait_for_state(&session, ConnectionState::Open).await;

    session.teardown();
    let ended = tokio::time::timeout(WAIT, peer.inbound.recv()).await.expect("socket left open");
    assert!(ended.is_none());

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(peers.try_recv().is_err());
    assert_eq!(session.state(), ConnectionState::Closed);
}
