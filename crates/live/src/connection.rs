// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connection manager for the live-update socket.
//!
//! Owns at most one live or attempting link at a time and drives it through
//! `Idle → Connecting → Open → (Closing) → Closed`. Unexpected closes and
//! transport errors schedule a single reconnect after a fixed delay;
//! [`ConnectionManager::disconnect`] cancels that timer and suppresses
//! reconnection until the next explicit [`ConnectionManager::connect`].
//!
//! Each link runs in its own task:
//!
//! ```text
//!  connect() ──spawn──► link task ──recv──► InboundEvent::parse ──► EventBus::dispatch
//!                          ▲   │
//!  send() ──outbound chan──┘   └──close/error──► link_lost() ──► reconnect timer
//! ```
//!
//! Every link carries an epoch. Signals from a link that is no longer the
//! current one are ignored.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use sl_core::{Envelope, InboundEvent};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::bus::EventBus;
use crate::error::{Error, Result};
use crate::transport::{Transport, TransportError, WebSocketTransport};

/// Delay between an unexpected close and the reconnect attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Longest a single connect attempt may take before it counts as failed.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the connection manager.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Base `ws://` or `wss://` address; the credential is appended as `token`.
    pub endpoint: String,
    /// Fixed delay before each reconnect attempt.
    pub reconnect_delay: Duration,
    /// Limit on one connect attempt, handshake included.
    pub connect_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            endpoint: "ws://localhost:3001/ws".to_string(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// Builds the socket address for `endpoint` authenticated with `token`.
///
/// Existing query parameters on the endpoint are kept.
pub fn connection_url(endpoint: &str, token: &str) -> Result<String> {
    let mut url = Url::parse(endpoint).map_err(|_| Error::InvalidEndpoint(endpoint.to_string()))?;
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(Error::InvalidEndpoint(endpoint.to_string()));
    }
    url.query_pairs_mut().append_pair("token", token);
    Ok(url.into())
}

/// State of the live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never connected in this session.
    Idle,
    /// Socket is being opened.
    Connecting,
    /// Socket is open and frames are flowing.
    Open,
    /// A failed socket is being shut down.
    Closing,
    /// No socket. A reconnect may be pending.
    Closed,
}

/// The link currently owned by the manager.
struct ActiveLink {
    epoch: u64,
    outbound: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
}

/// The armed reconnect timer.
struct PendingReconnect {
    id: u64,
    timer: JoinHandle<()>,
}

/// Mutable state, always changed under one lock together with the state value.
#[derive(Default)]
struct Control {
    credential: Option<String>,
    manually_stopped: bool,
    reconnect: Option<PendingReconnect>,
    active: Option<ActiveLink>,
    epoch: u64,
    timer_seq: u64,
}

type TransportFactory<T> = Box<dyn Fn() -> T + Send + Sync>;

struct Inner<T> {
    config: ConnectionConfig,
    bus: EventBus,
    make_transport: TransportFactory<T>,
    state: watch::Sender<ConnectionState>,
    control: Mutex<Control>,
    attempts: AtomicU64,
}

/// Reconnecting wrapper around one [`Transport`] at a time.
///
/// Cloning is cheap; clones drive the same connection. Methods that start
/// work ([`connect`](Self::connect), reconnects) spawn onto the current Tokio
/// runtime and must be called from within one.
pub struct ConnectionManager<T: Transport = WebSocketTransport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> Clone for ConnectionManager<T> {
    fn clone(&self) -> Self {
        ConnectionManager {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl ConnectionManager<WebSocketTransport> {
    /// Create a manager that connects with real WebSockets.
    pub fn new(config: ConnectionConfig, bus: EventBus) -> Self {
        Self::with_transport(config, bus, WebSocketTransport::new)
    }
}

impl<T: Transport> ConnectionManager<T> {
    /// Create a manager with a custom transport factory (for testing).
    ///
    /// The factory is called once per connection attempt.
    pub fn with_transport<F>(config: ConnectionConfig, bus: EventBus, make_transport: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let (state, _) = watch::channel(ConnectionState::Idle);
        ConnectionManager {
            inner: Arc::new(Inner {
                config,
                bus,
                make_transport: Box::new(make_transport),
                state,
                control: Mutex::new(Control::default()),
                attempts: AtomicU64::new(0),
            }),
        }
    }

    fn control(&self) -> MutexGuard<'_, Control> {
        // No code path panics while holding the lock.
        self.inner
            .control
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.inner.state.send_replace(state);
        if previous != state {
            debug!(from = ?previous, to = ?state, "connection state changed");
        }
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Observe state transitions.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Check if connected.
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// The bus inbound events are dispatched to.
    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    /// Whether a reconnect timer is armed.
    pub fn reconnect_pending(&self) -> bool {
        self.control().reconnect.is_some()
    }

    /// Number of links opened so far, including failed attempts.
    pub fn connect_attempts(&self) -> u64 {
        self.inner.attempts.load(Ordering::Acquire)
    }

    /// Whether a credential is stored for the next attempt.
    pub fn has_credential(&self) -> bool {
        self.control().credential.is_some()
    }

    /// Store the credential used by the next connection attempt.
    ///
    /// An open connection keeps the credential it was opened with.
    pub fn set_credential(&self, token: impl Into<String>) {
        let token = token.into();
        self.control().credential = (!token.is_empty()).then_some(token);
    }

    /// Forget the stored credential.
    pub fn clear_credential(&self) {
        self.control().credential = None;
    }

    /// Open a connection with the stored credential.
    ///
    /// No-op while connecting or open, and when no credential is stored.
    /// Cancels a pending reconnect timer and re-enables automatic reconnects.
    pub fn connect(&self) {
        let mut control = self.control();
        self.connect_locked(&mut control);
    }

    fn connect_locked(&self, control: &mut Control) {
        let state = self.state();
        if matches!(state, ConnectionState::Connecting | ConnectionState::Open) {
            debug!(?state, "connect ignored: link already active");
            return;
        }
        let Some(token) = control.credential.clone() else {
            debug!("connect ignored: no credential");
            return;
        };
        let url = match connection_url(&self.inner.config.endpoint, &token) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "connect ignored: bad endpoint");
                return;
            }
        };

        control.manually_stopped = false;
        if let Some(pending) = control.reconnect.take() {
            pending.timer.abort();
        }
        // Only a link that is already closing can still be here.
        if let Some(old) = control.active.take() {
            old.cancel.cancel();
        }

        control.epoch += 1;
        let epoch = control.epoch;
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        control.active = Some(ActiveLink {
            epoch,
            outbound,
            cancel: cancel.clone(),
        });
        self.inner.attempts.fetch_add(1, Ordering::AcqRel);
        self.set_state(ConnectionState::Connecting);

        let transport = (self.inner.make_transport)();
        let manager = self.clone();
        tokio::spawn(async move {
            manager
                .run_link(epoch, transport, url, outbound_rx, cancel)
                .await;
        });
    }

    /// Close the connection and stop reconnecting.
    ///
    /// Cancels any pending reconnect timer. Idempotent.
    pub fn disconnect(&self) {
        let mut control = self.control();
        control.manually_stopped = true;
        if let Some(pending) = control.reconnect.take() {
            pending.timer.abort();
            debug!("pending reconnect cancelled");
        }
        if let Some(link) = control.active.take() {
            link.cancel.cancel();
            info!("live connection closed by client");
        }
        self.set_state(ConnectionState::Closed);
    }

    /// Send a `{type, data}` frame if the connection is open.
    ///
    /// Otherwise the message is dropped silently; nothing is queued.
    pub fn send(&self, kind: &str, data: impl Serialize) {
        if !self.is_open() {
            debug!(kind, "outbound message dropped: not open");
            return;
        }
        let frame = serde_json::to_value(data)
            .map_err(sl_core::Error::from)
            .and_then(|data| Envelope::new(kind, data).to_json());
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                warn!(kind, error = %e, "outbound message dropped: not serializable");
                return;
            }
        };

        let control = self.control();
        if let Some(link) = control.active.as_ref() {
            // Receiver only goes away when the link is ending
            let _ = link.outbound.send(frame);
        }
    }

    async fn run_link(
        self,
        epoch: u64,
        mut transport: T,
        url: String,
        mut outbound: mpsc::UnboundedReceiver<String>,
        cancel: CancellationToken,
    ) {
        let timeout = self.inner.config.connect_timeout;
        let opened = tokio::select! {
            _ = cancel.cancelled() => return,
            result = tokio::time::timeout(timeout, transport.connect(&url)) => match result {
                Ok(result) => result,
                Err(_) => Err(TransportError::ConnectionFailed(format!(
                    "no handshake after {}ms",
                    timeout.as_millis()
                ))),
            },
        };
        if let Err(e) = opened {
            warn!(error = %e, "live connection failed");
            self.link_lost(epoch);
            return;
        }
        if !self.link_opened(epoch) {
            let _ = transport.close().await;
            return;
        }

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    let _ = transport.close().await;
                    return;
                }
                Some(frame) = outbound.recv() => {
                    if let Err(e) = transport.send(frame).await {
                        warn!(error = %e, "live connection write failed");
                        self.begin_closing(epoch);
                        Self::close_unless_cancelled(&mut transport, &cancel).await;
                        break;
                    }
                }
                incoming = transport.recv() => match incoming {
                    Ok(Some(text)) => self.deliver(&text),
                    Ok(None) => {
                        info!("live connection closed by server");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "live connection read failed");
                        self.begin_closing(epoch);
                        Self::close_unless_cancelled(&mut transport, &cancel).await;
                        break;
                    }
                },
            }
        }
        self.link_lost(epoch);
    }

    /// Shut a failed transport down, giving up if the link is superseded.
    async fn close_unless_cancelled(transport: &mut T, cancel: &CancellationToken) {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = transport.close() => {}
        }
    }

    /// Decode one frame and hand it to the bus.
    fn deliver(&self, text: &str) {
        match InboundEvent::parse(text) {
            Ok(event) => {
                let handlers = self.inner.bus.dispatch(event.event_type, &event.data);
                debug!(event = %event.event_type, handlers, "event dispatched");
            }
            Err(sl_core::Error::UnknownEventType(kind)) => {
                debug!(kind = %kind, "ignoring unrecognized event");
            }
            Err(e) => {
                warn!(error = %e, "dropping malformed frame");
            }
        }
    }

    fn is_current(control: &Control, epoch: u64) -> bool {
        control.active.as_ref().is_some_and(|l| l.epoch == epoch)
    }

    fn link_opened(&self, epoch: u64) -> bool {
        let control = self.control();
        if !Self::is_current(&control, epoch) {
            return false;
        }
        self.set_state(ConnectionState::Open);
        info!("live connection open");
        true
    }

    fn begin_closing(&self, epoch: u64) {
        let control = self.control();
        if Self::is_current(&control, epoch) {
            self.set_state(ConnectionState::Closing);
        }
    }

    /// The current link ended without a `disconnect()`.
    fn link_lost(&self, epoch: u64) {
        let mut control = self.control();
        if !Self::is_current(&control, epoch) {
            return;
        }
        control.active = None;
        self.set_state(ConnectionState::Closed);
        if !control.manually_stopped {
            self.schedule_reconnect(&mut control);
        }
    }

    fn schedule_reconnect(&self, control: &mut Control) {
        if control.reconnect.is_some() {
            debug!("reconnect already pending");
            return;
        }
        let delay = self.inner.config.reconnect_delay;
        info!(delay_ms = delay.as_millis() as u64, "scheduling reconnect");

        control.timer_seq += 1;
        let id = control.timer_seq;
        let manager = self.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            manager.reconnect_due(id);
        });
        control.reconnect = Some(PendingReconnect { id, timer });
    }

    fn reconnect_due(&self, id: u64) {
        let mut control = self.control();
        // A timer that was cancelled after waking must not act, nor clear a newer one.
        if control.reconnect.as_ref().map(|p| p.id) != Some(id) {
            return;
        }
        control.reconnect = None;
        if control.manually_stopped {
            return;
        }
        debug!("reconnecting");
        self.connect_locked(&mut control);
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
