// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Typed publish/subscribe registry for pushed events.
//!
//! Handlers are kept per [`EventType`] in a fixed-size table indexed by
//! [`EventType::index`], each slot holding registrations in subscription
//! order. Dispatch copies the slot before invoking anything, so handlers may
//! subscribe or unsubscribe freely without affecting the pass in progress.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::de::DeserializeOwned;
use serde_json::Value;
use sl_core::EventType;
use tracing::{debug, warn};

/// Error returned by a failing handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result returned by every handler.
pub type HandlerResult = Result<(), HandlerError>;

type Handler = Arc<dyn Fn(&Value) -> HandlerResult + Send + Sync>;

/// Identifies one registration on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

struct Registration {
    id: HandlerId,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    slots: [Vec<Registration>; EventType::COUNT],
}

impl Registry {
    fn remove(&mut self, event_type: EventType, id: HandlerId) -> bool {
        let slot = &mut self.slots[event_type.index()];
        match slot.iter().position(|r| r.id == id) {
            Some(pos) => {
                slot.remove(pos);
                true
            }
            None => false,
        }
    }
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    // A panicking handler never runs under the lock, so the data is intact.
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Event bus shared by the connection manager and the sync coordinators.
///
/// Cloning is cheap; clones share one registry.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `event_type`.
    ///
    /// The returned [`Subscription`] removes exactly this registration.
    pub fn subscribe<F>(&self, event_type: EventType, handler: F) -> Subscription
    where
        F: Fn(&Value) -> HandlerResult + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        registry.next_id += 1;
        let id = HandlerId(registry.next_id);
        registry.slots[event_type.index()].push(Registration {
            id,
            handler: Arc::new(handler),
        });
        debug!(event = %event_type, handler = id.0, "subscribed");

        Subscription {
            registry: Arc::downgrade(&self.registry),
            event_type,
            id,
        }
    }

    /// Registers a handler that receives the payload decoded as `P`.
    ///
    /// A payload that does not decode counts as a handler failure.
    pub fn subscribe_typed<P, F>(&self, event_type: EventType, handler: F) -> Subscription
    where
        P: DeserializeOwned,
        F: Fn(P) -> HandlerResult + Send + Sync + 'static,
    {
        self.subscribe(event_type, move |payload| {
            let decoded = P::deserialize(payload)?;
            handler(decoded)
        })
    }

    /// Removes one registration. Returns false if it was not registered.
    pub fn unsubscribe(&self, event_type: EventType, id: HandlerId) -> bool {
        let removed = lock(&self.registry).remove(event_type, id);
        if removed {
            debug!(event = %event_type, handler = id.0, "unsubscribed");
        }
        removed
    }

    /// Invokes every handler registered for `event_type`, in subscription order.
    ///
    /// A handler that fails or panics is logged and skipped; the rest still
    /// run. Returns the number of handlers invoked.
    pub fn dispatch(&self, event_type: EventType, payload: &Value) -> usize {
        let snapshot: Vec<(HandlerId, Handler)> = lock(&self.registry).slots[event_type.index()]
            .iter()
            .map(|r| (r.id, Arc::clone(&r.handler)))
            .collect();

        for (id, handler) in &snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler(payload))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(event = %event_type, handler = id.0, error = %e, "handler failed");
                }
                Err(panic) => {
                    warn!(
                        event = %event_type,
                        handler = id.0,
                        panic = panic_message(panic.as_ref()),
                        "handler panicked"
                    );
                }
            }
        }
        snapshot.len()
    }

    /// Number of handlers registered for `event_type`.
    pub fn handler_count(&self, event_type: EventType) -> usize {
        lock(&self.registry).slots[event_type.index()].len()
    }

    /// Removes every registration.
    pub fn clear(&self) {
        let mut registry = lock(&self.registry);
        for slot in registry.slots.iter_mut() {
            slot.clear();
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Capability to remove one registration from the bus.
///
/// Dropping it leaves the handler registered. It holds the registry weakly,
/// so it never keeps a dropped bus alive.
#[derive(Debug)]
#[must_use = "dropping a Subscription leaves the handler registered"]
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    event_type: EventType,
    id: HandlerId,
}

impl Subscription {
    pub fn id(&self) -> HandlerId {
        self.id
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Removes the registration. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => lock(&registry).remove(self.event_type, self.id),
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
