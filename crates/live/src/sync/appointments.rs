// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Appointments cache and its authoritative-refetch coordinator.
//!
//! Appointment pushes are treated as invalidations only. Every
//! `appointment:*` event triggers a fresh read of the selected date, and the
//! result replaces the cache wholesale. Payload contents are never merged.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use sl_core::{Appointment, AppointmentScope, EventType};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::api::{ApiError, AppointmentsApi};
use super::Coordinator;
use crate::bus::{EventBus, Subscription};

/// Appointments for one date as observed by the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentView {
    date: NaiveDate,
    items: Vec<Appointment>,
    loaded: bool,
}

impl AppointmentView {
    fn new(date: NaiveDate) -> Self {
        AppointmentView {
            date,
            items: Vec::new(),
            loaded: false,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn items(&self) -> &[Appointment] {
        &self.items
    }

    /// True once a read for `date` has landed.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

/// Store of appointments for the selected date.
///
/// Cloning is cheap; clones share one store.
#[derive(Clone)]
pub struct AppointmentCache {
    view: Arc<watch::Sender<AppointmentView>>,
}

impl AppointmentCache {
    pub fn new(date: NaiveDate) -> Self {
        let (view, _) = watch::channel(AppointmentView::new(date));
        AppointmentCache {
            view: Arc::new(view),
        }
    }

    pub fn watch(&self) -> watch::Receiver<AppointmentView> {
        self.view.subscribe()
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.view.borrow().date
    }

    pub fn scope(&self) -> AppointmentScope {
        AppointmentScope::new(self.selected_date())
    }

    /// Move the selection. Entries cached for the old date are dropped.
    pub fn select_date(&self, date: NaiveDate) {
        self.view.send_if_modified(|view| {
            if view.date == date {
                return false;
            }
            *view = AppointmentView::new(date);
            true
        });
    }

    /// Replace the list for `date`.
    ///
    /// Returns false and changes nothing if `date` is no longer selected.
    pub fn set_appointments(&self, date: NaiveDate, items: Vec<Appointment>) -> bool {
        self.view.send_if_modified(|view| {
            if view.date != date {
                return false;
            }
            view.items = items;
            view.loaded = true;
            true
        })
    }

    /// Drop cached entries, keeping the selected date.
    pub fn clear(&self) {
        self.view.send_modify(|view| *view = AppointmentView::new(view.date));
    }

    pub fn appointments(&self) -> Vec<Appointment> {
        self.view.borrow().items.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.view.borrow().loaded
    }
}

/// Outcome of one refetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refetch {
    /// The cache now holds this many appointments.
    Applied(usize),
    /// The selection moved while the read was in flight.
    Discarded,
}

/// Refetches the selected date whenever an appointment event arrives.
#[derive(Clone)]
pub struct AppointmentSync {
    cache: AppointmentCache,
    api: Arc<dyn AppointmentsApi>,
    refetches: Arc<AtomicU64>,
}

impl AppointmentSync {
    pub fn new(cache: AppointmentCache, api: Arc<dyn AppointmentsApi>) -> Self {
        AppointmentSync {
            cache,
            api,
            refetches: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn cache(&self) -> &AppointmentCache {
        &self.cache
    }

    /// Number of refetches started so far.
    pub fn refetch_count(&self) -> u64 {
        self.refetches.load(Ordering::Relaxed)
    }

    /// Read the currently selected date and replace the cache with the result.
    ///
    /// On error the cache is left untouched.
    pub async fn refetch(&self) -> Result<Refetch, ApiError> {
        self.refetches.fetch_add(1, Ordering::Relaxed);
        let scope = self.cache.scope();
        let items = self.api.get_appointments(scope).await?;
        let count = items.len();
        if self.cache.set_appointments(scope.date, items) {
            debug!(date = %scope.date, count, "appointments refreshed");
            Ok(Refetch::Applied(count))
        } else {
            debug!(date = %scope.date, "selection moved, discarding refetch");
            Ok(Refetch::Discarded)
        }
    }

    /// Select `date` and load it.
    pub async fn show_date(&self, date: NaiveDate) -> Result<Refetch, ApiError> {
        self.cache.select_date(date);
        self.refetch().await
    }

    fn spawn_refetch(&self, handle: &Handle, trigger: EventType) {
        let sync = self.clone();
        handle.spawn(async move {
            if let Err(e) = sync.refetch().await {
                warn!(%trigger, error = %e, "appointment refetch failed");
            }
        });
    }
}

impl Coordinator for AppointmentSync {
    fn name(&self) -> &'static str {
        "appointments"
    }

    fn activate(&self, bus: &EventBus) -> Vec<Subscription> {
        EventType::ALL
            .into_iter()
            .filter(|t| t.is_appointment())
            .map(|event_type| {
                let sync = self.clone();
                bus.subscribe(event_type, move |_payload| {
                    let handle = Handle::try_current()?;
                    sync.spawn_refetch(&handle, event_type);
                    Ok(())
                })
            })
            .collect()
    }
}
