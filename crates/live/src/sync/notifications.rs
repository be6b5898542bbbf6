// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Notifications cache and its incremental coordinator.

use std::sync::Arc;

use sl_core::{EventType, Notification};
use tokio::sync::watch;
use tracing::debug;

use super::Coordinator;
use crate::bus::{EventBus, Subscription};

/// Notification list as observed by the UI, newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationFeed {
    items: Vec<Notification>,
    unread: usize,
}

impl NotificationFeed {
    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    /// Unread count, always derived from `items`.
    pub fn unread_count(&self) -> usize {
        self.unread
    }

    pub fn get(&self, id: &str) -> Option<&Notification> {
        self.items.iter().find(|n| n.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn recount(&mut self) {
        self.unread = self.items.iter().filter(|n| !n.is_read).count();
    }
}

/// Store of notifications for the signed-in user.
///
/// Cloning is cheap; clones share one store.
#[derive(Clone)]
pub struct NotificationCache {
    feed: Arc<watch::Sender<NotificationFeed>>,
}

impl Default for NotificationCache {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationCache {
    pub fn new() -> Self {
        let (feed, _) = watch::channel(NotificationFeed::default());
        NotificationCache {
            feed: Arc::new(feed),
        }
    }

    /// Observe the feed.
    pub fn watch(&self) -> watch::Receiver<NotificationFeed> {
        self.feed.subscribe()
    }

    /// A copy of the current feed.
    pub fn snapshot(&self) -> NotificationFeed {
        self.feed.borrow().clone()
    }

    pub fn unread_count(&self) -> usize {
        self.feed.borrow().unread
    }

    pub fn len(&self) -> usize {
        self.feed.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feed.borrow().items.is_empty()
    }

    fn update<R: Default>(&self, f: impl FnOnce(&mut Vec<Notification>) -> R) -> R {
        let mut result = R::default();
        self.feed.send_modify(|feed| {
            result = f(&mut feed.items);
            feed.recount();
        });
        result
    }

    /// Put a notification at the front.
    ///
    /// An existing entry with the same id is replaced, so replays do not
    /// duplicate entries or inflate the unread count.
    pub fn add_notification(&self, notification: Notification) {
        self.update(|items| {
            items.retain(|n| n.id != notification.id);
            items.insert(0, notification);
        });
    }

    /// Replace the whole list, e.g. with the initial REST load.
    pub fn replace(&self, notifications: Vec<Notification>) {
        self.update(|items| *items = notifications);
    }

    /// Mark one notification read. Returns false if it is not cached.
    pub fn mark_read(&self, id: &str) -> bool {
        self.update(|items| match items.iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.is_read = true;
                true
            }
            None => false,
        })
    }

    pub fn mark_all_read(&self) {
        self.update(|items| items.iter_mut().for_each(|n| n.is_read = true));
    }

    /// Remove one notification. Returns false if it is not cached.
    pub fn remove(&self, id: &str) -> bool {
        self.update(|items| {
            let before = items.len();
            items.retain(|n| n.id != id);
            items.len() != before
        })
    }

    pub fn clear(&self) {
        self.update(Vec::clear);
    }
}

/// Applies `notification:new` payloads directly to the cache.
#[derive(Clone)]
pub struct NotificationSync {
    cache: NotificationCache,
}

impl NotificationSync {
    pub fn new(cache: NotificationCache) -> Self {
        NotificationSync { cache }
    }

    pub fn cache(&self) -> &NotificationCache {
        &self.cache
    }
}

impl Coordinator for NotificationSync {
    fn name(&self) -> &'static str {
        "notifications"
    }

    fn activate(&self, bus: &EventBus) -> Vec<Subscription> {
        let cache = self.cache.clone();
        let sub = bus.subscribe_typed(EventType::NotificationNew, move |n: Notification| {
            debug!(id = %n.id, "notification received");
            cache.add_notification(n);
            Ok(())
        });
        vec![sub]
    }
}
