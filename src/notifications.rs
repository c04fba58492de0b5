// src/notifications.rs

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

/// How long a toast stays on screen.
pub const NOTIFICATION_TTL_SECS: i64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Info,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: NotificationId,
    pub message: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
}

type Listener = Arc<dyn Fn(&[Notification]) + Send + Sync>;

#[derive(Default)]
struct HubState {
    next_id: u64,
    active: Vec<Notification>,
    listeners: Vec<(SubscriptionId, Listener)>,
}

/// Publish/subscribe queue for user-facing messages. One hub is owned by
/// the application root and handed to whoever needs it.
#[derive(Default)]
pub struct NotificationHub {
    state: Mutex<HubState>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&[Notification]) + Send + Sync + 'static,
    {
        let Ok(mut state) = self.state.lock() else {
            return SubscriptionId(0);
        };
        state.next_id += 1;
        let id = SubscriptionId(state.next_id);
        state.listeners.push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        let before = state.listeners.len();
        state.listeners.retain(|(sub, _)| *sub != id);
        state.listeners.len() != before
    }

    pub fn publish(
        &self,
        message: impl Into<String>,
        kind: NotificationKind,
        now: DateTime<Utc>,
    ) -> Option<NotificationId> {
        let mut state = self.state.lock().ok()?;
        state.next_id += 1;
        let id = NotificationId(state.next_id);
        state.active.push(Notification {
            id,
            message: message.into(),
            kind,
            created_at: now,
        });
        let delivery = Delivery::capture(&state);
        drop(state);
        delivery.run();
        Some(id)
    }

    pub fn dismiss(&self, id: NotificationId) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        let before = state.active.len();
        state.active.retain(|n| n.id != id);
        if state.active.len() != before {
            let delivery = Delivery::capture(&state);
            drop(state);
            delivery.run();
        }
    }

    /// Drop notifications older than the TTL. Driven by the UI's clock tick.
    pub fn prune_expired(&self, now: DateTime<Utc>) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        let ttl = Duration::seconds(NOTIFICATION_TTL_SECS);
        let before = state.active.len();
        state.active.retain(|n| now - n.created_at < ttl);
        if state.active.len() != before {
            let delivery = Delivery::capture(&state);
            drop(state);
            delivery.run();
        }
    }

    pub fn active(&self) -> Vec<Notification> {
        self.state
            .lock()
            .map(|s| s.active.clone())
            .unwrap_or_default()
    }
}

/// Snapshot taken under the lock and delivered after it is released, so a
/// listener may call back into the hub.
struct Delivery {
    active: Vec<Notification>,
    listeners: Vec<Listener>,
}

impl Delivery {
    fn capture(state: &HubState) -> Self {
        Self {
            active: state.active.clone(),
            listeners: state.listeners.iter().map(|(_, l)| l.clone()).collect(),
        }
    }

    fn run(self) {
        for listener in &self.listeners {
            listener(&self.active);
        }
    }
}
