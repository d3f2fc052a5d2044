//! In-process gateway that records everything it is asked to do.
//!
//! Used by tests and by hosts that poll for due notifications themselves
//! (e.g. a virtual clock in a simulation).

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{NotificationContent, NotificationGateway, NotificationHandle, Permission};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledNotification {
    pub handle: NotificationHandle,
    pub content: NotificationContent,
    pub at: DateTime<Utc>,
    pub delivered: bool,
    pub cancelled: bool,
    /// How many times `cancel` was called for this handle.
    pub cancel_calls: u32,
}

impl ScheduledNotification {
    pub fn is_active(&self) -> bool {
        !self.delivered && !self.cancelled
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<NotificationHandle, ScheduledNotification>,
    order: Vec<NotificationHandle>,
    clock: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct MemoryGateway {
    inner: Mutex<Inner>,
    permission: Mutex<Permission>,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            permission: Mutex::new(Permission::Default),
        }
    }

    pub fn with_permission(permission: Permission) -> Self {
        let gateway = Self::new();
        *gateway.permission.lock().unwrap_or_else(|e| e.into_inner()) = permission;
        gateway
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every notification ever scheduled, in scheduling order.
    pub fn scheduled(&self) -> Vec<ScheduledNotification> {
        let inner = self.lock();
        inner
            .order
            .iter()
            .filter_map(|h| inner.entries.get(h).cloned())
            .collect()
    }

    pub fn get(&self, handle: &NotificationHandle) -> Option<ScheduledNotification> {
        self.lock().entries.get(handle).cloned()
    }

    /// Notifications neither delivered nor cancelled.
    pub fn active(&self) -> Vec<ScheduledNotification> {
        self.scheduled().into_iter().filter(|n| n.is_active()).collect()
    }

    pub fn active_count(&self) -> usize {
        self.lock().entries.values().filter(|n| n.is_active()).count()
    }

    pub fn cancel_calls(&self, handle: &NotificationHandle) -> u32 {
        self.lock()
            .entries
            .get(handle)
            .map(|n| n.cancel_calls)
            .unwrap_or(0)
    }

    /// Tell the gateway what time it is. Entries scheduled at or before
    /// this instant count as delivered immediately.
    pub fn set_clock(&self, now: DateTime<Utc>) {
        self.lock().clock = Some(now);
    }

    /// Mark every active notification due by `now` as delivered and return them.
    pub fn fire_due(&self, now: DateTime<Utc>) -> Vec<ScheduledNotification> {
        let mut inner = self.lock();
        inner.clock = Some(now);
        let due: Vec<NotificationHandle> = inner
            .order
            .iter()
            .filter(|h| {
                inner
                    .entries
                    .get(*h)
                    .map(|n| n.is_active() && n.at <= now)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        due.iter()
            .filter_map(|h| {
                let entry = inner.entries.get_mut(h)?;
                entry.delivered = true;
                Some(entry.clone())
            })
            .collect()
    }
}

#[async_trait]
impl NotificationGateway for MemoryGateway {
    fn schedule(&self, content: &NotificationContent, at: DateTime<Utc>) -> NotificationHandle {
        let handle = NotificationHandle::new();
        let mut inner = self.lock();
        let delivered = inner.clock.map(|now| at <= now).unwrap_or(false);
        inner.entries.insert(
            handle.clone(),
            ScheduledNotification {
                handle: handle.clone(),
                content: content.clone(),
                at,
                delivered,
                cancelled: false,
                cancel_calls: 0,
            },
        );
        inner.order.push(handle.clone());
        handle
    }

    fn cancel(&self, handle: &NotificationHandle) {
        if let Some(entry) = self.lock().entries.get_mut(handle) {
            entry.cancel_calls += 1;
            if !entry.delivered {
                entry.cancelled = true;
            }
        }
    }

    fn permission(&self) -> Permission {
        *self.permission.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn request_permission(&self) -> bool {
        let mut permission = self.permission.lock().unwrap_or_else(|e| e.into_inner());
        if *permission == Permission::Default {
            *permission = Permission::Granted;
        }
        *permission == Permission::Granted
    }
}
