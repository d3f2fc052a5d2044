//! Gateway backed by tokio timers.
//!
//! Each scheduled notification is one sleeping task. When it wakes, the
//! notification is pushed onto an unbounded channel for the host to show.
//! Cancelling aborts the task.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use super::{NotificationContent, NotificationGateway, NotificationHandle, Permission};

/// A notification that came due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub handle: NotificationHandle,
    pub content: NotificationContent,
    pub scheduled_for: DateTime<Utc>,
}

type Pending = Arc<Mutex<HashMap<NotificationHandle, AbortHandle>>>;

pub struct TimerGateway {
    runtime: Handle,
    tx: mpsc::UnboundedSender<Delivery>,
    pending: Pending,
    permission: Mutex<Permission>,
}

impl TimerGateway {
    /// Create a gateway on the current tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Delivery>) {
        Self::with_runtime(Handle::current())
    }

    pub fn with_runtime(runtime: Handle) -> (Self, mpsc::UnboundedReceiver<Delivery>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let gateway = Self {
            runtime,
            tx,
            pending: Arc::new(Mutex::new(HashMap::new())),
            permission: Mutex::new(Permission::Granted),
        };
        (gateway, rx)
    }

    /// Number of timers still waiting.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn set_permission(&self, permission: Permission) {
        *self.permission.lock().unwrap_or_else(|e| e.into_inner()) = permission;
    }
}

#[async_trait]
impl NotificationGateway for TimerGateway {
    fn schedule(&self, content: &NotificationContent, at: DateTime<Utc>) -> NotificationHandle {
        let handle = NotificationHandle::new();
        let delivery = Delivery {
            handle: handle.clone(),
            content: content.clone(),
            scheduled_for: at,
        };

        let delay = (at - Utc::now()).to_std().unwrap_or_default();
        if delay.is_zero() {
            if self.tx.send(delivery).is_err() {
                tracing::debug!(%handle, "notification receiver dropped");
            }
            return handle;
        }

        let tx = self.tx.clone();
        let pending = Arc::clone(&self.pending);
        let key = handle.clone();
        // Hold the map lock while spawning so the task cannot remove its
        // entry before it has been inserted.
        let mut map = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            pending
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&key);
            if tx.send(delivery).is_err() {
                tracing::debug!(handle = %key, "notification receiver dropped");
            }
        });
        map.insert(handle.clone(), task.abort_handle());
        handle
    }

    fn cancel(&self, handle: &NotificationHandle) {
        let task = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(handle);
        if let Some(task) = task {
            task.abort();
        }
    }

    fn permission(&self) -> Permission {
        *self.permission.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn request_permission(&self) -> bool {
        self.permission() == Permission::Granted
    }
}

impl Drop for TimerGateway {
    fn drop(&mut self) {
        let map = std::mem::take(&mut *self.pending.lock().unwrap_or_else(|e| e.into_inner()));
        for task in map.into_values() {
            task.abort();
        }
    }
}
