//! Notification delivery boundary.
//!
//! The scheduler only ever asks for "show this at T" and "forget that".
//! How a notification reaches the user (OS toast, push, terminal bell) is
//! the host's business.

mod memory;
mod timer;

pub use memory::{MemoryGateway, ScheduledNotification};
pub use timer::{Delivery, TimerGateway};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque handle to a scheduled notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationHandle(String);

impl NotificationHandle {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NotificationHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NotificationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NotificationHandle {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
}

/// Notification permission as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    Default,
    Unsupported,
}

/// Every notification backend implements this trait.
///
/// Scheduling never fails from the caller's point of view: a denied
/// permission just means nothing is displayed. `cancel` on a handle that
/// already fired or was already cancelled is a no-op.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Arrange delivery at `at`; deliver immediately if `at` has passed.
    fn schedule(&self, content: &NotificationContent, at: DateTime<Utc>) -> NotificationHandle;

    fn cancel(&self, handle: &NotificationHandle);

    fn is_supported(&self) -> bool {
        true
    }

    fn permission(&self) -> Permission;

    /// Ask the user for permission. Only hosts await this; the scheduler
    /// never blocks on it.
    async fn request_permission(&self) -> bool;
}

#[async_trait]
impl<G: NotificationGateway + ?Sized> NotificationGateway for Arc<G> {
    fn schedule(&self, content: &NotificationContent, at: DateTime<Utc>) -> NotificationHandle {
        (**self).schedule(content, at)
    }

    fn cancel(&self, handle: &NotificationHandle) {
        (**self).cancel(handle)
    }

    fn is_supported(&self) -> bool {
        (**self).is_supported()
    }

    fn permission(&self) -> Permission {
        (**self).permission()
    }

    async fn request_permission(&self) -> bool {
        (**self).request_permission().await
    }
}
