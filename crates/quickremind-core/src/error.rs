//! Core error types for quickremind-core.
//!
//! Two families live here. [`CoreError`] covers the real I/O boundaries
//! (snapshot files, configuration). [`Rejection`] covers user-facing
//! validation failures, which are expected outcomes rather than faults and
//! are surfaced to the user as transient toasts.

use std::path::PathBuf;
use thiserror::Error;

use crate::events::{ToastKind, ToastMessage};

/// Core error type for quickremind-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Snapshot could not be read or written
    #[error("Snapshot error at {path}: {message}")]
    Snapshot { path: PathBuf, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Timezone name not present in the IANA database
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    /// Could not determine the data directory
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation rejection of a user intent.
///
/// Rejections never change state. The caller gets the reason back and the
/// scheduler also emits a matching toast event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("maximum of {limit} pending reminders reached")]
    TooManyReminders { limit: usize },

    #[error("target is {minutes} minute(s) away, minimum is {min}")]
    TooSoon { minutes: i64, min: i64 },

    #[error("maximum of {limit} quick commands reached")]
    TooManyCommands { limit: usize },

    #[error("maximum of {limit} categories reached")]
    TooManyCategories { limit: usize },

    #[error("a command needs between 1 and {limit} time options")]
    InvalidTimeOptions { limit: usize },

    #[error("name must not be empty")]
    EmptyName,

    #[error("unknown quick command '{0}'")]
    UnknownCommand(String),

    #[error("quick command '{command_id}' has no time option {index}")]
    UnknownTimeOption { command_id: String, index: usize },
}

impl Rejection {
    /// Severity used when the rejection is shown to the user.
    pub fn toast_kind(&self) -> ToastKind {
        match self {
            Rejection::TooManyReminders { .. }
            | Rejection::TooManyCommands { .. }
            | Rejection::TooManyCategories { .. } => ToastKind::Warning,
            _ => ToastKind::Error,
        }
    }

    /// Toast payload shown for this rejection.
    pub fn toast_message(&self) -> ToastMessage {
        match self {
            Rejection::TooManyReminders { limit } => ToastMessage::MaxReminders { limit: *limit },
            Rejection::TooSoon { min, .. } => ToastMessage::MinMinutes { min: *min },
            Rejection::TooManyCommands { limit } => ToastMessage::MaxCommands { limit: *limit },
            Rejection::TooManyCategories { limit } => ToastMessage::MaxCategories { limit: *limit },
            Rejection::InvalidTimeOptions { limit } => {
                ToastMessage::InvalidTimeOptions { limit: *limit }
            }
            Rejection::EmptyName => ToastMessage::EmptyName,
            Rejection::UnknownCommand(_) | Rejection::UnknownTimeOption { .. } => {
                ToastMessage::UnknownCommand
            }
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
