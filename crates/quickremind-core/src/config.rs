//! TOML-based engine configuration.
//!
//! Holds every tunable the scheduler consults:
//! - Capacity limits (pending reminders, commands, categories)
//! - On-time and expiry windows
//! - Point awards and level thresholds
//! - Default bee-mode policy for fresh installs
//! - The timezone used for wall-clock and calendar-day math
//!
//! Configuration is stored at `~/.config/quickremind/config.toml`.

use std::path::{Path, PathBuf};

use chrono::Duration;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::bee::BeeModeSettings;
use crate::error::ConfigError;
use crate::storage::data_dir;

/// Capacity limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    #[serde(default = "default_max_pending_reminders")]
    pub max_pending_reminders: usize,
    #[serde(default = "default_max_commands")]
    pub max_commands: usize,
    #[serde(default = "default_max_categories")]
    pub max_categories: usize,
    #[serde(default = "default_max_time_options")]
    pub max_time_options: usize,
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,
    /// Smallest accepted distance to a new reminder's target, in minutes.
    #[serde(default = "default_min_minutes")]
    pub min_minutes: i64,
}

/// Time windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timing {
    /// A completion within this many minutes of the target counts as on time.
    #[serde(default = "default_on_time_window")]
    pub on_time_window_minutes: i64,
    /// A pending reminder this far past its target becomes missed.
    #[serde(default = "default_expiry_grace")]
    pub expiry_grace_minutes: i64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

/// Points granted per action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointTable {
    #[serde(default = "default_1")]
    pub create_reminder: u32,
    #[serde(default = "default_2")]
    pub complete_reminder: u32,
    #[serde(default = "default_3")]
    pub complete_on_time: u32,
    #[serde(default = "default_streak_7")]
    pub streak_7: u32,
    #[serde(default = "default_streak_14")]
    pub streak_14: u32,
    #[serde(default = "default_streak_30")]
    pub streak_30: u32,
    #[serde(default = "default_1")]
    pub use_quick_command: u32,
    #[serde(default = "default_5")]
    pub create_quick_command: u32,
}

impl PointTable {
    /// Bonus for reaching `streak` consecutive days, if it is a milestone.
    pub fn streak_bonus(&self, streak: u32) -> Option<u32> {
        match streak {
            7 => Some(self.streak_7),
            14 => Some(self.streak_14),
            30 => Some(self.streak_30),
            _ => None,
        }
    }
}

/// Ascending point thresholds; index `i` unlocks level `i + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelTable(pub Vec<u64>);

impl LevelTable {
    /// Highest level whose threshold is reached, never below 1.
    pub fn level_for(&self, points: u64) -> u32 {
        self.0
            .iter()
            .rposition(|threshold| points >= *threshold)
            .map(|i| i as u32 + 1)
            .unwrap_or(1)
    }
}

impl Default for LevelTable {
    fn default() -> Self {
        Self(vec![0, 100, 250, 500, 1000, 1750, 2750, 4000, 5500, 7500, 10000])
    }
}

/// Engine configuration.
///
/// Serialized to/from TOML at `~/.config/quickremind/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub timing: Timing,
    #[serde(default)]
    pub points: PointTable,
    #[serde(default)]
    pub levels: LevelTable,
    /// Bee-mode policy used until the user changes it.
    #[serde(default)]
    pub bee_defaults: BeeModeSettings,
    /// IANA timezone name.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

// Default functions
fn default_max_pending_reminders() -> usize {
    50
}
fn default_max_commands() -> usize {
    20
}
fn default_max_categories() -> usize {
    10
}
fn default_max_time_options() -> usize {
    4
}
fn default_max_text_length() -> usize {
    100
}
fn default_min_minutes() -> i64 {
    1
}
fn default_on_time_window() -> i64 {
    5
}
fn default_expiry_grace() -> i64 {
    default_on_time_window() * 6
}
fn default_sweep_interval() -> u64 {
    60
}
fn default_1() -> u32 {
    1
}
fn default_2() -> u32 {
    2
}
fn default_3() -> u32 {
    3
}
fn default_5() -> u32 {
    5
}
fn default_streak_7() -> u32 {
    10
}
fn default_streak_14() -> u32 {
    25
}
fn default_streak_30() -> u32 {
    50
}
fn default_timezone() -> String {
    "UTC".into()
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_pending_reminders: default_max_pending_reminders(),
            max_commands: default_max_commands(),
            max_categories: default_max_categories(),
            max_time_options: default_max_time_options(),
            max_text_length: default_max_text_length(),
            min_minutes: default_min_minutes(),
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            on_time_window_minutes: default_on_time_window(),
            expiry_grace_minutes: default_expiry_grace(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl Timing {
    pub fn on_time_window(&self) -> Duration {
        Duration::minutes(self.on_time_window_minutes)
    }

    pub fn expiry_grace(&self) -> Duration {
        Duration::minutes(self.expiry_grace_minutes)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl Default for PointTable {
    fn default() -> Self {
        Self {
            create_reminder: 1,
            complete_reminder: 2,
            complete_on_time: 3,
            streak_7: 10,
            streak_14: 25,
            streak_30: 50,
            use_quick_command: 1,
            create_quick_command: 5,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            timing: Timing::default(),
            points: PointTable::default(),
            levels: LevelTable::default(),
            bee_defaults: BeeModeSettings::default(),
            timezone: default_timezone(),
        }
    }
}

impl EngineConfig {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map(|p| p.is_empty()).unwrap_or(true) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => {
                    let n = value
                        .parse::<i64>()
                        .map_err(|_| invalid(format!("cannot parse '{value}' as integer")))?;
                    serde_json::Value::Number(n.into())
                }
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                _ => serde_json::Value::String(value.into()),
            };
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            Ok(cfg)
        }
    }

    /// Load and validate a config file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let load_failed = |message: String| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| load_failed(e.to_string()))?;
        let cfg: EngineConfig = toml::from_str(&content).map_err(|e| load_failed(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, "falling back to default engine config");
                Self::default()
            }
        }
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key. The result is validated
    /// but not saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: EngineConfig =
            serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::UnknownTimezone(self.timezone.clone()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.to_string(),
        };

        self.tz()?;
        if self.limits.max_pending_reminders == 0 {
            return Err(invalid("limits.max_pending_reminders", "must be positive"));
        }
        if self.limits.max_time_options == 0 {
            return Err(invalid("limits.max_time_options", "must be positive"));
        }
        if self.limits.min_minutes < 0 {
            return Err(invalid("limits.min_minutes", "must not be negative"));
        }
        if self.timing.on_time_window_minutes < 0 {
            return Err(invalid("timing.on_time_window_minutes", "must not be negative"));
        }
        if self.timing.expiry_grace_minutes < self.timing.on_time_window_minutes {
            return Err(invalid(
                "timing.expiry_grace_minutes",
                "must not be shorter than the on-time window",
            ));
        }
        if self.levels.0.first() != Some(&0) {
            return Err(invalid("levels", "first threshold must be 0"));
        }
        if self.levels.0.windows(2).any(|w| w[0] >= w[1]) {
            return Err(invalid("levels", "thresholds must be strictly ascending"));
        }
        Ok(())
    }
}
