use serde::{Deserialize, Serialize};

use super::task::Priority;

/// Configuration from `.taskpanel/config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub reminders: ReminderConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default)]
    pub hide_completed: bool,
    /// Priority given to new tasks when none is specified
    #[serde(default = "default_priority")]
    pub default_priority: Priority,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            hide_completed: false,
            default_priority: default_priority(),
        }
    }
}

/// Which counters `tp stats` shows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    #[serde(default = "default_true")]
    pub show_total: bool,
    #[serde(default = "default_true")]
    pub show_done: bool,
    #[serde(default = "default_true")]
    pub show_must: bool,
    #[serde(default = "default_true")]
    pub show_in_progress: bool,
    #[serde(default = "default_true")]
    pub show_overdue: bool,
}

impl Default for StatsConfig {
    fn default() -> Self {
        StatsConfig {
            show_total: true,
            show_done: true,
            show_must: true,
            show_in_progress: true,
            show_overdue: true,
        }
    }
}

/// Reminder timing windows, in milliseconds. Unsigned so a negative window,
/// which would leave an armed reminder never due, cannot be configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// A reminder counts as due when it is at most this far in the future
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u32,
    /// A reminder this far in the past still counts as upcoming when arming
    #[serde(default = "default_tolerance_ms")]
    pub tolerance_ms: u32,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        ReminderConfig {
            grace_ms: default_grace_ms(),
            tolerance_ms: default_tolerance_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing` filter directive used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_log_level(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_priority() -> Priority {
    Priority::Should
}

fn default_grace_ms() -> u32 {
    1000
}

fn default_tolerance_ms() -> u32 {
    500
}

fn default_log_level() -> String {
    "warn".to_string()
}
