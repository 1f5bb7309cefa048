use std::fs;
use std::path::{Path, PathBuf};

use crate::io::store::TASKS_FILE;

/// Name of the data directory inside a workspace root
pub const DATA_DIR: &str = ".taskpanel";

pub const CONFIG_FILE: &str = "config.toml";

const CONFIG_TEMPLATE: &str = r##"# taskpanel configuration. Edit freely, or use: tp config set <key> <value>

[general]
hide_completed = false
# priority for new tasks when none is given: Must, Should, Could, Wont
default_priority = "Should"

# --- Statistics ---
# Counters shown by `tp stats`.

[stats]
show_total = true
show_done = true
show_must = true
show_in_progress = true
show_overdue = true

# --- Reminders ---
# A reminder is due when it is at most grace_ms in the future. When arming,
# a reminder up to tolerance_ms in the past still counts as upcoming.

[reminders]
grace_ms = 1000
tolerance_ms = 500

[log]
# tracing filter used when RUST_LOG is unset (error, warn, info, debug, trace)
level = "warn"
"##;

/// Error type for workspace and configuration I/O
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("not a taskpanel workspace: no .taskpanel/ directory found (run `tp init`)")]
    NotAWorkspace,
    #[error("workspace already exists at {0}")]
    AlreadyExists(PathBuf),
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config.toml: {0}")]
    ConfigParseError(#[from] toml::de::Error),
    #[error("could not parse config.toml: {0}")]
    ConfigEditError(#[from] toml_edit::TomlError),
    #[error("unknown config key: {0}")]
    UnknownKey(String),
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Walk up from `start` to the first directory containing `.taskpanel/`.
/// Returns the data directory itself.
pub fn discover_workspace(start: &Path) -> Result<PathBuf, WorkspaceError> {
    let mut current = start.to_path_buf();
    loop {
        let data_dir = current.join(DATA_DIR);
        if data_dir.is_dir() {
            return Ok(data_dir);
        }
        if !current.pop() {
            return Err(WorkspaceError::NotAWorkspace);
        }
    }
}

/// Create `.taskpanel/` under `root` with a commented config and an empty
/// task list. Returns the data directory.
pub fn init_workspace(root: &Path) -> Result<PathBuf, WorkspaceError> {
    let data_dir = root.join(DATA_DIR);
    if data_dir.is_dir() {
        return Err(WorkspaceError::AlreadyExists(data_dir));
    }
    fs::create_dir_all(&data_dir)?;
    fs::write(data_dir.join(CONFIG_FILE), CONFIG_TEMPLATE)?;
    fs::write(data_dir.join(TASKS_FILE), "[]\n")?;
    Ok(data_dir)
}
