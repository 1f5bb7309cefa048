use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;

use crate::io::lock::{FileLock, LockError};
use crate::io::recovery::{self, RecoveryCategory, RecoveryEntry};
use crate::io::state;
use crate::model::settings::{ViewSettings, ViewType};
use crate::model::task::Task;

pub const TASKS_FILE: &str = "tasks.json";

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not serialize tasks: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Held for the duration of a read-modify-write cycle.
#[derive(Debug, Default)]
pub struct WriteGuard {
    _lock: Option<FileLock>,
}

impl WriteGuard {
    /// A guard that excludes nothing (single-process stores)
    pub fn unlocked() -> Self {
        WriteGuard { _lock: None }
    }
}

/// Persistent task collection plus per-view settings. Always read and
/// written whole; a mutating caller holds the [`WriteGuard`] from
/// [`TaskStore::begin_write`] for the full read-modify-write.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn load_tasks(&self) -> Result<Vec<Task>, StoreError>;

    /// Overwrite the entire collection
    async fn save_tasks(&self, tasks: &[Task]) -> Result<(), StoreError>;

    async fn load_settings(&self, view: ViewType) -> Result<Option<ViewSettings>, StoreError>;

    async fn save_settings(&self, view: ViewType, settings: &ViewSettings) -> Result<(), StoreError>;

    async fn begin_write(&self) -> Result<WriteGuard, StoreError> {
        Ok(WriteGuard::unlocked())
    }
}

// ---------------------------------------------------------------------------
// JSON file store
// ---------------------------------------------------------------------------

/// Tasks in `<data_dir>/tasks.json`, settings in `<data_dir>/.state.json`
#[derive(Debug, Clone)]
pub struct JsonStore {
    data_dir: PathBuf,
}

impl JsonStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        JsonStore {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.data_dir.join(TASKS_FILE)
    }
}

#[async_trait]
impl TaskStore for JsonStore {
    async fn load_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let path = self.tasks_path();
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Read { path, source: e }),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            recovery::log_recovery(
                &self.data_dir,
                RecoveryEntry {
                    timestamp: Utc::now(),
                    category: RecoveryCategory::Parse,
                    description: format!("{} could not be parsed", TASKS_FILE),
                    fields: vec![("Error".to_string(), e.to_string())],
                    body: content.clone(),
                },
            );
            StoreError::Parse { path, source: e }
        })
    }

    async fn save_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let path = self.tasks_path();
        let mut content = serde_json::to_string_pretty(tasks)?;
        content.push('\n');
        let data_dir = self.data_dir.clone();
        tokio::task::spawn_blocking(move || {
            recovery::atomic_write(&path, content.as_bytes()).map_err(|e| {
                recovery::log_write_failure(&data_dir, TASKS_FILE, &e, content);
                StoreError::Write { path, source: e }
            })
        })
        .await?
    }

    async fn load_settings(&self, view: ViewType) -> Result<Option<ViewSettings>, StoreError> {
        let data_dir = self.data_dir.clone();
        let state = tokio::task::spawn_blocking(move || state::read_panel_state(&data_dir)).await?;
        Ok(state.and_then(|mut s| s.views.remove(&view)))
    }

    async fn save_settings(&self, view: ViewType, settings: &ViewSettings) -> Result<(), StoreError> {
        let data_dir = self.data_dir.clone();
        let settings = settings.clone();
        tokio::task::spawn_blocking(move || {
            let mut panel = state::read_panel_state(&data_dir).unwrap_or_default();
            panel.views.insert(view, settings);
            state::write_panel_state(&data_dir, &panel).map_err(|e| StoreError::Write {
                path: data_dir.join(".state.json"),
                source: e,
            })
        })
        .await?
    }

    async fn begin_write(&self) -> Result<WriteGuard, StoreError> {
        let data_dir = self.data_dir.clone();
        let lock = tokio::task::spawn_blocking(move || FileLock::acquire_default(&data_dir)).await??;
        Ok(WriteGuard { _lock: Some(lock) })
    }
}
