use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::io::store::TASKS_FILE;

/// Watches the data directory for changes to the task file made by other
/// processes (or editors).
pub struct TaskFileWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<PathBuf>,
    pending: Option<PathBuf>,
}

impl TaskFileWatcher {
    pub fn start(data_dir: &Path) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let event = match result {
                    Ok(e) => e,
                    Err(e) => {
                        tracing::warn!(error = %e, "file watcher error");
                        return;
                    }
                };

                match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
                    _ => return,
                }

                // atomic writes land as a rename onto tasks.json; temp files are ignored
                for path in event.paths {
                    if is_task_file(&path) {
                        let _ = tx.send(path);
                    }
                }
            },
            Config::default(),
        )?;

        watcher.watch(data_dir, RecursiveMode::NonRecursive)?;
        Ok(TaskFileWatcher {
            _watcher: watcher,
            rx,
            pending: None,
        })
    }

    /// Wait for the next change, then swallow any that follow within
    /// `settle`. Returns `None` if the watcher stopped.
    ///
    /// Cancel-safe: a change seen before the future is dropped is reported
    /// by the next call.
    pub async fn changed(&mut self, settle: Duration) -> Option<PathBuf> {
        if self.pending.is_none() {
            self.pending = Some(self.rx.recv().await?);
        }
        while let Ok(Some(path)) = tokio::time::timeout(settle, self.rx.recv()).await {
            self.pending = Some(path);
        }
        self.pending.take()
    }
}

fn is_task_file(path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()) == Some(TASKS_FILE)
}
