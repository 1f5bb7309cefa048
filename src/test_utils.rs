use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::io::store::{StoreError, TaskStore};
use crate::model::settings::{ViewSettings, ViewType};
use crate::model::task::{Priority, Status, Task};
use crate::reminder::clock::Clock;

/// Epoch ms used as "now" by most tests (2023-11-14T22:13:20Z)
pub const T0: i64 = 1_700_000_000_000;

pub fn task(id: &str, text: &str) -> Task {
    Task::new(id.into(), text.into(), Priority::Should, Status::Todo, T0)
}

pub fn task_with_reminders(id: &str, reminders: &[i64]) -> Task {
    let mut t = task(id, id);
    t.reminders = reminders.to_vec();
    t
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryInner {
    tasks: Vec<Task>,
    settings: HashMap<ViewType, ViewSettings>,
    loads: usize,
    saves: usize,
    fail_loads: usize,
    fail_saves: usize,
}

/// Store backed by a `Vec`, with injectable failures
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let store = MemoryStore::default();
        store.lock().tasks = tasks;
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the stored tasks, bypassing failure injection
    pub fn tasks(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    /// Replace the stored tasks without counting a save (an external edit)
    pub fn replace(&self, tasks: Vec<Task>) {
        self.lock().tasks = tasks;
    }

    /// Number of `load_tasks` calls, failed ones included
    pub fn loads(&self) -> usize {
        self.lock().loads
    }

    /// Number of successful `save_tasks` calls
    pub fn saves(&self) -> usize {
        self.lock().saves
    }

    /// Make the next `n` loads fail
    pub fn fail_next_loads(&self, n: usize) {
        self.lock().fail_loads = n;
    }

    /// Make the next `n` saves fail
    pub fn fail_next_saves(&self, n: usize) {
        self.lock().fail_saves = n;
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn load_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let mut inner = self.lock();
        inner.loads += 1;
        if inner.fail_loads > 0 {
            inner.fail_loads -= 1;
            return Err(StoreError::Unavailable("injected load failure".into()));
        }
        Ok(inner.tasks.clone())
    }

    async fn save_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.fail_saves > 0 {
            inner.fail_saves -= 1;
            return Err(StoreError::Unavailable("injected save failure".into()));
        }
        inner.tasks = tasks.to_vec();
        inner.saves += 1;
        Ok(())
    }

    async fn load_settings(&self, view: ViewType) -> Result<Option<ViewSettings>, StoreError> {
        Ok(self.lock().settings.get(&view).cloned())
    }

    async fn save_settings(&self, view: ViewType, settings: &ViewSettings) -> Result<(), StoreError> {
        self.lock().settings.insert(view, settings.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Wall clock that advances with tokio's (pausable) clock
pub struct TokioClock {
    origin_ms: i64,
    start: Instant,
}

impl TokioClock {
    pub fn starting_at(origin_ms: i64) -> Self {
        TokioClock {
            origin_ms,
            start: Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> i64 {
        self.origin_ms + self.start.elapsed().as_millis() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn tokio_clock_follows_paused_time() {
        let clock = TokioClock::starting_at(T0);
        assert_eq!(clock.now_ms(), T0);
        tokio::time::advance(Duration::from_millis(1_500)).await;
        assert_eq!(clock.now_ms(), T0 + 1_500);
    }

    #[tokio::test]
    async fn memory_store_injects_failures() {
        let store = MemoryStore::with_tasks(vec![task("a", "A")]);
        store.fail_next_saves(1);
        assert!(store.save_tasks(&[]).await.is_err());
        store.save_tasks(&[]).await.unwrap();
        assert_eq!(store.saves(), 1);
        assert!(store.tasks().is_empty());
    }
}
