use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::time::{Instant, sleep_until};

use crate::io::store::TaskStore;
use crate::model::config::ReminderConfig;
use crate::model::message::PanelEvent;
use crate::reminder::clock::Clock;
use crate::reminder::due;

/// Minimum wait before retrying after a firing cycle that could not persist
const FAILED_CYCLE_BACKOFF: Duration = Duration::from_millis(100);

/// Observable scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No upcoming reminder
    Idle,
    /// One deadline pending for the reminder at `wake_at` (epoch ms)
    Armed { wake_at: i64 },
    /// Processing due reminders
    Firing,
    /// The driver has stopped
    Disposed,
}

enum Control {
    Rearm(oneshot::Sender<()>),
    Dispose,
}

/// Handle to the scheduler's driver task.
///
/// The driver owns the only pending deadline and re-arming replaces it, so
/// any number of re-arms leaves exactly one timer. When the deadline
/// elapses it runs a firing cycle under the shared write gate, then arms
/// again.
pub struct ReminderScheduler {
    control: mpsc::UnboundedSender<Control>,
    state: watch::Receiver<SchedulerState>,
}

impl ReminderScheduler {
    /// Start the driver on the current tokio runtime. It arms immediately.
    pub fn spawn(
        store: Arc<dyn TaskStore>,
        clock: Arc<dyn Clock>,
        events: broadcast::Sender<PanelEvent>,
        gate: Arc<Mutex<()>>,
        timing: ReminderConfig,
    ) -> Self {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SchedulerState::Idle);
        let driver = Driver {
            store,
            clock,
            events,
            gate,
            timing,
            state: state_tx,
        };
        tokio::spawn(driver.run(control_rx));
        ReminderScheduler {
            control: control_tx,
            state: state_rx,
        }
    }

    /// Recompute the next wake time from the store, replacing any pending
    /// deadline. Returns once the new deadline is in place.
    pub async fn rearm(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.control.send(Control::Rearm(ack_tx)).is_err() {
            return;
        }
        let _ = ack_rx.await;
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SchedulerState> {
        self.state.clone()
    }

    /// Stop the driver. A firing cycle already in progress finishes first.
    pub fn dispose(&self) {
        let _ = self.control.send(Control::Dispose);
    }

    /// Wait until the driver has stopped
    pub async fn stopped(&self) {
        let mut state = self.state.clone();
        let _ = state.wait_for(|s| *s == SchedulerState::Disposed).await;
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        self.dispose();
    }
}

struct Driver {
    store: Arc<dyn TaskStore>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<PanelEvent>,
    gate: Arc<Mutex<()>>,
    timing: ReminderConfig,
    state: watch::Sender<SchedulerState>,
}

impl Driver {
    async fn run(self, mut control: mpsc::UnboundedReceiver<Control>) {
        let mut deadline = self.arm(None).await;
        loop {
            tokio::select! {
                // control first: a dispose queued before an overdue deadline wins
                biased;
                msg = control.recv() => match msg {
                    Some(Control::Rearm(ack)) => {
                        deadline = self.arm(None).await;
                        let _ = ack.send(());
                    }
                    Some(Control::Dispose) | None => break,
                },
                _ = wait(deadline) => {
                    let not_before = if self.fire().await {
                        None
                    } else {
                        Some(Instant::now() + FAILED_CYCLE_BACKOFF)
                    };
                    deadline = self.arm(not_before).await;
                }
            }
        }
        tracing::debug!("reminder scheduler stopped");
        self.state.send_replace(SchedulerState::Disposed);
    }

    /// Compute the single pending deadline, or `None` when idle.
    async fn arm(&self, not_before: Option<Instant>) -> Option<Instant> {
        let tasks = match self.store.load_tasks().await {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::error!(error = %e, "could not load tasks to schedule reminders");
                self.state.send_replace(SchedulerState::Idle);
                return None;
            }
        };
        let now = self.clock.now_ms();
        let Some(wake_at) = due::next_wake(&tasks, now, self.timing.tolerance_ms) else {
            tracing::debug!("no upcoming reminders");
            self.state.send_replace(SchedulerState::Idle);
            return None;
        };

        let delay = Duration::from_millis((wake_at - now).max(0) as u64);
        let mut at = Instant::now() + delay;
        if let Some(floor) = not_before {
            at = at.max(floor);
        }
        tracing::debug!(wake_at, delay_ms = delay.as_millis() as u64, "reminder armed");
        self.state.send_replace(SchedulerState::Armed { wake_at });
        Some(at)
    }

    /// Run one firing cycle. Returns false if due reminders could not be
    /// removed from the store.
    async fn fire(&self) -> bool {
        self.state.send_replace(SchedulerState::Firing);
        let _gate = self.gate.lock().await;

        let _guard = match self.store.begin_write().await {
            Ok(guard) => guard,
            Err(e) => {
                tracing::error!(error = %e, "could not lock tasks for reminder cycle");
                return false;
            }
        };
        let mut tasks = match self.store.load_tasks().await {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::error!(error = %e, "could not load tasks for reminder cycle");
                return false;
            }
        };

        let fired = due::take_due(&mut tasks, self.clock.now_ms(), self.timing.grace_ms);
        if fired.is_empty() {
            return true;
        }

        for entry in &fired {
            let Some(task) = tasks.iter().find(|t| t.id == entry.task_id) else {
                continue;
            };
            tracing::info!(task = %task.id, count = entry.reminders.len(), "reminder due");
            let _ = self.events.send(PanelEvent::ReminderDue {
                task: task.clone(),
                reminders: entry.reminders.clone(),
            });
        }

        match self.store.save_tasks(&tasks).await {
            Ok(()) => {
                let _ = self.events.send(PanelEvent::TasksChanged { tasks });
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not remove fired reminders; they may fire again");
                false
            }
        }
    }
}

async fn wait(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
