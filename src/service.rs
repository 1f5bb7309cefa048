use std::sync::Arc;

use tokio::sync::{Mutex, broadcast};

use crate::io::store::{StoreError, TaskStore};
use crate::model::config::AppConfig;
use crate::model::message::{Command, NewTask, OrderUpdate, PanelEvent, Response};
use crate::model::settings::{GroupBy, ViewSettings, ViewType};
use crate::model::task::{Priority, Status, Task};
use crate::ops::order::{self, DropTarget, Group, OrderError};
use crate::ops::stats::{self, TaskStatistics};
use crate::ops::task_ops::{self, TaskError};
use crate::reminder::clock::Clock;
use crate::reminder::scheduler::ReminderScheduler;

const EVENT_CAPACITY: usize = 256;

/// Error type for service operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Order(#[from] OrderError),
}

/// Where to drop a task: a group chosen under `group_by`, in front of
/// `before` or at the end of that group.
///
/// A missing status/priority keeps the task's current one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoveTo {
    pub group_by: GroupBy,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub before: Option<String>,
}

impl MoveTo {
    fn target_for(&self, task: &Task) -> DropTarget {
        let group = match self.group_by {
            GroupBy::Status => Group::Status(self.status.unwrap_or(task.status)),
            GroupBy::Priority => Group::Priority(self.priority.unwrap_or(task.priority)),
            GroupBy::None => Group::All,
        };
        DropTarget {
            group,
            before: self.before.clone(),
        }
    }
}

/// The single writer behind every panel command. Each mutation is a
/// whole-collection read-modify-write under a gate shared with the
/// reminder firing cycle; once persisted it emits `TasksChanged`, then
/// re-arms the scheduler.
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    clock: Arc<dyn Clock>,
    config: AppConfig,
    gate: Arc<Mutex<()>>,
    events: broadcast::Sender<PanelEvent>,
    scheduler: ReminderScheduler,
}

impl TaskService {
    /// Build the service and start its reminder scheduler on the current
    /// tokio runtime.
    pub fn new(store: Arc<dyn TaskStore>, clock: Arc<dyn Clock>, config: AppConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let gate = Arc::new(Mutex::new(()));
        let scheduler = ReminderScheduler::spawn(
            store.clone(),
            clock.clone(),
            events.clone(),
            gate.clone(),
            config.reminders,
        );
        TaskService {
            store,
            clock,
            config,
            gate,
            events,
            scheduler,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PanelEvent> {
        self.events.subscribe()
    }

    pub fn scheduler(&self) -> &ReminderScheduler {
        &self.scheduler
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Stop the reminder scheduler. Mutations still work afterwards but no
    /// reminder fires.
    pub fn dispose(&self) {
        self.scheduler.dispose();
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Load all tasks. Tasks without an order key get a default one, and
    /// that is persisted before returning.
    pub async fn get_tasks(&self) -> Result<Vec<Task>, ServiceError> {
        let mut tasks = self.store.load_tasks().await?;
        if tasks.iter().all(|t| t.order.is_some()) {
            return Ok(tasks);
        }

        {
            let _gate = self.gate.lock().await;
            let _guard = self.store.begin_write().await?;
            // another writer may have assigned them while we waited
            tasks = self.store.load_tasks().await?;
            if !order::assign_default_orders(&mut tasks) {
                return Ok(tasks);
            }
            tracing::info!(count = tasks.len(), "assigned default order keys");
            self.persist(&tasks).await?;
        }
        self.scheduler.rearm().await;
        Ok(tasks)
    }

    pub async fn statistics(&self) -> Result<TaskStatistics, ServiceError> {
        let tasks = self.get_tasks().await?;
        Ok(stats::calculate_now(&tasks))
    }

    /// Settings for a view, or the defaults when none were saved
    pub async fn get_settings(&self, view: ViewType) -> Result<ViewSettings, ServiceError> {
        let settings = self.store.load_settings(view).await?;
        Ok(settings.unwrap_or_else(|| ViewSettings {
            hide_completed: self.config.general.hide_completed,
            ..Default::default()
        }))
    }

    pub async fn save_settings(
        &self,
        view: ViewType,
        settings: ViewSettings,
    ) -> Result<(), ServiceError> {
        self.store.save_settings(view, &settings).await?;
        let _ = self.events.send(PanelEvent::SettingsChanged {
            view_type: view,
            settings,
        });
        Ok(())
    }

    /// Pick up changes written by someone else: broadcast the current tasks
    /// and re-arm the scheduler. Skipped when the stored tasks equal `known`,
    /// the last collection this process broadcast, which filters out the
    /// file watcher's echo of our own writes.
    pub async fn reload_if_changed(&self, known: &[Task]) -> Result<Option<Vec<Task>>, ServiceError> {
        let tasks = self.get_tasks().await?;
        if tasks == known {
            return Ok(None);
        }
        let _ = self.events.send(PanelEvent::TasksChanged {
            tasks: tasks.clone(),
        });
        self.scheduler.rearm().await;
        Ok(Some(tasks))
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Run one read-modify-write cycle. Nothing is written if `apply` fails.
    async fn mutate<T, F>(&self, apply: F) -> Result<(T, Vec<Task>), ServiceError>
    where
        T: Send,
        F: FnOnce(&mut Vec<Task>) -> Result<T, ServiceError> + Send,
    {
        let result = {
            let _gate = self.gate.lock().await;
            let _guard = self.store.begin_write().await?;
            let mut tasks = self.store.load_tasks().await?;
            order::assign_default_orders(&mut tasks);
            let value = apply(&mut tasks)?;
            self.persist(&tasks).await?;
            let _ = self.events.send(PanelEvent::TasksChanged {
                tasks: tasks.clone(),
            });
            (value, tasks)
        };
        self.scheduler.rearm().await;
        Ok(result)
    }

    async fn persist(&self, tasks: &[Task]) -> Result<(), ServiceError> {
        self.store.save_tasks(tasks).await.map_err(|e| {
            tracing::error!(error = %e, "could not save tasks");
            ServiceError::from(e)
        })
    }

    /// Returns the created task
    pub async fn add_task(&self, new: NewTask) -> Result<Task, ServiceError> {
        let default_priority = self.config.general.default_priority;
        let now = self.clock.now_ms();
        let (task, _) = self
            .mutate(move |tasks| {
                let id = task_ops::add_task(tasks, new, default_priority, now)?;
                let task = task_ops::find_task(tasks, &id).cloned();
                Ok(task.ok_or(TaskError::NotFound(id))?)
            })
            .await?;
        tracing::debug!(id = %task.id, "task added");
        Ok(task)
    }

    pub async fn update_status(&self, id: &str, status: Status) -> Result<Vec<Task>, ServiceError> {
        self.run(|tasks| task_ops::set_status(tasks, id, status)).await
    }

    pub async fn update_priority(
        &self,
        id: &str,
        priority: Priority,
    ) -> Result<Vec<Task>, ServiceError> {
        self.run(|tasks| task_ops::set_priority(tasks, id, priority)).await
    }

    pub async fn update_text(&self, id: &str, text: &str) -> Result<Vec<Task>, ServiceError> {
        self.run(|tasks| task_ops::set_text(tasks, id, text)).await
    }

    pub async fn update_description(
        &self,
        id: &str,
        description: &str,
    ) -> Result<Vec<Task>, ServiceError> {
        self.run(|tasks| task_ops::set_description(tasks, id, description))
            .await
    }

    pub async fn update_due_date(
        &self,
        id: &str,
        due_date: Option<i64>,
    ) -> Result<Vec<Task>, ServiceError> {
        self.run(|tasks| task_ops::set_due_date(tasks, id, due_date))
            .await
    }

    /// Replace a task's reminders. The scheduler is re-armed before this
    /// returns.
    pub async fn update_reminders(
        &self,
        id: &str,
        reminders: Vec<i64>,
    ) -> Result<Vec<Task>, ServiceError> {
        self.run(move |tasks| task_ops::set_reminders(tasks, id, reminders))
            .await
    }

    /// Add reminders to whatever the task has at write time, in one cycle,
    /// so a reminder fired in between is not written back.
    pub async fn add_reminders(&self, id: &str, more: &[i64]) -> Result<Vec<Task>, ServiceError> {
        self.run(|tasks| task_ops::add_reminders(tasks, id, more)).await
    }

    /// Apply a batch of order keys in one write. Any non-finite key rejects
    /// the whole batch.
    pub async fn update_orders(&self, orders: &[OrderUpdate]) -> Result<Vec<Task>, ServiceError> {
        let (missing, tasks) = self
            .mutate(|tasks| Ok(task_ops::apply_orders(tasks, orders)?))
            .await?;
        for id in missing {
            tracing::warn!(%id, "order update for unknown task skipped");
        }
        Ok(tasks)
    }

    /// Drag-and-drop: move the task into the target group and give it a key
    /// between its new neighbors, renumbering the group if needed.
    pub async fn move_task(&self, id: &str, to: &MoveTo) -> Result<Vec<Task>, ServiceError> {
        let (renumbered, tasks) = self
            .mutate(|tasks| {
                let task = task_ops::find_task(tasks, id)
                    .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
                let target = to.target_for(task);
                let plan = order::plan_drop(tasks, id, &target)?;
                if let Some(task) = task_ops::find_task_mut(tasks, id) {
                    plan.group.apply_to(task);
                }
                task_ops::apply_orders(tasks, &plan.orders)?;
                Ok(plan.renumbered())
            })
            .await?;
        if renumbered {
            tracing::debug!(%id, "order keys exhausted, group renumbered");
        }
        Ok(tasks)
    }

    /// Returns the deleted task
    pub async fn delete_task(&self, id: &str) -> Result<Task, ServiceError> {
        let (task, _) = self
            .mutate(|tasks| Ok(task_ops::delete_task(tasks, id)?))
            .await?;
        Ok(task)
    }

    /// Returns the new subtask's ID
    pub async fn add_subtask(&self, task_id: &str, text: &str) -> Result<String, ServiceError> {
        let (id, _) = self
            .mutate(|tasks| Ok(task_ops::add_subtask(tasks, task_id, text)?))
            .await?;
        Ok(id)
    }

    /// Returns the subtask's new completed flag
    pub async fn toggle_subtask(&self, task_id: &str, subtask_id: &str) -> Result<bool, ServiceError> {
        let (done, _) = self
            .mutate(|tasks| Ok(task_ops::toggle_subtask(tasks, task_id, subtask_id)?))
            .await?;
        Ok(done)
    }

    pub async fn delete_subtask(
        &self,
        task_id: &str,
        subtask_id: &str,
    ) -> Result<Vec<Task>, ServiceError> {
        self.run(|tasks| task_ops::delete_subtask(tasks, task_id, subtask_id))
            .await
    }

    pub async fn update_subtask_text(
        &self,
        task_id: &str,
        subtask_id: &str,
        text: &str,
    ) -> Result<Vec<Task>, ServiceError> {
        self.run(|tasks| task_ops::set_subtask_text(tasks, task_id, subtask_id, text))
            .await
    }

    async fn run<F>(&self, apply: F) -> Result<Vec<Task>, ServiceError>
    where
        F: FnOnce(&mut Vec<Task>) -> Result<(), TaskError> + Send,
    {
        let ((), tasks) = self.mutate(|tasks| Ok(apply(tasks)?)).await?;
        Ok(tasks)
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Handle one panel command. Failures become [`Response::Error`].
    pub async fn handle(&self, command: Command) -> Response {
        match self.dispatch(command).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "command failed");
                Response::Error {
                    message: e.to_string(),
                }
            }
        }
    }

    async fn dispatch(&self, command: Command) -> Result<Response, ServiceError> {
        let tasks = match command {
            Command::Ready { view_type } => {
                let settings = self.get_settings(view_type).await?;
                let tasks = self.get_tasks().await?;
                return Ok(Response::UpdateTasks {
                    tasks,
                    settings: Some(settings),
                });
            }
            Command::UpdateSettings {
                view_type,
                settings,
            } => {
                self.save_settings(view_type, settings.clone()).await?;
                let tasks = self.get_tasks().await?;
                return Ok(Response::UpdateTasks {
                    tasks,
                    settings: Some(settings),
                });
            }
            Command::AddTask { value } => {
                self.add_task(value).await?;
                self.get_tasks().await?
            }
            Command::UpdateStatus { id, status } => self.update_status(&id, status).await?,
            Command::UpdatePriority { id, priority } => {
                self.update_priority(&id, priority).await?
            }
            Command::UpdateTaskText { id, text } => self.update_text(&id, &text).await?,
            Command::UpdateDescription { id, description } => {
                self.update_description(&id, &description).await?
            }
            Command::UpdateDueDate { id, due_date } => self.update_due_date(&id, due_date).await?,
            Command::UpdateReminders { id, reminders } => {
                self.update_reminders(&id, reminders).await?
            }
            Command::UpdateOrders { orders } => self.update_orders(&orders).await?,
            Command::MoveTask {
                id,
                group_by,
                status,
                priority,
                before,
            } => {
                let to = MoveTo {
                    group_by,
                    status,
                    priority,
                    before,
                };
                self.move_task(&id, &to).await?
            }
            Command::DeleteTask { id } => {
                self.delete_task(&id).await?;
                self.get_tasks().await?
            }
            Command::AddSubtask { task_id, text } => {
                self.add_subtask(&task_id, &text).await?;
                self.get_tasks().await?
            }
            Command::ToggleSubtask {
                task_id,
                subtask_id,
            } => {
                self.toggle_subtask(&task_id, &subtask_id).await?;
                self.get_tasks().await?
            }
            Command::DeleteSubtask {
                task_id,
                subtask_id,
            } => self.delete_subtask(&task_id, &subtask_id).await?,
            Command::UpdateSubtaskText {
                task_id,
                subtask_id,
                text,
            } => {
                self.update_subtask_text(&task_id, &subtask_id, &text)
                    .await?
            }
        };
        Ok(Response::UpdateTasks {
            tasks,
            settings: None,
        })
    }
}
