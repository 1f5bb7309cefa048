use serde::{Deserialize, Serialize};

use super::settings::{GroupBy, ViewSettings, ViewType};
use super::task::{Priority, Status, Task};

/// Fields for a new task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub text: String,
    /// Falls back to the configured default priority
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<i64>,
    #[serde(default)]
    pub reminders: Vec<i64>,
}

/// One order-key reassignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub id: String,
    pub order: f64,
}

/// Inbound command from the panel. On the wire a JSON object tagged by
/// `type`; one that does not deserialize is rejected before anything is
/// mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Command {
    AddTask {
        value: NewTask,
    },
    UpdateStatus {
        id: String,
        status: Status,
    },
    UpdatePriority {
        id: String,
        priority: Priority,
    },
    UpdateTaskText {
        id: String,
        text: String,
    },
    UpdateDescription {
        id: String,
        description: String,
    },
    #[serde(rename_all = "camelCase")]
    UpdateDueDate {
        id: String,
        due_date: Option<i64>,
    },
    UpdateReminders {
        id: String,
        reminders: Vec<i64>,
    },
    UpdateOrders {
        orders: Vec<OrderUpdate>,
    },
    /// Drag-and-drop: move `id` into the target group, before `before`
    /// (or to the end of the group when `before` is absent).
    #[serde(rename_all = "camelCase")]
    MoveTask {
        id: String,
        #[serde(default)]
        group_by: GroupBy,
        #[serde(default)]
        status: Option<Status>,
        #[serde(default)]
        priority: Option<Priority>,
        #[serde(default)]
        before: Option<String>,
    },
    DeleteTask {
        id: String,
    },
    #[serde(rename_all = "camelCase")]
    AddSubtask {
        task_id: String,
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    ToggleSubtask {
        task_id: String,
        subtask_id: String,
    },
    #[serde(rename_all = "camelCase")]
    DeleteSubtask {
        task_id: String,
        subtask_id: String,
    },
    #[serde(rename_all = "camelCase")]
    UpdateSubtaskText {
        task_id: String,
        subtask_id: String,
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    UpdateSettings {
        #[serde(default)]
        view_type: ViewType,
        settings: ViewSettings,
    },
    #[serde(rename_all = "camelCase")]
    Ready {
        #[serde(default)]
        view_type: ViewType,
    },
}

/// Reply to a single command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Response {
    UpdateTasks {
        tasks: Vec<Task>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        settings: Option<ViewSettings>,
    },
    Error {
        message: String,
    },
}

/// Event pushed to subscribers of the task service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PanelEvent {
    /// One or more reminders of `task` came due. `task` reflects the state
    /// after the fired timestamps were removed.
    ReminderDue { task: Task, reminders: Vec<i64> },
    TasksChanged { tasks: Vec<Task> },
    #[serde(rename_all = "camelCase")]
    SettingsChanged {
        view_type: ViewType,
        settings: ViewSettings,
    },
}
