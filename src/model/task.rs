use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Task priority (MoSCoW)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Must,
    Should,
    Could,
    #[serde(alias = "Won't")]
    Wont,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Must,
        Priority::Should,
        Priority::Could,
        Priority::Wont,
    ];

    /// Position in priority sort order (Must first)
    pub fn rank(self) -> usize {
        match self {
            Priority::Must => 0,
            Priority::Should => 1,
            Priority::Could => 2,
            Priority::Wont => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Must => "Must",
            Priority::Should => "Should",
            Priority::Could => "Could",
            Priority::Wont => "Wont",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "must" => Ok(Priority::Must),
            "should" => Ok(Priority::Should),
            "could" => Ok(Priority::Could),
            "wont" | "won't" => Ok(Priority::Wont),
            _ => Err(format!(
                "invalid priority '{}' (expected must, should, could, wont)",
                s
            )),
        }
    }
}

/// Workflow status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Todo,
    Ready,
    #[serde(rename = "In Progress")]
    InProgress,
    Testing,
    Done,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Todo,
        Status::Ready,
        Status::InProgress,
        Status::Testing,
        Status::Done,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Todo => "Todo",
            Status::Ready => "Ready",
            Status::InProgress => "In Progress",
            Status::Testing => "Testing",
            Status::Done => "Done",
        }
    }

    /// The character shown inside the list checkbox
    pub fn checkbox_char(self) -> char {
        match self {
            Status::Todo => ' ',
            Status::Ready => '.',
            Status::InProgress => '>',
            Status::Testing => '?',
            Status::Done => 'x',
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_ascii_lowercase();
        match norm.as_str() {
            "todo" => Ok(Status::Todo),
            "ready" => Ok(Status::Ready),
            "inprogress" | "active" => Ok(Status::InProgress),
            "testing" => Ok(Status::Testing),
            "done" => Ok(Status::Done),
            _ => Err(format!(
                "invalid status '{}' (expected todo, ready, in-progress, testing, done)",
                s
            )),
        }
    }
}

/// A checklist entry under a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTask {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

/// A task as persisted in `tasks.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Opaque identifier, immutable after creation
    pub id: String,
    /// Title text (never empty)
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub priority: Priority,
    pub status: Status,
    /// Due date as epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<i64>,
    /// Pending reminder timestamps (epoch ms), sorted ascending
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reminders: Vec<i64>,
    /// Mirrors `status == Done`
    #[serde(default)]
    pub completed: bool,
    /// Creation time as epoch milliseconds
    #[serde(default)]
    pub created_at: i64,
    /// Custom sort key. `None` only for legacy data that has not been loaded yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<SubTask>,
}

impl Task {
    /// Create a task with default fields
    pub fn new(id: String, text: String, priority: Priority, status: Status, created_at: i64) -> Self {
        Task {
            id,
            text,
            description: None,
            priority,
            status,
            due_date: None,
            reminders: Vec::new(),
            completed: status == Status::Done,
            created_at,
            order: None,
            subtasks: Vec::new(),
        }
    }

    /// Order key used for sorting; missing keys sort as 0
    pub fn order_key(&self) -> f64 {
        self.order.unwrap_or(0.0)
    }

    pub fn set_status(&mut self, status: Status) {
        self.status = status;
        self.completed = status == Status::Done;
    }
}
