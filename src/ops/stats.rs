use chrono::{DateTime, Local, NaiveDate, TimeZone};
use serde::Serialize;

use crate::model::task::{Priority, Status, Task};

/// Counters shown in the panel header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatistics {
    pub total: usize,
    pub done: usize,
    pub must: usize,
    pub in_progress: usize,
    pub overdue: usize,
}

/// Compute statistics relative to `today` (local calendar day).
///
/// A task is overdue when it is not done and its due date falls on a day
/// before `today`. A task due later today is not overdue.
pub fn calculate<Tz: TimeZone>(tasks: &[Task], today: NaiveDate, tz: &Tz) -> TaskStatistics {
    let mut stats = TaskStatistics {
        total: tasks.len(),
        ..Default::default()
    };
    for task in tasks {
        if task.status == Status::Done {
            stats.done += 1;
        }
        if task.priority == Priority::Must {
            stats.must += 1;
        }
        if task.status == Status::InProgress {
            stats.in_progress += 1;
        }
        if task.status != Status::Done
            && let Some(due) = task.due_date.and_then(|ms| tz.timestamp_millis_opt(ms).single())
            && due.date_naive() < today
        {
            stats.overdue += 1;
        }
    }
    stats
}

/// Statistics relative to the current local day
pub fn calculate_now(tasks: &[Task]) -> TaskStatistics {
    let now: DateTime<Local> = Local::now();
    calculate(tasks, now.date_naive(), &Local)
}
