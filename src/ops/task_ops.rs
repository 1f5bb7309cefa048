use rand::Rng;

use crate::model::message::{NewTask, OrderUpdate};
use crate::model::task::{Priority, Status, SubTask, Task};
use crate::ops::order;

/// Length of generated task and subtask IDs
const ID_LEN: usize = 9;
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Error type for task operations
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("subtask {subtask} not found on task {task}")]
    SubtaskNotFound { task: String, subtask: String },
    #[error("task text cannot be empty")]
    EmptyText,
    #[error("invalid order for {id}: {order}")]
    InvalidOrder { id: String, order: f64 },
}

/// Generate a fresh random ID (lowercase base-36)
pub fn new_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

fn clean_text(text: &str) -> Result<String, TaskError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(TaskError::EmptyText);
    }
    Ok(trimmed.to_string())
}

/// Sort and de-duplicate a reminder list
pub fn normalize_reminders(mut reminders: Vec<i64>) -> Vec<i64> {
    reminders.sort_unstable();
    reminders.dedup();
    reminders
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

pub fn find_task<'a>(tasks: &'a [Task], id: &str) -> Option<&'a Task> {
    tasks.iter().find(|t| t.id == id)
}

pub fn find_task_mut<'a>(tasks: &'a mut [Task], id: &str) -> Option<&'a mut Task> {
    tasks.iter_mut().find(|t| t.id == id)
}

fn require_task<'a>(tasks: &'a mut [Task], id: &str) -> Result<&'a mut Task, TaskError> {
    find_task_mut(tasks, id).ok_or_else(|| TaskError::NotFound(id.to_string()))
}

fn require_subtask<'a>(task: &'a mut Task, subtask_id: &str) -> Result<&'a mut SubTask, TaskError> {
    let task_id = task.id.clone();
    task.subtasks
        .iter_mut()
        .find(|s| s.id == subtask_id)
        .ok_or(TaskError::SubtaskNotFound {
            task: task_id,
            subtask: subtask_id.to_string(),
        })
}

// ---------------------------------------------------------------------------
// Task CRUD
// ---------------------------------------------------------------------------

/// Append a new task after every existing one in custom order.
/// Returns the assigned ID.
pub fn add_task(
    tasks: &mut Vec<Task>,
    new: NewTask,
    default_priority: Priority,
    now: i64,
) -> Result<String, TaskError> {
    let text = clean_text(&new.text)?;
    let id = new_id();
    let mut task = Task::new(
        id.clone(),
        text,
        new.priority.unwrap_or(default_priority),
        new.status.unwrap_or(Status::Todo),
        now,
    );
    task.description = new.description.filter(|d| !d.trim().is_empty());
    task.due_date = new.due_date;
    task.reminders = normalize_reminders(new.reminders);
    task.order = Some(order::next_order(tasks));
    tasks.push(task);
    Ok(id)
}

pub fn delete_task(tasks: &mut Vec<Task>, id: &str) -> Result<Task, TaskError> {
    let index = tasks
        .iter()
        .position(|t| t.id == id)
        .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
    Ok(tasks.remove(index))
}

pub fn set_status(tasks: &mut [Task], id: &str, status: Status) -> Result<(), TaskError> {
    require_task(tasks, id)?.set_status(status);
    Ok(())
}

pub fn set_priority(tasks: &mut [Task], id: &str, priority: Priority) -> Result<(), TaskError> {
    require_task(tasks, id)?.priority = priority;
    Ok(())
}

/// Retitle a task. Empty or whitespace-only text is rejected.
pub fn set_text(tasks: &mut [Task], id: &str, text: &str) -> Result<(), TaskError> {
    let text = clean_text(text)?;
    require_task(tasks, id)?.text = text;
    Ok(())
}

/// Set the description; an empty string clears it.
pub fn set_description(tasks: &mut [Task], id: &str, description: &str) -> Result<(), TaskError> {
    let task = require_task(tasks, id)?;
    task.description = if description.trim().is_empty() {
        None
    } else {
        Some(description.to_string())
    };
    Ok(())
}

pub fn set_due_date(tasks: &mut [Task], id: &str, due_date: Option<i64>) -> Result<(), TaskError> {
    require_task(tasks, id)?.due_date = due_date;
    Ok(())
}

/// Replace a task's reminders wholesale
pub fn set_reminders(tasks: &mut [Task], id: &str, reminders: Vec<i64>) -> Result<(), TaskError> {
    require_task(tasks, id)?.reminders = normalize_reminders(reminders);
    Ok(())
}

/// Merge more reminders into a task's current set
pub fn add_reminders(tasks: &mut [Task], id: &str, more: &[i64]) -> Result<(), TaskError> {
    let task = require_task(tasks, id)?;
    let mut reminders = std::mem::take(&mut task.reminders);
    reminders.extend_from_slice(more);
    task.reminders = normalize_reminders(reminders);
    Ok(())
}

/// Apply a batch of order-key reassignments.
///
/// Every key is validated before any is written, so a bad entry leaves the
/// collection untouched. Unknown IDs are skipped and returned.
pub fn apply_orders(tasks: &mut [Task], orders: &[OrderUpdate]) -> Result<Vec<String>, TaskError> {
    if let Some(bad) = orders.iter().find(|o| !o.order.is_finite()) {
        return Err(TaskError::InvalidOrder {
            id: bad.id.clone(),
            order: bad.order,
        });
    }

    let mut missing = Vec::new();
    for update in orders {
        match find_task_mut(tasks, &update.id) {
            Some(task) => task.order = Some(update.order),
            None => missing.push(update.id.clone()),
        }
    }
    Ok(missing)
}

// ---------------------------------------------------------------------------
// Subtasks
// ---------------------------------------------------------------------------

/// Returns the assigned subtask ID.
pub fn add_subtask(tasks: &mut [Task], task_id: &str, text: &str) -> Result<String, TaskError> {
    let text = clean_text(text)?;
    let task = require_task(tasks, task_id)?;
    let id = new_id();
    task.subtasks.push(SubTask {
        id: id.clone(),
        text,
        completed: false,
    });
    Ok(id)
}

/// Flip a subtask's completed flag, returning the new value.
pub fn toggle_subtask(tasks: &mut [Task], task_id: &str, subtask_id: &str) -> Result<bool, TaskError> {
    let task = require_task(tasks, task_id)?;
    let sub = require_subtask(task, subtask_id)?;
    sub.completed = !sub.completed;
    Ok(sub.completed)
}

pub fn delete_subtask(tasks: &mut [Task], task_id: &str, subtask_id: &str) -> Result<(), TaskError> {
    let task = require_task(tasks, task_id)?;
    let before = task.subtasks.len();
    task.subtasks.retain(|s| s.id != subtask_id);
    if task.subtasks.len() == before {
        return Err(TaskError::SubtaskNotFound {
            task: task_id.to_string(),
            subtask: subtask_id.to_string(),
        });
    }
    Ok(())
}

pub fn set_subtask_text(
    tasks: &mut [Task],
    task_id: &str,
    subtask_id: &str,
    text: &str,
) -> Result<(), TaskError> {
    let text = clean_text(text)?;
    let task = require_task(tasks, task_id)?;
    require_subtask(task, subtask_id)?.text = text;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_tasks() -> Vec<Task> {
        let mut a = Task::new("t1".into(), "First".into(), Priority::Must, Status::Todo, 10);
        a.order = Some(1000.0);
        let mut b = Task::new("t2".into(), "Second".into(), Priority::Could, Status::InProgress, 20);
        b.order = Some(2000.0);
        b.subtasks.push(SubTask {
            id: "s1".into(),
            text: "Sub one".into(),
            completed: false,
        });
        vec![a, b]
    }

    #[test]
    fn test_new_id_shape() {
        let id = new_id();
        assert_eq!(id.len(), ID_LEN);
        assert!(id.bytes().all(|b| ID_ALPHABET.contains(&b)));
        assert_ne!(new_id(), new_id());
    }

    #[test]
    fn test_add_task_appends_with_next_order() {
        let mut tasks = sample_tasks();
        let id = add_task(
            &mut tasks,
            NewTask {
                text: "  Third  ".into(),
                reminders: vec![30, 10, 30],
                ..Default::default()
            },
            Priority::Should,
            99,
        )
        .unwrap();
        let task = find_task(&tasks, &id).unwrap();
        assert_eq!(task.text, "Third");
        assert_eq!(task.priority, Priority::Should);
        assert_eq!(task.status, Status::Todo);
        assert_eq!(task.order, Some(3000.0));
        assert_eq!(task.created_at, 99);
        assert_eq!(task.reminders, vec![10, 30]);
    }

    #[test]
    fn test_add_task_into_empty_list() {
        let mut tasks = Vec::new();
        add_task(
            &mut tasks,
            NewTask {
                text: "Only".into(),
                status: Some(Status::Done),
                ..Default::default()
            },
            Priority::Must,
            1,
        )
        .unwrap();
        assert_eq!(tasks[0].order, Some(1000.0));
        assert!(tasks[0].completed);
    }

    #[test]
    fn test_add_task_rejects_empty_text() {
        let mut tasks = sample_tasks();
        let err = add_task(
            &mut tasks,
            NewTask {
                text: "   ".into(),
                ..Default::default()
            },
            Priority::Should,
            1,
        )
        .unwrap_err();
        assert_eq!(err, TaskError::EmptyText);
        assert_eq!(tasks.len(), 2);
    }

    #[test]
    fn test_set_text() {
        let mut tasks = sample_tasks();
        set_text(&mut tasks, "t1", " Renamed ").unwrap();
        assert_eq!(tasks[0].text, "Renamed");
        assert_eq!(set_text(&mut tasks, "t1", ""), Err(TaskError::EmptyText));
        assert_eq!(tasks[0].text, "Renamed");
        assert_eq!(
            set_text(&mut tasks, "nope", "x"),
            Err(TaskError::NotFound("nope".into()))
        );
    }

    #[test]
    fn test_set_status_and_priority() {
        let mut tasks = sample_tasks();
        set_status(&mut tasks, "t1", Status::Done).unwrap();
        assert!(tasks[0].completed);
        set_priority(&mut tasks, "t1", Priority::Wont).unwrap();
        assert_eq!(tasks[0].priority, Priority::Wont);
    }

    #[test]
    fn test_description_and_due_date() {
        let mut tasks = sample_tasks();
        set_description(&mut tasks, "t1", "details").unwrap();
        assert_eq!(tasks[0].description.as_deref(), Some("details"));
        set_description(&mut tasks, "t1", "").unwrap();
        assert!(tasks[0].description.is_none());

        set_due_date(&mut tasks, "t1", Some(5)).unwrap();
        assert_eq!(tasks[0].due_date, Some(5));
        set_due_date(&mut tasks, "t1", None).unwrap();
        assert!(tasks[0].due_date.is_none());
    }

    #[test]
    fn test_set_reminders_replaces() {
        let mut tasks = sample_tasks();
        set_reminders(&mut tasks, "t2", vec![3, 1]).unwrap();
        assert_eq!(tasks[1].reminders, vec![1, 3]);
        set_reminders(&mut tasks, "t2", vec![]).unwrap();
        assert!(tasks[1].reminders.is_empty());
    }

    #[test]
    fn test_add_reminders_merges() {
        let mut tasks = sample_tasks();
        set_reminders(&mut tasks, "t2", vec![5]).unwrap();
        add_reminders(&mut tasks, "t2", &[9, 1, 5]).unwrap();
        assert_eq!(tasks[1].reminders, vec![1, 5, 9]);
        assert!(matches!(
            add_reminders(&mut tasks, "nope", &[1]),
            Err(TaskError::NotFound(_))
        ));
    }

    #[test]
    fn test_apply_orders_batch() {
        let mut tasks = sample_tasks();
        let missing = apply_orders(
            &mut tasks,
            &[
                OrderUpdate { id: "t1".into(), order: 2500.0 },
                OrderUpdate { id: "ghost".into(), order: 1.0 },
            ],
        )
        .unwrap();
        assert_eq!(missing, vec!["ghost".to_string()]);
        assert_eq!(tasks[0].order, Some(2500.0));
    }

    #[test]
    fn test_apply_orders_rejects_non_finite_atomically() {
        let mut tasks = sample_tasks();
        let err = apply_orders(
            &mut tasks,
            &[
                OrderUpdate { id: "t1".into(), order: 5.0 },
                OrderUpdate { id: "t2".into(), order: f64::NAN },
            ],
        )
        .unwrap_err();
        assert!(matches!(err, TaskError::InvalidOrder { ref id, .. } if id == "t2"));
        assert_eq!(tasks[0].order, Some(1000.0));
    }

    #[test]
    fn test_delete_task() {
        let mut tasks = sample_tasks();
        let removed = delete_task(&mut tasks, "t1").unwrap();
        assert_eq!(removed.id, "t1");
        assert_eq!(tasks.len(), 1);
        assert!(delete_task(&mut tasks, "t1").is_err());
    }

    #[test]
    fn test_subtask_lifecycle() {
        let mut tasks = sample_tasks();
        let sid = add_subtask(&mut tasks, "t1", "Check logs").unwrap();
        assert_eq!(tasks[0].subtasks.len(), 1);

        assert!(toggle_subtask(&mut tasks, "t1", &sid).unwrap());
        assert!(!toggle_subtask(&mut tasks, "t1", &sid).unwrap());

        set_subtask_text(&mut tasks, "t1", &sid, "Check all logs").unwrap();
        assert_eq!(tasks[0].subtasks[0].text, "Check all logs");

        delete_subtask(&mut tasks, "t1", &sid).unwrap();
        assert!(tasks[0].subtasks.is_empty());
        assert_eq!(
            delete_subtask(&mut tasks, "t1", &sid),
            Err(TaskError::SubtaskNotFound {
                task: "t1".into(),
                subtask: sid.clone()
            })
        );
    }

    #[test]
    fn test_subtask_missing_parent_or_child() {
        let mut tasks = sample_tasks();
        assert!(matches!(
            toggle_subtask(&mut tasks, "t2", "nope"),
            Err(TaskError::SubtaskNotFound { .. })
        ));
        assert_eq!(
            add_subtask(&mut tasks, "ghost", "x"),
            Err(TaskError::NotFound("ghost".into()))
        );
        assert_eq!(add_subtask(&mut tasks, "t2", " "), Err(TaskError::EmptyText));
    }
}
