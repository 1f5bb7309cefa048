use std::cmp::Ordering;

use crate::model::message::OrderUpdate;
use crate::model::settings::{GroupBy, SortBy};
use crate::model::task::{Priority, Status, Task};

/// Distance between adjacent keys at the group boundaries and after
/// renumbering. A move computes one new key from its neighbors; only when
/// they leave no representable midpoint is the group renumbered.
pub const ORDER_STEP: f64 = 1000.0;

/// Error type for order-key operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderError {
    #[error("no distinct order key between {prev} and {next}")]
    Exhausted { prev: f64, next: f64 },
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("drop target {0} is not in the target group")]
    NotInGroup(String),
}

// ---------------------------------------------------------------------------
// Key arithmetic
// ---------------------------------------------------------------------------

/// Midpoint between two neighboring keys.
///
/// Panics if `prev >= next` (or either is NaN): the caller must hand in
/// neighbors in ascending order. Returns [`OrderError::Exhausted`] when the
/// two keys are too close for a distinct midpoint; the caller then renumbers.
pub fn insert_between(prev: f64, next: f64) -> Result<f64, OrderError> {
    assert!(
        prev < next,
        "insert_between requires prev < next (got {} and {})",
        prev,
        next
    );
    let mid = prev + (next - prev) / 2.0;
    if prev < mid && mid < next {
        Ok(mid)
    } else {
        Err(OrderError::Exhausted { prev, next })
    }
}

/// Key for a task dropped before the first task of a group
pub fn insert_at_start(first: f64) -> f64 {
    first - ORDER_STEP
}

/// Key for a task dropped after the last task of a group
pub fn insert_at_end(last: f64) -> f64 {
    last + ORDER_STEP
}

/// Key for a task dropped into a group with no other tasks
pub fn insert_into_empty_group() -> f64 {
    ORDER_STEP
}

/// Assign `(i + 1) * ORDER_STEP` to the ids in the given sequence.
pub fn renumber(ids: &[&str]) -> Vec<OrderUpdate> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| OrderUpdate {
            id: id.to_string(),
            order: (i + 1) as f64 * ORDER_STEP,
        })
        .collect()
}

/// Give every task without an order key `(position + 1) * ORDER_STEP`.
/// Returns true if any task changed.
pub fn assign_default_orders(tasks: &mut [Task]) -> bool {
    let mut changed = false;
    for (i, task) in tasks.iter_mut().enumerate() {
        if task.order.is_none() {
            task.order = Some((i + 1) as f64 * ORDER_STEP);
            changed = true;
        }
    }
    changed
}

/// Key for a task appended to the end of the whole list
pub fn next_order(tasks: &[Task]) -> f64 {
    tasks
        .iter()
        .map(Task::order_key)
        .reduce(f64::max)
        .map_or_else(insert_into_empty_group, insert_at_end)
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

/// Custom order: key ascending, then newest first
fn compare_custom(a: &Task, b: &Task) -> Ordering {
    a.order_key()
        .total_cmp(&b.order_key())
        .then_with(|| b.created_at.cmp(&a.created_at))
}

/// Compare two tasks for display under the given sort mode.
/// Every mode falls back to custom order.
pub fn compare_tasks(a: &Task, b: &Task, sort_by: SortBy) -> Ordering {
    let primary = match sort_by {
        SortBy::Custom => Ordering::Equal,
        SortBy::Priority => a.priority.rank().cmp(&b.priority.rank()),
        SortBy::DueDate => match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortBy::Title => a.text.to_lowercase().cmp(&b.text.to_lowercase()),
    };
    primary.then_with(|| compare_custom(a, b))
}

pub fn sort_tasks(tasks: &mut [Task], sort_by: SortBy) {
    tasks.sort_by(|a, b| compare_tasks(a, b, sort_by));
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

/// A bucket of tasks under a grouping mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    Status(Status),
    Priority(Priority),
    All,
}

impl Group {
    pub fn contains(self, task: &Task) -> bool {
        match self {
            Group::Status(s) => task.status == s,
            Group::Priority(p) => task.priority == p,
            Group::All => true,
        }
    }

    /// Move `task` into this group. Returns true if the task changed.
    pub fn apply_to(self, task: &mut Task) -> bool {
        match self {
            Group::Status(s) if task.status != s => {
                task.set_status(s);
                true
            }
            Group::Priority(p) if task.priority != p => {
                task.priority = p;
                true
            }
            _ => false,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Group::Status(s) => s.as_str(),
            Group::Priority(p) => p.as_str(),
            Group::All => "All",
        }
    }

    /// Every group for a grouping mode, in display order
    pub fn all(group_by: GroupBy) -> Vec<Group> {
        match group_by {
            GroupBy::Status => Status::ALL.into_iter().map(Group::Status).collect(),
            GroupBy::Priority => Priority::ALL.into_iter().map(Group::Priority).collect(),
            GroupBy::None => vec![Group::All],
        }
    }
}

pub fn group_of(task: &Task, group_by: GroupBy) -> Group {
    match group_by {
        GroupBy::Status => Group::Status(task.status),
        GroupBy::Priority => Group::Priority(task.priority),
        GroupBy::None => Group::All,
    }
}

/// Split tasks into display sections. Empty groups are kept so a host can
/// still offer them as drop targets.
pub fn sections(tasks: &[Task], group_by: GroupBy, sort_by: SortBy) -> Vec<(Group, Vec<&Task>)> {
    Group::all(group_by)
        .into_iter()
        .map(|group| {
            let mut members: Vec<&Task> = tasks.iter().filter(|t| group.contains(t)).collect();
            members.sort_by(|a, b| compare_tasks(a, b, sort_by));
            (group, members)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Drag-and-drop
// ---------------------------------------------------------------------------

/// Where a dragged task lands
#[derive(Debug, Clone, PartialEq)]
pub struct DropTarget {
    pub group: Group,
    /// Task the dragged task is placed in front of; `None` means the end of the group
    pub before: Option<String>,
}

/// Mutations needed to carry out a drop
#[derive(Debug, Clone, PartialEq)]
pub struct DropPlan {
    /// Group the dragged task must be moved into before its key applies
    pub group: Group,
    /// New keys: one entry normally, the whole group after a renumbering
    pub orders: Vec<OrderUpdate>,
}

impl DropPlan {
    pub fn renumbered(&self) -> bool {
        self.orders.len() > 1
    }
}

/// Work out the key (or keys) for dropping `task_id` at `target`.
///
/// Neighbors are looked up only among the tasks of the target group in
/// custom order, with the dragged task left out. Tied or exhausted
/// neighbors fall back to renumbering the whole group.
pub fn plan_drop(tasks: &[Task], task_id: &str, target: &DropTarget) -> Result<DropPlan, OrderError> {
    if !tasks.iter().any(|t| t.id == task_id) {
        return Err(OrderError::NotFound(task_id.to_string()));
    }

    let mut group: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.id != task_id && target.group.contains(t))
        .collect();
    group.sort_by(|a, b| compare_custom(a, b));

    let position = match &target.before {
        Some(before) => group
            .iter()
            .position(|t| t.id == *before)
            .ok_or_else(|| OrderError::NotInGroup(before.clone()))?,
        None => group.len(),
    };

    let key = if group.is_empty() {
        Some(insert_into_empty_group())
    } else if position == group.len() {
        Some(insert_at_end(group[position - 1].order_key()))
    } else if position == 0 {
        Some(insert_at_start(group[0].order_key()))
    } else {
        let prev = group[position - 1].order_key();
        let next = group[position].order_key();
        if prev < next {
            insert_between(prev, next).ok()
        } else {
            None
        }
    };

    let orders = match key {
        Some(order) => vec![OrderUpdate {
            id: task_id.to_string(),
            order,
        }],
        None => {
            let mut ids: Vec<&str> = group.iter().map(|t| t.id.as_str()).collect();
            ids.insert(position, task_id);
            renumber(&ids)
        }
    };

    Ok(DropPlan {
        group: target.group,
        orders,
    })
}
