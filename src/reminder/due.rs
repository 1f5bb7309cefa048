use crate::model::task::Task;

/// Reminders removed from one task during a firing cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueReminders {
    pub task_id: String,
    pub reminders: Vec<i64>,
}

/// Soonest reminder across all tasks that is later than `now - tolerance_ms`.
///
/// The tolerance keeps a reminder that became due moments before arming
/// from being skipped. `None` means there is nothing to wait for.
pub fn next_wake(tasks: &[Task], now: i64, tolerance_ms: u32) -> Option<i64> {
    let floor = now.saturating_sub(i64::from(tolerance_ms));
    tasks
        .iter()
        .flat_map(|t| t.reminders.iter().copied())
        .filter(|&r| r > floor)
        .min()
}

/// Remove every reminder at or before `now + grace_ms` and report what was
/// removed, one entry per affected task in collection order.
pub fn take_due(tasks: &mut [Task], now: i64, grace_ms: u32) -> Vec<DueReminders> {
    let cutoff = now.saturating_add(i64::from(grace_ms));
    let mut fired = Vec::new();
    for task in tasks.iter_mut() {
        if !task.reminders.iter().any(|&r| r <= cutoff) {
            continue;
        }
        let (due, pending): (Vec<i64>, Vec<i64>) =
            task.reminders.iter().partition(|&&r| r <= cutoff);
        task.reminders = pending;
        fired.push(DueReminders {
            task_id: task.id.clone(),
            reminders: due,
        });
    }
    fired
}
