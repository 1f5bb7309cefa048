use serde::Serialize;

use crate::model::config::StatsConfig;
use crate::model::settings::ViewSettings;
use crate::model::task::{Status, Task};
use crate::ops::order::Group;
use crate::ops::stats::TaskStatistics;
use crate::util::time::format_ms;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct SectionJson<'a> {
    pub group: &'static str,
    pub collapsed: bool,
    pub tasks: Vec<&'a Task>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub must: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_progress: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overdue: Option<usize>,
}

/// Keep only the counters the config enables
pub fn stats_to_json(stats: &TaskStatistics, show: &StatsConfig) -> StatsJson {
    let pick = |enabled: bool, value: usize| enabled.then_some(value);
    StatsJson {
        total: pick(show.show_total, stats.total),
        done: pick(show.show_done, stats.done),
        must: pick(show.show_must, stats.must),
        in_progress: pick(show.show_in_progress, stats.in_progress),
        overdue: pick(show.show_overdue, stats.overdue),
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// Format a single task as a one-line summary
pub fn format_task_line(task: &Task) -> String {
    let mut line = format!(
        "[{}] {} {:<6} {}",
        task.status.checkbox_char(),
        task.id,
        task.priority.as_str(),
        task.text
    );
    if let Some(due) = task.due_date {
        line.push_str(&format!("  due {}", format_ms(due)));
    }
    if !task.reminders.is_empty() {
        line.push_str(&format!("  ({} reminder{})", task.reminders.len(), plural(task.reminders.len())));
    }
    if !task.subtasks.is_empty() {
        let done = task.subtasks.iter().filter(|s| s.completed).count();
        line.push_str(&format!("  [{}/{}]", done, task.subtasks.len()));
    }
    line
}

/// Format detailed task view
pub fn format_task_detail(task: &Task) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!("[{}] {} {}", task.status.checkbox_char(), task.id, task.text));
    lines.push(format!("status: {}", task.status));
    lines.push(format!("priority: {}", task.priority));
    if let Some(due) = task.due_date {
        lines.push(format!("due: {}", format_ms(due)));
    }
    for r in &task.reminders {
        lines.push(format!("remind: {}", format_ms(*r)));
    }
    lines.push(format!("created: {}", format_ms(task.created_at)));

    if let Some(ref description) = task.description {
        lines.push("description:".to_string());
        for line in description.lines() {
            lines.push(format!("  {}", line));
        }
    }

    if !task.subtasks.is_empty() {
        lines.push(String::new());
        lines.push("subtasks:".to_string());
        for sub in &task.subtasks {
            let mark = if sub.completed { 'x' } else { ' ' };
            lines.push(format!("  [{}] {} {}", mark, sub.id, sub.text));
        }
    }
    lines
}

/// Format one display section. Collapsed sections show only the header.
pub fn format_section(group: Group, tasks: &[&Task], collapsed: bool) -> Vec<String> {
    let mut lines = vec![format!("== {} ({}) ==", group.label(), tasks.len())];
    if collapsed {
        return lines;
    }
    for task in tasks {
        lines.push(format_task_line(task));
    }
    lines
}

pub fn format_settings(settings: &ViewSettings) -> Vec<String> {
    let mut lines = vec![
        format!("mode: {}", wire_name(&settings.view_mode)),
        format!("group by: {}", wire_name(&settings.group_by)),
        format!("sort by: {}", wire_name(&settings.sort_by)),
        format!("hide completed: {}", settings.hide_completed),
    ];
    if !settings.collapsed_sections.is_empty() {
        lines.push(format!("collapsed: {}", settings.collapsed_sections.join(", ")));
    }
    lines
}

pub fn format_stats(stats: &TaskStatistics, show: &StatsConfig) -> String {
    let mut parts = Vec::new();
    if show.show_total {
        parts.push(format!("{} total", stats.total));
    }
    if show.show_done {
        parts.push(format!("{} done", stats.done));
    }
    if show.show_must {
        parts.push(format!("{} must", stats.must));
    }
    if show.show_in_progress {
        parts.push(format!("{} in progress", stats.in_progress));
    }
    if show.show_overdue {
        parts.push(format!("{} overdue", stats.overdue));
    }
    parts.join("  ")
}

pub fn format_reminder(task: &Task, reminders: &[i64]) -> String {
    let when: Vec<String> = reminders.iter().map(|r| format_ms(*r)).collect();
    let due = task
        .due_date
        .map(|d| format!(" (due {})", format_ms(d)))
        .unwrap_or_default();
    format!("reminder: {} {}{} [{}]", task.id, task.text, due, when.join(", "))
}

/// Whether a task is listed when completed tasks are hidden
pub fn is_visible(task: &Task, hide_completed: bool) -> bool {
    !(hide_completed && task.status == Status::Done)
}

/// The name a settings enum has on the wire (`dueDate`, `kanban`, ...)
fn wire_name<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => String::new(),
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}
