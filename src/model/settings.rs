use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which panel a set of view settings belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewType {
    #[default]
    Sidebar,
    Full,
}

impl ViewType {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewType::Sidebar => "sidebar",
            ViewType::Full => "full",
        }
    }
}

impl fmt::Display for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sidebar" => Ok(ViewType::Sidebar),
            "full" => Ok(ViewType::Full),
            _ => Err(format!("invalid view '{}' (expected sidebar, full)", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    List,
    Kanban,
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list" => Ok(ViewMode::List),
            "kanban" => Ok(ViewMode::Kanban),
            _ => Err(format!("invalid view mode '{}' (expected list, kanban)", s)),
        }
    }
}

/// How tasks are bucketed into sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    #[default]
    Status,
    Priority,
    None,
}

impl FromStr for GroupBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "status" => Ok(GroupBy::Status),
            "priority" => Ok(GroupBy::Priority),
            "none" => Ok(GroupBy::None),
            _ => Err(format!(
                "invalid grouping '{}' (expected status, priority, none)",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    Custom,
    #[default]
    Priority,
    DueDate,
    Title,
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "custom" => Ok(SortBy::Custom),
            "priority" => Ok(SortBy::Priority),
            "due" | "due-date" | "dueDate" => Ok(SortBy::DueDate),
            "title" => Ok(SortBy::Title),
            _ => Err(format!(
                "invalid sort '{}' (expected custom, priority, due-date, title)",
                s
            )),
        }
    }
}

/// Per-view display settings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSettings {
    #[serde(default)]
    pub view_mode: ViewMode,
    #[serde(default)]
    pub group_by: GroupBy,
    #[serde(default)]
    pub hide_completed: bool,
    #[serde(default)]
    pub sort_by: SortBy,
    /// Section names currently collapsed in the list view
    #[serde(default)]
    pub collapsed_sections: Vec<String>,
}
