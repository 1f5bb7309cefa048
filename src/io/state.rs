use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::io::recovery::atomic_write;
use crate::model::settings::{ViewSettings, ViewType};

/// Persisted panel state (written to .state.json)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PanelState {
    /// Display settings keyed by view
    #[serde(default)]
    pub views: HashMap<ViewType, ViewSettings>,
}

/// Read .state.json from the data directory
pub fn read_panel_state(data_dir: &Path) -> Option<PanelState> {
    let path = data_dir.join(".state.json");
    let content = fs::read_to_string(&path).ok()?;
    serde_json::from_str(&content).ok()
}

/// Write .state.json to the data directory
pub fn write_panel_state(data_dir: &Path, state: &PanelState) -> Result<(), std::io::Error> {
    let path = data_dir.join(".state.json");
    let content = serde_json::to_string_pretty(state)?;
    atomic_write(&path, content.as_bytes())
}
