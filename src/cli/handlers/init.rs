use std::path::Path;

use crate::io::workspace::{self, DATA_DIR};

/// Create `.taskpanel/` under the current directory, or under `-C <dir>`.
pub fn cmd_init(dir: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let root = super::start_dir(dir)?;

    // Nested workspaces are allowed, but the outer one stops being found
    // from inside this directory.
    if let Some(outer) = enclosing_workspace(&root) {
        eprintln!("Note: enclosing workspace found at {}/", outer.display());
        eprintln!("Creating new workspace in ./{}/", DATA_DIR);
    }

    let data_dir = workspace::init_workspace(&root)?;
    println!("Initialized taskpanel workspace in {}", data_dir.display());
    Ok(())
}

fn enclosing_workspace(root: &Path) -> Option<std::path::PathBuf> {
    let parent = root.parent()?;
    workspace::discover_workspace(parent).ok()
}
