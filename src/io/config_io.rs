use std::fs;
use std::path::Path;

use crate::io::workspace::{CONFIG_FILE, WorkspaceError};
use crate::model::config::AppConfig;

/// Read the workspace config, returning both the parsed config and the raw
/// toml_edit Document for round-trip-safe editing. A missing file yields
/// the defaults and an empty document.
pub fn read_config(data_dir: &Path) -> Result<(AppConfig, toml_edit::DocumentMut), WorkspaceError> {
    let config_path = data_dir.join(CONFIG_FILE);
    let config_text = match fs::read_to_string(&config_path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(WorkspaceError::ReadError {
                path: config_path,
                source: e,
            });
        }
    };
    let config: AppConfig = toml::from_str(&config_text)?;
    let doc: toml_edit::DocumentMut = config_text.parse()?;
    Ok((config, doc))
}

/// Parsed config only
pub fn load_config(data_dir: &Path) -> Result<AppConfig, WorkspaceError> {
    read_config(data_dir).map(|(config, _)| config)
}

/// Write the config document back to disk, preserving formatting.
pub fn write_config(data_dir: &Path, doc: &toml_edit::DocumentMut) -> Result<(), WorkspaceError> {
    let config_path = data_dir.join(CONFIG_FILE);
    fs::write(&config_path, doc.to_string()).map_err(|e| WorkspaceError::ReadError {
        path: config_path,
        source: e,
    })?;
    Ok(())
}

/// Set a dotted key (`stats.show_done`, `general.default_priority`, ...).
///
/// `raw` is stored as a bool or integer when it parses as one, otherwise as
/// a string. Keys that the config does not define are rejected, and so is
/// any value that leaves the document unparseable as [`AppConfig`].
pub fn set_config_value(
    doc: &mut toml_edit::DocumentMut,
    key: &str,
    raw: &str,
) -> Result<(), WorkspaceError> {
    let (section, field) = key
        .split_once('.')
        .filter(|(s, f)| !s.is_empty() && !f.is_empty() && !f.contains('.'))
        .ok_or_else(|| WorkspaceError::UnknownKey(key.to_string()))?;
    if !is_known_key(section, field) {
        return Err(WorkspaceError::UnknownKey(key.to_string()));
    }

    let value = if let Ok(b) = raw.parse::<bool>() {
        toml_edit::value(b)
    } else if let Ok(n) = raw.parse::<i64>() {
        toml_edit::value(n)
    } else {
        toml_edit::value(raw)
    };

    let created_section = !doc.contains_key(section);
    if created_section {
        doc[section] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    let previous = doc[section].get(field).cloned();
    doc[section][field] = value;

    if let Err(e) = toml::from_str::<AppConfig>(&doc.to_string()) {
        match previous {
            Some(item) => doc[section][field] = item,
            None if created_section => {
                doc.remove(section);
            }
            None => {
                if let Some(table) = doc[section].as_table_like_mut() {
                    table.remove(field);
                }
            }
        }
        return Err(WorkspaceError::InvalidValue {
            key: key.to_string(),
            reason: e.message().to_string(),
        });
    }
    Ok(())
}

fn is_known_key(section: &str, field: &str) -> bool {
    let Ok(toml::Value::Table(defaults)) = toml::Value::try_from(AppConfig::default()) else {
        return false;
    };
    defaults
        .get(section)
        .and_then(|s| s.as_table())
        .is_some_and(|s| s.contains_key(field))
}
