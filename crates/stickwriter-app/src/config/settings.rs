//! Preference loading and saving
//!
//! Preferences live in `<config_dir>/stickwriter/preferences.toml`. Every key
//! is read on its own: a missing or malformed value falls back to its default
//! without affecting the others.

use std::path::{Path, PathBuf};

use stickwriter_core::prelude::*;
use stickwriter_core::{AppMode, Theme};
use toml::{Table, Value};

use super::types::Preferences;

const CONFIG_DIR: &str = "stickwriter";
pub const PREFERENCES_FILENAME: &str = "preferences.toml";

/// Default preferences file location, if the platform has a config directory
pub fn preferences_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(PREFERENCES_FILENAME))
}

/// Load preferences from the default location
pub fn load_preferences() -> Preferences {
    match preferences_path() {
        Some(path) => load_preferences_from(&path),
        None => {
            warn!("No config directory available, using default preferences");
            Preferences::default()
        }
    }
}

/// Load preferences from `path`
///
/// Returns defaults if the file doesn't exist (not an error - first run).
pub fn load_preferences_from(path: &Path) -> Preferences {
    if !path.exists() {
        debug!("No preferences file at {:?}", path);
        return Preferences::default();
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read {:?}: {}", path, e);
            return Preferences::default();
        }
    };

    match content.parse::<Table>() {
        Ok(table) => {
            debug!("Loaded preferences from {:?}", path);
            preferences_from_table(&table)
        }
        Err(e) => {
            warn!("Failed to parse {:?}: {}", path, e);
            Preferences::default()
        }
    }
}

/// Build preferences from a parsed table, falling back per key
pub fn preferences_from_table(table: &Table) -> Preferences {
    let defaults = Preferences::default();

    Preferences {
        theme: table
            .get("theme")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<Theme>().ok())
            .unwrap_or(defaults.theme),
        // Opt-out: anything other than an explicit false keeps verification on
        verify_after_write: !is_explicit(table.get("verify_after_write"), false),
        mode: table
            .get("mode")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<AppMode>().ok())
            .unwrap_or(defaults.mode),
        // Opt-in
        auto_eject: is_explicit(table.get("auto_eject"), true),
        show_notification: !is_explicit(table.get("show_notification"), false),
    }
}

/// Whether `value` is exactly `expected`, as a TOML bool or its string spelling
fn is_explicit(value: Option<&Value>, expected: bool) -> bool {
    match value {
        Some(Value::Boolean(b)) => *b == expected,
        Some(Value::String(s)) => s == if expected { "true" } else { "false" },
        _ => false,
    }
}

/// Save preferences to `path`
///
/// Creates the parent directory if needed.
/// Uses atomic write (temp file + rename) for safety.
pub fn save_preferences_to(path: &Path, prefs: &Preferences) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| Error::config(format!("Invalid preferences path: {:?}", path)))?;

    if !dir.exists() {
        std::fs::create_dir_all(dir)
            .map_err(|e| Error::config(format!("Failed to create config dir: {}", e)))?;
    }

    let temp_path = dir.join(".preferences.toml.tmp");

    let content = toml::to_string_pretty(prefs)
        .map_err(|e| Error::config(format!("Failed to serialize preferences: {}", e)))?;

    std::fs::write(&temp_path, content)
        .map_err(|e| Error::config(format!("Failed to write temp file: {}", e)))?;

    std::fs::rename(&temp_path, path)
        .map_err(|e| Error::config(format!("Failed to rename temp file: {}", e)))?;

    debug!("Saved preferences to {:?}", path);
    Ok(())
}
