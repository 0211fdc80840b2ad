//! Persisted user preferences
//!
//! - `<config_dir>/stickwriter/preferences.toml` - theme, verify default,
//!   mode, auto-eject and notification settings

pub mod settings;
pub mod types;

pub use settings::{
    load_preferences, load_preferences_from, preferences_from_table, preferences_path,
    save_preferences_to, PREFERENCES_FILENAME,
};
pub use types::*;
