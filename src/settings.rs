//! Program settings, read from `settings.toml` in the user's configuration directory.
use crate::get_powerdispatch_config_dir;
use crate::input::{input_err_msg, read_toml};
use crate::log::{DEFAULT_LOG_LEVEL, parse_log_level};
use anyhow::{Context, Result};
use documented::DocumentedFields;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Written at the top of a freshly created settings file
const SETTINGS_FILE_HEADER: &str = "# Program settings for powerdispatch.
# Remove the leading '#' from a setting to change its value.
";

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

/// Get the path to where the settings file will be read from
pub fn get_settings_file_path() -> PathBuf {
    get_powerdispatch_config_dir().join(SETTINGS_FILE_NAME)
}

/// Program settings from config file
#[derive(Debug, Clone, DocumentedFields, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// The default program log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Whether to overwrite existing output folders without being asked to
    #[serde(default)]
    pub overwrite: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            overwrite: false,
        }
    }
}

impl Settings {
    /// Load the settings file, using defaults if there isn't one
    pub fn load() -> Result<Settings> {
        Self::load_from_path(&get_settings_file_path())
    }

    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        let settings: Settings = read_toml(file_path)?;
        parse_log_level(&settings.log_level).with_context(|| input_err_msg(file_path))?;

        Ok(settings)
    }

    /// The contents of a new settings file: every setting at its default, commented out and
    /// preceded by its description
    pub fn default_file_contents() -> String {
        let defaults = Settings::default();
        let values = [
            ("log_level", format!("\"{}\"", defaults.log_level)),
            ("overwrite", defaults.overwrite.to_string()),
        ];

        let mut out = SETTINGS_FILE_HEADER.to_string();
        for (field, value) in values {
            out.push('\n');
            if let Ok(docs) = Settings::get_field_docs(field) {
                for line in docs.lines() {
                    out.push_str(&format!("# # {}\n", line.trim()));
                }
            }
            out.push_str(&format!("# {field} = {value}\n"));
        }

        out
    }
}
