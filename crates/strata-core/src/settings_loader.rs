//! Settings loading from configuration files.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML or JSON file (overriding defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `STRATA_DEBUG` | `debug` |
//! | `STRATA_LOG_LEVEL` | `log_level` |
//! | `STRATA_DATABASE_ENGINE` | `database.engine` |
//! | `STRATA_DATABASE_NAME` | `database.name` |
//! | `STRATA_DATABASE_HOST` | `database.host` |
//! | `STRATA_DATABASE_PORT` | `database.port` |
//! | `STRATA_DATABASE_USER` | `database.user` |
//! | `STRATA_DATABASE_PASSWORD` | `database.password` |
//! | `STRATA_MIGRATIONS_DIR` | `migrations.dir` |
//! | `STRATA_HISTORY_TABLE` | `migrations.history_table` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use strata_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file_with_env("strata.toml").unwrap();
//! ```

use std::path::{Path, PathBuf};

use crate::error::StrataError;
use crate::settings::{Engine, Settings};

/// Loads settings from a TOML string.
///
/// Fields not present in the TOML keep their default values, including
/// fields nested inside `[database]` and `[migrations]`.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, StrataError> {
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| StrataError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;
    merge_with_defaults(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, StrataError> {
    let content = read_config(path.as_ref(), "TOML")?;
    from_toml_str(&content)
}

/// Loads settings from a TOML file and then applies environment variable overrides.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<Settings, StrataError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a JSON string.
pub fn from_json_str(json_str: &str) -> Result<Settings, StrataError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| StrataError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;
    merge_with_defaults(json_value, "JSON")
}

/// Loads settings from a JSON file.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<Settings, StrataError> {
    let content = read_config(path.as_ref(), "JSON")?;
    from_json_str(&content)
}

/// Loads settings from a JSON file and then applies environment variable overrides.
pub fn from_json_file_with_env(path: impl AsRef<Path>) -> Result<Settings, StrataError> {
    let mut settings = from_json_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a file, picking the format from its extension
/// (`.json` is JSON, anything else is TOML), then applies environment overrides.
pub fn from_file_with_env(path: impl AsRef<Path>) -> Result<Settings, StrataError> {
    let path = path.as_ref();
    if path.extension().is_some_and(|ext| ext == "json") {
        from_json_file_with_env(path)
    } else {
        from_toml_file_with_env(path)
    }
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies environment variable overrides to a settings struct.
///
/// `STRATA_DEBUG` accepts "true"/"1"/"yes". Unparseable values for
/// `STRATA_DATABASE_ENGINE` and `STRATA_DATABASE_PORT` are ignored.
pub fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(val) = std::env::var("STRATA_DEBUG") {
        settings.debug = matches!(val.to_lowercase().as_str(), "true" | "1" | "yes");
    }

    if let Ok(val) = std::env::var("STRATA_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Ok(val) = std::env::var("STRATA_DATABASE_ENGINE") {
        if let Ok(engine) = val.parse::<Engine>() {
            settings.database.engine = engine;
        }
    }

    if let Ok(val) = std::env::var("STRATA_DATABASE_NAME") {
        settings.database.name = val;
    }

    if let Ok(val) = std::env::var("STRATA_DATABASE_HOST") {
        settings.database.host = val;
    }

    if let Ok(val) = std::env::var("STRATA_DATABASE_PORT") {
        if let Ok(port) = val.parse::<u16>() {
            settings.database.port = port;
        }
    }

    if let Ok(val) = std::env::var("STRATA_DATABASE_USER") {
        settings.database.user = val;
    }

    if let Ok(val) = std::env::var("STRATA_DATABASE_PASSWORD") {
        settings.database.password = val;
    }

    if let Ok(val) = std::env::var("STRATA_MIGRATIONS_DIR") {
        settings.migrations.dir = PathBuf::from(val);
    }

    if let Ok(val) = std::env::var("STRATA_HISTORY_TABLE") {
        settings.migrations.history_table = val;
    }
}

// ============================================================
// Helpers
// ============================================================

fn read_config(path: &Path, format: &str) -> Result<String, StrataError> {
    std::fs::read_to_string(path).map_err(|e| {
        StrataError::ConfigurationError(format!(
            "Failed to read {format} file '{}': {e}",
            path.display()
        ))
    })
}

fn merge_with_defaults(value: serde_json::Value, format: &str) -> Result<Settings, StrataError> {
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        StrataError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;

    let merged = merge_json(default_json, value);
    serde_json::from_value(merged).map_err(|e| {
        StrataError::ConfigurationError(format!("Failed to deserialize settings from {format}: {e}"))
    })
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => serde_json::Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = match base_map.remove(&key) {
                    Some(base_v) => merge_json(base_v, override_v),
                    None => override_v,
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}
