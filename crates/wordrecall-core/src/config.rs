//! TOML-based engine configuration.
//!
//! Holds the settings an embedding application tunes:
//! - local day boundary (UTC offset)
//! - default analytics window
//! - database file name and counter sanity ceiling
//! - log level for the driver binary
//!
//! Configuration is stored at `~/.config/wordrecall/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analytics::MAX_WINDOW_DAYS;
use crate::calendar::FixedOffsetCalendar;
use crate::error::ConfigError;
use crate::store::DEFAULT_COUNTER_CEILING;

/// Returns the data directory, creating it if needed.
///
/// `WORDRECALL_HOME` wins when set. Otherwise `~/.config/wordrecall[-dev]/`
/// depending on `WORDRECALL_ENV=dev`.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("WORDRECALL_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("WORDRECALL_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("wordrecall-dev")
            } else {
                base_dir.join("wordrecall")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::LoadFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Offset of the user's local day from UTC.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_window_days")]
    pub window_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database file, relative to the data directory unless absolute.
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_counter_ceiling")]
    pub counter_ceiling: u32,
}

/// Engine configuration.
///
/// Serialized to/from TOML at `~/.config/wordrecall/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

fn default_log_level() -> String {
    "warn".into()
}
fn default_window_days() -> u32 {
    30
}
fn default_database() -> String {
    "wordrecall.db".into()
}
fn default_counter_ceiling() -> u32 {
    DEFAULT_COUNTER_CEILING
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            counter_ceiling: default_counter_ceiling(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            calendar: CalendarConfig::default(),
            analytics: AnalyticsConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl EngineConfig {
    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::InvalidValue {
            key: key.to_string(),
            message: "unknown config key".into(),
        };
        let unparsable = |kind: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("cannot parse '{value}' as {kind}"),
        };

        let (parents, leaf) = match key.rsplit_once('.') {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, key),
        };
        if leaf.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        if let Some(parents) = parents {
            for part in parents.split('.') {
                current = current.get_mut(part).ok_or_else(unknown)?;
            }
        }

        let obj = current.as_object_mut().ok_or_else(unknown)?;
        let existing = obj.get(leaf).ok_or_else(unknown)?;
        let new_value = match existing {
            serde_json::Value::Number(_) => {
                let n = value.parse::<i64>().map_err(|_| unparsable("integer"))?;
                serde_json::Value::Number(n.into())
            }
            serde_json::Value::Bool(_) => {
                serde_json::Value::Bool(value.parse::<bool>().map_err(|_| unparsable("bool"))?)
            }
            serde_json::Value::Object(_) | serde_json::Value::Array(_) => return Err(unknown()),
            _ => serde_json::Value::String(value.into()),
        };
        obj.insert(leaf.to_string(), new_value);
        Ok(())
    }

    /// Path of the config file inside the data directory.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, or defaults if no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or
    /// holds out-of-range values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }
        };
        let cfg: EngineConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if FixedOffsetCalendar::from_minutes(self.calendar.utc_offset_minutes).is_none() {
            return Err(ConfigError::InvalidValue {
                key: "calendar.utc_offset_minutes".into(),
                message: format!(
                    "{} is not strictly between -1440 and 1440",
                    self.calendar.utc_offset_minutes
                ),
            });
        }
        if !(1..=MAX_WINDOW_DAYS).contains(&self.analytics.window_days) {
            return Err(ConfigError::InvalidValue {
                key: "analytics.window_days".into(),
                message: format!("{} is outside 1..={MAX_WINDOW_DAYS}", self.analytics.window_days),
            });
        }
        if self.store.database.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "store.database".into(),
                message: "must not be empty".into(),
            });
        }
        if self.store.counter_ceiling == 0 {
            return Err(ConfigError::InvalidValue {
                key: "store.counter_ceiling".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Local calendar described by `calendar.utc_offset_minutes`.
    pub fn local_calendar(&self) -> Result<FixedOffsetCalendar, ConfigError> {
        self.validate()?;
        FixedOffsetCalendar::from_minutes(self.calendar.utc_offset_minutes).ok_or_else(|| {
            ConfigError::InvalidValue {
                key: "calendar.utc_offset_minutes".into(),
                message: "out of range".into(),
            }
        })
    }

    /// Database location; relative names resolve against `base`.
    pub fn database_path(&self, base: &Path) -> PathBuf {
        let db = Path::new(&self.store.database);
        if db.is_absolute() {
            db.to_path_buf()
        } else {
            base.join(db)
        }
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        if key.is_empty() {
            return None;
        }
        let json = serde_json::to_value(self).ok()?;
        match key.split('.').try_fold(&json, |node, part| node.get(part))? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key, in memory only.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the result fails validation. `self` is untouched on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: EngineConfig =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}
