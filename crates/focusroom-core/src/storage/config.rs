//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - The technique a new timer starts with
//! - Notification preferences
//! - Per-technique duration overrides
//!
//! Configuration is stored at `~/.config/focusroom/config.toml`.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::timer::{Catalog, Durations, Technique};

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Ring the terminal bell on completion.
    #[serde(default = "default_true")]
    pub sound: bool,
}

/// Duration overrides, in minutes, keyed by technique id.
///
/// A table may name only some session types; the rest keep the built-in
/// profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechniquesConfig {
    #[serde(default = "default_classic", deserialize_with = "classic_overrides")]
    pub classic: Durations,
    #[serde(
        rename = "52_17",
        default = "default_52_17",
        deserialize_with = "fifty_two_seventeen_overrides"
    )]
    pub fifty_two_seventeen: Durations,
    #[serde(default = "default_flow", deserialize_with = "flow_overrides")]
    pub flow: Durations,
    #[serde(
        rename = "90_30",
        default = "default_90_30",
        deserialize_with = "ninety_thirty_overrides"
    )]
    pub ninety_thirty: Durations,
}

/// One `[techniques.<id>]` table as written by the user.
#[derive(Deserialize)]
struct DurationOverrides {
    work: Option<u32>,
    short_break: Option<u32>,
    long_break: Option<u32>,
}

impl DurationOverrides {
    fn over(self, base: Durations) -> Durations {
        Durations {
            work: self.work.unwrap_or(base.work),
            short_break: self.short_break.unwrap_or(base.short_break),
            long_break: self.long_break.unwrap_or(base.long_break),
        }
    }
}

fn merged_overrides<'de, D>(deserializer: D, technique: Technique) -> Result<Durations, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = DurationOverrides::deserialize(deserializer)?;
    Ok(overrides.over(Durations::builtin(technique)))
}

fn classic_overrides<'de, D: Deserializer<'de>>(d: D) -> Result<Durations, D::Error> {
    merged_overrides(d, Technique::Classic)
}
fn fifty_two_seventeen_overrides<'de, D: Deserializer<'de>>(d: D) -> Result<Durations, D::Error> {
    merged_overrides(d, Technique::FiftyTwoSeventeen)
}
fn flow_overrides<'de, D: Deserializer<'de>>(d: D) -> Result<Durations, D::Error> {
    merged_overrides(d, Technique::Flow)
}
fn ninety_thirty_overrides<'de, D: Deserializer<'de>>(d: D) -> Result<Durations, D::Error> {
    merged_overrides(d, Technique::NinetyThirty)
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/focusroom/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_technique")]
    pub default_technique: Technique,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub techniques: TechniquesConfig,
}

// Default functions
fn default_true() -> bool {
    true
}
fn default_technique() -> Technique {
    Technique::Classic
}
fn default_classic() -> Durations {
    Durations::builtin(Technique::Classic)
}
fn default_52_17() -> Durations {
    Durations::builtin(Technique::FiftyTwoSeventeen)
}
fn default_flow() -> Durations {
    Durations::builtin(Technique::Flow)
}
fn default_90_30() -> Durations {
    Durations::builtin(Technique::NinetyThirty)
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sound: true,
        }
    }
}

impl Default for TechniquesConfig {
    fn default() -> Self {
        Self {
            classic: default_classic(),
            fifty_two_seventeen: default_52_17(),
            flow: default_flow(),
            ninety_thirty: default_90_30(),
        }
    }
}

impl TechniquesConfig {
    pub fn get(&self, technique: Technique) -> Durations {
        match technique {
            Technique::Classic => self.classic,
            Technique::FiftyTwoSeventeen => self.fifty_two_seventeen,
            Technique::Flow => self.flow,
            Technique::NinetyThirty => self.ninety_thirty,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_technique: default_technique(),
            notifications: NotificationsConfig::default(),
            techniques: TechniquesConfig::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::MissingKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
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

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key, in memory only.
    ///
    /// The result must still produce a valid catalog; otherwise the config
    /// is left unchanged.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self)
            .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.catalog()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and persist it.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.set_value(key, value)?;
        self.save()
    }

    /// Build the validated duration catalog.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NonPositiveDuration`] if any override is zero.
    pub fn catalog(&self) -> Result<Catalog, ConfigError> {
        Catalog::new(
            Technique::ALL
                .into_iter()
                .map(|t| (t, self.techniques.get(t))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::SessionType;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_technique, Technique::Classic);
        assert!(parsed.notifications.enabled);
        assert_eq!(parsed.techniques.ninety_thirty.work, 90);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let parsed: Config = toml::from_str(
            r#"
default_technique = "flow"

[techniques.52_17]
work = 50
short_break = 10
long_break = 20
"#,
        )
        .unwrap();
        assert_eq!(parsed.default_technique, Technique::Flow);
        assert!(parsed.notifications.sound);
        assert_eq!(parsed.techniques.fifty_two_seventeen.work, 50);
        assert_eq!(parsed.techniques.classic.work, 25);
    }

    #[test]
    fn single_key_override_keeps_other_durations() {
        let parsed: Config = toml::from_str("[techniques.classic]\nwork = 50\n").unwrap();
        assert_eq!(parsed.techniques.classic, Durations::new(50, 5, 15));
        assert_eq!(parsed.techniques.flow, Durations::builtin(Technique::Flow));

        let catalog = parsed.catalog().unwrap();
        assert_eq!(catalog.duration_minutes(Technique::Classic, SessionType::Work), 50);
        assert_eq!(catalog.duration_minutes(Technique::Classic, SessionType::LongBreak), 15);
    }

    #[test]
    fn partial_override_uses_that_techniques_profile() {
        let parsed: Config = toml::from_str("[techniques.90_30]\nlong_break = 60\n").unwrap();
        assert_eq!(parsed.techniques.ninety_thirty, Durations::new(90, 30, 60));
    }

    #[test]
    fn load_from_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[techniques.52_17]\nshort_break = 20\n").unwrap();
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.techniques.fifty_two_seventeen, Durations::new(52, 20, 30));
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("notifications.enabled").as_deref(), Some("true"));
        assert_eq!(cfg.get("techniques.classic.work").as_deref(), Some("25"));
        assert_eq!(cfg.get("techniques.90_30.long_break").as_deref(), Some("45"));
        assert_eq!(cfg.get("default_technique").as_deref(), Some("classic"));
        assert!(cfg.get("notifications.missing_key").is_none());
    }

    #[test]
    fn set_value_updates_nested_number() {
        let mut cfg = Config::default();
        cfg.set_value("techniques.flow.work", "50").unwrap();
        assert_eq!(cfg.techniques.flow.work, 50);
        let catalog = cfg.catalog().unwrap();
        assert_eq!(catalog.duration_minutes(Technique::Flow, SessionType::Work), 50);
    }

    #[test]
    fn set_value_updates_technique() {
        let mut cfg = Config::default();
        cfg.set_value("default_technique", "52_17").unwrap();
        assert_eq!(cfg.default_technique, Technique::FiftyTwoSeventeen);
    }

    #[test]
    fn set_value_rejects_unknown_technique() {
        let mut cfg = Config::default();
        assert!(cfg.set_value("default_technique", "pomodoro").is_err());
        assert_eq!(cfg.default_technique, Technique::Classic);
    }

    #[test]
    fn set_value_rejects_zero_duration() {
        let mut cfg = Config::default();
        let result = cfg.set_value("techniques.classic.short_break", "0");
        assert!(matches!(result, Err(ConfigError::NonPositiveDuration { .. })));
        assert_eq!(cfg.techniques.classic.short_break, 5);
    }

    #[test]
    fn set_value_rejects_unknown_key() {
        let mut cfg = Config::default();
        let result = cfg.set_value("notifications.nonexistent_key", "true");
        assert!(matches!(result, Err(ConfigError::MissingKey(_))));
    }

    #[test]
    fn set_value_rejects_invalid_type() {
        let mut cfg = Config::default();
        let result = cfg.set_value("notifications.sound", "loud");
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn zero_duration_in_file_fails_catalog() {
        let parsed: Config = toml::from_str(
            r#"
[techniques.flow]
work = 0
short_break = 5
long_break = 15
"#,
        )
        .unwrap();
        assert!(matches!(
            parsed.catalog(),
            Err(ConfigError::NonPositiveDuration {
                technique: Technique::Flow,
                session_type: SessionType::Work,
            })
        ));
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.default_technique, Technique::Classic);
        assert!(path.exists());
    }

    #[test]
    fn save_then_load_preserves_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.set_value("techniques.90_30.work", "80").unwrap();
        cfg.set_value("notifications.sound", "false").unwrap();
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.techniques.ninety_thirty.work, 80);
        assert!(!loaded.notifications.sound);
    }

    #[test]
    fn load_from_garbage_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_technique = [").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseFailed(_))
        ));
    }
}
