//! TOML-based user settings.
//!
//! Stores user preferences including:
//! - Default session durations (focus, long break, micro break)
//! - Micro-break prompt cadence during focus blocks
//! - Notification and sound flags
//!
//! Settings are stored at `<data-dir>/settings.toml`. The lifecycle
//! controller only reads them; mutation happens through `set`/`save`.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Result, SettingsError};

use super::data_dir;

/// Default session duration configuration, in the units each session
/// type is naturally sized in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationsConfig {
    #[serde(default = "default_focus_minutes")]
    pub focus_minutes: u32,
    #[serde(default = "default_long_break_minutes")]
    pub long_break_minutes: u32,
    #[serde(default = "default_micro_break_seconds")]
    pub micro_break_seconds: u32,
}

/// Micro-break prompt cadence during focus blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MicroBreakConfig {
    #[serde(default = "default_min_interval_minutes")]
    pub min_interval_minutes: u32,
    #[serde(default = "default_max_interval_minutes")]
    pub max_interval_minutes: u32,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub sound: bool,
}

/// User settings.
///
/// Serialized to/from TOML at `<data-dir>/settings.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Start the follow-up break automatically after a focus block.
    #[serde(default)]
    pub auto_start: bool,
    #[serde(default)]
    pub durations: DurationsConfig,
    #[serde(default)]
    pub micro_break: MicroBreakConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

// Default functions
fn default_focus_minutes() -> u32 {
    90
}
fn default_long_break_minutes() -> u32 {
    20
}
fn default_micro_break_seconds() -> u32 {
    15
}
fn default_min_interval_minutes() -> u32 {
    3
}
fn default_max_interval_minutes() -> u32 {
    5
}
fn default_true() -> bool {
    true
}

impl Default for DurationsConfig {
    fn default() -> Self {
        Self {
            focus_minutes: default_focus_minutes(),
            long_break_minutes: default_long_break_minutes(),
            micro_break_seconds: default_micro_break_seconds(),
        }
    }
}

impl Default for MicroBreakConfig {
    fn default() -> Self {
        Self {
            min_interval_minutes: default_min_interval_minutes(),
            max_interval_minutes: default_max_interval_minutes(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sound: true,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_start: false,
            durations: DurationsConfig::default(),
            micro_break: MicroBreakConfig::default(),
            notifications: NotificationsConfig::default(),
        }
    }
}

impl Settings {
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
    ) -> Result<(), SettingsError> {
        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(SettingsError::UnknownKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| SettingsError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| SettingsError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => {
                        serde_json::Value::Bool(value.parse::<bool>().map_err(|_| {
                            SettingsError::ParseFailed(format!("cannot parse '{value}' as bool"))
                        })?)
                    }
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| {
                                    SettingsError::ParseFailed(format!(
                                        "cannot parse '{value}' as number"
                                    ))
                                })?
                        } else {
                            return Err(SettingsError::ParseFailed(format!(
                                "cannot parse '{value}' as number"
                            )));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value)
                            .map_err(|e| SettingsError::ParseFailed(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| SettingsError::UnknownKey(key.to_string()))?;
        }

        Err(SettingsError::UnknownKey(key.to_string()))
    }

    fn path() -> Result<PathBuf, std::io::Error> {
        Ok(data_dir()?.join("settings.toml"))
    }

    /// Load from disk or write and return the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file exists but cannot be parsed,
    /// or if the defaults cannot be written to disk.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let settings: Settings =
                    toml::from_str(&content).map_err(|e| SettingsError::LoadFailed {
                        path,
                        message: e.to_string(),
                    })?;
                Ok(settings)
            }
            Err(_) => {
                let settings = Self::default();
                settings.save()?;
                Ok(settings)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be serialized or written.
    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| SettingsError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| SettingsError::SaveFailed {
            path,
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Load from disk, returning defaults on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Get a settings value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a settings value by key and persist. Returns an error if the
    /// key is unknown or the value cannot be parsed.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)
            .map_err(|e| SettingsError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json)
            .map_err(|e| SettingsError::ParseFailed(e.to_string()))?;
        self.save()?;
        Ok(())
    }

    // ── Derived values ───────────────────────────────────────────────

    pub fn focus_seconds(&self) -> u32 {
        self.durations.focus_minutes * 60
    }

    pub fn long_break_seconds(&self) -> u32 {
        self.durations.long_break_minutes * 60
    }

    pub fn micro_break_seconds(&self) -> u32 {
        self.durations.micro_break_seconds
    }

    /// Seconds until the next micro-break prompt, drawn uniformly from
    /// the configured interval. Reversed bounds are normalized.
    pub fn micro_break_gap_secs(&self, rng: &mut impl Rng) -> u64 {
        let a = self.micro_break.min_interval_minutes as u64 * 60;
        let b = self.micro_break.max_interval_minutes as u64 * 60;
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        rng.gen_range(lo..=hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    #[test]
    fn default_settings_roundtrip() {
        let settings = Settings::default();
        let toml_str = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.durations.focus_minutes, 90);
        assert_eq!(parsed.notifications.enabled, true);
    }

    #[test]
    fn settings_default_values() {
        let settings = Settings::default();
        assert!(!settings.auto_start);
        assert_eq!(settings.durations.focus_minutes, 90);
        assert_eq!(settings.durations.long_break_minutes, 20);
        assert_eq!(settings.durations.micro_break_seconds, 15);
        assert_eq!(settings.micro_break.min_interval_minutes, 3);
        assert_eq!(settings.micro_break.max_interval_minutes, 5);
        assert!(settings.notifications.enabled);
        assert!(settings.notifications.sound);
    }

    #[test]
    fn empty_toml_fills_every_default() {
        let parsed: Settings = toml::from_str("").unwrap();
        assert_eq!(parsed.durations.focus_minutes, 90);
        assert_eq!(parsed.micro_break.max_interval_minutes, 5);
        assert!(parsed.notifications.sound);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let settings = Settings::default();
        assert_eq!(settings.get("durations.focus_minutes").as_deref(), Some("90"));
        assert_eq!(settings.get("auto_start").as_deref(), Some("false"));
        assert!(settings.get("durations.missing_key").is_none());
        assert!(settings.get("").is_none());
    }

    #[test]
    fn set_json_value_by_path_updates_nested_number() {
        let mut json = serde_json::to_value(Settings::default()).unwrap();
        Settings::set_json_value_by_path(&mut json, "durations.focus_minutes", "50").unwrap();
        assert_eq!(
            Settings::get_json_value_by_path(&json, "durations.focus_minutes").unwrap(),
            &serde_json::Value::Number(50.into())
        );
    }

    #[test]
    fn set_json_value_by_path_updates_nested_bool() {
        let mut json = serde_json::to_value(Settings::default()).unwrap();
        Settings::set_json_value_by_path(&mut json, "notifications.sound", "false").unwrap();
        assert_eq!(
            Settings::get_json_value_by_path(&json, "notifications.sound").unwrap(),
            &serde_json::Value::Bool(false)
        );
    }

    #[test]
    fn set_json_value_by_path_rejects_unknown_key() {
        let mut json = serde_json::to_value(Settings::default()).unwrap();
        let result = Settings::set_json_value_by_path(&mut json, "durations.nonexistent", "1");
        assert!(matches!(result, Err(SettingsError::UnknownKey(_))));
    }

    #[test]
    fn set_json_value_by_path_rejects_invalid_type() {
        let mut json = serde_json::to_value(Settings::default()).unwrap();
        let result =
            Settings::set_json_value_by_path(&mut json, "notifications.enabled", "not_a_bool");
        assert!(matches!(result, Err(SettingsError::ParseFailed(_))));
    }

    #[test]
    fn duration_helpers_convert_to_seconds() {
        let settings = Settings::default();
        assert_eq!(settings.focus_seconds(), 90 * 60);
        assert_eq!(settings.long_break_seconds(), 20 * 60);
        assert_eq!(settings.micro_break_seconds(), 15);
    }

    #[test]
    fn micro_break_gap_stays_within_bounds() {
        let settings = Settings::default();
        let mut rng = Pcg64::seed_from_u64(7);
        for _ in 0..200 {
            let gap = settings.micro_break_gap_secs(&mut rng);
            assert!((180..=300).contains(&gap), "gap {gap} out of bounds");
        }
    }

    #[test]
    fn micro_break_gap_normalizes_reversed_bounds() {
        let mut settings = Settings::default();
        settings.micro_break.min_interval_minutes = 5;
        settings.micro_break.max_interval_minutes = 3;
        let mut rng = Pcg64::seed_from_u64(7);
        for _ in 0..50 {
            let gap = settings.micro_break_gap_secs(&mut rng);
            assert!((180..=300).contains(&gap));
        }
    }
}
