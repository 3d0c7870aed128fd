//! Settings file (`~/.config/intersafety/settings.toml`) load and save.
//!
//! Missing or unreadable files are not errors on load: the improver simply starts
//! disabled with defaults, matching a fresh install.

use super::settings::{Settings, SettingsError, StoredSettings};
use crate::log_debug;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_FILE: &str = "settings.toml";
const CONFIG_DIR_ENV: &str = "INTERSAFETY_CONFIG_DIR";

fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = env::var(CONFIG_DIR_ENV) {
        let trimmed = dir.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    dirs::config_dir().map(|dir| dir.join("intersafety"))
}

/// Per-user settings file location.
#[must_use]
pub fn default_settings_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(SETTINGS_FILE))
}

/// Load settings from the default location.
#[must_use]
pub fn load_settings() -> Settings {
    match default_settings_path() {
        Some(path) => load_settings_from(&path),
        None => Settings::default(),
    }
}

/// Load and migrate settings from `path`, falling back to defaults on any failure.
#[must_use]
pub fn load_settings_from(path: &Path) -> Settings {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(_) => return Settings::default(),
    };
    parse_settings(&contents, path)
}

pub(super) fn parse_settings(contents: &str, path: &Path) -> Settings {
    match StoredSettings::from_toml(contents) {
        Ok(stored) => stored.migrate(),
        Err(err) => {
            log_debug(&format!(
                "settings file ignored ({}): {err}",
                path.display()
            ));
            Settings::default()
        }
    }
}

const SETTINGS_HEADER: &str = "# InterSafety improver settings\n# voice_mode: off | natural | ai\n\n";

fn serialize_settings(settings: &Settings) -> Result<String, SettingsError> {
    let body = toml::to_string(settings).map_err(|err| SettingsError::Parse(err.to_string()))?;
    Ok(format!("{SETTINGS_HEADER}{body}"))
}

/// Write settings to `path`, creating parent directories as needed.
pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<(), SettingsError> {
    let text = serialize_settings(settings)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| SettingsError::Io(err.to_string()))?;
    }
    fs::write(path, text).map_err(|err| SettingsError::Io(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VoiceMode;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_dir(label: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        env::temp_dir().join(format!("intersafety-settings-{label}-{nanos}"))
    }

    #[test]
    fn missing_file_loads_defaults() {
        let path = unique_dir("missing").join(SETTINGS_FILE);
        assert_eq!(load_settings_from(&path), Settings::default());
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = unique_dir("roundtrip");
        let path = dir.join(SETTINGS_FILE);
        let settings = Settings {
            enabled: true,
            voice_mode: VoiceMode::Ai,
            json_prompting: true,
        };
        assert!(save_settings_to(&path, &settings).is_ok());
        assert_eq!(load_settings_from(&path), settings);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn serialized_file_is_commented_toml() {
        let settings = Settings {
            enabled: true,
            voice_mode: VoiceMode::Natural,
            json_prompting: false,
        };
        let text = match serialize_settings(&settings) {
            Ok(text) => text,
            Err(err) => panic!("settings should serialize: {err}"),
        };
        assert!(text.starts_with("# InterSafety improver settings"));
        assert!(text.contains("enabled = true"));
        assert!(text.contains("voice_mode = \"natural\""));
        assert!(text.contains("json_prompting = false"));
        match StoredSettings::from_toml(&text) {
            Ok(stored) => assert_eq!(stored.migrate(), settings),
            Err(err) => panic!("serialized settings should parse: {err}"),
        }
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let settings = parse_settings("enabled = [", Path::new("corrupt.toml"));
        assert_eq!(settings, Settings::default());
    }
}
