//! User-facing improver settings and the tolerant stored form they are migrated from.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Tone directive appended to improved prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceMode {
    #[default]
    Off,
    Natural,
    Ai,
}

impl VoiceMode {
    /// Stored/wire spelling.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Natural => "natural",
            Self::Ai => "ai",
        }
    }

    #[must_use]
    pub fn parse_name(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "off" => Some(Self::Off),
            "natural" => Some(Self::Natural),
            "ai" => Some(Self::Ai),
            _ => None,
        }
    }

    /// Human label shown in status lines.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Off => "Neutral",
            Self::Natural => "Natural voice",
            Self::Ai => "AI voice",
        }
    }
}

impl std::fmt::Display for VoiceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized improver configuration. Always valid; produced by [`StoredSettings::migrate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Settings {
    pub enabled: bool,
    pub voice_mode: VoiceMode,
    pub json_prompting: bool,
}

/// Raw persisted settings. Every field is optional and unknown keys are ignored so
/// older files (and the extension's camelCase export) keep loading.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StoredSettings {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default, alias = "voiceMode")]
    pub voice_mode: Option<String>,
    #[serde(default, alias = "jsonPrompting")]
    pub json_prompting: Option<bool>,
    #[serde(default, alias = "naturalVoice")]
    pub natural_voice: Option<bool>,
    #[serde(default, alias = "aiVoice")]
    pub ai_voice: Option<bool>,
}

impl StoredSettings {
    /// Parse the TOML settings file body.
    pub fn from_toml(contents: &str) -> Result<Self, SettingsError> {
        toml::from_str(contents).map_err(|err| SettingsError::Parse(err.to_string()))
    }

    /// Parse a JSON settings object (extension storage export).
    pub fn from_json(contents: &str) -> Result<Self, SettingsError> {
        serde_json::from_str(contents).map_err(|err| SettingsError::Parse(err.to_string()))
    }

    /// Resolve into [`Settings`]. An unset or unrecognized voice mode falls back to the
    /// legacy `natural_voice` / `ai_voice` toggles, then to `off`.
    #[must_use]
    pub fn migrate(&self) -> Settings {
        let voice_mode = self
            .voice_mode
            .as_deref()
            .and_then(VoiceMode::parse_name)
            .unwrap_or_else(|| {
                if self.natural_voice.unwrap_or(false) {
                    VoiceMode::Natural
                } else if self.ai_voice.unwrap_or(false) {
                    VoiceMode::Ai
                } else {
                    VoiceMode::Off
                }
            });
        Settings {
            enabled: self.enabled.unwrap_or(false),
            voice_mode,
            json_prompting: self.json_prompting.unwrap_or(false),
        }
    }
}

impl From<Settings> for StoredSettings {
    fn from(settings: Settings) -> Self {
        Self {
            enabled: Some(settings.enabled),
            voice_mode: Some(settings.voice_mode.as_str().to_string()),
            json_prompting: Some(settings.json_prompting),
            natural_voice: None,
            ai_voice: None,
        }
    }
}

/// One-line summary of the improver state.
#[must_use]
pub fn describe_status(settings: &Settings) -> String {
    if !settings.enabled {
        return "Improver resting".to_string();
    }
    let mut status = format!("Mode: {}", settings.voice_mode.label());
    if settings.json_prompting {
        status.push_str(" · JSON prompting");
    }
    status
}

/// Settings load/save failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    Parse(String),
    Io(String),
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "invalid settings: {msg}"),
            Self::Io(msg) => write!(f, "settings file error: {msg}"),
        }
    }
}

impl std::error::Error for SettingsError {}
