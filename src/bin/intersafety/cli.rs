//! CLI flag schema for the `intersafety` binary.

use clap::{ArgAction, Args, Parser, Subcommand};
use intersafety::config::{AppConfig, VoiceMode};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "intersafety", about = "Improve prompts and gate submissions on a safety check", version)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) app: AppConfig,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Print the improved form of TEXT (or stdin)
    Improve(ImproveArgs),
    /// Run TEXT (or stdin) through the full preview-free submission flow
    Submit(SubmitArgs),
    /// Show or change persisted improver settings
    Settings(SettingsArgs),
}

#[derive(Debug, Args)]
pub(crate) struct OverrideArgs {
    /// Voice mode for this run only
    #[arg(long = "voice-mode", value_enum)]
    pub(crate) voice_mode: Option<VoiceMode>,

    /// Force JSON prompting on for this run only
    #[arg(long = "json", default_value_t = false)]
    pub(crate) json: bool,
}

#[derive(Debug, Args)]
pub(crate) struct ImproveArgs {
    /// Prompt text; read from stdin when omitted
    pub(crate) text: Option<String>,

    #[command(flatten)]
    pub(crate) overrides: OverrideArgs,
}

#[derive(Debug, Args)]
pub(crate) struct SubmitArgs {
    /// Prompt text; read from stdin when omitted
    pub(crate) text: Option<String>,

    #[command(flatten)]
    pub(crate) overrides: OverrideArgs,

    /// Hold the text in a rich-text surface instead of a plain field
    #[arg(long = "rich-text", default_value_t = false)]
    pub(crate) rich_text: bool,

    /// Regex matched against surface tags to pick the prompt editor
    #[arg(long = "surface-tag", env = "INTERSAFETY_SURFACE_TAG")]
    pub(crate) surface_tag: Option<String>,
}

#[derive(Debug, Args)]
pub(crate) struct SettingsArgs {
    /// Turn the improver on
    #[arg(long = "enable", action = ArgAction::SetTrue, conflicts_with = "disable")]
    pub(crate) enable: bool,

    /// Turn the improver off
    #[arg(long = "disable", action = ArgAction::SetTrue)]
    pub(crate) disable: bool,

    #[arg(long = "voice-mode", value_enum)]
    pub(crate) voice_mode: Option<VoiceMode>,

    #[arg(long = "json-prompting")]
    pub(crate) json_prompting: Option<bool>,

    /// Import settings exported from browser storage (JSON object)
    #[arg(long = "import")]
    pub(crate) import: Option<PathBuf>,

    /// Keep running and print the status whenever the settings file changes
    #[arg(long = "watch", default_value_t = false)]
    pub(crate) watch: bool,
}

impl SettingsArgs {
    pub(crate) fn has_changes(&self) -> bool {
        self.enable
            || self.disable
            || self.voice_mode.is_some()
            || self.json_prompting.is_some()
            || self.import.is_some()
    }
}
