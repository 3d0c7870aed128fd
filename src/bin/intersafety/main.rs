//! `intersafety` entrypoint: improve prompts, run the gated submit flow, and manage settings.
//!
//! The binary drives the same session a browser host would, against an in-memory
//! document, so policy commands can be exercised from a shell.

mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Command, ImproveArgs, OverrideArgs, SettingsArgs, SubmitArgs};
use intersafety::config::{
    describe_status, load_settings_from, save_settings_to, Settings, SettingsSource,
    SettingsWatcher, SharedSettings, StoredSettings,
};
use intersafety::safety::{CommandSafetyCheck, PendingIntegrationCheck, SafetyCheck};
use intersafety::surface::{
    FieldSurface, FocusedResolver, MemoryHost, RichTextSurface, SurfaceResolver, TaggedResolver,
};
use intersafety::trigger::{KeyInput, CONFIRM_KEY};
use intersafety::{
    improve, init_logging, init_tracing, log_debug, log_file_path, AppConfig, PromptSession,
    SubmitOutcome,
};
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Exit status when the safety check blocks a submission.
const EXIT_BLOCKED: u8 = 2;
const WATCH_POLL_INTERVAL: Duration = Duration::from_millis(250);

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli.app);
    init_tracing(&cli.app);
    if cli.app.logging_enabled() {
        log_debug(&format!(
            "intersafety {} started; log file {}",
            env!("CARGO_PKG_VERSION"),
            log_file_path().display()
        ));
    }

    let stored = match cli.app.settings_path() {
        Some(path) => load_settings_from(&path),
        None => Settings::default(),
    };

    match &cli.command {
        Command::Improve(args) => run_improve(args, stored),
        Command::Submit(args) => run_submit(&cli.app, args, stored),
        Command::Settings(args) => run_settings(&cli.app, args, stored),
    }
}

fn read_prompt(text: Option<&str>) -> Result<String> {
    if let Some(text) = text {
        return Ok(text.to_string());
    }
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("failed to read prompt from stdin")?;
    Ok(buffer.trim_end_matches(['\n', '\r']).to_string())
}

fn apply_overrides(mut settings: Settings, overrides: &OverrideArgs) -> Settings {
    if let Some(mode) = overrides.voice_mode {
        settings.voice_mode = mode;
    }
    if overrides.json {
        settings.json_prompting = true;
    }
    settings
}

fn run_improve(args: &ImproveArgs, stored: Settings) -> Result<ExitCode> {
    let prompt = read_prompt(args.text.as_deref())?;
    let settings = apply_overrides(stored, &args.overrides);
    println!("{}", improve(&prompt, &settings));
    Ok(ExitCode::SUCCESS)
}

fn build_check(config: &AppConfig) -> Result<Arc<dyn SafetyCheck>> {
    match config.safety_cmd.as_deref() {
        Some(line) => {
            let check = CommandSafetyCheck::from_command_line(line, config.safety_timeout())?;
            log_debug(&format!("safety check command: {}", check.program()));
            Ok(Arc::new(check))
        }
        None => Ok(Arc::new(PendingIntegrationCheck)),
    }
}

fn build_resolver(args: &SubmitArgs) -> Result<Box<dyn SurfaceResolver>> {
    match args.surface_tag.as_deref() {
        Some(pattern) => Ok(Box::new(TaggedResolver::new(pattern)?)),
        None => Ok(Box::new(FocusedResolver)),
    }
}

fn run_submit(config: &AppConfig, args: &SubmitArgs, stored: Settings) -> Result<ExitCode> {
    let prompt = read_prompt(args.text.as_deref())?;
    if prompt.trim().is_empty() {
        bail!("nothing to submit: prompt is empty");
    }
    let mut settings = apply_overrides(stored, &args.overrides);
    settings.enabled = true;

    let mut host = MemoryHost::new();
    let id = if args.rich_text {
        host.add_rich_text(RichTextSurface::new(&prompt).with_tag("prompt-textarea"))
    } else {
        host.add_field(FieldSurface::new(prompt).with_tag("prompt-textarea"))
    };
    host.focus(Some(id));

    let mut session = PromptSession::new(
        SharedSettings::new(settings),
        build_resolver(args)?,
        build_check(config)?,
        config.safety_timeout(),
    );

    let outcome = session.handle_key(&mut host, &KeyInput::down(CONFIRM_KEY).on(id), Instant::now());
    if !outcome.suppress_default {
        bail!("submission was not started");
    }

    match session.settle(&mut host) {
        SubmitOutcome::Blocked { reason, .. } => {
            eprintln!("{reason}");
            return Ok(ExitCode::from(EXIT_BLOCKED));
        }
        SubmitOutcome::Committed { status, .. } => {
            log_debug(&format!("verdict {status}; submitting"));
        }
        other => bail!("unexpected submission state: {other:?}"),
    }

    match session.tick(&mut host, Instant::now()) {
        SubmitOutcome::Submitted { .. } => {}
        other => bail!("submission did not complete: {other:?}"),
    }
    match host.last_submitted() {
        Some(text) => println!("{text}"),
        None => bail!("host recorded no submission"),
    }
    Ok(ExitCode::SUCCESS)
}

fn import_settings(path: &Path) -> Result<Settings> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let stored = StoredSettings::from_json(&contents)
        .with_context(|| format!("failed to import {}", path.display()))?;
    Ok(stored.migrate())
}

fn run_settings(config: &AppConfig, args: &SettingsArgs, stored: Settings) -> Result<ExitCode> {
    let Some(path) = config.settings_path() else {
        bail!("no settings location; pass --settings-file");
    };

    let mut settings = match args.import.as_deref() {
        Some(source) => import_settings(source)?,
        None => stored,
    };
    if args.enable {
        settings.enabled = true;
    }
    if args.disable {
        settings.enabled = false;
    }
    if let Some(mode) = args.voice_mode {
        settings.voice_mode = mode;
    }
    if let Some(json) = args.json_prompting {
        settings.json_prompting = json;
    }

    if args.has_changes() {
        save_settings_to(&path, &settings)
            .with_context(|| format!("failed to save {}", path.display()))?;
    }
    println!("{}", describe_status(&settings));

    if args.watch {
        watch_settings(path.as_path(), settings);
    }
    Ok(ExitCode::SUCCESS)
}

fn watch_settings(path: &Path, initial: Settings) -> ! {
    let store = SharedSettings::new(initial);
    let _subscription = store.subscribe(Box::new(|settings: &Settings| {
        println!("{}", describe_status(settings));
    }));
    let mut watcher = SettingsWatcher::new(path.to_path_buf());
    loop {
        watcher.poll(&store);
        thread::sleep(WATCH_POLL_INTERVAL);
    }
}
