//! Integration tests that lock the `intersafety` binary's improve, submit, and settings paths.

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

const STEP_BY_STEP: &str = "Provide the answer step-by-step with concise reasoning.";
const TAKEAWAYS: &str = "Highlight the most important takeaways at the end.";

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "intersafety-cli-{name}-{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

fn run(config_dir: &PathBuf, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_intersafety"))
        .args(args)
        .env("INTERSAFETY_CONFIG_DIR", config_dir)
        .env_remove("INTERSAFETY_SAFETY_CMD")
        .env_remove("INTERSAFETY_SURFACE_TAG")
        .output()
        .expect("run intersafety")
}

#[test]
fn improve_prints_augmented_prompt() {
    let dir = scratch_dir("improve");
    let output = run(&dir, &["improve", "Explain recursion"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim_end(),
        format!("Explain recursion.\n\n{STEP_BY_STEP} {TAKEAWAYS}")
    );
}

#[test]
fn improve_honors_voice_override() {
    let dir = scratch_dir("improve-voice");
    let output = run(&dir, &["improve", "Compare sorts", "--voice-mode", "ai"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("explicitly numbered logic"));
}

#[test]
fn submit_without_policy_command_sends_improved_text() {
    let dir = scratch_dir("submit-skip");
    let output = run(&dir, &["submit", "Explain recursion"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Explain recursion.\n\n"));
    assert!(stdout.contains(TAKEAWAYS));
}

#[cfg(unix)]
#[test]
fn submit_blocked_by_policy_command_exits_with_reason() {
    let dir = scratch_dir("submit-blocked");
    let command =
        r#"sh -c 'cat >/dev/null; echo "{\"status\":\"blocked\",\"reason\":\"Too risky\"}"'"#;
    let output = run(&dir, &["submit", "Explain recursion", "--safety-cmd", command]);
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Too risky"));
}

#[cfg(unix)]
#[test]
fn submit_fails_open_when_policy_command_errors() {
    let dir = scratch_dir("submit-fail-open");
    let output = run(
        &dir,
        &["submit", "Explain recursion", "--safety-cmd", "sh -c 'exit 3'"],
    );
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(STEP_BY_STEP));
}

#[test]
fn settings_round_trip_through_config_dir() {
    let dir = scratch_dir("settings");
    let output = run(&dir, &["settings"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "Improver resting");

    let output = run(&dir, &["settings", "--enable", "--voice-mode", "natural"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "Mode: Natural voice");
    assert!(dir.join("settings.toml").exists());

    let output = run(&dir, &["improve", "Summarize this."]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("warm, collaborative tone"));
}

#[test]
fn settings_import_migrates_legacy_toggles() {
    let dir = scratch_dir("import");
    let export = dir.join("export.json");
    fs::write(&export, r#"{"enabled": true, "aiVoice": true, "jsonPrompting": true}"#)
        .expect("write export");
    let export = export.to_string_lossy().to_string();
    let output = run(&dir, &["settings", "--import", &export]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "Mode: AI voice · JSON prompting"
    );
}

#[test]
fn enable_and_disable_are_rejected_together() {
    let dir = scratch_dir("conflict");
    let output = run(&dir, &["settings", "--enable", "--disable"]);
    assert!(!output.status.success());
}
