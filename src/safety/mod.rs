//! Safety-check collaborator contract and verdict handling.
//!
//! The check itself is external. Everything here is about asking it once per
//! submission and turning whatever comes back (including nothing) into a
//! [`Verdict`]. Failures fail open: they become `skipped`, never errors.

mod command;
mod job;
mod placeholder;

pub use command::CommandSafetyCheck;
pub use job::VerdictJob;
pub use placeholder::PendingIntegrationCheck;

use crate::config::{Settings, VoiceMode};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Toast text when a block carries no reason.
pub const DEFAULT_BLOCK_REASON: &str = "Prompt blocked by safety policy.";
/// Reason attached when the collaborator errored or answered with garbage.
pub const UNAVAILABLE_REASON: &str = "Safety check unavailable";
/// Reason attached when the deadline passed first.
pub const TIMEOUT_REASON: &str = "Safety check timed out";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyMetadata {
    pub original_length: usize,
    pub refined_length: usize,
    pub voice_mode: VoiceMode,
    pub json_prompting: bool,
}

/// Payload sent to the collaborator. Lengths count characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafetyRequest {
    pub text: String,
    pub metadata: SafetyMetadata,
}

impl SafetyRequest {
    #[must_use]
    pub fn new(original: &str, improved: &str, settings: &Settings) -> Self {
        Self {
            text: improved.to_string(),
            metadata: SafetyMetadata {
                original_length: original.chars().count(),
                refined_length: improved.chars().count(),
                voice_mode: settings.voice_mode,
                json_prompting: settings.json_prompting,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictStatus {
    Allowed,
    Blocked,
    Skipped,
}

impl VerdictStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Blocked => "blocked",
            Self::Skipped => "skipped",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "allowed" => Some(Self::Allowed),
            "blocked" => Some(Self::Blocked),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub reason: Option<String>,
}

impl Verdict {
    #[must_use]
    pub fn allowed() -> Self {
        Self {
            status: VerdictStatus::Allowed,
            reason: None,
        }
    }

    #[must_use]
    pub fn blocked(reason: Option<String>) -> Self {
        Self {
            status: VerdictStatus::Blocked,
            reason,
        }
    }

    #[must_use]
    pub fn skipped(reason: &str) -> Self {
        Self {
            status: VerdictStatus::Skipped,
            reason: Some(reason.to_string()),
        }
    }

    /// Interpret a `{status, reason?}` response. Anything unrecognized is `skipped`.
    #[must_use]
    pub fn from_response(value: &Value) -> Self {
        let Some(status) = value
            .get("status")
            .and_then(Value::as_str)
            .and_then(VerdictStatus::parse)
        else {
            return Self::skipped(UNAVAILABLE_REASON);
        };
        let reason = value
            .get("reason")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .map(str::to_string);
        Self { status, reason }
    }

    /// Collapse a collaborator outcome, downgrading every failure to `skipped`.
    #[must_use]
    pub fn from_check(result: Result<Value, SafetyCheckError>) -> Self {
        match result {
            Ok(value) => Self::from_response(&value),
            Err(err) => {
                crate::log_debug(&format!("safety check failed, continuing: {err}"));
                Self::skipped(UNAVAILABLE_REASON)
            }
        }
    }

    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.status == VerdictStatus::Blocked
    }

    /// Message shown when this verdict blocks a submission.
    #[must_use]
    pub fn block_message(&self) -> &str {
        self.reason.as_deref().unwrap_or(DEFAULT_BLOCK_REASON)
    }
}

/// Transport-level failures talking to a safety collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafetyCheckError {
    /// The collaborator is not configured or refused to start.
    Unavailable(String),
    /// Reading or writing the collaborator's streams failed.
    Io(String),
    /// The collaborator exited unsuccessfully.
    Exit { code: Option<i32>, stderr: String },
    /// The response was not JSON.
    Malformed(String),
}

impl fmt::Display for SafetyCheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "safety check unavailable: {msg}"),
            Self::Io(msg) => write!(f, "safety check io error: {msg}"),
            Self::Exit { code: Some(code), stderr } => {
                write!(f, "safety check exited with code {code}: {stderr}")
            }
            Self::Exit { code: None, stderr } => {
                write!(f, "safety check terminated by signal: {stderr}")
            }
            Self::Malformed(msg) => write!(f, "safety check returned malformed output: {msg}"),
        }
    }
}

impl std::error::Error for SafetyCheckError {}

/// External safety-check collaborator. Called off the interactive thread.
pub trait SafetyCheck: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    fn check(&self, request: &SafetyRequest) -> Result<Value, SafetyCheckError>;
}
