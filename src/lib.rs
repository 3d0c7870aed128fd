//! InterSafety prompt improver: augmentation, live preview, and a fail-open safety gate on submit.

pub mod augment;
pub mod config;
mod logging;
pub mod preview;
pub mod safety;
pub mod session;
pub mod submit;
pub mod surface;
mod telemetry;
pub mod toast;
pub mod trigger;

pub use augment::improve;
pub use config::{AppConfig, Settings, SettingsSource, SharedSettings, VoiceMode};
pub use logging::{
    default_log_path, init_logging, log_attempt, log_debug, log_debug_content, log_file_path,
    log_scoped, log_surface, LogScope,
};
pub use preview::PreviewController;
pub use session::{KeyOutcome, PromptSession};
pub use submit::{SubmissionOrchestrator, SubmitOutcome, SubmitPath, SubmitRejected};
pub use telemetry::init_tracing;
pub use toast::{ToastHost, ToastSlot};
