//! Stand-in collaborator used until a real policy service is wired up.

use super::{SafetyCheck, SafetyCheckError, SafetyRequest};
use serde_json::{json, Value};

pub const NO_PROMPT_REASON: &str = "No prompt supplied";
pub const PENDING_REASON: &str = "InterSafety API integration pending";

/// Always answers `skipped`, echoing the request metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct PendingIntegrationCheck;

impl SafetyCheck for PendingIntegrationCheck {
    fn name(&self) -> &'static str {
        "pending-integration"
    }

    fn check(&self, request: &SafetyRequest) -> Result<Value, SafetyCheckError> {
        if request.text.is_empty() {
            return Ok(json!({ "status": "skipped", "reason": NO_PROMPT_REASON }));
        }
        let metadata = serde_json::to_value(request.metadata)
            .map_err(|err| SafetyCheckError::Malformed(err.to_string()))?;
        Ok(json!({
            "status": "skipped",
            "reason": PENDING_REASON,
            "metadata": metadata,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::safety::{Verdict, VerdictStatus};

    #[test]
    fn empty_prompt_is_reported() {
        let request = SafetyRequest::new("", "", &Settings::default());
        let verdict = Verdict::from_check(PendingIntegrationCheck.check(&request));
        assert_eq!(verdict.status, VerdictStatus::Skipped);
        assert_eq!(verdict.reason.as_deref(), Some(NO_PROMPT_REASON));
    }

    #[test]
    fn prompt_is_skipped_with_metadata_echo() {
        let request = SafetyRequest::new("hi", "Hi.", &Settings::default());
        let response = match PendingIntegrationCheck.check(&request) {
            Ok(response) => response,
            Err(err) => panic!("placeholder never fails: {err}"),
        };
        assert_eq!(response["reason"], PENDING_REASON);
        assert_eq!(response["metadata"]["refinedLength"], 3);
        assert_eq!(Verdict::from_response(&response).status, VerdictStatus::Skipped);
    }
}
