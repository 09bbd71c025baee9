use crate::llm::Provider;
use std::fmt;

/// Stages are part of the error surface: `rate_limited` and
/// `payment_required` are distinguished from generic `http` failures so
/// callers can report them separately.
#[derive(Debug, Clone)]
pub struct LlmDiagnosticsError {
    pub provider: Provider,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
}

pub const STAGE_HTTP: &str = "http";
pub const STAGE_RATE_LIMITED: &str = "rate_limited";
pub const STAGE_PAYMENT_REQUIRED: &str = "payment_required";
pub const STAGE_PARSE: &str = "parse";
pub const STAGE_VALIDATE: &str = "validate";

impl fmt::Display for LlmDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LLM error (provider={:?}, stage={}): {}",
            self.provider, self.stage, self.detail
        )
    }
}

impl std::error::Error for LlmDiagnosticsError {}
