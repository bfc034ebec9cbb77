use serde::{Deserialize, Serialize};

use crate::{ErrorKind, ProviderDescriptor, ProviderKind, SlotId};

pub const ALL_PROVIDERS_FAILED: &str = "all providers failed";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

/// Normalized adapter output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub usage: Option<UsageSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error_kind", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Slot was cooling down; no call was made.
    Skipped,
    Failed(ErrorKind),
    /// The overall deadline ran out before this slot could be tried.
    DeadlineExceeded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub slot: SlotId,
    pub provider: ProviderKind,
    pub outcome: AttemptOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub elapsed_ms: u64,
}

impl AttemptRecord {
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self.outcome {
            AttemptOutcome::Failed(kind) => Some(kind),
            AttemptOutcome::Skipped | AttemptOutcome::DeadlineExceeded => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Skipped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    AllProvidersFailed,
    InvalidRequest,
}

/// Outcome of one `generate` call, success or failure. Never an `Err`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResult {
    pub success: bool,
    pub trace_id: String,
    pub provider_slot: Option<SlotId>,
    pub provider_type: Option<ProviderKind>,
    pub model: Option<String>,
    pub response_text: Option<String>,
    pub usage: Option<UsageSummary>,
    pub error: Option<String>,
    pub failure: Option<FailureKind>,
    pub attempts: Vec<AttemptRecord>,
}

impl GenerateResult {
    pub fn succeeded(
        trace_id: String,
        descriptor: &ProviderDescriptor,
        completion: Completion,
        attempts: Vec<AttemptRecord>,
    ) -> Self {
        Self {
            success: true,
            trace_id,
            provider_slot: Some(descriptor.slot),
            provider_type: Some(descriptor.kind),
            model: Some(descriptor.model.clone()),
            response_text: Some(completion.text),
            usage: completion.usage,
            error: None,
            failure: None,
            attempts,
        }
    }

    pub fn all_failed(trace_id: String, attempts: Vec<AttemptRecord>) -> Self {
        Self::failed(
            trace_id,
            FailureKind::AllProvidersFailed,
            ALL_PROVIDERS_FAILED.to_string(),
            attempts,
        )
    }

    pub fn invalid_request(
        trace_id: String,
        message: impl Into<String>,
        attempts: Vec<AttemptRecord>,
    ) -> Self {
        Self::failed(
            trace_id,
            FailureKind::InvalidRequest,
            format!("invalid request: {}", message.into()),
            attempts,
        )
    }

    fn failed(
        trace_id: String,
        failure: FailureKind,
        error: String,
        attempts: Vec<AttemptRecord>,
    ) -> Self {
        Self {
            success: false,
            trace_id,
            provider_slot: None,
            provider_type: None,
            model: None,
            response_text: None,
            usage: None,
            error: Some(error),
            failure: Some(failure),
            attempts,
        }
    }
}
