pub type ProviderResult<T> = Result<T, ProviderError>;

/// Failure to build an outbound call. The orchestrator treats it as a broken slot.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("descriptor field `{0}` is empty")]
    MissingField(&'static str),
    #[error("request body could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}
