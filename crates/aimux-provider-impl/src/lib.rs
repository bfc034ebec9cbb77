//! Built-in provider adapters and the wreq-backed upstream client.
//!
//! Adapters only build `UpstreamHttpRequest`s and decode bodies; all network IO
//! goes through [`WreqUpstreamClient`] (or a test double).

mod client;
mod providers;
mod registry;

pub use client::{UpstreamClientConfig, WreqUpstreamClient};
pub use providers::gemini::GeminiAdapter;
pub use providers::openai_compat::OpenAICompatibleAdapter;
pub use registry::{adapter_for_kind, build_registry};
