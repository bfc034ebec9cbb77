//! Core provider abstractions for aimux.
//!
//! This crate does **not** depend on a concrete HTTP client. Adapters build
//! `UpstreamHttpRequest`s and decode bodies; an `UpstreamClient` performs the IO.

pub mod cooldown;
pub mod descriptor;
pub mod errors;
pub mod events;
pub mod headers;
pub mod provider;
pub mod registry;
pub mod request;
pub mod response;
pub mod usage;

pub use aimux_common::CooldownPolicy;
pub use cooldown::cooldown_for;
pub use descriptor::{ProviderDescriptor, ProviderKind, SlotId};
pub use errors::{ProviderError, ProviderResult};
pub use events::{
    AttemptFailedEvent, AttemptSucceededEvent, CooldownStartedEvent, Event, EventHub, EventSink,
    TerminalEventSink, UsageResetEvent,
};
pub use headers::{Headers, header_get, header_set};
pub use provider::{
    ClassifiedError, HttpMethod, ProviderAdapter, UpstreamClient, UpstreamFailure,
    UpstreamHttpRequest, UpstreamHttpResponse, UpstreamTransportErrorKind, classify_failure,
};
pub use registry::{ProviderRegistry, RegisteredProvider, RegistryError, SkipReason, SkippedSlot};
pub use request::{ChatMessage, GenerateRequest, Role};
pub use response::{
    ALL_PROVIDERS_FAILED, AttemptOutcome, AttemptRecord, Completion, FailureKind,
    GenerateResult, UsageSummary,
};
pub use usage::{ErrorKind, UsageEntry};
