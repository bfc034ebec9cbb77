use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{ErrorKind, ProviderKind, SlotId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    AttemptSucceeded(AttemptSucceededEvent),
    AttemptFailed(AttemptFailedEvent),
    CooldownStarted(CooldownStartedEvent),
    UsageReset(UsageResetEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptSucceededEvent {
    pub trace_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
    pub slot: SlotId,
    pub provider: ProviderKind,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptFailedEvent {
    pub trace_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
    pub slot: SlotId,
    pub provider: ProviderKind,
    pub error_kind: ErrorKind,
    pub message: String,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CooldownStartedEvent {
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
    pub slot: SlotId,
    pub reason: ErrorKind,
    pub consecutive_failures: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub until: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageResetEvent {
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
    pub cleared_slots: usize,
    pub backup_path: String,
}
