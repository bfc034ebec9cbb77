use std::fmt;
use std::time::Duration;

use aimux_common::CooldownPolicy;
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::SlotId;
use crate::cooldown::cooldown_for;

/// Failure classification shared by adapters, the usage store and the attempt trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    RateLimited,
    AuthError,
    Timeout,
    ServerError,
    /// The request itself is at fault; every provider would reject it.
    InvalidRequest,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::AuthError => "auth_error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ServerError => "server_error",
            ErrorKind::InvalidRequest => "invalid_request",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted health record for one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEntry {
    pub slot: SlotId,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub cooldown_until: Option<OffsetDateTime>,
    #[serde(default)]
    pub consecutive_failures: u32,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_success: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_failure: Option<OffsetDateTime>,
    #[serde(default)]
    pub last_error_kind: Option<ErrorKind>,
}

impl UsageEntry {
    pub fn new(slot: SlotId) -> Self {
        Self {
            slot,
            cooldown_until: None,
            consecutive_failures: 0,
            last_success: None,
            last_failure: None,
            last_error_kind: None,
        }
    }

    pub fn is_eligible(&self, now: OffsetDateTime) -> bool {
        match self.cooldown_until {
            Some(until) => until <= now,
            None => true,
        }
    }

    pub fn record_success(&mut self, now: OffsetDateTime) {
        self.cooldown_until = None;
        self.consecutive_failures = 0;
        self.last_success = Some(now);
    }

    /// Applies one classified failure and returns the cooldown window that was set.
    ///
    /// `InvalidRequest` only stamps `last_failure`/`last_error_kind`: the streak and any
    /// running cooldown are left as they were.
    pub fn record_failure(
        &mut self,
        kind: ErrorKind,
        now: OffsetDateTime,
        policy: &CooldownPolicy,
        retry_after: Option<Duration>,
    ) -> Option<Duration> {
        self.last_failure = Some(now);
        self.last_error_kind = Some(kind);
        if kind == ErrorKind::InvalidRequest {
            return None;
        }
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let window = cooldown_for(policy, kind, self.consecutive_failures, retry_after)?;
        self.cooldown_until = Some(cooldown_deadline(now, window));
        Some(window)
    }
}

/// `now + window`, pinned to the latest representable instant on overflow.
fn cooldown_deadline(now: OffsetDateTime, window: Duration) -> OffsetDateTime {
    time::Duration::try_from(window)
        .ok()
        .and_then(|window| now.checked_add(window))
        .unwrap_or(PrimitiveDateTime::MAX.assume_utc())
}
