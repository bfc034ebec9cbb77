use std::time::Duration;

use aimux_common::CooldownPolicy;

use crate::usage::ErrorKind;

/// Cooldown window after a classified failure.
///
/// `consecutive_failures` is the streak including the failure being recorded (>= 1).
/// `retry_after` is a provider hint and only widens rate-limit windows.
/// Returns `None` when the slot must stay eligible.
pub fn cooldown_for(
    policy: &CooldownPolicy,
    kind: ErrorKind,
    consecutive_failures: u32,
    retry_after: Option<Duration>,
) -> Option<Duration> {
    let repeats = consecutive_failures.saturating_sub(1);
    match kind {
        ErrorKind::RateLimited => {
            let factor = 1u64.checked_shl(repeats).unwrap_or(u64::MAX);
            let backoff = policy.rate_limit_base_secs.saturating_mul(factor);
            let hinted = retry_after.map(|d| d.as_secs()).unwrap_or(0);
            let secs = backoff.max(hinted).min(policy.rate_limit_max_secs);
            Some(Duration::from_secs(secs))
        }
        ErrorKind::AuthError => Some(Duration::from_secs(policy.auth_secs)),
        ErrorKind::Timeout | ErrorKind::ServerError => {
            let multiplier = policy.transient_multiplier.max(1.0);
            let exponent = repeats.min(64) as i32;
            let secs = policy.transient_base_secs as f64 * multiplier.powi(exponent);
            let capped = secs.min(policy.transient_max_secs as f64).max(0.0);
            // `u64::MAX as f64` rounds past the largest `Duration`.
            let window = Duration::try_from_secs_f64(capped)
                .unwrap_or(Duration::from_secs(policy.transient_max_secs));
            Some(window)
        }
        ErrorKind::InvalidRequest => None,
    }
}
