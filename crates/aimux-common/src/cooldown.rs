use serde::{Deserialize, Serialize};

/// Cooldown tunables, one knob set per failure family.
///
/// Windows are computed in `aimux-provider-core`; this type only carries the numbers so it
/// can be loaded from a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownPolicy {
    /// First rate-limit window; doubled for every further consecutive failure.
    pub rate_limit_base_secs: u64,
    pub rate_limit_max_secs: u64,
    /// Flat window after an auth failure.
    pub auth_secs: u64,
    /// First window after a timeout or server error.
    pub transient_base_secs: u64,
    /// Growth factor applied per repeat transient failure.
    pub transient_multiplier: f64,
    pub transient_max_secs: u64,
}

impl Default for CooldownPolicy {
    fn default() -> Self {
        Self {
            rate_limit_base_secs: 60,
            rate_limit_max_secs: 60 * 60,
            auth_secs: 24 * 60 * 60,
            transient_base_secs: 30,
            transient_multiplier: 1.5,
            transient_max_secs: 10 * 60,
        }
    }
}
