use serde::{Deserialize, Serialize};

/// Highest slot index read from the environment.
pub const MAX_SLOTS: u8 = 8;

const ENV_PREFIX: &str = "AIMUX_PROVIDER";

/// Raw, unvalidated record for one provider slot.
///
/// Validation (required fields, known type, priority parse) happens when the
/// registry is built so that one bad slot never hides the others.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRecord {
    pub slot: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl SlotRecord {
    fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.api_key.is_none()
            && self.model.is_none()
            && self.priority.is_none()
            && self.base_url.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub slots: Vec<SlotRecord>,
}

impl ProvidersConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads `AIMUX_PROVIDER_{n}_{FIELD}` for `n` in `1..=MAX_SLOTS`.
    ///
    /// Slots with no variables at all are left out; partially configured slots are kept.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |slot: u8, field: &str| {
            lookup(&slot_env_key(slot, field))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let slots = (1..=MAX_SLOTS)
            .map(|slot| SlotRecord {
                slot,
                kind: read(slot, "TYPE"),
                api_key: read(slot, "KEY"),
                model: read(slot, "MODEL"),
                priority: read(slot, "PRIORITY"),
                base_url: read(slot, "BASE_URL"),
            })
            .filter(|record| !record.is_empty())
            .collect();
        Self { slots }
    }
}

pub fn slot_env_key(slot: u8, field: &str) -> String {
    format!("{ENV_PREFIX}_{slot}_{field}")
}
