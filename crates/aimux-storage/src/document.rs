use std::collections::BTreeMap;

use aimux_provider_core::{SlotId, UsageEntry};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub const STATE_VERSION: u32 = 1;

/// On-disk shape of the state file: slot -> entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub slots: BTreeMap<SlotId, UsageEntry>,
}

fn default_version() -> u32 {
    STATE_VERSION
}

impl Default for UsageDocument {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: None,
            slots: BTreeMap::new(),
        }
    }
}

impl UsageDocument {
    /// Entry for `slot`, or the initial empty entry if it was never touched.
    pub fn entry(&self, slot: SlotId) -> UsageEntry {
        self.slots
            .get(&slot)
            .cloned()
            .unwrap_or_else(|| UsageEntry::new(slot))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotStatus {
    pub slot: SlotId,
    pub eligible: bool,
    pub entry: UsageEntry,
}
