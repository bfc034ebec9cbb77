use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use aimux_common::{ProvidersConfig, SlotRecord};
use tracing::{info, warn};

use crate::{ProviderAdapter, ProviderDescriptor, ProviderKind, SlotId};

#[derive(Clone)]
pub struct RegisteredProvider {
    pub descriptor: ProviderDescriptor,
    pub adapter: Arc<dyn ProviderAdapter>,
}

impl fmt::Debug for RegisteredProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredProvider")
            .field("descriptor", &self.descriptor)
            .field("adapter", &self.adapter.kind())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingType,
    MissingKey,
    UnknownType(String),
    InvalidPriority(String),
    DuplicateSlot,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingType => f.write_str("missing type"),
            SkipReason::MissingKey => f.write_str("missing api key"),
            SkipReason::UnknownType(kind) => write!(f, "unknown type {kind:?}"),
            SkipReason::InvalidPriority(value) => write!(f, "invalid priority {value:?}"),
            SkipReason::DuplicateSlot => f.write_str("duplicate slot"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSlot {
    pub slot: SlotId,
    pub reason: SkipReason,
}

/// Configuration error: nothing usable was configured. Distinct from runtime exhaustion.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no valid provider slots configured ({} skipped)", .skipped.len())]
    NoValidProviders { skipped: Vec<SkippedSlot> },
}

/// Ordered, immutable provider list. Order is the failover precedence.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: Vec<RegisteredProvider>,
    skipped: Vec<SkippedSlot>,
}

impl ProviderRegistry {
    /// Validates every configured slot; bad slots are skipped with a logged reason.
    pub fn build<F>(config: &ProvidersConfig, adapter_for: F) -> Result<Self, RegistryError>
    where
        F: Fn(ProviderKind) -> Arc<dyn ProviderAdapter>,
    {
        let mut providers = Vec::new();
        let mut skipped = Vec::new();
        let mut seen = HashSet::new();

        for record in &config.slots {
            if !seen.insert(record.slot) {
                skip(&mut skipped, record.slot, SkipReason::DuplicateSlot);
                continue;
            }
            match descriptor_from_record(record) {
                Ok(descriptor) => {
                    let adapter = adapter_for(descriptor.kind);
                    providers.push(RegisteredProvider {
                        descriptor,
                        adapter,
                    });
                }
                Err(reason) => skip(&mut skipped, record.slot, reason),
            }
        }

        Self::assemble(providers, skipped)
    }

    pub fn from_providers(providers: Vec<RegisteredProvider>) -> Result<Self, RegistryError> {
        Self::assemble(providers, Vec::new())
    }

    fn assemble(
        mut providers: Vec<RegisteredProvider>,
        skipped: Vec<SkippedSlot>,
    ) -> Result<Self, RegistryError> {
        if providers.is_empty() {
            return Err(RegistryError::NoValidProviders { skipped });
        }
        providers.sort_by_key(|p| (p.descriptor.priority, p.descriptor.slot));
        for p in &providers {
            info!(
                slot = p.descriptor.slot,
                provider = %p.descriptor.kind,
                model = %p.descriptor.model,
                priority = p.descriptor.priority,
                "provider registered"
            );
        }
        Ok(Self { providers, skipped })
    }

    pub fn providers(&self) -> &[RegisteredProvider] {
        &self.providers
    }

    pub fn skipped(&self) -> &[SkippedSlot] {
        &self.skipped
    }

    pub fn get(&self, slot: SlotId) -> Option<&RegisteredProvider> {
        self.providers.iter().find(|p| p.descriptor.slot == slot)
    }

    pub fn slots(&self) -> Vec<SlotId> {
        self.providers.iter().map(|p| p.descriptor.slot).collect()
    }
}

fn skip(skipped: &mut Vec<SkippedSlot>, slot: SlotId, reason: SkipReason) {
    warn!(slot, reason = %reason, "provider slot skipped");
    skipped.push(SkippedSlot { slot, reason });
}

fn descriptor_from_record(record: &SlotRecord) -> Result<ProviderDescriptor, SkipReason> {
    let raw_kind = record.kind.as_deref().ok_or(SkipReason::MissingType)?;
    let kind =
        ProviderKind::parse(raw_kind).ok_or_else(|| SkipReason::UnknownType(raw_kind.to_string()))?;
    let api_key = record.api_key.clone().ok_or(SkipReason::MissingKey)?;
    let priority = match record.priority.as_deref() {
        Some(value) => value
            .parse::<i64>()
            .map_err(|_| SkipReason::InvalidPriority(value.to_string()))?,
        None => i64::from(record.slot),
    };
    Ok(ProviderDescriptor {
        slot: record.slot,
        kind,
        api_key,
        model: record
            .model
            .clone()
            .unwrap_or_else(|| kind.default_model().to_string()),
        priority,
        base_url: record.base_url.clone(),
    })
}
