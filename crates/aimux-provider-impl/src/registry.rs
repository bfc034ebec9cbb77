use std::sync::Arc;

use aimux_common::ProvidersConfig;
use aimux_provider_core::{ProviderAdapter, ProviderKind, ProviderRegistry, RegistryError};

use crate::{GeminiAdapter, OpenAICompatibleAdapter};

/// Picks the adapter for a provider family. Resolved once per slot at build time.
pub fn adapter_for_kind(kind: ProviderKind) -> Arc<dyn ProviderAdapter> {
    match OpenAICompatibleAdapter::new(kind) {
        Some(adapter) => Arc::new(adapter),
        None => Arc::new(GeminiAdapter::new()),
    }
}

pub fn build_registry(config: &ProvidersConfig) -> Result<ProviderRegistry, RegistryError> {
    ProviderRegistry::build(config, adapter_for_kind)
}
