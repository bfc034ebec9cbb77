use std::sync::Arc;

use anyhow::Context;

use aimux_common::{GlobalConfig, ProvidersConfig};
use aimux_provider_core::{EventHub, ProviderRegistry};
use aimux_provider_impl::{UpstreamClientConfig, WreqUpstreamClient, build_registry};
use aimux_storage::UsageStore;

use crate::Orchestrator;

pub struct Bootstrap {
    pub global: GlobalConfig,
    pub registry: Arc<ProviderRegistry>,
    pub store: Arc<UsageStore>,
    pub orchestrator: Orchestrator,
}

/// Wires the registry, usage store and HTTP client into one orchestrator.
///
/// Fails only on configuration errors (no valid slot, unusable proxy) or an
/// unreadable state file; a corrupt one is recovered by the store.
pub async fn bootstrap(
    global: GlobalConfig,
    providers: &ProvidersConfig,
    events: EventHub,
) -> anyhow::Result<Bootstrap> {
    let registry = Arc::new(build_registry(providers).context("build provider registry")?);

    let store = Arc::new(
        UsageStore::open(&global.state_file, global.cooldown.clone())
            .await
            .with_context(|| format!("open usage store {}", global.state_file.display()))?
            .with_events(events.clone()),
    );

    let client = WreqUpstreamClient::new(UpstreamClientConfig::from_global(&global))
        .context("build upstream client")?;

    let orchestrator = Orchestrator::new(registry.clone(), store.clone(), Arc::new(client))
        .with_events(events);

    Ok(Bootstrap {
        global,
        registry,
        store,
        orchestrator,
    })
}
