use std::sync::Arc;
use std::time::Duration;

use aimux_provider_core::{
    AttemptFailedEvent, AttemptOutcome, AttemptRecord, AttemptSucceededEvent, Completion,
    ErrorKind, Event, EventHub, GenerateRequest, GenerateResult, ProviderDescriptor,
    ProviderRegistry, RegisteredProvider, UpstreamClient,
};
use aimux_storage::UsageStore;
use time::OffsetDateTime;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Wall-clock source for cooldown bookkeeping.
pub type Clock = Arc<dyn Fn() -> OffsetDateTime + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(OffsetDateTime::now_utc)
}

/// Failover dispatcher over the registry's provider order.
///
/// Cheap to clone; every `generate` call runs its own scan and only meets other
/// calls at the usage store.
#[derive(Clone)]
pub struct Orchestrator {
    registry: Arc<ProviderRegistry>,
    store: Arc<UsageStore>,
    client: Arc<dyn UpstreamClient>,
    events: EventHub,
    clock: Clock,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        store: Arc<UsageStore>,
        client: Arc<dyn UpstreamClient>,
    ) -> Self {
        Self {
            registry,
            store,
            client,
            events: EventHub::default(),
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_events(mut self, events: EventHub) -> Self {
        self.events = events;
        self
    }

    /// Tries eligible providers in order until one succeeds.
    ///
    /// Never fails: exhaustion, an invalid request and a passed deadline all come
    /// back as a `GenerateResult` with `success = false` and the attempt trace.
    pub async fn generate(&self, request: &GenerateRequest) -> GenerateResult {
        let trace_id = Uuid::new_v4().to_string();
        if let Err(reason) = validate(request) {
            warn!(event = "request_rejected", trace_id = %trace_id, reason);
            return GenerateResult::invalid_request(trace_id, reason, Vec::new());
        }

        // A deadline past the clock's range is no deadline at all.
        let deadline = request
            .deadline
            .and_then(|d| Instant::now().checked_add(d));
        let mut attempts = Vec::new();

        for provider in self.registry.providers() {
            let descriptor = &provider.descriptor;
            if !self.store.is_eligible(descriptor.slot, (self.clock)()) {
                debug!(
                    event = "provider_attempt",
                    trace_id = %trace_id,
                    slot = descriptor.slot,
                    provider = %descriptor.kind,
                    outcome = "skipped",
                );
                attempts.push(record(descriptor, AttemptOutcome::Skipped, None, 0));
                continue;
            }

            let timeout = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        warn!(
                            event = "deadline_exceeded",
                            trace_id = %trace_id,
                            next_slot = descriptor.slot,
                            attempts = attempts.len(),
                        );
                        attempts.push(record(
                            descriptor,
                            AttemptOutcome::DeadlineExceeded,
                            None,
                            0,
                        ));
                        return GenerateResult::all_failed(trace_id, attempts);
                    }
                    request.timeout.min(remaining)
                }
                None => request.timeout,
            };

            match self.attempt(&trace_id, provider, request, timeout).await {
                Ok(result) => {
                    return GenerateResult::succeeded(trace_id, descriptor, result, attempts);
                }
                Err(failed) => {
                    let kind = failed.error_kind();
                    attempts.push(failed);
                    if kind == Some(ErrorKind::InvalidRequest) {
                        let message = attempts
                            .last()
                            .and_then(|a| a.message.clone())
                            .unwrap_or_default();
                        return GenerateResult::invalid_request(trace_id, message, attempts);
                    }
                }
            }
        }

        warn!(
            event = "providers_exhausted",
            trace_id = %trace_id,
            attempts = attempts.len(),
            skipped = attempts.iter().filter(|a| a.is_skipped()).count(),
        );
        GenerateResult::all_failed(trace_id, attempts)
    }

    async fn attempt(
        &self,
        trace_id: &str,
        provider: &RegisteredProvider,
        request: &GenerateRequest,
        timeout: Duration,
    ) -> Result<Completion, AttemptRecord> {
        let descriptor = &provider.descriptor;
        let started = Instant::now();
        let outcome = provider
            .adapter
            .send(self.client.as_ref(), descriptor, request, timeout)
            .await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let now = (self.clock)();

        match outcome {
            Ok(completion) => {
                info!(
                    event = "provider_attempt",
                    trace_id = %trace_id,
                    slot = descriptor.slot,
                    provider = %descriptor.kind,
                    model = %descriptor.model,
                    outcome = "success",
                    elapsed_ms,
                );
                if let Err(err) = self.store.record_success(descriptor.slot, now).await {
                    warn!(event = "store_write_failed", slot = descriptor.slot, error = %err);
                }
                self.events
                    .emit(Event::AttemptSucceeded(AttemptSucceededEvent {
                        trace_id: trace_id.to_string(),
                        at: now,
                        slot: descriptor.slot,
                        provider: descriptor.kind,
                        elapsed_ms,
                    }))
                    .await;
                Ok(completion)
            }
            Err(err) => {
                warn!(
                    event = "provider_attempt",
                    trace_id = %trace_id,
                    slot = descriptor.slot,
                    provider = %descriptor.kind,
                    outcome = "failed",
                    error_kind = %err.kind,
                    error = %err.message,
                    elapsed_ms,
                );
                self.events
                    .emit(Event::AttemptFailed(AttemptFailedEvent {
                        trace_id: trace_id.to_string(),
                        at: now,
                        slot: descriptor.slot,
                        provider: descriptor.kind,
                        error_kind: err.kind,
                        message: err.message.clone(),
                        elapsed_ms,
                    }))
                    .await;

                // A timeout cut short by the caller's deadline says nothing about the slot.
                let clipped = timeout < request.timeout && err.kind == ErrorKind::Timeout;
                if !clipped
                    && let Err(store_err) = self
                        .store
                        .record_failure(descriptor.slot, err.kind, now, err.retry_after)
                        .await
                {
                    warn!(event = "store_write_failed", slot = descriptor.slot, error = %store_err);
                }

                Err(record(
                    descriptor,
                    AttemptOutcome::Failed(err.kind),
                    Some(err.message),
                    elapsed_ms,
                ))
            }
        }
    }
}

fn record(
    descriptor: &ProviderDescriptor,
    outcome: AttemptOutcome,
    message: Option<String>,
    elapsed_ms: u64,
) -> AttemptRecord {
    AttemptRecord {
        slot: descriptor.slot,
        provider: descriptor.kind,
        outcome,
        message,
        elapsed_ms,
    }
}

fn validate(request: &GenerateRequest) -> Result<(), &'static str> {
    if request.messages.is_empty() {
        return Err("messages must not be empty");
    }
    if request.messages.iter().all(|m| m.content.trim().is_empty()) {
        return Err("messages carry no content");
    }
    if request.max_tokens == 0 {
        return Err("max_tokens must be positive");
    }
    if !request.temperature.is_finite() || request.temperature < 0.0 {
        return Err("temperature must be a non-negative number");
    }
    if request.timeout.is_zero() {
        return Err("timeout must be positive");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use aimux_provider_core::ChatMessage;

    use super::*;

    #[test]
    fn validation_rejects_unusable_requests() {
        let ok = GenerateRequest::new(vec![ChatMessage::user("hi")]);
        assert!(validate(&ok).is_ok());

        assert!(validate(&GenerateRequest::new(Vec::new())).is_err());
        assert!(validate(&GenerateRequest::new(vec![ChatMessage::user("  ")])).is_err());
        assert!(validate(&ok.clone().with_max_tokens(0)).is_err());
        assert!(validate(&ok.clone().with_temperature(f32::NAN)).is_err());
        assert!(validate(&ok.with_timeout(Duration::ZERO)).is_err());
    }
}
