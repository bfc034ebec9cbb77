use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use aimux_common::CooldownPolicy;
use aimux_provider_core::{
    CooldownStartedEvent, ErrorKind, Event, EventHub, SlotId, UsageEntry, UsageResetEvent,
};
use arc_swap::ArcSwap;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::fs::{sibling_path, write_atomic};
use crate::{SlotStatus, UsageDocument};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde json error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("persist error: {0}")]
    Persist(#[from] tempfile::PersistError),
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// JSON-file backed slot health store.
///
/// Reads come from an in-memory snapshot and never block. Mutations are
/// serialized by a single writer lock held across the in-memory update and
/// the atomic rewrite of the file.
pub struct UsageStore {
    path: PathBuf,
    policy: CooldownPolicy,
    snapshot: ArcSwap<UsageDocument>,
    write_lock: Mutex<()>,
    events: Option<EventHub>,
}

impl UsageStore {
    /// Loads `path`. A missing file is an empty store; an unreadable one is set
    /// aside as `<stem>.corrupt-<ts>.json` and the store starts empty.
    pub async fn open(path: impl Into<PathBuf>, policy: CooldownPolicy) -> Result<Self, StorageError> {
        let path = path.into();
        let doc = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<UsageDocument>(&bytes) {
                Ok(doc) => doc,
                Err(err) => {
                    let stamp = OffsetDateTime::now_utc().unix_timestamp_nanos();
                    let aside = sibling_path(&path, "corrupt", stamp);
                    let copied = tokio::fs::copy(&path, &aside).await;
                    warn!(
                        event = "store_corruption",
                        path = %path.display(),
                        backup = %aside.display(),
                        copied = copied.is_ok(),
                        error = %err,
                        "usage state unreadable, starting empty"
                    );
                    UsageDocument::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => UsageDocument::default(),
            Err(err) => return Err(err.into()),
        };
        info!(path = %path.display(), slots = doc.slots.len(), "usage store loaded");
        Ok(Self {
            path,
            policy,
            snapshot: ArcSwap::from_pointee(doc),
            write_lock: Mutex::new(()),
            events: None,
        })
    }

    pub fn with_events(mut self, events: EventHub) -> Self {
        self.events = Some(events);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> Arc<UsageDocument> {
        self.snapshot.load_full()
    }

    pub fn get(&self, slot: SlotId) -> UsageEntry {
        self.snapshot.load().entry(slot)
    }

    pub fn is_eligible(&self, slot: SlotId, now: OffsetDateTime) -> bool {
        match self.snapshot.load().slots.get(&slot) {
            Some(entry) => entry.is_eligible(now),
            None => true,
        }
    }

    pub fn statuses(&self, slots: &[SlotId], now: OffsetDateTime) -> Vec<SlotStatus> {
        let doc = self.snapshot.load();
        slots
            .iter()
            .map(|&slot| {
                let entry = doc.entry(slot);
                SlotStatus {
                    slot,
                    eligible: entry.is_eligible(now),
                    entry,
                }
            })
            .collect()
    }

    pub async fn record_success(
        &self,
        slot: SlotId,
        now: OffsetDateTime,
    ) -> Result<UsageEntry, StorageError> {
        self.update(slot, now, |entry| entry.record_success(now))
            .await
            .map(|(entry, ())| entry)
    }

    /// Applies a classified failure and returns the updated entry.
    pub async fn record_failure(
        &self,
        slot: SlotId,
        kind: ErrorKind,
        now: OffsetDateTime,
        retry_after: Option<Duration>,
    ) -> Result<UsageEntry, StorageError> {
        let policy = &self.policy;
        let (entry, window) = self
            .update(slot, now, |entry| {
                entry.record_failure(kind, now, policy, retry_after)
            })
            .await?;
        if let (Some(window), Some(until)) = (window, entry.cooldown_until) {
            info!(
                event = "cooldown_started",
                slot,
                reason = %kind,
                consecutive_failures = entry.consecutive_failures,
                cooldown_secs = window.as_secs(),
                "slot cooling down"
            );
            self.emit(Event::CooldownStarted(CooldownStartedEvent {
                at: now,
                slot,
                reason: kind,
                consecutive_failures: entry.consecutive_failures,
                until,
            }))
            .await;
        }
        Ok(entry)
    }

    /// Saves the current state to a timestamped backup, then clears every entry.
    /// Returns the backup path.
    pub async fn reset_all(&self, now: OffsetDateTime) -> Result<PathBuf, StorageError> {
        let guard = self.write_lock.lock().await;
        let prior = self.snapshot.load_full();
        let cleared_slots = prior.slots.len();
        let backup = sibling_path(&self.path, "backup", now.unix_timestamp_nanos());

        let empty = UsageDocument {
            updated_at: Some(now),
            ..UsageDocument::default()
        };
        {
            let path = self.path.clone();
            let backup = backup.clone();
            let empty = empty.clone();
            tokio::task::spawn_blocking(move || {
                write_atomic(&backup, &prior)?;
                write_atomic(&path, &empty)
            })
            .await??;
        }
        self.snapshot.store(Arc::new(empty));
        drop(guard);

        info!(
            event = "usage_reset",
            cleared_slots,
            backup = %backup.display(),
            "usage state reset"
        );
        self.emit(Event::UsageReset(UsageResetEvent {
            at: now,
            cleared_slots,
            backup_path: backup.display().to_string(),
        }))
        .await;
        Ok(backup)
    }

    async fn update<T, F>(
        &self,
        slot: SlotId,
        now: OffsetDateTime,
        apply: F,
    ) -> Result<(UsageEntry, T), StorageError>
    where
        F: FnOnce(&mut UsageEntry) -> T,
    {
        let _guard = self.write_lock.lock().await;
        let mut doc = UsageDocument::clone(&self.snapshot.load());
        let entry = doc
            .slots
            .entry(slot)
            .or_insert_with(|| UsageEntry::new(slot));
        let out = apply(entry);
        let entry = entry.clone();
        doc.updated_at = Some(now);

        // Memory stays updated even if the write below fails.
        let doc = Arc::new(doc);
        self.snapshot.store(doc.clone());
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &doc)).await??;
        Ok((entry, out))
    }

    async fn emit(&self, event: Event) {
        if let Some(events) = &self.events {
            events.emit(event).await;
        }
    }
}
