use std::sync::Arc;
use std::time::Duration;

use aimux_common::CooldownPolicy;
use aimux_provider_core::{ErrorKind, Event, EventHub, UsageEntry};
use aimux_storage::{UsageDocument, UsageStore};
use time::OffsetDateTime;

fn now() -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap()
}

fn backups(dir: &std::path::Path, label: &str) -> Vec<std::path::PathBuf> {
    let mut out: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.contains(label))
        })
        .collect();
    out.sort();
    out
}

#[tokio::test]
async fn missing_file_is_an_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = UsageStore::open(dir.path().join("state.json"), CooldownPolicy::default())
        .await
        .unwrap();
    assert_eq!(store.get(1), UsageEntry::new(1));
    assert!(store.is_eligible(1, now()));
    assert!(!store.path().exists());
}

#[tokio::test]
async fn persisted_state_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let store = UsageStore::open(&path, CooldownPolicy::default())
        .await
        .unwrap();
    store
        .record_failure(1, ErrorKind::RateLimited, now(), Some(Duration::from_secs(90)))
        .await
        .unwrap();
    store.record_success(2, now()).await.unwrap();
    store
        .record_failure(3, ErrorKind::AuthError, now(), None)
        .await
        .unwrap();

    let reloaded = UsageStore::open(&path, CooldownPolicy::default())
        .await
        .unwrap();
    assert_eq!(*reloaded.snapshot(), *store.snapshot());
    let entry = reloaded.get(1);
    assert_eq!(entry.consecutive_failures, 1);
    assert_eq!(entry.cooldown_until, Some(now() + Duration::from_secs(90)));
    assert!(!reloaded.is_eligible(1, now()));
    assert!(reloaded.is_eligible(1, now() + Duration::from_secs(90)));
}

#[tokio::test]
async fn success_clears_cooldown_and_streak() {
    let dir = tempfile::tempdir().unwrap();
    let store = UsageStore::open(dir.path().join("state.json"), CooldownPolicy::default())
        .await
        .unwrap();
    for _ in 0..3 {
        store
            .record_failure(4, ErrorKind::ServerError, now(), None)
            .await
            .unwrap();
    }
    assert_eq!(store.get(4).consecutive_failures, 3);

    let entry = store.record_success(4, now()).await.unwrap();
    assert_eq!(entry.consecutive_failures, 0);
    assert_eq!(entry.cooldown_until, None);
    assert!(store.is_eligible(4, now()));
}

#[tokio::test]
async fn reset_twice_is_idempotent_and_backs_up_each_time() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("provider_usage.json");
    let store = UsageStore::open(&path, CooldownPolicy::default())
        .await
        .unwrap();
    store
        .record_failure(1, ErrorKind::Timeout, now(), None)
        .await
        .unwrap();

    let first = store.reset_all(now()).await.unwrap();
    let after_first = store.snapshot();
    let second = store.reset_all(now()).await.unwrap();
    let after_second = store.snapshot();

    assert_ne!(first, second);
    assert!(first.exists() && second.exists());
    assert_eq!(after_first.slots, after_second.slots);
    assert!(after_second.slots.is_empty());
    assert_eq!(backups(dir.path(), ".backup-").len(), 2);

    let backed_up: UsageDocument =
        serde_json::from_slice(&std::fs::read(&first).unwrap()).unwrap();
    assert_eq!(backed_up.slots[&1].last_error_kind, Some(ErrorKind::Timeout));

    let on_disk: UsageDocument = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert!(on_disk.slots.is_empty());
}

#[tokio::test]
async fn corrupt_file_degrades_to_empty_and_is_kept_aside() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("provider_usage.json");
    std::fs::write(&path, b"{\"slots\": {\"1\": {\"slot\": 1, \"cooldown_until\": ").unwrap();

    let store = UsageStore::open(&path, CooldownPolicy::default())
        .await
        .unwrap();
    assert!(store.snapshot().slots.is_empty());
    assert!(store.is_eligible(1, now()));

    let aside = backups(dir.path(), ".corrupt-");
    assert_eq!(aside.len(), 1);
    assert!(std::fs::read_to_string(&aside[0]).unwrap().contains("cooldown_until"));

    store.record_success(1, now()).await.unwrap();
    let reloaded = UsageStore::open(&path, CooldownPolicy::default())
        .await
        .unwrap();
    assert_eq!(reloaded.get(1).last_success, Some(now()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_failures_are_not_lost() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let store = Arc::new(
        UsageStore::open(&path, CooldownPolicy::default())
            .await
            .unwrap(),
    );

    let mut tasks = Vec::new();
    for i in 0..16u8 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            let slot = 1 + i % 2;
            store
                .record_failure(slot, ErrorKind::ServerError, now(), None)
                .await
                .unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(store.get(1).consecutive_failures, 8);
    assert_eq!(store.get(2).consecutive_failures, 8);
    let reloaded = UsageStore::open(&path, CooldownPolicy::default())
        .await
        .unwrap();
    assert_eq!(reloaded.get(1).consecutive_failures, 8);
    assert_eq!(reloaded.get(2).consecutive_failures, 8);
}

#[tokio::test]
async fn invalid_request_does_not_cool_down() {
    let dir = tempfile::tempdir().unwrap();
    let store = UsageStore::open(dir.path().join("state.json"), CooldownPolicy::default())
        .await
        .unwrap();
    let entry = store
        .record_failure(2, ErrorKind::InvalidRequest, now(), None)
        .await
        .unwrap();
    assert_eq!(entry.consecutive_failures, 0);
    assert_eq!(entry.cooldown_until, None);
    assert_eq!(entry.last_error_kind, Some(ErrorKind::InvalidRequest));
    assert!(store.is_eligible(2, now()));
}

#[tokio::test]
async fn statuses_cover_requested_slots() {
    let dir = tempfile::tempdir().unwrap();
    let store = UsageStore::open(dir.path().join("state.json"), CooldownPolicy::default())
        .await
        .unwrap();
    store
        .record_failure(2, ErrorKind::AuthError, now(), None)
        .await
        .unwrap();

    let statuses = store.statuses(&[1, 2], now());
    assert_eq!(statuses.len(), 2);
    assert!(statuses[0].eligible);
    assert!(!statuses[1].eligible);
    assert_eq!(statuses[1].entry.last_error_kind, Some(ErrorKind::AuthError));
}

#[tokio::test]
async fn cooldowns_and_resets_are_announced() {
    let dir = tempfile::tempdir().unwrap();
    let hub = EventHub::new(8);
    let mut rx = hub.subscribe();
    let store = UsageStore::open(dir.path().join("state.json"), CooldownPolicy::default())
        .await
        .unwrap()
        .with_events(hub);

    store
        .record_failure(1, ErrorKind::RateLimited, now(), None)
        .await
        .unwrap();
    match rx.recv().await.unwrap() {
        Event::CooldownStarted(ev) => {
            assert_eq!(ev.slot, 1);
            assert_eq!(ev.until, now() + Duration::from_secs(60));
        }
        other => panic!("unexpected event: {other:?}"),
    }

    store.reset_all(now()).await.unwrap();
    match rx.recv().await.unwrap() {
        Event::UsageReset(ev) => assert_eq!(ev.cleared_slots, 1),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn oversized_cooldown_tunables_still_persist() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let policy = CooldownPolicy {
        auth_secs: u64::MAX,
        transient_max_secs: u64::MAX,
        transient_multiplier: 1e300,
        ..CooldownPolicy::default()
    };
    let store = UsageStore::open(&path, policy.clone()).await.unwrap();

    store
        .record_failure(1, ErrorKind::AuthError, now(), None)
        .await
        .unwrap();
    for _ in 0..4 {
        store
            .record_failure(2, ErrorKind::ServerError, now(), None)
            .await
            .unwrap();
    }

    assert!(!store.is_eligible(1, now()));
    assert!(!store.is_eligible(2, now()));
    let reloaded = UsageStore::open(&path, policy).await.unwrap();
    assert_eq!(*reloaded.snapshot(), *store.snapshot());
}
