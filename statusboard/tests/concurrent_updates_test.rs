//! Concurrent writers against the same row.
//!
//! Tests verify:
//! - Two simultaneous resolutions: exactly one wins, the other is rejected
//! - Two updates carrying the same expected version: exactly one wins

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use statusboard::store::{KvBackend, MemoryBackend, StoreResult, UpdateFn};
use statusboard::{
    InMemoryDirectory, NewResponsibility, NewSnapshot, Phase, ResponsibilityPatch, Role,
    StateStore, Tracker, TrackerConfig, TrackerError, User,
};

const PM: u64 = 1;
const EM: u64 = 7;
const EM2: u64 = 8;
const OWNER: u64 = 42;

/// Memory backend that stalls reads and read-modify-write cycles
struct SlowBackend {
    inner: MemoryBackend,
    delay: Duration,
}

impl KvBackend for SlowBackend {
    fn put(&self, cf: &str, key: &str, value: &[u8]) -> StoreResult<()> {
        self.inner.put(cf, key, value)
    }

    fn get(&self, cf: &str, key: &str) -> StoreResult<Option<Vec<u8>>> {
        thread::sleep(self.delay);
        self.inner.get(cf, key)
    }

    fn scan_prefix(&self, cf: &str, prefix: &str) -> StoreResult<Vec<(String, Vec<u8>)>> {
        self.inner.scan_prefix(cf, prefix)
    }

    fn next_sequence(&self, name: &str) -> StoreResult<u64> {
        self.inner.next_sequence(name)
    }

    fn update(&self, cf: &str, key: &str, apply: UpdateFn<'_>) -> StoreResult<()> {
        let delay = self.delay;
        self.inner
            .update(cf, key, &mut |current: Option<&[u8]>| {
                thread::sleep(delay);
                apply(current)
            })
    }
}

/// Tracker over a slow backend with one responsibility owned by OWNER
fn seeded() -> (Tracker, u64) {
    let users = InMemoryDirectory::with_users([
        User::new(PM, "pm", Role::ProjectManager),
        User::new(EM, "user7", Role::EscalationManager),
        User::new(EM2, "user8", Role::EscalationManager),
        User::new(OWNER, "user42", Role::Responsible),
    ]);
    let store = StateStore::with_backend(Arc::new(SlowBackend {
        inner: MemoryBackend::new(),
        delay: Duration::from_millis(50),
    }));
    let tracker = Tracker::new(store.shared(), users.shared(), TrackerConfig::default());
    let project = tracker.projects().register("P1", "Alpha", Some(PM)).unwrap();
    let view = tracker
        .snapshots()
        .create(
            PM,
            NewSnapshot::new(project.id, Phase::Development)
                .with_responsibility(NewResponsibility::new("Line ramp-up", OWNER)),
        )
        .unwrap();
    (tracker, view.responsibilities[0].id)
}

#[test]
fn concurrent_resolutions_have_one_winner() {
    let (tracker, resp_id) = seeded();
    let escalation = tracker
        .escalations()
        .trigger(resp_id, "Yield below target", EM)
        .unwrap();

    let attempts = [
        (EM, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        (EM2, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()),
    ];
    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = attempts
            .iter()
            .map(|&(user, at)| {
                let engine = tracker.escalations();
                let id = escalation.id;
                scope.spawn(move || (user, at, engine.resolve(id, user, Some(at))))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let winners: Vec<_> = results.iter().filter(|(_, _, r)| r.is_ok()).collect();
    assert_eq!(winners.len(), 1);
    let loser = results.iter().find(|(_, _, r)| r.is_err()).unwrap();
    assert!(matches!(
        loser.2,
        Err(TrackerError::AlreadyResolved { .. })
    ));

    let (winner, winner_at, _) = winners[0];
    let stored = tracker.escalations().get(escalation.id).unwrap();
    assert_eq!(stored.resolved_by, Some(*winner));
    assert_eq!(stored.resolved_at, Some(*winner_at));
}

#[test]
fn concurrent_versioned_updates_have_one_winner() {
    let (tracker, resp_id) = seeded();

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = [10, 90]
            .into_iter()
            .map(|progress| {
                let store = tracker.responsibilities();
                scope.spawn(move || {
                    let patch = ResponsibilityPatch {
                        progress: Some(progress),
                        expected_version: Some(0),
                        ..Default::default()
                    };
                    (progress, store.update(resp_id, OWNER, patch))
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let winners: Vec<_> = results.iter().filter(|(_, r)| r.is_ok()).collect();
    assert_eq!(winners.len(), 1);
    let loser = results.iter().find(|(_, r)| r.is_err()).unwrap();
    assert!(matches!(
        loser.1,
        Err(TrackerError::Conflict {
            expected: 0,
            actual: 1
        })
    ));

    let stored = tracker.responsibilities().get(resp_id).unwrap();
    assert_eq!(stored.version, 1);
    assert_eq!(i64::from(stored.progress), winners[0].0);
}
