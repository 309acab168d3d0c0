//! Event store behaviour against the in-memory logs.

#![allow(clippy::unwrap_used)]

use moosehead_core::event::{Event, RecordedEvent, SerializedEvent};
use moosehead_core::event_log::{EventLog, EventStoreError};
use moosehead_core::event_store::EventStore;
use moosehead_core::revision::Revision;
use moosehead_testing::{FailingEventLog, InMemoryEventLog, RecordingSubscriber, test_clock, test_time};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
enum LedgerEvent {
    Deposited { amount: u32 },
    Withdrawn { amount: u32 },
    BootstrapDone,
}

impl Event for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Deposited { .. } => "Deposited.v1",
            Self::Withdrawn { .. } => "Withdrawn.v1",
            Self::BootstrapDone => "BootstrapDone",
        }
    }

    fn bootstrap_done() -> Self {
        Self::BootstrapDone
    }

    fn is_bootstrap_done(&self) -> bool {
        matches!(self, Self::BootstrapDone)
    }
}

fn store_over(
    log: Arc<dyn EventLog>,
) -> (EventStore<LedgerEvent>, Arc<RecordingSubscriber<LedgerEvent>>) {
    let recorder = Arc::new(RecordingSubscriber::new("recorder"));
    let mut store = EventStore::new(log, Arc::new(test_clock()));
    store.subscribe(recorder.clone());
    (store, recorder)
}

#[tokio::test]
async fn replay_of_empty_log_delivers_only_the_sentinel() {
    let (store, recorder) = store_over(Arc::new(InMemoryEventLog::new()));

    let head = store.replay().await.unwrap();

    assert_eq!(head, Revision::INITIAL);
    let received = recorder.received();
    assert_eq!(received.len(), 1);
    assert!(received[0].payload.is_bootstrap_done());
    assert!(store.is_bootstrapped().await);
}

#[tokio::test]
async fn append_assigns_gapless_revisions_and_fans_out() {
    let log = InMemoryEventLog::new();
    let (store, recorder) = store_over(Arc::new(log.clone()));
    store.replay().await.unwrap();

    let first = store.append(LedgerEvent::Deposited { amount: 10 }).await.unwrap();
    let second = store.append(LedgerEvent::Withdrawn { amount: 3 }).await.unwrap();

    assert_eq!(first.revision, Revision::new(1));
    assert_eq!(second.revision, Revision::new(2));
    assert_eq!(first.recorded_at, test_time());
    assert_eq!(store.head().await, Some(Revision::new(2)));
    assert_eq!(log.len(), 2);

    let payloads: Vec<_> = recorder.received().into_iter().map(|r| r.payload).collect();
    assert_eq!(
        payloads,
        vec![
            LedgerEvent::BootstrapDone,
            LedgerEvent::Deposited { amount: 10 },
            LedgerEvent::Withdrawn { amount: 3 },
        ]
    );
}

#[tokio::test]
async fn replay_rebuilds_from_existing_history_before_the_sentinel() {
    let log = InMemoryEventLog::new();
    {
        let (store, _) = store_over(Arc::new(log.clone()));
        store.replay().await.unwrap();
        store.append(LedgerEvent::Deposited { amount: 5 }).await.unwrap();
        store.append(LedgerEvent::Deposited { amount: 7 }).await.unwrap();
    }

    let (restarted, recorder) = store_over(Arc::new(log.clone()));
    let head = restarted.replay().await.unwrap();

    assert_eq!(head, Revision::new(2));
    let received = recorder.received();
    assert_eq!(received.len(), 3);
    assert_eq!(received[0].revision, Revision::new(1));
    assert_eq!(received[1].revision, Revision::new(2));
    assert!(received[2].payload.is_bootstrap_done());

    let next = restarted.append(LedgerEvent::Withdrawn { amount: 1 }).await.unwrap();
    assert_eq!(next.revision, Revision::new(3));
}

#[tokio::test]
async fn subscribers_are_called_in_registration_order() {
    let first = Arc::new(RecordingSubscriber::new("first"));
    let second = Arc::new(RecordingSubscriber::new("second"));
    let mut store = EventStore::new(Arc::new(InMemoryEventLog::new()), Arc::new(test_clock()));
    store.subscribe(first.clone());
    store.subscribe(second.clone());
    assert_eq!(store.subscriber_count(), 2);

    store.replay().await.unwrap();
    store.append(LedgerEvent::Deposited { amount: 1 }).await.unwrap();

    assert_eq!(first.received(), second.received());
    assert_eq!(first.len(), 2);
}

#[tokio::test]
async fn append_before_replay_is_rejected() {
    let (store, recorder) = store_over(Arc::new(InMemoryEventLog::new()));

    let result = store.append(LedgerEvent::Deposited { amount: 1 }).await;

    assert!(matches!(result, Err(EventStoreError::NotBootstrapped)));
    assert!(recorder.is_empty());
}

#[tokio::test]
async fn replaying_twice_is_rejected() {
    let (store, recorder) = store_over(Arc::new(InMemoryEventLog::new()));
    store.replay().await.unwrap();

    let result = store.replay().await;

    assert!(matches!(result, Err(EventStoreError::AlreadyBootstrapped)));
    assert_eq!(recorder.len(), 1);
}

#[tokio::test]
async fn the_sentinel_cannot_be_persisted() {
    let log = InMemoryEventLog::new();
    let (store, _) = store_over(Arc::new(log.clone()));
    store.replay().await.unwrap();

    let result = store.append(LedgerEvent::BootstrapDone).await;

    assert!(matches!(result, Err(EventStoreError::SentinelNotStorable)));
    assert!(log.is_empty());
}

#[tokio::test]
async fn failed_append_is_invisible_to_subscribers() {
    let log = FailingEventLog::after(1);
    let (store, recorder) = store_over(Arc::new(log.clone()));
    store.replay().await.unwrap();
    store.append(LedgerEvent::Deposited { amount: 1 }).await.unwrap();

    let result = store.append(LedgerEvent::Deposited { amount: 2 }).await;

    assert!(matches!(result, Err(EventStoreError::Storage(_))));
    assert_eq!(store.head().await, Some(Revision::new(1)));
    assert_eq!(recorder.len(), 2);
    assert_eq!(log.records().len(), 1);
}

#[tokio::test]
async fn replay_detects_gaps_in_the_log() {
    let encoded = SerializedEvent::from_event(&LedgerEvent::Deposited { amount: 1 }).unwrap();
    let log = InMemoryEventLog::with_records(vec![
        RecordedEvent::new(Revision::new(1), test_time(), encoded.clone()),
        RecordedEvent::new(Revision::new(3), test_time(), encoded),
    ]);
    let (store, recorder) = store_over(Arc::new(log));

    let result = store.replay().await;

    assert!(matches!(
        result,
        Err(EventStoreError::CorruptLog { expected, found })
            if expected == Revision::new(2) && found == Revision::new(3)
    ));
    assert!(recorder.is_empty());
    assert!(!store.is_bootstrapped().await);
}

#[tokio::test]
async fn history_returns_decoded_events_without_delivering() {
    let log = InMemoryEventLog::new();
    let (store, recorder) = store_over(Arc::new(log));
    store.replay().await.unwrap();
    store.append(LedgerEvent::Deposited { amount: 4 }).await.unwrap();
    let delivered = recorder.len();

    let history = store.history().await.unwrap();

    assert_eq!(history.len(), 1);
    assert_eq!(history[0].payload, LedgerEvent::Deposited { amount: 4 });
    assert_eq!(recorder.len(), delivered);
}
