//! The event store: numbering, persistence and subscriber fan-out.
//!
//! [`EventStore`] owns the ordered log. It assigns revisions and timestamps,
//! encodes events, hands them to an [`EventLog`] for durable storage and then
//! delivers them to every registered [`EventSubscriber`].
//!
//! # Lifecycle
//!
//! 1. Construct with a log and a clock, register subscribers
//! 2. Call [`replay`](EventStore::replay) exactly once: history is folded into
//!    every subscriber, then the bootstrap sentinel is delivered
//! 3. Call [`append`](EventStore::append) for each new event
//!
//! # Failure
//!
//! If the log rejects an append, the revision counter does not move and no
//! subscriber sees the event. The caller must treat this as fatal: subscriber
//! state still matches the log, but the command that produced the event is lost.
//!
//! # Example
//!
//! ```ignore
//! let mut store = EventStore::new(log, clock);
//! store.subscribe(projection.clone());
//! store.subscribe(saga.clone());
//!
//! store.replay().await?;
//! let recorded = store.append(event).await?;
//! ```

use crate::environment::Clock;
use crate::event::{Event, RecordedEvent, SerializedEvent};
use crate::event_log::{EventLog, EventStoreError};
use crate::revision::Revision;
use crate::subscription::EventSubscriber;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Append-only, replayable event store with synchronous fan-out.
pub struct EventStore<E> {
    log: Arc<dyn EventLog>,
    clock: Arc<dyn Clock>,
    subscribers: Vec<Arc<dyn EventSubscriber<E>>>,
    /// `None` until replay has run; afterwards the last persisted revision.
    head: Mutex<Option<Revision>>,
}

impl<E> EventStore<E>
where
    E: Event + Serialize + DeserializeOwned,
{
    /// Create a store over a log. No subscribers are registered yet.
    #[must_use]
    pub fn new(log: Arc<dyn EventLog>, clock: Arc<dyn Clock>) -> Self {
        Self {
            log,
            clock,
            subscribers: Vec::new(),
            head: Mutex::new(None),
        }
    }

    /// Register a subscriber. Delivery follows registration order.
    pub fn subscribe(&mut self, subscriber: Arc<dyn EventSubscriber<E>>) {
        tracing::debug!(subscriber = subscriber.name(), "Registered event subscriber");
        self.subscribers.push(subscriber);
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Last persisted revision, or `None` before bootstrap.
    pub async fn head(&self) -> Option<Revision> {
        *self.head.lock().await
    }

    /// Whether [`replay`](Self::replay) has completed.
    pub async fn is_bootstrapped(&self) -> bool {
        self.head.lock().await.is_some()
    }

    /// Load and decode the full history without delivering it.
    ///
    /// # Errors
    ///
    /// - `Storage`: the log could not be read
    /// - `CorruptLog`: revisions are not gapless starting at 1
    /// - `Serialization`: a record could not be decoded
    pub async fn history(&self) -> Result<Vec<RecordedEvent<E>>, EventStoreError> {
        let records = self.log.load_all().await?;
        let mut expected = Revision::INITIAL;
        let mut history = Vec::with_capacity(records.len());

        for record in &records {
            expected = expected.next();
            if record.revision != expected {
                return Err(EventStoreError::CorruptLog {
                    expected,
                    found: record.revision,
                });
            }
            history.push(record.try_map(SerializedEvent::decode::<E>)?);
        }

        Ok(history)
    }

    /// Rebuild every subscriber from the log, then deliver the bootstrap sentinel.
    ///
    /// Returns the revision of the last replayed event (`Revision::INITIAL` for
    /// an empty log).
    ///
    /// # Errors
    ///
    /// - `AlreadyBootstrapped`: replay already ran
    /// - any error from [`history`](Self::history); nothing is delivered then
    pub async fn replay(&self) -> Result<Revision, EventStoreError> {
        let mut head = self.head.lock().await;
        if head.is_some() {
            return Err(EventStoreError::AlreadyBootstrapped);
        }

        let history = self.history().await?;
        let mut last = Revision::INITIAL;
        for recorded in &history {
            self.publish(recorded);
            last = recorded.revision;
        }
        metrics::counter!("event_store.replayed").increment(history.len() as u64);

        let sentinel = RecordedEvent::new(last, self.clock.now(), E::bootstrap_done());
        self.publish(&sentinel);

        *head = Some(last);
        tracing::info!(
            events = history.len(),
            head = %last,
            "Event store bootstrap done"
        );
        Ok(last)
    }

    /// Number, persist and fan out one event.
    ///
    /// Subscribers have folded the event by the time this returns.
    ///
    /// # Errors
    ///
    /// - `SentinelNotStorable`: `event` is the bootstrap sentinel
    /// - `NotBootstrapped`: replay has not run
    /// - `Serialization`: the event could not be encoded
    /// - `Storage` / `ConcurrencyConflict`: the log refused the record; nothing
    ///   was published
    pub async fn append(&self, event: E) -> Result<RecordedEvent<E>, EventStoreError> {
        if event.is_bootstrap_done() {
            return Err(EventStoreError::SentinelNotStorable);
        }

        let mut head = self.head.lock().await;
        let current = head.ok_or(EventStoreError::NotBootstrapped)?;

        let recorded = RecordedEvent::new(current.next(), self.clock.now(), event);
        let serialized = recorded.try_map(SerializedEvent::from_event::<E>)?;

        if let Err(error) = self.log.append(serialized).await {
            tracing::error!(
                revision = %recorded.revision,
                event_type = recorded.payload.event_type(),
                error = %error,
                "Event log rejected append"
            );
            return Err(error);
        }

        *head = Some(recorded.revision);
        metrics::counter!("event_store.appended", "type" => recorded.payload.event_type())
            .increment(1);
        tracing::info!(
            revision = %recorded.revision,
            event_type = recorded.payload.event_type(),
            "Appended event"
        );

        self.publish(&recorded);
        Ok(recorded)
    }

    fn publish(&self, recorded: &RecordedEvent<E>) {
        for subscriber in &self.subscribers {
            tracing::trace!(
                subscriber = subscriber.name(),
                revision = %recorded.revision,
                event_type = recorded.payload.event_type(),
                "Delivering event"
            );
            subscriber.on_event(recorded);
        }
    }
}
