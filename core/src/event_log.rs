//! Persistence contract for the event log.
//!
//! An [`EventLog`] is the durable, append-only storage behind the
//! [`EventStore`](crate::event_store::EventStore). It only has to do two things:
//!
//! - Append one already-numbered record, refusing anything that is not the
//!   immediate successor of its current head
//! - Load every record, oldest first
//!
//! Numbering, encoding, subscriber fan-out and bootstrap sequencing all live in
//! the store, so a log implementation stays a thin adapter over its storage
//! engine.
//!
//! # Implementations
//!
//! - `InMemoryEventLog` (in `moosehead-testing`): fast, deterministic, used by the
//!   demo binary and tests
//! - `FailingEventLog` (in `moosehead-testing`): simulates a storage outage
//!
//! # Dyn Compatibility
//!
//! Methods return boxed futures instead of using `async fn` so the store can hold
//! an `Arc<dyn EventLog>`.

use crate::event::{EventError, RecordedEvent, SerializedEvent};
use crate::revision::Revision;
use futures::future::BoxFuture;
use thiserror::Error;

/// Errors that can occur during event log and event store operations.
#[derive(Error, Debug)]
pub enum EventStoreError {
    /// The record being appended is not the successor of the log's head.
    #[error("Concurrency conflict: expected revision {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The revision the log expected next.
        expected: Revision,
        /// The revision that was offered.
        actual: Revision,
    },

    /// A stored log is not a gapless, strictly increasing sequence.
    #[error("Corrupt event log: expected revision {expected}, found {found}")]
    CorruptLog {
        /// The revision replay expected at this position.
        expected: Revision,
        /// The revision actually stored there.
        found: Revision,
    },

    /// The storage engine failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Encoding or decoding an event failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] EventError),

    /// An append was attempted before history was replayed.
    #[error("Event store has not been bootstrapped")]
    NotBootstrapped,

    /// Replay was requested a second time.
    #[error("Event store has already been bootstrapped")]
    AlreadyBootstrapped,

    /// The bootstrap sentinel was offered for persistence.
    #[error("The bootstrap sentinel cannot be appended to the log")]
    SentinelNotStorable,
}

/// Append-only durable storage for serialized events.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the store shares a single log between
/// the writer and bootstrap.
pub trait EventLog: Send + Sync {
    /// Persist one record.
    ///
    /// The record's revision must be exactly one past the current head.
    /// When this returns `Ok`, the record is durable and will be returned by
    /// every later [`load_all`](EventLog::load_all).
    ///
    /// # Errors
    ///
    /// - `ConcurrencyConflict`: the revision is not the head's successor
    /// - `Storage`: the underlying engine failed; nothing was persisted
    fn append(
        &self,
        record: RecordedEvent<SerializedEvent>,
    ) -> BoxFuture<'_, Result<(), EventStoreError>>;

    /// Load every record, ordered by revision (oldest first).
    ///
    /// An empty log returns an empty vector.
    ///
    /// # Errors
    ///
    /// - `Storage`: the underlying engine failed
    fn load_all(&self) -> BoxFuture<'_, Result<Vec<RecordedEvent<SerializedEvent>>, EventStoreError>>;
}
