//! In-memory event logs.
//!
//! - [`InMemoryEventLog`]: `Vec`-backed log enforcing gapless revisions
//! - [`FailingEventLog`]: accepts a fixed number of appends, then refuses every
//!   further one, for exercising the fatal append path

use futures::future::BoxFuture;
use moosehead_core::event::{RecordedEvent, SerializedEvent};
use moosehead_core::event_log::{EventLog, EventStoreError};
use moosehead_core::revision::Revision;
use std::sync::{Arc, RwLock};

type Records = Vec<RecordedEvent<SerializedEvent>>;

/// In-memory event log for fast, deterministic tests and demos.
///
/// Cloning shares the underlying records, so a test can keep a handle to the
/// log after passing it to a store and later rebuild a second store over the
/// same history.
///
/// # Example
///
/// ```
/// use moosehead_testing::InMemoryEventLog;
///
/// let log = InMemoryEventLog::new();
/// assert!(log.is_empty());
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryEventLog {
    records: Arc<RwLock<Records>>,
}

impl InMemoryEventLog {
    /// Create a new empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log pre-populated with records, without validating them.
    ///
    /// Useful for simulating corrupt logs.
    #[must_use]
    pub fn with_records(records: Records) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    /// Copy of all stored records.
    #[must_use]
    pub fn records(&self) -> Records {
        self.read().clone()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether no record has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Records> {
        self.records
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn push(&self, record: RecordedEvent<SerializedEvent>) -> Result<(), EventStoreError> {
        let mut records = self
            .records
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let len = u64::try_from(records.len())
            .map_err(|e| EventStoreError::Storage(e.to_string()))?;
        let expected = Revision::new(len).next();
        if record.revision != expected {
            return Err(EventStoreError::ConcurrencyConflict {
                expected,
                actual: record.revision,
            });
        }
        records.push(record);
        Ok(())
    }
}

impl EventLog for InMemoryEventLog {
    fn append(
        &self,
        record: RecordedEvent<SerializedEvent>,
    ) -> BoxFuture<'_, Result<(), EventStoreError>> {
        Box::pin(async move { self.push(record) })
    }

    fn load_all(&self) -> BoxFuture<'_, Result<Records, EventStoreError>> {
        Box::pin(async move { Ok(self.records()) })
    }
}

/// Log that stores the first `capacity` appends and refuses the rest with a
/// storage error.
#[derive(Clone, Debug)]
pub struct FailingEventLog {
    inner: InMemoryEventLog,
    capacity: usize,
}

impl FailingEventLog {
    /// Refuse every append.
    #[must_use]
    pub fn new() -> Self {
        Self::after(0)
    }

    /// Accept `capacity` appends, then refuse.
    #[must_use]
    pub fn after(capacity: usize) -> Self {
        Self {
            inner: InMemoryEventLog::new(),
            capacity,
        }
    }

    /// Records that were accepted before the outage.
    #[must_use]
    pub fn records(&self) -> Records {
        self.inner.records()
    }
}

impl Default for FailingEventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog for FailingEventLog {
    fn append(
        &self,
        record: RecordedEvent<SerializedEvent>,
    ) -> BoxFuture<'_, Result<(), EventStoreError>> {
        Box::pin(async move {
            if self.inner.len() >= self.capacity {
                return Err(EventStoreError::Storage("disk full".to_string()));
            }
            self.inner.push(record)
        })
    }

    fn load_all(&self) -> BoxFuture<'_, Result<Records, EventStoreError>> {
        self.inner.load_all()
    }
}
