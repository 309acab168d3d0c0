//! # Moosehead Core
//!
//! Event-sourcing primitives for the Moosehead workshop reservation engine.
//!
//! Every state change is an immutable event appended to an ordered log; all
//! readable state is derived by folding that log. This crate provides the
//! domain-independent backbone:
//!
//! - [`event::Event`]: the trait a domain's closed event enum implements
//! - [`event::RecordedEvent`]: an event plus its [`revision::Revision`] and timestamp
//! - [`event_log::EventLog`]: the persistence contract (append / load all)
//! - [`event_store::EventStore`]: numbering, persistence, replay and fan-out
//! - [`subscription::EventSubscriber`]: projections and sagas
//! - [`environment::Clock`]: injected time
//!
//! ## Architecture Principles
//!
//! - Validate, then append, then fold: subscribers never see an event the log refused
//! - Deterministic replay: the same prefix always yields the same state
//! - Dependency injection for time and storage
//!
//! ## Example
//!
//! ```ignore
//! use moosehead_core::event_store::EventStore;
//!
//! let mut store = EventStore::new(log, clock);
//! store.subscribe(projection.clone());
//! store.replay().await?;
//!
//! let recorded = store.append(WorkshopEvent::WorkshopAdded { .. }).await?;
//! assert_eq!(recorded.revision, Revision::new(1));
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

pub mod event;
pub mod event_log;
pub mod event_store;
pub mod revision;
pub mod subscription;

/// Environment module - Dependency injection traits
///
/// All external dependencies of the core are abstracted behind traits and
/// injected by the composition root.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

pub use environment::{Clock, SystemClock};
pub use event::{Event, EventError, RecordedEvent, SerializedEvent};
pub use event_log::{EventLog, EventStoreError};
pub use event_store::EventStore;
pub use revision::Revision;
pub use subscription::EventSubscriber;
