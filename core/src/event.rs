//! Event trait and recorded-event envelope.
//!
//! Events represent facts about things that have happened and are immutable once
//! appended. Domain crates model their events as one closed enum implementing
//! [`Event`]; the store wraps each one in a [`RecordedEvent`] carrying its
//! [`Revision`] and timestamp.
//!
//! # Serialization
//!
//! Events cross the persistence boundary as [`SerializedEvent`]s: the stable
//! event type name plus the `bincode` encoding of the payload.
//!
//! # Example
//!
//! ```
//! use moosehead_core::event::Event;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Clone, Debug, Serialize, Deserialize)]
//! enum DoorEvent {
//!     Opened { door: String },
//!     BootstrapDone,
//! }
//!
//! impl Event for DoorEvent {
//!     fn event_type(&self) -> &'static str {
//!         match self {
//!             DoorEvent::Opened { .. } => "DoorOpened.v1",
//!             DoorEvent::BootstrapDone => "BootstrapDone",
//!         }
//!     }
//!
//!     fn bootstrap_done() -> Self {
//!         DoorEvent::BootstrapDone
//!     }
//!
//!     fn is_bootstrap_done(&self) -> bool {
//!         matches!(self, DoorEvent::BootstrapDone)
//!     }
//! }
//! ```

use crate::revision::Revision;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Error types for event operations.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize event to bytes.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize event from bytes.
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),

    /// Stored type name does not match the decoded payload.
    #[error("Event type mismatch: stored {stored}, decoded {decoded}")]
    TypeMismatch {
        /// Type name recorded in the log.
        stored: String,
        /// Type name of the decoded payload.
        decoded: &'static str,
    },
}

/// An event that can be appended to the log and replayed to rebuild state.
///
/// # Bootstrap sentinel
///
/// Every event type has one sentinel value, returned by
/// [`bootstrap_done`](Event::bootstrap_done), that the store delivers to its
/// subscribers after replaying history. Subscribers use it to tell catching
/// up from live processing. The sentinel is never persisted.
///
/// # Naming Convention
///
/// `event_type()` returns a stable identifier, optionally versioned:
/// `"ReservationAdded.v1"`.
pub trait Event: Send + Sync + 'static {
    /// Returns the event type identifier for this event.
    fn event_type(&self) -> &'static str;

    /// The sentinel delivered once replay has finished.
    fn bootstrap_done() -> Self
    where
        Self: Sized;

    /// Whether this value is the bootstrap sentinel.
    fn is_bootstrap_done(&self) -> bool;

    /// Serialize this event to bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    fn to_bytes(&self) -> Result<Vec<u8>, EventError>
    where
        Self: Serialize,
    {
        bincode::serialize(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Deserialize an event from bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::DeserializationError` if the bytes are corrupted or
    /// belong to an incompatible schema.
    fn from_bytes(bytes: &[u8]) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        bincode::deserialize(bytes).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

/// A serialized event ready for storage.
///
/// This is the wire format between the store and an [`EventLog`](crate::event_log::EventLog).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedEvent {
    /// The event type identifier (e.g., "ReservationAdded.v1").
    pub event_type: String,

    /// The bincode-serialized event data.
    pub data: Vec<u8>,
}

impl SerializedEvent {
    /// Create a new serialized event.
    #[must_use]
    pub const fn new(event_type: String, data: Vec<u8>) -> Self {
        Self { event_type, data }
    }

    /// Encode an [`Event`].
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    pub fn from_event<E: Event + Serialize>(event: &E) -> Result<Self, EventError> {
        Ok(Self {
            event_type: event.event_type().to_string(),
            data: event.to_bytes()?,
        })
    }

    /// Decode back into an [`Event`], checking that the stored type name
    /// matches the decoded variant.
    ///
    /// # Errors
    ///
    /// Returns `EventError::DeserializationError` for undecodable bytes and
    /// `EventError::TypeMismatch` when the type name disagrees with the payload.
    pub fn decode<E: Event + DeserializeOwned>(&self) -> Result<E, EventError> {
        let event = E::from_bytes(&self.data)?;
        if event.event_type() != self.event_type {
            return Err(EventError::TypeMismatch {
                stored: self.event_type.clone(),
                decoded: event.event_type(),
            });
        }
        Ok(event)
    }
}

impl fmt::Display for SerializedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SerializedEvent {{ type: {}, size: {} bytes }}",
            self.event_type,
            self.data.len()
        )
    }
}

/// An event together with its position in the log and the time it was recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent<E> {
    /// Position in the log.
    pub revision: Revision,
    /// When the store accepted the event.
    pub recorded_at: DateTime<Utc>,
    /// The event itself.
    pub payload: E,
}

impl<E> RecordedEvent<E> {
    /// Wrap a payload.
    #[must_use]
    pub const fn new(revision: Revision, recorded_at: DateTime<Utc>, payload: E) -> Self {
        Self {
            revision,
            recorded_at,
            payload,
        }
    }

    /// Transform the payload, keeping revision and timestamp.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `f`.
    pub fn try_map<T, Err>(
        &self,
        f: impl FnOnce(&E) -> Result<T, Err>,
    ) -> Result<RecordedEvent<T>, Err> {
        Ok(RecordedEvent {
            revision: self.revision,
            recorded_at: self.recorded_at,
            payload: f(&self.payload)?,
        })
    }
}
