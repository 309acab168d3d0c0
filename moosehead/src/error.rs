//! Error types for the reservation domain.
//!
//! [`WorkshopError`] covers recoverable validation failures: no event was
//! produced and nothing changed. [`CommandError`] is what the composition root
//! returns, adding the fatal store failures on top.

use crate::types::{Email, ReservationToken, WorkshopId};
use moosehead_core::event_log::EventStoreError;
use thiserror::Error;

/// A command was refused. State is unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkshopError {
    /// No workshop with this id exists.
    #[error("Unknown workshop: {0}")]
    UnknownWorkshop(WorkshopId),

    /// A workshop with this id already exists.
    #[error("Workshop already exists: {0}")]
    DuplicateWorkshop(WorkshopId),

    /// No active reservation matches the pair.
    #[error("No reservation for {email} on workshop {workshop_id}")]
    ReservationNotFound {
        /// Participant email.
        email: Email,
        /// Workshop id.
        workshop_id: WorkshopId,
    },

    /// The token does not resolve to an unconfirmed reservation.
    #[error("Unknown token, reservation not found: {0}")]
    InvalidToken(ReservationToken),

    /// Reservations need at least one seat.
    #[error("Invalid number of seats: {0}")]
    InvalidSeatCount(u32),

    /// The email already holds an active reservation on the workshop.
    #[error("{email} already has a reservation on workshop {workshop_id}")]
    DuplicateReservation {
        /// Participant email.
        email: Email,
        /// Workshop id.
        workshop_id: WorkshopId,
    },

    /// A required command field was empty.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

/// Outcome of a failed command at the composition root.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Validation failed; nothing was appended.
    #[error(transparent)]
    Rejected(#[from] WorkshopError),

    /// The log refused a validated event. The system halts.
    #[error("Event store failure: {0}")]
    Store(#[from] EventStoreError),

    /// An earlier store failure halted the system.
    #[error("System halted after an event store failure")]
    Halted,

    /// Commands arrived before bootstrap finished.
    #[error("System has not been bootstrapped")]
    NotBootstrapped,
}

impl CommandError {
    /// Whether the error leaves the system unable to accept further commands.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Halted)
    }

    /// The validation failure, if this is one.
    #[must_use]
    pub const fn rejection(&self) -> Option<&WorkshopError> {
        match self {
            Self::Rejected(error) => Some(error),
            _ => None,
        }
    }
}
