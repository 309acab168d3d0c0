//! Domain types for workshop reservations.
//!
//! Value objects shared by events, commands, the projection and the saga.

use chrono::{DateTime, Utc};
use moosehead_core::revision::Revision;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier of a workshop, chosen by the administrator.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkshopId(String);

impl WorkshopId {
    /// Creates a `WorkshopId`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkshopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for WorkshopId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for WorkshopId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Participant email address, used as the participant's identity.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    /// Creates an `Email`. No syntax check is performed.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// The address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Email {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

/// Token handed to a participant for confirming and cancelling a reservation.
///
/// The token is the decimal revision of the `ReservationAdded` event that
/// created the reservation, so it is stable across replays.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReservationToken(String);

impl ReservationToken {
    /// Wraps a token received from outside, e.g. a link in an email.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Derives the token of the reservation created at `revision`.
    #[must_use]
    pub fn from_revision(revision: Revision) -> Self {
        Self(revision.to_string())
    }

    /// The revision this token points at, if it is well-formed.
    #[must_use]
    pub fn revision(&self) -> Option<Revision> {
        self.0.parse().ok()
    }

    /// The token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReservationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ReservationToken {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

/// Who issued a reservation or cancellation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthorKind {
    /// The participant, acting through the public flow.
    #[default]
    User,
    /// An administrator acting on behalf of the participant.
    Admin,
}

// ============================================================================
// Workshops
// ============================================================================

/// Static description of a workshop. Immutable once added.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkshopData {
    /// Unique id.
    pub id: WorkshopId,
    /// Display title.
    pub title: String,
    /// Free-text description.
    pub description: String,
    /// When the workshop starts, if scheduled.
    pub start_time: Option<DateTime<Utc>>,
    /// When the workshop ends, if scheduled.
    pub end_time: Option<DateTime<Utc>>,
    /// Capacity, unless overridden by configuration.
    pub number_of_seats: u32,
}

impl WorkshopData {
    /// Creates an unscheduled workshop.
    #[must_use]
    pub fn new(
        id: impl Into<WorkshopId>,
        title: impl Into<String>,
        description: impl Into<String>,
        number_of_seats: u32,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            start_time: None,
            end_time: None,
            number_of_seats,
        }
    }

    /// Sets the start and end time.
    #[must_use]
    pub fn scheduled(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    /// Whether both start and end time are known.
    #[must_use]
    pub const fn has_start_and_end_time(&self) -> bool {
        self.start_time.is_some() && self.end_time.is_some()
    }
}

/// Availability of a workshop, derived at query time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkshopStatus {
    /// Five or more seats left.
    FreeSpots,
    /// Between one and four seats left.
    FewSpots,
    /// No seats left; new confirmed reservations go to the waiting list.
    Full,
    /// The waiting list has reached the configured threshold.
    VeryFull,
    /// Registration has not opened yet.
    NotOpened,
    /// Administratively closed, or already started.
    Closed,
}

impl fmt::Display for WorkshopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::FreeSpots => "FREE_SPOTS",
            Self::FewSpots => "FEW_SPOTS",
            Self::Full => "FULL",
            Self::VeryFull => "VERY_FULL",
            Self::NotOpened => "NOT_OPENED",
            Self::Closed => "CLOSED",
        };
        f.write_str(label)
    }
}

/// Where one reservation stands, from the participant's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReservationStatus {
    /// The email address has not been confirmed yet.
    NotConfirmed,
    /// Confirmed and within capacity.
    HasSpace,
    /// Confirmed but beyond capacity.
    WaitingList,
}
