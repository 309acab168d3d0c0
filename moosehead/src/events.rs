//! The closed set of workshop events.
//!
//! Every subscriber dispatches on [`WorkshopEvent`] with an exhaustive `match`,
//! so adding a variant is a compile error wherever it is not handled.

use crate::types::{AuthorKind, Email, WorkshopData, WorkshopId};
use moosehead_core::event::Event;
use serde::{Deserialize, Serialize};

/// Facts recorded in the workshop log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkshopEvent {
    /// A workshop was created.
    WorkshopAdded {
        /// The workshop's static description.
        workshop: WorkshopData,
        /// Who created it.
        author: AuthorKind,
    },

    /// Someone asked for seats on a workshop.
    ReservationAdded {
        /// Participant email.
        email: Email,
        /// Participant display name.
        fullname: String,
        /// Target workshop.
        workshop_id: WorkshopId,
        /// Who made the reservation.
        author: AuthorKind,
        /// Number of seats requested, at least 1.
        seats: u32,
    },

    /// A reservation was withdrawn.
    ReservationCancelled {
        /// Participant email.
        email: Email,
        /// Workshop the reservation was for.
        workshop_id: WorkshopId,
        /// Who cancelled.
        author: AuthorKind,
    },

    /// The participant proved ownership of the email address.
    EmailConfirmedByUser {
        /// The confirmed address.
        email: Email,
    },

    /// Replay has finished. Delivered once per process, never persisted.
    BootstrapDone,
}

impl WorkshopEvent {
    /// Workshop the event concerns, if any.
    #[must_use]
    pub const fn workshop_id(&self) -> Option<&WorkshopId> {
        match self {
            Self::WorkshopAdded { workshop, .. } => Some(&workshop.id),
            Self::ReservationAdded { workshop_id, .. }
            | Self::ReservationCancelled { workshop_id, .. } => Some(workshop_id),
            Self::EmailConfirmedByUser { .. } | Self::BootstrapDone => None,
        }
    }
}

impl Event for WorkshopEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::WorkshopAdded { .. } => "WorkshopAdded.v1",
            Self::ReservationAdded { .. } => "ReservationAdded.v1",
            Self::ReservationCancelled { .. } => "ReservationCancelled.v1",
            Self::EmailConfirmedByUser { .. } => "EmailConfirmedByUser.v1",
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use moosehead_core::event::SerializedEvent;

    #[test]
    fn reservation_survives_the_log_encoding() {
        let event = WorkshopEvent::ReservationAdded {
            email: Email::from("ada@example.com"),
            fullname: "Ada Lovelace".to_string(),
            workshop_id: WorkshopId::from("rust-101"),
            author: AuthorKind::User,
            seats: 2,
        };

        let serialized = SerializedEvent::from_event(&event).unwrap();
        assert_eq!(serialized.event_type, "ReservationAdded.v1");
        assert_eq!(serialized.decode::<WorkshopEvent>().unwrap(), event);
    }

    #[test]
    fn workshop_id_is_extracted_where_present() {
        let added = WorkshopEvent::WorkshopAdded {
            workshop: WorkshopData::new("rust-101", "Rust", "Intro", 10),
            author: AuthorKind::Admin,
        };
        assert_eq!(added.workshop_id(), Some(&WorkshopId::from("rust-101")));

        let confirmed = WorkshopEvent::EmailConfirmedByUser {
            email: Email::from("ada@example.com"),
        };
        assert_eq!(confirmed.workshop_id(), None);
        assert_eq!(WorkshopEvent::bootstrap_done().workshop_id(), None);
    }
}
