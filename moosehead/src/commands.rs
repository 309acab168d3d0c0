//! Commands accepted by the workshop aggregate.
//!
//! Commands are plain values. Build them through the constructor functions,
//! which reject empty required fields with [`WorkshopError::MissingField`]
//! before the command ever reaches the aggregate.

use crate::error::WorkshopError;
use crate::types::{AuthorKind, Email, ReservationToken, WorkshopData, WorkshopId};

/// A request to change workshop state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkshopCommand {
    /// Create a workshop.
    AddWorkshop {
        /// The workshop to create.
        workshop: WorkshopData,
        /// Who creates it.
        author: AuthorKind,
    },
    /// Reserve seats.
    AddReservation {
        /// Participant email.
        email: Email,
        /// Participant display name.
        fullname: String,
        /// Target workshop.
        workshop_id: WorkshopId,
        /// Who reserves.
        author: AuthorKind,
        /// Seats requested.
        seats: u32,
    },
    /// Cancel the active reservation of `email` on `workshop_id`.
    CancelReservation {
        /// Participant email.
        email: Email,
        /// Workshop id.
        workshop_id: WorkshopId,
        /// Who cancels.
        author: AuthorKind,
    },
    /// Confirm the email behind a reservation token.
    ConfirmEmail {
        /// Token from the confirmation email.
        token: ReservationToken,
    },
}

fn require(value: &str, field: &'static str) -> Result<(), WorkshopError> {
    if value.trim().is_empty() {
        return Err(WorkshopError::MissingField(field));
    }
    Ok(())
}

impl WorkshopCommand {
    /// Builds an `AddWorkshop` command.
    ///
    /// # Errors
    ///
    /// `MissingField` when the id or the title is empty.
    pub fn add_workshop(workshop: WorkshopData, author: AuthorKind) -> Result<Self, WorkshopError> {
        require(workshop.id.as_str(), "workshop id")?;
        require(&workshop.title, "title")?;
        Ok(Self::AddWorkshop { workshop, author })
    }

    /// Builds an `AddReservation` command. The seat count is checked by the
    /// aggregate.
    ///
    /// # Errors
    ///
    /// `MissingField` when the workshop id, the email or the full name is empty.
    pub fn add_reservation(
        workshop_id: impl Into<WorkshopId>,
        email: impl Into<Email>,
        fullname: impl Into<String>,
        author: AuthorKind,
        seats: u32,
    ) -> Result<Self, WorkshopError> {
        let workshop_id = workshop_id.into();
        let email = email.into();
        let fullname = fullname.into();
        require(workshop_id.as_str(), "workshop id")?;
        require(email.as_str(), "email")?;
        require(&fullname, "fullname")?;
        Ok(Self::AddReservation {
            email,
            fullname,
            workshop_id,
            author,
            seats,
        })
    }

    /// Builds a `CancelReservation` command.
    ///
    /// # Errors
    ///
    /// `MissingField` when the workshop id or the email is empty.
    pub fn cancel_reservation(
        workshop_id: impl Into<WorkshopId>,
        email: impl Into<Email>,
        author: AuthorKind,
    ) -> Result<Self, WorkshopError> {
        let workshop_id = workshop_id.into();
        let email = email.into();
        require(workshop_id.as_str(), "workshop id")?;
        require(email.as_str(), "email")?;
        Ok(Self::CancelReservation {
            email,
            workshop_id,
            author,
        })
    }

    /// Builds a `ConfirmEmail` command.
    ///
    /// # Errors
    ///
    /// `MissingField` when the token is empty.
    pub fn confirm_email(token: impl Into<ReservationToken>) -> Result<Self, WorkshopError> {
        let token = token.into();
        require(token.as_str(), "token")?;
        Ok(Self::ConfirmEmail { token })
    }

    /// Short name used in logs and metrics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AddWorkshop { .. } => "add_workshop",
            Self::AddReservation { .. } => "add_reservation",
            Self::CancelReservation { .. } => "cancel_reservation",
            Self::ConfirmEmail { .. } => "confirm_email",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservation_requires_every_text_field() {
        let missing_email = WorkshopCommand::add_reservation("w1", "", "Ada", AuthorKind::User, 1);
        assert_eq!(missing_email, Err(WorkshopError::MissingField("email")));

        let missing_name =
            WorkshopCommand::add_reservation("w1", "ada@example.com", "  ", AuthorKind::User, 1);
        assert_eq!(missing_name, Err(WorkshopError::MissingField("fullname")));

        let missing_workshop =
            WorkshopCommand::add_reservation("", "ada@example.com", "Ada", AuthorKind::User, 1);
        assert_eq!(missing_workshop, Err(WorkshopError::MissingField("workshop id")));
    }

    #[test]
    fn zero_seats_is_left_to_the_aggregate() {
        let command = WorkshopCommand::add_reservation("w1", "ada@example.com", "Ada", AuthorKind::User, 0);
        assert!(matches!(command, Ok(WorkshopCommand::AddReservation { seats: 0, .. })));
    }

    #[test]
    fn workshop_needs_id_and_title() {
        let untitled = WorkshopData::new("w1", "", "desc", 10);
        assert_eq!(
            WorkshopCommand::add_workshop(untitled, AuthorKind::Admin),
            Err(WorkshopError::MissingField("title"))
        );

        let anonymous = WorkshopData::new("", "Rust", "desc", 10);
        assert_eq!(
            WorkshopCommand::add_workshop(anonymous, AuthorKind::Admin),
            Err(WorkshopError::MissingField("workshop id"))
        );
    }

    #[test]
    fn names_are_stable() {
        let cancel = WorkshopCommand::cancel_reservation("w1", "ada@example.com", AuthorKind::User);
        assert_eq!(cancel.map(|c| c.name()), Ok("cancel_reservation"));
        assert_eq!(
            WorkshopCommand::confirm_email("3").map(|c| c.name()),
            Ok("confirm_email")
        );
        assert_eq!(
            WorkshopCommand::confirm_email(""),
            Err(WorkshopError::MissingField("token"))
        );
    }
}
