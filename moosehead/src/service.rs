//! Participant and admin facade over [`WorkshopSystem`].
//!
//! Translates recoverable command failures into [`ActionResult::Error`]
//! messages and query results into display types. Fatal failures (store
//! errors, halted system) still propagate as [`CommandError`].

use crate::commands::WorkshopCommand;
use crate::error::{CommandError, WorkshopError};
use crate::projection::Participant;
use crate::system::WorkshopSystem;
use crate::types::{
    AuthorKind, Email, ReservationStatus, ReservationToken, WorkshopData, WorkshopId, WorkshopStatus,
};
use serde::Serialize;
use std::sync::Arc;

/// Message returned when a cancellation token resolves to nothing.
pub const UNKNOWN_TOKEN_MESSAGE: &str = "Unknown token, reservation not found";

/// Result of a participant action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ActionResult {
    /// Done.
    Ok,
    /// Done; the participant must confirm their email address.
    ConfirmEmail,
    /// Refused, with a message for the participant.
    Error(String),
}

/// A workshop for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WorkshopInfo {
    /// Workshop id.
    pub id: WorkshopId,
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Participants in arrival order.
    pub participants: Vec<Participant>,
    /// Status now.
    pub status: WorkshopStatus,
}

/// One of a participant's reservations, for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParticipantReservation {
    /// Participant email.
    pub email: Email,
    /// Workshop id.
    pub workshop_id: WorkshopId,
    /// Workshop title.
    pub workshop_name: String,
    /// Where the reservation stands.
    pub status: ReservationStatus,
    /// Seats reserved.
    pub seats: u32,
}

/// Facade used by the outer surface.
#[derive(Clone)]
pub struct WorkshopService {
    system: Arc<WorkshopSystem>,
}

impl WorkshopService {
    /// Wraps a bootstrapped system.
    #[must_use]
    pub const fn new(system: Arc<WorkshopSystem>) -> Self {
        Self { system }
    }

    /// The underlying system.
    #[must_use]
    pub fn system(&self) -> &WorkshopSystem {
        &self.system
    }

    /// All workshops with their status.
    #[must_use]
    pub fn workshops(&self) -> Vec<WorkshopInfo> {
        self.system
            .projection()
            .workshops()
            .into_iter()
            .map(|w| WorkshopInfo {
                id: w.data.id,
                title: w.data.title,
                description: w.data.description,
                participants: w.participants,
                status: w.status,
            })
            .collect()
    }

    /// One workshop by id.
    #[must_use]
    pub fn workshop(&self, id: &WorkshopId) -> Option<WorkshopInfo> {
        self.system.projection().workshop(id).map(|w| WorkshopInfo {
            id: w.data.id,
            title: w.data.title,
            description: w.data.description,
            participants: w.participants,
            status: w.status,
        })
    }

    /// Reserve one seat.
    ///
    /// # Errors
    ///
    /// Only fatal [`CommandError`]s; validation failures become
    /// [`ActionResult::Error`].
    pub async fn reservation(
        &self,
        workshop_id: &str,
        email: &str,
        fullname: &str,
        author: AuthorKind,
    ) -> Result<ActionResult, CommandError> {
        self.reserve_seats(workshop_id, email, fullname, author, 1).await
    }

    /// Reserve `seats` seats.
    ///
    /// Returns `Ok` when the email is already confirmed or an admin made the
    /// reservation, `ConfirmEmail` otherwise.
    ///
    /// # Errors
    ///
    /// Only fatal [`CommandError`]s.
    pub async fn reserve_seats(
        &self,
        workshop_id: &str,
        email: &str,
        fullname: &str,
        author: AuthorKind,
        seats: u32,
    ) -> Result<ActionResult, CommandError> {
        let command = match WorkshopCommand::add_reservation(workshop_id, email, fullname, author, seats) {
            Ok(command) => command,
            Err(error) => return Ok(ActionResult::Error(error.to_string())),
        };
        if let Err(error) = recoverable(self.system.execute(command).await)? {
            return Ok(error);
        }

        let confirmed = author == AuthorKind::Admin || self.system.projection().is_email_confirmed(&Email::from(email));
        Ok(if confirmed {
            ActionResult::Ok
        } else {
            ActionResult::ConfirmEmail
        })
    }

    /// Cancel the reservation behind `token`.
    ///
    /// # Errors
    ///
    /// Only fatal [`CommandError`]s.
    pub async fn cancellation(&self, token: &str, author: AuthorKind) -> Result<ActionResult, CommandError> {
        match self.system.cancel(ReservationToken::from(token), author).await {
            Err(CommandError::Rejected(WorkshopError::InvalidToken(_))) => {
                Ok(ActionResult::Error(UNKNOWN_TOKEN_MESSAGE.to_string()))
            }
            result => Ok(match recoverable(result)? {
                Ok(()) => ActionResult::Ok,
                Err(error) => error,
            }),
        }
    }

    /// Confirm the email behind `token`. Confirming twice is `Ok`.
    ///
    /// # Errors
    ///
    /// Only fatal [`CommandError`]s.
    pub async fn confirm_email(&self, token: &str) -> Result<ActionResult, CommandError> {
        Ok(match recoverable(self.system.confirm_email(ReservationToken::from(token)).await)? {
            Ok(()) => ActionResult::Ok,
            Err(error) => error,
        })
    }

    /// Create a workshop as an administrator.
    ///
    /// # Errors
    ///
    /// Only fatal [`CommandError`]s.
    pub async fn create_workshop(&self, data: WorkshopData) -> Result<ActionResult, CommandError> {
        let command = match WorkshopCommand::add_workshop(data, AuthorKind::Admin) {
            Ok(command) => command,
            Err(error) => return Ok(ActionResult::Error(error.to_string())),
        };
        Ok(match recoverable(self.system.execute(command).await)? {
            Ok(()) => ActionResult::Ok,
            Err(error) => error,
        })
    }

    /// Every reservation of `email`, across workshops.
    #[must_use]
    pub fn my_reservations(&self, email: &str) -> Vec<ParticipantReservation> {
        let projection = self.system.projection();
        projection
            .find_all_reservations(&Email::from(email))
            .into_iter()
            .map(|p| ParticipantReservation {
                workshop_name: projection
                    .workshop(&p.workshop_id)
                    .map(|w| w.data.title)
                    .unwrap_or_default(),
                status: p.status(),
                email: p.email,
                workshop_id: p.workshop_id,
                seats: p.seats,
            })
            .collect()
    }
}

/// Split a command outcome into fatal errors (`Err`) and participant-facing
/// refusals (`Ok(Err(ActionResult::Error))`).
fn recoverable<T>(result: Result<T, CommandError>) -> Result<Result<(), ActionResult>, CommandError> {
    match result {
        Ok(_) => Ok(Ok(())),
        Err(CommandError::Rejected(error)) => Ok(Err(ActionResult::Error(error.to_string()))),
        Err(error) => Err(error),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::SettingsHandle;
    use crate::mocks::RecordingEmailSender;
    use moosehead_testing::{InMemoryEventLog, test_clock};

    async fn service() -> WorkshopService {
        let system = WorkshopSystem::new(
            Arc::new(InMemoryEventLog::new()),
            SettingsHandle::default(),
            Arc::new(RecordingEmailSender::new()),
            Arc::new(test_clock()),
        );
        system.bootstrap().await.unwrap();
        let service = WorkshopService::new(Arc::new(system));
        service
            .create_workshop(WorkshopData::new("w1", "Rust", "Intro", 2))
            .await
            .unwrap();
        service
    }

    #[tokio::test]
    async fn first_reservation_asks_for_confirmation() {
        let service = service().await;
        let result = service.reservation("w1", "a@x", "Ada", AuthorKind::User).await.unwrap();
        assert_eq!(result, ActionResult::ConfirmEmail);

        let mine = service.my_reservations("a@x");
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].workshop_name, "Rust");
        assert_eq!(mine[0].status, ReservationStatus::NotConfirmed);
    }

    #[tokio::test]
    async fn admin_reservation_is_ok_immediately() {
        let service = service().await;
        let result = service.reservation("w1", "a@x", "Ada", AuthorKind::Admin).await.unwrap();
        assert_eq!(result, ActionResult::Ok);
        assert_eq!(service.my_reservations("a@x")[0].status, ReservationStatus::HasSpace);
    }

    #[tokio::test]
    async fn validation_failures_become_messages() {
        let service = service().await;

        let unknown = service.reservation("nope", "a@x", "Ada", AuthorKind::User).await.unwrap();
        assert_eq!(unknown, ActionResult::Error("Unknown workshop: nope".to_string()));

        let missing = service.reservation("w1", "", "Ada", AuthorKind::User).await.unwrap();
        assert_eq!(missing, ActionResult::Error("Missing required field: email".to_string()));

        let duplicate = service
            .create_workshop(WorkshopData::new("w1", "Again", "", 1))
            .await
            .unwrap();
        assert!(matches!(duplicate, ActionResult::Error(_)));
    }

    #[tokio::test]
    async fn workshop_lookup_by_id() {
        let service = service().await;
        let info = service.workshop(&WorkshopId::from("w1")).unwrap();
        assert_eq!(info.title, "Rust");
        assert_eq!(info.status, WorkshopStatus::FewSpots);
        assert!(service.workshop(&WorkshopId::from("w2")).is_none());
        assert_eq!(service.workshops().len(), 1);
    }
}
