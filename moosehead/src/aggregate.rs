//! Workshop aggregate: command validation.
//!
//! The aggregate turns a [`WorkshopCommand`] into exactly one [`WorkshopEvent`]
//! or a [`WorkshopError`]. It reads the projection but never appends; the
//! caller holds the writer lock across validate → append so the projection
//! cannot change between the check and the event.

use crate::commands::WorkshopCommand;
use crate::error::WorkshopError;
use crate::events::WorkshopEvent;
use crate::projection::WorkshopListProjection;
use std::sync::Arc;

/// The single write authority for the workshop domain.
#[derive(Clone)]
pub struct WorkshopAggregate {
    projection: Arc<WorkshopListProjection>,
}

impl WorkshopAggregate {
    /// Creates an aggregate validating against `projection`.
    #[must_use]
    pub const fn new(projection: Arc<WorkshopListProjection>) -> Self {
        Self { projection }
    }

    /// Validate a command and produce the event it results in.
    ///
    /// # Errors
    ///
    /// - `DuplicateWorkshop`: adding a workshop whose id exists
    /// - `UnknownWorkshop`: reserving on or cancelling from a missing workshop
    /// - `InvalidSeatCount`: reserving zero seats
    /// - `DuplicateReservation`: the email already holds a reservation there
    /// - `ReservationNotFound`: cancelling without an active reservation
    /// - `InvalidToken`: confirming with a token that does not resolve to an
    ///   unconfirmed reservation
    pub fn create_event(&self, command: WorkshopCommand) -> Result<WorkshopEvent, WorkshopError> {
        match command {
            WorkshopCommand::AddWorkshop { workshop, author } => {
                if self.projection.contains_workshop(&workshop.id) {
                    return Err(WorkshopError::DuplicateWorkshop(workshop.id));
                }
                Ok(WorkshopEvent::WorkshopAdded { workshop, author })
            }

            WorkshopCommand::AddReservation {
                email,
                fullname,
                workshop_id,
                author,
                seats,
            } => {
                if !self.projection.contains_workshop(&workshop_id) {
                    return Err(WorkshopError::UnknownWorkshop(workshop_id));
                }
                if seats < 1 {
                    return Err(WorkshopError::InvalidSeatCount(seats));
                }
                if self.projection.has_active_reservation(&email, &workshop_id) {
                    return Err(WorkshopError::DuplicateReservation { email, workshop_id });
                }
                Ok(WorkshopEvent::ReservationAdded {
                    email,
                    fullname,
                    workshop_id,
                    author,
                    seats,
                })
            }

            WorkshopCommand::CancelReservation {
                email,
                workshop_id,
                author,
            } => {
                if !self.projection.contains_workshop(&workshop_id) {
                    return Err(WorkshopError::UnknownWorkshop(workshop_id));
                }
                if !self.projection.has_active_reservation(&email, &workshop_id) {
                    return Err(WorkshopError::ReservationNotFound { email, workshop_id });
                }
                Ok(WorkshopEvent::ReservationCancelled {
                    email,
                    workshop_id,
                    author,
                })
            }

            WorkshopCommand::ConfirmEmail { token } => {
                match self.projection.find_by_reservation_token(&token) {
                    Some(participant) if !participant.is_email_confirmed => {
                        Ok(WorkshopEvent::EmailConfirmedByUser {
                            email: participant.email,
                        })
                    }
                    _ => Err(WorkshopError::InvalidToken(token)),
                }
            }
        }
    }
}
