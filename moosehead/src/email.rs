//! Email sender trait and a console implementation.
//!
//! The saga decides *which* email to send; how it is delivered is up to the
//! [`EmailSender`] injected at the composition root.

use crate::types::{Email, ReservationToken, WorkshopId};
use moosehead_core::revision::Revision;
use tracing::info;

/// Outbound participant notifications.
///
/// Calls are made synchronously from inside event delivery, while the writer
/// lock is held. Implementations should hand the message off quickly (queue,
/// channel) rather than block on a slow transport. Delivery failures are the
/// implementation's concern; the saga does not retry.
pub trait EmailSender: Send + Sync {
    /// Ask the participant to confirm their address.
    ///
    /// `token` confirms the reservation and can later cancel it.
    fn send_email_confirmation(&self, email: &Email, token: &ReservationToken, workshop_id: &WorkshopId);

    /// Tell the participant they hold a seat.
    ///
    /// `revision` is the revision of the reservation, from which the
    /// cancellation token is derived.
    fn send_reservation_confirmation(&self, email: &Email, workshop_id: &WorkshopId, revision: Revision);

    /// Tell the participant they are on the waiting list.
    fn send_waiting_list_info(&self, email: &Email, workshop_id: &WorkshopId);

    /// Acknowledge a cancellation.
    fn send_cancellation_confirmation(&self, email: &Email, workshop_id: &WorkshopId);
}

/// Email sender that logs instead of sending.
///
/// Useful for development and for the demo binary.
#[derive(Clone, Debug, Default)]
pub struct ConsoleEmailSender;

impl ConsoleEmailSender {
    /// Create a new console email sender.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl EmailSender for ConsoleEmailSender {
    fn send_email_confirmation(&self, email: &Email, token: &ReservationToken, workshop_id: &WorkshopId) {
        info!(to = %email, token = %token, workshop_id = %workshop_id, "📧 Please confirm your email address");
    }

    fn send_reservation_confirmation(&self, email: &Email, workshop_id: &WorkshopId, revision: Revision) {
        let token = ReservationToken::from_revision(revision);
        info!(to = %email, workshop_id = %workshop_id, token = %token, "📧 You have a seat");
    }

    fn send_waiting_list_info(&self, email: &Email, workshop_id: &WorkshopId) {
        info!(to = %email, workshop_id = %workshop_id, "📧 You are on the waiting list");
    }

    fn send_cancellation_confirmation(&self, email: &Email, workshop_id: &WorkshopId) {
        info!(to = %email, workshop_id = %workshop_id, "📧 Your reservation was cancelled");
    }
}
