//! Mock collaborators for tests.

use crate::email::EmailSender;
use crate::types::{Email, ReservationToken, WorkshopId};
use moosehead_core::revision::Revision;
use std::sync::Mutex;

/// One email captured by [`RecordingEmailSender`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SentEmail {
    /// Request to confirm the address.
    EmailConfirmation {
        /// Recipient.
        email: Email,
        /// Token in the link.
        token: ReservationToken,
        /// Workshop reserved.
        workshop_id: WorkshopId,
    },
    /// Seat confirmation.
    ReservationConfirmation {
        /// Recipient.
        email: Email,
        /// Workshop reserved.
        workshop_id: WorkshopId,
        /// Revision of the reservation.
        revision: Revision,
    },
    /// Waiting-list notice.
    WaitingListInfo {
        /// Recipient.
        email: Email,
        /// Workshop reserved.
        workshop_id: WorkshopId,
    },
    /// Cancellation receipt.
    CancellationConfirmation {
        /// Recipient.
        email: Email,
        /// Workshop cancelled.
        workshop_id: WorkshopId,
    },
}

impl SentEmail {
    /// Recipient of the email.
    #[must_use]
    pub const fn recipient(&self) -> &Email {
        match self {
            Self::EmailConfirmation { email, .. }
            | Self::ReservationConfirmation { email, .. }
            | Self::WaitingListInfo { email, .. }
            | Self::CancellationConfirmation { email, .. } => email,
        }
    }
}

/// Email sender that records every call.
#[derive(Debug, Default)]
pub struct RecordingEmailSender {
    sent: Mutex<Vec<SentEmail>>,
}

impl RecordingEmailSender {
    /// Create an empty recorder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Everything sent so far, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<SentEmail> {
        self.lock().clone()
    }

    /// Emails sent to one recipient, in order.
    #[must_use]
    pub fn sent_to(&self, email: &Email) -> Vec<SentEmail> {
        self.lock()
            .iter()
            .filter(|sent| sent.recipient() == email)
            .cloned()
            .collect()
    }

    /// Return and forget everything sent so far.
    pub fn take(&self) -> Vec<SentEmail> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SentEmail>> {
        self.sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn record(&self, email: SentEmail) {
        self.lock().push(email);
    }
}

impl EmailSender for RecordingEmailSender {
    fn send_email_confirmation(&self, email: &Email, token: &ReservationToken, workshop_id: &WorkshopId) {
        self.record(SentEmail::EmailConfirmation {
            email: email.clone(),
            token: token.clone(),
            workshop_id: workshop_id.clone(),
        });
    }

    fn send_reservation_confirmation(&self, email: &Email, workshop_id: &WorkshopId, revision: Revision) {
        self.record(SentEmail::ReservationConfirmation {
            email: email.clone(),
            workshop_id: workshop_id.clone(),
            revision,
        });
    }

    fn send_waiting_list_info(&self, email: &Email, workshop_id: &WorkshopId) {
        self.record(SentEmail::WaitingListInfo {
            email: email.clone(),
            workshop_id: workshop_id.clone(),
        });
    }

    fn send_cancellation_confirmation(&self, email: &Email, workshop_id: &WorkshopId) {
        self.record(SentEmail::CancellationConfirmation {
            email: email.clone(),
            workshop_id: workshop_id.clone(),
        });
    }
}
