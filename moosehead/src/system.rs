//! Composition root: wires store, projection, saga and aggregate.
//!
//! [`WorkshopSystem`] owns the writer lock. Every command runs
//! validate → create event → append → fan-out as one critical section, so the
//! aggregate always validates against a projection that reflects every
//! previously accepted event.
//!
//! # Example
//!
//! ```rust,ignore
//! let system = WorkshopSystem::new(log, settings, Arc::new(ConsoleEmailSender::new()), clock);
//! system.bootstrap().await?;
//! system.execute(WorkshopCommand::add_workshop(data, AuthorKind::Admin)?).await?;
//! ```

use crate::aggregate::WorkshopAggregate;
use crate::commands::WorkshopCommand;
use crate::config::SettingsHandle;
use crate::email::EmailSender;
use crate::error::{CommandError, WorkshopError};
use crate::events::WorkshopEvent;
use crate::projection::WorkshopListProjection;
use crate::saga::EmailSaga;
use crate::types::{AuthorKind, ReservationToken};
use moosehead_core::environment::Clock;
use moosehead_core::event::RecordedEvent;
use moosehead_core::event_log::{EventLog, EventStoreError};
use moosehead_core::event_store::EventStore;
use moosehead_core::revision::Revision;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// The reservation engine.
pub struct WorkshopSystem {
    store: EventStore<WorkshopEvent>,
    projection: Arc<WorkshopListProjection>,
    saga: Arc<EmailSaga>,
    aggregate: WorkshopAggregate,
    settings: SettingsHandle,
    writer: Mutex<()>,
    halted: AtomicBool,
}

impl WorkshopSystem {
    /// Wire a system over `log`. Call [`bootstrap`](Self::bootstrap) before
    /// sending commands.
    #[must_use]
    pub fn new(
        log: Arc<dyn EventLog>,
        settings: SettingsHandle,
        email: Arc<dyn EmailSender>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let projection = Arc::new(WorkshopListProjection::new(settings.clone(), Arc::clone(&clock)));
        let saga = Arc::new(EmailSaga::new(email, settings.clone()));

        let mut store = EventStore::new(log, clock);
        store.subscribe(projection.clone());
        store.subscribe(saga.clone());

        Self {
            store,
            aggregate: WorkshopAggregate::new(Arc::clone(&projection)),
            projection,
            saga,
            settings,
            writer: Mutex::new(()),
            halted: AtomicBool::new(false),
        }
    }

    /// Replay the log into the projection and the saga.
    ///
    /// Returns the revision of the last stored event.
    ///
    /// # Errors
    ///
    /// Any [`EventStoreError`] from replay; the system stays unbootstrapped.
    pub async fn bootstrap(&self) -> Result<Revision, EventStoreError> {
        let _writer = self.writer.lock().await;
        self.store.replay().await
    }

    /// Validate `command`, append its event and fan it out.
    ///
    /// # Errors
    ///
    /// - `Rejected`: validation failed, nothing changed
    /// - `Store`: the log refused the event; the system is halted from now on
    /// - `Halted`: an earlier store failure halted the system
    /// - `NotBootstrapped`: [`bootstrap`](Self::bootstrap) has not completed
    #[tracing::instrument(skip(self, command), fields(command = command.name()), name = "workshop_command")]
    pub async fn execute(&self, command: WorkshopCommand) -> Result<RecordedEvent<WorkshopEvent>, CommandError> {
        let _writer = self.writer.lock().await;
        self.ensure_writable().await?;
        self.apply(command).await
    }

    /// Confirm the email behind `token`.
    ///
    /// Returns `Ok(None)` without appending when the token's reservation is
    /// already confirmed.
    ///
    /// # Errors
    ///
    /// As for [`execute`](Self::execute); an unknown token is
    /// `Rejected(InvalidToken)`.
    #[tracing::instrument(skip(self, token), fields(token = %token), name = "confirm_email")]
    pub async fn confirm_email(
        &self,
        token: ReservationToken,
    ) -> Result<Option<RecordedEvent<WorkshopEvent>>, CommandError> {
        let _writer = self.writer.lock().await;
        self.ensure_writable().await?;

        if self
            .projection
            .find_by_reservation_token(&token)
            .is_some_and(|participant| participant.is_email_confirmed)
        {
            tracing::debug!("Reservation already confirmed");
            return Ok(None);
        }

        let command = WorkshopCommand::confirm_email(token)?;
        self.apply(command).await.map(Some)
    }

    /// Cancel the reservation behind `token`.
    ///
    /// The token is resolved under the writer lock, so it cancels exactly the
    /// reservation it was issued for.
    ///
    /// # Errors
    ///
    /// As for [`execute`](Self::execute); a token with no active reservation
    /// is `Rejected(InvalidToken)`.
    #[tracing::instrument(skip(self, token), fields(token = %token), name = "cancel_reservation")]
    pub async fn cancel(
        &self,
        token: ReservationToken,
        author: AuthorKind,
    ) -> Result<RecordedEvent<WorkshopEvent>, CommandError> {
        let _writer = self.writer.lock().await;
        self.ensure_writable().await?;

        let Some(participant) = self.projection.find_by_reservation_token(&token) else {
            tracing::warn!("Cancellation with unknown token");
            return Err(WorkshopError::InvalidToken(token).into());
        };
        let command = WorkshopCommand::CancelReservation {
            email: participant.email,
            workshop_id: participant.workshop_id,
            author,
        };
        self.apply(command).await
    }

    async fn ensure_writable(&self) -> Result<(), CommandError> {
        if self.halted.load(Ordering::SeqCst) {
            return Err(CommandError::Halted);
        }
        if !self.store.is_bootstrapped().await {
            return Err(CommandError::NotBootstrapped);
        }
        Ok(())
    }

    async fn apply(&self, command: WorkshopCommand) -> Result<RecordedEvent<WorkshopEvent>, CommandError> {
        let name = command.name();
        metrics::counter!("workshops.commands.total", "command" => name).increment(1);

        let event = match self.aggregate.create_event(command) {
            Ok(event) => event,
            Err(rejection) => {
                metrics::counter!("workshops.commands.rejected", "command" => name).increment(1);
                tracing::warn!(error = %rejection, "Command rejected");
                return Err(rejection.into());
            }
        };

        match self.store.append(event).await {
            Ok(recorded) => Ok(recorded),
            Err(error) => {
                self.halted.store(true, Ordering::SeqCst);
                tracing::error!(error = %error, "Event store failure, halting");
                Err(CommandError::Store(error))
            }
        }
    }

    /// Whether a store failure halted the system.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    /// Last stored revision, `None` before bootstrap.
    pub async fn head(&self) -> Option<Revision> {
        self.store.head().await
    }

    /// The full decoded history.
    ///
    /// # Errors
    ///
    /// Any [`EventStoreError`] from reading the log.
    pub async fn history(&self) -> Result<Vec<RecordedEvent<WorkshopEvent>>, EventStoreError> {
        self.store.history().await
    }

    /// The read model.
    #[must_use]
    pub fn projection(&self) -> &WorkshopListProjection {
        &self.projection
    }

    /// The saga.
    #[must_use]
    pub fn saga(&self) -> &EmailSaga {
        &self.saga
    }

    /// The live settings.
    #[must_use]
    pub const fn settings(&self) -> &SettingsHandle {
        &self.settings
    }
}
