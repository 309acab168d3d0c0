//! Email saga: seat placement and participant notifications.
//!
//! The saga keeps its own view of who holds a seat, independent of the
//! projection:
//!
//! ```text
//! ReservationAdded ──▶ unconfirmed ──EmailConfirmedByUser──▶ place ─┬─▶ seated
//!        │                                                          └─▶ waiting (FIFO)
//!        └── email already confirmed, or admin ──────────────────▶ place
//!
//! ReservationCancelled ──▶ cancellation email, then promote waiting heads while they fit
//! ```
//!
//! Placement is decided in confirmation order, so two participants who reserve
//! in one order and confirm in the other are seated in confirmation order.
//!
//! During replay the state is rebuilt but no email is sent; emails start with
//! the first event after [`WorkshopEvent::BootstrapDone`].

use crate::config::SettingsHandle;
use crate::email::EmailSender;
use crate::events::WorkshopEvent;
use crate::types::{AuthorKind, Email, ReservationToken, WorkshopId};
use moosehead_core::event::RecordedEvent;
use moosehead_core::revision::Revision;
use moosehead_core::subscription::EventSubscriber;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// A reservation the saga knows about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Booking {
    /// Revision of the `ReservationAdded` event.
    pub revision: Revision,
    /// Participant email.
    pub email: Email,
    /// Workshop reserved.
    pub workshop_id: WorkshopId,
    /// Seats reserved.
    pub seats: u32,
}

/// Outcome of placing a confirmed booking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// The booking holds seats.
    Seated,
    /// The booking is queued.
    Waiting,
}

/// Derived saga state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SagaState {
    live: bool,
    unconfirmed: Vec<Booking>,
    confirmed_emails: BTreeSet<Email>,
    seats_by_workshop: HashMap<WorkshopId, u32>,
    seated: HashMap<WorkshopId, Vec<Booking>>,
    waiting: HashMap<WorkshopId, VecDeque<Booking>>,
}

impl SagaState {
    /// Whether replay has finished.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.live
    }

    /// Bookings awaiting email confirmation, in arrival order.
    #[must_use]
    pub fn unconfirmed(&self) -> &[Booking] {
        &self.unconfirmed
    }

    /// Whether the email has been confirmed.
    #[must_use]
    pub fn is_confirmed(&self, email: &Email) -> bool {
        self.confirmed_emails.contains(email)
    }

    /// Bookings holding seats on a workshop, in placement order.
    #[must_use]
    pub fn seated(&self, workshop_id: &WorkshopId) -> Vec<Booking> {
        self.seated.get(workshop_id).cloned().unwrap_or_default()
    }

    /// The waiting queue of a workshop, head first.
    #[must_use]
    pub fn waiting(&self, workshop_id: &WorkshopId) -> Vec<Booking> {
        self.waiting
            .get(workshop_id)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Seats held on a workshop.
    #[must_use]
    pub fn seated_seats(&self, workshop_id: &WorkshopId) -> u32 {
        self.seated
            .get(workshop_id)
            .map_or(0, |seated| seated.iter().map(|b| b.seats).sum())
    }
}

/// Index of the first queued booking that fits an empty workshop.
fn first_placeable(queue: &VecDeque<Booking>, capacity: u32) -> Option<usize> {
    queue.iter().position(|booking| booking.seats <= capacity)
}

/// Sends emails only once the saga is live, and counts them.
struct Outbox<'a> {
    sender: &'a dyn EmailSender,
    live: bool,
}

impl Outbox<'_> {
    fn sent(&self, kind: &'static str, email: &Email, workshop_id: &WorkshopId) -> bool {
        if !self.live {
            return false;
        }
        metrics::counter!("saga.emails.sent", "kind" => kind).increment(1);
        tracing::info!(kind, email = %email, workshop_id = %workshop_id, "Sending email");
        true
    }

    fn placed(&self, booking: &Booking, placement: Placement) {
        match placement {
            Placement::Seated => {
                if self.sent("reservation_confirmation", &booking.email, &booking.workshop_id) {
                    self.sender.send_reservation_confirmation(
                        &booking.email,
                        &booking.workshop_id,
                        booking.revision,
                    );
                }
            }
            Placement::Waiting => {
                if self.sent("waiting_list_info", &booking.email, &booking.workshop_id) {
                    self.sender
                        .send_waiting_list_info(&booking.email, &booking.workshop_id);
                }
            }
        }
    }

    fn confirmation_requested(&self, booking: &Booking) {
        if self.sent("email_confirmation", &booking.email, &booking.workshop_id) {
            self.sender.send_email_confirmation(
                &booking.email,
                &ReservationToken::from_revision(booking.revision),
                &booking.workshop_id,
            );
        }
    }

    fn cancelled(&self, email: &Email, workshop_id: &WorkshopId) {
        if self.sent("cancellation_confirmation", email, workshop_id) {
            self.sender.send_cancellation_confirmation(email, workshop_id);
        }
    }
}

/// Process manager deciding seats and emails.
pub struct EmailSaga {
    state: Mutex<SagaState>,
    sender: Arc<dyn EmailSender>,
    settings: SettingsHandle,
}

impl EmailSaga {
    /// Creates a saga that has seen no events.
    #[must_use]
    pub fn new(sender: Arc<dyn EmailSender>, settings: SettingsHandle) -> Self {
        Self {
            state: Mutex::new(SagaState::default()),
            sender,
            settings,
        }
    }

    /// Copy of the derived state.
    #[must_use]
    pub fn snapshot(&self) -> SagaState {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SagaState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn capacity(&self, state: &SagaState, workshop_id: &WorkshopId) -> u32 {
        let settings = self.settings.current();
        settings
            .capacity_override(workshop_id)
            .or_else(|| state.seats_by_workshop.get(workshop_id).copied())
            .unwrap_or(settings.places_per_workshop)
    }

    fn place(&self, state: &mut SagaState, booking: Booking, outbox: &Outbox<'_>) {
        let capacity = self.capacity(state, &booking.workshop_id);
        let fits = state.seated_seats(&booking.workshop_id) + booking.seats <= capacity;
        let nobody_ahead = state
            .waiting
            .get(&booking.workshop_id)
            .is_none_or(|queue| first_placeable(queue, capacity).is_none());

        let placement = if fits && nobody_ahead {
            Placement::Seated
        } else {
            Placement::Waiting
        };
        tracing::debug!(
            email = %booking.email,
            workshop_id = %booking.workshop_id,
            seats = booking.seats,
            ?placement,
            "Placed booking"
        );
        outbox.placed(&booking, placement);

        let workshop_id = booking.workshop_id.clone();
        match placement {
            Placement::Seated => state.seated.entry(workshop_id).or_default().push(booking),
            Placement::Waiting => state.waiting.entry(workshop_id).or_default().push_back(booking),
        }
    }

    /// Seats the first placeable waiting booking while it fits.
    ///
    /// Bookings larger than the whole workshop stay queued without blocking
    /// the ones behind them.
    fn promote(&self, state: &mut SagaState, workshop_id: &WorkshopId, outbox: &Outbox<'_>) {
        let capacity = self.capacity(state, workshop_id);
        loop {
            let held = state.seated_seats(workshop_id);
            let Some(queue) = state.waiting.get_mut(workshop_id) else {
                return;
            };
            let Some(index) = first_placeable(queue, capacity) else {
                return;
            };
            if queue.get(index).is_none_or(|head| held + head.seats > capacity) {
                return;
            }
            let Some(head) = queue.remove(index) else {
                return;
            };
            tracing::info!(
                email = %head.email,
                workshop_id = %workshop_id,
                "Promoted from waiting list"
            );
            outbox.placed(&head, Placement::Seated);
            state.seated.entry(workshop_id.clone()).or_default().push(head);
        }
    }

    fn cancel(&self, state: &mut SagaState, email: &Email, workshop_id: &WorkshopId, outbox: &Outbox<'_>) {
        let matches = |b: &Booking| &b.email == email && &b.workshop_id == workshop_id;

        outbox.cancelled(email, workshop_id);

        if let Some(index) = state.unconfirmed.iter().position(matches) {
            state.unconfirmed.remove(index);
            return;
        }

        let removed = state
            .waiting
            .get_mut(workshop_id)
            .and_then(|queue| queue.iter().position(matches).and_then(|i| queue.remove(i)))
            .or_else(|| {
                state
                    .seated
                    .get_mut(workshop_id)
                    .and_then(|seated| seated.iter().position(matches).map(|i| seated.remove(i)))
            });
        if removed.is_some() {
            self.promote(state, workshop_id, outbox);
        } else {
            tracing::warn!(email = %email, workshop_id = %workshop_id, "Cancelled booking unknown to saga");
        }
    }

    fn apply(&self, state: &mut SagaState, recorded: &RecordedEvent<WorkshopEvent>) {
        let outbox = Outbox {
            sender: self.sender.as_ref(),
            live: state.live,
        };

        match &recorded.payload {
            WorkshopEvent::WorkshopAdded { workshop, .. } => {
                state
                    .seats_by_workshop
                    .insert(workshop.id.clone(), workshop.number_of_seats);
            }
            WorkshopEvent::ReservationAdded {
                email,
                workshop_id,
                author,
                seats,
                ..
            } => {
                let booking = Booking {
                    revision: recorded.revision,
                    email: email.clone(),
                    workshop_id: workshop_id.clone(),
                    seats: *seats,
                };
                if *author == AuthorKind::Admin || state.confirmed_emails.contains(email) {
                    self.place(state, booking, &outbox);
                } else {
                    outbox.confirmation_requested(&booking);
                    state.unconfirmed.push(booking);
                }
            }
            WorkshopEvent::EmailConfirmedByUser { email } => {
                state.confirmed_emails.insert(email.clone());
                let (mine, others): (Vec<Booking>, Vec<Booking>) = std::mem::take(&mut state.unconfirmed)
                    .into_iter()
                    .partition(|b| &b.email == email);
                state.unconfirmed = others;
                for booking in mine {
                    self.place(state, booking, &outbox);
                }
            }
            WorkshopEvent::ReservationCancelled { email, workshop_id, .. } => {
                self.cancel(state, email, workshop_id, &outbox);
            }
            WorkshopEvent::BootstrapDone => {
                state.live = true;
                tracing::info!(
                    unconfirmed = state.unconfirmed.len(),
                    confirmed_emails = state.confirmed_emails.len(),
                    "Email saga live"
                );
            }
        }
    }
}

impl EventSubscriber<WorkshopEvent> for EmailSaga {
    fn name(&self) -> &'static str {
        "email_saga"
    }

    fn on_event(&self, event: &RecordedEvent<WorkshopEvent>) {
        let mut state = self.lock();
        self.apply(&mut state, event);
    }
}
