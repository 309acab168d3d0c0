//! Workshop list projection: the read model behind every query.
//!
//! Folds the event stream into workshops with their participants in arrival
//! order, plus lookup indices by reservation token and by email. Nothing
//! time- or configuration-dependent is stored: workshop status and
//! waiting-list numbers are derived on every query from the folded state, the
//! current [`WorkshopSettings`] and the clock.
//!
//! # Query Examples
//!
//! ```rust,ignore
//! let workshops = projection.workshops();
//! let participant = projection.find_by_reservation_token(&token);
//! let mine = projection.find_all_reservations(&Email::from("ada@example.com"));
//! ```

use crate::config::{SettingsHandle, WorkshopSettings};
use crate::events::WorkshopEvent;
use crate::types::{
    AuthorKind, Email, ReservationStatus, ReservationToken, WorkshopData, WorkshopId, WorkshopStatus,
};
use chrono::{DateTime, Utc};
use moosehead_core::environment::Clock;
use moosehead_core::event::{Event, RecordedEvent};
use moosehead_core::revision::Revision;
use moosehead_core::subscription::EventSubscriber;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

/// Seats-left value below which a workshop is reported as having few spots.
const FEW_SPOTS_LIMIT: i64 = 5;

/// A reservation as seen by queries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Participant {
    /// Participant email.
    pub email: Email,
    /// Participant display name.
    pub fullname: String,
    /// Workshop reserved.
    pub workshop_id: WorkshopId,
    /// Seats reserved.
    pub seats: u32,
    /// Who made the reservation.
    pub author: AuthorKind,
    /// Whether the email was confirmed (always true for admin reservations).
    pub is_email_confirmed: bool,
    /// Token for confirmation and cancellation.
    pub reservation_token: ReservationToken,
    /// Revision of the `ReservationAdded` event.
    pub revision: Revision,
    /// Confirmed seats up to and including this one, minus capacity.
    /// At most 0 means seated; positive is the position in the queue.
    /// Always 0 while the email is unconfirmed.
    pub waiting_list_number: i64,
}

impl Participant {
    /// Where the reservation stands.
    #[must_use]
    pub const fn status(&self) -> ReservationStatus {
        if !self.is_email_confirmed {
            ReservationStatus::NotConfirmed
        } else if self.waiting_list_number <= 0 {
            ReservationStatus::HasSpace
        } else {
            ReservationStatus::WaitingList
        }
    }
}

/// A workshop as seen by queries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Workshop {
    /// Static description.
    pub data: WorkshopData,
    /// Active reservations in arrival order, unconfirmed ones included.
    pub participants: Vec<Participant>,
    /// Effective capacity at query time.
    pub capacity: u32,
    /// Status at query time.
    pub status: WorkshopStatus,
}

impl Workshop {
    /// Sum of seats over confirmed participants.
    #[must_use]
    pub fn confirmed_seats(&self) -> u32 {
        confirmed_seats(self.participants.iter().map(|p| (p.is_email_confirmed, p.seats)))
    }
}

/// Derive a workshop's status. Checks are applied in strict precedence:
///
/// 1. closed by configuration, or start time already passed: `Closed`
/// 2. registration not open yet: `NotOpened`
/// 3. otherwise by `seats_left = capacity - confirmed_seats`:
///    `VeryFull` at or below `-very_full_threshold`, `Full` at or below 0,
///    `FewSpots` below 5, else `FreeSpots`
#[must_use]
pub fn derive_status(
    data: &WorkshopData,
    confirmed_seats: u32,
    settings: &WorkshopSettings,
    now: DateTime<Utc>,
) -> WorkshopStatus {
    if settings.is_closed(&data.id) || data.start_time.is_some_and(|start| start < now) {
        return WorkshopStatus::Closed;
    }
    if !settings.is_open(now) {
        return WorkshopStatus::NotOpened;
    }

    let seats_left = i64::from(settings.capacity_of(data)) - i64::from(confirmed_seats);
    if seats_left <= -i64::from(settings.very_full_threshold) {
        WorkshopStatus::VeryFull
    } else if seats_left <= 0 {
        WorkshopStatus::Full
    } else if seats_left < FEW_SPOTS_LIMIT {
        WorkshopStatus::FewSpots
    } else {
        WorkshopStatus::FreeSpots
    }
}

fn confirmed_seats(reservations: impl Iterator<Item = (bool, u32)>) -> u32 {
    reservations
        .filter(|(confirmed, _)| *confirmed)
        .map(|(_, seats)| seats)
        .sum()
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Reservation {
    token: ReservationToken,
    revision: Revision,
    email: Email,
    fullname: String,
    seats: u32,
    author: AuthorKind,
    is_email_confirmed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct WorkshopEntry {
    data: WorkshopData,
    reservations: Vec<Reservation>,
}

impl WorkshopEntry {
    fn view(&self, settings: &WorkshopSettings, now: DateTime<Utc>) -> Workshop {
        let capacity = settings.capacity_of(&self.data);
        let mut cumulative: i64 = 0;
        let participants = self
            .reservations
            .iter()
            .map(|r| {
                let waiting_list_number = if r.is_email_confirmed {
                    cumulative += i64::from(r.seats);
                    cumulative - i64::from(capacity)
                } else {
                    0
                };
                Participant {
                    email: r.email.clone(),
                    fullname: r.fullname.clone(),
                    workshop_id: self.data.id.clone(),
                    seats: r.seats,
                    author: r.author,
                    is_email_confirmed: r.is_email_confirmed,
                    reservation_token: r.token.clone(),
                    revision: r.revision,
                    waiting_list_number,
                }
            })
            .collect();
        let confirmed = confirmed_seats(self.reservations.iter().map(|r| (r.is_email_confirmed, r.seats)));

        Workshop {
            data: self.data.clone(),
            participants,
            capacity,
            status: derive_status(&self.data, confirmed, settings, now),
        }
    }
}

/// Folded projection state.
///
/// Pure function of the event prefix it has seen: folding the same events
/// into two fresh states yields equal values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProjectionState {
    /// Workshops in creation order.
    workshops: Vec<WorkshopEntry>,
    positions: HashMap<WorkshopId, usize>,
    tokens: HashMap<ReservationToken, WorkshopId>,
    by_email: HashMap<Email, Vec<ReservationToken>>,
    confirmed_emails: BTreeSet<Email>,
}

impl ProjectionState {
    /// Fold one event.
    pub fn apply(&mut self, recorded: &RecordedEvent<WorkshopEvent>) {
        match &recorded.payload {
            WorkshopEvent::WorkshopAdded { workshop, .. } => self.add_workshop(workshop),
            WorkshopEvent::ReservationAdded {
                email,
                fullname,
                workshop_id,
                author,
                seats,
            } => {
                let is_email_confirmed = *author == AuthorKind::Admin || self.confirmed_emails.contains(email);
                let Some(entry) = self.entry_mut(workshop_id) else {
                    tracing::warn!(
                        revision = %recorded.revision,
                        workshop_id = %workshop_id,
                        "Reservation for unknown workshop ignored"
                    );
                    return;
                };
                let token = ReservationToken::from_revision(recorded.revision);
                entry.reservations.push(Reservation {
                    token: token.clone(),
                    revision: recorded.revision,
                    email: email.clone(),
                    fullname: fullname.clone(),
                    seats: *seats,
                    author: *author,
                    is_email_confirmed,
                });
                self.tokens.insert(token.clone(), workshop_id.clone());
                self.by_email.entry(email.clone()).or_default().push(token);
            }
            WorkshopEvent::ReservationCancelled { email, workshop_id, .. } => {
                self.cancel(email, workshop_id);
            }
            WorkshopEvent::EmailConfirmedByUser { email } => self.confirm(email),
            WorkshopEvent::BootstrapDone => {
                tracing::debug!(workshops = self.workshops.len(), "Projection caught up");
            }
        }
    }

    /// Number of active reservations across all workshops.
    #[must_use]
    pub fn reservation_count(&self) -> usize {
        self.tokens.len()
    }

    fn entry(&self, id: &WorkshopId) -> Option<&WorkshopEntry> {
        self.positions.get(id).and_then(|&i| self.workshops.get(i))
    }

    fn entry_mut(&mut self, id: &WorkshopId) -> Option<&mut WorkshopEntry> {
        self.positions.get(id).and_then(|&i| self.workshops.get_mut(i))
    }

    fn add_workshop(&mut self, workshop: &WorkshopData) {
        if self.positions.contains_key(&workshop.id) {
            tracing::warn!(workshop_id = %workshop.id, "Duplicate workshop ignored");
            return;
        }
        self.positions.insert(workshop.id.clone(), self.workshops.len());
        self.workshops.push(WorkshopEntry {
            data: workshop.clone(),
            reservations: Vec::new(),
        });
    }

    fn cancel(&mut self, email: &Email, workshop_id: &WorkshopId) {
        let Some(entry) = self.entry_mut(workshop_id) else {
            return;
        };
        let Some(index) = entry.reservations.iter().position(|r| &r.email == email) else {
            tracing::warn!(email = %email, workshop_id = %workshop_id, "Cancellation without reservation ignored");
            return;
        };
        let removed = entry.reservations.remove(index);

        self.tokens.remove(&removed.token);
        if let Some(tokens) = self.by_email.get_mut(email) {
            tokens.retain(|t| t != &removed.token);
            if tokens.is_empty() {
                self.by_email.remove(email);
            }
        }
    }

    fn confirm(&mut self, email: &Email) {
        self.confirmed_emails.insert(email.clone());
        let tokens = self.by_email.get(email).cloned().unwrap_or_default();
        for token in &tokens {
            let Some(workshop_id) = self.tokens.get(token).cloned() else {
                continue;
            };
            if let Some(entry) = self.entry_mut(&workshop_id) {
                for reservation in entry.reservations.iter_mut().filter(|r| &r.token == token) {
                    reservation.is_email_confirmed = true;
                }
            }
        }
    }
}

/// Read model for workshops and participants.
///
/// Registered with the event store as a subscriber; queried by the aggregate
/// for validation and by the service for display.
pub struct WorkshopListProjection {
    state: RwLock<ProjectionState>,
    settings: SettingsHandle,
    clock: Arc<dyn Clock>,
}

impl WorkshopListProjection {
    /// Creates an empty projection.
    #[must_use]
    pub fn new(settings: SettingsHandle, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(ProjectionState::default()),
            settings,
            clock,
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, ProjectionState> {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// All workshops in creation order, with status derived now.
    #[must_use]
    pub fn workshops(&self) -> Vec<Workshop> {
        let settings = self.settings.current();
        let now = self.clock.now();
        self.read()
            .workshops
            .iter()
            .map(|entry| entry.view(&settings, now))
            .collect()
    }

    /// One workshop by id.
    #[must_use]
    pub fn workshop(&self, id: &WorkshopId) -> Option<Workshop> {
        let settings = self.settings.current();
        self.read()
            .entry(id)
            .map(|entry| entry.view(&settings, self.clock.now()))
    }

    /// Whether a workshop with this id exists.
    #[must_use]
    pub fn contains_workshop(&self, id: &WorkshopId) -> bool {
        self.read().positions.contains_key(id)
    }

    /// Whether `email` holds an active reservation on `workshop_id`.
    #[must_use]
    pub fn has_active_reservation(&self, email: &Email, workshop_id: &WorkshopId) -> bool {
        self.read()
            .entry(workshop_id)
            .is_some_and(|entry| entry.reservations.iter().any(|r| &r.email == email))
    }

    /// The participant behind a reservation token.
    #[must_use]
    pub fn find_by_reservation_token(&self, token: &ReservationToken) -> Option<Participant> {
        let settings = self.settings.current();
        let state = self.read();
        let workshop_id = state.tokens.get(token)?;
        state
            .entry(workshop_id)?
            .view(&settings, self.clock.now())
            .participants
            .into_iter()
            .find(|p| &p.reservation_token == token)
    }

    /// Every active reservation of `email`, in arrival order.
    #[must_use]
    pub fn find_all_reservations(&self, email: &Email) -> Vec<Participant> {
        let settings = self.settings.current();
        let now = self.clock.now();
        let state = self.read();
        let Some(tokens) = state.by_email.get(email) else {
            return Vec::new();
        };

        let mut views: HashMap<&WorkshopId, Workshop> = HashMap::new();
        let mut found = Vec::with_capacity(tokens.len());
        for token in tokens {
            let Some(workshop_id) = state.tokens.get(token) else {
                continue;
            };
            if !views.contains_key(workshop_id) {
                let Some(entry) = state.entry(workshop_id) else {
                    continue;
                };
                views.insert(workshop_id, entry.view(&settings, now));
            }
            if let Some(participant) = views
                .get(workshop_id)
                .and_then(|w| w.participants.iter().find(|p| &p.reservation_token == token))
            {
                found.push(participant.clone());
            }
        }
        found
    }

    /// Whether `email` has been confirmed by its owner.
    #[must_use]
    pub fn is_email_confirmed(&self, email: &Email) -> bool {
        self.read().confirmed_emails.contains(email)
    }

    /// Copy of the folded state.
    #[must_use]
    pub fn snapshot(&self) -> ProjectionState {
        self.read().clone()
    }
}

impl EventSubscriber<WorkshopEvent> for WorkshopListProjection {
    fn name(&self) -> &'static str {
        "workshop_list_projection"
    }

    fn on_event(&self, event: &RecordedEvent<WorkshopEvent>) {
        tracing::debug!(
            revision = %event.revision,
            event_type = event.payload.event_type(),
            workshop_id = ?event.payload.workshop_id(),
            "Projection folding event"
        );
        self.state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .apply(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moosehead_testing::{ManualClock, test_clock, test_time};

    fn recorded(revision: u64, payload: WorkshopEvent) -> RecordedEvent<WorkshopEvent> {
        RecordedEvent::new(Revision::new(revision), test_time(), payload)
    }

    fn added(id: &str, seats: u32) -> WorkshopEvent {
        WorkshopEvent::WorkshopAdded {
            workshop: WorkshopData::new(id, id.to_uppercase(), "", seats),
            author: AuthorKind::Admin,
        }
    }

    fn reserved(email: &str, workshop: &str, seats: u32) -> WorkshopEvent {
        WorkshopEvent::ReservationAdded {
            email: Email::from(email),
            fullname: email.to_string(),
            workshop_id: WorkshopId::from(workshop),
            author: AuthorKind::User,
            seats,
        }
    }

    fn confirmed(email: &str) -> WorkshopEvent {
        WorkshopEvent::EmailConfirmedByUser {
            email: Email::from(email),
        }
    }

    fn projection_with(events: Vec<WorkshopEvent>) -> WorkshopListProjection {
        let projection = WorkshopListProjection::new(SettingsHandle::default(), Arc::new(test_clock()));
        for (i, event) in events.into_iter().enumerate() {
            projection.on_event(&recorded(i as u64 + 1, event));
        }
        projection
    }

    fn settings() -> WorkshopSettings {
        WorkshopSettings::default()
    }

    #[test]
    fn reservation_starts_unconfirmed_with_revision_token() {
        let projection = projection_with(vec![added("w1", 10), reserved("a@x", "w1", 1)]);

        let participant = projection
            .find_by_reservation_token(&ReservationToken::from("2"))
            .map(|p| (p.email.clone(), p.is_email_confirmed, p.status()));
        assert_eq!(
            participant,
            Some((Email::from("a@x"), false, ReservationStatus::NotConfirmed))
        );
        assert!(!projection.is_email_confirmed(&Email::from("a@x")));
    }

    #[test]
    fn confirmation_flips_every_pending_reservation_of_the_email() {
        let projection = projection_with(vec![
            added("w1", 10),
            added("w2", 10),
            reserved("a@x", "w1", 1),
            reserved("a@x", "w2", 2),
            reserved("b@x", "w1", 1),
            confirmed("a@x"),
        ]);

        let mine = projection.find_all_reservations(&Email::from("a@x"));
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|p| p.is_email_confirmed));
        assert_eq!(mine[0].workshop_id, WorkshopId::from("w1"));
        assert_eq!(mine[1].workshop_id, WorkshopId::from("w2"));

        let other = projection.find_by_reservation_token(&ReservationToken::from("5"));
        assert_eq!(other.map(|p| p.is_email_confirmed), Some(false));
    }

    #[test]
    fn later_reservations_of_a_confirmed_email_start_confirmed() {
        let projection = projection_with(vec![
            added("w1", 10),
            added("w2", 10),
            reserved("a@x", "w1", 1),
            confirmed("a@x"),
            reserved("a@x", "w2", 1),
        ]);

        let participant = projection.find_by_reservation_token(&ReservationToken::from("5"));
        assert_eq!(participant.map(|p| p.is_email_confirmed), Some(true));
    }

    #[test]
    fn admin_reservations_count_as_confirmed() {
        let projection = projection_with(vec![
            added("w1", 10),
            WorkshopEvent::ReservationAdded {
                email: Email::from("a@x"),
                fullname: "A".to_string(),
                workshop_id: WorkshopId::from("w1"),
                author: AuthorKind::Admin,
                seats: 3,
            },
        ]);

        let workshop = projection.workshop(&WorkshopId::from("w1"));
        assert_eq!(workshop.map(|w| w.confirmed_seats()), Some(3));
        assert!(!projection.is_email_confirmed(&Email::from("a@x")));
    }

    #[test]
    fn cancellation_removes_participant_and_indices() {
        let projection = projection_with(vec![
            added("w1", 10),
            reserved("a@x", "w1", 1),
            WorkshopEvent::ReservationCancelled {
                email: Email::from("a@x"),
                workshop_id: WorkshopId::from("w1"),
                author: AuthorKind::User,
            },
        ]);

        assert!(projection.find_by_reservation_token(&ReservationToken::from("2")).is_none());
        assert!(projection.find_all_reservations(&Email::from("a@x")).is_empty());
        assert!(!projection.has_active_reservation(&Email::from("a@x"), &WorkshopId::from("w1")));
        assert_eq!(projection.snapshot().reservation_count(), 0);
    }

    #[test]
    fn waiting_list_numbers_follow_confirmed_arrival_order() {
        let projection = projection_with(vec![
            added("w1", 2),
            reserved("a@x", "w1", 1),
            reserved("b@x", "w1", 1),
            reserved("c@x", "w1", 1),
            reserved("d@x", "w1", 1),
            confirmed("a@x"),
            confirmed("b@x"),
            confirmed("c@x"),
        ]);

        let numbers: Vec<(String, i64, ReservationStatus)> = projection
            .workshop(&WorkshopId::from("w1"))
            .map(|w| w.participants)
            .unwrap_or_default()
            .into_iter()
            .map(|p| (p.email.to_string(), p.waiting_list_number, p.status()))
            .collect();

        assert_eq!(
            numbers,
            vec![
                ("a@x".to_string(), -1, ReservationStatus::HasSpace),
                ("b@x".to_string(), 0, ReservationStatus::HasSpace),
                ("c@x".to_string(), 1, ReservationStatus::WaitingList),
                ("d@x".to_string(), 0, ReservationStatus::NotConfirmed),
            ]
        );
    }

    #[test]
    fn reservation_for_unknown_workshop_is_ignored() {
        let projection = projection_with(vec![reserved("a@x", "nope", 1)]);
        assert_eq!(projection.snapshot(), ProjectionState::default());
    }

    #[test]
    fn workshops_keep_creation_order() {
        let projection = projection_with(vec![added("b", 1), added("a", 1), added("c", 1)]);
        let ids: Vec<String> = projection
            .workshops()
            .into_iter()
            .map(|w| w.data.id.to_string())
            .collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert!(projection.workshop(&WorkshopId::from("zzz")).is_none());
    }

    #[test]
    fn status_by_seats_left() {
        let data = WorkshopData::new("w1", "W", "", 10);
        let now = test_time();
        let s = settings();

        assert_eq!(derive_status(&data, 0, &s, now), WorkshopStatus::FreeSpots);
        assert_eq!(derive_status(&data, 5, &s, now), WorkshopStatus::FreeSpots);
        assert_eq!(derive_status(&data, 6, &s, now), WorkshopStatus::FewSpots);
        assert_eq!(derive_status(&data, 9, &s, now), WorkshopStatus::FewSpots);
        assert_eq!(derive_status(&data, 10, &s, now), WorkshopStatus::Full);
        assert_eq!(derive_status(&data, 19, &s, now), WorkshopStatus::Full);
        assert_eq!(derive_status(&data, 20, &s, now), WorkshopStatus::VeryFull);
    }

    #[test]
    fn closed_beats_free_seats() {
        let data = WorkshopData::new("w1", "W", "", 10);
        let mut s = settings();
        s.closed_workshops.insert(WorkshopId::from("w1"));
        assert_eq!(derive_status(&data, 0, &s, test_time()), WorkshopStatus::Closed);

        let started = WorkshopData::new("w2", "W", "", 10)
            .scheduled(test_time() - chrono::Duration::hours(1), test_time());
        assert_eq!(derive_status(&started, 0, &settings(), test_time()), WorkshopStatus::Closed);
    }

    #[test]
    fn not_opened_beats_full() {
        let data = WorkshopData::new("w1", "W", "", 1);
        let mut s = settings();
        s.open_time = test_time() + chrono::Duration::days(1);
        assert_eq!(derive_status(&data, 5, &s, test_time()), WorkshopStatus::NotOpened);
    }

    #[test]
    fn status_reads_live_settings() {
        let handle = SettingsHandle::default();
        let projection = WorkshopListProjection::new(handle.clone(), Arc::new(test_clock()));
        projection.on_event(&recorded(1, added("w1", 10)));
        assert_eq!(
            projection.workshop(&WorkshopId::from("w1")).map(|w| w.status),
            Some(WorkshopStatus::FreeSpots)
        );

        handle.update(|s| {
            s.closed_workshops.insert(WorkshopId::from("w1"));
        });
        assert_eq!(
            projection.workshop(&WorkshopId::from("w1")).map(|w| w.status),
            Some(WorkshopStatus::Closed)
        );
    }

    #[test]
    fn workshop_closes_once_it_starts() {
        let clock = Arc::new(ManualClock::new(test_time()));
        let projection = WorkshopListProjection::new(SettingsHandle::default(), clock.clone());
        let data = WorkshopData::new("w1", "W", "", 10)
            .scheduled(test_time() + chrono::Duration::hours(1), test_time() + chrono::Duration::hours(3));
        projection.on_event(&recorded(
            1,
            WorkshopEvent::WorkshopAdded {
                workshop: data,
                author: AuthorKind::Admin,
            },
        ));
        let status = || projection.workshop(&WorkshopId::from("w1")).map(|w| w.status);

        assert_eq!(status(), Some(WorkshopStatus::FreeSpots));
        clock.advance(chrono::Duration::hours(2));
        assert_eq!(status(), Some(WorkshopStatus::Closed));
    }
}
