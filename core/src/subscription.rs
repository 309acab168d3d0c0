//! Subscriber abstraction for synchronous event fan-out.
//!
//! Read models and process managers register with the
//! [`EventStore`](crate::event_store::EventStore) as [`EventSubscriber`]s. The
//! store calls every subscriber, in registration order, for each event it
//! replays or appends:
//!
//! ```text
//!            ┌──────────────┐
//! command ──▶│  Aggregate   │── event ──┐
//!            └──────────────┘           ▼
//!                               ┌───────────────┐
//!                               │  Event Store  │◄── source of truth
//!                               └───────┬───────┘
//!                                       │ on_event (in order, synchronous)
//!                              ┌────────┴────────┐
//!                              ▼                 ▼
//!                        ┌───────────┐     ┌───────────┐
//!                        │Projection │     │   Saga    │
//!                        └───────────┘     └───────────┘
//! ```
//!
//! # Key Principles
//!
//! - **Persist first**: a subscriber only sees events the log accepted
//! - **Exactly once, in order**: no redelivery, no reordering
//! - **Total**: `on_event` cannot fail; a fold that cannot apply an event
//!   ignores it (and may log)
//! - **Replay aware**: the bootstrap sentinel separates history from live events

use crate::event::RecordedEvent;

/// A consumer of the ordered event stream.
///
/// Subscribers are shared (`Arc`) between the store and query code, so
/// `on_event` takes `&self` and implementations keep their state behind a lock.
/// An implementation should hold its write guard for the whole fold of one
/// event so readers never observe a partially applied event.
pub trait EventSubscriber<E>: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Fold one event.
    ///
    /// Called for every replayed event, then once with the bootstrap sentinel,
    /// then for every live event.
    fn on_event(&self, event: &RecordedEvent<E>);
}
