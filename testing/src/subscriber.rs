//! Subscriber that records every delivery.

use moosehead_core::event::{Event, RecordedEvent};
use moosehead_core::subscription::EventSubscriber;
use std::sync::Mutex;

/// Captures the delivered stream, sentinel included, for assertions.
#[derive(Debug)]
pub struct RecordingSubscriber<E> {
    name: &'static str,
    received: Mutex<Vec<RecordedEvent<E>>>,
}

impl<E: Clone> RecordingSubscriber<E> {
    /// Create an empty recorder.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            received: Mutex::new(Vec::new()),
        }
    }

    /// Everything delivered so far, in delivery order.
    #[must_use]
    pub fn received(&self) -> Vec<RecordedEvent<E>> {
        self.received
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Number of deliveries so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.received
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been delivered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> EventSubscriber<E> for RecordingSubscriber<E>
where
    E: Event + Clone,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn on_event(&self, event: &RecordedEvent<E>) {
        self.received
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(event.clone());
    }
}
