//! Configuration for the reservation engine.
//!
//! [`Config::from_env`] reads environment variables with sensible defaults.
//! The workshop-related part, [`WorkshopSettings`], is shared with the
//! projection and the saga through a [`SettingsHandle`] so it can be swapped
//! at runtime; every status query reads the current snapshot.

use crate::types::{WorkshopData, WorkshopId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::sync::{Arc, RwLock};

/// Settings consulted when deriving workshop status and seat capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkshopSettings {
    /// Registration opens at this instant.
    pub open_time: DateTime<Utc>,
    /// Workshops closed by an administrator.
    pub closed_workshops: BTreeSet<WorkshopId>,
    /// Capacity overrides, taking precedence over `number_of_seats`.
    pub capacities: BTreeMap<WorkshopId, u32>,
    /// Waiting-list length at which a workshop counts as very full.
    pub very_full_threshold: u32,
    /// Capacity used for a workshop whose description is unknown.
    pub places_per_workshop: u32,
}

impl Default for WorkshopSettings {
    fn default() -> Self {
        Self {
            open_time: DateTime::<Utc>::MIN_UTC,
            closed_workshops: BTreeSet::new(),
            capacities: BTreeMap::new(),
            very_full_threshold: 10,
            places_per_workshop: 30,
        }
    }
}

impl WorkshopSettings {
    /// Whether the workshop has been closed administratively.
    #[must_use]
    pub fn is_closed(&self, id: &WorkshopId) -> bool {
        self.closed_workshops.contains(id)
    }

    /// Configured capacity override for a workshop.
    #[must_use]
    pub fn capacity_override(&self, id: &WorkshopId) -> Option<u32> {
        self.capacities.get(id).copied()
    }

    /// Effective capacity of a workshop.
    #[must_use]
    pub fn capacity_of(&self, workshop: &WorkshopData) -> u32 {
        self.capacity_override(&workshop.id)
            .unwrap_or(workshop.number_of_seats)
    }

    /// Whether registration is open at `now`.
    #[must_use]
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.open_time <= now
    }
}

/// Shared, replaceable view of the current [`WorkshopSettings`].
///
/// Clones share the same settings.
#[derive(Debug, Clone, Default)]
pub struct SettingsHandle {
    current: Arc<RwLock<Arc<WorkshopSettings>>>,
}

impl SettingsHandle {
    /// Wraps an initial snapshot.
    #[must_use]
    pub fn new(settings: WorkshopSettings) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(settings))),
        }
    }

    /// The settings in effect right now.
    #[must_use]
    pub fn current(&self) -> Arc<WorkshopSettings> {
        Arc::clone(
            &self
                .current
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        )
    }

    /// Replaces the settings. Takes effect on the next query.
    pub fn replace(&self, settings: WorkshopSettings) {
        *self
            .current
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Arc::new(settings);
        tracing::info!("Workshop settings replaced");
    }

    /// Applies `change` to a copy of the current settings and installs it.
    pub fn update(&self, change: impl FnOnce(&mut WorkshopSettings)) {
        let mut next = (*self.current()).clone();
        change(&mut next);
        self.replace(next);
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Workshop settings.
    pub workshops: WorkshopSettings,
    /// Log filter used when `RUST_LOG` is unset or invalid.
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Format | Default |
    /// |----------|--------|---------|
    /// | `MOOSEHEAD_OPEN_TIME` | RFC 3339 | always open |
    /// | `MOOSEHEAD_CLOSED_WORKSHOPS` | `id,id,...` | none |
    /// | `MOOSEHEAD_WORKSHOP_CAPACITIES` | `id:n,id:n,...` | none |
    /// | `MOOSEHEAD_VERY_FULL_NUMBER` | integer | 10 |
    /// | `MOOSEHEAD_PLACES_PER_WORKSHOP` | integer | 30 |
    /// | `RUST_LOG` | filter directive | `info` |
    ///
    /// Malformed values fall back to the default; malformed list entries are
    /// skipped.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = WorkshopSettings::default();
        Self {
            workshops: WorkshopSettings {
                open_time: lookup("MOOSEHEAD_OPEN_TIME")
                    .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
                    .map_or(defaults.open_time, |t| t.with_timezone(&Utc)),
                closed_workshops: lookup("MOOSEHEAD_CLOSED_WORKSHOPS")
                    .map(|s| parse_id_list(&s))
                    .unwrap_or_default(),
                capacities: lookup("MOOSEHEAD_WORKSHOP_CAPACITIES")
                    .map(|s| parse_capacities(&s))
                    .unwrap_or_default(),
                very_full_threshold: lookup("MOOSEHEAD_VERY_FULL_NUMBER")
                    .and_then(|s| s.trim().parse().ok())
                    .unwrap_or(defaults.very_full_threshold),
                places_per_workshop: lookup("MOOSEHEAD_PLACES_PER_WORKSHOP")
                    .and_then(|s| s.trim().parse().ok())
                    .unwrap_or(defaults.places_per_workshop),
            },
            log_level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        }
    }

    /// The workshop settings snapshot.
    #[must_use]
    pub fn settings(&self) -> WorkshopSettings {
        self.workshops.clone()
    }
}

fn parse_id_list(raw: &str) -> BTreeSet<WorkshopId> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(WorkshopId::from)
        .collect()
}

fn parse_capacities(raw: &str) -> BTreeMap<WorkshopId, u32> {
    raw.split(',')
        .filter_map(|entry| {
            let (id, seats) = entry.split_once(':')?;
            let id = id.trim();
            if id.is_empty() {
                return None;
            }
            Some((WorkshopId::from(id), seats.trim().parse().ok()?))
        })
        .collect()
}
