//! Revision numbers for the ordered event log.
//!
//! Every event appended to the store receives the next [`Revision`]. Revisions
//! start at 1 and are gapless, which lets replay detect a truncated or
//! reordered log and lets read models derive stable identifiers (such as
//! reservation tokens) from the revision of the event that created them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Position of an event in the global log.
///
/// `Revision::INITIAL` (0) is the position *before* the first event; the first
/// appended event is recorded at revision 1.
///
/// # Examples
///
/// ```
/// use moosehead_core::revision::Revision;
///
/// let head = Revision::INITIAL;
/// let first = head.next();
/// assert_eq!(first, Revision::new(1));
/// assert!(head.is_initial());
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Revision(u64);

impl Revision {
    /// The position of an empty log.
    pub const INITIAL: Self = Self(0);

    /// Create a new `Revision` with the given value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the revision number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Get the next revision (current + 1).
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Check if this is the position of an empty log.
    #[must_use]
    pub const fn is_initial(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Revision {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Self)
    }
}

impl From<u64> for Revision {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Revision> for u64 {
    fn from(revision: Revision) -> Self {
        revision.0
    }
}
