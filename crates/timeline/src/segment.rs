//! Segment type: a time interval tagged to a performer.

use serde::{Deserialize, Serialize};

use crate::performer::Performer;

/// A labeled `[start, end]` interval (seconds) owned by a performer.
///
/// `id` is the performer's identifier, so several segments share it.
/// `start <= end` is the nominal shape but is not enforced: a mark-out
/// placed before the in-point leaves an inverted interval that never
/// matches any play-head position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Owning performer id.
    pub id: String,

    /// Display name of the performer.
    pub label: String,

    /// In-point (seconds).
    pub start: f64,

    /// Out-point (seconds).
    pub end: f64,

    /// Display color, e.g. `#ef4444`.
    pub color: String,
}

impl Segment {
    /// Create a segment for a performer.
    pub fn for_performer(performer: &Performer, start: f64, end: f64) -> Self {
        Self {
            id: performer.id.clone(),
            label: performer.name.clone(),
            start,
            end,
            color: performer.color.clone(),
        }
    }

    /// Whether `t` falls inside `[start, end]`, both ends inclusive.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t <= self.end
    }

    /// Signed length in seconds (negative when inverted).
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }

    /// Whether two segments share any instant.
    pub fn overlaps(&self, other: &Segment) -> bool {
        !self.is_inverted()
            && !other.is_inverted()
            && self.start <= other.end
            && other.start <= self.end
    }
}
