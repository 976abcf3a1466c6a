//! Interval: a single detected time window on the timeline.
//!
//! Identity and value are deliberately separate:
//! - `id` is an opaque, monotonically assigned handle. Lookups, removal and
//!   membership checks go through it.
//! - `==` and `Hash` compare `(start_time, end_time, confidence_score)` only,
//!   so two intervals that differ just by label/owner/id compare equal.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

static NEXT_INTERVAL_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque interval handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IntervalId(u64);

impl IntervalId {
    /// Allocate the next id. Never reused within a process.
    pub fn next() -> Self {
        Self(NEXT_INTERVAL_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for IntervalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Back-reference from an interval to whatever owns it.
///
/// Never owning: resolve through [`Project::resolve_owner`](super::Project::resolve_owner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnerRef {
    /// Interval lives in `QueryGroup::relevant_windows` of this group.
    Group(Uuid),
    /// Interval is the lane view of a step in the per-video step list.
    Steps,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interval {
    #[serde(skip, default = "IntervalId::next")]
    pub id: IntervalId,
    pub start_time: f64,
    pub end_time: f64,
    pub confidence_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip)]
    pub owner: Option<OwnerRef>,
}

impl Interval {
    pub fn new(start_time: f64, end_time: f64, confidence_score: f64) -> Self {
        Self {
            id: IntervalId::next(),
            start_time,
            end_time,
            confidence_score,
            label: None,
            owner: None,
        }
    }

    pub fn with_owner(mut self, owner: OwnerRef) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.start_time, self.end_time)
    }

    pub fn set_bounds(&mut self, start_time: f64, end_time: f64) {
        self.start_time = start_time;
        self.end_time = end_time;
    }

    /// Closed-range hit test used for pointer picking.
    pub fn contains(&self, time: f64) -> bool {
        self.start_time <= time && time <= self.end_time
    }

    /// Half-open intersection with `[start, end)`. Touching ranges do not overlap.
    pub fn overlaps_range(&self, start: f64, end: f64) -> bool {
        !(end <= self.start_time || start >= self.end_time)
    }

    pub fn overlaps_with(&self, other: &Interval) -> bool {
        self.overlaps_range(other.start_time, other.end_time)
    }

    /// `0 <= start < end <= duration`.
    pub fn is_within(&self, duration: f64) -> bool {
        0.0 <= self.start_time && self.start_time < self.end_time && self.end_time <= duration
    }

    /// Legacy fixed-precision key (`start_end_score`). Diagnostics only: distinct
    /// intervals with the same rounded values share a key.
    pub fn display_key(&self) -> String {
        format!(
            "{:.3}_{:.3}_{:.6}",
            self.start_time, self.end_time, self.confidence_score
        )
    }
}

impl PartialEq for Interval {
    fn eq(&self, other: &Self) -> bool {
        self.start_time == other.start_time
            && self.end_time == other.end_time
            && self.confidence_score == other.confidence_score
    }
}

// Loader rejects non-finite values, so the relation is reflexive in practice.
impl Eq for Interval {}

impl Hash for Interval {
    fn hash<H: Hasher>(&self, state: &mut H) {
        canonical_bits(self.start_time).hash(state);
        canonical_bits(self.end_time).hash(state);
        canonical_bits(self.confidence_score).hash(state);
    }
}

/// `-0.0 == 0.0` must hash identically.
fn canonical_bits(v: f64) -> u64 {
    if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_monotonic() {
        let a = IntervalId::next();
        let b = IntervalId::next();
        assert!(b > a);
    }

    #[test]
    fn test_equality_ignores_label_owner_and_id() {
        let a = Interval::new(1.0, 2.0, 0.5).with_label("wash");
        let b = Interval::new(1.0, 2.0, 0.5).with_owner(OwnerRef::Steps);
        assert_ne!(a.id, b.id);
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(!set.insert(b), "value-equal intervals hash the same");
    }

    #[test]
    fn test_negative_zero_hashes_like_zero() {
        let a = Interval::new(0.0, 1.0, 0.5);
        let b = Interval::new(-0.0, 1.0, 0.5);
        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_display_key_collides_for_rounded_values() {
        let a = Interval::new(1.0001, 2.0, 0.5);
        let b = Interval::new(1.0002, 2.0, 0.5);
        assert_eq!(a.display_key(), b.display_key());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_half_open_overlap() {
        let a = Interval::new(2.0, 5.0, 1.0);
        assert!(!a.overlaps_range(5.0, 6.0));
        assert!(!a.overlaps_range(0.0, 2.0));
        assert!(a.overlaps_range(4.9, 6.0));
        assert!(a.overlaps_range(3.0, 4.0));
    }

    #[test]
    fn test_contains_is_closed() {
        let a = Interval::new(2.0, 5.0, 1.0);
        assert!(a.contains(2.0));
        assert!(a.contains(5.0));
        assert!(!a.contains(5.01));
    }
}
