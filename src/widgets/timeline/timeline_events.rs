//! Timeline widget events.
//!
//! `TimelineEvent` is what one view hands to its dispatcher. The coordinator
//! tags it with the view id and resolved owner and re-emits the result on the
//! bus as `CoordinatedEvent`.

use crate::entities::{Interval, IntervalId, LaneKind};

#[derive(Clone, Debug, PartialEq)]
pub enum TimelineEvent {
    /// Press landed on a visible interval.
    IntervalClicked { interval: Interval },
    /// Pending press travelled past the drag-start distance.
    IntervalDragStarted { interval: Interval },
    /// Live bounds accepted for this move.
    IntervalDragMoved { interval: IntervalId, start: f64, end: f64 },
    /// Gesture released. `original` holds the bounds captured at press time.
    IntervalDragFinished {
        interval: IntervalId,
        start: f64,
        end: f64,
        original: (f64, f64),
    },
    /// Empty-space drag released; bounds are ordered.
    IntervalCreated { start: f64, end: f64, lane: LaneKind },
    TimePositionChanged(f64),
}

impl TimelineEvent {
    /// Short type name used by the event history.
    pub fn kind(&self) -> &'static str {
        match self {
            TimelineEvent::IntervalClicked { .. } => "interval_clicked",
            TimelineEvent::IntervalDragStarted { .. } => "drag_started",
            TimelineEvent::IntervalDragMoved { .. } => "drag_moved",
            TimelineEvent::IntervalDragFinished { .. } => "drag_finished",
            TimelineEvent::IntervalCreated { .. } => "interval_created",
            TimelineEvent::TimePositionChanged(_) => "time_position_changed",
        }
    }

    /// Interval the event refers to, if any.
    pub fn interval_id(&self) -> Option<IntervalId> {
        match self {
            TimelineEvent::IntervalClicked { interval } | TimelineEvent::IntervalDragStarted { interval } => {
                Some(interval.id)
            }
            TimelineEvent::IntervalDragMoved { interval, .. }
            | TimelineEvent::IntervalDragFinished { interval, .. } => Some(*interval),
            _ => None,
        }
    }

    /// High-frequency events stay out of the history.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TimelineEvent::IntervalDragMoved { .. } | TimelineEvent::TimePositionChanged(_)
        )
    }
}

/// Who owns the interval an event refers to.
#[derive(Clone, Debug, PartialEq)]
pub enum OwnerInfo {
    Query { group: uuid::Uuid, query_text: String },
    Step { step: IntervalId, text: String, index: usize },
}

/// A view event tagged with its source view and resolved owner.
#[derive(Clone, Debug)]
pub struct CoordinatedEvent {
    pub timeline: String,
    pub event: TimelineEvent,
    pub owner: Option<OwnerInfo>,
}

/// Instruction for `timeline` to highlight `interval`.
#[derive(Clone, Debug, PartialEq)]
pub struct HighlightIntervalEvent {
    pub timeline: String,
    pub interval: IntervalId,
}

#[derive(Clone, Debug)]
pub struct TimelineSnapChangedEvent(pub bool);

#[derive(Clone, Debug)]
pub struct TimelineTimeScaleChangedEvent(pub bool);
