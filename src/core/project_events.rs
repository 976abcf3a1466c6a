//! Model change notifications.
//!
//! Emitted by commands after every apply/revert so views can resync from the
//! now-authoritative `Project`.

use uuid::Uuid;

use crate::entities::IntervalId;

/// What part of the model changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelChange {
    /// Bounds of one interval (action or step lane).
    IntervalBounds(IntervalId),
    /// Interval added to / removed from a group.
    GroupIntervals(Uuid),
    QueryText(Uuid),
    /// Step list structure or content.
    Steps,
    /// Whole project replaced (load, new video).
    Project,
}

#[derive(Clone, Debug)]
pub struct ModelChangedEvent(pub ModelChange);

/// Undo stack moved (push/undo/redo/clear). Carries the new labels.
#[derive(Clone, Debug)]
pub struct UndoStackChangedEvent {
    pub undo_text: Option<String>,
    pub redo_text: Option<String>,
    pub clean: bool,
}

/// Playhead request from a timeline (click on empty space, live drag).
#[derive(Clone, Debug)]
pub struct SeekRequestEvent(pub f64);
