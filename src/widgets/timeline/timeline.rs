//! Timeline widget - state and configuration.
//!
//! `TimelineConfig` holds interaction thresholds shared by every lane;
//! `TimelineState` is the per-view state that persists between pointer
//! events (playhead, threshold, highlight, hover, cursor and the drag state).
//! Renderers read both through a `TimelineSnapshot`.

use serde::{Deserialize, Serialize};

use super::timeline_helpers::DragMode;
use crate::entities::IntervalId;

/// Interaction thresholds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Pointer within this many px of an edge grabs the edge.
    pub edge_threshold_px: f64,
    /// Pointer travel (Euclidean px) that turns a press into a drag.
    pub drag_start_px: f64,
    /// Shortest interval a resize or creation may produce, seconds.
    pub min_duration: f64,
    /// Boundaries within this many seconds of a snap target jump to it.
    pub snap_threshold: f64,
    pub snap_enabled: bool,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            edge_threshold_px: 10.0,
            drag_start_px: 5.0,
            min_duration: 0.1,
            snap_threshold: 0.2,
            snap_enabled: true,
        }
    }
}

/// Pointer position in widget pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pos {
    pub x: f64,
    pub y: f64,
}

impl Pos {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Pos) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Cursor the renderer should show.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CursorHint {
    #[default]
    Arrow,
    ResizeHorizontal,
    Grab,
    Grabbing,
    Crosshair,
    Forbidden,
}

/// Gesture in progress on one view.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    /// Pressed on an interval, not yet past the drag-start distance.
    Pending {
        mode: DragMode,
        interval: IntervalId,
        press: Pos,
        original: (f64, f64),
    },
    /// Dragging: the interval's live bounds follow the pointer.
    Active {
        mode: DragMode,
        interval: IntervalId,
        press: Pos,
        original: (f64, f64),
    },
    /// Pressed on empty space; previewing a new interval.
    Creating {
        start_time: f64,
        press: Pos,
        preview_end: Option<f64>,
    },
}

impl DragState {
    pub fn is_idle(&self) -> bool {
        matches!(self, DragState::Idle)
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self, DragState::Active { .. })
    }

    /// Interval targeted by a pending or active drag.
    pub fn target(&self) -> Option<IntervalId> {
        match self {
            DragState::Pending { interval, .. } | DragState::Active { interval, .. } => Some(*interval),
            _ => None,
        }
    }
}

/// Per-view state (persistent between pointer events).
#[derive(Clone, Debug)]
pub struct TimelineState {
    /// Playhead, seconds.
    pub current_position: f64,
    /// Intervals below this score are hidden and cannot be picked.
    pub confidence_threshold: f64,
    pub highlighted: Option<IntervalId>,
    pub hovered: Option<IntervalId>,
    /// Time-scale ticks are drawn and used as snap targets.
    pub time_scale_enabled: bool,
    pub cursor: CursorHint,
    /// Last drag step was rejected.
    pub forbidden: bool,
    pub drag_state: DragState,
}

impl Default for TimelineState {
    fn default() -> Self {
        Self {
            current_position: 0.0,
            confidence_threshold: 0.0,
            highlighted: None,
            hovered: None,
            time_scale_enabled: false,
            cursor: CursorHint::Arrow,
            forbidden: false,
            drag_state: DragState::Idle,
        }
    }
}

impl TimelineState {
    /// Drop any gesture and its transient signals.
    pub fn reset_gesture(&mut self) {
        self.drag_state = DragState::Idle;
        self.forbidden = false;
        self.cursor = CursorHint::Arrow;
    }
}
