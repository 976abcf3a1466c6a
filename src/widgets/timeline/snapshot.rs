//! Read-only frame of what a renderer needs to draw one lane.

use super::interaction::TimelineView;
use super::timeline::{CursorHint, DragState};
use super::timeline_helpers::{tick_times, time_to_x};
use crate::entities::{Interval, IntervalId, LaneKind, Project};

#[derive(Clone, Debug, PartialEq)]
pub struct TimelineSnapshot {
    pub lane: LaneKind,
    pub duration: f64,
    pub current_position: f64,
    pub confidence_threshold: f64,
    /// Visible intervals in render order.
    pub intervals: Vec<Interval>,
    /// Bounds of the interval being created, ordered.
    pub creation_preview: Option<(f64, f64)>,
    /// Interval under an active drag.
    pub dragging: Option<IntervalId>,
    pub highlighted: Option<IntervalId>,
    pub hovered: Option<IntervalId>,
    pub cursor: CursorHint,
    pub forbidden: bool,
    /// Empty unless the time scale is enabled.
    pub ticks: Vec<f64>,
}

impl TimelineSnapshot {
    pub fn capture(view: &TimelineView, project: &Project) -> Self {
        let state = &view.state;
        let duration = project.duration();

        let creation_preview = match state.drag_state {
            DragState::Creating {
                start_time,
                preview_end: Some(end),
                ..
            } => Some((start_time.min(end), start_time.max(end))),
            _ => None,
        };
        let dragging = match state.drag_state {
            DragState::Active { interval, .. } => Some(interval),
            _ => None,
        };

        Self {
            lane: view.lane,
            duration,
            current_position: state.current_position,
            confidence_threshold: state.confidence_threshold,
            intervals: view.visible_intervals(project),
            creation_preview,
            dragging,
            highlighted: state.highlighted,
            hovered: state.hovered,
            cursor: state.cursor,
            forbidden: state.forbidden,
            ticks: if state.time_scale_enabled {
                tick_times(duration)
            } else {
                Vec::new()
            },
        }
    }

    /// Pixel span of a visible interval at `width`.
    pub fn span_px(&self, id: IntervalId, width: f64) -> Option<(f64, f64)> {
        self.intervals.iter().find(|i| i.id == id).map(|i| {
            (
                time_to_x(i.start_time, width, self.duration),
                time_to_x(i.end_time, width, self.duration),
            )
        })
    }

    pub fn playhead_px(&self, width: f64) -> f64 {
        time_to_x(self.current_position, width, self.duration)
    }
}
