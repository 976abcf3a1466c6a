//! Timeline widget - one lane of interval bars over the video time axis.
//!
//! Rendering-free: pointer events go in, decisions and `TimelineEvent`s come
//! out, and a `TimelineSnapshot` describes what to draw.

mod interaction;
mod snapshot;
mod timeline;
mod timeline_events;
mod timeline_helpers;

pub use interaction::TimelineView;
pub use snapshot::TimelineSnapshot;
pub use timeline::{CursorHint, DragState, Pos, TimelineConfig, TimelineState};
pub use timeline_events::{
    CoordinatedEvent, HighlightIntervalEvent, OwnerInfo, TimelineEvent, TimelineSnapChangedEvent,
    TimelineTimeScaleChangedEvent,
};
pub use timeline_helpers::{
    detect_drag_mode, find_snap, move_bounds, nearest_tick, tick_spacing, tick_times, time_to_x, x_to_time, DragMode,
    MAX_TICKS,
};
