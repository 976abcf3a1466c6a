//! Pointer interaction for one timeline lane.
//!
//! `TimelineView` turns `down`, n x `move`, `up` into click/drag/create
//! decisions. During a drag the live interval in the project is updated in
//! place; the caller commits the final bounds as a command on
//! `IntervalDragFinished`. Nothing here touches the undo stack.

use log::{debug, trace};

use super::timeline::{CursorHint, DragState, Pos, TimelineConfig, TimelineState};
use super::timeline_events::TimelineEvent;
use super::timeline_helpers::{
    detect_drag_mode, find_interval_at, find_snap, move_bounds, overlaps_any, resize_end, resize_start,
    nearest_tick, snap_candidates, time_to_x, x_to_time, DragMode,
};
use crate::entities::{Interval, IntervalId, LaneKind, Project};

/// One timeline row and its interaction state.
#[derive(Clone, Debug)]
pub struct TimelineView {
    pub id: String,
    pub lane: LaneKind,
    pub config: TimelineConfig,
    pub state: TimelineState,
}

impl TimelineView {
    pub fn new(id: impl Into<String>, lane: LaneKind) -> Self {
        Self {
            id: id.into(),
            lane,
            config: TimelineConfig::default(),
            state: TimelineState::default(),
        }
    }

    pub fn with_config(mut self, config: TimelineConfig) -> Self {
        self.config = config;
        self
    }

    // === State setters ===

    pub fn set_position(&mut self, time: f64) {
        self.state.current_position = time;
    }

    pub fn set_confidence_threshold(&mut self, threshold: f64) {
        self.state.confidence_threshold = threshold;
    }

    pub fn set_highlighted(&mut self, interval: Option<IntervalId>) {
        self.state.highlighted = interval;
    }

    pub fn set_time_scale_enabled(&mut self, enabled: bool) {
        self.state.time_scale_enabled = enabled;
    }

    /// Intervals this lane shows at the current threshold, in render order.
    pub fn visible_intervals(&self, project: &Project) -> Vec<Interval> {
        let threshold = self.state.confidence_threshold;
        project
            .lane_intervals(self.lane)
            .into_iter()
            .filter(|i| i.confidence_score >= threshold)
            .collect()
    }

    // === Pointer events ===

    pub fn pointer_down(&mut self, pos: Pos, width: f64, project: &Project, mut dispatch: impl FnMut(TimelineEvent)) {
        let duration = project.duration();
        if duration <= 0.0 || width <= 0.0 {
            return;
        }
        self.state.reset_gesture();

        let time = x_to_time(pos.x, width, duration);
        let intervals = self.visible_intervals(project);
        match find_interval_at(&intervals, time, self.state.confidence_threshold) {
            Some(hit) => {
                let start_x = time_to_x(hit.start_time, width, duration);
                let end_x = time_to_x(hit.end_time, width, duration);
                let mode = detect_drag_mode(pos.x, start_x, end_x, self.config.edge_threshold_px);
                debug!("[{}] press on {} ({:?})", self.id, hit.id, mode);

                self.state.drag_state = DragState::Pending {
                    mode,
                    interval: hit.id,
                    press: pos,
                    original: hit.bounds(),
                };
                self.state.cursor = mode.cursor(false);
                dispatch(TimelineEvent::IntervalClicked { interval: hit.clone() });
            }
            None => {
                let start_time = time.clamp(0.0, duration);
                debug!("[{}] press on empty space at {:.3}s", self.id, start_time);
                self.state.drag_state = DragState::Creating {
                    start_time,
                    press: pos,
                    preview_end: None,
                };
                self.state.cursor = CursorHint::Crosshair;
                self.state.current_position = start_time;
                dispatch(TimelineEvent::TimePositionChanged(start_time));
            }
        }
    }

    pub fn pointer_move(
        &mut self,
        pos: Pos,
        width: f64,
        project: &mut Project,
        mut dispatch: impl FnMut(TimelineEvent),
    ) {
        let duration = project.duration();
        if duration <= 0.0 || width <= 0.0 {
            return;
        }

        match self.state.drag_state.clone() {
            DragState::Idle => self.hover(pos, width, project),
            DragState::Pending {
                mode,
                interval,
                press,
                original,
            } => {
                if pos.distance(press) < self.config.drag_start_px {
                    return;
                }
                let Some(live) = project.interval(interval) else {
                    debug!("[{}] drag target {} vanished", self.id, interval);
                    self.state.reset_gesture();
                    return;
                };
                debug!("[{}] drag started on {} ({:?})", self.id, interval, mode);
                self.state.drag_state = DragState::Active {
                    mode,
                    interval,
                    press,
                    original,
                };
                self.state.cursor = mode.cursor(true);
                dispatch(TimelineEvent::IntervalDragStarted { interval: live });
                self.drag_to(pos, width, project, &mut dispatch);
            }
            DragState::Active { .. } => self.drag_to(pos, width, project, &mut dispatch),
            DragState::Creating { start_time, press, .. } => {
                let time = x_to_time(pos.x, width, duration).clamp(0.0, duration);
                let end = creation_end(start_time, time, self.config.min_duration, duration);
                self.state.drag_state = DragState::Creating {
                    start_time,
                    press,
                    preview_end: Some(end),
                };
                self.state.current_position = time;
                dispatch(TimelineEvent::TimePositionChanged(time));
            }
        }
    }

    pub fn pointer_up(&mut self, pos: Pos, width: f64, project: &Project, mut dispatch: impl FnMut(TimelineEvent)) {
        let duration = project.duration();
        let gesture = std::mem::take(&mut self.state.drag_state);
        self.state.reset_gesture();

        match gesture {
            DragState::Creating { start_time, press, .. } => {
                if duration <= 0.0 || width <= 0.0 || pos.distance(press) < self.config.drag_start_px {
                    return;
                }
                let time = x_to_time(pos.x, width, duration).clamp(0.0, duration);
                let end = creation_end(start_time, time, self.config.min_duration, duration);
                let (start, end) = (start_time.min(end), start_time.max(end));
                debug!("[{}] create {:.3}-{:.3} on {}", self.id, start, end, self.lane);
                dispatch(TimelineEvent::IntervalCreated {
                    start,
                    end,
                    lane: self.lane,
                });
            }
            DragState::Active { interval, original, .. } => match project.interval(interval) {
                Some(live) => {
                    debug!(
                        "[{}] drag finished on {}: {:.3}-{:.3} (was {:.3}-{:.3})",
                        self.id, interval, live.start_time, live.end_time, original.0, original.1
                    );
                    dispatch(TimelineEvent::IntervalDragFinished {
                        interval,
                        start: live.start_time,
                        end: live.end_time,
                        original,
                    });
                }
                None => debug!("[{}] drag target {} vanished before release", self.id, interval),
            },
            DragState::Pending { .. } | DragState::Idle => {}
        }
    }

    /// Abort the current gesture. A live drag is rolled back to its original
    /// bounds. Returns false when there was nothing to abort.
    pub fn cancel(&mut self, project: &mut Project) -> bool {
        let gesture = std::mem::take(&mut self.state.drag_state);
        self.state.reset_gesture();
        match gesture {
            DragState::Idle => false,
            DragState::Active { interval, original, .. } => {
                debug!("[{}] drag on {} cancelled", self.id, interval);
                project.set_interval_bounds(interval, original.0, original.1);
                true
            }
            DragState::Pending { .. } | DragState::Creating { .. } => true,
        }
    }

    /// Idle pointer move: update hover target and cursor.
    pub fn hover(&mut self, pos: Pos, width: f64, project: &Project) {
        let duration = project.duration();
        if duration <= 0.0 || width <= 0.0 {
            self.pointer_leave();
            return;
        }
        let time = x_to_time(pos.x, width, duration);
        let intervals = self.visible_intervals(project);
        match find_interval_at(&intervals, time, self.state.confidence_threshold) {
            Some(hit) => {
                let mode = detect_drag_mode(
                    pos.x,
                    time_to_x(hit.start_time, width, duration),
                    time_to_x(hit.end_time, width, duration),
                    self.config.edge_threshold_px,
                );
                self.state.hovered = Some(hit.id);
                self.state.cursor = mode.cursor(false);
            }
            None => {
                self.state.hovered = None;
                self.state.cursor = CursorHint::Arrow;
            }
        }
    }

    pub fn pointer_leave(&mut self) {
        self.state.hovered = None;
        if self.state.drag_state.is_idle() {
            self.state.cursor = CursorHint::Arrow;
        }
    }

    // === Drag math ===

    fn drag_to(&mut self, pos: Pos, width: f64, project: &mut Project, dispatch: &mut impl FnMut(TimelineEvent)) {
        let DragState::Active {
            mode,
            interval,
            press,
            original,
        } = self.state.drag_state
        else {
            return;
        };
        let Some(live) = project.interval(interval) else {
            debug!("[{}] drag target {} vanished", self.id, interval);
            self.state.reset_gesture();
            return;
        };

        let duration = project.duration();
        let min = self.config.min_duration;
        let time = x_to_time(pos.x, width, duration);
        let siblings = project.siblings(interval);
        let candidates = snap_candidates(&siblings, &[]);
        let snap = |t: f64| self.snap(t, &candidates, duration);

        let (start, end) = match mode {
            DragMode::Move => move_bounds(original, x_to_time(pos.x - press.x, width, duration), duration),
            DragMode::ResizeStart => (resize_start(time, live.end_time, min, snap), live.end_time),
            DragMode::ResizeEnd => (live.start_time, resize_end(time, live.start_time, min, duration, snap)),
        };
        trace!("[{}] {:?} {} -> {:.4}-{:.4}", self.id, mode, interval, start, end);

        if overlaps_any(start, end, &siblings) {
            trace!("[{}] {:.4}-{:.4} overlaps a sibling, rejected", self.id, start, end);
            self.state.forbidden = true;
            self.state.cursor = CursorHint::Forbidden;
            return;
        }

        project.set_interval_bounds(interval, start, end);
        self.state.forbidden = false;
        self.state.cursor = mode.cursor(true);
        self.state.current_position = time.clamp(0.0, duration);
        dispatch(TimelineEvent::IntervalDragMoved { interval, start, end });
        dispatch(TimelineEvent::TimePositionChanged(self.state.current_position));
    }

    /// Snap `time` to a sibling bound or, with the time scale on, the nearest
    /// tick. Siblings win ties.
    fn snap(&self, time: f64, siblings: &[f64], duration: f64) -> Option<f64> {
        if !self.config.snap_enabled {
            return None;
        }
        let tick = self
            .state
            .time_scale_enabled
            .then(|| nearest_tick(time, duration))
            .flatten();
        match tick {
            Some(t) => find_snap(time, &[siblings, &[t]].concat(), self.config.snap_threshold),
            None => find_snap(time, siblings, self.config.snap_threshold),
        }
    }
}

/// Creation preview end: at least `min` past the start, never past the video.
fn creation_end(start_time: f64, time: f64, min: f64, duration: f64) -> f64 {
    time.max(start_time + min).min(duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{QueryGroup, Step, VideoContext};

    const W: f64 = 1000.0;

    /// 100s video, one LeftHand group holding `windows`.
    fn project_with(windows: &[(f64, f64)]) -> (Project, Vec<IntervalId>) {
        let mut p = Project::new("vid");
        p.set_video(VideoContext::new(100.0, 30.0).unwrap());
        let group = QueryGroup::new("LeftHand_grasp_cup_None_None", "vid")
            .with_intervals(windows.iter().map(|&(s, e)| Interval::new(s, e, 0.9)));
        let ids = group.relevant_windows.iter().map(|i| i.id).collect();
        p.add_group(group);
        (p, ids)
    }

    fn view() -> TimelineView {
        TimelineView::new("left", LaneKind::LeftHand)
    }

    fn collect(events: &mut Vec<TimelineEvent>) -> impl FnMut(TimelineEvent) + '_ {
        move |e| events.push(e)
    }

    #[test]
    fn test_press_inside_is_pending_move() {
        let (p, ids) = project_with(&[(2.0, 5.0)]);
        let mut v = view();
        let mut events = Vec::new();
        v.pointer_down(Pos::new(35.0, 10.0), W, &p, collect(&mut events));
        assert!(matches!(
            v.state.drag_state,
            DragState::Pending { mode: DragMode::Move, .. }
        ));
        assert_eq!(v.state.drag_state.target(), Some(ids[0]));
        assert!(matches!(&events[..], [TimelineEvent::IntervalClicked { interval }] if interval.id == ids[0]));
    }

    #[test]
    fn test_small_move_stays_pending() {
        let (mut p, ids) = project_with(&[(2.0, 5.0)]);
        let mut v = view();
        let mut events = Vec::new();
        v.pointer_down(Pos::new(35.0, 10.0), W, &p, collect(&mut events));
        v.pointer_move(Pos::new(38.0, 12.0), W, &mut p, collect(&mut events));
        assert!(matches!(v.state.drag_state, DragState::Pending { .. }));
        assert_eq!(p.interval(ids[0]).unwrap().bounds(), (2.0, 5.0));

        // Release without a drag: click only.
        v.pointer_up(Pos::new(38.0, 12.0), W, &p, collect(&mut events));
        assert_eq!(events.len(), 1);
        assert!(v.state.drag_state.is_idle());
    }

    #[test]
    fn test_move_drag_shifts_and_reports_original() {
        let (mut p, ids) = project_with(&[(2.0, 5.0)]);
        let mut v = view();
        let mut events = Vec::new();
        v.pointer_down(Pos::new(35.0, 0.0), W, &p, collect(&mut events));
        v.pointer_move(Pos::new(45.0, 0.0), W, &mut p, collect(&mut events));
        assert!(v.state.drag_state.is_dragging());
        assert_eq!(p.interval(ids[0]).unwrap().bounds(), (3.0, 6.0));

        v.pointer_move(Pos::new(65.0, 0.0), W, &mut p, collect(&mut events));
        v.pointer_up(Pos::new(65.0, 0.0), W, &p, collect(&mut events));
        assert_eq!(p.interval(ids[0]).unwrap().bounds(), (5.0, 8.0));

        let finished = events.iter().find_map(|e| match e {
            TimelineEvent::IntervalDragFinished { start, end, original, .. } => Some((*start, *end, *original)),
            _ => None,
        });
        assert_eq!(finished, Some((5.0, 8.0, (2.0, 5.0))));
        assert!(events.iter().any(|e| matches!(e, TimelineEvent::IntervalDragStarted { .. })));
        assert!(v.state.drag_state.is_idle());
    }

    #[test]
    fn test_move_clamped_at_end_keeps_length() {
        let (mut p, ids) = project_with(&[(90.0, 95.0)]);
        let mut v = view();
        v.pointer_down(Pos::new(925.0, 0.0), W, &p, |_| {});
        v.pointer_move(Pos::new(1200.0, 0.0), W, &mut p, |_| {});
        assert_eq!(p.interval(ids[0]).unwrap().bounds(), (95.0, 100.0));
    }

    #[test]
    fn test_resize_start_snaps_to_sibling() {
        let (mut p, ids) = project_with(&[(0.2, 1.05), (2.0, 5.0)]);
        let mut v = view();
        v.pointer_down(Pos::new(20.0, 0.0), W, &p, |_| {});
        assert!(matches!(
            v.state.drag_state,
            DragState::Pending { mode: DragMode::ResizeStart, .. }
        ));
        v.pointer_move(Pos::new(10.0, 0.0), W, &mut p, |_| {});
        assert_eq!(p.interval(ids[1]).unwrap().bounds(), (1.05, 5.0));
    }

    #[test]
    fn test_resize_end_snaps_to_tick_only_with_time_scale() {
        let (mut p, ids) = project_with(&[(2.0, 5.0)]);
        let mut v = view();
        v.pointer_down(Pos::new(50.0, 0.0), W, &p, |_| {});
        v.pointer_move(Pos::new(98.0, 0.0), W, &mut p, |_| {});
        assert_eq!(p.interval(ids[0]).unwrap().bounds(), (2.0, 9.8));
        v.pointer_up(Pos::new(98.0, 0.0), W, &p, |_| {});

        v.set_time_scale_enabled(true);
        v.pointer_down(Pos::new(98.0, 0.0), W, &p, |_| {});
        v.pointer_move(Pos::new(99.0, 0.0), W, &mut p, |_| {});
        v.pointer_move(Pos::new(91.0, 0.0), W, &mut p, |_| {});
        assert_eq!(p.interval(ids[0]).unwrap().bounds(), (2.0, 9.1));
        v.pointer_move(Pos::new(98.5, 0.0), W, &mut p, |_| {});
        assert_eq!(p.interval(ids[0]).unwrap().bounds(), (2.0, 10.0));
    }

    #[test]
    fn test_resize_on_huge_duration_with_time_scale() {
        let mut p = Project::new("vid");
        p.set_video(VideoContext::new(1e30, 30.0).unwrap());
        let group = QueryGroup::new("LeftHand_grasp_cup_None_None", "vid")
            .with_intervals([Interval::new(1e29, 2e29, 0.9)]);
        let id = group.relevant_windows[0].id;
        p.add_group(group);

        let mut v = view();
        v.set_time_scale_enabled(true);
        let mut events = Vec::new();
        v.pointer_down(Pos::new(200.0, 0.0), W, &p, collect(&mut events));
        v.pointer_move(Pos::new(450.0, 0.0), W, &mut p, collect(&mut events));
        v.pointer_up(Pos::new(450.0, 0.0), W, &p, collect(&mut events));

        let (start, end) = p.interval(id).unwrap().bounds();
        assert_eq!(start, 1e29);
        assert!((end - 4.5e29).abs() <= 1e27);
        assert!(events.iter().any(|e| matches!(e, TimelineEvent::IntervalDragFinished { .. })));
    }

    #[test]
    fn test_resize_end_keeps_min_duration() {
        let (mut p, ids) = project_with(&[(2.0, 5.0)]);
        let mut v = view();
        v.pointer_down(Pos::new(50.0, 0.0), W, &p, |_| {});
        v.pointer_move(Pos::new(0.0, 0.0), W, &mut p, |_| {});
        let iv = p.interval(ids[0]).unwrap();
        assert_eq!(iv.start_time, 2.0);
        assert!(iv.duration() >= 0.1 - 1e-9);
    }

    #[test]
    fn test_overlapping_resize_rejected() {
        let (mut p, ids) = project_with(&[(2.0, 5.0), (6.0, 8.0)]);
        let mut v = view();
        let mut events = Vec::new();
        v.pointer_down(Pos::new(50.0, 0.0), W, &p, collect(&mut events));
        v.pointer_move(Pos::new(70.0, 0.0), W, &mut p, collect(&mut events));
        assert_eq!(p.interval(ids[0]).unwrap().bounds(), (2.0, 5.0));
        assert!(v.state.forbidden);
        assert_eq!(v.state.cursor, CursorHint::Forbidden);
        assert!(!events.iter().any(|e| matches!(e, TimelineEvent::IntervalDragMoved { .. })));

        v.pointer_up(Pos::new(70.0, 0.0), W, &p, collect(&mut events));
        let finished = events.iter().find_map(|e| match e {
            TimelineEvent::IntervalDragFinished { start, end, original, .. } => Some(((*start, *end), *original)),
            _ => None,
        });
        // Final equals original: nothing for the caller to commit.
        assert_eq!(finished, Some(((2.0, 5.0), (2.0, 5.0))));
        assert!(!v.state.forbidden);
    }

    #[test]
    fn test_empty_space_drag_creates() {
        let (mut p, _) = project_with(&[(2.0, 5.0)]);
        let mut v = TimelineView::new("steps", LaneKind::Steps);
        let mut events = Vec::new();
        v.pointer_down(Pos::new(100.0, 0.0), W, &p, collect(&mut events));
        assert_eq!(events, vec![TimelineEvent::TimePositionChanged(10.0)]);
        v.pointer_move(Pos::new(140.0, 0.0), W, &mut p, collect(&mut events));
        assert!(matches!(
            v.state.drag_state,
            DragState::Creating { preview_end: Some(e), .. } if e == 14.0
        ));
        v.pointer_up(Pos::new(140.0, 0.0), W, &p, collect(&mut events));
        assert_eq!(
            events.last(),
            Some(&TimelineEvent::IntervalCreated {
                start: 10.0,
                end: 14.0,
                lane: LaneKind::Steps
            })
        );
        assert!(p.steps.is_empty());
    }

    #[test]
    fn test_tiny_empty_space_drag_creates_nothing() {
        let (mut p, _) = project_with(&[]);
        let mut v = view();
        let mut events = Vec::new();
        v.pointer_down(Pos::new(100.0, 0.0), W, &p, collect(&mut events));
        v.pointer_move(Pos::new(103.0, 0.0), W, &mut p, collect(&mut events));
        v.pointer_up(Pos::new(103.0, 0.0), W, &p, collect(&mut events));
        assert!(!events.iter().any(|e| matches!(e, TimelineEvent::IntervalCreated { .. })));
    }

    #[test]
    fn test_threshold_hides_from_picking() {
        let (p, _) = project_with(&[(2.0, 5.0)]);
        let mut v = view();
        v.set_confidence_threshold(0.95);
        let mut events = Vec::new();
        v.pointer_down(Pos::new(35.0, 0.0), W, &p, collect(&mut events));
        assert!(matches!(v.state.drag_state, DragState::Creating { .. }));
    }

    #[test]
    fn test_zero_duration_ignores_input() {
        let p = Project::new("none");
        let mut v = view();
        let mut events = Vec::new();
        v.pointer_down(Pos::new(35.0, 0.0), W, &p, collect(&mut events));
        assert!(events.is_empty());
        assert!(v.state.drag_state.is_idle());
    }

    #[test]
    fn test_cancel_restores_original() {
        let (mut p, ids) = project_with(&[(2.0, 5.0)]);
        let mut v = view();
        let mut events = Vec::new();
        v.pointer_down(Pos::new(35.0, 0.0), W, &p, collect(&mut events));
        v.pointer_move(Pos::new(65.0, 0.0), W, &mut p, collect(&mut events));
        assert_eq!(p.interval(ids[0]).unwrap().bounds(), (5.0, 8.0));
        assert!(v.cancel(&mut p));
        assert_eq!(p.interval(ids[0]).unwrap().bounds(), (2.0, 5.0));
        v.pointer_up(Pos::new(65.0, 0.0), W, &p, collect(&mut events));
        assert!(!events.iter().any(|e| matches!(e, TimelineEvent::IntervalDragFinished { .. })));
        assert!(!v.cancel(&mut p));
    }

    #[test]
    fn test_hover_cursor() {
        let (p, ids) = project_with(&[(2.0, 5.0)]);
        let mut v = view();
        v.hover(Pos::new(21.0, 0.0), W, &p);
        assert_eq!(v.state.cursor, CursorHint::ResizeHorizontal);
        v.hover(Pos::new(35.0, 0.0), W, &p);
        assert_eq!(v.state.cursor, CursorHint::Grab);
        assert_eq!(v.state.hovered, Some(ids[0]));
        v.hover(Pos::new(80.0, 0.0), W, &p);
        assert_eq!(v.state.cursor, CursorHint::Arrow);
        assert_eq!(v.state.hovered, None);
    }

    #[test]
    fn test_step_lane_drag_moves_step() {
        let mut p = Project::new("vid");
        p.set_video(VideoContext::new(100.0, 10.0).unwrap());
        let step = Step::new("wash", 20.0, 30.0, 10.0);
        let id = step.id;
        p.steps.push(step);
        let mut v = TimelineView::new("steps", LaneKind::Steps);
        v.pointer_down(Pos::new(250.0, 0.0), W, &p, |_| {});
        v.pointer_move(Pos::new(300.0, 0.0), W, &mut p, |_| {});
        let moved = p.steps.get(id).unwrap();
        assert_eq!(moved.segment, [25.0, 35.0]);
        assert_eq!(moved.segment_frames, [250, 350]);
    }
}
