//! Edit session - the glue between gestures, forms and the undo stack.
//!
//! Owns the project, the injected undo stack, the event coordinator and the
//! bus. Finished drags become `ModifyInterval`/`ModifyStepSegment`, empty-space
//! drags become `AddInterval`/`AddStep`, settled form edits become single or
//! composite commands. Nothing else writes to the project, live drag feedback
//! excepted.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use log::{debug, info, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::core::commands::{
    AddInterval, AddStep, Composite, DeleteInterval, DeleteStep, EditCommand, EditContext, ModifyInterval,
    ModifyQueryText, ModifyStepSegment, ModifyStepText,
};
use crate::core::coordinator::EventCoordinator;
use crate::core::debouncer::Debouncer;
use crate::core::event_bus::EventBus;
use crate::core::project_events::ModelChange;
use crate::core::undo::UndoStack;
use crate::entities::{
    build_query_text, parse_query, Interval, IntervalId, LaneKind, OwnerRef, Project, ResultsLoader, Step,
    VideoContext,
};
use crate::error::ConstraintRejection;
use crate::widgets::timeline::{
    CoordinatedEvent, Pos, TimelineConfig, TimelineEvent, TimelineSnapChangedEvent, TimelineSnapshot,
    TimelineTimeScaleChangedEvent, TimelineView,
};

/// Length of an interval added with the "Add" button, seconds.
pub const NEW_INTERVAL_SECS: f64 = 5.0;
/// Length of a step added with the "Add step" button, seconds.
pub const NEW_STEP_SECS: f64 = 1.0;
/// Confidence of hand-made intervals.
pub const MANUAL_CONFIDENCE: f64 = 1.0;
/// Typed times closer than this to the current value count as unchanged.
pub const TIME_EPSILON: f64 = 0.01;

/// Float slack for the minimum-duration check.
const LENGTH_SLACK: f64 = 1e-9;

/// Action editor contents for one interval.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionForm {
    pub interval: IntervalId,
    pub start: f64,
    pub end: f64,
    pub query_text: String,
}

impl ActionForm {
    /// Form built from the five separate fields.
    pub fn from_fields(
        interval: IntervalId,
        (start, end): (f64, f64),
        hand: &str,
        verb: &str,
        manipulated: &str,
        target: &str,
        tool: &str,
    ) -> Self {
        Self {
            interval,
            start,
            end,
            query_text: build_query_text(hand, verb, manipulated, target, tool),
        }
    }
}

/// Step editor contents.
#[derive(Debug, Clone, PartialEq)]
pub struct StepForm {
    pub step: IntervalId,
    pub text: String,
    pub start: f64,
    pub end: f64,
}

/// Result of a pointer release: the events the view produced and, if the
/// gesture asked for a new interval that could not be placed, why.
#[derive(Debug, Clone)]
pub struct GestureOutcome {
    pub events: Vec<CoordinatedEvent>,
    pub rejection: Option<ConstraintRejection>,
}

impl GestureOutcome {
    pub fn is_rejected(&self) -> bool {
        self.rejection.is_some()
    }

    /// The events, or the rejection if there was one.
    pub fn into_result(self) -> Result<Vec<CoordinatedEvent>, ConstraintRejection> {
        match self.rejection {
            Some(e) => Err(e),
            None => Ok(self.events),
        }
    }
}

pub struct EditSession {
    project: Project,
    undo: UndoStack,
    coordinator: EventCoordinator,
    bus: EventBus,
    ctx: EditContext,
    config: TimelineConfig,
    selected_interval: Option<IntervalId>,
    selected_groups: HashMap<LaneKind, Uuid>,
    action_form: Debouncer<ActionForm>,
    step_form: Debouncer<StepForm>,
}

impl EditSession {
    /// Session with default settings and one view per lane.
    pub fn new(project: Project, undo: UndoStack) -> Self {
        Self::with_settings(project, undo, &Settings::default())
    }

    pub fn with_settings(project: Project, mut undo: UndoStack, settings: &Settings) -> Self {
        let bus = EventBus::new();
        undo.set_emitter(bus.emitter());
        if settings.undo_limit > 0 {
            undo.set_limit(settings.undo_limit);
        }

        let mut coordinator = EventCoordinator::with_history_capacity(settings.history_capacity);
        coordinator.set_emitter(bus.emitter());
        for lane in LaneKind::ACTION_LANES.into_iter().chain([LaneKind::Steps]) {
            let mut view = TimelineView::new(lane.as_str(), lane).with_config(settings.timeline.clone());
            view.set_confidence_threshold(settings.confidence_threshold);
            view.set_time_scale_enabled(settings.time_scale_enabled);
            coordinator.register_timeline(view);
        }

        Self {
            project,
            undo,
            coordinator,
            ctx: EditContext::from_emitter(bus.emitter()),
            bus,
            config: settings.timeline.clone(),
            selected_interval: None,
            selected_groups: HashMap::new(),
            action_form: Debouncer::new(settings.debounce_ms),
            step_form: Debouncer::new(settings.debounce_ms),
        }
    }

    // === Accessors ===

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo
    }

    pub fn coordinator(&self) -> &EventCoordinator {
        &self.coordinator
    }

    pub fn coordinator_mut(&mut self) -> &mut EventCoordinator {
        &mut self.coordinator
    }

    pub fn selected_interval(&self) -> Option<IntervalId> {
        self.selected_interval
    }

    pub fn snapshot(&self, timeline: &str) -> Option<TimelineSnapshot> {
        self.coordinator
            .timeline(timeline)
            .map(|view| TimelineSnapshot::capture(view, &self.project))
    }

    /// Swap in a freshly loaded project. History and selection are dropped.
    pub fn replace_project(&mut self, project: Project) {
        info!(
            "Session: project '{}' loaded ({} groups, {} steps)",
            project.video_name,
            project.groups.len(),
            project.steps.len()
        );
        self.project = project;
        self.action_form.cancel();
        self.step_form.cancel();
        self.undo.clear();
        self.selected_interval = None;
        self.selected_groups.clear();
        self.ctx.notify(ModelChange::Project);
    }

    /// Video metadata arrived or its duration resolved. History, selection and
    /// pending form edits are kept.
    pub fn set_video(&mut self, video: VideoContext) {
        self.project.set_video(video);
        self.ctx.notify(ModelChange::Project);
    }

    // === View state ===

    pub fn set_position(&mut self, time: f64) {
        self.coordinator.set_position(time);
    }

    pub fn set_confidence_threshold(&mut self, threshold: f64) {
        self.coordinator.set_confidence_threshold(threshold);
    }

    pub fn set_snap_enabled(&mut self, enabled: bool) {
        self.config.snap_enabled = enabled;
        self.coordinator.set_snap_enabled(enabled);
        self.bus.emit(TimelineSnapChangedEvent(enabled));
    }

    pub fn set_time_scale_enabled(&mut self, enabled: bool) {
        self.coordinator.set_time_scale_enabled(enabled);
        self.bus.emit(TimelineTimeScaleChangedEvent(enabled));
    }

    // === Selection ===

    /// Select an interval; an action interval also becomes its lane's target group.
    pub fn select_interval(&mut self, id: IntervalId) -> bool {
        match self.project.owner_of(id) {
            Some(OwnerRef::Group(gid)) => {
                if let Some(group) = self.project.group(gid) {
                    self.selected_groups.insert(LaneKind::for_query(&group.query_text), gid);
                }
            }
            Some(OwnerRef::Steps) => {}
            None => return false,
        }
        self.selected_interval = Some(id);
        true
    }

    pub fn select_group(&mut self, group: Uuid) -> bool {
        match self.project.group(group) {
            Some(g) => {
                self.selected_groups.insert(LaneKind::for_query(&g.query_text), group);
                true
            }
            None => false,
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected_interval = None;
    }

    /// Group new intervals on `lane` go to: the selected one if it still lives
    /// on that lane, else the lane's first group.
    pub fn target_group(&self, lane: LaneKind) -> Option<Uuid> {
        let selected = self.selected_groups.get(&lane).copied().filter(|gid| {
            self.project
                .group(*gid)
                .is_some_and(|g| LaneKind::for_query(&g.query_text) == lane)
        });
        selected.or_else(|| self.project.lane_groups(lane).first().map(|g| g.id))
    }

    // === Gestures ===

    pub fn pointer_down(&mut self, timeline: &str, pos: Pos, width: f64) -> Vec<CoordinatedEvent> {
        let events = self.coordinator.pointer_down(timeline, pos, width, &self.project);
        for ev in &events {
            if let TimelineEvent::IntervalClicked { interval } = &ev.event {
                self.select_interval(interval.id);
            }
        }
        events
    }

    pub fn pointer_move(&mut self, timeline: &str, pos: Pos, width: f64) -> Vec<CoordinatedEvent> {
        self.coordinator.pointer_move(timeline, pos, width, &mut self.project)
    }

    /// Release: commits the drag or creation the view reports. The view's
    /// events are returned even when the creation is rejected.
    pub fn pointer_up(&mut self, timeline: &str, pos: Pos, width: f64) -> GestureOutcome {
        let events = self.coordinator.pointer_up(timeline, pos, width, &self.project);
        let mut rejection = None;
        for ev in &events {
            match ev.event {
                TimelineEvent::IntervalDragFinished {
                    interval,
                    start,
                    end,
                    original,
                } => {
                    self.commit_drag(interval, original, (start, end));
                }
                TimelineEvent::IntervalCreated { start, end, lane } => {
                    if let Err(e) = self.create_interval(start, end, lane) {
                        debug!("Session: creation on '{}' rejected: {}", timeline, e);
                        rejection = Some(e);
                    }
                }
                _ => {}
            }
        }
        GestureOutcome { events, rejection }
    }

    /// Abort the gesture on `timeline`, rolling back any live drag.
    pub fn cancel_gesture(&mut self, timeline: &str) -> bool {
        let target = self
            .coordinator
            .timeline(timeline)
            .and_then(|v| v.state.drag_state.target());
        let cancelled = self.coordinator.cancel(timeline, &mut self.project);
        if let (true, Some(id)) = (cancelled, target) {
            self.ctx.notify(ModelChange::IntervalBounds(id));
        }
        cancelled
    }

    /// Record a finished drag. The live model already holds `new`; the
    /// command makes it undoable. Unchanged bounds push nothing.
    pub fn commit_drag(&mut self, interval: IntervalId, original: (f64, f64), new: (f64, f64)) -> bool {
        if original == new {
            debug!("Session: drag on {} ended where it started", interval);
            return false;
        }
        let command: EditCommand = match self.project.owner_of(interval) {
            Some(OwnerRef::Steps) => {
                ModifyStepSegment::new(self.ctx.clone(), interval, [original.0, original.1], [new.0, new.1]).into()
            }
            Some(OwnerRef::Group(_)) => ModifyInterval::new(self.ctx.clone(), interval, original, new).into(),
            None => {
                debug!("Session: drag target {} vanished", interval);
                return false;
            }
        };
        self.undo.push(command, &mut self.project)
    }

    /// Add a created interval: a step on the Steps lane, otherwise an action
    /// interval in the lane's target group.
    pub fn create_interval(&mut self, start: f64, end: f64, lane: LaneKind) -> Result<IntervalId, ConstraintRejection> {
        if lane.is_steps() {
            self.check_placement(start, end, &self.project.steps.intervals())?;
            let fps = self.project.steps.fps;
            let step = Step::new(self.project.steps.next_default_label(), start, end, fps);
            let id = step.id;
            self.undo.push(AddStep::new(self.ctx.clone(), step), &mut self.project);
            return Ok(id);
        }

        let gid = self.target_group(lane).ok_or_else(|| ConstraintRejection::NoGroup {
            target: lane.to_string(),
        })?;
        self.add_interval_to(gid, start, end)
    }

    fn add_interval_to(&mut self, gid: Uuid, start: f64, end: f64) -> Result<IntervalId, ConstraintRejection> {
        let siblings = self
            .project
            .group(gid)
            .map(|g| g.relevant_windows.clone())
            .ok_or_else(|| ConstraintRejection::NoGroup { target: gid.to_string() })?;
        self.check_placement(start, end, &siblings)?;

        let interval = Interval::new(start, end, MANUAL_CONFIDENCE);
        let id = interval.id;
        self.undo.push(AddInterval::new(self.ctx.clone(), gid, interval), &mut self.project);
        self.select_interval(id);
        Ok(id)
    }

    /// Bounds, minimum duration and overlap against `siblings`.
    fn check_placement(&self, start: f64, end: f64, siblings: &[Interval]) -> Result<(), ConstraintRejection> {
        let duration = self.project.video.ok_or(ConstraintRejection::NoVideo)?.duration();
        if start < 0.0 || end > duration {
            return Err(ConstraintRejection::OutOfBounds { start, end, duration });
        }
        let length = end - start;
        if length + LENGTH_SLACK < self.config.min_duration {
            return Err(ConstraintRejection::TooShort {
                length,
                min: self.config.min_duration,
            });
        }
        if siblings.iter().any(|s| s.overlaps_range(start, end)) {
            return Err(ConstraintRejection::Overlap { start, end });
        }
        Ok(())
    }

    // === Buttons ===

    /// Add a 5s interval right after the selected interval of `group`, else
    /// after its latest interval, else at 0. Clamped to the video.
    pub fn add_interval_after_selection(&mut self, group: Uuid) -> Result<IntervalId, ConstraintRejection> {
        let duration = self.project.video.ok_or(ConstraintRejection::NoVideo)?.duration();
        let g = self
            .project
            .group(group)
            .ok_or_else(|| ConstraintRejection::NoGroup { target: group.to_string() })?;

        let anchor = self
            .selected_interval
            .and_then(|id| g.interval(id))
            .map(|iv| iv.end_time)
            .or_else(|| g.latest_end())
            .unwrap_or(0.0);
        let start = anchor.clamp(0.0, duration);
        let end = (start + NEW_INTERVAL_SECS).min(duration);
        if end - start + LENGTH_SLACK < self.config.min_duration {
            return Err(ConstraintRejection::NoRoom);
        }
        self.add_interval_to(group, start, end)
    }

    pub fn delete_interval(&mut self, id: IntervalId) -> bool {
        let pushed = match self.project.owner_of(id) {
            Some(OwnerRef::Group(_)) => match DeleteInterval::capture(self.ctx.clone(), &self.project, id) {
                Some(cmd) => self.undo.push(cmd, &mut self.project),
                None => false,
            },
            Some(OwnerRef::Steps) => return self.delete_step(id),
            None => false,
        };
        if pushed && self.selected_interval == Some(id) {
            self.selected_interval = None;
        }
        pushed
    }

    /// Add a step of 1s after the latest step (or at 0).
    pub fn add_step(&mut self, text: &str) -> Result<IntervalId, ConstraintRejection> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ConstraintRejection::EmptyText);
        }
        let duration = self.project.video.ok_or(ConstraintRejection::NoVideo)?.duration();
        let start = self
            .project
            .steps
            .steps
            .iter()
            .map(|s| s.segment[1])
            .fold(0.0_f64, f64::max)
            .min(duration);
        let end = (start + NEW_STEP_SECS).min(duration);
        if end - start + LENGTH_SLACK < self.config.min_duration {
            return Err(ConstraintRejection::NoRoom);
        }
        self.check_placement(start, end, &self.project.steps.intervals())?;

        let step = Step::new(text, start, end, self.project.steps.fps);
        let id = step.id;
        self.undo.push(AddStep::new(self.ctx.clone(), step), &mut self.project);
        self.selected_interval = Some(id);
        Ok(id)
    }

    pub fn delete_step(&mut self, id: IntervalId) -> bool {
        let pushed = match DeleteStep::capture(self.ctx.clone(), &self.project, id) {
            Some(cmd) => self.undo.push(cmd, &mut self.project),
            None => false,
        };
        if pushed && self.selected_interval == Some(id) {
            self.selected_interval = None;
        }
        pushed
    }

    // === Forms ===

    /// Record an action-form keystroke. A pending edit for another interval
    /// is committed first.
    pub fn edit_action_form(&mut self, form: ActionForm) -> Result<bool, ConstraintRejection> {
        self.edit_action_form_at(form, Instant::now())
    }

    pub fn edit_action_form_at(&mut self, form: ActionForm, now: Instant) -> Result<bool, ConstraintRejection> {
        let mut committed = Ok(false);
        if self.action_form.pending().is_some_and(|p| p.interval != form.interval) {
            if let Some(previous) = self.action_form.flush() {
                committed = self.commit_action_form(previous);
            }
        }
        self.action_form.schedule_at(form, now);
        committed
    }

    pub fn edit_step_form(&mut self, form: StepForm) -> Result<bool, ConstraintRejection> {
        self.edit_step_form_at(form, Instant::now())
    }

    pub fn edit_step_form_at(&mut self, form: StepForm, now: Instant) -> Result<bool, ConstraintRejection> {
        let mut committed = Ok(false);
        if self.step_form.pending().is_some_and(|p| p.step != form.step) {
            if let Some(previous) = self.step_form.flush() {
                committed = self.commit_step_form(previous);
            }
        }
        self.step_form.schedule_at(form, now);
        committed
    }

    pub fn has_pending_edits(&self) -> bool {
        self.action_form.is_pending() || self.step_form.is_pending()
    }

    /// Commit form edits whose debounce delay has elapsed.
    pub fn tick(&mut self) -> Result<bool, ConstraintRejection> {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> Result<bool, ConstraintRejection> {
        let action = self.action_form.tick_at(now);
        let step = self.step_form.tick_at(now);
        self.commit_settled(action, step)
    }

    /// Commit pending form edits immediately.
    pub fn flush_edits(&mut self) -> Result<bool, ConstraintRejection> {
        let action = self.action_form.flush();
        let step = self.step_form.flush();
        self.commit_settled(action, step)
    }

    fn commit_settled(
        &mut self,
        action: Option<ActionForm>,
        step: Option<StepForm>,
    ) -> Result<bool, ConstraintRejection> {
        let mut pushed = false;
        let mut rejection = None;
        if let Some(form) = action {
            match self.commit_action_form(form) {
                Ok(p) => pushed |= p,
                Err(e) => {
                    warn!("Session: action edit rejected: {}", e);
                    rejection.get_or_insert(e);
                }
            }
        }
        if let Some(form) = step {
            match self.commit_step_form(form) {
                Ok(p) => pushed |= p,
                Err(e) => {
                    warn!("Session: step edit rejected: {}", e);
                    rejection.get_or_insert(e);
                }
            }
        }
        match rejection {
            Some(e) => Err(e),
            None => Ok(pushed),
        }
    }

    /// Turn a settled action form into one command (composite when both the
    /// times and the query text changed).
    pub fn commit_action_form(&mut self, form: ActionForm) -> Result<bool, ConstraintRejection> {
        let Some(OwnerRef::Group(gid)) = self.project.owner_of(form.interval) else {
            debug!("Session: action form target {} is gone", form.interval);
            return Ok(false);
        };
        let (Some(current), Some(group)) = (self.project.interval(form.interval), self.project.group(gid)) else {
            return Ok(false);
        };
        let old_text = group.query_text.clone();

        let mut children: Vec<EditCommand> = Vec::new();
        if times_differ(current.bounds(), (form.start, form.end)) {
            self.check_placement(form.start, form.end, &self.project.siblings(form.interval))?;
            children.push(
                ModifyInterval::new(self.ctx.clone(), form.interval, current.bounds(), (form.start, form.end)).into(),
            );
        }

        let new_text = form.query_text.trim();
        if new_text != old_text {
            if let Err(e) = parse_query(new_text) {
                warn!("Session: query '{}' is malformed ({}), it will be listed under Other", new_text, e);
            }
            children.push(ModifyQueryText::new(self.ctx.clone(), gid, old_text, new_text).into());
        }

        Ok(self.push_all("Edit action", children))
    }

    pub fn commit_step_form(&mut self, form: StepForm) -> Result<bool, ConstraintRejection> {
        let Some(step) = self.project.steps.get(form.step).cloned() else {
            debug!("Session: step form target {} is gone", form.step);
            return Ok(false);
        };

        let mut children: Vec<EditCommand> = Vec::new();
        let new_text = form.text.trim();
        if new_text != step.text {
            if new_text.is_empty() {
                return Err(ConstraintRejection::EmptyText);
            }
            children.push(ModifyStepText::new(self.ctx.clone(), step.id, step.text.clone(), new_text).into());
        }

        let old = (step.segment[0], step.segment[1]);
        if times_differ(old, (form.start, form.end)) {
            self.check_placement(form.start, form.end, &self.project.siblings(step.id))?;
            children.push(
                ModifyStepSegment::new(self.ctx.clone(), step.id, step.segment, [form.start, form.end]).into(),
            );
        }

        Ok(self.push_all("Edit step", children))
    }

    fn push_all(&mut self, label: &str, mut children: Vec<EditCommand>) -> bool {
        match children.len() {
            0 => false,
            1 => {
                let only = children.remove(0);
                self.undo.push(only, &mut self.project)
            }
            _ => self.undo.push(Composite::new(label, children), &mut self.project),
        }
    }

    // === History ===

    /// Undo the latest command. Pending form edits are committed first.
    pub fn undo(&mut self) -> bool {
        if let Err(e) = self.flush_edits() {
            debug!("Session: pending edit dropped before undo: {}", e);
        }
        self.undo.undo(&mut self.project)
    }

    pub fn redo(&mut self) -> bool {
        if let Err(e) = self.flush_edits() {
            debug!("Session: pending edit dropped before redo: {}", e);
        }
        self.undo.redo(&mut self.project)
    }

    pub fn is_modified(&self) -> bool {
        !self.undo.is_clean()
    }

    // === Files ===

    /// Write the results file and mark the state as saved.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        if let Err(e) = self.flush_edits() {
            warn!("Session: pending edit not saved: {}", e);
        }
        ResultsLoader::save(&self.project, path)?;
        self.undo.set_clean();
        Ok(())
    }
}

fn times_differ(a: (f64, f64), b: (f64, f64)) -> bool {
    (a.0 - b.0).abs() > TIME_EPSILON || (a.1 - b.1).abs() > TIME_EPSILON
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::core::event_bus::downcast_event;
    use crate::core::project_events::ModelChangedEvent;
    use crate::entities::QueryGroup;

    const W: f64 = 1000.0;

    fn session() -> (EditSession, Uuid, IntervalId) {
        let mut p = Project::new("v");
        p.set_video(VideoContext::new(100.0, 30.0).unwrap());
        let gid = p.add_group(
            QueryGroup::new("LeftHand_grasp_cup_None_None", "v").with_intervals([Interval::new(2.0, 5.0, 0.9)]),
        );
        let id = p.group(gid).unwrap().relevant_windows[0].id;
        (EditSession::new(p, UndoStack::new()), gid, id)
    }

    #[test]
    fn test_default_views_registered() {
        let (s, _, _) = session();
        assert_eq!(
            s.coordinator().registered_timelines(),
            vec!["LeftHand", "RightHand", "BothHands", "None", "Steps"]
        );
    }

    #[test]
    fn test_drag_commits_one_command() {
        let (mut s, _, id) = session();
        s.pointer_down("LeftHand", Pos::new(35.0, 0.0), W);
        assert_eq!(s.selected_interval(), Some(id));
        s.pointer_move("LeftHand", Pos::new(45.0, 0.0), W);
        s.pointer_move("LeftHand", Pos::new(65.0, 0.0), W);
        s.pointer_up("LeftHand", Pos::new(65.0, 0.0), W).into_result().unwrap();
        assert_eq!(s.project().interval(id).unwrap().bounds(), (5.0, 8.0));
        assert_eq!(s.undo_stack().count(), 1);

        assert!(s.undo());
        assert_eq!(s.project().interval(id).unwrap().bounds(), (2.0, 5.0));
        assert!(s.redo());
        assert_eq!(s.project().interval(id).unwrap().bounds(), (5.0, 8.0));
    }

    #[test]
    fn test_cancel_gesture_pushes_nothing() {
        let (mut s, _, id) = session();
        s.pointer_down("LeftHand", Pos::new(35.0, 0.0), W);
        s.pointer_move("LeftHand", Pos::new(65.0, 0.0), W);
        assert!(s.cancel_gesture("LeftHand"));
        s.pointer_up("LeftHand", Pos::new(65.0, 0.0), W).into_result().unwrap();
        assert_eq!(s.project().interval(id).unwrap().bounds(), (2.0, 5.0));
        assert_eq!(s.undo_stack().count(), 0);
    }

    #[test]
    fn test_create_on_action_lane_uses_lane_group() {
        let (mut s, gid, _) = session();
        s.pointer_down("LeftHand", Pos::new(100.0, 0.0), W);
        s.pointer_move("LeftHand", Pos::new(140.0, 0.0), W);
        s.pointer_up("LeftHand", Pos::new(140.0, 0.0), W).into_result().unwrap();
        let g = s.project().group(gid).unwrap();
        assert_eq!(g.relevant_windows.len(), 2);
        assert_eq!(g.relevant_windows[1].bounds(), (10.0, 14.0));
        assert_eq!(g.relevant_windows[1].confidence_score, 1.0);
    }

    #[test]
    fn test_create_on_empty_lane_rejected() {
        let (mut s, _, _) = session();
        s.pointer_down("RightHand", Pos::new(100.0, 0.0), W);
        let outcome = s.pointer_up("RightHand", Pos::new(140.0, 0.0), W);
        assert!(matches!(outcome.rejection, Some(ConstraintRejection::NoGroup { .. })));
        // The view still reports what it saw.
        assert!(outcome
            .events
            .iter()
            .any(|e| matches!(e.event, TimelineEvent::IntervalCreated { lane: LaneKind::RightHand, .. })));
        assert_eq!(s.undo_stack().count(), 0);
    }

    #[test]
    fn test_video_arriving_late_keeps_history() {
        let mut p = Project::new("v");
        let gid = p.add_group(
            QueryGroup::new("LeftHand_grasp_cup_None_None", "v").with_intervals([Interval::new(2.0, 5.0, 0.9)]),
        );
        let id = p.group(gid).unwrap().relevant_windows[0].id;
        let mut s = EditSession::new(p, UndoStack::new());
        assert_eq!(s.add_step("wash"), Err(ConstraintRejection::NoVideo));

        s.set_video(VideoContext::new(100.0, 30.0).unwrap());
        let step = s.add_step("wash").unwrap();
        s.pointer_down("LeftHand", Pos::new(35.0, 0.0), W);
        s.pointer_move("LeftHand", Pos::new(65.0, 0.0), W);
        s.pointer_up("LeftHand", Pos::new(65.0, 0.0), W).into_result().unwrap();
        assert_eq!(s.selected_interval(), Some(id));

        // Duration resolved later, different fps.
        s.set_video(VideoContext::new(120.0, 25.0).unwrap());
        assert_eq!(s.undo_stack().count(), 2);
        assert_eq!(s.selected_interval(), Some(id));
        assert_eq!(s.project().duration(), 120.0);
        assert_eq!(s.project().steps.get(step).unwrap().segment_frames, [0, 25]);

        assert!(s.undo());
        assert_eq!(s.project().interval(id).unwrap().bounds(), (2.0, 5.0));
        assert!(s.undo());
        assert!(s.project().steps.is_empty());
    }

    #[test]
    fn test_create_step_gets_default_label() {
        let (mut s, _, _) = session();
        let id = s.create_interval(10.0, 14.0, LaneKind::Steps).unwrap();
        let step = s.project().steps.get(id).unwrap();
        assert_eq!(step.text, "New Step 1");
        assert_eq!(step.segment_frames, [300, 420]);
        assert!(s.undo());
        assert!(s.project().steps.is_empty());
    }

    #[test]
    fn test_create_rejections() {
        let (mut s, _, _) = session();
        assert!(matches!(
            s.create_interval(3.0, 4.0, LaneKind::LeftHand),
            Err(ConstraintRejection::Overlap { .. })
        ));
        assert!(matches!(
            s.create_interval(98.0, 101.0, LaneKind::LeftHand),
            Err(ConstraintRejection::OutOfBounds { .. })
        ));
        assert!(matches!(
            s.create_interval(50.0, 50.05, LaneKind::LeftHand),
            Err(ConstraintRejection::TooShort { .. })
        ));
        assert_eq!(s.undo_stack().count(), 0);
    }

    #[test]
    fn test_add_interval_placement() {
        let (mut s, gid, first) = session();
        // Nothing selected: after the latest end.
        let a = s.add_interval_after_selection(gid).unwrap();
        assert_eq!(s.project().interval(a).unwrap().bounds(), (5.0, 10.0));

        // Selected interval: right after it, but (5, 10) is taken.
        s.select_interval(first);
        assert!(matches!(
            s.add_interval_after_selection(gid),
            Err(ConstraintRejection::Overlap { .. })
        ));

        s.select_interval(a);
        let b = s.add_interval_after_selection(gid).unwrap();
        assert_eq!(s.project().interval(b).unwrap().bounds(), (10.0, 15.0));
        assert_eq!(s.selected_interval(), Some(b));
    }

    #[test]
    fn test_add_interval_no_room_at_end() {
        let mut p = Project::new("v");
        p.set_video(VideoContext::new(10.0, 30.0).unwrap());
        let gid = p.add_group(QueryGroup::new("q", "v").with_intervals([Interval::new(2.0, 10.0, 0.9)]));
        let mut s = EditSession::new(p, UndoStack::new());
        assert_eq!(s.add_interval_after_selection(gid), Err(ConstraintRejection::NoRoom));
    }

    #[test]
    fn test_delete_and_undo_restores_index() {
        let (mut s, gid, first) = session();
        let added = s.add_interval_after_selection(gid).unwrap();
        assert!(s.delete_interval(first));
        assert_eq!(s.project().group(gid).unwrap().relevant_windows.len(), 1);
        assert!(s.undo());
        let g = s.project().group(gid).unwrap();
        assert_eq!(g.index_of(first), Some(0));
        assert_eq!(g.index_of(added), Some(1));
    }

    #[test]
    fn test_action_form_settles_into_composite() {
        let (mut s, gid, id) = session();
        let t0 = Instant::now();
        let form = |start: f64, text: &str| ActionForm {
            interval: id,
            start,
            end: 5.0,
            query_text: text.to_string(),
        };
        s.edit_action_form_at(form(1.5, "LeftHand_grasp_cup_None_None"), t0).unwrap();
        s.edit_action_form_at(form(1.0, "LeftHand_grasp_mug_None_None"), t0 + Duration::from_millis(300)).unwrap();
        assert_eq!(s.tick_at(t0 + Duration::from_millis(600)), Ok(false));
        assert_eq!(s.tick_at(t0 + Duration::from_millis(900)), Ok(true));

        assert_eq!(s.undo_stack().count(), 1);
        assert_eq!(s.undo_stack().undo_text().as_deref(), Some("Edit action"));
        assert_eq!(s.project().interval(id).unwrap().bounds(), (1.0, 5.0));
        assert_eq!(s.project().group(gid).unwrap().query_text, "LeftHand_grasp_mug_None_None");

        assert!(s.undo());
        assert_eq!(s.project().interval(id).unwrap().bounds(), (2.0, 5.0));
        assert_eq!(s.project().group(gid).unwrap().query_text, "LeftHand_grasp_cup_None_None");
    }

    #[test]
    fn test_action_form_ignores_tiny_time_change() {
        let (mut s, _, id) = session();
        let form = ActionForm::from_fields(id, (2.005, 5.0), "LeftHand", "grasp", "cup", "", "");
        assert_eq!(form.query_text, "LeftHand_grasp_cup_None_None");
        s.edit_action_form(form).unwrap();
        assert_eq!(s.flush_edits(), Ok(false));
        assert_eq!(s.undo_stack().count(), 0);
    }

    #[test]
    fn test_step_form_edit() {
        let (mut s, _, _) = session();
        let id = s.add_step("wash hands").unwrap();
        assert_eq!(s.project().steps.get(id).unwrap().segment, [0.0, 1.0]);

        s.edit_step_form(StepForm {
            step: id,
            text: "wash".into(),
            start: 0.0,
            end: 3.0,
        })
        .unwrap();
        assert!(s.has_pending_edits());
        assert_eq!(s.flush_edits(), Ok(true));
        let step = s.project().steps.get(id).unwrap();
        assert_eq!(step.text, "wash");
        assert_eq!(step.segment, [0.0, 3.0]);
        assert_eq!(step.segment_frames, [0, 90]);

        assert!(s.undo());
        assert_eq!(s.project().steps.get(id).unwrap().text, "wash hands");
    }

    #[test]
    fn test_add_step_requires_text() {
        let (mut s, _, _) = session();
        assert_eq!(s.add_step("   "), Err(ConstraintRejection::EmptyText));
    }

    #[test]
    fn test_commands_announce_model_changes() {
        let (mut s, gid, _) = session();
        s.bus().clear();
        s.add_interval_after_selection(gid).unwrap();
        let changes: Vec<_> = s
            .bus()
            .poll()
            .iter()
            .filter_map(downcast_event::<ModelChangedEvent>)
            .map(|e| e.0.clone())
            .collect();
        assert_eq!(changes, vec![ModelChange::GroupIntervals(gid)]);
    }

    #[test]
    fn test_save_marks_clean() {
        let (mut s, gid, _) = session();
        s.add_interval_after_selection(gid).unwrap();
        assert!(s.is_modified());
        let tmp = tempfile::tempdir().unwrap();
        s.save(&tmp.path().join("out.json")).unwrap();
        assert!(!s.is_modified());
    }
}
