//! Event coordinator - routes pointer input to registered timeline views and
//! fans their events out.
//!
//! Every `TimelineEvent` a view produces is tagged with the view id and the
//! resolved owner of its interval, recorded in a bounded history, and
//! re-emitted on the bus as a `CoordinatedEvent`. Clicks are mirrored to the
//! other enabled views as highlights.

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use log::{debug, trace, warn};

use super::event_bus::EventEmitter;
use super::project_events::SeekRequestEvent;
use crate::entities::{IntervalId, Lane, Project};
use crate::widgets::timeline::{CoordinatedEvent, HighlightIntervalEvent, OwnerInfo, Pos, TimelineEvent, TimelineView};

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

#[derive(Clone, Debug)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Local>,
    pub kind: &'static str,
    pub timeline: String,
    pub payload: String,
}

#[derive(Clone, Debug)]
struct Registered {
    view: TimelineView,
    enabled: bool,
}

#[derive(Debug)]
pub struct EventCoordinator {
    timelines: IndexMap<String, Registered>,
    active_timeline: Option<String>,
    history: VecDeque<HistoryEntry>,
    history_capacity: usize,
    emitter: Option<EventEmitter>,
}

impl Default for EventCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl EventCoordinator {
    pub fn new() -> Self {
        Self::with_history_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_history_capacity(capacity: usize) -> Self {
        Self {
            timelines: IndexMap::new(),
            active_timeline: None,
            history: VecDeque::with_capacity(capacity),
            history_capacity: capacity,
            emitter: None,
        }
    }

    pub fn set_emitter(&mut self, emitter: EventEmitter) {
        self.emitter = Some(emitter);
    }

    // === Registry ===

    /// Register a view under its id. An existing view with that id is replaced.
    pub fn register_timeline(&mut self, view: TimelineView) {
        let id = view.id.clone();
        if self.timelines.contains_key(&id) {
            warn!("Coordinator: timeline '{}' re-registered, replacing", id);
        }
        debug!("Coordinator: registered '{}' ({})", id, view.lane);
        self.timelines.insert(id, Registered { view, enabled: true });
    }

    pub fn unregister_timeline(&mut self, id: &str) -> Option<TimelineView> {
        let removed = self.timelines.shift_remove(id)?;
        if self.active_timeline.as_deref() == Some(id) {
            self.active_timeline = None;
        }
        debug!("Coordinator: unregistered '{}'", id);
        Some(removed.view)
    }

    pub fn enable_timeline(&mut self, id: &str) -> bool {
        self.set_enabled(id, true)
    }

    pub fn disable_timeline(&mut self, id: &str) -> bool {
        self.set_enabled(id, false)
    }

    fn set_enabled(&mut self, id: &str, enabled: bool) -> bool {
        match self.timelines.get_mut(id) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn is_enabled(&self, id: &str) -> bool {
        self.timelines.get(id).is_some_and(|e| e.enabled)
    }

    /// Registered view ids in registration order.
    pub fn registered_timelines(&self) -> Vec<&str> {
        self.timelines.keys().map(String::as_str).collect()
    }

    pub fn timeline(&self, id: &str) -> Option<&TimelineView> {
        self.timelines.get(id).map(|e| &e.view)
    }

    pub fn timeline_mut(&mut self, id: &str) -> Option<&mut TimelineView> {
        self.timelines.get_mut(id).map(|e| &mut e.view)
    }

    pub fn timelines(&self) -> impl Iterator<Item = &TimelineView> {
        self.timelines.values().map(|e| &e.view)
    }

    pub fn active_timeline(&self) -> Option<&str> {
        self.active_timeline.as_deref()
    }

    // === Broadcast state ===

    /// Move every view's playhead.
    pub fn set_position(&mut self, time: f64) {
        for entry in self.timelines.values_mut() {
            entry.view.set_position(time);
        }
    }

    pub fn set_confidence_threshold(&mut self, threshold: f64) {
        for entry in self.timelines.values_mut() {
            entry.view.set_confidence_threshold(threshold);
        }
    }

    pub fn set_time_scale_enabled(&mut self, enabled: bool) {
        for entry in self.timelines.values_mut() {
            entry.view.set_time_scale_enabled(enabled);
        }
    }

    pub fn set_snap_enabled(&mut self, enabled: bool) {
        for entry in self.timelines.values_mut() {
            entry.view.config.snap_enabled = enabled;
        }
    }

    // === Pointer routing ===

    pub fn pointer_down(&mut self, id: &str, pos: Pos, width: f64, project: &Project) -> Vec<CoordinatedEvent> {
        let mut events = Vec::new();
        if let Some(view) = self.enabled_view(id) {
            view.pointer_down(pos, width, project, |e| events.push(e));
        }
        self.route(id, events, project)
    }

    pub fn pointer_move(&mut self, id: &str, pos: Pos, width: f64, project: &mut Project) -> Vec<CoordinatedEvent> {
        let mut events = Vec::new();
        if let Some(view) = self.enabled_view(id) {
            view.pointer_move(pos, width, project, |e| events.push(e));
        }
        self.route(id, events, project)
    }

    pub fn pointer_up(&mut self, id: &str, pos: Pos, width: f64, project: &Project) -> Vec<CoordinatedEvent> {
        let mut events = Vec::new();
        if let Some(view) = self.enabled_view(id) {
            view.pointer_up(pos, width, project, |e| events.push(e));
        }
        self.route(id, events, project)
    }

    /// Abort the gesture on one view.
    pub fn cancel(&mut self, id: &str, project: &mut Project) -> bool {
        self.timelines
            .get_mut(id)
            .is_some_and(|entry| entry.view.cancel(project))
    }

    fn enabled_view(&mut self, id: &str) -> Option<&mut TimelineView> {
        match self.timelines.get_mut(id) {
            Some(entry) if entry.enabled => Some(&mut entry.view),
            Some(_) => {
                trace!("Coordinator: '{}' disabled, input dropped", id);
                None
            }
            None => {
                debug!("Coordinator: input for unknown timeline '{}'", id);
                None
            }
        }
    }

    fn route(&mut self, id: &str, events: Vec<TimelineEvent>, project: &Project) -> Vec<CoordinatedEvent> {
        events
            .into_iter()
            .map(|event| self.handle_event(id, event, project))
            .collect()
    }

    /// Tag, record and re-emit one view event.
    pub fn handle_event(&mut self, timeline: &str, event: TimelineEvent, project: &Project) -> CoordinatedEvent {
        let owner = event.interval_id().and_then(|id| resolve_owner(project, id));

        match &event {
            TimelineEvent::IntervalClicked { interval } => {
                self.active_timeline = Some(timeline.to_string());
                self.highlight_others(timeline, interval.id);
            }
            TimelineEvent::IntervalDragStarted { .. }
            | TimelineEvent::IntervalDragMoved { .. }
            | TimelineEvent::IntervalDragFinished { .. } => {
                self.active_timeline = Some(timeline.to_string());
            }
            TimelineEvent::TimePositionChanged(time) => {
                if let Some(emitter) = &self.emitter {
                    emitter.emit(SeekRequestEvent(*time));
                }
            }
            TimelineEvent::IntervalCreated { .. } => {}
        }

        if !event.is_transient() {
            self.record(timeline, &event);
        }

        let coordinated = CoordinatedEvent {
            timeline: timeline.to_string(),
            event,
            owner,
        };
        if let Some(emitter) = &self.emitter {
            emitter.emit(coordinated.clone());
        }
        coordinated
    }

    fn highlight_others(&mut self, source: &str, interval: IntervalId) {
        for (id, entry) in self.timelines.iter_mut() {
            if id == source || !entry.enabled {
                continue;
            }
            entry.view.set_highlighted(Some(interval));
            if let Some(emitter) = &self.emitter {
                emitter.emit(HighlightIntervalEvent {
                    timeline: id.clone(),
                    interval,
                });
            }
        }
    }

    // === History ===

    fn record(&mut self, timeline: &str, event: &TimelineEvent) {
        if self.history_capacity == 0 {
            return;
        }
        while self.history.len() >= self.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(HistoryEntry {
            timestamp: Local::now(),
            kind: event.kind(),
            timeline: timeline.to_string(),
            payload: payload(event),
        });
    }

    /// Recorded events, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    pub fn history_by_type(&self, kind: &str) -> Vec<&HistoryEntry> {
        self.history.iter().filter(|h| h.kind == kind).collect()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

fn resolve_owner(project: &Project, id: IntervalId) -> Option<OwnerInfo> {
    match project.resolve_owner(id)? {
        Lane::Action(group) => Some(OwnerInfo::Query {
            group: group.id,
            query_text: group.query_text.clone(),
        }),
        Lane::Step(step) => Some(OwnerInfo::Step {
            step: step.id,
            text: step.text.clone(),
            index: project.steps.index_of(step.id).unwrap_or_default(),
        }),
    }
}

fn payload(event: &TimelineEvent) -> String {
    match event {
        TimelineEvent::IntervalClicked { interval } | TimelineEvent::IntervalDragStarted { interval } => format!(
            "{} {:.3}-{:.3}",
            interval.id, interval.start_time, interval.end_time
        ),
        TimelineEvent::IntervalDragMoved { interval, start, end } => format!("{interval} {start:.3}-{end:.3}"),
        TimelineEvent::IntervalDragFinished {
            interval,
            start,
            end,
            original,
        } => format!(
            "{interval} {:.3}-{:.3} -> {start:.3}-{end:.3}",
            original.0, original.1
        ),
        TimelineEvent::IntervalCreated { start, end, lane } => format!("{lane} {start:.3}-{end:.3}"),
        TimelineEvent::TimePositionChanged(time) => format!("{time:.3}"),
    }
}
