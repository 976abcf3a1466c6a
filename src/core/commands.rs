//! Undoable edit commands.
//!
//! Every mutation of the interval model is a `Command` value holding its own
//! before/after state. `apply()` and `revert()` never re-derive anything from
//! live state, so undo is exact no matter what happened in between.
//!
//! A command whose target no longer exists is a silent no-op (debug-logged).
//! Each command carries an `EditContext` and reports what it touched through it.

use enum_dispatch::enum_dispatch;
use log::debug;
use uuid::Uuid;

use super::event_bus::EventEmitter;
use super::project_events::{ModelChange, ModelChangedEvent};
use crate::entities::{Interval, IntervalId, Project, Step};

/// Change-notification handle given to commands at construction.
///
/// Wraps an optional emitter: a detached context (tests, batch tools) drops
/// notifications silently.
#[derive(Clone, Default, Debug)]
pub struct EditContext {
    emitter: Option<EventEmitter>,
}

impl EditContext {
    pub fn detached() -> Self {
        Self { emitter: None }
    }

    pub fn from_emitter(emitter: EventEmitter) -> Self {
        Self { emitter: Some(emitter) }
    }

    pub fn notify(&self, change: ModelChange) {
        if let Some(emitter) = &self.emitter {
            emitter.emit(ModelChangedEvent(change));
        }
    }
}

/// Reversible edit.
#[enum_dispatch]
pub trait Command {
    /// Human-readable label for undo/redo menus.
    fn label(&self) -> String;

    fn apply(&self, project: &mut Project);

    fn revert(&self, project: &mut Project);

    /// True when applying would change nothing. No-op commands are not pushed.
    fn is_noop(&self) -> bool {
        false
    }
}

/// All command kinds.
#[enum_dispatch(Command)]
#[derive(Debug, Clone)]
pub enum EditCommand {
    ModifyInterval,
    DeleteInterval,
    AddInterval,
    ModifyQueryText,
    AddStep,
    DeleteStep,
    ModifyStepText,
    ModifyStepSegment,
    Composite,
}

// === Intervals ===

/// Set an interval's bounds (drag/resize result or typed times).
#[derive(Debug, Clone)]
pub struct ModifyInterval {
    ctx: EditContext,
    pub interval: IntervalId,
    pub old: (f64, f64),
    pub new: (f64, f64),
}

impl ModifyInterval {
    pub fn new(ctx: EditContext, interval: IntervalId, old: (f64, f64), new: (f64, f64)) -> Self {
        Self { ctx, interval, old, new }
    }

    fn write(&self, project: &mut Project, (start, end): (f64, f64)) {
        if project.set_interval_bounds(self.interval, start, end) {
            self.ctx.notify(ModelChange::IntervalBounds(self.interval));
        } else {
            debug!("ModifyInterval: {} no longer exists, skipping", self.interval);
        }
    }
}

impl Command for ModifyInterval {
    fn label(&self) -> String {
        format!(
            "Modify interval ({:.2}-{:.2} -> {:.2}-{:.2})",
            self.old.0, self.old.1, self.new.0, self.new.1
        )
    }

    fn apply(&self, project: &mut Project) {
        self.write(project, self.new);
    }

    fn revert(&self, project: &mut Project) {
        self.write(project, self.old);
    }

    fn is_noop(&self) -> bool {
        self.old == self.new
    }
}

/// Remove an interval from its group; undo puts it back at the same index.
#[derive(Debug, Clone)]
pub struct DeleteInterval {
    ctx: EditContext,
    pub group: Uuid,
    pub interval: Interval,
    pub index: usize,
}

impl DeleteInterval {
    pub fn new(ctx: EditContext, group: Uuid, interval: Interval, index: usize) -> Self {
        Self { ctx, group, interval, index }
    }

    /// Capture everything needed to resurrect `id`. None if it is not in any group.
    pub fn capture(ctx: EditContext, project: &Project, id: IntervalId) -> Option<Self> {
        let group = project.group_of(id)?;
        let index = group.index_of(id)?;
        Some(Self::new(ctx, group.id, group.relevant_windows[index].clone(), index))
    }
}

impl Command for DeleteInterval {
    fn label(&self) -> String {
        format!(
            "Delete interval ({:.2}-{:.2})",
            self.interval.start_time, self.interval.end_time
        )
    }

    fn apply(&self, project: &mut Project) {
        let removed = project
            .group_mut(self.group)
            .and_then(|g| g.remove_interval(self.interval.id));
        match removed {
            Some(_) => self.ctx.notify(ModelChange::GroupIntervals(self.group)),
            None => debug!("DeleteInterval: {} already gone", self.interval.id),
        }
    }

    fn revert(&self, project: &mut Project) {
        let Some(group) = project.group_mut(self.group) else {
            debug!("DeleteInterval revert: group {} gone", self.group);
            return;
        };
        if group.contains(self.interval.id) {
            debug!("DeleteInterval revert: {} already present", self.interval.id);
            return;
        }
        group.insert_interval(self.index, self.interval.clone());
        self.ctx.notify(ModelChange::GroupIntervals(self.group));
    }
}

/// Append an interval to a group.
#[derive(Debug, Clone)]
pub struct AddInterval {
    ctx: EditContext,
    pub group: Uuid,
    pub interval: Interval,
}

impl AddInterval {
    pub fn new(ctx: EditContext, group: Uuid, interval: Interval) -> Self {
        Self { ctx, group, interval }
    }
}

impl Command for AddInterval {
    fn label(&self) -> String {
        format!(
            "Add interval ({:.2}-{:.2})",
            self.interval.start_time, self.interval.end_time
        )
    }

    fn apply(&self, project: &mut Project) {
        let Some(group) = project.group_mut(self.group) else {
            debug!("AddInterval: group {} gone", self.group);
            return;
        };
        if group.contains(self.interval.id) {
            return;
        }
        group.push_interval(self.interval.clone());
        self.ctx.notify(ModelChange::GroupIntervals(self.group));
    }

    fn revert(&self, project: &mut Project) {
        let removed = project
            .group_mut(self.group)
            .and_then(|g| g.remove_interval(self.interval.id));
        match removed {
            Some(_) => self.ctx.notify(ModelChange::GroupIntervals(self.group)),
            None => debug!("AddInterval revert: {} already gone", self.interval.id),
        }
    }
}

/// Swap a group's query text.
#[derive(Debug, Clone)]
pub struct ModifyQueryText {
    ctx: EditContext,
    pub group: Uuid,
    pub old: String,
    pub new: String,
}

impl ModifyQueryText {
    pub fn new(ctx: EditContext, group: Uuid, old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            ctx,
            group,
            old: old.into(),
            new: new.into(),
        }
    }

    fn write(&self, project: &mut Project, text: &str) {
        match project.group_mut(self.group) {
            Some(group) => {
                group.query_text = text.to_string();
                self.ctx.notify(ModelChange::QueryText(self.group));
            }
            None => debug!("ModifyQueryText: group {} gone", self.group),
        }
    }
}

impl Command for ModifyQueryText {
    fn label(&self) -> String {
        format!("Edit query '{}'", self.new)
    }

    fn apply(&self, project: &mut Project) {
        self.write(project, &self.new);
    }

    fn revert(&self, project: &mut Project) {
        self.write(project, &self.old);
    }

    fn is_noop(&self) -> bool {
        self.old == self.new
    }
}

// === Steps ===

/// Append a step to the step list.
#[derive(Debug, Clone)]
pub struct AddStep {
    ctx: EditContext,
    pub step: Step,
}

impl AddStep {
    pub fn new(ctx: EditContext, step: Step) -> Self {
        Self { ctx, step }
    }
}

impl Command for AddStep {
    fn label(&self) -> String {
        format!("Add step '{}'", self.step.text)
    }

    fn apply(&self, project: &mut Project) {
        if project.steps.get(self.step.id).is_some() {
            return;
        }
        project.steps.push(self.step.clone());
        self.ctx.notify(ModelChange::Steps);
    }

    fn revert(&self, project: &mut Project) {
        match project.steps.remove(self.step.id) {
            Some(_) => self.ctx.notify(ModelChange::Steps),
            None => debug!("AddStep revert: step {} already gone", self.step.id),
        }
    }
}

/// Remove a step; undo restores it at its original index.
#[derive(Debug, Clone)]
pub struct DeleteStep {
    ctx: EditContext,
    pub step: Step,
    pub index: usize,
}

impl DeleteStep {
    pub fn new(ctx: EditContext, step: Step, index: usize) -> Self {
        Self { ctx, step, index }
    }

    pub fn capture(ctx: EditContext, project: &Project, id: IntervalId) -> Option<Self> {
        let index = project.steps.index_of(id)?;
        Some(Self::new(ctx, project.steps.steps[index].clone(), index))
    }
}

impl Command for DeleteStep {
    fn label(&self) -> String {
        format!("Delete step '{}'", self.step.text)
    }

    fn apply(&self, project: &mut Project) {
        match project.steps.remove(self.step.id) {
            Some(_) => self.ctx.notify(ModelChange::Steps),
            None => debug!("DeleteStep: step {} already gone", self.step.id),
        }
    }

    fn revert(&self, project: &mut Project) {
        if project.steps.get(self.step.id).is_some() {
            return;
        }
        project.steps.insert(self.index, self.step.clone());
        self.ctx.notify(ModelChange::Steps);
    }
}

#[derive(Debug, Clone)]
pub struct ModifyStepText {
    ctx: EditContext,
    pub step: IntervalId,
    pub old: String,
    pub new: String,
}

impl ModifyStepText {
    pub fn new(ctx: EditContext, step: IntervalId, old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            ctx,
            step,
            old: old.into(),
            new: new.into(),
        }
    }

    fn write(&self, project: &mut Project, text: &str) {
        match project.steps.get_mut(self.step) {
            Some(step) => {
                step.text = text.to_string();
                self.ctx.notify(ModelChange::Steps);
            }
            None => debug!("ModifyStepText: step {} gone", self.step),
        }
    }
}

impl Command for ModifyStepText {
    fn label(&self) -> String {
        format!("Rename step '{}' -> '{}'", self.old, self.new)
    }

    fn apply(&self, project: &mut Project) {
        self.write(project, &self.new);
    }

    fn revert(&self, project: &mut Project) {
        self.write(project, &self.old);
    }

    fn is_noop(&self) -> bool {
        self.old == self.new
    }
}

/// Move/resize a step. Frames are re-derived from the list's fps.
#[derive(Debug, Clone)]
pub struct ModifyStepSegment {
    ctx: EditContext,
    pub step: IntervalId,
    pub old: [f64; 2],
    pub new: [f64; 2],
}

impl ModifyStepSegment {
    pub fn new(ctx: EditContext, step: IntervalId, old: [f64; 2], new: [f64; 2]) -> Self {
        Self { ctx, step, old, new }
    }

    fn write(&self, project: &mut Project, [start, end]: [f64; 2]) {
        if project.steps.set_segment(self.step, start, end) {
            self.ctx.notify(ModelChange::IntervalBounds(self.step));
        } else {
            debug!("ModifyStepSegment: step {} gone", self.step);
        }
    }
}

impl Command for ModifyStepSegment {
    fn label(&self) -> String {
        format!(
            "Modify step ({:.2}-{:.2} -> {:.2}-{:.2})",
            self.old[0], self.old[1], self.new[0], self.new[1]
        )
    }

    fn apply(&self, project: &mut Project) {
        self.write(project, self.new);
    }

    fn revert(&self, project: &mut Project) {
        self.write(project, self.old);
    }

    fn is_noop(&self) -> bool {
        self.old == self.new
    }
}

// === Composite ===

/// Several commands as one undo step. Reverted in reverse order.
#[derive(Debug, Clone)]
pub struct Composite {
    pub text: String,
    pub children: Vec<EditCommand>,
}

impl Composite {
    pub fn new(text: impl Into<String>, children: Vec<EditCommand>) -> Self {
        Self {
            text: text.into(),
            children,
        }
    }
}

impl Command for Composite {
    fn label(&self) -> String {
        self.text.clone()
    }

    fn apply(&self, project: &mut Project) {
        for child in &self.children {
            child.apply(project);
        }
    }

    fn revert(&self, project: &mut Project) {
        for child in self.children.iter().rev() {
            child.revert(project);
        }
    }

    fn is_noop(&self) -> bool {
        self.children.iter().all(|c| c.is_noop())
    }
}
