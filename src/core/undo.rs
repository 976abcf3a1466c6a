//! Linear undo/redo history of edit commands.
//!
//! - `push()` applies the command and discards any redo tail
//! - optional depth limit drops the oldest entries (0 = unlimited)
//! - a clean index marks the state that was last saved
//!
//! The stack never owns the project; callers pass it in for every operation.

use log::debug;

use super::commands::{Command, EditCommand};
use super::event_bus::EventEmitter;
use super::project_events::UndoStackChangedEvent;
use crate::entities::Project;

#[derive(Debug)]
pub struct UndoStack {
    commands: Vec<EditCommand>,
    /// Number of applied commands; `commands[..index]` are undoable.
    index: usize,
    limit: usize,
    clean_index: Option<usize>,
    emitter: Option<EventEmitter>,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoStack {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            index: 0,
            limit: 0,
            clean_index: Some(0),
            emitter: None,
        }
    }

    pub fn with_limit(limit: usize) -> Self {
        let mut stack = Self::new();
        stack.limit = limit;
        stack
    }

    /// Announce stack changes on the bus.
    pub fn set_emitter(&mut self, emitter: EventEmitter) {
        self.emitter = Some(emitter);
    }

    /// Apply `command` and record it. No-op commands are dropped; returns
    /// whether the command was recorded.
    pub fn push(&mut self, command: impl Into<EditCommand>, project: &mut Project) -> bool {
        let command = command.into();
        if command.is_noop() {
            debug!("UndoStack: skipping no-op '{}'", command.label());
            return false;
        }

        command.apply(project);
        debug!("UndoStack: push '{}' at {}", command.label(), self.index);

        self.commands.truncate(self.index);
        if self.clean_index.is_some_and(|c| c > self.index) {
            self.clean_index = None;
        }
        self.commands.push(command);
        self.index += 1;
        self.enforce_limit();
        self.announce();
        true
    }

    pub fn undo(&mut self, project: &mut Project) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.index -= 1;
        let command = &self.commands[self.index];
        debug!("UndoStack: undo '{}'", command.label());
        command.revert(project);
        self.announce();
        true
    }

    pub fn redo(&mut self, project: &mut Project) -> bool {
        if !self.can_redo() {
            return false;
        }
        let command = &self.commands[self.index];
        debug!("UndoStack: redo '{}'", command.label());
        command.apply(project);
        self.index += 1;
        self.announce();
        true
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index < self.commands.len()
    }

    pub fn undo_text(&self) -> Option<String> {
        self.index.checked_sub(1).map(|i| self.commands[i].label())
    }

    pub fn redo_text(&self) -> Option<String> {
        self.commands.get(self.index).map(|c| c.label())
    }

    pub fn count(&self) -> usize {
        self.commands.len()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Change the depth limit, trimming the oldest entries if needed.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
        self.enforce_limit();
    }

    /// Forget all history. The current state becomes clean.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.index = 0;
        self.clean_index = Some(0);
        self.announce();
    }

    pub fn is_clean(&self) -> bool {
        self.clean_index == Some(self.index)
    }

    /// Mark the current state as saved.
    pub fn set_clean(&mut self) {
        self.clean_index = Some(self.index);
        self.announce();
    }

    fn enforce_limit(&mut self) {
        if self.limit == 0 {
            return;
        }
        while self.commands.len() > self.limit && self.index > 0 {
            let dropped = self.commands.remove(0);
            self.index -= 1;
            self.clean_index = match self.clean_index {
                Some(0) | None => None,
                Some(c) => Some(c - 1),
            };
            debug!("UndoStack: limit {} reached, dropped '{}'", self.limit, dropped.label());
        }
    }

    fn announce(&self) {
        if let Some(emitter) = &self.emitter {
            emitter.emit(UndoStackChangedEvent {
                undo_text: self.undo_text(),
                redo_text: self.redo_text(),
                clean: self.is_clean(),
            });
        }
    }
}
