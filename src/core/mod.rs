//! Core engine modules - events, commands, undo history, coordination.
//!
//! Independent of any rendering: everything here runs synchronously inside
//! the caller's handler.

pub mod commands;
pub mod coordinator;
pub mod debouncer;
pub mod event_bus;
pub mod project_events;
pub mod undo;

// Re-exports for convenience
pub use commands::{Command, EditCommand, EditContext};
pub use coordinator::{EventCoordinator, HistoryEntry};
pub use debouncer::Debouncer;
pub use event_bus::{downcast_event, BoxedEvent, EventBus, EventEmitter};
pub use project_events::{ModelChange, ModelChangedEvent, SeekRequestEvent, UndoStackChangedEvent};
pub use undo::UndoStack;
