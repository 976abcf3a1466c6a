//! SEGMARK - video timeline interval annotator
//!
//! Re-exports all modules for use by the binary and tests.

// Core engine (events, commands, undo, coordination)
pub mod core;

// App modules
pub mod cli;
pub mod config;
pub mod entities;
pub mod error;
pub mod session;
pub mod widgets;

// Re-export commonly used types from core
pub use core::commands::{Command, EditCommand, EditContext};
pub use core::coordinator::EventCoordinator;
pub use core::event_bus::{downcast_event, BoxedEvent, EventBus, EventEmitter};
pub use core::undo::UndoStack;

// Re-export entities
pub use entities::{Interval, IntervalId, Project, QueryGroup, Step, VideoContext};
pub use error::{ConstraintRejection, LoadError, QueryFormatError};
pub use session::{ActionForm, EditSession, GestureOutcome, StepForm};
