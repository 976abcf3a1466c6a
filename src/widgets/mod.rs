//! Interaction widgets.

pub mod timeline;
