//! Entities module - interval model and its file formats.
//!
//! Each entity is plain data; edits go through `core::commands`:
//! - Interval / QueryGroup / Step: what is drawn on the lanes
//! - Project: the single timeline-of-truth for one video
//! - loader / dataset: inference results in and out, dataset export

pub mod dataset;
pub mod group;
pub mod interval;
pub mod lane;
pub mod loader;
pub mod project;
pub mod query;
pub mod step;
pub mod video;

pub use dataset::{Dataset, DatasetBuilder, export_dataset};
pub use group::QueryGroup;
pub use interval::{Interval, IntervalId, OwnerRef};
pub use lane::{HandFilter, Lane, LaneKind, LaneSource};
pub use loader::{LoadReport, ResultsLoader};
pub use project::Project;
pub use query::{HandType, ParsedAction, build_query_text, parse_query};
pub use step::{Step, StepList};
pub use video::VideoContext;
