//! Structured dataset export.
//!
//! ```text
//! {
//!   info: {description, version, data_created},
//!   database: {<video_name>: {subset, duration, fps,
//!                             actions: {left_hand: [...], right_hand: [...], both_hands: [...], unspecified: [...]},
//!                             steps: [...]}},
//!   action_categories: [{id, interaction}],
//!   step_categories: [{id, step}]
//! }
//! ```
//!
//! Category ids start at 1 and are handed out in first-seen order, keyed by the
//! exact text (the full query text for actions, the step text for steps).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::project::Project;
use super::query::{HandType, ParsedAction};
use super::video::time_to_frame;
use crate::error::QueryFormatError;

pub const DATASET_DESCRIPTION: &str = "STT Dataset 2025";
pub const DATASET_VERSION: f64 = 1.0;
pub const DEFAULT_SUBSET: &str = "train";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub description: String,
    pub version: f64,
    pub data_created: String,
}

impl Default for DatasetInfo {
    fn default() -> Self {
        Self {
            description: DATASET_DESCRIPTION.to_string(),
            version: DATASET_VERSION,
            data_created: chrono::Local::now().format("%Y/%m/%d").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionData {
    pub action_verb: String,
    pub manipulated_object: Option<String>,
    pub target_object: Option<String>,
    pub tool: Option<String>,
}

impl From<ParsedAction> for ActionData {
    fn from(p: ParsedAction) -> Self {
        Self {
            action_verb: p.verb,
            manipulated_object: p.manipulated_object,
            target_object: p.target_object,
            tool: p.tool,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEntry {
    pub action: ActionData,
    /// Reserved, always empty on export.
    #[serde(default)]
    pub ids: Vec<u32>,
    pub id: u32,
    pub segment: [f64; 2],
    pub segment_frames: [i64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEntry {
    pub step: String,
    pub id: u32,
    pub segment: [f64; 2],
    pub segment_frames: [i64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoData {
    pub subset: String,
    pub duration: f64,
    pub fps: f64,
    pub actions: IndexMap<String, Vec<ActionEntry>>,
    pub steps: Vec<StepEntry>,
}

impl VideoData {
    fn new(subset: &str, duration: f64, fps: f64) -> Self {
        Self {
            subset: subset.to_string(),
            duration,
            fps,
            actions: HandType::ALL
                .iter()
                .map(|h| (h.dataset_key().to_string(), Vec::new()))
                .collect(),
            steps: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCategory {
    pub id: u32,
    pub interaction: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepCategory {
    pub id: u32,
    pub step: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub info: DatasetInfo,
    pub database: IndexMap<String, VideoData>,
    pub action_categories: Vec<ActionCategory>,
    pub step_categories: Vec<StepCategory>,
}

/// Accumulates projects into one dataset, sharing category ids across videos.
#[derive(Debug, Default)]
pub struct DatasetBuilder {
    dataset: Dataset,
    action_ids: IndexMap<String, u32>,
    step_ids: IndexMap<String, u32>,
}

impl DatasetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn action_category(&mut self, interaction: &str) -> u32 {
        if let Some(id) = self.action_ids.get(interaction) {
            return *id;
        }
        let id = self.action_ids.len() as u32 + 1;
        self.action_ids.insert(interaction.to_string(), id);
        self.dataset.action_categories.push(ActionCategory {
            id,
            interaction: interaction.to_string(),
        });
        id
    }

    fn step_category(&mut self, step: &str) -> u32 {
        if let Some(id) = self.step_ids.get(step) {
            return *id;
        }
        let id = self.step_ids.len() as u32 + 1;
        self.step_ids.insert(step.to_string(), id);
        self.dataset.step_categories.push(StepCategory {
            id,
            step: step.to_string(),
        });
        id
    }

    /// Add one video. Intervals below `threshold` are left out. Step-marker
    /// groups are skipped; malformed queries are skipped and returned.
    pub fn add_project(&mut self, project: &Project, subset: &str, threshold: f64) -> Result<Vec<QueryFormatError>> {
        let Some(video) = project.video else {
            bail!("Cannot export '{}': no video metadata loaded", project.video_name);
        };
        let fps = video.fps();
        let mut data = VideoData::new(subset, video.duration(), fps);
        let mut invalid = Vec::new();

        for group in project.groups.values() {
            if group.is_step_marker() {
                continue;
            }
            let parsed = match group.parsed() {
                Ok(p) => p,
                Err(e) => {
                    warn!("Skipping query in export: {}", e);
                    invalid.push(e);
                    continue;
                }
            };
            let hand_key = parsed.hand.dataset_key();
            let action_id = self.action_category(&group.query_text);
            let action = ActionData::from(parsed);

            let entries = data.actions.entry(hand_key.to_string()).or_default();
            for interval in group.visible_intervals(threshold) {
                entries.push(ActionEntry {
                    action: action.clone(),
                    ids: Vec::new(),
                    id: action_id,
                    segment: [interval.start_time, interval.end_time],
                    segment_frames: [
                        time_to_frame(interval.start_time, fps),
                        time_to_frame(interval.end_time, fps),
                    ],
                });
            }
        }

        for step in &project.steps.steps {
            let id = self.step_category(&step.text);
            let [start, end] = step.segment;
            data.steps.push(StepEntry {
                step: step.text.clone(),
                id,
                segment: step.segment,
                segment_frames: [time_to_frame(start, fps), time_to_frame(end, fps)],
            });
        }

        self.dataset.database.insert(project.video_name.clone(), data);
        Ok(invalid)
    }

    /// Stamp today's date and hand out the dataset.
    pub fn finish(mut self) -> Dataset {
        self.dataset.info = DatasetInfo::default();
        self.dataset
    }
}

/// Write the dataset as pretty JSON.
pub fn export_dataset(dataset: &Dataset, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(dataset).context("Failed to serialize dataset")?;
    fs::write(path, json).with_context(|| format!("Failed to write dataset: {}", path.display()))?;
    info!(
        "Exported dataset: {} videos, {} action categories, {} step categories -> {}",
        dataset.database.len(),
        dataset.action_categories.len(),
        dataset.step_categories.len(),
        path.display()
    );
    Ok(())
}
