//! Inference results loader/saver.
//!
//! Accepted input shapes (all JSON):
//! - `{video_path, total_queries, results: [record, ...]}`
//! - `[record, ...]`
//! - a single bare `record`
//!
//! where a record is `{query, vid, pred_relevant_windows: [[start, end, score], ...],
//! pred_saliency_scores: [...]}`. Saving always writes the first shape.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::group::QueryGroup;
use super::interval::Interval;
use super::project::Project;
use super::query;
use crate::error::LoadError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    pub query: String,
    #[serde(default)]
    pub vid: String,
    #[serde(default)]
    pub pred_relevant_windows: Vec<Vec<f64>>,
    #[serde(default)]
    pub pred_saliency_scores: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsFile {
    #[serde(default)]
    pub video_path: Option<String>,
    #[serde(default)]
    pub total_queries: Option<usize>,
    pub results: Vec<ResultRecord>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ResultsDocument {
    File(ResultsFile),
    List(Vec<ResultRecord>),
    Single(ResultRecord),
}

impl ResultsDocument {
    fn into_parts(self) -> (Option<String>, Vec<ResultRecord>) {
        match self {
            ResultsDocument::File(f) => (f.video_path, f.results),
            ResultsDocument::List(records) => (None, records),
            ResultsDocument::Single(record) => (None, vec![record]),
        }
    }
}

/// Loaded project plus every non-fatal problem met on the way.
#[derive(Debug)]
pub struct LoadReport {
    pub project: Project,
    pub issues: Vec<LoadError>,
}

/// Results loader with JSON backend
pub struct ResultsLoader;

impl ResultsLoader {
    /// Read and ingest a results file.
    pub fn load(path: &Path) -> Result<LoadReport> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read results file: {}", path.display()))?;
        let report = Self::parse(&text)
            .with_context(|| format!("Failed to parse results file: {}", path.display()))?;
        info!(
            "Loaded {} queries from {} ({} issues)",
            report.project.groups.len(),
            path.display(),
            report.issues.len()
        );
        Ok(report)
    }

    /// Ingest results JSON text. Malformed windows are skipped and reported;
    /// malformed queries are kept (they land in the `None` lane) and reported.
    pub fn parse(text: &str) -> Result<LoadReport> {
        let doc: ResultsDocument = serde_json::from_str(text).context("Unrecognized results JSON shape")?;
        let (video_path, records) = doc.into_parts();

        let video_name = records.first().map(|r| r.vid.clone()).unwrap_or_default();
        let mut project = Project::new(video_name);
        project.video_path = video_path.unwrap_or_default();
        let mut issues = Vec::new();

        for (index, record) in records.into_iter().enumerate() {
            let mut group = QueryGroup::new(record.query, record.vid);
            group.saliency_scores = record.pred_saliency_scores;
            group.query_index = Some(index);

            for (w, window) in record.pred_relevant_windows.iter().enumerate() {
                let [start, end, score] = match window.as_slice() {
                    [s, e, c] => [*s, *e, *c],
                    other => {
                        issues.push(LoadError::WindowShape {
                            record: index,
                            window: w,
                            len: other.len(),
                        });
                        continue;
                    }
                };
                if !(start.is_finite() && end.is_finite() && score.is_finite()) || start >= end {
                    issues.push(LoadError::WindowRange {
                        record: index,
                        window: w,
                        start,
                        end,
                    });
                    continue;
                }
                group.push_interval(Interval::new(start, end, score));
            }

            if !query::is_step_marker(&group.query_text) {
                if let Err(e) = group.parsed() {
                    warn!("Query {} rejected: {}", index, e);
                    issues.push(LoadError::Query(e));
                }
            }
            debug!(
                "Ingested query {} '{}' with {} windows",
                index,
                group.query_text,
                group.relevant_windows.len()
            );
            project.add_group(group);
        }

        Ok(LoadReport { project, issues })
    }

    /// Serialize the project back into the canonical results shape.
    pub fn to_results(project: &Project) -> ResultsFile {
        let results: Vec<ResultRecord> = project
            .groups
            .values()
            .map(|g| ResultRecord {
                query: g.query_text.clone(),
                vid: g.video_id.clone(),
                pred_relevant_windows: g
                    .relevant_windows
                    .iter()
                    .map(|i| vec![i.start_time, i.end_time, i.confidence_score])
                    .collect(),
                pred_saliency_scores: g.saliency_scores.clone(),
            })
            .collect();

        ResultsFile {
            video_path: (!project.video_path.is_empty()).then(|| project.video_path.clone()),
            total_queries: Some(results.len()),
            results,
        }
    }

    pub fn to_json(project: &Project) -> Result<String> {
        serde_json::to_string_pretty(&Self::to_results(project)).context("Failed to serialize results")
    }

    pub fn save(project: &Project, path: &Path) -> Result<()> {
        let json = Self::to_json(project)?;
        fs::write(path, json).with_context(|| format!("Failed to write results file: {}", path.display()))?;
        info!("Saved {} queries to {}", project.groups.len(), path.display());
        Ok(())
    }
}
