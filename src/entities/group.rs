//! QueryGroup - one query and the intervals detected for it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::interval::{Interval, IntervalId, OwnerRef};
use super::query::{self, ParsedAction};
use crate::error::QueryFormatError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryGroup {
    pub id: Uuid,
    pub query_text: String,
    pub video_id: String,
    pub relevant_windows: Vec<Interval>,
    /// Advisory, carried through save unchanged.
    #[serde(default)]
    pub saliency_scores: Vec<f64>,
    #[serde(default)]
    pub query_index: Option<usize>,
}

impl QueryGroup {
    pub fn new(query_text: impl Into<String>, video_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            query_text: query_text.into(),
            video_id: video_id.into(),
            relevant_windows: Vec::new(),
            saliency_scores: Vec::new(),
            query_index: None,
        }
    }

    /// Append an interval, stamping this group as its owner.
    pub fn push_interval(&mut self, interval: Interval) -> IntervalId {
        let interval = interval.with_owner(OwnerRef::Group(self.id));
        let id = interval.id;
        self.relevant_windows.push(interval);
        id
    }

    pub fn with_intervals(mut self, intervals: impl IntoIterator<Item = Interval>) -> Self {
        for interval in intervals {
            self.push_interval(interval);
        }
        self
    }

    pub fn index_of(&self, id: IntervalId) -> Option<usize> {
        self.relevant_windows.iter().position(|i| i.id == id)
    }

    pub fn interval(&self, id: IntervalId) -> Option<&Interval> {
        self.relevant_windows.iter().find(|i| i.id == id)
    }

    pub fn interval_mut(&mut self, id: IntervalId) -> Option<&mut Interval> {
        self.relevant_windows.iter_mut().find(|i| i.id == id)
    }

    /// Remove by id, returning the index it occupied and the interval.
    pub fn remove_interval(&mut self, id: IntervalId) -> Option<(usize, Interval)> {
        let index = self.index_of(id)?;
        Some((index, self.relevant_windows.remove(index)))
    }

    /// Insert at `index`, clamped to the current length.
    pub fn insert_interval(&mut self, index: usize, interval: Interval) {
        let at = index.min(self.relevant_windows.len());
        let interval = interval.with_owner(OwnerRef::Group(self.id));
        self.relevant_windows.insert(at, interval);
    }

    pub fn contains(&self, id: IntervalId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn is_step_marker(&self) -> bool {
        query::is_step_marker(&self.query_text)
    }

    /// Parsed action fields, derived fresh from the current text.
    pub fn parsed(&self) -> Result<ParsedAction, QueryFormatError> {
        query::parse_query(&self.query_text)
    }

    /// Intervals at or above `threshold`, in stored order.
    pub fn visible_intervals(&self, threshold: f64) -> impl Iterator<Item = &Interval> {
        self.relevant_windows
            .iter()
            .filter(move |i| i.confidence_score >= threshold)
    }

    /// End of the latest interval, if any.
    pub fn latest_end(&self) -> Option<f64> {
        self.relevant_windows
            .iter()
            .map(|i| i.end_time)
            .fold(None, |acc, e| Some(acc.map_or(e, |a: f64| a.max(e))))
    }
}
