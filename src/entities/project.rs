//! Project: the single timeline-of-truth for one video.
//!
//! Holds the video metadata, every QueryGroup (ordered as loaded) and the
//! per-video step list. Commands and live drag feedback are the only writers.

use indexmap::IndexMap;
use uuid::Uuid;

use super::group::QueryGroup;
use super::interval::{Interval, IntervalId, OwnerRef};
use super::lane::{HandFilter, Lane, LaneKind};
use super::step::StepList;
use super::video::VideoContext;
use crate::error::QueryFormatError;

#[derive(Debug, Clone, Default)]
pub struct Project {
    pub video: Option<VideoContext>,
    pub video_name: String,
    pub video_path: String,
    pub groups: IndexMap<Uuid, QueryGroup>,
    pub steps: StepList,
}

impl Project {
    pub fn new(video_name: impl Into<String>) -> Self {
        Self {
            video_name: video_name.into(),
            ..Default::default()
        }
    }

    /// Install (or replace) the video metadata. Step frames are re-derived.
    pub fn set_video(&mut self, video: VideoContext) {
        log::info!(
            "Project '{}': video set (duration={:.3}s, fps={:.3})",
            self.video_name,
            video.duration(),
            video.fps()
        );
        self.steps.set_fps(video.fps());
        self.video = Some(video);
    }

    /// Duration of the loaded video, 0 when none is loaded.
    pub fn duration(&self) -> f64 {
        self.video.map(|v| v.duration()).unwrap_or(0.0)
    }

    pub fn fps(&self) -> Option<f64> {
        self.video.map(|v| v.fps())
    }

    // === Groups ===

    /// Add a group, re-stamping interval owners with its id.
    pub fn add_group(&mut self, mut group: QueryGroup) -> Uuid {
        let id = group.id;
        for interval in &mut group.relevant_windows {
            interval.owner = Some(OwnerRef::Group(id));
        }
        self.groups.insert(id, group);
        id
    }

    pub fn group(&self, id: Uuid) -> Option<&QueryGroup> {
        self.groups.get(&id)
    }

    pub fn group_mut(&mut self, id: Uuid) -> Option<&mut QueryGroup> {
        self.groups.get_mut(&id)
    }

    /// Group that currently holds the interval.
    pub fn group_of(&self, id: IntervalId) -> Option<&QueryGroup> {
        self.groups.values().find(|g| g.contains(id))
    }

    // === Intervals ===

    /// Owner of an interval, found structurally by id.
    pub fn owner_of(&self, id: IntervalId) -> Option<OwnerRef> {
        if let Some(group) = self.group_of(id) {
            return Some(OwnerRef::Group(group.id));
        }
        self.steps.get(id).map(|_| OwnerRef::Steps)
    }

    /// Snapshot of an interval (step intervals are synthesized).
    pub fn interval(&self, id: IntervalId) -> Option<Interval> {
        if let Some(iv) = self.group_of(id).and_then(|g| g.interval(id)) {
            return Some(iv.clone());
        }
        self.steps.get(id).map(|s| s.to_interval())
    }

    /// Every interval owned by `owner`.
    pub fn owned_intervals(&self, owner: OwnerRef) -> Vec<Interval> {
        match owner {
            OwnerRef::Group(gid) => self
                .group(gid)
                .map(|g| g.relevant_windows.clone())
                .unwrap_or_default(),
            OwnerRef::Steps => self.steps.intervals(),
        }
    }

    /// Intervals sharing an owner with `id`, excluding `id` itself.
    pub fn siblings(&self, id: IntervalId) -> Vec<Interval> {
        match self.owner_of(id) {
            Some(owner) => self
                .owned_intervals(owner)
                .into_iter()
                .filter(|i| i.id != id)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Write bounds in place. Returns false if the interval is gone.
    pub fn set_interval_bounds(&mut self, id: IntervalId, start: f64, end: f64) -> bool {
        if self.steps.set_segment(id, start, end) {
            return true;
        }
        for group in self.groups.values_mut() {
            if let Some(iv) = group.interval_mut(id) {
                iv.set_bounds(start, end);
                return true;
            }
        }
        false
    }

    /// Resolve an interval's owner into its lane source.
    pub fn resolve_owner(&self, id: IntervalId) -> Option<Lane<'_>> {
        match self.owner_of(id)? {
            OwnerRef::Group(gid) => self.group(gid).map(Lane::Action),
            OwnerRef::Steps => self.steps.get(id).map(Lane::Step),
        }
    }

    // === Lanes and filtering ===

    /// Action groups per lane, every action lane present (possibly empty).
    pub fn groups_by_lane(&self) -> IndexMap<LaneKind, Vec<&QueryGroup>> {
        let mut lanes: IndexMap<LaneKind, Vec<&QueryGroup>> = LaneKind::ACTION_LANES
            .iter()
            .map(|k| (*k, Vec::new()))
            .collect();
        for group in self.groups.values() {
            lanes
                .entry(LaneKind::for_query(&group.query_text))
                .or_default()
                .push(group);
        }
        lanes
    }

    pub fn lane_groups(&self, kind: LaneKind) -> Vec<&QueryGroup> {
        if kind.is_steps() {
            return Vec::new();
        }
        self.groups
            .values()
            .filter(|g| LaneKind::for_query(&g.query_text) == kind)
            .collect()
    }

    /// All intervals shown on a lane, in render order.
    pub fn lane_intervals(&self, kind: LaneKind) -> Vec<Interval> {
        if kind.is_steps() {
            return self.steps.intervals();
        }
        self.lane_groups(kind)
            .into_iter()
            .flat_map(|g| g.relevant_windows.iter().cloned())
            .collect()
    }

    /// Groups matching `filter`, with intervals below `threshold` dropped.
    /// Groups left with no intervals are kept.
    pub fn filtered_groups(&self, filter: HandFilter, threshold: f64) -> Vec<QueryGroup> {
        self.groups
            .values()
            .filter(|g| filter.matches(&g.query_text))
            .map(|g| {
                let mut view = g.clone();
                view.relevant_windows.retain(|i| i.confidence_score >= threshold);
                view
            })
            .collect()
    }

    // === Validation ===

    /// Format errors of every non-step query, in group order.
    pub fn validate_queries(&self) -> Vec<QueryFormatError> {
        self.groups
            .values()
            .filter(|g| !g.is_step_marker())
            .filter_map(|g| g.parsed().err())
            .collect()
    }

    /// Human-readable list of broken interval invariants. Empty when healthy.
    pub fn invariant_violations(&self) -> Vec<String> {
        let duration = self.video.map(|v| v.duration());
        let mut problems = Vec::new();

        let mut check_set = |owner: &str, intervals: &[Interval]| {
            for (i, a) in intervals.iter().enumerate() {
                if a.start_time >= a.end_time {
                    problems.push(format!("{owner}: {} has start >= end", a.id));
                }
                if let Some(d) = duration {
                    if a.start_time < 0.0 || a.end_time > d {
                        problems.push(format!("{owner}: {} outside [0, {d}]", a.id));
                    }
                }
                for b in &intervals[i + 1..] {
                    if a.overlaps_with(b) {
                        problems.push(format!("{owner}: {} overlaps {}", a.id, b.id));
                    }
                }
            }
        };

        for group in self.groups.values() {
            check_set(&group.query_text, &group.relevant_windows);
        }
        check_set("Steps", &self.steps.intervals());
        problems
    }
}
