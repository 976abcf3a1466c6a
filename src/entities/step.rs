//! Steps - free-text procedural segments, one list per video.

use serde::{Deserialize, Serialize};

use super::interval::{Interval, IntervalId, OwnerRef};
use super::video::time_to_frame;

/// Steps are always fully confident.
pub const STEP_CONFIDENCE: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Id of the lane interval standing in for this step.
    #[serde(skip, default = "IntervalId::next")]
    pub id: IntervalId,
    pub text: String,
    pub segment: [f64; 2],
    pub segment_frames: [i64; 2],
}

impl Step {
    pub fn new(text: impl Into<String>, start: f64, end: f64, fps: f64) -> Self {
        Self {
            id: IntervalId::next(),
            text: text.into(),
            segment: [start, end],
            segment_frames: [time_to_frame(start, fps), time_to_frame(end, fps)],
        }
    }

    pub fn set_segment(&mut self, start: f64, end: f64, fps: f64) {
        self.segment = [start, end];
        self.segment_frames = [time_to_frame(start, fps), time_to_frame(end, fps)];
    }

    /// Lane view of this step. Shares the step's id.
    pub fn to_interval(&self) -> Interval {
        Interval {
            id: self.id,
            start_time: self.segment[0],
            end_time: self.segment[1],
            confidence_score: STEP_CONFIDENCE,
            label: Some(self.text.clone()),
            owner: Some(OwnerRef::Steps),
        }
    }
}

/// Ordered steps of one video plus the fps used to derive frame indices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepList {
    pub fps: f64,
    pub steps: Vec<Step>,
}

impl StepList {
    pub fn new(fps: f64) -> Self {
        Self { fps, steps: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn index_of(&self, id: IntervalId) -> Option<usize> {
        self.steps.iter().position(|s| s.id == id)
    }

    pub fn get(&self, id: IntervalId) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: IntervalId) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.id == id)
    }

    /// Append a step. Its frames are re-derived with this list's fps.
    pub fn push(&mut self, step: Step) {
        let step = self.conform(step);
        self.steps.push(step);
    }

    /// Insert at `index`, clamped to the current length. Frames follow this
    /// list's fps, whatever fps the step was built or captured with.
    pub fn insert(&mut self, index: usize, step: Step) {
        let at = index.min(self.steps.len());
        let step = self.conform(step);
        self.steps.insert(at, step);
    }

    fn conform(&self, mut step: Step) -> Step {
        let [s, e] = step.segment;
        step.set_segment(s, e, self.fps);
        step
    }

    /// Remove by id, returning the step and the index it occupied.
    pub fn remove(&mut self, id: IntervalId) -> Option<(usize, Step)> {
        let index = self.index_of(id)?;
        Some((index, self.steps.remove(index)))
    }

    /// Update a step's segment, recomputing frames with this list's fps.
    pub fn set_segment(&mut self, id: IntervalId, start: f64, end: f64) -> bool {
        let fps = self.fps;
        match self.get_mut(id) {
            Some(step) => {
                step.set_segment(start, end, fps);
                true
            }
            None => false,
        }
    }

    /// Re-derive every step's frames after an fps change.
    pub fn set_fps(&mut self, fps: f64) {
        self.fps = fps;
        for step in &mut self.steps {
            let [s, e] = step.segment;
            step.set_segment(s, e, fps);
        }
    }

    pub fn intervals(&self) -> Vec<Interval> {
        self.steps.iter().map(Step::to_interval).collect()
    }

    /// Next unused default label, "New Step N".
    pub fn next_default_label(&self) -> String {
        let mut n = self.steps.len() + 1;
        loop {
            let candidate = format!("New Step {}", n);
            if !self.steps.iter().any(|s| s.text == candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_follow_segment() {
        let mut list = StepList::new(30.0);
        let step = Step::new("wash", 1.0, 2.5, 30.0);
        let id = step.id;
        list.push(step);
        assert_eq!(list.get(id).unwrap().segment_frames, [30, 75]);

        assert!(list.set_segment(id, 2.0, 3.0));
        assert_eq!(list.get(id).unwrap().segment_frames, [60, 90]);

        list.set_fps(10.0);
        assert_eq!(list.get(id).unwrap().segment_frames, [20, 30]);
    }

    #[test]
    fn test_remove_then_insert_keeps_order() {
        let mut list = StepList::new(25.0);
        for (i, t) in ["a", "b", "c"].iter().enumerate() {
            list.push(Step::new(*t, i as f64, i as f64 + 0.5, 25.0));
        }
        let b = list.steps[1].id;
        let (idx, step) = list.remove(b).unwrap();
        assert_eq!(idx, 1);
        list.insert(idx, step);
        let texts: Vec<_> = list.steps.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, ["a", "b", "c"]);

        list.insert(99, Step::new("d", 9.0, 10.0, 25.0));
        assert_eq!(list.steps.last().unwrap().text, "d");
    }

    #[test]
    fn test_inserted_step_takes_list_fps() {
        let mut list = StepList::new(10.0);
        let stale = Step::new("wash", 1.0, 2.0, 30.0);
        assert_eq!(stale.segment_frames, [30, 60]);
        list.insert(0, stale);
        assert_eq!(list.steps[0].segment_frames, [10, 20]);

        list.push(Step::new("dry", 3.0, 4.0, 25.0));
        assert_eq!(list.steps[1].segment_frames, [30, 40]);
    }

    #[test]
    fn test_lane_interval_shares_id() {
        let step = Step::new("pour", 4.0, 6.0, 30.0);
        let iv = step.to_interval();
        assert_eq!(iv.id, step.id);
        assert_eq!(iv.label.as_deref(), Some("pour"));
        assert_eq!(iv.owner, Some(OwnerRef::Steps));
    }

    #[test]
    fn test_default_label_skips_taken() {
        let mut list = StepList::new(30.0);
        assert_eq!(list.next_default_label(), "New Step 1");
        list.push(Step::new("New Step 2", 0.0, 1.0, 30.0));
        assert_eq!(list.next_default_label(), "New Step 3");
        list.steps[0].text = "x".into();
        assert_eq!(list.next_default_label(), "New Step 2");
    }
}
