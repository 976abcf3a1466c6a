//! Timeline helpers: drag modes, pixel/time math, snapping and constraint checks.

use super::timeline::CursorHint;
use crate::entities::Interval;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    ResizeStart,
    ResizeEnd,
    Move,
}

impl DragMode {
    /// Cursor while hovering (`active == false`) or dragging in this mode.
    pub fn cursor(&self, active: bool) -> CursorHint {
        match self {
            DragMode::ResizeStart | DragMode::ResizeEnd => CursorHint::ResizeHorizontal,
            DragMode::Move if active => CursorHint::Grabbing,
            DragMode::Move => CursorHint::Grab,
        }
    }
}

/// Which part of an interval bar the pointer is on. Start edge wins ties.
pub fn detect_drag_mode(x: f64, start_x: f64, end_x: f64, edge_threshold: f64) -> DragMode {
    if (x - start_x).abs() <= edge_threshold {
        DragMode::ResizeStart
    } else if (x - end_x).abs() <= edge_threshold {
        DragMode::ResizeEnd
    } else {
        DragMode::Move
    }
}

pub fn time_to_x(time: f64, width: f64, duration: f64) -> f64 {
    if duration <= 0.0 {
        return 0.0;
    }
    time * width / duration
}

pub fn x_to_time(x: f64, width: f64, duration: f64) -> f64 {
    if width <= 0.0 {
        return 0.0;
    }
    x * duration / width
}

/// First interval containing `time` (closed range) at or above `threshold`.
pub fn find_interval_at(intervals: &[Interval], time: f64, threshold: f64) -> Option<&Interval> {
    intervals
        .iter()
        .find(|i| i.confidence_score >= threshold && i.contains(time))
}

/// Time-scale tick spacing for a video of `duration` seconds.
pub fn tick_spacing(duration: f64) -> f64 {
    if duration <= 10.0 {
        1.0
    } else if duration <= 60.0 {
        5.0
    } else if duration <= 300.0 {
        10.0
    } else if duration <= 600.0 {
        30.0
    } else {
        60.0
    }
}

/// Upper bound on drawn ticks. Longer videos get proportionally wider spacing.
pub const MAX_TICKS: usize = 10_000;

/// Spacing actually used for ticks: `tick_spacing`, widened so a video never
/// carries more than `MAX_TICKS` of them.
pub fn tick_step(duration: f64) -> f64 {
    let base = tick_spacing(duration);
    let n = (duration / base).floor();
    if n > MAX_TICKS as f64 {
        base * (n / MAX_TICKS as f64).ceil()
    } else {
        base
    }
}

/// Tick times from 0 up to and including `duration`.
pub fn tick_times(duration: f64) -> Vec<f64> {
    if duration <= 0.0 || !duration.is_finite() {
        return Vec::new();
    }
    let step = tick_step(duration);
    let count = (duration / step).floor().min(MAX_TICKS as f64) as usize;
    (0..=count).map(|i| i as f64 * step).collect()
}

/// Tick closest to `time`, without building the tick list.
pub fn nearest_tick(time: f64, duration: f64) -> Option<f64> {
    if duration <= 0.0 || !duration.is_finite() || !time.is_finite() {
        return None;
    }
    let step = tick_step(duration);
    let last = (duration / step).floor().min(MAX_TICKS as f64) * step;
    Some(((time / step).round() * step).clamp(0.0, last))
}

/// Snap targets: sibling boundaries, then ticks.
pub fn snap_candidates(siblings: &[Interval], ticks: &[f64]) -> Vec<f64> {
    siblings
        .iter()
        .flat_map(|i| [i.start_time, i.end_time])
        .chain(ticks.iter().copied())
        .collect()
}

/// Nearest candidate within `threshold` of `target`. Earlier candidates win ties.
pub fn find_snap(target: f64, candidates: &[f64], threshold: f64) -> Option<f64> {
    let mut best: Option<(f64, f64)> = None;
    for &c in candidates {
        let d = (target - c).abs();
        if d <= threshold && best.is_none_or(|(_, bd)| d < bd) {
            best = Some((c, d));
        }
    }
    best.map(|(c, _)| c)
}

/// Half-open overlap against every sibling.
pub fn overlaps_any(start: f64, end: f64, siblings: &[Interval]) -> bool {
    siblings.iter().any(|s| s.overlaps_range(start, end))
}

/// Shift `original` by `delta`, clamped into `[0, duration]` without changing its length.
///
/// The length is kept up to float rounding: `end - start` may differ from the
/// original length by a couple of ulps of the larger bound. A move that lands
/// back on the original start returns `original` unchanged, and a move clamped
/// at the video end ends exactly on `duration`.
pub fn move_bounds(original: (f64, f64), delta: f64, duration: f64) -> (f64, f64) {
    let length = original.1 - original.0;
    let max_start = (duration - length).max(0.0);
    let start = (original.0 + delta).clamp(0.0, max_start);
    if start == original.0 {
        return original;
    }
    (start, (start + length).min(duration.max(length)))
}

/// New start for a start-edge resize: clamped to `[0, end - min]`, then passed
/// to `snap`. A snapped value that breaks the minimum duration is ignored.
pub fn resize_start(time: f64, end: f64, min_duration: f64, snap: impl Fn(f64) -> Option<f64>) -> f64 {
    let limit = (end - min_duration).max(0.0);
    let start = time.clamp(0.0, limit);
    match snap(start) {
        Some(s) if (0.0..=limit).contains(&s) => s,
        _ => start,
    }
}

/// New end for an end-edge resize: clamped to `[start + min, duration]`, then
/// snapped under the same rule.
pub fn resize_end(
    time: f64,
    start: f64,
    min_duration: f64,
    duration: f64,
    snap: impl Fn(f64) -> Option<f64>,
) -> f64 {
    let floor = (start + min_duration).min(duration);
    let end = time.clamp(floor, duration);
    match snap(end) {
        Some(s) if (floor..=duration).contains(&s) => s,
        _ => end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_time_round_trip() {
        assert_eq!(x_to_time(350.0, 1000.0, 100.0), 35.0);
        assert_eq!(time_to_x(35.0, 1000.0, 100.0), 350.0);
        assert_eq!(x_to_time(10.0, 0.0, 100.0), 0.0);
        assert_eq!(time_to_x(10.0, 1000.0, 0.0), 0.0);
    }

    #[test]
    fn test_detect_drag_mode() {
        // bar from 200px to 500px
        assert_eq!(detect_drag_mode(195.0, 200.0, 500.0, 10.0), DragMode::ResizeStart);
        assert_eq!(detect_drag_mode(210.0, 200.0, 500.0, 10.0), DragMode::ResizeStart);
        assert_eq!(detect_drag_mode(211.0, 200.0, 500.0, 10.0), DragMode::Move);
        assert_eq!(detect_drag_mode(495.0, 200.0, 500.0, 10.0), DragMode::ResizeEnd);
        // Narrow bar: start wins.
        assert_eq!(detect_drag_mode(205.0, 200.0, 208.0, 10.0), DragMode::ResizeStart);
    }

    #[test]
    fn test_find_interval_respects_threshold_and_order() {
        let ivs = [
            Interval::new(0.0, 10.0, 0.2),
            Interval::new(5.0, 8.0, 0.9),
            Interval::new(6.0, 9.0, 0.9),
        ];
        assert_eq!(find_interval_at(&ivs, 7.0, 0.5).map(|i| i.start_time), Some(5.0));
        assert_eq!(find_interval_at(&ivs, 7.0, 0.0).map(|i| i.start_time), Some(0.0));
        assert!(find_interval_at(&ivs, 11.0, 0.0).is_none());
    }

    #[test]
    fn test_ticks() {
        assert_eq!(tick_spacing(10.0), 1.0);
        assert_eq!(tick_spacing(10.5), 5.0);
        assert_eq!(tick_spacing(300.0), 10.0);
        assert_eq!(tick_spacing(601.0), 60.0);
        assert_eq!(tick_times(12.0), vec![0.0, 5.0, 10.0]);
        assert_eq!(tick_times(5.0).len(), 6);
        assert!(tick_times(0.0).is_empty());
    }

    #[test]
    fn test_nearest_tick() {
        assert_eq!(nearest_tick(3.0, 12.0), Some(5.0));
        assert_eq!(nearest_tick(7.4, 12.0), Some(5.0));
        // 15 would be past the last tick at 10.
        assert_eq!(nearest_tick(11.9, 12.0), Some(10.0));
        assert_eq!(nearest_tick(-3.0, 12.0), Some(0.0));
        assert_eq!(nearest_tick(1.0, 0.0), None);
        for t in tick_times(250.0) {
            assert_eq!(nearest_tick(t + 0.4, 250.0), Some(t));
        }
    }

    #[test]
    fn test_huge_duration_ticks_are_bounded() {
        let duration = 1e30;
        let ticks = tick_times(duration);
        assert!(ticks.len() <= MAX_TICKS + 1);
        assert!(ticks.len() > 1);
        assert!(ticks.windows(2).all(|w| w[1] > w[0]));
        assert!(*ticks.last().unwrap() <= duration);

        let t = nearest_tick(4.2e29, duration).unwrap();
        assert!(t.is_finite());
        assert!((0.0..=duration).contains(&t));
        assert!((t - 4.2e29).abs() <= tick_step(duration));
    }

    #[test]
    fn test_snap_picks_nearest() {
        let c = [1.0, 1.05, 3.0];
        assert_eq!(find_snap(1.04, &c, 0.2), Some(1.05));
        assert_eq!(find_snap(0.9, &c, 0.2), Some(1.0));
        assert_eq!(find_snap(2.0, &c, 0.2), None);
    }

    #[test]
    fn test_move_preserves_length() {
        assert_eq!(move_bounds((2.0, 5.0), 3.0, 100.0), (5.0, 8.0));
        assert_eq!(move_bounds((2.0, 5.0), -10.0, 100.0), (0.0, 3.0));
        assert_eq!(move_bounds((90.0, 95.0), 20.0, 100.0), (95.0, 100.0));
    }

    #[test]
    fn test_move_length_within_rounding() {
        let original = (0.1 / 7.0, 0.1 / 7.0 + 0.3);
        let length = original.1 - original.0;

        for delta in [0.1 / 7.0, 1.0 / 3.0, 0.7, -0.1 / 7.0 / 3.0] {
            let (s, e) = move_bounds(original, delta, 100.0);
            assert!(((e - s) - length).abs() <= 4.0 * f64::EPSILON, "delta {delta}");
        }

        assert_eq!(move_bounds(original, 0.0, 100.0), original);

        let duration = 100.0 / 3.0;
        let (s, e) = move_bounds(original, 1e3, duration);
        assert_eq!(e, duration);
        assert!(((e - s) - length).abs() <= 4.0 * f64::EPSILON * duration);
    }

    #[test]
    fn test_resize_clamps_and_snaps() {
        let none = |_: f64| -> Option<f64> { None };
        assert_eq!(resize_start(4.99, 5.0, 0.1, none), 4.9);
        assert_eq!(resize_start(-1.0, 5.0, 0.1, none), 0.0);
        assert_eq!(resize_start(1.0, 5.0, 0.1, |_| Some(1.05)), 1.05);
        // Snap would break the minimum: ignored.
        assert_eq!(resize_start(4.8, 5.0, 0.1, |_| Some(4.95)), 4.8);

        assert_eq!(resize_end(200.0, 2.0, 0.1, 100.0, none), 100.0);
        assert_eq!(resize_end(2.05, 2.0, 0.1, 100.0, none), 2.1);
        assert_eq!(resize_end(6.9, 2.0, 0.1, 100.0, |_| Some(7.0)), 7.0);
    }

    #[test]
    fn test_overlaps_any() {
        let sib = [Interval::new(6.0, 8.0, 1.0)];
        assert!(overlaps_any(2.0, 7.0, &sib));
        assert!(!overlaps_any(2.0, 6.0, &sib));
        assert!(!overlaps_any(8.0, 9.0, &sib));
    }
}
