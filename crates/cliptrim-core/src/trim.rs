// crates/cliptrim-core/src/trim.rs
//
// Trim window over a single clip. Fields are private so the clamping in
// set_start/set_end is the only way to move the handles — after any
// mutation `0 <= start < end <= duration` holds.

use serde::{Deserialize, Serialize};

/// Minimum width of the trim window, in seconds.
const MIN_GAP_SECS: f64 = 1.0;

/// Handles within this distance of the clip edges count as "not trimmed".
/// Absorbs media-clock jitter so a stray 0.03s seek doesn't arm the
/// trim-in-place button.
const TRIM_EPSILON: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimModel {
    start: f64,
    end: f64,
    duration: f64,
}

impl TrimModel {
    pub fn new(duration: f64) -> Self {
        let duration = duration.max(MIN_GAP_SECS);
        Self { start: 0.0, end: duration, duration }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Move the in-point. Clamped to `[0, end - 1s]`; never rejected.
    pub fn set_start(&mut self, t: f64) {
        self.start = t.clamp(0.0, self.end - MIN_GAP_SECS);
    }

    /// Move the out-point. Clamped to `[start + 1s, duration]`; never rejected.
    pub fn set_end(&mut self, t: f64) {
        self.end = t.clamp(self.start + MIN_GAP_SECS, self.duration);
    }

    /// Refine the duration once real metadata arrives. An out-point still
    /// sitting at the old edge follows the new one.
    pub fn set_duration(&mut self, d: f64) {
        let d = d.max(MIN_GAP_SECS);
        let at_edge = self.end >= self.duration - TRIM_EPSILON;
        self.duration = d;
        if at_edge || self.end > d {
            self.end = d;
        }
        if self.start > self.end - MIN_GAP_SECS {
            self.start = (self.end - MIN_GAP_SECS).max(0.0);
        }
    }

    /// Back to the whole clip. Used after a successful trim-in-place.
    pub fn reset(&mut self, new_duration: f64) {
        *self = Self::new(new_duration);
    }

    /// True when either handle has moved meaningfully off the clip edges.
    pub fn has_trim_range(&self) -> bool {
        self.start > TRIM_EPSILON || self.end < self.duration - TRIM_EPSILON
    }

    /// Is `t` inside the trim window? Half-open: `end` itself is outside.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }

    pub fn span(&self) -> f64 {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_survives_hostile_input() {
        let mut m = TrimModel::new(120.0);
        m.set_start(500.0);
        assert!(m.start() < m.end());
        m.set_end(-50.0);
        assert!(m.start() < m.end());
        assert!(m.end() <= m.duration());
        m.set_start(f64::NEG_INFINITY);
        assert_eq!(m.start(), 0.0);
        m.set_end(f64::INFINITY);
        assert_eq!(m.end(), 120.0);
    }

    #[test]
    fn handles_keep_one_second_apart() {
        let mut m = TrimModel::new(60.0);
        m.set_end(10.0);
        m.set_start(9.9);
        assert_eq!(m.start(), 9.0);
        m.set_end(9.2);
        assert_eq!(m.end(), 10.0);
    }

    #[test]
    fn untrimmed_clip_reports_no_range() {
        let m = TrimModel::new(120.0);
        assert!(!m.has_trim_range());
    }

    #[test]
    fn epsilon_boundary() {
        let mut m = TrimModel::new(120.0);
        m.set_start(0.05);
        assert!(!m.has_trim_range());
        m.set_start(0.2);
        assert!(m.has_trim_range());

        let mut m = TrimModel::new(120.0);
        m.set_end(119.95);
        assert!(!m.has_trim_range());
        m.set_end(119.0);
        assert!(m.has_trim_range());
    }

    #[test]
    fn interior_window_reports_range() {
        let mut m = TrimModel::new(120.0);
        m.set_start(10.0);
        m.set_end(110.0);
        assert!(m.has_trim_range());
        assert_eq!(m.span(), 100.0);
    }

    #[test]
    fn duration_refinement_follows_edge() {
        let mut m = TrimModel::new(1.0);
        m.set_duration(83.5);
        assert_eq!(m.end(), 83.5);
        assert!(!m.has_trim_range());

        // A deliberately moved out-point stays put.
        let mut m = TrimModel::new(120.0);
        m.set_end(30.0);
        m.set_duration(120.5);
        assert_eq!(m.end(), 30.0);
    }

    #[test]
    fn reset_clears_everything() {
        let mut m = TrimModel::new(120.0);
        m.set_start(10.0);
        m.set_end(40.0);
        m.reset(30.0);
        assert_eq!(m.start(), 0.0);
        assert_eq!(m.end(), 30.0);
        assert!(!m.has_trim_range());
    }

    #[test]
    fn contains_is_half_open() {
        let mut m = TrimModel::new(60.0);
        m.set_start(5.0);
        m.set_end(15.0);
        assert!(m.contains(5.0));
        assert!(m.contains(14.99));
        assert!(!m.contains(15.0));
        assert!(!m.contains(4.9));
    }
}
