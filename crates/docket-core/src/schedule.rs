//! Banner publish windows.
//!
//! A window is a closed interval `[start, end]`; a missing end keeps the
//! banner published indefinitely. Two published banners sharing a
//! `(group, sequence)` slot must not have overlapping windows.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishWindow {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("unpublish time precedes publish time")]
    InvalidWindow,
}

impl PublishWindow {
    /// Builds a validated window with both bounds truncated to whole seconds.
    pub fn new(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Result<Self, WindowError> {
        let start = start.trunc_subsecs(0);
        let end = end.map(|value| value.trunc_subsecs(0));
        if end.is_some_and(|end| end < start) {
            return Err(WindowError::InvalidWindow);
        }
        Ok(Self { start, end })
    }

    /// Wraps values already persisted; they were validated on the way in.
    #[must_use]
    pub const fn from_stored(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    fn end_or_max(&self) -> DateTime<Utc> {
        self.end.unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end_or_max()
    }

    /// Conflict test of `self` (an existing window) against `candidate`.
    #[must_use]
    pub fn overlaps(&self, candidate: &PublishWindow) -> bool {
        let starts_inside = candidate.contains(self.start);
        let ends_inside = candidate.contains(self.end_or_max());
        let encloses = self.start <= candidate.start && self.end_or_max() >= candidate.end_or_max();
        starts_inside || ends_inside || encloses
    }

    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.contains(now)
    }
}

/// Returns the ids of `existing` windows that collide with `candidate`.
pub fn find_conflicts<I>(candidate: &PublishWindow, existing: I) -> Vec<i64>
where
    I: IntoIterator<Item = (i64, PublishWindow)>,
{
    existing
        .into_iter()
        .filter(|(_, window)| window.overlaps(candidate))
        .map(|(id, _)| id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0)
            .single()
            .expect("valid date")
    }

    fn window(start: u32, end: Option<u32>) -> PublishWindow {
        PublishWindow::new(at(start), end.map(at)).expect("valid window")
    }

    #[test]
    fn rejects_end_before_start() {
        let err = PublishWindow::new(at(5), Some(at(4))).expect_err("end before start");
        assert_eq!(err, WindowError::InvalidWindow);
        assert_eq!(err.to_string(), "unpublish time precedes publish time");
        assert!(PublishWindow::new(at(5), Some(at(5))).is_ok());
    }

    #[test]
    fn truncates_subseconds() {
        let start = at(1) + Duration::milliseconds(750);
        let window = PublishWindow::new(start, None).expect("valid window");
        assert_eq!(window.start, at(1));
    }

    #[test]
    fn existing_starting_inside_candidate_conflicts() {
        assert!(window(5, Some(20)).overlaps(&window(1, Some(10))));
    }

    #[test]
    fn existing_ending_inside_candidate_conflicts() {
        assert!(window(1, Some(8)).overlaps(&window(5, Some(20))));
    }

    #[test]
    fn existing_enclosing_candidate_conflicts() {
        assert!(window(1, Some(28)).overlaps(&window(5, Some(10))));
    }

    #[test]
    fn touching_bounds_conflict() {
        assert!(window(1, Some(5)).overlaps(&window(5, Some(9))));
    }

    #[test]
    fn disjoint_windows_do_not_conflict() {
        assert!(!window(1, Some(4)).overlaps(&window(5, Some(9))));
        assert!(!window(10, Some(12)).overlaps(&window(5, Some(9))));
    }

    #[test]
    fn open_ended_windows() {
        assert!(window(1, None).overlaps(&window(20, Some(21))));
        assert!(window(20, None).overlaps(&window(1, None)));
        assert!(!window(10, None).overlaps(&window(1, Some(9))));
        assert!(window(1, Some(3)).overlaps(&window(2, None)));
    }

    #[test]
    fn active_window_checks_bounds() {
        let window = window(5, Some(10));
        assert!(!window.is_active_at(at(4)));
        assert!(window.is_active_at(at(5)));
        assert!(window.is_active_at(at(10)));
        assert!(!window.is_active_at(at(11)));
    }

    #[test]
    fn find_conflicts_returns_matching_ids() {
        let candidate = window(10, Some(15));
        let existing = vec![
            (1, window(1, Some(9))),
            (2, window(12, Some(13))),
            (3, window(14, None)),
            (4, window(16, Some(20))),
        ];
        assert_eq!(find_conflicts(&candidate, existing), vec![2, 3]);
    }
}
