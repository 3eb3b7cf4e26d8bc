// series.rs - Per-column score vectors with shared raw buffers and windowing

use crate::error::{Result, TrimError};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// What a [`ScoredSeries`] measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    Gaps,
    Conservation,
    Consistency,
}

impl SeriesKind {
    /// Gap counts stay integral after smoothing
    fn rounds_window(self) -> bool {
        matches!(self, SeriesKind::Gaps)
    }
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SeriesKind::Gaps => "gaps",
            SeriesKind::Conservation => "similarity",
            SeriesKind::Consistency => "consistency",
        };
        f.write_str(name)
    }
}

/// One value per original column plus an optional smoothed copy.
///
/// Only the columns listed in the domain take part in windowing and
/// percentile queries; the other slots keep whatever the producer stored.
/// Raw values and the domain sit behind `Arc` so clones are cheap and a
/// derived alignment can read the same buffers until it asks for a
/// different window.
#[derive(Debug, Clone)]
pub struct ScoredSeries {
    kind: SeriesKind,
    raw: Arc<[f32]>,
    domain: Arc<[usize]>,
    half_window: usize,
    windowed: Option<Arc<[f32]>>,
}

impl ScoredSeries {
    pub fn new(kind: SeriesKind, raw: Vec<f32>, domain: Vec<usize>) -> Self {
        Self {
            kind,
            raw: raw.into(),
            domain: domain.into(),
            half_window: 0,
            windowed: None,
        }
    }

    pub fn kind(&self) -> SeriesKind {
        self.kind
    }

    /// Unsmoothed values, indexed by original column
    pub fn raw(&self) -> &[f32] {
        &self.raw
    }

    /// Smoothed values if a window is set, raw values otherwise
    pub fn values(&self) -> &[f32] {
        self.windowed.as_deref().unwrap_or(&self.raw)
    }

    #[inline]
    pub fn value(&self, column: usize) -> f32 {
        self.values()[column]
    }

    /// Original columns the series was computed over
    pub fn domain(&self) -> &[usize] {
        &self.domain
    }

    pub fn half_window(&self) -> usize {
        self.half_window
    }

    /// Whether both series read the same raw buffer
    pub fn shares_raw_with(&self, other: &ScoredSeries) -> bool {
        Arc::ptr_eq(&self.raw, &other.raw)
    }

    /// Same raw buffer over a narrower set of columns, unsmoothed
    pub fn restricted(&self, domain: Vec<usize>) -> Self {
        Self {
            kind: self.kind,
            raw: Arc::clone(&self.raw),
            domain: domain.into(),
            half_window: 0,
            windowed: None,
        }
    }

    /// Smooth the series with a window of `2 * half_window + 1` columns.
    ///
    /// Positions past either end reflect back into the series. A half window
    /// above a quarter of the domain is refused and the previous window kept;
    /// zero removes smoothing.
    pub fn apply_window(&mut self, half_window: usize) -> Result<()> {
        let length = self.domain.len();
        if half_window > length / 4 {
            return Err(TrimError::WindowTooBig {
                kind: self.kind,
                half_window,
                limit: length / 4,
            });
        }
        if half_window == self.half_window {
            return Ok(());
        }

        self.half_window = half_window;
        if half_window == 0 {
            self.windowed = None;
            return Ok(());
        }

        let span = (2 * half_window + 1) as f32;
        let n = length as isize;
        let h = half_window as isize;
        let mut smoothed = self.raw.to_vec();

        for i in 0..n {
            let mut sum = 0.0f32;
            for j in (i - h)..=(i + h) {
                let position = if j < 0 {
                    -j
                } else if j >= n {
                    2 * n - j - 2
                } else {
                    j
                };
                sum += self.raw[self.domain[position as usize]];
            }
            let mean = sum / span;
            smoothed[self.domain[i as usize]] = if self.kind.rounds_window() {
                (mean + 0.5).floor()
            } else {
                mean
            };
        }

        self.windowed = Some(smoothed.into());
        Ok(())
    }

    /// Current values over the domain, ascending
    pub fn sorted_values(&self) -> Vec<f32> {
        let values = self.values();
        let mut sorted: Vec<f32> = self.domain.iter().map(|&c| values[c]).collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        sorted
    }

    /// Value at `percent` of the ascending order over the domain.
    ///
    /// The rank is `(n - 1) * percent / 100` truncated, so 0 is the smallest
    /// value and 100 the largest.
    pub fn percentile(&self, percent: f32) -> Option<f32> {
        percentile_of(&self.sorted_values(), percent)
    }
}

/// Value at `percent` of an ascending slice, truncating the rank
pub fn percentile_of(sorted: &[f32], percent: f32) -> Option<f32> {
    if sorted.is_empty() {
        return None;
    }
    let rank = ((sorted.len() - 1) as f32 * percent.clamp(0.0, 100.0) / 100.0) as usize;
    Some(sorted[rank.min(sorted.len() - 1)])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(kind: SeriesKind, raw: &[f32]) -> ScoredSeries {
        ScoredSeries::new(kind, raw.to_vec(), (0..raw.len()).collect())
    }

    #[test]
    fn test_zero_window_is_noop() {
        let mut s = series(SeriesKind::Conservation, &[0.1, 0.5, 0.9, 0.2]);
        s.apply_window(0).unwrap();
        assert_eq!(s.values(), s.raw());
    }

    #[test]
    fn test_reflective_window() {
        let raw = [4.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 8.0];
        let mut s = series(SeriesKind::Consistency, &raw);
        s.apply_window(1).unwrap();
        // position 0 reads raw[1], raw[0], raw[1]
        assert!((s.value(0) - 4.0 / 3.0).abs() < 1e-6);
        assert!((s.value(1) - 2.0).abs() < 1e-6);
        // position 7 reads raw[6], raw[7], raw[6]
        assert!((s.value(7) - 8.0 / 3.0).abs() < 1e-6);
        assert_eq!(s.raw(), &raw);
    }

    #[test]
    fn test_gap_window_rounds() {
        let mut s = series(SeriesKind::Gaps, &[1.0, 2.0, 2.0, 0.0, 0.0, 1.0, 3.0, 0.0]);
        s.apply_window(1).unwrap();
        assert_eq!(s.value(1), 2.0);
        assert_eq!(s.value(3), 1.0);
        assert!(s.values().iter().all(|v| v.fract() == 0.0));
    }

    #[test]
    fn test_window_too_big_keeps_previous() {
        let mut s = series(SeriesKind::Gaps, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        s.apply_window(2).unwrap();
        let before = s.values().to_vec();
        let err = s.apply_window(3).unwrap_err();
        assert!(matches!(
            err,
            TrimError::WindowTooBig { kind: SeriesKind::Gaps, half_window: 3, limit: 2 }
        ));
        assert_eq!(s.half_window(), 2);
        assert_eq!(s.values(), before.as_slice());
    }

    #[test]
    fn test_window_over_domain_only() {
        let raw = vec![1.0, 100.0, 1.0, 1.0, 4.0, 1.0, 1.0, 1.0, 1.0];
        let domain = vec![0, 2, 3, 4, 5, 6, 7, 8];
        let mut s = ScoredSeries::new(SeriesKind::Consistency, raw, domain);
        s.apply_window(1).unwrap();
        assert_eq!(s.value(1), 100.0);
        assert!((s.value(3) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_clones_share_raw() {
        let s = series(SeriesKind::Gaps, &[1.0, 2.0, 3.0, 4.0]);
        let mut copy = s.clone();
        assert!(copy.shares_raw_with(&s));
        copy.apply_window(1).unwrap();
        assert!(copy.shares_raw_with(&s));
        assert_eq!(s.half_window(), 0);
    }

    #[test]
    fn test_restricted_shares_raw() {
        let mut s = series(SeriesKind::Gaps, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        s.apply_window(1).unwrap();
        let narrow = s.restricted(vec![0, 1, 2, 3]);
        assert!(narrow.shares_raw_with(&s));
        assert_eq!(narrow.half_window(), 0);
        assert_eq!(narrow.domain(), &[0, 1, 2, 3]);
        assert_eq!(narrow.values(), s.raw());
    }

    #[test]
    fn test_percentiles() {
        let s = series(SeriesKind::Conservation, &[0.4, 0.1, 0.3, 0.2, 0.5]);
        assert_eq!(s.sorted_values(), vec![0.1, 0.2, 0.3, 0.4, 0.5]);
        assert_eq!(s.percentile(0.0), Some(0.1));
        assert_eq!(s.percentile(50.0), Some(0.3));
        assert_eq!(s.percentile(100.0), Some(0.5));
        assert_eq!(percentile_of(&[], 10.0), None);
    }
}
