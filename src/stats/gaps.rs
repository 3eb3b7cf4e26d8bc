// gaps.rs - Per-column gap counts, gap histogram and gap cut points

use crate::data::alignment::{AlignmentMatrix, GAP};
use crate::error::Result;
use crate::stats::series::{ScoredSeries, SeriesKind};
use log::debug;
use serde::Serialize;

/// Gap counts of every kept column over the kept sequences
#[derive(Debug, Clone)]
pub struct GapProfile {
    series: ScoredSeries,
    sequences: usize,
    histogram: Vec<usize>,
    max_gaps: usize,
    total_gaps: usize,
}

/// One row of the gap distribution table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapBin {
    pub gaps: usize,
    pub columns: usize,
    pub columns_pct: f32,
    pub accumulated_columns: usize,
    pub accumulated_pct: f32,
    pub gaps_pct: f32,
    pub gap_score: f32,
}

impl GapProfile {
    pub fn compute(alignment: &AlignmentMatrix) -> Self {
        let columns = alignment.kept_columns().kept_indices();
        let rows = alignment.kept_sequences().kept_indices();
        let mut raw = vec![0.0f32; alignment.original_residue_count()];
        let mut total_gaps = 0usize;

        for &column in &columns {
            let gaps = rows
                .iter()
                .filter(|&&row| alignment.residue(row, column) == GAP)
                .count();
            total_gaps += gaps;
            raw[column] = gaps as f32;
        }

        let mut profile = Self {
            series: ScoredSeries::new(SeriesKind::Gaps, raw, columns),
            sequences: rows.len(),
            histogram: Vec::new(),
            max_gaps: 0,
            total_gaps,
        };
        profile.rebuild_histogram();
        debug!(
            "gap profile: {} columns, {} sequences, max {} gaps",
            profile.residue_count(),
            profile.sequences,
            profile.max_gaps
        );
        profile
    }

    /// Profile over a subset of the columns, reusing the raw counts
    pub fn restricted(&self, columns: Vec<usize>) -> Self {
        let series = self.series.restricted(columns);
        let total_gaps = series
            .domain()
            .iter()
            .map(|&column| series.raw()[column] as usize)
            .sum();
        let mut profile = Self {
            series,
            sequences: self.sequences,
            histogram: Vec::new(),
            max_gaps: 0,
            total_gaps,
        };
        profile.rebuild_histogram();
        profile
    }

    fn rebuild_histogram(&mut self) {
        let mut histogram = vec![0usize; self.sequences + 1];
        let mut max_gaps = 0;
        let values = self.series.values();
        for &column in self.series.domain() {
            let gaps = values[column] as usize;
            histogram[gaps] += 1;
            max_gaps = max_gaps.max(gaps);
        }
        self.histogram = histogram;
        self.max_gaps = max_gaps;
    }

    /// Smooth gap counts; the histogram follows the smoothed values
    pub fn apply_window(&mut self, half_window: usize) -> Result<()> {
        self.series.apply_window(half_window)?;
        self.rebuild_histogram();
        Ok(())
    }

    pub fn series(&self) -> &ScoredSeries {
        &self.series
    }

    /// Gap count of a column, smoothed if a window is set
    #[inline]
    pub fn gaps(&self, column: usize) -> usize {
        self.series.value(column) as usize
    }

    pub fn values(&self) -> &[f32] {
        self.series.values()
    }

    /// Columns holding exactly `k` gaps, for every `k` up to the sequence count
    pub fn histogram(&self) -> &[usize] {
        &self.histogram
    }

    pub fn max_gaps(&self) -> usize {
        self.max_gaps
    }

    pub fn sequence_count(&self) -> usize {
        self.sequences
    }

    pub fn residue_count(&self) -> usize {
        self.series.domain().len()
    }

    /// Fraction of non-gap residues in a column
    pub fn gap_score(&self, column: usize) -> f32 {
        if self.sequences == 0 {
            return 0.0;
        }
        1.0 - self.series.value(column) / self.sequences as f32
    }

    /// Average fraction of gaps per cell
    pub fn average_gaps(&self) -> f32 {
        let cells = self.residue_count() * self.sequences;
        if cells == 0 {
            0.0
        } else {
            self.total_gaps as f32 / cells as f32
        }
    }

    /// Largest gap count to accept.
    ///
    /// Candidate A is the gap count that keeps at least `min_retain_pct`% of
    /// the columns, interpolated inside the histogram bin that crosses the
    /// target. Candidate B is `gap_threshold` (fraction of gaps allowed) times
    /// the sequence count. The larger one wins.
    pub fn cut_point(&self, min_retain_pct: f32, gap_threshold: f32) -> f32 {
        let residues = self.residue_count();
        let by_threshold = self.sequences as f32 * gap_threshold;
        let target = ((residues as f32 * min_retain_pct / 100.0 + 0.5).floor() as usize).min(residues);

        let mut bin = 0usize;
        let mut accumulated = 0usize;
        while bin < self.sequences {
            accumulated += self.histogram[bin];
            if accumulated >= target {
                break;
            }
            bin += 1;
        }

        let by_retention = match self.histogram[bin] {
            0 => 0.0,
            count => bin as f32 - (accumulated as f32 - target as f32) / count as f32,
        };
        by_retention.max(by_threshold)
    }

    /// Elbow of the gap distribution using first and second slopes
    pub fn cut_point_by_slope(&self) -> usize {
        if self.residue_count() == 0 || self.sequences == 0 {
            return 0;
        }
        let h = &self.histogram;
        let seqs = self.sequences as f32;
        let cols = self.residue_count() as f32;
        let limit = self.max_gaps + 1;

        let mut first: Vec<Option<f32>> = vec![None; limit];
        let mut second: Vec<Option<f32>> = vec![None; limit];
        let mut max_slope = -1.0f32;
        let mut cut = 0usize;
        let mut act = 0usize;

        while let Some((pprev, prev, next)) = support_triple(h, &mut act, limit) {
            first[prev] = Some(((prev - pprev) as f32 / seqs) / (h[prev] as f32 / cols));
            first[next] = Some(((next - prev) as f32 / seqs) / (h[next] as f32 / cols));
            second[next] =
                Some(((next - pprev) as f32 / seqs) / ((h[next] + h[prev]) as f32 / cols));

            if first[pprev].is_some() || second[pprev].is_some() {
                let mut delta = 0.0f32;
                let mut row = cut;
                let (f_prev, f_next) = (first[prev].unwrap_or(0.0), first[next].unwrap_or(0.0));
                if let Some(f) = first[pprev] {
                    delta = f_prev / f;
                    row = pprev;
                }
                if delta < f_next / f_prev {
                    delta = f_next / f_prev;
                    row = prev;
                }
                if let (Some(s), Some(s_next)) = (second[pprev], second[next]) {
                    if delta < s_next / s {
                        delta = s_next / s;
                        row = pprev;
                    }
                }
                if delta > max_slope {
                    max_slope = delta;
                    cut = row;
                }
            }
            act = prev;
        }
        cut
    }

    /// Elbow of the gap distribution using second slopes only.
    ///
    /// Starts from the lowest observed gap count, so alignments without a
    /// gap-free column still get a cut.
    pub fn cut_point_by_2nd_slope(&self) -> usize {
        if self.residue_count() == 0 || self.sequences == 0 {
            return 0;
        }
        let h = &self.histogram;
        let seqs = self.sequences as f32;
        let cols = self.residue_count() as f32;
        let limit = self.max_gaps + 1;

        let mut second: Vec<Option<f32>> = vec![None; limit];
        let mut max_slope = -1.0f32;
        let mut cut = h.iter().position(|&count| count != 0).unwrap_or(0);
        let mut act = 0usize;

        while let Some((pprev, prev, next)) = support_triple(h, &mut act, limit) {
            let slope = ((next - pprev) as f32 / seqs) / ((h[next] + h[prev]) as f32 / cols);
            second[next] = Some(slope);

            if let Some(reference) = second[pprev].or(second[prev]) {
                if slope / reference > max_slope {
                    max_slope = slope / reference;
                    cut = pprev;
                }
            }
            act = prev;
        }
        cut
    }

    /// Gap distribution table, one row per observed gap count
    pub fn distribution(&self) -> Vec<GapBin> {
        let residues = self.residue_count().max(1) as f32;
        let sequences = self.sequences.max(1) as f32;
        let mut accumulated = 0usize;
        self.histogram
            .iter()
            .enumerate()
            .filter(|(_, &columns)| columns > 0)
            .map(|(gaps, &columns)| {
                accumulated += columns;
                GapBin {
                    gaps,
                    columns,
                    columns_pct: columns as f32 * 100.0 / residues,
                    accumulated_columns: accumulated,
                    accumulated_pct: accumulated as f32 * 100.0 / residues,
                    gaps_pct: gaps as f32 * 100.0 / sequences,
                    gap_score: 1.0 - gaps as f32 / sequences,
                }
            })
            .collect()
    }
}

/// Next three non-empty histogram bins starting at `act`.
///
/// Leaves `act` on the third bin; `None` once fewer than three remain.
fn support_triple(h: &[usize], act: &mut usize, limit: usize) -> Option<(usize, usize, usize)> {
    let next_support = |from: usize| (from..limit).find(|&k| h[k] != 0);

    let pprev = next_support(*act)?;
    let prev = next_support(pprev + 1)?;
    let next = next_support(prev + 1)?;
    *act = next;
    Some((pprev, prev, next))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alignment(rows: &[&str]) -> AlignmentMatrix {
        AlignmentMatrix::from_records(
            rows.iter()
                .enumerate()
                .map(|(i, seq)| (format!("s{}", i), seq.as_bytes().to_vec())),
        )
        .unwrap()
    }

    #[test]
    fn test_counts_and_histogram() {
        let a = alignment(&["A-C-T", "A-CGT", "A--GT", "A-CGT"]);
        let profile = GapProfile::compute(&a);
        assert_eq!(profile.gaps(0), 0);
        assert_eq!(profile.gaps(1), 4);
        assert_eq!(profile.gaps(2), 1);
        assert_eq!(profile.histogram(), &[2, 2, 0, 0, 1]);
        assert_eq!(profile.histogram().iter().sum::<usize>(), profile.residue_count());
        assert_eq!(profile.max_gaps(), 4);
        assert_eq!(profile.gap_score(1), 0.0);
        for column in 0..5 {
            assert!(profile.gaps(column) <= profile.sequence_count());
            assert!((0.0..=1.0).contains(&profile.gap_score(column)));
        }
        assert!((profile.average_gaps() - 6.0 / 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_respects_masks() {
        let mut a = alignment(&["A-C-T", "A-CGT", "A--GT", "A-CGT"]);
        a.kept_columns_mut().discard(1);
        a.kept_sequences_mut().discard(2);
        let profile = GapProfile::compute(&a);
        assert_eq!(profile.sequence_count(), 3);
        assert_eq!(profile.residue_count(), 4);
        assert_eq!(profile.gaps(2), 0);
        assert_eq!(profile.histogram(), &[3, 1, 0, 0]);
        assert_eq!(profile.histogram().iter().sum::<usize>(), 4);
    }

    #[test]
    fn test_restricted_rebuilds_histogram() {
        let a = alignment(&["A-C-T", "A-CGT", "A--GT", "A-CGT"]);
        let profile = GapProfile::compute(&a);
        let narrow = profile.restricted(vec![0, 2, 4]);
        assert!(narrow.series().shares_raw_with(profile.series()));
        assert_eq!(narrow.histogram(), &[2, 1, 0, 0, 0]);
        assert_eq!(narrow.max_gaps(), 1);
    }

    #[test]
    fn test_window_keeps_histogram_total() {
        let a = alignment(&["A-C-TTAA", "A-CGT-AA", "A--GTTA-", "A-CGTTAA"]);
        let mut profile = GapProfile::compute(&a);
        profile.apply_window(1).unwrap();
        assert_eq!(profile.histogram().iter().sum::<usize>(), 8);
        assert!(profile.apply_window(5).is_err());
        assert_eq!(profile.series().half_window(), 1);
    }

    #[test]
    fn test_cut_point_keeps_everything_at_full_retention() {
        let a = alignment(&["A-C-T", "A-CGT", "A--GT", "A-CGT"]);
        let profile = GapProfile::compute(&a);
        let cut = profile.cut_point(100.0, 0.0);
        assert!(cut >= profile.max_gaps() as f32);
    }

    #[test]
    fn test_cut_point_threshold_wins() {
        let a = alignment(&["A-C-T", "A-CGT", "A--GT", "A-CGT"]);
        let profile = GapProfile::compute(&a);
        assert_eq!(profile.cut_point(0.0, 0.5), 2.0);
        // 60% of 5 columns = 3 columns: bin 1 reaches 4, interpolated to 1 - 1/2
        assert!((profile.cut_point(60.0, 0.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_second_slope_finds_elbow() {
        // six gap-free columns, then one column each with 1, 2, 7 and 8 gaps
        let profile = GapProfile::compute(&alignment(&[
            "AAAAAAA---", "AAAAAA-A--", "AAAAAAA---", "AAAAAAAA--",
            "AAAAAAAA--", "AAAAAAAA--", "AAAAAAAA--", "AAAAAAAAA-",
        ]));
        assert_eq!(profile.histogram(), &[6, 1, 1, 0, 0, 0, 0, 1, 1]);
        assert_eq!(profile.cut_point_by_2nd_slope(), 1);
    }

    #[test]
    fn test_slopes_on_sparse_histogram() {
        let a = alignment(&["A-", "A-", "AA"]);
        let profile = GapProfile::compute(&a);
        assert_eq!(profile.cut_point_by_2nd_slope(), 0);
        assert_eq!(profile.cut_point_by_slope(), 0);

        // no gap-free column: the lowest observed count is the fallback
        let all_gappy = alignment(&["--", "-A", "-A"]);
        let profile = GapProfile::compute(&all_gappy);
        assert_eq!(profile.histogram(), &[0, 1, 0, 1]);
        assert_eq!(profile.cut_point_by_2nd_slope(), 1);
    }

    #[test]
    fn test_distribution_accumulates() {
        let a = alignment(&["A-C-T", "A-CGT", "A--GT", "A-CGT"]);
        let table = GapProfile::compute(&a).distribution();
        assert_eq!(table.len(), 3);
        assert_eq!(table[2].gaps, 4);
        assert_eq!(table[2].accumulated_columns, 5);
        assert!((table[2].accumulated_pct - 100.0).abs() < 1e-4);
    }
}
