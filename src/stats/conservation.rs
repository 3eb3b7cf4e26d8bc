// conservation.rs - Identity-weighted substitution scores per column

use crate::data::alignment::AlignmentMatrix;
use crate::data::substitution::SubstitutionMatrix;
use crate::error::{Result, TrimError};
use crate::stats::gaps::GapProfile;
use crate::stats::series::{ScoredSeries, SeriesKind};
use log::debug;

/// Columns at or above this gap fraction score 0 without being evaluated
pub const DEFAULT_GAP_CUTOFF: f32 = 0.8;

/// Gap counts plus the gap fraction above which a column is not scored
#[derive(Debug, Clone, Copy)]
pub struct GapCutoff<'a> {
    pub gaps: &'a GapProfile,
    pub fraction: f32,
}

/// Per-column conservation in [0, 1].
///
/// Every pair of informative residues in a column contributes its
/// substitution distance, weighted by how divergent the two sequences are
/// overall, so agreement between distant sequences counts for more than
/// agreement between near duplicates. The score is `exp(-mean distance)`.
#[derive(Debug, Clone)]
pub struct ConservationProfile {
    series: ScoredSeries,
}

impl ConservationProfile {
    pub fn compute(
        alignment: &AlignmentMatrix,
        matrix: Option<&SubstitutionMatrix>,
        cutoff: Option<GapCutoff<'_>>,
    ) -> Result<Self> {
        let matrix = matrix.ok_or(TrimError::MissingSubstitutionMatrix)?;
        let rows = alignment.kept_sequences().kept_indices();
        let columns = alignment.kept_columns().kept_indices();
        let divergence = identity_matrix(alignment);

        let mut raw = vec![0.0f32; alignment.original_residue_count()];
        let mut unknown = 0usize;

        for &column in &columns {
            if let Some(GapCutoff { gaps, fraction }) = cutoff {
                let sequences = gaps.sequence_count().max(1) as f32;
                if gaps.gaps(column) as f32 / sequences >= fraction {
                    continue;
                }
            }

            let mut weighted = 0.0f32;
            let mut weights = 0.0f32;
            let mut plain = 0.0f32;
            let mut pairs = 0usize;

            for (a, &i) in rows.iter().enumerate() {
                let first = alignment.residue(i, column);
                if !alignment.is_informative(first) {
                    continue;
                }
                for (b, &j) in rows.iter().enumerate().skip(a + 1) {
                    let second = alignment.residue(j, column);
                    if !alignment.is_informative(second) {
                        continue;
                    }
                    let Some(distance) = matrix.distance(first, second) else {
                        unknown += 1;
                        continue;
                    };
                    weighted += divergence[a][b] * distance;
                    weights += divergence[a][b];
                    plain += distance;
                    pairs += 1;
                }
            }

            raw[column] = if weights > 0.0 {
                (-(weighted / weights)).exp().clamp(0.0, 1.0)
            } else if pairs > 0 {
                // every weight is zero when the compared rows are identical;
                // fall back to the unweighted mean distance so they score 1
                (-(plain / pairs as f32)).exp().clamp(0.0, 1.0)
            } else {
                0.0
            };
        }

        if unknown > 0 {
            debug!(
                "{} residue pairs skipped: symbols missing from the substitution matrix",
                unknown
            );
        }

        Ok(Self {
            series: ScoredSeries::new(SeriesKind::Conservation, raw, columns),
        })
    }

    /// Profile over a subset of the columns, reusing the raw scores
    pub fn restricted(&self, columns: Vec<usize>) -> Self {
        Self {
            series: self.series.restricted(columns),
        }
    }

    pub fn apply_window(&mut self, half_window: usize) -> Result<()> {
        self.series.apply_window(half_window)
    }

    pub fn series(&self) -> &ScoredSeries {
        &self.series
    }

    pub fn values(&self) -> &[f32] {
        self.series.values()
    }

    #[inline]
    pub fn score(&self, column: usize) -> f32 {
        self.series.value(column)
    }

    /// Lowest score to reject.
    ///
    /// Candidate A is the highest score still below `similarity_threshold`;
    /// candidate B is the score at the rank that keeps `baseline`% of the
    /// columns. The smaller one wins, so the baseline always holds.
    pub fn cut_point(&self, baseline: f32, similarity_threshold: f32) -> f32 {
        let sorted = self.series.sorted_values();
        if sorted.is_empty() {
            return 0.0;
        }
        let by_threshold = sorted
            .iter()
            .rev()
            .find(|&&value| value < similarity_threshold)
            .copied()
            .unwrap_or(f32::NEG_INFINITY);

        let last = sorted.len() - 1;
        let rank = ((last as f64 * (100.0 - baseline as f64) / 100.0) as usize).min(last);
        by_threshold.min(sorted[rank])
    }
}

/// Pairwise divergence between kept sequences, in percent.
///
/// Indexed by position among the kept rows. Only columns where at least one
/// of the two sequences holds an informative residue count towards the
/// length; pairs with no such column get 0.
pub fn identity_matrix(alignment: &AlignmentMatrix) -> Vec<Vec<f32>> {
    let rows = alignment.kept_sequences().kept_indices();
    let columns = alignment.kept_columns().kept_indices();
    let mut divergence = vec![vec![0.0f32; rows.len()]; rows.len()];

    for a in 0..rows.len() {
        for b in (a + 1)..rows.len() {
            let (first, second) = (alignment.sequence(rows[a]), alignment.sequence(rows[b]));
            let mut matches = 0usize;
            let mut length = 0usize;
            for &column in &columns {
                let (x, y) = (first[column], second[column]);
                match (alignment.is_informative(x), alignment.is_informative(y)) {
                    (true, true) => {
                        length += 1;
                        matches += (x == y) as usize;
                    }
                    (true, false) | (false, true) => length += 1,
                    (false, false) => {}
                }
            }
            let value = if length == 0 {
                0.0
            } else {
                100.0 * (1.0 - matches as f32 / length as f32)
            };
            divergence[a][b] = value;
            divergence[b][a] = value;
        }
    }
    divergence
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::substitution::BuiltinMatrix;

    fn alignment(rows: &[&str]) -> AlignmentMatrix {
        AlignmentMatrix::from_records(
            rows.iter()
                .enumerate()
                .map(|(i, seq)| (format!("s{}", i), seq.as_bytes().to_vec())),
        )
        .unwrap()
    }

    #[test]
    fn test_requires_matrix() {
        let a = alignment(&["MKV", "MKV"]);
        assert!(matches!(
            ConservationProfile::compute(&a, None, None),
            Err(TrimError::MissingSubstitutionMatrix)
        ));
    }

    #[test]
    fn test_identical_sequences_fully_conserved() {
        let a = alignment(&["MKVLWEQRST", "MKVLWEQRST", "MKVLWEQRST"]);
        let matrix = SubstitutionMatrix::builtin(BuiltinMatrix::Blosum62);
        let mut profile = ConservationProfile::compute(&a, Some(&matrix), None).unwrap();
        assert!(profile.values().iter().all(|&s| (s - 1.0).abs() < 1e-6));
        profile.apply_window(2).unwrap();
        assert!(profile.values().iter().all(|&s| (s - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_scores_in_unit_range() {
        let a = alignment(&["MKVLW-QR", "MRILWEQK", "AKV-WDQR", "MKVLWEHR"]);
        let matrix = SubstitutionMatrix::builtin(BuiltinMatrix::Blosum62);
        let profile = ConservationProfile::compute(&a, Some(&matrix), None).unwrap();
        assert!(profile.values().iter().all(|s| (0.0..=1.0).contains(s)));
        // W column conserved, third column mixes V and I
        assert_eq!(profile.score(4), 1.0);
        assert!(profile.score(2) < 1.0);
    }

    #[test]
    fn test_gappy_and_lonely_columns_score_zero() {
        let a = alignment(&["A-CG", "A-CG", "A--G", "AT-G"]);
        let matrix = SubstitutionMatrix::builtin(BuiltinMatrix::NucleotideIdentity);
        let gaps = GapProfile::compute(&a);
        let cutoff = GapCutoff { gaps: &gaps, fraction: DEFAULT_GAP_CUTOFF };
        let profile = ConservationProfile::compute(&a, Some(&matrix), Some(cutoff)).unwrap();
        // column 1 holds a single residue, column 2 is half gaps
        assert_eq!(profile.score(1), 0.0);
        assert!(profile.score(2) > 0.0);

        let all_gaps = alignment(&["A-", "A-", "A-", "C-"]);
        let gaps = GapProfile::compute(&all_gaps);
        let cutoff = GapCutoff { gaps: &gaps, fraction: DEFAULT_GAP_CUTOFF };
        let profile = ConservationProfile::compute(&all_gaps, Some(&matrix), Some(cutoff)).unwrap();
        assert_eq!(profile.score(1), 0.0);
    }

    #[test]
    fn test_identity_matrix() {
        let a = alignment(&["ACGT", "ACGA", "AC--"]);
        let divergence = identity_matrix(&a);
        assert!((divergence[0][1] - 25.0).abs() < 1e-4);
        assert_eq!(divergence[0][1], divergence[1][0]);
        // two informative-vs-gap columns count towards the length
        assert!((divergence[0][2] - 50.0).abs() < 1e-4);
        assert_eq!(divergence[1][1], 0.0);
    }

    #[test]
    fn test_cut_point() {
        let a = alignment(&["MKVLW", "MRILW", "AKVLW", "MKVIW"]);
        let matrix = SubstitutionMatrix::builtin(BuiltinMatrix::Blosum62);
        let profile = ConservationProfile::compute(&a, Some(&matrix), None).unwrap();
        let sorted = profile.series().sorted_values();

        // baseline 100 forces the lowest score as the cut
        assert_eq!(profile.cut_point(100.0, 1.1), sorted[0]);
        // a zero threshold imposes no similarity constraint
        assert_eq!(profile.cut_point(0.0, 0.0), f32::NEG_INFINITY);
    }
}
