// consistency.rs - Agreement of residue pairs across alternative alignments

use crate::data::alignment::AlignmentMatrix;
use crate::data::residue_index::{ResidueIndex, GAP_ORDINAL};
use crate::error::{ComparesetMismatch, Result, TrimError};
use crate::stats::series::{ScoredSeries, SeriesKind};
use log::{debug, info};

/// Per-column fraction of residue pairs that every sibling alignment also
/// places in a common column.
#[derive(Debug, Clone)]
pub struct ConsistencyProfile {
    series: ScoredSeries,
    selected: Option<usize>,
    alignment_scores: Vec<f32>,
}

impl ConsistencyProfile {
    /// Score every alignment against the others and keep the best one.
    ///
    /// An alignment's score is the sum of its column scores divided by its
    /// length; ties keep the earliest alignment.
    pub fn compare_and_choose(alignments: &[AlignmentMatrix]) -> Result<Self> {
        let reference = alignments.first().ok_or(TrimError::EmptyCompareset)?;
        let indexes = ordered_indexes(reference, alignments)?;

        let mut best: Option<(usize, Vec<f32>)> = None;
        let mut best_score = 0.0f32;
        let mut alignment_scores = Vec::with_capacity(alignments.len());

        for (i, index) in indexes.iter().enumerate() {
            let others: Vec<&ResidueIndex> = indexes
                .iter()
                .enumerate()
                .filter(|(l, _)| *l != i)
                .map(|(_, other)| other)
                .collect();
            let scores = score_columns(index, &others);
            let residues = index.residue_count().max(1) as f32;
            let normalized = scores.iter().sum::<f32>() / residues;
            debug!(
                "alignment #{}: {} columns, consistency {:.4}",
                i,
                index.residue_count(),
                normalized
            );
            alignment_scores.push(normalized);

            if best.is_none() || normalized > best_score {
                best_score = normalized;
                best = Some((i, scores));
            }
        }

        let (selected, scores) = best.ok_or(TrimError::EmptyCompareset)?;
        info!(
            "selected alignment #{} of {} (consistency {:.4})",
            selected,
            alignments.len(),
            best_score
        );
        let domain = (0..scores.len()).collect();
        Ok(Self {
            series: ScoredSeries::new(SeriesKind::Consistency, scores, domain),
            selected: Some(selected),
            alignment_scores,
        })
    }

    /// Score `selected` against every alignment of the set, no selection step
    pub fn force_comparison(selected: &AlignmentMatrix, alignments: &[AlignmentMatrix]) -> Result<Self> {
        if alignments.is_empty() {
            return Err(TrimError::EmptyCompareset);
        }
        let indexes = ordered_indexes(selected, alignments)?;
        let own = ResidueIndex::from_alignment(selected);
        let others: Vec<&ResidueIndex> = indexes.iter().collect();
        let scores = score_columns(&own, &others);

        let normalized = scores.iter().sum::<f32>() / own.residue_count().max(1) as f32;
        let domain = (0..scores.len()).collect();
        Ok(Self {
            series: ScoredSeries::new(SeriesKind::Consistency, scores, domain),
            selected: None,
            alignment_scores: vec![normalized],
        })
    }

    /// Index of the chosen alignment, `None` when it was forced
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Length-normalized score of every alignment that was evaluated
    pub fn alignment_scores(&self) -> &[f32] {
        &self.alignment_scores
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
}

/// Residue indexes of every alignment, rows rearranged to the order of `reference`
fn ordered_indexes(reference: &AlignmentMatrix, alignments: &[AlignmentMatrix]) -> Result<Vec<ResidueIndex>> {
    let expected = reference.original_sequence_count();
    alignments
        .iter()
        .enumerate()
        .map(|(i, alignment)| {
            let found = alignment.original_sequence_count();
            if found != expected {
                return Err(TrimError::InconsistentCompareset {
                    index: i,
                    mismatch: ComparesetMismatch::SequenceCount { expected, found },
                });
            }
            let order = alignment.sequence_order(reference.names()).ok_or_else(|| {
                let missing = reference
                    .names()
                    .iter()
                    .find(|name| !alignment.names().contains(name))
                    .cloned()
                    .unwrap_or_default();
                TrimError::InconsistentCompareset {
                    index: i,
                    mismatch: ComparesetMismatch::SequenceNames { missing },
                }
            })?;
            let mut index = ResidueIndex::from_alignment(alignment);
            index.reorder(&order);
            Ok(index)
        })
        .collect()
}

/// hits / pairs for every column of `own`, checked against each of `others`
fn score_columns(own: &ResidueIndex, others: &[&ResidueIndex]) -> Vec<f32> {
    let sequences = own.sequence_count();
    (0..own.residue_count())
        .map(|column| {
            let ordinals = own.column(column);
            let mut hits = 0usize;
            let mut pairs = 0usize;

            for k in 0..sequences {
                if ordinals[k] == GAP_ORDINAL {
                    continue;
                }
                for other in others {
                    let target = other.column_of(ordinals[k], k);
                    for m in (k + 1)..sequences {
                        if ordinals[m] == GAP_ORDINAL {
                            continue;
                        }
                        pairs += 1;
                        if let Some(target) = target {
                            if other.ordinal(m, target) == ordinals[m] {
                                hits += 1;
                            }
                        }
                    }
                }
            }

            if pairs == 0 {
                0.0
            } else {
                hits as f32 / pairs as f32
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alignment(rows: &[(&str, &str)]) -> AlignmentMatrix {
        AlignmentMatrix::from_records(
            rows.iter()
                .map(|(name, seq)| (name.to_string(), seq.as_bytes().to_vec())),
        )
        .unwrap()
    }

    #[test]
    fn test_identical_colocation_scores_one() {
        let first = alignment(&[("a", "ACGT"), ("b", "ACGA"), ("c", "TCGA")]);
        // same residue pairs, rows listed in another order
        let second = alignment(&[("c", "TCGA"), ("a", "ACGT"), ("b", "ACGA")]);
        let profile = ConsistencyProfile::compare_and_choose(&[first, second]).unwrap();
        assert!(profile.values().iter().all(|&s| s == 1.0));
        assert_eq!(profile.selected(), Some(0));
        assert_eq!(profile.alignment_scores(), &[1.0, 1.0]);
    }

    #[test]
    fn test_shifted_residue_lowers_score() {
        let first = alignment(&[("a", "AC-GT"), ("b", "ACTGT"), ("c", "ACTGT")]);
        let second = alignment(&[("a", "A-CGT"), ("b", "ACTGT"), ("c", "ACTGT")]);
        let third = alignment(&[("a", "AC-GT"), ("b", "ACTGT"), ("c", "ACTGT")]);
        let profile =
            ConsistencyProfile::compare_and_choose(&[first, second, third]).unwrap();
        // the first and third alignment agree, the second one is the odd one out
        assert_eq!(profile.selected(), Some(0));
        let scores = profile.alignment_scores();
        assert!(scores[1] < scores[0]);
        assert_eq!(scores[0], scores[2]);
        assert_eq!(profile.score(0), 1.0);
        assert!(profile.score(1) < 1.0);
    }

    #[test]
    fn test_force_comparison() {
        let selected = alignment(&[("a", "AC-GT"), ("b", "ACTGT")]);
        let set = vec![
            alignment(&[("b", "ACTGT"), ("a", "A-CGT")]),
            alignment(&[("a", "AC-GT"), ("b", "ACTGT")]),
        ];
        let profile = ConsistencyProfile::force_comparison(&selected, &set).unwrap();
        assert_eq!(profile.selected(), None);
        assert_eq!(profile.score(0), 1.0);
        assert_eq!(profile.score(1), 0.5);
        assert_eq!(profile.score(2), 0.0);
    }

    #[test]
    fn test_mismatched_compareset() {
        let first = alignment(&[("a", "ACGT"), ("b", "ACGA")]);
        let fewer = alignment(&[("a", "ACGT")]);
        let err = ConsistencyProfile::compare_and_choose(&[first.clone(), fewer]).unwrap_err();
        assert!(matches!(
            err,
            TrimError::InconsistentCompareset {
                index: 1,
                mismatch: ComparesetMismatch::SequenceCount { expected: 2, found: 1 }
            }
        ));

        let renamed = alignment(&[("a", "ACGT"), ("z", "ACGA")]);
        let err = ConsistencyProfile::compare_and_choose(&[first, renamed]).unwrap_err();
        assert!(matches!(
            err,
            TrimError::InconsistentCompareset {
                mismatch: ComparesetMismatch::SequenceNames { .. },
                ..
            }
        ));

        assert!(matches!(
            ConsistencyProfile::compare_and_choose(&[]),
            Err(TrimError::EmptyCompareset)
        ));
    }

    #[test]
    fn test_window() {
        let first = alignment(&[("a", "ACGTACGT"), ("b", "ACGTACGT")]);
        let mut profile = ConsistencyProfile::compare_and_choose(&[first.clone(), first]).unwrap();
        profile.apply_window(2).unwrap();
        assert!(profile.values().iter().all(|&s| (s - 1.0).abs() < 1e-6));
        assert!(profile.apply_window(3).is_err());
    }
}
