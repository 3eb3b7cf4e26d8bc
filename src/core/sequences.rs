// sequences.rs - Pairwise sequence identity, clustering and overlap

use crate::core::tuning::AutomatedThresholds;
use crate::data::AlignmentMatrix;
use log::debug;

/// Pairwise identity between kept sequences.
///
/// Identity is the number of identical informative positions divided by the
/// number of kept columns where at least one of the two sequences holds an
/// informative residue. Indexed by original row; rows that are not kept,
/// and the diagonal, stay at 0.
#[derive(Debug, Clone)]
pub struct IdentityMatrix {
    rows: Vec<usize>,
    values: Vec<Vec<f32>>,
}

impl IdentityMatrix {
    pub fn compute(alignment: &AlignmentMatrix) -> Self {
        let rows = alignment.kept_sequences().kept_indices();
        let columns = alignment.kept_columns().kept_indices();
        let total = alignment.original_sequence_count();
        let mut values = vec![vec![0.0f32; total]; total];

        for (a, &i) in rows.iter().enumerate() {
            for &j in rows.iter().skip(a + 1) {
                let (first, second) = (alignment.sequence(i), alignment.sequence(j));
                let mut hits = 0usize;
                let mut length = 0usize;
                for &c in &columns {
                    if alignment.is_informative(first[c]) || alignment.is_informative(second[c]) {
                        length += 1;
                        hits += (first[c] == second[c]) as usize;
                    }
                }
                let identity = if length == 0 {
                    0.0
                } else {
                    hits as f32 / length as f32
                };
                values[i][j] = identity;
                values[j][i] = identity;
            }
        }
        Self { rows, values }
    }

    /// Kept rows the matrix covers
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.values[i][j]
    }

    /// Mean over sequences of (average identity, highest identity) to the others
    pub fn summary(&self) -> (f32, f32) {
        let n = self.rows.len();
        if n < 2 {
            return (0.0, 0.0);
        }
        let (mut average, mut maximum) = (0.0f32, 0.0f32);
        for &i in &self.rows {
            let others = self.rows.iter().filter(|&&j| j != i).map(|&j| self.values[i][j]);
            let (sum, top) = others.fold((0.0f32, 0.0f32), |(s, m), v| (s + v, m.max(v)));
            average += sum / (n - 1) as f32;
            maximum += top;
        }
        (average / n as f32, maximum / n as f32)
    }

    /// Lowest and highest identity over all pairs
    pub fn range(&self) -> (f32, f32) {
        let mut low = 1.0f32;
        let mut high = 0.0f32;
        for (a, &i) in self.rows.iter().enumerate() {
            for &j in self.rows.iter().skip(a + 1) {
                low = low.min(self.values[i][j]);
                high = high.max(self.values[i][j]);
            }
        }
        (low, high)
    }
}

/// Automated method picked from the identity summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutomatedChoice {
    Gappyout,
    Strict,
}

/// Choose between gappyout and strict from average and maximum identity
pub fn choose_automated(
    identities: &IdentityMatrix,
    sequences: usize,
    thresholds: &AutomatedThresholds,
) -> AutomatedChoice {
    let (average, maximum) = identities.summary();
    debug!(
        "identity summary: average {:.4}, average maximum {:.4}, {} sequences",
        average, maximum, sequences
    );
    if average >= thresholds.gappy_average {
        AutomatedChoice::Gappyout
    } else if average <= thresholds.strict_average {
        AutomatedChoice::Strict
    } else if sequences <= thresholds.small_set
        || (thresholds.max_identity_low..=thresholds.max_identity_high).contains(&maximum)
    {
        AutomatedChoice::Gappyout
    } else {
        AutomatedChoice::Strict
    }
}

/// Kept rows ordered by ungapped length, longest first; ties keep row order
fn by_length(alignment: &AlignmentMatrix) -> Vec<usize> {
    let mut rows = alignment.kept_sequences().kept_indices();
    rows.sort_by_key(|&row| std::cmp::Reverse(alignment.ungapped_length(row)));
    rows
}

/// One representative per cluster at identity threshold `max_identity`.
///
/// Sequences are visited longest first. A sequence whose identity to some
/// existing representative exceeds the threshold joins that cluster,
/// otherwise it becomes a new representative. Raising the threshold makes
/// joining harder.
pub fn cluster(alignment: &AlignmentMatrix, identities: &IdentityMatrix, max_identity: f32) -> Vec<usize> {
    let mut representatives: Vec<usize> = Vec::new();
    for row in by_length(alignment) {
        let joins = representatives
            .iter()
            .any(|&rep| identities.get(row, rep) > max_identity);
        if !joins {
            representatives.push(row);
        }
    }
    representatives
}

/// Identity threshold producing `target` clusters.
///
/// Starts from the mean identity and bisects between the lowest and highest
/// pairwise identities. Gives up once the cluster count has not changed for
/// `stall_limit` consecutive steps and returns the last threshold tried.
pub fn cluster_count_to_identity(
    alignment: &AlignmentMatrix,
    identities: &IdentityMatrix,
    target: usize,
    stall_limit: usize,
) -> f32 {
    let sequences = identities.rows().len();
    if target >= sequences {
        return 1.0;
    }
    if target <= 1 {
        return 0.0;
    }

    let (mut low, mut high) = identities.range();
    let mut threshold = identities.summary().0;
    let mut previous = 0usize;
    let mut stalled = 0usize;

    loop {
        let count = cluster(alignment, identities, threshold).len();
        debug!("identity threshold {:.4} gives {} clusters", threshold, count);
        if count == target || stalled > stall_limit {
            break;
        }
        if count > target {
            high = threshold;
        } else {
            low = threshold;
        }
        threshold = (high + low) / 2.0;

        if count != previous {
            previous = count;
            stalled = 0;
        } else {
            stalled += 1;
        }
    }
    threshold
}

/// Fraction of columns in which each kept sequence overlaps enough others.
///
/// A sequence overlaps another in a column when both hold the same symbol
/// or both hold informative residues. A column counts for the sequence when
/// it overlaps at least `ceil(overlap * (N - 1))` of the other N - 1
/// sequences. Indexed by original row; rows that are not kept get 0.
pub fn overlap_vector(alignment: &AlignmentMatrix, overlap: f32) -> Vec<f32> {
    let rows = alignment.kept_sequences().kept_indices();
    let columns = alignment.kept_columns().kept_indices();
    let required = (overlap * rows.len().saturating_sub(1) as f32).ceil() as usize;
    let mut values = vec![0.0f32; alignment.original_sequence_count()];
    if columns.is_empty() {
        return values;
    }

    for &i in &rows {
        let own = alignment.sequence(i);
        let hits = columns
            .iter()
            .filter(|&&c| {
                let overlapping = rows
                    .iter()
                    .filter(|&&k| k != i)
                    .filter(|&&k| {
                        let other = alignment.residue(k, c);
                        own[c] == other
                            || (alignment.is_informative(own[c]) && alignment.is_informative(other))
                    })
                    .count();
                overlapping >= required
            })
            .count();
        values[i] = hits as f32 / columns.len() as f32;
    }
    values
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

    fn families() -> AlignmentMatrix {
        alignment(&[
            "ACGTACGTAC",
            "ACGTACGTAA",
            "TTGCATGCTT",
            "TTGCATGCTA",
            "GAAAGGCCGA",
        ])
    }

    #[test]
    fn test_identity_counts_union_length() {
        let a = alignment(&["ACGT", "ACGA", "AC--"]);
        let ids = IdentityMatrix::compute(&a);
        assert!((ids.get(0, 1) - 0.75).abs() < 1e-6);
        assert!((ids.get(0, 2) - 0.5).abs() < 1e-6);
        assert_eq!(ids.get(1, 0), ids.get(0, 1));
        assert_eq!(ids.get(0, 0), 0.0);
    }

    #[test]
    fn test_cluster_families() {
        let a = families();
        let ids = IdentityMatrix::compute(&a);
        assert_eq!(cluster(&a, &ids, 0.85).len(), 3);
        assert_eq!(cluster(&a, &ids, 1.0).len(), 5);
        assert_eq!(cluster(&a, &ids, -1.0).len(), 1);
    }

    #[test]
    fn test_cluster_count_monotone_in_identity() {
        let a = families();
        let ids = IdentityMatrix::compute(&a);
        let counts: Vec<usize> = (0..=100)
            .map(|step| cluster(&a, &ids, step as f32 / 100.0).len())
            .collect();
        assert!(counts.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_cluster_count_to_identity() {
        let a = families();
        let ids = IdentityMatrix::compute(&a);
        let threshold = cluster_count_to_identity(&a, &ids, 3, 10);
        assert_eq!(cluster(&a, &ids, threshold).len(), 3);
        assert_eq!(cluster_count_to_identity(&a, &ids, 5, 10), 1.0);
        assert_eq!(cluster_count_to_identity(&a, &ids, 1, 10), 0.0);
    }

    #[test]
    fn test_automated_choice() {
        let thresholds = AutomatedThresholds::default();
        let similar = alignment(&["ACGTACGTAC", "ACGTACGTAA", "ACGTACGTCC"]);
        let ids = IdentityMatrix::compute(&similar);
        assert_eq!(choose_automated(&ids, 3, &thresholds), AutomatedChoice::Gappyout);

        let distant = alignment(&["AAAAAAAAAA", "CCCCCCCCCC", "GGGGGGGGGG"]);
        let ids = IdentityMatrix::compute(&distant);
        assert_eq!(choose_automated(&ids, 3, &thresholds), AutomatedChoice::Strict);
    }

    #[test]
    fn test_overlap_vector() {
        let a = alignment(&["ACGTAC", "ACGTAC", "AC----", "ACGTAC"]);
        let overlap = overlap_vector(&a, 0.5);
        assert_eq!(overlap[0], 1.0);
        // the short row only overlaps the others in its two leading columns
        assert!((overlap[2] - 2.0 / 6.0).abs() < 1e-6);
    }
}
