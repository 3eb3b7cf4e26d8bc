// pipeline.rs - Ordered trimming passes driven by one request

use crate::core::cleaner::{CleaningEngine, CleaningOptions};
use crate::core::method::TrimMethod;
use crate::core::selection::IndexRange;
use crate::core::tuning::Tuning;
use crate::data::{AlignmentMatrix, SubstitutionMatrix};
use crate::error::{Result, TrimError};
use crate::stats::{ConsistencyProfile, Statistics, WindowSizes};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Every policy parameter of a trimming run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimRequest {
    pub method: Option<TrimMethod>,
    /// Minimum fraction of residues (non-gaps) a column must hold
    pub gap_threshold: Option<f32>,
    pub similarity_threshold: Option<f32>,
    pub consistency_threshold: Option<f32>,
    /// Minimum percentage of columns to keep, 0 by default
    pub baseline: Option<f32>,
    pub select_columns: Vec<IndexRange>,
    pub select_sequences: Vec<IndexRange>,
    pub clusters: Option<usize>,
    pub max_identity: Option<f32>,
    pub residue_overlap: Option<f32>,
    /// Percentage of columns a sequence must overlap
    pub sequence_overlap: Option<f32>,
    pub include_names: Option<String>,
    pub exclude_names: Option<String>,
    pub block_size: usize,
    pub terminal_only: bool,
    pub complementary: bool,
    pub keep_all_gap_sequences: bool,
    pub boundaries: Option<(usize, usize)>,
    pub windows: WindowSizes,
    pub tuning: Tuning,
}

/// Alignments and matrix a run works on.
///
/// With a compareset and no alignment, the most consistent member of the
/// set is trimmed. With both, the alignment is scored against the set.
#[derive(Debug, Clone, Default)]
pub struct TrimInput {
    pub alignment: Option<AlignmentMatrix>,
    pub compareset: Vec<AlignmentMatrix>,
    /// Defaults to the built-in matrix for the alignment type
    pub matrix: Option<SubstitutionMatrix>,
}

/// Result of a run
#[derive(Debug, Clone)]
pub struct TrimOutcome {
    /// Alignment as it was read, every slot kept
    pub input: AlignmentMatrix,
    /// Alignment the column pass examined
    pub scored: AlignmentMatrix,
    /// Profiles of `scored`
    pub statistics: Statistics,
    /// Input coordinates with the final keep masks
    pub masked: AlignmentMatrix,
    pub trimmed: AlignmentMatrix,
    /// Compareset member chosen for trimming
    pub selected_alignment: Option<usize>,
    /// Column method applied, automated choices resolved
    pub method: Option<TrimMethod>,
    pub steps: Vec<String>,
}

impl TrimOutcome {
    pub fn kept_columns(&self) -> Vec<usize> {
        self.masked.kept_columns().kept_indices()
    }

    pub fn kept_sequences(&self) -> Vec<usize> {
        self.masked.kept_sequences().kept_indices()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SequencePass {
    Clusters(usize),
    MaxIdentity(f32),
    Remove(Vec<IndexRange>),
    Overlap { residue: f32, sequence: f32 },
    Names {
        include: Option<String>,
        exclude: Option<String>,
    },
}

impl SequencePass {
    fn apply(&self, engine: &mut CleaningEngine) -> Result<CleaningEngine> {
        match self {
            SequencePass::Clusters(clusters) => {
                let threshold = engine.cluster_count_to_identity(*clusters);
                engine.select_clusters(threshold)
            }
            SequencePass::MaxIdentity(identity) => engine.select_clusters(*identity),
            SequencePass::Remove(ranges) => engine.remove_sequences(ranges),
            SequencePass::Overlap { residue, sequence } => {
                engine.select_by_overlap(*residue, sequence / 100.0)
            }
            SequencePass::Names { include, exclude } => {
                engine.select_by_name(include.as_deref(), exclude.as_deref())
            }
        }
    }
}

impl fmt::Display for SequencePass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequencePass::Clusters(n) => write!(f, "clusters {}", n),
            SequencePass::MaxIdentity(identity) => write!(f, "maxidentity {}", identity),
            SequencePass::Remove(ranges) => write!(f, "selectseqs {}", join_ranges(ranges)),
            SequencePass::Overlap { residue, sequence } => {
                write!(f, "overlap residues {} sequences {}%", residue, sequence)
            }
            SequencePass::Names { include, exclude } => write!(
                f,
                "names include {} exclude {}",
                include.as_deref().unwrap_or("*"),
                exclude.as_deref().unwrap_or("-")
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ColumnStep {
    Method(TrimMethod),
    Remove(Vec<IndexRange>),
    Consistency(f32),
    /// Allowed gap fraction
    Gaps(f32),
    Similarity(f32),
    GapsAndSimilarity { gaps: f32, similarity: f32 },
}

impl ColumnStep {
    fn apply(&self, engine: &mut CleaningEngine, baseline: f32) -> Result<CleaningEngine> {
        match self {
            ColumnStep::Method(method) => engine.select_by_method(*method),
            ColumnStep::Remove(ranges) => engine.remove_columns(ranges),
            ColumnStep::Consistency(threshold) => engine.clean_by_consistency(*threshold, baseline),
            ColumnStep::Gaps(gaps) => engine.clean_gaps(baseline, *gaps),
            ColumnStep::Similarity(similarity) => engine.clean_conservation(baseline, *similarity),
            ColumnStep::GapsAndSimilarity { gaps, similarity } => {
                engine.clean(baseline, *gaps, *similarity)
            }
        }
    }
}

impl fmt::Display for ColumnStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnStep::Method(method) => write!(f, "{}", method),
            ColumnStep::Remove(ranges) => write!(f, "selectcols {}", join_ranges(ranges)),
            ColumnStep::Consistency(threshold) => write!(f, "consistency {}", threshold),
            ColumnStep::Gaps(gaps) => write!(f, "gaps allowed {}", gaps),
            ColumnStep::Similarity(similarity) => write!(f, "similarity {}", similarity),
            ColumnStep::GapsAndSimilarity { gaps, similarity } => {
                write!(f, "gaps allowed {} similarity {}", gaps, similarity)
            }
        }
    }
}

fn join_ranges(ranges: &[IndexRange]) -> String {
    ranges
        .iter()
        .map(|range| range.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl TrimRequest {
    /// Whether any column or sequence selection is configured
    pub fn has_selection(&self) -> bool {
        self.sequence_pass().is_some() || !self.column_steps().is_empty()
    }

    /// At most one sequence pass, by priority
    fn sequence_pass(&self) -> Option<SequencePass> {
        if let Some(clusters) = self.clusters {
            return Some(SequencePass::Clusters(clusters));
        }
        if let Some(identity) = self.max_identity {
            return Some(SequencePass::MaxIdentity(identity));
        }
        if !self.select_sequences.is_empty() {
            return Some(SequencePass::Remove(self.select_sequences.clone()));
        }
        if let (Some(residue), Some(sequence)) = (self.residue_overlap, self.sequence_overlap) {
            return Some(SequencePass::Overlap { residue, sequence });
        }
        if self.include_names.is_some() || self.exclude_names.is_some() {
            return Some(SequencePass::Names {
                include: self.include_names.clone(),
                exclude: self.exclude_names.clone(),
            });
        }
        None
    }

    /// Column steps in the order they run
    fn column_steps(&self) -> Vec<ColumnStep> {
        if let Some(method) = self.method {
            return vec![ColumnStep::Method(method)];
        }
        if !self.select_columns.is_empty() {
            return vec![ColumnStep::Remove(self.select_columns.clone())];
        }

        let mut steps = Vec::new();
        if let Some(threshold) = self.consistency_threshold {
            steps.push(ColumnStep::Consistency(threshold));
        }
        match (self.gap_threshold, self.similarity_threshold) {
            (Some(gaps), Some(similarity)) => steps.push(ColumnStep::GapsAndSimilarity {
                gaps: 1.0 - gaps,
                similarity,
            }),
            (Some(gaps), None) => steps.push(ColumnStep::Gaps(1.0 - gaps)),
            (None, Some(similarity)) => steps.push(ColumnStep::Similarity(similarity)),
            (None, None) => {}
        }
        steps
    }

    fn cleaning_options(&self) -> CleaningOptions {
        CleaningOptions {
            block_size: self.block_size,
            terminal_only: false,
            complementary: false,
            keep_all_gap_sequences: self.keep_all_gap_sequences,
            boundaries: self.boundaries,
            tuning: self.tuning.clone(),
        }
    }
}

/// Pick the alignment to trim and score it against the compareset
fn resolve_input(input: TrimInput) -> Result<(AlignmentMatrix, Option<ConsistencyProfile>, Option<SubstitutionMatrix>)> {
    let TrimInput {
        alignment,
        compareset,
        matrix,
    } = input;

    match alignment {
        Some(alignment) if compareset.is_empty() => Ok((alignment, None, matrix)),
        Some(alignment) => {
            let profile = ConsistencyProfile::force_comparison(&alignment, &compareset)?;
            Ok((alignment, Some(profile), matrix))
        }
        None if compareset.is_empty() => Err(TrimError::invalid(
            "input",
            "neither an alignment nor a compareset was given",
        )),
        None => {
            let profile = ConsistencyProfile::compare_and_choose(&compareset)?;
            let selected = profile.selected().unwrap_or(0);
            let alignment = compareset
                .into_iter()
                .nth(selected)
                .ok_or(TrimError::EmptyCompareset)?;
            Ok((alignment, Some(profile), matrix))
        }
    }
}

/// Run every configured pass over the input.
///
/// A sequence pass runs first and is followed by the removal of columns
/// left with gaps only. The column steps run next, each one on the result
/// of the previous one. Terminal-only and complementary apply to the last
/// requested pass; with no pass at all they run as a standalone finish.
pub fn run(request: &TrimRequest, input: TrimInput) -> Result<TrimOutcome> {
    request.tuning.validate()?;
    let (alignment, consistency, matrix) = resolve_input(input)?;
    let selected_alignment = consistency.as_ref().and_then(|profile| profile.selected());

    let matrix = matrix.unwrap_or_else(|| SubstitutionMatrix::default_for(alignment.sequence_type()));
    let mut stats = Statistics::new(Some(Arc::new(matrix)), request.windows)
        .with_gap_cutoff(request.tuning.gap_cutoff);
    if let Some(profile) = consistency {
        stats.set_consistency(profile)?;
    }

    info!(
        "trimming {} sequences of {} columns ({})",
        alignment.sequence_count(),
        alignment.residue_count(),
        alignment.sequence_type().label()
    );
    let input = alignment.clone();
    let mut engine = CleaningEngine::new(alignment, stats, request.cleaning_options())?;
    let mut steps = Vec::new();

    let column_steps = request.column_steps();
    if let Some(pass) = request.sequence_pass() {
        if column_steps.is_empty() {
            engine.set_finishing(false, request.complementary);
        }
        info!("sequence pass: {}", pass);
        let mut reduced = pass.apply(&mut engine)?;
        reduced.set_finishing(false, false);
        engine = reduced.select_no_all_gaps()?;
        steps.push(pass.to_string());
    }

    let baseline = request.baseline.unwrap_or(0.0);
    let mut method = None;
    let mut current: Option<CleaningEngine> = None;
    let last = column_steps.len().saturating_sub(1);

    for (i, step) in column_steps.iter().enumerate() {
        let target = match current.as_mut() {
            Some(previous) => previous,
            None => &mut engine,
        };
        if i == last {
            target.set_finishing(request.terminal_only, request.complementary);
        }
        let step = match step {
            ColumnStep::Method(chosen) => {
                let resolved = target.resolve_method(*chosen);
                if resolved != *chosen {
                    info!("{} resolved to {}", chosen, resolved);
                }
                method = Some(resolved);
                ColumnStep::Method(resolved)
            }
            other => other.clone(),
        };
        info!("column pass: {}", step);
        current = Some(step.apply(target, baseline)?);
        steps.push(step.to_string());
    }

    let finished = match current {
        Some(finished) => finished,
        None if steps.is_empty() => {
            engine.set_finishing(request.terminal_only, request.complementary);
            steps.push("finish".to_string());
            engine.finish()?
        }
        None => engine.clone(),
    };

    let (masked, _) = finished.into_parts();
    let trimmed = masked.compacted();
    let (scored, statistics) = engine.into_parts();
    debug!(
        "kept {} of {} columns, {} of {} sequences",
        trimmed.residue_count(),
        input.residue_count(),
        trimmed.sequence_count(),
        input.sequence_count()
    );

    let outcome = TrimOutcome {
        input,
        scored,
        statistics,
        masked,
        trimmed,
        selected_alignment,
        method,
        steps,
    };
    #[cfg(feature = "debug-stats")]
    dump_statistics(&outcome);
    Ok(outcome)
}

#[cfg(feature = "debug-stats")]
fn dump_statistics(outcome: &TrimOutcome) {
    let stats = &outcome.statistics;
    if let Some(gaps) = stats.computed_gaps() {
        debug!("gap histogram: {:?}", gaps.histogram());
        debug!("gap values: {:?}", gaps.values());
    }
    if let Some(conservation) = stats.computed_conservation() {
        debug!("similarity values: {:?}", conservation.values());
    }
    if let Some(consistency) = stats.consistency() {
        debug!("consistency values: {:?}", consistency.values());
    }
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

    const GAPPY: [&str; 4] = ["AC-GT-ACGT", "ACAGT-ACGT", "AC-GTTAC-T", "ACAGTTACGT"];

    fn input(rows: &[&str]) -> TrimInput {
        TrimInput {
            alignment: Some(alignment(rows)),
            ..Default::default()
        }
    }

    #[test]
    fn test_method_pass() {
        let request = TrimRequest {
            method: Some(TrimMethod::NoGaps),
            ..Default::default()
        };
        let outcome = run(&request, input(&GAPPY)).unwrap();
        assert_eq!(outcome.method, Some(TrimMethod::NoGaps));
        assert_eq!(outcome.kept_columns(), vec![0, 1, 3, 4, 6, 7, 9]);
        assert_eq!(outcome.trimmed.residue_count(), 7);
        assert_eq!(outcome.trimmed.sequence(0), b"ACGTACT");
        assert_eq!(outcome.input.residue_count(), 10);
        assert!(outcome.statistics.computed_gaps().is_some());
    }

    #[test]
    fn test_gap_threshold_is_residue_fraction() {
        let request = TrimRequest {
            gap_threshold: Some(1.0),
            ..Default::default()
        };
        let outcome = run(&request, input(&GAPPY)).unwrap();
        assert_eq!(outcome.kept_columns(), vec![0, 1, 3, 4, 6, 7, 9]);

        let request = TrimRequest {
            gap_threshold: Some(0.0),
            ..Default::default()
        };
        assert_eq!(run(&request, input(&GAPPY)).unwrap().trimmed.residue_count(), 10);
    }

    #[test]
    fn test_automated_resolves() {
        let request = TrimRequest {
            method: Some(TrimMethod::Automated1),
            ..Default::default()
        };
        let outcome = run(&request, input(&["MKVLWEQRST", "MKVLWEQRST", "MKVLWEQRST"])).unwrap();
        assert_eq!(outcome.method, Some(TrimMethod::Gappyout));
        assert_eq!(outcome.steps, vec!["gappyout".to_string()]);
    }

    #[test]
    fn test_sequence_pass_then_columns() {
        let request = TrimRequest {
            select_sequences: vec![IndexRange::new(0, 1)],
            method: Some(TrimMethod::NoGaps),
            ..Default::default()
        };
        let outcome = run(&request, input(&GAPPY)).unwrap();
        assert_eq!(outcome.kept_sequences(), vec![2, 3]);
        // only s2 has gaps left, at columns 2 and 8
        assert_eq!(outcome.kept_columns(), vec![0, 1, 3, 4, 5, 6, 7, 9]);
        assert_eq!(outcome.steps.len(), 2);
    }

    #[test]
    fn test_clusters() {
        let request = TrimRequest {
            clusters: Some(3),
            ..Default::default()
        };
        let rows = ["ACGTACGTAC", "ACGTACGTAA", "TTGCATGCTT", "TTGCATGCTA", "GAAAGGCCGA"];
        let outcome = run(&request, input(&rows)).unwrap();
        assert_eq!(outcome.trimmed.sequence_count(), 3);
        assert!(outcome.method.is_none());
    }

    #[test]
    fn test_complementary_on_last_pass() {
        let request = TrimRequest {
            method: Some(TrimMethod::NoGaps),
            complementary: true,
            ..Default::default()
        };
        let outcome = run(&request, input(&GAPPY)).unwrap();
        assert_eq!(outcome.kept_columns(), vec![2, 5, 8]);
    }

    #[test]
    fn test_no_selection_keeps_everything() {
        let outcome = run(&TrimRequest::default(), input(&GAPPY)).unwrap();
        assert_eq!(outcome.trimmed.residue_count(), 10);
        assert_eq!(outcome.steps, vec!["finish".to_string()]);
        assert!(!TrimRequest::default().has_selection());
    }

    #[test]
    fn test_compareset_selects_alignment() {
        let first = alignment(&["AC-GT", "ACTGT", "ACTGT"]);
        let second = alignment(&["A-CGT", "ACTGT", "ACTGT"]);
        let request = TrimRequest {
            consistency_threshold: Some(0.9),
            ..Default::default()
        };
        let input = TrimInput {
            compareset: vec![first.clone(), second, first],
            ..Default::default()
        };
        let outcome = run(&request, input).unwrap();
        assert_eq!(outcome.selected_alignment, Some(0));
        assert_eq!(outcome.kept_columns(), vec![0, 2, 3, 4]);
    }

    #[test]
    fn test_inverted_block_bounds_rejected() {
        let mut request = TrimRequest {
            method: Some(TrimMethod::StrictPlus),
            ..Default::default()
        };
        request.tuning.variable_block_min = 12;
        request.tuning.variable_block_max = 3;
        assert!(matches!(
            run(&request, input(&GAPPY)),
            Err(TrimError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_missing_input() {
        assert!(matches!(
            run(&TrimRequest::default(), TrimInput::default()),
            Err(TrimError::InvalidParameter { .. })
        ));
    }
}
