// cleaner.rs - Cleaning engine: column and sequence selection passes

use crate::core::method::TrimMethod;
use crate::core::selection::{
    check_ranges, enforce_minimum_block, gap_free_boundaries, keep_between, midpoint,
    remove_all_gap_columns_and_sequences, rescue_by_neighbours, rescue_from_midpoint, IndexRange,
};
use crate::core::sequences::{self, AutomatedChoice, IdentityMatrix};
use crate::core::tuning::Tuning;
use crate::data::{AlignmentMatrix, KeepMask};
use crate::error::{Result, TrimError};
use crate::stats::{percentile_of, ScoredSeries, SeriesKind, Statistics};
use log::{debug, info, warn};
use regex::Regex;

/// Settings carried from one pass to the derivatives it produces
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleaningOptions {
    /// Minimum run of kept columns; 0 leaves the method default
    pub block_size: usize,
    /// Only trim columns outside the gap-free boundaries
    pub terminal_only: bool,
    /// Keep what the pass would remove instead
    pub complementary: bool,
    pub keep_all_gap_sequences: bool,
    /// User terminal boundaries, inclusive
    pub boundaries: Option<(usize, usize)>,
    pub tuning: Tuning,
}

/// How [`CleaningEngine::select_by_cut`] decides on a column
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CutCriterion {
    /// Keep columns with at most this many gaps
    GapsAtMost(f32),
    /// Keep columns scoring strictly above the cut
    ScoreAbove { kind: SeriesKind, cut: f32 },
    /// Keep columns under the gap cut and above the conservation cut
    GapsAndScore { gaps: f32, score: f32 },
}

/// One alignment plus its statistics, ready to be trimmed.
///
/// Every selection leaves `self` untouched apart from lazily computed
/// profiles and returns a new engine holding the trimmed derivative.
#[derive(Debug, Clone)]
pub struct CleaningEngine {
    alignment: AlignmentMatrix,
    stats: Statistics,
    options: CleaningOptions,
}

impl CleaningEngine {
    pub fn new(alignment: AlignmentMatrix, stats: Statistics, options: CleaningOptions) -> Result<Self> {
        if let Some((left, right)) = options.boundaries {
            let residues = alignment.original_residue_count();
            if left >= right || right >= residues {
                return Err(TrimError::InvalidBoundaries {
                    left,
                    right,
                    residues,
                });
            }
        }
        Ok(Self {
            alignment,
            stats,
            options,
        })
    }

    pub fn alignment(&self) -> &AlignmentMatrix {
        &self.alignment
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    pub fn statistics_mut(&mut self) -> &mut Statistics {
        &mut self.stats
    }

    pub fn options(&self) -> &CleaningOptions {
        &self.options
    }

    /// Turn the finishing steps on or off for the next pass
    pub fn set_finishing(&mut self, terminal_only: bool, complementary: bool) {
        self.options.terminal_only = terminal_only;
        self.options.complementary = complementary;
    }

    pub fn into_parts(self) -> (AlignmentMatrix, Statistics) {
        (self.alignment, self.stats)
    }

    fn derive(&self, alignment: AlignmentMatrix) -> CleaningEngine {
        CleaningEngine {
            stats: self.stats.derive_for(&self.alignment, &alignment),
            alignment,
            options: self.options.clone(),
        }
    }

    fn series(&mut self, kind: SeriesKind) -> Result<ScoredSeries> {
        match kind {
            SeriesKind::Gaps => Ok(self.stats.gaps(&self.alignment)?.series().clone()),
            SeriesKind::Conservation => Ok(self.stats.conservation(&self.alignment)?.series().clone()),
            SeriesKind::Consistency => self
                .stats
                .consistency()
                .map(|profile| profile.series().clone())
                .ok_or_else(|| TrimError::invalid("consistency", "no compareset scores attached")),
        }
    }

    // ----- column passes -----

    /// Keep the columns accepted by `criterion`, then rescue columns until
    /// `baseline`% of the current columns are kept.
    pub fn select_by_cut(&mut self, criterion: CutCriterion, baseline: f32) -> Result<CleaningEngine> {
        let (gaps, scores) = match criterion {
            CutCriterion::GapsAtMost(_) => (Some(self.series(SeriesKind::Gaps)?), None),
            CutCriterion::ScoreAbove { kind, .. } => (None, Some(self.series(kind)?)),
            CutCriterion::GapsAndScore { .. } => (
                Some(self.series(SeriesKind::Gaps)?),
                Some(self.series(SeriesKind::Conservation)?),
            ),
        };
        let gap_at = |column: usize| gaps.as_ref().map_or(0.0, |s| s.value(column));
        let score_at = |column: usize| scores.as_ref().map_or(0.0, |s| s.value(column));

        let source = self.alignment.kept_columns().clone();
        let mut result = self.alignment.clone();
        let total = source.count();
        let mut kept = 0usize;

        for column in source.kept() {
            let accepted = match criterion {
                CutCriterion::GapsAtMost(cut) => gap_at(column) <= cut,
                CutCriterion::ScoreAbove { cut, .. } => score_at(column) > cut,
                CutCriterion::GapsAndScore { gaps, score } => {
                    score_at(column) > score && gap_at(column) <= gaps
                }
            };
            if accepted {
                kept += 1;
            } else {
                result.kept_columns_mut().discard(column);
            }
        }

        let needed = if total == 0 {
            0.0
        } else {
            ((baseline / 100.0 - kept as f32 / total as f32) * total as f32).round()
        };
        if needed > 0.0 {
            let needed = needed as usize;
            let first_block = self.options.tuning.rescue_block(total);
            let center = midpoint(&source);
            let columns = result.kept_columns_mut();
            match criterion {
                CutCriterion::GapsAtMost(_) => {
                    let cut = percentile_over(gaps.as_ref(), &source, baseline);
                    rescue_from_midpoint(&source, columns, needed, first_block, center, |c| {
                        gap_at(c) <= cut
                    });
                }
                CutCriterion::ScoreAbove { cut, .. } => {
                    rescue_from_midpoint(&source, columns, needed, first_block, center, |c| {
                        score_at(c) >= cut
                    });
                }
                CutCriterion::GapsAndScore { .. } => {
                    let score_cut = percentile_over(scores.as_ref(), &source, 100.0 - baseline);
                    let gap_cut = percentile_over(gaps.as_ref(), &source, baseline);
                    rescue_from_midpoint(&source, columns, needed, first_block, center + 1, |c| {
                        score_at(c) >= score_cut || gap_at(c) <= gap_cut
                    });
                }
            }
        }

        debug!("{:?}: {} of {} columns pass the cut", criterion, kept, total);
        let block_size = self.options.block_size;
        self.finish_columns(&source, result, block_size)
    }

    /// Manual gap cut keeping at least `baseline`% of the columns.
    ///
    /// `gap_threshold` is the largest fraction of gaps a column may hold.
    pub fn clean_gaps(&mut self, baseline: f32, gap_threshold: f32) -> Result<CleaningEngine> {
        let cut = self.stats.gaps(&self.alignment)?.cut_point(baseline, gap_threshold);
        info!("gap cut point: {:.2} gaps per column", cut);
        self.select_by_cut(CutCriterion::GapsAtMost(cut), baseline)
    }

    /// Manual similarity cut keeping at least `baseline`% of the columns
    pub fn clean_conservation(&mut self, baseline: f32, similarity_threshold: f32) -> Result<CleaningEngine> {
        let cut = self
            .stats
            .conservation(&self.alignment)?
            .cut_point(baseline, similarity_threshold);
        info!("similarity cut point: {:.6}", cut);
        self.select_by_cut(
            CutCriterion::ScoreAbove {
                kind: SeriesKind::Conservation,
                cut,
            },
            baseline,
        )
    }

    /// Gap and similarity cuts combined
    pub fn clean(&mut self, baseline: f32, gap_threshold: f32, similarity_threshold: f32) -> Result<CleaningEngine> {
        let gaps = self.stats.gaps(&self.alignment)?.cut_point(baseline, gap_threshold);
        let score = self
            .stats
            .conservation(&self.alignment)?
            .cut_point(baseline, similarity_threshold);
        info!("cut points: {:.2} gaps, similarity {:.6}", gaps, score);
        self.select_by_cut(CutCriterion::GapsAndScore { gaps, score }, baseline)
    }

    /// Consistency cut against the attached compareset scores
    pub fn clean_by_consistency(&mut self, consistency_threshold: f32, baseline: f32) -> Result<CleaningEngine> {
        let series = self.series(SeriesKind::Consistency)?;
        let by_baseline = series
            .percentile(100.0 - baseline)
            .unwrap_or(consistency_threshold);
        let cut = consistency_threshold.min(by_baseline);
        info!("consistency cut point: {:.6}", cut);
        self.select_by_cut(
            CutCriterion::ScoreAbove {
                kind: SeriesKind::Consistency,
                cut,
            },
            baseline,
        )
    }

    /// gappyout: gap cut at the second-slope elbow
    pub fn select_by_2nd_slope(&mut self) -> Result<CleaningEngine> {
        let cut = self.stats.gaps(&self.alignment)?.cut_point_by_2nd_slope();
        info!("gappyout cut point: {} gaps per column", cut);
        self.select_by_cut(CutCriterion::GapsAtMost(cut as f32), 0.0)
    }

    /// Remove every column holding a gap
    pub fn select_no_gaps(&mut self) -> Result<CleaningEngine> {
        self.select_by_cut(CutCriterion::GapsAtMost(0.0), 0.0)
    }

    /// Remove columns where every kept sequence has a gap
    pub fn select_no_all_gaps(&mut self) -> Result<CleaningEngine> {
        let cut = self.alignment.sequence_count().saturating_sub(1) as f32;
        self.select_by_cut(CutCriterion::GapsAtMost(cut), 0.0)
    }

    /// Reject columns above `gap_cut` gaps or below `similarity_cut`, bring
    /// back isolated rejections and keep blocks of a minimum size.
    pub fn select_strict(&mut self, gap_cut: f32, similarity_cut: f32, variable_block: bool) -> Result<CleaningEngine> {
        let source = self.alignment.kept_columns().clone();
        let tuning = self.options.tuning.clone();
        if source.count() < tuning.min_strict_columns || self.alignment.sequence_count() == 0 {
            return Err(TrimError::degenerate(
                "strict selection",
                self.alignment.sequence_count(),
                source.count(),
            ));
        }

        let gaps = self.series(SeriesKind::Gaps)?;
        let scores = self.series(SeriesKind::Conservation)?;
        let mut result = self.alignment.clone();
        for column in source.kept() {
            if gaps.value(column) > gap_cut || scores.value(column) < similarity_cut {
                result.kept_columns_mut().discard(column);
            }
        }
        rescue_by_neighbours(&source, result.kept_columns_mut());

        let block_size = match self.options.block_size {
            0 => tuning.strict_block(source.count(), variable_block),
            size => size,
        };
        debug!("strict selection with blocks of at least {} columns", block_size);
        self.finish_columns(&source, result, block_size)
    }

    /// strict / strictplus: gappyout gap cut plus a similarity cut placed
    /// between the upper percentiles of the gap-acceptable columns
    pub fn select_combined(&mut self, variable_block: bool) -> Result<CleaningEngine> {
        let gap_cut = self.stats.gaps(&self.alignment)?.cut_point_by_2nd_slope() as f32;
        let gaps = self.series(SeriesKind::Gaps)?;
        let scores = self.series(SeriesKind::Conservation)?;

        let mut accepted: Vec<f32> = self
            .alignment
            .kept_columns()
            .kept()
            .filter(|&c| gaps.value(c) <= gap_cut)
            .map(|c| scores.value(c))
            .collect();
        accepted.sort_by(|a, b| a.total_cmp(b));

        let tuning = &self.options.tuning;
        let similarity_cut = combined_similarity_cut(
            &accepted,
            tuning.combined_low_percentile,
            tuning.combined_high_percentile,
        );
        info!(
            "combined cut points: {} gaps, similarity {:.6}",
            gap_cut, similarity_cut
        );
        self.select_strict(gap_cut, similarity_cut, variable_block)
    }

    /// gappyout or strict, picked from the identity profile
    pub fn select_method(&self) -> AutomatedChoice {
        let identities = IdentityMatrix::compute(&self.alignment);
        sequences::choose_automated(
            &identities,
            self.alignment.sequence_count(),
            &self.options.tuning.automated,
        )
    }

    /// Concrete method `method` stands for on this alignment
    pub fn resolve_method(&self, method: TrimMethod) -> TrimMethod {
        match method {
            TrimMethod::Automated1 => match self.select_method() {
                AutomatedChoice::Gappyout => TrimMethod::Gappyout,
                AutomatedChoice::Strict => TrimMethod::Strict,
            },
            other => other,
        }
    }

    pub fn select_by_method(&mut self, method: TrimMethod) -> Result<CleaningEngine> {
        match method {
            TrimMethod::Automated1 => match self.select_method() {
                AutomatedChoice::Gappyout => self.select_by_2nd_slope(),
                AutomatedChoice::Strict => self.select_combined(false),
            },
            TrimMethod::NoGaps => self.select_no_gaps(),
            TrimMethod::NoAllGaps => self.select_no_all_gaps(),
            TrimMethod::Gappyout => self.select_by_2nd_slope(),
            TrimMethod::Strict => self.select_combined(false),
            TrimMethod::StrictPlus => self.select_combined(true),
        }
    }

    /// Remove the listed column ranges, indexed on the original alignment
    pub fn remove_columns(&mut self, ranges: &[IndexRange]) -> Result<CleaningEngine> {
        check_ranges(ranges, self.alignment.original_residue_count(), "select-cols")?;
        let source = self.alignment.kept_columns().clone();
        let mut result = self.alignment.clone();
        for range in ranges {
            range.indices().for_each(|c| result.kept_columns_mut().discard(c));
        }
        self.finish_columns(&source, result, 0)
    }

    /// Finishing steps alone, for runs without a column pass
    pub fn finish(&mut self) -> Result<CleaningEngine> {
        let source = self.alignment.kept_columns().clone();
        let result = self.alignment.clone();
        self.finish_columns(&source, result, 0)
    }

    /// Terminal boundaries in use: the user's, else the first and last
    /// gap-free columns
    pub fn terminal_boundaries(&mut self) -> Result<Option<(usize, usize)>> {
        if let Some(boundaries) = self.options.boundaries {
            return Ok(Some(boundaries));
        }
        let gaps = self.stats.gaps(&self.alignment)?;
        Ok(gap_free_boundaries(self.alignment.kept_columns(), gaps.values()))
    }

    fn finish_columns(
        &mut self,
        source: &KeepMask,
        mut result: AlignmentMatrix,
        block_size: usize,
    ) -> Result<CleaningEngine> {
        enforce_minimum_block(source, result.kept_columns_mut(), block_size);

        if self.options.terminal_only {
            match self.terminal_boundaries()? {
                Some((left, right)) => {
                    debug!("keeping every column between {} and {}", left, right);
                    keep_between(source, result.kept_columns_mut(), left, right);
                }
                None => warn!("no gap-free column found, terminal-only trimming has no effect"),
            }
        }
        if self.options.complementary {
            result.kept_columns_mut().invert_within(source);
        }
        remove_all_gap_columns_and_sequences(&mut result, self.options.keep_all_gap_sequences);

        info!(
            "{} of {} columns and {} of {} sequences kept",
            result.residue_count(),
            source.count(),
            result.sequence_count(),
            self.alignment.sequence_count()
        );
        Ok(self.derive(result))
    }

    // ----- sequence passes -----

    pub fn pairwise_identity(&self) -> IdentityMatrix {
        IdentityMatrix::compute(&self.alignment)
    }

    /// Representatives of the clusters at `max_identity`
    pub fn cluster(&self, max_identity: f32) -> Vec<usize> {
        sequences::cluster(&self.alignment, &self.pairwise_identity(), max_identity)
    }

    /// Identity threshold giving `clusters` representatives
    pub fn cluster_count_to_identity(&self, clusters: usize) -> f32 {
        let threshold = sequences::cluster_count_to_identity(
            &self.alignment,
            &self.pairwise_identity(),
            clusters,
            self.options.tuning.cluster_stall_limit,
        );
        info!("identity threshold for {} clusters: {:.6}", clusters, threshold);
        threshold
    }

    /// Keep one representative sequence per cluster
    pub fn select_clusters(&mut self, max_identity: f32) -> Result<CleaningEngine> {
        let representatives = self.cluster(max_identity);
        let source = self.alignment.kept_sequences().clone();
        let mut result = self.alignment.clone();
        source.kept().for_each(|row| result.kept_sequences_mut().discard(row));
        representatives
            .iter()
            .for_each(|&row| result.kept_sequences_mut().keep(row));
        info!(
            "{} clusters at identity {:.4}",
            representatives.len(),
            max_identity
        );
        Ok(self.finish_sequences(&source, result))
    }

    pub fn overlap_vector(&self, residue_overlap: f32) -> Vec<f32> {
        sequences::overlap_vector(&self.alignment, residue_overlap)
    }

    /// Drop sequences overlapping the others in less than `sequence_overlap`
    /// of the columns
    pub fn select_by_overlap(&mut self, residue_overlap: f32, sequence_overlap: f32) -> Result<CleaningEngine> {
        let overlap = self.overlap_vector(residue_overlap);
        let source = self.alignment.kept_sequences().clone();
        let mut result = self.alignment.clone();
        for row in source.kept() {
            if overlap[row] < sequence_overlap {
                debug!("sequence '{}' overlap {:.4}", self.alignment.name(row), overlap[row]);
                result.kept_sequences_mut().discard(row);
            }
        }
        Ok(self.finish_sequences(&source, result))
    }

    /// Remove the listed sequence ranges, indexed on the original alignment
    pub fn remove_sequences(&mut self, ranges: &[IndexRange]) -> Result<CleaningEngine> {
        check_ranges(ranges, self.alignment.original_sequence_count(), "select-seqs")?;
        let source = self.alignment.kept_sequences().clone();
        let mut result = self.alignment.clone();
        for range in ranges {
            range.indices().for_each(|row| result.kept_sequences_mut().discard(row));
        }
        Ok(self.finish_sequences(&source, result))
    }

    /// Keep sequences whose name matches `include` and does not match `exclude`
    pub fn select_by_name(&mut self, include: Option<&str>, exclude: Option<&str>) -> Result<CleaningEngine> {
        let include = include.map(Regex::new).transpose()?;
        let exclude = exclude.map(Regex::new).transpose()?;
        let source = self.alignment.kept_sequences().clone();
        let mut result = self.alignment.clone();

        for row in source.kept() {
            let name = self.alignment.name(row);
            let wanted = include.as_ref().map_or(true, |re| re.is_match(name))
                && !exclude.as_ref().map_or(false, |re| re.is_match(name));
            if !wanted {
                result.kept_sequences_mut().discard(row);
            }
        }
        Ok(self.finish_sequences(&source, result))
    }

    fn finish_sequences(&self, source: &KeepMask, mut result: AlignmentMatrix) -> CleaningEngine {
        if self.options.complementary {
            result.kept_sequences_mut().invert_within(source);
        }
        remove_all_gap_columns_and_sequences(&mut result, self.options.keep_all_gap_sequences);
        info!(
            "{} of {} sequences kept",
            result.sequence_count(),
            source.count()
        );
        self.derive(result)
    }
}

/// Percentile of `series` over the columns kept by `columns`
fn percentile_over(series: Option<&ScoredSeries>, columns: &KeepMask, percent: f32) -> f32 {
    let Some(series) = series else {
        return 0.0;
    };
    let mut values: Vec<f32> = columns.kept().map(|c| series.value(c)).collect();
    values.sort_by(|a, b| a.total_cmp(b));
    percentile_of(&values, percent).unwrap_or(0.0)
}

/// Similarity cut interpolated in log space between the scores found at
/// `low` and `high` percent from the top of `ascending`.
///
/// Returns 0 when either anchor is not positive.
pub fn combined_similarity_cut(ascending: &[f32], low: f32, high: f32) -> f32 {
    let n = ascending.len();
    let mut first = 0.0f32;
    let mut last = 0.0f32;
    for (rank, &value) in ascending.iter().rev().enumerate() {
        let percent = (rank + 1) as f32 / n as f32 * 100.0;
        if percent <= low {
            first = value;
        }
        if percent <= high {
            last = value;
        }
    }
    if first <= 0.0 || last <= 0.0 {
        return 0.0;
    }
    let (top, bottom) = (first.log10(), last.log10());
    10f32.powf((top - bottom) / 10.0 + bottom)
}
