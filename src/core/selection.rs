// selection.rs - Mask primitives shared by the cleaning passes

use crate::data::{AlignmentMatrix, KeepMask, GAP};
use crate::error::{Result, TrimError};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Inclusive range of 0-based indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRange {
    pub start: usize,
    pub end: usize,
}

impl IndexRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn indices(&self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.end
    }
}

impl fmt::Display for IndexRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

impl FromStr for IndexRange {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim()
                .parse::<usize>()
                .map_err(|_| format!("'{}' is not a valid index", part.trim()))
        };
        let range = match s.split_once('-') {
            Some((start, end)) => IndexRange::new(parse(start)?, parse(end)?),
            None => {
                let index = parse(s)?;
                IndexRange::new(index, index)
            }
        };
        if range.start > range.end {
            return Err(format!("range {} is reversed", s.trim()));
        }
        Ok(range)
    }
}

/// Parse a list like `1,4-9,12`
pub fn parse_ranges(list: &str) -> std::result::Result<Vec<IndexRange>, String> {
    list.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(IndexRange::from_str)
        .collect()
}

/// Check every range against a dimension of `size` slots
pub fn check_ranges(ranges: &[IndexRange], size: usize, name: &str) -> Result<()> {
    match ranges.iter().find(|range| range.end >= size) {
        Some(range) => Err(TrimError::invalid(
            name,
            format!("range {} is out of bounds, valid indices are 0-{}", range, size.saturating_sub(1)),
        )),
        None => Ok(()),
    }
}

/// Kept column holding rank `len / 2` among the kept ones
pub fn midpoint(source: &KeepMask) -> usize {
    let kept = source.count();
    source.kept().nth(kept / 2).unwrap_or(0)
}

/// Re-admit rejected columns outwards from `midpoint` until `needed` are back.
///
/// Both directions advance together. On each side the run of still kept
/// columns is measured first; only when it reaches the current block size
/// are the rejected columns that follow it tested with `admit`, stopping at
/// the first refusal. The block size starts at `first_block` and shrinks to
/// zero, so long runs are extended before isolated columns. Columns missing
/// from `source` are skipped. Returns how many columns came back.
pub fn rescue_from_midpoint<F>(
    source: &KeepMask,
    target: &mut KeepMask,
    needed: usize,
    first_block: usize,
    midpoint: usize,
    admit: F,
) -> usize
where
    F: Fn(usize) -> bool,
{
    let n = source.len() as isize;
    let mut remaining = needed;

    for block in (0..=first_block).rev() {
        if remaining == 0 {
            break;
        }
        let (mut left, mut right) = (midpoint as isize, midpoint as isize + 1);
        while (left > 0 || right < n - 1) && remaining > 0 {
            left = rescue_side(source, target, left, -1, block, &mut remaining, &admit) - 1;
            right = rescue_side(source, target, right, 1, block, &mut remaining, &admit) + 1;
        }
    }

    let rescued = needed - remaining;
    debug!("rescued {} of {} columns needed for the baseline", rescued, needed);
    rescued
}

fn rescue_side<F>(
    source: &KeepMask,
    target: &mut KeepMask,
    start: isize,
    step: isize,
    min_block: usize,
    remaining: &mut usize,
    admit: &F,
) -> isize
where
    F: Fn(usize) -> bool,
{
    let n = source.len() as isize;
    let inside = |position: isize| position >= 0 && position < n;
    let mut position = start;
    let mut block = 0usize;

    while inside(position) && *remaining > 0 {
        let column = position as usize;
        if source.is_kept(column) {
            if !target.is_kept(column) {
                break;
            }
            block += 1;
        }
        position += step;
    }

    if block >= min_block {
        while inside(position) && *remaining > 0 && !target.is_kept(position as usize) {
            let column = position as usize;
            if source.is_kept(column) {
                if !admit(column) {
                    break;
                }
                target.keep(column);
                *remaining -= 1;
            }
            position += step;
        }
    }
    position
}

/// Drop every run of kept columns shorter than `block_size`.
///
/// Runs are measured over the columns kept by `source`; columns it already
/// excluded neither break nor extend a run.
pub fn enforce_minimum_block(source: &KeepMask, target: &mut KeepMask, block_size: usize) {
    if block_size == 0 {
        return;
    }
    let mut run: Vec<usize> = Vec::new();
    let mut dropped = 0usize;

    for column in source.kept() {
        if target.is_kept(column) {
            run.push(column);
            continue;
        }
        if run.len() < block_size {
            dropped += run.len();
            run.iter().for_each(|&c| target.discard(c));
        }
        run.clear();
    }
    if run.len() < block_size {
        dropped += run.len();
        run.iter().for_each(|&c| target.discard(c));
    }

    if dropped > 0 {
        debug!("{} columns dropped from blocks shorter than {}", dropped, block_size);
    }
}

/// Reinstate rejected columns surrounded by kept ones.
///
/// Positions are ranks among the columns kept by `source`. A rejected
/// column with all four neighbours within two positions present comes back
/// when at most one of them is rejected; closer to either end, every
/// existing neighbour must be kept. Decisions read the rejections as they
/// were before the pass.
pub fn rescue_by_neighbours(source: &KeepMask, target: &mut KeepMask) {
    let positions = source.kept_indices();
    let rejected: Vec<bool> = positions.iter().map(|&c| !target.is_kept(c)).collect();
    let m = positions.len();

    for p in 0..m {
        if !rejected[p] {
            continue;
        }
        let neighbours: Vec<usize> = (p.saturating_sub(2)..=(p + 2).min(m.saturating_sub(1)))
            .filter(|&q| q != p)
            .collect();
        let rejected_neighbours = neighbours.iter().filter(|&&q| rejected[q]).count();
        let allowed = if neighbours.len() == 4 { 1 } else { 0 };
        if !neighbours.is_empty() && rejected_neighbours <= allowed {
            target.keep(positions[p]);
        }
    }
}

/// First and last kept columns whose gap value is zero
pub fn gap_free_boundaries(columns: &KeepMask, gaps: &[f32]) -> Option<(usize, usize)> {
    let left = columns.kept().find(|&c| gaps[c] == 0.0)?;
    let right = columns.kept().filter(|&c| gaps[c] == 0.0).last()?;
    Some((left, right))
}

/// Force-keep every column of `source` between the boundaries, inclusive
pub fn keep_between(source: &KeepMask, target: &mut KeepMask, left: usize, right: usize) {
    for column in left..=right.min(source.len().saturating_sub(1)) {
        if source.is_kept(column) {
            target.keep(column);
        }
    }
}

/// Flip the requested masks over every slot
pub fn invert_masks(alignment: &mut AlignmentMatrix, columns: bool, sequences: bool) {
    if columns {
        alignment.kept_columns_mut().invert();
    }
    if sequences {
        alignment.kept_sequences_mut().invert();
    }
}

/// Exclude sequences made only of gaps, then columns made only of gaps.
///
/// With `keep_all_gap_sequences` such sequences are reported but kept.
/// Returns the number of sequences and columns excluded.
pub fn remove_all_gap_columns_and_sequences(
    alignment: &mut AlignmentMatrix,
    keep_all_gap_sequences: bool,
) -> (usize, usize) {
    let columns = alignment.kept_columns().kept_indices();
    let mut dropped_sequences = 0usize;

    for row in alignment.kept_sequences().kept_indices() {
        let only_gaps = columns.iter().all(|&c| alignment.residue(row, c) == GAP);
        if !only_gaps {
            continue;
        }
        if keep_all_gap_sequences {
            warn!("keeping sequence '{}' made only of gaps", alignment.name(row));
        } else {
            warn!("removing sequence '{}' made only of gaps", alignment.name(row));
            alignment.kept_sequences_mut().discard(row);
            dropped_sequences += 1;
        }
    }

    let rows = alignment.kept_sequences().kept_indices();
    let mut dropped_columns = 0usize;
    for column in columns {
        if rows.iter().all(|&r| alignment.residue(r, column) == GAP) {
            alignment.kept_columns_mut().discard(column);
            dropped_columns += 1;
        }
    }

    if dropped_columns > 0 {
        debug!("{} columns made only of gaps removed", dropped_columns);
    }
    (dropped_sequences, dropped_columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(bits: &str) -> KeepMask {
        let mut mask = KeepMask::all(bits.len());
        for (i, bit) in bits.chars().enumerate() {
            mask.set(i, bit == '1');
        }
        mask
    }

    fn bits(mask: &KeepMask) -> String {
        (0..mask.len())
            .map(|i| if mask.is_kept(i) { '1' } else { '0' })
            .collect()
    }

    #[test]
    fn test_parse_ranges() {
        let ranges = parse_ranges("1,4-9, 12").unwrap();
        assert_eq!(
            ranges,
            vec![IndexRange::new(1, 1), IndexRange::new(4, 9), IndexRange::new(12, 12)]
        );
        assert!(parse_ranges("9-4").is_err());
        assert!(parse_ranges("a-4").is_err());
        assert!(check_ranges(&ranges, 13, "select-cols").is_ok());
        assert!(check_ranges(&ranges, 12, "select-cols").is_err());
    }

    #[test]
    fn test_midpoint_skips_excluded() {
        assert_eq!(midpoint(&mask("11111111")), 4);
        assert_eq!(midpoint(&mask("00111111")), 5);
        assert_eq!(midpoint(&mask("0000")), 0);
    }

    #[test]
    fn test_minimum_block() {
        let source = mask("1111111111");
        let mut target = mask("1101110111");
        enforce_minimum_block(&source, &mut target, 3);
        assert_eq!(bits(&target), "0001110111");

        // a column excluded before the pass does not split a run
        let source = mask("1110111111");
        let mut target = mask("0110110011");
        enforce_minimum_block(&source, &mut target, 3);
        assert_eq!(bits(&target), "0110110000");
    }

    #[test]
    fn test_rescue_prefers_midpoint() {
        let source = mask("1111111111");
        let mut target = mask("1000110001");
        let rescued = rescue_from_midpoint(&source, &mut target, 2, 0, midpoint(&source), |_| true);
        assert_eq!(rescued, 2);
        assert_eq!(bits(&target), "1011110001");
    }

    #[test]
    fn test_rescue_respects_admission() {
        let source = mask("11111111");
        let mut target = mask("10000001");
        let rescued = rescue_from_midpoint(&source, &mut target, 3, 0, 4, |c| c != 5);
        assert!(rescued <= 3);
        assert!(!target.is_kept(5));
    }

    #[test]
    fn test_neighbour_rescue() {
        let source = mask("1111111111");
        // column 4 has one rejected neighbour, column 8 is near the end
        let mut target = mask("1111011101");
        rescue_by_neighbours(&source, &mut target);
        assert_eq!(bits(&target), "1111111111");

        // three rejected in a row stay rejected
        let mut target = mask("1100011111");
        rescue_by_neighbours(&source, &mut target);
        assert_eq!(bits(&target), "1100011111");

        let mut target = mask("0111111111");
        rescue_by_neighbours(&source, &mut target);
        assert!(target.is_kept(0));
    }

    #[test]
    fn test_boundaries() {
        let columns = mask("111111");
        let gaps = [2.0, 0.0, 1.0, 0.0, 0.0, 3.0];
        assert_eq!(gap_free_boundaries(&columns, &gaps), Some((1, 4)));
        assert_eq!(gap_free_boundaries(&columns, &[1.0; 6]), None);

        let source = mask("111011");
        let mut target = mask("100000");
        keep_between(&source, &mut target, 1, 4);
        assert_eq!(bits(&target), "111010");
    }

    fn alignment(rows: &[&str]) -> AlignmentMatrix {
        AlignmentMatrix::from_records(
            rows.iter()
                .enumerate()
                .map(|(i, seq)| (format!("s{}", i), seq.as_bytes().to_vec())),
        )
        .unwrap()
    }

    #[test]
    fn test_invert_twice_restores() {
        let mut a = alignment(&["AC-GT", "A--GT", "ACTGT"]);
        a.kept_columns_mut().discard(2);
        a.kept_sequences_mut().discard(1);
        let (columns, sequences) = (a.kept_columns().clone(), a.kept_sequences().clone());
        invert_masks(&mut a, true, true);
        assert_eq!(a.residue_count(), 1);
        assert_eq!(a.sequence_count(), 1);
        invert_masks(&mut a, true, true);
        assert_eq!(a.kept_columns(), &columns);
        assert_eq!(a.kept_sequences(), &sequences);
    }

    #[test]
    fn test_all_gap_removal_is_idempotent() {
        let mut a = alignment(&["A-CG", "A-CG", "----", "T-CA"]);
        assert_eq!(remove_all_gap_columns_and_sequences(&mut a, false), (1, 1));
        let snapshot = (a.kept_columns().clone(), a.kept_sequences().clone());
        assert_eq!(remove_all_gap_columns_and_sequences(&mut a, false), (0, 0));
        assert_eq!((a.kept_columns().clone(), a.kept_sequences().clone()), snapshot);

        let mut b = alignment(&["A-CG", "----"]);
        assert_eq!(remove_all_gap_columns_and_sequences(&mut b, true), (0, 1));
        assert_eq!(b.sequence_count(), 2);
    }
}
