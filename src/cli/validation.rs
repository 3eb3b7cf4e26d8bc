// validation.rs - Input validation utilities

use crate::cli::args::Args;
use crate::core::{parse_ranges, IndexRange, TrimMethod, TrimRequest, Tuning};
use crate::error::{Result, TrimError};
use crate::stats::WindowSizes;
use regex::Regex;
use std::path::Path;
use std::str::FromStr;

pub struct ValidationResult {
    pub request: TrimRequest,
    /// Accepted combinations that will not do what the user may expect
    pub warnings: Vec<String>,
}

fn check_fraction(name: &str, value: Option<f32>) -> Result<()> {
    match value {
        Some(v) if !(0.0..=1.0).contains(&v) => Err(TrimError::invalid(
            name,
            format!("{} is outside 0.0-1.0", v),
        )),
        _ => Ok(()),
    }
}

fn check_percentage(name: &str, value: Option<f32>) -> Result<()> {
    match value {
        Some(v) if !(0.0..=100.0).contains(&v) => Err(TrimError::invalid(
            name,
            format!("{} is outside 0-100", v),
        )),
        _ => Ok(()),
    }
}

fn ranges(name: &str, list: Option<&String>) -> Result<Vec<IndexRange>> {
    match list {
        Some(list) => {
            let ranges = parse_ranges(list).map_err(|e| TrimError::invalid(name, e))?;
            if ranges.is_empty() {
                return Err(TrimError::invalid(name, "no index given"));
            }
            Ok(ranges)
        }
        None => Ok(Vec::new()),
    }
}

/// Parse "left,right" terminal boundaries
fn parse_boundaries(text: &str) -> Result<(usize, usize)> {
    let parse = |part: &str| {
        part.trim()
            .parse::<usize>()
            .map_err(|_| TrimError::invalid("boundaries", format!("'{}' is not a column index", part.trim())))
    };
    let (left, right) = text
        .split_once(',')
        .ok_or_else(|| TrimError::invalid("boundaries", "expected two indices as \"left,right\""))?;
    let (left, right) = (parse(left)?, parse(right)?);
    if left >= right {
        return Err(TrimError::invalid(
            "boundaries",
            format!("left boundary {} must come before right boundary {}", left, right),
        ));
    }
    Ok((left, right))
}

/// Validate all command line arguments
pub fn validate_args(args: &Args) -> Result<ValidationResult> {
    let mut warnings = Vec::new();

    // Inputs
    if args.input.is_none() && args.compareset.is_none() {
        return Err(TrimError::invalid("input", "--input or --compareset is required"));
    }
    if args.force_select && (args.input.is_none() || args.compareset.is_none()) {
        return Err(TrimError::invalid(
            "force-select",
            "requires both --input and --compareset",
        ));
    }
    if args.input.is_some() && args.compareset.is_some() && !args.force_select {
        warnings.push(
            "--input is ignored with --compareset unless --force-select is given".to_string(),
        );
    }
    for path in [&args.input, &args.compareset, &args.matrix].into_iter().flatten() {
        if !Path::new(path).exists() {
            return Err(TrimError::invalid("input", format!("file '{}' does not exist", path)));
        }
    }

    // Thresholds
    check_fraction("gap-threshold", args.gap_threshold)?;
    check_fraction("similarity-threshold", args.similarity_threshold)?;
    check_fraction("consistency-threshold", args.consistency_threshold)?;
    check_fraction("max-identity", args.max_identity)?;
    check_fraction("res-overlap", args.res_overlap)?;
    check_percentage("baseline", args.baseline)?;
    check_percentage("seq-overlap", args.seq_overlap)?;

    if args.consistency_threshold.is_some() && args.compareset.is_none() {
        return Err(TrimError::invalid("consistency-threshold", "requires --compareset"));
    }
    if args.consistency_window.is_some() && args.compareset.is_none() {
        return Err(TrimError::invalid("consistency-window", "requires --compareset"));
    }

    // Column selection
    let method = args
        .method
        .as_deref()
        .map(TrimMethod::from_str)
        .transpose()
        .map_err(|e| TrimError::invalid("method", e))?;
    let manual = args.gap_threshold.is_some()
        || args.similarity_threshold.is_some()
        || args.consistency_threshold.is_some();
    let select_columns = ranges("select-cols", args.select_cols.as_ref())?;

    if method.is_some() && (manual || !select_columns.is_empty()) {
        return Err(TrimError::invalid(
            "method",
            "automated methods are not compatible with manual thresholds or --select-cols",
        ));
    }
    if !select_columns.is_empty() && manual {
        return Err(TrimError::invalid(
            "select-cols",
            "not compatible with manual thresholds",
        ));
    }
    if args.baseline.is_some() && !manual {
        warnings.push("--baseline only applies to manual thresholds".to_string());
    }

    // Windows
    let specific_window = args.gap_window.is_some()
        || args.similarity_window.is_some()
        || args.consistency_window.is_some();
    if args.window.is_some() && specific_window {
        return Err(TrimError::invalid(
            "window",
            "not compatible with --gap-window, --similarity-window or --consistency-window",
        ));
    }
    let windows = match args.window {
        Some(half_window) => WindowSizes::uniform(half_window),
        None => WindowSizes {
            gaps: args.gap_window.unwrap_or(0),
            similarity: args.similarity_window.unwrap_or(0),
            consistency: args.consistency_window.unwrap_or(0),
        },
    };

    // Sequence selection, at most one pass
    let select_sequences = ranges("select-seqs", args.select_seqs.as_ref())?;
    if args.res_overlap.is_some() != args.seq_overlap.is_some() {
        return Err(TrimError::invalid(
            "res-overlap",
            "--res-overlap and --seq-overlap must be given together",
        ));
    }
    let sequence_passes = [
        args.clusters.is_some(),
        args.max_identity.is_some(),
        !select_sequences.is_empty(),
        args.res_overlap.is_some(),
        args.include_names.is_some() || args.exclude_names.is_some(),
    ];
    if sequence_passes.iter().filter(|&&on| on).count() > 1 {
        return Err(TrimError::invalid(
            "sequences",
            "use only one of --clusters, --max-identity, --select-seqs, overlap or name selection",
        ));
    }
    if args.clusters == Some(0) {
        return Err(TrimError::invalid("clusters", "at least one cluster is required"));
    }

    // Compile regex patterns
    for pattern in [&args.include_names, &args.exclude_names].into_iter().flatten() {
        Regex::new(pattern)?;
    }

    // Finishing
    let boundaries = args.boundaries.as_deref().map(parse_boundaries).transpose()?;
    if boundaries.is_some() && !args.terminal_only {
        warnings.push("--boundaries only applies with --terminal-only".to_string());
    }
    let has_column_pass = method.is_some() || manual || !select_columns.is_empty();
    if args.terminal_only && !has_column_pass {
        warnings.push("--terminal-only has no effect without a column selection".to_string());
    }
    if args.block == Some(0) {
        return Err(TrimError::invalid("block", "block size must be positive"));
    }

    let request = TrimRequest {
        method,
        gap_threshold: args.gap_threshold,
        similarity_threshold: args.similarity_threshold,
        consistency_threshold: args.consistency_threshold,
        baseline: args.baseline,
        select_columns,
        select_sequences,
        clusters: args.clusters,
        max_identity: args.max_identity,
        residue_overlap: args.res_overlap,
        sequence_overlap: args.seq_overlap,
        include_names: args.include_names.clone(),
        exclude_names: args.exclude_names.clone(),
        block_size: args.block.unwrap_or(0),
        terminal_only: args.terminal_only,
        complementary: args.complementary,
        keep_all_gap_sequences: args.keep_seqs,
        boundaries: if args.terminal_only { boundaries } else { None },
        windows,
        tuning: Tuning::default(),
    };

    if !request.has_selection() && !args.stats_only {
        warnings.push("no column or sequence selection given, the alignment is only cleaned of all-gap columns".to_string());
    }

    Ok(ValidationResult { request, warnings })
}
