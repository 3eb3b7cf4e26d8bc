// mod.rs - Output writers module

use crate::core::TrimOutcome;
use crate::data::AlignmentMatrix;
use crate::error::Result;
use crate::stats::ConsistencyProfile;
use serde::Serialize;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Ensure parent directory exists before creating file
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    ensure_parent_dir(path)?;
    Ok(BufWriter::new(File::create(path)?))
}

/// Provenance lines opening every table
fn write_provenance<W: Write>(writer: &mut W, command_line: &str) -> Result<()> {
    writeln!(writer, "# Command: {}", command_line)?;
    writeln!(
        writer,
        "# Generated: {}",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(writer, "# msatrim v{}", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}

fn tsv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new().delimiter(b'\t').from_writer(writer)
}

/// Write the kept rows and columns as FASTA
pub fn write_alignment(path: &Path, alignment: &AlignmentMatrix) -> Result<()> {
    alignment.to_fasta(path)?;
    println!("✅ Trimmed alignment written to: {}", path.display());
    Ok(())
}

/// One row of the per-column statistics table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnRecord {
    pub column: usize,
    pub kept: bool,
    pub gaps: Option<f32>,
    pub gap_score: Option<f32>,
    pub similarity: Option<f32>,
    pub consistency: Option<f32>,
}

/// Statistics of every input column; columns the scoring pass did not see
/// are left empty
pub fn column_records(outcome: &mut TrimOutcome) -> Result<Vec<ColumnRecord>> {
    let stats = &mut outcome.statistics;
    let scored = &outcome.scored;
    let sequences = scored.sequence_count().max(1) as f32;

    let gaps = stats.gaps(scored)?.values().to_vec();
    let similarity = stats.conservation(scored)?.values().to_vec();
    let consistency = stats.consistency().map(|profile| profile.values().to_vec());

    let records = (0..scored.original_residue_count())
        .map(|column| {
            let seen = scored.kept_columns().is_kept(column);
            let value = |values: &[f32]| seen.then(|| values[column]);
            ColumnRecord {
                column,
                kept: outcome.masked.kept_columns().is_kept(column),
                gaps: value(&gaps),
                gap_score: value(&gaps).map(|g| 1.0 - g / sequences),
                similarity: value(&similarity),
                consistency: consistency.as_ref().map(|values| values[column]),
            }
        })
        .collect();
    Ok(records)
}

/// Per-column statistics as TSV
pub fn write_column_stats(path: &Path, outcome: &mut TrimOutcome, command_line: &str) -> Result<()> {
    let records = column_records(outcome)?;
    let mut writer = create(path)?;
    write_provenance(&mut writer, command_line)?;

    let mut table = tsv_writer(writer);
    for record in &records {
        table.serialize(record)?;
    }
    table.flush()?;
    println!("📊 Column statistics written to: {}", path.display());
    Ok(())
}

/// Gap distribution table as TSV
pub fn write_gap_distribution(path: &Path, outcome: &mut TrimOutcome, command_line: &str) -> Result<()> {
    let distribution = outcome.statistics.gaps(&outcome.scored)?.distribution();
    let mut writer = create(path)?;
    write_provenance(&mut writer, command_line)?;

    let mut table = tsv_writer(writer);
    for bin in &distribution {
        table.serialize(bin)?;
    }
    table.flush()?;
    println!("📊 Gap distribution written to: {}", path.display());
    Ok(())
}

/// `#ColumnsMap` line listing the original number of every kept column
pub fn column_numbering(alignment: &AlignmentMatrix) -> String {
    let columns: Vec<String> = alignment
        .column_correspondence()
        .iter()
        .map(|c| c.to_string())
        .collect();
    format!("#ColumnsMap\t{}", columns.join(", "))
}

pub fn write_column_numbering(path: &Path, alignment: &AlignmentMatrix) -> Result<()> {
    let mut writer = create(path)?;
    writeln!(writer, "{}", column_numbering(alignment))?;
    writer.flush()?;
    println!("🔢 Column numbering written to: {}", path.display());
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct AlignmentScore<'a> {
    index: usize,
    path: &'a str,
    consistency: f32,
    selected: bool,
}

/// Consistency of every compareset member as TSV
pub fn write_alignment_scores(
    path: &Path,
    members: &[PathBuf],
    profile: &ConsistencyProfile,
    command_line: &str,
) -> Result<()> {
    let mut writer = create(path)?;
    write_provenance(&mut writer, command_line)?;

    let mut table = tsv_writer(writer);
    for (index, (member, &consistency)) in members.iter().zip(profile.alignment_scores()).enumerate() {
        let name = member.to_string_lossy();
        table.serialize(AlignmentScore {
            index,
            path: &name,
            consistency,
            selected: profile.selected() == Some(index),
        })?;
    }
    table.flush()?;
    println!("📊 Alignment scores written to: {}", path.display());
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
struct ColumnConsistency {
    column: usize,
    consistency: f32,
}

/// Per-column consistency of the scored alignment as TSV
pub fn write_column_consistency(path: &Path, profile: &ConsistencyProfile, command_line: &str) -> Result<()> {
    let mut writer = create(path)?;
    write_provenance(&mut writer, command_line)?;

    let mut table = tsv_writer(writer);
    for (column, &consistency) in profile.values().iter().enumerate() {
        table.serialize(ColumnConsistency { column, consistency })?;
    }
    table.flush()?;
    println!("📊 Column consistency written to: {}", path.display());
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct AlignmentSummary {
    pub sequences: usize,
    pub residues: usize,
    pub sequence_type: String,
}

impl AlignmentSummary {
    fn of(alignment: &AlignmentMatrix) -> Self {
        Self {
            sequences: alignment.sequence_count(),
            residues: alignment.residue_count(),
            sequence_type: alignment.sequence_type().label().to_string(),
        }
    }
}

/// JSON summary of a run
#[derive(Debug, Clone, Serialize)]
pub struct TrimReport {
    pub version: String,
    pub generated: String,
    pub command: String,
    pub input: AlignmentSummary,
    pub output: AlignmentSummary,
    pub method: Option<String>,
    pub steps: Vec<String>,
    pub selected_alignment: Option<usize>,
    pub alignment_scores: Vec<f32>,
    pub kept_columns: Vec<usize>,
    pub removed_sequences: Vec<String>,
}

impl TrimReport {
    pub fn from_outcome(outcome: &TrimOutcome, command_line: &str) -> Self {
        let removed_sequences = (0..outcome.masked.original_sequence_count())
            .filter(|&row| !outcome.masked.kept_sequences().is_kept(row))
            .map(|row| outcome.masked.name(row).to_string())
            .collect();
        let alignment_scores = outcome
            .statistics
            .consistency()
            .map(|profile| profile.alignment_scores().to_vec())
            .unwrap_or_default();

        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            generated: chrono::Utc::now().to_rfc3339(),
            command: command_line.to_string(),
            input: AlignmentSummary::of(&outcome.input),
            output: AlignmentSummary::of(&outcome.trimmed),
            method: outcome.method.map(|m| m.to_string()),
            steps: outcome.steps.clone(),
            selected_alignment: outcome.selected_alignment,
            alignment_scores,
            kept_columns: outcome.kept_columns(),
            removed_sequences,
        }
    }
}

pub fn write_report(path: &Path, report: &TrimReport) -> Result<()> {
    let mut writer = create(path)?;
    serde_json::to_writer_pretty(&mut writer, report)?;
    writeln!(writer)?;
    writer.flush()?;
    println!("📝 Report written to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{run, TrimInput, TrimMethod, TrimRequest};
    use std::fs;
    use tempfile::tempdir;

    fn outcome() -> TrimOutcome {
        let alignment = AlignmentMatrix::from_records(vec![
            ("a", b"AC-GT".to_vec()),
            ("b", b"ACAGT".to_vec()),
            ("c", b"AC-GA".to_vec()),
        ])
        .unwrap();
        let request = TrimRequest {
            method: Some(TrimMethod::NoGaps),
            ..Default::default()
        };
        let input = TrimInput {
            alignment: Some(alignment),
            ..Default::default()
        };
        run(&request, input).unwrap()
    }

    #[test]
    fn test_column_stats_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("columns.tsv");
        let mut outcome = outcome();
        write_column_stats(&path, &mut outcome, "msatrim --method nogaps").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "# Command: msatrim --method nogaps");
        assert!(lines[1].starts_with("# Generated: "));
        assert_eq!(lines[3], "column\tkept\tgaps\tgap_score\tsimilarity\tconsistency");
        assert_eq!(lines.len(), 4 + 5);
        assert!(lines[6].starts_with("2\tfalse\t2.0\t"));
    }

    #[test]
    fn test_gap_distribution_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gaps.tsv");
        let mut outcome = outcome();
        write_gap_distribution(&path, &mut outcome, "msatrim").unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.lines().nth(3).unwrap().starts_with("gaps\tcolumns"));
    }

    #[test]
    fn test_column_numbering() {
        let outcome = outcome();
        assert_eq!(column_numbering(&outcome.trimmed), "#ColumnsMap\t0, 1, 3, 4");
    }

    #[test]
    fn test_alignment_scores_table() {
        let alignment = AlignmentMatrix::from_records(vec![("a", b"AC".to_vec()), ("b", b"AC".to_vec())]).unwrap();
        let profile = ConsistencyProfile::compare_and_choose(&[alignment.clone(), alignment]).unwrap();
        let members = vec![PathBuf::from("one.fa"), PathBuf::from("two.fa")];

        let dir = tempdir().unwrap();
        let path = dir.path().join("scores.tsv");
        write_alignment_scores(&path, &members, &profile, "compareset").unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let rows: Vec<&str> = content.lines().skip(3).collect();
        assert_eq!(rows, vec!["index\tpath\tconsistency\tselected", "0\tone.fa\t1.0\ttrue", "1\ttwo.fa\t1.0\tfalse"]);

        let path = dir.path().join("columns.tsv");
        write_column_consistency(&path, &profile, "compareset").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 3 + 1 + 2);
    }

    #[test]
    fn test_report() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");
        let outcome = outcome();
        write_report(&path, &TrimReport::from_outcome(&outcome, "msatrim")).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["method"], "nogaps");
        assert_eq!(value["input"]["residues"], 5);
        assert_eq!(value["output"]["residues"], 4);
        assert_eq!(value["kept_columns"], serde_json::json!([0, 1, 3, 4]));
        assert_eq!(value["removed_sequences"], serde_json::json!([]));
    }
}
