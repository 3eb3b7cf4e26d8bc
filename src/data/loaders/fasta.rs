// fasta.rs - FASTA reader and writer for aligned sequences

use crate::data::alignment::AlignmentMatrix;
use crate::error::{Result, TrimError};
use bio::io::fasta;
use log::debug;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

impl AlignmentMatrix {
    /// Load an aligned FASTA file
    pub fn from_fasta(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            TrimError::format(format!("Failed to open FASTA file {}: {}", path.display(), e))
        })?;
        Self::read_fasta(BufReader::new(file)).map_err(|e| match e {
            TrimError::Format { message } => {
                TrimError::format(format!("{}: {}", path.display(), message))
            }
            other => other,
        })
    }

    /// Parse aligned FASTA records from any reader
    pub fn read_fasta<R: Read>(reader: R) -> Result<Self> {
        let reader = fasta::Reader::new(reader);
        let mut names = Vec::new();
        let mut sequences = Vec::new();
        let mut seen = HashSet::new();

        for record_result in reader.records() {
            let record =
                record_result.map_err(|e| TrimError::format(format!("Invalid FASTA record: {}", e)))?;
            let id = record.id().to_string();
            if !seen.insert(id.clone()) {
                return Err(TrimError::format(format!("duplicated sequence name '{}'", id)));
            }
            names.push(id);
            sequences.push(record.seq().to_vec());
        }

        debug!("read {} FASTA records", names.len());
        AlignmentMatrix::new(names, sequences)
    }

    /// Write the kept rows and columns as FASTA
    pub fn write_fasta<W: Write>(&self, writer: W) -> Result<()> {
        let compact = self.compacted();
        let mut writer = fasta::Writer::new(writer);
        for (name, sequence) in compact.names().iter().zip(compact.sequences()) {
            writer.write(name, None, sequence)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn to_fasta(&self, path: &Path) -> Result<()> {
        crate::output::ensure_parent_dir(path)?;
        let file = File::create(path)?;
        self.write_fasta(file)
    }
}

/// Paths listed in a compareset file, one alignment per line.
///
/// Blank lines and `#` comments are skipped. Relative paths are resolved
/// against the directory of the list file.
pub fn compareset_paths(list_path: &Path) -> Result<Vec<PathBuf>> {
    let file = File::open(list_path).map_err(|e| {
        TrimError::format(format!(
            "Failed to open compareset {}: {}",
            list_path.display(),
            e
        ))
    })?;
    let base = list_path.parent().unwrap_or_else(|| Path::new(""));

    let mut paths = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let entry = line.trim();
        if entry.is_empty() || entry.starts_with('#') {
            continue;
        }
        paths.push(base.join(entry));
    }

    if paths.is_empty() {
        return Err(TrimError::EmptyCompareset);
    }
    Ok(paths)
}

/// Read every alignment of a compareset
pub fn read_compareset(list_path: &Path) -> Result<Vec<(PathBuf, AlignmentMatrix)>> {
    compareset_paths(list_path)?
        .into_iter()
        .map(|path| {
            let alignment = AlignmentMatrix::from_fasta(&path)?;
            Ok((path, alignment))
        })
        .collect()
}
