// alignment.rs - Aligned sequence matrix with column and sequence keep-masks

use crate::error::{Result, TrimError};
use bitflags::bitflags;
use serde::Serialize;

/// Gap symbol used throughout the crate
pub const GAP: u8 = b'-';

/// Number of leading residues per sequence inspected by type detection
const TYPE_DETECTION_PREFIX: usize = 100;

/// Fraction of inspected residues that must match an alphabet
const TYPE_DETECTION_RATIO: f32 = 0.95;

const DNA_SYMBOLS: &[u8] = b"ACGTN";
const RNA_SYMBOLS: &[u8] = b"ACGUN";
const DEGENERATE_SYMBOLS: &[u8] = b"ACGTURYKMSWBDHVN";

bitflags! {
    /// Residue alphabet of an alignment
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SequenceType: u8 {
        const DNA = 1 << 1;
        const RNA = 1 << 2;
        const AA = 1 << 3;
        const DEG = 1 << 4;
    }
}

impl SequenceType {
    /// Guess the alphabet from the first residues of every sequence
    pub fn detect<S: AsRef<[u8]>>(sequences: &[S]) -> Self {
        let mut inspected = 0usize;
        let mut dna = 0usize;
        let mut rna = 0usize;
        let mut degenerate = 0usize;

        for sequence in sequences {
            let residues = sequence
                .as_ref()
                .iter()
                .map(|b| b.to_ascii_uppercase())
                .filter(|b| b.is_ascii_alphabetic())
                .take(TYPE_DETECTION_PREFIX);
            for residue in residues {
                inspected += 1;
                dna += DNA_SYMBOLS.contains(&residue) as usize;
                rna += RNA_SYMBOLS.contains(&residue) as usize;
                degenerate += DEGENERATE_SYMBOLS.contains(&residue) as usize;
            }
        }

        if inspected == 0 {
            return SequenceType::AA;
        }
        let limit = inspected as f32 * TYPE_DETECTION_RATIO;
        if dna as f32 >= limit {
            SequenceType::DNA
        } else if rna as f32 >= limit {
            SequenceType::RNA
        } else if degenerate as f32 >= limit {
            if rna > dna {
                SequenceType::RNA | SequenceType::DEG
            } else {
                SequenceType::DNA | SequenceType::DEG
            }
        } else {
            SequenceType::AA
        }
    }

    /// Symbol standing for an undetermined residue
    pub fn indetermination(self) -> u8 {
        if self.contains(SequenceType::AA) {
            b'X'
        } else {
            b'N'
        }
    }

    pub fn label(self) -> &'static str {
        if self.contains(SequenceType::AA) {
            "aa"
        } else if self.contains(SequenceType::DEG) {
            "degenerate nucleotides"
        } else if self.contains(SequenceType::RNA) {
            "rna"
        } else {
            "dna"
        }
    }
}

/// Keep-mask over one alignment dimension.
///
/// Slot `i` holds `Some(i)` while the row or column is kept and `None` once
/// a pass has excluded it. The mask never shrinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct KeepMask {
    slots: Vec<Option<usize>>,
}

impl KeepMask {
    /// Mask keeping every slot
    pub fn all(len: usize) -> Self {
        Self {
            slots: (0..len).map(Some).collect(),
        }
    }

    /// Mask excluding every slot
    pub fn none(len: usize) -> Self {
        Self {
            slots: vec![None; len],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    pub fn is_kept(&self, index: usize) -> bool {
        self.slots[index].is_some()
    }

    #[inline]
    pub fn keep(&mut self, index: usize) {
        self.slots[index] = Some(index);
    }

    #[inline]
    pub fn discard(&mut self, index: usize) {
        self.slots[index] = None;
    }

    pub fn set(&mut self, index: usize, kept: bool) {
        if kept {
            self.keep(index);
        } else {
            self.discard(index);
        }
    }

    /// Number of kept slots
    pub fn count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Original indices of the kept slots, ascending
    pub fn kept(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots.iter().filter_map(|slot| *slot)
    }

    pub fn kept_indices(&self) -> Vec<usize> {
        self.kept().collect()
    }

    /// Flip every slot
    pub fn invert(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            *slot = match slot {
                Some(_) => None,
                None => Some(index),
            };
        }
    }

    /// Keep only the slots kept by `universe` that this mask excludes
    pub fn invert_within(&mut self, universe: &KeepMask) {
        for index in 0..self.slots.len() {
            let kept = universe.is_kept(index) && !self.is_kept(index);
            self.set(index, kept);
        }
    }

    pub fn as_slice(&self) -> &[Option<usize>] {
        &self.slots
    }
}

/// Aligned sequences plus the masks that record what trimming kept.
///
/// Residues are stored upper-cased and `.` is read as a gap. Every row has
/// the same length; filtering only flips mask slots, the rows themselves
/// are never shortened until [`AlignmentMatrix::compacted`] is called.
#[derive(Debug, Clone)]
pub struct AlignmentMatrix {
    names: Vec<String>,
    sequences: Vec<Vec<u8>>,
    kept_columns: KeepMask,
    kept_sequences: KeepMask,
    sequence_type: SequenceType,
    column_correspondence: Vec<usize>,
}

impl AlignmentMatrix {
    /// Build a matrix from already aligned rows, detecting the alphabet
    pub fn new(names: Vec<String>, sequences: Vec<Vec<u8>>) -> Result<Self> {
        if names.len() != sequences.len() {
            return Err(TrimError::format(format!(
                "{} names given for {} sequences",
                names.len(),
                sequences.len()
            )));
        }
        if sequences.is_empty() {
            return Err(TrimError::format("alignment contains no sequences"));
        }

        let residues = sequences[0].len();
        if residues == 0 {
            return Err(TrimError::format(format!(
                "sequence '{}' is empty",
                names[0]
            )));
        }
        for (name, sequence) in names.iter().zip(&sequences) {
            if sequence.len() != residues {
                return Err(TrimError::format(format!(
                    "sequence '{}' has {} residues, expected {} (input is not aligned)",
                    name,
                    sequence.len(),
                    residues
                )));
            }
        }

        let sequences: Vec<Vec<u8>> = sequences
            .into_iter()
            .map(|sequence| {
                sequence
                    .into_iter()
                    .map(|b| if b == b'.' { GAP } else { b.to_ascii_uppercase() })
                    .collect()
            })
            .collect();
        let sequence_type = SequenceType::detect(&sequences);

        Ok(Self {
            kept_columns: KeepMask::all(residues),
            kept_sequences: KeepMask::all(sequences.len()),
            column_correspondence: (0..residues).collect(),
            names,
            sequences,
            sequence_type,
        })
    }

    /// Build a matrix from `(name, residues)` pairs
    pub fn from_records<I, S>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: Into<String>,
    {
        let (names, sequences) = records
            .into_iter()
            .map(|(name, residues)| (name.into(), residues))
            .unzip();
        Self::new(names, sequences)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, sequence: usize) -> &str {
        &self.names[sequence]
    }

    pub fn sequences(&self) -> &[Vec<u8>] {
        &self.sequences
    }

    pub fn sequence(&self, sequence: usize) -> &[u8] {
        &self.sequences[sequence]
    }

    #[inline]
    pub fn residue(&self, sequence: usize, column: usize) -> u8 {
        self.sequences[sequence][column]
    }

    /// Number of rows before any filtering
    pub fn original_sequence_count(&self) -> usize {
        self.sequences.len()
    }

    /// Number of columns before any filtering
    pub fn original_residue_count(&self) -> usize {
        self.kept_columns.len()
    }

    /// Number of rows still kept
    pub fn sequence_count(&self) -> usize {
        self.kept_sequences.count()
    }

    /// Number of columns still kept
    pub fn residue_count(&self) -> usize {
        self.kept_columns.count()
    }

    pub fn kept_columns(&self) -> &KeepMask {
        &self.kept_columns
    }

    pub fn kept_sequences(&self) -> &KeepMask {
        &self.kept_sequences
    }

    pub fn kept_columns_mut(&mut self) -> &mut KeepMask {
        &mut self.kept_columns
    }

    pub fn kept_sequences_mut(&mut self) -> &mut KeepMask {
        &mut self.kept_sequences
    }

    pub fn sequence_type(&self) -> SequenceType {
        self.sequence_type
    }

    /// Override the detected alphabet
    pub fn set_sequence_type(&mut self, sequence_type: SequenceType) {
        self.sequence_type = sequence_type;
    }

    pub fn indetermination(&self) -> u8 {
        self.sequence_type.indetermination()
    }

    /// Residue that is neither a gap nor the indetermination symbol
    #[inline]
    pub fn is_informative(&self, residue: u8) -> bool {
        residue != GAP && residue != self.indetermination()
    }

    /// Residues of a row once gaps are removed, counted over all columns
    pub fn ungapped_length(&self, sequence: usize) -> usize {
        self.sequences[sequence].iter().filter(|&&b| b != GAP).count()
    }

    /// Column of the source alignment each column of this matrix came from
    pub fn column_correspondence(&self) -> &[usize] {
        &self.column_correspondence
    }

    /// Whether `other` keeps exactly the same rows
    pub fn same_sequences(&self, other: &AlignmentMatrix) -> bool {
        self.kept_sequences == other.kept_sequences
    }

    /// Position in this matrix of each name of `reference`, in order
    pub fn sequence_order(&self, reference: &[String]) -> Option<Vec<usize>> {
        reference
            .iter()
            .map(|name| self.names.iter().position(|own| own == name))
            .collect()
    }

    /// New matrix holding only the kept rows and columns
    pub fn compacted(&self) -> AlignmentMatrix {
        let columns = self.kept_columns.kept_indices();
        let rows: Vec<usize> = self.kept_sequences.kept_indices();

        let sequences: Vec<Vec<u8>> = rows
            .iter()
            .map(|&row| columns.iter().map(|&c| self.sequences[row][c]).collect())
            .collect();
        let names: Vec<String> = rows.iter().map(|&row| self.names[row].clone()).collect();

        AlignmentMatrix {
            kept_columns: KeepMask::all(columns.len()),
            kept_sequences: KeepMask::all(rows.len()),
            column_correspondence: columns
                .iter()
                .map(|&c| self.column_correspondence[c])
                .collect(),
            names,
            sequences,
            sequence_type: self.sequence_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: &[(&str, &str)]) -> AlignmentMatrix {
        AlignmentMatrix::from_records(
            rows.iter()
                .map(|(name, seq)| (name.to_string(), seq.as_bytes().to_vec())),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_unaligned_rows() {
        let result = AlignmentMatrix::from_records(vec![
            ("a", b"ACGT".to_vec()),
            ("b", b"ACG".to_vec()),
        ]);
        assert!(matches!(result, Err(TrimError::Format { .. })));
    }

    #[test]
    fn test_rejects_empty_alignment() {
        let result = AlignmentMatrix::new(Vec::new(), Vec::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_normalizes_residues() {
        let alignment = matrix(&[("a", "ac.t"), ("b", "ACGT")]);
        assert_eq!(alignment.sequence(0), b"AC-T");
        assert_eq!(alignment.ungapped_length(0), 3);
    }

    #[test]
    fn test_detects_types() {
        assert_eq!(matrix(&[("a", "ACGT-A"), ("b", "ACGTTA")]).sequence_type(), SequenceType::DNA);
        assert_eq!(matrix(&[("a", "ACGU-A"), ("b", "ACGUUA")]).sequence_type(), SequenceType::RNA);
        assert_eq!(
            matrix(&[("a", "ACRYKM"), ("b", "ACGTWS")]).sequence_type(),
            SequenceType::DNA | SequenceType::DEG
        );
        let protein = matrix(&[("a", "MKLVWEQ"), ("b", "MKIVFEQ")]);
        assert_eq!(protein.sequence_type(), SequenceType::AA);
        assert_eq!(protein.indetermination(), b'X');
        assert!(!protein.is_informative(b'X'));
        assert!(protein.is_informative(b'N'));
    }

    #[test]
    fn test_mask_operations() {
        let mut mask = KeepMask::all(5);
        mask.discard(1);
        mask.discard(3);
        assert_eq!(mask.count(), 3);
        assert_eq!(mask.kept_indices(), vec![0, 2, 4]);
        assert_eq!(mask.as_slice()[2], Some(2));

        let original = mask.clone();
        mask.invert();
        assert_eq!(mask.kept_indices(), vec![1, 3]);
        mask.invert();
        assert_eq!(mask, original);

        let mut derived = KeepMask::all(5);
        derived.discard(0);
        derived.discard(1);
        derived.invert_within(&original);
        assert_eq!(derived.kept_indices(), vec![0]);
    }

    #[test]
    fn test_compacted_keeps_correspondence() {
        let mut alignment = matrix(&[("a", "AC-GT"), ("b", "ACTGT"), ("c", "A--GT")]);
        alignment.kept_columns_mut().discard(2);
        alignment.kept_sequences_mut().discard(1);
        let compact = alignment.compacted();
        assert_eq!(compact.names(), &["a".to_string(), "c".to_string()]);
        assert_eq!(compact.sequence(0), b"ACGT");
        assert_eq!(compact.sequence(1), b"A-GT");
        assert_eq!(compact.column_correspondence(), &[0, 1, 3, 4]);

        let mut again = compact.clone();
        again.kept_columns_mut().discard(0);
        assert_eq!(again.compacted().column_correspondence(), &[1, 3, 4]);
    }

    #[test]
    fn test_sequence_order() {
        let alignment = matrix(&[("a", "AC"), ("b", "AC"), ("c", "AC")]);
        let reference = vec!["c".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(alignment.sequence_order(&reference), Some(vec![2, 0, 1]));
        assert_eq!(alignment.sequence_order(&["z".to_string()]), None);
    }
}
