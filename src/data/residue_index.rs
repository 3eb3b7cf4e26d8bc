// residue_index.rs - Sequence x column map of ungapped residue ordinals

use crate::data::alignment::{AlignmentMatrix, GAP};

/// Ordinal stored for a gap
pub const GAP_ORDINAL: u32 = 0;

/// For every sequence and column, the 1-based position of the residue in the
/// ungapped sequence, or [`GAP_ORDINAL`].
///
/// Two alignments of the same sequences agree on a pair of residues when the
/// pair shares a column in both; comparing ordinals is what makes that check
/// independent of where the aligners placed their gaps.
#[derive(Debug, Clone)]
pub struct ResidueIndex {
    names: Vec<String>,
    ordinals: Vec<Vec<u32>>,
    // positions[row][ordinal - 1] = column holding that residue
    positions: Vec<Vec<usize>>,
}

impl ResidueIndex {
    /// Index every row and column of `alignment`, masks ignored
    pub fn from_alignment(alignment: &AlignmentMatrix) -> Self {
        let mut ordinals = Vec::with_capacity(alignment.original_sequence_count());
        let mut positions = Vec::with_capacity(alignment.original_sequence_count());

        for sequence in alignment.sequences() {
            let mut row = Vec::with_capacity(sequence.len());
            let mut columns = Vec::new();
            for (column, &residue) in sequence.iter().enumerate() {
                if residue == GAP {
                    row.push(GAP_ORDINAL);
                } else {
                    columns.push(column);
                    row.push(columns.len() as u32);
                }
            }
            ordinals.push(row);
            positions.push(columns);
        }

        Self {
            names: alignment.names().to_vec(),
            ordinals,
            positions,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn sequence_count(&self) -> usize {
        self.ordinals.len()
    }

    pub fn residue_count(&self) -> usize {
        self.ordinals.first().map_or(0, Vec::len)
    }

    #[inline]
    pub fn ordinal(&self, row: usize, column: usize) -> u32 {
        self.ordinals[row][column]
    }

    /// Ordinals of every row at `column`
    pub fn column(&self, column: usize) -> Vec<u32> {
        self.ordinals.iter().map(|row| row[column]).collect()
    }

    /// Column where `row` holds its `ordinal`-th residue
    #[inline]
    pub fn column_of(&self, ordinal: u32, row: usize) -> Option<usize> {
        if ordinal == GAP_ORDINAL {
            return None;
        }
        self.positions[row].get(ordinal as usize - 1).copied()
    }

    /// Ordinals of the column where `row` holds its `ordinal`-th residue
    pub fn column_containing(&self, ordinal: u32, row: usize) -> Option<Vec<u32>> {
        self.column_of(ordinal, row).map(|column| self.column(column))
    }

    /// Rearrange rows so that new row `i` is old row `order[i]`
    pub fn reorder(&mut self, order: &[usize]) {
        self.names = order.iter().map(|&i| self.names[i].clone()).collect();
        self.ordinals = order.iter().map(|&i| self.ordinals[i].clone()).collect();
        self.positions = order.iter().map(|&i| self.positions[i].clone()).collect();
    }
}
