// substitution.rs - Residue similarity matrices and the distances derived from them

use crate::data::alignment::SequenceType;
use crate::error::{Result, TrimError};
use std::fs;
use std::path::Path;

const AA_SYMBOLS: &[u8] = b"ARNDCQEGHILKMFPSTWYV";
const NT_SYMBOLS: &[u8] = b"ACGTU";
const NT_DEGENERATE_SYMBOLS: &[u8] = b"ACGTURYKMSWBDHV";

#[rustfmt::skip]
const BLOSUM62: [[f32; 20]; 20] = [
    [ 4., -1., -2., -2.,  0., -1., -1.,  0., -2., -1., -1., -1., -1., -2., -1.,  1.,  0., -3., -2.,  0.],
    [-1.,  5.,  0., -2., -3.,  1.,  0., -2.,  0., -3., -2.,  2., -1., -3., -2., -1., -1., -3., -2., -3.],
    [-2.,  0.,  6.,  1., -3.,  0.,  0.,  0.,  1., -3., -3.,  0., -2., -3., -2.,  1.,  0., -4., -2., -3.],
    [-2., -2.,  1.,  6., -3.,  0.,  2., -1., -1., -3., -4., -1., -3., -3., -1.,  0., -1., -4., -3., -3.],
    [ 0., -3., -3., -3.,  9., -3., -4., -3., -3., -1., -1., -3., -1., -2., -3., -1., -1., -2., -2., -1.],
    [-1.,  1.,  0.,  0., -3.,  5.,  2., -2.,  0., -3., -2.,  1.,  0., -3., -1.,  0., -1., -2., -1., -2.],
    [-1.,  0.,  0.,  2., -4.,  2.,  5., -2.,  0., -3., -3.,  1., -2., -3., -1.,  0., -1., -3., -2., -2.],
    [ 0., -2.,  0., -1., -3., -2., -2.,  6., -2., -4., -4., -2., -3., -3., -2.,  0., -2., -2., -3., -3.],
    [-2.,  0.,  1., -1., -3.,  0.,  0., -2.,  8., -3., -3., -1., -2., -1., -2., -1., -2., -2.,  2., -3.],
    [-1., -3., -3., -3., -1., -3., -3., -4., -3.,  4.,  2., -3.,  1.,  0., -3., -2., -1., -3., -1.,  3.],
    [-1., -2., -3., -4., -1., -2., -3., -4., -3.,  2.,  4., -2.,  2.,  0., -3., -2., -1., -2., -1.,  1.],
    [-1.,  2.,  0., -1., -3.,  1.,  1., -2., -1., -3., -2.,  5., -1., -3., -1.,  0., -1., -3., -2., -2.],
    [-1., -1., -2., -3., -1.,  0., -2., -3., -2.,  1.,  2., -1.,  5.,  0., -2., -1., -1., -1., -1.,  1.],
    [-2., -3., -3., -3., -2., -3., -3., -3., -1.,  0.,  0., -3.,  0.,  6., -4., -2., -2.,  1.,  3., -1.],
    [-1., -2., -2., -1., -3., -1., -1., -2., -2., -3., -3., -1., -2., -4.,  7., -1., -1., -4., -3., -2.],
    [ 1., -1.,  1.,  0., -1.,  0.,  0.,  0., -1., -2., -2.,  0., -1., -2., -1.,  4.,  1., -3., -2., -2.],
    [ 0., -1.,  0., -1., -1., -1., -1., -2., -2., -1., -1., -1., -1., -2., -1.,  1.,  5., -2., -2.,  0.],
    [-3., -3., -4., -4., -2., -2., -3., -2., -2., -3., -2., -3., -1.,  1., -4., -3., -2., 11.,  2., -3.],
    [-2., -2., -2., -3., -2., -1., -2., -3.,  2., -1., -1., -2., -1.,  3., -3., -2., -2.,  2.,  7., -1.],
    [ 0., -3., -3., -3., -1., -2., -2., -3., -3.,  3.,  1., -2.,  1., -1., -2., -2.,  0., -3., -1.,  4.],
];

// Rows for the ambiguity codes spread their weight over the bases they stand for:
// R = A|G, Y = C|T|U, K = G|T|U, M = A|C, S = C|G, W = A|T|U, B/D/H/V = three bases.
const Q: f32 = 0.25;
const S: f32 = 1.0 / 6.0;
#[rustfmt::skip]
const NT_DEGENERATE: [[f32; 15]; 15] = [
    [1., 0., 0., 0., 0., 0., 0., 0., 0., 0., 0., 0., 0., 0., 0.],
    [0., 1., 0., 0., 0., 0., 0., 0., 0., 0., 0., 0., 0., 0., 0.],
    [0., 0., 1., 0., 0., 0., 0., 0., 0., 0., 0., 0., 0., 0., 0.],
    [0., 0., 0., 1., 0., 0., 0., 0., 0., 0., 0., 0., 0., 0., 0.],
    [0., 0., 0., 0., 1., 0., 0., 0., 0., 0., 0., 0., 0., 0., 0.],
    [Q,  0., Q,  0., 0., Q,  0., 0., 0., 0., 0., 0., 0., 0., 0.],
    [0., Q,  0., Q,  Q,  0., Q,  0., 0., 0., 0., 0., 0., 0., 0.],
    [0., 0., Q,  Q,  Q,  0., 0., Q,  0., 0., 0., 0., 0., 0., 0.],
    [Q,  Q,  0., 0., 0., 0., 0., 0., Q,  0., 0., 0., 0., 0., 0.],
    [0., Q,  Q,  0., 0., 0., 0., 0., 0., Q,  0., 0., 0., 0., 0.],
    [Q,  0., 0., Q,  Q,  0., 0., 0., 0., 0., Q,  0., 0., 0., 0.],
    [0., S,  S,  S,  S,  0., 0., 0., 0., 0., 0., S,  0., 0., 0.],
    [S,  0., S,  S,  S,  0., 0., 0., 0., 0., 0., 0., S,  0., 0.],
    [S,  S,  0., S,  S,  0., 0., 0., 0., 0., 0., 0., 0., S,  0.],
    [S,  S,  S,  0., 0., 0., 0., 0., 0., 0., 0., 0., 0., 0., S ],
];

/// Which built-in matrix to use for an alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinMatrix {
    Blosum62,
    NucleotideIdentity,
    DegenerateNucleotides,
    /// Plain identity over the degenerate alphabet
    DegenerateIdentity,
}

impl std::str::FromStr for BuiltinMatrix {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "blosum62" => Ok(BuiltinMatrix::Blosum62),
            "nt" | "nucleotide" => Ok(BuiltinMatrix::NucleotideIdentity),
            "degenerate" | "deg" => Ok(BuiltinMatrix::DegenerateNucleotides),
            "degenerate-identity" | "alt1" => Ok(BuiltinMatrix::DegenerateIdentity),
            _ => Err(format!(
                "Invalid matrix: {}. Valid options: blosum62, nt, degenerate, degenerate-identity",
                s
            )),
        }
    }
}

/// Similarity scores between residues plus the Euclidean distances between
/// their score profiles, which is what conservation scoring consumes.
#[derive(Debug, Clone)]
pub struct SubstitutionMatrix {
    symbols: Vec<u8>,
    lookup: [Option<usize>; 26],
    similarity: Vec<Vec<f32>>,
    distance: Vec<Vec<f32>>,
}

impl SubstitutionMatrix {
    /// Build from a symbol list and a square score table
    pub fn from_scores(symbols: &[u8], similarity: Vec<Vec<f32>>) -> Result<Self> {
        let size = symbols.len();
        if size == 0 {
            return Err(TrimError::matrix(1, "no residue symbols given"));
        }
        if similarity.len() != size || similarity.iter().any(|row| row.len() != size) {
            return Err(TrimError::matrix(
                1,
                format!("score table is not {}x{}", size, size),
            ));
        }

        let mut seen = [false; 26];
        for &symbol in symbols {
            let upper = symbol.to_ascii_uppercase();
            if !upper.is_ascii_uppercase() {
                return Err(TrimError::matrix(
                    1,
                    format!("'{}' is not a residue symbol", symbol as char),
                ));
            }
            if std::mem::replace(&mut seen[(upper - b'A') as usize], true) {
                return Err(TrimError::matrix(
                    1,
                    format!("symbol '{}' appears twice", upper as char),
                ));
            }
        }

        Ok(Self::assemble(symbols, similarity))
    }

    /// Index symbols and derive distances from an already validated table
    fn assemble(symbols: &[u8], similarity: Vec<Vec<f32>>) -> Self {
        let size = symbols.len();
        let mut lookup = [None; 26];
        let symbols: Vec<u8> = symbols.iter().map(|b| b.to_ascii_uppercase()).collect();
        for (position, &symbol) in symbols.iter().enumerate() {
            lookup[(symbol - b'A') as usize] = Some(position);
        }

        let mut distance = vec![vec![0.0f32; size]; size];
        for i in 0..size {
            for j in (i + 1)..size {
                let sum: f32 = (0..size)
                    .map(|k| {
                        let delta = similarity[k][j] - similarity[k][i];
                        delta * delta
                    })
                    .sum();
                distance[i][j] = sum.sqrt();
                distance[j][i] = distance[i][j];
            }
        }

        Self {
            symbols,
            lookup,
            similarity,
            distance,
        }
    }

    pub fn builtin(kind: BuiltinMatrix) -> Self {
        fn rows<const N: usize>(table: &[[f32; N]; N]) -> Vec<Vec<f32>> {
            table.iter().map(|row| row.to_vec()).collect()
        }
        fn identity(size: usize) -> Vec<Vec<f32>> {
            (0..size)
                .map(|i| (0..size).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
                .collect()
        }

        let (symbols, scores) = match kind {
            BuiltinMatrix::Blosum62 => (AA_SYMBOLS, rows(&BLOSUM62)),
            BuiltinMatrix::NucleotideIdentity => (NT_SYMBOLS, identity(NT_SYMBOLS.len())),
            BuiltinMatrix::DegenerateNucleotides => (NT_DEGENERATE_SYMBOLS, rows(&NT_DEGENERATE)),
            BuiltinMatrix::DegenerateIdentity => {
                (NT_DEGENERATE_SYMBOLS, identity(NT_DEGENERATE_SYMBOLS.len()))
            }
        };
        Self::assemble(symbols, scores)
    }

    /// Default matrix for an alphabet
    pub fn default_for(sequence_type: SequenceType) -> Self {
        if sequence_type.contains(SequenceType::AA) {
            Self::builtin(BuiltinMatrix::Blosum62)
        } else if sequence_type.contains(SequenceType::DEG) {
            Self::builtin(BuiltinMatrix::DegenerateNucleotides)
        } else {
            Self::builtin(BuiltinMatrix::NucleotideIdentity)
        }
    }

    /// Parse a matrix file.
    ///
    /// The first line lists the symbols; each following line holds one row
    /// of scores, optionally prefixed by the symbol of that row. Asymmetric
    /// tables are averaged across the diagonal.
    pub fn from_text(text: &str) -> Result<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(number, line)| (number + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

        let (_, header) = lines
            .next()
            .ok_or_else(|| TrimError::matrix(1, "file is empty"))?;
        let symbols: Vec<u8> = header
            .bytes()
            .filter(|b| !b.is_ascii_whitespace())
            .map(|b| b.to_ascii_uppercase())
            .collect();
        let size = symbols.len();

        let mut scores: Vec<Option<Vec<f32>>> = vec![None; size];
        let mut labeled: Option<bool> = None;
        let mut row_count = 0usize;

        for (number, line) in lines {
            let mut tokens: Vec<&str> = line.split_whitespace().collect();
            let has_label = tokens[0].parse::<f32>().is_err();
            if *labeled.get_or_insert(has_label) != has_label {
                return Err(TrimError::matrix(
                    number,
                    "rows mix labeled and unlabeled formats",
                ));
            }

            let row = if has_label {
                let label = tokens.remove(0).as_bytes()[0].to_ascii_uppercase();
                symbols.iter().position(|&s| s == label).ok_or_else(|| {
                    TrimError::matrix(number, format!("unknown row symbol '{}'", label as char))
                })?
            } else {
                row_count
            };
            if row >= size {
                return Err(TrimError::matrix(number, "more rows than symbols"));
            }
            if scores[row].is_some() {
                return Err(TrimError::matrix(number, "row given twice"));
            }
            if tokens.len() != size {
                return Err(TrimError::matrix(
                    number,
                    format!("expected {} scores, found {}", size, tokens.len()),
                ));
            }

            let values = tokens
                .iter()
                .map(|token| {
                    token.parse::<f32>().map_err(|_| {
                        TrimError::matrix(number, format!("'{}' is not a number", token))
                    })
                })
                .collect::<Result<Vec<f32>>>()?;
            scores[row] = Some(values);
            row_count += 1;
        }

        let mut similarity: Vec<Vec<f32>> = scores
            .into_iter()
            .enumerate()
            .map(|(row, values)| {
                values.ok_or_else(|| {
                    TrimError::matrix(
                        0,
                        format!("missing row for symbol '{}'", symbols[row] as char),
                    )
                })
            })
            .collect::<Result<_>>()?;

        for i in 0..size {
            for j in (i + 1)..size {
                let mean = (similarity[i][j] + similarity[j][i]) / 2.0;
                similarity[i][j] = mean;
                similarity[j][i] = mean;
            }
        }

        Self::from_scores(&symbols, similarity)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_text(&text)
    }

    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    #[inline]
    fn position(&self, residue: u8) -> Option<usize> {
        let upper = residue.to_ascii_uppercase();
        if upper.is_ascii_uppercase() {
            self.lookup[(upper - b'A') as usize]
        } else {
            None
        }
    }

    pub fn contains(&self, residue: u8) -> bool {
        self.position(residue).is_some()
    }

    /// Distance between two residues, `None` if either is not in the matrix
    #[inline]
    pub fn distance(&self, a: u8, b: u8) -> Option<f32> {
        Some(self.distance[self.position(a)?][self.position(b)?])
    }

    pub fn similarity(&self, a: u8, b: u8) -> Option<f32> {
        Some(self.similarity[self.position(a)?][self.position(b)?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_distances() {
        let matrix = SubstitutionMatrix::builtin(BuiltinMatrix::NucleotideIdentity);
        assert_eq!(matrix.distance(b'A', b'A'), Some(0.0));
        let d = matrix.distance(b'A', b'c').unwrap();
        assert!((d - 2.0f32.sqrt()).abs() < 1e-6);
        assert_eq!(matrix.distance(b'A', b'N'), None);
        assert_eq!(matrix.distance(b'-', b'A'), None);
    }

    #[test]
    fn test_blosum_is_symmetric() {
        let matrix = SubstitutionMatrix::builtin(BuiltinMatrix::Blosum62);
        assert_eq!(matrix.similarity(b'W', b'W'), Some(11.0));
        for &a in AA_SYMBOLS {
            assert_eq!(matrix.distance(a, a), Some(0.0));
            for &b in AA_SYMBOLS {
                assert_eq!(matrix.distance(a, b), matrix.distance(b, a));
            }
        }
        let close = matrix.distance(b'I', b'V').unwrap();
        let far = matrix.distance(b'I', b'W').unwrap();
        assert!(close < far);
    }

    #[test]
    fn test_default_for_type() {
        let dna = SubstitutionMatrix::default_for(SequenceType::DNA);
        assert_eq!(dna.symbols(), NT_SYMBOLS);
        let degenerate = SubstitutionMatrix::default_for(SequenceType::DNA | SequenceType::DEG);
        assert!(degenerate.contains(b'R'));
        let protein = SubstitutionMatrix::default_for(SequenceType::AA);
        assert!(protein.contains(b'W'));
    }

    #[test]
    fn test_parse_labeled_asymmetric() {
        let text = "A B\nA 1 0\nB 2 1\n";
        let matrix = SubstitutionMatrix::from_text(text).unwrap();
        assert_eq!(matrix.similarity(b'A', b'B'), Some(1.0));
        assert_eq!(matrix.similarity(b'B', b'A'), Some(1.0));
        assert_eq!(matrix.distance(b'A', b'B'), Some(0.0));
    }

    #[test]
    fn test_parse_unlabeled() {
        let text = "# comment\nACG\n1 0 0\n0 1 0\n0 0 1\n";
        let matrix = SubstitutionMatrix::from_text(text).unwrap();
        assert_eq!(matrix.symbols(), b"ACG");
        assert!((matrix.distance(b'A', b'G').unwrap() - 2.0f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            SubstitutionMatrix::from_text("AB\n1 0\n"),
            Err(TrimError::InvalidSubstitutionMatrix { .. })
        ));
        assert!(SubstitutionMatrix::from_text("AB\n1 0 3\n0 1\n").is_err());
        assert!(SubstitutionMatrix::from_text("AA\n1 0\n0 1\n").is_err());
        assert!(SubstitutionMatrix::from_text("AB\nA 1 0\n0 1\n").is_err());
        assert!(SubstitutionMatrix::from_text("AB\nA 1 x\nB 0 1\n").is_err());
        assert!(SubstitutionMatrix::from_text("").is_err());
    }

    #[test]
    fn test_builtin_names() {
        assert_eq!("BLOSUM62".parse::<BuiltinMatrix>(), Ok(BuiltinMatrix::Blosum62));
        assert!("pam250".parse::<BuiltinMatrix>().is_err());
    }
}
