// mod.rs - Alignment data structures module

pub mod alignment;
pub mod loaders;
pub mod residue_index;
pub mod substitution;

// Re-export main types for convenience
pub use alignment::{AlignmentMatrix, KeepMask, SequenceType, GAP};
pub use residue_index::ResidueIndex;
pub use substitution::{BuiltinMatrix, SubstitutionMatrix};
pub use loaders::{compareset_paths, read_compareset};
