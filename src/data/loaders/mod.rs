// mod.rs - File loaders

pub mod fasta;

pub use fasta::{compareset_paths, read_compareset};
