// lib.rs - msatrim library root

//! # msatrim - Automated trimming of multiple sequence alignments
//!
//! This library removes poorly aligned columns and unwanted sequences from
//! multiple sequence alignments. Columns are scored by gap content, residue
//! conservation under a substitution matrix, and consistency across a set of
//! alternative alignments of the same sequences.
//!
//! ## Features
//!
//! - **Automated methods**: gappyout, strict, strictplus, automated1 and nogaps
//! - **Manual thresholds**: gap, similarity and consistency cuts with a baseline
//! - **Sequence selection**: clustering by identity, overlap and name patterns
//! - **Compareset**: choose the most consistent alignment of a set
//! - **Reports**: per-column statistics, gap distribution and a JSON summary
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use msatrim::prelude::*;
//!
//! let alignment = AlignmentMatrix::from_fasta(std::path::Path::new("aln.fasta"))?;
//! let request = TrimRequest {
//!     method: Some(TrimMethod::Gappyout),
//!     ..Default::default()
//! };
//! let input = TrimInput {
//!     alignment: Some(alignment),
//!     ..Default::default()
//! };
//! let outcome = run(&request, input)?;
//! println!("{} columns kept", outcome.trimmed.residue_count());
//! # Ok::<(), TrimError>(())
//! ```

// Re-export all main modules
pub mod cli;
pub mod core;
pub mod data;
pub mod error;
pub mod output;
pub mod stats;

// Convenience prelude for common imports
pub mod prelude {
    pub use crate::cli::{validate_args, Args, Config, ValidationResult};
    pub use crate::core::{run, CleaningEngine, TrimInput, TrimMethod, TrimOutcome, TrimRequest};
    pub use crate::data::{AlignmentMatrix, SubstitutionMatrix};
    pub use crate::error::{Result, TrimError};
    pub use crate::stats::Statistics;
}

// Re-export main types at the root level for convenience
pub use cli::{Args, ValidationResult};
pub use core::{CleaningEngine, TrimMethod, TrimRequest};
pub use data::{AlignmentMatrix, KeepMask, SubstitutionMatrix};
pub use error::{Result, TrimError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library information
pub fn get_info() -> String {
    format!(
        "msatrim v{} - Automated trimming of multiple sequence alignments",
        VERSION
    )
}
