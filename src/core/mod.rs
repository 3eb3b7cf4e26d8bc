// mod.rs - Core trimming logic module

pub mod cleaner;
pub mod method;
pub mod pipeline;
pub mod selection;
pub mod sequences;
pub mod tuning;

// Re-export main types for convenience
pub use cleaner::{CleaningEngine, CleaningOptions, CutCriterion};
pub use method::TrimMethod;
pub use pipeline::{run, TrimInput, TrimOutcome, TrimRequest};
pub use selection::{parse_ranges, IndexRange};
pub use sequences::{AutomatedChoice, IdentityMatrix};
pub use tuning::{AutomatedThresholds, Tuning};
