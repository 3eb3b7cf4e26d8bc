// config.rs - Configuration file support

use crate::core::Tuning;
use crate::error::{Result, TrimError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    // Input/Output
    pub input: Option<String>,
    pub compareset: Option<String>,
    pub output: Option<String>,
    pub matrix: Option<String>,

    // Column selection
    pub method: Option<String>,
    pub gap_threshold: Option<f32>,
    pub similarity_threshold: Option<f32>,
    pub consistency_threshold: Option<f32>,
    pub baseline: Option<f32>,
    pub block: Option<usize>,

    // Windows
    pub window: Option<usize>,
    pub gap_window: Option<usize>,
    pub similarity_window: Option<usize>,
    pub consistency_window: Option<usize>,

    // Sequence selection
    pub clusters: Option<usize>,
    pub max_identity: Option<f32>,
    pub res_overlap: Option<f32>,
    pub seq_overlap: Option<f32>,
    pub include_names: Option<String>,
    pub exclude_names: Option<String>,

    // Flags
    pub terminal_only: Option<bool>,
    pub complementary: Option<bool>,
    pub keep_seqs: Option<bool>,

    // Reports
    pub column_stats: Option<String>,
    pub gap_distribution: Option<String>,
    pub report: Option<String>,

    /// Heuristic constants, every key optional
    pub tuning: Option<Tuning>,
}

impl Config {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            TrimError::config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            TrimError::config(format!("Failed to parse config file '{}': {}", path.display(), e))
        })?;

        println!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| TrimError::config(format!("Failed to serialize config: {}", e)))?;
        crate::output::ensure_parent_dir(path)?;
        fs::write(path, content)?;

        println!("📄 Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Generate a sample configuration file with comments
    pub fn generate_sample() -> String {
        r#"# msatrim.toml - Configuration file for msatrim
# Command line arguments will override these settings

# =============================================================================
# INPUT/OUTPUT
# =============================================================================

# Aligned FASTA file to trim
input = "/path/to/alignment.fasta"

# File listing alternative alignments of the same sequences (one path per line)
# compareset = "/path/to/compareset.txt"

# Trimmed alignment
output = "trimmed.fasta"

# Substitution matrix file (default: BLOSUM62 for proteins, identity for nucleotides)
# matrix = "/path/to/matrix.txt"

# =============================================================================
# COLUMN SELECTION
# =============================================================================

# Automated method: automated1, nogaps, noallgaps, gappyout, strict, strictplus
method = "automated1"

# Manual thresholds (not compatible with method)
# gap_threshold = 0.9
# similarity_threshold = 0.001
# consistency_threshold = 0.5
# baseline = 60

# Minimum size of a block of kept columns
# block = 5

# =============================================================================
# WINDOWS
# =============================================================================

# Half window for every statistic
# window = 1

# Or one half window per statistic
# gap_window = 1
# similarity_window = 2
# consistency_window = 1

# =============================================================================
# SEQUENCE SELECTION (at most one)
# =============================================================================

# clusters = 10
# max_identity = 0.9
# res_overlap = 0.75
# seq_overlap = 80
# include_names = "^sp\\|"
# exclude_names = "partial"

# =============================================================================
# FLAGS
# =============================================================================

terminal_only = false
complementary = false
keep_seqs = false

# =============================================================================
# REPORTS
# =============================================================================

# column_stats = "columns.tsv"
# gap_distribution = "gaps.tsv"
# report = "report.json"

# =============================================================================
# TUNING (advanced, every key optional)
# =============================================================================

[tuning]
fixed_block = 5
variable_block_min = 3
variable_block_max = 12
variable_block_fraction = 0.01
rescue_block_fraction = 0.005
combined_low_percentile = 20.0
combined_high_percentile = 80.0
gap_cutoff = 0.8
cluster_stall_limit = 10
min_strict_columns = 4

[tuning.automated]
gappy_average = 0.55
strict_average = 0.38
small_set = 20
max_identity_low = 0.5
max_identity_high = 0.65
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sample_parses_to_defaults() {
        let config: Config = toml::from_str(&Config::generate_sample()).unwrap();
        assert_eq!(config.method.as_deref(), Some("automated1"));
        assert_eq!(config.terminal_only, Some(false));
        assert_eq!(config.gap_threshold, None);
        assert_eq!(config.tuning, Some(Tuning::default()));
    }

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("msatrim.toml");
        let config = Config {
            input: Some("aln.fasta".to_string()),
            gap_threshold: Some(0.9),
            baseline: Some(60.0),
            window: Some(2),
            complementary: Some(true),
            tuning: Some(Tuning {
                fixed_block: 7,
                ..Default::default()
            }),
            ..Default::default()
        };
        config.to_file(&path).unwrap();
        assert_eq!(Config::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "gap_threshold = \"high\"\n").unwrap();
        assert!(matches!(Config::from_file(&path), Err(TrimError::Config { .. })));
        assert!(Config::from_file(dir.path().join("missing.toml")).is_err());
    }
}
