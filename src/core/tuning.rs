// tuning.rs - Numeric knobs of the trimming heuristics

use crate::error::{Result, TrimError};
use serde::{Deserialize, Serialize};

/// Block size used by `strict` when no size is given
pub const FIXED_BLOCK_SIZE: usize = 5;

/// Fraction of the alignment length used as the first rescue block
pub const RESCUE_BLOCK_FRACTION: f32 = 0.005;

/// Thresholds used by the automated method selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomatedThresholds {
    /// Average identity at or above which gappyout is chosen
    pub gappy_average: f32,
    /// Average identity at or below which strict is chosen
    pub strict_average: f32,
    /// Alignments with at most this many sequences use gappyout
    pub small_set: usize,
    pub max_identity_low: f32,
    pub max_identity_high: f32,
}

impl Default for AutomatedThresholds {
    fn default() -> Self {
        Self {
            gappy_average: 0.55,
            strict_average: 0.38,
            small_set: 20,
            max_identity_low: 0.5,
            max_identity_high: 0.65,
        }
    }
}

/// Constants shared by the cleaning passes.
///
/// Every field has a default matching the reference behaviour; a `[tuning]`
/// table in the configuration file can override any of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub fixed_block: usize,
    pub variable_block_min: usize,
    pub variable_block_max: usize,
    /// Fraction of the alignment length used as variable block size
    pub variable_block_fraction: f32,
    pub rescue_block_fraction: f32,
    /// Percentiles (from the top) bracketing the combined similarity cut
    pub combined_low_percentile: f32,
    pub combined_high_percentile: f32,
    /// Gap fraction above which conservation is not scored
    pub gap_cutoff: f32,
    /// Non-improving iterations before the cluster search gives up
    pub cluster_stall_limit: usize,
    /// Fewest columns the strict neighbour rescue accepts
    pub min_strict_columns: usize,
    pub automated: AutomatedThresholds,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            fixed_block: FIXED_BLOCK_SIZE,
            variable_block_min: 3,
            variable_block_max: 12,
            variable_block_fraction: 0.01,
            rescue_block_fraction: RESCUE_BLOCK_FRACTION,
            combined_low_percentile: 20.0,
            combined_high_percentile: 80.0,
            gap_cutoff: crate::stats::DEFAULT_GAP_CUTOFF,
            cluster_stall_limit: 10,
            min_strict_columns: 4,
            automated: AutomatedThresholds::default(),
        }
    }
}

impl Tuning {
    /// Block size for strict selection over `residues` columns
    pub fn strict_block(&self, residues: usize, variable: bool) -> usize {
        if !variable {
            return self.fixed_block;
        }
        let scaled = (residues as f32 * self.variable_block_fraction).round() as usize;
        scaled.max(self.variable_block_min).min(self.variable_block_max)
    }

    /// Reject bounds and fractions the passes cannot work with
    pub fn validate(&self) -> Result<()> {
        let fraction = |name: &str, value: f32| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(TrimError::invalid("tuning", format!("{} = {} is outside 0.0-1.0", name, value)))
            }
        };
        let ordered = |low: &str, high: &str, inverted: bool| {
            if inverted {
                Err(TrimError::invalid("tuning", format!("{} must not exceed {}", low, high)))
            } else {
                Ok(())
            }
        };

        ordered(
            "variable_block_min",
            "variable_block_max",
            self.variable_block_min > self.variable_block_max,
        )?;
        fraction("variable_block_fraction", self.variable_block_fraction)?;
        fraction("rescue_block_fraction", self.rescue_block_fraction)?;
        fraction("gap_cutoff", self.gap_cutoff)?;
        for (name, value) in [
            ("combined_low_percentile", self.combined_low_percentile),
            ("combined_high_percentile", self.combined_high_percentile),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(TrimError::invalid("tuning", format!("{} = {} is outside 0-100", name, value)));
            }
        }
        ordered(
            "combined_low_percentile",
            "combined_high_percentile",
            self.combined_low_percentile > self.combined_high_percentile,
        )?;

        let automated = &self.automated;
        fraction("automated.gappy_average", automated.gappy_average)?;
        fraction("automated.strict_average", automated.strict_average)?;
        fraction("automated.max_identity_low", automated.max_identity_low)?;
        fraction("automated.max_identity_high", automated.max_identity_high)?;
        ordered(
            "automated.strict_average",
            "automated.gappy_average",
            automated.strict_average > automated.gappy_average,
        )?;
        ordered(
            "automated.max_identity_low",
            "automated.max_identity_high",
            automated.max_identity_low > automated.max_identity_high,
        )
    }

    /// Size of the first contiguous block the baseline rescue looks for
    pub fn rescue_block(&self, residues: usize) -> usize {
        (residues as f32 * self.rescue_block_fraction).round() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_sizes() {
        let tuning = Tuning::default();
        assert_eq!(tuning.strict_block(50, false), 5);
        assert_eq!(tuning.strict_block(50, true), 3);
        assert_eq!(tuning.strict_block(720, true), 7);
        assert_eq!(tuning.strict_block(5000, true), 12);
        assert_eq!(tuning.rescue_block(1000), 5);
        assert_eq!(tuning.rescue_block(50), 0);
    }

    #[test]
    fn test_partial_toml_override() {
        let tuning: Tuning = toml::from_str("fixed_block = 7\n[automated]\nsmall_set = 10\n").unwrap();
        assert_eq!(tuning.fixed_block, 7);
        assert_eq!(tuning.automated.small_set, 10);
        assert_eq!(tuning.variable_block_max, 12);
        assert_eq!(tuning.automated.gappy_average, 0.55);
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        assert!(Tuning::default().validate().is_ok());

        let tuning: Tuning = toml::from_str("variable_block_min = 12\nvariable_block_max = 3\n").unwrap();
        assert!(matches!(tuning.validate(), Err(TrimError::InvalidParameter { .. })));
        assert_eq!(tuning.strict_block(500, true), 3);

        let tuning: Tuning =
            toml::from_str("combined_low_percentile = 90.0\ncombined_high_percentile = 10.0\n").unwrap();
        assert!(tuning.validate().is_err());
        let tuning: Tuning = toml::from_str("gap_cutoff = 1.5\n").unwrap();
        assert!(tuning.validate().is_err());
        let tuning: Tuning = toml::from_str("[automated]\nmax_identity_low = 0.9\n").unwrap();
        assert!(tuning.validate().is_err());
    }
}
