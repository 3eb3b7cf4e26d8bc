// merge.rs - Merge configuration file with CLI arguments

use crate::cli::{Args, Config};
use crate::core::Tuning;
use crate::error::Result;

impl Args {
    /// Merge with configuration from file
    /// CLI arguments take precedence over config file values
    pub fn merge_with_config(mut self, config: Config) -> Self {
        // Input/Output
        self.input = self.input.or(config.input);
        self.compareset = self.compareset.or(config.compareset);
        self.output = self.output.or(config.output);
        self.matrix = self.matrix.or(config.matrix);

        // Column selection
        self.method = self.method.or(config.method);
        self.gap_threshold = self.gap_threshold.or(config.gap_threshold);
        self.similarity_threshold = self.similarity_threshold.or(config.similarity_threshold);
        self.consistency_threshold = self.consistency_threshold.or(config.consistency_threshold);
        self.baseline = self.baseline.or(config.baseline);
        self.block = self.block.or(config.block);

        // Windows
        self.window = self.window.or(config.window);
        self.gap_window = self.gap_window.or(config.gap_window);
        self.similarity_window = self.similarity_window.or(config.similarity_window);
        self.consistency_window = self.consistency_window.or(config.consistency_window);

        // Sequence selection
        self.clusters = self.clusters.or(config.clusters);
        self.max_identity = self.max_identity.or(config.max_identity);
        self.res_overlap = self.res_overlap.or(config.res_overlap);
        self.seq_overlap = self.seq_overlap.or(config.seq_overlap);
        self.include_names = self.include_names.or(config.include_names);
        self.exclude_names = self.exclude_names.or(config.exclude_names);

        // Flags (CLI switches win, config only turns them on)
        if !self.terminal_only && config.terminal_only.unwrap_or(false) {
            self.terminal_only = true;
        }
        if !self.complementary && config.complementary.unwrap_or(false) {
            self.complementary = true;
        }
        if !self.keep_seqs && config.keep_seqs.unwrap_or(false) {
            self.keep_seqs = true;
        }

        // Reports
        self.column_stats = self.column_stats.or(config.column_stats);
        self.gap_distribution = self.gap_distribution.or(config.gap_distribution);
        self.report = self.report.or(config.report);

        self
    }

    /// Load configuration and merge with CLI args, returning the tuning table
    pub fn with_config_file(self, config_path: &str) -> Result<(Self, Tuning)> {
        let mut config = Config::from_file(config_path)?;
        let tuning = config.tuning.take().unwrap_or_default();
        Ok((self.merge_with_config(config), tuning))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argh::FromArgs;

    fn parse(args: &[&str]) -> Args {
        Args::from_args(&["msatrim"], args).unwrap()
    }

    #[test]
    fn test_cli_values_win() {
        let args = parse(&["--input", "cli.fasta", "--gap-threshold", "0.7"]);
        let config = Config {
            input: Some("config.fasta".to_string()),
            gap_threshold: Some(0.9),
            similarity_threshold: Some(0.001),
            output: Some("out.fasta".to_string()),
            complementary: Some(true),
            ..Default::default()
        };
        let merged = args.merge_with_config(config);
        assert_eq!(merged.input.as_deref(), Some("cli.fasta"));
        assert_eq!(merged.gap_threshold, Some(0.7));
        assert_eq!(merged.similarity_threshold, Some(0.001));
        assert_eq!(merged.output.as_deref(), Some("out.fasta"));
        assert!(merged.complementary);
        assert!(!merged.terminal_only);
    }

    #[test]
    fn test_config_cannot_clear_switch() {
        let args = parse(&["--keep-seqs"]);
        let config = Config {
            keep_seqs: Some(false),
            ..Default::default()
        };
        assert!(args.merge_with_config(config).keep_seqs);
    }
}
