// args.rs - Command line arguments definition

use argh::FromArgs;

#[derive(FromArgs)]
/// msatrim - Automated trimming of multiple sequence alignments
pub struct Args {
    /// input alignment (aligned FASTA)
    #[argh(option, short = 'i')]
    pub input: Option<String>,

    /// file listing alternative alignments of the same sequences, one path per line
    #[argh(option)]
    pub compareset: Option<String>,

    /// with --compareset: trim the --input alignment instead of the most consistent one
    #[argh(switch)]
    pub force_select: bool,

    /// output trimmed alignment (FASTA)
    #[argh(option, short = 'o')]
    pub output: Option<String>,

    /// substitution matrix file (default: BLOSUM62 for proteins, identity for nucleotides)
    #[argh(option)]
    pub matrix: Option<String>,

    /// automated method: automated1, nogaps, noallgaps, gappyout, strict, strictplus
    #[argh(option)]
    pub method: Option<String>,

    /// minimum fraction of residues (non-gaps) per column (0.0-1.0)
    #[argh(option)]
    pub gap_threshold: Option<f32>,

    /// minimum similarity score per column (0.0-1.0)
    #[argh(option)]
    pub similarity_threshold: Option<f32>,

    /// minimum consistency score per column (0.0-1.0), requires --compareset
    #[argh(option)]
    pub consistency_threshold: Option<f32>,

    /// minimum percentage of columns to keep with manual thresholds (0-100, default: 0)
    #[argh(option)]
    pub baseline: Option<f32>,

    /// half window applied to every statistic
    #[argh(option)]
    pub window: Option<usize>,

    /// half window for gap statistics
    #[argh(option)]
    pub gap_window: Option<usize>,

    /// half window for similarity statistics
    #[argh(option)]
    pub similarity_window: Option<usize>,

    /// half window for consistency statistics
    #[argh(option)]
    pub consistency_window: Option<usize>,

    /// minimum size of a block of kept columns
    #[argh(option)]
    pub block: Option<usize>,

    /// remove columns by index, 0-based inclusive ranges (e.g. "0,4-9")
    #[argh(option)]
    pub select_cols: Option<String>,

    /// remove sequences by index, 0-based inclusive ranges (e.g. "0,4-9")
    #[argh(option)]
    pub select_seqs: Option<String>,

    /// keep one representative for each of this many sequence clusters
    #[argh(option)]
    pub clusters: Option<usize>,

    /// keep one representative of sequences more identical than this (0.0-1.0)
    #[argh(option)]
    pub max_identity: Option<f32>,

    /// minimum fraction of sequences a residue must overlap (0.0-1.0), with --seq-overlap
    #[argh(option)]
    pub res_overlap: Option<f32>,

    /// minimum percentage of overlapping positions per sequence (0-100), with --res-overlap
    #[argh(option)]
    pub seq_overlap: Option<f32>,

    /// keep only sequences whose name matches the regex pattern
    #[argh(option)]
    pub include_names: Option<String>,

    /// remove sequences whose name matches the regex pattern
    #[argh(option)]
    pub exclude_names: Option<String>,

    /// only trim columns outside the first and last gap-free columns
    #[argh(switch)]
    pub terminal_only: bool,

    /// user terminal boundaries as "left,right" (0-based, inclusive), with --terminal-only
    #[argh(option)]
    pub boundaries: Option<String>,

    /// output the columns and sequences that would be removed instead
    #[argh(switch)]
    pub complementary: bool,

    /// keep sequences made only of gaps
    #[argh(switch)]
    pub keep_seqs: bool,

    /// write per-column statistics (TSV)
    #[argh(option)]
    pub column_stats: Option<String>,

    /// write the gap distribution table (TSV)
    #[argh(option)]
    pub gap_distribution: Option<String>,

    /// write a JSON report of the run
    #[argh(option)]
    pub report: Option<String>,

    /// write the original numbers of the kept columns
    #[argh(option)]
    pub col_numbering: Option<String>,

    /// show alignment statistics and the automated method choice only, then exit
    #[argh(switch)]
    pub stats_only: bool,

    /// list the automated methods and exit
    #[argh(switch)]
    pub list_methods: bool,

    /// validate inputs without trimming (dry run)
    #[argh(switch)]
    pub dry_run: bool,

    /// enable debug logging
    #[argh(switch, short = 'v')]
    pub verbose: bool,

    /// path to TOML configuration file
    #[argh(option)]
    pub config: Option<String>,

    /// generate sample configuration file and exit
    #[argh(switch)]
    pub generate_config: bool,
}
