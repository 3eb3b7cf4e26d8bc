// compareset.rs - Score alternative alignments of the same sequences

use clap::{Arg, ArgAction, Command};
use indicatif::{ProgressBar, ProgressStyle};
use msatrim::data::{compareset_paths, AlignmentMatrix};
use msatrim::output::{write_alignment_scores, write_column_consistency};
use msatrim::stats::ConsistencyProfile;
use msatrim::{Result, TrimError};
use std::path::{Path, PathBuf};

fn load_with_progress(paths: &[PathBuf]) -> Result<Vec<AlignmentMatrix>> {
    let pb = ProgressBar::new(paths.len() as u64);
    let style = ProgressStyle::with_template(
        "[{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    )
    .map_err(|e| TrimError::invalid("progress", e.to_string()))?;
    pb.set_style(style);

    let mut alignments = Vec::with_capacity(paths.len());
    for path in paths {
        pb.set_message(format!("{}", path.display()));
        alignments.push(AlignmentMatrix::from_fasta(path)?);
        pb.inc(1);
    }
    pb.finish_with_message(format!("Loaded: {} alignments", alignments.len()));
    Ok(alignments)
}

fn run_main() -> Result<()> {
    let matches = Command::new("compareset")
        .version(msatrim::VERSION)
        .about("Scores alternative alignments of the same sequences by residue-pair consistency")
        .arg(Arg::new("compareset")
            .long("compareset")
            .value_name("FILE")
            .help("File listing one alignment path per line")
            .required(true))
        .arg(Arg::new("force")
            .long("force")
            .value_name("FILE")
            .help("Score this alignment against the whole set instead of choosing one"))
        .arg(Arg::new("window")
            .long("window")
            .value_name("N")
            .help("Half window applied to the column scores")
            .value_parser(clap::value_parser!(usize))
            .default_value("0"))
        .arg(Arg::new("output")
            .long("output")
            .value_name("FILE")
            .help("Write the score of every alignment (TSV)"))
        .arg(Arg::new("column-scores")
            .long("column-scores")
            .value_name("FILE")
            .help("Write the column consistency of the selected alignment (TSV)"))
        .arg(Arg::new("verbose")
            .long("verbose")
            .short('v')
            .help("Enable debug logging")
            .action(ArgAction::SetTrue))
        .get_matches();

    let level = if matches.get_flag("verbose") { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    let command_line = std::env::args().collect::<Vec<String>>().join(" ");
    let list = matches
        .get_one::<String>("compareset")
        .ok_or_else(|| TrimError::invalid("compareset", "missing compareset file"))?;
    let window = matches.get_one::<usize>("window").copied().unwrap_or(0);

    println!("⚖️  msatrim compareset v{}", msatrim::VERSION);
    println!("================================");
    let paths = compareset_paths(Path::new(list))?;
    println!("📂 Loading {} alignments from {}", paths.len(), list);
    let alignments = load_with_progress(&paths)?;

    let mut profile = match matches.get_one::<String>("force") {
        Some(forced) => {
            println!("🎯 Scoring {} against the set", forced);
            let selected = AlignmentMatrix::from_fasta(Path::new(forced))?;
            ConsistencyProfile::force_comparison(&selected, &alignments)?
        }
        None => ConsistencyProfile::compare_and_choose(&alignments)?,
    };
    profile.apply_window(window)?;

    println!();
    match profile.selected() {
        Some(selected) => {
            for (i, (path, score)) in paths.iter().zip(profile.alignment_scores()).enumerate() {
                let marker = if i == selected { "🏆" } else { "  " };
                println!("{} #{} {:.4}  {}", marker, i, score, path.display());
            }
        }
        None => {
            for score in profile.alignment_scores() {
                println!("📈 Consistency of the forced alignment: {:.4}", score);
            }
        }
    }

    if let Some(path) = matches.get_one::<String>("output") {
        match profile.selected() {
            Some(_) => write_alignment_scores(Path::new(path), &paths, &profile, &command_line)?,
            None => println!("⚠️  --output lists the set members, skipped with --force"),
        }
    }
    if let Some(path) = matches.get_one::<String>("column-scores") {
        write_column_consistency(Path::new(path), &profile, &command_line)?;
    }

    println!("\n🎉 Compareset analysis complete!");
    Ok(())
}

fn main() {
    if let Err(e) = run_main() {
        eprintln!("❌ ERROR: {}", e);
        std::process::exit(1);
    }
}
