// main.rs - CLI entry point

use msatrim::cli::Config;
use msatrim::core::sequences::choose_automated;
use msatrim::core::{run, AutomatedChoice, IdentityMatrix, TrimInput, TrimMethod, TrimRequest, Tuning};
use msatrim::data::{read_compareset, AlignmentMatrix, SubstitutionMatrix};
use msatrim::output::{
    write_alignment, write_column_numbering, write_column_stats, write_gap_distribution,
    write_report, TrimReport,
};
use msatrim::prelude::*;
use std::path::Path;
use std::time::Instant;

fn main() {
    if let Err(e) = run_main() {
        eprintln!("❌ ERROR: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn run_main() -> Result<()> {
    let args: Args = argh::from_env();
    let command_line = std::env::args().collect::<Vec<String>>().join(" ");
    init_logging(args.verbose);

    // Handle generate config first
    if args.generate_config {
        let sample_config = Config::generate_sample();
        println!("{}", sample_config);
        println!("\n💡 Save this content to a .toml file and use --config /path/to/config.toml");
        return Ok(());
    }

    if args.list_methods {
        println!("🧰 Automated methods:");
        for method in TrimMethod::all() {
            println!("  - {}: {}", method, method.description());
        }
        return Ok(());
    }

    // Load configuration file if specified
    let (args, tuning) = match args.config.clone() {
        Some(config_path) => args.with_config_file(&config_path)?,
        None => (args, Tuning::default()),
    };
    tuning.validate()?;

    let validation = validate_args(&args)?;
    for warning in &validation.warnings {
        println!("⚠️  {}", warning);
    }
    let mut request = validation.request;
    request.tuning = tuning;

    let output = if args.stats_only || args.dry_run {
        None
    } else {
        Some(
            args.output
                .as_deref()
                .ok_or_else(|| TrimError::invalid("output", "--output is required"))?,
        )
    };

    println!("🚀 msatrim v{}", msatrim::VERSION);
    let total_start = Instant::now();
    let input = load_input(&args)?;

    if args.dry_run {
        println!("✅ Dry run completed successfully");
        return Ok(());
    }

    if args.stats_only {
        show_statistics(input, &request)?;
        println!("\n✅ Statistics analysis completed");
        return Ok(());
    }

    let mut outcome = run(&request, input)?;

    if let Some(selected) = outcome.selected_alignment {
        println!("🏆 Selected alignment #{} of the compareset", selected);
    }
    if let Some(method) = outcome.method {
        println!("🎯 Method: {} ({})", method, method.description());
    }
    println!(
        "✂️  Kept {} of {} columns and {} of {} sequences",
        outcome.trimmed.residue_count(),
        outcome.input.residue_count(),
        outcome.trimmed.sequence_count(),
        outcome.input.sequence_count()
    );

    if let Some(path) = output {
        write_alignment(Path::new(path), &outcome.masked)?;
    }
    if let Some(path) = &args.col_numbering {
        write_column_numbering(Path::new(path), &outcome.trimmed)?;
    }
    if let Some(path) = &args.column_stats {
        write_column_stats(Path::new(path), &mut outcome, &command_line)?;
    }
    if let Some(path) = &args.gap_distribution {
        write_gap_distribution(Path::new(path), &mut outcome, &command_line)?;
    }
    if let Some(path) = &args.report {
        write_report(Path::new(path), &TrimReport::from_outcome(&outcome, &command_line))?;
    }

    println!("⏱️  Completed in {:.2?}", total_start.elapsed());
    Ok(())
}

/// Read the alignment, compareset and substitution matrix named on the command line
fn load_input(args: &Args) -> Result<TrimInput> {
    let matrix = match &args.matrix {
        Some(path) => {
            let matrix = SubstitutionMatrix::from_file(Path::new(path))?;
            println!("🧮 Substitution matrix: {} ({} symbols)", path, matrix.symbols().len());
            Some(matrix)
        }
        None => None,
    };

    let compareset = match &args.compareset {
        Some(list) => {
            let set = read_compareset(Path::new(list))?;
            println!("📂 Compareset: {} alignments from {}", set.len(), list);
            set.into_iter().map(|(_, alignment)| alignment).collect()
        }
        None => Vec::new(),
    };

    let alignment = match &args.input {
        Some(path) if compareset.is_empty() || args.force_select => {
            let alignment = AlignmentMatrix::from_fasta(Path::new(path))?;
            println!(
                "🧬 Loaded {}: {} sequences, {} columns ({})",
                path,
                alignment.sequence_count(),
                alignment.residue_count(),
                alignment.sequence_type().label()
            );
            Some(alignment)
        }
        _ => None,
    };

    Ok(TrimInput {
        alignment,
        compareset,
        matrix,
    })
}

/// Print the statistics the automated methods rely on
fn show_statistics(input: TrimInput, request: &TrimRequest) -> Result<()> {
    let stats_request = TrimRequest {
        windows: request.windows,
        tuning: request.tuning.clone(),
        ..Default::default()
    };
    let mut outcome = run(&stats_request, input)?;
    let alignment = &outcome.scored;
    let gaps = outcome.statistics.gaps(alignment)?;

    println!("\n📈 === ALIGNMENT STATISTICS ===");
    println!(
        "🧬 {} sequences, {} columns ({})",
        alignment.sequence_count(),
        alignment.residue_count(),
        alignment.sequence_type().label()
    );
    println!("🕳️  Gap statistics:");
    println!("  Average gaps per column: {:.2}", gaps.average_gaps());
    println!("  Most gaps in a column: {}", gaps.max_gaps());
    println!("  Gappyout cut point: {} gaps", gaps.cut_point_by_2nd_slope());

    let identities = IdentityMatrix::compute(alignment);
    let (average, maximum) = identities.summary();
    println!("🔗 Identity statistics:");
    println!("  Average identity: {:.4}", average);
    println!("  Average maximum identity: {:.4}", maximum);

    let choice = choose_automated(&identities, alignment.sequence_count(), &request.tuning.automated);
    let method = match choice {
        AutomatedChoice::Gappyout => TrimMethod::Gappyout,
        AutomatedChoice::Strict => TrimMethod::Strict,
    };
    println!("🎯 automated1 would use: {}", method);

    if let Some(consistency) = outcome.statistics.consistency() {
        println!("⚖️  Compareset consistency:");
        for (i, score) in consistency.alignment_scores().iter().enumerate() {
            let marker = if consistency.selected() == Some(i) { " ← selected" } else { "" };
            println!("  Alignment #{}: {:.4}{}", i, score, marker);
        }
    }
    Ok(())
}
