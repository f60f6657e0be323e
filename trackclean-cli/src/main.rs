//! TrackClean CLI - KiCad PCB track cleanup from the command line.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process;
use trackclean::{
    load_options, BoardStats, CleanupOptions, CleanupReport, RemovalReason, TrackCleanCore,
};

#[derive(Parser)]
#[command(name = "trackclean")]
#[command(about = "KiCad PCB track cleanup tool", long_about = None)]
#[command(version)]
struct Cli {
    /// More log output on stderr (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean the tracks of a single .kicad_pcb file
    Clean {
        /// Path to .kicad_pcb file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Write the cleaned board here instead of over FILE
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,

        /// Report what would change without writing anything
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        passes: PassArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Exit with error code 1 if the board needed cleaning
        #[arg(long)]
        fail_on_change: bool,
    },

    /// Clean every .kicad_pcb file in a directory
    Project {
        /// Path to project directory
        #[arg(value_name = "DIR", default_value = ".")]
        dir: PathBuf,

        /// Rewrite the board files in place (default is a dry run)
        #[arg(long)]
        write: bool,

        #[command(flatten)]
        passes: PassArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Exit with error code 1 if any board needed cleaning
        #[arg(long)]
        fail_on_change: bool,
    },

    /// Show copper statistics of a board
    Stats {
        /// Path to .kicad_pcb file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
}

/// Pass selection shared by `clean` and `project`.
#[derive(Args, Clone)]
struct PassArgs {
    /// JSON file with cleanup options
    #[arg(long, value_name = "JSON")]
    config: Option<PathBuf>,

    /// Keep stacked vias and vias on through-hole pads
    #[arg(long)]
    no_vias: bool,

    /// Keep duplicated and collinear segments
    #[arg(long)]
    no_merge: bool,

    /// Keep tracks connecting different nets
    #[arg(long)]
    no_misconnected: bool,

    /// Keep dangling tracks
    #[arg(long)]
    no_dangling: bool,
}

impl PassArgs {
    fn to_options(&self) -> anyhow::Result<CleanupOptions> {
        let mut options = match &self.config {
            Some(path) => load_options(path)
                .with_context(|| format!("Failed to read options from {}", path.display()))?,
            None => CleanupOptions::default(),
        };
        options.clean_vias &= !self.no_vias;
        options.merge_segments &= !self.no_merge;
        options.remove_misconnected &= !self.no_misconnected;
        options.delete_dangling &= !self.no_dangling;
        tracing::debug!("Cleanup options: {:?}", options);
        Ok(options)
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for CI/CD
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Clean {
            file,
            output,
            dry_run,
            passes,
            format,
            fail_on_change,
        } => handle_clean(&file, output.as_deref(), dry_run, &passes, format, fail_on_change),
        Commands::Project {
            dir,
            write,
            passes,
            format,
            fail_on_change,
        } => handle_project(&dir, write, &passes, format, fail_on_change),
        Commands::Stats { file, format } => handle_stats(&file, format),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };
    process::exit(exit_code);
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn check_extension(file: &Path) -> anyhow::Result<()> {
    match file.extension().and_then(|s| s.to_str()) {
        Some("kicad_pcb") => Ok(()),
        _ => bail!("File must be a .kicad_pcb board"),
    }
}

fn handle_clean(
    file: &Path,
    output: Option<&Path>,
    dry_run: bool,
    passes: &PassArgs,
    format: OutputFormat,
    fail_on_change: bool,
) -> anyhow::Result<i32> {
    check_extension(file)?;
    let options = passes.to_options()?;

    let report = if dry_run {
        TrackCleanCore::clean_pcb(file, &options)?
    } else {
        TrackCleanCore::clean_pcb_to(file, output.unwrap_or(file), &options)?
    };

    output_reports(std::slice::from_ref(&report), &format)?;
    Ok(if fail_on_change && report.modified { 1 } else { 0 })
}

fn handle_project(
    dir: &Path,
    write: bool,
    passes: &PassArgs,
    format: OutputFormat,
    fail_on_change: bool,
) -> anyhow::Result<i32> {
    let options = passes.to_options()?;
    let reports = TrackCleanCore::clean_project(dir, &options, write)
        .with_context(|| format!("Failed to clean project {}", dir.display()))?;

    output_reports(&reports, &format)?;
    let dirty = reports.iter().any(|r| r.modified);
    Ok(if fail_on_change && dirty { 1 } else { 0 })
}

fn handle_stats(file: &Path, format: OutputFormat) -> anyhow::Result<i32> {
    check_extension(file)?;
    let stats = TrackCleanCore::board_stats(file)?;
    match format {
        OutputFormat::Human => output_stats_human(&stats),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
    }
    Ok(0)
}

fn output_reports(reports: &[CleanupReport], format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Human => {
            output_human(reports);
            Ok(())
        }
        OutputFormat::Json => output_json(reports),
    }
}

fn output_human(reports: &[CleanupReport]) {
    for report in reports {
        println!("\nFile: {}", report.file.display());
        println!("{}", "─".repeat(60));

        if !report.modified {
            println!("  Nothing to clean");
            continue;
        }

        let groups = [
            (RemovalReason::NullSegment, report.stats.null_segments),
            (RemovalReason::DuplicateVia, report.stats.duplicate_vias),
            (RemovalReason::ViaOnThroughPad, report.stats.vias_on_pads),
            (RemovalReason::DuplicateTrack, report.stats.duplicate_tracks),
            (RemovalReason::MergedCollinear, report.stats.merged_segments),
            (RemovalReason::MisConnected, report.stats.misconnected),
            (RemovalReason::Dangling, report.stats.dangling),
        ];
        for (reason, count) in groups {
            if count > 0 {
                println!("  {:<32} {}", reason.describe(), count);
            }
        }
        if report.stats.normalized_vias > 0 {
            println!("  {:<32} {}", "malformed vias fixed", report.stats.normalized_vias);
        }

        println!("\n  Summary:");
        println!(
            "    Segments: {} -> {}",
            report.before.traces, report.after.traces
        );
        if report.before.arcs > 0 {
            println!("    Arcs:     {} -> {}", report.before.arcs, report.after.arcs);
        }
        println!("    Vias:     {} -> {}", report.before.vias, report.after.vias);
        println!(
            "    Unrouted: {} -> {}",
            report.unrouted_before, report.unrouted_after
        );
        match &report.written {
            Some(path) => println!("    Written:  {}", path.display()),
            None => println!("    Dry run, nothing written"),
        }
    }
}

fn output_json(reports: &[CleanupReport]) -> anyhow::Result<()> {
    let output = serde_json::json!({
        "results": reports,
        "summary": {
            "total_files": reports.len(),
            "modified_files": reports.iter().filter(|r| r.modified).count(),
            "removed_items": reports.iter().map(|r| r.removed.len()).sum::<usize>(),
        }
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn output_stats_human(stats: &BoardStats) {
    println!("\nFile: {}", stats.file.display());
    println!("{}", "─".repeat(60));
    println!("  Segments: {}", stats.summary.traces);
    println!("  Arcs:     {}", stats.summary.arcs);
    println!("  Vias:     {}", stats.summary.vias);
    println!("  Pads:     {}", stats.summary.pads);
    println!("  Zones:    {}", stats.summary.zones);
    println!("  Nets:     {}", stats.summary.nets);
    println!("  Unrouted: {}", stats.unrouted);

    if !stats.nets.is_empty() {
        println!("\n  {:<24} {:>12} {:>8}", "Net", "Length (mm)", "Islands");
        for net in &stats.nets {
            let name = if net.name.is_empty() {
                format!("<net {}>", net.net)
            } else {
                net.name.clone()
            };
            println!("  {:<24} {:>12.3} {:>8}", name, net.length_mm, net.islands);
        }
    }
}
