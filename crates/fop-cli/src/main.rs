//! FOP CLI
//!
//! Sorts the filter lists in one or more directories.

mod report;
mod rewrite;
mod walk;

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::Parser;

use report::RunSummary;
use walk::{process_location, WalkOptions, DEFAULT_IGNORE};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "fop")]
#[command(version)]
#[command(about = "Filter Orderer and Preener: tidies, sorts and merges Adblock Plus filter lists")]
struct Cli {
    /// Directories to process (defaults to the current directory)
    locations: Vec<PathBuf>,

    /// Additional file or directory names to skip
    #[arg(short, long = "ignore", value_name = "NAME")]
    ignore: Vec<String>,

    /// Report files that need sorting without rewriting them
    #[arg(long)]
    check: bool,

    /// Keep .orig and .temp files instead of deleting them
    #[arg(long)]
    keep_backups: bool,

    /// Write a JSON summary of the run
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .parse_default_env()
        .format_timestamp(None)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn print_greeting() {
    let greeting = format!("FOP (Filter Orderer and Preener) version {VERSION}");
    let rule = "=".repeat(greeting.chars().count());
    println!("{rule}");
    println!("{greeting}");
    println!("{rule}");
}

fn run(cli: Cli) -> Result<(), String> {
    print_greeting();

    let cwd = std::env::current_dir()
        .map_err(|e| format!("Failed to read the current directory: {}", e))?;
    let locations: BTreeSet<PathBuf> = if cli.locations.is_empty() {
        BTreeSet::from([cwd])
    } else {
        cli.locations
            .iter()
            .map(|location| if location.is_absolute() { location.clone() } else { cwd.join(location) })
            .collect()
    };

    let mut ignore: Vec<String> = DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect();
    ignore.extend(cli.ignore);
    let options = WalkOptions {
        ignore,
        check: cli.check,
        keep_backups: cli.keep_backups,
    };

    let mut summary = RunSummary::default();
    for location in &locations {
        // A bad location is reported and the rest still run.
        if let Err(e) = process_location(location, &options, &mut summary) {
            println!("{e}");
        }
    }

    if cli.verbose || cli.check {
        summary.print_totals();
    }
    if let Some(path) = &cli.report {
        summary.write_json(path)?;
    }

    if summary.failures() > 0 {
        return Err(format!("{} file(s) could not be sorted", summary.failures()));
    }
    if cli.check && summary.changed() {
        return Err(format!(
            "{} file(s) need sorting",
            summary.count(report::FileStatus::NeedsSorting)
        ));
    }
    Ok(())
}
