//! tracepatch CLI: add, remove or strip trace markers in C / C++ sources.
//!
//! Calls `tracepatch-core` directly; files are processed one at a time on a
//! blocking thread while the main task listens for Ctrl-C.

use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tracepatch_core::scan::discover;
use tracepatch_core::session::FileOutcome;
use tracepatch_core::{load_settings, run_batch, BatchReport, Mode, TreeSitterFrontend};

/// Insert entry/exit trace markers into C and C++ functions.
#[derive(Parser)]
#[command(name = "tracepatch", version, about)]
struct Cli {
    /// Files or directories to process (default: current directory)
    paths: Vec<PathBuf>,

    /// Restore each file from its `.bak` backup
    #[arg(long, conflicts_with = "strip")]
    unpatch: bool,

    /// Remove marker lines in place without using backups
    #[arg(long)]
    strip: bool,

    /// Descend into subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Debug logging, including token errors
    #[arg(short, long)]
    verbose: bool,

    /// Don't report parse errors
    #[arg(short, long)]
    quiet: bool,

    /// Config file (default: ./.tracepatch.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the batch report as JSON on stdout
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn mode(&self) -> Mode {
        if self.unpatch {
            Mode::Unpatch
        } else if self.strip {
            Mode::Strip
        } else {
            Mode::Patch
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "tracepatch=debug,tracepatch_core=debug"
    } else {
        "tracepatch=info,tracepatch_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn summarize(report: &BatchReport, mode: Mode) {
    let failed = report.failures();
    match mode {
        Mode::Patch => {
            let patched = report.count(|o| matches!(o, FileOutcome::Patched { .. }));
            let already = report.count(|o| matches!(o, FileOutcome::AlreadyPatched));
            let unchanged = report.count(|o| matches!(o, FileOutcome::Unchanged { .. }));
            info!(patched, already_patched = already, unchanged, failed, "Done");
        }
        Mode::Unpatch => {
            let restored = report.count(|o| matches!(o, FileOutcome::Restored));
            let missing = report.count(|o| matches!(o, FileOutcome::MissingBackup));
            info!(restored, missing_backup = missing, failed, "Done");
        }
        Mode::Strip => {
            let lines: usize = report
                .files
                .iter()
                .map(|f| match f.outcome {
                    FileOutcome::Stripped { lines } => lines,
                    _ => 0,
                })
                .sum();
            info!(files = report.files.len(), lines_removed = lines, failed, "Done");
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mode = cli.mode();
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let mut settings = load_settings(&cwd, cli.config.as_deref());
    settings.recursive = cli.recursive;
    settings.verbose = cli.verbose;
    settings.quiet = cli.quiet;

    let files = discover(&cli.paths, &settings);
    if files.is_empty() {
        info!("No source files found");
    }

    let batch = tokio::task::spawn_blocking(move || {
        run_batch(&files, mode, &TreeSitterFrontend, &settings)
    });

    let report = tokio::select! {
        joined = batch => match joined {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "Batch worker failed");
                return std::process::ExitCode::FAILURE;
            }
        },
        Ok(()) = tokio::signal::ctrl_c() => {
            error!("Interrupted");
            // The blocking worker can't be cancelled; exit without waiting for it.
            std::process::exit(1);
        }
    };

    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(out) => println!("{out}"),
            Err(e) => error!(error = %e, "Could not serialize report"),
        }
    } else {
        summarize(&report, mode);
    }

    std::process::ExitCode::SUCCESS
}
