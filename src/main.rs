use anyhow::{Context, Result, bail};
use clap::Parser;
use clap::error::ErrorKind;
use dupe_remover::core::compare::Metric;
use dupe_remover::{DuplicateRemover, RunConfig};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "dupe-remover",
    version,
    about = "Remove media files from a secondary directory that duplicate a primary directory"
)]
struct Cli {
    /// Directory whose files are kept
    #[arg(value_name = "PRIMARY_DIR")]
    primary: PathBuf,

    /// Directory whose duplicates are removed
    #[arg(value_name = "SECONDARY_DIR")]
    secondary: PathBuf,

    /// Print which directory and file is currently being processed
    #[arg(short, long)]
    verbose: bool,

    /// SQLite database to use for fingerprints
    #[arg(short = 'D', long, value_name = "FILE")]
    database: Option<PathBuf>,

    /// Skip reading the directories, just use the existing database
    #[arg(short = 'S', long, requires = "database")]
    skip_reading: bool,

    /// Try it out without actually removing anything
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Ask before removing each file
    #[arg(short, long)]
    interactive: bool,

    /// Record image dimensions, bit depth and colour count with GraphicsMagick
    #[arg(long)]
    identify: bool,

    /// Only remove files GraphicsMagick reports as pixel-identical
    #[arg(long)]
    verify: bool,

    /// Comparison metric used with --verify
    #[arg(long, default_value = "mse", value_parser = parse_metric)]
    metric: Metric,

    /// GraphicsMagick executable
    #[arg(long, value_name = "PROGRAM", default_value = "gm")]
    gm: String,
}

fn parse_metric(s: &str) -> Result<Metric, String> {
    s.parse().map_err(|e: dupe_remover::core::compare::CompareError| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            let _ = err.print();
            std::process::exit(1);
        }
    };

    init_logging(cli.verbose);

    let primary = resolve_dir(&cli.primary, "Primary")?;
    let secondary = resolve_dir(&cli.secondary, "Secondary")?;
    debug!("Primary {}, secondary {}", primary.display(), secondary.display());

    let config = RunConfig {
        verbose: cli.verbose,
        dry_run: cli.dry_run,
        database: cli.database,
        skip_reading: cli.skip_reading,
        interactive: cli.interactive,
        identify: cli.identify,
        verify: cli.verify,
        metric: cli.metric,
        gm_program: cli.gm,
        ..Default::default()
    };

    println!("▶ Comparing {} against {}", secondary.display(), primary.display());
    DuplicateRemover::from_config(config)
        .run(&primary, &secondary)
        .await
        .context("Duplicate removal failed")?;

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose { "info,dupe_remover=debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp(None)
        .init();
}

/// Absolute form of a directory argument, which must exist.
fn resolve_dir(path: &Path, label: &str) -> Result<PathBuf> {
    if !path.is_dir() {
        bail!("{} directory ({}) does not exist", label, path.display());
    }
    fs::canonicalize(path).with_context(|| format!("Failed to resolve {:?}", path))
}
