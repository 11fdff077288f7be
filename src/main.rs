//! shuck - recursive archive extractor
//!
//! Shucks nested archives like ears of corn: strip a layer, see
//! what is underneath, repeat.

mod classify;
mod config;
mod extract;
mod format;
mod sanitize;
mod signatures;
mod unpack;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use config::{OutputLayout, RunConfig};
use extract::Extractor;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use unpack::ToolUnpacker;

#[derive(Parser)]
#[command(name = "shuck")]
#[command(version)]
#[command(about = "Unpack nested archives and sort the contents by what they really are")]
struct Cli {
    /// Path to the archive to unpack
    archive: PathBuf,

    /// Directory the result buckets are created under
    #[arg(short, long, default_value = "result")]
    output: PathBuf,

    /// Directory for scratch space (defaults to the system temp dir)
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Enable verbose logging (use RUST_LOG=debug for more detail)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            // Help and version exit 0; any usage error exits 1.
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            std::process::exit(code);
        }
    };

    // Only initialize logging if verbose or RUST_LOG is set
    if cli.verbose || std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive(if cli.verbose {
                "shuck=debug".parse()?
            } else {
                "shuck=warn".parse()?
            }))
            .init();
    }

    println!("Processing archive: {}", cli.archive.display());

    let config = RunConfig {
        archive_path: cli.archive,
        output: OutputLayout::under(&cli.output),
        work_dir: cli.work_dir,
    };

    let stats = Extractor::new(&config, &ToolUnpacker).run()?;

    println!("\n=== Extraction Summary ===");
    println!(
        "Sorted:    {} source, {} archive, {} modified-extension, {} other ({} files total)",
        stats.source_files,
        stats.archive_files,
        stats.disguised_files,
        stats.other_files,
        stats.total_copied()
    );
    println!(
        "Unpacked:  {} nested archives, {} failed, {} unsupported, {} past the depth limit",
        stats.unpacked, stats.unpack_failures, stats.unsupported, stats.depth_skips
    );
    if stats.copy_failures > 0 {
        println!("Copies:    {} failed", stats.copy_failures);
    }
    println!();
    println!("- C source files:      {}", config.output.source_dir.display());
    println!("- Archives:            {}", config.output.archive_dir.display());
    println!("- Modified extensions: {}", config.output.disguised_dir.display());
    println!("- Other files:         {}", config.output.other_dir.display());

    if stats.had_local_failures() {
        println!("\nSome entries were skipped. Rerun with --verbose for details.");
    } else {
        println!("\nExtraction complete!");
    }

    Ok(())
}
