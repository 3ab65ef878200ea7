// SPDX-License-Identifier: MIT

mod report;
mod utils;

use std::{fs::OpenOptions, path::PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use vsfs::prelude::*;
use vsio::prelude::{IOCounter, StdBlockIO};

use crate::utils::LogLevel;

#[derive(Parser)]
#[command(name = "vsfsck", version, about = "VSFS consistency checker", long_about = None)]
struct Cli {
    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check an image and repair what is found
    Check {
        /// Image path
        image: PathBuf,

        /// Report only, open the image read-only
        #[arg(long)]
        no_repair: bool,

        /// Restrict to these phases (superblock, inode-bitmap, data-bitmap,
        /// duplicates, bad-blocks)
        #[arg(long, value_parser = parse_phase, num_args = 1..)]
        only: Vec<VerifyPhases>,

        /// Detail findings shown per category
        #[arg(long, default_value_t = 256)]
        max_findings: usize,

        /// Print walk and I/O statistics
        #[arg(long)]
        stats: bool,
    },
    /// Write an empty VSFS image
    Format {
        /// Image path
        image: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn parse_phase(name: &str) -> Result<VerifyPhases, String> {
    VerifyPhases::from_cli_name(name).ok_or_else(|| format!("unknown phase '{name}'"))
}

fn check(
    image: PathBuf,
    no_repair: bool,
    only: Vec<VerifyPhases>,
    max_findings: usize,
    stats: bool,
    verbose: bool,
) -> anyhow::Result<()> {
    let mut file = OpenOptions::new()
        .read(true)
        .write(!no_repair)
        .open(&image)
        .with_context(|| format!("cannot open image {}", image.display()))?;

    let phases = only
        .into_iter()
        .reduce(|acc, p| acc | p)
        .unwrap_or(VerifyPhases::ALL);
    let opts = FsckOptions {
        check: VsfsCheckOptions {
            phases,
            max_findings,
        },
        repair: !no_repair,
    };

    crate::log_normal!("Checking {}", image.display());
    let mut io = StdBlockIO::new(&mut file);
    let mut counter = IOCounter::new(&mut io);
    let outcome = Fsck::new(&mut counter, opts)
        .run()
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    report::print_outcome(&outcome, verbose, stats);
    if stats {
        crate::log_normal!("I/O: {}", counter.snapshot());
    }
    Ok(())
}

fn format(image: PathBuf, force: bool) -> anyhow::Result<()> {
    if image.exists() && !force {
        bail!("{} already exists, use --force to overwrite", image.display());
    }
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&image)
        .with_context(|| format!("cannot create image {}", image.display()))?;

    let mut io = StdBlockIO::new(&mut file);
    let mut formatter = VsfsFormatter::new(&mut io);
    formatter
        .format_sized(true)
        .map_err(|e| anyhow::anyhow!("format failed: {e}"))?;
    formatter
        .flush()
        .map_err(|e| anyhow::anyhow!("flush failed: {e}"))?;

    crate::log_normal!(
        "Wrote empty VSFS image to {} ({} bytes)",
        image.display(),
        VSFS_IMAGE_SIZE
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = LogLevel::from_flags(cli.quiet, cli.verbose);
    utils::init(level);

    match cli.command {
        Commands::Check {
            image,
            no_repair,
            only,
            max_findings,
            stats,
        } => check(
            image,
            no_repair,
            only,
            max_findings,
            stats,
            matches!(level, LogLevel::Verbose | LogLevel::Trace),
        )?,
        Commands::Format { image, force } => format(image, force)?,
    }

    Ok(())
}
