// SPDX-License-Identifier: MIT

use colored::Colorize;
use vsfs::{
    core::checker::{ReportDisplayOpts, WalkerStats},
    fsck::{FsckOutcome, PassSummary},
    prelude::*,
};

fn print_counts(title: &str, counts: &ErrorCounts) {
    println!("\n{}", title.bright_cyan().bold());
    let rows = [
        ("Superblock errors", counts.superblock),
        ("Inode bitmap errors", counts.inode_bitmap),
        ("Data bitmap errors", counts.data_bitmap),
        ("Duplicate block errors", counts.duplicate),
        ("Bad block errors", counts.bad_block),
    ];
    for (label, n) in rows {
        let value = if n == 0 {
            n.to_string().green()
        } else {
            n.to_string().red()
        };
        println!("  {label:<24}{value}");
    }
    match counts.total() {
        0 => println!("  {}", "File system is consistent.".bright_green().bold()),
        n => println!("  {}", format!("Found {n} errors.").red().bold()),
    }
}

fn print_findings(rep: &VerifyReport, min: Severity) {
    let opts = ReportDisplayOpts {
        min_level: min,
        prefix: "  ",
        ..ReportDisplayOpts::default()
    };
    print!("{}", rep.display_with(opts));
}

fn print_stats(stats: &WalkerStats) {
    println!(
        "  walk: {} inodes, {} indirect blocks, {} pointers, {} blocks reached, depth {}",
        stats.inodes_walked,
        stats.indirect_blocks,
        stats.pointers_scanned,
        stats.blocks_reached,
        stats.max_depth
    );
}

fn print_pass(title: &str, pass: &PassSummary, verbose: bool, stats: bool) {
    print_counts(title, &pass.counts);
    if !pass.counts.is_clean() || verbose {
        let min = if verbose { Severity::Info } else { Severity::Warn };
        print_findings(&pass.report, min);
    }
    if let (true, Some(walk)) = (stats, &pass.walk_stats) {
        print_stats(walk);
    }
}

/// Prints the tally before and after repair, and the repair log in between.
pub fn print_outcome(out: &FsckOutcome, verbose: bool, stats: bool) {
    print_pass("Initial check", &out.initial, verbose, stats);

    if let Some(log) = &out.repair_log {
        println!("\n{}", "Repairs".bright_cyan().bold());
        for f in &log.findings {
            let line = format!("{}: {}", f.code, f.msg);
            match f.sev {
                Severity::Info => println!("  {}", line.green()),
                Severity::Warn => println!("  {}", line.yellow()),
                Severity::Error => println!("  {}", line.red()),
            }
        }
    }

    if let Some(pass) = &out.final_pass {
        print_pass("After repair", pass, verbose, stats);
    }
}
