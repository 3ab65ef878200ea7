// SPDX-License-Identifier: MIT

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};
use core::cmp::Ordering;
use core::fmt;

use bitflags::bitflags;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl Severity {
    fn rank(self) -> u8 {
        match self {
            Severity::Info => 0,
            Severity::Warn => 1,
            Severity::Error => 2,
        }
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

/// One line of a check or repair report.
///
/// `code` is a dotted tag whose prefix names the category (`SB`, `IBM`,
/// `DBM`, `DUP`, `BAD`, `WALK`, `FIX`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Finding {
    pub sev: Severity,
    pub code: &'static str,
    pub msg: String,
}

impl Finding {
    pub fn info(code: &'static str, msg: impl Into<String>) -> Self {
        Self {
            sev: Severity::Info,
            code,
            msg: msg.into(),
        }
    }
    pub fn warn(code: &'static str, msg: impl Into<String>) -> Self {
        Self {
            sev: Severity::Warn,
            code,
            msg: msg.into(),
        }
    }
    pub fn err(code: &'static str, msg: impl Into<String>) -> Self {
        Self {
            sev: Severity::Error,
            code,
            msg: msg.into(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct VerifyReport {
    pub findings: Vec<Finding>,
}

impl VerifyReport {
    pub fn has_error(&self) -> bool {
        self.findings.iter().any(|f| f.sev == Severity::Error)
    }

    pub fn first_error(&self) -> Option<&str> {
        self.findings
            .iter()
            .find(|f| f.sev == Severity::Error)
            .map(|f| f.msg.as_str())
    }

    pub fn push(&mut self, f: Finding) {
        self.findings.push(f)
    }

    pub fn extend(&mut self, other: VerifyReport) {
        self.findings.extend(other.findings)
    }

    pub fn count(&self, s: Severity) -> usize {
        self.findings.iter().filter(|f| f.sev == s).count()
    }

    /// Findings whose code starts with `prefix` (e.g. `"DUP."`).
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a Finding> + 'a {
        self.findings
            .iter()
            .filter(move |f| f.code.starts_with(prefix))
    }

    pub fn contains_code(&self, code: &str) -> bool {
        self.findings.iter().any(|f| f.code == code)
    }

    /// Display with options (filtering, prefix, summary...)
    pub fn display_with(&self, opts: ReportDisplayOpts) -> ReportDisplay<'_> {
        ReportDisplay::new(self, opts)
    }

    /// Display "only errors", default prefix, no summary
    pub fn errors_only(&self) -> ReportDisplay<'_> {
        self.display_with(ReportDisplayOpts {
            min_level: Severity::Error,
            ..ReportDisplayOpts::default()
        })
    }
}

#[derive(Copy, Clone, Debug)]
pub struct ReportDisplayOpts {
    pub min_level: Severity,
    pub prefix: &'static str,
    pub show_summary: bool,
    pub pad_code: usize,
}

impl Default for ReportDisplayOpts {
    fn default() -> Self {
        Self {
            min_level: Severity::Info,
            prefix: "",
            show_summary: false,
            pad_code: 12,
        }
    }
}

pub struct ReportDisplay<'a> {
    rep: &'a VerifyReport,
    opts: ReportDisplayOpts,
}

impl<'a> ReportDisplay<'a> {
    pub fn new(rep: &'a VerifyReport, opts: ReportDisplayOpts) -> Self {
        Self { rep, opts }
    }
}

impl fmt::Display for ReportDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut n_info = 0usize;
        let mut n_warn = 0usize;
        let mut n_err = 0usize;

        for it in &self.rep.findings {
            if it.sev < self.opts.min_level {
                continue;
            }
            let tag = match it.sev {
                Severity::Info => {
                    n_info += 1;
                    "INFO"
                }
                Severity::Warn => {
                    n_warn += 1;
                    "WARN"
                }
                Severity::Error => {
                    n_err += 1;
                    "ERR "
                }
            };

            writeln!(
                f,
                "{}{tag}: {:<width$} {}",
                self.opts.prefix,
                it.code,
                it.msg,
                width = self.opts.pad_code
            )?;
        }

        if self.opts.show_summary {
            writeln!(
                f,
                "{}Summary: errors={}  warns={}  infos={}",
                self.opts.prefix, n_err, n_warn, n_info
            )?;
        }

        Ok(())
    }
}

impl fmt::Display for VerifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ReportDisplay::new(self, ReportDisplayOpts::default()).fmt(f)
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct VerifyPhases: u32 {
        const SUPERBLOCK   = 1 << 0;
        const INODE_BITMAP = 1 << 1;
        const DATA_BITMAP  = 1 << 2;
        const DUPLICATES   = 1 << 3;
        const BAD_BLOCKS   = 1 << 4;
        const ALL          = Self::SUPERBLOCK.bits()
            | Self::INODE_BITMAP.bits()
            | Self::DATA_BITMAP.bits()
            | Self::DUPLICATES.bits()
            | Self::BAD_BLOCKS.bits();
    }
}

impl VerifyPhases {
    /// Phases in the order they are checked and repaired.
    pub const ORDERED: [VerifyPhases; 5] = [
        VerifyPhases::SUPERBLOCK,
        VerifyPhases::INODE_BITMAP,
        VerifyPhases::DATA_BITMAP,
        VerifyPhases::DUPLICATES,
        VerifyPhases::BAD_BLOCKS,
    ];

    /// Parses a single phase name as used on the command line.
    pub fn from_cli_name(name: &str) -> Option<Self> {
        match name {
            "superblock" | "sb" => Some(Self::SUPERBLOCK),
            "inode-bitmap" | "ibm" => Some(Self::INODE_BITMAP),
            "data-bitmap" | "dbm" => Some(Self::DATA_BITMAP),
            "duplicates" | "dup" => Some(Self::DUPLICATES),
            "bad-blocks" | "bad" => Some(Self::BAD_BLOCKS),
            "all" => Some(Self::ALL),
            _ => None,
        }
    }

    /// Display name of a single phase.
    pub fn label(self) -> &'static str {
        match self {
            p if p == Self::SUPERBLOCK => "superblock",
            p if p == Self::INODE_BITMAP => "inode bitmap",
            p if p == Self::DATA_BITMAP => "data bitmap",
            p if p == Self::DUPLICATES => "duplicates",
            p if p == Self::BAD_BLOCKS => "bad blocks",
            p if p == Self::ALL => "all",
            _ => "mixed",
        }
    }
}

/// Generic options that the FS can encapsulate/extend.
pub trait VerifierOptionsLike {
    fn phases(&self) -> VerifyPhases {
        VerifyPhases::ALL
    }

    /// Maximum number of detail findings emitted per category.
    fn max_findings(&self) -> usize {
        usize::MAX
    }
}
