// SPDX-License-Identifier: MIT

//! Validate, repair, revalidate.
//!
//! [`Fsck`] drives one run over an image: a first validation pass, repairs
//! for every category the first pass found errors in, and one more
//! validation pass to report what is left. Each pass gets a fresh
//! [`CheckSession`]; the repairs consume the session of the first pass.

#[cfg(not(feature = "std"))]
use alloc::{format, vec::Vec};
use core::fmt;

use log::{info, warn};
use vsio::prelude::*;

use crate::{
    checker::{VsfsCheckOptions, VsfsChecker, VsfsRepairer},
    core::{
        checker::{Finding, VerifyReport, WalkerStats},
        errors::FsResult,
        traits::{FsChecker, FsRepairer},
    },
    session::{CheckSession, ErrorCounts},
};

/// Orchestrator states, in the order a run visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsckState {
    Idle,
    Validated,
    Repairing,
    Revalidated,
    Done,
}

impl fmt::Display for FsckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FsckState::Idle => "idle",
            FsckState::Validated => "validated",
            FsckState::Repairing => "repairing",
            FsckState::Revalidated => "revalidated",
            FsckState::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug)]
pub struct FsckOptions {
    pub check: VsfsCheckOptions,
    /// When false the run stops after the first validation pass.
    pub repair: bool,
}

impl Default for FsckOptions {
    fn default() -> Self {
        Self {
            check: VsfsCheckOptions::default(),
            repair: true,
        }
    }
}

/// Result of one validation pass.
#[derive(Clone, Debug)]
pub struct PassSummary {
    pub counts: ErrorCounts,
    pub report: VerifyReport,
    /// `None` when no enabled phase needed the walk.
    pub walk_stats: Option<WalkerStats>,
}

#[derive(Clone, Debug)]
pub struct FsckOutcome {
    pub initial: PassSummary,
    /// Repair actions, `None` if nothing was repaired.
    pub repair_log: Option<VerifyReport>,
    /// Second validation pass, only present after repairs.
    pub final_pass: Option<PassSummary>,
    pub trace: Vec<FsckState>,
}

impl FsckOutcome {
    pub fn repaired(&self) -> bool {
        self.repair_log.is_some()
    }

    /// Counters of the last pass that ran.
    pub fn residual(&self) -> &ErrorCounts {
        match &self.final_pass {
            Some(pass) => &pass.counts,
            None => &self.initial.counts,
        }
    }
}

/// Checks and repairs one image.
///
/// The caller must hold exclusive access to the image for the whole run.
pub struct Fsck<'a, IO: BlockIO + ?Sized> {
    io: &'a mut IO,
    opts: FsckOptions,
    state: FsckState,
    trace: Vec<FsckState>,
}

impl<'a, IO: BlockIO + ?Sized> Fsck<'a, IO> {
    pub fn new(io: &'a mut IO, opts: FsckOptions) -> Self {
        Self {
            io,
            opts,
            state: FsckState::Idle,
            trace: vec![FsckState::Idle],
        }
    }

    pub fn state(&self) -> FsckState {
        self.state
    }

    fn enter(&mut self, next: FsckState) {
        info!("fsck: {} -> {}", self.state, next);
        self.state = next;
        self.trace.push(next);
    }

    /// Runs one validation pass on a fresh session.
    fn validate(&mut self) -> FsResult<(PassSummary, CheckSession)> {
        let mut session = CheckSession::new();
        let mut report =
            VsfsChecker::new(&mut *self.io, &mut session).check_with(&self.opts.check)?;

        if let Some(walk) = session.walk() {
            for &index in &walk.unreadable_inodes {
                report.push(Finding::warn(
                    "WALK.SKIP",
                    format!("inode {index}: table block unreadable, pointer tree not walked"),
                ));
            }
        }

        let summary = PassSummary {
            counts: session.counts,
            report,
            walk_stats: session.walk().map(|w| w.stats),
        };
        info!("pass done: {} errors", summary.counts.total());
        Ok((summary, session))
    }

    pub fn run(mut self) -> FsResult<FsckOutcome> {
        let (initial, mut session) = self.validate()?;
        self.enter(FsckState::Validated);

        if initial.counts.is_clean() || !self.opts.repair {
            if !initial.counts.is_clean() {
                warn!("{} errors left unrepaired", initial.counts.total());
            }
            self.enter(FsckState::Done);
            return Ok(FsckOutcome {
                initial,
                repair_log: None,
                final_pass: None,
                trace: self.trace,
            });
        }

        self.enter(FsckState::Repairing);
        let plan = initial.counts;
        let repair_log = VsfsRepairer::new(&mut *self.io, &mut session).repair_with(&plan)?;
        drop(session);

        let (final_pass, _) = self.validate()?;
        self.enter(FsckState::Revalidated);
        if !final_pass.counts.is_clean() {
            warn!("{} errors remain after repair", final_pass.counts.total());
        }
        self.enter(FsckState::Done);

        Ok(FsckOutcome {
            initial,
            repair_log: Some(repair_log),
            final_pass: Some(final_pass),
            trace: self.trace,
        })
    }
}
