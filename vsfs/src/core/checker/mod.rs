// SPDX-License-Identifier: MIT

pub mod stats;
pub mod tracker;
mod types;

#[cfg(not(feature = "std"))]
use alloc::format;

pub use stats::WalkerStats;
pub use tracker::ReachabilityTracker;
pub use types::{
    Finding, ReportDisplay, ReportDisplayOpts, Severity, VerifierOptionsLike, VerifyPhases,
    VerifyReport,
};

pub use crate::core::errors::{FsCheckerError, FsCheckerResult, FsRepairError, FsRepairResult};

/// Trait for verifying the integrity of a filesystem.
///
/// Each phase is independent: a phase records what it finds into the report
/// and only returns `Err` when checking cannot go on at all. Disabled phases
/// are skipped.
pub trait FsChecker {
    type Options: VerifierOptionsLike + Default;

    fn check_with(&mut self, opt: &Self::Options) -> FsCheckerResult<VerifyReport> {
        let mut rep = VerifyReport::default();
        self.run_phase(opt, &mut rep, VerifyPhases::SUPERBLOCK, Self::check_superblock)?;
        self.run_phase(
            opt,
            &mut rep,
            VerifyPhases::INODE_BITMAP,
            Self::check_inode_bitmap,
        )?;
        self.run_phase(
            opt,
            &mut rep,
            VerifyPhases::DATA_BITMAP,
            Self::check_data_bitmap,
        )?;
        self.run_phase(opt, &mut rep, VerifyPhases::DUPLICATES, Self::check_duplicates)?;
        self.run_phase(opt, &mut rep, VerifyPhases::BAD_BLOCKS, Self::check_bad_blocks)?;
        Ok(rep)
    }

    fn check_all(&mut self) -> FsCheckerResult<VerifyReport> {
        self.check_with(&Self::Options::default())
    }

    fn check_superblock(
        &mut self,
        _opt: &Self::Options,
        _rep: &mut VerifyReport,
    ) -> FsCheckerResult<()> {
        Ok(())
    }
    fn check_inode_bitmap(
        &mut self,
        _opt: &Self::Options,
        _rep: &mut VerifyReport,
    ) -> FsCheckerResult<()> {
        Ok(())
    }
    fn check_data_bitmap(
        &mut self,
        _opt: &Self::Options,
        _rep: &mut VerifyReport,
    ) -> FsCheckerResult<()> {
        Ok(())
    }
    fn check_duplicates(
        &mut self,
        _opt: &Self::Options,
        _rep: &mut VerifyReport,
    ) -> FsCheckerResult<()> {
        Ok(())
    }
    fn check_bad_blocks(
        &mut self,
        _opt: &Self::Options,
        _rep: &mut VerifyReport,
    ) -> FsCheckerResult<()> {
        Ok(())
    }

    fn run_phase<F>(
        &mut self,
        opt: &Self::Options,
        rep: &mut VerifyReport,
        phase: VerifyPhases,
        f: F,
    ) -> FsCheckerResult<()>
    where
        F: Fn(&mut Self, &Self::Options, &mut VerifyReport) -> FsCheckerResult<()>,
    {
        if opt.phases().contains(phase) {
            f(self, opt, rep)?;
        }
        Ok(())
    }
}

/// Which repair phases a repairer should run.
pub trait RepairPlan {
    fn needs(&self, phase: VerifyPhases) -> bool;
}

impl RepairPlan for VerifyPhases {
    fn needs(&self, phase: VerifyPhases) -> bool {
        self.contains(phase)
    }
}

/// Trait for repairing what a [`FsChecker`] found.
///
/// Repairs run in phase order. A failing repair is logged as a `FIX.FAIL`
/// finding and the remaining repairs still run; nothing is rolled back.
pub trait FsRepairer {
    fn repair_with<P: RepairPlan + ?Sized>(&mut self, plan: &P) -> FsRepairResult<VerifyReport> {
        let mut log = VerifyReport::default();
        self.run_repair(plan, &mut log, VerifyPhases::SUPERBLOCK, Self::repair_superblock);
        self.run_repair(
            plan,
            &mut log,
            VerifyPhases::INODE_BITMAP,
            Self::repair_inode_bitmap,
        );
        self.run_repair(
            plan,
            &mut log,
            VerifyPhases::DATA_BITMAP,
            Self::repair_data_bitmap,
        );
        self.run_repair(
            plan,
            &mut log,
            VerifyPhases::DUPLICATES,
            Self::repair_duplicates,
        );
        self.run_repair(
            plan,
            &mut log,
            VerifyPhases::BAD_BLOCKS,
            Self::repair_bad_blocks,
        );
        self.flush_repairs()?;
        Ok(log)
    }

    fn repair_superblock(&mut self, _log: &mut VerifyReport) -> FsRepairResult {
        Ok(())
    }
    fn repair_inode_bitmap(&mut self, _log: &mut VerifyReport) -> FsRepairResult {
        Ok(())
    }
    fn repair_data_bitmap(&mut self, _log: &mut VerifyReport) -> FsRepairResult {
        Ok(())
    }
    fn repair_duplicates(&mut self, _log: &mut VerifyReport) -> FsRepairResult {
        Ok(())
    }
    fn repair_bad_blocks(&mut self, _log: &mut VerifyReport) -> FsRepairResult {
        Ok(())
    }

    /// Flush buffered writes once every repair has run.
    fn flush_repairs(&mut self) -> FsRepairResult {
        Ok(())
    }

    fn run_repair<P, F>(&mut self, plan: &P, log: &mut VerifyReport, phase: VerifyPhases, f: F)
    where
        P: RepairPlan + ?Sized,
        F: Fn(&mut Self, &mut VerifyReport) -> FsRepairResult,
    {
        if !plan.needs(phase) {
            return;
        }
        if let Err(e) = f(self, log) {
            log::warn!("{} repair failed: {}", phase.label(), e.msg());
            log.push(Finding::err(
                "FIX.FAIL",
                format!("{} repair failed: {}", phase.label(), e),
            ));
        }
    }
}
