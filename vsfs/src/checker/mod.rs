// SPDX-License-Identifier: MIT

//! VSFS checks and repairs.
//!
//! Each phase lives in its own module with a `check` that fills the session
//! and a `repair` that consumes it. [`VsfsChecker`] and [`VsfsRepairer`]
//! plug them into the generic [`FsChecker`] / [`FsRepairer`] drivers.

pub mod bad_blocks;
pub mod data_bitmap;
pub mod duplicates;
pub mod inode_bitmap;
pub mod superblock;
pub mod walker;

#[cfg(not(feature = "std"))]
use alloc::format;

use vsio::prelude::*;

pub use crate::core::checker::*;
use crate::{session::CheckSession, store::BlockStore};

#[derive(Clone, Debug)]
pub struct VsfsCheckOptions {
    pub phases: VerifyPhases,
    /// Detail findings kept per category; counters still count everything.
    pub max_findings: usize,
}

impl Default for VsfsCheckOptions {
    fn default() -> Self {
        Self {
            phases: VerifyPhases::ALL,
            max_findings: 256,
        }
    }
}

impl VerifierOptionsLike for VsfsCheckOptions {
    fn phases(&self) -> VerifyPhases {
        self.phases
    }
    fn max_findings(&self) -> usize {
        self.max_findings
    }
}

/// Runs the check phases of one pass, recording into `session`.
pub struct VsfsChecker<'s, 'a, IO: BlockIO + ?Sized> {
    store: BlockStore<'a, IO>,
    session: &'s mut CheckSession,
}

impl<'s, 'a, IO: BlockIO + ?Sized> VsfsChecker<'s, 'a, IO> {
    pub fn new(io: &'a mut IO, session: &'s mut CheckSession) -> Self {
        Self {
            store: BlockStore::new(io),
            session,
        }
    }
}

impl<IO: BlockIO + ?Sized> FsChecker for VsfsChecker<'_, '_, IO> {
    type Options = VsfsCheckOptions;

    fn check_superblock(&mut self, opt: &Self::Options, rep: &mut VerifyReport) -> FsCheckerResult<()> {
        self.session.mark_checked(VerifyPhases::SUPERBLOCK);
        superblock::check(&mut self.store, self.session, opt, rep)
    }

    fn check_inode_bitmap(&mut self, opt: &Self::Options, rep: &mut VerifyReport) -> FsCheckerResult<()> {
        self.session.mark_checked(VerifyPhases::INODE_BITMAP);
        inode_bitmap::check(&mut self.store, self.session, opt, rep)
    }

    fn check_data_bitmap(&mut self, opt: &Self::Options, rep: &mut VerifyReport) -> FsCheckerResult<()> {
        self.session.mark_checked(VerifyPhases::DATA_BITMAP);
        data_bitmap::check(&mut self.store, self.session, opt, rep)
    }

    fn check_duplicates(&mut self, opt: &Self::Options, rep: &mut VerifyReport) -> FsCheckerResult<()> {
        self.session.mark_checked(VerifyPhases::DUPLICATES);
        duplicates::check(&mut self.store, self.session, opt, rep)
    }

    fn check_bad_blocks(&mut self, opt: &Self::Options, rep: &mut VerifyReport) -> FsCheckerResult<()> {
        self.session.mark_checked(VerifyPhases::BAD_BLOCKS);
        bad_blocks::check(&mut self.store, self.session, opt, rep)
    }
}

/// Applies the repairs for a checked session.
pub struct VsfsRepairer<'s, 'a, IO: BlockIO + ?Sized> {
    store: BlockStore<'a, IO>,
    session: &'s mut CheckSession,
}

impl<'s, 'a, IO: BlockIO + ?Sized> VsfsRepairer<'s, 'a, IO> {
    pub fn new(io: &'a mut IO, session: &'s mut CheckSession) -> Self {
        Self {
            store: BlockStore::new(io),
            session,
        }
    }

    fn require_checked(&self, phase: VerifyPhases) -> FsRepairResult {
        crate::ensure!(
            self.session.was_checked(phase),
            FsRepairError::NotChecked("not checked in this session")
        );
        Ok(())
    }
}

impl<IO: BlockIO + ?Sized> FsRepairer for VsfsRepairer<'_, '_, IO> {
    fn repair_superblock(&mut self, log: &mut VerifyReport) -> FsRepairResult {
        self.require_checked(VerifyPhases::SUPERBLOCK)?;
        superblock::repair(&mut self.store, self.session, log)
    }

    fn repair_inode_bitmap(&mut self, log: &mut VerifyReport) -> FsRepairResult {
        self.require_checked(VerifyPhases::INODE_BITMAP)?;
        inode_bitmap::repair(&mut self.store, self.session, log)
    }

    fn repair_data_bitmap(&mut self, log: &mut VerifyReport) -> FsRepairResult {
        self.require_checked(VerifyPhases::DATA_BITMAP)?;
        data_bitmap::repair(&mut self.store, self.session, log)
    }

    fn repair_duplicates(&mut self, log: &mut VerifyReport) -> FsRepairResult {
        self.require_checked(VerifyPhases::DUPLICATES)?;
        duplicates::repair(&mut self.store, self.session, log)
    }

    fn repair_bad_blocks(&mut self, log: &mut VerifyReport) -> FsRepairResult {
        self.require_checked(VerifyPhases::BAD_BLOCKS)?;
        bad_blocks::repair(&mut self.store, self.session, log)
    }

    fn flush_repairs(&mut self) -> FsRepairResult {
        self.store.flush()?;
        Ok(())
    }
}

/// Report wrapper that keeps at most `limit` detail findings and folds the
/// rest into one trailing info line.
pub(crate) struct CappedReport<'r> {
    rep: &'r mut VerifyReport,
    limit: usize,
    shown: usize,
    hidden: usize,
}

impl<'r> CappedReport<'r> {
    pub(crate) fn new(rep: &'r mut VerifyReport, limit: usize) -> Self {
        Self {
            rep,
            limit,
            shown: 0,
            hidden: 0,
        }
    }

    pub(crate) fn push(&mut self, f: Finding) {
        if self.shown < self.limit {
            self.rep.push(f);
            self.shown += 1;
        } else {
            self.hidden += 1;
        }
    }

    /// Pushes a finding regardless of the cap.
    pub(crate) fn always(&mut self, f: Finding) {
        self.rep.push(f);
    }

    pub(crate) fn finish(self, code: &'static str) {
        if self.hidden > 0 {
            self.rep
                .push(Finding::info(code, format!("{} more not shown", self.hidden)));
        }
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    //! Image builders shared by the phase tests.

    use crate::{
        constant::*,
        formatter::{FsFormatter, VsfsFormatter},
        inode_table::InodeTable,
        store::{BlockStore, set_entry},
        types::VsfsInode,
    };
    use vsio::prelude::*;

    pub fn formatted() -> Vec<u8> {
        let mut buf = vec![0u8; VSFS_IMAGE_SIZE as usize];
        let mut io = MemBlockIO::new(&mut buf);
        VsfsFormatter::new(&mut io).format(true).unwrap();
        buf
    }

    /// Writes a valid inode and marks it in the inode bitmap.
    pub fn add_inode(buf: &mut [u8], index: u32, f: impl FnOnce(&mut VsfsInode)) {
        let mut io = MemBlockIO::new(buf);
        let mut store = BlockStore::new(&mut io);
        let mut inode = VsfsInode {
            links_count: 1,
            ..VsfsInode::default()
        };
        f(&mut inode);
        InodeTable::put(&mut store, index, &inode).unwrap();
        set_bit(buf, VSFS_INODE_BITMAP_BLOCK, index as usize, true);
    }

    pub fn set_bit(buf: &mut [u8], bitmap_block: u32, bit: usize, value: bool) {
        let byte = bitmap_block as usize * VSFS_BLOCK_SIZE + bit / 8;
        if value {
            buf[byte] |= 1 << (bit % 8);
        } else {
            buf[byte] &= !(1 << (bit % 8));
        }
    }

    pub fn get_bit(buf: &[u8], bitmap_block: u32, bit: usize) -> bool {
        buf[bitmap_block as usize * VSFS_BLOCK_SIZE + bit / 8] & (1 << (bit % 8)) != 0
    }

    /// Marks data block `block` used in the data bitmap.
    pub fn mark_data(buf: &mut [u8], block: u32) {
        set_bit(
            buf,
            VSFS_DATA_BITMAP_BLOCK,
            (block - VSFS_DATA_BLOCK_START) as usize,
            true,
        );
    }

    pub fn data_marked(buf: &[u8], block: u32) -> bool {
        get_bit(
            buf,
            VSFS_DATA_BITMAP_BLOCK,
            (block - VSFS_DATA_BLOCK_START) as usize,
        )
    }

    pub fn write_indirect(buf: &mut [u8], block: u32, ptrs: &[(usize, u32)]) {
        let mut raw = [0u8; VSFS_BLOCK_SIZE];
        for &(i, p) in ptrs {
            set_entry(&mut raw, i, p);
        }
        let at = block as usize * VSFS_BLOCK_SIZE;
        buf[at..at + VSFS_BLOCK_SIZE].copy_from_slice(&raw);
    }

    pub fn fill_block(buf: &mut [u8], block: u32, byte: u8) {
        let at = block as usize * VSFS_BLOCK_SIZE;
        buf[at..at + VSFS_BLOCK_SIZE].fill(byte);
    }

    pub fn inode(buf: &mut [u8], index: u32) -> VsfsInode {
        let mut io = MemBlockIO::new(buf);
        let mut store = BlockStore::new(&mut io);
        InodeTable::get(&mut store, index).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::{testutil::*, *};
    use crate::constant::*;

    #[test]
    fn test_repair_refuses_unchecked_phase() {
        let mut buf = formatted();
        // Corrupt the magic; only the inode bitmap gets checked.
        buf[0] = 0;
        let before = buf[..VSFS_BLOCK_SIZE].to_vec();

        let mut io = MemBlockIO::new(&mut buf);
        let mut session = CheckSession::new();
        let opts = VsfsCheckOptions {
            phases: VerifyPhases::INODE_BITMAP,
            ..VsfsCheckOptions::default()
        };
        VsfsChecker::new(&mut io, &mut session).check_with(&opts).unwrap();
        assert!(session.was_checked(VerifyPhases::INODE_BITMAP));
        assert!(!session.was_checked(VerifyPhases::SUPERBLOCK));

        let log = VsfsRepairer::new(&mut io, &mut session)
            .repair_with(&VerifyPhases::SUPERBLOCK)
            .unwrap();
        assert!(!log.contains_code("FIX.SB"));
        let fail: Vec<_> = log.with_prefix("FIX.FAIL").collect();
        assert_eq!(fail.len(), 1);
        assert_eq!(fail[0].msg, "superblock repair failed: not checked in this session");
        drop(io);
        assert_eq!(&buf[..VSFS_BLOCK_SIZE], &before[..]);
    }

    #[test]
    fn test_repair_runs_after_check() {
        let mut buf = formatted();
        buf[0] = 0;

        let mut io = MemBlockIO::new(&mut buf);
        let mut session = CheckSession::new();
        let rep = VsfsChecker::new(&mut io, &mut session).check_all().unwrap();
        assert!(rep.contains_code("SB.FIELD"));

        let plan = session.counts;
        let log = VsfsRepairer::new(&mut io, &mut session)
            .repair_with(&plan)
            .unwrap();
        assert!(log.contains_code("FIX.SB"));
        assert!(!log.contains_code("FIX.FAIL"));
    }
}
