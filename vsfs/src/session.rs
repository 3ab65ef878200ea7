// SPDX-License-Identifier: MIT

//! Per-pass state shared by the checks and repairs.

#[cfg(not(feature = "std"))]
use alloc::boxed::Box;
use core::fmt;

use vsio::prelude::*;

use crate::{
    checker::walker::{ReachabilityWalker, WalkOutcome},
    core::checker::{RepairPlan, VerifyPhases},
    store::{Block, BlockStore},
    types::VsfsSuperblock,
};

/// Error counters, one per category.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCounts {
    pub superblock: usize,
    pub inode_bitmap: usize,
    pub data_bitmap: usize,
    pub duplicate: usize,
    pub bad_block: usize,
}

impl ErrorCounts {
    pub fn total(&self) -> usize {
        self.superblock + self.inode_bitmap + self.data_bitmap + self.duplicate + self.bad_block
    }

    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }

    /// Counter of a single phase (0 for combined flags).
    pub fn get(&self, phase: VerifyPhases) -> usize {
        match phase {
            p if p == VerifyPhases::SUPERBLOCK => self.superblock,
            p if p == VerifyPhases::INODE_BITMAP => self.inode_bitmap,
            p if p == VerifyPhases::DATA_BITMAP => self.data_bitmap,
            p if p == VerifyPhases::DUPLICATES => self.duplicate,
            p if p == VerifyPhases::BAD_BLOCKS => self.bad_block,
            _ => 0,
        }
    }

    /// Phases with a nonzero counter.
    pub fn failing(&self) -> VerifyPhases {
        VerifyPhases::ORDERED
            .into_iter()
            .filter(|&p| self.get(p) > 0)
            .fold(VerifyPhases::empty(), |acc, p| acc | p)
    }
}

impl RepairPlan for ErrorCounts {
    fn needs(&self, phase: VerifyPhases) -> bool {
        self.get(phase) > 0
    }
}

impl fmt::Display for ErrorCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Superblock errors: {}", self.superblock)?;
        writeln!(f, "Inode bitmap errors: {}", self.inode_bitmap)?;
        writeln!(f, "Data bitmap errors: {}", self.data_bitmap)?;
        writeln!(f, "Duplicate block errors: {}", self.duplicate)?;
        writeln!(f, "Bad block errors: {}", self.bad_block)?;
        match self.total() {
            0 => write!(f, "File system is consistent."),
            n => write!(f, "Found {n} errors."),
        }
    }
}

/// State of one validation pass.
///
/// Created empty, filled by the checks, consumed by the repairs. The walk is
/// computed at most once and shared by the data bitmap, duplicate and bad
/// block phases. Nothing survives from one pass to the next.
#[derive(Debug, Default)]
pub struct CheckSession {
    /// Block 0 as read by the superblock check, `None` if unreadable.
    pub superblock: Option<VsfsSuperblock>,
    /// Block 1 as read by the inode bitmap check.
    pub inode_bitmap: Option<Box<Block>>,
    /// Block 2 as read by the data bitmap check. Duplicate resolution
    /// allocates from this copy.
    pub data_bitmap: Option<Box<Block>>,
    pub counts: ErrorCounts,
    checked: VerifyPhases,
    walk: Option<WalkOutcome>,
}

impl CheckSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_checked(&mut self, phase: VerifyPhases) {
        self.checked |= phase;
    }

    /// Whether every phase in `phase` ran its check in this session.
    pub fn was_checked(&self, phase: VerifyPhases) -> bool {
        self.checked.contains(phase)
    }

    /// Runs the walk unless this session already did.
    pub fn ensure_walk<IO: BlockIO + ?Sized>(
        &mut self,
        store: &mut BlockStore<'_, IO>,
    ) -> &mut WalkOutcome {
        self.walk
            .get_or_insert_with(|| ReachabilityWalker::new(store).run())
    }

    pub fn walk(&self) -> Option<&WalkOutcome> {
        self.walk.as_ref()
    }

    /// Drops the cached walk after the pointer trees changed.
    pub fn invalidate_walk(&mut self) {
        self.walk = None;
    }
}
