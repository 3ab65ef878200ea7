// SPDX-License-Identifier: MIT

//! Pointer-tree walk over every valid inode.
//!
//! Produces the reachable-block set, the first-claimant ownership map, the
//! duplicate claims and the bad pointers. Each indirect block is descended
//! into at most once per inode, so the walk terminates on any image.

use alloc::collections::{BTreeMap, BTreeSet};
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;
use core::fmt;

use log::{debug, trace, warn};
use vsio::prelude::*;

use crate::{
    constant::*,
    core::{
        checker::{ReachabilityTracker, WalkerStats},
        traits::FsMeta,
    },
    inode_table::InodeTable,
    meta::VsfsMeta,
    store::{BlockStore, entries},
    types::{PointerRole, PointerSlot},
};

/// Why a pointer could not be followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadBlockKind {
    /// Outside the data region.
    OutOfRange,
    /// Indirect block that could not be read.
    Unreadable,
    /// Indirect block already descended into by the same inode.
    Cycle,
}

impl fmt::Display for BadBlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BadBlockKind::OutOfRange => "out of range",
            BadBlockKind::Unreadable => "unreadable",
            BadBlockKind::Cycle => "cycle",
        })
    }
}

/// A pointer the walk refused to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadBlock {
    pub inode: u32,
    /// Top-level pointer whose branch holds the bad pointer.
    pub role: PointerRole,
    /// The offending pointer value.
    pub block: u32,
    pub kind: BadBlockKind,
    /// Indirect block holding the pointer, `None` for an inode field.
    pub parent: Option<u32>,
}

impl fmt::Display for BadBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "inode {} {} branch: block {} is {}",
            self.inode, self.role, self.block, self.kind
        )?;
        if let Some(parent) = self.parent {
            write!(f, " (in indirect block {parent})")?;
        }
        Ok(())
    }
}

/// A block claimed by `claimant` after `owner` already claimed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    pub block: u32,
    pub owner: u32,
    pub claimant: u32,
    /// Every slot of the claimant that points at `block`, in walk order.
    pub slots: Vec<PointerSlot>,
}

impl fmt::Display for Duplicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "block {} owned by inode {} also claimed by inode {} ({} slot{})",
            self.block,
            self.owner,
            self.claimant,
            self.slots.len(),
            if self.slots.len() == 1 { "" } else { "s" }
        )
    }
}

/// Everything one walk learned about the image.
#[derive(Debug, Clone)]
pub struct WalkOutcome {
    pub reachable: ReachabilityTracker,
    /// Block -> first claiming inode.
    pub owners: BTreeMap<u32, u32>,
    pub bad_blocks: Vec<BadBlock>,
    /// Duplicate claims in discovery order.
    pub duplicates: Vec<Duplicate>,
    /// Inodes skipped because their table block could not be read.
    pub unreadable_inodes: Vec<u32>,
    pub stats: WalkerStats,
}

impl WalkOutcome {
    fn new(meta: &VsfsMeta) -> Self {
        Self {
            reachable: ReachabilityTracker::new(meta.first_data_unit(), meta.total_units()),
            owners: BTreeMap::new(),
            bad_blocks: Vec::new(),
            duplicates: Vec::new(),
            unreadable_inodes: Vec::new(),
            stats: WalkerStats::new(),
        }
    }

    pub fn owner_of(&self, block: u32) -> Option<u32> {
        self.owners.get(&block).copied()
    }

    /// Top-level roles of `inode` whose branch carries a bad pointer.
    pub fn bad_roles(&self, inode: u32) -> BTreeSet<PointerRole> {
        self.bad_blocks
            .iter()
            .filter(|b| b.inode == inode)
            .map(|b| b.role)
            .collect()
    }
}

/// Walks the pointer trees of all valid inodes.
pub struct ReachabilityWalker<'s, 'a, IO: BlockIO + ?Sized> {
    store: &'s mut BlockStore<'a, IO>,
    meta: VsfsMeta,
    out: WalkOutcome,
    /// (block, claimant) -> index in `out.duplicates`
    dup_index: BTreeMap<(u32, u32), usize>,
}

impl<'s, 'a, IO: BlockIO + ?Sized> ReachabilityWalker<'s, 'a, IO> {
    pub fn new(store: &'s mut BlockStore<'a, IO>) -> Self {
        let meta = *store.meta();
        Self {
            store,
            meta,
            out: WalkOutcome::new(&meta),
            dup_index: BTreeMap::new(),
        }
    }

    pub fn run(mut self) -> WalkOutcome {
        for index in 0..self.meta.inode_count {
            let inode = match InodeTable::get(self.store, index) {
                Ok(inode) => inode,
                Err(e) => {
                    warn!("inode {index}: table block unreadable ({e}), skipped");
                    self.out.unreadable_inodes.push(index);
                    self.out.stats.inodes_unreadable += 1;
                    continue;
                }
            };
            if !inode.is_valid() {
                continue;
            }

            debug!("walking inode {index}");
            self.out.stats.inodes_walked += 1;
            let mut visited = BTreeSet::new();
            for (role, ptr) in inode.pointers() {
                self.visit(
                    index,
                    role,
                    ptr,
                    PointerSlot::Inode(role),
                    role.depth(),
                    &mut visited,
                );
            }
        }

        self.out.stats.blocks_reached = self.out.reachable.marked();
        debug!(
            "walk done: {} inodes, {} blocks reached, {} duplicate claims, {} bad pointers",
            self.out.stats.inodes_walked,
            self.out.stats.blocks_reached,
            self.out.duplicates.len(),
            self.out.bad_blocks.len()
        );
        self.out
    }

    /// Follows one pointer. `depth` is the number of indirect levels below
    /// `ptr` (0 when it addresses a data block).
    fn visit(
        &mut self,
        inode: u32,
        role: PointerRole,
        ptr: u32,
        slot: PointerSlot,
        depth: u8,
        visited: &mut BTreeSet<u32>,
    ) {
        self.out.stats.pointers_scanned += 1;

        if !self.meta.is_valid_unit(ptr) {
            self.bad(inode, role, ptr, BadBlockKind::OutOfRange, slot);
            return;
        }
        if depth > 0 && visited.contains(&ptr) {
            self.bad(inode, role, ptr, BadBlockKind::Cycle, slot);
            return;
        }

        self.claim(inode, ptr, slot);
        visited.insert(ptr);
        if depth == 0 {
            return;
        }

        let block = match self.store.read_block(ptr) {
            Ok(block) => block,
            Err(e) => {
                warn!("inode {inode}: indirect block {ptr} unreadable ({e})");
                self.bad(inode, role, ptr, BadBlockKind::Unreadable, slot);
                return;
            }
        };

        let level = (role.depth() - depth + 1) as usize;
        self.out.stats.indirect_blocks += 1;
        self.out.stats.max_depth = self.out.stats.max_depth.max(level);
        trace!("inode {inode}: descending into block {ptr} (level {level})");

        for (index, child) in entries(&block) {
            let child_slot = PointerSlot::Indirect {
                block: ptr,
                index: index as u16,
            };
            self.visit(inode, role, child, child_slot, depth - 1, visited);
        }
    }

    fn claim(&mut self, inode: u32, block: u32, slot: PointerSlot) {
        match self.out.owners.get(&block).copied() {
            None => {
                self.out.owners.insert(block, inode);
                self.out.reachable.mark(block);
            }
            Some(owner) if owner == inode => {}
            Some(owner) => {
                debug!("block {block}: owned by inode {owner}, claimed again by inode {inode}");
                match self.dup_index.get(&(block, inode)) {
                    Some(&at) => self.out.duplicates[at].slots.push(slot),
                    None => {
                        self.dup_index
                            .insert((block, inode), self.out.duplicates.len());
                        self.out.duplicates.push(Duplicate {
                            block,
                            owner,
                            claimant: inode,
                            slots: vec![slot],
                        });
                    }
                }
            }
        }
    }

    fn bad(&mut self, inode: u32, role: PointerRole, block: u32, kind: BadBlockKind, slot: PointerSlot) {
        let record = BadBlock {
            inode,
            role,
            block,
            kind,
            parent: slot.parent(),
        };
        debug!("{record}");
        self.out.bad_blocks.push(record);
    }
}

/// Inclusive range of block numbers a pointer may hold.
pub fn valid_pointer_range() -> (u32, u32) {
    (VSFS_DATA_BLOCK_START, VSFS_TOTAL_BLOCKS - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        formatter::{FsFormatter, VsfsFormatter},
        store::set_entry,
        types::VsfsInode,
    };

    fn formatted() -> Vec<u8> {
        let mut buf = vec![0u8; VSFS_IMAGE_SIZE as usize];
        let mut io = MemBlockIO::new(&mut buf);
        VsfsFormatter::new(&mut io).format(true).unwrap();
        buf
    }

    fn put(store: &mut BlockStore<'_, MemBlockIO<'_>>, index: u32, f: impl FnOnce(&mut VsfsInode)) {
        let mut inode = VsfsInode {
            links_count: 1,
            ..VsfsInode::default()
        };
        f(&mut inode);
        InodeTable::put(store, index, &inode).unwrap();
    }

    fn indirect(store: &mut BlockStore<'_, MemBlockIO<'_>>, block: u32, ptrs: &[(usize, u32)]) {
        let mut buf = [0u8; VSFS_BLOCK_SIZE];
        for &(i, p) in ptrs {
            set_entry(&mut buf, i, p);
        }
        store.write_block(block, &buf).unwrap();
    }

    #[test]
    fn test_direct_and_single() {
        let mut buf = formatted();
        let mut io = MemBlockIO::new(&mut buf);
        let mut store = BlockStore::new(&mut io);

        put(&mut store, 0, |i| {
            i.direct_block = 8;
            i.single_indirect = 9;
        });
        indirect(&mut store, 9, &[(0, 10), (5, 11)]);

        let out = ReachabilityWalker::new(&mut store).run();
        let reached: Vec<u32> = out.reachable.iter_marked().collect();
        assert_eq!(reached, vec![8, 9, 10, 11]);
        assert_eq!(out.owner_of(11), Some(0));
        assert!(out.bad_blocks.is_empty());
        assert!(out.duplicates.is_empty());
        assert_eq!(out.stats.indirect_blocks, 1);
    }

    #[test]
    fn test_invalid_inode_is_ignored() {
        let mut buf = formatted();
        let mut io = MemBlockIO::new(&mut buf);
        let mut store = BlockStore::new(&mut io);

        put(&mut store, 4, |i| {
            i.dtime = 12345;
            i.direct_block = 3;
        });

        let out = ReachabilityWalker::new(&mut store).run();
        assert_eq!(out.reachable.marked(), 0);
        assert!(out.bad_blocks.is_empty());
        assert_eq!(out.stats.inodes_walked, 0);
    }

    #[test]
    fn test_out_of_range_entry_in_double() {
        let mut buf = formatted();
        let mut io = MemBlockIO::new(&mut buf);
        let mut store = BlockStore::new(&mut io);

        put(&mut store, 2, |i| i.double_indirect = 20);
        indirect(&mut store, 20, &[(0, 21)]);
        indirect(&mut store, 21, &[(3, 99), (4, 22)]);

        let out = ReachabilityWalker::new(&mut store).run();
        assert_eq!(
            out.bad_blocks,
            vec![BadBlock {
                inode: 2,
                role: PointerRole::Double,
                block: 99,
                kind: BadBlockKind::OutOfRange,
                parent: Some(21),
            }]
        );
        assert!(out.reachable.is_marked(22));
        assert_eq!(out.stats.max_depth, 2);
    }

    #[test]
    fn test_cycle_is_a_bad_block() {
        let mut buf = formatted();
        let mut io = MemBlockIO::new(&mut buf);
        let mut store = BlockStore::new(&mut io);

        // triple -> 30 -> 31 -> 30
        put(&mut store, 1, |i| i.triple_indirect = 30);
        indirect(&mut store, 30, &[(0, 31)]);
        indirect(&mut store, 31, &[(0, 30)]);

        let out = ReachabilityWalker::new(&mut store).run();
        assert_eq!(out.bad_blocks.len(), 1);
        assert_eq!(out.bad_blocks[0].kind, BadBlockKind::Cycle);
        assert_eq!(out.bad_blocks[0].block, 30);
        assert_eq!(out.bad_blocks[0].parent, Some(31));
        assert!(out.duplicates.is_empty());
    }

    #[test]
    fn test_duplicates_merge_slots_and_descend() {
        let mut buf = formatted();
        let mut io = MemBlockIO::new(&mut buf);
        let mut store = BlockStore::new(&mut io);

        put(&mut store, 0, |i| i.single_indirect = 40);
        indirect(&mut store, 40, &[(0, 41)]);
        put(&mut store, 5, |i| {
            i.direct_block = 41;
            i.double_indirect = 42;
        });
        indirect(&mut store, 42, &[(0, 40), (1, 44)]);

        let out = ReachabilityWalker::new(&mut store).run();

        // 41 claimed by inode 5 directly and again through 42 -> 40
        let d41 = out.duplicates.iter().find(|d| d.block == 41).unwrap();
        assert_eq!(d41.owner, 0);
        assert_eq!(d41.claimant, 5);
        assert_eq!(
            d41.slots,
            vec![
                PointerSlot::Inode(PointerRole::Direct),
                PointerSlot::Indirect { block: 40, index: 0 }
            ]
        );

        let d40 = out.duplicates.iter().find(|d| d.block == 40).unwrap();
        assert_eq!(d40.slots, vec![PointerSlot::Indirect { block: 42, index: 0 }]);
        assert_eq!(out.duplicates.len(), 2);
        assert!(out.reachable.is_marked(44));
        assert_eq!(out.owner_of(42), Some(5));
    }

    #[test]
    fn test_zero_indirect_block_claims_nothing_below() {
        let mut buf = formatted();
        let mut io = MemBlockIO::new(&mut buf);
        let mut store = BlockStore::new(&mut io);

        put(&mut store, 0, |i| i.single_indirect = 50);

        let out = ReachabilityWalker::new(&mut store).run();
        assert_eq!(out.reachable.iter_marked().collect::<Vec<_>>(), vec![50]);
        assert!(out.bad_blocks.is_empty());
    }

    #[test]
    fn test_unreadable_table_block_skips_inodes() {
        // image ends after block 4: inodes 32.. are unreadable
        let mut buf = formatted();
        buf.truncate(5 * VSFS_BLOCK_SIZE);
        let mut io = MemBlockIO::new(&mut buf);
        let mut store = BlockStore::new(&mut io);

        let out = ReachabilityWalker::new(&mut store).run();
        assert_eq!(out.unreadable_inodes.len(), 48);
        assert_eq!(out.unreadable_inodes[0], 32);
        assert_eq!(out.stats.inodes_unreadable, 48);
    }
}
