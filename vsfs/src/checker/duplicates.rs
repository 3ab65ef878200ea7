// SPDX-License-Identifier: MIT

//! Blocks claimed by more than one valid inode.
//!
//! The first claimant in walk order keeps the block. Every later claimant
//! gets a fresh copy and its pointers are moved onto it.

use alloc::collections::{BTreeMap, BTreeSet};
#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, format, vec::Vec};

use log::{debug, info, warn};
use vsio::prelude::*;

use super::{
    CappedReport, Finding, FsCheckerResult, FsRepairError, FsRepairResult, VerifierOptionsLike,
    VerifyReport,
    walker::Duplicate,
};
use crate::{
    constant::*,
    core::{traits::FsMeta, utils::bitmap::BitmapOps},
    inode_table::InodeTable,
    meta::VsfsMeta,
    session::CheckSession,
    store::{Block, BlockStore},
    types::PointerSlot,
};

/// Reports every duplicate claim found by the walk.
pub fn check<IO: BlockIO + ?Sized, O: VerifierOptionsLike>(
    store: &mut BlockStore<'_, IO>,
    session: &mut CheckSession,
    opt: &O,
    rep: &mut VerifyReport,
) -> FsCheckerResult<()> {
    info!("checking duplicate blocks");

    let walk = session.ensure_walk(store);
    let found = walk.duplicates.len();

    let mut out = CappedReport::new(rep, opt.max_findings());
    for dup in &walk.duplicates {
        out.push(Finding::err(
            "DUP.BLOCK",
            format!("block {} is referenced by multiple inodes: {dup}", dup.block),
        ));
    }
    out.finish("DUP.MORE");

    session.counts.duplicate += found;
    if found == 0 {
        rep.push(Finding::info("DUP.OK", "duplicate blocks check passed"));
    }
    Ok(())
}

/// Session data bitmap, widened with everything the walk reached so a fresh
/// allocation never lands on a live block.
fn allocation_bitmap<IO: BlockIO + ?Sized>(
    store: &mut BlockStore<'_, IO>,
    session: &mut CheckSession,
) -> Box<Block> {
    let mut bitmap = match session.data_bitmap.take() {
        Some(bitmap) => bitmap,
        None => match store.read_block(VSFS_DATA_BITMAP_BLOCK) {
            Ok(block) => Box::new(block),
            Err(e) => {
                warn!("data bitmap unreadable ({e}), allocating from the walk only");
                Box::new([0u8; VSFS_BLOCK_SIZE])
            }
        },
    };
    let walk = session.ensure_walk(store);
    for block in walk.reachable.iter_marked() {
        bitmap.set_bit((block - VSFS_DATA_BLOCK_START) as usize, true);
    }
    bitmap
}

/// Moves duplicate claims onto freshly allocated copies.
///
/// Records are handled in discovery order, except that a record whose slot
/// sits inside another pending duplicate of the same claimant waits until
/// that parent has been copied, so the entry is patched in the copy.
struct Resolver<'s, 'a, IO: BlockIO + ?Sized> {
    store: &'s mut BlockStore<'a, IO>,
    meta: VsfsMeta,
    bitmap: Box<Block>,
    /// (claimant, old block) -> relocated copy
    relocated: BTreeMap<(u32, u32), u32>,
    /// (claimant, block) of records not handled yet
    pending: BTreeSet<(u32, u32)>,
    /// (claimant, block) of records left unresolved
    failed: BTreeSet<(u32, u32)>,
}

impl<'s, 'a, IO: BlockIO + ?Sized> Resolver<'s, 'a, IO> {
    fn waits_on_parent(&self, dup: &Duplicate) -> bool {
        dup.slots.iter().any(|slot| {
            slot.parent()
                .is_some_and(|parent| self.pending.contains(&(dup.claimant, parent)))
        })
    }

    /// Block where a slot of `claimant` must be written.
    fn slot_target(&self, claimant: u32, slot: PointerSlot) -> PointerSlot {
        match slot {
            PointerSlot::Indirect { block, index } => match self.relocated.get(&(claimant, block)) {
                Some(&copy) => PointerSlot::Indirect { block: copy, index },
                None => slot,
            },
            PointerSlot::Inode(_) => slot,
        }
    }

    fn write_slot(&mut self, claimant: u32, slot: PointerSlot, value: u32) -> FsRepairResult {
        match slot {
            PointerSlot::Inode(role) => {
                let mut inode = InodeTable::get(self.store, claimant)?;
                inode.set_pointer(role, value);
                InodeTable::put(self.store, claimant, &inode)?;
            }
            PointerSlot::Indirect { block, index } => {
                self.store.write_entry(block, index as usize, value)?;
            }
        }
        Ok(())
    }

    fn allocate(&mut self) -> Option<u32> {
        let bit = self.bitmap.find_first_zero_in(0, self.meta.total_units())?;
        self.bitmap.set_bit(bit, true);
        Some(self.meta.block_of_bit(bit))
    }

    fn release(&mut self, block: u32) {
        if let Some(bit) = self.meta.data_bit(block) {
            self.bitmap.set_bit(bit, false);
        }
    }

    /// Relocates one record, returning the new block.
    fn resolve(&mut self, dup: &Duplicate) -> FsRepairResult<u32> {
        let orphaned = dup.slots.iter().any(|slot| {
            slot.parent()
                .is_some_and(|parent| self.failed.contains(&(dup.claimant, parent)))
        });
        if orphaned {
            return Err(FsRepairError::Other(
                "enclosing indirect block was not relocated",
            ));
        }

        let fresh = self
            .allocate()
            .ok_or(FsRepairError::Other("no free data block"))?;

        if let Err(e) = self.store.copy_block(dup.block, fresh) {
            self.release(fresh);
            return Err(e.into());
        }

        let targets: Vec<PointerSlot> = dup
            .slots
            .iter()
            .map(|&slot| self.slot_target(dup.claimant, slot))
            .collect();

        for (done, &slot) in targets.iter().enumerate() {
            if let Err(e) = self.write_slot(dup.claimant, slot, fresh) {
                // put back the slots already moved
                for &moved in &targets[..done] {
                    if self.write_slot(dup.claimant, moved, dup.block).is_err() {
                        warn!("inode {}: could not restore {moved}", dup.claimant);
                    }
                }
                self.release(fresh);
                return Err(e);
            }
            debug!("inode {}: {slot} -> {fresh}", dup.claimant);
        }

        self.relocated.insert((dup.claimant, dup.block), fresh);
        Ok(fresh)
    }
}

/// Gives every later claimant of a shared block its own copy.
///
/// The data bitmap is written once, after all records were handled.
pub fn repair<IO: BlockIO + ?Sized>(
    store: &mut BlockStore<'_, IO>,
    session: &mut CheckSession,
    log: &mut VerifyReport,
) -> FsRepairResult {
    info!("fixing duplicate blocks");

    let bitmap = allocation_bitmap(store, session);
    let dups = session.ensure_walk(store).duplicates.clone();
    let meta = *store.meta();

    let mut resolver = Resolver {
        store: &mut *store,
        meta,
        bitmap,
        relocated: BTreeMap::new(),
        pending: dups.iter().map(|d| (d.claimant, d.block)).collect(),
        failed: BTreeSet::new(),
    };

    let mut queue: Vec<&Duplicate> = dups.iter().collect();
    let mut resolved = 0usize;
    let mut unresolved = 0usize;

    while !queue.is_empty() {
        let before = queue.len();
        let mut waiting = Vec::new();

        for dup in queue {
            if resolver.waits_on_parent(dup) {
                waiting.push(dup);
                continue;
            }
            resolver.pending.remove(&(dup.claimant, dup.block));
            match resolver.resolve(dup) {
                Ok(fresh) => {
                    resolved += 1;
                    log.push(Finding::info(
                        "FIX.DUP",
                        format!(
                            "inode {}: block {} relocated to {} ({} slot{})",
                            dup.claimant,
                            dup.block,
                            fresh,
                            dup.slots.len(),
                            if dup.slots.len() == 1 { "" } else { "s" }
                        ),
                    ));
                }
                Err(e) => {
                    unresolved += 1;
                    resolver.failed.insert((dup.claimant, dup.block));
                    warn!("inode {}: block {} left shared: {e}", dup.claimant, dup.block);
                    log.push(Finding::err(
                        "FIX.DUP.UNRESOLVED",
                        format!(
                            "inode {}: block {} left shared with inode {}: {}",
                            dup.claimant,
                            dup.block,
                            dup.owner,
                            e.msg()
                        ),
                    ));
                }
            }
        }

        if waiting.len() == before {
            // parents that can never be copied first
            for dup in &waiting {
                unresolved += 1;
                log.push(Finding::err(
                    "FIX.DUP.UNRESOLVED",
                    format!(
                        "inode {}: block {} sits under an indirect block that could not be relocated",
                        dup.claimant, dup.block
                    ),
                ));
            }
            break;
        }
        queue = waiting;
    }

    let bitmap = resolver.bitmap;
    store.write_block(VSFS_DATA_BITMAP_BLOCK, &bitmap)?;
    session.data_bitmap = Some(bitmap);
    session.invalidate_walk();

    info!("duplicates: {resolved} resolved, {unresolved} unresolved");
    Ok(())
}
