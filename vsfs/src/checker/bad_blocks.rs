// SPDX-License-Identifier: MIT

use alloc::collections::{BTreeMap, BTreeSet};
#[cfg(not(feature = "std"))]
use alloc::{format, vec::Vec};

use log::{info, warn};
use vsio::prelude::*;

use super::{
    CappedReport, Finding, FsCheckerResult, FsRepairResult, VerifierOptionsLike, VerifyReport,
    data_bitmap,
    walker::{BadBlockKind, valid_pointer_range},
};
use crate::{
    constant::*, inode_table::InodeTable, session::CheckSession, store::BlockStore,
    types::PointerRole,
};

/// Reports every pointer the walk could not follow.
pub fn check<IO: BlockIO + ?Sized, O: VerifierOptionsLike>(
    store: &mut BlockStore<'_, IO>,
    session: &mut CheckSession,
    opt: &O,
    rep: &mut VerifyReport,
) -> FsCheckerResult<()> {
    info!("checking bad blocks");

    let (lo, hi) = valid_pointer_range();
    let walk = session.ensure_walk(store);
    let found = walk.bad_blocks.len();

    let mut out = CappedReport::new(rep, opt.max_findings());
    for bad in &walk.bad_blocks {
        let code = match bad.kind {
            BadBlockKind::OutOfRange => "BAD.RANGE",
            BadBlockKind::Unreadable => "BAD.READ",
            BadBlockKind::Cycle => "BAD.CYCLE",
        };
        let msg = match bad.kind {
            BadBlockKind::OutOfRange => format!("{bad} (valid range: {lo}-{hi})"),
            _ => format!("{bad}"),
        };
        out.push(Finding::err(code, msg));
    }
    out.finish("BAD.MORE");

    session.counts.bad_block += found;
    if found == 0 {
        rep.push(Finding::info("BAD.OK", "bad blocks check passed"));
    }
    Ok(())
}

/// Truncates every branch holding a bad pointer, then resyncs the data
/// bitmap so the blocks left behind are released.
pub fn repair<IO: BlockIO + ?Sized>(
    store: &mut BlockStore<'_, IO>,
    session: &mut CheckSession,
    log: &mut VerifyReport,
) -> FsRepairResult {
    info!("fixing bad blocks");

    let walk = session.ensure_walk(store);
    let branches: BTreeMap<u32, BTreeSet<PointerRole>> = walk
        .bad_blocks
        .iter()
        .map(|bad| (bad.inode, walk.bad_roles(bad.inode)))
        .collect();

    let mut truncated = 0usize;
    for (index, roles) in branches {
        let mut inode = match InodeTable::get(store, index) {
            Ok(inode) => inode,
            Err(e) => {
                warn!("inode {index}: cannot read for truncation: {e}");
                log.push(Finding::err(
                    "FIX.BAD.FAIL",
                    format!("inode {index}: cannot read inode ({e})"),
                ));
                continue;
            }
        };

        let cleared: Vec<(PointerRole, u32)> = roles
            .into_iter()
            .map(|role| (role, inode.pointer(role)))
            .collect();
        for &(role, _) in &cleared {
            inode.set_pointer(role, VSFS_NULL_BLOCK);
        }

        if let Err(e) = InodeTable::put(store, index, &inode) {
            warn!("inode {index}: cannot write truncated inode: {e}");
            log.push(Finding::err(
                "FIX.BAD.FAIL",
                format!("inode {index}: cannot write inode ({e})"),
            ));
            continue;
        }

        truncated += 1;
        for (role, old) in cleared {
            log.push(Finding::info(
                "FIX.BAD",
                format!("inode {index}: cleared {role} pointer (was {old})"),
            ));
        }
    }

    if truncated > 0 {
        session.invalidate_walk();
        let bitmap = data_bitmap::rebuilt_bitmap(store, session);
        store.write_block(VSFS_DATA_BITMAP_BLOCK, &bitmap)?;
        session.data_bitmap = Some(bitmap);
        log.push(Finding::info(
            "FIX.DBM",
            "data bitmap resynced after truncation",
        ));
    }
    Ok(())
}
