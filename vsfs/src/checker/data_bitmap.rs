// SPDX-License-Identifier: MIT

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, format, vec::Vec};

use log::{debug, info, warn};
use vsio::prelude::*;

use super::{CappedReport, Finding, FsCheckerResult, FsRepairResult, VerifierOptionsLike, VerifyReport};
use crate::{
    constant::*,
    session::CheckSession,
    store::{Block, BlockStore},
};

/// Compares the data bitmap with the blocks reachable from valid inodes.
pub fn check<IO: BlockIO + ?Sized, O: VerifierOptionsLike>(
    store: &mut BlockStore<'_, IO>,
    session: &mut CheckSession,
    opt: &O,
    rep: &mut VerifyReport,
) -> FsCheckerResult<()> {
    info!("checking data bitmap");

    let bitmap = match store.read_block(VSFS_DATA_BITMAP_BLOCK) {
        Ok(block) => block,
        Err(e) => {
            warn!("data bitmap unreadable: {e}");
            session.data_bitmap = None;
            session.counts.data_bitmap += 1;
            rep.push(Finding::err("DBM.IO", format!("cannot read data bitmap: {e}")));
            return Ok(());
        }
    };

    let mut mismatches = Vec::new();
    let reachable = &session.ensure_walk(store).reachable;
    reachable.for_each_mismatch(&bitmap, |block, on_disk| mismatches.push((block, on_disk)));
    debug!(
        "data bitmap: {} marked but unreachable, {} reachable but clear",
        reachable.count_orphans(&bitmap),
        reachable.count_missing(&bitmap)
    );

    let mut out = CappedReport::new(rep, opt.max_findings());
    for &(block, on_disk) in &mismatches {
        if on_disk {
            out.push(Finding::err(
                "DBM.STALE",
                format!("block {block} is marked as used in bitmap but not actually used"),
            ));
        } else {
            out.push(Finding::err(
                "DBM.MISSING",
                format!("block {block} is used but not marked in bitmap"),
            ));
        }
    }
    out.finish("DBM.MORE");

    session.counts.data_bitmap += mismatches.len();
    if mismatches.is_empty() {
        rep.push(Finding::info("DBM.OK", "data bitmap check passed"));
    }

    session.data_bitmap = Some(Box::new(bitmap));
    Ok(())
}

/// Data bitmap matching the current walk. Bits past the data region stay zero.
pub(crate) fn rebuilt_bitmap<IO: BlockIO + ?Sized>(
    store: &mut BlockStore<'_, IO>,
    session: &mut CheckSession,
) -> Box<Block> {
    let walk = session.ensure_walk(store);
    let mut bitmap = Box::new([0u8; VSFS_BLOCK_SIZE]);
    let bytes = walk.reachable.as_bytes();
    bitmap[..bytes.len()].copy_from_slice(bytes);
    bitmap
}

/// Rebuilds the data bitmap from the reachable set and writes it.
pub fn repair<IO: BlockIO + ?Sized>(
    store: &mut BlockStore<'_, IO>,
    session: &mut CheckSession,
    log: &mut VerifyReport,
) -> FsRepairResult {
    info!("fixing data bitmap");

    let bitmap = rebuilt_bitmap(store, session);
    store.write_block(VSFS_DATA_BITMAP_BLOCK, &bitmap)?;

    let used = session.ensure_walk(store).reachable.marked();
    log.push(Finding::info(
        "FIX.DBM",
        format!("rebuilt data bitmap, {used} blocks marked as used"),
    ));
    session.data_bitmap = Some(bitmap);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::{VsfsCheckOptions, testutil::*};

    fn run_check(buf: &mut [u8]) -> (CheckSession, VerifyReport) {
        let mut io = MemBlockIO::new(buf);
        let mut store = BlockStore::new(&mut io);
        let mut session = CheckSession::new();
        let mut rep = VerifyReport::default();
        check(&mut store, &mut session, &VsfsCheckOptions::default(), &mut rep).unwrap();
        (session, rep)
    }

    #[test]
    fn test_consistent_bitmap() {
        let mut buf = formatted();
        add_inode(&mut buf, 0, |i| i.direct_block = 10);
        mark_data(&mut buf, 10);

        let (session, rep) = run_check(&mut buf);
        assert_eq!(session.counts.data_bitmap, 0);
        assert!(rep.contains_code("DBM.OK"));
    }

    #[test]
    fn test_both_directions_then_rebuild() {
        let mut buf = formatted();
        add_inode(&mut buf, 0, |i| {
            i.direct_block = 10;
            i.single_indirect = 11;
        });
        write_indirect(&mut buf, 11, &[(0, 12)]);
        mark_data(&mut buf, 10);
        mark_data(&mut buf, 11);
        mark_data(&mut buf, 40);

        let (mut session, rep) = run_check(&mut buf);
        // 12 missing, 40 stale
        assert_eq!(session.counts.data_bitmap, 2);
        assert_eq!(rep.with_prefix("DBM.MISSING").count(), 1);
        assert_eq!(rep.with_prefix("DBM.STALE").count(), 1);

        let mut io = MemBlockIO::new(&mut buf);
        let mut store = BlockStore::new(&mut io);
        let mut log = VerifyReport::default();
        repair(&mut store, &mut session, &mut log).unwrap();
        assert!(log.contains_code("FIX.DBM"));

        for block in [10, 11, 12] {
            assert!(data_marked(&buf, block));
        }
        assert!(!data_marked(&buf, 40));
    }

    #[test]
    fn test_unreadable_bitmap_is_one_error() {
        let mut buf = formatted();
        buf.truncate(2 * VSFS_BLOCK_SIZE);

        let (session, rep) = run_check(&mut buf);
        assert_eq!(session.counts.data_bitmap, 1);
        assert!(rep.contains_code("DBM.IO"));
        assert!(session.walk().is_none());
    }
}
