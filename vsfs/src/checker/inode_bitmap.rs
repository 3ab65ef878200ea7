// SPDX-License-Identifier: MIT

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, format};

use log::{debug, info, warn};
use vsio::prelude::*;

use super::{CappedReport, Finding, FsCheckerResult, FsRepairResult, VerifierOptionsLike, VerifyReport};
use crate::{
    constant::*,
    core::utils::bitmap::BitmapOps,
    inode_table::InodeTable,
    session::CheckSession,
    store::BlockStore,
};

/// Compares each inode bitmap bit with the validity of its inode.
pub fn check<IO: BlockIO + ?Sized, O: VerifierOptionsLike>(
    store: &mut BlockStore<'_, IO>,
    session: &mut CheckSession,
    opt: &O,
    rep: &mut VerifyReport,
) -> FsCheckerResult<()> {
    info!("checking inode bitmap");

    let bitmap = match store.read_block(VSFS_INODE_BITMAP_BLOCK) {
        Ok(block) => block,
        Err(e) => {
            warn!("inode bitmap unreadable: {e}");
            session.inode_bitmap = None;
            session.counts.inode_bitmap += 1;
            rep.push(Finding::err("IBM.IO", format!("cannot read inode bitmap: {e}")));
            return Ok(());
        }
    };

    let mut out = CappedReport::new(rep, opt.max_findings());
    let mut stale = 0usize;
    let mut missing = 0usize;
    let mut unreadable = 0usize;

    for index in 0..VSFS_INODE_COUNT {
        let marked = bitmap.get_bit(index as usize);
        let valid = match InodeTable::get(store, index) {
            Ok(inode) => inode.is_valid(),
            Err(e) => {
                unreadable += 1;
                out.push(Finding::err(
                    "IBM.READ",
                    format!("inode {index}: cannot read inode table block ({e})"),
                ));
                continue;
            }
        };

        if marked && !valid {
            debug!("inode {index} marked but invalid");
            stale += 1;
            out.push(Finding::err(
                "IBM.STALE",
                format!("inode {index} is marked as used but is invalid"),
            ));
        } else if valid && !marked {
            debug!("inode {index} valid but not marked");
            missing += 1;
            out.push(Finding::err(
                "IBM.MISSING",
                format!("inode {index} is valid but not marked as used"),
            ));
        }
    }
    out.finish("IBM.MORE");

    let errors = stale + missing + unreadable;
    session.counts.inode_bitmap += errors;
    if errors == 0 {
        rep.push(Finding::info("IBM.OK", "inode bitmap check passed"));
    } else {
        rep.push(Finding::info(
            "IBM.SUMMARY",
            format!(
                "{errors} errors: {stale} invalid inodes marked as used, {missing} valid inodes not marked, {unreadable} unreadable"
            ),
        ));
    }

    session.inode_bitmap = Some(Box::new(bitmap));
    Ok(())
}

/// Rebuilds the inode bitmap from current inode validity.
///
/// Inodes that cannot be read stay clear. Bits past the inode count are
/// written as zero.
pub fn repair<IO: BlockIO + ?Sized>(
    store: &mut BlockStore<'_, IO>,
    session: &mut CheckSession,
    log: &mut VerifyReport,
) -> FsRepairResult {
    info!("fixing inode bitmap");

    let mut bitmap = Box::new([0u8; VSFS_BLOCK_SIZE]);
    let mut used = 0usize;
    for index in 0..VSFS_INODE_COUNT {
        match InodeTable::get(store, index) {
            Ok(inode) if inode.is_valid() => {
                bitmap.set_bit(index as usize, true);
                used += 1;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("inode {index} left clear: {e}");
            }
        }
    }

    store.write_block(VSFS_INODE_BITMAP_BLOCK, &bitmap)?;
    log.push(Finding::info(
        "FIX.IBM",
        format!("rebuilt inode bitmap, {used} inodes marked as used"),
    ));
    session.inode_bitmap = Some(bitmap);
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
    fn test_valid_but_not_marked() {
        let mut buf = formatted();
        add_inode(&mut buf, 0, |_| {});
        add_inode(&mut buf, 3, |_| {});
        set_bit(&mut buf, VSFS_INODE_BITMAP_BLOCK, 0, false);

        let (mut session, rep) = run_check(&mut buf);
        assert_eq!(session.counts.inode_bitmap, 1);
        assert!(rep.contains_code("IBM.MISSING"));
        assert!(!rep.contains_code("IBM.STALE"));

        let mut io = MemBlockIO::new(&mut buf);
        let mut store = BlockStore::new(&mut io);
        repair(&mut store, &mut session, &mut VerifyReport::default()).unwrap();

        assert!(get_bit(&buf, VSFS_INODE_BITMAP_BLOCK, 0));
        assert!(get_bit(&buf, VSFS_INODE_BITMAP_BLOCK, 3));
        assert!(!get_bit(&buf, VSFS_INODE_BITMAP_BLOCK, 1));
    }

    #[test]
    fn test_marked_but_invalid_and_tail_bits() {
        let mut buf = formatted();
        add_inode(&mut buf, 7, |i| i.dtime = 99);
        // bit past the inode count: never audited, cleared by the rebuild
        set_bit(&mut buf, VSFS_INODE_BITMAP_BLOCK, 100, true);

        let (mut session, rep) = run_check(&mut buf);
        assert_eq!(session.counts.inode_bitmap, 1);
        assert!(rep.contains_code("IBM.STALE"));

        let mut io = MemBlockIO::new(&mut buf);
        let mut store = BlockStore::new(&mut io);
        repair(&mut store, &mut session, &mut VerifyReport::default()).unwrap();
        assert!(!get_bit(&buf, VSFS_INODE_BITMAP_BLOCK, 7));
        assert!(!get_bit(&buf, VSFS_INODE_BITMAP_BLOCK, 100));
    }

    #[test]
    fn test_unreadable_table_counts_per_inode() {
        let mut buf = formatted();
        buf.truncate(6 * VSFS_BLOCK_SIZE);

        // blocks 6 and 7 hold inodes 48..80
        let (session, rep) = run_check(&mut buf);
        assert_eq!(session.counts.inode_bitmap, 32);
        assert_eq!(rep.with_prefix("IBM.READ").count(), 32);
    }

    #[test]
    fn test_findings_are_capped() {
        let mut buf = formatted();
        for index in 0..10 {
            set_bit(&mut buf, VSFS_INODE_BITMAP_BLOCK, index, true);
        }

        let mut io = MemBlockIO::new(&mut buf);
        let mut store = BlockStore::new(&mut io);
        let mut session = CheckSession::new();
        let mut rep = VerifyReport::default();
        let opt = VsfsCheckOptions {
            max_findings: 3,
            ..VsfsCheckOptions::default()
        };
        check(&mut store, &mut session, &opt, &mut rep).unwrap();

        assert_eq!(session.counts.inode_bitmap, 10);
        assert_eq!(rep.with_prefix("IBM.STALE").count(), 3);
        assert!(rep.contains_code("IBM.MORE"));
    }
}
