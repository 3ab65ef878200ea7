// SPDX-License-Identifier: MIT

use vsfs::prelude::*;

/// Backend that refuses every write touching one block.
struct ReadOnlyBlock<'a> {
    inner: MemBlockIO<'a>,
    block: u64,
}

impl BlockIO for ReadOnlyBlock<'_> {
    fn write_at(&mut self, offset: u64, data: &[u8]) -> BlockIOResult {
        let bs = VSFS_BLOCK_SIZE as u64;
        let first = offset / bs;
        let last = (offset + data.len() as u64).saturating_sub(1) / bs;
        if (first..=last).contains(&self.block) {
            return Err(BlockIOError::Other("write refused"));
        }
        self.inner.write_at(offset, data)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> BlockIOResult {
        self.inner.read_at(offset, buf)
    }

    fn flush(&mut self) -> BlockIOResult {
        self.inner.flush()
    }
}

fn formatted() -> Vec<u8> {
    let mut buf = vec![0u8; VSFS_IMAGE_SIZE as usize];
    let mut io = MemBlockIO::new(&mut buf);
    VsfsFormatter::new(&mut io).format(true).unwrap();
    buf
}

fn put_inode(buf: &mut [u8], index: u32, direct: u32) {
    let inode = VsfsInode {
        links_count: 1,
        direct_block: direct,
        ..VsfsInode::default()
    };
    let mut io = MemBlockIO::new(buf);
    InodeTable::put(&mut BlockStore::new(&mut io), index, &inode).unwrap();
    let bitmap = VSFS_INODE_BITMAP_BLOCK as usize * VSFS_BLOCK_SIZE;
    buf[bitmap + index as usize / 8] |= 1 << (index % 8);
}

#[test]
fn test_failed_write_does_not_stop_other_repairs() {
    let mut buf = formatted();
    buf[8..12].copy_from_slice(&7u32.to_le_bytes());
    put_inode(&mut buf, 0, 30);

    let out = {
        let mut io = ReadOnlyBlock {
            inner: MemBlockIO::new(&mut buf),
            block: VSFS_DATA_BITMAP_BLOCK as u64,
        };
        Fsck::new(&mut io, FsckOptions::default()).run().unwrap()
    };

    assert_eq!(out.initial.counts.superblock, 1);
    assert_eq!(out.initial.counts.data_bitmap, 1);

    let log = out.repair_log.as_ref().unwrap();
    assert!(log.contains_code("FIX.SB"));
    let fail = log.with_prefix("FIX.FAIL").next().unwrap();
    assert!(fail.msg.starts_with("data bitmap repair failed"));

    let residual = out.residual();
    assert_eq!(residual.superblock, 0);
    assert_eq!(residual.data_bitmap, 1);
    assert_eq!(out.trace.last(), Some(&FsckState::Done));
    assert_eq!(&buf[8..12], &64u32.to_le_bytes());
}

#[test]
fn test_duplicate_left_shared_when_inode_table_is_locked() {
    let mut buf = formatted();
    put_inode(&mut buf, 0, 25);
    put_inode(&mut buf, 1, 25);
    buf[VSFS_DATA_BITMAP_BLOCK as usize * VSFS_BLOCK_SIZE + 2] |= 1 << 1;

    let out = {
        let mut io = ReadOnlyBlock {
            inner: MemBlockIO::new(&mut buf),
            block: VSFS_INODE_TABLE_BLOCK as u64,
        };
        Fsck::new(&mut io, FsckOptions::default()).run().unwrap()
    };

    assert_eq!(out.initial.counts.duplicate, 1);
    let log = out.repair_log.as_ref().unwrap();
    assert!(log.contains_code("FIX.DUP.UNRESOLVED"));
    assert_eq!(out.residual().duplicate, 1);

    // the copy was released again
    let dbm = VSFS_DATA_BITMAP_BLOCK as usize * VSFS_BLOCK_SIZE;
    assert_eq!(buf[dbm], 0);
    assert_eq!(out.residual().data_bitmap, 0);
}

#[test]
fn test_partial_relocation_is_rolled_back() {
    let mut buf = formatted();
    put_inode(&mut buf, 0, 25);

    // inode 1 reaches block 25 twice: directly and through single indirect 40
    let inode = VsfsInode {
        links_count: 1,
        direct_block: 25,
        single_indirect: 40,
        ..VsfsInode::default()
    };
    {
        let mut io = MemBlockIO::new(&mut buf);
        InodeTable::put(&mut BlockStore::new(&mut io), 1, &inode).unwrap();
    }
    let ibm = VSFS_INODE_BITMAP_BLOCK as usize * VSFS_BLOCK_SIZE;
    buf[ibm] |= 1 << 1;
    let at = 40 * VSFS_BLOCK_SIZE;
    buf[at..at + 4].copy_from_slice(&25u32.to_le_bytes());
    let dbm = VSFS_DATA_BITMAP_BLOCK as usize * VSFS_BLOCK_SIZE;
    buf[dbm + 2] |= 1 << 1; // block 25
    buf[dbm + 4] |= 1 << 0; // block 40

    let out = {
        let mut io = ReadOnlyBlock {
            inner: MemBlockIO::new(&mut buf),
            block: 40,
        };
        Fsck::new(&mut io, FsckOptions::default()).run().unwrap()
    };

    assert!(out.initial.counts.duplicate > 0);
    assert_eq!(out.initial.counts.data_bitmap, 0);
    let log = out.repair_log.as_ref().unwrap();
    assert!(!log.contains_code("FIX.DUP"));
    let unresolved = log.with_prefix("FIX.DUP.UNRESOLVED").next().unwrap();
    assert!(unresolved.msg.starts_with("inode 1: block 25 left shared with inode 0"));
    assert_eq!(out.residual().duplicate, out.initial.counts.duplicate);

    // the direct slot moved first and was put back
    let mut io = MemBlockIO::new(&mut buf);
    let restored = InodeTable::get(&mut BlockStore::new(&mut io), 1).unwrap();
    assert_eq!(restored.direct_block, 25);
    assert_eq!(restored.single_indirect, 40);
    drop(io);
    assert_eq!(&buf[at..at + 4], &25u32.to_le_bytes());

    // the copy was released and never reached
    assert_eq!(buf[dbm], 0);
    assert_eq!(out.residual().data_bitmap, 0);
}
