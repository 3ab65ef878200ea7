// SPDX-License-Identifier: MIT

use log::{debug, info};
use vsio::prelude::*;

pub use crate::core::formatter::*;
use crate::{constant::*, meta::VsfsMeta, types::VsfsSuperblock};

/// Writes an empty VSFS image: canonical superblock, clear bitmaps, zeroed
/// inode table. A full format also zeroes the data region.
pub struct VsfsFormatter<'a, IO: BlockIO + ?Sized> {
    io: &'a mut IO,
    meta: VsfsMeta,
}

impl<'a, IO: BlockIO + ?Sized> VsfsFormatter<'a, IO> {
    pub fn new(io: &'a mut IO) -> Self {
        Self {
            io,
            meta: VsfsMeta::new(),
        }
    }
}

impl<'a, IO: BlockIOSetLen + ?Sized> VsfsFormatter<'a, IO> {
    /// Resizes the backend to exactly one image before formatting.
    pub fn format_sized(&mut self, full_format: bool) -> FsFormatterResult {
        self.io.set_len(VSFS_IMAGE_SIZE)?;
        self.format(full_format)
    }
}

impl<'a, IO: BlockIO + ?Sized> FsFormatter for VsfsFormatter<'a, IO> {
    fn format(&mut self, full_format: bool) -> FsFormatterResult {
        info!("formatting VSFS image ({} bytes)", VSFS_IMAGE_SIZE);

        let sb = VsfsSuperblock::canonical();
        self.io.write_struct(0, &sb)?;

        let meta_start = VSFS_INODE_BITMAP_BLOCK;
        let meta_len = (VSFS_DATA_BLOCK_START - meta_start) as usize * VSFS_BLOCK_SIZE;
        debug!(
            "zeroing bitmaps and inode table (blocks {}..{})",
            meta_start, VSFS_DATA_BLOCK_START
        );
        self.io
            .zero_fill(meta_start as u64 * VSFS_BLOCK_SIZE as u64, meta_len)?;

        if full_format {
            debug!("zeroing data region");
            zero_data_region(&mut *self.io, &self.meta)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> FsFormatterResult<()> {
        self.io.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{inode_table::InodeTable, store::BlockStore};
    use zerocopy::IntoBytes;

    #[test]
    fn test_format_writes_canonical_image() {
        let mut buf = vec![0xEEu8; VSFS_IMAGE_SIZE as usize];
        let mut io = MemBlockIO::new(&mut buf);
        VsfsFormatter::new(&mut io).format(true).unwrap();

        let mut store = BlockStore::new(&mut io);
        let sb = store.read_block(0).unwrap();
        assert_eq!(&sb[..], VsfsSuperblock::canonical().as_bytes());
        assert!(store.read_block(1).unwrap().iter().all(|&b| b == 0));
        assert!(store.read_block(2).unwrap().iter().all(|&b| b == 0));
        assert!(!InodeTable::get(&mut store, 79).unwrap().is_valid());
        assert!(store.read_block(63).unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_quick_format_keeps_data() {
        let mut buf = vec![0xEEu8; VSFS_IMAGE_SIZE as usize];
        let mut io = MemBlockIO::new(&mut buf);
        VsfsFormatter::new(&mut io).format(false).unwrap();

        assert_eq!(buf[VSFS_DATA_BLOCK_START as usize * VSFS_BLOCK_SIZE], 0xEE);
        assert_eq!(buf[VSFS_BLOCK_SIZE], 0);
    }

    #[test]
    fn test_format_sized_grows_backend() {
        let mut buf = vec![0u8; VSFS_IMAGE_SIZE as usize];
        let mut io = MemBlockIO::new(&mut buf);
        io.set_len(VSFS_BLOCK_SIZE as u64).unwrap();

        VsfsFormatter::new(&mut io).format_sized(true).unwrap();
        assert_eq!(io.len(), VSFS_IMAGE_SIZE as usize);
    }
}
