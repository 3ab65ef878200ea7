// SPDX-License-Identifier: MIT

use crate::{constant::*, core::traits::FsMeta};

/// Geometry of a VSFS image.
///
/// Every VSFS image shares the same geometry; the superblock is checked
/// against these values rather than read into them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VsfsMeta {
    pub block_size: usize,
    pub total_blocks: u32,
    pub inode_bitmap_block: u32,
    pub data_bitmap_block: u32,
    pub inode_table_block: u32,
    pub data_block_start: u32,
    pub inode_size: usize,
    pub inode_count: u32,
}

impl VsfsMeta {
    pub const fn new() -> Self {
        Self {
            block_size: VSFS_BLOCK_SIZE,
            total_blocks: VSFS_TOTAL_BLOCKS,
            inode_bitmap_block: VSFS_INODE_BITMAP_BLOCK,
            data_bitmap_block: VSFS_DATA_BITMAP_BLOCK,
            inode_table_block: VSFS_INODE_TABLE_BLOCK,
            data_block_start: VSFS_DATA_BLOCK_START,
            inode_size: VSFS_INODE_SIZE,
            inode_count: VSFS_INODE_COUNT,
        }
    }

    /// Index of a data block in the data bitmap, if it lies in the data region.
    #[inline]
    pub fn data_bit(&self, block: u32) -> Option<usize> {
        self.is_valid_unit(block)
            .then(|| (block - self.data_block_start) as usize)
    }

    /// Data block addressed by a data bitmap bit.
    #[inline]
    pub fn block_of_bit(&self, bit: usize) -> u32 {
        self.data_block_start + bit as u32
    }

    /// Location `(block, byte offset)` of inode `index` in the inode table.
    #[inline]
    pub fn inode_location(&self, index: u32) -> (u32, usize) {
        let byte = index as usize * self.inode_size;
        (
            self.inode_table_block + (byte / self.block_size) as u32,
            byte % self.block_size,
        )
    }
}

impl Default for VsfsMeta {
    fn default() -> Self {
        Self::new()
    }
}

impl FsMeta<u32> for VsfsMeta {
    fn unit_size(&self) -> usize {
        self.block_size
    }

    fn unit_offset(&self, unit: u32) -> u64 {
        unit as u64 * self.block_size as u64
    }

    fn first_data_unit(&self) -> u32 {
        self.data_block_start
    }

    fn last_data_unit(&self) -> u32 {
        self.total_blocks - 1
    }

    fn total_units(&self) -> usize {
        (self.total_blocks - self.data_block_start) as usize
    }

    fn size_bytes(&self) -> u64 {
        self.total_blocks as u64 * self.block_size as u64
    }
}
