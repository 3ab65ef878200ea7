// SPDX-License-Identifier: MIT

//! Whole-block access to a VSFS image.

use vsio::prelude::*;

use crate::{constant::*, core::traits::FsMeta, meta::VsfsMeta, types::VsfsSuperblock};

/// One filesystem block.
pub type Block = [u8; VSFS_BLOCK_SIZE];

/// Reads and writes whole blocks of an image, nothing cached.
///
/// Indices outside `[0, VSFS_TOTAL_BLOCKS)` fail with `OutOfBounds` before
/// touching the backend. Exclusive access to the image is assumed.
pub struct BlockStore<'a, IO: BlockIO + ?Sized> {
    io: &'a mut IO,
    meta: VsfsMeta,
}

impl<'a, IO: BlockIO + ?Sized> BlockStore<'a, IO> {
    pub fn new(io: &'a mut IO) -> Self {
        Self {
            io,
            meta: VsfsMeta::new(),
        }
    }

    pub fn meta(&self) -> &VsfsMeta {
        &self.meta
    }

    #[inline]
    fn offset_of(&self, index: u32) -> BlockIOResult<u64> {
        if index >= self.meta.total_blocks {
            return Err(BlockIOError::OutOfBounds);
        }
        Ok(self.meta.unit_offset(index))
    }

    pub fn read_block(&mut self, index: u32) -> BlockIOResult<Block> {
        let mut block = [0u8; VSFS_BLOCK_SIZE];
        self.read_block_into(index, &mut block)?;
        Ok(block)
    }

    pub fn read_block_into(&mut self, index: u32, block: &mut Block) -> BlockIOResult {
        let offset = self.offset_of(index)?;
        self.io.read_at(offset, block)
    }

    pub fn write_block(&mut self, index: u32, block: &Block) -> BlockIOResult {
        let offset = self.offset_of(index)?;
        self.io.write_at(offset, block)
    }

    pub fn read_superblock(&mut self) -> BlockIOResult<VsfsSuperblock> {
        let offset = self.offset_of(VSFS_SUPERBLOCK_BLOCK)?;
        self.io.read_struct(offset)
    }

    pub fn write_superblock(&mut self, sb: &VsfsSuperblock) -> BlockIOResult {
        let offset = self.offset_of(VSFS_SUPERBLOCK_BLOCK)?;
        self.io.write_struct(offset, sb)
    }

    /// Copies the contents of block `src` into block `dst`.
    pub fn copy_block(&mut self, src: u32, dst: u32) -> BlockIOResult {
        let from = self.offset_of(src)?;
        let to = self.offset_of(dst)?;
        self.io.copy_within(from, to, VSFS_BLOCK_SIZE)
    }

    /// Rewrites entry `index` of indirect block `block`.
    pub fn write_entry(&mut self, block: u32, index: usize, value: u32) -> BlockIOResult {
        crate::ensure!(index < VSFS_POINTERS_PER_BLOCK, BlockIOError::OutOfBounds);
        let offset = self.offset_of(block)? + (index * 4) as u64;
        self.io.write_u32_at(offset, value)
    }

    pub fn flush(&mut self) -> BlockIOResult {
        self.io.flush()
    }
}

/// Entry `index` of an indirect block (little-endian u32).
#[inline]
pub fn entry(block: &Block, index: usize) -> u32 {
    let at = index * 4;
    u32::from_le_bytes([block[at], block[at + 1], block[at + 2], block[at + 3]])
}

#[inline]
pub fn set_entry(block: &mut Block, index: usize, value: u32) {
    let at = index * 4;
    block[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

/// Non-zero entries of an indirect block with their index.
pub fn entries(block: &Block) -> impl Iterator<Item = (usize, u32)> + '_ {
    (0..VSFS_POINTERS_PER_BLOCK)
        .map(move |i| (i, entry(block, i)))
        .filter(|&(_, ptr)| ptr != VSFS_NULL_BLOCK)
}
