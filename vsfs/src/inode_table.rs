// SPDX-License-Identifier: MIT

//! Packed inode table accessor.

use vsio::prelude::*;
use zerocopy::{FromBytes, IntoBytes};

use crate::{
    constant::*,
    core::errors::{FsParsingError, FsParsingResult},
    meta::VsfsMeta,
    store::BlockStore,
    types::VsfsInode,
};

/// Maps inode indices to their record in blocks 3..8.
///
/// `get` decodes one record; `put` reads the containing block, overwrites
/// the record and writes the block back.
pub struct InodeTable;

impl InodeTable {
    /// `(block, byte offset)` of inode `index`.
    pub fn locate(index: u32) -> FsParsingResult<(u32, usize)> {
        crate::ensure!(
            index < VSFS_INODE_COUNT,
            FsParsingError::Invalid("inode index out of range")
        );
        Ok(VsfsMeta::new().inode_location(index))
    }

    pub fn get<IO: BlockIO + ?Sized>(
        store: &mut BlockStore<'_, IO>,
        index: u32,
    ) -> FsParsingResult<VsfsInode> {
        let (block, offset) = Self::locate(index)?;
        let buf = store.read_block(block)?;
        VsfsInode::read_from_bytes(&buf[offset..offset + VSFS_INODE_SIZE])
            .map_err(|_| FsParsingError::Corrupted)
    }

    pub fn put<IO: BlockIO + ?Sized>(
        store: &mut BlockStore<'_, IO>,
        index: u32,
        inode: &VsfsInode,
    ) -> FsParsingResult {
        let (block, offset) = Self::locate(index)?;
        let mut buf = store.read_block(block)?;
        buf[offset..offset + VSFS_INODE_SIZE].copy_from_slice(inode.as_bytes());
        store.write_block(block, &buf)?;
        Ok(())
    }
}
