// SPDX-License-Identifier: MIT
//! VSFS superblock structure

use core::fmt;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::constant::*;

/// VSFS superblock (one full block).
///
/// C layout: the u16 magic is followed by two bytes of alignment padding so
/// the u32 fields start at offset 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct VsfsSuperblock {
    // 0x00
    /// Magic signature (0xD34D)
    pub magic: u16,
    pub _pad: u16,
    pub block_size: u32,
    pub total_blocks: u32,
    pub inode_bitmap_block: u32,
    // 0x10
    pub data_bitmap_block: u32,
    pub inode_table_block: u32,
    pub data_block_start: u32,
    pub inode_size: u32,
    // 0x20
    pub inode_count: u32,
    pub reserved: [u8; 4060],
}

const _: () = assert!(core::mem::size_of::<VsfsSuperblock>() == VSFS_BLOCK_SIZE);

impl Default for VsfsSuperblock {
    fn default() -> Self {
        Self {
            magic: 0,
            _pad: 0,
            block_size: 0,
            total_blocks: 0,
            inode_bitmap_block: 0,
            data_bitmap_block: 0,
            inode_table_block: 0,
            data_block_start: 0,
            inode_size: 0,
            inode_count: 0,
            reserved: [0u8; 4060],
        }
    }
}

impl VsfsSuperblock {
    /// Superblock of a well-formed image, reserved tail zeroed.
    pub fn canonical() -> Self {
        let mut sb = Self::default();
        sb.reset_geometry();
        sb
    }

    /// Overwrites the nine geometry fields with their fixed values.
    /// The padding and reserved tail are left untouched.
    pub fn reset_geometry(&mut self) {
        for field in SuperblockField::ALL {
            self.set(field, field.expected());
        }
    }

    pub fn get(&self, field: SuperblockField) -> u32 {
        match field {
            SuperblockField::Magic => self.magic as u32,
            SuperblockField::BlockSize => self.block_size,
            SuperblockField::TotalBlocks => self.total_blocks,
            SuperblockField::InodeBitmapBlock => self.inode_bitmap_block,
            SuperblockField::DataBitmapBlock => self.data_bitmap_block,
            SuperblockField::InodeTableBlock => self.inode_table_block,
            SuperblockField::DataBlockStart => self.data_block_start,
            SuperblockField::InodeSize => self.inode_size,
            SuperblockField::InodeCount => self.inode_count,
        }
    }

    pub fn set(&mut self, field: SuperblockField, value: u32) {
        match field {
            SuperblockField::Magic => self.magic = value as u16,
            SuperblockField::BlockSize => self.block_size = value,
            SuperblockField::TotalBlocks => self.total_blocks = value,
            SuperblockField::InodeBitmapBlock => self.inode_bitmap_block = value,
            SuperblockField::DataBitmapBlock => self.data_bitmap_block = value,
            SuperblockField::InodeTableBlock => self.inode_table_block = value,
            SuperblockField::DataBlockStart => self.data_block_start = value,
            SuperblockField::InodeSize => self.inode_size = value,
            SuperblockField::InodeCount => self.inode_count = value,
        }
    }

    /// Fields whose value differs from the fixed geometry, with the observed value.
    pub fn mismatches(&self) -> impl Iterator<Item = (SuperblockField, u32)> + '_ {
        SuperblockField::ALL
            .into_iter()
            .map(|f| (f, self.get(f)))
            .filter(|&(f, v)| v != f.expected())
    }

    pub fn is_canonical(&self) -> bool {
        self.mismatches().next().is_none()
    }
}

/// The nine geometry fields of the superblock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SuperblockField {
    Magic,
    BlockSize,
    TotalBlocks,
    InodeBitmapBlock,
    DataBitmapBlock,
    InodeTableBlock,
    DataBlockStart,
    InodeSize,
    InodeCount,
}

impl SuperblockField {
    pub const ALL: [SuperblockField; 9] = [
        SuperblockField::Magic,
        SuperblockField::BlockSize,
        SuperblockField::TotalBlocks,
        SuperblockField::InodeBitmapBlock,
        SuperblockField::DataBitmapBlock,
        SuperblockField::InodeTableBlock,
        SuperblockField::DataBlockStart,
        SuperblockField::InodeSize,
        SuperblockField::InodeCount,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SuperblockField::Magic => "magic",
            SuperblockField::BlockSize => "block_size",
            SuperblockField::TotalBlocks => "total_blocks",
            SuperblockField::InodeBitmapBlock => "inode_bitmap_block",
            SuperblockField::DataBitmapBlock => "data_bitmap_block",
            SuperblockField::InodeTableBlock => "inode_table_block",
            SuperblockField::DataBlockStart => "data_block_start",
            SuperblockField::InodeSize => "inode_size",
            SuperblockField::InodeCount => "inode_count",
        }
    }

    pub fn expected(self) -> u32 {
        match self {
            SuperblockField::Magic => VSFS_MAGIC as u32,
            SuperblockField::BlockSize => VSFS_BLOCK_SIZE as u32,
            SuperblockField::TotalBlocks => VSFS_TOTAL_BLOCKS,
            SuperblockField::InodeBitmapBlock => VSFS_INODE_BITMAP_BLOCK,
            SuperblockField::DataBitmapBlock => VSFS_DATA_BITMAP_BLOCK,
            SuperblockField::InodeTableBlock => VSFS_INODE_TABLE_BLOCK,
            SuperblockField::DataBlockStart => VSFS_DATA_BLOCK_START,
            SuperblockField::InodeSize => VSFS_INODE_SIZE as u32,
            SuperblockField::InodeCount => VSFS_INODE_COUNT,
        }
    }
}

impl fmt::Display for SuperblockField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
