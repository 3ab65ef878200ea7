// SPDX-License-Identifier: MIT

// === Superblock ===

/// Magic number stored in the first two bytes of block 0.
pub const VSFS_MAGIC: u16 = 0xD34D;

/// Block holding the superblock.
pub const VSFS_SUPERBLOCK_BLOCK: u32 = 0;

// === Geometry ===

pub const VSFS_BLOCK_SIZE: usize = 4096;
pub const VSFS_TOTAL_BLOCKS: u32 = 64;

/// Size of a complete image in bytes.
pub const VSFS_IMAGE_SIZE: u64 = VSFS_TOTAL_BLOCKS as u64 * VSFS_BLOCK_SIZE as u64;

pub const VSFS_INODE_BITMAP_BLOCK: u32 = 1;
pub const VSFS_DATA_BITMAP_BLOCK: u32 = 2;
pub const VSFS_INODE_TABLE_BLOCK: u32 = 3;
pub const VSFS_DATA_BLOCK_START: u32 = 8;

/// Number of blocks in the data region (8..64).
pub const VSFS_DATA_BLOCK_COUNT: u32 = VSFS_TOTAL_BLOCKS - VSFS_DATA_BLOCK_START;

// === Inode ===

pub const VSFS_INODE_SIZE: usize = 256;
pub const VSFS_INODE_COUNT: u32 = 80;
pub const VSFS_INODES_PER_BLOCK: usize = VSFS_BLOCK_SIZE / VSFS_INODE_SIZE;

/// Blocks spanned by the inode table (3..8).
pub const VSFS_INODE_TABLE_BLOCKS: u32 =
    (VSFS_INODE_COUNT as usize * VSFS_INODE_SIZE).div_ceil(VSFS_BLOCK_SIZE) as u32;

// === Indirect pointers ===

/// Little-endian u32 entries in one indirect block.
pub const VSFS_POINTERS_PER_BLOCK: usize = VSFS_BLOCK_SIZE / 4;

/// Deepest indirect level (triple).
pub const VSFS_MAX_INDIRECT_DEPTH: u8 = 3;

/// Pointer value meaning "unused slot".
pub const VSFS_NULL_BLOCK: u32 = 0;
