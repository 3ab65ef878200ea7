// SPDX-License-Identifier: MIT
//! VSFS inode record

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{constant::VSFS_INODE_SIZE, types::PointerRole};

/// On-disk inode record (256 bytes, 16 per block).
///
/// Only `dtime`, `links_count` and the four block pointers carry meaning for
/// the checker; the other fields are preserved as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct VsfsInode {
    // 0x00
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u32,
    // 0x10
    pub atime: u32,
    pub ctime: u32,
    pub mtime: u32,
    /// Deletion time, non-zero once the inode is freed
    pub dtime: u32,
    // 0x20
    pub links_count: u32,
    pub blocks_count: u32,
    pub direct_block: u32,
    pub single_indirect: u32,
    // 0x30
    pub double_indirect: u32,
    pub triple_indirect: u32,
    pub reserved: [u8; 200],
}

const _: () = assert!(core::mem::size_of::<VsfsInode>() == VSFS_INODE_SIZE);

impl Default for VsfsInode {
    fn default() -> Self {
        Self {
            mode: 0,
            uid: 0,
            gid: 0,
            size: 0,
            atime: 0,
            ctime: 0,
            mtime: 0,
            dtime: 0,
            links_count: 0,
            blocks_count: 0,
            direct_block: 0,
            single_indirect: 0,
            double_indirect: 0,
            triple_indirect: 0,
            reserved: [0u8; 200],
        }
    }
}

impl VsfsInode {
    /// An inode is in use when it is linked and was never deleted.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.links_count > 0 && self.dtime == 0
    }

    pub fn pointer(&self, role: PointerRole) -> u32 {
        match role {
            PointerRole::Direct => self.direct_block,
            PointerRole::Single => self.single_indirect,
            PointerRole::Double => self.double_indirect,
            PointerRole::Triple => self.triple_indirect,
        }
    }

    pub fn set_pointer(&mut self, role: PointerRole, block: u32) {
        match role {
            PointerRole::Direct => self.direct_block = block,
            PointerRole::Single => self.single_indirect = block,
            PointerRole::Double => self.double_indirect = block,
            PointerRole::Triple => self.triple_indirect = block,
        }
    }

    /// Non-zero top-level pointers in walk order.
    pub fn pointers(&self) -> impl Iterator<Item = (PointerRole, u32)> + '_ {
        PointerRole::ALL
            .into_iter()
            .map(|role| (role, self.pointer(role)))
            .filter(|&(_, block)| block != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity() {
        let mut inode = VsfsInode::default();
        assert!(!inode.is_valid());

        inode.links_count = 1;
        assert!(inode.is_valid());

        inode.dtime = 1_700_000_000;
        assert!(!inode.is_valid());
    }

    #[test]
    fn test_pointer_offsets() {
        let mut inode = VsfsInode::default();
        inode.set_pointer(PointerRole::Direct, 9);
        inode.set_pointer(PointerRole::Triple, 12);

        let bytes = inode.as_bytes();
        assert_eq!(&bytes[40..44], &9u32.to_le_bytes());
        assert_eq!(&bytes[52..56], &12u32.to_le_bytes());

        let roles: Vec<_> = inode.pointers().collect();
        assert_eq!(
            roles,
            vec![(PointerRole::Direct, 9), (PointerRole::Triple, 12)]
        );
    }
}
