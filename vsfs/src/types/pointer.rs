// SPDX-License-Identifier: MIT

use core::fmt;

use crate::constant::VSFS_MAX_INDIRECT_DEPTH;

/// Top-level pointer field of an inode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PointerRole {
    Direct,
    Single,
    Double,
    Triple,
}

impl PointerRole {
    /// Walk order.
    pub const ALL: [PointerRole; 4] = [
        PointerRole::Direct,
        PointerRole::Single,
        PointerRole::Double,
        PointerRole::Triple,
    ];

    /// Indirect levels below the pointed block (0 for a data block).
    pub fn depth(self) -> u8 {
        match self {
            PointerRole::Direct => 0,
            PointerRole::Single => 1,
            PointerRole::Double => 2,
            PointerRole::Triple => VSFS_MAX_INDIRECT_DEPTH,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PointerRole::Direct => "direct",
            PointerRole::Single => "single indirect",
            PointerRole::Double => "double indirect",
            PointerRole::Triple => "triple indirect",
        }
    }
}

impl fmt::Display for PointerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a block pointer is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PointerSlot {
    /// A top-level field of the claiming inode.
    Inode(PointerRole),
    /// Entry `index` of indirect block `block`.
    Indirect { block: u32, index: u16 },
}

impl PointerSlot {
    /// Indirect block holding the slot, if any.
    pub fn parent(&self) -> Option<u32> {
        match *self {
            PointerSlot::Inode(_) => None,
            PointerSlot::Indirect { block, .. } => Some(block),
        }
    }
}

impl fmt::Display for PointerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointerSlot::Inode(role) => write!(f, "{role} pointer"),
            PointerSlot::Indirect { block, index } => write!(f, "entry {index} of block {block}"),
        }
    }
}
