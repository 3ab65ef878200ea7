// SPDX-License-Identifier: MIT

/// Statistics collected during a pointer-tree walk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalkerStats {
    /// Inodes whose pointer trees were walked.
    pub inodes_walked: usize,
    /// Inodes skipped because their table block could not be read.
    pub inodes_unreadable: usize,
    /// Indirect blocks read and decoded.
    pub indirect_blocks: usize,
    /// Non-zero pointers examined (inode fields and indirect entries).
    pub pointers_scanned: usize,
    /// Distinct blocks marked reachable.
    pub blocks_reached: usize,
    /// Deepest indirect level descended into.
    pub max_depth: usize,
}

impl WalkerStats {
    pub fn new() -> Self {
        Self::default()
    }
}
