// SPDX-License-Identifier: MIT

pub mod inode;
pub mod pointer;
pub mod superblock;

pub use inode::*;
pub use pointer::*;
pub use superblock::*;
