// SPDX-License-Identifier: MIT
#![cfg_attr(not(feature = "std"), no_std)]

//! Consistency checker and repair engine for VSFS images.
//!
//! VSFS is a fixed-geometry block filesystem: 64 blocks of 4 KiB holding a
//! superblock, an inode bitmap, a data bitmap, an 80-entry inode table and a
//! 56-block data region. [`fsck::Fsck`] validates an image reached through any
//! [`vsio::BlockIO`] backend, repairs what it can in place and validates again.

#[macro_use]
extern crate alloc;

// Core Modules
pub mod core;

// Filesystem modules
pub mod checker;
pub mod constant;
pub mod formatter;
pub mod fsck;
pub mod inode_table;
pub mod meta;
pub mod session;
pub mod store;
pub mod types;

// Reusable types and traits
pub use core::traits::*;

pub mod prelude {
    pub use crate::checker::{VsfsCheckOptions, VsfsChecker, VsfsRepairer};
    pub use crate::constant::*;
    pub use crate::core::checker::{Finding, Severity, VerifyPhases, VerifyReport};
    pub use crate::core::errors::*;
    pub use crate::core::traits::*;
    pub use crate::formatter::VsfsFormatter;
    pub use crate::fsck::{Fsck, FsckOptions, FsckOutcome, FsckState};
    pub use crate::inode_table::InodeTable;
    pub use crate::meta::VsfsMeta;
    pub use crate::session::{CheckSession, ErrorCounts};
    pub use crate::store::{Block, BlockStore};
    pub use crate::types::*;
    pub use vsio::prelude::*;
}
