// SPDX-License-Identifier: MIT

//! Reachability tracker for pointer-tree walks.
//!
//! One bit per unit, offset by a base unit, laid out exactly like an on-disk
//! allocation bitmap so the two can be compared byte by byte.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::core::utils::bitmap::BitmapOps;

/// Tracks which units (blocks) were reached during a walk.
///
/// # Example
/// ```ignore
/// use vsfs::core::checker::ReachabilityTracker;
///
/// // Data blocks 8..64
/// let mut tracker = ReachabilityTracker::new(8, 56);
/// tracker.mark(12);
/// assert!(tracker.is_marked(12));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReachabilityTracker {
    bitmap: Vec<u8>,
    base_unit: u32,
    count: usize,
}

impl ReachabilityTracker {
    /// Creates a tracker for `count` units starting at `base_unit`.
    pub fn new(base_unit: u32, count: usize) -> Self {
        Self {
            bitmap: vec![0u8; count.div_ceil(8)],
            base_unit,
            count,
        }
    }

    #[inline]
    fn index_of(&self, unit: u32) -> Option<usize> {
        let idx = unit.checked_sub(self.base_unit)? as usize;
        (idx < self.count).then_some(idx)
    }

    /// Marks a unit as reached. Out-of-range units are ignored.
    ///
    /// Returns `true` if the unit was not marked before.
    #[inline]
    pub fn mark(&mut self, unit: u32) -> bool {
        match self.index_of(unit) {
            Some(idx) => {
                let fresh = !self.bitmap.get_bit(idx);
                self.bitmap.set_bit(idx, true);
                fresh
            }
            None => false,
        }
    }

    #[inline]
    pub fn is_marked(&self, unit: u32) -> bool {
        self.index_of(unit)
            .is_some_and(|idx| self.bitmap.get_bit(idx))
    }

    /// Raw bitmap, for comparison with or replacement of the on-disk one.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bitmap
    }

    /// Returns the number of tracked units.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns the base unit offset.
    pub fn base_unit(&self) -> u32 {
        self.base_unit
    }

    /// Number of units currently marked.
    pub fn marked(&self) -> usize {
        self.bitmap.count_ones_in_range(0, self.count)
    }

    /// Iterates over marked units in ascending order.
    pub fn iter_marked(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.count)
            .filter(|&i| self.bitmap.get_bit(i))
            .map(|i| self.base_unit + i as u32)
    }

    /// Counts orphan units: set in `on_disk` but not reached.
    pub fn count_orphans(&self, on_disk: &[u8]) -> usize {
        (0..self.count)
            .filter(|&i| on_disk.get_bit(i) && !self.bitmap.get_bit(i))
            .count()
    }

    /// Counts missing units: reached but clear in `on_disk`.
    pub fn count_missing(&self, on_disk: &[u8]) -> usize {
        (0..self.count)
            .filter(|&i| self.bitmap.get_bit(i) && !on_disk.get_bit(i))
            .count()
    }

    /// Calls `f(unit, on_disk_bit)` for every unit where `on_disk` and the
    /// tracker disagree, in ascending order.
    pub fn for_each_mismatch<F>(&self, on_disk: &[u8], mut f: F)
    where
        F: FnMut(u32, bool),
    {
        for i in 0..self.count {
            let disk = on_disk.get_bit(i);
            if disk != self.bitmap.get_bit(i) {
                f(self.base_unit + i as u32, disk);
            }
        }
    }
}
