// SPDX-License-Identifier: MIT

//! Bitmap operations on byte slices.
//!
//! Used for the on-disk allocation bitmaps and for reachability tracking.

/// Extension trait for bitmap operations on byte slices.
///
/// Bits are LSB-first within bytes: bit 0 is the LSB of byte 0, bit 8 the
/// LSB of byte 1, and so on.
pub trait BitmapOps {
    /// Sets or clears a bit. Does nothing if `bit` is out of bounds.
    fn set_bit(&mut self, bit: usize, value: bool);

    /// Returns `false` if `bit` is out of bounds.
    fn get_bit(&self, bit: usize) -> bool;

    /// Counts the set bits in `[start, end)`.
    fn count_ones_in_range(&self, start: usize, end: usize) -> usize;

    /// Finds the first zero bit at or after `start`.
    fn find_first_zero(&self, start: usize) -> Option<usize> {
        self.find_first_zero_in(start, usize::MAX)
    }

    /// Finds the first zero bit in `[start, end)`, clamped to the bitmap.
    fn find_first_zero_in(&self, start: usize, end: usize) -> Option<usize>;

    /// Counts the set bits in the entire bitmap.
    fn count_ones(&self) -> usize;

    /// Clears bits in `[start, len * 8)`.
    fn clear_from(&mut self, start: usize);
}

impl BitmapOps for [u8] {
    #[inline]
    fn set_bit(&mut self, bit: usize, value: bool) {
        if let Some(byte) = self.get_mut(bit / 8) {
            let mask = 1u8 << (bit % 8);
            if value {
                *byte |= mask;
            } else {
                *byte &= !mask;
            }
        }
    }

    #[inline]
    fn get_bit(&self, bit: usize) -> bool {
        self.get(bit / 8)
            .is_some_and(|b| (b & (1 << (bit % 8))) != 0)
    }

    fn count_ones_in_range(&self, start: usize, end: usize) -> usize {
        (start..end).filter(|&i| self.get_bit(i)).count()
    }

    fn find_first_zero_in(&self, start: usize, end: usize) -> Option<usize> {
        let end = end.min(self.len() * 8);
        let mut bit = start;
        while bit < end {
            let byte = self[bit / 8];
            // skip full bytes when aligned
            if bit % 8 == 0 && byte == 0xFF {
                bit += 8;
                continue;
            }
            if byte & (1 << (bit % 8)) == 0 {
                return Some(bit);
            }
            bit += 1;
        }
        None
    }

    fn count_ones(&self) -> usize {
        self.iter().map(|b| b.count_ones() as usize).sum()
    }

    fn clear_from(&mut self, start: usize) {
        let total = self.len() * 8;
        let mut bit = start;
        while bit < total && bit % 8 != 0 {
            self.set_bit(bit, false);
            bit += 1;
        }
        if let Some(rest) = self.get_mut(bit / 8..) {
            rest.fill(0);
        }
    }
}
