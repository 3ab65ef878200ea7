// SPDX-License-Identifier: MIT

use crate::{BlockIO, BlockIOError, BlockIOResult, BlockIOSetLen};

/// In-memory implementation of `BlockIO`.
///
/// Useful for tests and for checking image copies held in RAM.
#[derive(Debug)]
pub struct MemBlockIO<'a> {
    buffer: &'a mut [u8],
    logical_len: usize,
}

impl<'a> MemBlockIO<'a> {
    #[inline]
    pub fn new(buffer: &'a mut [u8]) -> Self {
        let logical_len = buffer.len();
        Self {
            buffer,
            logical_len,
        }
    }

    /// Logical length of the backing buffer in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.logical_len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.logical_len == 0
    }

    #[inline]
    fn check_bounds(&self, offset: u64, len: usize) -> BlockIOResult<usize> {
        let end = offset
            .checked_add(len as u64)
            .ok_or(BlockIOError::OutOfBounds)?;
        if end > self.logical_len as u64 {
            return Err(BlockIOError::OutOfBounds);
        }
        Ok(offset as usize)
    }
}

impl<'a> BlockIO for MemBlockIO<'a> {
    #[inline(always)]
    fn write_at(&mut self, offset: u64, data: &[u8]) -> BlockIOResult {
        let start = self.check_bounds(offset, data.len())?;
        self.buffer[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    #[inline(always)]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> BlockIOResult {
        let start = self.check_bounds(offset, buf.len())?;
        buf.copy_from_slice(&self.buffer[start..start + buf.len()]);
        Ok(())
    }

    #[inline]
    fn flush(&mut self) -> BlockIOResult {
        Ok(())
    }
}

impl<'a> BlockIOSetLen for MemBlockIO<'a> {
    fn set_len(&mut self, new_len: u64) -> BlockIOResult {
        if new_len > self.buffer.len() as u64 {
            return Err(BlockIOError::OutOfBounds);
        }
        self.logical_len = new_len as usize;
        Ok(())
    }
}

#[cfg(all(test, feature = "std"))]
mod test {
    use super::*;
    use crate::prelude::*;

    #[test]
    fn test_rw() {
        let mut buf = [0u8; 256];
        let mut io = MemBlockIO::new(&mut buf);
        io.write_at(10, &[1, 2, 3, 4]).unwrap();

        let mut output = [0u8; 4];
        io.read_at(10, &mut output).unwrap();
        assert_eq!(output, [1, 2, 3, 4]);
    }

    #[test]
    fn test_out_of_bounds_is_not_partial() {
        let mut buf = [0xAAu8; 16];
        let mut io = MemBlockIO::new(&mut buf);

        assert_eq!(io.write_at(12, &[0u8; 8]), Err(BlockIOError::OutOfBounds));
        let mut out = [0u8; 8];
        assert_eq!(io.read_at(12, &mut out), Err(BlockIOError::OutOfBounds));
        assert_eq!(out, [0u8; 8]);
        assert_eq!(buf, [0xAAu8; 16]);
    }

    #[test]
    fn test_set_len_shrinks_view() {
        let mut buf = [0u8; 512];
        let mut io = MemBlockIO::new(&mut buf);
        io.set_len(256).unwrap();
        assert_eq!(io.len(), 256);

        let mut out = [0u8; 4];
        assert!(io.read_at(254, &mut out).is_err());
        assert!(io.set_len(1024).is_err());
    }

    #[test]
    fn test_primitive_rw() {
        let mut buf = [0u8; 64];
        let mut io = MemBlockIO::new(&mut buf);

        io.write_u32_at(8, 0xD34D_0001).unwrap();
        io.write_u16_at(0, 0xD34D).unwrap();
        assert_eq!(io.read_u32_at(8).unwrap(), 0xD34D_0001);
        assert_eq!(io.read_u16_at(0).unwrap(), 0xD34D);
        assert_eq!(&buf[0..2], &[0x4D, 0xD3]);
    }

    #[test]
    fn test_zero_fill_and_copy_within() {
        let mut buf = [0xFF; 64];
        let mut io = MemBlockIO::new(&mut buf);

        io.zero_fill(10, 8).unwrap();
        io.copy_within(0, 32, 16).unwrap();

        let mut output = [0xAA; 8];
        io.read_at(42, &mut output).unwrap();
        assert_eq!(output, [0, 0, 0, 0, 0, 0, 0xFF, 0xFF]);
        io.read_at(32, &mut output).unwrap();
        assert_eq!(output, [0xFF; 8]);
    }
}
