// SPDX-License-Identifier: MIT

use core::fmt;

use crate::{BlockIO, BlockIOResult};

/// Simple counters, no_std friendly.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct IoStats {
    pub reads: u64,
    pub read_bytes: u64,
    pub writes: u64,
    pub write_bytes: u64,
    pub flushes: u64,
    /// Transfers that returned an error.
    pub failures: u64,
}

impl IoStats {
    #[inline]
    pub fn reset(&mut self) {
        *self = IoStats::default();
    }
}

impl fmt::Display for IoStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "reads={} ({} B)  writes={} ({} B)  flushes={}  failures={}",
            self.reads, self.read_bytes, self.writes, self.write_bytes, self.flushes, self.failures
        )
    }
}

/// Transparent instrumentation wrapper.
pub struct IOCounter<'a, IO: BlockIO + ?Sized> {
    inner: &'a mut IO,
    pub stats: IoStats,
}

impl<'a, IO: BlockIO + ?Sized> IOCounter<'a, IO> {
    #[inline]
    pub fn new(inner: &'a mut IO) -> Self {
        Self {
            inner,
            stats: IoStats::default(),
        }
    }

    #[inline]
    pub fn snapshot(&self) -> IoStats {
        self.stats
    }

    #[inline]
    pub fn into_inner(self) -> &'a mut IO {
        self.inner
    }

    #[inline]
    fn track(&mut self, res: BlockIOResult) -> BlockIOResult {
        if res.is_err() {
            self.stats.failures += 1;
        }
        res
    }
}

impl<'a, IO: BlockIO + ?Sized> BlockIO for IOCounter<'a, IO> {
    #[inline]
    fn write_at(&mut self, offset: u64, data: &[u8]) -> BlockIOResult {
        self.stats.writes += 1;
        self.stats.write_bytes += data.len() as u64;
        let res = self.inner.write_at(offset, data);
        self.track(res)
    }

    #[inline]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> BlockIOResult {
        self.stats.reads += 1;
        self.stats.read_bytes += buf.len() as u64;
        let res = self.inner.read_at(offset, buf);
        self.track(res)
    }

    #[inline]
    fn flush(&mut self) -> BlockIOResult {
        self.stats.flushes += 1;
        let res = self.inner.flush();
        self.track(res)
    }
}

#[cfg(all(test, feature = "mem"))]
mod tests {
    use super::*;
    use crate::prelude::*;

    #[test]
    fn test_counts_transfers() {
        let mut buf = [0u8; 128];
        let mut mem = MemBlockIO::new(&mut buf);
        let mut io = IOCounter::new(&mut mem);

        io.write_at(0, &[1u8; 32]).unwrap();
        let mut out = [0u8; 16];
        io.read_at(8, &mut out).unwrap();
        assert!(io.read_at(120, &mut out).is_err());
        io.flush().unwrap();

        let s = io.snapshot();
        assert_eq!(s.writes, 1);
        assert_eq!(s.write_bytes, 32);
        assert_eq!(s.reads, 2);
        assert_eq!(s.read_bytes, 32);
        assert_eq!(s.failures, 1);
        assert_eq!(s.flushes, 1);
    }
}
