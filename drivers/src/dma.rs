/*++

Licensed under the Apache-2.0 license.

File Name:

    dma.rs

Abstract:

    File contains the DMA seam used by CDO commands that move
    payload data into device memory.

--*/

use core::ops::Add;
use plm_error::PlmResult;

/// 64-bit platform address split the way CDO payloads carry it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlmAddr {
    pub lo: u32,
    pub hi: u32,
}

impl PlmAddr {
    pub const fn new(hi: u32, lo: u32) -> Self {
        Self { lo, hi }
    }
}

impl Add<u32> for PlmAddr {
    type Output = Self;

    fn add(self, rhs: u32) -> Self {
        PlmAddr::from(u64::from(self).wrapping_add(rhs as u64))
    }
}

impl Add<u64> for PlmAddr {
    type Output = Self;

    fn add(self, rhs: u64) -> Self {
        PlmAddr::from(u64::from(self).wrapping_add(rhs))
    }
}

impl From<u32> for PlmAddr {
    fn from(addr: u32) -> Self {
        Self { lo: addr, hi: 0 }
    }
}

impl From<u64> for PlmAddr {
    fn from(addr: u64) -> Self {
        Self {
            lo: addr as u32,
            hi: (addr >> 32) as u32,
        }
    }
}

impl From<PlmAddr> for u64 {
    fn from(addr: PlmAddr) -> Self {
        (addr.hi as u64) << 32 | (addr.lo as u64)
    }
}

bitflags::bitflags! {
    /// Transfer options carried in the flags word of DMA commands.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct DmaFlags: u32 {
        /// Source address does not increment
        const SRC_FIXED = 1 << 0;
        /// Use PMC DMA 0
        const PMCDMA_0 = 1 << 8;
        /// Use PMC DMA 1
        const PMCDMA_1 = 1 << 9;
        /// Destination address does not increment
        const DST_FIXED = 1 << 16;
    }
}

/// DMA engine
///
/// Word counts are in 32-bit words. Implementations block until the
/// transfer completes.
pub trait DmaEngine {
    /// Copy words from PLM memory to `dest`
    fn write_words(&mut self, dest: PlmAddr, src: &[u32], flags: DmaFlags) -> PlmResult<()>;

    /// Copy `words` words between two platform addresses
    fn xfer(&mut self, src: PlmAddr, dest: PlmAddr, words: u32, flags: DmaFlags)
        -> PlmResult<()>;
}

impl<T: DmaEngine + ?Sized> DmaEngine for &mut T {
    fn write_words(&mut self, dest: PlmAddr, src: &[u32], flags: DmaFlags) -> PlmResult<()> {
        (**self).write_words(dest, src, flags)
    }

    fn xfer(
        &mut self,
        src: PlmAddr,
        dest: PlmAddr,
        words: u32,
        flags: DmaFlags,
    ) -> PlmResult<()> {
        (**self).xfer(src, dest, words, flags)
    }
}
