/*++

Licensed under the Apache-2.0 license.

File Name:

    reg_io.rs

Abstract:

    File contains the register I/O seam used by the PLM to reach
    memory-mapped registers on the 64-bit platform address map.

--*/

/// Memory-mapped register access.
///
/// Implemented by the board support package on hardware and by register
/// models in tests. All accesses are 32-bit; 64-bit addresses cover both the
/// PMC local map and the platform's high address space.
pub trait RegisterIo {
    /// Read a 32-bit register
    fn read32(&mut self, addr: u64) -> u32;

    /// Write a 32-bit register
    fn write32(&mut self, addr: u64, val: u32);

    /// Busy wait for `us` microseconds
    fn delay_us(&mut self, us: u32);

    /// Read-modify-write a 32-bit register
    ///
    /// # Arguments
    ///
    /// * `addr` - Register address
    /// * `mask` - Bits to update
    /// * `val`  - New value of the masked bits
    fn rmw32(&mut self, addr: u64, mask: u32, val: u32) {
        let cur = self.read32(addr);
        self.write32(addr, (cur & !mask) | (val & mask));
    }
}

impl<T: RegisterIo + ?Sized> RegisterIo for &mut T {
    fn read32(&mut self, addr: u64) -> u32 {
        (**self).read32(addr)
    }

    fn write32(&mut self, addr: u64, val: u32) {
        (**self).write32(addr, val)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}
