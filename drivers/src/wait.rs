/*++

Licensed under the Apache-2.0 license.

File Name:

    wait.rs

Abstract:

    File contains common functions to implement wait routines.

--*/

use crate::RegisterIo;
use plm_error::{PlmError, PlmResult};

/// Poll `addr` until `(value & mask) == expected` or `timeout_us` elapses.
///
/// The register is sampled once per microsecond and once more after the
/// last delay, so a zero timeout still performs a single read.
///
/// # Returns
///
/// * Last value read on success, `DRIVER_POLL_TIMEOUT` otherwise
pub fn poll_for_mask(
    io: &mut dyn RegisterIo,
    addr: u64,
    mask: u32,
    expected: u32,
    timeout_us: u32,
) -> PlmResult<u32> {
    let mut remaining = timeout_us;
    loop {
        let val = io.read32(addr);
        if val & mask == expected {
            return Ok(val);
        }
        if remaining == 0 {
            return Err(PlmError::DRIVER_POLL_TIMEOUT);
        }
        io.delay_us(1);
        remaining -= 1;
    }
}
