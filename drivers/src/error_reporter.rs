/*++

Licensed under the Apache-2.0 license.

File Name:

    error_reporter.rs

Abstract:

    File contains API for Error and Boot Status Reporting via the
    persistent PMC Global registers.

--*/
use crate::memory_layout::{
    PMC_GLOBAL_PMC_FW_ERR, PMC_GLOBAL_PMC_FW_ERR_FIRST, PMC_GLOBAL_PMC_FW_STATUS,
};
use crate::RegisterIo;

/// Report F/W error
///
/// The most recent error always lands in `PMC_FW_ERR`; the first error since
/// power on is latched in `PMC_FW_ERR_FIRST`.
///
/// # Arguments
///
/// * `io`  - Register I/O
/// * `val` - F/W error code.
pub fn report_fw_error(io: &mut dyn RegisterIo, val: u32) {
    if io.read32(PMC_GLOBAL_PMC_FW_ERR_FIRST) == 0 {
        io.write32(PMC_GLOBAL_PMC_FW_ERR_FIRST, val);
    }
    io.write32(PMC_GLOBAL_PMC_FW_ERR, val);
}

/// Get the most recent F/W error
pub fn get_fw_error(io: &mut dyn RegisterIo) -> u32 {
    io.read32(PMC_GLOBAL_PMC_FW_ERR)
}

/// Get the first F/W error since power on
pub fn get_first_fw_error(io: &mut dyn RegisterIo) -> u32 {
    io.read32(PMC_GLOBAL_PMC_FW_ERR_FIRST)
}

/// Report boot status
///
/// # Arguments
///
/// * `io`     - Register I/O
/// * `status` - Boot stage code.
pub fn report_boot_status(io: &mut dyn RegisterIo, status: u32) {
    io.write32(PMC_GLOBAL_PMC_FW_STATUS, status);
}
