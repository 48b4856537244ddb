/*++

Licensed under the Apache-2.0 license.

File Name:

    error_manager.rs

Abstract:

    File contains the escalation policy applied to load failures.

--*/

use crate::platform::{BootMode, SecureBootPlatform, SecurityFuses};
use plm_common::cprintln;
use plm_common::memory_layout::PMC_GLOBAL_PMC_MULTI_BOOT;
use plm_drivers::printer::HexWords;
use plm_drivers::{report_fw_error, RegisterIo};
use plm_error::PlmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Failure after boot completed, e.g. a rejected partial image
    NonCritical,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    Continue,
    SecureLockdown,
    /// Multiboot register advanced, reset into the next image
    RetryNextImage,
    Halt,
}

/// Report an error and decide how the PLM proceeds
///
/// # Arguments
///
/// * `io`       - Register I/O
/// * `platform` - Secure boot platform
/// * `err`      - Error being handled
/// * `severity` - Error severity
pub fn handle_error(
    io: &mut dyn RegisterIo,
    platform: &mut dyn SecureBootPlatform,
    err: PlmError,
    severity: ErrorSeverity,
) -> ErrorAction {
    report_fw_error(io, err.into());
    cprintln!("[errmgr] Error 0x{}", HexWords(&[u32::from(err)]));
    if severity == ErrorSeverity::NonCritical {
        return ErrorAction::Continue;
    }

    match platform.boot_mode() {
        BootMode::Jtag | BootMode::Smap | BootMode::Sbi => {
            if platform
                .security_fuses()
                .contains(SecurityFuses::SECURE_LOCKDOWN)
            {
                ErrorAction::SecureLockdown
            } else {
                ErrorAction::Halt
            }
        }
        BootMode::Qspi24 | BootMode::Qspi32 | BootMode::Ospi => {
            let next = io.read32(PMC_GLOBAL_PMC_MULTI_BOOT).wrapping_add(1);
            if next < platform.multiboot_limit() {
                io.write32(PMC_GLOBAL_PMC_MULTI_BOOT, next);
                cprintln!("[errmgr] Retrying with multiboot {}", next);
                ErrorAction::RetryNextImage
            } else {
                report_fw_error(io, PlmError::ERRMGR_MULTIBOOT_EXHAUSTED.into());
                ErrorAction::Halt
            }
        }
        _ => ErrorAction::Halt,
    }
}
