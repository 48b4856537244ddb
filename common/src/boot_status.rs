/*++

Licensed under the Apache-2.0 license.

File Name:

    boot_status.rs

Abstract:

    PLM boot status codes.

--*/

const FULL_PDI_BOOT_STATUS_BASE: u32 = 1;
const PARTIAL_PDI_BOOT_STATUS_BASE: u32 = 65;
const ERROR_BOOT_STATUS_BASE: u32 = 129;

/// Statuses used by the PLM to log loader progress.
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PlmBootStatus {
    // Full PDI Statuses
    PreBootInit = FULL_PDI_BOOT_STATUS_BASE,
    FullPdiInit = FULL_PDI_BOOT_STATUS_BASE + 1,
    FullPdiHeaderValidated = FULL_PDI_BOOT_STATUS_BASE + 2,
    FullPdiKeySourceSelected = FULL_PDI_BOOT_STATUS_BASE + 3,
    FullPdiChunkLoop = FULL_PDI_BOOT_STATUS_BASE + 4,
    FullPdiRuntimeConfigApplied = FULL_PDI_BOOT_STATUS_BASE + 5,
    FullPdiDone = FULL_PDI_BOOT_STATUS_BASE + 6,

    // Partial PDI Statuses
    AwaitSbiData = PARTIAL_PDI_BOOT_STATUS_BASE,
    PartialPdiInit = PARTIAL_PDI_BOOT_STATUS_BASE + 1,
    PartialPdiHeaderValidated = PARTIAL_PDI_BOOT_STATUS_BASE + 2,
    PartialPdiKeySourceSelected = PARTIAL_PDI_BOOT_STATUS_BASE + 3,
    PartialPdiHashBlockValidated = PARTIAL_PDI_BOOT_STATUS_BASE + 4,
    PartialPdiChunkLoop = PARTIAL_PDI_BOOT_STATUS_BASE + 5,
    PartialPdiDone = PARTIAL_PDI_BOOT_STATUS_BASE + 6,

    // Failure Statuses
    LoadFailed = ERROR_BOOT_STATUS_BASE,
    SecureBuffersCleared = ERROR_BOOT_STATUS_BASE + 1,
    SecureBuffersClearFailed = ERROR_BOOT_STATUS_BASE + 2,
}

impl From<PlmBootStatus> for u32 {
    /// Converts to this type from the input type.
    fn from(status: PlmBootStatus) -> u32 {
        status as u32
    }
}
