/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains API and macros used by the PLM for error handling

--*/
#![cfg_attr(not(feature = "std"), no_std)]
use core::convert::From;
use core::num::{NonZeroU32, TryFromIntError};

/// PLM Error Type
/// Derives debug, copy, clone, eq, and partial eq
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PlmError(pub NonZeroU32);

/// Macro to define error constants ensuring uniqueness
///
/// This macro takes a list of (name, value, doc) tuples and generates
/// constant definitions for each error code.
#[macro_export]
macro_rules! define_error_constants {
    ($(($name:ident, $value:expr, $doc:expr)),* $(,)?) => {
        $(
            #[doc = $doc]
            pub const $name: PlmError = PlmError::new_const($value);
        )*

        #[cfg(test)]
        /// Returns a vector of all defined error constants for testing uniqueness
        pub fn all_constants() -> Vec<(&'static str, u32)> {
            vec![
                $(
                    (stringify!($name), $value),
                )*
            ]
        }
    };
}

/// Base of the error family produced by a failing CDO command.
pub const CDO_CMD_ERROR_BASE: u32 = 0x0100_0000;

/// Set on a load failure when the secure buffers were cleared.
pub const ZEROIZE_SUCCESS_FLAG: u32 = 0x4000_0000;

/// Set on a load failure when clearing the secure buffers failed.
pub const ZEROIZE_FAILURE_FLAG: u32 = 0x8000_0000;

const ZEROIZE_FLAGS_MASK: u32 = ZEROIZE_SUCCESS_FLAG | ZEROIZE_FAILURE_FLAG;

impl PlmError {
    /// Create a PLM error; intended to only be used from const contexts, as we don't want
    /// runtime panics if val is zero. The preferred way to get a PlmError from a u32 is to
    /// use `PlmError::try_from()` from the `TryFrom` trait impl.
    const fn new_const(val: u32) -> Self {
        match NonZeroU32::new(val) {
            Some(val) => Self(val),
            None => panic!("PlmError cannot be 0"),
        }
    }

    /// Compose the error reported for a failing CDO command.
    ///
    /// The low 13 bits carry `((cmd_id & 0x1FF) << 4) | (status & 0xF)`.
    ///
    /// # Arguments
    ///
    /// * `cmd_id` - Command header word of the failing command
    /// * `status` - Status returned by the command handler
    pub const fn cdo_command(cmd_id: u32, status: u32) -> Self {
        Self::new_const(CDO_CMD_ERROR_BASE | ((cmd_id & 0x1FF) << 4) | (status & 0xF))
    }

    /// Returns the composite command code if this error came from a CDO command.
    pub fn cdo_command_code(self) -> Option<u32> {
        let val = self.base().0.get();
        if val & 0xFF00_0000 == CDO_CMD_ERROR_BASE {
            Some(val & 0x1FFF)
        } else {
            None
        }
    }

    /// Record the outcome of secure buffer zeroization in the error code.
    pub fn with_zeroize_status(self, cleared: bool) -> Self {
        let flag = if cleared {
            ZEROIZE_SUCCESS_FLAG
        } else {
            ZEROIZE_FAILURE_FLAG
        };
        Self::new_const((self.0.get() & !ZEROIZE_FLAGS_MASK) | flag)
    }

    /// Returns the error without any zeroization status flags.
    pub fn base(self) -> Self {
        match NonZeroU32::new(self.0.get() & !ZEROIZE_FLAGS_MASK) {
            Some(val) => Self(val),
            None => self,
        }
    }

    /// Returns whether the zeroization success flag is set.
    pub fn zeroized(self) -> bool {
        self.0.get() & ZEROIZE_SUCCESS_FLAG != 0
    }

    // Use the macro to define all error constants
    define_error_constants![
        (
            DRIVER_POLL_TIMEOUT,
            0x0001_0001,
            "Driver Error: register poll timed out"
        ),
        (
            DRIVER_DMA_XFER_FAILED,
            0x0001_0002,
            "Driver Error: DMA transfer failed"
        ),
        (
            DRIVER_DMA_INVALID_LENGTH,
            0x0001_0003,
            "Driver Error: DMA length invalid"
        ),
        (PLM_INTERNAL, 0x0001_0004, "Internal error"),
        (
            CDO_HDR_ID_ERR,
            0x0002_0001,
            "CDO Error: header identification mismatch"
        ),
        (
            CDO_CHECKSUM_ERR,
            0x0002_0002,
            "CDO Error: header checksum mismatch"
        ),
        (
            CDO_HDR_TRUNCATED,
            0x0002_0003,
            "CDO Error: first chunk shorter than the CDO header"
        ),
        (
            CDO_INVALID_RESUME_HANDLER,
            0x0002_0004,
            "CDO Error: partially executed command has no resume handler"
        ),
        (
            CDO_DEFERRED_ERROR,
            0x0002_0005,
            "CDO Error: a command reported a deferred error"
        ),
        (
            CDO_TRUNCATED_STREAM,
            0x0002_0006,
            "CDO Error: stream ended in the middle of a command"
        ),
        (
            CDO_MODULE_NOT_REGISTERED,
            0x0003_0001,
            "CDO Registry Error: module not registered"
        ),
        (
            CDO_INVALID_API_ID,
            0x0003_0002,
            "CDO Registry Error: api id out of range"
        ),
        (
            CDO_HANDLER_NOT_REGISTERED,
            0x0003_0003,
            "CDO Registry Error: handler not registered"
        ),
        (
            CDO_MODULE_ALREADY_REGISTERED,
            0x0003_0004,
            "CDO Registry Error: module id already registered"
        ),
        (
            CDO_INVALID_MODULE_ID,
            0x0003_0005,
            "CDO Registry Error: module id beyond registry capacity"
        ),
        (
            GENERIC_MAX_NESTED_BEGIN,
            0x0004_0001,
            "Generic Command Error: maximum nested begin exceeded"
        ),
        (
            GENERIC_INVALID_BEGIN_END_PAIR,
            0x0004_0002,
            "Generic Command Error: unbalanced begin/end or invalid break level"
        ),
        (
            GENERIC_END_OFFSET_MISMATCH,
            0x0004_0003,
            "Generic Command Error: end does not match the begin offset"
        ),
        (
            GENERIC_MASK_POLL_TIMEOUT,
            0x0004_0004,
            "Generic Command Error: mask poll timed out"
        ),
        (
            GENERIC_INVALID_PAYLOAD_LEN,
            0x0004_0005,
            "Generic Command Error: payload length invalid"
        ),
        (
            GENERIC_INVALID_KEYHOLE_SIZE,
            0x0004_0006,
            "Generic Command Error: keyhole size invalid"
        ),
        (
            BH_IMG_IDEN_MISMATCH,
            0x0005_0001,
            "Boot Header Error: image identification mismatch"
        ),
        (
            BH_CHECKSUM_MISMATCH,
            0x0005_0002,
            "Boot Header Error: checksum mismatch"
        ),
        (
            BH_PARTIAL_FW_LEN_NONZERO,
            0x0005_0003,
            "Boot Header Error: partial image carries firmware"
        ),
        (
            BH_DATA_LEN_NOT_WORD_ALIGNED,
            0x0005_0004,
            "Boot Header Error: total data length is not a multiple of 4"
        ),
        (
            BH_PUF_IMAGE_UNSUPPORTED,
            0x0005_0005,
            "Boot Header Error: PUF image not supported"
        ),
        (
            BH_INVALID_ENC_STATUS,
            0x0005_0006,
            "Boot Header Error: unknown encryption status"
        ),
        (
            SEC_PARTIAL_ENC_STATUS_NOT_ALLOWED,
            0x0006_0001,
            "Security Error: encryption status not allowed for partial image"
        ),
        (
            SEC_FAMILY_KEY_RED_KEYS_CLEARED,
            0x0006_0002,
            "Security Error: family key requested after red keys were cleared"
        ),
        (
            SEC_DEC_ONLY_REQUIRES_EFUSE_PUF_KEK,
            0x0006_0003,
            "Security Error: eFUSE-only decryption requires the eFUSE PUF KEK"
        ),
        (
            SEC_AUTH_REQUIRED,
            0x0006_0004,
            "Security Error: authentication enforced but image is not signed"
        ),
        (
            SEC_SECURE_STATE_GLITCH,
            0x0006_0005,
            "Security Error: secure state reads are inconsistent"
        ),
        (
            SEC_AUTH_STATE_MISMATCH,
            0x0006_0006,
            "Security Error: authentication state differs from the full image"
        ),
        (
            SEC_ENC_STATE_MISMATCH,
            0x0006_0007,
            "Security Error: encryption state differs from the full image"
        ),
        (
            SEC_PUF_DISABLED,
            0x0006_0008,
            "Security Error: PUF key requested but PUF is disabled"
        ),
        (
            SEC_PUF_HD_DIGEST_MISMATCH,
            0x0006_0009,
            "Security Error: PUF helper data digest mismatch"
        ),
        (
            SEC_REVOCATION_ID_INVALID,
            0x0006_000A,
            "Security Error: revocation id out of range"
        ),
        (
            SEC_REVOCATION_ID_REVOKED,
            0x0006_000B,
            "Security Error: revocation id revoked"
        ),
        (
            SEC_KEY_SOURCE_INVALID,
            0x0006_000C,
            "Security Error: key source does not match the encryption status"
        ),
        (
            LDR_INVALID_CHUNK_LEN,
            0x0007_0001,
            "Loader Error: secure chunk length invalid"
        ),
        (
            LDR_RTCA_IDENT_MISMATCH,
            0x0007_0002,
            "Loader Error: runtime configuration area identification mismatch"
        ),
        (
            LDR_AES_KEY_CLEAR_TIMEOUT,
            0x0007_0003,
            "Loader Error: AES red key clear not acknowledged"
        ),
        (
            LDR_ZEROIZE_FAILED,
            0x0007_0004,
            "Loader Error: secure buffers not cleared"
        ),
        (
            LDR_SBI_FIFO_UNDERFLOW,
            0x0007_0005,
            "Loader Error: SBI FIFO drained before the boot header was read"
        ),
        (
            ERRMGR_MULTIBOOT_EXHAUSTED,
            0x0008_0001,
            "Error Manager: no boot images left to try"
        ),
    ];
}

impl From<core::num::NonZeroU32> for crate::PlmError {
    fn from(val: core::num::NonZeroU32) -> Self {
        crate::PlmError(val)
    }
}

impl From<PlmError> for core::num::NonZeroU32 {
    fn from(val: PlmError) -> Self {
        val.0
    }
}

impl From<PlmError> for u32 {
    fn from(val: PlmError) -> Self {
        core::num::NonZeroU32::from(val).get()
    }
}

impl TryFrom<u32> for PlmError {
    type Error = TryFromIntError;
    fn try_from(val: u32) -> Result<Self, TryFromIntError> {
        match NonZeroU32::try_from(val) {
            Ok(val) => Ok(PlmError(val)),
            Err(err) => Err(err),
        }
    }
}

pub type PlmResult<T> = Result<T, PlmError>;
