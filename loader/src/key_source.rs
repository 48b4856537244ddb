/*++

Licensed under the Apache-2.0 license.

File Name:

    key_source.rs

Abstract:

    File contains AES key source selection.

--*/

use crate::boot_header::EncryptionStatus;
use crate::platform::SecureBootPlatform;
use plm_error::{PlmError, PlmResult};

/// AES key source used to decrypt secure chunks
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    #[default]
    None,
    EfuseKey,
    EfuseRedKey,
    BbramKey,
    BbramRedKey,
    BhKey,
    BhRedKey,
    FamilyKey,
    PufKey,
}

impl KeySource {
    /// Red key variant of a black or grey key source.
    ///
    /// The ROM leaves the unwrapped key in the red key register, so every
    /// chunk after the first decrypts with it.
    pub fn red(self) -> Self {
        match self {
            Self::EfuseKey => Self::EfuseRedKey,
            Self::BbramKey => Self::BbramRedKey,
            Self::BhKey => Self::BhRedKey,
            other => other,
        }
    }
}

/// Select the key source for an image
///
/// # Arguments
///
/// * `platform`   - Secure boot platform
/// * `enc_status` - Encryption status of the image
///
/// # Returns
///
/// * `KeySource::None` for unencrypted images, the red key variant of the
///   source pulled from the ROM otherwise. An encrypted image without a key
///   source is `SEC_KEY_SOURCE_INVALID`.
pub fn select_key_source(
    platform: &mut dyn SecureBootPlatform,
    enc_status: EncryptionStatus,
) -> PlmResult<KeySource> {
    if !enc_status.is_encrypted() {
        return Ok(KeySource::None);
    }
    match platform.pull_key_source(enc_status)? {
        KeySource::None => Err(PlmError::SEC_KEY_SOURCE_INVALID),
        source => Ok(source.red()),
    }
}
