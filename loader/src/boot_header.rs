/*++

Licensed under the Apache-2.0 license.

File Name:

    boot_header.rs

Abstract:

    File contains the boot header layout and its validation.

--*/

use bitfield::bitfield;
use memoffset::{offset_of, span_of};
use plm_cdo::PdiType;
use plm_common::checksum::calc_inverted_checksum;
use plm_common::cprintln;
use plm_error::{PlmError, PlmResult};
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};
use zeroize::Zeroize;

/// Width detection word, first word of every boot header
pub const BH_WIDTH_DETECT: u32 = 0xAA99_5566;

/// Identification word ("XLNX")
pub const BH_IMG_IDEN: u32 = 0x584C_4E58;

/// PUF image identification ("PUFI")
pub const BH_PUF_IMAGE_ID: u32 = 0x5055_4649;

pub const BOOT_HEADER_WORDS: usize = 208;
pub const BOOT_HEADER_SIZE: usize = BOOT_HEADER_WORDS * 4;

/// Signed image marker in image attributes bits [19:18]
const BH_SIGNED_IMAGE: u32 = 0x3;

/// PUF helper data carried in the boot header, image attributes bits [7:6]
pub const BH_PUF_MODE_BOOT_HEADER: u32 = 0x3;

/// Encryption status of a boot image and the key it is decrypted with
#[repr(u32)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionStatus {
    #[default]
    None = 0x0,
    EfuseKey = 0xA5C3_C5A3,
    EfusePufKek = 0xA5C3_C5A5,
    EfuseFamilyKek = 0xA5C3_C5A7,
    BhPufKek = 0xA35C_7C53,
    BhFamilyKek = 0xA35C_7CA5,
    BbramKey = 0x3A5C_3C5A,
    BbramPufKek = 0x3A5C_3C59,
    BbramFamilyKek = 0x3A5C_3C57,
}

impl EncryptionStatus {
    pub fn is_encrypted(self) -> bool {
        self != Self::None
    }

    /// Key is wrapped by a PUF derived key
    pub fn uses_puf(self) -> bool {
        matches!(self, Self::EfusePufKek | Self::BhPufKek | Self::BbramPufKek)
    }

    pub fn uses_family_key(self) -> bool {
        matches!(
            self,
            Self::EfuseFamilyKek | Self::BhFamilyKek | Self::BbramFamilyKek
        )
    }

    pub fn uses_bbram(self) -> bool {
        matches!(self, Self::BbramKey | Self::BbramPufKek | Self::BbramFamilyKek)
    }
}

impl From<EncryptionStatus> for u32 {
    fn from(status: EncryptionStatus) -> u32 {
        status as u32
    }
}

impl TryFrom<u32> for EncryptionStatus {
    type Error = PlmError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0x0 => Ok(Self::None),
            0xA5C3_C5A3 => Ok(Self::EfuseKey),
            0xA5C3_C5A5 => Ok(Self::EfusePufKek),
            0xA5C3_C5A7 => Ok(Self::EfuseFamilyKek),
            0xA35C_7C53 => Ok(Self::BhPufKek),
            0xA35C_7CA5 => Ok(Self::BhFamilyKek),
            0x3A5C_3C5A => Ok(Self::BbramKey),
            0x3A5C_3C59 => Ok(Self::BbramPufKek),
            0x3A5C_3C57 => Ok(Self::BbramFamilyKek),
            _ => Err(PlmError::BH_INVALID_ENC_STATUS),
        }
    }
}

bitfield! {
    /// Image attributes
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct ImageAttributes(u32);
    impl Debug;

    /// Location of the PUF helper data
    pub puf_mode, set_puf_mode: 7, 6;

    /// Signed image marker
    pub signed_image, set_signed_image: 19, 18;
}

impl ImageAttributes {
    pub fn is_signed(&self) -> bool {
        self.signed_image() == BH_SIGNED_IMAGE
    }
}

/// Boot header
#[repr(C)]
#[derive(Clone, Copy, FromBytes, Immutable, IntoBytes, KnownLayout, Zeroize)]
pub struct BootHeader {
    pub width_detect: u32,
    pub img_iden: u32,
    pub enc_status: u32,
    pub plm_src_offset: u32,
    pub pmc_data_load_addr: u32,
    pub pmc_data_len: u32,
    pub total_pmc_data_len: u32,
    pub plm_len: u32,
    pub total_plm_len: u32,
    pub img_attrb: u32,
    pub key: [u32; 8],
    pub key_iv: [u32; 3],
    pub secure_hdr_iv: [u32; 3],
    pub puf_shutter: u32,
    pub pmc_data_iv: [u32; 3],
    pub rom_reserved: [u32; 16],
    pub meta_hdr_offset: u32,
    pub puf_image_id: u32,
    pub revocation_id: u32,
    pub fw_reserved: [u32; 13],
    pub puf_chash: u32,
    pub puf_aux: u32,
    pub puf_syn: [u32; 140],
    pub reserved2: [u32; 5],
    pub checksum: u32,
}

impl Default for BootHeader {
    fn default() -> Self {
        Self::new_zeroed()
    }
}

impl BootHeader {
    /// Build a header from raw words
    pub fn from_words(words: &[u32; BOOT_HEADER_WORDS]) -> PlmResult<Self> {
        Self::read_from_bytes(words.as_bytes()).map_err(|_| PlmError::PLM_INTERNAL)
    }

    pub fn img_attrb(&self) -> ImageAttributes {
        ImageAttributes(self.img_attrb)
    }

    pub fn encryption_status(&self) -> PlmResult<EncryptionStatus> {
        EncryptionStatus::try_from(self.enc_status)
    }

    /// Inverted sum of every word but the checksum
    pub fn calc_checksum(&self) -> u32 {
        let bytes = &self.as_bytes()[..offset_of!(BootHeader, checksum)];
        let mut words = [0u32; BOOT_HEADER_WORDS - 1];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        calc_inverted_checksum(&words)
    }

    /// PUF helper data: chash, aux and syndrome
    pub fn puf_helper_data(&self) -> &[u8] {
        &self.as_bytes()[span_of!(BootHeader, puf_chash..=puf_syn)]
    }

    /// Image offset of the configuration data partition in bytes
    pub fn cdo_offset(&self) -> u32 {
        self.plm_src_offset.wrapping_add(self.total_plm_len)
    }

    /// Configuration data partition length in words
    pub fn cdo_len_words(&self) -> u32 {
        self.total_pmc_data_len / 4
    }

    /// Validate the header
    ///
    /// # Arguments
    ///
    /// * `pdi_type` - Partial images carry configuration data only
    pub fn validate(&self, pdi_type: PdiType) -> PlmResult<()> {
        if self.img_iden != BH_IMG_IDEN {
            cprintln!("[ldr] Boot header identification mismatch");
            return Err(PlmError::BH_IMG_IDEN_MISMATCH);
        }
        if self.calc_checksum() != self.checksum {
            cprintln!("[ldr] Boot header checksum mismatch");
            return Err(PlmError::BH_CHECKSUM_MISMATCH);
        }
        self.encryption_status()?;

        if pdi_type == PdiType::Partial {
            if self.plm_len != 0 || self.total_plm_len != 0 {
                return Err(PlmError::BH_PARTIAL_FW_LEN_NONZERO);
            }
            if self.total_pmc_data_len % 4 != 0 {
                return Err(PlmError::BH_DATA_LEN_NOT_WORD_ALIGNED);
            }
            if self.puf_image_id == BH_PUF_IMAGE_ID {
                return Err(PlmError::BH_PUF_IMAGE_UNSUPPORTED);
            }
        }
        Ok(())
    }
}
