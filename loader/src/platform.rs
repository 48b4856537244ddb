/*++

Licensed under the Apache-2.0 license.

File Name:

    platform.rs

Abstract:

    File contains the secure boot platform seam. The ROM resident
    services (key unwrap, secure chunk decryption and authentication,
    hash block checks) and the boot interface are reached through it.

--*/

use crate::boot_header::{BootHeader, EncryptionStatus};
use crate::key_source::KeySource;
use crate::runtime_config::RuntimeConfig;
use plm_drivers::PlmAddr;
use plm_error::PlmResult;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};
use zeroize::Zeroize;

/// SHA3-384 digest words
pub const DIGEST_WORDS: usize = 12;

/// Chunk digests carried by one hash block
pub const HASH_BLOCK_ENTRIES: usize = 32;

pub type Digest = [u32; DIGEST_WORDS];

bitflags::bitflags! {
    /// Security e-fuses consulted by the loader.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct SecurityFuses: u32 {
        /// PUF use is disabled
        const PUF_DISABLE = 1 << 0;
        /// Only the e-fuse PUF-KEK may decrypt images
        const DEC_ONLY = 1 << 1;
        /// Images must be authenticated
        const AUTH_ENFORCED = 1 << 2;
        /// Tamper response is secure lockdown
        const SECURE_LOCKDOWN = 1 << 3;
    }
}

/// Boot interface selected by the mode pins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootMode {
    Jtag,
    Qspi24,
    Qspi32,
    Sd0,
    Sd1,
    Emmc,
    Usb,
    Ospi,
    Smap,
    Sbi,
}

/// Partition whose chunks are being decrypted
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PartitionType {
    #[default]
    PmcCdo,
    LpdCdo,
    FpdCdo,
    PlCdo,
}

/// Cursor over the secure chunks of one partition.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SecureChunk {
    pub partition_type: PartitionType,

    /// Boot device offset of the next chunk in bytes
    pub src_offset: u32,

    /// Scratch address the chunk is decrypted through
    pub dest_addr: PlmAddr,

    /// Partition words not yet delivered
    pub remaining_len: u32,

    pub key_source: KeySource,

    /// Sequence number of the next chunk
    pub seq: u32,
}

impl SecureChunk {
    pub fn new(
        partition_type: PartitionType,
        src_offset: u32,
        len_words: u32,
        key_source: KeySource,
    ) -> Self {
        Self {
            partition_type,
            src_offset,
            remaining_len: len_words,
            key_source,
            ..Default::default()
        }
    }

    /// Account for a delivered chunk of `words` words
    pub fn advance(&mut self, words: u32) {
        self.src_offset = self.src_offset.wrapping_add(words * 4);
        self.remaining_len = self.remaining_len.saturating_sub(words);
        self.seq += 1;
    }
}

/// Chunk digests of a partial image
#[repr(C)]
#[derive(Clone, Copy, FromBytes, Immutable, IntoBytes, KnownLayout, Zeroize)]
pub struct HashBlock {
    pub chunk_count: u32,
    pub digests: [Digest; HASH_BLOCK_ENTRIES],
}

impl Default for HashBlock {
    fn default() -> Self {
        Self {
            chunk_count: 0,
            digests: [[0; DIGEST_WORDS]; HASH_BLOCK_ENTRIES],
        }
    }
}

/// Secure boot platform
///
/// Implemented over the boot ROM services on hardware and by mocks in tests.
pub trait SecureBootPlatform {
    /// Copy of the boot header the ROM validated for the full image
    fn rom_boot_header(&mut self, hdr: &mut BootHeader) -> PlmResult<()>;

    /// Key source the ROM derives for `enc_status`
    fn pull_key_source(&mut self, enc_status: EncryptionStatus) -> PlmResult<KeySource>;

    /// Decrypt and authenticate the next chunk of a partition into `buf`,
    /// advancing `chunk` past it
    ///
    /// # Returns
    ///
    /// * Plaintext words written to `buf`
    fn next_secure_chunk(&mut self, chunk: &mut SecureChunk, buf: &mut [u32]) -> PlmResult<usize>;

    /// Security e-fuses
    fn security_fuses(&mut self) -> SecurityFuses;

    /// PUF helper data hash programmed in e-fuses
    fn efuse_puf_hd_hash(&mut self) -> Digest;

    /// Digest of the PUF helper data in `hdr`
    fn puf_hd_digest(&mut self, hdr: &BootHeader) -> Digest;

    /// Returns true if the revocation id has been revoked in e-fuses
    fn is_revoked(&mut self, revocation_id: u32) -> bool;

    /// Read and authenticate the hash block of a signed image
    fn authenticate_hash_block(&mut self, hdr: &BootHeader, hb: &mut HashBlock) -> PlmResult<()>;

    /// Read the hash block of an unsigned image
    fn read_hash_block(&mut self, hb: &mut HashBlock) -> PlmResult<()>;

    /// Check the GCM tag of the hash block of an encrypted image
    fn verify_hash_block_tag(&mut self, hdr: &BootHeader, hb: &HashBlock) -> PlmResult<()>;

    /// Apply clock and PHY settings from the runtime configuration area
    fn apply_runtime_config(&mut self, rtca: &RuntimeConfig) -> PlmResult<()>;

    /// Reset the ROM secure state, keeping only the PUF mode
    fn reset_rom_state(&mut self, puf_mode: u32);

    fn boot_mode(&mut self) -> BootMode;

    /// Images the multiboot register can select on the boot device
    fn multiboot_limit(&mut self) -> u32;

    /// Pop one word from the SBI FIFO, `None` when it is empty
    fn sbi_read_word(&mut self) -> Option<u32>;

    /// Read `buf.len()` words from the SBI FIFO
    fn read_sbi_words(&mut self, buf: &mut [u32]) -> PlmResult<()>;

    fn disable_interrupts(&mut self);

    fn enable_interrupts(&mut self);

    /// Acknowledge the SBI data ready interrupt
    fn sbi_clear_irq(&mut self);

    /// Re-enable the SBI data ready interrupt
    fn sbi_rearm_irq(&mut self);

    /// Sleep until an interrupt arrives
    fn wait_for_event(&mut self);

    fn secure_lockdown(&mut self) -> !;

    /// Reset into the image selected by the multiboot register
    fn fallback_reset(&mut self) -> !;

    fn halt(&mut self) -> !;
}
