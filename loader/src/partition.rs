/*++

Licensed under the Apache-2.0 license.

File Name:

    partition.rs

Abstract:

    File contains the secure chunk loop shared by full and partial
    image loads, along with failure zeroization and crypto reset.

--*/

use crate::boot_header::{BootHeader, EncryptionStatus};
use crate::key_source::KeySource;
use crate::platform::{HashBlock, SecureBootPlatform, SecureChunk};
use crate::runtime_config::RuntimeConfig;
use plm_cdo::{CdoContext, CmdEnv, CommandRegistry, PdiType};
use plm_common::memory_layout::{
    AES_KEY_CLEAR, AES_KEY_CLEAR_RED_KEYS_MASK, AES_KEY_CLEAR_TIMEOUT_US, AES_KEY_ZEROED_RED_KEYS_MASK,
    AES_KEY_ZEROED_STATUS, AES_SOFT_RST, AES_SOFT_RST_ASSERT,
};
use plm_common::{cprintln, report_boot_status, PlmBootStatus};
use plm_drivers::printer::HexWords;
use plm_drivers::wait::poll_for_mask;
use plm_drivers::{report_fw_error, DmaEngine, RegisterIo};
use plm_error::{PlmError, PlmResult};
use zerocopy::IntoBytes;
use zeroize::Zeroize;

/// Words in one secure chunk
pub const SECURE_CHUNK_WORDS: usize = 8192;

/// Buffers holding sensitive material during a load
#[derive(Zeroize)]
pub struct LoadBuffers {
    pub chunk: [u32; SECURE_CHUNK_WORDS],
    pub header: BootHeader,
    pub hash_block: HashBlock,
}

impl Default for LoadBuffers {
    fn default() -> Self {
        Self {
            chunk: [0; SECURE_CHUNK_WORDS],
            header: BootHeader::default(),
            hash_block: HashBlock::default(),
        }
    }
}

impl LoadBuffers {
    /// Clear every buffer
    ///
    /// # Returns
    ///
    /// * true if every byte reads back as zero
    pub fn clear(&mut self) -> bool {
        self.zeroize();
        self.chunk.iter().all(|w| *w == 0)
            && self.header.as_bytes().iter().all(|b| *b == 0)
            && self.hash_block.as_bytes().iter().all(|b| *b == 0)
    }
}

/// Security context carried from the full image to later partial images
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BootContext {
    /// Encryption status of the full image
    pub enc_status: EncryptionStatus,

    /// Key source the full image was decrypted with
    pub key_source: KeySource,

    /// PUF mode of the full image
    pub puf_mode: u32,

    /// Red keys were cleared after a load
    pub red_keys_cleared: bool,

    /// The full image finished loading
    pub boot_complete: bool,
}

/// Collaborators and state used by a load
pub struct LoadEnv<'a> {
    pub registry: &'a CommandRegistry,
    pub io: &'a mut dyn RegisterIo,
    pub dma: &'a mut dyn DmaEngine,
    pub platform: &'a mut dyn SecureBootPlatform,
    pub bufs: &'a mut LoadBuffers,
    pub boot: &'a mut BootContext,
}

/// Feed the secure chunks of a partition to the CDO interpreter
///
/// Runs until the stream reports END, its declared length is consumed or
/// the partition has no chunks left. For a full image the runtime
/// configuration is applied after the first chunk.
pub fn load_partition(
    env: &mut LoadEnv,
    cdo: &mut CdoContext,
    chunk: &mut SecureChunk,
) -> PlmResult<()> {
    let mut first = true;
    while !cdo.is_done() && chunk.remaining_len > 0 {
        let words = env.platform.next_secure_chunk(chunk, &mut env.bufs.chunk)?;
        if words == 0 || words > SECURE_CHUNK_WORDS {
            cprintln!("[ldr] Invalid chunk length {}", words);
            return Err(PlmError::LDR_INVALID_CHUNK_LEN);
        }

        let mut cmd_env = CmdEnv {
            io: &mut *env.io,
            dma: &mut *env.dma,
        };
        cdo.process_chunk(env.registry, &mut cmd_env, &env.bufs.chunk[..words])?;

        if first && cdo.pdi_type == PdiType::Full {
            apply_runtime_config(env)?;
        }
        first = false;
    }
    cdo.finish()
}

fn apply_runtime_config(env: &mut LoadEnv) -> PlmResult<()> {
    match RuntimeConfig::read(env.io) {
        Ok(mut rtca) => {
            let result = env.platform.apply_runtime_config(&rtca);
            rtca.zeroize();
            result?;
            report_boot_status(env.io, PlmBootStatus::FullPdiRuntimeConfigApplied);
            Ok(())
        }
        Err(PlmError::LDR_RTCA_IDENT_MISMATCH) => {
            cprintln!("[ldr] RTCA not populated, keeping defaults");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

/// Complete a load: zeroize on failure and always reset the crypto engines
///
/// # Arguments
///
/// * `env`      - Load environment
/// * `pdi_type` - Full image failures also clear the RTCA
/// * `result`   - Outcome of the load
///
/// # Returns
///
/// * The load error with its zeroization status, or the crypto reset error
pub fn finish_load(env: &mut LoadEnv, pdi_type: PdiType, result: PlmResult<()>) -> PlmResult<()> {
    let clear_red_keys = RuntimeConfig::clear_red_keys_requested(env.io);
    let result = result.map_err(|err| zeroize_on_failure(env, pdi_type, err));
    let reset = reset_crypto(env, clear_red_keys);
    result.and(reset)
}

fn zeroize_on_failure(env: &mut LoadEnv, pdi_type: PdiType, err: PlmError) -> PlmError {
    report_boot_status(env.io, PlmBootStatus::LoadFailed);
    let mut cleared = env.bufs.clear();
    if pdi_type == PdiType::Full {
        cleared &= RuntimeConfig::zeroize_area(env.io);
    }
    let err = err.with_zeroize_status(cleared);
    if cleared {
        report_boot_status(env.io, PlmBootStatus::SecureBuffersCleared);
    } else {
        report_boot_status(env.io, PlmBootStatus::SecureBuffersClearFailed);
        report_fw_error(env.io, PlmError::LDR_ZEROIZE_FAILED.into());
    }
    cprintln!("[ldr] Load failed 0x{}", HexWords(&[u32::from(err)]));
    err
}

/// Reset the AES engine and, when requested, clear the red keys
pub fn reset_crypto(env: &mut LoadEnv, clear_red_keys: bool) -> PlmResult<()> {
    env.io.write32(AES_SOFT_RST, AES_SOFT_RST_ASSERT);
    if !clear_red_keys {
        return Ok(());
    }
    env.io.write32(AES_KEY_CLEAR, AES_KEY_CLEAR_RED_KEYS_MASK);
    poll_for_mask(
        env.io,
        AES_KEY_ZEROED_STATUS,
        AES_KEY_ZEROED_RED_KEYS_MASK,
        AES_KEY_ZEROED_RED_KEYS_MASK,
        AES_KEY_CLEAR_TIMEOUT_US,
    )
    .map_err(|_| PlmError::LDR_AES_KEY_CLEAR_TIMEOUT)?;
    env.boot.red_keys_cleared = true;
    cprintln!("[ldr] Red keys cleared");
    Ok(())
}
