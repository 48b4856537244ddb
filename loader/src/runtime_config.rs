/*++

Licensed under the Apache-2.0 license.

File Name:

    runtime_config.rs

Abstract:

    File contains access to the Run-Time Configuration Area (RTCA), the
    reserved region that carries runtime settings and the full image's
    secure state across the full to partial image transition.

--*/

use plm_common::cprintln;
use plm_drivers::memory_layout::{RTCA_BASE, RTCA_SIZE_WORDS};
use plm_drivers::RegisterIo;
use plm_error::{PlmError, PlmResult};
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};
use zeroize::Zeroize;

/// RTCA identification ("RTCA")
pub const RTCA_IDENTIFICATION: u32 = 0x4143_5452;
pub const RTCA_VERSION: u32 = 1;

pub const RTCA_IDENT_IDX: usize = 0;
pub const RTCA_VERSION_IDX: usize = 1;
pub const RTCA_SIZE_IDX: usize = 2;
pub const RTCA_PMC_IRO_FREQ_IDX: usize = 3;
pub const RTCA_OSPI_PHY_CFG_IDX: usize = 4;
pub const RTCA_DBG_LOG_LEVEL_IDX: usize = 5;
pub const RTCA_CFG_FLAGS_IDX: usize = 6;
pub const RTCA_AUTH_STATE_IDX: usize = 7;
pub const RTCA_ENC_STATE_IDX: usize = 8;

/// Clear red keys once a load completes
pub const RTCA_CFG_CLEAR_RED_KEYS: u32 = 1 << 0;

pub const SECURE_STATE_SECURE: u32 = 0xA5A5_A5A5;
pub const SECURE_STATE_NONSECURE: u32 = 0xD2D2_D2D2;

/// Run-Time Configuration Area
#[repr(C)]
#[derive(Clone, Copy, FromBytes, Immutable, IntoBytes, KnownLayout, Zeroize)]
pub struct RuntimeConfig {
    pub identification: u32,
    pub version: u32,
    pub size: u32,
    pub pmc_iro_freq: u32,
    pub ospi_phy_cfg: u32,
    pub dbg_log_level: u32,
    pub cfg_flags: u32,
    pub auth_state: u32,
    pub enc_state: u32,
    pub reserved: [u32; RTCA_SIZE_WORDS - 9],
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new_zeroed()
    }
}

/// Secure state of the full image recorded in the RTCA
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SecureState {
    pub authenticated: bool,
    pub encrypted: bool,
}

fn rtca_addr(idx: usize) -> u64 {
    RTCA_BASE + (idx as u64) * 4
}

fn state_word(secure: bool) -> u32 {
    if secure {
        SECURE_STATE_SECURE
    } else {
        SECURE_STATE_NONSECURE
    }
}

/// Read a secure state word twice and decode it
fn read_state_word(io: &mut dyn RegisterIo, idx: usize) -> PlmResult<bool> {
    let first = io.read32(rtca_addr(idx));
    let second = io.read32(rtca_addr(idx));
    if first != second {
        return Err(PlmError::SEC_SECURE_STATE_GLITCH);
    }
    match first {
        SECURE_STATE_SECURE => Ok(true),
        SECURE_STATE_NONSECURE => Ok(false),
        _ => Err(PlmError::SEC_SECURE_STATE_GLITCH),
    }
}

impl RuntimeConfig {
    /// Initialize the area with its identification and defaults
    pub fn init(io: &mut dyn RegisterIo) {
        for idx in 0..RTCA_SIZE_WORDS {
            io.write32(rtca_addr(idx), 0);
        }
        io.write32(rtca_addr(RTCA_IDENT_IDX), RTCA_IDENTIFICATION);
        io.write32(rtca_addr(RTCA_VERSION_IDX), RTCA_VERSION);
        io.write32(rtca_addr(RTCA_SIZE_IDX), RTCA_SIZE_WORDS as u32);
    }

    /// Read the area
    ///
    /// # Returns
    ///
    /// * `LDR_RTCA_IDENT_MISMATCH` if the area is not populated
    pub fn read(io: &mut dyn RegisterIo) -> PlmResult<Self> {
        if io.read32(rtca_addr(RTCA_IDENT_IDX)) != RTCA_IDENTIFICATION {
            return Err(PlmError::LDR_RTCA_IDENT_MISMATCH);
        }
        let mut words = [0u32; RTCA_SIZE_WORDS];
        for (idx, word) in words.iter_mut().enumerate() {
            *word = io.read32(rtca_addr(idx));
        }
        let rtca = Self::read_from_bytes(words.as_bytes()).map_err(|_| PlmError::PLM_INTERNAL);
        words.zeroize();
        rtca
    }

    pub fn clear_red_keys(&self) -> bool {
        self.cfg_flags & RTCA_CFG_CLEAR_RED_KEYS != 0
    }

    /// Returns true if the area requests red keys be cleared after a load
    pub fn clear_red_keys_requested(io: &mut dyn RegisterIo) -> bool {
        Self::read(io).is_ok_and(|rtca| rtca.clear_red_keys())
    }

    /// Record the secure state of the full image
    pub fn write_secure_state(io: &mut dyn RegisterIo, state: SecureState) {
        io.write32(rtca_addr(RTCA_AUTH_STATE_IDX), state_word(state.authenticated));
        io.write32(rtca_addr(RTCA_ENC_STATE_IDX), state_word(state.encrypted));
    }

    /// Read the recorded secure state, each word sampled twice
    ///
    /// # Returns
    ///
    /// * `SEC_SECURE_STATE_GLITCH` if a word changes between reads or holds
    ///   neither state value
    pub fn read_secure_state(io: &mut dyn RegisterIo) -> PlmResult<SecureState> {
        Ok(SecureState {
            authenticated: read_state_word(io, RTCA_AUTH_STATE_IDX)?,
            encrypted: read_state_word(io, RTCA_ENC_STATE_IDX)?,
        })
    }

    /// Clear the whole area
    ///
    /// # Returns
    ///
    /// * true if every word reads back as zero
    pub fn zeroize_area(io: &mut dyn RegisterIo) -> bool {
        for idx in 0..RTCA_SIZE_WORDS {
            io.write32(rtca_addr(idx), 0);
        }
        let cleared = (0..RTCA_SIZE_WORDS).all(|idx| io.read32(rtca_addr(idx)) == 0);
        if !cleared {
            cprintln!("[ldr] RTCA clear failed");
        }
        cleared
    }
}
