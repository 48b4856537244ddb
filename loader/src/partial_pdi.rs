/*++

Licensed under the Apache-2.0 license.

File Name:

    partial_pdi.rs

Abstract:

    File contains the partial image load flow started by the SBI data
    ready interrupt, including the key and security policy a partial
    image must satisfy before any of its data is trusted.

--*/

use crate::boot_header::{
    BootHeader, EncryptionStatus, BH_PUF_MODE_BOOT_HEADER, BH_WIDTH_DETECT, BOOT_HEADER_WORDS,
};
use crate::key_source::{select_key_source, KeySource};
use crate::partition::{finish_load, load_partition, LoadEnv};
use crate::platform::{PartitionType, SecureChunk, SecurityFuses};
use crate::runtime_config::RuntimeConfig;
use plm_cdo::{CdoContext, PdiType};
use plm_common::{cprintln, report_boot_status, PlmBootStatus};
use plm_error::{PlmError, PlmResult};
use zeroize::Zeroize;

/// Largest revocation id the e-fuses can record
pub const MAX_REVOCATION_ID: u32 = 0xFF;

/// Load a partial image waiting in the SBI FIFO
///
/// # Returns
///
/// * `false` when the FIFO drained before a width detection word was seen
pub fn load_partial_pdi(env: &mut LoadEnv) -> PlmResult<bool> {
    report_boot_status(env.io, PlmBootStatus::AwaitSbiData);
    if !sync_to_width_detect(env) {
        cprintln!("[partial] No boot header in SBI FIFO");
        return Ok(false);
    }

    report_boot_status(env.io, PlmBootStatus::PartialPdiInit);
    let result = load(env);
    finish_load(env, PdiType::Partial, result)?;
    report_boot_status(env.io, PlmBootStatus::PartialPdiDone);
    cprintln!("[partial] Partial PDI loaded");
    Ok(true)
}

/// Discard FIFO words up to and including the width detection word
fn sync_to_width_detect(env: &mut LoadEnv) -> bool {
    while let Some(word) = env.platform.sbi_read_word() {
        if word == BH_WIDTH_DETECT {
            return true;
        }
    }
    false
}

fn load(env: &mut LoadEnv) -> PlmResult<()> {
    env.bufs.zeroize();
    env.platform.reset_rom_state(env.boot.puf_mode);

    let mut words = [0u32; BOOT_HEADER_WORDS];
    words[0] = BH_WIDTH_DETECT;
    let read = env.platform.read_sbi_words(&mut words[1..]);
    let hdr = read.and_then(|_| BootHeader::from_words(&words));
    words.zeroize();
    env.bufs.header = hdr?;

    let hdr = &env.bufs.header;
    hdr.validate(PdiType::Partial)?;
    report_boot_status(env.io, PlmBootStatus::PartialPdiHeaderValidated);

    let enc_status = hdr.encryption_status()?;
    let (cdo_offset, cdo_len) = (hdr.cdo_offset(), hdr.cdo_len_words());
    check_security_policy(env, enc_status)?;
    let key_source = partial_key_source(env, enc_status)?;
    report_boot_status(env.io, PlmBootStatus::PartialPdiKeySourceSelected);

    validate_hash_block(env, enc_status)?;
    check_revocation(env)?;
    report_boot_status(env.io, PlmBootStatus::PartialPdiHashBlockValidated);

    let mut chunk = SecureChunk::new(PartitionType::PlCdo, cdo_offset, cdo_len, key_source);
    let mut cdo = CdoContext::new(PdiType::Partial);
    report_boot_status(env.io, PlmBootStatus::PartialPdiChunkLoop);
    let result = load_partition(env, &mut cdo, &mut chunk);
    if result.is_err() {
        cprintln!("[partial] CDO failed at offset {}", cdo.processed_cdo_len);
    }
    cdo.zeroize();
    result
}

/// Checks a partial image must pass before its key source is chosen
///
/// # Arguments
///
/// * `env`        - Load environment, header already validated
/// * `enc_status` - Encryption status declared by the header
pub fn check_security_policy(env: &mut LoadEnv, enc_status: EncryptionStatus) -> PlmResult<()> {
    let fuses = env.platform.security_fuses();
    let signed = env.bufs.header.img_attrb().is_signed();

    if enc_status.uses_bbram() {
        cprintln!("[partial] BBRAM key sources are not accepted");
        return Err(PlmError::SEC_PARTIAL_ENC_STATUS_NOT_ALLOWED);
    }
    if enc_status.uses_family_key() && env.boot.red_keys_cleared {
        return Err(PlmError::SEC_FAMILY_KEY_RED_KEYS_CLEARED);
    }
    if fuses.contains(SecurityFuses::DEC_ONLY) && enc_status != EncryptionStatus::EfusePufKek {
        return Err(PlmError::SEC_DEC_ONLY_REQUIRES_EFUSE_PUF_KEK);
    }
    if fuses.contains(SecurityFuses::AUTH_ENFORCED) && !signed {
        return Err(PlmError::SEC_AUTH_REQUIRED);
    }

    let state = RuntimeConfig::read_secure_state(env.io)?;
    if !signed {
        if state.authenticated {
            return Err(PlmError::SEC_AUTH_STATE_MISMATCH);
        }
        if state.encrypted != enc_status.is_encrypted() {
            return Err(PlmError::SEC_ENC_STATE_MISMATCH);
        }
    }
    Ok(())
}

/// Key source of a partial image
///
/// The full image's key source is reused unless the encryption status
/// changed or the red keys were cleared, in which case the ROM derives it
/// again.
pub fn partial_key_source(
    env: &mut LoadEnv,
    enc_status: EncryptionStatus,
) -> PlmResult<KeySource> {
    if enc_status == env.boot.enc_status && !env.boot.red_keys_cleared {
        return Ok(env.boot.key_source);
    }

    if enc_status.uses_puf() {
        if env
            .platform
            .security_fuses()
            .contains(SecurityFuses::PUF_DISABLE)
        {
            return Err(PlmError::SEC_PUF_DISABLED);
        }
        if env.bufs.header.img_attrb().puf_mode() == BH_PUF_MODE_BOOT_HEADER {
            let mut digest = env.platform.puf_hd_digest(&env.bufs.header);
            let mut expected = env.platform.efuse_puf_hd_hash();
            let matched = digest == expected;
            digest.zeroize();
            expected.zeroize();
            if !matched {
                return Err(PlmError::SEC_PUF_HD_DIGEST_MISMATCH);
            }
        }
    }
    select_key_source(env.platform, enc_status)
}

fn validate_hash_block(env: &mut LoadEnv, enc_status: EncryptionStatus) -> PlmResult<()> {
    if env
        .platform
        .security_fuses()
        .contains(SecurityFuses::AUTH_ENFORCED)
    {
        return env
            .platform
            .authenticate_hash_block(&env.bufs.header, &mut env.bufs.hash_block);
    }
    env.platform.read_hash_block(&mut env.bufs.hash_block)?;
    if enc_status.is_encrypted() {
        env.platform
            .verify_hash_block_tag(&env.bufs.header, &env.bufs.hash_block)?;
    }
    Ok(())
}

fn check_revocation(env: &mut LoadEnv) -> PlmResult<()> {
    let id = env.bufs.header.revocation_id;
    if id > MAX_REVOCATION_ID {
        return Err(PlmError::SEC_REVOCATION_ID_INVALID);
    }
    if env.platform.is_revoked(id) {
        cprintln!("[partial] Revocation id {} revoked", id);
        return Err(PlmError::SEC_REVOCATION_ID_REVOKED);
    }
    Ok(())
}
