/*++

Licensed under the Apache-2.0 license.

File Name:

    full_pdi.rs

Abstract:

    File contains the full image load flow.

--*/

use crate::key_source::select_key_source;
use crate::partition::{finish_load, load_partition, LoadEnv};
use crate::platform::{PartitionType, SecureChunk};
use crate::runtime_config::{RuntimeConfig, SecureState};
use plm_cdo::{CdoContext, PdiType};
use plm_common::{cprintln, report_boot_status, PlmBootStatus};
use plm_error::PlmResult;
use zeroize::Zeroize;

/// Load the full image
///
/// The boot header comes from the ROM; the configuration data partition
/// is then decrypted chunk by chunk and interpreted.
pub fn load_full_pdi(env: &mut LoadEnv) -> PlmResult<()> {
    report_boot_status(env.io, PlmBootStatus::FullPdiInit);
    let result = load(env);
    finish_load(env, PdiType::Full, result)?;
    report_boot_status(env.io, PlmBootStatus::FullPdiDone);
    cprintln!("[ldr] Full PDI loaded");
    Ok(())
}

fn load(env: &mut LoadEnv) -> PlmResult<()> {
    env.platform.rom_boot_header(&mut env.bufs.header)?;
    let hdr = &env.bufs.header;
    hdr.validate(PdiType::Full)?;
    report_boot_status(env.io, PlmBootStatus::FullPdiHeaderValidated);

    let enc_status = hdr.encryption_status()?;
    let attrb = hdr.img_attrb();
    let (cdo_offset, cdo_len) = (hdr.cdo_offset(), hdr.cdo_len_words());
    RuntimeConfig::write_secure_state(
        env.io,
        SecureState {
            authenticated: attrb.is_signed(),
            encrypted: enc_status.is_encrypted(),
        },
    );

    let key_source = select_key_source(env.platform, enc_status)?;
    env.boot.enc_status = enc_status;
    env.boot.key_source = key_source;
    env.boot.puf_mode = attrb.puf_mode();
    report_boot_status(env.io, PlmBootStatus::FullPdiKeySourceSelected);

    let mut chunk = SecureChunk::new(PartitionType::PmcCdo, cdo_offset, cdo_len, key_source);
    let mut cdo = CdoContext::new(PdiType::Full);
    report_boot_status(env.io, PlmBootStatus::FullPdiChunkLoop);
    let result = load_partition(env, &mut cdo, &mut chunk);
    if result.is_err() {
        cprintln!("[ldr] CDO failed at offset {}", cdo.processed_cdo_len);
    }
    cdo.zeroize();
    result
}
