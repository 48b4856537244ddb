// Licensed under the Apache-2.0 license

use crate::helpers::*;
use plm_common::PlmBootStatus;
use plm_error::PlmError;
use plm_loader::boot_header::{BH_PUF_IMAGE_ID, BH_WIDTH_DETECT};
use plm_loader::runtime_config::{RTCA_AUTH_STATE_IDX, RTCA_IDENTIFICATION, RTCA_IDENT_IDX};
use plm_loader::{
    load_partial_pdi, sbi_data_ready_isr, BootContext, BootHeader, EncryptionStatus, KeySource,
    SecureState, SecurityFuses,
};

const PARTIAL_REG: u64 = 0xF100_0040;

fn partial_cdo() -> Vec<u32> {
    cdo_writes(&[(PARTIAL_REG, 0xAB), (PARTIAL_REG + 4, 0xCD)])
}

fn harness(full: SecureState, boot: BootContext, hdr: &BootHeader) -> Harness {
    let mut platform = TestPlatform::default();
    platform.queue_partial(hdr, partial_cdo());
    Harness::after_full_boot(platform, full, boot)
}

fn unencrypted_partial(img_attrb: u32) -> BootHeader {
    partial_header(EncryptionStatus::None, img_attrb, partial_cdo().len())
}

fn encrypted_partial(enc_status: EncryptionStatus, img_attrb: u32) -> BootHeader {
    partial_header(enc_status, img_attrb, partial_cdo().len())
}

/// Full image decrypted with the e-fuse key
fn efuse_boot() -> BootContext {
    BootContext {
        enc_status: EncryptionStatus::EfuseKey,
        key_source: KeySource::EfuseRedKey,
        ..Default::default()
    }
}

fn load_err(h: &mut Harness) -> PlmError {
    let err = load_partial_pdi(&mut h.env()).unwrap_err();
    assert!(err.zeroized());
    assert_eq!(h.io.reg(PARTIAL_REG), 0);
    err.base()
}

#[test]
fn test_partial_pdi_loads_from_sbi() {
    let boot = BootContext {
        puf_mode: 2,
        ..Default::default()
    };
    let mut h = harness(full_state(false, false), boot, &unencrypted_partial(0));

    assert_eq!(load_partial_pdi(&mut h.env()), Ok(true));
    assert_eq!(h.io.reg(PARTIAL_REG), 0xAB);
    assert_eq!(h.io.reg(PARTIAL_REG + 4), 0xCD);
    assert_eq!(h.io.boot_status(), u32::from(PlmBootStatus::PartialPdiDone));
    assert_eq!(h.platform.rom_resets, [2]);
    assert_eq!(h.platform.trace, ["read_hash_block"]);
    assert!(h.platform.sbi.is_empty());
    assert!(h.platform.chunk_keys.iter().all(|k| *k == KeySource::None));
}

#[test]
fn test_empty_fifo() {
    let mut h = Harness::after_full_boot(
        TestPlatform::default(),
        full_state(false, false),
        BootContext::default(),
    );
    assert_eq!(load_partial_pdi(&mut h.env()), Ok(false));
    assert_eq!(h.io.boot_status(), u32::from(PlmBootStatus::AwaitSbiData));

    h.platform.sbi.extend([0x1, 0x2, 0x3]);
    assert_eq!(load_partial_pdi(&mut h.env()), Ok(false));
    assert!(h.platform.sbi.is_empty());
}

#[test]
fn test_fifo_underflow_keeps_rtca() {
    let mut platform = TestPlatform::default();
    platform.sbi.extend([BH_WIDTH_DETECT, 0x1, 0x2, 0x3]);
    let mut h = Harness::after_full_boot(platform, full_state(false, false), BootContext::default());

    assert_eq!(load_err(&mut h), PlmError::LDR_SBI_FIFO_UNDERFLOW);
    assert_eq!(h.io.rtca(RTCA_IDENT_IDX), RTCA_IDENTIFICATION);
    assert_eq!(
        h.io.boot_status(),
        u32::from(PlmBootStatus::SecureBuffersCleared)
    );
}

#[test]
fn test_partial_header_rejects_firmware() {
    let hdr = full_header(EncryptionStatus::None, 0, partial_cdo().len());
    let mut h = harness(full_state(false, false), BootContext::default(), &hdr);
    assert_eq!(load_err(&mut h), PlmError::BH_PARTIAL_FW_LEN_NONZERO);
}

#[test]
fn test_partial_header_rejects_puf_image() {
    let hdr = patch_header(unencrypted_partial(0), |hdr| hdr.puf_image_id = BH_PUF_IMAGE_ID);
    let mut h = harness(full_state(false, false), BootContext::default(), &hdr);
    assert_eq!(load_err(&mut h), PlmError::BH_PUF_IMAGE_UNSUPPORTED);
}

#[test]
fn test_bbram_key_rejected() {
    let hdr = encrypted_partial(EncryptionStatus::BbramKey, 0);
    let mut h = harness(full_state(false, true), efuse_boot(), &hdr);
    assert_eq!(load_err(&mut h), PlmError::SEC_PARTIAL_ENC_STATUS_NOT_ALLOWED);
}

#[test]
fn test_family_key_rejected_after_red_key_clear() {
    let hdr = encrypted_partial(EncryptionStatus::EfuseFamilyKek, 0);
    let boot = BootContext {
        red_keys_cleared: true,
        ..efuse_boot()
    };
    let mut h = harness(full_state(false, true), boot, &hdr);
    assert_eq!(load_err(&mut h), PlmError::SEC_FAMILY_KEY_RED_KEYS_CLEARED);
}

#[test]
fn test_dec_only_requires_efuse_puf_kek() {
    let mut h = harness(
        full_state(false, false),
        BootContext::default(),
        &unencrypted_partial(0),
    );
    h.platform.fuses = SecurityFuses::DEC_ONLY;
    assert_eq!(
        load_err(&mut h),
        PlmError::SEC_DEC_ONLY_REQUIRES_EFUSE_PUF_KEK
    );
}

#[test]
fn test_auth_enforced_requires_signed_image() {
    let mut h = harness(
        full_state(true, false),
        BootContext::default(),
        &unencrypted_partial(0),
    );
    h.platform.fuses = SecurityFuses::AUTH_ENFORCED;
    assert_eq!(load_err(&mut h), PlmError::SEC_AUTH_REQUIRED);
}

#[test]
fn test_signed_partial_is_authenticated() {
    let mut h = harness(
        full_state(true, false),
        BootContext::default(),
        &unencrypted_partial(ATTRB_SIGNED),
    );
    h.platform.fuses = SecurityFuses::AUTH_ENFORCED;
    assert_eq!(load_partial_pdi(&mut h.env()), Ok(true));
    assert_eq!(h.platform.trace, ["authenticate_hash_block"]);
}

#[test]
fn test_unsigned_partial_after_authenticated_boot() {
    let mut h = harness(
        full_state(true, false),
        BootContext::default(),
        &unencrypted_partial(0),
    );
    assert_eq!(load_err(&mut h), PlmError::SEC_AUTH_STATE_MISMATCH);
}

#[test]
fn test_unsigned_partial_encryption_mismatch() {
    let mut h = harness(full_state(false, true), efuse_boot(), &unencrypted_partial(0));
    assert_eq!(load_err(&mut h), PlmError::SEC_ENC_STATE_MISMATCH);
}

#[test]
fn test_secure_state_glitch() {
    let mut h = harness(
        full_state(false, false),
        BootContext::default(),
        &unencrypted_partial(0),
    );
    h.io.regs.insert(rtca_addr(RTCA_AUTH_STATE_IDX), 0x1234_5678);
    assert_eq!(load_err(&mut h), PlmError::SEC_SECURE_STATE_GLITCH);
}

#[test]
fn test_key_source_reused_from_full_image() {
    let hdr = encrypted_partial(EncryptionStatus::EfuseKey, 0);
    let mut h = harness(full_state(false, true), efuse_boot(), &hdr);
    h.platform.key_source = KeySource::BhKey;

    assert_eq!(load_partial_pdi(&mut h.env()), Ok(true));
    assert!(h.platform.pulled.is_empty());
    assert!(h
        .platform
        .chunk_keys
        .iter()
        .all(|k| *k == KeySource::EfuseRedKey));
    assert_eq!(h.platform.trace, ["read_hash_block", "verify_hash_block_tag"]);
}

#[test]
fn test_key_source_pulled_after_red_key_clear() {
    let hdr = encrypted_partial(EncryptionStatus::EfuseKey, 0);
    let boot = BootContext {
        red_keys_cleared: true,
        ..efuse_boot()
    };
    let mut h = harness(full_state(false, true), boot, &hdr);
    h.platform.key_source = KeySource::EfuseKey;

    assert_eq!(load_partial_pdi(&mut h.env()), Ok(true));
    assert_eq!(h.platform.pulled, [EncryptionStatus::EfuseKey]);
    assert!(h
        .platform
        .chunk_keys
        .iter()
        .all(|k| *k == KeySource::EfuseRedKey));
}

#[test]
fn test_key_source_pulled_for_new_encryption_status() {
    let hdr = encrypted_partial(EncryptionStatus::BhFamilyKek, 0);
    let mut h = harness(full_state(false, true), efuse_boot(), &hdr);
    h.platform.key_source = KeySource::FamilyKey;

    assert_eq!(load_partial_pdi(&mut h.env()), Ok(true));
    assert_eq!(h.platform.pulled, [EncryptionStatus::BhFamilyKek]);
    assert!(h
        .platform
        .chunk_keys
        .iter()
        .all(|k| *k == KeySource::FamilyKey));
}

#[test]
fn test_puf_disabled() {
    let hdr = encrypted_partial(EncryptionStatus::BhPufKek, 0);
    let mut h = harness(full_state(false, true), efuse_boot(), &hdr);
    h.platform.fuses = SecurityFuses::PUF_DISABLE;
    h.platform.key_source = KeySource::PufKey;
    assert_eq!(load_err(&mut h), PlmError::SEC_PUF_DISABLED);
}

#[test]
fn test_puf_helper_data_digest() {
    let hdr = encrypted_partial(EncryptionStatus::BhPufKek, ATTRB_PUF_BH);
    let mut h = harness(full_state(false, true), efuse_boot(), &hdr);
    h.platform.key_source = KeySource::PufKey;
    h.platform.puf_digest = [0x11; 12];
    h.platform.efuse_puf_hash = [0x22; 12];
    assert_eq!(load_err(&mut h), PlmError::SEC_PUF_HD_DIGEST_MISMATCH);

    let mut h = harness(full_state(false, true), efuse_boot(), &hdr);
    h.platform.key_source = KeySource::PufKey;
    h.platform.puf_digest = [0x22; 12];
    h.platform.efuse_puf_hash = [0x22; 12];
    assert_eq!(load_partial_pdi(&mut h.env()), Ok(true));
    assert!(h.platform.chunk_keys.iter().all(|k| *k == KeySource::PufKey));
}

#[test]
fn test_revocation() {
    let hdr = patch_header(unencrypted_partial(0), |hdr| hdr.revocation_id = 5);
    let mut h = harness(full_state(false, false), BootContext::default(), &hdr);
    h.platform.revoked = vec![5];
    assert_eq!(load_err(&mut h), PlmError::SEC_REVOCATION_ID_REVOKED);
    assert_eq!(h.bufs.header.revocation_id, 0);

    let hdr = patch_header(unencrypted_partial(0), |hdr| hdr.revocation_id = 0x100);
    let mut h = harness(full_state(false, false), BootContext::default(), &hdr);
    assert_eq!(load_err(&mut h), PlmError::SEC_REVOCATION_ID_INVALID);
}

#[test]
fn test_sbi_interrupt_starts_partial_load() {
    let cdo = cdo_writes(&[(0xF100_0010, 0x1)]);
    let mut platform = TestPlatform::full(EncryptionStatus::None, KeySource::None, cdo);
    platform.queue_partial(&unencrypted_partial(0), partial_cdo());
    let mut h = Harness::new(platform);
    sbi_data_ready_isr(&h.events);

    let (result, idle) = h.run(|plm| {
        let result = plm.boot().and_then(|_| plm.process_events());
        (result, plm.process_events())
    });
    assert_eq!(result, Ok(()));
    assert_eq!(idle, Ok(()));
    assert_eq!(h.io.reg(0xF100_0010), 0x1);
    assert_eq!(h.io.reg(PARTIAL_REG), 0xAB);
    assert_eq!(
        h.platform.trace,
        [
            "apply_runtime_config",
            "disable_interrupts",
            "sbi_clear_irq",
            "sbi_rearm_irq",
            "enable_interrupts",
            "read_hash_block",
        ]
    );
}
