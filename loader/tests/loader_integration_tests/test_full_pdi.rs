// Licensed under the Apache-2.0 license

use crate::helpers::*;
use plm_cdo::encode_header;
use plm_common::memory_layout::{
    AES_KEY_CLEAR, AES_KEY_CLEAR_RED_KEYS_MASK, AES_KEY_ZEROED_STATUS, AES_SOFT_RST,
    AES_SOFT_RST_ASSERT,
};
use plm_common::PlmBootStatus;
use plm_error::PlmError;
use plm_loader::runtime_config::{
    RTCA_AUTH_STATE_IDX, RTCA_CFG_CLEAR_RED_KEYS, RTCA_CFG_FLAGS_IDX, RTCA_ENC_STATE_IDX,
    RTCA_IDENTIFICATION, RTCA_IDENT_IDX, SECURE_STATE_NONSECURE, SECURE_STATE_SECURE,
};
use plm_loader::{EncryptionStatus, KeySource};

#[test]
fn test_full_pdi_runs_cdo_across_chunks() {
    let cdo = cdo_writes(&[
        (0xF100_0010, 0x1111_1111),
        (0xF100_0014, 0x2222_2222),
        (0xF100_0018, 0x3333_3333),
    ]);
    let mut platform = TestPlatform::full(EncryptionStatus::EfuseKey, KeySource::EfuseKey, cdo);
    platform.header = full_header(EncryptionStatus::EfuseKey, ATTRB_SIGNED, platform.full_image.len());
    platform.chunk_words = 5;
    let mut h = Harness::new(platform);

    let (result, ctx) = h.run(|plm| (plm.boot(), *plm.boot_context()));
    assert_eq!(result, Ok(()));
    assert!(ctx.boot_complete);
    assert_eq!(ctx.enc_status, EncryptionStatus::EfuseKey);
    assert_eq!(ctx.key_source, KeySource::EfuseRedKey);
    assert!(!ctx.red_keys_cleared);

    assert_eq!(h.io.reg(0xF100_0010), 0x1111_1111);
    assert_eq!(h.io.reg(0xF100_0014), 0x2222_2222);
    assert_eq!(h.io.reg(0xF100_0018), 0x3333_3333);
    assert_eq!(h.io.boot_status(), u32::from(PlmBootStatus::FullPdiDone));

    // CDO header alone, then the second write split across chunks
    assert_eq!(h.platform.chunk_keys.len(), 3);
    assert!(h
        .platform
        .chunk_keys
        .iter()
        .all(|k| *k == KeySource::EfuseRedKey));
    assert_eq!(h.platform.pulled, [EncryptionStatus::EfuseKey]);
    assert_eq!(
        h.platform
            .trace
            .iter()
            .filter(|t| **t == "apply_runtime_config")
            .count(),
        1
    );

    assert_eq!(h.io.rtca(RTCA_AUTH_STATE_IDX), SECURE_STATE_SECURE);
    assert_eq!(h.io.rtca(RTCA_ENC_STATE_IDX), SECURE_STATE_SECURE);
    assert_eq!(h.io.reg(AES_SOFT_RST), AES_SOFT_RST_ASSERT);
    assert_eq!(h.io.reg(AES_KEY_CLEAR), 0);
}

#[test]
fn test_unencrypted_image_has_no_key_source() {
    let cdo = cdo_writes(&[(0xF100_0010, 0x5)]);
    let mut h = Harness::new(TestPlatform::full(
        EncryptionStatus::None,
        KeySource::EfuseKey,
        cdo,
    ));

    let (result, ctx) = h.run(|plm| (plm.boot(), *plm.boot_context()));
    assert_eq!(result, Ok(()));
    assert_eq!(ctx.key_source, KeySource::None);
    assert!(h.platform.pulled.is_empty());
    assert_eq!(h.io.rtca(RTCA_AUTH_STATE_IDX), SECURE_STATE_NONSECURE);
    assert_eq!(h.io.rtca(RTCA_ENC_STATE_IDX), SECURE_STATE_NONSECURE);
}

#[test]
fn test_encrypted_image_without_key_source() {
    let cdo = cdo_writes(&[(0xF100_0010, 0x5)]);
    let mut h = Harness::new(TestPlatform::full(
        EncryptionStatus::EfuseKey,
        KeySource::None,
        cdo,
    ));

    let result = h.run(|plm| plm.boot());
    assert_eq!(result.map_err(|e| e.base()), Err(PlmError::SEC_KEY_SOURCE_INVALID));
    assert!(h.platform.chunk_keys.is_empty());
}

#[test]
fn test_failure_zeroizes_buffers_and_rtca() {
    let (unknown, _) = encode_header(9, 0, 0);
    let body = [
        encode_header(1, 3, 2).0,
        0xF100_0010,
        0x77,
        unknown,
        encode_header(1, 3, 2).0,
        0xF100_0014,
        0x88,
    ];
    let cdo = cdo_image(&body);
    let mut platform = TestPlatform::full(EncryptionStatus::None, KeySource::None, cdo);
    platform.chunk_words = 64;
    let mut h = Harness::new(platform);

    let (result, ctx) = h.run(|plm| (plm.boot(), *plm.boot_context()));
    let err = result.unwrap_err();
    assert_eq!(err.base(), PlmError::CDO_MODULE_NOT_REGISTERED);
    assert!(err.zeroized());
    assert!(!ctx.boot_complete);

    // Commands before the failure ran, none after it
    assert_eq!(h.io.reg(0xF100_0010), 0x77);
    assert_eq!(h.io.reg(0xF100_0014), 0);

    assert!(h.bufs.chunk.iter().all(|w| *w == 0));
    assert_eq!(h.bufs.header.img_iden, 0);
    assert_eq!(h.io.rtca(RTCA_IDENT_IDX), 0);
    assert_eq!(
        h.io.boot_status(),
        u32::from(PlmBootStatus::SecureBuffersCleared)
    );
    assert_eq!(h.io.reg(AES_SOFT_RST), AES_SOFT_RST_ASSERT);
}

#[test]
fn test_red_keys_cleared_when_requested() {
    let cdo = cdo_writes(&[(rtca_addr(RTCA_CFG_FLAGS_IDX), RTCA_CFG_CLEAR_RED_KEYS)]);
    let mut h = Harness::new(TestPlatform::full(
        EncryptionStatus::EfuseKey,
        KeySource::EfuseKey,
        cdo,
    ));

    let (result, ctx) = h.run(|plm| (plm.boot(), *plm.boot_context()));
    assert_eq!(result, Ok(()));
    assert!(ctx.red_keys_cleared);
    assert_eq!(h.io.reg(AES_KEY_CLEAR), AES_KEY_CLEAR_RED_KEYS_MASK);
}

#[test]
fn test_red_key_clear_timeout() {
    let cdo = cdo_writes(&[(rtca_addr(RTCA_CFG_FLAGS_IDX), RTCA_CFG_CLEAR_RED_KEYS)]);
    let mut h = Harness::new(TestPlatform::full(
        EncryptionStatus::EfuseKey,
        KeySource::EfuseKey,
        cdo,
    ));
    h.io.regs.remove(&AES_KEY_ZEROED_STATUS);

    let (result, ctx) = h.run(|plm| (plm.boot(), *plm.boot_context()));
    assert_eq!(result, Err(PlmError::LDR_AES_KEY_CLEAR_TIMEOUT));
    assert!(!ctx.red_keys_cleared);
    assert!(!ctx.boot_complete);
}

#[test]
fn test_unpopulated_rtca_is_skipped() {
    let cdo = cdo_writes(&[(rtca_addr(RTCA_IDENT_IDX), 0), (0xF100_0010, 0x9)]);
    let mut platform = TestPlatform::full(EncryptionStatus::None, KeySource::None, cdo);
    platform.chunk_words = 64;
    let mut h = Harness::new(platform);

    assert_eq!(h.run(|plm| plm.boot()), Ok(()));
    assert_eq!(h.io.reg(0xF100_0010), 0x9);
    assert!(!h.platform.trace.contains(&"apply_runtime_config"));
}

#[test]
fn test_runtime_config_initialized_on_start() {
    let mut h = Harness::new(TestPlatform::default());
    h.run(|_| ());
    assert_eq!(h.io.rtca(RTCA_IDENT_IDX), RTCA_IDENTIFICATION);
    assert_eq!(h.io.boot_status(), u32::from(PlmBootStatus::PreBootInit));
}

#[test]
fn test_header_identification_mismatch() {
    let cdo = cdo_writes(&[(0xF100_0010, 0x5)]);
    let mut platform = TestPlatform::full(EncryptionStatus::None, KeySource::None, cdo);
    platform.header = patch_header(platform.header, |hdr| hdr.img_iden = 0x1234_5678);
    let mut h = Harness::new(platform);

    let err = h.run(|plm| plm.boot()).unwrap_err();
    assert_eq!(err.base(), PlmError::BH_IMG_IDEN_MISMATCH);
    assert!(err.zeroized());
    assert_eq!(h.io.reg(0xF100_0010), 0);
}

#[test]
fn test_header_checksum_mismatch() {
    let cdo = cdo_writes(&[(0xF100_0010, 0x5)]);
    let mut platform = TestPlatform::full(EncryptionStatus::None, KeySource::None, cdo);
    platform.header.total_plm_len += 4;
    let mut h = Harness::new(platform);

    let err = h.run(|plm| plm.boot()).unwrap_err();
    assert_eq!(err.base(), PlmError::BH_CHECKSUM_MISMATCH);
}

#[test]
fn test_truncated_partition() {
    // Partition ends inside the second write
    let mut cdo = cdo_writes(&[(0xF100_0010, 0x5), (0xF100_0014, 0x6)]);
    cdo.truncate(cdo.len() - 2);
    let mut platform = TestPlatform::full(EncryptionStatus::None, KeySource::None, cdo);
    platform.chunk_words = 64;
    let mut h = Harness::new(platform);

    let err = h.run(|plm| plm.boot()).unwrap_err();
    assert_eq!(err.base(), PlmError::CDO_TRUNCATED_STREAM);
    assert_eq!(h.io.reg(0xF100_0010), 0x5);
}

#[test]
fn test_partition_ends_between_commands() {
    // CDO header still declares the second write and END
    let mut cdo = cdo_writes(&[(0xF100_0010, 0x5), (0xF100_0014, 0x6)]);
    cdo.truncate(cdo.len() - 4);
    let mut platform = TestPlatform::full(EncryptionStatus::None, KeySource::None, cdo);
    platform.chunk_words = 64;
    let mut h = Harness::new(platform);

    let (result, ctx) = h.run(|plm| (plm.boot(), *plm.boot_context()));
    let err = result.unwrap_err();
    assert_eq!(err.base(), PlmError::CDO_TRUNCATED_STREAM);
    assert!(err.zeroized());
    assert!(!ctx.boot_complete);
    assert_eq!(h.io.reg(0xF100_0010), 0x5);
    assert_eq!(h.io.reg(0xF100_0014), 0);
}

#[test]
fn test_cdo_header_split_across_chunks() {
    let cdo = cdo_writes(&[(0xF100_0010, 0x5), (0xF100_0014, 0x6)]);
    let mut platform = TestPlatform::full(EncryptionStatus::None, KeySource::None, cdo);
    platform.chunk_words = 3;
    let mut h = Harness::new(platform);

    assert_eq!(h.run(|plm| plm.boot()), Ok(()));
    assert_eq!(h.io.reg(0xF100_0010), 0x5);
    assert_eq!(h.io.reg(0xF100_0014), 0x6);
    assert_eq!(h.platform.chunk_keys.len(), 4);
}
