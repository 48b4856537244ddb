// Licensed under the Apache-2.0 license

use crate::helpers::{run_cdo, CdoBuilder, TestIo};
use plm_cdo::generic::*;
use plm_drivers::DmaFlags;
use plm_error::PlmError;

#[test]
fn test_mask_poll_succeeds_when_condition_met() {
    let mut io = TestIo::default();
    io.regs.insert(0xF100_0030, 0x0000_0103);
    let cdo = CdoBuilder::new()
        .cmd(GENERIC_MASK_POLL, &[0xF100_0030, 0x0000_0100, 0x0000_0100, 1000])
        .end()
        .build();
    let run = run_cdo(&cdo, &[], io);
    assert_eq!(run.result, Ok(()));
    assert_eq!(run.io.delay_us, 0);
}

#[test]
fn test_mask_poll_timeout_policies() {
    let poll = |extra: &[u32]| {
        let mut payload = vec![0xF100_0030, 1, 1, 20];
        payload.extend_from_slice(extra);
        let cdo = CdoBuilder::new()
            .cmd(GENERIC_MASK_POLL, &payload)
            .end()
            .build();
        run_cdo(&cdo, &[], TestIo::default())
    };

    let run = poll(&[]);
    assert_eq!(run.io.delay_us, 20);
    assert_eq!(
        run.result.unwrap_err().cdo_command_code().map(|c| c & 0xF),
        Some(u32::from(PlmError::GENERIC_MASK_POLL_TIMEOUT) & 0xF)
    );

    let run = poll(&[0, 0x7]);
    assert_eq!(
        run.result.unwrap_err().cdo_command_code().map(|c| c & 0xF),
        Some(0x7)
    );

    let run = poll(&[1]);
    assert_eq!(run.result, Ok(()));
    assert!(!run.ctx.deferred_error);

    let run = poll(&[2]);
    assert_eq!(run.result, Ok(()));
    assert!(run.ctx.deferred_error);
}

#[test]
fn test_mask_poll64() {
    let mut io = TestIo::default();
    io.regs.insert(0x1_0000_0040, 0x8000_0000);
    let cdo = CdoBuilder::new()
        .cmd(GENERIC_MASK_POLL64, &[0x1, 0x40, 0x8000_0000, 0x8000_0000, 10])
        .cmd(GENERIC_MASK_WRITE64, &[0x1, 0x44, 0xFF, 0x12])
        .end()
        .build();
    let run = run_cdo(&cdo, &[], io);
    assert_eq!(run.result, Ok(()));
    assert_eq!(run.io.writes, vec![(0x1_0000_0044, 0x12)]);
}

#[test]
fn test_delay() {
    let cdo = CdoBuilder::new()
        .cmd(GENERIC_DELAY, &[150])
        .cmd(GENERIC_DELAY, &[50])
        .end()
        .build();
    let run = run_cdo(&cdo, &[], TestIo::default());
    assert_eq!(run.result, Ok(()));
    assert_eq!(run.io.delay_us, 200);
}

#[test]
fn test_set_uses_bursts() {
    let cdo = CdoBuilder::new()
        .cmd(GENERIC_SET, &[0, 0xF700_0000, 40, 0xDEAD_BEEF])
        .end()
        .build();
    let run = run_cdo(&cdo, &[], TestIo::default());
    assert_eq!(run.result, Ok(()));
    assert_eq!(run.dma.writes.len(), 2);
    assert_eq!(run.dma.writes[0].0, 0xF700_0000);
    assert_eq!(run.dma.writes[0].1.len(), SET_BURST_WORDS);
    assert_eq!(run.dma.writes[1].0, 0xF700_0000 + 4 * SET_BURST_WORDS as u64);
    assert_eq!(run.dma.writes[1].1, vec![0xDEAD_BEEF; 8]);
}

#[test]
fn test_keyhole_wraps() {
    let mut payload = vec![0, 0xF600_0000, 16];
    payload.extend(0..10);
    let cdo = CdoBuilder::new()
        .cmd(GENERIC_DMA_WRITE_KEYHOLE, &payload)
        .end()
        .build();
    for splits in [vec![], vec![14], vec![9, 11, 16]] {
        let run = run_cdo(&cdo, &splits, TestIo::default());
        assert_eq!(run.result, Ok(()), "splits {splits:?}");
        let mem = run.dma.memory();
        assert_eq!(mem.len(), 4);
        assert_eq!(mem[&0xF600_0000], 8);
        assert_eq!(mem[&0xF600_0004], 9);
        assert_eq!(mem[&0xF600_0008], 6);
        assert_eq!(mem[&0xF600_000C], 7);
    }
}

#[test]
fn test_keyhole_invalid_size() {
    let cdo = CdoBuilder::new()
        .cmd(GENERIC_DMA_WRITE_KEYHOLE, &[0, 0xF600_0000, 6, 1, 2])
        .end()
        .build();
    let run = run_cdo(&cdo, &[], TestIo::default());
    assert_eq!(
        run.result.unwrap_err().cdo_command_code().map(|c| c & 0xF),
        Some(u32::from(PlmError::GENERIC_INVALID_KEYHOLE_SIZE) & 0xF)
    );
    assert!(run.dma.writes.is_empty());
}

#[test]
fn test_dma_write_across_chunks() {
    let mut payload = vec![0x2, 0x0000_1000];
    payload.extend(100..120);
    let cdo = CdoBuilder::new()
        .cmd(GENERIC_DMA_WRITE, &payload)
        .end()
        .build();
    let run = run_cdo(&cdo, &[12, 20], TestIo::default());
    assert_eq!(run.result, Ok(()));
    let mem = run.dma.memory();
    assert_eq!(mem.len(), 20);
    for i in 0..20u64 {
        assert_eq!(mem[&(0x2_0000_1000 + 4 * i)], 100 + i as u32);
    }
}

#[test]
fn test_dma_xfer() {
    let cdo = CdoBuilder::new()
        .cmd(GENERIC_DMA_XFER, &[0, 0xF200_0000, 1, 0x0, 64, 1 << 16])
        .end()
        .build();
    let run = run_cdo(&cdo, &[], TestIo::default());
    assert_eq!(run.result, Ok(()));
    assert_eq!(
        run.dma.xfers,
        vec![(0xF200_0000, 0x1_0000_0000, 64, DmaFlags::DST_FIXED)]
    );
}

#[test]
fn test_logging_commands_touch_no_registers() {
    let cdo = CdoBuilder::new()
        .cmd(GENERIC_LOG_STRING, &crate::helpers::words_of("hello"))
        .cmd(GENERIC_MARKER, &[0x64, 0x6B72_616D])
        .cmd(GENERIC_NOP, &[1, 2, 3])
        .end()
        .build();
    let run = run_cdo(&cdo, &[], TestIo::default());
    assert_eq!(run.result, Ok(()));
    assert!(run.io.writes.is_empty());
    assert!(run.dma.writes.is_empty());
}

#[test]
fn test_features() {
    let cdo = CdoBuilder::new().cmd(GENERIC_FEATURES, &[]).end().build();
    let run = run_cdo(&cdo, &[], TestIo::default());
    assert_eq!(run.ctx.cmd.response[0], GENERIC_MODULE_VERSION);

    let cdo = CdoBuilder::new()
        .cmd(GENERIC_FEATURES, &[GENERIC_DMA_WRITE_KEYHOLE])
        .end()
        .build();
    assert_eq!(run_cdo(&cdo, &[], TestIo::default()).ctx.cmd.response[0], 1);

    let cdo = CdoBuilder::new().cmd(GENERIC_FEATURES, &[10]).end().build();
    assert_eq!(run_cdo(&cdo, &[], TestIo::default()).ctx.cmd.response[0], 0);
}
