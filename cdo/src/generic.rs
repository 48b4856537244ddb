/*++

Licensed under the Apache-2.0 license.

File Name:

    generic.rs

Abstract:

    File contains the generic CDO command set: register access, DMA
    writes, logging and begin/end/break control flow.

--*/

use crate::codec::MAX_SHORT_CMD_LEN;
use crate::command::{CmdEnv, Command, CommandHandler};
use crate::registry::Module;
use plm_common::{cprint, cprintln};
use plm_drivers::printer::{HexWords, WordStr};
use plm_drivers::wait::poll_for_mask;
use plm_drivers::{DmaFlags, PlmAddr};
use plm_error::{PlmError, PlmResult};

/// Module id of the generic command set
pub const GENERIC_MODULE_ID: u32 = 1;

/// Version reported by `features`
pub const GENERIC_MODULE_VERSION: u32 = 1;

/// Words written per DMA burst by `set`
pub const SET_BURST_WORDS: usize = 32;

pub const GENERIC_FEATURES: u32 = 0;
pub const GENERIC_MASK_POLL: u32 = 1;
pub const GENERIC_MASK_WRITE: u32 = 2;
pub const GENERIC_WRITE: u32 = 3;
pub const GENERIC_DELAY: u32 = 4;
pub const GENERIC_DMA_WRITE: u32 = 5;
pub const GENERIC_MASK_POLL64: u32 = 6;
pub const GENERIC_MASK_WRITE64: u32 = 7;
pub const GENERIC_WRITE64: u32 = 8;
pub const GENERIC_DMA_XFER: u32 = 9;
pub const GENERIC_SET: u32 = 12;
pub const GENERIC_DMA_WRITE_KEYHOLE: u32 = 13;
pub const GENERIC_NOP: u32 = 17;
pub const GENERIC_LOG_STRING: u32 = 23;
pub const GENERIC_LOG_ADDRESS: u32 = 24;
pub const GENERIC_MARKER: u32 = 25;
pub const GENERIC_BEGIN: u32 = 31;
pub const GENERIC_END: u32 = 32;
pub const GENERIC_BREAK: u32 = 33;

const GENERIC_API_COUNT: usize = GENERIC_BREAK as usize + 1;

/// Mask poll failure policy, low nibble of the flags word
const MASK_POLL_FLAGS_MASK: u32 = 0xF;
const MASK_POLL_FLAGS_SUCCESS: u32 = 1;
const MASK_POLL_FLAGS_DEFERRED_ERR: u32 = 2;
const MASK_POLL_FLAGS_BREAK: u32 = 3;
const MASK_POLL_FLAGS_BREAK_LEVEL_SHIFT: u32 = 24;

const BREAK_LEVEL_MASK: u32 = 0xFF;

fn addr64(hi: u32, lo: u32) -> u64 {
    u64::from(PlmAddr::new(hi, lo))
}

/// Byte offset of `words` 32-bit words
fn word_offset(words: u32) -> u64 {
    u64::from(words) * 4
}

/// Point the stream at the end offset `level` begin blocks out.
///
/// The `level - 1` innermost blocks are closed; the target block stays open
/// so its `end` still executes.
fn set_break(cmd: &mut Command, level: u32) -> PlmResult<()> {
    if level == 0 || level as usize > cmd.offset_stack.depth() {
        cprintln!("[generic] Invalid break level {}", level);
        return Err(PlmError::GENERIC_INVALID_BEGIN_END_PAIR);
    }
    cmd.offset_stack.drop_n(level as usize - 1);
    cmd.break_length = cmd
        .offset_stack
        .top()
        .ok_or(PlmError::GENERIC_INVALID_BEGIN_END_PAIR)?;
    Ok(())
}

/// Status of a timed out mask poll
///
/// A non-zero `err_code` word replaces `GENERIC_MASK_POLL_TIMEOUT`; zero
/// keeps the default. The registry folds the status into the command code,
/// which keeps only its low nibble, so the full override is logged here.
fn timeout_error(err_code: Option<u32>) -> PlmError {
    match err_code.map(PlmError::try_from) {
        Some(Ok(err)) => {
            cprintln!("[generic] Mask poll error code 0x{}", HexWords(&[u32::from(err)]));
            err
        }
        _ => PlmError::GENERIC_MASK_POLL_TIMEOUT,
    }
}

/// Shared mask poll body of the 32 and 64-bit variants
fn mask_poll(
    cmd: &mut Command,
    env: &mut CmdEnv,
    addr: u64,
    args: &[u32],
) -> PlmResult<()> {
    let &[mask, expected, timeout_us, ref opt @ ..] = args else {
        return Err(PlmError::GENERIC_INVALID_PAYLOAD_LEN);
    };
    if poll_for_mask(env.io, addr, mask, expected, timeout_us).is_ok() {
        return Ok(());
    }

    let flags = opt.first().copied().unwrap_or_default();
    let err = timeout_error(opt.get(1).copied());
    cprintln!(
        "[generic] Mask poll timeout 0x{} mask 0x{} expected 0x{}",
        HexWords(&[(addr >> 32) as u32, addr as u32]),
        HexWords(&[mask]),
        HexWords(&[expected])
    );

    match flags & MASK_POLL_FLAGS_MASK {
        MASK_POLL_FLAGS_SUCCESS => Ok(()),
        MASK_POLL_FLAGS_DEFERRED_ERR => {
            cmd.deferred_error = true;
            Err(err)
        }
        MASK_POLL_FLAGS_BREAK => set_break(
            cmd,
            (flags >> MASK_POLL_FLAGS_BREAK_LEVEL_SHIFT) & BREAK_LEVEL_MASK,
        ),
        _ => Err(err),
    }
}

pub struct FeaturesCmd;
impl CommandHandler for FeaturesCmd {
    /// Report the module version, or whether the api id in the payload is
    /// supported.
    fn execute(&self, cmd: &mut Command, payload: &[u32], _env: &mut CmdEnv) -> PlmResult<()> {
        cmd.response[0] = match payload.first() {
            None => GENERIC_MODULE_VERSION,
            Some(&api_id) => GENERIC_HANDLERS
                .get(api_id as usize)
                .is_some_and(|h| h.is_some()) as u32,
        };
        Ok(())
    }
}

pub struct MaskPollCmd;
impl CommandHandler for MaskPollCmd {
    fn execute(&self, cmd: &mut Command, payload: &[u32], env: &mut CmdEnv) -> PlmResult<()> {
        let (&addr, args) = payload
            .split_first()
            .ok_or(PlmError::GENERIC_INVALID_PAYLOAD_LEN)?;
        mask_poll(cmd, env, u64::from(addr), args)
    }
}

pub struct MaskPoll64Cmd;
impl CommandHandler for MaskPoll64Cmd {
    fn execute(&self, cmd: &mut Command, payload: &[u32], env: &mut CmdEnv) -> PlmResult<()> {
        let &[hi, lo, ref args @ ..] = payload else {
            return Err(PlmError::GENERIC_INVALID_PAYLOAD_LEN);
        };
        mask_poll(cmd, env, addr64(hi, lo), args)
    }
}

pub struct MaskWriteCmd;
impl CommandHandler for MaskWriteCmd {
    fn execute(&self, _cmd: &mut Command, payload: &[u32], env: &mut CmdEnv) -> PlmResult<()> {
        let &[addr, mask, value, ..] = payload else {
            return Err(PlmError::GENERIC_INVALID_PAYLOAD_LEN);
        };
        env.io.rmw32(u64::from(addr), mask, value);
        Ok(())
    }
}

pub struct MaskWrite64Cmd;
impl CommandHandler for MaskWrite64Cmd {
    fn execute(&self, _cmd: &mut Command, payload: &[u32], env: &mut CmdEnv) -> PlmResult<()> {
        let &[hi, lo, mask, value, ..] = payload else {
            return Err(PlmError::GENERIC_INVALID_PAYLOAD_LEN);
        };
        env.io.rmw32(addr64(hi, lo), mask, value);
        Ok(())
    }
}

pub struct WriteCmd;
impl CommandHandler for WriteCmd {
    fn execute(&self, _cmd: &mut Command, payload: &[u32], env: &mut CmdEnv) -> PlmResult<()> {
        let &[addr, value, ..] = payload else {
            return Err(PlmError::GENERIC_INVALID_PAYLOAD_LEN);
        };
        env.io.write32(u64::from(addr), value);
        Ok(())
    }
}

pub struct Write64Cmd;
impl CommandHandler for Write64Cmd {
    fn execute(&self, _cmd: &mut Command, payload: &[u32], env: &mut CmdEnv) -> PlmResult<()> {
        let &[hi, lo, value, ..] = payload else {
            return Err(PlmError::GENERIC_INVALID_PAYLOAD_LEN);
        };
        env.io.write32(addr64(hi, lo), value);
        Ok(())
    }
}

pub struct DelayCmd;
impl CommandHandler for DelayCmd {
    fn execute(&self, _cmd: &mut Command, payload: &[u32], env: &mut CmdEnv) -> PlmResult<()> {
        let &[us, ..] = payload else {
            return Err(PlmError::GENERIC_INVALID_PAYLOAD_LEN);
        };
        env.io.delay_us(us);
        Ok(())
    }
}

/// Copy the payload to a 64-bit destination.
///
/// Resume data: `[dest_hi, dest_lo]`.
pub struct DmaWriteCmd;
impl CommandHandler for DmaWriteCmd {
    fn execute(&self, cmd: &mut Command, payload: &[u32], env: &mut CmdEnv) -> PlmResult<()> {
        let (dest, data) = if cmd.processed_len == 0 {
            let &[hi, lo, ref data @ ..] = payload else {
                return Err(PlmError::GENERIC_INVALID_PAYLOAD_LEN);
            };
            cmd.resume_data[0] = hi;
            cmd.resume_data[1] = lo;
            (PlmAddr::new(hi, lo), data)
        } else {
            let written = cmd.processed_len.saturating_sub(2);
            let base = PlmAddr::new(cmd.resume_data[0], cmd.resume_data[1]);
            (base + word_offset(written), payload)
        };
        if data.is_empty() {
            return Ok(());
        }
        env.dma.write_words(dest, data, DmaFlags::empty())
    }
}

pub struct DmaXferCmd;
impl CommandHandler for DmaXferCmd {
    fn execute(&self, _cmd: &mut Command, payload: &[u32], env: &mut CmdEnv) -> PlmResult<()> {
        let &[src_hi, src_lo, dst_hi, dst_lo, words, flags, ..] = payload else {
            return Err(PlmError::GENERIC_INVALID_PAYLOAD_LEN);
        };
        env.dma.xfer(
            PlmAddr::new(src_hi, src_lo),
            PlmAddr::new(dst_hi, dst_lo),
            words,
            DmaFlags::from_bits_truncate(flags),
        )
    }
}

/// Fill `words` words at a 64-bit destination with a repeated value.
pub struct SetCmd;
impl CommandHandler for SetCmd {
    fn execute(&self, _cmd: &mut Command, payload: &[u32], env: &mut CmdEnv) -> PlmResult<()> {
        let &[hi, lo, words, value, ..] = payload else {
            return Err(PlmError::GENERIC_INVALID_PAYLOAD_LEN);
        };
        let burst = [value; SET_BURST_WORDS];
        let mut dest = PlmAddr::new(hi, lo);
        let mut remaining = words as usize;
        while remaining > 0 {
            let count = remaining.min(SET_BURST_WORDS);
            env.dma.write_words(dest, &burst[..count], DmaFlags::empty())?;
            dest = dest + word_offset(count as u32);
            remaining -= count;
        }
        Ok(())
    }
}

/// Write the payload through a circular destination window.
///
/// Resume data: `[base_hi, base_lo, keyhole_words, offset_words]`.
pub struct DmaWriteKeyholeCmd;
impl CommandHandler for DmaWriteKeyholeCmd {
    fn execute(&self, cmd: &mut Command, payload: &[u32], env: &mut CmdEnv) -> PlmResult<()> {
        let mut data = payload;
        if cmd.processed_len == 0 {
            let &[hi, lo, keyhole_bytes, ref rest @ ..] = payload else {
                return Err(PlmError::GENERIC_INVALID_PAYLOAD_LEN);
            };
            if keyhole_bytes == 0 || keyhole_bytes % 4 != 0 {
                return Err(PlmError::GENERIC_INVALID_KEYHOLE_SIZE);
            }
            cmd.resume_data[..4].copy_from_slice(&[hi, lo, keyhole_bytes / 4, 0]);
            data = rest;
        }

        let base = PlmAddr::new(cmd.resume_data[0], cmd.resume_data[1]);
        let keyhole_words = cmd.resume_data[2] as usize;
        let mut offset = cmd.resume_data[3] as usize;
        while !data.is_empty() {
            let count = (keyhole_words - offset).min(data.len());
            let dest = base + word_offset(offset as u32);
            env.dma.write_words(dest, &data[..count], DmaFlags::empty())?;
            offset = (offset + count) % keyhole_words;
            data = &data[count..];
        }
        cmd.resume_data[3] = offset as u32;
        Ok(())
    }
}

pub struct NopCmd;
impl CommandHandler for NopCmd {
    fn execute(&self, _cmd: &mut Command, _payload: &[u32], _env: &mut CmdEnv) -> PlmResult<()> {
        Ok(())
    }
}

/// Stream a label fragment, closing the line once the command completes
fn log_label(cmd: &Command, label: &[u32]) {
    cprint!("{}", WordStr(label));
    if cmd.processed_len + cmd.payload_len >= cmd.len {
        cprintln!("");
    }
}

pub struct LogStringCmd;
impl CommandHandler for LogStringCmd {
    fn execute(&self, cmd: &mut Command, payload: &[u32], _env: &mut CmdEnv) -> PlmResult<()> {
        if cmd.processed_len == 0 {
            cprint!("[generic] ");
        }
        log_label(cmd, payload);
        Ok(())
    }
}

pub struct LogAddressCmd;
impl CommandHandler for LogAddressCmd {
    fn execute(&self, _cmd: &mut Command, payload: &[u32], env: &mut CmdEnv) -> PlmResult<()> {
        let &[hi, lo, ref opt @ ..] = payload else {
            return Err(PlmError::GENERIC_INVALID_PAYLOAD_LEN);
        };
        let words = opt.first().copied().unwrap_or(1);
        let base = addr64(hi, lo);
        for i in 0..words {
            let addr = base.wrapping_add(word_offset(i));
            let val = env.io.read32(addr);
            cprintln!(
                "[generic] 0x{}: 0x{}",
                HexWords(&[(addr >> 32) as u32, addr as u32]),
                HexWords(&[val])
            );
        }
        Ok(())
    }
}

pub struct MarkerCmd;
impl CommandHandler for MarkerCmd {
    fn execute(&self, cmd: &mut Command, payload: &[u32], _env: &mut CmdEnv) -> PlmResult<()> {
        let mut label = payload;
        if cmd.processed_len == 0 {
            let (&marker, rest) = payload
                .split_first()
                .ok_or(PlmError::GENERIC_INVALID_PAYLOAD_LEN)?;
            cprint!("[generic] Marker 0x{} ", HexWords(&[marker]));
            label = rest;
        }
        log_label(cmd, label);
        Ok(())
    }
}

/// Open a block whose `end` lies `payload[0]` words past the header.
pub struct BeginCmd;
impl CommandHandler for BeginCmd {
    fn execute(&self, cmd: &mut Command, payload: &[u32], _env: &mut CmdEnv) -> PlmResult<()> {
        let mut label = payload;
        if cmd.processed_len == 0 {
            let (&skip, rest) = payload
                .split_first()
                .ok_or(PlmError::GENERIC_INVALID_PAYLOAD_LEN)?;
            // A long form header with exactly 255 words still adjusts by one
            let hdr_adj = if cmd.len > MAX_SHORT_CMD_LEN { 2 } else { 1 };
            let end_offset = cmd
                .processed_cdo_len
                .wrapping_add(skip)
                .wrapping_add(hdr_adj);
            cmd.offset_stack.push(end_offset)?;
            cprint!("[generic] Begin ");
            label = rest;
        }
        log_label(cmd, label);
        Ok(())
    }
}

pub struct EndCmd;
impl CommandHandler for EndCmd {
    fn execute(&self, cmd: &mut Command, _payload: &[u32], _env: &mut CmdEnv) -> PlmResult<()> {
        let end_offset = cmd
            .offset_stack
            .pop()
            .ok_or(PlmError::GENERIC_INVALID_BEGIN_END_PAIR)?;
        if end_offset != cmd.processed_cdo_len {
            cprintln!(
                "[generic] End at offset {} expected {}",
                cmd.processed_cdo_len,
                end_offset
            );
            return Err(PlmError::GENERIC_END_OFFSET_MISMATCH);
        }
        Ok(())
    }
}

pub struct BreakCmd;
impl CommandHandler for BreakCmd {
    fn execute(&self, cmd: &mut Command, payload: &[u32], _env: &mut CmdEnv) -> PlmResult<()> {
        let level = match payload.first() {
            Some(&word) => word & BREAK_LEVEL_MASK,
            None => 1,
        };
        set_break(cmd, level)
    }
}

static GENERIC_HANDLERS: [Option<&'static dyn CommandHandler>; GENERIC_API_COUNT] = {
    let mut handlers: [Option<&'static dyn CommandHandler>; GENERIC_API_COUNT] =
        [None; GENERIC_API_COUNT];
    handlers[GENERIC_FEATURES as usize] = Some(&FeaturesCmd);
    handlers[GENERIC_MASK_POLL as usize] = Some(&MaskPollCmd);
    handlers[GENERIC_MASK_WRITE as usize] = Some(&MaskWriteCmd);
    handlers[GENERIC_WRITE as usize] = Some(&WriteCmd);
    handlers[GENERIC_DELAY as usize] = Some(&DelayCmd);
    handlers[GENERIC_DMA_WRITE as usize] = Some(&DmaWriteCmd);
    handlers[GENERIC_MASK_POLL64 as usize] = Some(&MaskPoll64Cmd);
    handlers[GENERIC_MASK_WRITE64 as usize] = Some(&MaskWrite64Cmd);
    handlers[GENERIC_WRITE64 as usize] = Some(&Write64Cmd);
    handlers[GENERIC_DMA_XFER as usize] = Some(&DmaXferCmd);
    handlers[GENERIC_SET as usize] = Some(&SetCmd);
    handlers[GENERIC_DMA_WRITE_KEYHOLE as usize] = Some(&DmaWriteKeyholeCmd);
    handlers[GENERIC_NOP as usize] = Some(&NopCmd);
    handlers[GENERIC_LOG_STRING as usize] = Some(&LogStringCmd);
    handlers[GENERIC_LOG_ADDRESS as usize] = Some(&LogAddressCmd);
    handlers[GENERIC_MARKER as usize] = Some(&MarkerCmd);
    handlers[GENERIC_BEGIN as usize] = Some(&BeginCmd);
    handlers[GENERIC_END as usize] = Some(&EndCmd);
    handlers[GENERIC_BREAK as usize] = Some(&BreakCmd);
    handlers
};

/// Generic command set
pub static GENERIC_MODULE: Module = Module {
    id: GENERIC_MODULE_ID,
    name: "generic",
    handlers: &GENERIC_HANDLERS,
};
