/*++

Licensed under the Apache-2.0 license.

File Name:

    command.rs

Abstract:

    File contains the in-flight CDO command state and the handler seam.

--*/

use plm_drivers::{DmaEngine, RegisterIo};
use plm_error::{PlmError, PlmResult};
use zeroize::Zeroize;

/// Nested begin/end capacity
pub const MAX_NESTED_BEGIN: usize = 10;

/// Words of per-command scratch carried across resumes
pub const RESUME_DATA_WORDS: usize = 8;

/// Words of response produced by query commands
pub const RESPONSE_WORDS: usize = 4;

/// Bounded stack of end offsets pushed by `begin`
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OffsetStack {
    offsets: [u32; MAX_NESTED_BEGIN],
    depth: usize,
}

impl OffsetStack {
    pub fn push(&mut self, offset: u32) -> PlmResult<()> {
        let slot = self
            .offsets
            .get_mut(self.depth)
            .ok_or(PlmError::GENERIC_MAX_NESTED_BEGIN)?;
        *slot = offset;
        self.depth += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Option<u32> {
        if self.depth == 0 {
            return None;
        }
        self.depth -= 1;
        Some(self.offsets[self.depth])
    }

    pub fn top(&self) -> Option<u32> {
        self.depth.checked_sub(1).map(|idx| self.offsets[idx])
    }

    /// Discard the `count` innermost offsets
    pub fn drop_n(&mut self, count: usize) {
        self.depth = self.depth.saturating_sub(count);
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_empty(&self) -> bool {
        self.depth == 0
    }
}

impl Zeroize for OffsetStack {
    fn zeroize(&mut self) {
        self.offsets.zeroize();
        self.depth.zeroize();
    }
}

/// Command being executed by the stream processor.
///
/// A single instance lives in the CDO context and is reused for every
/// command of the stream, including resumed ones.
#[derive(Default)]
pub struct Command {
    /// Header word
    pub cmd_id: u32,

    /// Declared payload length in words
    pub len: u32,

    /// Payload words already executed
    pub processed_len: u32,

    /// Payload words resident in the current buffer
    pub payload_len: u32,

    /// Handler to re-invoke when the payload continues in the next chunk
    pub resume_handler: Option<&'static dyn CommandHandler>,

    /// Handler scratch carried across resumes
    pub resume_data: [u32; RESUME_DATA_WORDS],

    /// End offsets of the active begin blocks
    pub offset_stack: OffsetStack,

    /// Offset the stream skips to, zero when no break is active
    pub break_length: u32,

    /// Offset of this command in the CDO stream
    pub processed_cdo_len: u32,

    /// Set by a handler whose failure must not stop the stream
    pub deferred_error: bool,

    /// Response words of query commands
    pub response: [u32; RESPONSE_WORDS],
}

impl Command {
    /// Returns true once every payload word has been executed
    pub fn is_complete(&self) -> bool {
        self.processed_len >= self.len
    }

    /// Payload words not yet executed
    pub fn remaining_len(&self) -> u32 {
        self.len.saturating_sub(self.processed_len)
    }
}

impl Zeroize for Command {
    fn zeroize(&mut self) {
        self.cmd_id.zeroize();
        self.len.zeroize();
        self.processed_len.zeroize();
        self.payload_len.zeroize();
        self.resume_handler = None;
        self.resume_data.zeroize();
        self.offset_stack.zeroize();
        self.break_length.zeroize();
        self.processed_cdo_len.zeroize();
        self.deferred_error.zeroize();
        self.response.zeroize();
    }
}

/// Collaborators available to command handlers
pub struct CmdEnv<'a> {
    /// Register I/O
    pub io: &'a mut dyn RegisterIo,

    /// DMA engine
    pub dma: &'a mut dyn DmaEngine,
}

/// CDO command handler
///
/// A handler executes the resident payload of `cmd`. When the payload
/// continues in a later chunk the same handler is invoked again with
/// `cmd.processed_len` words already done; `cmd.processed_len` is advanced
/// by the stream processor, not by the handler.
pub trait CommandHandler: Sync {
    fn execute(&self, cmd: &mut Command, payload: &[u32], env: &mut CmdEnv) -> PlmResult<()>;
}
