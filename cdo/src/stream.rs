/*++

Licensed under the Apache-2.0 license.

File Name:

    stream.rs

Abstract:

    File contains the CDO stream processor. A CDO arrives in chunks of
    arbitrary size; commands that straddle a chunk boundary are either
    reassembled in a bounded scratch buffer or executed in parts through
    their resume handler.

--*/

use crate::codec::{
    command_size, setup, CDO_HDR_CHECKSUM_IDX, CDO_HDR_ID_IDX, CDO_HDR_LEN, CDO_HDR_LEN_IDX,
    CDO_ID, CMD_END, CMD_LEN_TEMPBUF,
};
use crate::command::{CmdEnv, Command};
use crate::registry::CommandRegistry;
use plm_common::checksum::verify_inverted_checksum;
use plm_common::cprintln;
use plm_error::{PlmError, PlmResult};
use zeroize::Zeroize;

/// Image being loaded
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PdiType {
    #[default]
    Full,
    Partial,
}

/// Whether the next chunk starts a command or continues one
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CdoState {
    #[default]
    Start,
    Resume,
}

/// In-flight CDO
///
/// Invariant: `pending` holds fewer than `CMD_LEN_TEMPBUF` words. Once the
/// header is complete those words are already included in
/// `processed_cdo_len`.
#[derive(Default)]
pub struct CdoContext {
    /// Stream length in words, header excluded
    pub cdo_len: u32,

    /// Words of the stream consumed so far, header excluded
    pub processed_cdo_len: u32,

    /// Leading words of a command split across a chunk boundary
    pending: [u32; CMD_LEN_TEMPBUF],
    pending_len: usize,

    pub state: CdoState,
    pub end_detected: bool,
    pub first_chunk: bool,
    pub cmd: Command,
    pub pdi_type: PdiType,

    /// Set once any command reported a deferred error
    pub deferred_error: bool,
}

impl CdoContext {
    pub fn new(pdi_type: PdiType) -> Self {
        Self {
            first_chunk: true,
            pdi_type,
            ..Default::default()
        }
    }

    /// Reset the context for a new stream
    pub fn init(&mut self) {
        self.zeroize();
        self.first_chunk = true;
    }

    /// Returns true when no more chunks are needed
    pub fn is_done(&self) -> bool {
        self.end_detected || (!self.first_chunk && self.processed_cdo_len >= self.cdo_len)
    }

    /// Words of a split command held back for the next chunk
    pub fn pending_len(&self) -> usize {
        self.pending_len
    }

    /// Process the next chunk of the stream
    ///
    /// # Arguments
    ///
    /// * `registry` - Command registry
    /// * `env`      - Collaborators used by command handlers
    /// * `chunk`    - Plaintext chunk
    ///
    /// # Returns
    ///
    /// * Error of the first failing command, which is left unconsumed
    pub fn process_chunk(
        &mut self,
        registry: &CommandRegistry,
        env: &mut CmdEnv,
        chunk: &[u32],
    ) -> PlmResult<()> {
        let mut buf = chunk;
        if self.first_chunk {
            match self.take_header(buf)? {
                Some(rest) => buf = rest,
                None => return Ok(()),
            }
        }

        let avail = self.cdo_len.saturating_sub(self.processed_cdo_len) as usize;
        buf = &buf[..buf.len().min(avail)];

        if self.end_detected {
            return Ok(());
        }

        if self.pending_len != 0 {
            match self.complete_pending(registry, env, buf)? {
                Some(rest) => buf = rest,
                None => return Ok(()),
            }
        }

        if self.state == CdoState::Resume {
            buf = self.resume_command(registry, env, buf)?;
            if self.state == CdoState::Resume {
                return Ok(());
            }
        }

        buf = self.skip_to_break(buf);

        while let Some(&word0) = buf.first() {
            if word0 == CMD_END {
                self.end_detected = true;
                self.processed_cdo_len += 1;
                break;
            }

            let size = command_size(buf) as usize;
            if size > buf.len() {
                if buf.len() < CMD_LEN_TEMPBUF {
                    self.stash_pending(buf);
                } else {
                    self.dispatch(registry, env, buf, self.processed_cdo_len)?;
                    self.processed_cdo_len += buf.len() as u32;
                }
                return Ok(());
            }

            self.dispatch(registry, env, &buf[..size], self.processed_cdo_len)?;
            self.processed_cdo_len += size as u32;
            buf = self.skip_to_break(&buf[size..]);
        }
        Ok(())
    }

    /// Check the stream was fully processed
    ///
    /// # Returns
    ///
    /// * `CDO_HDR_TRUNCATED` if the header never completed,
    ///   `CDO_TRUNCATED_STREAM` if a command is incomplete or the stream
    ///   stopped short of its declared length without END,
    ///   `CDO_DEFERRED_ERROR` if any command deferred its failure
    pub fn finish(&self) -> PlmResult<()> {
        if self.first_chunk {
            return Err(PlmError::CDO_HDR_TRUNCATED);
        }
        if self.state == CdoState::Resume
            || self.pending_len != 0
            || (!self.end_detected && self.processed_cdo_len < self.cdo_len)
        {
            cprintln!(
                "[cdo] Stream ended inside a command at offset {}",
                self.processed_cdo_len
            );
            return Err(PlmError::CDO_TRUNCATED_STREAM);
        }
        if self.deferred_error {
            return Err(PlmError::CDO_DEFERRED_ERROR);
        }
        Ok(())
    }

    /// Collect the CDO header, which may itself be split across chunks.
    ///
    /// Header words are held in the pending scratch but are not part of
    /// `processed_cdo_len`.
    ///
    /// # Returns
    ///
    /// * Rest of `buf` after the header, `None` while the header is short
    fn take_header<'b>(&mut self, buf: &'b [u32]) -> PlmResult<Option<&'b [u32]>> {
        let held = self.pending_len;
        let take = (CDO_HDR_LEN - held).min(buf.len());
        self.pending[held..held + take].copy_from_slice(&buf[..take]);
        self.pending_len += take;
        if self.pending_len < CDO_HDR_LEN {
            return Ok(None);
        }

        let mut hdr = [0u32; CDO_HDR_LEN];
        hdr.copy_from_slice(&self.pending[..CDO_HDR_LEN]);
        self.pending.zeroize();
        self.pending_len = 0;
        self.validate_header(&hdr)?;
        Ok(Some(&buf[take..]))
    }

    fn validate_header(&mut self, hdr: &[u32; CDO_HDR_LEN]) -> PlmResult<()> {
        if hdr[CDO_HDR_ID_IDX] != CDO_ID {
            cprintln!("[cdo] Invalid CDO identification");
            return Err(PlmError::CDO_HDR_ID_ERR);
        }
        if !verify_inverted_checksum(hdr[CDO_HDR_CHECKSUM_IDX], &hdr[..CDO_HDR_CHECKSUM_IDX]) {
            cprintln!("[cdo] CDO header checksum mismatch");
            return Err(PlmError::CDO_CHECKSUM_ERR);
        }
        self.cdo_len = hdr[CDO_HDR_LEN_IDX];
        self.first_chunk = false;
        cprintln!("[cdo] CDO length {} words", self.cdo_len);
        Ok(())
    }

    /// Set up and dispatch the command at the start of `view`.
    ///
    /// `start` is the stream offset of the command's first header word.
    fn dispatch(
        &mut self,
        registry: &CommandRegistry,
        env: &mut CmdEnv,
        view: &[u32],
        start: u32,
    ) -> PlmResult<()> {
        self.cmd.processed_cdo_len = start;
        self.cmd.deferred_error = false;
        self.cmd.resume_handler = None;
        let payload = setup(&mut self.cmd, view);
        let result = registry.dispatch(&mut self.cmd, payload, env);
        self.deferred_error |= self.cmd.deferred_error;
        if let Err(err) = result {
            cprintln!("[cdo] Command failed at offset {}", start);
            return Err(err);
        }
        self.cmd.processed_len += self.cmd.payload_len;
        if !self.cmd.is_complete() {
            self.state = CdoState::Resume;
        }
        Ok(())
    }

    fn resume_command<'b>(
        &mut self,
        registry: &CommandRegistry,
        env: &mut CmdEnv,
        buf: &'b [u32],
    ) -> PlmResult<&'b [u32]> {
        let take = (self.cmd.remaining_len() as usize).min(buf.len());
        if take == 0 {
            return Ok(buf);
        }
        self.cmd.payload_len = take as u32;
        let result = registry.resume(&mut self.cmd, &buf[..take], env);
        self.deferred_error |= self.cmd.deferred_error;
        result?;
        self.cmd.processed_len += take as u32;
        self.processed_cdo_len += take as u32;
        if self.cmd.is_complete() {
            self.state = CdoState::Start;
        }
        Ok(&buf[take..])
    }

    /// Finish the command whose leading words were held back.
    ///
    /// The held words and up to `CMD_LEN_TEMPBUF - held` words of the new
    /// chunk form a contiguous view. The command either completes inside the
    /// view, is still short and stays pending, or starts partial execution
    /// and continues through the resume path.
    ///
    /// # Returns
    ///
    /// * Unconsumed part of `buf`, `None` when everything was held back
    fn complete_pending<'b>(
        &mut self,
        registry: &CommandRegistry,
        env: &mut CmdEnv,
        buf: &'b [u32],
    ) -> PlmResult<Option<&'b [u32]>> {
        let held = self.pending_len;
        let take = (CMD_LEN_TEMPBUF - held).min(buf.len());
        let mut scratch = self.pending;
        scratch[held..held + take].copy_from_slice(&buf[..take]);
        let view = &scratch[..held + take];
        let size = command_size(view) as usize;

        if size > view.len() && view.len() < CMD_LEN_TEMPBUF {
            self.stash_pending(buf);
            return Ok(None);
        }

        let start = self.processed_cdo_len - held as u32;
        self.pending.zeroize();
        self.pending_len = 0;
        self.processed_cdo_len = start;

        let used = if size <= view.len() {
            self.dispatch(registry, env, &view[..size], start)?;
            size
        } else {
            self.dispatch(registry, env, view, start)?;
            view.len()
        };
        scratch.zeroize();
        self.processed_cdo_len += used as u32;
        Ok(Some(&buf[used - held..]))
    }

    fn stash_pending(&mut self, words: &[u32]) {
        let end = self.pending_len + words.len();
        self.pending[self.pending_len..end].copy_from_slice(words);
        self.pending_len = end;
        self.processed_cdo_len += words.len() as u32;
    }

    /// Consume words up to an active break target.
    fn skip_to_break<'b>(&mut self, buf: &'b [u32]) -> &'b [u32] {
        if self.cmd.break_length == 0 {
            return buf;
        }
        let distance = self.cmd.break_length.saturating_sub(self.processed_cdo_len) as usize;
        if distance > buf.len() {
            self.processed_cdo_len += buf.len() as u32;
            return &buf[buf.len()..];
        }
        self.processed_cdo_len += distance as u32;
        self.cmd.break_length = 0;
        &buf[distance..]
    }
}

impl Zeroize for CdoContext {
    fn zeroize(&mut self) {
        self.cdo_len.zeroize();
        self.processed_cdo_len.zeroize();
        self.pending.zeroize();
        self.pending_len.zeroize();
        self.state = CdoState::Start;
        self.end_detected.zeroize();
        self.first_chunk.zeroize();
        self.cmd.zeroize();
        self.deferred_error.zeroize();
    }
}
