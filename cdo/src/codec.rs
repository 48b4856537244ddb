/*++

Licensed under the Apache-2.0 license.

File Name:

    codec.rs

Abstract:

    File contains the CDO command header codec.

--*/

use crate::command::Command;

/// CDO identification word ("CDO\0")
pub const CDO_ID: u32 = 0x004F_4443;

/// Words in the CDO header
pub const CDO_HDR_LEN: usize = 5;

/// Index of the identification word in the CDO header
pub const CDO_HDR_ID_IDX: usize = 1;

/// Index of the length word in the CDO header
pub const CDO_HDR_LEN_IDX: usize = 3;

/// Index of the checksum word in the CDO header
pub const CDO_HDR_CHECKSUM_IDX: usize = 4;

/// END sentinel
pub const CMD_END: u32 = 0x01FF;

/// Inline length value announcing a long form command
pub const MAX_SHORT_CMD_LEN: u32 = 255;

/// Largest payload a long form command may declare
pub const MAX_LONG_CMD_LEN: u32 = 0xFFFF_FFFD;

/// Commands smaller than this are copied whole when they straddle a chunk
pub const CMD_LEN_TEMPBUF: usize = 8;

const CMD_LEN_SHIFT: u32 = 16;
const CMD_MODULE_SHIFT: u32 = 8;

/// Decoded command header word
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CmdHeader {
    pub module_id: u32,
    pub api_id: u32,
    pub inline_len: u32,
}

impl CmdHeader {
    /// Header words used by a command with this header
    pub fn header_len(&self) -> u32 {
        if self.is_long() {
            2
        } else {
            1
        }
    }

    /// Returns true if the length is carried in a second header word
    pub fn is_long(&self) -> bool {
        self.inline_len == MAX_SHORT_CMD_LEN
    }
}

/// Decode a command header word
pub fn decode_header(word0: u32) -> CmdHeader {
    CmdHeader {
        module_id: (word0 >> CMD_MODULE_SHIFT) & 0xFF,
        api_id: word0 & 0xFF,
        inline_len: (word0 >> CMD_LEN_SHIFT) & 0xFF,
    }
}

/// Encode a command header
///
/// # Arguments
///
/// * `module_id` - Module id
/// * `api_id`    - Api id
/// * `len`       - Payload length in words
///
/// # Returns
///
/// * Header word and, for payloads of 255 words or more, the length word
pub fn encode_header(module_id: u32, api_id: u32, len: u32) -> (u32, Option<u32>) {
    let id = ((module_id & 0xFF) << CMD_MODULE_SHIFT) | (api_id & 0xFF);
    if len < MAX_SHORT_CMD_LEN {
        (id | (len << CMD_LEN_SHIFT), None)
    } else {
        (id | (MAX_SHORT_CMD_LEN << CMD_LEN_SHIFT), Some(len))
    }
}

fn declared_len(hdr: &CmdHeader, buf: &[u32]) -> u32 {
    if !hdr.is_long() {
        return hdr.inline_len;
    }
    match buf.get(1) {
        Some(&len) => len.min(MAX_LONG_CMD_LEN),
        None => MAX_SHORT_CMD_LEN,
    }
}

/// Total size in words of the command at the start of `buf`, header included.
///
/// A long form command whose length word is not resident reports `2 + 255`.
pub fn command_size(buf: &[u32]) -> u32 {
    let Some(&word0) = buf.first() else {
        return 0;
    };
    let hdr = decode_header(word0);
    hdr.header_len().saturating_add(declared_len(&hdr, buf))
}

/// Set up `cmd` for the command at the start of `buf`.
///
/// Only the resident part of the payload is exposed: `payload_len` is
/// `min(len, buf.len() - header_len)`.
///
/// # Returns
///
/// * Resident payload words
pub fn setup<'a>(cmd: &mut Command, buf: &'a [u32]) -> &'a [u32] {
    let word0 = buf.first().copied().unwrap_or_default();
    let hdr = decode_header(word0);
    let hdr_len = (hdr.header_len() as usize).min(buf.len());
    cmd.cmd_id = word0;
    cmd.len = declared_len(&hdr, buf);
    cmd.processed_len = 0;
    let resident = (buf.len() - hdr_len).min(cmd.len as usize);
    cmd.payload_len = resident as u32;
    &buf[hdr_len..hdr_len + resident]
}
