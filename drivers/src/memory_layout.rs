/*++
Licensed under the Apache-2.0 license.

File Name:

    memory_layout.rs

Abstract:

    The file contains the layout of memory and the registers the PLM
    touches directly. The constants defined in this file define the
    memory layout.

--*/

//
// PMC Global
//
pub const PMC_GLOBAL_BASE: u64 = 0xF111_0000;
pub const PMC_GLOBAL_PMC_MULTI_BOOT: u64 = PMC_GLOBAL_BASE + 0x0004;
pub const PMC_GLOBAL_PMC_FW_ERR_FIRST: u64 = PMC_GLOBAL_BASE + 0x0050;
pub const PMC_GLOBAL_PMC_FW_ERR: u64 = PMC_GLOBAL_BASE + 0x0100;
pub const PMC_GLOBAL_PMC_FW_STATUS: u64 = PMC_GLOBAL_BASE + 0x0108;

//
// AES
//
pub const AES_BASE: u64 = 0xF11E_0000;
pub const AES_KEY_CLEAR: u64 = AES_BASE + 0x0014;
pub const AES_SOFT_RST: u64 = AES_BASE + 0x0010;
pub const AES_KEY_ZEROED_STATUS: u64 = AES_BASE + 0x0064;

pub const AES_SOFT_RST_ASSERT: u32 = 0x1;
/// eFUSE red key, BBRAM red key and boot header red key
pub const AES_KEY_CLEAR_RED_KEYS_MASK: u32 = 0x0000_0A0A;
pub const AES_KEY_ZEROED_RED_KEYS_MASK: u32 = 0x0000_0A0A;
pub const AES_KEY_CLEAR_TIMEOUT_US: u32 = 1_000;

//
// Run-Time Configuration Area
//
pub const RTCA_BASE: u64 = 0xF201_4000;
pub const RTCA_SIZE_WORDS: usize = 64;
