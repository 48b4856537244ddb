/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the PLM driver seams.

--*/

#![cfg_attr(not(feature = "std"), no_std)]

mod dma;
mod error_reporter;
mod reg_io;

pub mod memory_layout;
pub mod printer;
pub mod wait;

pub use dma::{DmaEngine, DmaFlags, PlmAddr};
pub use error_reporter::{
    get_first_fw_error, get_fw_error, report_boot_status, report_fw_error,
};
pub use plm_error::{PlmError, PlmResult};
pub use reg_io::RegisterIo;
