// Licensed under the Apache-2.0 license.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod boot_status;
pub mod checksum;

pub use boot_status::PlmBootStatus;
pub use plm_drivers::cprint;
pub use plm_drivers::cprintln;
pub use plm_drivers::memory_layout;

use plm_drivers::RegisterIo;

/// Report a boot stage to the persistent status register.
pub fn report_boot_status(io: &mut dyn RegisterIo, status: PlmBootStatus) {
    plm_drivers::report_boot_status(io, status.into());
}
