/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the secure partition loader and the PLM
    main loop.

--*/

#![cfg_attr(not(feature = "std"), no_std)]

pub mod boot_header;
mod error_manager;
mod events;
mod full_pdi;
mod key_source;
mod partial_pdi;
mod partition;
pub mod platform;
mod plm;
pub mod runtime_config;

pub use boot_header::{BootHeader, EncryptionStatus, ImageAttributes};
pub use error_manager::{handle_error, ErrorAction, ErrorSeverity};
pub use events::{sbi_data_ready_isr, EventFlags, RunTimeEvents};
pub use full_pdi::load_full_pdi;
pub use key_source::{select_key_source, KeySource};
pub use partial_pdi::{check_security_policy, load_partial_pdi, partial_key_source};
pub use partition::{
    finish_load, load_partition, reset_crypto, BootContext, LoadBuffers, LoadEnv,
    SECURE_CHUNK_WORDS,
};
pub use platform::{
    BootMode, Digest, HashBlock, PartitionType, SecureBootPlatform, SecureChunk, SecurityFuses,
};
pub use plm::{plm_main, Plm};
pub use runtime_config::{RuntimeConfig, SecureState};
