/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the CDO command interpreter.

--*/

#![cfg_attr(not(feature = "std"), no_std)]

pub mod codec;
mod command;
pub mod generic;
mod registry;
mod stream;

pub use codec::{command_size, decode_header, encode_header, setup, CmdHeader};
pub use command::{CmdEnv, Command, CommandHandler, OffsetStack, MAX_NESTED_BEGIN};
pub use generic::GENERIC_MODULE;
pub use registry::{CommandRegistry, Module, MAX_MODULES};
pub use stream::{CdoContext, CdoState, PdiType};
