/*++

Licensed under the Apache-2.0 license.

File Name:

    registry.rs

Abstract:

    File contains the fixed-capacity CDO module registry.

--*/

use crate::codec::decode_header;
use crate::command::{CmdEnv, Command, CommandHandler};
use plm_common::cprintln;
use plm_drivers::printer::HexWords;
use plm_error::{PlmError, PlmResult};

/// Module slots available to the registry
pub const MAX_MODULES: usize = 16;

/// Handler table of one CDO module
pub struct Module {
    /// Module id, the `[15:8]` field of the command header
    pub id: u32,

    /// Module name used in log lines
    pub name: &'static str,

    /// Handlers indexed by api id
    pub handlers: &'static [Option<&'static dyn CommandHandler>],
}

/// Maps `(module_id, api_id)` to command handlers
pub struct CommandRegistry {
    modules: [Option<&'static Module>; MAX_MODULES],
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    pub const fn new() -> Self {
        Self {
            modules: [None; MAX_MODULES],
        }
    }

    /// Register a module
    ///
    /// # Arguments
    ///
    /// * `module` - Module to register
    ///
    /// # Returns
    ///
    /// * `CDO_MODULE_ALREADY_REGISTERED` if the id is taken, `CDO_INVALID_MODULE_ID`
    ///   if the id is beyond the table
    pub fn register(&mut self, module: &'static Module) -> PlmResult<()> {
        let slot = self
            .modules
            .get_mut(module.id as usize)
            .ok_or(PlmError::CDO_INVALID_MODULE_ID)?;
        if slot.is_some() {
            return Err(PlmError::CDO_MODULE_ALREADY_REGISTERED);
        }
        *slot = Some(module);
        cprintln!("[cdo] Registered module {} ({})", module.id, module.name);
        Ok(())
    }

    /// Look up the handler for `(module_id, api_id)`
    pub fn handler(&self, module_id: u32, api_id: u32) -> PlmResult<&'static dyn CommandHandler> {
        let module = self
            .modules
            .get(module_id as usize)
            .copied()
            .flatten()
            .ok_or(PlmError::CDO_MODULE_NOT_REGISTERED)?;
        let slot = module
            .handlers
            .get(api_id as usize)
            .ok_or(PlmError::CDO_INVALID_API_ID)?;
        slot.ok_or(PlmError::CDO_HANDLER_NOT_REGISTERED)
    }

    /// Dispatch a command to its handler
    ///
    /// On success the handler is remembered as the command's resume handler.
    ///
    /// # Arguments
    ///
    /// * `cmd`     - Command set up by the stream processor
    /// * `payload` - Resident payload words
    /// * `env`     - Collaborators
    pub fn dispatch(&self, cmd: &mut Command, payload: &[u32], env: &mut CmdEnv) -> PlmResult<()> {
        let hdr = decode_header(cmd.cmd_id);
        let handler = self.handler(hdr.module_id, hdr.api_id)?;
        Self::invoke(handler, cmd, payload, env)?;
        cmd.resume_handler = Some(handler);
        Ok(())
    }

    /// Continue a command whose payload straddled a chunk boundary
    pub fn resume(&self, cmd: &mut Command, payload: &[u32], env: &mut CmdEnv) -> PlmResult<()> {
        let handler = cmd
            .resume_handler
            .ok_or(PlmError::CDO_INVALID_RESUME_HANDLER)?;
        Self::invoke(handler, cmd, payload, env)
    }

    fn invoke(
        handler: &'static dyn CommandHandler,
        cmd: &mut Command,
        payload: &[u32],
        env: &mut CmdEnv,
    ) -> PlmResult<()> {
        match handler.execute(cmd, payload, env) {
            Ok(()) => Ok(()),
            Err(status) => {
                let err = PlmError::cdo_command(cmd.cmd_id, u32::from(status));
                if cmd.deferred_error {
                    cprintln!(
                        "[cdo] Deferred error 0x{} at offset {}",
                        HexWords(&[u32::from(err)]),
                        cmd.processed_cdo_len
                    );
                    return Ok(());
                }
                cprintln!(
                    "[cdo] Command 0x{} failed, status 0x{}",
                    HexWords(&[cmd.cmd_id]),
                    HexWords(&[u32::from(status)])
                );
                Err(err)
            }
        }
    }
}
