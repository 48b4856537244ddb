/*++

Licensed under the Apache-2.0 license.

File Name:

    plm.rs

Abstract:

    File contains the PLM context and main loop.

--*/

use crate::error_manager::{handle_error, ErrorAction, ErrorSeverity};
use crate::events::{EventFlags, RunTimeEvents};
use crate::full_pdi::load_full_pdi;
use crate::partial_pdi::load_partial_pdi;
use crate::partition::{BootContext, LoadBuffers, LoadEnv};
use crate::platform::SecureBootPlatform;
use crate::runtime_config::RuntimeConfig;
use plm_cdo::{CommandRegistry, GENERIC_MODULE};
use plm_common::{cprintln, report_boot_status, PlmBootStatus};
use plm_drivers::{DmaEngine, RegisterIo};
use plm_error::{PlmError, PlmResult};

/// PLM context
pub struct Plm<'a> {
    registry: CommandRegistry,
    boot: BootContext,
    events: &'a EventFlags,
    io: &'a mut dyn RegisterIo,
    dma: &'a mut dyn DmaEngine,
    platform: &'a mut dyn SecureBootPlatform,
    bufs: &'a mut LoadBuffers,
}

impl<'a> Plm<'a> {
    /// Create the PLM context and register the command modules
    pub fn new(
        io: &'a mut dyn RegisterIo,
        dma: &'a mut dyn DmaEngine,
        platform: &'a mut dyn SecureBootPlatform,
        bufs: &'a mut LoadBuffers,
        events: &'a EventFlags,
    ) -> PlmResult<Self> {
        report_boot_status(io, PlmBootStatus::PreBootInit);
        let mut registry = CommandRegistry::new();
        registry.register(&GENERIC_MODULE)?;
        RuntimeConfig::init(io);
        Ok(Self {
            registry,
            boot: BootContext::default(),
            events,
            io,
            dma,
            platform,
            bufs,
        })
    }

    fn load_env(&mut self) -> LoadEnv<'_> {
        LoadEnv {
            registry: &self.registry,
            io: &mut *self.io,
            dma: &mut *self.dma,
            platform: &mut *self.platform,
            bufs: &mut *self.bufs,
            boot: &mut self.boot,
        }
    }

    pub fn boot_context(&self) -> &BootContext {
        &self.boot
    }

    /// Load the full image
    pub fn boot(&mut self) -> PlmResult<()> {
        load_full_pdi(&mut self.load_env())?;
        self.boot.boot_complete = true;
        Ok(())
    }

    /// Service pending run-time events
    pub fn process_events(&mut self) -> PlmResult<()> {
        let events = self.events.take();
        if events.contains(RunTimeEvents::PARTIAL_PDI_READY) {
            self.platform.disable_interrupts();
            self.platform.sbi_clear_irq();
            self.platform.sbi_rearm_irq();
            self.platform.enable_interrupts();
            load_partial_pdi(&mut self.load_env())?;
        }
        Ok(())
    }

    /// Report an error and choose the recovery action
    pub fn handle_error(&mut self, err: PlmError) -> ErrorAction {
        let severity = if self.boot.boot_complete {
            ErrorSeverity::NonCritical
        } else {
            ErrorSeverity::Critical
        };
        handle_error(&mut *self.io, &mut *self.platform, err, severity)
    }

    /// Carry out an error action; only `Continue` returns
    pub fn perform(&mut self, action: ErrorAction) {
        match action {
            ErrorAction::Continue => {}
            ErrorAction::SecureLockdown => self.platform.secure_lockdown(),
            ErrorAction::RetryNextImage => self.platform.fallback_reset(),
            ErrorAction::Halt => self.platform.halt(),
        }
    }
}

/// PLM entry point: boot the full image, then service run-time events
pub fn plm_main(plm: &mut Plm) -> ! {
    cprintln!("[ldr] PLM starting");
    if let Err(err) = plm.boot() {
        let action = plm.handle_error(err);
        plm.perform(action);
    }

    loop {
        if let Err(err) = plm.process_events() {
            let action = plm.handle_error(err);
            plm.perform(action);
        }
        if plm.events.pending().is_empty() {
            plm.platform.wait_for_event();
        }
    }
}
