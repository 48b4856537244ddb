/*++

Licensed under the Apache-2.0 license.

File Name:

    events.rs

Abstract:

    File contains the run-time event flags raised from interrupt
    context and consumed by the PLM main loop.

--*/

use core::sync::atomic::{AtomicU32, Ordering};

bitflags::bitflags! {
    /// Pending run-time events
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct RunTimeEvents: u32 {
        /// SBI data ready: a partial image is waiting in the FIFO
        const PARTIAL_PDI_READY = 1 << 0;
    }
}

/// Event word shared between interrupt handlers and the main loop
#[derive(Debug, Default)]
pub struct EventFlags(AtomicU32);

impl EventFlags {
    pub const fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    /// Mark events pending; called from interrupt context
    pub fn raise(&self, events: RunTimeEvents) {
        self.0.fetch_or(events.bits(), Ordering::SeqCst);
    }

    /// Consume every pending event
    pub fn take(&self) -> RunTimeEvents {
        RunTimeEvents::from_bits_truncate(self.0.swap(0, Ordering::SeqCst))
    }

    pub fn pending(&self) -> RunTimeEvents {
        RunTimeEvents::from_bits_truncate(self.0.load(Ordering::SeqCst))
    }
}

/// SBI data ready interrupt handler
pub fn sbi_data_ready_isr(events: &EventFlags) {
    events.raise(RunTimeEvents::PARTIAL_PDI_READY);
}
