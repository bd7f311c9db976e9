//! Interrupt dispatch
//!
//! Vector handlers cannot carry state, so the controller is attached to a
//! static [`IrqDispatch`] once it lives in a `'static` cell. Each handler
//! then forwards to the attached controller. An interrupt taken before
//! attachment, or after detachment, is dropped.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use platform::{CaptureRegisterBus, DmaEngine, InterruptLine, InterruptLines, TickSource};

use super::controller::Controller;

/// Handlers for the four capture interrupt lines.
pub trait CaptureInterrupts: Sync {
    /// Frame end.
    fn on_frame_end(&self);
    /// Overrun, underrun or geometry error.
    fn on_error(&self);
    /// Receive data ready.
    fn on_data_ready(&self);
    /// DMA block transfer finished.
    fn on_dma_transfer_end(&self);
}

impl<R, I, D, T> CaptureInterrupts for Controller<R, I, D, T>
where
    R: CaptureRegisterBus + Sync,
    I: InterruptLines + Sync,
    D: DmaEngine + Sync,
    T: TickSource + Sync,
{
    fn on_frame_end(&self) {
        Controller::on_frame_end(self);
    }

    fn on_error(&self) {
        Controller::on_error(self);
    }

    fn on_data_ready(&self) {
        Controller::on_data_ready(self);
    }

    fn on_dma_transfer_end(&self) {
        Controller::on_dma_transfer_end(self);
    }
}

/// Routes vector handlers to an attached controller.
pub struct IrqDispatch {
    handler: Mutex<CriticalSectionRawMutex, Cell<Option<&'static dyn CaptureInterrupts>>>,
}

impl IrqDispatch {
    /// Dispatch table with nothing attached.
    pub const fn new() -> Self {
        Self {
            handler: Mutex::new(Cell::new(None)),
        }
    }

    /// Route interrupts to `handler`, replacing any previous one.
    pub fn attach(&self, handler: &'static dyn CaptureInterrupts) {
        self.handler.lock(|h| h.set(Some(handler)));
    }

    /// Stop routing interrupts.
    pub fn detach(&self) {
        self.handler.lock(|h| h.set(None));
    }

    /// Whether a handler is attached.
    pub fn is_attached(&self) -> bool {
        self.handler.lock(Cell::get).is_some()
    }

    fn with(&self, f: impl FnOnce(&dyn CaptureInterrupts)) -> bool {
        // Copy the reference out so the handler runs outside the lock.
        match self.handler.lock(Cell::get) {
            Some(handler) => {
                f(handler);
                true
            }
            None => false,
        }
    }

    /// Frame-end vector. Returns whether a handler ran.
    pub fn frame_end(&self) -> bool {
        self.with(|h| h.on_frame_end())
    }

    /// Error vector.
    pub fn error(&self) -> bool {
        self.with(|h| h.on_error())
    }

    /// Data-ready vector.
    pub fn data_ready(&self) -> bool {
        self.with(|h| h.on_data_ready())
    }

    /// DMA transfer-end vector.
    pub fn dma_transfer_end(&self) -> bool {
        self.with(|h| h.on_dma_transfer_end())
    }

    /// Route by line.
    pub fn dispatch(&self, line: InterruptLine) -> bool {
        match line {
            InterruptLine::CaptureDataReady => self.data_ready(),
            InterruptLine::CaptureFrameEnd => self.frame_end(),
            InterruptLine::CaptureError => self.error(),
            InterruptLine::DmaTransferEnd => self.dma_transfer_end(),
        }
    }
}

impl Default for IrqDispatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Dispatch table used by the vector handlers.
pub static CAPTURE_IRQS: IrqDispatch = IrqDispatch::new();

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct Counter {
        frame_end: AtomicU32,
        error: AtomicU32,
        data_ready: AtomicU32,
        dma: AtomicU32,
    }

    impl CaptureInterrupts for Counter {
        fn on_frame_end(&self) {
            self.frame_end.fetch_add(1, Ordering::Relaxed);
        }
        fn on_error(&self) {
            self.error.fetch_add(1, Ordering::Relaxed);
        }
        fn on_data_ready(&self) {
            self.data_ready.fetch_add(1, Ordering::Relaxed);
        }
        fn on_dma_transfer_end(&self) {
            self.dma.fetch_add(1, Ordering::Relaxed);
        }
    }

    // ── Test A ── nothing attached ───────────────────────────────────────────

    #[test]
    fn test_unattached_dispatch_is_dropped() {
        let irqs = IrqDispatch::new();
        assert!(!irqs.is_attached());
        for line in InterruptLine::ALL {
            assert!(!irqs.dispatch(line));
        }
    }

    // ── Test B ── each line reaches its handler ──────────────────────────────

    #[test]
    fn test_dispatch_routes_by_line() {
        let counter: &'static Counter = Box::leak(Box::default());
        let irqs = IrqDispatch::new();
        irqs.attach(counter);
        for line in InterruptLine::ALL {
            assert!(irqs.dispatch(line));
        }
        assert!(irqs.frame_end());
        assert_eq!(counter.frame_end.load(Ordering::Relaxed), 2);
        assert_eq!(counter.error.load(Ordering::Relaxed), 1);
        assert_eq!(counter.data_ready.load(Ordering::Relaxed), 1);
        assert_eq!(counter.dma.load(Ordering::Relaxed), 1);
    }

    // ── Test C ── detach stops routing ───────────────────────────────────────

    #[test]
    fn test_detach() {
        let counter: &'static Counter = Box::leak(Box::default());
        let irqs = IrqDispatch::new();
        irqs.attach(counter);
        irqs.detach();
        assert!(!irqs.error());
        assert_eq!(counter.error.load(Ordering::Relaxed), 0);
    }
}
