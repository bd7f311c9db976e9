//! Parallel video capture
//!
//! Layers, bottom to top:
//!
//! ```text
//! Console / application   (CaptureControl)
//!         ↓
//! Controller              (session state machine, callbacks)
//!         ↓
//! CapturePeripheral       RegionScheduler ──► DmaEngine
//!         ↓
//! CaptureRegisterBus      InterruptLines      TickSource
//! ```
//!
//! Interrupt handlers reach the controller through [`irq::CAPTURE_IRQS`].

pub mod controller;
pub mod error;
pub mod irq;
pub mod peripheral;
pub mod regions;
pub mod status;

pub use controller::{Controller, ControllerConfig, SessionState, FIFO_DRAIN_SPINS};
pub use error::{CaptureError, RegionError};
pub use irq::{CaptureInterrupts, IrqDispatch, CAPTURE_IRQS};
pub use peripheral::{CapturePeripheral, ResetFollowUp, ResetOutcome};
pub use regions::{DmaRegion, RegionScheduler};
pub use status::{CaptureCallback, CaptureEvent, FrameStatus};

use platform::{
    CaptureRange, CaptureRegisterBus, DmaEngine, InterruptLines, SignalPolarity, TickSource,
};

/// Application-facing capture operations.
///
/// The console drives capture through this trait, so it can be exercised
/// against a fake in tests.
pub trait CaptureControl {
    /// Start capturing one frame; `callback` receives the terminal event.
    fn start_capture(&self, callback: CaptureCallback) -> Result<(), CaptureError>;

    /// Halt capture in any state.
    fn stop_capture(&self) -> Result<(), CaptureError>;

    /// Flags and byte progress.
    fn status(&self) -> FrameStatus;

    /// Capture enable is set.
    fn is_running(&self) -> bool;

    /// Current sync polarity.
    fn signal_polarity(&self) -> SignalPolarity;

    /// Set the sync polarity.
    fn set_signal_polarity(&self, polarity: SignalPolarity) -> Result<(), CaptureError>;

    /// Current geometry in pixel units.
    fn capture_range(&self) -> CaptureRange;

    /// Set the geometry in pixel units.
    fn set_capture_range(&self, range: CaptureRange) -> Result<(), CaptureError>;

    /// Software reset with a bounded wait; `true` if it completed.
    fn reset(&self, timeout_ms: u32) -> bool;
}

impl<R, I, D, T> CaptureControl for Controller<R, I, D, T>
where
    R: CaptureRegisterBus,
    I: InterruptLines,
    D: DmaEngine,
    T: TickSource,
{
    fn start_capture(&self, callback: CaptureCallback) -> Result<(), CaptureError> {
        Controller::start_capture(self, callback)
    }

    fn stop_capture(&self) -> Result<(), CaptureError> {
        Controller::stop_capture(self)
    }

    fn status(&self) -> FrameStatus {
        Controller::status(self)
    }

    fn is_running(&self) -> bool {
        Controller::is_running(self)
    }

    fn signal_polarity(&self) -> SignalPolarity {
        Controller::signal_polarity(self)
    }

    fn set_signal_polarity(&self, polarity: SignalPolarity) -> Result<(), CaptureError> {
        Controller::set_signal_polarity(self, polarity)
    }

    fn capture_range(&self) -> CaptureRange {
        Controller::capture_range(self)
    }

    fn set_capture_range(&self, range: CaptureRange) -> Result<(), CaptureError> {
        Controller::set_capture_range(self, range)
    }

    fn reset(&self, timeout_ms: u32) -> bool {
        Controller::reset(self, timeout_ms)
    }
}

impl<C: CaptureControl + ?Sized> CaptureControl for &C {
    fn start_capture(&self, callback: CaptureCallback) -> Result<(), CaptureError> {
        (**self).start_capture(callback)
    }

    fn stop_capture(&self) -> Result<(), CaptureError> {
        (**self).stop_capture()
    }

    fn status(&self) -> FrameStatus {
        (**self).status()
    }

    fn is_running(&self) -> bool {
        (**self).is_running()
    }

    fn signal_polarity(&self) -> SignalPolarity {
        (**self).signal_polarity()
    }

    fn set_signal_polarity(&self, polarity: SignalPolarity) -> Result<(), CaptureError> {
        (**self).set_signal_polarity(polarity)
    }

    fn capture_range(&self) -> CaptureRange {
        (**self).capture_range()
    }

    fn set_capture_range(&self, range: CaptureRange) -> Result<(), CaptureError> {
        (**self).set_capture_range(range)
    }

    fn reset(&self, timeout_ms: u32) -> bool {
        (**self).reset(timeout_ms)
    }
}
