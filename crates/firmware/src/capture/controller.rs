//! Capture controller
//!
//! Owns one capture session at a time and ties the peripheral driver, the
//! DMA engine and the region scheduler together.
//!
//! # Session lifecycle
//!
//! ```text
//!            start_capture()              update(): reset done
//!   Idle ─────────────────────► Resetting ──────────────────────► Capturing
//!    ▲                              │                                 │
//!    │      update(): reset timeout │   frame end / error / DMA abort │
//!    └──────────────────────────────┴─────────────────────────────────┘
//!                 stop_capture() from any state
//! ```
//!
//! Every path back to `Idle` disables capture, stops the DMA engine, masks
//! the capture interrupt sources and rewinds the region table. Terminal
//! events take the stored callback out of its slot before invoking it, so
//! a session delivers at most one callback.

use core::cell::Cell;
use core::sync::atomic::{AtomicU8, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use platform::capture::status;
use platform::{
    BytesPerPixel, CaptureConfig, CaptureRange, CaptureRegisterBus, CaptureWindow, ConfigError,
    DmaEngine, InterruptLine, InterruptLines, InterruptSettings, RegionLayout, SignalPolarity,
    TickSource,
};

use super::error::CaptureError;
use super::peripheral::{CapturePeripheral, ResetFollowUp, OPEN_RESET_WAIT_MS, RESET_TIMEOUT_MS};
use super::regions::{self, Advance, RegionScheduler};
use super::status::{CaptureCallback, CaptureEvent, FrameStatus};

/// Polls of STATUS allowed for the FIFO to drain after frame end.
pub const FIFO_DRAIN_SPINS: u32 = 300;

/// Controller tuning and memory layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-logging", derive(defmt::Format))]
pub struct ControllerConfig {
    /// Destination regions for captured frames.
    pub layout: RegionLayout,
    /// Deadline for the reset that precedes a capture.
    pub reset_timeout_ms: u32,
    /// Busy-wait on the reset issued by `open`.
    pub open_reset_wait_ms: u32,
    /// STATUS polls waiting for the FIFO to drain after frame end.
    pub fifo_drain_spins: u32,
}

impl ControllerConfig {
    /// Board defaults.
    pub const DEFAULT: Self = Self {
        layout: RegionLayout::DEFAULT,
        reset_timeout_ms: RESET_TIMEOUT_MS,
        open_reset_wait_ms: OPEN_RESET_WAIT_MS,
        fifo_drain_spins: FIFO_DRAIN_SPINS,
    };

    /// Validate the region layout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.layout.validate()
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Where the current session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-logging", derive(defmt::Format))]
#[repr(u8)]
pub enum SessionState {
    /// No capture in progress.
    Idle = 0,
    /// Waiting for the pre-capture reset to complete.
    Resetting = 1,
    /// Capture enabled; waiting for frame end.
    Capturing = 2,
}

impl SessionState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Resetting,
            2 => Self::Capturing,
            _ => Self::Idle,
        }
    }
}

/// Capture session controller.
pub struct Controller<R, I, D, T> {
    peripheral: CapturePeripheral<R, I, T>,
    dma: D,
    scheduler: RegionScheduler,
    layout: RegionLayout,
    fifo_drain_spins: u32,
    session: AtomicU8,
    bpp: AtomicU8,
    callback: Mutex<CriticalSectionRawMutex, Cell<Option<CaptureCallback>>>,
}

impl<R, I, D, T> Controller<R, I, D, T>
where
    R: CaptureRegisterBus,
    I: InterruptLines,
    D: DmaEngine,
    T: TickSource,
{
    /// Assemble a controller. Hardware is untouched until [`open`](Self::open).
    pub fn new(regs: R, lines: I, dma: D, tick: T, config: ControllerConfig) -> Self {
        Self {
            peripheral: CapturePeripheral::new(regs, lines, tick)
                .with_reset_timing(config.reset_timeout_ms, config.open_reset_wait_ms),
            dma,
            scheduler: RegionScheduler::new(),
            layout: config.layout,
            fifo_drain_spins: config.fifo_drain_spins,
            session: AtomicU8::new(SessionState::Idle as u8),
            bpp: AtomicU8::new(BytesPerPixel::YUV422.get()),
            callback: Mutex::new(Cell::new(None)),
        }
    }

    /// Open the peripheral, register the DMA completion line and plan the
    /// initial frame (`config.window` at 2 bytes per pixel).
    pub fn open(&self, config: &CaptureConfig) -> Result<(), CaptureError> {
        if self.peripheral.is_open() {
            return Ok(());
        }
        self.layout.validate()?;
        let total = config.window.frame_bytes();
        let plan = regions::plan(total, &self.layout)?;
        let priority = config.priority()?;

        self.peripheral.open(config)?;
        if let Err(e) = self
            .peripheral
            .interrupt_lines()
            .register(InterruptLine::DmaTransferEnd, priority)
        {
            error!("DMA interrupt registration failed: {}", e);
            self.peripheral.close();
            return Err(CaptureError::HardwareFault);
        }
        self.dma.stop();
        self.scheduler.load(plan, total);
        self.bpp.store(BytesPerPixel::YUV422.get(), Ordering::Release);
        info!("capture controller ready: frame {} bytes", total);
        Ok(())
    }

    /// Stop any session and release the peripheral.
    pub fn close(&self) {
        if !self.peripheral.is_open() {
            return;
        }
        self.halt();
        self.peripheral
            .interrupt_lines()
            .disable(InterruptLine::DmaTransferEnd);
        self.peripheral.close();
    }

    fn ensure_open(&self) -> Result<(), CaptureError> {
        if self.peripheral.is_open() {
            Ok(())
        } else {
            Err(CaptureError::NotSupported)
        }
    }

    /// Current session state.
    pub fn session(&self) -> SessionState {
        SessionState::from_u8(self.session.load(Ordering::Acquire))
    }

    /// Start capturing one frame; `callback` receives the terminal event.
    ///
    /// Arms region 0, enables the transfer interrupts, then requests the
    /// reset whose completion sets the capture enable. Any failure undoes
    /// the steps already taken and leaves no callback stored.
    pub fn start_capture(&self, callback: CaptureCallback) -> Result<(), CaptureError> {
        self.ensure_open()?;
        if self.peripheral.is_receiving() || self.peripheral.is_resetting() {
            return Err(CaptureError::Busy);
        }
        if self
            .session
            .compare_exchange(
                SessionState::Idle as u8,
                SessionState::Resetting as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return Err(CaptureError::Busy);
        }

        self.scheduler.rewind();
        if let Err(e) = self.scheduler.setup(0, &self.dma) {
            error!("capture start: region 0 arm failed: {}", e);
            self.halt();
            return Err(e.into());
        }
        for line in InterruptLine::ALL {
            self.peripheral.interrupt_lines().clear_pending(line);
        }
        // Flags left over from an earlier frame must not end this session.
        let stale = self.peripheral.status();
        self.peripheral.clear_status(stale.0);

        self.callback.lock(|c| c.set(Some(callback)));
        if let Err(e) = self
            .peripheral
            .set_interrupt_settings(InterruptSettings::TRANSFER)
        {
            self.halt();
            return Err(e);
        }
        if let Err(e) = self
            .peripheral
            .request_reset(Some(ResetFollowUp::EnableCapture))
        {
            self.halt();
            return Err(e);
        }
        if self.session() != SessionState::Resetting {
            // A fault ended the session while it was being armed. Its event
            // has gone to the callback; drop the enable armed after it.
            self.teardown();
            return Ok(());
        }
        info!("capture started: {} bytes", self.scheduler.total_bytes());
        Ok(())
    }

    /// Halt capture in any state. No callback is delivered for the session.
    pub fn stop_capture(&self) -> Result<(), CaptureError> {
        self.ensure_open()?;
        let was = self.session();
        self.halt();
        if was != SessionState::Idle {
            info!("capture stopped");
        }
        Ok(())
    }

    /// Undo a session without notifying anyone.
    fn halt(&self) {
        self.callback.lock(Cell::take);
        self.teardown();
    }

    fn teardown(&self) {
        self.peripheral.cancel_reset_follow_up();
        self.peripheral.set_receive_enable(false);
        self.dma.stop();
        self.peripheral.disable_interrupts();
        self.scheduler.rewind();
        self.session
            .store(SessionState::Idle as u8, Ordering::Release);
    }

    /// End the session and deliver `event` to the stored callback, if any.
    fn finish(&self, event: CaptureEvent) {
        self.teardown();
        let callback = self.callback.lock(Cell::take);
        debug!("capture session ended: {}", event.name());
        if let Some(callback) = callback {
            callback(&event);
        }
    }

    /// Snapshot of flags and byte progress.
    pub fn status(&self) -> FrameStatus {
        let raw = self.peripheral.status();
        FrameStatus {
            is_receiving: self.peripheral.is_receiving(),
            is_resetting: self.peripheral.is_resetting(),
            received_len: self.scheduler.received_length(&self.dma),
            total_len: self.scheduler.total_bytes(),
            ..FrameStatus::from_raw(raw)
        }
    }

    /// Capture enable is set.
    pub fn is_running(&self) -> bool {
        self.peripheral.is_receiving()
    }

    /// Set the capture geometry in pixel units.
    ///
    /// The frame is planned against the region layout before any register
    /// is written, so a rejected range leaves the previous one in place.
    pub fn set_capture_range(&self, range: CaptureRange) -> Result<(), CaptureError> {
        self.ensure_open()?;
        if self.session() != SessionState::Idle || self.peripheral.is_receiving() {
            return Err(CaptureError::Busy);
        }
        if !range.is_transfer_aligned() {
            return Err(CaptureError::InvalidArgument);
        }
        let total = range.frame_bytes().ok_or(CaptureError::InvalidArgument)?;
        let window = range
            .to_window()
            .filter(CaptureWindow::is_valid)
            .ok_or(CaptureError::InvalidArgument)?;
        let plan = regions::plan(total, &self.layout)?;

        self.peripheral.set_position_size(&window)?;
        self.scheduler.load(plan, total);
        self.bpp.store(range.bpp.get(), Ordering::Release);
        debug!(
            "capture range {}x{} at ({}, {}), {} bytes",
            range.xsize,
            range.ysize,
            range.xst,
            range.yst,
            total
        );
        Ok(())
    }

    /// Current geometry in pixel units, derived from the window registers.
    pub fn capture_range(&self) -> CaptureRange {
        let bpp = BytesPerPixel::try_new(self.bpp.load(Ordering::Acquire)).unwrap_or_default();
        CaptureRange::from_window(&self.peripheral.position_size(), bpp)
    }

    /// Set the sync polarity; only while idle.
    pub fn set_signal_polarity(&self, polarity: SignalPolarity) -> Result<(), CaptureError> {
        self.ensure_open()?;
        if self.session() != SessionState::Idle {
            return Err(CaptureError::Busy);
        }
        self.peripheral.set_signal_polarity(polarity)
    }

    /// Current sync polarity.
    pub fn signal_polarity(&self) -> SignalPolarity {
        self.peripheral.signal_polarity()
    }

    /// Software reset with a bounded wait. Refused while a session is active.
    pub fn reset(&self, timeout_ms: u32) -> bool {
        if !self.peripheral.is_open()
            || self.session() != SessionState::Idle
            || self.peripheral.is_receiving()
        {
            return false;
        }
        if self.peripheral.request_reset(None).is_err() {
            return false;
        }
        self.peripheral.wait_reset_done(timeout_ms)
    }

    /// Poll from the main loop: resolve the pre-capture reset.
    ///
    /// Taking the follow-up and setting the capture enable happen in one
    /// critical section, so a terminal interrupt is handled either before
    /// (the enable is skipped) or after (it ends a running capture).
    pub fn update(&self) {
        let outcome = self.callback.lock(|_| {
            let outcome = self.peripheral.poll_reset()?;
            if let ResetFollowUp::EnableCapture = outcome.follow_up {
                if outcome.succeeded {
                    self.enable_capture();
                }
            }
            Some(outcome)
        });
        let Some(outcome) = outcome else {
            return;
        };
        match outcome.follow_up {
            ResetFollowUp::EnableCapture if !outcome.succeeded => {
                if self.session() == SessionState::Resetting {
                    self.finish(CaptureEvent::ResetTimeout);
                }
            }
            ResetFollowUp::EnableCapture => {}
            ResetFollowUp::Notify(callback) => callback(outcome.succeeded),
        }
    }

    fn enable_capture(&self) {
        if self
            .session
            .compare_exchange(
                SessionState::Resetting as u8,
                SessionState::Capturing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return;
        }
        self.peripheral.set_receive_enable(true);
        // The enable never outlives the session.
        if self.session() != SessionState::Capturing {
            self.peripheral.set_receive_enable(false);
            return;
        }
        debug!("capture enabled");
    }

    /// Frame-end interrupt: drain the FIFO, then report the frame.
    ///
    /// Only a running capture with FEF set is reported; anything else just
    /// clears the flag. The drain wait is bounded by `fifo_drain_spins`
    /// STATUS polls.
    pub fn on_frame_end(&self) {
        let mut raw = self.peripheral.status();
        if self.session() != SessionState::Capturing || !raw.frame_end() {
            self.peripheral.clear_status(raw.0 & status::FEF);
            return;
        }

        let mut polls = 1u32;
        loop {
            if raw.underrun() {
                self.peripheral.clear_status(status::FEF);
                self.on_error();
                return;
            }
            if raw.fifo_empty() {
                break;
            }
            if polls >= self.fifo_drain_spins {
                self.peripheral.clear_status(status::FEF);
                warn!("FIFO not drained after {} polls", polls);
                self.finish(CaptureEvent::TransferTimeout);
                return;
            }
            raw = self.peripheral.status();
            polls = polls.saturating_add(1);
        }

        self.peripheral.set_receive_enable(false);
        self.peripheral.clear_status(status::FEF);
        // Sample the engine before teardown stops it.
        let transferring = self.dma.is_transferring();
        let mut frame = self.status();
        frame.is_frame_end = true;
        if !transferring {
            frame.received_len = frame.total_len;
        }
        self.finish(CaptureEvent::FrameEnd(frame));
    }

    /// Error interrupt: end the session with only the fault flags reported.
    pub fn on_error(&self) {
        let raw = self.peripheral.status();
        if !raw.has_errors() {
            trace!("capture error interrupt without fault flags");
            return;
        }
        self.peripheral.clear_status(raw.errors());
        if self.session() == SessionState::Idle {
            debug!("stale capture fault flags cleared");
            return;
        }
        warn!("capture fault: status {}", raw.errors());
        self.finish(CaptureEvent::Fault(FrameStatus::errors_only(raw)));
    }

    /// Data-ready interrupt. Data moves by DMA, so the source stays masked.
    pub fn on_data_ready(&self) {
        trace!("capture data-ready interrupt ignored");
    }

    /// DMA transfer-end interrupt: arm the next region or abort.
    pub fn on_dma_transfer_end(&self) {
        if self.session() == SessionState::Idle {
            return;
        }
        match self.scheduler.on_transfer_complete(&self.dma) {
            Ok(Advance::Armed(n)) => debug!("DMA region {} armed", n),
            Ok(Advance::Finished) => debug!("all DMA regions filled"),
            Err(e) => {
                error!("DMA region arm failed: {}", e);
                let frame = self.status();
                self.finish(CaptureEvent::TransferAborted(frame));
            }
        }
    }

    /// The peripheral driver.
    pub fn peripheral(&self) -> &CapturePeripheral<R, I, T> {
        &self.peripheral
    }

    /// The region scheduler.
    pub fn scheduler(&self) -> &RegionScheduler {
        &self.scheduler
    }

    /// The DMA engine.
    pub fn dma(&self) -> &D {
        &self.dma
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use platform::mocks::{MockCaptureRegisters, MockDma, MockInterruptLines, MockTick};

    type TestController<'a> = Controller<
        &'a MockCaptureRegisters,
        &'a MockInterruptLines,
        &'a MockDma,
        &'a MockTick,
    >;

    struct Rig {
        regs: MockCaptureRegisters,
        lines: MockInterruptLines,
        dma: MockDma,
        tick: MockTick,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                regs: MockCaptureRegisters::new(),
                lines: MockInterruptLines::new(),
                dma: MockDma::new(),
                tick: MockTick::stepping(0, 1),
            }
        }

        fn controller(&self) -> TestController<'_> {
            Controller::new(
                &self.regs,
                &self.lines,
                &self.dma,
                &self.tick,
                ControllerConfig::DEFAULT,
            )
        }
    }

    fn ignore(_: &CaptureEvent) {}

    #[test]
    fn test_open_plans_vga_frame() {
        let rig = Rig::new();
        let c = rig.controller();
        c.open(&CaptureConfig::vga_yuv422()).unwrap();
        let table = c.scheduler().regions();
        assert_eq!(table[0].total_bytes(), 393_216);
        assert_eq!(table[1].total_bytes(), 221_184);
        assert_eq!(c.capture_range(), CaptureRange::VGA_YUV422);
        assert!(rig.lines.is_enabled(InterruptLine::DmaTransferEnd));
        assert_eq!(c.status().total_len, 614_400);
    }

    #[test]
    fn test_before_open_not_supported() {
        let rig = Rig::new();
        let c = rig.controller();
        assert_eq!(c.start_capture(ignore), Err(CaptureError::NotSupported));
        assert_eq!(c.stop_capture(), Err(CaptureError::NotSupported));
        assert!(!c.reset(10));
    }

    #[test]
    fn test_session_moves_to_capturing_after_reset() {
        let rig = Rig::new();
        let c = rig.controller();
        c.open(&CaptureConfig::vga_yuv422()).unwrap();
        c.start_capture(ignore).unwrap();
        assert_eq!(c.session(), SessionState::Resetting);
        assert!(!c.is_running());
        c.update();
        assert_eq!(c.session(), SessionState::Capturing);
        assert!(c.is_running());
        assert!(rig.dma.is_running());
    }

    #[test]
    fn test_stop_halts_capturing_session() {
        let rig = Rig::new();
        let c = rig.controller();
        c.open(&CaptureConfig::vga_yuv422()).unwrap();
        c.start_capture(ignore).unwrap();
        c.update();
        c.stop_capture().unwrap();
        assert!(!c.is_running());
        assert!(!rig.dma.is_running());
        assert_eq!(c.session(), SessionState::Idle);
        assert!(!c.peripheral().interrupt_settings().any());
    }

    #[test]
    fn test_reset_refused_during_session() {
        let rig = Rig::new();
        let c = rig.controller();
        c.open(&CaptureConfig::vga_yuv422()).unwrap();
        assert!(c.reset(10));
        c.start_capture(ignore).unwrap();
        assert!(!c.reset(10));
    }

    #[test]
    fn test_range_busy_during_session() {
        let rig = Rig::new();
        let c = rig.controller();
        c.open(&CaptureConfig::vga_yuv422()).unwrap();
        c.start_capture(ignore).unwrap();
        assert_eq!(
            c.set_capture_range(CaptureRange::VGA_YUV422),
            Err(CaptureError::Busy)
        );
        assert_eq!(
            c.set_signal_polarity(SignalPolarity::default()),
            Err(CaptureError::Busy)
        );
    }

    static LAST_EVENT: AtomicU8 = AtomicU8::new(0);

    fn record_kind(e: &CaptureEvent) {
        let kind = match e {
            CaptureEvent::FrameEnd(_) => 1,
            CaptureEvent::TransferTimeout => 2,
            _ => 3,
        };
        LAST_EVENT.store(kind, Ordering::SeqCst);
    }

    fn drain_outcome(drain_polls: u32) -> u8 {
        let rig = Rig::new();
        let c = Controller::new(
            &rig.regs,
            &rig.lines,
            &rig.dma,
            &rig.tick,
            ControllerConfig {
                fifo_drain_spins: 3,
                ..ControllerConfig::DEFAULT
            },
        );
        c.open(&CaptureConfig::vga_yuv422()).unwrap();
        c.start_capture(record_kind).unwrap();
        c.update();
        rig.regs.set_drain_latency(Some(drain_polls));
        rig.regs.raise_frame_end();
        LAST_EVENT.store(0, Ordering::SeqCst);
        c.on_frame_end();
        LAST_EVENT.load(Ordering::SeqCst)
    }

    #[test]
    fn test_drain_wait_is_bounded_by_poll_count() {
        // FIFO empty on the third STATUS poll: inside the bound.
        assert_eq!(drain_outcome(3), 1);
        // Empty only on the fourth: three polls were allowed.
        assert_eq!(drain_outcome(4), 2);
    }

    #[test]
    fn test_frame_end_ignored_while_resetting() {
        let rig = Rig::new();
        let c = rig.controller();
        c.open(&CaptureConfig::vga_yuv422()).unwrap();
        rig.regs.set_reset_latency(None);
        c.start_capture(ignore).unwrap();
        rig.regs.raise_frame_end();
        c.on_frame_end();
        assert_eq!(c.session(), SessionState::Resetting);
        assert_eq!(rig.regs.peek(platform::CaptureRegister::Status) & status::FEF, 0);
        assert!(rig.dma.is_running());
    }
}
