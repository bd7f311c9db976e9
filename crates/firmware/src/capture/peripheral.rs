//! Capture peripheral driver
//!
//! Register-level control of the parallel capture block: open/close, the
//! software reset with its deferred follow-up, capture geometry, sync
//! polarity, status and interrupt enables.
//!
//! # Reset follow-up
//!
//! A reset completes in hardware at some later point (it needs a running
//! pixel clock). The driver records what should happen once it does, and
//! the polled [`CapturePeripheral::update`] performs that action when PRST
//! clears or when the reset deadline passes, whichever comes first. Each
//! follow-up fires at most once.
//!
//! ```text
//! request_reset(f) ──► PRST=1 ──► update(): PRST==0 ───► f(succeeded = true)
//!                                   │
//!                                   └─ 500 ms elapsed ──► f(succeeded = false)
//! ```

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use platform::capture::{ctrl0, ctrl1, pack_window, status, unpack_window};
use platform::{
    CaptureConfig, CaptureRegister, CaptureRegisterBus, CaptureWindow, Endianness,
    InterruptLine, InterruptLines, InterruptSettings, RawStatus, SignalPolarity, TickSource,
    TRANSFER_UNIT_BYTES,
};

use super::error::CaptureError;

/// Default deadline for a reset follow-up.
pub const RESET_TIMEOUT_MS: u32 = 500;

/// Busy-wait spent on the reset issued by `open`.
pub const OPEN_RESET_WAIT_MS: u32 = 50;

/// What to do once an outstanding reset resolves.
#[derive(Debug, Clone, Copy)]
pub enum ResetFollowUp {
    /// Set the capture enable if the reset completed.
    EnableCapture,
    /// Report the outcome to a callback.
    Notify(fn(bool)),
}

/// A follow-up that has just been consumed.
#[derive(Debug, Clone, Copy)]
pub struct ResetOutcome {
    /// The consumed follow-up.
    pub follow_up: ResetFollowUp,
    /// `true` if PRST cleared, `false` if the deadline passed first.
    pub succeeded: bool,
}

/// Driver for one capture peripheral instance.
pub struct CapturePeripheral<R, I, T> {
    regs: R,
    lines: I,
    tick: T,
    opened: AtomicBool,
    reset_started_at: AtomicU32,
    follow_up: Mutex<CriticalSectionRawMutex, Cell<Option<ResetFollowUp>>>,
    reset_timeout_ms: u32,
    open_reset_wait_ms: u32,
}

/// Whether a register-unit window is accepted by the hardware and its
/// frame is a whole number of DMA transfer units.
pub fn is_valid_range(hst: u16, vst: u16, hsz: u16, vsz: u16) -> bool {
    let window = CaptureWindow::new(hst, vst, hsz, vsz);
    window.is_valid() && window.frame_bytes() % TRANSFER_UNIT_BYTES == 0
}

impl<R, I, T> CapturePeripheral<R, I, T>
where
    R: CaptureRegisterBus,
    I: InterruptLines,
    T: TickSource,
{
    /// Wrap the register bus, interrupt controller and tick. Nothing is
    /// touched until [`open`](Self::open).
    pub const fn new(regs: R, lines: I, tick: T) -> Self {
        Self {
            regs,
            lines,
            tick,
            opened: AtomicBool::new(false),
            reset_started_at: AtomicU32::new(0),
            follow_up: Mutex::new(Cell::new(None)),
            reset_timeout_ms: RESET_TIMEOUT_MS,
            open_reset_wait_ms: OPEN_RESET_WAIT_MS,
        }
    }

    /// Override the follow-up deadline and the open-time reset wait.
    #[must_use]
    pub fn with_reset_timing(mut self, reset_timeout_ms: u32, open_reset_wait_ms: u32) -> Self {
        self.reset_timeout_ms = reset_timeout_ms;
        self.open_reset_wait_ms = open_reset_wait_ms;
        self
    }

    /// Register the capture interrupt lines and program the peripheral.
    ///
    /// Leaves capture disabled. A reset that does not finish within the
    /// open wait (no pixel clock yet) is logged and does not fail the open.
    /// Calling `open` again on an opened peripheral is a no-op.
    pub fn open(&self, config: &CaptureConfig) -> Result<(), CaptureError> {
        if self.is_open() {
            return Ok(());
        }
        config.validate()?;
        let priority = config.priority()?;
        let divider = config.divider()?;

        for (n, line) in InterruptLine::CAPTURE.iter().enumerate() {
            if let Err(e) = self.lines.register(*line, priority) {
                error!("capture interrupt line {} registration failed: {}", n, e);
                for done in InterruptLine::CAPTURE.iter().take(n) {
                    self.lines.disable(*done);
                }
                return Err(CaptureError::HardwareFault);
            }
        }

        self.regs.write(CaptureRegister::Control1, 0);
        let mut c0 = ctrl0::PCKE
            | config.polarity.to_ctrl0_bits()
            | config.interrupts.to_ctrl0_bits()
            | (divider.field().wrapping_shl(ctrl0::PCKDIV_SHIFT) & ctrl0::PCKDIV_MASK);
        if config.pixel_clock_output {
            c0 |= ctrl0::PCKOE;
        }
        if config.endianness == Endianness::Big {
            c0 |= ctrl0::EDS;
        }
        self.regs.write(CaptureRegister::Control0, c0);
        self.write_window(&config.window);
        self.regs.write(CaptureRegister::Status, status::CLEARABLE);

        self.opened.store(true, Ordering::Release);
        self.start_reset(None);
        if !self.wait_reset_done(self.open_reset_wait_ms) {
            warn!(
                "capture reset still pending after {} ms (pixel clock not running?)",
                self.open_reset_wait_ms
            );
        }
        info!(
            "capture peripheral opened: hsz={} vsz={} pckdiv={}",
            config.window.hsz,
            config.window.vsz,
            divider.get()
        );
        Ok(())
    }

    /// Disable capture and interrupts, release the lines, drop any pending
    /// follow-up.
    pub fn close(&self) {
        if !self.is_open() {
            return;
        }
        self.regs.clear_bits(CaptureRegister::Control1, ctrl1::PCE);
        self.regs.clear_bits(CaptureRegister::Control0, ctrl0::INTERRUPT_MASK);
        for line in InterruptLine::CAPTURE {
            self.lines.disable(line);
            self.lines.clear_pending(line);
        }
        self.cancel_reset_follow_up();
        self.opened.store(false, Ordering::Release);
        info!("capture peripheral closed");
    }

    /// Whether [`open`](Self::open) has completed.
    pub fn is_open(&self) -> bool {
        self.opened.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<(), CaptureError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(CaptureError::NotSupported)
        }
    }

    /// Set or clear the capture enable. Unconditional register write.
    pub fn set_receive_enable(&self, enable: bool) {
        if enable {
            self.regs.set_bits(CaptureRegister::Control1, ctrl1::PCE);
        } else {
            self.regs.clear_bits(CaptureRegister::Control1, ctrl1::PCE);
        }
    }

    /// Capture enable is set.
    pub fn is_receiving(&self) -> bool {
        self.regs.read(CaptureRegister::Control1) & ctrl1::PCE != 0
    }

    /// Reset in progress.
    pub fn is_resetting(&self) -> bool {
        self.regs.read(CaptureRegister::Control0) & ctrl0::PRST != 0
    }

    fn start_reset(&self, follow_up: Option<ResetFollowUp>) {
        self.reset_started_at
            .store(self.tick.now_ms(), Ordering::Release);
        self.follow_up.lock(|slot| slot.set(follow_up));
        self.regs.set_bits(CaptureRegister::Control0, ctrl0::PRST);
        debug!("capture reset requested");
    }

    /// Start a reset and record what to do once it resolves, replacing any
    /// follow-up that has not fired yet.
    pub fn request_reset(&self, follow_up: Option<ResetFollowUp>) -> Result<(), CaptureError> {
        self.ensure_open()?;
        self.start_reset(follow_up);
        Ok(())
    }

    /// Drop the pending follow-up without running it.
    pub fn cancel_reset_follow_up(&self) -> Option<ResetFollowUp> {
        self.follow_up.lock(Cell::take)
    }

    /// Whether a follow-up is waiting on the current reset.
    pub fn reset_pending(&self) -> bool {
        self.follow_up.lock(Cell::get).is_some()
    }

    /// Busy-wait until PRST clears or `timeout_ms` passes.
    ///
    /// Returns whether the reset completed.
    pub fn wait_reset_done(&self, timeout_ms: u32) -> bool {
        let start = self.tick.now_ms();
        loop {
            if !self.is_resetting() {
                return true;
            }
            if self.tick.elapsed_since(start) >= timeout_ms {
                return !self.is_resetting();
            }
        }
    }

    /// Program the capture window in register units.
    pub fn set_position_size(&self, window: &CaptureWindow) -> Result<(), CaptureError> {
        self.ensure_open()?;
        if self.is_receiving() {
            return Err(CaptureError::Busy);
        }
        if !is_valid_range(window.hst, window.vst, window.hsz, window.vsz) {
            return Err(CaptureError::InvalidArgument);
        }
        self.write_window(window);
        Ok(())
    }

    fn write_window(&self, window: &CaptureWindow) {
        self.regs
            .write(CaptureRegister::VerticalCapture, pack_window(window.vst, window.vsz));
        self.regs
            .write(CaptureRegister::HorizontalCapture, pack_window(window.hst, window.hsz));
    }

    /// Current capture window in register units.
    pub fn position_size(&self) -> CaptureWindow {
        let (vst, vsz) = unpack_window(self.regs.read(CaptureRegister::VerticalCapture));
        let (hst, hsz) = unpack_window(self.regs.read(CaptureRegister::HorizontalCapture));
        CaptureWindow { hst, vst, hsz, vsz }
    }

    /// Set the sync input polarity.
    pub fn set_signal_polarity(&self, polarity: SignalPolarity) -> Result<(), CaptureError> {
        self.ensure_open()?;
        if self.is_receiving() {
            return Err(CaptureError::Busy);
        }
        self.regs.modify(CaptureRegister::Control0, |v| {
            (v & !(ctrl0::HPS | ctrl0::VPS)) | polarity.to_ctrl0_bits()
        });
        Ok(())
    }

    /// Current sync input polarity.
    pub fn signal_polarity(&self) -> SignalPolarity {
        SignalPolarity::from_ctrl0_bits(self.regs.read(CaptureRegister::Control0))
    }

    /// Read STATUS. The read arms the write-1-to-clear latch.
    pub fn status(&self) -> RawStatus {
        RawStatus(self.regs.read(CaptureRegister::Status))
    }

    /// Clear STATUS flags previously observed by [`status`](Self::status).
    pub fn clear_status(&self, mask: u32) {
        let mask = mask & status::CLEARABLE;
        if mask != 0 {
            self.regs.write(CaptureRegister::Status, mask);
        }
    }

    /// Set the interrupt enables.
    pub fn set_interrupt_settings(&self, settings: InterruptSettings) -> Result<(), CaptureError> {
        self.ensure_open()?;
        if self.is_receiving() {
            return Err(CaptureError::Busy);
        }
        self.write_interrupt_enables(settings);
        Ok(())
    }

    /// Mask every capture interrupt source regardless of state.
    pub fn disable_interrupts(&self) {
        self.write_interrupt_enables(InterruptSettings::NONE);
    }

    fn write_interrupt_enables(&self, settings: InterruptSettings) {
        self.regs.modify(CaptureRegister::Control0, |v| {
            (v & !ctrl0::INTERRUPT_MASK) | settings.to_ctrl0_bits()
        });
    }

    /// Current interrupt enables.
    pub fn interrupt_settings(&self) -> InterruptSettings {
        InterruptSettings::from_ctrl0_bits(self.regs.read(CaptureRegister::Control0))
    }

    /// Take the pending follow-up once PRST clears or the deadline passes.
    ///
    /// The slot is emptied inside the critical section, so a follow-up is
    /// handed out at most once. The caller performs the action.
    pub fn poll_reset(&self) -> Option<ResetOutcome> {
        if !self.is_open() {
            return None;
        }
        let started = self.reset_started_at.load(Ordering::Acquire);
        let outcome = self.follow_up.lock(|slot| {
            let follow_up = slot.get()?;
            let done = !self.is_resetting();
            if !done && self.tick.elapsed_since(started) < self.reset_timeout_ms {
                return None;
            }
            slot.set(None);
            Some(ResetOutcome {
                follow_up,
                succeeded: done,
            })
        })?;
        if !outcome.succeeded {
            warn!("capture reset timed out after {} ms", self.reset_timeout_ms);
        }
        Some(outcome)
    }

    /// Resolve a pending reset follow-up and run it.
    pub fn update(&self) -> Option<ResetOutcome> {
        let outcome = self.poll_reset()?;
        match outcome.follow_up {
            ResetFollowUp::EnableCapture if outcome.succeeded => self.set_receive_enable(true),
            ResetFollowUp::EnableCapture => {}
            ResetFollowUp::Notify(callback) => callback(outcome.succeeded),
        }
        Some(outcome)
    }

    /// Interrupt controller used for the capture lines.
    pub fn interrupt_lines(&self) -> &I {
        &self.lines
    }

    /// Millisecond tick shared with the controller.
    pub fn tick(&self) -> &T {
        &self.tick
    }
}
