//! Mock implementations for testing
//!
//! This module provides mock implementations of all platform traits
//! for use in unit and integration tests. Every mock is `Sync` so that a
//! controller built on top of it can be shared with interrupt-dispatch code
//! through a `&'static` reference, exactly as on target.

#![cfg(any(test, feature = "std"))]

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::capture::{ctrl0, status, CaptureRegister, CaptureRegisterBus};
use crate::dma::{DmaEngine, DmaError, DmaTransfer};
use crate::interrupt::{InterruptError, InterruptLine, InterruptLines, InterruptPriority};
use crate::tick::TickSource;

// ── Capture registers ────────────────────────────────────────────────────────

struct RegisterState {
    regs: [u32; CaptureRegister::ALL.len()],
    writes: [u32; CaptureRegister::ALL.len()],
    /// STATUS bits observed set by the most recent STATUS read.
    status_latch: u32,
    /// CTRL0 reads left before PRST self-clears; `None` while idle or stuck.
    reset_countdown: Option<u32>,
    /// CTRL0 reads a reset takes; `None` means the reset never completes.
    reset_latency: Option<u32>,
    /// STATUS reads left before FEMPF rises; `None` while idle or stuck.
    drain_countdown: Option<u32>,
    /// STATUS reads before FEMPF rises after a frame end; `None` means never.
    drain_latency: Option<u32>,
    /// STATUS reads before UDRF is raised; `None` disables injection.
    underrun_countdown: Option<u32>,
    data_words: u32,
}

impl RegisterState {
    fn on_read(&mut self, reg: CaptureRegister) -> u32 {
        match reg {
            CaptureRegister::Control0 => self.tick_reset(),
            CaptureRegister::Status => {
                self.tick_drain();
                self.tick_underrun();
                self.status_latch = self.get(CaptureRegister::Status);
            }
            CaptureRegister::Data => {
                self.data_words = self.data_words.wrapping_add(1);
                return self.data_words;
            }
            _ => {}
        }
        self.get(reg)
    }

    fn on_write(&mut self, reg: CaptureRegister, value: u32) {
        self.count_write(reg);
        match reg {
            CaptureRegister::Status => {
                let clear = value & status::CLEARABLE & self.status_latch;
                let current = self.get(CaptureRegister::Status);
                self.set(CaptureRegister::Status, current & !clear);
                self.status_latch &= !clear;
            }
            CaptureRegister::Control0 => {
                let was_resetting = self.get(reg) & ctrl0::PRST != 0;
                self.set(reg, value);
                if value & ctrl0::PRST != 0 && !was_resetting {
                    self.begin_reset();
                } else if value & ctrl0::PRST == 0 && was_resetting {
                    // PRST is read-only once set; a write cannot cancel it.
                    self.set(reg, value | ctrl0::PRST);
                }
            }
            CaptureRegister::Monitor | CaptureRegister::Data => {}
            _ => self.set(reg, value),
        }
    }

    fn begin_reset(&mut self) {
        self.set(CaptureRegister::Status, status::FEMPF);
        self.status_latch = 0;
        match self.reset_latency {
            Some(0) => {
                let v = self.get(CaptureRegister::Control0);
                self.set(CaptureRegister::Control0, v & !ctrl0::PRST);
                self.reset_countdown = None;
            }
            other => self.reset_countdown = other,
        }
    }

    fn tick_reset(&mut self) {
        if let Some(n) = self.reset_countdown {
            if n <= 1 {
                let v = self.get(CaptureRegister::Control0);
                self.set(CaptureRegister::Control0, v & !ctrl0::PRST);
                self.reset_countdown = None;
            } else {
                self.reset_countdown = Some(n.saturating_sub(1));
            }
        }
    }

    fn tick_drain(&mut self) {
        if let Some(n) = self.drain_countdown {
            if n <= 1 {
                let v = self.get(CaptureRegister::Status);
                self.set(CaptureRegister::Status, v | status::FEMPF);
                self.drain_countdown = None;
            } else {
                self.drain_countdown = Some(n.saturating_sub(1));
            }
        }
    }

    fn tick_underrun(&mut self) {
        if let Some(n) = self.underrun_countdown {
            if n <= 1 {
                let v = self.get(CaptureRegister::Status);
                self.set(CaptureRegister::Status, v | status::UDRF);
                self.underrun_countdown = None;
            } else {
                self.underrun_countdown = Some(n.saturating_sub(1));
            }
        }
    }

    fn get(&self, reg: CaptureRegister) -> u32 {
        self.regs.get(reg.index()).copied().unwrap_or(0)
    }

    fn set(&mut self, reg: CaptureRegister, value: u32) {
        if let Some(slot) = self.regs.get_mut(reg.index()) {
            *slot = value;
        }
    }

    fn count_write(&mut self, reg: CaptureRegister) {
        if let Some(slot) = self.writes.get_mut(reg.index()) {
            *slot = slot.saturating_add(1);
        }
    }
}

/// Register-level model of the capture peripheral.
///
/// - PRST self-clears after a configurable number of CTRL0 reads, or never.
/// - STATUS flags clear only when written 1 after being read as 1.
/// - After [`raise_frame_end`](Self::raise_frame_end) the FIFO can be made to
///   drain after N STATUS polls, or never.
pub struct MockCaptureRegisters {
    state: Mutex<CriticalSectionRawMutex, RefCell<RegisterState>>,
}

impl Default for MockCaptureRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCaptureRegisters {
    /// Idle peripheral: FIFO empty, reset completes on the first CTRL0 read.
    pub fn new() -> Self {
        let mut regs = [0; CaptureRegister::ALL.len()];
        if let Some(slot) = regs.get_mut(CaptureRegister::Status.index()) {
            *slot = status::FEMPF;
        }
        Self {
            state: Mutex::new(RefCell::new(RegisterState {
                regs,
                writes: [0; CaptureRegister::ALL.len()],
                status_latch: 0,
                reset_countdown: None,
                reset_latency: Some(1),
                drain_countdown: None,
                drain_latency: Some(0),
                underrun_countdown: None,
                data_words: 0,
            })),
        }
    }

    fn with<U>(&self, f: impl FnOnce(&mut RegisterState) -> U) -> U {
        self.state.lock(|s| f(&mut s.borrow_mut()))
    }

    /// CTRL0 reads a reset takes before PRST clears; `None` = never.
    pub fn set_reset_latency(&self, reads: Option<u32>) {
        self.with(|s| s.reset_latency = reads);
    }

    /// STATUS polls before the FIFO reports empty after a frame end; `None` = never.
    pub fn set_drain_latency(&self, polls: Option<u32>) {
        self.with(|s| s.drain_latency = polls);
    }

    /// Raise UDRF after `polls` STATUS reads.
    pub fn inject_underrun_after(&self, polls: u32) {
        self.with(|s| s.underrun_countdown = Some(polls));
    }

    /// Complete an outstanding reset immediately.
    pub fn finish_reset(&self) {
        self.with(|s| {
            let v = s.get(CaptureRegister::Control0);
            s.set(CaptureRegister::Control0, v & !ctrl0::PRST);
            s.reset_countdown = None;
        });
    }

    /// Set STATUS flags as the hardware would.
    pub fn raise_status(&self, bits: u32) {
        self.with(|s| {
            let v = s.get(CaptureRegister::Status);
            s.set(CaptureRegister::Status, v | bits);
        });
    }

    /// Signal frame end with data still in the FIFO.
    pub fn raise_frame_end(&self) {
        self.with(|s| {
            let v = s.get(CaptureRegister::Status);
            match s.drain_latency {
                Some(0) => s.set(CaptureRegister::Status, v | status::FEF | status::FEMPF),
                other => {
                    s.set(CaptureRegister::Status, (v | status::FEF) & !status::FEMPF);
                    s.drain_countdown = other;
                }
            }
        });
    }

    /// Raw register value without read side effects.
    pub fn peek(&self, reg: CaptureRegister) -> u32 {
        self.with(|s| s.get(reg))
    }

    /// Overwrite a register without write side effects.
    pub fn poke(&self, reg: CaptureRegister, value: u32) {
        self.with(|s| s.set(reg, value));
    }

    /// Number of bus writes to `reg` so far.
    pub fn write_count(&self, reg: CaptureRegister) -> u32 {
        self.with(|s| s.writes.get(reg.index()).copied().unwrap_or(0))
    }

    /// Total bus writes to every register.
    pub fn total_writes(&self) -> u32 {
        self.with(|s| s.writes.iter().fold(0u32, |a, w| a.saturating_add(*w)))
    }
}

impl CaptureRegisterBus for MockCaptureRegisters {
    fn read(&self, reg: CaptureRegister) -> u32 {
        self.with(|s| s.on_read(reg))
    }

    fn write(&self, reg: CaptureRegister, value: u32) {
        self.with(|s| s.on_write(reg, value));
    }
}

// ── DMA engine ───────────────────────────────────────────────────────────────

struct DmaState {
    configured: Option<DmaTransfer>,
    history: heapless::Vec<DmaTransfer, 16>,
    running: bool,
    remaining: u32,
    starts: u32,
    stops: u32,
    fail_configure_at: Option<u32>,
}

/// DMA channel model with manual progress control.
pub struct MockDma {
    state: Mutex<CriticalSectionRawMutex, RefCell<DmaState>>,
}

impl Default for MockDma {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDma {
    /// Idle, unconfigured channel.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(DmaState {
                configured: None,
                history: heapless::Vec::new(),
                running: false,
                remaining: 0,
                starts: 0,
                stops: 0,
                fail_configure_at: None,
            })),
        }
    }

    fn with<U>(&self, f: impl FnOnce(&mut DmaState) -> U) -> U {
        self.state.lock(|s| f(&mut s.borrow_mut()))
    }

    /// Make the n-th (0-based) `configure` call fail with `EngineFault`.
    pub fn fail_configure_at(&self, call: u32) {
        self.with(|s| s.fail_configure_at = Some(call));
    }

    /// Move `bytes` of the current transfer.
    pub fn advance(&self, bytes: u32) {
        self.with(|s| {
            if s.running {
                s.remaining = s.remaining.saturating_sub(bytes);
            }
        });
    }

    /// Finish the current transfer; the channel disables itself.
    pub fn complete(&self) {
        self.with(|s| {
            s.remaining = 0;
            s.running = false;
        });
    }

    /// Force the remaining-count readback.
    pub fn set_remaining(&self, bytes: u32) {
        self.with(|s| s.remaining = bytes);
    }

    /// Most recently configured transfer.
    pub fn configured(&self) -> Option<DmaTransfer> {
        self.with(|s| s.configured)
    }

    /// Every transfer configured so far, oldest first.
    pub fn history(&self) -> heapless::Vec<DmaTransfer, 16> {
        self.with(|s| s.history.clone())
    }

    /// Whether the channel is enabled.
    pub fn is_running(&self) -> bool {
        self.with(|s| s.running)
    }

    /// Number of `start` calls.
    pub fn start_count(&self) -> u32 {
        self.with(|s| s.starts)
    }

    /// Number of `stop` calls.
    pub fn stop_count(&self) -> u32 {
        self.with(|s| s.stops)
    }
}

impl DmaEngine for MockDma {
    fn configure(&self, transfer: &DmaTransfer) -> Result<(), DmaError> {
        self.with(|s| {
            let call = u32::try_from(s.history.len()).unwrap_or(u32::MAX);
            if s.fail_configure_at == Some(call) {
                s.fail_configure_at = None;
                return Err(DmaError::EngineFault);
            }
            let _ = s.history.push(*transfer);
            s.configured = Some(*transfer);
            s.remaining = transfer.total_bytes();
            s.running = false;
            Ok(())
        })
    }

    fn start(&self) {
        self.with(|s| {
            s.starts = s.starts.saturating_add(1);
            if s.configured.is_some() && s.remaining > 0 {
                s.running = true;
            }
        });
    }

    fn stop(&self) {
        self.with(|s| {
            s.stops = s.stops.saturating_add(1);
            s.running = false;
        });
    }

    fn remaining_bytes(&self) -> u32 {
        self.with(|s| s.remaining)
    }

    fn is_transferring(&self) -> bool {
        self.with(|s| s.running && s.remaining > 0)
    }
}

// ── Interrupt lines ──────────────────────────────────────────────────────────

/// Interrupt controller model.
#[derive(Default)]
pub struct MockInterruptLines {
    enabled: [AtomicBool; 4],
    pending_clears: [AtomicU32; 4],
    priority: [AtomicU8; 4],
    /// Bit n set: line with index n fails to enable.
    fail_mask: AtomicU8,
}

impl MockInterruptLines {
    /// All lines masked.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `line` fail registration.
    pub fn fail_line(&self, line: InterruptLine) {
        self.fail_mask
            .fetch_or(line_bit(line), Ordering::SeqCst);
    }

    /// Whether `line` is unmasked.
    pub fn is_enabled(&self, line: InterruptLine) -> bool {
        self.enabled
            .get(line.index())
            .is_some_and(|e| e.load(Ordering::SeqCst))
    }

    /// Priority last set on `line` (0 if never set).
    pub fn priority(&self, line: InterruptLine) -> u8 {
        self.priority
            .get(line.index())
            .map_or(0, |p| p.load(Ordering::SeqCst))
    }

    /// Number of pending-clears issued on `line`.
    pub fn pending_clears(&self, line: InterruptLine) -> u32 {
        self.pending_clears
            .get(line.index())
            .map_or(0, |p| p.load(Ordering::SeqCst))
    }
}

fn line_bit(line: InterruptLine) -> u8 {
    match line {
        InterruptLine::CaptureDataReady => 0x1,
        InterruptLine::CaptureFrameEnd => 0x2,
        InterruptLine::CaptureError => 0x4,
        InterruptLine::DmaTransferEnd => 0x8,
    }
}

impl InterruptLines for MockInterruptLines {
    fn set_priority(
        &self,
        line: InterruptLine,
        priority: InterruptPriority,
    ) -> Result<(), InterruptError> {
        if let Some(p) = self.priority.get(line.index()) {
            p.store(priority.get(), Ordering::SeqCst);
        }
        Ok(())
    }

    fn enable(&self, line: InterruptLine) -> Result<(), InterruptError> {
        if self.fail_mask.load(Ordering::SeqCst) & line_bit(line) != 0 {
            return Err(InterruptError::RegistrationFailed);
        }
        if let Some(e) = self.enabled.get(line.index()) {
            e.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    fn disable(&self, line: InterruptLine) {
        if let Some(e) = self.enabled.get(line.index()) {
            e.store(false, Ordering::SeqCst);
        }
    }

    fn clear_pending(&self, line: InterruptLine) {
        if let Some(p) = self.pending_clears.get(line.index()) {
            p.fetch_add(1, Ordering::SeqCst);
        }
    }
}

// ── Tick source ──────────────────────────────────────────────────────────────

/// Manually driven millisecond clock.
///
/// Each `now_ms` read advances the clock by `step` so that tick-bounded
/// busy-waits terminate in tests.
pub struct MockTick {
    now: AtomicU32,
    step: AtomicU32,
}

impl Default for MockTick {
    fn default() -> Self {
        Self::new(0)
    }
}

impl MockTick {
    /// Frozen clock at `start`.
    pub fn new(start: u32) -> Self {
        Self {
            now: AtomicU32::new(start),
            step: AtomicU32::new(0),
        }
    }

    /// Clock at `start` advancing `step` ms per read.
    pub fn stepping(start: u32, step: u32) -> Self {
        Self {
            now: AtomicU32::new(start),
            step: AtomicU32::new(step),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, ms: u32) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    /// Jump to an absolute time.
    pub fn set(&self, ms: u32) {
        self.now.store(ms, Ordering::SeqCst);
    }

    /// Change the per-read step.
    pub fn set_step(&self, step: u32) {
        self.step.store(step, Ordering::SeqCst);
    }
}

impl TickSource for MockTick {
    fn now_ms(&self) -> u32 {
        let step = self.step.load(Ordering::SeqCst);
        self.now.fetch_add(step, Ordering::SeqCst)
    }
}
