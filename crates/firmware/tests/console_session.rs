//! Console session tests over an in-memory serial port.
//!
//! The session runs against a real controller on the platform mocks, so
//! each command exercises the same path as on target: UART bytes in, line
//! editor, command table, controller, buffered output back out.
// Test file: unwrap and unchecked arithmetic are intentional test mechanisms.
#![allow(
    clippy::unwrap_used,
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing
)]

use std::collections::VecDeque;
use std::convert::Infallible;

use capture_firmware::capture::{CaptureEvent, Controller, ControllerConfig, SessionState};
use capture_firmware::console::{self, Console, ConsoleSession, Control};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use platform::config::{banner, CONSOLE_CR_IDLE_MS, CONSOLE_PROMPT};
use platform::mocks::{MockCaptureRegisters, MockDma, MockInterruptLines, MockTick};
use platform::CaptureConfig;

type TestController = Controller<
    &'static MockCaptureRegisters,
    &'static MockInterruptLines,
    &'static MockDma,
    &'static MockTick,
>;

struct Rig {
    regs: MockCaptureRegisters,
    lines: MockInterruptLines,
    dma: MockDma,
    tick: MockTick,
}

fn init_logging() {
    // Driver logging reaches tracing only with the host-log feature.
    #[cfg(feature = "host-log")]
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn controller() -> (&'static Rig, &'static TestController) {
    init_logging();
    let rig: &'static Rig = Box::leak(Box::new(Rig {
        regs: MockCaptureRegisters::new(),
        lines: MockInterruptLines::new(),
        dma: MockDma::new(),
        tick: MockTick::stepping(0, 1),
    }));
    let c: &'static TestController = Box::leak(Box::new(Controller::new(
        &rig.regs,
        &rig.lines,
        &rig.dma,
        &rig.tick,
        ControllerConfig::DEFAULT,
    )));
    c.open(&CaptureConfig::vga_yuv422()).unwrap();
    (rig, c)
}

/// Serial port fed from a queue of received chunks.
#[derive(Default)]
struct FakeUart {
    rx: VecDeque<Vec<u8>>,
    tx: Vec<u8>,
}

impl FakeUart {
    fn receive(&mut self, bytes: &[u8]) {
        self.rx.push_back(bytes.to_vec());
    }

    fn take_text(&mut self) -> String {
        String::from_utf8(std::mem::take(&mut self.tx)).unwrap()
    }
}

impl embedded_io_async::ErrorType for FakeUart {
    type Error = Infallible;
}

impl embedded_io_async::Read for FakeUart {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let Some(chunk) = self.rx.pop_front() else {
            return Ok(0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        Ok(n)
    }
}

impl embedded_io_async::Write for FakeUart {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.tx.extend_from_slice(buf);
        Ok(buf.len())
    }
}

async fn send(
    uart: &mut FakeUart,
    session: &mut ConsoleSession<&'static TestController>,
    line: &str,
) -> (Control, String) {
    uart.receive(line.as_bytes());
    let control = console::pump(uart, session, 0).await.unwrap();
    (control, uart.take_text())
}

// ── Test A ── banner, echo and help ──────────────────────────────────────────

#[tokio::test]
async fn test_greeting_and_help() {
    let (_, c) = controller();
    let mut session = ConsoleSession::new(Console::new(c));
    let mut uart = FakeUart::default();

    session.greet(banner());
    console::flush(&mut uart, &mut session).await.unwrap();
    assert_eq!(uart.take_text(), format!("{}\n{}", banner(), CONSOLE_PROMPT));

    let (control, out) = send(&mut uart, &mut session, "help\n").await;
    assert_eq!(control, Control::Continue);
    assert!(out.starts_with("help\n"), "{out}");
    assert!(out.contains("pdc - Control PDC (parallel data capture).\n"));
    assert!(out.ends_with(CONSOLE_PROMPT));
}

#[tokio::test]
async fn test_unknown_command_and_quoted_args() {
    let (_, c) = controller();
    let mut session = ConsoleSession::new(Console::new(c));
    let mut uart = FakeUart::default();

    let (_, out) = send(&mut uart, &mut session, "frobnicate\r\n").await;
    assert!(out.contains("Unknown command: frobnicate\n"));

    let (_, out) = send(&mut uart, &mut session, "args \"a b\" c\n").await;
    assert!(out.contains("args[0]:args\nargs[1]:a b\nargs[2]:c\n"), "{out}");
}

// ── Test B ── capture through the console ────────────────────────────────────

#[tokio::test]
async fn test_start_then_frame_end_is_reported() {
    static EVENTS: Signal<CriticalSectionRawMutex, CaptureEvent> = Signal::new();
    fn post(event: &CaptureEvent) {
        EVENTS.signal(*event);
    }

    let (rig, c) = controller();
    let mut session = ConsoleSession::with_events(Console::with_callback(c, post), &EVENTS);
    let mut uart = FakeUart::default();

    let (_, out) = send(&mut uart, &mut session, "pdc start\n").await;
    assert!(out.contains("capture started\n"));
    c.update();
    assert_eq!(c.session(), SessionState::Capturing);

    let (_, out) = send(&mut uart, &mut session, "pdc start\n").await;
    assert!(out.contains("error: capture busy\n"), "{out}");

    rig.dma.advance(6_400);
    rig.regs.raise_frame_end();
    c.on_frame_end();

    assert_eq!(session.poll(0), Control::Continue);
    console::flush(&mut uart, &mut session).await.unwrap();
    assert_eq!(
        uart.take_text(),
        format!("capture frame end: 6400/614400 bytes\n{CONSOLE_PROMPT}")
    );

    // Nothing further is pending.
    session.poll(0);
    assert!(session.output().is_empty());
}

#[tokio::test]
async fn test_default_callback_posts_to_shared_signal() {
    let (rig, c) = controller();
    let mut session = ConsoleSession::new(Console::new(c));
    let mut uart = FakeUart::default();

    send(&mut uart, &mut session, "pdc start\n").await;
    c.update();
    rig.regs.raise_status(platform::capture::status::OVRF);
    c.on_error();

    session.poll(0);
    console::flush(&mut uart, &mut session).await.unwrap();
    assert_eq!(uart.take_text(), format!("capture fault: overrun\n{CONSOLE_PROMPT}"));
}

#[tokio::test]
async fn test_range_and_status() {
    let (_, c) = controller();
    let mut session = ConsoleSession::new(Console::new(c));
    let mut uart = FakeUart::default();

    let (_, out) = send(&mut uart, &mut session, "pdc range 0 320 0 240 2\n").await;
    assert!(out.contains("range: xst=0 xsize=320 yst=0 ysize=240 bpp=2\n"), "{out}");

    let (_, out) = send(&mut uart, &mut session, "pdc range\n").await;
    assert!(out.contains("range: xst=0 xsize=320 yst=0 ysize=240 bpp=2\n"));

    let (_, out) = send(&mut uart, &mut session, "pdc range 0 3 0 5 2\n").await;
    assert!(out.contains("error: invalid argument\n"), "{out}");

    let (_, out) = send(&mut uart, &mut session, "pdc status\n").await;
    assert!(out.contains("receiving: no\n"));
    assert!(out.contains("/153600 bytes\n"), "{out}");
}

#[tokio::test]
async fn test_peripheral_reset_command() {
    let (_, c) = controller();
    let mut session = ConsoleSession::new(Console::new(c));
    let mut uart = FakeUart::default();

    let (_, out) = send(&mut uart, &mut session, "pdc reset 20\n").await;
    assert!(out.contains("reset done\n"));

    let (_, out) = send(&mut uart, &mut session, "pdc reset soon\n").await;
    assert!(out.contains("Invalid argument: soon\n"));
}

// ── Test C ── line endings and system reset ──────────────────────────────────

#[tokio::test]
async fn test_trailing_cr_runs_after_idle() {
    static EVENTS: Signal<CriticalSectionRawMutex, CaptureEvent> = Signal::new();

    let (_, c) = controller();
    let mut session = ConsoleSession::with_events(Console::new(c), &EVENTS);
    let mut uart = FakeUart::default();

    uart.receive(b"pdc polarity\r");
    console::pump(&mut uart, &mut session, 100).await.unwrap();
    assert_eq!(uart.take_text(), "pdc polarity\r");

    session.poll(100 + CONSOLE_CR_IDLE_MS - 1);
    assert!(session.output().is_empty());

    session.poll(100 + CONSOLE_CR_IDLE_MS);
    console::flush(&mut uart, &mut session).await.unwrap();
    assert_eq!(
        uart.take_text(),
        format!("\npolarity: hsync=h vsync=l\n{CONSOLE_PROMPT}")
    );
}

#[tokio::test]
async fn test_reset_command_requests_system_reset() {
    let (_, c) = controller();
    let mut session = ConsoleSession::new(Console::new(c));
    let mut uart = FakeUart::default();

    let (control, out) = send(&mut uart, &mut session, "reset\n").await;
    assert_eq!(control, Control::SystemReset);
    assert!(out.contains("resetting\n"));
}
