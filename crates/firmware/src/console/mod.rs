//! Serial command console
//!
//! [`ConsoleSession`] owns the line editor and an output buffer; the serial
//! task feeds it received bytes and writes back whatever it produced.
//! Capture callbacks run in interrupt context, so they only post the event
//! to [`CAPTURE_EVENTS`]; the session renders it on its next poll.
//!
//! ```text
//! UART rx ─► LineEditor ─► Console::execute ─► CaptureControl
//!                                   │
//! ISR ─► on_capture_event ─► CAPTURE_EVENTS ─► ConsoleSession::poll
//!                                   │
//!                                   ▼
//!                           OutputBuffer ─► UART tx
//! ```

pub mod commands;
pub mod line;
pub mod tokenize;

pub use commands::{write_event, write_status, Console, Control};
pub use line::{EditorEvent, LineEditor};
pub use tokenize::{tokenize, Args};

use core::fmt;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use crate::capture::{CaptureControl, CaptureEvent};

/// Bytes of console output buffered between flushes.
pub const OUTPUT_BYTES: usize = 1024;

/// Latest terminal capture event, waiting to be printed.
pub static CAPTURE_EVENTS: Signal<CriticalSectionRawMutex, CaptureEvent> = Signal::new();

/// Capture callback used by the console: posts the event for rendering.
pub fn on_capture_event(event: &CaptureEvent) {
    CAPTURE_EVENTS.signal(*event);
}

/// Fixed-capacity byte sink. Output past capacity is dropped.
pub struct OutputBuffer {
    buf: heapless::Vec<u8, OUTPUT_BYTES>,
    overflowed: bool,
}

impl OutputBuffer {
    /// Empty buffer.
    pub const fn new() -> Self {
        Self {
            buf: heapless::Vec::new(),
            overflowed: false,
        }
    }

    /// Append one raw byte.
    pub fn push_byte(&mut self, byte: u8) {
        if self.buf.push(byte).is_err() {
            self.overflowed = true;
        }
    }

    /// Buffered bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Whether anything is waiting to be sent.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Drop the buffered bytes; returns whether any output was lost.
    pub fn clear(&mut self) -> bool {
        self.buf.clear();
        core::mem::take(&mut self.overflowed)
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Write for OutputBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.buf.extend_from_slice(s.as_bytes()).is_err() {
            self.overflowed = true;
            return Err(fmt::Error);
        }
        Ok(())
    }
}

fn line_str(line: &[u8]) -> &str {
    match core::str::from_utf8(line) {
        Ok(s) => s,
        Err(e) => line
            .get(..e.valid_up_to())
            .and_then(|valid| core::str::from_utf8(valid).ok())
            .unwrap_or(""),
    }
}

/// Execute a completed line, starting its output on a fresh line.
fn run_line<C: CaptureControl>(console: &Console<C>, bytes: &[u8], out: &mut OutputBuffer) -> Control {
    if bytes.last() != Some(&line::LF) {
        out.push_byte(line::LF);
    }
    console.execute(line_str(bytes), out)
}

/// Line editor, interpreter and output buffer for one serial port.
pub struct ConsoleSession<C> {
    console: Console<C>,
    editor: LineEditor,
    out: OutputBuffer,
    events: &'static Signal<CriticalSectionRawMutex, CaptureEvent>,
}

impl<C: CaptureControl> ConsoleSession<C> {
    /// Session reading capture events from [`CAPTURE_EVENTS`].
    pub fn new(console: Console<C>) -> Self {
        Self::with_events(console, &CAPTURE_EVENTS)
    }

    /// Session reading capture events from `events`.
    pub fn with_events(
        console: Console<C>,
        events: &'static Signal<CriticalSectionRawMutex, CaptureEvent>,
    ) -> Self {
        Self {
            console,
            editor: LineEditor::new(),
            out: OutputBuffer::new(),
            events,
        }
    }

    /// Queue the banner and the first prompt.
    pub fn greet(&mut self, banner: &str) {
        let _ = fmt::Write::write_str(&mut self.out, banner);
        let _ = fmt::Write::write_str(&mut self.out, "\n");
        self.console.prompt(&mut self.out);
    }

    /// Feed received bytes; returns [`Control::SystemReset`] if a command
    /// asked for one.
    pub fn feed(&mut self, bytes: &[u8], now_ms: u32) -> Control {
        let Self {
            console,
            editor,
            out,
            ..
        } = self;
        let mut control = Control::Continue;
        for &byte in bytes {
            editor.push(byte, now_ms, |ev| match ev {
                EditorEvent::Echo(b) => out.push_byte(b),
                EditorEvent::Line(line) => {
                    if run_line(console, line, &mut *out) == Control::SystemReset {
                        control = Control::SystemReset;
                    }
                }
            });
        }
        control
    }

    /// Idle-time work: run a CR-terminated line and print capture events.
    pub fn poll(&mut self, now_ms: u32) -> Control {
        let Self {
            console,
            editor,
            out,
            events,
        } = self;
        let mut control = Control::Continue;
        editor.poll_idle(now_ms, |ev| {
            if let EditorEvent::Line(line) = ev {
                control = run_line(console, line, &mut *out);
            }
        });
        if let Some(event) = events.try_take() {
            let _ = write_event(&mut *out, &event);
            console.prompt(&mut *out);
        }
        control
    }

    /// The command interpreter.
    pub fn console(&self) -> &Console<C> {
        &self.console
    }

    /// Output produced since the last [`take_output`](Self::take_output).
    pub fn output(&self) -> &[u8] {
        self.out.as_bytes()
    }

    /// Discard buffered output after it has been sent.
    pub fn take_output(&mut self) {
        if self.out.clear() {
            warn!("console output truncated");
        }
    }
}

/// Read once from `io`, run what arrived and write the output back.
pub async fn pump<IO, C>(
    io: &mut IO,
    session: &mut ConsoleSession<C>,
    now_ms: u32,
) -> Result<Control, IO::Error>
where
    IO: embedded_io_async::Read + embedded_io_async::Write,
    C: CaptureControl,
{
    let mut rx = [0u8; 64];
    let n = io.read(&mut rx).await?;
    let control = session.feed(rx.get(..n).unwrap_or(&[]), now_ms);
    flush(io, session).await?;
    Ok(control)
}

/// Write out and discard whatever the session has buffered.
pub async fn flush<W, C>(io: &mut W, session: &mut ConsoleSession<C>) -> Result<(), W::Error>
where
    W: embedded_io_async::Write,
    C: CaptureControl,
{
    if !session.output().is_empty() {
        io.write_all(session.output()).await?;
        io.flush().await?;
    }
    session.take_output();
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use fmt::Write as _;

    #[test]
    fn test_output_buffer_overflow_is_reported_once() {
        let mut out = OutputBuffer::new();
        let chunk = [b'x'; 100];
        for _ in 0..(OUTPUT_BYTES / chunk.len()) {
            out.write_str(core::str::from_utf8(&chunk).unwrap()).unwrap();
        }
        assert!(out.write_str("0123456789abcdefghijklmnopqrstuvwxyz").is_err());
        assert!(out.clear());
        assert!(!out.clear());
        assert!(out.is_empty());
    }

    #[test]
    fn test_line_str_keeps_valid_prefix() {
        assert_eq!(line_str(b"help\r\n"), "help\r\n");
        assert_eq!(line_str(&[b'h', b'i', 0xff, b'x']), "hi");
    }
}
