//! Console commands
//!
//! | Command | Action |
//! |---|---|
//! | `args` | Echo the parsed tokens |
//! | `help` | List commands |
//! | `reset` | Request a system reset |
//! | `pdc status` | Print flags and byte progress |
//! | `pdc start` / `pdc stop` | Start one capture / halt capture |
//! | `pdc reset [ms]` | Reset the capture peripheral |
//! | `pdc range [xst xsize yst ysize bpp]` | Get or set the capture range |
//! | `pdc polarity [h\|l h\|l]` | Get or set HSYNC/VSYNC polarity |

use core::fmt::{self, Write};

use platform::config::CONSOLE_PROMPT;
use platform::{BytesPerPixel, CaptureRange, SignalPolarity};

use super::tokenize::{tokenize, Args};
use super::on_capture_event;
use crate::capture::peripheral::RESET_TIMEOUT_MS;
use crate::capture::{CaptureCallback, CaptureControl, CaptureEvent, FrameStatus};

/// What the caller should do after a command ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Keep reading input.
    Continue,
    /// Reset the system.
    SystemReset,
}

struct Entry {
    name: &'static str,
    help: &'static str,
}

const COMMANDS: [Entry; 4] = [
    Entry { name: "args", help: "Print arguments." },
    Entry { name: "help", help: "Print help message." },
    Entry { name: "reset", help: "Reset software." },
    Entry { name: "pdc", help: "Control PDC (parallel data capture)." },
];

const PDC_COMMANDS: [Entry; 6] = [
    Entry { name: "status", help: "Print capture status." },
    Entry { name: "start", help: "Capture one frame." },
    Entry { name: "stop", help: "Stop capturing." },
    Entry { name: "reset", help: "Reset the peripheral: reset [timeout_ms]" },
    Entry { name: "range", help: "Capture range: range [xst xsize yst ysize bpp]" },
    Entry { name: "polarity", help: "Sync polarity: polarity [h|l h|l]" },
];

/// Command interpreter bound to a capture controller.
pub struct Console<C> {
    capture: C,
    callback: CaptureCallback,
}

impl<C: CaptureControl> Console<C> {
    /// Console whose captures report through [`on_capture_event`].
    pub fn new(capture: C) -> Self {
        Self::with_callback(capture, on_capture_event)
    }

    /// Console whose captures report to `callback`.
    pub fn with_callback(capture: C, callback: CaptureCallback) -> Self {
        Self { capture, callback }
    }

    /// The controller commands act on.
    pub fn capture(&self) -> &C {
        &self.capture
    }

    /// Write the prompt.
    pub fn prompt<W: Write>(&self, out: &mut W) {
        let _ = out.write_str(CONSOLE_PROMPT);
    }

    /// Run one command line and write the prompt after it.
    pub fn execute<W: Write>(&self, line: &str, out: &mut W) -> Control {
        let args = tokenize(line);
        let control = match args.first() {
            Some(&name) => self.dispatch(name, &args, out).unwrap_or(Control::Continue),
            None => Control::Continue,
        };
        self.prompt(out);
        control
    }

    fn dispatch<W: Write>(&self, name: &str, args: &Args<'_>, out: &mut W) -> Result<Control, fmt::Error> {
        match name {
            "args" => {
                for (i, arg) in args.iter().enumerate() {
                    writeln!(out, "args[{i}]:{arg}")?;
                }
            }
            "help" => {
                for entry in &COMMANDS {
                    writeln!(out, "{} - {}", entry.name, entry.help)?;
                }
            }
            "reset" => {
                writeln!(out, "resetting")?;
                return Ok(Control::SystemReset);
            }
            "pdc" => self.pdc(args, out)?,
            other => writeln!(out, "Unknown command: {other}")?,
        }
        Ok(Control::Continue)
    }

    fn pdc<W: Write>(&self, args: &Args<'_>, out: &mut W) -> fmt::Result {
        let Some(&sub) = args.get(1) else {
            for entry in &PDC_COMMANDS {
                writeln!(out, "pdc {} - {}", entry.name, entry.help)?;
            }
            return Ok(());
        };
        let params = args.get(2..).unwrap_or(&[]);

        match sub {
            "status" => write_status(out, &self.capture.status()),
            "start" => match self.capture.start_capture(self.callback) {
                Ok(()) => writeln!(out, "capture started"),
                Err(e) => writeln!(out, "error: {e}"),
            },
            "stop" => match self.capture.stop_capture() {
                Ok(()) => writeln!(out, "capture stopped"),
                Err(e) => writeln!(out, "error: {e}"),
            },
            "reset" => {
                let timeout = match params.first() {
                    Some(tok) => match tok.parse::<u32>() {
                        Ok(ms) => ms,
                        Err(_) => return writeln!(out, "Invalid argument: {tok}"),
                    },
                    None => RESET_TIMEOUT_MS,
                };
                if self.capture.reset(timeout) {
                    writeln!(out, "reset done")
                } else {
                    writeln!(out, "reset failed")
                }
            }
            "range" => self.range(params, out),
            "polarity" => self.polarity(params, out),
            other => writeln!(out, "Unknown subcommand: {other}"),
        }
    }

    fn range<W: Write>(&self, params: &[&str], out: &mut W) -> fmt::Result {
        match params {
            [] => write_range(out, &self.capture.capture_range()),
            [xst, xsize, yst, ysize, bpp] => {
                let Some(range) = parse_range(xst, xsize, yst, ysize, bpp) else {
                    return writeln!(out, "error: invalid argument");
                };
                match self.capture.set_capture_range(range) {
                    Ok(()) => write_range(out, &range),
                    Err(e) => writeln!(out, "error: {e}"),
                }
            }
            _ => writeln!(out, "usage: pdc range [xst xsize yst ysize bpp]"),
        }
    }

    fn polarity<W: Write>(&self, params: &[&str], out: &mut W) -> fmt::Result {
        match params {
            [] => write_polarity(out, self.capture.signal_polarity()),
            [h, v] => {
                let (Some(hsync_active_high), Some(vsync_active_high)) = (parse_level(h), parse_level(v)) else {
                    return writeln!(out, "usage: pdc polarity [h|l h|l]");
                };
                let polarity = SignalPolarity {
                    hsync_active_high,
                    vsync_active_high,
                };
                match self.capture.set_signal_polarity(polarity) {
                    Ok(()) => write_polarity(out, polarity),
                    Err(e) => writeln!(out, "error: {e}"),
                }
            }
            _ => writeln!(out, "usage: pdc polarity [h|l h|l]"),
        }
    }
}

fn parse_range(xst: &str, xsize: &str, yst: &str, ysize: &str, bpp: &str) -> Option<CaptureRange> {
    Some(CaptureRange {
        xst: xst.parse().ok()?,
        xsize: xsize.parse().ok()?,
        yst: yst.parse().ok()?,
        ysize: ysize.parse().ok()?,
        bpp: BytesPerPixel::try_new(bpp.parse().ok()?).ok()?,
    })
}

fn parse_level(tok: &str) -> Option<bool> {
    match tok {
        "h" | "H" => Some(true),
        "l" | "L" => Some(false),
        _ => None,
    }
}

fn level(active_high: bool) -> &'static str {
    if active_high {
        "h"
    } else {
        "l"
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn write_range<W: Write>(out: &mut W, r: &CaptureRange) -> fmt::Result {
    writeln!(
        out,
        "range: xst={} xsize={} yst={} ysize={} bpp={}",
        r.xst,
        r.xsize,
        r.yst,
        r.ysize,
        r.bpp.get()
    )
}

fn write_polarity<W: Write>(out: &mut W, p: SignalPolarity) -> fmt::Result {
    writeln!(
        out,
        "polarity: hsync={} vsync={}",
        level(p.hsync_active_high),
        level(p.vsync_active_high)
    )
}

/// Render a status snapshot, one field per line.
pub fn write_status<W: Write>(out: &mut W, s: &FrameStatus) -> fmt::Result {
    writeln!(out, "receiving: {}", yes_no(s.is_receiving))?;
    writeln!(out, "resetting: {}", yes_no(s.is_resetting))?;
    writeln!(out, "data receiving: {}", yes_no(s.is_data_receiving))?;
    writeln!(out, "fifo empty: {}", yes_no(s.is_fifo_empty))?;
    writeln!(out, "frame end: {}", yes_no(s.is_frame_end))?;
    writeln!(out, "overrun: {}", yes_no(s.has_overrun))?;
    writeln!(out, "underrun: {}", yes_no(s.has_underrun))?;
    writeln!(out, "vline error: {}", yes_no(s.has_vline_err))?;
    writeln!(out, "hsize error: {}", yes_no(s.has_hsize_err))?;
    writeln!(out, "received: {}/{} bytes", s.received_len, s.total_len)
}

/// Render a terminal capture event on one line.
pub fn write_event<W: Write>(out: &mut W, event: &CaptureEvent) -> fmt::Result {
    write!(out, "capture {}", event.name())?;
    match event {
        CaptureEvent::Fault(s) => {
            write!(out, ":")?;
            for (set, name) in [
                (s.has_overrun, "overrun"),
                (s.has_underrun, "underrun"),
                (s.has_vline_err, "vline"),
                (s.has_hsize_err, "hsize"),
            ] {
                if set {
                    write!(out, " {name}")?;
                }
            }
            writeln!(out)
        }
        CaptureEvent::FrameEnd(s) | CaptureEvent::TransferAborted(s) => {
            writeln!(out, ": {}/{} bytes", s.received_len, s.total_len)
        }
        CaptureEvent::TransferTimeout | CaptureEvent::ResetTimeout => writeln!(out),
    }
}
