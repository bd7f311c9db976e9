//! Console line editor
//!
//! Byte-at-a-time line assembly with echo. A line runs when:
//!
//! - an LF arrives (after it is echoed),
//! - any byte other than LF follows a trailing CR (before that byte is
//!   stored), or
//! - the line ends in CR and no input has arrived for
//!   [`CONSOLE_CR_IDLE_MS`](platform::config::CONSOLE_CR_IDLE_MS).
//!
//! Backspace removes the last byte and is echoed only if there was one.
//! Once the buffer is full further bytes are dropped without echo, but an
//! LF still runs the line.

use platform::config::{CONSOLE_CR_IDLE_MS, CONSOLE_LINE_BYTES};

/// ASCII backspace.
pub const BS: u8 = 0x08;
/// ASCII line feed.
pub const LF: u8 = 0x0a;
/// ASCII carriage return.
pub const CR: u8 = 0x0d;

/// Bytes a line may hold, leaving room for the terminator.
pub const MAX_LINE: usize = CONSOLE_LINE_BYTES.saturating_sub(2);

/// Output of [`LineEditor::push`] and [`LineEditor::poll_idle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorEvent<'a> {
    /// Byte to send back to the terminal.
    Echo(u8),
    /// A complete line, including any trailing CR or LF.
    Line(&'a [u8]),
}

/// Line assembly state.
pub struct LineEditor {
    buf: [u8; CONSOLE_LINE_BYTES],
    len: usize,
    last_input_ms: u32,
}

impl LineEditor {
    /// Empty line.
    pub const fn new() -> Self {
        Self {
            buf: [0; CONSOLE_LINE_BYTES],
            len: 0,
            last_input_ms: 0,
        }
    }

    /// Bytes collected so far.
    pub fn pending(&self) -> &[u8] {
        self.buf.get(..self.len).unwrap_or(&[])
    }

    fn ends_with_cr(&self) -> bool {
        self.pending().last() == Some(&CR)
    }

    /// Feed one received byte.
    pub fn push(&mut self, byte: u8, now_ms: u32, mut emit: impl FnMut(EditorEvent<'_>)) {
        self.last_input_ms = now_ms;

        if byte == BS {
            if self.len > 0 {
                self.len = self.len.saturating_sub(1);
                emit(EditorEvent::Echo(BS));
            }
        } else {
            if byte != LF && self.ends_with_cr() {
                self.run(&mut emit);
            }
            if self.len < MAX_LINE {
                if let Some(slot) = self.buf.get_mut(self.len) {
                    *slot = byte;
                    self.len = self.len.saturating_add(1);
                    emit(EditorEvent::Echo(byte));
                }
            }
        }

        if byte == LF {
            self.run(&mut emit);
        }
    }

    /// Run a CR-terminated line once input has been idle long enough.
    ///
    /// Returns whether a line ran.
    pub fn poll_idle(&mut self, now_ms: u32, mut emit: impl FnMut(EditorEvent<'_>)) -> bool {
        if now_ms.wrapping_sub(self.last_input_ms) >= CONSOLE_CR_IDLE_MS && self.ends_with_cr() {
            self.run(&mut emit);
            true
        } else {
            false
        }
    }

    fn run(&mut self, emit: &mut impl FnMut(EditorEvent<'_>)) {
        emit(EditorEvent::Line(self.pending()));
        self.len = 0;
    }
}

impl Default for LineEditor {
    fn default() -> Self {
        Self::new()
    }
}
