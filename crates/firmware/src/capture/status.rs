//! Frame status and capture events

use platform::RawStatus;

/// Byte-level snapshot of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-logging", derive(defmt::Format))]
#[allow(clippy::struct_excessive_bools)] // one flag per status bit
pub struct FrameStatus {
    /// Capture enable is set.
    pub is_receiving: bool,
    /// Peripheral reset in progress.
    pub is_resetting: bool,
    /// A frame is being received.
    pub is_data_receiving: bool,
    /// FIFO holds no data.
    pub is_fifo_empty: bool,
    /// Frame end detected.
    pub is_frame_end: bool,
    /// Overrun detected.
    pub has_overrun: bool,
    /// Underrun detected.
    pub has_underrun: bool,
    /// Vertical line-count error.
    pub has_vline_err: bool,
    /// Horizontal byte-count error.
    pub has_hsize_err: bool,
    /// Bytes the DMA engine has written so far.
    pub received_len: u32,
    /// Bytes expected for a complete frame.
    pub total_len: u32,
}

impl FrameStatus {
    /// Decode the STATUS flags; control flags and lengths are left clear.
    pub fn from_raw(raw: RawStatus) -> Self {
        Self {
            is_data_receiving: raw.frame_busy(),
            is_fifo_empty: raw.fifo_empty(),
            is_frame_end: raw.frame_end(),
            has_overrun: raw.overrun(),
            has_underrun: raw.underrun(),
            has_vline_err: raw.vparam_error(),
            has_hsize_err: raw.hparam_error(),
            ..Self::default()
        }
    }

    /// Only the fault flags of `raw`, with every other field clear.
    pub fn errors_only(raw: RawStatus) -> Self {
        Self {
            has_overrun: raw.overrun(),
            has_underrun: raw.underrun(),
            has_vline_err: raw.vparam_error(),
            has_hsize_err: raw.hparam_error(),
            ..Self::default()
        }
    }

    /// Whether any fault flag is set.
    pub fn has_errors(&self) -> bool {
        self.has_overrun || self.has_underrun || self.has_vline_err || self.has_hsize_err
    }

    /// Whether every expected byte has arrived.
    pub fn is_complete(&self) -> bool {
        self.total_len != 0 && self.received_len == self.total_len
    }
}

/// Terminal notifications delivered to the capture callback.
///
/// Exactly one event ends a started capture session, unless the session is
/// stopped explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-logging", derive(defmt::Format))]
pub enum CaptureEvent {
    /// Frame received and FIFO drained.
    FrameEnd(FrameStatus),
    /// Overrun, underrun or geometry error; only the fault flags are set.
    Fault(FrameStatus),
    /// FIFO did not drain after frame end.
    TransferTimeout,
    /// The reset that precedes capture did not complete.
    ResetTimeout,
    /// The next DMA region could not be armed.
    TransferAborted(FrameStatus),
}

impl CaptureEvent {
    /// Status carried by the event, if any.
    pub fn status(&self) -> Option<&FrameStatus> {
        match self {
            Self::FrameEnd(s) | Self::Fault(s) | Self::TransferAborted(s) => Some(s),
            Self::TransferTimeout | Self::ResetTimeout => None,
        }
    }

    /// Short name for logs and the console.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FrameEnd(_) => "frame end",
            Self::Fault(_) => "fault",
            Self::TransferTimeout => "transfer timeout",
            Self::ResetTimeout => "reset timeout",
            Self::TransferAborted(_) => "transfer aborted",
        }
    }
}

/// Completion callback, invoked from interrupt context or the polling loop.
pub type CaptureCallback = fn(&CaptureEvent);
