//! Capture error types

use platform::{ConfigError, DmaError, InterruptError};

/// Region planning and arming failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt-logging", derive(defmt::Format))]
pub enum RegionError {
    /// A frame of zero bytes cannot be captured.
    #[error("frame size is zero")]
    ZeroLength,
    /// Frame size is not a multiple of the 32-byte transfer unit.
    #[error("frame size is not a multiple of the transfer unit")]
    Misaligned,
    /// Frame does not fit in the configured regions.
    #[error("frame exceeds region capacity")]
    ExceedsCapacity,
    /// Region index past the end of the table.
    #[error("region index out of range")]
    IndexOutOfRange,
    /// Region has no blocks to transfer.
    #[error("region is empty")]
    EmptyRegion,
    /// The DMA engine rejected the region.
    #[error("DMA: {0}")]
    Dma(#[from] DmaError),
}

/// Errors surfaced by the capture driver and controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt-logging", derive(defmt::Format))]
pub enum CaptureError {
    /// Argument outside the accepted range, or a frame that cannot be planned.
    #[error("invalid argument")]
    InvalidArgument,
    /// The peripheral is receiving or resetting.
    #[error("capture busy")]
    Busy,
    /// Operation requires an opened peripheral.
    #[error("capture peripheral not opened")]
    NotSupported,
    /// Interrupt registration or another hardware resource failed.
    #[error("hardware fault")]
    HardwareFault,
    /// Reset did not complete in time.
    #[error("timed out")]
    Timeout,
    /// DMA engine failure.
    #[error("DMA: {0}")]
    Dma(DmaError),
    /// Region table failure while arming.
    #[error("region: {0}")]
    Region(RegionError),
}

impl From<RegionError> for CaptureError {
    fn from(e: RegionError) -> Self {
        match e {
            RegionError::Dma(dma) => Self::Dma(dma),
            RegionError::ZeroLength | RegionError::Misaligned | RegionError::ExceedsCapacity => {
                Self::InvalidArgument
            }
            other => Self::Region(other),
        }
    }
}

impl From<DmaError> for CaptureError {
    fn from(e: DmaError) -> Self {
        Self::Dma(e)
    }
}

impl From<ConfigError> for CaptureError {
    fn from(_: ConfigError) -> Self {
        Self::InvalidArgument
    }
}

impl From<InterruptError> for CaptureError {
    fn from(e: InterruptError) -> Self {
        match e {
            InterruptError::InvalidPriority => Self::InvalidArgument,
            InterruptError::RegistrationFailed => Self::HardwareFault,
        }
    }
}
