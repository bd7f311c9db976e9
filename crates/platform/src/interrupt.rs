//! Interrupt line control
//!
//! The capture subsystem uses four interrupt lines: three from the capture
//! peripheral and one from the DMA channel. Lines are registered (priority
//! set, pending cleared, enabled) once at open and disabled at close.

use crate::capture_types::OutOfRangeError;

/// Interrupt lines owned by the capture subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptLine {
    /// Capture receive-data-ready.
    CaptureDataReady,
    /// Capture frame end.
    CaptureFrameEnd,
    /// Capture overrun/underrun/geometry error.
    CaptureError,
    /// DMA transfer end.
    DmaTransferEnd,
}

impl InterruptLine {
    /// Lines raised by the capture peripheral itself.
    pub const CAPTURE: [Self; 3] = [
        Self::CaptureDataReady,
        Self::CaptureFrameEnd,
        Self::CaptureError,
    ];

    /// Every line.
    pub const ALL: [Self; 4] = [
        Self::CaptureDataReady,
        Self::CaptureFrameEnd,
        Self::CaptureError,
        Self::DmaTransferEnd,
    ];

    /// Dense index `0..4`.
    pub const fn index(self) -> usize {
        match self {
            Self::CaptureDataReady => 0,
            Self::CaptureFrameEnd => 1,
            Self::CaptureError => 2,
            Self::DmaTransferEnd => 3,
        }
    }
}

/// Errors raised while registering an interrupt line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptError {
    /// The controller rejected the line (no vector, already claimed).
    #[error("interrupt line registration failed")]
    RegistrationFailed,
    /// Priority outside the supported range.
    #[error("interrupt priority out of range")]
    InvalidPriority,
}

/// Interrupt priority level, 1 (lowest usable) to 15 (highest).
///
/// Level 0 is reserved: a line at level 0 never preempts anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct InterruptPriority(u8);

impl InterruptPriority {
    /// Lowest usable level.
    pub const MIN: u8 = 1;
    /// Highest level.
    pub const MAX: u8 = 15;
    /// Capture subsystem default.
    pub const CAPTURE_DEFAULT: Self = Self(2);

    /// Create a priority, returning an error outside `1..=15`.
    pub fn try_new(level: u8) -> Result<Self, OutOfRangeError> {
        if (Self::MIN..=Self::MAX).contains(&level) {
            Ok(Self(level))
        } else {
            Err(OutOfRangeError {
                value: u32::from(level),
                min: u32::from(Self::MIN),
                max: u32::from(Self::MAX),
            })
        }
    }

    /// Return the level.
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for InterruptPriority {
    fn default() -> Self {
        Self::CAPTURE_DEFAULT
    }
}

/// Interrupt controller access for the capture lines.
pub trait InterruptLines {
    /// Set the priority of a line.
    fn set_priority(
        &self,
        line: InterruptLine,
        priority: InterruptPriority,
    ) -> Result<(), InterruptError>;

    /// Unmask a line.
    fn enable(&self, line: InterruptLine) -> Result<(), InterruptError>;

    /// Mask a line.
    fn disable(&self, line: InterruptLine);

    /// Drop any pending request on a line.
    fn clear_pending(&self, line: InterruptLine);

    /// Priority, pending clear and enable in one step.
    fn register(
        &self,
        line: InterruptLine,
        priority: InterruptPriority,
    ) -> Result<(), InterruptError> {
        self.set_priority(line, priority)?;
        self.clear_pending(line);
        self.enable(line)
    }
}

impl<T: InterruptLines + ?Sized> InterruptLines for &T {
    fn set_priority(
        &self,
        line: InterruptLine,
        priority: InterruptPriority,
    ) -> Result<(), InterruptError> {
        (**self).set_priority(line, priority)
    }

    fn enable(&self, line: InterruptLine) -> Result<(), InterruptError> {
        (**self).enable(line)
    }

    fn disable(&self, line: InterruptLine) {
        (**self).disable(line);
    }

    fn clear_pending(&self, line: InterruptLine) {
        (**self).clear_pending(line);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_bounds() {
        assert!(InterruptPriority::try_new(0).is_err());
        assert!(InterruptPriority::try_new(16).is_err());
        assert_eq!(InterruptPriority::try_new(15).unwrap().get(), 15);
        assert_eq!(InterruptPriority::default().get(), 2);
    }

    #[test]
    fn test_line_indices_are_dense() {
        for (i, line) in InterruptLine::ALL.iter().enumerate() {
            assert_eq!(line.index(), i);
        }
    }
}
