//! Capture peripheral configuration
//!
//! Collects every value `open` programs into the peripheral, with
//! validation that runs before any register is touched.
//!
//! # Sensor defaults
//!
//! The board pairs the capture block with a VGA sensor streaming YUV 4:2:2:
//!
//! ```text
//! VSYNC ─┐     ┌──────────────────────────────  low-active
//!        └─────┘
//!        │◄ vst = 10 lines ►│◄ vsz = 480 lines ►│
//!
//! HSYNC ──┐  ┌─────────────────────────────────  high-active
//!         └──┘
//!         │◄ hst = 612 bytes ►│◄ hsz = 1280 bytes ►│
//! ```
//!
//! The pixel clock output feeds the sensor at PCLK/8.

use crate::capture_types::{CaptureWindow, Endianness, InterruptSettings, SignalPolarity};
use crate::interrupt::InterruptPriority;

/// Configuration validation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Capture window outside the register limits.
    #[error("capture window out of range")]
    InvalidWindow,
    /// Pixel clock divider not an even value in 2..=16.
    #[error("pixel clock divider must be even and in 2..=16")]
    InvalidClockDivider,
    /// Interrupt priority outside 1..=15.
    #[error("interrupt priority out of range")]
    InvalidPriority,
    /// A region's base or capacity is not transfer-aligned.
    #[error("capture region is not aligned to the transfer unit")]
    RegionMisaligned,
    /// Capture regions share memory.
    #[error("capture regions overlap")]
    RegionOverlap,
    /// A region wraps the address space, or the layout is empty.
    #[error("capture region exceeds the address space")]
    RegionOverflow,
}

/// Pixel clock output divider (PCLK / n, n even, 2..=16).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct PixelClockDivider(u8);

impl PixelClockDivider {
    /// Sensor default: PCLK / 8.
    pub const DIV8: Self = Self(8);

    /// Create a divider, returning `None` if `n` is odd or outside 2..=16.
    pub fn new(n: u8) -> Option<Self> {
        ((2..=16).contains(&n) && n % 2 == 0).then_some(Self(n))
    }

    /// Divider value.
    pub fn get(self) -> u8 {
        self.0
    }

    /// Encoded PCKDIV field value (`n / 2 - 1`).
    #[allow(clippy::arithmetic_side_effects)] // Safety: n >= 2, so n / 2 >= 1
    pub fn field(self) -> u32 {
        u32::from(self.0 / 2 - 1)
    }
}

impl Default for PixelClockDivider {
    fn default() -> Self {
        Self::DIV8
    }
}

/// Everything `open` writes into the capture peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CaptureConfig {
    /// Capture geometry in register units.
    pub window: CaptureWindow,
    /// Sync polarity.
    pub polarity: SignalPolarity,
    /// FIFO word byte order.
    pub endianness: Endianness,
    /// Drive the pixel clock output pin.
    pub pixel_clock_output: bool,
    /// Raw pixel clock divider (validated in [`validate`](Self::validate)).
    pub pixel_clock_divider: u8,
    /// Raw priority for all capture lines (validated in [`validate`](Self::validate)).
    pub interrupt_priority: u8,
    /// Interrupt enables applied at open.
    pub interrupts: InterruptSettings,
}

impl CaptureConfig {
    /// VGA YUV 4:2:2 sensor defaults; all interrupt sources off until a
    /// capture is started.
    pub const fn vga_yuv422() -> Self {
        Self {
            window: CaptureWindow::new(612, 10, 1280, 480),
            polarity: SignalPolarity::SENSOR_DEFAULT,
            endianness: Endianness::Little,
            pixel_clock_output: true,
            pixel_clock_divider: 8,
            interrupt_priority: 2,
            interrupts: InterruptSettings::NONE,
        }
    }

    /// Validate every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.window.is_valid() {
            return Err(ConfigError::InvalidWindow);
        }
        self.divider()?;
        self.priority()?;
        Ok(())
    }

    /// Validated pixel clock divider.
    pub fn divider(&self) -> Result<PixelClockDivider, ConfigError> {
        PixelClockDivider::new(self.pixel_clock_divider).ok_or(ConfigError::InvalidClockDivider)
    }

    /// Validated interrupt priority.
    pub fn priority(&self) -> Result<InterruptPriority, ConfigError> {
        InterruptPriority::try_new(self.interrupt_priority).map_err(|_| ConfigError::InvalidPriority)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self::vga_yuv422()
    }
}
