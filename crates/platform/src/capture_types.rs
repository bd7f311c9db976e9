//! Capture domain newtypes.
//!
//! - `BytesPerPixel`: 1, 2 or 3 bytes per sampled pixel
//! - `CaptureWindow`: geometry in register units (lines and bytes)
//! - `CaptureRange`: geometry in pixel units plus bytes per pixel
//! - `SignalPolarity`, `Endianness`: sync and data format
//! - `InterruptSettings`: the six per-source interrupt enables
//! - `RawStatus`: a snapshot of the STATUS register

use crate::capture::{ctrl0, status};
use crate::memory::TRANSFER_UNIT_BYTES;

// ── Error type ───────────────────────────────────────────────────────────────

/// Error returned when a value is out of the valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutOfRangeError {
    /// The value that was out of range.
    pub value: u32,
    /// The inclusive minimum allowed value.
    pub min: u32,
    /// The inclusive maximum allowed value.
    pub max: u32,
}

impl core::fmt::Display for OutOfRangeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "value {} out of range {}..={}",
            self.value, self.min, self.max
        )
    }
}

// ── BytesPerPixel ────────────────────────────────────────────────────────────

/// Bytes per captured pixel.
///
/// 1 for 8-bit mono, 2 for YUV 4:2:2 / RGB565, 3 for RGB888.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct BytesPerPixel(u8);

impl BytesPerPixel {
    /// Smallest supported pixel width.
    pub const MIN: u8 = 1;
    /// Largest supported pixel width.
    pub const MAX: u8 = 3;

    /// YUV 4:2:2, the sensor default.
    pub const YUV422: Self = Self(2);

    /// Create a `BytesPerPixel`, returning an error outside `1..=3`.
    pub fn try_new(value: u8) -> Result<Self, OutOfRangeError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(OutOfRangeError {
                value: u32::from(value),
                min: u32::from(Self::MIN),
                max: u32::from(Self::MAX),
            })
        }
    }

    /// Return the byte count.
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for BytesPerPixel {
    fn default() -> Self {
        Self::YUV422
    }
}

// ── CaptureWindow ────────────────────────────────────────────────────────────

/// Capture geometry in register units.
///
/// `hst`/`hsz` count bytes from the trailing HSYNC edge, `vst`/`vsz` count
/// lines from the trailing VSYNC edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CaptureWindow {
    /// Horizontal start, bytes.
    pub hst: u16,
    /// Vertical start, lines.
    pub vst: u16,
    /// Horizontal size, bytes.
    pub hsz: u16,
    /// Vertical size, lines.
    pub vsz: u16,
}

impl CaptureWindow {
    /// Largest horizontal start.
    pub const HST_MAX: u16 = 0x0FFB;
    /// Largest vertical start.
    pub const VST_MAX: u16 = 0x0FFE;
    /// Smallest horizontal size.
    pub const HSZ_MIN: u16 = 4;
    /// Largest horizontal size.
    pub const HSZ_MAX: u16 = 0x0FFF;
    /// Smallest vertical size.
    pub const VSZ_MIN: u16 = 1;
    /// Largest vertical size.
    pub const VSZ_MAX: u16 = 0x0FFF;
    /// Upper bound on `hst + hsz`.
    pub const H_LIMIT: u32 = 0x0FFF;
    /// Upper bound on `vst + vsz`.
    pub const V_LIMIT: u32 = 0x0FFF;

    /// Construct without validation.
    pub const fn new(hst: u16, vst: u16, hsz: u16, vsz: u16) -> Self {
        Self { hst, vst, hsz, vsz }
    }

    /// Whether every field lies in its legal register range.
    #[allow(clippy::arithmetic_side_effects)] // Safety: u16 + u16 widened to u32 cannot overflow
    pub fn is_valid(&self) -> bool {
        self.hst <= Self::HST_MAX
            && self.vst <= Self::VST_MAX
            && (Self::HSZ_MIN..=Self::HSZ_MAX).contains(&self.hsz)
            && (Self::VSZ_MIN..=Self::VSZ_MAX).contains(&self.vsz)
            && u32::from(self.hst) + u32::from(self.hsz) <= Self::H_LIMIT
            && u32::from(self.vst) + u32::from(self.vsz) <= Self::V_LIMIT
    }

    /// Bytes delivered per frame (`hsz * vsz`).
    #[allow(clippy::arithmetic_side_effects)] // Safety: 12-bit × 12-bit fits in u32
    pub fn frame_bytes(&self) -> u32 {
        u32::from(self.hsz) * u32::from(self.vsz)
    }
}

// ── CaptureRange ─────────────────────────────────────────────────────────────

/// Capture geometry in pixel units.
///
/// Converted to a [`CaptureWindow`] by scaling the horizontal fields by
/// `bpp`. A range is usable only if its frame size is a whole number of
/// DMA transfer units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CaptureRange {
    /// Horizontal start, pixels.
    pub xst: u16,
    /// Horizontal size, pixels.
    pub xsize: u16,
    /// Vertical start, lines.
    pub yst: u16,
    /// Vertical size, lines.
    pub ysize: u16,
    /// Bytes per pixel.
    pub bpp: BytesPerPixel,
}

impl CaptureRange {
    /// 640×480 YUV 4:2:2 starting after a 306-pixel, 10-line back porch.
    pub const VGA_YUV422: Self = Self {
        xst: 306,
        xsize: 640,
        yst: 10,
        ysize: 480,
        bpp: BytesPerPixel::YUV422,
    };

    /// Total bytes per frame, or `None` on overflow.
    pub fn frame_bytes(&self) -> Option<u32> {
        u32::from(self.xsize)
            .checked_mul(u32::from(self.bpp.get()))?
            .checked_mul(u32::from(self.ysize))
    }

    /// Whether the frame is a non-empty whole number of transfer units.
    pub fn is_transfer_aligned(&self) -> bool {
        matches!(self.frame_bytes(), Some(n) if n > 0 && n % TRANSFER_UNIT_BYTES == 0)
    }

    /// Scale to register units. `None` if a scaled field exceeds 16 bits.
    pub fn to_window(&self) -> Option<CaptureWindow> {
        let bpp = u16::from(self.bpp.get());
        Some(CaptureWindow {
            hst: self.xst.checked_mul(bpp)?,
            vst: self.yst,
            hsz: self.xsize.checked_mul(bpp)?,
            vsz: self.ysize,
        })
    }

    /// Recover pixel units from register units for a given `bpp`.
    #[allow(clippy::arithmetic_side_effects)] // Safety: bpp is 1..=3, never zero
    pub fn from_window(window: &CaptureWindow, bpp: BytesPerPixel) -> Self {
        let b = u16::from(bpp.get());
        Self {
            xst: window.hst / b,
            xsize: window.hsz / b,
            yst: window.vst,
            ysize: window.vsz,
            bpp,
        }
    }
}

impl Default for CaptureRange {
    fn default() -> Self {
        Self::VGA_YUV422
    }
}

// ── SignalPolarity / Endianness ──────────────────────────────────────────────

/// Active level of the sync inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SignalPolarity {
    /// HSYNC is active high.
    pub hsync_active_high: bool,
    /// VSYNC is active high.
    pub vsync_active_high: bool,
}

impl SignalPolarity {
    /// Sensor default: HSYNC high-active, VSYNC low-active.
    pub const SENSOR_DEFAULT: Self = Self {
        hsync_active_high: true,
        vsync_active_high: false,
    };

    /// CTRL0 polarity bits (HPS/VPS are set for active-low signals).
    pub fn to_ctrl0_bits(self) -> u32 {
        let mut bits = 0;
        if !self.hsync_active_high {
            bits |= ctrl0::HPS;
        }
        if !self.vsync_active_high {
            bits |= ctrl0::VPS;
        }
        bits
    }

    /// Decode polarity from a CTRL0 value.
    pub fn from_ctrl0_bits(value: u32) -> Self {
        Self {
            hsync_active_high: value & ctrl0::HPS == 0,
            vsync_active_high: value & ctrl0::VPS == 0,
        }
    }
}

impl Default for SignalPolarity {
    fn default() -> Self {
        Self::SENSOR_DEFAULT
    }
}

/// Byte order of 32-bit FIFO words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Endianness {
    /// First sampled byte in the least significant position.
    #[default]
    Little,
    /// First sampled byte in the most significant position.
    Big,
}

// ── InterruptSettings ────────────────────────────────────────────────────────

/// Per-source interrupt enables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(clippy::struct_excessive_bools)] // one bit per hardware enable
pub struct InterruptSettings {
    /// Receive data ready.
    pub data_ready: bool,
    /// Frame end.
    pub frame_end: bool,
    /// Overrun.
    pub overrun: bool,
    /// Underrun.
    pub underrun: bool,
    /// Vertical line-count error.
    pub vparam_error: bool,
    /// Horizontal byte-count error.
    pub hparam_error: bool,
}

impl InterruptSettings {
    /// Everything off.
    pub const NONE: Self = Self {
        data_ready: false,
        frame_end: false,
        overrun: false,
        underrun: false,
        vparam_error: false,
        hparam_error: false,
    };

    /// Sources that terminate a DMA-driven capture.
    pub const TRANSFER: Self = Self {
        data_ready: false,
        frame_end: true,
        overrun: true,
        underrun: true,
        vparam_error: true,
        hparam_error: true,
    };

    /// CTRL0 interrupt-enable bits.
    pub fn to_ctrl0_bits(self) -> u32 {
        [
            (self.data_ready, ctrl0::DFIE),
            (self.frame_end, ctrl0::FEIE),
            (self.overrun, ctrl0::OVIE),
            (self.underrun, ctrl0::UDRIE),
            (self.vparam_error, ctrl0::VERIE),
            (self.hparam_error, ctrl0::HERIE),
        ]
        .iter()
        .filter(|(on, _)| *on)
        .fold(0, |acc, (_, bit)| acc | bit)
    }

    /// Decode from a CTRL0 value.
    pub fn from_ctrl0_bits(value: u32) -> Self {
        Self {
            data_ready: value & ctrl0::DFIE != 0,
            frame_end: value & ctrl0::FEIE != 0,
            overrun: value & ctrl0::OVIE != 0,
            underrun: value & ctrl0::UDRIE != 0,
            vparam_error: value & ctrl0::VERIE != 0,
            hparam_error: value & ctrl0::HERIE != 0,
        }
    }

    /// Whether any source is enabled.
    pub fn any(self) -> bool {
        self.to_ctrl0_bits() != 0
    }
}

// ── RawStatus ────────────────────────────────────────────────────────────────

/// Snapshot of the STATUS register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct RawStatus(pub u32);

impl RawStatus {
    /// A frame is being received.
    pub fn frame_busy(self) -> bool {
        self.0 & status::FBSY != 0
    }

    /// FIFO holds no data.
    pub fn fifo_empty(self) -> bool {
        self.0 & status::FEMPF != 0
    }

    /// Frame end detected.
    pub fn frame_end(self) -> bool {
        self.0 & status::FEF != 0
    }

    /// Overrun detected.
    pub fn overrun(self) -> bool {
        self.0 & status::OVRF != 0
    }

    /// Underrun detected.
    pub fn underrun(self) -> bool {
        self.0 & status::UDRF != 0
    }

    /// Vertical line-count error detected.
    pub fn vparam_error(self) -> bool {
        self.0 & status::VERF != 0
    }

    /// Horizontal byte-count error detected.
    pub fn hparam_error(self) -> bool {
        self.0 & status::HERF != 0
    }

    /// Only the fault flags.
    pub fn errors(self) -> u32 {
        self.0 & status::ERRORS
    }

    /// Whether any fault flag is set.
    pub fn has_errors(self) -> bool {
        self.errors() != 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // ── Test A ────────────────────────────────────────────────────────────────
    /// Register-range boundaries are inclusive exactly where documented.
    #[test]
    fn test_window_boundaries() {
        assert!(CaptureWindow::new(0, 0, 4, 1).is_valid());
        assert!(CaptureWindow::new(0, 0, 0x0FFF, 0x0FFF).is_valid());
        assert!(!CaptureWindow::new(0, 0, 3, 1).is_valid());
        assert!(!CaptureWindow::new(0, 0, 4, 0).is_valid());
        assert!(!CaptureWindow::new(0x0FFC, 0, 4, 1).is_valid());
        assert!(!CaptureWindow::new(0, 0x0FFF, 4, 1).is_valid());
        assert!(CaptureWindow::new(0x0FFB, 0x0FFE, 4, 1).is_valid());
        assert!(!CaptureWindow::new(0x0FFB, 0x0FFE, 5, 1).is_valid());
    }

    // ── Test B ────────────────────────────────────────────────────────────────
    /// Start + size must stay inside the 12-bit counter.
    #[test]
    fn test_window_sum_limit() {
        assert!(CaptureWindow::new(612, 10, 1280, 480).is_valid());
        assert!(!CaptureWindow::new(3000, 10, 1280, 480).is_valid());
        assert!(!CaptureWindow::new(0, 4000, 8, 96).is_valid());
    }

    // ── Test C ────────────────────────────────────────────────────────────────
    /// VGA YUV 4:2:2 is 614400 bytes and aligned to 32-byte requests.
    #[test]
    fn test_vga_frame_bytes() {
        let range = CaptureRange::VGA_YUV422;
        assert_eq!(range.frame_bytes(), Some(614_400));
        assert!(range.is_transfer_aligned());
        let window = range.to_window().unwrap();
        assert_eq!(window, CaptureWindow::new(612, 10, 1280, 480));
        assert_eq!(window.frame_bytes(), 614_400);
    }

    #[test]
    fn test_unaligned_range_detected() {
        let range = CaptureRange {
            xst: 0,
            xsize: 5,
            yst: 0,
            ysize: 3,
            bpp: BytesPerPixel::try_new(1).unwrap(),
        };
        assert!(!range.is_transfer_aligned());
    }

    #[test]
    fn test_window_round_trip_through_pixels() {
        let bpp = BytesPerPixel::try_new(3).unwrap();
        let range = CaptureRange {
            xst: 10,
            xsize: 32,
            yst: 2,
            ysize: 4,
            bpp,
        };
        let window = range.to_window().unwrap();
        assert_eq!(window.hst, 30);
        assert_eq!(window.hsz, 96);
        assert_eq!(CaptureRange::from_window(&window, bpp), range);
    }

    #[test]
    fn test_bytes_per_pixel_bounds() {
        assert!(BytesPerPixel::try_new(0).is_err());
        assert!(BytesPerPixel::try_new(4).is_err());
        assert_eq!(BytesPerPixel::try_new(3).unwrap().get(), 3);
    }

    #[test]
    fn test_polarity_bits() {
        let bits = SignalPolarity::SENSOR_DEFAULT.to_ctrl0_bits();
        assert_eq!(bits, ctrl0::VPS);
        assert_eq!(
            SignalPolarity::from_ctrl0_bits(bits),
            SignalPolarity::SENSOR_DEFAULT
        );
    }

    #[test]
    fn test_interrupt_settings_round_trip() {
        let bits = InterruptSettings::TRANSFER.to_ctrl0_bits();
        assert_eq!(bits & ctrl0::DFIE, 0);
        assert_eq!(bits.count_ones(), 5);
        assert_eq!(
            InterruptSettings::from_ctrl0_bits(bits),
            InterruptSettings::TRANSFER
        );
        assert!(!InterruptSettings::NONE.any());
    }

    #[test]
    fn test_raw_status_accessors() {
        let s = RawStatus(status::OVRF | status::FEMPF);
        assert!(s.overrun());
        assert!(s.fifo_empty());
        assert!(!s.underrun());
        assert_eq!(s.errors(), status::OVRF);
    }
}
