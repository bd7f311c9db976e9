//! Parallel capture peripheral register abstraction
//!
//! The capture block samples an 8-bit parallel pixel bus into a 32-bit FIFO
//! under VSYNC/HSYNC timing control and raises a DMA request every
//! [`TRANSFER_UNIT_BYTES`](crate::memory::TRANSFER_UNIT_BYTES) bytes.
//!
//! # Register map
//!
//! ```text
//! Offset  Name     Fields
//! 0x00    CTRL0    PCKE[0] VPS[1] HPS[2] PRST[3] DFIE[4] FEIE[5] OVIE[6]
//!                  UDRIE[7] VERIE[8] HERIE[9] PCKOE[10] PCKDIV[13:11] EDS[14]
//! 0x04    CTRL1    PCE[0]
//! 0x08    STATUS   FBSY[0] FEMPF[1] FEF[2] OVRF[3] UDRF[4] VERF[5] HERF[6]
//! 0x0C    MONITOR  VSYNC[0] HSYNC[1]
//! 0x10    DATA     32-bit FIFO read port
//! 0x14    VCR      VST[11:0] VSZ[27:16]
//! 0x18    HCR      HST[11:0] HSZ[27:16]
//! ```
//!
//! STATUS flags are write-1-to-clear, but a clear only takes effect for bits
//! that were observed set by a preceding read of STATUS. Writing a flag that
//! has not been read first is ignored by the hardware.

/// Capture peripheral registers, addressed by byte offset from the block base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CaptureRegister {
    /// Control register 0: clocking, polarity, reset, interrupt enables.
    Control0,
    /// Control register 1: capture enable.
    Control1,
    /// Status flags (read, then write-1-to-clear).
    Status,
    /// Live sync-pin monitor.
    Monitor,
    /// FIFO read port.
    Data,
    /// Vertical capture window (start line, line count).
    VerticalCapture,
    /// Horizontal capture window (start byte, byte count).
    HorizontalCapture,
}

impl CaptureRegister {
    /// All registers in address order.
    pub const ALL: [Self; 7] = [
        Self::Control0,
        Self::Control1,
        Self::Status,
        Self::Monitor,
        Self::Data,
        Self::VerticalCapture,
        Self::HorizontalCapture,
    ];

    /// Byte offset of the register from the peripheral base address.
    pub const fn offset(self) -> usize {
        match self {
            Self::Control0 => 0x00,
            Self::Control1 => 0x04,
            Self::Status => 0x08,
            Self::Monitor => 0x0C,
            Self::Data => 0x10,
            Self::VerticalCapture => 0x14,
            Self::HorizontalCapture => 0x18,
        }
    }

    /// Dense index of the register, `0..ALL.len()`.
    pub const fn index(self) -> usize {
        match self {
            Self::Control0 => 0,
            Self::Control1 => 1,
            Self::Status => 2,
            Self::Monitor => 3,
            Self::Data => 4,
            Self::VerticalCapture => 5,
            Self::HorizontalCapture => 6,
        }
    }
}

/// CTRL0 bit assignments.
pub mod ctrl0 {
    /// Pixel clock input enable.
    pub const PCKE: u32 = 0x0000_0001;
    /// VSYNC polarity (1 = active low).
    pub const VPS: u32 = 0x0000_0002;
    /// HSYNC polarity (1 = active low).
    pub const HPS: u32 = 0x0000_0004;
    /// Reset request; reads back 1 until the reset sequence finishes.
    pub const PRST: u32 = 0x0000_0008;
    /// Receive-data-ready interrupt enable.
    pub const DFIE: u32 = 0x0000_0010;
    /// Frame-end interrupt enable.
    pub const FEIE: u32 = 0x0000_0020;
    /// Overrun interrupt enable.
    pub const OVIE: u32 = 0x0000_0040;
    /// Underrun interrupt enable.
    pub const UDRIE: u32 = 0x0000_0080;
    /// Vertical line-count error interrupt enable.
    pub const VERIE: u32 = 0x0000_0100;
    /// Horizontal byte-count error interrupt enable.
    pub const HERIE: u32 = 0x0000_0200;
    /// Pixel clock output enable.
    pub const PCKOE: u32 = 0x0000_0400;
    /// Pixel clock output divider field mask (bits 13:11).
    pub const PCKDIV_MASK: u32 = 0x0000_3800;
    /// Pixel clock output divider field shift.
    pub const PCKDIV_SHIFT: u32 = 11;
    /// Endian select (1 = big endian).
    pub const EDS: u32 = 0x0000_4000;
    /// All six interrupt-enable bits.
    pub const INTERRUPT_MASK: u32 = DFIE | FEIE | OVIE | UDRIE | VERIE | HERIE;
}

/// CTRL1 bit assignments.
pub mod ctrl1 {
    /// Capture (receive) enable.
    pub const PCE: u32 = 0x0000_0001;
}

/// STATUS bit assignments.
pub mod status {
    /// Frame busy: set from the active VSYNC edge until the frame is delivered.
    pub const FBSY: u32 = 0x0000_0001;
    /// FIFO empty.
    pub const FEMPF: u32 = 0x0000_0002;
    /// Frame end.
    pub const FEF: u32 = 0x0000_0004;
    /// Overrun: FIFO was not read out in time.
    pub const OVRF: u32 = 0x0000_0008;
    /// Underrun: FIFO was read while empty.
    pub const UDRF: u32 = 0x0000_0010;
    /// Vertical line-count error.
    pub const VERF: u32 = 0x0000_0020;
    /// Horizontal byte-count error.
    pub const HERF: u32 = 0x0000_0040;
    /// Flags cleared by writing 1 after reading 1.
    pub const CLEARABLE: u32 = FEF | OVRF | UDRF | VERF | HERF;
    /// Capture-time fault flags.
    pub const ERRORS: u32 = OVRF | UDRF | VERF | HERF;
}

/// Window register field layout (shared by VCR and HCR).
pub mod window {
    /// Start field mask (bits 11:0).
    pub const START_MASK: u32 = 0x0000_0FFF;
    /// Size field mask (bits 27:16).
    pub const SIZE_MASK: u32 = 0x0FFF_0000;
    /// Size field shift.
    pub const SIZE_SHIFT: u32 = 16;
}

/// Word-level access to the capture peripheral registers.
///
/// Implementations take `&self`: register access is inherently shared between
/// the main loop and interrupt handlers, and the hardware itself arbitrates.
/// On target this is volatile MMIO; in tests it is
/// [`MockCaptureRegisters`](crate::mocks::MockCaptureRegisters).
pub trait CaptureRegisterBus {
    /// Read a register.
    fn read(&self, reg: CaptureRegister) -> u32;

    /// Write a register.
    fn write(&self, reg: CaptureRegister, value: u32);

    /// Read-modify-write a register.
    fn modify<F>(&self, reg: CaptureRegister, f: F)
    where
        F: FnOnce(u32) -> u32,
    {
        let value = self.read(reg);
        self.write(reg, f(value));
    }

    /// Set `mask` bits in a register.
    fn set_bits(&self, reg: CaptureRegister, mask: u32) {
        self.modify(reg, |v| v | mask);
    }

    /// Clear `mask` bits in a register.
    fn clear_bits(&self, reg: CaptureRegister, mask: u32) {
        self.modify(reg, |v| v & !mask);
    }
}

impl<T: CaptureRegisterBus + ?Sized> CaptureRegisterBus for &T {
    fn read(&self, reg: CaptureRegister) -> u32 {
        (**self).read(reg)
    }

    fn write(&self, reg: CaptureRegister, value: u32) {
        (**self).write(reg, value);
    }
}

/// Pack a start/size pair into a VCR/HCR register word.
#[allow(clippy::arithmetic_side_effects)] // Safety: shift is a constant 16; operands masked to 12 bits
pub const fn pack_window(start: u16, size: u16) -> u32 {
    (start as u32 & window::START_MASK) | (((size as u32) << window::SIZE_SHIFT) & window::SIZE_MASK)
}

/// Unpack a VCR/HCR register word into `(start, size)`.
#[allow(clippy::arithmetic_side_effects)] // Safety: shift is a constant 16
#[allow(clippy::cast_possible_truncation)] // Safety: both fields are masked to 12 bits
pub const fn unpack_window(value: u32) -> (u16, u16) {
    (
        (value & window::START_MASK) as u16,
        ((value & window::SIZE_MASK) >> window::SIZE_SHIFT) as u16,
    )
}
