//! DMA engine abstraction
//!
//! The capture FIFO is drained by a single DMA channel running in block
//! mode: each capture DMA request moves one block of `block_size` units,
//! and the channel completes after `block_count` blocks. One completion
//! interrupt fires per configured transfer; the engine never restarts on
//! its own.

/// Errors raised while programming the DMA engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaError {
    /// Transfer unit is not 1, 2 or 4 bytes.
    #[error("transfer unit must be 1, 2 or 4 bytes")]
    InvalidUnit,
    /// Block size is zero or above [`DmaTransfer::MAX_BLOCK_SIZE`].
    #[error("block size must be 1..=1024 units")]
    InvalidBlockSize,
    /// Block count is zero.
    #[error("block count must be non-zero")]
    InvalidBlockCount,
    /// Destination range wraps the 32-bit address space.
    #[error("destination range overflows the address space")]
    AddressOverflow,
    /// The engine refused the configuration.
    #[error("DMA engine fault")]
    EngineFault,
}

/// Width of a single DMA beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TransferUnit {
    /// 8-bit beats.
    Byte = 1,
    /// 16-bit beats.
    HalfWord = 2,
    /// 32-bit beats (matches the FIFO read port).
    Word = 4,
}

impl TransferUnit {
    /// Beat width in bytes.
    pub const fn bytes(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for TransferUnit {
    type Error = DmaError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Byte),
            2 => Ok(Self::HalfWord),
            4 => Ok(Self::Word),
            _ => Err(DmaError::InvalidUnit),
        }
    }
}

/// A validated block-mode transfer descriptor.
///
/// Construct with [`DmaTransfer::new`]; the fields are private so an
/// engine never sees an out-of-range descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaTransfer {
    dest: u32,
    unit: TransferUnit,
    block_size: u16,
    block_count: u16,
}

impl DmaTransfer {
    /// Largest block size the engine accepts, in units.
    pub const MAX_BLOCK_SIZE: u16 = 1024;

    /// Validate and build a descriptor.
    pub fn new(
        dest: u32,
        unit: TransferUnit,
        block_size: u16,
        block_count: u16,
    ) -> Result<Self, DmaError> {
        if block_size == 0 || block_size > Self::MAX_BLOCK_SIZE {
            return Err(DmaError::InvalidBlockSize);
        }
        if block_count == 0 {
            return Err(DmaError::InvalidBlockCount);
        }
        let transfer = Self {
            dest,
            unit,
            block_size,
            block_count,
        };
        dest.checked_add(transfer.total_bytes())
            .ok_or(DmaError::AddressOverflow)?;
        Ok(transfer)
    }

    /// Destination base address.
    pub fn dest(&self) -> u32 {
        self.dest
    }

    /// Beat width.
    pub fn unit(&self) -> TransferUnit {
        self.unit
    }

    /// Beats per block.
    pub fn block_size(&self) -> u16 {
        self.block_size
    }

    /// Number of blocks.
    pub fn block_count(&self) -> u16 {
        self.block_count
    }

    /// Bytes moved by the whole transfer.
    #[allow(clippy::arithmetic_side_effects)] // Safety: 4 × 1024 × 65535 < u32::MAX
    pub fn total_bytes(&self) -> u32 {
        u32::from(self.unit.bytes()) * u32::from(self.block_size) * u32::from(self.block_count)
    }
}

/// Single DMA channel dedicated to the capture FIFO.
///
/// Completion is reported through the DMA transfer-end interrupt line,
/// not through this trait.
pub trait DmaEngine {
    /// Program the channel. The channel must be stopped.
    fn configure(&self, transfer: &DmaTransfer) -> Result<(), DmaError>;

    /// Enable the channel; it then moves data on each capture request.
    fn start(&self);

    /// Disable the channel. Safe to call when already stopped.
    fn stop(&self);

    /// Bytes still to be transferred for the configured transfer.
    fn remaining_bytes(&self) -> u32;

    /// Whether the channel is enabled and has not finished.
    fn is_transferring(&self) -> bool;
}

impl<T: DmaEngine + ?Sized> DmaEngine for &T {
    fn configure(&self, transfer: &DmaTransfer) -> Result<(), DmaError> {
        (**self).configure(transfer)
    }

    fn start(&self) {
        (**self).start();
    }

    fn stop(&self) {
        (**self).stop();
    }

    fn remaining_bytes(&self) -> u32 {
        (**self).remaining_bytes()
    }

    fn is_transferring(&self) -> bool {
        (**self).is_transferring()
    }
}
