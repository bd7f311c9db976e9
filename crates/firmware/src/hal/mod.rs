//! Board HAL for the capture firmware
//!
//! Binds the platform traits to the STM32H743 board: the capture block
//! and its DMA channel sit behind the FMC bridge as memory-mapped
//! registers, and the four capture interrupt requests arrive on EXTI0..3.
//!
//! Only compiled with `--features hardware`; host builds use
//! `platform::mocks` instead.

pub mod mmio;
pub mod nvic;

pub use mmio::{MmioCapture, MmioDma};
pub use nvic::{clear_exti_pending, NvicLines};

/// Base address of the capture register block (FMC bank 1).
pub const CAPTURE_BASE: usize = 0x6000_0000;

/// Base address of the capture DMA channel registers.
pub const CAPTURE_DMA_BASE: usize = 0x6000_0100;

/// Capture register block at [`CAPTURE_BASE`].
pub const fn capture_registers() -> MmioCapture {
    // SAFETY: CAPTURE_BASE is the board's capture block; nothing else maps it.
    unsafe { MmioCapture::new(CAPTURE_BASE) }
}

/// Capture DMA channel at [`CAPTURE_DMA_BASE`].
pub const fn capture_dma() -> MmioDma {
    // SAFETY: CAPTURE_DMA_BASE is the board's capture DMA channel.
    unsafe { MmioDma::new(CAPTURE_DMA_BASE) }
}
