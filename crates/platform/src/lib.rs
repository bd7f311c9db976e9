//! Hardware Abstraction Layer (HAL) for the parallel capture board
//!
//! This crate provides trait-based abstractions for the capture peripheral,
//! its DMA channel, the interrupt controller and the millisecond tick,
//! enabling the capture firmware to be developed and tested without
//! physical hardware.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (firmware crate: console, controller)
//!         ↓
//! Capture Drivers (firmware crate: peripheral, region scheduler)
//!         ↓
//! Platform HAL (this crate - trait abstractions)
//!         ↓
//! Hardware Layer (MMIO + NVIC, Embassy HAL)
//! ```
//!
//! # Abstractions
//!
//! - [`CaptureRegisterBus`] - capture peripheral register access
//! - [`DmaEngine`] - block-mode DMA channel draining the capture FIFO
//! - [`InterruptLines`] - priority/enable control of the capture vectors
//! - [`TickSource`] - wrapping millisecond counter for timeouts
//!
//! # Features
//!
//! - `std`: Enable host mocks ([`mocks`]) outside `cfg(test)`
//! - `hardware`: Physical hardware target marker
//! - `defmt`: Derive `defmt::Format` on all platform types
//!
//! # Example
//!
//! ```no_run
//! use platform::{CaptureRegister, CaptureRegisterBus, RawStatus};
//!
//! fn frame_done<R: CaptureRegisterBus>(regs: &R) -> bool {
//!     RawStatus(regs.read(CaptureRegister::Status)).frame_end()
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod capture;
pub mod capture_config;
pub mod capture_types;
pub mod config;
pub mod dma;
pub mod interrupt;
pub mod memory;
pub mod mocks;
pub mod mpu;
pub mod tick;

// Re-export register access
pub use capture::{CaptureRegister, CaptureRegisterBus};

// Re-export capture domain types
pub use capture_config::{CaptureConfig, ConfigError, PixelClockDivider};
pub use capture_types::{
    BytesPerPixel, CaptureRange, CaptureWindow, Endianness, InterruptSettings, OutOfRangeError,
    RawStatus, SignalPolarity,
};

// Re-export DMA types
pub use dma::{DmaEngine, DmaError, DmaTransfer, TransferUnit};

// Re-export interrupt and timing types
pub use interrupt::{InterruptError, InterruptLine, InterruptLines, InterruptPriority};
pub use tick::{EmbassyTick, TickSource};

// Re-export memory layout
pub use memory::{MemoryRegion, RegionLayout, REGION_COUNT, TRANSFER_UNIT_BYTES};
pub use mpu::{MpuError, MpuRegion};
