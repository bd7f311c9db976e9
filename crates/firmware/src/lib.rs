//! PDC Capture Firmware
//!
//! Parallel video capture for STM32H7: a camera sensor drives an 8-bit
//! pixel bus with HSYNC/VSYNC framing, the capture block packs it into a
//! FIFO and a DMA channel drains the FIFO into up to two RAM regions. A
//! serial console starts and stops captures and reports their status.
//!
//! # Architecture
//!
//! ```text
//! Console (console module, UART)
//!         ↓
//! Capture controller (capture::Controller, session state machine)
//!         ↓
//! Drivers (capture::CapturePeripheral, capture::RegionScheduler)
//!         ↓
//! Platform HAL (platform crate traits; hal module on hardware)
//! ```
//!
//! Interrupt vectors reach the controller through [`capture::CAPTURE_IRQS`].
//!
//! # Features
//!
//! - `hardware` - Build for STM32H7 target (embassy, defmt, board HAL)
//! - `std` - Enable standard library (host tools and tests)
//! - `host-log` - Route driver logging to `tracing` on the host
//!
//! # Examples
//!
//! ```bash
//! cargo build --release --target thumbv7em-none-eabihf --features hardware
//! ```

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
// Upgrade relevant warns to deny; keep pedantic as warn (too noisy for firmware)
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Critical correctness: deny these
#![deny(clippy::await_holding_lock)] // holding a blocking Mutex across .await is a bug
#![deny(unsafe_op_in_unsafe_fn)]
// unsafe fn body is not implicitly unsafe block
// Logging discipline (allow println in tests via clippy.toml)
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![warn(clippy::dbg_macro)] // dbg! should not be left in committed code
// Intentional allows for this codebase:
#![allow(clippy::module_name_repetitions)] // common in Rust crates; not a real issue
#![allow(clippy::missing_errors_doc)] // most errors are self-explanatory
// Pedantic lints too noisy for firmware application code:
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::similar_names)]
#![allow(clippy::unused_self)]

#[macro_use]
mod fmt;

pub mod boot;
pub mod capture;
pub mod console;
pub mod exception_handlers;

#[cfg(feature = "hardware")]
pub mod hal;

// Re-export key types
pub use capture::{
    CaptureCallback, CaptureControl, CaptureError, CaptureEvent, Controller, ControllerConfig,
    FrameStatus, SessionState, CAPTURE_IRQS,
};
pub use console::{Console, ConsoleSession, Control};
