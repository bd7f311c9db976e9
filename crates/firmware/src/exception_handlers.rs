//! Cortex-M fault handler for the capture firmware.
//!
//! The capture DMA writes into AXI SRAM and SRAM1/2 while the CPU runs. A
//! stray pointer into a region the MPU leaves unmapped, or a stack that grows
//! into `.bss`, raises a HardFault. The handler reports the stacked frame over
//! RTT and stops; it never tries to resume a capture.
//!
//! The `#[cortex_m_rt::exception]` attribute needs the ARM runtime, so the
//! handler is gated behind `#[cfg(feature = "hardware")]`. The marker constant
//! compiles everywhere so host tests can see the module.

#![allow(clippy::doc_markdown)]

/// `true` once this module is compiled in, which links the HardFault handler
/// on hardware builds.
pub const HARDFAULT_DEFINED: bool = true;

/// Address of the stacked exception frame, as printed by the handler.
pub fn frame_address<T>(frame: &T) -> u32 {
    core::ptr::from_ref(frame) as usize as u32
}

/// HardFault exception handler (hardware target only).
///
/// Halts through `defmt::panic!`, which `panic-probe` turns into a
/// breakpoint when a probe is attached. Returning from a HardFault is
/// undefined behaviour on Cortex-M; `-> !` rules it out.
#[cfg(feature = "hardware")]
#[cortex_m_rt::exception]
#[allow(unsafe_code)]
unsafe fn HardFault(ef: &cortex_m_rt::ExceptionFrame) -> ! {
    defmt::panic!(
        "HardFault at frame 0x{:08X}: pc=0x{:08X} lr=0x{:08X}. \
         Likely a wild pointer into capture RAM or a stack overflow.",
        frame_address(ef),
        ef.pc(),
        ef.lr()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hardfault_module_is_linked() {
        const _: () = assert!(HARDFAULT_DEFINED);
    }

    #[test]
    fn test_frame_address_matches_reference() {
        let frame = [0u32; 8];
        assert_eq!(frame_address(&frame), &frame as *const _ as usize as u32);
    }
}
