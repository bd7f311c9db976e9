//! Capture interrupt lines on the Cortex-M7 NVIC.
//!
//! The capture block drives four EXTI inputs:
//!
//! | Line               | EXTI | Vector |
//! |--------------------|------|--------|
//! | `CaptureDataReady` | 0    | EXTI0  |
//! | `CaptureFrameEnd`  | 1    | EXTI1  |
//! | `CaptureError`     | 2    | EXTI2  |
//! | `DmaTransferEnd`   | 3    | EXTI3  |

use core::ptr;

use cortex_m::peripheral::NVIC;
use embassy_stm32::pac::Interrupt;
use platform::{InterruptError, InterruptLine, InterruptLines, InterruptPriority};

/// EXTI CPU pending register 1 (write-1-to-clear).
const EXTI_CPUPR1: usize = 0x5800_0088;

/// The STM32H7 implements the top four priority bits.
const PRIO_SHIFT: u32 = 4;

/// NVIC vector serving `line`.
pub const fn vector(line: InterruptLine) -> Interrupt {
    match line {
        InterruptLine::CaptureDataReady => Interrupt::EXTI0,
        InterruptLine::CaptureFrameEnd => Interrupt::EXTI1,
        InterruptLine::CaptureError => Interrupt::EXTI2,
        InterruptLine::DmaTransferEnd => Interrupt::EXTI3,
    }
}

/// EXTI pending bit for `line`.
pub const fn exti_mask(line: InterruptLine) -> u32 {
    match line {
        InterruptLine::CaptureDataReady => 1 << 0,
        InterruptLine::CaptureFrameEnd => 1 << 1,
        InterruptLine::CaptureError => 1 << 2,
        InterruptLine::DmaTransferEnd => 1 << 3,
    }
}

/// Acknowledge the EXTI edge for `line`. Call first thing in its vector.
pub fn clear_exti_pending(line: InterruptLine) {
    // SAFETY: EXTI_CPUPR1 is write-1-to-clear; writing one bit touches
    // no other line.
    unsafe { ptr::write_volatile(EXTI_CPUPR1 as *mut u32, exti_mask(line)) }
}

/// [`InterruptLines`] over the NVIC.
#[derive(Debug, Default)]
pub struct NvicLines;

impl NvicLines {
    /// Hardware priority byte. Higher [`InterruptPriority`] is more urgent,
    /// the NVIC treats lower numbers as more urgent.
    fn hw_priority(priority: InterruptPriority) -> u8 {
        let urgency = InterruptPriority::MAX.saturating_sub(priority.get());
        urgency.wrapping_shl(PRIO_SHIFT)
    }
}

impl InterruptLines for NvicLines {
    fn set_priority(
        &self,
        line: InterruptLine,
        priority: InterruptPriority,
    ) -> Result<(), InterruptError> {
        // SAFETY: only the capture vectors are reprioritised, before they
        // are unmasked, so no priority-based critical section is broken.
        unsafe {
            let mut cp = cortex_m::Peripherals::steal();
            cp.NVIC.set_priority(vector(line), Self::hw_priority(priority));
        }
        Ok(())
    }

    fn enable(&self, line: InterruptLine) -> Result<(), InterruptError> {
        // SAFETY: the capture vectors are serviced by CAPTURE_IRQS, which
        // takes its own critical section.
        unsafe { NVIC::unmask(vector(line)) };
        Ok(())
    }

    fn disable(&self, line: InterruptLine) {
        NVIC::mask(vector(line));
    }

    fn clear_pending(&self, line: InterruptLine) {
        clear_exti_pending(line);
        NVIC::unpend(vector(line));
    }
}
