//! Hardware boot sequence for the capture board.
//!
//! Initialization order (MUST be respected, order matters for correctness):
//!   1. Configure MPU (mark both capture RAM banks non-cacheable)
//!   2. Enable D-cache (now safe because capture RAM is non-cacheable)
//!   3. Enable I-cache
//!   4. Clocks: PLL1 → 400 MHz system clock
//!   5. Arm the independent watchdog
//!   6. Open the capture controller and attach it to the interrupt dispatch
//!   7. Start the console loop
//!
//! # Safety
//! Steps 1–3 must run from privileged mode before any DMA channel is armed.

use platform::mpu::{capture_register_pairs, MpuError};

/// Ordered list of boot sequence steps for documentation and testing.
///
/// # Correctness Invariants
///
/// - MPU must be configured BEFORE enabling D-cache (ARM AN4838/AN4839).
///   The capture DMA writes frames behind the CPU; a cached view of AXI SRAM
///   or SRAM1/2 would hand the application stale frame data.
/// - The controller must be attached to the dispatch table before the
///   first capture is started, or its interrupts are dropped.
pub const BOOT_SEQUENCE_STEPS: &[&str] = &[
    "1. MPU: mark AXI SRAM + SRAM1/2 non-cacheable before any capture DMA",
    "2. D-cache: enable after MPU is configured (capture RAM excluded)",
    "3. I-cache: enable for instruction fetch performance",
    "4. RCC: PLL1 from HSI, 400 MHz system clock",
    "5. IWDG: arm watchdog, fed once per console loop pass",
    "6. Capture: open controller, attach interrupt dispatch",
    "7. Console: start USART command loop",
];

/// Independent watchdog timeout.
///
/// The console loop wakes at least every [`CONSOLE_POLL_MS`], so the margin
/// covers a capture reset wait plus a full console flush.
pub const WATCHDOG_TIMEOUT_MS: u32 = 8_000;

/// Longest the console loop sleeps waiting for input.
pub const CONSOLE_POLL_MS: u64 = 10;

/// [`WATCHDOG_TIMEOUT_MS`] in the microseconds the IWDG driver takes.
pub const fn watchdog_timeout_us() -> u32 {
    WATCHDOG_TIMEOUT_MS.saturating_mul(1_000)
}

/// Returns the `(RBAR, RASR)` register pairs marking capture RAM non-cacheable.
///
/// | Index | Region        | Base        | Size   | RBAR        | RASR        |
/// |-------|---------------|-------------|--------|-------------|-------------|
/// | 0     | AXI SRAM      | 0x2400_0000 | 512 KB | 0x2400_0010 | 0x1308_0025 |
/// | 1     | SRAM1 + SRAM2 | 0x3000_0000 | 256 KB | 0x3000_0011 | 0x1308_0023 |
///
/// Pure math; no hardware is touched.
pub fn mpu_register_pairs() -> Result<[(u32, u32); 2], MpuError> {
    capture_register_pairs()
}

// ── RCC clock configuration ───────────────────────────────────────────────────

/// Build the `embassy_stm32::Config` for the capture board.
///
/// # Clock Tree (HSI → 400 MHz core)
///
/// HSI (64 MHz) → PLL1 (prediv=4, mul=50) → PLL1_P = 400 MHz (sys)
/// AHB prescaler: DIV2 → 200 MHz
/// APB1/2/3/4:    DIV2 → 100 MHz (USART3 kernel clock)
///
/// The capture block samples on the external pixel clock; it needs no
/// kernel clock from RCC.
#[cfg(feature = "hardware")]
pub fn build_embassy_config() -> embassy_stm32::Config {
    use embassy_stm32::rcc::*;

    let mut config = embassy_stm32::Config::default();

    config.rcc.hsi = Some(HSIPrescaler::DIV1);
    config.rcc.csi = true;

    // HSI (64 MHz) / prediv(4) = 16 MHz → × mul(50) = 800 MHz VCO
    // PLL1_P = VCO / divp(2) = 400 MHz → system clock
    config.rcc.pll1 = Some(Pll {
        source: PllSource::HSI,
        prediv: PllPreDiv::DIV4,
        mul: PllMul::MUL50,
        divp: Some(PllDiv::DIV2),
        divq: None,
        divr: None,
    });

    config.rcc.sys = Sysclk::PLL1_P; // 400 MHz
    config.rcc.ahb_pre = AHBPrescaler::DIV2; // 200 MHz
    config.rcc.apb1_pre = APBPrescaler::DIV2; // 100 MHz
    config.rcc.apb2_pre = APBPrescaler::DIV2; // 100 MHz
    config.rcc.apb3_pre = APBPrescaler::DIV2; // 100 MHz
    config.rcc.apb4_pre = APBPrescaler::DIV2; // 100 MHz
    config.rcc.voltage_scale = VoltageScale::Scale1;

    config
}

// ── Hardware-only init ────────────────────────────────────────────────────────
//
// Host tests never compile or link this module.

#[cfg(feature = "hardware")]
pub mod hardware {
    //! Actual hardware register writes.
    //! Only compiled when targeting real hardware (`--features hardware`).

    use super::{mpu_register_pairs, MpuError};

    /// Apply the capture MPU configuration to the Cortex-M7 MPU.
    ///
    /// Writes both `(RBAR, RASR)` pairs, then re-enables the MPU with
    /// `PRIVDEFENA` so unmapped regions use the default memory map for
    /// privileged access. Leaves the MPU untouched if the pairs cannot be
    /// computed.
    ///
    /// # Safety
    ///
    /// - Must be called before enabling D-cache (`SCB::enable_dcache()`).
    /// - Must be called before any DMA channel is armed.
    /// - Must be called from privileged mode.
    #[allow(unsafe_code)]
    pub unsafe fn apply_mpu_config(mpu: &mut cortex_m::peripheral::MPU) -> Result<(), MpuError> {
        let pairs = mpu_register_pairs()?;

        // Disable MPU before reconfiguring (ARM DDI0489F §B3.5.1).
        unsafe {
            mpu.ctrl.write(0);
        }

        // RBAR has VALID=1, so writing it selects the region slot.
        for (rbar, rasr) in pairs {
            unsafe {
                mpu.rbar.write(rbar);
                mpu.rasr.write(rasr);
            }
        }

        // ENABLE | PRIVDEFENA (ARM DDI0489F Table B3-12).
        unsafe {
            mpu.ctrl.write(0b101);
        }

        cortex_m::asm::isb();
        cortex_m::asm::dsb();
        Ok(())
    }

    /// Zero-argument entry point for `main.rs`.
    ///
    /// Call as the very first statement in `main`, before
    /// `embassy_stm32::init()` enables the D-cache.
    #[allow(unsafe_code)]
    pub fn apply_mpu_config_from_peripherals() -> Result<(), MpuError> {
        // SAFETY: called once at boot before any task or interrupt handler
        // runs. No other code holds Cortex-M peripherals yet, and the stolen
        // set is dropped before embassy_stm32::init() takes them.
        let mut cp = unsafe { cortex_m::Peripherals::steal() };
        // SAFETY: boot context, D-cache not yet enabled, no DMA armed.
        unsafe { apply_mpu_config(&mut cp.MPU) }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use super::*;
    use platform::RegionLayout;

    #[test]
    fn test_boot_mpu_axi_sram_rbar() {
        let pairs = mpu_register_pairs().unwrap();
        let (rbar, _) = pairs[0];
        assert_eq!(rbar & 0xFFFF_FFE0, 0x2400_0000, "AXI SRAM RBAR base must be 0x2400_0000");
    }

    #[test]
    fn test_boot_mpu_sram12_rbar() {
        let pairs = mpu_register_pairs().unwrap();
        let (rbar, _) = pairs[1];
        assert_eq!(rbar & 0xFFFF_FFE0, 0x3000_0000, "SRAM1 RBAR base must be 0x3000_0000");
    }

    #[test]
    fn test_boot_mpu_rasr_non_cacheable_encoding() {
        let pairs = mpu_register_pairs().unwrap();
        for (i, (_, rasr)) in pairs.iter().enumerate() {
            assert!(rasr & 0x1 != 0, "Region {} RASR ENABLE bit must be set", i);
            assert!(rasr & (1 << 19) != 0, "Region {} must have TEX[0] set", i);
            assert!(rasr & (1 << 17) == 0, "Region {} C bit must be 0", i);
            assert!(rasr & (1 << 16) == 0, "Region {} B bit must be 0", i);
        }
    }

    #[test]
    fn test_boot_mpu_covers_capture_layout() {
        let pairs = mpu_register_pairs().unwrap();
        for (region, (rbar, rasr)) in RegionLayout::DEFAULT.regions.iter().zip(pairs) {
            let base = rbar & 0xFFFF_FFE0;
            let size = 1u64 << (((rasr >> 1) & 0x1F) + 1);
            assert!(region.base >= base);
            assert!(u64::from(region.base) + u64::from(region.capacity) <= u64::from(base) + size);
        }
    }

    #[test]
    fn test_boot_sequence_order_is_documented() {
        let steps = BOOT_SEQUENCE_STEPS;
        let mpu_idx = steps
            .iter()
            .position(|s| s.contains("MPU"))
            .expect("MPU step required");
        let cache_idx = steps
            .iter()
            .position(|s| s.contains("D-cache"))
            .expect("D-cache step required");
        let capture_idx = steps
            .iter()
            .position(|s| s.starts_with("6. Capture"))
            .expect("capture step required");
        assert!(mpu_idx < cache_idx, "MPU must be configured before enabling D-cache");
        assert!(cache_idx < capture_idx);
    }

    #[test]
    fn test_watchdog_outlasts_console_poll() {
        assert_eq!(watchdog_timeout_us(), 8_000_000);
        assert!(u64::from(WATCHDOG_TIMEOUT_MS) > CONSOLE_POLL_MS * 100);
    }
}
