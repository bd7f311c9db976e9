//! MPU configuration for the capture destination memory
//!
//! Embassy enables the Cortex-M7 D-cache on STM32H7. The capture DMA writes
//! frames straight into RAM behind the CPU's back, so both destination RAMs
//! must be mapped non-cacheable before the cache is switched on, otherwise
//! the CPU reads stale lines after a frame completes (ST AN4838/AN4839).
//!
//! # Region requirements (ARM DDI0489F §B3.5)
//!
//! - Size is a power of two, at least 32 bytes
//! - Base is aligned to the size
//! - RASR SIZE field = `log2(size) - 1`
//!
//! The capture regions themselves are not powers of two (region 0 is
//! 384 KB), so the MPU covers the enclosing RAM banks instead:
//!
//! | Slot | Bank          | Base        | Size   | RBAR        | RASR        |
//! |------|---------------|-------------|--------|-------------|-------------|
//! | 0    | AXI SRAM      | 0x2400_0000 | 512 KB | 0x2400_0010 | 0x1308_0025 |
//! | 1    | SRAM1 + SRAM2 | 0x3000_0000 | 256 KB | 0x3000_0011 | 0x1308_0023 |

use crate::memory::MemoryRegion;

/// Errors from MPU region validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MpuError {
    /// Region size is zero.
    #[error("MPU region size is zero")]
    SizeZero,
    /// Region size is below the 32-byte minimum.
    #[error("MPU region smaller than 32 bytes")]
    SizeTooSmall,
    /// Region size is not a power of two.
    #[error("MPU region size is not a power of two")]
    SizeNotPowerOfTwo,
    /// Base address is not aligned to the region size.
    #[error("MPU region base is not size-aligned")]
    AddressMisaligned,
}

/// A validated non-cacheable MPU region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MpuRegion {
    base: u32,
    size: u32,
}

impl MpuRegion {
    /// Validate size and alignment.
    pub fn new(base: u32, size: u32) -> Result<Self, MpuError> {
        if size == 0 {
            return Err(MpuError::SizeZero);
        }
        if size < 32 {
            return Err(MpuError::SizeTooSmall);
        }
        if !size.is_power_of_two() {
            return Err(MpuError::SizeNotPowerOfTwo);
        }
        if base % size != 0 {
            return Err(MpuError::AddressMisaligned);
        }
        Ok(Self { base, size })
    }

    /// Cover a whole RAM bank.
    pub fn covering(bank: &MemoryRegion) -> Result<Self, MpuError> {
        Self::new(bank.base, bank.capacity)
    }

    /// ARM MPU SIZE field (`log2(size) - 1`).
    // trailing_zeros() of a u32 is at most 31
    #[allow(clippy::cast_possible_truncation)]
    pub fn size_field(&self) -> u8 {
        (self.size.trailing_zeros() as u8).saturating_sub(1)
    }

    /// RBAR with VALID set, selecting `slot`.
    pub fn rbar(&self, slot: u8) -> u32 {
        self.base | (1 << 4) | (u32::from(slot) & 0xF)
    }

    /// RASR: XN=1, AP=0b011, TEX=001, S=C=B=0, SIZE, ENABLE.
    pub fn rasr(&self) -> u32 {
        NON_CACHEABLE_ATTR_MASK | (u32::from(self.size_field()) << 1) | 1
    }

    /// Base address.
    pub fn base(&self) -> u32 {
        self.base
    }

    /// Size in bytes.
    pub fn size(&self) -> u32 {
        self.size
    }
}

/// TEX=001, S=0, C=0, B=0, AP=0b011, XN=1, without SIZE and ENABLE.
pub const NON_CACHEABLE_ATTR_MASK: u32 = 0x1308_0000;

/// `(RBAR, RASR)` pairs marking both capture RAM banks non-cacheable.
pub fn capture_register_pairs() -> Result<[(u32, u32); 2], MpuError> {
    let axi = MpuRegion::covering(&MemoryRegion::RAM1)?;
    let sram12 = MpuRegion::covering(&MemoryRegion::RAM2)?;
    Ok([(axi.rbar(0), axi.rasr()), (sram12.rbar(1), sram12.rasr())])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::memory::RegionLayout;

    // ── Test A ────────────────────────────────────────────────────────────────

    #[test]
    fn test_region_validation() {
        assert!(MpuRegion::new(0x2400_0000, 512 * 1024).is_ok());
        assert_eq!(
            MpuRegion::new(0x2400_0000, 0),
            Err(MpuError::SizeZero)
        );
        assert_eq!(MpuRegion::new(0x2400_0000, 16), Err(MpuError::SizeTooSmall));
        assert_eq!(
            MpuRegion::new(0x2402_0000, 384 * 1024),
            Err(MpuError::SizeNotPowerOfTwo)
        );
        assert_eq!(
            MpuRegion::new(0x2402_0000, 256 * 1024),
            Err(MpuError::AddressMisaligned)
        );
    }

    // ── Test B ────────────────────────────────────────────────────────────────

    #[test]
    fn test_size_field_encoding() {
        assert_eq!(MpuRegion::new(0, 32).unwrap().size_field(), 4);
        assert_eq!(MpuRegion::new(0, 256 * 1024).unwrap().size_field(), 17);
        assert_eq!(MpuRegion::new(0, 512 * 1024).unwrap().size_field(), 18);
    }

    // ── Test C ────────────────────────────────────────────────────────────────

    #[test]
    fn test_capture_pairs_match_table() {
        let pairs = capture_register_pairs().unwrap();
        assert_eq!(pairs[0], (0x2400_0010, 0x1308_0025));
        assert_eq!(pairs[1], (0x3000_0011, 0x1308_0023));
    }

    #[test]
    fn test_pairs_are_non_cacheable() {
        for (_, rasr) in capture_register_pairs().unwrap() {
            assert!(rasr & 1 != 0, "ENABLE");
            assert!(rasr & (1 << 19) != 0, "TEX=001");
            assert_eq!(rasr & (1 << 17), 0, "C");
            assert_eq!(rasr & (1 << 16), 0, "B");
        }
    }

    #[test]
    fn test_default_layout_is_covered() {
        let axi = MpuRegion::covering(&MemoryRegion::RAM1).unwrap();
        let sram12 = MpuRegion::covering(&MemoryRegion::RAM2).unwrap();
        let covered = |r: &MemoryRegion| {
            [axi, sram12].iter().any(|m| {
                r.within(&MemoryRegion {
                    base: m.base(),
                    capacity: m.size(),
                })
            })
        };
        for region in &RegionLayout::DEFAULT.regions {
            assert!(covered(region));
        }
    }
}
