//! Capture destination memory
//!
//! A frame is written by DMA into at most two disjoint on-chip RAM regions.
//! Region 0 is filled first; whatever does not fit spills into region 1.
//!
//! # Default layout
//!
//! ```text
//! 0x2400_0000  ┌─────────────────────┐
//!              │  AXI SRAM low        │ 128 KB  (.axisram, general use)
//! 0x2402_0000  ├─────────────────────┤
//!              │  Capture region 0    │ 384 KB
//! 0x2408_0000  └─────────────────────┘
//!
//! 0x3000_0000  ┌─────────────────────┐
//!              │  Capture region 1    │ 256 KB  (SRAM1 + SRAM2)
//! 0x3004_0000  └─────────────────────┘
//! ```
//!
//! A 640×480 YUV 4:2:2 frame (614400 bytes) fills region 0 and
//! 221184 bytes of region 1. Neither capture region is declared in
//! `memory.x`, so the linker never places data there.

use crate::capture_config::ConfigError;

/// Bytes the capture peripheral accumulates before raising one DMA request.
pub const TRANSFER_UNIT_BYTES: u32 = 32;

/// Width of the FIFO read port in bytes.
pub const FIFO_WORD_BYTES: u8 = 4;

/// Number of destination regions.
pub const REGION_COUNT: usize = 2;

/// A contiguous span of bus addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MemoryRegion {
    /// First byte address.
    pub base: u32,
    /// Length in bytes.
    pub capacity: u32,
}

impl MemoryRegion {
    /// AXI SRAM: `0x2400_0000..=0x2407_FFFF`.
    pub const RAM1: Self = Self {
        base: 0x2400_0000,
        capacity: 0x0008_0000,
    };

    /// SRAM1 + SRAM2 (contiguous in the D2 domain): `0x3000_0000..=0x3003_FFFF`.
    pub const RAM2: Self = Self {
        base: 0x3000_0000,
        capacity: 0x0004_0000,
    };

    /// One past the last byte, or `None` if it wraps.
    pub fn end(&self) -> Option<u32> {
        self.base.checked_add(self.capacity)
    }

    /// Whether two regions share any byte.
    pub fn overlaps(&self, other: &Self) -> bool {
        match (self.end(), other.end()) {
            (Some(a_end), Some(b_end)) => self.base < b_end && other.base < a_end,
            _ => true,
        }
    }

    /// Whether `self` lies entirely inside `outer`.
    pub fn within(&self, outer: &Self) -> bool {
        match (self.end(), outer.end()) {
            (Some(end), Some(outer_end)) => self.base >= outer.base && end <= outer_end,
            _ => false,
        }
    }
}

/// The two capture destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegionLayout {
    /// Destination regions in fill order.
    pub regions: [MemoryRegion; REGION_COUNT],
}

impl RegionLayout {
    /// Upper 384 KB of AXI SRAM followed by SRAM1 + SRAM2.
    pub const DEFAULT: Self = Self {
        regions: [
            MemoryRegion {
                base: 0x2402_0000,
                capacity: 0x0006_0000,
            },
            MemoryRegion::RAM2,
        ],
    };

    /// Capacities in fill order.
    pub fn capacities(&self) -> [u32; REGION_COUNT] {
        [self.regions[0].capacity, self.regions[1].capacity]
    }

    /// Combined capacity.
    pub fn total_capacity(&self) -> u32 {
        self.regions
            .iter()
            .fold(0u32, |acc, r| acc.saturating_add(r.capacity))
    }

    /// Check alignment, overlap and address-space bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for region in &self.regions {
            if region.capacity % TRANSFER_UNIT_BYTES != 0 {
                return Err(ConfigError::RegionMisaligned);
            }
            if region.base % u32::from(FIFO_WORD_BYTES) != 0 {
                return Err(ConfigError::RegionMisaligned);
            }
            if region.end().is_none() {
                return Err(ConfigError::RegionOverflow);
            }
        }
        let [a, b] = &self.regions;
        if a.capacity != 0 && b.capacity != 0 && a.overlaps(b) {
            return Err(ConfigError::RegionOverlap);
        }
        if self.total_capacity() == 0 {
            return Err(ConfigError::RegionOverflow);
        }
        Ok(())
    }
}

impl Default for RegionLayout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_is_valid() {
        RegionLayout::DEFAULT.validate().unwrap();
        assert!(RegionLayout::DEFAULT.regions[0].within(&MemoryRegion::RAM1));
        assert!(RegionLayout::DEFAULT.regions[1].within(&MemoryRegion::RAM2));
    }

    #[test]
    fn test_default_capacities() {
        assert_eq!(RegionLayout::DEFAULT.capacities(), [393_216, 262_144]);
        assert_eq!(RegionLayout::DEFAULT.total_capacity(), 655_360);
    }

    #[test]
    fn test_overlap_rejected() {
        let layout = RegionLayout {
            regions: [
                MemoryRegion {
                    base: 0x1000,
                    capacity: 0x1000,
                },
                MemoryRegion {
                    base: 0x1800,
                    capacity: 0x1000,
                },
            ],
        };
        assert_eq!(layout.validate(), Err(ConfigError::RegionOverlap));
    }

    #[test]
    fn test_misaligned_capacity_rejected() {
        let layout = RegionLayout {
            regions: [
                MemoryRegion {
                    base: 0,
                    capacity: 100,
                },
                MemoryRegion::RAM2,
            ],
        };
        assert_eq!(layout.validate(), Err(ConfigError::RegionMisaligned));
    }

    #[test]
    fn test_wrapping_region_rejected() {
        let layout = RegionLayout {
            regions: [
                MemoryRegion {
                    base: 0xFFFF_FF00,
                    capacity: 0x200,
                },
                MemoryRegion::RAM2,
            ],
        };
        assert_eq!(layout.validate(), Err(ConfigError::RegionOverflow));
    }
}
