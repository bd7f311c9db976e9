//! DMA region scheduler
//!
//! A frame larger than one RAM bank is split across up to two destination
//! regions. The scheduler plans the split once when the capture range is
//! set, then arms one region at a time: the DMA transfer-end interrupt
//! advances to the next non-empty region until the table is exhausted.
//!
//! ```text
//! total = 614400 (640×480×2)
//!
//! region 0  ████████████████████████  393216 B  (capacity 393216)
//! region 1  ██████████████░░░░░░░░░░  221184 B  (capacity 262144)
//! ```
//!
//! Each region is programmed as `block_count` blocks of 8 words, so every
//! capture DMA request (32 bytes) moves exactly one block.

use core::cell::Cell;
use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use platform::{DmaEngine, DmaError, DmaTransfer, RegionLayout, TransferUnit};
use platform::{REGION_COUNT, TRANSFER_UNIT_BYTES};

use super::error::RegionError;

/// Words per DMA block: one capture request.
pub const BLOCK_WORDS: u16 = 8;

/// Retries for a consistent index/remaining snapshot.
const SNAPSHOT_RETRIES: usize = 4;

/// One planned destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-logging", derive(defmt::Format))]
pub struct DmaRegion {
    /// Destination address of the first byte.
    pub base_addr: u32,
    /// Beat width.
    pub unit: TransferUnit,
    /// Units per block.
    pub block_size: u16,
    /// Blocks to move; zero marks an unused region.
    pub block_count: u16,
}

impl DmaRegion {
    /// Unused slot.
    pub const EMPTY: Self = Self {
        base_addr: 0,
        unit: TransferUnit::Word,
        block_size: BLOCK_WORDS,
        block_count: 0,
    };

    /// Bytes this region receives.
    pub fn total_bytes(&self) -> u32 {
        u32::from(self.unit.bytes())
            .saturating_mul(u32::from(self.block_size))
            .saturating_mul(u32::from(self.block_count))
    }

    /// Whether the region receives nothing.
    pub fn is_empty(&self) -> bool {
        self.block_count == 0
    }

    /// Engine programming for this region.
    pub fn transfer(&self) -> Result<DmaTransfer, DmaError> {
        DmaTransfer::new(self.base_addr, self.unit, self.block_size, self.block_count)
    }
}

impl Default for DmaRegion {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Result of advancing after a transfer-end interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-logging", derive(defmt::Format))]
pub enum Advance {
    /// Region `n` is now armed.
    Armed(usize),
    /// No non-empty region remains.
    Finished,
}

/// Split `total_bytes` across the layout, filling region 0 first.
///
/// Pure: touches no hardware and no scheduler state.
pub fn plan(total_bytes: u32, layout: &RegionLayout) -> Result<[DmaRegion; REGION_COUNT], RegionError> {
    if total_bytes == 0 {
        return Err(RegionError::ZeroLength);
    }
    if total_bytes % TRANSFER_UNIT_BYTES != 0 {
        return Err(RegionError::Misaligned);
    }
    if total_bytes > layout.total_capacity() {
        return Err(RegionError::ExceedsCapacity);
    }

    let mut table = [DmaRegion::EMPTY; REGION_COUNT];
    let mut left = total_bytes;
    for (slot, region) in table.iter_mut().zip(layout.regions.iter()) {
        let usable = region.capacity.saturating_sub(region.capacity % TRANSFER_UNIT_BYTES);
        let bytes = left.min(usable);
        if bytes == 0 {
            continue;
        }
        #[allow(clippy::arithmetic_side_effects)] // Safety: TRANSFER_UNIT_BYTES is non-zero
        let blocks = bytes / TRANSFER_UNIT_BYTES;
        let block_count = u16::try_from(blocks).map_err(|_| RegionError::ExceedsCapacity)?;
        *slot = DmaRegion {
            base_addr: region.base,
            unit: TransferUnit::Word,
            block_size: BLOCK_WORDS,
            block_count,
        };
        left = left.saturating_sub(bytes);
    }
    if left != 0 {
        return Err(RegionError::ExceedsCapacity);
    }
    Ok(table)
}

/// Region table plus the index of the region the engine is filling.
///
/// `active` is written from the DMA interrupt and read from the main loop;
/// the table itself changes only while no capture is running.
pub struct RegionScheduler {
    table: Mutex<CriticalSectionRawMutex, Cell<[DmaRegion; REGION_COUNT]>>,
    active: AtomicUsize,
    total: AtomicU32,
}

impl Default for RegionScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionScheduler {
    /// Empty table.
    pub const fn new() -> Self {
        Self {
            table: Mutex::new(Cell::new([DmaRegion::EMPTY; REGION_COUNT])),
            active: AtomicUsize::new(0),
            total: AtomicU32::new(0),
        }
    }

    /// Install a plan and rewind to region 0.
    pub fn load(&self, regions: [DmaRegion; REGION_COUNT], total_bytes: u32) {
        self.table.lock(|t| t.set(regions));
        self.total.store(total_bytes, Ordering::Release);
        self.rewind();
    }

    /// Current table.
    pub fn regions(&self) -> [DmaRegion; REGION_COUNT] {
        self.table.lock(Cell::get)
    }

    /// Planned frame size.
    pub fn total_bytes(&self) -> u32 {
        self.total.load(Ordering::Acquire)
    }

    /// Index of the region being filled; `REGION_COUNT` once finished.
    pub fn active_index(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Whether every region has been handed to the engine and completed.
    pub fn is_finished(&self) -> bool {
        self.active_index() >= REGION_COUNT
    }

    /// Back to region 0 for the next session.
    pub fn rewind(&self) {
        self.active.store(0, Ordering::Release);
    }

    fn region(&self, index: usize) -> Option<DmaRegion> {
        self.table.lock(|t| t.get().get(index).copied())
    }

    /// Program and start the engine for region `index`.
    pub fn setup<D: DmaEngine>(&self, index: usize, dma: &D) -> Result<(), RegionError> {
        let region = self.region(index).ok_or(RegionError::IndexOutOfRange)?;
        if region.is_empty() {
            return Err(RegionError::EmptyRegion);
        }
        dma.configure(&region.transfer()?)?;
        dma.start();
        Ok(())
    }

    /// Advance past the completed region to the next non-empty one.
    ///
    /// The active index moves only after the next region is armed, so a
    /// failed arm leaves the completed region's accounting in place.
    pub fn on_transfer_complete<D: DmaEngine>(&self, dma: &D) -> Result<Advance, RegionError> {
        let mut next = self.active_index().saturating_add(1);
        while next < REGION_COUNT {
            if self.region(next).is_some_and(|r| !r.is_empty()) {
                self.setup(next, dma)?;
                self.active.store(next, Ordering::Release);
                return Ok(Advance::Armed(next));
            }
            next = next.saturating_add(1);
        }
        self.active.store(REGION_COUNT, Ordering::Release);
        Ok(Advance::Finished)
    }

    /// Bytes written so far: completed regions plus progress in the active one.
    ///
    /// Re-reads the active index around the engine readback so a region
    /// switch in between is never mixed with the wrong remaining count.
    pub fn received_length<D: DmaEngine>(&self, dma: &D) -> u32 {
        let mut index = self.active_index();
        let mut remaining = dma.remaining_bytes();
        for _ in 0..SNAPSHOT_RETRIES {
            let again = self.active_index();
            if again == index {
                break;
            }
            index = again;
            remaining = dma.remaining_bytes();
        }
        self.length_at(index, remaining)
    }

    fn length_at(&self, index: usize, remaining: u32) -> u32 {
        let table = self.regions();
        let done = table
            .iter()
            .take(index)
            .fold(0u32, |acc, r| acc.saturating_add(r.total_bytes()));
        match table.get(index) {
            Some(active) => {
                done.saturating_add(active.total_bytes().saturating_sub(remaining))
            }
            None => done,
        }
    }
}
