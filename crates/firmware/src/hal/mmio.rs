//! Volatile register access to the capture block and its DMA channel.

use core::ptr;

use platform::{CaptureRegister, CaptureRegisterBus, DmaEngine, DmaError, DmaTransfer};

/// Capture register block at a fixed address.
#[derive(Debug)]
pub struct MmioCapture {
    base: usize,
}

impl MmioCapture {
    /// # Safety
    ///
    /// `base` must be the address of a capture register block, and no other
    /// `MmioCapture` may be created for it.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    fn addr(&self, reg: CaptureRegister) -> *mut u32 {
        self.base.wrapping_add(reg.offset()) as *mut u32
    }
}

impl CaptureRegisterBus for MmioCapture {
    fn read(&self, reg: CaptureRegister) -> u32 {
        // SAFETY: aligned register address inside the block handed to `new`.
        unsafe { ptr::read_volatile(self.addr(reg)) }
    }

    fn write(&self, reg: CaptureRegister, value: u32) {
        // SAFETY: as for `read`.
        unsafe { ptr::write_volatile(self.addr(reg), value) }
    }
}

/// DMA channel register offsets.
mod reg {
    pub const DADDR: usize = 0x00;
    pub const DCFG: usize = 0x04;
    pub const DCTL: usize = 0x08;
    pub const DREM: usize = 0x0C;
    pub const DSTAT: usize = 0x10;
}

/// DCFG fields: UNIT[1:0] (log2 bytes), BSIZE[11:2] (beats - 1), BCNT[31:16].
mod dcfg {
    pub const BSIZE_SHIFT: u32 = 2;
    pub const BCNT_SHIFT: u32 = 16;
}

const DCTL_EN: u32 = 0x1;
const DSTAT_BUSY: u32 = 0x1;
const DSTAT_FAULT: u32 = 0x2;

/// Block-mode DMA channel draining the capture FIFO.
#[derive(Debug)]
pub struct MmioDma {
    base: usize,
}

impl MmioDma {
    /// # Safety
    ///
    /// `base` must be the address of the capture DMA channel registers, and
    /// no other `MmioDma` may be created for it.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    fn read(&self, offset: usize) -> u32 {
        // SAFETY: aligned register inside the channel handed to `new`.
        unsafe { ptr::read_volatile(self.base.wrapping_add(offset) as *const u32) }
    }

    fn write(&self, offset: usize, value: u32) {
        // SAFETY: as for `read`.
        unsafe { ptr::write_volatile(self.base.wrapping_add(offset) as *mut u32, value) }
    }
}

/// Pack a descriptor into DCFG.
pub fn encode_config(transfer: &DmaTransfer) -> u32 {
    let unit = u32::from(transfer.unit().bytes()).trailing_zeros();
    let beats = u32::from(transfer.block_size().saturating_sub(1));
    let blocks = u32::from(transfer.block_count());
    unit | beats.wrapping_shl(dcfg::BSIZE_SHIFT) | blocks.wrapping_shl(dcfg::BCNT_SHIFT)
}

impl DmaEngine for MmioDma {
    fn configure(&self, transfer: &DmaTransfer) -> Result<(), DmaError> {
        if self.read(reg::DSTAT) & DSTAT_FAULT != 0 {
            return Err(DmaError::EngineFault);
        }
        self.write(reg::DCTL, 0);
        self.write(reg::DADDR, transfer.dest());
        self.write(reg::DCFG, encode_config(transfer));
        Ok(())
    }

    fn start(&self) {
        self.write(reg::DCTL, DCTL_EN);
    }

    fn stop(&self) {
        self.write(reg::DCTL, 0);
    }

    fn remaining_bytes(&self) -> u32 {
        self.read(reg::DREM)
    }

    fn is_transferring(&self) -> bool {
        self.read(reg::DCTL) & DCTL_EN != 0 && self.read(reg::DSTAT) & DSTAT_BUSY != 0
    }
}
