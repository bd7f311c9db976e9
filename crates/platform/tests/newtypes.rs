//! Type system enforcement tests for capture domain newtypes.
//! These newtypes keep out-of-range register values from ever reaching hardware.
#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

// ── BytesPerPixel ────────────────────────────────────────────────────────────

#[test]
fn bytes_per_pixel_accepts_one_to_three() {
    use platform::BytesPerPixel;
    for b in 1..=3 {
        assert_eq!(BytesPerPixel::try_new(b).map(BytesPerPixel::get), Ok(b));
    }
}

#[test]
fn bytes_per_pixel_reports_range_on_error() {
    use platform::{BytesPerPixel, OutOfRangeError};
    assert_eq!(
        BytesPerPixel::try_new(4),
        Err(OutOfRangeError {
            value: 4,
            min: 1,
            max: 3
        })
    );
}

#[test]
fn bytes_per_pixel_is_one_byte() {
    use platform::BytesPerPixel;
    assert_eq!(core::mem::size_of::<BytesPerPixel>(), 1);
}

// ── InterruptPriority ────────────────────────────────────────────────────────

#[test]
fn interrupt_priority_rejects_zero() {
    use platform::InterruptPriority;
    assert!(InterruptPriority::try_new(0).is_err());
}

#[test]
fn interrupt_priority_default_is_two() {
    use platform::InterruptPriority;
    assert_eq!(InterruptPriority::default().get(), 2);
}

// ── PixelClockDivider ────────────────────────────────────────────────────────

#[test]
fn pixel_clock_divider_only_even_values() {
    use platform::PixelClockDivider;
    let valid: Vec<u8> = (0..=20)
        .filter(|n| PixelClockDivider::new(*n).is_some())
        .collect();
    assert_eq!(valid, vec![2, 4, 6, 8, 10, 12, 14, 16]);
}

// ── TransferUnit / DmaTransfer ───────────────────────────────────────────────

#[test]
fn dma_transfer_for_full_region_zero() {
    use platform::{DmaTransfer, RegionLayout, TransferUnit};
    let region = RegionLayout::DEFAULT.regions[0];
    let blocks = u16::try_from(region.capacity / 32).unwrap();
    let t = DmaTransfer::new(region.base, TransferUnit::Word, 8, blocks).unwrap();
    assert_eq!(t.total_bytes(), region.capacity);
}

#[test]
fn dma_transfer_unit_must_be_power_of_two_up_to_four() {
    use platform::{DmaError, TransferUnit};
    assert_eq!(TransferUnit::try_from(8), Err(DmaError::InvalidUnit));
    assert_eq!(TransferUnit::try_from(2), Ok(TransferUnit::HalfWord));
}

// ── Errors render for the console ────────────────────────────────────────────

#[test]
fn errors_have_display_text() {
    use platform::{ConfigError, DmaError, InterruptError};
    assert_eq!(
        DmaError::InvalidBlockSize.to_string(),
        "block size must be 1..=1024 units"
    );
    assert_eq!(
        InterruptError::RegistrationFailed.to_string(),
        "interrupt line registration failed"
    );
    assert_eq!(ConfigError::RegionOverlap.to_string(), "capture regions overlap");
}
