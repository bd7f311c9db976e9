//! Property-based tests for capture geometry.
//! Verifies window and range invariants hold for ALL inputs, not just fixed examples.
// Test file: unwrap and unchecked arithmetic are intentional test mechanisms.
#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

use platform::{BytesPerPixel, CaptureRange, CaptureWindow, TRANSFER_UNIT_BYTES};

fn bpp() -> impl proptest::strategy::Strategy<Value = BytesPerPixel> {
    use proptest::strategy::Strategy;
    (1u8..=3).prop_map(|b| BytesPerPixel::try_new(b).unwrap_or_default())
}

proptest::proptest! {
    /// is_valid never panics for any 16-bit field combination.
    #[test]
    fn window_validation_never_panics(hst: u16, vst: u16, hsz: u16, vsz: u16) {
        let _ = CaptureWindow::new(hst, vst, hsz, vsz).is_valid();
    }

    /// Every valid window keeps start + size inside the 12-bit counters.
    #[test]
    fn valid_window_respects_limits(hst: u16, vst: u16, hsz: u16, vsz: u16) {
        let w = CaptureWindow::new(hst, vst, hsz, vsz);
        if w.is_valid() {
            assert!(u32::from(hst) + u32::from(hsz) <= CaptureWindow::H_LIMIT);
            assert!(u32::from(vst) + u32::from(vsz) <= CaptureWindow::V_LIMIT);
            assert!(hsz >= CaptureWindow::HSZ_MIN);
            assert!(vsz >= CaptureWindow::VSZ_MIN);
        }
    }

    /// Any field above its maximum makes the window invalid.
    #[test]
    fn oversized_start_rejected(hst in 0x0FFCu16..=u16::MAX, vsz in 1u16..=4) {
        assert!(!CaptureWindow::new(hst, 0, 4, vsz).is_valid());
    }

    /// Pixel → register → pixel conversion is lossless.
    #[test]
    fn range_window_round_trip(
        xst in 0u16..=1000,
        xsize in 1u16..=1000,
        yst in 0u16..=1000,
        ysize in 1u16..=1000,
        b in bpp(),
    ) {
        let range = CaptureRange { xst, xsize, yst, ysize, bpp: b };
        let window = range.to_window().unwrap();
        assert_eq!(CaptureRange::from_window(&window, b), range);
    }

    /// Transfer alignment agrees with the frame size modulo the transfer unit.
    #[test]
    fn transfer_alignment_matches_modulus(
        xsize in 1u16..=0x0FFF,
        ysize in 1u16..=0x0FFF,
        b in bpp(),
    ) {
        let range = CaptureRange { xst: 0, xsize, yst: 0, ysize, bpp: b };
        let bytes = u32::from(xsize) * u32::from(b.get()) * u32::from(ysize);
        assert_eq!(range.frame_bytes(), Some(bytes));
        assert_eq!(range.is_transfer_aligned(), bytes % TRANSFER_UNIT_BYTES == 0);
    }
}
