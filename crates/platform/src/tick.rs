//! Millisecond tick source
//!
//! All capture timeouts (reset completion, console idle) are measured
//! against a free-running, wrapping millisecond counter. Differences are
//! taken with wrapping subtraction, so a wrap every ~49.7 days is harmless
//! as long as no single timeout exceeds that span.

/// Monotonic millisecond counter.
pub trait TickSource {
    /// Current tick in milliseconds (wraps at `u32::MAX`).
    fn now_ms(&self) -> u32;

    /// Milliseconds elapsed since `start`, wrap-safe.
    fn elapsed_since(&self, start: u32) -> u32 {
        self.now_ms().wrapping_sub(start)
    }
}

impl<T: TickSource + ?Sized> TickSource for &T {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Tick source backed by the Embassy time driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyTick;

impl TickSource for EmbassyTick {
    #[allow(clippy::cast_possible_truncation)] // TickSource counts in wrapping u32 milliseconds
    fn now_ms(&self) -> u32 {
        embassy_time::Instant::now().as_millis() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(u32);

    impl TickSource for Fixed {
        fn now_ms(&self) -> u32 {
            self.0
        }
    }

    #[test]
    fn test_elapsed_handles_wrap() {
        let tick = Fixed(5);
        assert_eq!(tick.elapsed_since(u32::MAX - 4), 10);
    }

    #[test]
    fn test_elapsed_plain() {
        let tick = Fixed(600);
        assert_eq!(tick.elapsed_since(100), 500);
    }

    #[test]
    fn test_embassy_tick_is_monotonic() {
        let tick = EmbassyTick;
        let a = tick.now_ms();
        let b = tick.now_ms();
        assert!(b.wrapping_sub(a) < 1_000);
    }
}
