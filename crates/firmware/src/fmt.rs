//! Logging macros
//!
//! On target the capture drivers log through defmt over RTT; host builds
//! with `host-log` route the same call sites to `tracing`. With neither
//! backend the arguments are still borrowed so no call site warns about
//! unused values.
//!
//! Format strings must stay within the subset both backends accept: plain
//! `{}` placeholders, with arguments that implement both `defmt::Format`
//! and `Display`.

#![macro_use]
#![allow(unused_macros)]

macro_rules! trace {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt-logging")]
            ::defmt::trace!($s $(, $x)*);
            #[cfg(all(feature = "host-log", not(feature = "defmt-logging")))]
            ::tracing::trace!($s $(, $x)*);
            #[cfg(not(any(feature = "defmt-logging", feature = "host-log")))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! debug {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt-logging")]
            ::defmt::debug!($s $(, $x)*);
            #[cfg(all(feature = "host-log", not(feature = "defmt-logging")))]
            ::tracing::debug!($s $(, $x)*);
            #[cfg(not(any(feature = "defmt-logging", feature = "host-log")))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! info {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt-logging")]
            ::defmt::info!($s $(, $x)*);
            #[cfg(all(feature = "host-log", not(feature = "defmt-logging")))]
            ::tracing::info!($s $(, $x)*);
            #[cfg(not(any(feature = "defmt-logging", feature = "host-log")))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt-logging")]
            ::defmt::warn!($s $(, $x)*);
            #[cfg(all(feature = "host-log", not(feature = "defmt-logging")))]
            ::tracing::warn!($s $(, $x)*);
            #[cfg(not(any(feature = "defmt-logging", feature = "host-log")))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! error {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt-logging")]
            ::defmt::error!($s $(, $x)*);
            #[cfg(all(feature = "host-log", not(feature = "defmt-logging")))]
            ::tracing::error!($s $(, $x)*);
            #[cfg(not(any(feature = "defmt-logging", feature = "host-log")))]
            let _ = ($( & $x ),*);
        }
    };
}
