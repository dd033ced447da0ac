//! Logging facade: forwards to `defmt` or `log`, whichever feature is enabled.
//!
//! Mirrors the dual-backend pattern used throughout the embassy ecosystem so
//! the same `trace!`/`debug!`/`info!`/`warn!`/`error!` call sites work on a
//! `defmt`-only embedded target and on a `log`-backed host build without
//! `#[cfg]`-splitting every call site.

#![allow(unused)]

macro_rules! log {
    ($level:ident, $s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "log")]
            ::log::$level!($s $(, $x)*);
            #[cfg(feature = "defmt")]
            ::defmt::$level!($s $(, $x)*);
            #[cfg(not(any(feature = "log", feature = "defmt")))]
            let _ = ($(&$x),*);
        }
    };
}

macro_rules! trace {
    ($($x:tt)*) => { crate::fmt::log!(trace, $($x)*) };
}

macro_rules! debug {
    ($($x:tt)*) => { crate::fmt::log!(debug, $($x)*) };
}

macro_rules! info {
    ($($x:tt)*) => { crate::fmt::log!(info, $($x)*) };
}

macro_rules! warn {
    ($($x:tt)*) => { crate::fmt::log!(warn, $($x)*) };
}

macro_rules! error {
    ($($x:tt)*) => { crate::fmt::log!(error, $($x)*) };
}

pub(crate) use {debug, error, info, log, trace, warn};
