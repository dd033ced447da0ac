//! Crate-wide error taxonomy.
//!
//! A flat enum with hand-written conversions — no `thiserror`; the core
//! never needed derive-macro error boilerplate for a dozen-variant enum.

/// Failure surfaced to the application through the public API.
///
/// Internal failures that the core recovers from on its own (a busy HAL
/// send, a malformed BNEP control frame, a setup rejection) are handled
/// locally and never reach this type. This enum covers only the
/// lifecycle-call and resource-exhaustion cases a caller must itself react
/// to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A parameter was out of range or otherwise invalid.
    InvalidParameter,
    /// `start`/`process`/`stop` called before `init`.
    NotInitialized,
    /// `start` called while already connecting, connected, or reconnecting.
    AlreadyStarted,
    /// An operation that requires an active session was called from `Idle`.
    NotStarted,
    /// The HAL reported a non-recoverable failure.
    HalFailure,
    /// The BNEP peer sent a malformed or unexpected packet.
    Protocol,
    /// An expected event did not arrive within its bounded window.
    Timeout,
    /// The TX queue is full or a buffer allocation failed.
    ResourceExhausted,
    /// Transient backpressure; retry later.
    Busy,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Error::InvalidParameter => "invalid parameter",
            Error::NotInitialized => "not initialized",
            Error::AlreadyStarted => "already started",
            Error::NotStarted => "not started",
            Error::HalFailure => "HAL failure",
            Error::Protocol => "BNEP protocol error",
            Error::Timeout => "timeout",
            Error::ResourceExhausted => "resource exhausted",
            Error::Busy => "busy",
        };
        f.write_str(s)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
