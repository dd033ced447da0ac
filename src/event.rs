//! Notification stream emitted toward the application.

use crate::connection::ConnectionState;
use crate::network::IpInfo;

/// A single notification fired from `process()` or an injected HAL/IP-stack
/// event. Delivered synchronously, on the caller's own stack, before the
/// call that provoked it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// The public connection state changed. Fired at most once per
    /// `process()` call, and only when the new state differs from the last
    /// reported one.
    StateChanged(ConnectionState),
    /// The BNEP session completed setup and the link is usable.
    Connected,
    /// The L2CAP channel or BNEP session was torn down. Fired exactly once
    /// per `stop()` from any non-`Idle` state.
    Disconnected,
    /// DHCP completed; `ip_info()` now returns the given configuration.
    IpAcquired(IpInfo),
    /// The IP stack reported the lease lost or expired.
    IpLost,
    /// A permanent failure moved the connection to `Error`.
    Error,
}

/// Receives the event stream. Implemented by the application; the core
/// never stores more than one sink and never queues events — a sink that
/// blocks blocks `process()` too.
pub trait EventSink {
    fn on_event(&mut self, event: Event);
}

/// An [`EventSink`] that discards every event, for applications that only
/// poll `state()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn on_event(&mut self, _event: Event) {}
}
