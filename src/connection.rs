//! Connection and BNEP session state enumerations.

/// Top-level connection lifecycle, driven exclusively by the supervisor.
///
/// `Scanning` and `Stalled` are reserved for API stability — device
/// discovery and link-health monitoring are not implemented — and are
/// otherwise unreachable. `process` and the event handlers never construct
/// these variants; the supervisor asserts as much in its own unit tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    Idle,
    /// Reserved: device discovery is not implemented.
    Scanning,
    Connecting,
    BnepSetup,
    Dhcp,
    Online,
    /// Reserved: heartbeat/link-health monitoring is not implemented.
    Stalled,
    Reconnecting,
    Error,
}

impl ConnectionState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "Idle",
            ConnectionState::Scanning => "Scanning",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::BnepSetup => "BnepSetup",
            ConnectionState::Dhcp => "Dhcp",
            ConnectionState::Online => "Online",
            ConnectionState::Stalled => "Stalled",
            ConnectionState::Reconnecting => "Reconnecting",
            ConnectionState::Error => "Error",
        }
    }
}

impl core::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of the BNEP channel itself, owned by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BnepSessionState {
    Closed,
    /// Reserved: this crate only implements the PANU (client) role, so the
    /// server-side "wait for incoming setup request" state is never
    /// entered — incoming setup requests are always answered Not Allowed.
    WaitForRequest,
    WaitForResponse,
    Connected,
}

impl BnepSessionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, BnepSessionState::Connected)
    }
}
