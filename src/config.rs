//! Runtime and compile-time configuration.

use crate::network::DeviceAddress;

/// Per-instance, runtime-configurable parameters.
///
/// A fresh `Config` reconnects once a second, backs off to once every
/// thirty seconds, and retries forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Bluetooth device address of the NAP peer to connect to.
    pub remote_addr: DeviceAddress,
    /// Initial reconnect delay.
    pub reconnect_interval_ms: u32,
    /// Reconnect delay cap; backoff never exceeds this.
    pub reconnect_max_ms: u32,
    /// Accepted and stored; the core never consults these itself — they
    /// exist for an application-level heartbeat layered on top.
    pub heartbeat_interval_ms: u32,
    pub heartbeat_retries: u8,
    /// 0 means retry forever.
    pub max_reconnect_attempts: u32,
}

impl Config {
    pub const fn new(remote_addr: DeviceAddress) -> Self {
        Self {
            remote_addr,
            reconnect_interval_ms: 1000,
            reconnect_max_ms: 30_000,
            heartbeat_interval_ms: 15_000,
            heartbeat_retries: 3,
            max_reconnect_attempts: 0,
        }
    }

    const DEFAULT: Config = Config::new(DeviceAddress::BROADCAST);
}

impl Default for Config {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Parameters fixed at build time, generic over the concrete implementer
/// rather than stored per-instance.
pub trait PanuConfig {
    /// Bounded wait for an L2CAP connect result before giving up and
    /// scheduling a reconnect.
    const L2CAP_CONNECT_TIMEOUT_MS: u32 = 10_000;
    /// Bounded wait for a BNEP setup response before retrying the request.
    const BNEP_SETUP_TIMEOUT_MS: u32 = 5_000;
    /// Setup request retries before giving up on this connection attempt.
    const BNEP_SETUP_RETRIES: u8 = 3;
    /// Bounded wait for DHCP; on expiry the core logs and defers to the IP
    /// stack's own retry rather than tearing the link down.
    const DHCP_TIMEOUT_MS: u32 = 30_000;
    /// Depth of the bridge's bounded transmit queue. Must be at least 8.
    const TX_QUEUE_LEN: usize = 16;
    /// Ethernet payload MTU handed to the IP stack.
    const MAX_FRAME_SIZE: usize = 1500;
    /// Negotiated L2CAP MTU; must be at least 1691 to carry a full BNEP
    /// general-Ethernet frame without fragmentation.
    const L2CAP_MTU: u16 = 1691;
    /// Use compressed BNEP framing when the addresses allow it.
    const COMPRESSION: bool = true;
    /// Force the 15-byte general-Ethernet header even when compression
    /// would apply, for peers with broken compressed-frame handling.
    const FORCE_UNCOMPRESSED_TX: bool = false;
    /// Whether the supervisor schedules a reconnect on link loss, or
    /// transitions straight to `Error`.
    const AUTO_RECONNECT: bool = true;
}

/// The default compile-time parameter set; use this or a zero-sized type
/// implementing [`PanuConfig`] with overrides.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConfig;

impl PanuConfig for DefaultConfig {}
