#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
//! Bluetooth PAN User (PANU) client core.
//!
//! Brings a host device onto a peer's Personal Area Network: establishes an
//! L2CAP channel, negotiates a BNEP session on it, and bridges the resulting
//! Ethernet transport to an embedded IP stack. See [`PanuClient`] for the
//! public entry point and [`bnep`] for the wire protocol.

mod fmt;

pub mod bnep;
mod client;
mod config;
mod connection;
pub mod error;
pub mod event;
pub mod hal;
pub mod ip_stack;
mod netif;
mod network;
mod supervisor;

#[cfg(test)]
mod test_helpers;

pub use client::PanuClient;
pub use config::{Config, DefaultConfig, PanuConfig};
pub use connection::{BnepSessionState, ConnectionState};
pub use error::Error;
pub use event::{Event, EventSink, NullEventSink};
pub use hal::{BtHal, HalEvent, SendResult, BNEP_PSM, MIN_L2CAP_MTU};
pub use ip_stack::{IpEvent, IpStack, MTU, TX_HEADROOM};
pub use network::{DeviceAddress, IpInfo};

/// BNEP/PANU protocol version this crate implements, separate from the
/// crate's own `CARGO_PKG_VERSION`, for downstream code that wants to log or
/// negotiate on it independently of the crate's release version.
pub const PROTOCOL_VERSION: (u8, u8, u8) = (1, 0, 0);
