//! IP-stack capability boundary.

use crate::network::IpInfo;

/// Ethernet MTU presented by the bridge.
pub const MTU: usize = 1500;

/// Leading headroom every outbound buffer the IP stack hands to the bridge
/// must carry, so the fast path can prepend a BNEP header without
/// allocating a new buffer.
pub const TX_HEADROOM: usize = 15;

/// Contract the netif bridge drives the embedded IP stack through.
///
/// The bridge never blocks on this trait: `dhcp_start`/`dhcp_stop`/`link_up`/
/// `link_down` post a request and return; the stack's own acquisition or
/// loss of an address is reported back asynchronously through
/// [`on_ip_acquired`](IpStack::poll_ip_event) at the next `process()`.
pub trait IpStack {
    fn link_up(&mut self);
    fn link_down(&mut self);

    fn dhcp_start(&mut self);
    fn dhcp_stop(&mut self);

    /// Deliver a freshly materialized Ethernet frame (header + payload) to
    /// the stack's input path. The bridge has already copied the bytes into
    /// a buffer it owns; the stack may consume it synchronously or take
    /// ownership.
    fn receive_ethernet(&mut self, frame: &[u8]);

    /// Poll for an address-lifecycle event raised since the last call.
    fn poll_ip_event(&mut self) -> Option<IpEvent>;

    /// Milliseconds until the stack itself next needs attention (a DHCP
    /// lease renewal, an ARP retry). The supervisor folds this into
    /// `next_timeout_ms()`. Stacks with no internal timer return `u32::MAX`.
    fn next_timeout_ms(&self) -> u32 {
        u32::MAX
    }
}

/// Address-lifecycle event raised by the IP stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IpEvent {
    Acquired(IpInfo),
    Lost,
}
