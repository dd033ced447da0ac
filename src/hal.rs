//! Radio/Bluetooth-host capability boundary.
//!
//! One narrow trait in place of the dozen callback-plus-user-data pairs a
//! typical vendor Bluetooth stack wires up; a platform backend implements
//! this directly against its own L2CAP API.

use crate::network::DeviceAddress;

/// Outcome of a non-blocking send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendResult {
    Ok,
    /// Transient backpressure; the caller should retry after a can-send-now
    /// event.
    Busy,
    Failure,
}

/// Event the HAL reports through [`BtHal::poll_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalEvent {
    Connected,
    Disconnected,
    ConnectFailed(u16),
    /// Edge-triggered: fires once per [`BtHal::l2cap_request_can_send_now`]
    /// call, after the channel becomes ready to send again.
    CanSendNow,
}

/// L2CAP PSM reserved for BNEP.
pub const BNEP_PSM: u16 = 0x000F;

/// Minimum L2CAP MTU a BNEP peer must negotiate to carry a full
/// general-Ethernet frame without fragmentation.
pub const MIN_L2CAP_MTU: u16 = 1691;

/// Bluetooth host/controller capability boundary consumed by the core.
///
/// All operations are non-blocking; results that are not immediately known
/// (connect outcome, send backpressure clearing) arrive later as a
/// [`HalEvent`] through [`poll_event`](BtHal::poll_event) or
/// [`poll_recv`](BtHal::poll_recv), which the core drains once per
/// `process()` call.
pub trait BtHal {
    fn bt_init(&mut self) -> Result<(), crate::error::Error>;
    fn bt_deinit(&mut self);

    /// Begin an L2CAP connection to `remote` on the BNEP PSM. The outcome
    /// arrives as `HalEvent::Connected` or `HalEvent::ConnectFailed`.
    fn l2cap_connect(&mut self, remote: DeviceAddress, local_mtu: u16);
    fn l2cap_disconnect(&mut self);
    fn l2cap_send(&mut self, bytes: &[u8]) -> SendResult;
    fn l2cap_can_send(&self) -> bool;
    /// Arm a one-shot `HalEvent::CanSendNow` for the next time the channel
    /// can accept data. A no-op if the channel can already send.
    fn l2cap_request_can_send_now(&mut self);

    fn get_local_bd_addr(&self) -> DeviceAddress;
    /// Monotonic millisecond tick. May wrap; callers must use wrapping
    /// subtraction when computing elapsed time.
    fn get_tick_ms(&self) -> u32;

    /// Drain the next pending inbound L2CAP payload, if any. Returns the
    /// number of bytes written into `out`.
    fn poll_recv(&mut self, out: &mut [u8]) -> Option<usize>;
    /// Drain the next pending HAL event, if any.
    fn poll_event(&mut self) -> Option<HalEvent>;

    /// Load opaque bonding/configuration state. Optional; backends with no
    /// non-volatile storage return `Err`, which the core only logs.
    fn nv_load(&mut self, _out: &mut [u8]) -> Result<usize, crate::error::Error> {
        Err(crate::error::Error::InvalidParameter)
    }
    /// Persist opaque bonding/configuration state. Optional; backends with
    /// no non-volatile storage return `Err`, which the core only logs.
    fn nv_save(&mut self, _data: &[u8]) -> Result<(), crate::error::Error> {
        Err(crate::error::Error::InvalidParameter)
    }
}
