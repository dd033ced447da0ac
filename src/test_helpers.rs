//! Shared mock scaffolding for unit and scenario tests.
//!
//! Built on `std` (this module is only compiled under `cfg(test)`), so it
//! can use `std::vec::Vec` freely instead of fixed-capacity `heapless`
//! collections — the production code under test never does.

use std::vec::Vec;

use crate::event::{Event, EventSink};
use crate::hal::{BtHal, HalEvent, SendResult};
use crate::ip_stack::{IpEvent, IpStack};
use crate::network::{DeviceAddress, IpInfo};

/// A fake radio HAL. Records every send and connect request; event and
/// receive queues are drained FIFO by `poll_event`/`poll_recv`.
pub struct MockHal {
    pub sent: Vec<Vec<u8>>,
    pub next_send_result: SendResult,
    pub can_send_now_requested: bool,
    pub connect_requests: Vec<(DeviceAddress, u16)>,
    pub disconnect_count: u32,
    pub local_addr: DeviceAddress,
    pub tick_ms: u32,
    events: Vec<HalEvent>,
    recv_queue: Vec<Vec<u8>>,
}

impl MockHal {
    pub fn new() -> Self {
        Self {
            sent: Vec::new(),
            next_send_result: SendResult::Ok,
            can_send_now_requested: false,
            connect_requests: Vec::new(),
            disconnect_count: 0,
            local_addr: DeviceAddress::new([0x10, 0x20, 0x30, 0x40, 0x50, 0x60]),
            tick_ms: 0,
            events: Vec::new(),
            recv_queue: Vec::new(),
        }
    }

    pub fn push_event(&mut self, event: HalEvent) {
        self.events.push(event);
    }

    pub fn push_recv(&mut self, bytes: &[u8]) {
        self.recv_queue.push(bytes.to_vec());
    }

    pub fn advance(&mut self, millis: u32) {
        self.tick_ms = self.tick_ms.wrapping_add(millis);
    }
}

impl Default for MockHal {
    fn default() -> Self {
        Self::new()
    }
}

impl BtHal for MockHal {
    fn bt_init(&mut self) -> Result<(), crate::error::Error> {
        Ok(())
    }

    fn bt_deinit(&mut self) {}

    fn l2cap_connect(&mut self, remote: DeviceAddress, local_mtu: u16) {
        self.connect_requests.push((remote, local_mtu));
    }

    fn l2cap_disconnect(&mut self) {
        self.disconnect_count += 1;
    }

    fn l2cap_send(&mut self, bytes: &[u8]) -> SendResult {
        if self.next_send_result == SendResult::Ok {
            self.sent.push(bytes.to_vec());
        }
        self.next_send_result
    }

    fn l2cap_can_send(&self) -> bool {
        self.next_send_result == SendResult::Ok
    }

    fn l2cap_request_can_send_now(&mut self) {
        self.can_send_now_requested = true;
    }

    fn get_local_bd_addr(&self) -> DeviceAddress {
        self.local_addr
    }

    fn get_tick_ms(&self) -> u32 {
        self.tick_ms
    }

    fn poll_recv(&mut self, out: &mut [u8]) -> Option<usize> {
        if self.recv_queue.is_empty() {
            return None;
        }
        let bytes = self.recv_queue.remove(0);
        let n = bytes.len().min(out.len());
        out[..n].copy_from_slice(&bytes[..n]);
        Some(n)
    }

    fn poll_event(&mut self) -> Option<HalEvent> {
        if self.events.is_empty() {
            None
        } else {
            Some(self.events.remove(0))
        }
    }
}

/// A fake IP stack. Records link/DHCP signaling calls and lets tests queue
/// `IpEvent`s and inbound Ethernet frames to assert on.
pub struct MockIpStack {
    pub link_up_count: u32,
    pub link_down_count: u32,
    pub dhcp_start_count: u32,
    pub dhcp_stop_count: u32,
    pub received: Vec<Vec<u8>>,
    events: Vec<IpEvent>,
}

impl MockIpStack {
    pub fn new() -> Self {
        Self {
            link_up_count: 0,
            link_down_count: 0,
            dhcp_start_count: 0,
            dhcp_stop_count: 0,
            received: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn push_event(&mut self, event: IpEvent) {
        self.events.push(event);
    }
}

impl Default for MockIpStack {
    fn default() -> Self {
        Self::new()
    }
}

impl IpStack for MockIpStack {
    fn link_up(&mut self) {
        self.link_up_count += 1;
    }

    fn link_down(&mut self) {
        self.link_down_count += 1;
    }

    fn dhcp_start(&mut self) {
        self.dhcp_start_count += 1;
    }

    fn dhcp_stop(&mut self) {
        self.dhcp_stop_count += 1;
    }

    fn receive_ethernet(&mut self, frame: &[u8]) {
        self.received.push(frame.to_vec());
    }

    fn poll_ip_event(&mut self) -> Option<IpEvent> {
        if self.events.is_empty() {
            None
        } else {
            Some(self.events.remove(0))
        }
    }
}

pub fn sample_ip_info() -> IpInfo {
    IpInfo::new(
        "192.168.1.50".parse().unwrap(),
        "255.255.255.0".parse().unwrap(),
        "192.168.1.1".parse().unwrap(),
        "192.168.1.1".parse().unwrap(),
    )
}

/// Records every event it receives, in order, for assertions.
#[derive(Default)]
pub struct RecordingEventSink {
    pub events: Vec<Event>,
}

impl EventSink for RecordingEventSink {
    fn on_event(&mut self, event: Event) {
        self.events.push(event);
    }
}
