//! Transport-to-IP adapter: presents the BNEP session as an Ethernet
//! interface, with a bounded TX queue and a zero-copy fast path for the
//! common case of an idle radio and a contiguous outbound buffer.

use heapless::{Deque, Vec};

use crate::bnep::codec;
use crate::bnep::session::BnepSession;
use crate::bnep::types::EthernetFrame;
use crate::config::PanuConfig;
use crate::error::Error;
use crate::fmt::warn;
use crate::hal::{BtHal, SendResult};
use crate::ip_stack::IpStack;
use crate::network::DeviceAddress;

/// Largest BNEP-encapsulated frame the bridge ever builds: a general
/// header (15 bytes) plus a full 1500-byte Ethernet payload.
const MAX_ENCAPSULATED_FRAME: usize = 15 + 1500;
/// Largest Ethernet frame (header + payload) the bridge hands to the IP
/// stack on the inbound path.
const MAX_ETH_FRAME: usize = 14 + 1500;

type FrameBuf = Vec<u8, MAX_ENCAPSULATED_FRAME>;

/// Bounded single-producer single-consumer ring of owned, fully
/// BNEP-encapsulated frames awaiting the HAL.
pub struct NetifBridge<const N: usize> {
    local_mac: DeviceAddress,
    remote_mac: DeviceAddress,
    link_up: bool,
    queue: Deque<FrameBuf, N>,
}

impl<const N: usize> NetifBridge<N> {
    pub fn new() -> Self {
        debug_assert!(N >= 8, "tx_queue_len must be at least 8");
        Self {
            local_mac: DeviceAddress::default(),
            remote_mac: DeviceAddress::default(),
            link_up: false,
            queue: Deque::new(),
        }
    }

    /// Derives and stores the locally administered MAC the IP stack sees
    /// as this interface's hardware address.
    pub fn set_local_bd_addr(&mut self, bd_addr: DeviceAddress) {
        self.local_mac = bd_addr.to_locally_administered_mac();
    }

    pub fn local_mac(&self) -> DeviceAddress {
        self.local_mac
    }

    pub fn set_remote(&mut self, remote: DeviceAddress) {
        self.remote_mac = remote;
    }

    pub fn set_link_up(&mut self, up: bool) {
        self.link_up = up;
    }

    pub fn is_link_up(&self) -> bool {
        self.link_up
    }

    /// All queued frames are freed and the queue reset to empty, as on
    /// `stop`.
    pub fn flush(&mut self) {
        self.queue.clear();
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Outbound path. `buf[frame_offset..frame_offset + frame_len]` is a
    /// standard Ethernet frame (14-byte header + payload); the caller must
    /// reserve at least 15 bytes before `frame_offset` for the fast path to
    /// be eligible.
    pub fn send_ethernet_frame<H: BtHal, C: PanuConfig>(
        &mut self,
        buf: &mut [u8],
        frame_offset: usize,
        frame_len: usize,
        hal: &mut H,
    ) -> Result<(), Error> {
        if frame_len < 14 {
            return Err(Error::InvalidParameter);
        }
        match frame_offset.checked_add(frame_len) {
            Some(end) if end <= buf.len() => {}
            _ => return Err(Error::InvalidParameter),
        }
        if !self.link_up {
            return Err(Error::NotStarted);
        }

        let dst = DeviceAddress::new(buf[frame_offset..frame_offset + 6].try_into().unwrap());
        let src = DeviceAddress::new(buf[frame_offset + 6..frame_offset + 12].try_into().unwrap());
        let header_len =
            codec::select_tx_header_len(dst, src, self.local_mac, self.remote_mac, C::COMPRESSION, C::FORCE_UNCOMPRESSED_TX);

        let fast_path_eligible = self.queue.is_empty() && hal.l2cap_can_send() && frame_offset >= 15;
        if fast_path_eligible {
            let new_start = frame_offset + 14 - header_len;
            let type_octet = if header_len == 15 { 0x00 } else { 0x02 };
            let saved = buf[new_start];
            buf[new_start] = type_octet;
            let send_len = header_len + (frame_len - 14);
            let result = hal.l2cap_send(&buf[new_start..new_start + send_len]);
            buf[new_start] = saved;
            match result {
                SendResult::Ok => return Ok(()),
                SendResult::Failure => return Err(Error::HalFailure),
                SendResult::Busy => {} // fall through to the slow path below
            }
        }

        self.send_slow_path::<H, C>(dst, src, &buf[frame_offset..frame_offset + frame_len], hal)
    }

    fn send_slow_path<H: BtHal, C: PanuConfig>(
        &mut self,
        dst: DeviceAddress,
        src: DeviceAddress,
        eth_frame: &[u8],
        hal: &mut H,
    ) -> Result<(), Error> {
        let ethertype = u16::from_be_bytes([eth_frame[12], eth_frame[13]]);
        let payload = &eth_frame[14..];
        let header_len =
            codec::select_tx_header_len(dst, src, self.local_mac, self.remote_mac, C::COMPRESSION, C::FORCE_UNCOMPRESSED_TX);

        let mut scratch = [0u8; MAX_ENCAPSULATED_FRAME];
        let n = if header_len == 15 {
            codec::build_general_ethernet(&mut scratch, dst, src, ethertype, payload)?
        } else {
            codec::build_compressed_ethernet(&mut scratch, ethertype, payload)?
        };
        let owned = FrameBuf::from_slice(&scratch[..n]).map_err(|_| Error::ResourceExhausted)?;

        if self.queue.is_empty() && hal.l2cap_can_send() {
            match hal.l2cap_send(&owned) {
                SendResult::Ok => Ok(()),
                SendResult::Busy => self.enqueue(owned, hal),
                SendResult::Failure => Err(Error::HalFailure),
            }
        } else {
            self.enqueue(owned, hal)
        }
    }

    fn enqueue<H: BtHal>(&mut self, frame: FrameBuf, hal: &mut H) -> Result<(), Error> {
        if self.queue.push_back(frame).is_err() {
            warn!("tx queue full, dropping newest frame");
            return Err(Error::ResourceExhausted);
        }
        hal.l2cap_request_can_send_now();
        Ok(())
    }

    /// Can-send-now handler: drains the session's single control slot
    /// first, then pops queued Ethernet frames as long as the HAL accepts
    /// them.
    pub fn on_can_send_now<H: BtHal>(&mut self, hal: &mut H, session: &mut BnepSession) {
        if !session.drain_control_tx_queue(hal) {
            return;
        }
        while hal.l2cap_can_send() {
            let Some(frame) = self.queue.pop_front() else {
                break;
            };
            match hal.l2cap_send(&frame) {
                SendResult::Ok => {}
                SendResult::Busy => {
                    let _ = self.queue.push_front(frame);
                    break;
                }
                SendResult::Failure => {
                    warn!("tx send failed, dropping frame");
                }
            }
        }
    }

    /// Inbound path: materializes a contiguous Ethernet frame and hands it
    /// to the IP stack. Drops (and logs) frames too large for the scratch
    /// buffer rather than failing the caller.
    pub fn on_ethernet_received<Ip: IpStack>(&mut self, frame: EthernetFrame<'_>, ip_stack: &mut Ip) {
        let total = 14 + frame.payload.len();
        if total > MAX_ETH_FRAME {
            warn!("dropping oversized inbound frame");
            return;
        }
        let mut buf = [0u8; MAX_ETH_FRAME];
        buf[0..6].copy_from_slice(&frame.dst);
        buf[6..12].copy_from_slice(&frame.src);
        buf[12..14].copy_from_slice(&frame.ethertype.to_be_bytes());
        buf[14..total].copy_from_slice(frame.payload);
        ip_stack.receive_ethernet(&buf[..total]);
    }
}

impl<const N: usize> Default for NetifBridge<N> {
    fn default() -> Self {
        Self::new()
    }
}
