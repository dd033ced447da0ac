//! BNEP channel state machine: setup negotiation, control-message policy,
//! and the pending-control retry slot.

use heapless::Vec;

use super::codec;
use super::types::{self, ControlType, EthernetFrame};
use crate::connection::BnepSessionState;
use crate::error::Error;
use crate::fmt::{debug, trace, warn};
use crate::hal::{BtHal, SendResult};
use crate::network::DeviceAddress;

/// Largest control frame the session ever builds (a Setup Connection
/// Request at 7 bytes); sized with headroom for protocol growth.
const PENDING_CONTROL_CAP: usize = 16;

/// What happened as a result of feeding the session an inbound payload.
pub enum Indication<'a> {
    /// Nothing externally observable (a reply was sent, or the frame was
    /// logged and dropped).
    None,
    SetupSucceeded,
    SetupFailed(u16),
    Ethernet(EthernetFrame<'a>),
}

pub struct BnepSession {
    state: BnepSessionState,
    local: DeviceAddress,
    remote: DeviceAddress,
    pending_control: Vec<u8, PENDING_CONTROL_CAP>,
}

impl BnepSession {
    pub const fn new() -> Self {
        Self {
            state: BnepSessionState::Closed,
            local: DeviceAddress::new([0; 6]),
            remote: DeviceAddress::new([0; 6]),
            pending_control: Vec::new(),
        }
    }

    pub fn set_local(&mut self, addr: DeviceAddress) {
        self.local = addr;
    }

    pub fn set_remote(&mut self, addr: DeviceAddress) {
        self.remote = addr;
    }

    pub fn state(&self) -> BnepSessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// L2CAP channel is up: send the Setup Connection Request and move to
    /// `WaitForResponse`. A busy HAL stashes the request; the supervisor's
    /// setup timeout drives the retry.
    pub fn on_l2cap_connected<H: BtHal>(&mut self, hal: &mut H) {
        self.state = BnepSessionState::WaitForResponse;
        let mut buf = [0u8; 7];
        let n = codec::build_setup_request(&mut buf, types::service_uuid::NAP, types::service_uuid::PANU)
            .expect("setup request fits 7-byte buffer");
        self.send_or_stash(hal, &buf[..n]);
    }

    pub fn on_l2cap_disconnected(&mut self) {
        self.state = BnepSessionState::Closed;
        self.pending_control.clear();
    }

    /// Classifies an inbound L2CAP payload and dispatches it as a control
    /// message (replying inline where the policy calls for it) or returns
    /// it as a parsed Ethernet frame for the netif bridge.
    pub fn handle_incoming<'a, H: BtHal>(
        &mut self,
        bytes: &'a [u8],
        hal: &mut H,
    ) -> Result<Indication<'a>, Error> {
        if bytes.is_empty() {
            return Err(Error::Protocol);
        }
        let info = types::parse_type_octet(bytes[0])?;
        if info.pkt_type != super::types::PacketType::Control {
            if !self.is_connected() {
                trace!("dropping ethernet frame: session not connected");
                return Ok(Indication::None);
            }
            let frame = codec::parse_ethernet_frame(bytes, self.local, self.remote)?;
            return Ok(Indication::Ethernet(frame));
        }

        if bytes.len() < 2 {
            return Err(Error::Protocol);
        }
        let control_type = ControlType::from_octet(bytes[1]);
        match control_type {
            Some(ControlType::SetupConnectionRequest) => {
                let mut buf = [0u8; 4];
                let n = codec::build_setup_response(&mut buf, types::setup_response_code::NOT_ALLOWED)
                    .expect("setup response fits 4-byte buffer");
                self.send_or_stash(hal, &buf[..n]);
                Ok(Indication::None)
            }
            Some(ControlType::SetupConnectionResponse) => {
                if self.state != BnepSessionState::WaitForResponse {
                    debug!("ignoring setup response outside WaitForResponse");
                    return Ok(Indication::None);
                }
                let code = codec::parse_setup_response(bytes)?;
                if codec::is_setup_success(code) {
                    self.state = BnepSessionState::Connected;
                    Ok(Indication::SetupSucceeded)
                } else {
                    self.state = BnepSessionState::Closed;
                    Ok(Indication::SetupFailed(code))
                }
            }
            Some(ControlType::FilterNetTypeSet) => {
                self.reply_filter_unsupported(hal, ControlType::FilterNetTypeResponse);
                Ok(Indication::None)
            }
            Some(ControlType::FilterMultiAddrSet) => {
                self.reply_filter_unsupported(hal, ControlType::FilterMultiAddrResponse);
                Ok(Indication::None)
            }
            Some(ControlType::FilterNetTypeResponse) | Some(ControlType::FilterMultiAddrResponse) => {
                // Never sent by this role; tolerated as a no-op if a peer sends one anyway.
                Ok(Indication::None)
            }
            Some(ControlType::CommandNotUnderstood) => {
                warn!("peer reported command not understood");
                Ok(Indication::None)
            }
            None => {
                let mut buf = [0u8; 3];
                let n = codec::build_command_not_understood(&mut buf, bytes[1])
                    .expect("command-not-understood fits 3-byte buffer");
                self.send_or_stash(hal, &buf[..n]);
                Ok(Indication::None)
            }
        }
    }

    /// Attempts to resend the single pending control frame. Returns `true`
    /// once the slot is empty (nothing pending, or the send succeeded).
    pub fn drain_control_tx_queue<H: BtHal>(&mut self, hal: &mut H) -> bool {
        if self.pending_control.is_empty() {
            return true;
        }
        match hal.l2cap_send(&self.pending_control) {
            SendResult::Ok => {
                self.pending_control.clear();
                true
            }
            SendResult::Busy => false,
            SendResult::Failure => {
                warn!("control send failed, dropping pending frame");
                self.pending_control.clear();
                true
            }
        }
    }

    fn reply_filter_unsupported<H: BtHal>(&mut self, hal: &mut H, response_type: ControlType) {
        let mut buf = [0u8; 4];
        let n = codec::build_filter_response(&mut buf, response_type, types::FILTER_UNSUPPORTED)
            .expect("filter response fits 4-byte buffer");
        self.send_or_stash(hal, &buf[..n]);
    }

    /// Sends a control frame immediately, or stashes it in the single
    /// pending slot and arms a can-send-now event if the HAL is busy. A new
    /// frame overwrites whatever was pending: outdated filter responses and
    /// setup requests are both superseded by anything newer.
    fn send_or_stash<H: BtHal>(&mut self, hal: &mut H, bytes: &[u8]) {
        match hal.l2cap_send(bytes) {
            SendResult::Ok => {}
            SendResult::Busy => {
                self.pending_control.clear();
                // Fits by construction: every frame built above is <= PENDING_CONTROL_CAP.
                let _ = self.pending_control.extend_from_slice(bytes);
                hal.l2cap_request_can_send_now();
            }
            SendResult::Failure => {
                warn!("control send failed");
            }
        }
    }
}

impl Default for BnepSession {
    fn default() -> Self {
        Self::new()
    }
}
