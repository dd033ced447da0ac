//! Top-level client: wires the session, supervisor and netif bridge to the
//! three capability traits and exposes the public lifecycle API.

use crate::bnep::session::{BnepSession, Indication};
use crate::config::{Config, PanuConfig};
use crate::connection::ConnectionState;
use crate::error::Error;
use crate::event::EventSink;
use crate::fmt::debug;
use crate::hal::{BtHal, HalEvent, MIN_L2CAP_MTU};
use crate::ip_stack::{IpEvent, IpStack};
use crate::netif::NetifBridge;
use crate::network::IpInfo;
use crate::supervisor::Supervisor;

/// A PANU client bound to a concrete HAL, IP stack, and event sink.
///
/// `N` is the depth of the netif bridge's transmit queue; callers should
/// pick it to match `Cfg::TX_QUEUE_LEN`. Everything else (timeouts, MTU,
/// compression policy) is taken from `Cfg`.
pub struct PanuClient<Hal, Ip, Sink, Cfg, const N: usize>
where
    Hal: BtHal,
    Ip: IpStack,
    Sink: EventSink,
    Cfg: PanuConfig,
{
    hal: Hal,
    ip_stack: Ip,
    sink: Sink,
    session: BnepSession,
    supervisor: Supervisor<Cfg>,
    netif: NetifBridge<N>,
    initialized: bool,
}

impl<Hal, Ip, Sink, Cfg, const N: usize> PanuClient<Hal, Ip, Sink, Cfg, N>
where
    Hal: BtHal,
    Ip: IpStack,
    Sink: EventSink,
    Cfg: PanuConfig,
{
    pub fn new(hal: Hal, ip_stack: Ip, sink: Sink, config: Config) -> Self {
        Self {
            hal,
            ip_stack,
            sink,
            session: BnepSession::new(),
            supervisor: Supervisor::new(config),
            netif: NetifBridge::new(),
            initialized: false,
        }
    }

    /// Wires the HAL and netif, and leaves the connection in `Idle`.
    pub fn init(&mut self) -> Result<(), Error> {
        if self.initialized {
            return Err(Error::AlreadyStarted);
        }
        self.hal.bt_init()?;
        let local = self.hal.get_local_bd_addr();
        let remote = self.supervisor.config().remote_addr;
        self.netif.set_local_bd_addr(local);
        self.netif.set_remote(remote);
        self.session.set_local(local);
        self.session.set_remote(remote);
        self.initialized = true;
        Ok(())
    }

    /// Tears down the connection (if any) and the HAL.
    pub fn deinit(&mut self) {
        if !self.initialized {
            return;
        }
        self.stop();
        self.hal.bt_deinit();
        self.initialized = false;
    }

    pub fn start(&mut self) -> Result<(), Error> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }
        let now = self.hal.get_tick_ms();
        self.supervisor.start(now, &mut self.hal, &mut self.sink)
    }

    /// Universal cancellation verb: disconnects, resets the session, frees
    /// queued frames and returns to `Idle`. A no-op if already `Idle` or
    /// never initialized.
    pub fn stop(&mut self) {
        if !self.initialized {
            return;
        }
        let now = self.hal.get_tick_ms();
        self.supervisor
            .stop(now, &mut self.hal, &mut self.session, &mut self.ip_stack, &mut self.sink);
        self.netif.set_link_up(false);
        self.netif.flush();
    }

    /// Drains pending HAL/IP-stack events and evaluates timers. Must be
    /// called periodically; also safe to call after any external event for
    /// lower latency. Non-blocking; never fails except for the lifecycle
    /// guard below.
    pub fn process(&mut self) -> Result<(), Error> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }
        let now = self.hal.get_tick_ms();

        while let Some(event) = self.hal.poll_event() {
            self.dispatch_hal_event(now, event);
        }

        let mut recv_buf = [0u8; MIN_L2CAP_MTU as usize];
        while let Some(n) = self.hal.poll_recv(&mut recv_buf) {
            self.dispatch_incoming(now, &recv_buf[..n]);
        }

        while let Some(ip_event) = self.ip_stack.poll_ip_event() {
            match ip_event {
                IpEvent::Acquired(info) => self.supervisor.on_ip_acquired(now, info, &mut self.sink),
                IpEvent::Lost => self.supervisor.on_ip_lost(now, &mut self.ip_stack, &mut self.sink),
            }
        }

        self.supervisor
            .process(now, &mut self.hal, &mut self.session, &mut self.ip_stack, &mut self.sink);
        Ok(())
    }

    /// Milliseconds the caller may sleep before calling `process()` again
    /// without missing a time-based transition.
    pub fn next_timeout_ms(&self) -> u32 {
        self.supervisor.next_timeout_ms(self.hal.get_tick_ms(), &self.ip_stack)
    }

    pub fn state(&self) -> ConnectionState {
        self.supervisor.state()
    }

    pub fn is_online(&self) -> bool {
        self.supervisor.is_online()
    }

    pub fn ip_info(&self) -> Option<IpInfo> {
        self.supervisor.ip_info()
    }

    pub fn state_to_string(state: ConnectionState) -> &'static str {
        state.as_str()
    }

    /// Outbound Ethernet frame from the IP stack. See
    /// [`NetifBridge::send_ethernet_frame`] for the buffer contract.
    pub fn send_ethernet_frame(&mut self, buf: &mut [u8], frame_offset: usize, frame_len: usize) -> Result<(), Error> {
        self.netif
            .send_ethernet_frame::<Hal, Cfg>(buf, frame_offset, frame_len, &mut self.hal)
    }

    fn dispatch_hal_event(&mut self, now: u32, event: HalEvent) {
        match event {
            HalEvent::Connected => self
                .supervisor
                .on_l2cap_connected(now, &mut self.hal, &mut self.session, &mut self.sink),
            HalEvent::Disconnected => self.supervisor.on_l2cap_disconnected(
                now,
                &mut self.hal,
                &mut self.session,
                &mut self.ip_stack,
                &mut self.sink,
            ),
            HalEvent::ConnectFailed(status) => self.supervisor.on_l2cap_connect_failed(
                now,
                status,
                &mut self.hal,
                &mut self.session,
                &mut self.ip_stack,
                &mut self.sink,
            ),
            HalEvent::CanSendNow => self.netif.on_can_send_now(&mut self.hal, &mut self.session),
        }
    }

    fn dispatch_incoming(&mut self, now: u32, bytes: &[u8]) {
        match self.session.handle_incoming(bytes, &mut self.hal) {
            Ok(Indication::SetupSucceeded) => {
                self.netif.set_link_up(true);
                self.supervisor.on_setup_succeeded(now, &mut self.ip_stack, &mut self.sink);
            }
            Ok(Indication::SetupFailed(code)) => {
                self.netif.set_link_up(false);
                self.supervisor.on_setup_failed(
                    now,
                    code,
                    &mut self.hal,
                    &mut self.session,
                    &mut self.ip_stack,
                    &mut self.sink,
                );
            }
            Ok(Indication::Ethernet(frame)) => {
                self.netif.on_ethernet_received(frame, &mut self.ip_stack);
            }
            Ok(Indication::None) => {}
            Err(e) => {
                debug!("dropping malformed bnep packet: {:?}", e);
            }
        }
    }
}
