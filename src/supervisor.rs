//! Connection supervisor: the top-level deterministic state machine.
//!
//! Owns nothing but timers, counters and the public [`ConnectionState`].
//! Every handler here is called either from [`process`](Supervisor::process)
//! or directly off a HAL/session/IP-stack event, and each one ends by
//! checking whether the public state changed so that exactly one
//! `StateChanged` notification fires per observable transition.

use core::marker::PhantomData;

use crate::bnep::session::BnepSession;
use crate::config::{Config, PanuConfig};
use crate::connection::ConnectionState;
use crate::error::Error;
use crate::event::{Event, EventSink};
use crate::fmt::warn;
use crate::hal::BtHal;
use crate::ip_stack::IpStack;
use crate::network::IpInfo;

pub struct Supervisor<C: PanuConfig> {
    state: ConnectionState,
    state_enter_time: u32,
    last_action_time: u32,
    reconnect_delay_ms: u32,
    reconnect_attempts: u32,
    setup_retries: u8,
    last_reported: Option<ConnectionState>,
    config: Config,
    ip_info: Option<IpInfo>,
    _config: PhantomData<C>,
}

impl<C: PanuConfig> Supervisor<C> {
    pub fn new(config: Config) -> Self {
        Self {
            state: ConnectionState::Idle,
            state_enter_time: 0,
            last_action_time: 0,
            reconnect_delay_ms: 0,
            reconnect_attempts: 0,
            setup_retries: 0,
            last_reported: None,
            config,
            ip_info: None,
            _config: PhantomData,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_online(&self) -> bool {
        self.state == ConnectionState::Online
    }

    pub fn ip_info(&self) -> Option<IpInfo> {
        self.ip_info
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    fn transition(&mut self, to: ConnectionState, now: u32) {
        debug_assert!(
            !matches!(to, ConnectionState::Scanning | ConnectionState::Stalled),
            "reserved state is never entered"
        );
        self.state = to;
        self.state_enter_time = now;
    }

    fn check_state_changed<S: EventSink>(&mut self, sink: &mut S) {
        if self.last_reported != Some(self.state) {
            self.last_reported = Some(self.state);
            sink.on_event(Event::StateChanged(self.state));
        }
    }

    fn schedule_reconnect(&mut self, now: u32) {
        self.reconnect_delay_ms = if self.reconnect_delay_ms == 0 {
            self.config.reconnect_interval_ms
        } else {
            self.reconnect_delay_ms
                .saturating_mul(2)
                .min(self.config.reconnect_max_ms)
        };
        self.last_action_time = now;
    }

    fn handle_link_failure<H, Ip, S>(
        &mut self,
        now: u32,
        hal: &mut H,
        session: &mut BnepSession,
        ip_stack: &mut Ip,
        sink: &mut S,
    ) where
        H: BtHal,
        Ip: IpStack,
        S: EventSink,
    {
        hal.l2cap_disconnect();
        session.on_l2cap_disconnected();
        ip_stack.link_down();
        ip_stack.dhcp_stop();
        self.ip_info = None;
        let entering_error = !C::AUTO_RECONNECT;
        if C::AUTO_RECONNECT {
            self.schedule_reconnect(now);
            self.transition(ConnectionState::Reconnecting, now);
        } else {
            self.transition(ConnectionState::Error, now);
        }
        self.check_state_changed(sink);
        if entering_error {
            sink.on_event(Event::Error);
        }
    }

    /// `start()`: issues the L2CAP connect and moves to `Connecting`.
    pub fn start<H: BtHal, S: EventSink>(
        &mut self,
        now: u32,
        hal: &mut H,
        sink: &mut S,
    ) -> Result<(), Error> {
        if self.state != ConnectionState::Idle {
            return Err(Error::AlreadyStarted);
        }
        self.reconnect_delay_ms = 0;
        self.reconnect_attempts = 0;
        self.setup_retries = 0;
        hal.l2cap_connect(self.config.remote_addr, C::L2CAP_MTU);
        self.transition(ConnectionState::Connecting, now);
        self.check_state_changed(sink);
        Ok(())
    }

    /// Universal cancellation verb. A no-op (no events) when already `Idle`.
    pub fn stop<H, Ip, S>(
        &mut self,
        now: u32,
        hal: &mut H,
        session: &mut BnepSession,
        ip_stack: &mut Ip,
        sink: &mut S,
    ) where
        H: BtHal,
        Ip: IpStack,
        S: EventSink,
    {
        if self.state == ConnectionState::Idle {
            return;
        }
        hal.l2cap_disconnect();
        session.on_l2cap_disconnected();
        ip_stack.link_down();
        ip_stack.dhcp_stop();
        self.ip_info = None;
        self.transition(ConnectionState::Idle, now);
        self.check_state_changed(sink);
        sink.on_event(Event::Disconnected);
    }

    pub fn on_l2cap_connected<H: BtHal, S: EventSink>(
        &mut self,
        now: u32,
        hal: &mut H,
        session: &mut BnepSession,
        sink: &mut S,
    ) {
        if self.state != ConnectionState::Connecting {
            return;
        }
        self.setup_retries = 0;
        session.on_l2cap_connected(hal);
        self.transition(ConnectionState::BnepSetup, now);
        self.check_state_changed(sink);
    }

    pub fn on_l2cap_connect_failed<H, Ip, S>(
        &mut self,
        now: u32,
        status: u16,
        hal: &mut H,
        session: &mut BnepSession,
        ip_stack: &mut Ip,
        sink: &mut S,
    ) where
        H: BtHal,
        Ip: IpStack,
        S: EventSink,
    {
        if self.state != ConnectionState::Connecting {
            return;
        }
        warn!("l2cap connect failed, status={}", status);
        self.handle_link_failure(now, hal, session, ip_stack, sink);
    }

    pub fn on_l2cap_disconnected<H, Ip, S>(
        &mut self,
        now: u32,
        hal: &mut H,
        session: &mut BnepSession,
        ip_stack: &mut Ip,
        sink: &mut S,
    ) where
        H: BtHal,
        Ip: IpStack,
        S: EventSink,
    {
        if matches!(
            self.state,
            ConnectionState::Idle | ConnectionState::Reconnecting | ConnectionState::Error
        ) {
            return;
        }
        self.handle_link_failure(now, hal, session, ip_stack, sink);
    }

    pub fn on_setup_succeeded<Ip: IpStack, S: EventSink>(
        &mut self,
        now: u32,
        ip_stack: &mut Ip,
        sink: &mut S,
    ) {
        if self.state != ConnectionState::BnepSetup {
            return;
        }
        self.reconnect_delay_ms = 0;
        self.reconnect_attempts = 0;
        ip_stack.link_up();
        ip_stack.dhcp_start();
        self.transition(ConnectionState::Dhcp, now);
        self.check_state_changed(sink);
        sink.on_event(Event::Connected);
    }

    pub fn on_setup_failed<H, Ip, S>(
        &mut self,
        now: u32,
        code: u16,
        hal: &mut H,
        session: &mut BnepSession,
        ip_stack: &mut Ip,
        sink: &mut S,
    ) where
        H: BtHal,
        Ip: IpStack,
        S: EventSink,
    {
        if self.state != ConnectionState::BnepSetup {
            return;
        }
        warn!("bnep setup rejected, code={}", code);
        self.handle_link_failure(now, hal, session, ip_stack, sink);
    }

    pub fn on_ip_acquired<S: EventSink>(&mut self, now: u32, info: IpInfo, sink: &mut S) {
        if self.state != ConnectionState::Dhcp {
            return;
        }
        self.ip_info = Some(info);
        self.reconnect_delay_ms = 0;
        self.reconnect_attempts = 0;
        self.transition(ConnectionState::Online, now);
        self.check_state_changed(sink);
        sink.on_event(Event::IpAcquired(info));
    }

    pub fn on_ip_lost<Ip: IpStack, S: EventSink>(&mut self, now: u32, ip_stack: &mut Ip, sink: &mut S) {
        if self.state != ConnectionState::Online {
            return;
        }
        self.ip_info = None;
        ip_stack.dhcp_start();
        self.transition(ConnectionState::Dhcp, now);
        self.check_state_changed(sink);
        sink.on_event(Event::IpLost);
    }

    /// Evaluates time-based transitions for the current state. Called
    /// periodically and also right after any event handler, for
    /// responsiveness.
    pub fn process<H, Ip, S>(
        &mut self,
        now: u32,
        hal: &mut H,
        session: &mut BnepSession,
        ip_stack: &mut Ip,
        sink: &mut S,
    ) where
        H: BtHal,
        Ip: IpStack,
        S: EventSink,
    {
        let mut entered_error = false;
        match self.state {
            ConnectionState::Connecting => {
                if now.wrapping_sub(self.state_enter_time) >= C::L2CAP_CONNECT_TIMEOUT_MS {
                    warn!("l2cap connect timed out");
                    self.handle_link_failure(now, hal, session, ip_stack, sink);
                }
            }
            ConnectionState::BnepSetup => {
                if now.wrapping_sub(self.state_enter_time) >= C::BNEP_SETUP_TIMEOUT_MS {
                    if self.setup_retries < C::BNEP_SETUP_RETRIES {
                        self.setup_retries += 1;
                        session.on_l2cap_connected(hal);
                        self.state_enter_time = now;
                    } else {
                        warn!("bnep setup retries exhausted");
                        self.handle_link_failure(now, hal, session, ip_stack, sink);
                    }
                }
            }
            ConnectionState::Dhcp => {
                if now.wrapping_sub(self.state_enter_time) >= C::DHCP_TIMEOUT_MS {
                    warn!("dhcp timed out, deferring to ip stack's own retry");
                    self.state_enter_time = now;
                }
            }
            ConnectionState::Reconnecting => {
                if now.wrapping_sub(self.last_action_time) >= self.reconnect_delay_ms {
                    let budget_ok = self.config.max_reconnect_attempts == 0
                        || self.reconnect_attempts < self.config.max_reconnect_attempts;
                    if budget_ok {
                        self.reconnect_attempts += 1;
                        hal.l2cap_connect(self.config.remote_addr, C::L2CAP_MTU);
                        self.transition(ConnectionState::Connecting, now);
                    } else {
                        self.transition(ConnectionState::Error, now);
                        entered_error = true;
                    }
                }
            }
            _ => {}
        }
        self.check_state_changed(sink);
        if entered_error {
            sink.on_event(Event::Error);
        }
    }

    /// Smallest of: remaining time in the current timed state, the IP
    /// stack's own declared timer, and a 50 ms safety clamp whenever a
    /// missed wake-up could delay a time-critical transition.
    pub fn next_timeout_ms<Ip: IpStack>(&self, now: u32, ip_stack: &Ip) -> u32 {
        let (base, target) = match self.state {
            ConnectionState::Idle | ConnectionState::Online | ConnectionState::Error => {
                return u32::MAX
            }
            ConnectionState::Connecting => (self.state_enter_time, C::L2CAP_CONNECT_TIMEOUT_MS),
            ConnectionState::BnepSetup => (self.state_enter_time, C::BNEP_SETUP_TIMEOUT_MS),
            ConnectionState::Dhcp => (self.state_enter_time, C::DHCP_TIMEOUT_MS),
            ConnectionState::Reconnecting => (self.last_action_time, self.reconnect_delay_ms),
            ConnectionState::Scanning | ConnectionState::Stalled => return u32::MAX,
        };
        let remaining = target.saturating_sub(now.wrapping_sub(base));
        remaining.min(ip_stack.next_timeout_ms()).min(50)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::DefaultConfig;
    use crate::event::Event;
    use crate::network::DeviceAddress;
    use crate::test_helpers::{sample_ip_info, MockHal, MockIpStack, RecordingEventSink};

    fn fresh() -> (
        Supervisor<DefaultConfig>,
        BnepSession,
        MockHal,
        MockIpStack,
        RecordingEventSink,
    ) {
        let remote = DeviceAddress::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        let sup = Supervisor::new(Config::new(remote));
        let session = BnepSession::new();
        let hal = MockHal::new();
        let ip_stack = MockIpStack::new();
        let sink = RecordingEventSink::default();
        (sup, session, hal, ip_stack, sink)
    }

    #[test]
    fn happy_path_reaches_online() {
        let (mut sup, mut session, mut hal, mut ip, mut sink) = fresh();
        sup.start(0, &mut hal, &mut sink).unwrap();
        assert_eq!(sup.state(), ConnectionState::Connecting);

        sup.on_l2cap_connected(10, &mut hal, &mut session, &mut sink);
        assert_eq!(sup.state(), ConnectionState::BnepSetup);
        assert_eq!(
            hal.sent.last().unwrap().as_slice(),
            &[0x01, 0x01, 0x02, 0x11, 0x16, 0x11, 0x15][..]
        );

        let reply = [0x01, 0x02, 0x00, 0x00];
        if let crate::bnep::session::Indication::SetupSucceeded =
            session.handle_incoming(&reply, &mut hal).unwrap()
        {
            sup.on_setup_succeeded(20, &mut ip, &mut sink);
        } else {
            panic!("expected setup success");
        }
        assert_eq!(sup.state(), ConnectionState::Dhcp);
        assert_eq!(ip.dhcp_start_count, 1);

        let info = sample_ip_info();
        sup.on_ip_acquired(30, info, &mut sink);
        assert_eq!(sup.state(), ConnectionState::Online);
        assert!(sup.is_online());
        assert_eq!(sup.ip_info(), Some(info));

        let states: std::vec::Vec<ConnectionState> = sink
            .events
            .iter()
            .filter_map(|e| match e {
                Event::StateChanged(s) => Some(*s),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            std::vec![
                ConnectionState::Connecting,
                ConnectionState::BnepSetup,
                ConnectionState::Dhcp,
                ConnectionState::Online,
            ]
        );
    }

    #[test]
    fn setup_rejection_schedules_reconnect_at_configured_interval() {
        let (mut sup, mut session, mut hal, mut ip, mut sink) = fresh();
        sup.start(0, &mut hal, &mut sink).unwrap();
        sup.on_l2cap_connected(0, &mut hal, &mut session, &mut sink);
        sup.on_setup_failed(0, 0x0004, &mut hal, &mut session, &mut ip, &mut sink);
        assert_eq!(sup.state(), ConnectionState::Reconnecting);

        sup.process(999, &mut hal, &mut session, &mut ip, &mut sink);
        assert_eq!(sup.state(), ConnectionState::Reconnecting);

        sup.process(1000, &mut hal, &mut session, &mut ip, &mut sink);
        assert_eq!(sup.state(), ConnectionState::Connecting);
    }

    #[test]
    fn backoff_doubles_and_clamps() {
        let (mut sup, mut session, mut hal, mut ip, mut sink) = fresh();
        let mut cfg = Config::new(DeviceAddress::new([1; 6]));
        cfg.reconnect_interval_ms = 100;
        cfg.reconnect_max_ms = 250;
        cfg.max_reconnect_attempts = 0;
        sup.set_config(cfg);

        sup.start(0, &mut hal, &mut sink).unwrap();
        sup.on_l2cap_connect_failed(0, 1, &mut hal, &mut session, &mut ip, &mut sink);
        assert_eq!(sup.state(), ConnectionState::Reconnecting);

        // First retry after 100ms.
        sup.process(99, &mut hal, &mut session, &mut ip, &mut sink);
        assert_eq!(sup.state(), ConnectionState::Reconnecting);
        sup.process(100, &mut hal, &mut session, &mut ip, &mut sink);
        assert_eq!(sup.state(), ConnectionState::Connecting);

        sup.on_l2cap_connect_failed(100, 1, &mut hal, &mut session, &mut ip, &mut sink);
        // Second delay doubles to 200ms.
        sup.process(100 + 199, &mut hal, &mut session, &mut ip, &mut sink);
        assert_eq!(sup.state(), ConnectionState::Reconnecting);
        sup.process(100 + 200, &mut hal, &mut session, &mut ip, &mut sink);
        assert_eq!(sup.state(), ConnectionState::Connecting);

        sup.on_l2cap_connect_failed(300, 1, &mut hal, &mut session, &mut ip, &mut sink);
        // Third delay would double to 400ms but is clamped to 250ms.
        sup.process(300 + 249, &mut hal, &mut session, &mut ip, &mut sink);
        assert_eq!(sup.state(), ConnectionState::Reconnecting);
        sup.process(300 + 250, &mut hal, &mut session, &mut ip, &mut sink);
        assert_eq!(sup.state(), ConnectionState::Connecting);
    }

    #[test]
    fn tick_wrap_does_not_confuse_connect_timeout() {
        let (mut sup, mut session, mut hal, mut ip, mut sink) = fresh();
        let base: u32 = 0xFFFF_FF00;
        sup.start(base, &mut hal, &mut sink).unwrap();

        sup.process(base.wrapping_add(9999), &mut hal, &mut session, &mut ip, &mut sink);
        assert_eq!(sup.state(), ConnectionState::Connecting);

        sup.process(base.wrapping_add(10000), &mut hal, &mut session, &mut ip, &mut sink);
        assert_eq!(sup.state(), ConnectionState::Reconnecting);
    }

    #[test]
    fn unlimited_attempts_never_reach_error() {
        let (mut sup, mut session, mut hal, mut ip, mut sink) = fresh();
        let mut cfg = Config::new(DeviceAddress::new([1; 6]));
        cfg.reconnect_interval_ms = 10;
        cfg.reconnect_max_ms = 10;
        cfg.max_reconnect_attempts = 0;
        sup.set_config(cfg);
        sup.start(0, &mut hal, &mut sink).unwrap();

        let mut now = 0u32;
        for _ in 0..50 {
            sup.on_l2cap_connect_failed(now, 1, &mut hal, &mut session, &mut ip, &mut sink);
            now += 10;
            sup.process(now, &mut hal, &mut session, &mut ip, &mut sink);
            assert_ne!(sup.state(), ConnectionState::Error);
        }
    }

    #[test]
    fn budget_exhaustion_reaches_error() {
        let (mut sup, mut session, mut hal, mut ip, mut sink) = fresh();
        let mut cfg = Config::new(DeviceAddress::new([1; 6]));
        cfg.reconnect_interval_ms = 10;
        cfg.reconnect_max_ms = 10;
        cfg.max_reconnect_attempts = 2;
        sup.set_config(cfg);
        sup.start(0, &mut hal, &mut sink).unwrap();

        let mut now = 0u32;
        for _ in 0..2 {
            sup.on_l2cap_connect_failed(now, 1, &mut hal, &mut session, &mut ip, &mut sink);
            now += 10;
            sup.process(now, &mut hal, &mut session, &mut ip, &mut sink);
            assert_eq!(sup.state(), ConnectionState::Connecting);
        }
        sup.on_l2cap_connect_failed(now, 1, &mut hal, &mut session, &mut ip, &mut sink);
        now += 10;
        sup.process(now, &mut hal, &mut session, &mut ip, &mut sink);
        assert_eq!(sup.state(), ConnectionState::Error);
    }

    #[test]
    fn stop_from_online_emits_disconnected_exactly_once() {
        let (mut sup, mut session, mut hal, mut ip, mut sink) = fresh();
        sup.start(0, &mut hal, &mut sink).unwrap();
        sup.on_l2cap_connected(0, &mut hal, &mut session, &mut sink);
        sup.on_setup_succeeded(0, &mut ip, &mut sink);
        sup.on_ip_acquired(0, sample_ip_info(), &mut sink);

        sup.stop(0, &mut hal, &mut session, &mut ip, &mut sink);
        assert_eq!(sup.state(), ConnectionState::Idle);
        assert!(sup.ip_info().is_none());

        let disconnected_count = sink.events.iter().filter(|e| **e == Event::Disconnected).count();
        assert_eq!(disconnected_count, 1);

        // Stopping again from Idle emits nothing further.
        sink.events.clear();
        sup.stop(10, &mut hal, &mut session, &mut ip, &mut sink);
        assert!(sink.events.is_empty());
    }
}
