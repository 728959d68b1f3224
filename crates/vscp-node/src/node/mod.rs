//! The node state machine.
//!
//! [`Node`] owns its collaborators and one [`NodeContext`] holding every piece
//! of mutable protocol state. Hosts drive it from a single context by calling
//! [`Node::process`] for one incoming event and [`Node::tick`] with elapsed
//! time, or [`Node::poll`] for both.

mod discovery;
mod protocol;
mod reassembly;
mod registers;
mod state;

pub use discovery::{AckOutcome, Discovery, CANDIDATES};
pub use protocol::{
    BOOT_NACK_ALGORITHM, BOOT_NACK_GUID, BOOT_NACK_MALFORMED, DROP_FACTORY_DEFAULTS, DROP_GO_IDLE,
    DROP_KEEP_NICKNAME, WHO_IS_THERE_FRAMES,
};
pub use reassembly::{FrameOutcome, GuidDropSessions, GUID_DROP_FRAMES, SESSION_COUNT};
pub use state::{NodeState, ProcessOutcome};

use log::{debug, error, info, warn};

use crate::api::{Application, LampState, PersistentStore, TimerService, Transport};
use crate::config::NodeConfig;
use crate::diag::{bump, NodeDiagnostics};
use crate::dm::{self, DmRow, ExtensionRow, Zone, EXTENSION_ROW_LEN, ROW_LEN};
use crate::dmng::DmNgEngine;
use crate::error::{ConfigError, NodeFault, RuleFault};
use crate::message::{Event, RxEvent};
use crate::persist::{
    PersistentLayout, ADDR_GUID, ADDR_NICKNAME, ADDR_SEGMENT_CRC, GUID_LEN,
};
use crate::protocol::{
    ProtocolType, CLASS1_INFORMATION, CLASS1_PROTOCOL, INFORMATION_NODE_HEARTBEAT,
    NICKNAME_UNINITIALIZED,
};
use crate::register::RegisterLayout;
use crate::timer::{TimerBank, TimerSlot};

/// Mutable protocol state of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NodeContext {
    state: NodeState,
    timers: Option<TimerBank>,
    discovery: Discovery,
    sessions: GuidDropSessions,
    time_since_epoch: u32,
    uptime_ms: u64,
    page_select: u16,
    alarm: u8,
    restore_armed_at: Option<u64>,
    reset_pending: bool,
    clear_nickname_on_reset: bool,
    dmng: DmNgEngine,
    last_dm_event: Option<RxEvent>,
    diagnostics: NodeDiagnostics,
}

impl NodeContext {
    fn new() -> Self {
        Self {
            state: NodeState::Init,
            timers: None,
            discovery: Discovery::new(),
            sessions: GuidDropSessions::new(),
            time_since_epoch: 0,
            uptime_ms: 0,
            page_select: 0,
            alarm: 0,
            restore_armed_at: None,
            reset_pending: false,
            clear_nickname_on_reset: false,
            dmng: DmNgEngine::new(),
            last_dm_event: None,
            diagnostics: NodeDiagnostics::new(),
        }
    }
}

/// A VSCP Level I node.
#[derive(Debug)]
pub struct Node<S, T, M, A> {
    config: NodeConfig,
    layout: PersistentLayout,
    store: S,
    transport: T,
    timer_service: M,
    app: A,
    ctx: NodeContext,
}

impl<S, T, M, A> Node<S, T, M, A>
where
    S: PersistentStore,
    T: Transport,
    M: TimerService,
    A: Application,
{
    /// Validates `config` and allocates the four logical timers.
    ///
    /// Timer exhaustion does not fail construction: the node starts in
    /// [`NodeState::Error`] and [`crate::NodeHooks::on_error`] fires once.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configuration is unusable.
    pub fn new(
        config: NodeConfig,
        store: S,
        transport: T,
        mut timer_service: M,
        mut app: A,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let layout = PersistentLayout::new(config.dm_rows, config.dmng_capacity);
        let mut ctx = NodeContext::new();
        ctx.timers = TimerBank::allocate(&mut timer_service);
        if ctx.timers.is_none() {
            error!("timer service exhausted, node enters error state");
            ctx.state = NodeState::Error(NodeFault::TimerExhausted);
            app.on_error(NodeFault::TimerExhausted);
        }
        Ok(Self {
            config,
            layout,
            store,
            transport,
            timer_service,
            app,
            ctx,
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> NodeState {
        self.ctx.state
    }

    /// Configuration the node was built with.
    #[must_use]
    pub const fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Persisted layout derived from the configuration.
    #[must_use]
    pub const fn layout(&self) -> &PersistentLayout {
        &self.layout
    }

    /// Persisted nickname, `0xFF` when unassigned.
    pub fn nickname(&mut self) -> u8 {
        self.store.read8(ADDR_NICKNAME)
    }

    /// Persisted segment controller CRC.
    pub fn segment_crc(&mut self) -> u8 {
        self.store.read8(ADDR_SEGMENT_CRC)
    }

    /// Time reported by the last segment controller heartbeat.
    #[must_use]
    pub const fn time_since_epoch(&self) -> u32 {
        self.ctx.time_since_epoch
    }

    /// Milliseconds accumulated through [`Self::tick`].
    #[must_use]
    pub const fn uptime_ms(&self) -> u64 {
        self.ctx.uptime_ms
    }

    /// Page used by register commands without an explicit page.
    #[must_use]
    pub const fn page_select(&self) -> u16 {
        self.ctx.page_select
    }

    /// Nickname discovery progress.
    #[must_use]
    pub const fn discovery(&self) -> &Discovery {
        &self.ctx.discovery
    }

    /// Traffic and rule counters.
    #[must_use]
    pub const fn diagnostics(&self) -> &NodeDiagnostics {
        &self.ctx.diagnostics
    }

    /// Clears the traffic and rule counters.
    pub fn clear_diagnostics(&mut self) {
        self.ctx.diagnostics.reset();
    }

    /// Last event that fired a decision matrix action.
    #[must_use]
    pub const fn last_dm_event(&self) -> Option<&RxEvent> {
        self.ctx.last_dm_event.as_ref()
    }

    /// Sticky DM-NG fault.
    #[must_use]
    pub const fn dmng_last_fault(&self) -> Option<RuleFault> {
        self.ctx.dmng.last_fault()
    }

    /// Clears the sticky DM-NG fault.
    pub fn clear_dmng_fault(&mut self) {
        self.ctx.dmng.clear_last_fault();
    }

    /// Sets alarm bits reported through register `0x80`.
    pub fn raise_alarm(&mut self, bits: u8) {
        self.ctx.alarm |= bits;
    }

    /// Persistent store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Persistent store, mutably.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Timer service.
    #[must_use]
    pub const fn timer_service(&self) -> &M {
        &self.timer_service
    }

    /// Application collaborator.
    #[must_use]
    pub const fn app(&self) -> &A {
        &self.app
    }

    /// Application collaborator, mutably.
    pub fn app_mut(&mut self) -> &mut A {
        &mut self.app
    }

    /// Advances timers and uptime by `elapsed_ms`.
    pub fn tick(&mut self, elapsed_ms: u32) {
        self.timer_service.advance(elapsed_ms);
        self.ctx.uptime_ms = self.ctx.uptime_ms.saturating_add(u64::from(elapsed_ms));
    }

    /// [`Self::tick`] followed by [`Self::process`].
    pub fn poll(&mut self, elapsed_ms: u32) -> ProcessOutcome {
        self.tick(elapsed_ms);
        self.process()
    }

    /// Runs one processing step: timer expiries, then at most one transport read.
    pub fn process(&mut self) -> ProcessOutcome {
        match self.ctx.state {
            NodeState::Error(_) | NodeState::BootloaderHandoff => return ProcessOutcome::Inert,
            NodeState::Init => {
                self.start();
                return ProcessOutcome::Started;
            }
            NodeState::NicknameDiscovery | NodeState::Active | NodeState::Idle => {}
        }

        self.service_timers();
        if self.ctx.state.is_inert() || self.ctx.state == NodeState::Init {
            return ProcessOutcome::NoEvent;
        }

        let Some(event) = self.transport.read_message() else {
            return ProcessOutcome::NoEvent;
        };
        bump(&mut self.ctx.diagnostics.rx_events);

        match self.ctx.state {
            NodeState::Idle => ProcessOutcome::Ignored,
            NodeState::NicknameDiscovery => self.handle_discovery_event(&event),
            NodeState::Active if event.class() == CLASS1_PROTOCOL => {
                self.handle_protocol_event(&event)
            }
            NodeState::Active => self.dispatch_application(&event),
            NodeState::Init | NodeState::Error(_) | NodeState::BootloaderHandoff => {
                ProcessOutcome::Ignored
            }
        }
    }

    /// Leaves the idle or boot loader state and starts over.
    ///
    /// Has no effect in the error state.
    pub fn restart(&mut self) {
        if self.ctx.state.fault().is_some() {
            return;
        }
        info!("node restart requested");
        self.ctx.state = NodeState::Init;
    }

    /// Protocol-level reset: stops timers, drops sessions and returns to `Init`.
    pub fn reset(&mut self) {
        if self.ctx.state.fault().is_some() {
            return;
        }
        if let Some(bank) = self.ctx.timers.as_mut() {
            bank.stop_all(&mut self.timer_service);
        }
        self.ctx.sessions.clear();
        self.ctx.reset_pending = false;
        self.ctx.clear_nickname_on_reset = false;
        self.ctx.restore_armed_at = None;
        self.app.on_reset();
        self.ctx.state = NodeState::Init;
        info!("node reset");
    }

    fn start(&mut self) {
        let nickname = self.nickname();
        if nickname == NICKNAME_UNINITIALIZED {
            self.start_discovery();
        } else {
            self.go_active(nickname);
        }
    }

    fn go_active(&mut self, nickname: u8) {
        self.send(
            CLASS1_PROTOCOL,
            ProtocolType::NewNodeOnline.as_u8(),
            nickname,
            &[nickname],
        );
        self.app.set_lamp(LampState::On);
        self.start_heartbeat();
        self.ctx.state = NodeState::Active;
        info!("node active with nickname {nickname}");
    }

    fn start_heartbeat(&mut self) {
        let period = self.config.heartbeat_period_ms;
        if period == 0 {
            return;
        }
        if let Some(bank) = self.ctx.timers.as_mut() {
            bank.start(&mut self.timer_service, TimerSlot::Heartbeat, period);
        }
    }

    pub(crate) fn start_discovery(&mut self) {
        if let Some(bank) = self.ctx.timers.as_mut() {
            bank.stop(&mut self.timer_service, TimerSlot::Heartbeat);
        }
        self.ctx.discovery = Discovery::new();
        bump(&mut self.ctx.diagnostics.discovery_restarts);
        self.ctx.state = NodeState::NicknameDiscovery;
        self.app.set_lamp(LampState::Blink);
        info!("nickname discovery started");
        self.send_probe();
    }

    fn send_probe(&mut self) {
        let candidate = self.ctx.discovery.candidate();
        debug!("probing nickname {candidate}");
        self.send(
            CLASS1_PROTOCOL,
            ProtocolType::NewNodeOnline.as_u8(),
            NICKNAME_UNINITIALIZED,
            &[candidate],
        );
        let timeout = if self.ctx.discovery.awaiting_assignment() {
            self.config.assignment_timeout_ms
        } else {
            self.config.probe_timeout_ms
        };
        self.start_general(timeout);
    }

    fn start_general(&mut self, timeout_ms: u32) {
        if let Some(bank) = self.ctx.timers.as_mut() {
            bank.start(&mut self.timer_service, TimerSlot::General, timeout_ms);
        }
    }

    fn stop_general(&mut self) {
        if let Some(bank) = self.ctx.timers.as_mut() {
            bank.stop(&mut self.timer_service, TimerSlot::General);
        }
    }

    fn take_expired(&mut self, slot: TimerSlot) -> bool {
        self.ctx
            .timers
            .as_mut()
            .is_some_and(|bank| bank.take_expired(&self.timer_service, slot))
    }

    fn service_timers(&mut self) {
        if self.take_expired(TimerSlot::General) {
            match self.ctx.state {
                NodeState::NicknameDiscovery => {
                    self.ctx.discovery.on_timeout();
                    self.send_probe();
                }
                _ if self.ctx.reset_pending => {
                    if self.ctx.clear_nickname_on_reset {
                        self.set_nickname(NICKNAME_UNINITIALIZED);
                    }
                    self.reset();
                }
                _ => {}
            }
        }
        for session in 0..SESSION_COUNT {
            let Some(slot) = TimerSlot::multi_frame(session) else {
                continue;
            };
            if self.take_expired(slot) && self.ctx.sessions.expire(session) {
                debug!("guid drop session {session} timed out");
            }
        }
        if self.take_expired(TimerSlot::Heartbeat) && self.ctx.state == NodeState::Active {
            let nickname = self.nickname();
            if nickname == NICKNAME_UNINITIALIZED {
                return;
            }
            let data = [0, self.config.zone, self.config.sub_zone];
            self.send(
                CLASS1_INFORMATION,
                INFORMATION_NODE_HEARTBEAT,
                nickname,
                &data,
            );
            self.start_heartbeat();
        }
    }

    /// Writes one event; failures are counted and logged, never retried.
    pub(crate) fn send(&mut self, class: u16, event_type: u8, origin: u8, data: &[u8]) -> bool {
        let event = match Event::new(class, event_type, origin)
            .with_hard_coded(self.config.hard_coded)
            .with_priority(self.config.priority)
            .and_then(|event| event.with_data(data))
        {
            Ok(event) => event,
            Err(err) => {
                warn!("dropping malformed frame class {class} type {event_type}: {err}");
                self.ctx.diagnostics.record_tx(false);
                return false;
            }
        };
        let accepted = self.transport.write_message(&event);
        self.ctx.diagnostics.record_tx(accepted);
        if !accepted {
            warn!("transport refused frame class {class} type {event_type}");
        }
        accepted
    }

    pub(crate) fn set_nickname(&mut self, nickname: u8) {
        self.store.write8(ADDR_NICKNAME, nickname);
    }

    pub(crate) fn guid(&mut self) -> [u8; GUID_LEN] {
        let mut guid = [0; GUID_LEN];
        self.store.read_multiple(ADDR_GUID, &mut guid);
        guid
    }

    pub(crate) fn register_layout(&self) -> RegisterLayout {
        RegisterLayout {
            dm_page: self.config.dm_page,
            dm_len: self.config.dm_window_len(),
            dmng_page: self.config.dmng_enabled.then_some(self.config.dmng_page),
            dmng_len: usize::from(self.config.dmng_capacity),
        }
    }

    fn load_matrix(&mut self) -> (Vec<DmRow>, Vec<ExtensionRow>) {
        let mut rows = Vec::with_capacity(usize::from(self.config.dm_rows));
        let mut extensions = Vec::with_capacity(usize::from(self.config.dm_rows));
        for row in 0..self.config.dm_rows {
            let mut raw = [0; ROW_LEN];
            self.store.read_multiple(self.layout.dm_row(row), &mut raw);
            rows.push(DmRow::from_bytes(raw));
            let mut raw = [0; EXTENSION_ROW_LEN];
            self.store
                .read_multiple(self.layout.extension_row(row), &mut raw);
            extensions.push(ExtensionRow::from_bytes(raw));
        }
        (rows, extensions)
    }

    fn dispatch_application(&mut self, event: &RxEvent) -> ProcessOutcome {
        let (rows, extensions) = self.load_matrix();
        let zone = Zone {
            zone: self.config.zone,
            sub_zone: self.config.sub_zone,
        };
        let app = &mut self.app;
        let dm_actions = dm::evaluate(&rows, &extensions, event, zone, |firing| {
            debug!(
                "dm row {} fires action {:#04x} param {}",
                firing.row, firing.action, firing.param
            );
            app.execute(firing.action, firing.param, event);
        });
        for _ in 0..dm_actions {
            bump(&mut self.ctx.diagnostics.dm_actions);
        }

        let dmng = if self.config.dmng_enabled {
            let mut ruleset = vec![0; usize::from(self.config.dmng_capacity)];
            self.store
                .read_multiple(self.layout.dmng_base(), &mut ruleset);
            let ctx = &mut self.ctx;
            let hit = ctx.dmng.evaluate_with(&ruleset, event, |fault| {
                warn!("dm-ng {fault}");
                ctx.diagnostics.record_dmng_fault(fault);
            });
            if let Some(action) = hit {
                debug!(
                    "dm-ng rule {} fires action {:#04x} param {}",
                    action.rule_index, action.action, action.param
                );
                bump(&mut self.ctx.diagnostics.dmng_actions);
                self.app.execute(action.action, action.param, event);
            }
            hit
        } else {
            None
        };

        if dm_actions > 0 || dmng.is_some() {
            self.ctx.last_dm_event = Some(*event);
        }
        self.app.provide_event(event);
        ProcessOutcome::Application { dm_actions, dmng }
    }
}
