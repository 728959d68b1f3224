//! Test doubles shared by the integration suites.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use vscp_node::{
    ActionExecutor, ApplicationRegisters, Event, LampState, Node, NodeConfig, NodeFault,
    NodeHooks, PersistentLayout, PersistentStore, ProcessOutcome, RamStore, SoftTimers, TimerId,
    TimerService, Transport, CLASS1_PROTOCOL, GUID_LEN,
};

pub const GUID: [u8; GUID_LEN] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07,
];

#[derive(Debug, Default)]
pub struct QueueTransport {
    pub inbox: VecDeque<Event>,
    pub sent: Vec<Event>,
    pub refuse: bool,
}

impl Transport for QueueTransport {
    fn read_message(&mut self) -> Option<Event> {
        self.inbox.pop_front()
    }

    fn write_message(&mut self, event: &Event) -> bool {
        if self.refuse {
            return false;
        }
        self.sent.push(*event);
        true
    }
}

/// Soft timers that also record every start and stop.
#[derive(Debug, Default)]
pub struct CountingTimers {
    pub inner: SoftTimers,
    pub starts: Vec<(TimerId, u32)>,
    pub stops: Vec<TimerId>,
}

impl CountingTimers {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: SoftTimers::new(capacity),
            ..Self::default()
        }
    }

    pub fn stops_of(&self, id: TimerId) -> usize {
        self.stops.iter().filter(|stopped| **stopped == id).count()
    }
}

impl TimerService for CountingTimers {
    fn create(&mut self) -> Option<TimerId> {
        self.inner.create()
    }

    fn start(&mut self, id: TimerId, timeout_ms: u32) {
        self.starts.push((id, timeout_ms));
        self.inner.start(id, timeout_ms);
    }

    fn stop(&mut self, id: TimerId) {
        self.stops.push(id);
        self.inner.stop(id);
    }

    fn is_running(&self, id: TimerId) -> bool {
        self.inner.is_running(id)
    }

    fn advance(&mut self, elapsed_ms: u32) {
        self.inner.advance(elapsed_ms);
    }
}

pub const GENERAL_TIMER: TimerId = TimerId(0);
pub const HEARTBEAT_TIMER: TimerId = TimerId(3);

#[derive(Debug, Default)]
pub struct RecordingApp {
    pub lamps: Vec<LampState>,
    pub resets: usize,
    pub idles: usize,
    pub errors: Vec<NodeFault>,
    pub boot_requests: Vec<u8>,
    pub factory_resets: usize,
    pub provided: Vec<Event>,
    pub executed: Vec<(u8, u8)>,
    pub registers: HashMap<(u16, u8), u8>,
}

impl NodeHooks for RecordingApp {
    fn set_lamp(&mut self, state: LampState) {
        self.lamps.push(state);
    }

    fn on_reset(&mut self) {
        self.resets += 1;
    }

    fn on_idle(&mut self) {
        self.idles += 1;
    }

    fn on_error(&mut self, fault: NodeFault) {
        self.errors.push(fault);
    }

    fn on_bootloader_request(&mut self, algorithm: u8) {
        self.boot_requests.push(algorithm);
    }

    fn restore_factory_defaults(&mut self) {
        self.factory_resets += 1;
    }

    fn provide_event(&mut self, event: &Event) {
        self.provided.push(*event);
    }
}

/// Unwritten application registers read as `offset ^ page_lsb`.
pub fn app_default(page: u16, offset: u8) -> u8 {
    offset ^ page.to_be_bytes()[1]
}

impl ApplicationRegisters for RecordingApp {
    fn read_app_register(&mut self, page: u16, offset: u8) -> u8 {
        self.registers
            .get(&(page, offset))
            .copied()
            .unwrap_or_else(|| app_default(page, offset))
    }

    fn write_app_register(&mut self, page: u16, offset: u8, value: u8) -> u8 {
        self.registers.insert((page, offset), value);
        value
    }
}

impl ActionExecutor for RecordingApp {
    fn execute(&mut self, action: u8, param: u8, _event: &Event) {
        self.executed.push((action, param));
    }
}

pub type TestNode = Node<RamStore, QueueTransport, CountingTimers, RecordingApp>;

pub fn provisioned_store(config: &NodeConfig, nickname: u8) -> RamStore {
    let layout = PersistentLayout::new(config.dm_rows, config.dmng_capacity);
    let mut store = RamStore::for_layout(&layout, &GUID);
    store.write8(vscp_node::persist::ADDR_NICKNAME, nickname);
    store
}

pub fn node_with(config: NodeConfig, nickname: u8) -> TestNode {
    let store = provisioned_store(&config, nickname);
    Node::new(
        config,
        store,
        QueueTransport::default(),
        CountingTimers::default(),
        RecordingApp::default(),
    )
    .expect("test configuration is valid")
}

/// Node that already announced itself and has an empty outbox.
pub fn active_node(nickname: u8) -> TestNode {
    let mut node = node_with(NodeConfig::default(), nickname);
    assert_eq!(node.process(), ProcessOutcome::Started);
    node.transport_mut().sent.clear();
    node
}

pub fn protocol(event_type: u8, origin: u8, data: &[u8]) -> Event {
    Event::new(CLASS1_PROTOCOL, event_type, origin)
        .with_data(data)
        .expect("payload fits a frame")
}

pub fn deliver(node: &mut TestNode, event: Event) -> ProcessOutcome {
    node.transport_mut().inbox.push_back(event);
    node.process()
}

pub fn take_sent(node: &mut TestNode) -> Vec<Event> {
    std::mem::take(&mut node.transport_mut().sent)
}
