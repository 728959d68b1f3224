//! Cooperative scheduler loop: a fresh node joins a simulated segment, gets a
//! nickname from the master and reacts to a decision matrix row.

use std::collections::VecDeque;

use log as _;
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

use vscp_node::dm::FLAG_ENABLED;
use vscp_node::{
    ActionExecutor, ApplicationRegisters, DmRow, Event, LampState, Node, NodeConfig, NodeHooks,
    NodeState, PersistentLayout, ProtocolType, RamStore, SoftTimers, Transport, CLASS1_PROTOCOL,
    NICKNAME_UNINITIALIZED,
};

const TICK_MS: u32 = 10;
const GUID: [u8; 16] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE, 0, 0, 0, 0, 0, 0, 0, 0x42,
];

/// Segment with a master that hands out nickname 0x2A to the first probe.
#[derive(Default)]
struct SimulatedSegment {
    inbox: VecDeque<Event>,
    log: Vec<Event>,
}

impl Transport for SimulatedSegment {
    fn read_message(&mut self) -> Option<Event> {
        self.inbox.pop_front()
    }

    fn write_message(&mut self, event: &Event) -> bool {
        self.log.push(*event);
        let probe = event.class() == CLASS1_PROTOCOL
            && event.event_type() == ProtocolType::NewNodeOnline.as_u8()
            && event.origin() == NICKNAME_UNINITIALIZED;
        if probe && event.data() == [0] {
            let assign = Event::new(CLASS1_PROTOCOL, ProtocolType::SetNicknameId.as_u8(), 0)
                .with_data(&[NICKNAME_UNINITIALIZED, 0x2A]);
            if let Ok(assign) = assign {
                self.inbox.push_back(assign);
            }
        }
        true
    }
}

#[derive(Default)]
struct Lamp {
    state: LampState,
    actions: Vec<(u8, u8)>,
}

impl NodeHooks for Lamp {
    fn set_lamp(&mut self, state: LampState) {
        self.state = state;
    }
}

impl ApplicationRegisters for Lamp {}

impl ActionExecutor for Lamp {
    fn execute(&mut self, action: u8, param: u8, _event: &Event) {
        self.actions.push((action, param));
    }
}

fn main() {
    let config = NodeConfig {
        mdf_url: "example.com/lamp.xml".to_owned(),
        ..NodeConfig::default()
    };
    let layout = PersistentLayout::new(config.dm_rows, config.dmng_capacity);
    let store = RamStore::for_layout(&layout, &GUID);
    let Ok(mut node) = Node::new(
        config,
        store,
        SimulatedSegment::default(),
        SoftTimers::default(),
        Lamp::default(),
    ) else {
        eprintln!("invalid configuration");
        return;
    };

    for _ in 0..20 {
        node.poll(TICK_MS);
    }
    println!(
        "state={:?} nickname={:#04x} lamp={:?}",
        node.state(),
        node.nickname(),
        node.app().state
    );
    if node.state() != NodeState::Active {
        return;
    }

    let row = DmRow {
        flags: FLAG_ENABLED,
        class_mask: 0xFF,
        class_filter: 20,
        action: 0x01,
        param: 0x07,
        ..DmRow::default()
    };
    for (offset, value) in (0_u8..).zip(row.to_bytes()) {
        node.write_register(node.config().dm_page, offset, value);
    }
    node.transport_mut().inbox.push_back(Event::new(20, 3, 0x11));
    let outcome = node.poll(TICK_MS);

    println!("outcome={outcome:?} actions={:?}", node.app().actions);
    println!("frames sent: {}", node.transport().log.len());
    println!("diagnostics: {:?}", node.diagnostics());
}
