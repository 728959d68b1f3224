//! Start-up, nickname discovery and segment heartbeat coverage.

mod support;

use log as _;
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

use support::{
    active_node, deliver, node_with, protocol, provisioned_store, take_sent, CountingTimers,
    QueueTransport, RecordingApp, GENERAL_TIMER,
};
use vscp_node::persist::ADDR_SEGMENT_CRC;
use vscp_node::protocol::{CLASS1_INFORMATION, INFORMATION_NODE_HEARTBEAT};
use vscp_node::{
    LampState, Node, NodeConfig, NodeFault, NodeState, PersistentStore, ProcessOutcome,
    ProtocolType, CLASS1_PROTOCOL, NICKNAME_UNINITIALIZED,
};

const NEW_NODE_ONLINE: u8 = ProtocolType::NewNodeOnline.as_u8();
const PROBE_ACK: u8 = ProtocolType::ProbeAck.as_u8();
const SET_NICKNAME_ID: u8 = ProtocolType::SetNicknameId.as_u8();
const SEGMENT_HEARTBEAT: u8 = ProtocolType::SegmentControllerHeartbeat.as_u8();

#[test]
fn stored_nickname_is_announced_on_first_process() {
    let mut node = node_with(NodeConfig::default(), 0x10);
    assert_eq!(node.state(), NodeState::Init);

    assert_eq!(node.process(), ProcessOutcome::Started);

    let sent = take_sent(&mut node);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].class(), CLASS1_PROTOCOL);
    assert_eq!(sent[0].event_type(), NEW_NODE_ONLINE);
    assert_eq!(sent[0].origin(), 0x10);
    assert_eq!(sent[0].data(), &[0x10]);
    assert_eq!(node.state(), NodeState::Active);
    assert_eq!(node.app().lamps, vec![LampState::On]);
}

#[test]
fn unassigned_node_probes_the_segment_master_first() {
    let mut node = node_with(NodeConfig::default(), NICKNAME_UNINITIALIZED);
    assert_eq!(node.process(), ProcessOutcome::Started);

    let sent = take_sent(&mut node);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].event_type(), NEW_NODE_ONLINE);
    assert_eq!(sent[0].origin(), NICKNAME_UNINITIALIZED);
    assert_eq!(sent[0].data(), &[0]);
    assert_eq!(node.state(), NodeState::NicknameDiscovery);
    assert_eq!(node.app().lamps, vec![LampState::Blink]);
    assert_eq!(node.timer_service().starts, vec![(GENERAL_TIMER, 500)]);
    assert_eq!(node.diagnostics().discovery_restarts, 1);
}

#[test]
fn every_assignable_nickname_round_trips() {
    for nickname in 1..=254_u8 {
        let mut node = node_with(NodeConfig::default(), NICKNAME_UNINITIALIZED);
        node.process();
        take_sent(&mut node);

        let outcome = deliver(
            &mut node,
            protocol(SET_NICKNAME_ID, 0, &[NICKNAME_UNINITIALIZED, nickname]),
        );

        assert_eq!(outcome, ProcessOutcome::Protocol(SET_NICKNAME_ID));
        assert_eq!(node.nickname(), nickname);
        let sent = take_sent(&mut node);
        assert_eq!(sent.len(), 2, "nickname {nickname}");
        assert_eq!(
            sent[0].event_type(),
            ProtocolType::NicknameIdAccepted.as_u8()
        );
        assert_eq!(sent[0].origin(), nickname);
        assert_eq!(sent[1].event_type(), NEW_NODE_ONLINE);
        assert_eq!(sent[1].origin(), nickname);
        assert_eq!(sent[1].data(), &[nickname]);
        assert_eq!(node.timer_service().stops_of(GENERAL_TIMER), 1);
        assert_eq!(node.state(), NodeState::Active);
    }
}

#[test]
fn assignment_addressed_to_the_current_candidate_is_accepted() {
    let mut node = node_with(NodeConfig::default(), NICKNAME_UNINITIALIZED);
    node.process();
    node.tick(500);
    node.process();
    assert_eq!(node.discovery().candidate(), 1);
    take_sent(&mut node);

    deliver(&mut node, protocol(SET_NICKNAME_ID, 0, &[1, 0x33]));
    assert_eq!(node.nickname(), 0x33);
    assert_eq!(node.state(), NodeState::Active);
}

#[test]
fn assignment_for_another_node_is_ignored() {
    let mut node = node_with(NodeConfig::default(), NICKNAME_UNINITIALIZED);
    node.process();
    take_sent(&mut node);

    assert_eq!(
        deliver(&mut node, protocol(SET_NICKNAME_ID, 0, &[5, 9])),
        ProcessOutcome::Ignored
    );
    assert_eq!(node.state(), NodeState::NicknameDiscovery);
    assert!(take_sent(&mut node).is_empty());
}

#[test]
fn probe_timeout_moves_to_the_next_candidate() {
    let mut node = node_with(NodeConfig::default(), NICKNAME_UNINITIALIZED);
    node.process();
    take_sent(&mut node);

    node.tick(499);
    assert_eq!(node.process(), ProcessOutcome::NoEvent);
    assert!(take_sent(&mut node).is_empty());

    node.tick(1);
    assert_eq!(node.process(), ProcessOutcome::NoEvent);
    let sent = take_sent(&mut node);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].data(), &[1]);
    assert_eq!(node.discovery().candidate(), 1);
}

#[test]
fn master_acknowledgement_waits_for_the_assignment_timeout() {
    let mut node = node_with(NodeConfig::default(), NICKNAME_UNINITIALIZED);
    node.process();
    take_sent(&mut node);

    assert_eq!(
        deliver(&mut node, protocol(PROBE_ACK, 0, &[])),
        ProcessOutcome::Protocol(PROBE_ACK)
    );
    assert!(node.discovery().awaiting_assignment());

    node.tick(500);
    node.process();
    assert!(take_sent(&mut node).is_empty());

    node.tick(4_500);
    node.process();
    let sent = take_sent(&mut node);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].data(), &[1]);
}

#[test]
fn acknowledged_candidate_is_skipped() {
    let mut node = node_with(NodeConfig::default(), NICKNAME_UNINITIALIZED);
    node.process();
    node.tick(500);
    node.process();
    take_sent(&mut node);

    deliver(&mut node, protocol(PROBE_ACK, 1, &[]));
    let sent = take_sent(&mut node);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].data(), &[2]);
}

#[test]
fn acknowledgement_from_another_address_is_ignored() {
    let mut node = node_with(NodeConfig::default(), NICKNAME_UNINITIALIZED);
    node.process();
    take_sent(&mut node);

    assert_eq!(
        deliver(&mut node, protocol(PROBE_ACK, 7, &[])),
        ProcessOutcome::Ignored
    );
    assert_eq!(node.discovery().candidate(), 0);
}

#[test]
fn full_segment_parks_the_node_until_restart() {
    let mut node = node_with(NodeConfig::default(), NICKNAME_UNINITIALIZED);
    node.process();
    node.tick(500);
    node.process();

    for origin in 1..=254_u8 {
        deliver(&mut node, protocol(PROBE_ACK, origin, &[]));
    }

    assert_eq!(node.state(), NodeState::Idle);
    let sent = take_sent(&mut node);
    let last = sent.last().expect("give-up announcement");
    assert_eq!(last.event_type(), NEW_NODE_ONLINE);
    assert_eq!(last.origin(), NICKNAME_UNINITIALIZED);
    assert_eq!(last.data(), &[NICKNAME_UNINITIALIZED]);
    assert_eq!(node.app().lamps.last(), Some(&LampState::Off));
    assert_eq!(node.app().idles, 1);

    assert_eq!(
        deliver(&mut node, protocol(SET_NICKNAME_ID, 0, &[0xFF, 4])),
        ProcessOutcome::Ignored
    );
    assert!(node.transport().inbox.is_empty());

    node.restart();
    assert_eq!(node.process(), ProcessOutcome::Started);
    assert_eq!(node.state(), NodeState::NicknameDiscovery);
}

#[test]
fn probe_for_own_nickname_is_defended() {
    let mut node = active_node(0x10);

    assert_eq!(
        deliver(&mut node, protocol(NEW_NODE_ONLINE, 0xFF, &[0x10])),
        ProcessOutcome::Protocol(NEW_NODE_ONLINE)
    );
    let sent = take_sent(&mut node);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].event_type(), PROBE_ACK);
    assert_eq!(sent[0].origin(), 0x10);

    deliver(&mut node, protocol(NEW_NODE_ONLINE, 0xFF, &[0x11]));
    assert!(take_sent(&mut node).is_empty());
}

#[test]
fn nickname_collision_restarts_discovery() {
    let mut node = active_node(0x10);

    deliver(&mut node, protocol(PROBE_ACK, 0x10, &[]));

    assert_eq!(node.nickname(), NICKNAME_UNINITIALIZED);
    assert_eq!(node.state(), NodeState::NicknameDiscovery);
    assert_eq!(node.diagnostics().nickname_collisions, 1);
    let sent = take_sent(&mut node);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].origin(), NICKNAME_UNINITIALIZED);
}

fn node_with_crc(nickname: u8, crc: u8) -> support::TestNode {
    let config = NodeConfig::default();
    let mut store = provisioned_store(&config, nickname);
    store.write8(ADDR_SEGMENT_CRC, crc);
    let mut node = Node::new(
        config,
        store,
        QueueTransport::default(),
        CountingTimers::default(),
        RecordingApp::default(),
    )
    .expect("default configuration is valid");
    node.process();
    take_sent(&mut node);
    node
}

#[test]
fn unchanged_segment_crc_only_updates_time() {
    let mut node = node_with_crc(0x5A, 0x34);

    let outcome = deliver(
        &mut node,
        protocol(SEGMENT_HEARTBEAT, 0, &[0x34, 0x01, 0x02, 0x03, 0x04]),
    );

    assert_eq!(outcome, ProcessOutcome::Protocol(SEGMENT_HEARTBEAT));
    assert!(take_sent(&mut node).is_empty());
    assert_eq!(node.time_since_epoch(), 0x0102_0304);
    assert_eq!(node.nickname(), 0x5A);
    assert_eq!(node.state(), NodeState::Active);
}

#[test]
fn changed_segment_crc_drops_the_nickname() {
    let mut node = node_with_crc(0x5A, 0x34);

    deliver(
        &mut node,
        protocol(SEGMENT_HEARTBEAT, 0, &[0x00, 0x01, 0x02, 0x03, 0x04]),
    );

    let sent = take_sent(&mut node);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].event_type(), NEW_NODE_ONLINE);
    assert_eq!(sent[0].origin(), NICKNAME_UNINITIALIZED);
    assert_eq!(node.nickname(), NICKNAME_UNINITIALIZED);
    assert_eq!(node.segment_crc(), 0x00);
    assert_eq!(node.state(), NodeState::NicknameDiscovery);
}

#[test]
fn segment_heartbeat_during_discovery_does_not_restart_it() {
    let mut node = node_with(NodeConfig::default(), NICKNAME_UNINITIALIZED);
    node.process();
    take_sent(&mut node);

    deliver(&mut node, protocol(SEGMENT_HEARTBEAT, 0, &[0x77, 0, 0, 0, 9]));

    assert!(take_sent(&mut node).is_empty());
    assert_eq!(node.segment_crc(), 0x77);
    assert_eq!(node.time_since_epoch(), 9);
    assert_eq!(node.diagnostics().discovery_restarts, 1);
    assert_eq!(node.state(), NodeState::NicknameDiscovery);
}

#[test]
fn node_heartbeat_repeats_every_period() {
    let config = NodeConfig {
        zone: 4,
        sub_zone: 7,
        ..NodeConfig::default()
    };
    let mut node = node_with(config, 0x21);
    node.process();
    take_sent(&mut node);

    node.tick(1_000);
    node.process();
    let sent = take_sent(&mut node);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].class(), CLASS1_INFORMATION);
    assert_eq!(sent[0].event_type(), INFORMATION_NODE_HEARTBEAT);
    assert_eq!(sent[0].origin(), 0x21);
    assert_eq!(sent[0].data(), &[0, 4, 7]);

    node.tick(999);
    node.process();
    assert!(take_sent(&mut node).is_empty());
    node.tick(1);
    node.process();
    assert_eq!(take_sent(&mut node).len(), 1);
}

#[test]
fn zero_heartbeat_period_disables_heartbeats() {
    let config = NodeConfig {
        heartbeat_period_ms: 0,
        ..NodeConfig::default()
    };
    let mut node = node_with(config, 0x21);
    node.process();
    take_sent(&mut node);

    node.poll(10_000);
    assert!(take_sent(&mut node).is_empty());
}

#[test]
fn timer_exhaustion_is_terminal() {
    let config = NodeConfig::default();
    let store = provisioned_store(&config, 0x10);
    let mut node = Node::new(
        config,
        store,
        QueueTransport::default(),
        CountingTimers::with_capacity(3),
        RecordingApp::default(),
    )
    .expect("configuration itself is valid");

    assert_eq!(node.state(), NodeState::Error(NodeFault::TimerExhausted));
    assert_eq!(node.app().errors, vec![NodeFault::TimerExhausted]);
    assert_eq!(node.process(), ProcessOutcome::Inert);
    node.restart();
    assert_eq!(node.process(), ProcessOutcome::Inert);
    assert_eq!(node.app().errors.len(), 1);
    assert!(take_sent(&mut node).is_empty());
}
