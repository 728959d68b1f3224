//! Application event dispatch through the classic matrix and DM-NG.

mod support;

use log as _;
use proptest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

use rstest::rstest;
use support::{deliver, node_with, take_sent, TestNode};
use vscp_node::dm::{
    ACTION_EXTENDED_DM, EXT_MATCH_DATA0, FLAG_CHECK_ORIGIN, FLAG_ENABLED, FLAG_MATCH_ZONE, ROW_LEN,
};
use vscp_node::dmng::{encode_ruleset, BasicOp, ParamId};
use vscp_node::{
    Condition, DmRow, Event, ExtensionRow, NodeConfig, ProcessOutcome, Rule, RuleAction,
    RuleFaultKind,
};

const NICK: u8 = 0x10;
const DM_PAGE: u16 = 1;
const DMNG_PAGE: u16 = 2;

fn started(config: NodeConfig) -> TestNode {
    let mut node = node_with(config, NICK);
    node.process();
    take_sent(&mut node);
    node
}

fn write_row(node: &mut TestNode, index: u8, row: DmRow) {
    for (byte, value) in row.to_bytes().into_iter().enumerate() {
        let offset = usize::from(index) * ROW_LEN + byte;
        let offset = u8::try_from(offset).expect("row offset fits the page");
        node.write_register(DM_PAGE, offset, value);
    }
}

fn write_extension(node: &mut TestNode, rows: u8, index: u8, row: ExtensionRow) {
    let base = usize::from(rows) * ROW_LEN + usize::from(index) * row.to_bytes().len();
    for (byte, value) in row.to_bytes().into_iter().enumerate() {
        let offset = u8::try_from(base + byte).expect("extension offset fits the page");
        node.write_register(DM_PAGE, offset, value);
    }
}

fn write_ruleset(node: &mut TestNode, bytes: &[u8]) {
    for (offset, value) in bytes.iter().enumerate() {
        let offset = u8::try_from(offset).expect("ruleset fits the page");
        node.write_register(DMNG_PAGE, offset, *value);
    }
}

fn event(class: u16, event_type: u8, origin: u8, data: &[u8]) -> Event {
    Event::new(class, event_type, origin)
        .with_data(data)
        .expect("payload fits a frame")
}

fn row(flags: u8, class: Option<u8>, event_type: Option<u8>, action: u8, param: u8) -> DmRow {
    DmRow {
        origin: 0,
        flags: FLAG_ENABLED | flags,
        class_mask: if class.is_some() { 0xFF } else { 0 },
        class_filter: class.unwrap_or(0),
        type_mask: if event_type.is_some() { 0xFF } else { 0 },
        type_filter: event_type.unwrap_or(0),
        action,
        param,
    }
}

#[test]
fn every_matching_row_fires_in_row_order() {
    let mut node = started(NodeConfig::default());
    write_row(&mut node, 0, row(0, Some(20), Some(3), 0x10, 1));
    write_row(&mut node, 1, row(0, None, None, 0x11, 2));
    let incoming = event(20, 3, 5, &[]);

    let outcome = deliver(&mut node, incoming);

    assert_eq!(
        outcome,
        ProcessOutcome::Application {
            dm_actions: 2,
            dmng: None
        }
    );
    assert_eq!(node.app().executed, vec![(0x10, 1), (0x11, 2)]);
    assert_eq!(node.last_dm_event(), Some(&incoming));
    assert_eq!(node.app().provided, vec![incoming]);
    assert_eq!(node.diagnostics().dm_actions, 2);
}

#[test]
fn unmatched_event_is_still_provided_to_the_application() {
    let mut node = started(NodeConfig::default());
    write_row(&mut node, 0, row(0, Some(20), None, 0x10, 1));
    let incoming = event(30, 3, 5, &[]);

    deliver(&mut node, incoming);

    assert!(node.app().executed.is_empty());
    assert!(node.last_dm_event().is_none());
    assert_eq!(node.app().provided, vec![incoming]);
}

#[rstest]
#[case::origin_matches(FLAG_CHECK_ORIGIN, 7, &[], true)]
#[case::origin_differs(FLAG_CHECK_ORIGIN, 8, &[], false)]
#[case::zone_matches(FLAG_MATCH_ZONE, 8, &[0, 4], true)]
#[case::zone_wildcard(FLAG_MATCH_ZONE, 8, &[0, 0xFF], true)]
#[case::zone_differs(FLAG_MATCH_ZONE, 8, &[0, 5], false)]
#[case::zone_missing(FLAG_MATCH_ZONE, 8, &[0], false)]
fn row_filters_apply(
    #[case] flags: u8,
    #[case] origin: u8,
    #[case] data: &[u8],
    #[case] fires: bool,
) {
    let config = NodeConfig {
        zone: 4,
        ..NodeConfig::default()
    };
    let mut node = started(config);
    let mut filtered = row(flags, None, None, 0x40, 0);
    filtered.origin = 7;
    write_row(&mut node, 0, filtered);

    deliver(&mut node, event(20, 1, origin, data));

    assert_eq!(!node.app().executed.is_empty(), fires);
}

#[test]
fn extended_row_fires_the_extension_action() {
    let config = NodeConfig::default();
    let rows = config.dm_rows;
    let mut node = started(config);
    write_row(&mut node, 0, row(0, None, None, ACTION_EXTENDED_DM, 0));
    write_extension(
        &mut node,
        rows,
        0,
        ExtensionRow {
            options: EXT_MATCH_DATA0,
            par0: 7,
            action: 0x22,
            param: 9,
            ..ExtensionRow::default()
        },
    );

    deliver(&mut node, event(20, 1, 1, &[8]));
    assert!(node.app().executed.is_empty());

    deliver(&mut node, event(20, 1, 1, &[7]));
    assert_eq!(node.app().executed, vec![(0x22, 9)]);
}

fn dmng_config() -> NodeConfig {
    NodeConfig {
        dmng_enabled: true,
        ..NodeConfig::default()
    }
}

#[test]
fn first_matching_rule_wins() {
    let mut node = started(dmng_config());
    let rules = [
        Rule::when(0x30, 1, Condition::new(ParamId::Class, BasicOp::Equal, 20)),
        Rule::when(0x31, 2, Condition::new(ParamId::Type, BasicOp::Equal, 3)),
    ];
    let bytes = encode_ruleset(&rules, 64).expect("ruleset fits");
    write_ruleset(&mut node, &bytes);

    let outcome = deliver(&mut node, event(20, 3, 1, &[]));

    let expected = RuleAction {
        rule_index: 0,
        action: 0x30,
        param: 1,
    };
    assert_eq!(
        outcome,
        ProcessOutcome::Application {
            dm_actions: 0,
            dmng: Some(expected)
        }
    );
    assert_eq!(node.app().executed, vec![(0x30, 1)]);
    assert_eq!(node.diagnostics().dmng_actions, 1);
    assert!(node.last_dm_event().is_some());
}

#[test]
fn corrupt_rule_is_skipped_and_reported() {
    let mut node = started(dmng_config());
    write_ruleset(&mut node, &[2, 6, 1, 0, 0x00, 0x7F, 3, 6, 2, 0, 0x00, 0x01, 3]);

    let outcome = deliver(&mut node, event(20, 3, 1, &[]));

    assert_eq!(
        outcome,
        ProcessOutcome::Application {
            dm_actions: 0,
            dmng: Some(RuleAction {
                rule_index: 1,
                action: 2,
                param: 0
            })
        }
    );
    let fault = node.dmng_last_fault().expect("fault is sticky");
    assert_eq!(fault.kind, RuleFaultKind::UnknownParam);
    assert_eq!(fault.rule_index, 0);
    assert_eq!(node.diagnostics().dmng_faults, 1);

    node.clear_dmng_fault();
    assert!(node.dmng_last_fault().is_none());
}

#[test]
fn short_rule_length_does_not_hide_later_rules() {
    let mut node = started(dmng_config());
    write_ruleset(
        &mut node,
        &[3, 3, 1, 0, 6, 2, 0, 0x00, 0x01, 3, 6, 3, 0, 0x00, 0x01, 3],
    );

    let outcome = deliver(&mut node, event(20, 3, 1, &[]));

    assert_eq!(
        outcome,
        ProcessOutcome::Application {
            dm_actions: 0,
            dmng: Some(RuleAction {
                rule_index: 1,
                action: 2,
                param: 0
            })
        }
    );
    let fault = node.dmng_last_fault().expect("fault is sticky");
    assert_eq!(
        (fault.rule_index, fault.byte_offset, fault.kind),
        (0, 1, RuleFaultKind::RuleLengthInvalid)
    );
    assert_eq!(node.diagnostics().dmng_faults, 1);
}

#[test]
fn erased_ruleset_holds_no_rules() {
    let mut node = started(dmng_config());

    let outcome = deliver(&mut node, event(20, 3, 1, &[]));

    assert_eq!(
        outcome,
        ProcessOutcome::Application {
            dm_actions: 0,
            dmng: None
        }
    );
    assert!(node.dmng_last_fault().is_none());
}

#[test]
fn disabled_dmng_leaves_its_page_to_the_application() {
    let mut node = started(NodeConfig::default());
    write_ruleset(&mut node, &[1, 4, 0x30, 1, 0x00]);

    assert_eq!(node.app().registers.get(&(DMNG_PAGE, 1)), Some(&4));
    let outcome = deliver(&mut node, event(20, 3, 1, &[]));
    assert_eq!(
        outcome,
        ProcessOutcome::Application {
            dm_actions: 0,
            dmng: None
        }
    );
}
