#![no_main]

use libfuzzer_sys::fuzz_target;
use vscp_node::dmng::{disassemble, validate};
use vscp_node::{DmNgEngine, Event};

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }

    let class = u16::from_be_bytes([data[0], data[1]]);
    let event_type = data[2];
    let payload_len = usize::from(data[3] % 9).min(data.len() - 4);
    let (payload, ruleset) = data[4..].split_at(payload_len);

    let Ok(event) = Event::new(class, event_type, 0x01).with_data(payload) else {
        return;
    };

    let mut engine = DmNgEngine::new();
    let hit = engine.evaluate(ruleset, &event);
    let checked = validate(ruleset);
    if checked.is_ok() {
        assert!(engine.last_fault().is_none());
    }
    if let Some(action) = hit {
        assert!(ruleset.first().is_some_and(|count| action.rule_index < *count));
    }

    let rows = disassemble(ruleset);
    if let Ok(count) = checked {
        assert_eq!(rows.len(), usize::from(count));
    }
});
