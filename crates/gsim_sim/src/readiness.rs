//! When a node may be evaluated, and when it already has been.
//!
//! Most inputs must carry a value for the cycle being simulated. Registered
//! inputs (flip-flop data, memory data and write enables, the source of a
//! chained clock) are read one cycle late, so they only need `cycle - 1`.
//! Inputs with no driving net never block.

use gsim_netlist::{NodeId, NodeKind, Pin};

use crate::error::SimError;
use crate::memory::is_registered_input;
use crate::session::Session;
use crate::store::Cycle;
use crate::trace::{is_lagging, update_trace};

/// By this cycle every scheduled node has been evaluated at least twice, so
/// any input still behind is never going to be updated.
pub const STALL_CHECK_CYCLE: Cycle = 3;

/// Returns `true` if input `index` of a node of `kind` is read one cycle late.
pub fn reads_previous_cycle(kind: &NodeKind, pin: &Pin, index: usize) -> bool {
    match kind {
        NodeKind::FlipFlop { .. } => index == 0,
        NodeKind::Memory { .. } => pin.mapping.as_deref().is_some_and(is_registered_input),
        NodeKind::Clock => true,
        _ => false,
    }
}

/// Returns `true` if every input of `node` has the value it needs for `cycle`.
pub fn is_ready(session: &Session, node: NodeId, cycle: Cycle) -> bool {
    let netlist = session.netlist();
    let store = session.store();
    let record = netlist.node(node);
    record.inputs.iter().enumerate().all(|(index, &pin)| {
        if store.is_undriven(pin) {
            return true;
        }
        let needed = if reads_previous_cycle(&record.kind, netlist.pin(pin), index) {
            match cycle.checked_sub(1) {
                Some(previous) => previous,
                None => return true,
            }
        } else {
            cycle
        };
        store.has_value(pin, needed)
    })
}

/// Returns `true` if every output of `node` has a value for `cycle`.
pub fn is_complete(session: &Session, node: NodeId, cycle: Cycle) -> bool {
    let store = session.store();
    session
        .netlist()
        .node(node)
        .outputs
        .iter()
        .all(|&pin| store.has_value(pin, cycle))
}

/// Fails with [`SimError::ScheduleStall`] if a driven input of `node` has
/// no value for `cycle - 1`.
pub fn check_stall(session: &Session, node: NodeId, cycle: Cycle) -> Result<(), SimError> {
    let netlist = session.netlist();
    let store = session.store();
    let record = netlist.node(node);
    let Some(&pin) = record
        .inputs
        .iter()
        .find(|&&pin| !store.is_undriven(pin) && is_lagging(store, pin, cycle))
    else {
        return Ok(());
    };
    let trace = update_trace(netlist, store, node, cycle);
    let mut text = trace.text;
    if let Some(root) = trace.root {
        text.push_str(&format!("root node: {}\n", netlist.node(root).name));
    }
    Err(SimError::ScheduleStall {
        node: record.name.clone(),
        pin: netlist.pin(pin).name.clone(),
        cycle,
        last: store.last_cycle(pin).map_or(-1, |last| last as i64),
        trace: text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimConfig;
    use gsim_common::Logic;
    use gsim_netlist::{EdgeSensitivity, MemoryPorts, NetlistBuilder};

    #[test]
    fn registered_inputs_by_kind() {
        let pin = |mapping: &str| Pin {
            node: NodeId::from_raw(0),
            direction: gsim_netlist::PinDirection::Input,
            net: None,
            name: String::new(),
            mapping: Some(mapping.to_string()),
            is_default: false,
        };
        let ff = NodeKind::FlipFlop {
            edge: EdgeSensitivity::Rising,
        };
        assert!(reads_previous_cycle(&ff, &pin("D"), 0));
        assert!(!reads_previous_cycle(&ff, &pin("clk"), 1));
        let ram = NodeKind::Memory {
            ports: MemoryPorts::Single,
        };
        assert!(reads_previous_cycle(&ram, &pin("we"), 3));
        assert!(!reads_previous_cycle(&ram, &pin("addr"), 0));
        assert!(reads_previous_cycle(&NodeKind::Clock, &pin("in"), 0));
        assert!(!reads_previous_cycle(&NodeKind::And, &pin("in"), 0));
    }

    #[test]
    fn gate_waits_for_all_inputs() {
        let mut b = NetlistBuilder::new("t");
        let a = b.input("top^a");
        let c = b.input("top^c");
        b.gate(NodeKind::And, "top^g", &[a, c]);
        let netlist = b.finish();
        let session = Session::new(netlist, SimConfig::default()).unwrap();
        let netlist = session.netlist();
        let g = netlist.find_node("top^g").unwrap();
        let a_out = netlist.node(netlist.top_inputs[0]).outputs[0];
        let c_out = netlist.node(netlist.top_inputs[1]).outputs[0];

        assert!(!is_ready(&session, g, 0));
        session.store().write(a_out, Logic::One, 0).unwrap();
        assert!(!is_ready(&session, g, 0));
        session.store().write(c_out, Logic::One, 0).unwrap();
        assert!(is_ready(&session, g, 0));
        assert!(!is_complete(&session, g, 0));
    }

    #[test]
    fn flip_flop_data_is_read_one_cycle_late() {
        let mut b = NetlistBuilder::new("t");
        let clk = b.clock("top^clk");
        let d = b.input("top^d");
        b.flip_flop("top^q", EdgeSensitivity::Rising, d, clk);
        let netlist = b.finish();
        let session = Session::new(netlist, SimConfig::default()).unwrap();
        let netlist = session.netlist();
        let q = netlist.find_node("top^q").unwrap();
        let clk_out = netlist.node(netlist.top_inputs[0]).outputs[0];

        session.store().write(clk_out, Logic::One, 0).unwrap();
        assert!(is_ready(&session, q, 0));
        session.store().write(clk_out, Logic::Zero, 1).unwrap();
        assert!(!is_ready(&session, q, 1));
    }

    #[test]
    fn undriven_inputs_never_block() {
        let mut b = NetlistBuilder::new("t");
        let open = b.undriven_net("open");
        b.gate(NodeKind::Buffer, "top^g", &[open]);
        let session = Session::new(b.finish(), SimConfig::default()).unwrap();
        let g = session.netlist().find_node("top^g").unwrap();
        assert!(is_ready(&session, g, 0));
        assert!(is_ready(&session, g, 5));
        assert!(check_stall(&session, g, STALL_CHECK_CYCLE).is_ok());
    }

    #[test]
    fn lagging_input_stalls() {
        let mut b = NetlistBuilder::new("t");
        let a = b.input("top^a");
        b.gate(NodeKind::Buffer, "top^g", &[a]);
        let session = Session::new(b.finish(), SimConfig::default()).unwrap();
        let netlist = session.netlist();
        let g = netlist.find_node("top^g").unwrap();
        let a_out = netlist.node(netlist.top_inputs[0]).outputs[0];
        session.store().write(a_out, Logic::One, 0).unwrap();

        let err = check_stall(&session, g, STALL_CHECK_CYCLE).unwrap_err();
        match err {
            SimError::ScheduleStall { node, last, trace, .. } => {
                assert_eq!(node, "top^g");
                assert_eq!(last, 0);
                assert!(trace.contains("root node: top^a"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
