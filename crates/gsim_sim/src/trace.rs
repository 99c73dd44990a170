//! Backward traces through the netlist, attached to fatal scheduling errors.

use std::collections::{HashSet, VecDeque};

use gsim_netlist::{Netlist, NodeId, PinId};

use crate::lines::pin_name;
use crate::store::{Cycle, ValueStore};

/// A trace from a stalled node back to the node that stopped updating.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateTrace {
    /// Human-readable listing, one block per visited node.
    pub text: String,
    /// The first node whose inputs are all up to date, if one was reached.
    pub root: Option<NodeId>,
}

/// Returns `true` if `pin` has no value for `cycle - 1`.
pub fn is_lagging(store: &ValueStore, pin: PinId, cycle: Cycle) -> bool {
    match (store.last_cycle(pin), cycle.checked_sub(1)) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(last), Some(needed)) => last < needed,
    }
}

fn describe(netlist: &Netlist, node: NodeId) -> String {
    let record = netlist.node(node);
    format!(
        "{} ({}) {} {}",
        pin_name(&record.name),
        node.as_raw(),
        record.inputs.len(),
        record.outputs.len()
    )
}

/// Walks drivers backwards from `start`, following the first lagging input
/// of each node, and lists every input with its driver. Lagging inputs are
/// marked with `*`.
pub fn update_trace(netlist: &Netlist, store: &ValueStore, start: NodeId, cycle: Cycle) -> UpdateTrace {
    let mut text = String::from(
        "each node is followed by its inputs; '*' marks an input that stopped updating\n\
         format: (<mapping>) <name> (<id>) <inputs> <outputs>\n",
    );
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from([start]);
    let mut root = None;

    while let Some(node) = queue.pop_front() {
        if !visited.insert(node) {
            text.push_str(&format!("CYCLE DETECTED AFTER {} NODES\n", visited.len()));
            break;
        }
        text.push_str(&describe(netlist, node));
        text.push('\n');

        let mut followed = false;
        for &pin in &netlist.node(node).inputs {
            let lagging = !store.is_undriven(pin) && is_lagging(store, pin, cycle);
            let mapping = netlist.pin(pin).mapping.as_deref().unwrap_or("");
            let driver = netlist.driver_node(pin);
            let source = driver.map_or_else(|| "<undriven>".to_string(), |d| describe(netlist, d));
            text.push_str(&format!(
                "\t({mapping}) {source}{}\n",
                if lagging { " *" } else { "" }
            ));
            if lagging && !followed {
                followed = true;
                queue.extend(driver);
            }
        }

        if !followed {
            text.push_str("TOP OF TRACE\n");
            root = Some(node);
            break;
        }
    }
    UpdateTrace { text, root }
}

/// Lists up to `limit` nodes breadth-first over drivers, starting at `start`.
pub fn ancestry(netlist: &Netlist, start: NodeId, limit: usize) -> String {
    let mut text = String::new();
    let mut queue = VecDeque::from([start]);
    let mut remaining = limit;
    while remaining > 0 {
        let Some(node) = queue.pop_front() else {
            break;
        };
        remaining -= 1;
        let record = netlist.node(node);
        text.push_str(&format!("{} ({}):\n", pin_name(&record.name), node.as_raw()));
        for &pin in &record.inputs {
            let mapping = netlist.pin(pin).mapping.as_deref().unwrap_or("");
            match netlist.driver_node(pin) {
                Some(driver) => {
                    queue.push_back(driver);
                    let name = pin_name(&netlist.node(driver).name);
                    text.push_str(&format!("\t{mapping} {name} ({})\n", driver.as_raw()));
                }
                None => text.push_str(&format!("\t{mapping} <undriven>\n")),
            }
        }
    }
    text
}
