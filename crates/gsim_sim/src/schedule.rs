//! The evaluation order, discovered by simulating cycle 0.
//!
//! Cycle 0 is evaluated breadth-first from the sources of the netlist:
//! top-level inputs, constant drivers and every other node whose inputs are
//! all undriven (free-running clocks have no inputs at all).
//! A node is queued once all of its inputs are ready, so the order in which
//! nodes come off the queue is a valid evaluation order for every later
//! cycle. That order is then cut into stages whose members never feed each
//! other, which lets a stage be evaluated in parallel.

use std::collections::{HashMap, HashSet, VecDeque};

use gsim_netlist::NodeId;

use crate::error::SimError;
use crate::evaluator::evaluate;
use crate::readiness::{is_complete, is_ready};
use crate::session::Session;
use crate::trace::ancestry;

/// How many drivers a mismapped-node report lists.
const ANCESTRY_LIMIT: usize = 10;

/// Evaluation order for cycles after the first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schedule {
    ordered: Vec<NodeId>,
    stages: Vec<Vec<NodeId>>,
}

impl Schedule {
    /// Every scheduled node in evaluation order.
    pub fn ordered(&self) -> &[NodeId] {
        &self.ordered
    }

    /// The ordered nodes cut into independent stages.
    pub fn stages(&self) -> &[Vec<NodeId>] {
        &self.stages
    }

    /// Number of scheduled nodes.
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// Returns `true` if nothing was scheduled.
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

/// Evaluates cycle 0 and records the order nodes became ready in.
///
/// Vector-driven inputs must already hold their cycle-0 values.
pub fn build(session: &Session) -> Result<Schedule, SimError> {
    let netlist = session.netlist();
    let store = session.store();
    let mut queued = vec![false; netlist.nodes.len()];
    let mut queue = VecDeque::new();

    let sources = netlist
        .top_inputs
        .iter()
        .copied()
        .chain(netlist.constant_nodes())
        .chain(
            netlist
                .nodes
                .iter()
                .filter(|(_, node)| node.inputs.iter().all(|&pin| store.is_undriven(pin)))
                .map(|(id, _)| id),
        );
    for node in sources {
        let slot = &mut queued[node.as_raw() as usize];
        if !*slot && is_ready(session, node, 0) {
            *slot = true;
            queue.push_back(node);
        }
    }

    let mut ordered = Vec::with_capacity(netlist.nodes.len());
    let mut children = HashMap::new();
    while let Some(node) = queue.pop_front() {
        evaluate(session, node, 0)?;
        ordered.push(node);

        let kids = netlist.children_of(node).map_err(|mismap| SimError::MismappedNode {
            node: netlist.node(node).name.clone(),
            reason: mismap.to_string(),
            ancestry: ancestry(netlist, node, ANCESTRY_LIMIT),
        })?;
        for &child in &kids {
            let slot = &mut queued[child.as_raw() as usize];
            if !*slot && is_ready(session, child, 0) && !is_complete(session, child, 0) {
                *slot = true;
                queue.push_back(child);
            }
        }
        children.insert(node, kids);
    }

    let stages = partition_stages(&ordered, &children);
    Ok(Schedule { ordered, stages })
}

/// Cuts `ordered` into stages.
///
/// A node starts a new stage if a member of the current stage feeds it, or
/// if it feeds a member of the current stage.
pub fn partition_stages(ordered: &[NodeId], children: &HashMap<NodeId, Vec<NodeId>>) -> Vec<Vec<NodeId>> {
    let no_children = Vec::new();
    let mut stages = Vec::new();
    let mut stage: Vec<NodeId> = Vec::new();
    let mut members = HashSet::new();
    let mut fed = HashSet::new();

    for &node in ordered {
        let kids = children.get(&node).unwrap_or(&no_children);
        let dependent = fed.contains(&node) || kids.iter().any(|kid| members.contains(kid));
        if dependent && !stage.is_empty() {
            stages.push(std::mem::take(&mut stage));
            members.clear();
            fed.clear();
        }
        stage.push(node);
        members.insert(node);
        fed.extend(kids.iter().copied());
    }
    if !stage.is_empty() {
        stages.push(stage);
    }
    stages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimConfig;
    use gsim_common::Logic;
    use gsim_netlist::{EdgeSensitivity, NetlistBuilder, NodeKind};

    fn id(raw: u32) -> NodeId {
        NodeId::from_raw(raw)
    }

    #[test]
    fn chain_gets_one_stage_per_node() {
        let ordered = [id(0), id(1), id(2)];
        let children = HashMap::from([(id(0), vec![id(1)]), (id(1), vec![id(2)])]);
        assert_eq!(
            partition_stages(&ordered, &children),
            vec![vec![id(0)], vec![id(1)], vec![id(2)]]
        );
    }

    #[test]
    fn independent_nodes_share_a_stage() {
        let ordered = [id(0), id(1), id(2), id(3)];
        let children = HashMap::from([
            (id(0), vec![id(2)]),
            (id(1), vec![id(3)]),
        ]);
        assert_eq!(
            partition_stages(&ordered, &children),
            vec![vec![id(0), id(1)], vec![id(2), id(3)]]
        );
    }

    #[test]
    fn node_feeding_current_stage_starts_new_one() {
        // 1 feeds 0 through a register loop, so they cannot share a stage.
        let ordered = [id(0), id(1)];
        let children = HashMap::from([(id(1), vec![id(0)])]);
        assert_eq!(partition_stages(&ordered, &children), vec![vec![id(0)], vec![id(1)]]);
    }

    fn drive_inputs(session: &Session, value: Logic) {
        let netlist = session.netlist();
        for &node in &netlist.top_inputs {
            for &pin in &netlist.node(node).outputs {
                session.store().write(pin, value, 0).unwrap();
            }
        }
    }

    #[test]
    fn build_orders_by_readiness() {
        let mut b = NetlistBuilder::new("t");
        let a = b.input("top^a");
        let c = b.input("top^c");
        let n1 = b.gate(NodeKind::And, "top^n1", &[a, c]);
        let n2 = b.gate(NodeKind::Not, "top^n2", &[n1]);
        b.output("top^y", n2);
        let session = Session::new(b.finish(), SimConfig::default()).unwrap();
        drive_inputs(&session, Logic::One);

        let schedule = build(&session).unwrap();
        let netlist = session.netlist();
        let names: Vec<_> = schedule
            .ordered()
            .iter()
            .map(|&n| netlist.node(n).name.as_str())
            .collect();
        assert_eq!(names, vec!["top^a", "top^c", "top^n1", "top^n2", "top^y"]);
        assert_eq!(schedule.stages().len(), 4);
        let y = netlist.find_node("top^y").unwrap();
        assert_eq!(session.store().read(netlist.node(y).outputs[0], 0), Logic::Zero);
    }

    #[test]
    fn register_loop_is_scheduled() {
        let mut b = NetlistBuilder::new("t");
        let clk = b.clock("top^clk");
        let feedback = b.undriven_net("top^nq");
        let q = b.flip_flop("top^q", EdgeSensitivity::Rising, feedback, clk);
        let inv = b
            .node("top^inv", NodeKind::Not)
            .input_port("in", &[q])
            .output_port("out", 1)
            .finish();
        let mut netlist = b.finish();
        // Close the loop: the inverter drives the flip-flop's D net.
        let inv_out = netlist.node(inv.id).outputs[0];
        let old_net = netlist.pins[inv_out].net;
        netlist.pins[inv_out].net = Some(feedback);
        netlist.nets[feedback].driver = Some(inv_out);
        if let Some(old) = old_net {
            netlist.nets[old].driver = None;
        }
        let session = Session::new(netlist, SimConfig::default()).unwrap();
        drive_inputs(&session, Logic::One);

        let schedule = build(&session).unwrap();
        assert_eq!(schedule.len(), 3);
    }

    #[test]
    fn nodes_fed_only_by_undriven_pins_are_sources() {
        let mut b = NetlistBuilder::new("t");
        let a = b.input("top^a");
        let open = b.undriven_net("open");
        let floating = b.gate(NodeKind::Buffer, "top^floating", &[open]);
        b.gate(NodeKind::And, "top^g", &[a, floating]);
        let session = Session::new(b.finish(), SimConfig::default()).unwrap();
        drive_inputs(&session, Logic::One);
        let schedule = build(&session).unwrap();
        let netlist = session.netlist();
        let names: Vec<_> = schedule
            .ordered()
            .iter()
            .map(|&n| netlist.node(n).name.as_str())
            .collect();
        assert_eq!(names, vec!["top^a", "top^floating", "top^g"]);
    }

    #[test]
    fn mismapped_fanout_is_reported() {
        let mut b = NetlistBuilder::new("t");
        let a = b.input("top^a");
        let c = b.input("top^c");
        b.gate(NodeKind::Buffer, "top^g", &[a]);
        let mut netlist = b.finish();
        let g = netlist.find_node("top^g").unwrap();
        let g_in = netlist.node(g).inputs[0];
        // The pin still sits in a's fanout but claims to be on c.
        netlist.pins[g_in].net = Some(c);
        let session = Session::new(netlist, SimConfig::default()).unwrap();
        drive_inputs(&session, Logic::One);
        let err = build(&session).unwrap_err();
        assert!(matches!(err, SimError::MismappedNode { ref node, .. } if node == "top^a"));
    }
}
