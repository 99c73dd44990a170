//! Arithmetic nodes.
//!
//! Adders and subtractors carry three ports (a, b, carry in) and put the
//! carry out on output pin 0, followed by the sum bits. Subtractors arrive
//! with `b` already inverted, so both share the adder path.

use gsim_common::Logic;
use gsim_netlist::{Netlist, Node, NodeId, PinId};

use super::{malformed, port_values, EvalResult};
use crate::arith::{self, WideOp};
use crate::session::Session;
use crate::store::Cycle;

/// Lays a ripple result out as carry-out first, then sum bits.
fn carry_first(result: &[Logic], outputs: usize) -> Vec<Logic> {
    let bit = |i: usize| result.get(i).copied().unwrap_or(Logic::Zero);
    (0..outputs)
        .map(|i| if i == 0 { bit(outputs - 1) } else { bit(i - 1) })
        .collect()
}

fn driven_by(netlist: &Netlist, pin: Option<&PinId>, node: Option<NodeId>) -> bool {
    match (pin, node) {
        (Some(&pin), Some(node)) => netlist.driver_node(pin) == Some(node),
        _ => false,
    }
}

/// Carry in of an adder. A carry pin tied to the pad is inferred from the
/// low operand bits: 1 when `a[0]` is tied low and `b[0]` high, else 0.
fn carry_in(session: &Session, record: &Node, cycle: Cycle) -> Logic {
    let netlist = session.netlist();
    let Some(&cin) = record.input_port(2).first() else {
        return Logic::Zero;
    };
    if netlist.pad.is_some() && netlist.driver_node(cin) == netlist.pad {
        let a0 = record.input_port(0).first();
        let b0 = record.input_port(1).first();
        let inferred = driven_by(netlist, a0, netlist.gnd) && driven_by(netlist, b0, netlist.vcc);
        return Logic::from_bool(inferred);
    }
    session.store().read(cin, cycle)
}

pub(super) fn add(session: &Session, node: NodeId, cycle: Cycle) -> EvalResult {
    let record = session.netlist().node(node);
    if record.input_port_sizes.len() != 3 {
        return Err(malformed(record, "adder needs ports a, b and carry in"));
    }
    let a = port_values(session, record, 0, cycle);
    let b = port_values(session, record, 1, cycle);
    let sum = arith::ripple_add(&a, &b, carry_in(session, record, cycle));
    Ok(Some(carry_first(&sum, record.outputs.len())))
}

/// Binary subtract, or unary minus when the node has a single operand.
pub(super) fn subtract(session: &Session, node: NodeId, cycle: Cycle) -> EvalResult {
    let record = session.netlist().node(node);
    if record.input_port_sizes.len() == 3 {
        return add(session, node, cycle);
    }
    let width = record.outputs.len();
    Ok(Some(match arith::negate(&port_values(session, record, 0, cycle)) {
        Some(negated) => carry_first(&negated, width),
        None => vec![Logic::X; width],
    }))
}

pub(super) fn multiply(session: &Session, node: NodeId, cycle: Cycle) -> EvalResult {
    let record = session.netlist().node(node);
    let width = record.outputs.len();
    let a = port_values(session, record, 0, cycle);
    let b = port_values(session, record, 1, cycle);
    Ok(Some(match arith::multiply(&a, &b) {
        Some(product) => (0..width)
            .map(|i| product.get(i).copied().unwrap_or(Logic::Zero))
            .collect(),
        None => vec![Logic::X; width],
    }))
}

pub(super) fn wide(session: &Session, node: NodeId, cycle: Cycle, op: WideOp) -> EvalResult {
    let record = session.netlist().node(node);
    let a = port_values(session, record, 0, cycle);
    let b = port_values(session, record, 1, cycle);
    Ok(Some(arith::wide(op, &a, &b, record.outputs.len())))
}
