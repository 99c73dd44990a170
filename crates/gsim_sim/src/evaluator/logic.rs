//! Single-bit combinational gates.

use gsim_common::Logic;
use gsim_netlist::NodeId;

use super::{input_values, malformed, EvalResult};
use crate::session::Session;
use crate::store::Cycle;

/// Applies `op` to all input values and drives every output with the result.
fn reduce(session: &Session, node: NodeId, cycle: Cycle, op: fn(&[Logic]) -> Logic) -> EvalResult {
    let record = session.netlist().node(node);
    let value = op(&input_values(session, record, cycle));
    Ok(Some(vec![value; record.outputs.len()]))
}

/// Like [`reduce`] for cells defined over exactly three inputs.
fn truth_table(session: &Session, node: NodeId, cycle: Cycle, op: fn([bool; 3]) -> bool) -> EvalResult {
    let record = session.netlist().node(node);
    let values = input_values(session, record, cycle);
    let [a, b, c] = values[..] else {
        return Err(malformed(record, format!("expected 3 inputs, found {}", values.len())));
    };
    let value = match (a.to_bool(), b.to_bool(), c.to_bool()) {
        (Some(a), Some(b), Some(c)) => Logic::from_bool(op([a, b, c])),
        _ => Logic::X,
    };
    Ok(Some(vec![value; record.outputs.len()]))
}

fn all_and(values: &[Logic]) -> Logic {
    values.iter().fold(Logic::One, |acc, &v| acc & v)
}

fn any_or(values: &[Logic]) -> Logic {
    values.iter().fold(Logic::Zero, |acc, &v| acc | v)
}

fn parity(values: &[Logic]) -> Logic {
    values.iter().fold(Logic::Zero, |acc, &v| acc ^ v)
}

fn first(values: &[Logic]) -> Logic {
    values.first().copied().unwrap_or(Logic::X)
}

pub(super) fn and(session: &Session, node: NodeId, cycle: Cycle) -> EvalResult {
    reduce(session, node, cycle, all_and)
}

pub(super) fn or(session: &Session, node: NodeId, cycle: Cycle) -> EvalResult {
    reduce(session, node, cycle, any_or)
}

pub(super) fn nand(session: &Session, node: NodeId, cycle: Cycle) -> EvalResult {
    reduce(session, node, cycle, |v| !all_and(v))
}

/// Also evaluates `Not`, which is a NOR over however many inputs it has.
pub(super) fn nor(session: &Session, node: NodeId, cycle: Cycle) -> EvalResult {
    reduce(session, node, cycle, |v| !any_or(v))
}

pub(super) fn xor(session: &Session, node: NodeId, cycle: Cycle) -> EvalResult {
    reduce(session, node, cycle, parity)
}

pub(super) fn xnor(session: &Session, node: NodeId, cycle: Cycle) -> EvalResult {
    reduce(session, node, cycle, |v| !parity(v))
}

pub(super) fn bitwise_not(session: &Session, node: NodeId, cycle: Cycle) -> EvalResult {
    reduce(session, node, cycle, |v| !first(v))
}

pub(super) fn buffer(session: &Session, node: NodeId, cycle: Cycle) -> EvalResult {
    reduce(session, node, cycle, first)
}

/// 1 for the pattern `010`.
pub(super) fn less_than(session: &Session, node: NodeId, cycle: Cycle) -> EvalResult {
    truth_table(session, node, cycle, |[a, b, c]| !a && b && !c)
}

/// 1 for the pattern `100`.
pub(super) fn greater_than(session: &Session, node: NodeId, cycle: Cycle) -> EvalResult {
    truth_table(session, node, cycle, |[a, b, c]| a && !b && !c)
}

/// Full-adder sum.
pub(super) fn adder_func(session: &Session, node: NodeId, cycle: Cycle) -> EvalResult {
    truth_table(session, node, cycle, |[a, b, c]| a ^ b ^ c)
}

/// Full-adder carry.
pub(super) fn carry_func(session: &Session, node: NodeId, cycle: Cycle) -> EvalResult {
    truth_table(session, node, cycle, |[a, b, c]| (a && b) || (a && c) || (b && c))
}
