//! Per-kind node evaluation.
//!
//! Every node gets an [`EvalFn`] from [`handler_for`] when the session is
//! created. A handler reads the node's inputs from the value store and
//! returns one value per output pin; [`evaluate`] then commits those values
//! and updates the pins' switching activity.
//!
//! Handlers never write to the store themselves, so a node only ever writes
//! its own output nets.

mod arithmetic;
mod logic;
mod memory;
mod mux;
mod sequential;

use gsim_common::Logic;
use gsim_netlist::{Node, NodeId, NodeKind};

use crate::arith::WideOp;
use crate::error::SimError;
use crate::readiness::{check_stall, STALL_CHECK_CYCLE};
use crate::session::Session;
use crate::store::Cycle;

pub use sequential::{clock_edge, triggers, ClockEdge};

/// Output values for one evaluation, or `None` if the outputs were already
/// written for this cycle.
pub type EvalResult = Result<Option<Vec<Logic>>, SimError>;

/// Evaluates one node for one cycle.
pub type EvalFn = fn(&Session, NodeId, Cycle) -> EvalResult;

/// Picks the evaluation function for a node kind.
pub fn handler_for(kind: &NodeKind) -> EvalFn {
    match kind {
        NodeKind::Input => input,
        NodeKind::Output => logic::buffer,
        NodeKind::Gnd | NodeKind::Pad => gnd,
        NodeKind::Vcc => vcc,
        NodeKind::Clock => sequential::clock,
        NodeKind::And => logic::and,
        NodeKind::Or => logic::or,
        NodeKind::Nand => logic::nand,
        NodeKind::Nor | NodeKind::Not => logic::nor,
        NodeKind::Xor | NodeKind::NotEqual => logic::xor,
        NodeKind::Xnor | NodeKind::Equal => logic::xnor,
        NodeKind::BitwiseNot => logic::bitwise_not,
        NodeKind::Buffer => logic::buffer,
        NodeKind::LessThan => logic::less_than,
        NodeKind::GreaterThan => logic::greater_than,
        NodeKind::AdderFunc => logic::adder_func,
        NodeKind::CarryFunc => logic::carry_func,
        NodeKind::Mux2 => mux::mux_2,
        NodeKind::MultiPortMux => mux::multi_port_mux,
        NodeKind::FlipFlop { .. } => sequential::flip_flop,
        NodeKind::Memory { .. } => memory::memory,
        NodeKind::Add => arithmetic::add,
        NodeKind::Subtract => arithmetic::subtract,
        NodeKind::Multiply => arithmetic::multiply,
        NodeKind::Divide => |s, n, c| arithmetic::wide(s, n, c, WideOp::Divide),
        NodeKind::Modulo => |s, n, c| arithmetic::wide(s, n, c, WideOp::Modulo),
        NodeKind::Power => |s, n, c| arithmetic::wide(s, n, c, WideOp::Power),
        NodeKind::ShiftLeft => |s, n, c| arithmetic::wide(s, n, c, WideOp::ShiftLeft),
        NodeKind::ShiftRight => |s, n, c| arithmetic::wide(s, n, c, WideOp::ShiftRight),
        NodeKind::ArithmeticShiftRight => |s, n, c| arithmetic::wide(s, n, c, WideOp::ArithmeticShiftRight),
        NodeKind::BlackBox { .. } => unsupported,
    }
}

/// Refreshes undriven inputs, checks for stalls, runs the node's handler
/// and commits its outputs.
pub fn evaluate(session: &Session, node: NodeId, cycle: Cycle) -> Result<(), SimError> {
    let store = session.store();
    for &pin in session.undriven_pins(node) {
        if !store.has_value(pin, cycle) {
            store.write(pin, store.buffer(pin).initial(), cycle)?;
        }
    }
    if cycle == STALL_CHECK_CYCLE {
        check_stall(session, node, cycle)?;
    }
    match session.handler(node)(session, node, cycle)? {
        Some(values) => commit(session, node, cycle, &values),
        None => Ok(()),
    }
}

fn commit(session: &Session, node: NodeId, cycle: Cycle, values: &[Logic]) -> Result<(), SimError> {
    let record = session.netlist().node(node);
    if values.len() != record.outputs.len() {
        return Err(malformed(
            record,
            format!("produced {} values for {} outputs", values.len(), record.outputs.len()),
        ));
    }
    for (&pin, &value) in record.outputs.iter().zip(values) {
        session.store().write(pin, value, cycle)?;
    }
    if record.kind.tracks_coverage() {
        let mut state = session.state(node);
        for (activity, &value) in state.activity.iter_mut().zip(values) {
            activity.observe(value);
        }
    }
    Ok(())
}

/// Values of input port `port` at `cycle`, least significant first.
fn port_values(session: &Session, record: &Node, port: usize, cycle: Cycle) -> Vec<Logic> {
    record
        .input_port(port)
        .iter()
        .map(|&pin| session.store().read(pin, cycle))
        .collect()
}

/// Values of every input at `cycle`, in pin order.
fn input_values(session: &Session, record: &Node, cycle: Cycle) -> Vec<Logic> {
    record
        .inputs
        .iter()
        .map(|&pin| session.store().read(pin, cycle))
        .collect()
}

fn malformed(record: &Node, reason: impl Into<String>) -> SimError {
    SimError::MalformedNode {
        node: record.name.clone(),
        reason: reason.into(),
    }
}

/// Inputs take their values from the applied vectors. An input no vector
/// drives holds its value.
fn input(session: &Session, node: NodeId, cycle: Cycle) -> EvalResult {
    let record = session.netlist().node(node);
    let store = session.store();
    if record.outputs.iter().all(|&pin| store.has_value(pin, cycle)) {
        return Ok(None);
    }
    Ok(Some(
        record.outputs.iter().map(|&pin| store.read(pin, cycle)).collect(),
    ))
}

fn constant(session: &Session, node: NodeId, value: Logic) -> EvalResult {
    Ok(Some(vec![value; session.netlist().node(node).outputs.len()]))
}

fn gnd(session: &Session, node: NodeId, _cycle: Cycle) -> EvalResult {
    constant(session, node, Logic::Zero)
}

fn vcc(session: &Session, node: NodeId, _cycle: Cycle) -> EvalResult {
    constant(session, node, Logic::One)
}

fn unsupported(session: &Session, node: NodeId, _cycle: Cycle) -> EvalResult {
    let record = session.netlist().node(node);
    Err(SimError::UnsupportedNode {
        node: record.name.clone(),
        kind: record.kind.to_string(),
    })
}
