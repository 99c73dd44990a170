//! Flip-flops and clock nodes.

use gsim_common::Logic;
use gsim_diagnostics::Diagnostic;
use gsim_netlist::{EdgeSensitivity, NodeId, NodeKind, PinId};

use super::{malformed, EvalResult};
use crate::session::Session;
use crate::store::Cycle;
use crate::warnings::{CLOCK_LAG, INTERNAL_CLOCK};

/// What a clock signal did between two consecutive cycles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockEdge {
    /// Changed towards 1.
    Rising,
    /// Changed towards 0.
    Falling,
    /// Stayed at 1.
    High,
    /// Stayed at 0.
    Low,
    /// Stayed unknown.
    Unknown,
}

/// Classifies the transition from `prev` to `cur`. High impedance counts as
/// unknown, and a change involving an unknown value counts in the direction
/// of the known side.
pub fn clock_edge(prev: Logic, cur: Logic) -> ClockEdge {
    let normalize = |v: Logic| if v == Logic::Z { Logic::X } else { v };
    let (prev, cur) = (normalize(prev), normalize(cur));
    if prev != cur && (prev == Logic::Zero || cur == Logic::One) {
        ClockEdge::Rising
    } else if prev != cur && (prev == Logic::One || cur == Logic::Zero) {
        ClockEdge::Falling
    } else {
        match cur {
            Logic::One => ClockEdge::High,
            Logic::Zero => ClockEdge::Low,
            _ => ClockEdge::Unknown,
        }
    }
}

/// Returns `true` if a register with sensitivity `sensitivity` captures on `edge`.
pub fn triggers(sensitivity: EdgeSensitivity, edge: ClockEdge) -> bool {
    match sensitivity {
        EdgeSensitivity::Rising => edge == ClockEdge::Rising,
        EdgeSensitivity::Falling => edge == ClockEdge::Falling,
        EdgeSensitivity::ActiveHigh => edge == ClockEdge::High,
        EdgeSensitivity::ActiveLow => edge == ClockEdge::Low,
        EdgeSensitivity::Asynchronous => matches!(edge, ClockEdge::Rising | ClockEdge::Falling),
    }
}

/// The edge seen on `pin` at `cycle`. Cycle 0 always counts as rising.
pub(super) fn edge_at(session: &Session, pin: PinId, cycle: Cycle) -> ClockEdge {
    match cycle.checked_sub(1) {
        None => ClockEdge::Rising,
        Some(prev) => {
            let store = session.store();
            clock_edge(store.read(pin, prev), store.read(pin, cycle))
        }
    }
}

/// `Q(c) = D(c-1)` when the clock edge matches, otherwise `Q(c) = Q(c-1)`.
pub(super) fn flip_flop(session: &Session, node: NodeId, cycle: Cycle) -> EvalResult {
    let record = session.netlist().node(node);
    let NodeKind::FlipFlop { edge: sensitivity } = record.kind else {
        return Err(malformed(record, "not a flip-flop"));
    };
    let (&[d, clk], &[q]) = (&record.inputs[..], &record.outputs[..]) else {
        return Err(malformed(record, "flip-flop needs inputs D, clk and output Q"));
    };
    let store = session.store();
    let value = if triggers(sensitivity, edge_at(session, clk, cycle)) {
        store.read_before(d, cycle)
    } else {
        store.read_before(q, cycle)
    };
    Ok(Some(vec![value]))
}

/// Clock nodes not driven by a vector line.
///
/// A clock with no input toggles on every cycle that is a multiple of its
/// ratio, starting from 0. A clock fed by another signal follows it, one
/// cycle late if the source has not been written for this cycle yet.
pub(super) fn clock(session: &Session, node: NodeId, cycle: Cycle) -> EvalResult {
    let record = session.netlist().node(node);
    let store = session.store();
    let Some(&out) = record.outputs.first() else {
        return Err(malformed(record, "clock has no output"));
    };
    if store.has_value(out, cycle) {
        return Ok(None);
    }

    let value = match record.inputs.first() {
        None => {
            let ratio = {
                let mut state = session.state(node);
                if !std::mem::replace(&mut state.warned, true) {
                    session.diagnostics().emit(
                        Diagnostic::warning(
                            INTERNAL_CLOCK,
                            format!("clock '{}' is not driven by any input line", record.name),
                        )
                        .at(record.name.clone())
                        .with_note(format!("it toggles every {} cycles", state.clock_ratio)),
                    );
                }
                state.clock_ratio.max(1)
            };
            let prev = match cycle.checked_sub(1) {
                None => Logic::Zero,
                Some(prev) => match store.read(out, prev) {
                    Logic::One => Logic::One,
                    _ => Logic::Zero,
                },
            };
            if cycle % ratio == 0 {
                !prev
            } else {
                prev
            }
        }
        Some(&source) if store.has_value(source, cycle) => store.read(source, cycle),
        Some(&source) => {
            let mut state = session.state(node);
            if !std::mem::replace(&mut state.warned, true) {
                session.diagnostics().emit(
                    Diagnostic::warning(
                        CLOCK_LAG,
                        format!("clock '{}' follows its source one cycle late", record.name),
                    )
                    .at(record.name.clone()),
                );
            }
            store.read_before(source, cycle)
        }
    };
    Ok(Some(vec![value; record.outputs.len()]))
}
