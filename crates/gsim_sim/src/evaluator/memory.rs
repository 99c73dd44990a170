//! Synchronous RAM ports.

use gsim_common::Logic;
use gsim_netlist::NodeId;

use super::sequential::edge_at;
use super::{malformed, ClockEdge, EvalResult};
use crate::memory::address;
use crate::session::{MemoryState, Session};
use crate::store::Cycle;

/// Evaluates every port of a memory node.
///
/// Addresses are sampled at `cycle`; write enable and data are registered
/// and sampled at `cycle - 1`. A port writes on a rising clock edge and then
/// reads the addressed row.
pub(super) fn memory(session: &Session, node: NodeId, cycle: Cycle) -> EvalResult {
    let record = session.netlist().node(node);
    let store = session.store();
    let mut state = session.state(node);
    let Some(MemoryState { layout, array }) = state.memory.as_mut() else {
        return Err(malformed(record, "memory node has no storage"));
    };

    let rising = edge_at(session, layout.clk, cycle) == ClockEdge::Rising;
    let mut values = vec![Logic::X; record.outputs.len()];
    for port in &layout.ports {
        let bits: Vec<Logic> = port.addr.iter().map(|&pin| store.read(pin, cycle)).collect();
        let write = rising && port.we.is_some_and(|we| store.read_before(we, cycle) == Logic::One);
        let data: Vec<Logic> = port.data.iter().map(|&pin| store.read_before(pin, cycle)).collect();
        let row = array.access(address(&bits), write, &data, port.out.len());
        for (&index, value) in port.out.iter().zip(row) {
            values[index] = value;
        }
    }
    Ok(Some(values))
}
