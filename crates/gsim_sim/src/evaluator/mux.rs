//! Multiplexers.

use gsim_common::Logic;
use gsim_netlist::NodeId;

use super::{malformed, port_values, EvalResult};
use crate::memory::address;
use crate::session::Session;
use crate::store::Cycle;

/// One-hot two-port mux: port 0 holds the selectors, port 1 the data pins.
///
/// The first selector at 1 picks its data pin. An unknown selector ahead of
/// it falls back to the default-marked position, or X when there is none.
/// No selector at 1 gives X.
pub(super) fn mux_2(session: &Session, node: NodeId, cycle: Cycle) -> EvalResult {
    let netlist = session.netlist();
    let record = netlist.node(node);
    let selectors = record.input_port(0);
    let data = record.input_port(1);
    if selectors.len() != data.len() {
        return Err(malformed(
            record,
            format!("{} selectors for {} data inputs", selectors.len(), data.len()),
        ));
    }

    let default = selectors
        .iter()
        .zip(data)
        .position(|(&s, &d)| netlist.pin(s).is_default || netlist.pin(d).is_default);
    let mut unknown = false;
    let mut selected = None;
    for (index, value) in port_values(session, record, 0, cycle).into_iter().enumerate() {
        match value {
            Logic::One => {
                selected = Some(index);
                break;
            }
            Logic::Zero => {}
            _ => unknown = true,
        }
    }

    let pick = if unknown { default } else { selected };
    let value = pick.map_or(Logic::X, |index| session.store().read(data[index], cycle));
    Ok(Some(vec![value; record.outputs.len()]))
}

/// Bus mux: port 0 is a binary select bus, ports 1.. are the data words.
pub(super) fn multi_port_mux(session: &Session, node: NodeId, cycle: Cycle) -> EvalResult {
    let netlist = session.netlist();
    let record = netlist.node(node);
    let words = record.input_port_sizes.len().saturating_sub(1);
    let width = record.outputs.len();

    let select = address(&port_values(session, record, 0, cycle));
    let port = match select {
        Some(index) => usize::try_from(index).ok().filter(|&i| i < words),
        None => (0..words).find(|&i| {
            record
                .input_port(1 + i)
                .iter()
                .any(|&pin| netlist.pin(pin).is_default)
        }),
    };
    let Some(port) = port else {
        return Ok(Some(vec![Logic::X; width]));
    };
    let mut values = port_values(session, record, 1 + port, cycle);
    values.resize(width, Logic::X);
    Ok(Some(values))
}

#[cfg(test)]
mod tests {
    use crate::evaluator::evaluate;
    use crate::{Session, SimConfig};
    use gsim_common::Logic::{self, One as I, X, Zero as O};
    use gsim_netlist::{NetlistBuilder, NodeKind};

    /// Drives every top input in order with `values` at cycle 0.
    fn drive(session: &Session, values: &[Logic]) {
        let netlist = session.netlist();
        for (&node, &value) in netlist.top_inputs.iter().zip(values) {
            session.store().write(netlist.node(node).outputs[0], value, 0).unwrap();
        }
    }

    fn output(session: &Session, name: &str) -> Vec<Logic> {
        let netlist = session.netlist();
        let node = netlist.find_node(name).unwrap();
        evaluate(session, node, 0).unwrap();
        netlist
            .node(node)
            .outputs
            .iter()
            .map(|&pin| session.store().read(pin, 0))
            .collect()
    }

    fn mux_2(values: &[Logic], default: Option<usize>) -> Logic {
        let mut b = NetlistBuilder::new("t");
        let sel: Vec<_> = (0..2).map(|i| b.input(&format!("top^s{i}"))).collect();
        let data: Vec<_> = (0..2).map(|i| b.input(&format!("top^d{i}"))).collect();
        let mut mux = b
            .node("top^mux", NodeKind::Mux2)
            .input_port("sel", &sel)
            .input_port("in", &data)
            .output_port("out", 1);
        if let Some(index) = default {
            mux = mux.default_input(1, index);
        }
        mux.finish();
        let session = Session::new(b.finish(), SimConfig::default()).unwrap();
        drive(&session, values);
        output(&session, "top^mux")[0]
    }

    #[test]
    fn first_active_selector_wins() {
        assert_eq!(mux_2(&[O, I, O, I], None), I);
        assert_eq!(mux_2(&[I, I, O, I], None), O);
    }

    #[test]
    fn no_selection_is_unknown() {
        assert_eq!(mux_2(&[O, O, I, I], None), X);
        assert_eq!(mux_2(&[O, O, O, I], Some(1)), X);
    }

    #[test]
    fn unknown_selector_uses_default() {
        assert_eq!(mux_2(&[X, I, I, O], None), X);
        assert_eq!(mux_2(&[X, I, I, O], Some(0)), I);
    }

    fn bus_mux(select: &[Logic], default: Option<usize>) -> Vec<Logic> {
        let mut b = NetlistBuilder::new("t");
        let sel: Vec<_> = (0..select.len()).map(|i| b.input(&format!("top^s{i}"))).collect();
        let vcc = b.vcc();
        let gnd = b.gnd();
        let mut mux = b
            .node("top^mux", NodeKind::MultiPortMux)
            .input_port("sel", &sel)
            .input_port("in0", &[gnd, gnd])
            .input_port("in1", &[vcc, gnd])
            .input_port("in2", &[vcc, vcc])
            .output_port("out", 2);
        if let Some(port) = default {
            mux = mux.default_input(port, 0);
        }
        mux.finish();
        let session = Session::new(b.finish(), SimConfig::default()).unwrap();
        let netlist = session.netlist();
        for node in [netlist.gnd, netlist.vcc].into_iter().flatten() {
            evaluate(&session, node, 0).unwrap();
        }
        drive(&session, select);
        output(&session, "top^mux")
    }

    #[test]
    fn select_bus_picks_port() {
        assert_eq!(bus_mux(&[O, O], None), vec![O, O]);
        assert_eq!(bus_mux(&[I, O], None), vec![I, O]);
        assert_eq!(bus_mux(&[O, I], None), vec![I, I]);
    }

    #[test]
    fn out_of_range_select_is_unknown() {
        assert_eq!(bus_mux(&[I, I], Some(1)), vec![X, X]);
    }

    #[test]
    fn unknown_select_uses_default_port() {
        assert_eq!(bus_mux(&[X, O], None), vec![X, X]);
        assert_eq!(bus_mux(&[X, O], Some(2)), vec![I, I]);
    }
}
