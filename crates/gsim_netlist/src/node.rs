//! Node definitions: the typed units of computation in a netlist.
//!
//! A [`Node`] is a primitive after synthesis has lowered the design: a logic
//! gate, a register, a memory, a multiplexer, an arithmetic block, a
//! top-level port or a constant driver. The set of kinds is closed; anything
//! the simulator cannot evaluate arrives as [`NodeKind::BlackBox`].

use crate::ids::PinId;
use gsim_common::Logic;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which clock condition makes a flip-flop capture its data input.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum EdgeSensitivity {
    /// Capture on a 0 to 1 transition.
    Rising,
    /// Capture on a 1 to 0 transition.
    Falling,
    /// Capture every cycle the clock is 1.
    ActiveHigh,
    /// Capture every cycle the clock is 0.
    ActiveLow,
    /// Capture on either transition.
    Asynchronous,
}

/// Port arrangement of a memory node.
///
/// Single-port memories map their pins to `addr`, `data`, `we`, `clk`, `out`;
/// dual-port memories to `addr1`/`addr2`, `data1`/`data2`, `we1`/`we2`, `clk`,
/// `out1`/`out2`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum MemoryPorts {
    /// One read/write port.
    Single,
    /// Two independent read/write ports sharing one array and clock.
    Dual,
}

/// The kind of a node.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum NodeKind {
    // --- Ports and constants ---
    /// Top-level input bit; its value comes from the test vectors.
    Input,
    /// Top-level output bit; passes its single input through.
    Output,
    /// Constant-zero driver.
    Gnd,
    /// Constant-one driver.
    Vcc,
    /// Unconnected-pad driver; reads as zero.
    Pad,
    /// Clock source, either vector-driven, free-running, or chained from another clock.
    Clock,

    // --- Single-bit logic ---
    /// Logical AND of all inputs.
    And,
    /// Logical OR of all inputs.
    Or,
    /// Inverted AND.
    Nand,
    /// Inverted OR.
    Nor,
    /// Logical NOT; with several inputs it behaves as NOR.
    Not,
    /// Odd parity of all inputs.
    Xor,
    /// Even parity of all inputs.
    Xnor,
    /// Logical equality, evaluated as XNOR.
    Equal,
    /// Logical inequality, evaluated as XOR.
    NotEqual,
    /// Inverter on a single input.
    BitwiseNot,
    /// Non-inverting buffer on a single input.
    Buffer,
    /// Less-than cell over three input pins.
    LessThan,
    /// Greater-than cell over three input pins.
    GreaterThan,
    /// Full-adder sum bit.
    AdderFunc,
    /// Full-adder carry bit.
    CarryFunc,

    // --- Selection ---
    /// Priority mux: port 0 holds one selector per data pin in port 1.
    Mux2,
    /// Binary-select mux: port 0 is the select bus, ports 1.. are the choices.
    MultiPortMux,

    // --- Storage ---
    /// Edge- or level-sensitive D flip-flop (input 0 = D, input 1 = clock).
    FlipFlop {
        /// Capture condition.
        edge: EdgeSensitivity,
    },
    /// Synchronous RAM.
    Memory {
        /// Port arrangement.
        ports: MemoryPorts,
    },

    // --- Arithmetic over multi-bit ports ---
    /// Addition with carry-in (ports a, b, cin).
    Add,
    /// Subtraction with carry-in (ports a, b, cin), or negation with one port.
    Subtract,
    /// Multiplication of two ports.
    Multiply,
    /// Unsigned division of two ports.
    Divide,
    /// Unsigned remainder of two ports.
    Modulo,
    /// Unsigned exponentiation of two ports.
    Power,
    /// Logical left shift of port 0 by port 1.
    ShiftLeft,
    /// Logical right shift of port 0 by port 1.
    ShiftRight,
    /// Arithmetic right shift of port 0 by port 1.
    ArithmeticShiftRight,

    /// A primitive that was never lowered; evaluating it is an error.
    BlackBox {
        /// The original primitive name.
        type_name: String,
    },
}

impl NodeKind {
    /// Returns `true` for ground, power and pad drivers.
    pub fn is_constant(&self) -> bool {
        matches!(self, NodeKind::Gnd | NodeKind::Vcc | NodeKind::Pad)
    }

    /// Returns `true` if toggle coverage is recorded for this kind's outputs.
    pub fn tracks_coverage(&self) -> bool {
        !matches!(self, NodeKind::Input | NodeKind::Clock) && !self.is_constant()
    }

    /// Value a node of this kind holds before it is first evaluated, when the
    /// node declares none.
    pub fn default_initial_value(&self) -> Option<Logic> {
        match self {
            NodeKind::Gnd | NodeKind::Pad => Some(Logic::Zero),
            NodeKind::Vcc => Some(Logic::One),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Input => "INPUT",
            NodeKind::Output => "OUTPUT",
            NodeKind::Gnd => "GND",
            NodeKind::Vcc => "VCC",
            NodeKind::Pad => "PAD",
            NodeKind::Clock => "CLOCK",
            NodeKind::And => "AND",
            NodeKind::Or => "OR",
            NodeKind::Nand => "NAND",
            NodeKind::Nor => "NOR",
            NodeKind::Not => "NOT",
            NodeKind::Xor => "XOR",
            NodeKind::Xnor => "XNOR",
            NodeKind::Equal => "EQUAL",
            NodeKind::NotEqual => "NOT_EQUAL",
            NodeKind::BitwiseNot => "BITWISE_NOT",
            NodeKind::Buffer => "BUF",
            NodeKind::LessThan => "LT",
            NodeKind::GreaterThan => "GT",
            NodeKind::AdderFunc => "ADDER_FUNC",
            NodeKind::CarryFunc => "CARRY_FUNC",
            NodeKind::Mux2 => "MUX_2",
            NodeKind::MultiPortMux => "MULTI_PORT_MUX",
            NodeKind::FlipFlop { .. } => "FF",
            NodeKind::Memory { .. } => "MEMORY",
            NodeKind::Add => "ADD",
            NodeKind::Subtract => "MINUS",
            NodeKind::Multiply => "MULTIPLY",
            NodeKind::Divide => "DIVIDE",
            NodeKind::Modulo => "MODULO",
            NodeKind::Power => "POWER",
            NodeKind::ShiftLeft => "SL",
            NodeKind::ShiftRight => "SR",
            NodeKind::ArithmeticShiftRight => "ASR",
            NodeKind::BlackBox { type_name } => return write!(f, "BLACK_BOX({type_name})"),
        };
        f.write_str(name)
    }
}

/// A node of the netlist.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    /// Hierarchical name, e.g. `top^count~3`.
    pub name: String,
    /// What the node computes.
    pub kind: NodeKind,
    /// Input pins in port order.
    pub inputs: Vec<PinId>,
    /// Output pins in port order.
    pub outputs: Vec<PinId>,
    /// Number of pins in each input port; sums to `inputs.len()`.
    pub input_port_sizes: Vec<u32>,
    /// Number of pins in each output port; sums to `outputs.len()`.
    pub output_port_sizes: Vec<u32>,
    /// Declared power-on value, e.g. a register reset value.
    #[serde(default)]
    pub initial_value: Option<Logic>,
}

impl Node {
    /// Returns the input pins belonging to port `port`.
    pub fn input_port(&self, port: usize) -> &[PinId] {
        port_slice(&self.inputs, &self.input_port_sizes, port)
    }

    /// Returns the output pins belonging to port `port`.
    pub fn output_port(&self, port: usize) -> &[PinId] {
        port_slice(&self.outputs, &self.output_port_sizes, port)
    }

    /// Returns the declared initial value, falling back to the kind's default.
    pub fn declared_initial_value(&self) -> Option<Logic> {
        self.initial_value
            .or_else(|| self.kind.default_initial_value())
    }
}

fn port_slice<'a>(pins: &'a [PinId], sizes: &[u32], port: usize) -> &'a [PinId] {
    if port >= sizes.len() {
        return &[];
    }
    let start: usize = sizes[..port].iter().map(|&s| s as usize).sum();
    let end = (start + sizes[port] as usize).min(pins.len());
    &pins[start.min(end)..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pins(n: u32) -> Vec<PinId> {
        (0..n).map(PinId::from_raw).collect()
    }

    #[test]
    fn port_slices_follow_sizes() {
        let node = Node {
            name: "add".into(),
            kind: NodeKind::Add,
            inputs: pins(7),
            outputs: pins(4),
            input_port_sizes: vec![3, 3, 1],
            output_port_sizes: vec![1, 3],
            initial_value: None,
        };
        assert_eq!(node.input_port(1), &pins(7)[3..6]);
        assert_eq!(node.input_port(2).len(), 1);
        assert!(node.input_port(3).is_empty());
        assert_eq!(node.output_port(1).len(), 3);
    }

    #[test]
    fn constants_carry_default_values() {
        assert_eq!(NodeKind::Vcc.default_initial_value(), Some(Logic::One));
        assert_eq!(NodeKind::Pad.default_initial_value(), Some(Logic::Zero));
        assert_eq!(NodeKind::And.default_initial_value(), None);
    }

    #[test]
    fn coverage_skips_sources() {
        assert!(!NodeKind::Input.tracks_coverage());
        assert!(!NodeKind::Clock.tracks_coverage());
        assert!(!NodeKind::Gnd.tracks_coverage());
        assert!(NodeKind::Output.tracks_coverage());
        assert!(NodeKind::FlipFlop {
            edge: EdgeSensitivity::Rising
        }
        .tracks_coverage());
    }

    #[test]
    fn display_names() {
        assert_eq!(NodeKind::Mux2.to_string(), "MUX_2");
        assert_eq!(
            NodeKind::BlackBox {
                type_name: "dsp".into()
            }
            .to_string(),
            "BLACK_BOX(dsp)"
        );
    }
}
