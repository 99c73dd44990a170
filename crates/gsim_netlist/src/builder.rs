//! Programmatic netlist construction.
//!
//! The builder keeps driver and fanout bookkeeping consistent: every output
//! pin it creates drives a fresh net, and every input pin it attaches is
//! registered in that net's fanout list.

use gsim_common::Logic;

use crate::ids::{NetId, NodeId, PinId};
use crate::netlist::{Net, Netlist, Pin, PinDirection};
use crate::node::{EdgeSensitivity, Node, NodeKind};

/// Incrementally assembles a [`Netlist`].
pub struct NetlistBuilder {
    netlist: Netlist,
}

/// The result of adding a node: its ID and the nets driven by each output port.
#[derive(Clone, Debug)]
pub struct NodeHandle {
    /// The new node.
    pub id: NodeId,
    /// Nets driven by the node, grouped by output port.
    pub outputs: Vec<Vec<NetId>>,
}

impl NodeHandle {
    /// Nets of output port `port`.
    pub fn port(&self, port: usize) -> &[NetId] {
        &self.outputs[port]
    }

    /// The first output net.
    ///
    /// # Panics
    ///
    /// Panics if the node has no outputs.
    pub fn net(&self) -> NetId {
        self.outputs[0][0]
    }
}

struct PendingInput {
    mapping: String,
    net: Option<NetId>,
    is_default: bool,
}

/// Describes one node's ports before it is added; see [`NetlistBuilder::node`].
pub struct NodeBuilder<'b> {
    builder: &'b mut NetlistBuilder,
    name: String,
    kind: NodeKind,
    inputs: Vec<PendingInput>,
    input_port_sizes: Vec<u32>,
    outputs: Vec<(String, u32)>,
    initial_value: Option<Logic>,
}

impl NetlistBuilder {
    /// Starts an empty netlist with the given design name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            netlist: Netlist::new(name),
        }
    }

    fn new_net(&mut self, name: impl Into<String>) -> NetId {
        self.netlist.nets.alloc(Net {
            name: name.into(),
            driver: None,
            fanout: Vec::new(),
        })
    }

    fn alloc_node(&mut self, name: &str, kind: NodeKind) -> NodeId {
        self.netlist.nodes.alloc(Node {
            name: name.to_string(),
            kind,
            inputs: Vec::new(),
            outputs: Vec::new(),
            input_port_sizes: Vec::new(),
            output_port_sizes: Vec::new(),
            initial_value: None,
        })
    }

    fn attach_input(
        &mut self,
        node: NodeId,
        net: Option<NetId>,
        name: String,
        mapping: Option<String>,
        is_default: bool,
    ) -> PinId {
        let pin = self.netlist.pins.alloc(Pin {
            node,
            direction: PinDirection::Input,
            net,
            name,
            mapping,
            is_default,
        });
        if let Some(net) = net {
            self.netlist.nets[net].fanout.push(pin);
        }
        self.netlist.nodes[node].inputs.push(pin);
        pin
    }

    fn attach_output(&mut self, node: NodeId, net: Option<NetId>, name: String, mapping: Option<String>) -> PinId {
        let pin = self.netlist.pins.alloc(Pin {
            node,
            direction: PinDirection::Output,
            net,
            name,
            mapping,
            is_default: false,
        });
        if let Some(net) = net {
            self.netlist.nets[net].driver = Some(pin);
        }
        self.netlist.nodes[node].outputs.push(pin);
        pin
    }

    /// Adds a single-output source node whose net carries the node's name.
    fn source(&mut self, name: &str, kind: NodeKind) -> (NodeId, NetId) {
        let node = self.alloc_node(name, kind);
        let net = self.new_net(name);
        self.attach_output(node, Some(net), name.to_string(), None);
        self.netlist.nodes[node].output_port_sizes.push(1);
        (node, net)
    }

    /// Adds a top-level input bit and returns the net it drives.
    ///
    /// Multi-bit ports use `prefix^port~N` names, one node per bit.
    pub fn input(&mut self, name: &str) -> NetId {
        let (node, net) = self.source(name, NodeKind::Input);
        self.netlist.top_inputs.push(node);
        net
    }

    /// Adds a vector-driven top-level clock input and returns its net.
    pub fn clock(&mut self, name: &str) -> NetId {
        let (node, net) = self.source(name, NodeKind::Clock);
        self.netlist.top_inputs.push(node);
        net
    }

    /// Adds an internal free-running clock with no inputs.
    pub fn free_running_clock(&mut self, name: &str) -> NetId {
        self.source(name, NodeKind::Clock).1
    }

    /// Adds a top-level output bit reading `net`.
    pub fn output(&mut self, name: &str, net: NetId) -> NodeId {
        let node = self.alloc_node(name, NodeKind::Output);
        self.attach_input(node, Some(net), name.to_string(), None, false);
        self.attach_output(node, None, name.to_string(), None);
        let record = &mut self.netlist.nodes[node];
        record.input_port_sizes.push(1);
        record.output_port_sizes.push(1);
        self.netlist.top_outputs.push(node);
        node
    }

    /// Returns the constant-zero net, creating the ground node on first use.
    pub fn gnd(&mut self) -> NetId {
        self.constant(NodeKind::Gnd)
    }

    /// Returns the constant-one net, creating the power node on first use.
    pub fn vcc(&mut self) -> NetId {
        self.constant(NodeKind::Vcc)
    }

    /// Returns the unconnected-pad net, creating the pad node on first use.
    pub fn pad(&mut self) -> NetId {
        self.constant(NodeKind::Pad)
    }

    fn constant(&mut self, kind: NodeKind) -> NetId {
        let existing = match kind {
            NodeKind::Gnd => self.netlist.gnd,
            NodeKind::Vcc => self.netlist.vcc,
            _ => self.netlist.pad,
        };
        if let Some(node) = existing {
            let out = self.netlist.nodes[node].outputs[0];
            if let Some(net) = self.netlist.pins[out].net {
                return net;
            }
        }
        let name = match kind {
            NodeKind::Gnd => "gnd",
            NodeKind::Vcc => "vcc",
            _ => "unconn",
        };
        let (node, net) = self.source(name, kind.clone());
        match kind {
            NodeKind::Gnd => self.netlist.gnd = Some(node),
            NodeKind::Vcc => self.netlist.vcc = Some(node),
            _ => self.netlist.pad = Some(node),
        }
        net
    }

    /// Creates a net that no node drives.
    pub fn undriven_net(&mut self, name: &str) -> NetId {
        self.new_net(name)
    }

    /// Starts describing a node with explicit ports.
    pub fn node(&mut self, name: &str, kind: NodeKind) -> NodeBuilder<'_> {
        NodeBuilder {
            builder: self,
            name: name.to_string(),
            kind,
            inputs: Vec::new(),
            input_port_sizes: Vec::new(),
            outputs: Vec::new(),
            initial_value: None,
        }
    }

    /// Adds a single-output gate with all inputs in one port.
    pub fn gate(&mut self, kind: NodeKind, name: &str, inputs: &[NetId]) -> NetId {
        self.node(name, kind)
            .input_port("in", inputs)
            .output_port("out", 1)
            .finish()
            .net()
    }

    /// Adds a flip-flop and returns its `Q` net.
    pub fn flip_flop(&mut self, name: &str, edge: EdgeSensitivity, d: NetId, clk: NetId) -> NetId {
        self.node(name, NodeKind::FlipFlop { edge })
            .input_port("D", &[d])
            .input_port("clk", &[clk])
            .output_port("Q", 1)
            .finish()
            .net()
    }

    /// Returns the finished netlist.
    pub fn finish(self) -> Netlist {
        self.netlist
    }
}

impl NodeBuilder<'_> {
    /// Adds an input port connected to `nets`, least significant pin first.
    pub fn input_port(mut self, mapping: &str, nets: &[NetId]) -> Self {
        for &net in nets {
            self.inputs.push(PendingInput {
                mapping: mapping.to_string(),
                net: Some(net),
                is_default: false,
            });
        }
        self.input_port_sizes.push(nets.len() as u32);
        self
    }

    /// Adds an input port of `width` pins attached to no net.
    pub fn open_input(mut self, mapping: &str, width: u32) -> Self {
        for _ in 0..width {
            self.inputs.push(PendingInput {
                mapping: mapping.to_string(),
                net: None,
                is_default: false,
            });
        }
        self.input_port_sizes.push(width);
        self
    }

    /// Marks pin `index` of input port `port` as the default/else input.
    ///
    /// # Panics
    ///
    /// Panics if the port or pin does not exist yet.
    pub fn default_input(mut self, port: usize, index: usize) -> Self {
        let offset: usize = self.input_port_sizes[..port]
            .iter()
            .map(|&s| s as usize)
            .sum();
        assert!(index < self.input_port_sizes[port] as usize);
        self.inputs[offset + index].is_default = true;
        self
    }

    /// Adds an output port of `width` pins, each driving a new net.
    pub fn output_port(mut self, mapping: &str, width: u32) -> Self {
        self.outputs.push((mapping.to_string(), width));
        self
    }

    /// Declares the node's power-on value.
    pub fn initial_value(mut self, value: Logic) -> Self {
        self.initial_value = Some(value);
        self
    }

    /// Adds the node to the netlist.
    pub fn finish(self) -> NodeHandle {
        let NodeBuilder {
            builder,
            name,
            kind,
            inputs,
            input_port_sizes,
            outputs,
            initial_value,
        } = self;
        let node = builder.alloc_node(&name, kind);
        for (i, input) in inputs.into_iter().enumerate() {
            let pin_name = match input.net {
                Some(net) => builder.netlist.nets[net].name.clone(),
                None => format!("{name}.{}[{i}]", input.mapping),
            };
            builder.attach_input(node, input.net, pin_name, Some(input.mapping), input.is_default);
        }
        let mut output_nets = Vec::with_capacity(outputs.len());
        let mut output_port_sizes = Vec::with_capacity(outputs.len());
        for (mapping, width) in outputs {
            let mut nets = Vec::with_capacity(width as usize);
            for bit in 0..width {
                let net_name = if width == 1 {
                    format!("{name}.{mapping}")
                } else {
                    format!("{name}.{mapping}[{bit}]")
                };
                let net = builder.new_net(net_name.clone());
                builder.attach_output(node, Some(net), net_name, Some(mapping.clone()));
                nets.push(net);
            }
            output_port_sizes.push(width);
            output_nets.push(nets);
        }
        let record = &mut builder.netlist.nodes[node];
        record.input_port_sizes = input_port_sizes;
        record.output_port_sizes = output_port_sizes;
        record.initial_value = initial_value;
        NodeHandle {
            id: node,
            outputs: output_nets,
        }
    }
}
