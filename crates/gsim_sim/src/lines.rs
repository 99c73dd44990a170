//! Grouping of top-level port bits into named multi-bit lines.
//!
//! Synthesis splits every port into one node per bit, named
//! `prefix^port~N`. Lines regroup those bits so that vector files carry one
//! token per port. Names without a `~N` suffix form single-pin lines.

use gsim_netlist::{Netlist, NodeId, NodeKind, PinId};

/// The part of a node name after the first `^`.
pub fn pin_name(node_name: &str) -> &str {
    node_name.split_once('^').map_or(node_name, |(_, rest)| rest)
}

/// The part of a node name after the first `^` and before the first `~`.
pub fn port_name(node_name: &str) -> &str {
    let pin = pin_name(node_name);
    pin.split_once('~').map_or(pin, |(port, _)| port)
}

/// The bit index after the `~`, if the name has one.
pub fn bit_number(node_name: &str) -> Option<u32> {
    let (_, bit) = pin_name(node_name).split_once('~')?;
    let digits: String = bit.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// One named group of pins, least significant first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    /// Port name.
    pub name: String,
    /// Pins carrying the line's bits, index 0 least significant.
    pub pins: Vec<PinId>,
    bits: Vec<u32>,
    /// Toggle ratio if this line is a vector-driven clock.
    pub clock_ratio: Option<u64>,
}

impl Line {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            pins: Vec::new(),
            bits: Vec::new(),
            clock_ratio: None,
        }
    }

    /// Number of pins.
    pub fn width(&self) -> u32 {
        self.pins.len() as u32
    }

    fn insert(&mut self, pin: PinId, bit: u32) {
        let at = self.bits.iter().position(|&b| b > bit).unwrap_or(self.bits.len());
        self.bits.insert(at, bit);
        self.pins.insert(at, pin);
    }
}

/// An ordered set of lines.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LineSet {
    lines: Vec<Line>,
}

impl LineSet {
    /// Lines for the netlist's top-level inputs.
    ///
    /// Clock lines carry their ratio; see [`clock_ratios`].
    pub fn inputs(netlist: &Netlist) -> Self {
        let mut set = Self::from_nodes(netlist, &netlist.top_inputs);
        for (node, ratio) in clock_ratios(netlist) {
            if let Some(line) = set.find(port_name(&netlist.node(node).name)) {
                set.lines[line].clock_ratio.get_or_insert(ratio);
            }
        }
        set
    }

    /// Lines for the netlist's top-level outputs.
    pub fn outputs(netlist: &Netlist) -> Self {
        Self::from_nodes(netlist, &netlist.top_outputs)
    }

    fn from_nodes(netlist: &Netlist, nodes: &[NodeId]) -> Self {
        let mut set = Self::default();
        for &node in nodes {
            set.assign(netlist, node, false);
        }
        set
    }

    /// Adds the output of every node matching one of `patterns` (by node
    /// name or output net name) as an extra line. Top-level ports are skipped.
    ///
    /// Returns the number of nodes added.
    pub fn add_matching(&mut self, netlist: &Netlist, patterns: &[String]) -> usize {
        if patterns.is_empty() {
            return 0;
        }
        let mut added = 0;
        for (id, node) in netlist.nodes.iter() {
            if matches!(node.kind, NodeKind::Input | NodeKind::Clock)
                || netlist.top_outputs.contains(&id)
                || node.outputs.is_empty()
            {
                continue;
            }
            let net_names = node
                .outputs
                .iter()
                .filter_map(|&pin| netlist.pin(pin).net)
                .map(|net| netlist.net(net).name.as_str());
            let Some(pattern) = patterns.iter().find(|p| {
                node.name.contains(p.as_str()) || net_names.clone().any(|name| name.contains(p.as_str()))
            }) else {
                continue;
            };
            self.assign(netlist, id, pattern.contains('~'));
            added += 1;
        }
        added
    }

    /// Maps `node` onto its line, creating the line if needed.
    fn assign(&mut self, netlist: &Netlist, node: NodeId, single_pin: bool) {
        let record = netlist.node(node);
        let Some(&pin) = record.outputs.first().or(record.inputs.first()) else {
            tracing::warn!(node = %record.name, "node has no pins to record");
            return;
        };
        match bit_number(&record.name).filter(|_| !single_pin) {
            Some(bit) => {
                let index = self.find_or_create(port_name(&record.name));
                self.lines[index].insert(pin, bit);
            }
            None => {
                let index = self.find_or_create(pin_name(&record.name));
                let line = &mut self.lines[index];
                if line.pins.is_empty() {
                    line.insert(pin, 0);
                }
            }
        }
    }

    fn find_or_create(&mut self, name: &str) -> usize {
        self.find(name).unwrap_or_else(|| {
            self.lines.push(Line::new(name));
            self.lines.len() - 1
        })
    }

    /// Index of the line called `name`.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.lines.iter().position(|line| line.name == name)
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` if there are no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Iterates lines in order.
    pub fn iter(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter()
    }

    /// The line at `index`.
    pub fn get(&self, index: usize) -> Option<&Line> {
        self.lines.get(index)
    }

    /// Number of clock lines.
    pub fn clock_count(&self) -> usize {
        self.lines.iter().filter(|l| l.clock_ratio.is_some()).count()
    }

    /// Line names joined by single spaces, as written in vector file headers.
    pub fn header(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.name.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Toggle ratios of the top-level clock inputs: 1, 2, 3, ... in declaration order.
pub fn clock_ratios(netlist: &Netlist) -> Vec<(NodeId, u64)> {
    netlist
        .top_inputs
        .iter()
        .filter(|&&node| netlist.node(node).kind == NodeKind::Clock)
        .zip(1..)
        .map(|(&node, ratio)| (node, ratio))
        .collect()
}
