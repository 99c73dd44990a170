//! Synchronous RAM storage and port layout.

use std::collections::BTreeMap;

use gsim_common::Logic;
use gsim_netlist::{MemoryPorts, Netlist, Node, PinId};

use crate::error::SimError;

/// The contents of one memory node.
///
/// Rows are materialized on first write; unwritten rows read as the
/// memory's initial value.
#[derive(Clone, Debug)]
pub struct MemoryArray {
    width: usize,
    addr_width: u32,
    initial: Logic,
    rows: BTreeMap<u64, Vec<Logic>>,
}

impl MemoryArray {
    /// Creates a `2^addr_width` by `width` array filled with `initial`.
    pub fn new(width: usize, addr_width: u32, initial: Logic) -> Self {
        Self {
            width,
            addr_width,
            initial,
            rows: BTreeMap::new(),
        }
    }

    /// Bits per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of address bits.
    pub fn addr_width(&self) -> u32 {
        self.addr_width
    }

    /// Number of rows.
    pub fn depth(&self) -> u64 {
        1u64.checked_shl(self.addr_width).unwrap_or(u64::MAX)
    }

    /// Returns `true` if `address` names a row.
    pub fn contains(&self, address: u64) -> bool {
        address < self.depth()
    }

    /// The row at `address`.
    pub fn row(&self, address: u64) -> Vec<Logic> {
        self.rows
            .get(&address)
            .cloned()
            .unwrap_or_else(|| vec![self.initial; self.width])
    }

    /// Overwrites the row at `address`; short data is padded with zeros.
    pub fn store(&mut self, address: u64, data: &[Logic]) {
        let mut row = data.to_vec();
        row.resize(self.width, Logic::Zero);
        self.rows.insert(address, row);
    }

    /// Performs one port access and returns the port's output bits.
    ///
    /// An unknown or out-of-range address reads as all unknown and never
    /// writes. Otherwise `data` is stored first when `write` is set and the
    /// (possibly new) row is returned.
    pub fn access(&mut self, address: Option<u64>, write: bool, data: &[Logic], out_width: usize) -> Vec<Logic> {
        let Some(address) = address.filter(|&a| self.contains(a)) else {
            return vec![Logic::X; out_width];
        };
        if write {
            self.store(address, data);
        }
        let mut row = self.row(address);
        row.resize(out_width, Logic::X);
        row
    }
}

/// Binary value of an address bus listed LSB first; `None` if any bit is unknown.
pub fn address(bits: &[Logic]) -> Option<u64> {
    let mut value = 0u64;
    for (i, bit) in bits.iter().enumerate() {
        if bit.to_bool()? {
            value |= 1u64.checked_shl(i as u32).unwrap_or(u64::MAX);
        }
    }
    Some(value)
}

/// The pins of one read/write port.
#[derive(Clone, Debug, Default)]
pub struct PortPins {
    /// Address bus, LSB first.
    pub addr: Vec<PinId>,
    /// Write data, LSB first.
    pub data: Vec<PinId>,
    /// Write enable.
    pub we: Option<PinId>,
    /// Positions in the node's output list, LSB first.
    pub out: Vec<usize>,
}

/// Pin assignment of a memory node, derived from its port mappings.
#[derive(Clone, Debug)]
pub struct MemoryLayout {
    /// One entry for single-port memories, two for dual-port.
    pub ports: Vec<PortPins>,
    /// Shared clock.
    pub clk: PinId,
}

impl MemoryLayout {
    /// Groups the node's pins by their port mapping names.
    pub fn from_node(netlist: &Netlist, node: &Node, shape: MemoryPorts) -> Result<Self, SimError> {
        let suffixes: &[&str] = match shape {
            MemoryPorts::Single => &[""],
            MemoryPorts::Dual => &["1", "2"],
        };
        let mut ports = vec![PortPins::default(); suffixes.len()];
        let mut clk = None;

        for &pin in &node.inputs {
            let mapping = netlist.pin(pin).mapping.as_deref().unwrap_or("");
            if mapping == "clk" {
                clk = Some(pin);
                continue;
            }
            for (port, suffix) in ports.iter_mut().zip(suffixes) {
                match mapping.strip_suffix(suffix) {
                    Some("addr") => port.addr.push(pin),
                    Some("data") => port.data.push(pin),
                    Some("we") => port.we = Some(pin),
                    _ => {}
                }
            }
        }
        for (index, &pin) in node.outputs.iter().enumerate() {
            let mapping = netlist.pin(pin).mapping.as_deref().unwrap_or("");
            for (port, suffix) in ports.iter_mut().zip(suffixes) {
                if mapping.strip_suffix(suffix) == Some("out") {
                    port.out.push(index);
                }
            }
        }

        let clk = clk.ok_or_else(|| SimError::MalformedNode {
            node: node.name.clone(),
            reason: "memory has no pin mapped to 'clk'".to_string(),
        })?;
        if ports.iter().any(|p| p.addr.is_empty() || p.out.is_empty()) {
            return Err(SimError::MalformedNode {
                node: node.name.clone(),
                reason: "memory port is missing its address or output pins".to_string(),
            });
        }
        Ok(Self { ports, clk })
    }

    /// Row width: the widest data or output port.
    pub fn data_width(&self) -> usize {
        self.ports
            .iter()
            .map(|p| p.data.len().max(p.out.len()))
            .max()
            .unwrap_or(0)
    }

    /// Address width: the widest address bus.
    pub fn addr_width(&self) -> u32 {
        self.ports.iter().map(|p| p.addr.len()).max().unwrap_or(0) as u32
    }
}

/// Returns `true` if `mapping` names a port read one cycle late.
pub fn is_registered_input(mapping: &str) -> bool {
    matches!(mapping, "data" | "data1" | "data2" | "we" | "we1" | "we2")
}
