//! The netlist container plus pin and net records.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::arena::{Arena, ArenaId};
use crate::error::NetlistError;
use crate::ids::{NetId, NodeId, PinId};
use crate::node::Node;

/// Direction of a pin relative to its node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum PinDirection {
    /// The node reads the pin.
    Input,
    /// The node drives the pin.
    Output,
}

/// A connection point on a node.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pin {
    /// The node this pin belongs to.
    pub node: NodeId,
    /// Whether the node reads or drives this pin.
    pub direction: PinDirection,
    /// The net the pin is attached to, if any.
    pub net: Option<NetId>,
    /// Pin name, usually the name of the net it was created for.
    pub name: String,
    /// Port mapping such as `addr`, `data`, `we`, `clk` or `out`.
    #[serde(default)]
    pub mapping: Option<String>,
    /// Marks the default/else data input of a multiplexer.
    #[serde(default)]
    pub is_default: bool,
}

/// A wire: one driver pin and any number of fanout pins.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Net {
    /// Net name.
    pub name: String,
    /// The output pin driving this net.
    pub driver: Option<PinId>,
    /// Input pins reading this net.
    pub fanout: Vec<PinId>,
}

/// A structural inconsistency between a node, its pins and their nets.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Mismap {
    /// A fanout pin listed by a net points at another net.
    #[error("fanout pin {pin} of net {net} is attached to {actual:?}")]
    FanoutNet {
        /// The net whose fanout list names the pin.
        net: NetId,
        /// The inconsistent fanout pin.
        pin: PinId,
        /// The net recorded on the pin.
        actual: Option<NetId>,
    },
    /// The driver recorded on a net belongs to another net or another node.
    #[error("net {net} records driver {driver} which is not driven by node {node}")]
    ForeignDriver {
        /// The net with the inconsistent driver record.
        net: NetId,
        /// The recorded driver pin.
        driver: PinId,
        /// The node whose output pin is attached to the net.
        node: NodeId,
    },
}

/// A flattened gate-level netlist.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Netlist {
    /// Design name.
    pub name: String,
    /// All nodes.
    pub nodes: Arena<NodeId, Node>,
    /// All pins.
    pub pins: Arena<PinId, Pin>,
    /// All nets.
    pub nets: Arena<NetId, Net>,
    /// Top-level input nodes (including vector-driven clocks), in declaration order.
    pub top_inputs: Vec<NodeId>,
    /// Top-level output nodes, in declaration order.
    pub top_outputs: Vec<NodeId>,
    /// The constant-zero driver.
    #[serde(default)]
    pub gnd: Option<NodeId>,
    /// The constant-one driver.
    #[serde(default)]
    pub vcc: Option<NodeId>,
    /// The unconnected-pad driver.
    #[serde(default)]
    pub pad: Option<NodeId>,
}

impl Netlist {
    /// Creates an empty netlist.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns the node with the given ID.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Returns the pin with the given ID.
    pub fn pin(&self, id: PinId) -> &Pin {
        &self.pins[id]
    }

    /// Returns the net with the given ID.
    pub fn net(&self, id: NetId) -> &Net {
        &self.nets[id]
    }

    /// Returns the pin driving the net `pin` is attached to.
    pub fn driver_pin(&self, pin: PinId) -> Option<PinId> {
        let net = self.pins.try_get(pin)?.net?;
        self.nets.try_get(net)?.driver
    }

    /// Returns the node driving the net `pin` is attached to.
    pub fn driver_node(&self, pin: PinId) -> Option<NodeId> {
        self.driver_pin(pin)
            .and_then(|driver| self.pins.try_get(driver))
            .map(|driver| driver.node)
            .filter(|node| self.nodes.try_get(*node).is_some())
    }

    /// Returns `true` if the pin has a net with a driver that belongs to a node.
    pub fn has_driver(&self, pin: PinId) -> bool {
        self.driver_node(pin).is_some()
    }

    /// The ground, power and pad nodes that exist in this netlist.
    pub fn constant_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        [self.gnd, self.vcc, self.pad].into_iter().flatten()
    }

    /// Finds a node by exact name.
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, node)| node.name == name)
            .map(|(id, _)| id)
    }

    /// Returns the nodes reading any output of `node`, without duplicates,
    /// in fanout order.
    ///
    /// Fails if a net's bookkeeping disagrees with the pins attached to it.
    pub fn children_of(&self, node: NodeId) -> Result<Vec<NodeId>, Mismap> {
        let mut children = Vec::new();
        let mut seen = HashSet::new();
        for &out in &self.nodes[node].outputs {
            let Some(net_id) = self.pins[out].net else {
                continue;
            };
            let net = &self.nets[net_id];
            if let Some(driver) = net.driver {
                let record = &self.pins[driver];
                if record.net != Some(net_id) || record.node != node {
                    return Err(Mismap::ForeignDriver {
                        net: net_id,
                        driver,
                        node,
                    });
                }
            }
            for &fanout in &net.fanout {
                let pin = &self.pins[fanout];
                if pin.net != Some(net_id) {
                    return Err(Mismap::FanoutNet {
                        net: net_id,
                        pin: fanout,
                        actual: pin.net,
                    });
                }
                if seen.insert(pin.node) {
                    children.push(pin.node);
                }
            }
        }
        Ok(children)
    }

    /// Parses a netlist from its JSON form and checks its cross references.
    pub fn from_json(text: &str) -> Result<Self, NetlistError> {
        let netlist: Self = serde_json::from_str(text)?;
        netlist.validate()?;
        Ok(netlist)
    }

    /// Checks that every node, pin and net id stored in the netlist names an
    /// entry of the matching arena.
    pub fn validate(&self) -> Result<(), NetlistError> {
        fn check<I: ArenaId + fmt::Display, T>(
            arena: &Arena<I, T>,
            id: I,
            owner: impl FnOnce() -> String,
        ) -> Result<(), NetlistError> {
            match arena.try_get(id) {
                Some(_) => Ok(()),
                None => Err(NetlistError::DanglingId {
                    owner: owner(),
                    target: id.to_string(),
                }),
            }
        }

        for (_, node) in self.nodes.iter() {
            for &pin in node.inputs.iter().chain(&node.outputs) {
                check(&self.pins, pin, || format!("node '{}'", node.name))?;
            }
        }
        for (id, pin) in self.pins.iter() {
            check(&self.nodes, pin.node, || format!("pin {id}"))?;
            if let Some(net) = pin.net {
                check(&self.nets, net, || format!("pin {id}"))?;
            }
        }
        for (id, net) in self.nets.iter() {
            for &pin in net.driver.iter().chain(&net.fanout) {
                check(&self.pins, pin, || format!("net {id}"))?;
            }
        }
        let top = self
            .top_inputs
            .iter()
            .chain(&self.top_outputs)
            .copied()
            .chain(self.constant_nodes());
        for node in top {
            check(&self.nodes, node, || format!("netlist '{}'", self.name))?;
        }
        Ok(())
    }

    /// Serializes the netlist to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, NetlistError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reads a JSON netlist from disk.
    pub fn load(path: &Path) -> Result<Self, NetlistError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::NetlistBuilder;
    use crate::node::NodeKind;

    #[test]
    fn children_follow_fanout() {
        let mut b = NetlistBuilder::new("t");
        let a = b.input("top^a");
        let c = b.input("top^c");
        let and = b.gate(NodeKind::And, "and", &[a, c]);
        let not = b.gate(NodeKind::Not, "not", &[a]);
        b.output("top^y", and);
        let netlist = b.finish();

        let a_node = netlist.find_node("top^a").unwrap();
        let children = netlist.children_of(a_node).unwrap();
        assert_eq!(children.len(), 2);
        let names: Vec<_> = children.iter().map(|&n| netlist.node(n).name.as_str()).collect();
        assert_eq!(names, vec!["and", "not"]);
        let _ = not;
    }

    #[test]
    fn fanout_pin_on_other_net_is_mismap() {
        let mut b = NetlistBuilder::new("t");
        let a = b.input("top^a");
        let c = b.input("top^c");
        b.gate(NodeKind::Buffer, "buf", &[a]);
        let mut netlist = b.finish();

        let buf = netlist.find_node("buf").unwrap();
        let buf_in = netlist.node(buf).inputs[0];
        netlist.pins[buf_in].net = Some(c);

        let a_node = netlist.find_node("top^a").unwrap();
        let err = netlist.children_of(a_node).unwrap_err();
        assert!(matches!(err, Mismap::FanoutNet { .. }));
    }

    #[test]
    fn foreign_driver_is_mismap() {
        let mut b = NetlistBuilder::new("t");
        let a = b.input("top^a");
        let c = b.input("top^c");
        let mut netlist = b.finish();
        let c_driver = netlist.net(c).driver.unwrap();
        netlist.nets[a].driver = Some(c_driver);

        let a_node = netlist.find_node("top^a").unwrap();
        assert!(matches!(
            netlist.children_of(a_node),
            Err(Mismap::ForeignDriver { .. })
        ));
    }

    #[test]
    fn children_are_listed_once() {
        let mut b = NetlistBuilder::new("t");
        let a = b.input("top^a");
        b.gate(NodeKind::And, "and", &[a, a, a]);
        b.gate(NodeKind::Not, "not", &[a]);
        let netlist = b.finish();
        let a_node = netlist.find_node("top^a").unwrap();
        let names: Vec<_> = netlist
            .children_of(a_node)
            .unwrap()
            .iter()
            .map(|&n| netlist.node(n).name.clone())
            .collect();
        assert_eq!(names, vec!["and", "not"]);
    }

    #[test]
    fn dangling_net_id_fails_to_load() {
        let mut b = NetlistBuilder::new("t");
        let a = b.input("top^a");
        b.gate(NodeKind::Not, "inv", &[a]);
        let mut netlist = b.finish();
        let inv = netlist.find_node("inv").unwrap();
        let pin = netlist.node(inv).inputs[0];
        netlist.pins[pin].net = Some(NetId::from_raw(99));

        let err = Netlist::from_json(&netlist.to_json().unwrap()).unwrap_err();
        match err {
            NetlistError::DanglingId { owner, target } => {
                assert_eq!(owner, format!("pin {pin}"));
                assert_eq!(target, NetId::from_raw(99).to_string());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn dangling_top_input_fails_validation() {
        let mut netlist = NetlistBuilder::new("t").finish();
        netlist.top_inputs.push(NodeId::from_raw(5));
        assert!(matches!(
            netlist.validate(),
            Err(NetlistError::DanglingId { .. })
        ));
    }

    #[test]
    fn undriven_pin_has_no_driver() {
        let mut b = NetlistBuilder::new("t");
        let floating = b.undriven_net("floating");
        b.gate(NodeKind::Not, "inv", &[floating]);
        let netlist = b.finish();
        let inv = netlist.find_node("inv").unwrap();
        assert!(!netlist.has_driver(netlist.node(inv).inputs[0]));
    }

    #[test]
    fn json_roundtrip_keeps_structure() {
        let mut b = NetlistBuilder::new("t");
        let a = b.input("top^a");
        let y = b.gate(NodeKind::Not, "inv", &[a]);
        b.output("top^y", y);
        let netlist = b.finish();

        let json = netlist.to_json().unwrap();
        let back = Netlist::from_json(&json).unwrap();
        assert_eq!(back.nodes.len(), netlist.nodes.len());
        assert_eq!(back.top_outputs, netlist.top_outputs);
        assert_eq!(back.node(back.find_node("inv").unwrap()).kind, NodeKind::Not);
    }

    #[test]
    fn load_from_disk() {
        let mut b = NetlistBuilder::new("disk");
        b.input("top^a");
        let netlist = b.finish();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("design.json");
        std::fs::write(&path, netlist.to_json().unwrap()).unwrap();
        let loaded = Netlist::load(&path).unwrap();
        assert_eq!(loaded.name, "disk");
        assert!(matches!(
            Netlist::load(&dir.path().join("missing.json")),
            Err(NetlistError::Io(_))
        ));
    }
}
