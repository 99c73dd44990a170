//! Gate-level netlist graph for the gsim simulator.
//!
//! A [`Netlist`] owns three arenas: nodes, pins and nets. Every cross
//! reference (pin to node, net to driver, net to fanout) is an index into one
//! of those arenas, so traversal is O(1) and the graph can be serialized as-is.
//!
//! The simulator treats a netlist as immutable structural input. Netlists are
//! produced by an upstream synthesis step, loaded from their JSON form with
//! [`Netlist::from_json`], or assembled in code with [`NetlistBuilder`].

#![warn(missing_docs)]

pub mod arena;
pub mod builder;
pub mod error;
pub mod ids;
pub mod netlist;
pub mod node;

pub use arena::{Arena, ArenaId};
pub use builder::{NetlistBuilder, NodeBuilder, NodeHandle};
pub use error::NetlistError;
pub use ids::{NetId, NodeId, PinId};
pub use netlist::{Mismap, Net, Netlist, Pin, PinDirection};
pub use node::{EdgeSensitivity, MemoryPorts, Node, NodeKind};
