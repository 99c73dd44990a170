//! Per-pin value histories.
//!
//! Every pin resolves to a [`ValueBuffer`]: the history of the net it is
//! attached to, shared by the net's driver and all of its readers, or a
//! private buffer for pins with no driving net. A buffer is written at most
//! once per cycle, always by the same node, and read by any number of
//! workers.

use std::sync::{Arc, PoisonError, RwLock};

use gsim_common::{Logic, LogicVec};
use gsim_netlist::{Netlist, PinDirection, PinId};

use crate::error::SimError;

/// Index of a simulated clock cycle, starting at 0.
pub type Cycle = u64;

/// The value history of one net.
#[derive(Debug)]
pub struct ValueBuffer {
    initial: Logic,
    history: RwLock<LogicVec>,
}

impl ValueBuffer {
    /// Creates an empty history that reads as `initial` until written.
    pub fn new(initial: Logic) -> Self {
        Self {
            initial,
            history: RwLock::new(LogicVec::new(0)),
        }
    }

    /// The power-on value.
    pub fn initial(&self) -> Logic {
        self.initial
    }

    /// The last cycle written, or `None` if the buffer is untouched.
    pub fn last_cycle(&self) -> Option<Cycle> {
        let history = self.history.read().unwrap_or_else(PoisonError::into_inner);
        Cycle::from(history.width()).checked_sub(1)
    }

    /// Returns the value at `cycle`.
    ///
    /// Cycles past the last write hold the last written value; an unwritten
    /// buffer reads as its initial value.
    pub fn read(&self, cycle: Cycle) -> Logic {
        let history = self.history.read().unwrap_or_else(PoisonError::into_inner);
        match history.width() {
            0 => self.initial,
            width if cycle < Cycle::from(width) => history.get(cycle as u32),
            _ => history.last().unwrap_or(self.initial),
        }
    }

    /// Returns the value one cycle before `cycle`, or the initial value at cycle 0.
    pub fn read_before(&self, cycle: Cycle) -> Logic {
        match cycle.checked_sub(1) {
            Some(prev) => self.read(prev),
            None => self.initial,
        }
    }

    /// Records `value` for `cycle`.
    ///
    /// Skipped cycles are filled with the value held before the gap. Fails
    /// with the last written cycle if `cycle` already has a value.
    pub fn write(&self, value: Logic, cycle: Cycle) -> Result<(), Cycle> {
        let mut history = self.history.write().unwrap_or_else(PoisonError::into_inner);
        let width = Cycle::from(history.width());
        if cycle < width {
            return Err(width - 1);
        }
        let held = history.last().unwrap_or(self.initial);
        while Cycle::from(history.width()) < cycle {
            history.push(held);
        }
        history.push(value);
        Ok(())
    }

    /// A copy of the recorded history, oldest cycle first.
    pub fn history(&self) -> LogicVec {
        self.history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Maps every pin of a netlist to its value buffer.
#[derive(Debug)]
pub struct ValueStore {
    pins: Vec<Arc<ValueBuffer>>,
    private: Vec<bool>,
    names: Vec<String>,
}

impl ValueStore {
    /// Builds buffers for `netlist`.
    ///
    /// `initial_of` gives the power-on value of a node. A net's buffer starts
    /// at its driver's value; a pin without a driving net gets a private
    /// buffer starting at its own node's value.
    pub fn new(netlist: &Netlist, initial_of: impl Fn(gsim_netlist::NodeId) -> Logic) -> Self {
        let mut net_buffers: Vec<Option<Arc<ValueBuffer>>> = vec![None; netlist.nets.len()];
        let mut pins = Vec::with_capacity(netlist.pins.len());
        let mut private = Vec::with_capacity(netlist.pins.len());
        let mut names = Vec::with_capacity(netlist.pins.len());

        for (id, pin) in netlist.pins.iter() {
            let shared = match (pin.net, netlist.driver_node(id)) {
                (Some(net), Some(driver)) => net_buffers.get_mut(net.as_raw() as usize).map(|slot| {
                    slot.get_or_insert_with(|| Arc::new(ValueBuffer::new(initial_of(driver))))
                        .clone()
                }),
                _ => None,
            };
            private.push(shared.is_none() && pin.direction == PinDirection::Input);
            pins.push(shared.unwrap_or_else(|| Arc::new(ValueBuffer::new(initial_of(pin.node)))));
            names.push(pin.name.clone());
        }

        Self {
            pins,
            private,
            names,
        }
    }

    /// The buffer behind `pin`.
    pub fn buffer(&self, pin: PinId) -> &Arc<ValueBuffer> {
        &self.pins[pin.as_raw() as usize]
    }

    /// Returns `true` if `pin` is an input with no driving net.
    pub fn is_undriven(&self, pin: PinId) -> bool {
        self.private[pin.as_raw() as usize]
    }

    /// Value of `pin` at `cycle`.
    pub fn read(&self, pin: PinId, cycle: Cycle) -> Logic {
        self.buffer(pin).read(cycle)
    }

    /// Value of `pin` at `cycle - 1`.
    pub fn read_before(&self, pin: PinId, cycle: Cycle) -> Logic {
        self.buffer(pin).read_before(cycle)
    }

    /// Last cycle written on `pin`.
    pub fn last_cycle(&self, pin: PinId) -> Option<Cycle> {
        self.buffer(pin).last_cycle()
    }

    /// Returns `true` if `pin` has a value for `cycle`.
    pub fn has_value(&self, pin: PinId, cycle: Cycle) -> bool {
        self.last_cycle(pin).is_some_and(|last| last >= cycle)
    }

    /// Writes `value` on `pin` for `cycle`.
    pub fn write(&self, pin: PinId, value: Logic, cycle: Cycle) -> Result<(), SimError> {
        self.buffer(pin)
            .write(value, cycle)
            .map_err(|_| SimError::WriteOnceViolation {
                pin: self.names[pin.as_raw() as usize].clone(),
                cycle,
            })
    }
}
