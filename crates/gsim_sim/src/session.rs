//! A simulation run over one netlist.
//!
//! [`Session`] owns everything a run needs: the netlist, the value store,
//! per-node runtime state, the evaluation schedule and the worker pool. It
//! is passed by shared reference to every node handler, so handlers can
//! run on any worker thread.

use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};

use gsim_common::{Logic, LogicVec};
use gsim_diagnostics::{Diagnostic, DiagnosticSink};
use gsim_netlist::{Netlist, NodeId, NodeKind, PinId};

use crate::activity::{self, PinActivity};
use crate::coverage::{CoverageGoal, CoverageReport};
use crate::error::SimError;
use crate::evaluator::{evaluate, handler_for, EvalFn};
use crate::executor::WorkerPool;
use crate::lines::{clock_ratios, LineSet};
use crate::memory::{MemoryArray, MemoryLayout};
use crate::mif::{load_mif, mif_path};
use crate::readiness::is_complete;
use crate::schedule::{self, Schedule};
use crate::store::{Cycle, ValueStore};
use crate::vectors::{TestVector, VectorSink, VectorSource};
use crate::warnings::{MIF_MISSING, UNDRIVEN_PIN, UNMAPPED_LINE};
use crate::SimConfig;

/// Storage and pin layout of a memory node.
#[derive(Clone, Debug)]
pub struct MemoryState {
    /// Which pins belong to which port.
    pub layout: MemoryLayout,
    /// The stored rows.
    pub array: MemoryArray,
}

/// Mutable runtime state of one node.
///
/// Only the node's own handler touches it during a cycle, so the lock
/// around it is never contended.
#[derive(Clone, Debug)]
pub struct NodeState {
    /// Switching activity, one entry per output pin of a tracked node.
    pub activity: Vec<PinActivity>,
    /// Toggle ratio of a clock node.
    pub clock_ratio: u64,
    /// Contents of a memory node.
    pub memory: Option<MemoryState>,
    /// Set once the node has emitted its one-time warning.
    pub warned: bool,
}

impl Default for NodeState {
    fn default() -> Self {
        Self {
            activity: Vec::new(),
            clock_ratio: 1,
            memory: None,
            warned: false,
        }
    }
}

/// Outcome of [`Session::run`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunSummary {
    /// Cycles simulated.
    pub cycles: Cycle,
    /// Cycles added beyond the planned count to chase coverage.
    pub extended: Cycle,
    /// Toggle coverage at the end of the run.
    pub coverage: CoverageReport,
}

/// A netlist being simulated.
pub struct Session {
    netlist: Netlist,
    config: SimConfig,
    store: ValueStore,
    states: Vec<Mutex<NodeState>>,
    handlers: Vec<EvalFn>,
    undriven: Vec<Vec<PinId>>,
    initial: Vec<Logic>,
    diagnostics: DiagnosticSink,
    pool: WorkerPool,
    schedule: Option<Schedule>,
    input_lines: LineSet,
    output_lines: LineSet,
    cycle: Cycle,
}

impl Session {
    /// Prepares `netlist` for simulation.
    ///
    /// Nothing is written to the value store until the first [`step`].
    /// Memory contents are loaded from `.mif` files here when
    /// `config.mif_dir` is set.
    ///
    /// [`step`]: Session::step
    pub fn new(netlist: Netlist, config: SimConfig) -> Result<Self, SimError> {
        netlist.validate()?;
        let diagnostics = DiagnosticSink::new();
        let initial: Vec<Logic> = netlist
            .nodes
            .iter()
            .map(|(_, node)| node.declared_initial_value().unwrap_or(config.initial_value))
            .collect();
        let store = ValueStore::new(&netlist, |node| initial[node.as_raw() as usize]);

        let mut states = Vec::with_capacity(netlist.nodes.len());
        let mut handlers = Vec::with_capacity(netlist.nodes.len());
        let mut undriven = Vec::with_capacity(netlist.nodes.len());
        for (id, node) in netlist.nodes.iter() {
            let mut state = NodeState::default();
            if node.kind.tracks_coverage() {
                state.activity = vec![PinActivity::default(); node.outputs.len()];
            }
            if let NodeKind::Memory { ports } = node.kind {
                let layout = MemoryLayout::from_node(&netlist, node, ports)?;
                let mut array = MemoryArray::new(
                    layout.data_width(),
                    layout.addr_width(),
                    initial[id.as_raw() as usize],
                );
                let path = config.mif_dir.as_deref().and_then(|dir| mif_path(dir, &node.name));
                if let Some(path) = path {
                    if !load_mif(&path, &mut array)? {
                        diagnostics.emit(
                            Diagnostic::warning(
                                MIF_MISSING,
                                format!("no memory contents for '{}'", node.name),
                            )
                            .at(path.display().to_string())
                            .with_note("rows start at the memory's initial value"),
                        );
                    }
                }
                state.memory = Some(MemoryState { layout, array });
            }
            states.push(state);
            handlers.push(handler_for(&node.kind));
            undriven.push(
                node.inputs
                    .iter()
                    .copied()
                    .filter(|&pin| store.is_undriven(pin))
                    .collect(),
            );
        }
        for (node, ratio) in clock_ratios(&netlist) {
            states[node.as_raw() as usize].clock_ratio = ratio;
        }

        let input_lines = LineSet::inputs(&netlist);
        let mut output_lines = LineSet::outputs(&netlist);
        if output_lines.add_matching(&netlist, &config.additional_pins) == 0
            && !config.additional_pins.is_empty()
        {
            diagnostics.emit(
                Diagnostic::warning(UNMAPPED_LINE, "no node matches the additional pins")
                    .with_note(format!("patterns: {}", config.additional_pins.join(", "))),
            );
        }

        let pool = WorkerPool::new(config.workers)?;
        tracing::debug!(
            nodes = netlist.nodes.len(),
            pins = netlist.pins.len(),
            nets = netlist.nets.len(),
            inputs = input_lines.len(),
            outputs = output_lines.len(),
            workers = pool.workers(),
            "session created"
        );

        Ok(Self {
            netlist,
            config,
            store,
            states: states.into_iter().map(Mutex::new).collect(),
            handlers,
            undriven,
            initial,
            diagnostics,
            pool,
            schedule: None,
            input_lines,
            output_lines,
            cycle: 0,
        })
    }

    /// The simulated netlist.
    pub fn netlist(&self) -> &Netlist {
        &self.netlist
    }

    /// The settings the session was created with.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Every pin's value history.
    pub fn store(&self) -> &ValueStore {
        &self.store
    }

    /// Warnings collected so far.
    pub fn diagnostics(&self) -> &DiagnosticSink {
        &self.diagnostics
    }

    /// The next cycle to simulate, which is also the number simulated so far.
    pub fn cycle(&self) -> Cycle {
        self.cycle
    }

    /// Lines driven by input vectors.
    pub fn input_lines(&self) -> &LineSet {
        &self.input_lines
    }

    /// Lines recorded in output vectors.
    pub fn output_lines(&self) -> &LineSet {
        &self.output_lines
    }

    /// The evaluation order, available after the first cycle.
    pub fn schedule(&self) -> Option<&Schedule> {
        self.schedule.as_ref()
    }

    /// Power-on value of `node`.
    pub fn initial_value(&self, node: NodeId) -> Logic {
        self.initial[node.as_raw() as usize]
    }

    pub(crate) fn state(&self, node: NodeId) -> MutexGuard<'_, NodeState> {
        self.states[node.as_raw() as usize]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn undriven_pins(&self, node: NodeId) -> &[PinId] {
        &self.undriven[node.as_raw() as usize]
    }

    pub(crate) fn handler(&self, node: NodeId) -> EvalFn {
        self.handlers[node.as_raw() as usize]
    }

    /// Applies one input vector, simulates one cycle and returns the output
    /// vector.
    ///
    /// The first call evaluates the netlist in readiness order and builds
    /// the schedule; later calls run the schedule stage by stage on the
    /// worker pool.
    pub fn step(&mut self, inputs: &TestVector) -> Result<TestVector, SimError> {
        let cycle = self.cycle;
        if inputs.len() != self.input_lines.len() {
            return Err(SimError::VectorLineCount {
                source_name: "applied vectors".to_string(),
                line: cycle as usize + 1,
                expected: self.input_lines.len(),
                found: inputs.len(),
            });
        }
        for (line, value) in self.input_lines.iter().zip(inputs) {
            for (bit, &pin) in line.pins.iter().enumerate() {
                let bit = bit as u32;
                let logic = if bit < value.width() {
                    value.get(bit)
                } else {
                    Logic::Zero
                };
                self.store.write(pin, logic, cycle)?;
            }
        }

        if let Some(schedule) = &self.schedule {
            for stage in schedule.stages() {
                self.pool.run_stage(stage, |node| {
                    if is_complete(self, node, cycle) {
                        Ok(())
                    } else {
                        evaluate(self, node, cycle)
                    }
                })?;
            }
        } else {
            self.warn_undriven();
            let schedule = schedule::build(self)?;
            let unscheduled = self.netlist.nodes.len() - schedule.len();
            if unscheduled > 0 {
                tracing::warn!(unscheduled, "nodes never became ready and will not be simulated");
            }
            tracing::debug!(
                nodes = schedule.len(),
                stages = schedule.stages().len(),
                "schedule built"
            );
            self.schedule = Some(schedule);
        }

        let outputs = self.capture(cycle);
        self.cycle += 1;
        Ok(outputs)
    }

    fn capture(&self, cycle: Cycle) -> TestVector {
        self.output_lines
            .iter()
            .map(|line| {
                let bits: Vec<Logic> = line.pins.iter().map(|&pin| self.store.read(pin, cycle)).collect();
                LogicVec::from_bits(&bits)
            })
            .collect()
    }

    /// One warning per undriven pin. Called once, when cycle 0 is scheduled.
    fn warn_undriven(&self) {
        for ((_, record), pins) in self.netlist.nodes.iter().zip(&self.undriven) {
            for &pin in pins {
                self.diagnostics.emit(
                    Diagnostic::warning(
                        UNDRIVEN_PIN,
                        format!("input pin '{}' has no driver", self.netlist.pin(pin).name),
                    )
                    .with_note(format!("node: {}", record.name))
                    .with_help("undriven pins hold their node's initial value every cycle"),
                );
            }
        }
    }

    /// Simulates every vector `source` provides and hands each cycle to `sinks`.
    ///
    /// Generated sources stop after `num_vectors` cycles unless a coverage
    /// goal extends the run; file sources run until they are exhausted.
    pub fn run(
        &mut self,
        source: &mut dyn VectorSource,
        sinks: &mut [&mut dyn VectorSink],
    ) -> Result<RunSummary, SimError> {
        for sink in sinks.iter_mut() {
            sink.begin(&self.input_lines, &self.output_lines)?;
        }

        let generated = source.is_generated();
        let mut planned = if generated {
            self.config.num_vectors
        } else {
            Cycle::MAX
        };
        let mut goal = generated
            .then(|| {
                CoverageGoal::new(
                    self.config.min_coverage,
                    self.config.achieve_best,
                    self.config.num_vectors.max(1),
                )
            })
            .flatten()
            .map(|goal| match self.config.max_vectors {
                Some(_) => goal.capped(),
                None => goal,
            });
        let mut extended = 0;
        tracing::info!(planned = ?generated.then_some(planned), "simulation started");

        while self.cycle < planned {
            let cycle = self.cycle;
            let Some(inputs) = source.next_vector(&self.input_lines, cycle)? else {
                break;
            };
            let outputs = self.step(&inputs)?;
            for sink in sinks.iter_mut() {
                sink.record(cycle, &inputs, &outputs)?;
            }

            if self.cycle == planned {
                if let Some(goal) = goal.as_mut() {
                    let coverage = self.coverage().fraction();
                    let mut added = goal.extend(coverage);
                    if let Some(max) = self.config.max_vectors {
                        added = added.min(max.saturating_sub(planned));
                    }
                    if added > 0 {
                        tracing::info!(coverage, added, "extending run to improve coverage");
                        planned += added;
                        extended += added;
                    }
                }
            }
        }

        for sink in sinks.iter_mut() {
            sink.finish(self.cycle)?;
        }
        let summary = RunSummary {
            cycles: self.cycle,
            extended,
            coverage: self.coverage(),
        };
        tracing::info!(cycles = summary.cycles, coverage = %summary.coverage, "simulation finished");
        Ok(summary)
    }

    /// Toggle coverage over the output pins of every tracked node.
    pub fn coverage(&self) -> CoverageReport {
        let mut report = CoverageReport::default();
        for state in &self.states {
            let state = state.lock().unwrap_or_else(PoisonError::into_inner);
            report.tracked += state.activity.len();
            report.covered += state.activity.iter().filter(|a| a.is_covered()).count();
        }
        report
    }

    /// Writes the activity file: one line per output pin of every tracked node.
    pub fn write_activity(&self, out: &mut impl Write) -> Result<(), SimError> {
        let mut pins = Vec::new();
        for (id, node) in self.netlist.nodes.iter() {
            let state = self.state(id);
            for (&pin, activity) in node.outputs.iter().zip(&state.activity) {
                pins.push((self.netlist.pin(pin).name.clone(), *activity));
            }
        }
        activity::write_activity(
            out,
            pins.iter().map(|(name, activity)| (name.as_str(), activity)),
            self.cycle,
        )
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("netlist", &self.netlist.name)
            .field("cycle", &self.cycle)
            .field("workers", &self.pool.workers())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectors::{VectorList, VectorRecorder};
    use gsim_common::Logic::{One as I, X, Zero as O};
    use gsim_netlist::{EdgeSensitivity, NetlistBuilder};

    fn v(bits: &str) -> LogicVec {
        LogicVec::from_binary_str(bits).unwrap()
    }

    /// `y = !(a & b)` plus a register sampling it.
    fn nand_register() -> Netlist {
        let mut b = NetlistBuilder::new("t");
        let clk = b.clock("top^clk");
        let a = b.input("top^a");
        let c = b.input("top^b");
        let n = b.gate(NodeKind::Nand, "top^n", &[a, c]);
        let q = b.flip_flop("top^q", EdgeSensitivity::Rising, n, clk);
        b.output("top^y", n);
        b.output("top^r", q);
        b.finish()
    }

    #[test]
    fn dangling_net_is_an_error_not_a_panic() {
        let mut netlist = nand_register();
        let n = netlist.find_node("top^n").unwrap();
        let pin = netlist.node(n).inputs[0];
        netlist.pins[pin].net = Some(gsim_netlist::NetId::from_raw(500));
        let err = Session::new(netlist, SimConfig::default()).err().unwrap();
        assert!(matches!(
            err,
            SimError::Netlist(gsim_netlist::NetlistError::DanglingId { .. })
        ));
    }

    #[test]
    fn new_does_not_touch_the_store() {
        let session = Session::new(nand_register(), SimConfig::default()).unwrap();
        let netlist = session.netlist();
        assert!(netlist.pins.ids().all(|pin| session.store().last_cycle(pin).is_none()));
        assert_eq!(session.cycle(), 0);
        assert!(session.schedule().is_none());
    }

    #[test]
    fn step_propagates_and_registers() {
        let mut session = Session::new(nand_register(), SimConfig::default()).unwrap();
        assert_eq!(session.input_lines().header(), "clk a b");
        assert_eq!(session.output_lines().header(), "y r");

        let out = session.step(&vec![v("1"), v("1"), v("1")]).unwrap();
        assert_eq!(out, vec![v("0"), LogicVec::from_bits(&[X])]);
        let out = session.step(&vec![v("0"), v("0"), v("1")]).unwrap();
        assert_eq!(out, vec![v("1"), LogicVec::from_bits(&[X])]);
        let out = session.step(&vec![v("1"), v("0"), v("1")]).unwrap();
        assert_eq!(out, vec![v("1"), v("1")]);
        assert_eq!(session.cycle(), 3);
        assert!(session.schedule().is_some());
    }

    #[test]
    fn wrong_vector_width_is_rejected() {
        let mut session = Session::new(nand_register(), SimConfig::default()).unwrap();
        let err = session.step(&vec![v("1")]).unwrap_err();
        assert!(matches!(
            err,
            SimError::VectorLineCount { line: 1, expected: 3, found: 1, .. }
        ));
    }

    #[test]
    fn run_feeds_sinks_until_source_ends() {
        let mut session = Session::new(nand_register(), SimConfig::default()).unwrap();
        let vectors: Vec<TestVector> = (0..4)
            .map(|c| vec![v(if c % 2 == 0 { "1" } else { "0" }), v("1"), v("0")])
            .collect();
        let mut source = VectorList::from(vectors);
        let mut recorder = VectorRecorder::default();
        let summary = session.run(&mut source, &mut [&mut recorder as &mut dyn VectorSink]).unwrap();
        assert_eq!(summary.cycles, 4);
        assert_eq!(summary.extended, 0);
        assert_eq!(recorder.outputs.len(), 4);
        assert!(recorder.outputs.iter().all(|out| out[0] == v("1")));
    }

    #[test]
    fn each_undriven_pin_warns_once() {
        let mut b = NetlistBuilder::new("t");
        let a = b.input("top^a");
        let g = b
            .node("top^g", NodeKind::And)
            .input_port("in", &[a])
            .open_input("in", 2)
            .output_port("out", 1)
            .initial_value(I)
            .finish();
        b.output("top^y", g.net());
        let mut session = Session::new(b.finish(), SimConfig::default()).unwrap();
        for _ in 0..3 {
            session.step(&vec![v("1")]).unwrap();
        }
        let diagnostics = session.diagnostics().diagnostics();
        let undriven: Vec<_> = diagnostics.iter().filter(|d| d.code == UNDRIVEN_PIN).collect();
        assert_eq!(undriven.len(), 2);
        assert_ne!(undriven[0].message, undriven[1].message);
        let y = session.netlist().find_node("top^y").unwrap();
        let y_out = session.netlist().node(y).outputs[0];
        assert_eq!(session.store().read(y_out, 2), I);
    }

    #[test]
    fn coverage_counts_pins_after_one_known_toggle() {
        let mut b = NetlistBuilder::new("t");
        let a = b.input("top^a");
        let n = b.gate(NodeKind::Not, "top^n", &[a]);
        b.output("top^y", n);
        let mut session = Session::new(b.finish(), SimConfig::default()).unwrap();
        session.step(&vec![v("0")]).unwrap();
        assert_eq!(session.coverage(), CoverageReport { covered: 0, tracked: 2 });
        session.step(&vec![v("1")]).unwrap();
        assert_eq!(session.coverage(), CoverageReport { covered: 2, tracked: 2 });
        session.step(&vec![v("0")]).unwrap();
        assert_eq!(session.coverage(), CoverageReport { covered: 2, tracked: 2 });

        let mut out = Vec::new();
        session.write_activity(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains(" 0.666667 0.666667"));
    }

    #[test]
    fn mif_missing_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let mut b = NetlistBuilder::new("t");
        let clk = b.clock("top^clk");
        let addr = b.input("top^addr");
        b.node("top^ram+table", NodeKind::Memory { ports: gsim_netlist::MemoryPorts::Single })
            .input_port("addr", &[addr])
            .open_input("data", 1)
            .open_input("we", 1)
            .input_port("clk", &[clk])
            .output_port("out", 1)
            .finish();
        let config = SimConfig {
            mif_dir: Some(dir.path().to_path_buf()),
            ..SimConfig::default()
        };
        let session = Session::new(b.finish(), config).unwrap();
        let diagnostics = session.diagnostics().diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, MIF_MISSING);
    }

    #[test]
    fn memory_without_plus_in_its_name_looks_for_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut b = NetlistBuilder::new("t");
        let clk = b.clock("top^clk");
        let addr = b.input("top^addr");
        b.node("top^ram", NodeKind::Memory { ports: gsim_netlist::MemoryPorts::Single })
            .input_port("addr", &[addr])
            .open_input("data", 1)
            .open_input("we", 1)
            .input_port("clk", &[clk])
            .output_port("out", 1)
            .finish();
        let config = SimConfig {
            mif_dir: Some(dir.path().to_path_buf()),
            ..SimConfig::default()
        };
        let session = Session::new(b.finish(), config).unwrap();
        assert!(session.diagnostics().diagnostics().is_empty());
    }

    #[test]
    fn generated_run_extends_for_coverage_up_to_cap() {
        let mut b = NetlistBuilder::new("t");
        let a = b.input("top^a");
        let n = b.gate(NodeKind::Not, "top^n", &[a]);
        b.output("top^y", n);
        let config = SimConfig {
            num_vectors: 4,
            min_coverage: Some(100.0),
            max_vectors: Some(6),
            ..SimConfig::default()
        };
        let mut session = Session::new(b.finish(), config).unwrap();
        // A constant input never toggles anything, so coverage stays at 0.
        struct Constant;
        impl VectorSource for Constant {
            fn next_vector(&mut self, _lines: &LineSet, _cycle: Cycle) -> Result<Option<TestVector>, SimError> {
                Ok(Some(vec![LogicVec::from_bits(&[O])]))
            }
            fn is_generated(&self) -> bool {
                true
            }
        }
        let summary = session.run(&mut Constant, &mut []).unwrap();
        // One extension of 4 is cut to 2 by the cap, which then leaves no
        // room for another even though the target is still unmet.
        assert_eq!(summary.cycles, 6);
        assert_eq!(summary.extended, 2);
        assert_eq!(summary.coverage.covered, 0);
    }

    #[test]
    fn capped_target_run_keeps_extending_without_improvement() {
        let mut b = NetlistBuilder::new("t");
        let a = b.input("top^a");
        let n = b.gate(NodeKind::Not, "top^n", &[a]);
        b.output("top^y", n);
        let config = SimConfig {
            num_vectors: 2,
            min_coverage: Some(100.0),
            max_vectors: Some(7),
            ..SimConfig::default()
        };
        let mut session = Session::new(b.finish(), config).unwrap();
        struct Constant;
        impl VectorSource for Constant {
            fn next_vector(&mut self, _lines: &LineSet, _cycle: Cycle) -> Result<Option<TestVector>, SimError> {
                Ok(Some(vec![LogicVec::from_bits(&[I])]))
            }
            fn is_generated(&self) -> bool {
                true
            }
        }
        let summary = session.run(&mut Constant, &mut []).unwrap();
        // 2 + 2 + 2 + 1: coverage never moves, only the cap ends the run.
        assert_eq!(summary.cycles, 7);
        assert_eq!(summary.extended, 5);
    }
}
