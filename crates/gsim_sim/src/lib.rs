//! Cycle-based four-valued gate-level netlist simulator.
//!
//! This crate simulates a flattened netlist from `gsim_netlist` one clock
//! cycle at a time. Every pin holds a write-once history of 0/1/X/Z values,
//! input vectors come from a file or a random generator, and the values on
//! the output lines are recorded as output vectors.
//!
//! # Architecture
//!
//! Cycle 0 is evaluated breadth-first from the netlist's sources, visiting a
//! node once all of its inputs hold a value. The visiting order becomes the
//! [`Schedule`] for every later cycle, cut into stages whose nodes never feed
//! each other. Each stage is then split across a fixed rayon pool; a node only
//! ever writes its own output nets, so workers share the value store without
//! further coordination.
//!
//! # Usage
//!
//! ```ignore
//! use gsim_sim::{simulate, RunFiles, SimConfig, VectorInput};
//!
//! let config = SimConfig { num_vectors: 100, ..SimConfig::default() };
//! let files = RunFiles::new(VectorInput::Generated(Default::default()), "output_vectors");
//! let result = simulate(netlist, &config, &files)?;
//! println!("{} cycles, coverage {}", result.summary.cycles, result.summary.coverage);
//! ```
//!
//! # Modules
//!
//! - `store`: Write-once per-pin value histories
//! - `readiness`: When a node may be evaluated, stall detection
//! - `schedule`: Cycle-0 ordering and stage partitioning
//! - `evaluator`: Per-kind node semantics
//! - `executor`: Worker pool running schedule stages
//! - `session`: A run over one netlist
//! - `vectors`, `generator`, `lines`: Test vector files and generation
//! - `mif`, `script`, `activity`, `coverage`: Side files and coverage

#![warn(missing_docs)]

pub mod activity;
pub mod arith;
pub mod coverage;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod generator;
pub mod lines;
pub mod memory;
pub mod mif;
pub mod readiness;
pub mod schedule;
pub mod script;
pub mod session;
pub mod store;
pub mod trace;
pub mod vectors;
pub mod warnings;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use gsim_common::Logic;
use gsim_diagnostics::Diagnostic;
use gsim_netlist::Netlist;

pub use coverage::{CoverageGoal, CoverageReport};
pub use error::SimError;
pub use generator::{GeneratorConfig, VectorGenerator};
pub use lines::{Line, LineSet};
pub use schedule::Schedule;
pub use script::ModelSimScript;
pub use session::{RunSummary, Session};
pub use store::{Cycle, ValueStore};
pub use vectors::{
    verify_vectors, Side, TestVector, Verification, VectorList, VectorReader, VectorRecorder,
    VectorSink, VectorSource, VectorWriter,
};

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Cycles to simulate with generated vectors.
    pub num_vectors: Cycle,
    /// Keep generating vectors until this percentage of pins is covered.
    pub min_coverage: Option<f64>,
    /// Keep generating vectors while coverage still improves.
    pub achieve_best: bool,
    /// Upper bound on the total cycles of a coverage-extended run.
    pub max_vectors: Option<Cycle>,
    /// Concurrent evaluators, the calling thread included.
    pub workers: usize,
    /// Power-on value of nodes that declare none.
    pub initial_value: Logic,
    /// Directory holding memory `.mif` files; `None` leaves memories at
    /// their initial value.
    pub mif_dir: Option<PathBuf>,
    /// Substrings selecting extra nodes to record as output lines.
    pub additional_pins: Vec<String>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            num_vectors: 0,
            min_coverage: None,
            achieve_best: false,
            max_vectors: None,
            workers: 1,
            initial_value: Logic::X,
            mif_dir: None,
            additional_pins: Vec::new(),
        }
    }
}

/// Where input vectors come from.
#[derive(Debug, Clone)]
pub enum VectorInput {
    /// A vector file.
    File(PathBuf),
    /// Random vectors.
    Generated(GeneratorConfig),
}

/// Files read and written by [`simulate`].
#[derive(Debug, Clone)]
pub struct RunFiles {
    /// Source of input vectors.
    pub input: VectorInput,
    /// Output vectors, always written.
    pub output_vectors: PathBuf,
    /// Copy of the applied input vectors.
    pub input_vectors: Option<PathBuf>,
    /// Reference output vectors to verify against.
    pub expected: Option<PathBuf>,
    /// Per-pin activity file.
    pub activity: Option<PathBuf>,
    /// ModelSim script replaying the inputs.
    pub modelsim_script: Option<PathBuf>,
}

impl RunFiles {
    /// Reads from `input` and writes output vectors to `output_vectors`.
    pub fn new(input: VectorInput, output_vectors: impl Into<PathBuf>) -> Self {
        Self {
            input,
            output_vectors: output_vectors.into(),
            input_vectors: None,
            expected: None,
            activity: None,
            modelsim_script: None,
        }
    }
}

/// Outcome of [`simulate`].
#[derive(Debug)]
pub struct SimResult {
    /// Cycles and coverage.
    pub summary: RunSummary,
    /// Comparison against the expected vectors, when given.
    pub verification: Option<Verification>,
    /// Warnings raised during the run, verification findings included.
    pub diagnostics: Vec<Diagnostic>,
}

fn create(path: &Path) -> Result<BufWriter<File>, SimError> {
    Ok(BufWriter::new(File::create(path)?))
}

/// High-level entry point: simulates `netlist` and writes the run's files.
///
/// Output vectors are written as the run progresses; the activity file and
/// the verification against expected vectors follow once it completes.
pub fn simulate(netlist: Netlist, config: &SimConfig, files: &RunFiles) -> Result<SimResult, SimError> {
    let mut session = Session::new(netlist, config.clone())?;

    let mut source: Box<dyn VectorSource> = match &files.input {
        VectorInput::File(path) => Box::new(VectorReader::new(
            BufReader::new(File::open(path)?),
            path.display().to_string(),
        )),
        VectorInput::Generated(generator) => Box::new(VectorGenerator::new(generator.clone())),
    };

    let mut outputs = VectorWriter::new(create(&files.output_vectors)?, Side::Outputs);
    let mut echo = match &files.input_vectors {
        Some(path) => Some(VectorWriter::new(create(path)?, Side::Inputs)),
        None => None,
    };
    let mut script = match &files.modelsim_script {
        Some(path) => Some(ModelSimScript::new(create(path)?)),
        None => None,
    };
    let mut sinks: Vec<&mut dyn VectorSink> = vec![&mut outputs];
    if let Some(echo) = echo.as_mut() {
        sinks.push(echo);
    }
    if let Some(script) = script.as_mut() {
        sinks.push(script);
    }

    let summary = session.run(source.as_mut(), &mut sinks)?;
    drop(sinks);
    drop(outputs);

    if let Some(path) = &files.activity {
        session.write_activity(&mut create(path)?)?;
    }

    let verification = match &files.expected {
        Some(expected) => {
            let report = verify_vectors(
                BufReader::new(File::open(expected)?),
                BufReader::new(File::open(&files.output_vectors)?),
            )?;
            let reference = expected.display().to_string();
            let produced = files.output_vectors.display().to_string();
            for diagnostic in report.to_diagnostics(&reference, &produced) {
                session.diagnostics().emit(diagnostic);
            }
            tracing::info!(compared = report.compared, mismatches = report.mismatches(), "vectors verified");
            Some(report)
        }
        None => None,
    };

    Ok(SimResult {
        summary,
        verification,
        diagnostics: session.diagnostics().take_all(),
    })
}
