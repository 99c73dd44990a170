//! Conformance test helpers for the gsim simulator.
//!
//! Provides netlist fixtures for the circuits the integration tests exercise
//! and runners that push vectors through a [`Session`] and return the
//! produced output vectors as text, exactly as they would be written to an
//! output vector file.

#![warn(missing_docs)]

use std::io::Cursor;

use gsim_config::ProjectConfig;
use gsim_diagnostics::Diagnostic;
use gsim_netlist::{EdgeSensitivity, MemoryPorts, NetId, Netlist, NetlistBuilder, NodeKind};
use gsim_sim::{
    GeneratorConfig, RunSummary, Session, Side, SimConfig, SimError, VectorGenerator, VectorReader,
    VectorSink, VectorSource, VectorWriter,
};

/// Result of simulating a fixture.
pub struct RunOutput {
    /// Output vector file header.
    pub header: String,
    /// One output vector file row per cycle.
    pub rows: Vec<String>,
    /// Cycles and coverage.
    pub summary: RunSummary,
    /// Warnings raised during the run.
    pub diagnostics: Vec<Diagnostic>,
    /// The finished session, for inspecting the value store.
    pub session: Session,
}

impl RunOutput {
    /// The tokens of output line `name`, one per cycle.
    ///
    /// # Panics
    ///
    /// Panics if no output line is called `name`.
    pub fn column(&self, name: &str) -> Vec<String> {
        let index = self
            .header
            .split_whitespace()
            .position(|line| line == name)
            .unwrap_or_else(|| panic!("no output line '{name}' in '{}'", self.header));
        self.rows
            .iter()
            .map(|row| row.split_whitespace().nth(index).unwrap_or_default().to_string())
            .collect()
    }

    /// Number of diagnostics carrying `code`.
    pub fn warnings_with(&self, code: gsim_diagnostics::DiagnosticCode) -> usize {
        self.diagnostics.iter().filter(|d| d.code == code).count()
    }
}

fn run_source(
    netlist: Netlist,
    config: SimConfig,
    source: &mut dyn VectorSource,
) -> Result<RunOutput, SimError> {
    let mut session = Session::new(netlist, config)?;
    let mut writer = VectorWriter::new(Vec::new(), Side::Outputs);
    let summary = session.run(source, &mut [&mut writer as &mut dyn VectorSink])?;
    let text = String::from_utf8_lossy(&writer.into_inner()).into_owned();
    let mut lines = text.lines();
    let header = lines.next().unwrap_or_default().to_string();
    let rows = lines.map(str::to_string).collect();
    let diagnostics = session.diagnostics().take_all();
    Ok(RunOutput {
        header,
        rows,
        summary,
        diagnostics,
        session,
    })
}

/// Simulates `netlist` on vector file text (header line included).
pub fn run_vectors(netlist: Netlist, config: SimConfig, vectors: &str) -> Result<RunOutput, SimError> {
    let mut source = VectorReader::new(Cursor::new(vectors.as_bytes()), "vectors");
    run_source(netlist, config, &mut source)
}

/// Simulates `netlist` on seeded random vectors for `config.num_vectors` cycles.
pub fn run_generated(netlist: Netlist, config: SimConfig, seed: u64) -> Result<RunOutput, SimError> {
    let mut source = VectorGenerator::new(GeneratorConfig {
        seed: Some(seed),
        ..GeneratorConfig::default()
    });
    run_source(netlist, config, &mut source)
}

/// Parses `gsim.toml` text.
///
/// # Panics
///
/// Panics if the text is not a valid configuration.
pub fn make_config(text: &str) -> ProjectConfig {
    toml::from_str(text).unwrap_or_else(|e| panic!("invalid test configuration: {e}"))
}

/// Moves the driver of `from` onto `to`, which must be undriven. Used to
/// close feedback loops the builder cannot express directly.
pub fn feed(netlist: &mut Netlist, from: NetId, to: NetId) {
    let Some(pin) = netlist.nets[from].driver.take() else {
        panic!("net '{}' has no driver", netlist.nets[from].name);
    };
    netlist.pins[pin].net = Some(to);
    netlist.nets[to].driver = Some(pin);
}

fn bus(b: &mut NetlistBuilder, name: &str, width: u32) -> Vec<NetId> {
    (0..width).map(|i| b.input(&format!("top^{name}~{i}"))).collect()
}

/// A register `q` sampling input `d` on clock `clk`.
pub fn register(edge: EdgeSensitivity) -> Netlist {
    let mut b = NetlistBuilder::new("register");
    let clk = b.clock("top^clk");
    let d = b.input("top^d");
    let q = b.flip_flop("top^q_reg", edge, d, clk);
    b.output("top^q", q);
    b.finish()
}

/// A rising-edge register on line `d`, clocked through a clock buffer fed by
/// a free-running clock. Only `d` is read from the vector file.
pub fn internally_clocked_register() -> Netlist {
    let mut b = NetlistBuilder::new("internal_clock");
    let osc = b.free_running_clock("top^osc");
    let clk = b
        .node("top^clk_buf", NodeKind::Clock)
        .input_port("in", &[osc])
        .output_port("out", 1)
        .finish()
        .net();
    let d = b.input("top^d");
    let q = b.flip_flop("top^q_reg", EdgeSensitivity::Rising, d, clk);
    b.output("top^q", q);
    b.finish()
}

/// A single-port RAM with lines `clk addr data we` in and `out` out.
pub fn single_port_ram(addr_bits: u32, data_bits: u32) -> Netlist {
    let mut b = NetlistBuilder::new("ram");
    let clk = b.clock("top^clk");
    let addr = bus(&mut b, "addr", addr_bits);
    let data = bus(&mut b, "data", data_bits);
    let we = b.input("top^we");
    let ram = b
        .node("top^mem+table", NodeKind::Memory { ports: MemoryPorts::Single })
        .input_port("addr", &addr)
        .input_port("data", &data)
        .input_port("we", &[we])
        .input_port("clk", &[clk])
        .output_port("out", data_bits)
        .finish();
    for (i, &net) in ram.port(0).iter().enumerate() {
        b.output(&format!("top^out~{i}"), net);
    }
    b.finish()
}

/// A one-hot mux over `s` selecting from `d`, with `d[1]` as the default.
pub fn default_mux() -> Netlist {
    let mut b = NetlistBuilder::new("mux");
    let s = bus(&mut b, "s", 2);
    let d = bus(&mut b, "d", 2);
    let y = b
        .node("top^mux", NodeKind::Mux2)
        .input_port("sel", &s)
        .input_port("data", &d)
        .default_input(1, 1)
        .output_port("out", 1)
        .finish()
        .net();
    b.output("top^y", y);
    b.finish()
}

/// A `bits`-wide accumulator: `acc <= acc + x` on every rising clock edge.
///
/// Registers power up unknown unless the session's initial value says
/// otherwise.
pub fn accumulator(bits: u32) -> Netlist {
    let mut b = NetlistBuilder::new("accumulator");
    let clk = b.clock("top^clk");
    let x = bus(&mut b, "x", bits);
    let d: Vec<NetId> = (0..bits).map(|i| b.undriven_net(&format!("top^d~{i}"))).collect();
    let q: Vec<NetId> = d
        .iter()
        .enumerate()
        .map(|(i, &d)| b.flip_flop(&format!("top^acc_reg~{i}"), EdgeSensitivity::Rising, d, clk))
        .collect();
    let gnd = b.gnd();
    let sum = b
        .node("top^add", NodeKind::Add)
        .input_port("a", &q)
        .input_port("b", &x)
        .input_port("cin", &[gnd])
        .output_port("out", bits + 1)
        .finish();
    let parity = b.gate(NodeKind::Xor, "top^parity", &q);
    for (i, &net) in q.iter().enumerate() {
        b.output(&format!("top^acc~{i}"), net);
    }
    b.output("top^parity", parity);
    let mut netlist = b.finish();
    for (i, &target) in d.iter().enumerate() {
        // Output 0 is the carry out.
        feed(&mut netlist, sum.port(0)[i + 1], target);
    }
    netlist
}

/// An AND gate with one input line and two open inputs powered up at 1.
pub fn partly_undriven_and() -> Netlist {
    let mut b = NetlistBuilder::new("undriven");
    let a = b.input("top^a");
    let y = b
        .node("top^g", NodeKind::And)
        .input_port("in", &[a])
        .open_input("in", 2)
        .output_port("out", 1)
        .initial_value(gsim_common::Logic::One)
        .finish()
        .net();
    b.output("top^y", y);
    b.finish()
}

/// A register fed by a combinational loop that can never be evaluated.
pub fn register_behind_loop() -> Netlist {
    let mut b = NetlistBuilder::new("stall");
    let clk = b.clock("top^clk");
    let a = b.input("top^a");
    let loop_net = b.undriven_net("top^loop");
    let n1 = b.gate(NodeKind::And, "top^n1", &[a, loop_net]);
    let n2 = b.gate(NodeKind::Not, "top^n2", &[n1]);
    let q = b.flip_flop("top^q_reg", EdgeSensitivity::Rising, n1, clk);
    b.output("top^q", q);
    let mut netlist = b.finish();
    feed(&mut netlist, n2, loop_net);
    netlist
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_expose_expected_lines() {
        let session = Session::new(single_port_ram(2, 4), SimConfig::default()).unwrap();
        assert_eq!(session.input_lines().header(), "clk addr data we");
        assert_eq!(session.output_lines().header(), "out");

        let session = Session::new(accumulator(4), SimConfig::default()).unwrap();
        assert_eq!(session.input_lines().header(), "clk x");
        assert_eq!(session.output_lines().header(), "acc parity");
    }

    #[test]
    fn feed_moves_the_driver() {
        let netlist = register_behind_loop();
        let loop_net = netlist
            .nets
            .iter()
            .find(|(_, net)| net.name == "top^loop")
            .map(|(id, _)| id)
            .unwrap();
        let n2 = netlist.find_node("top^n2").unwrap();
        assert_eq!(netlist.driver_node(netlist.net(loop_net).fanout[0]), Some(n2));
    }

    #[test]
    fn make_config_reads_sections() {
        let config = make_config("[sim]\nnum_vectors = 8\nworkers = 3\n");
        assert_eq!(config.sim.num_vectors, 8);
        assert_eq!(config.sim.workers, 3);
        assert_eq!(config.output.vectors, "output_vectors");
    }
}
