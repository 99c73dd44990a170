//! Configuration types deserialized from `gsim.toml`.

use gsim_common::Logic;
use serde::Deserialize;

/// The complete simulation configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Run length, coverage and engine settings.
    #[serde(default)]
    pub sim: SimSection,
    /// Input vector source and generation policy.
    #[serde(default)]
    pub vectors: VectorSection,
    /// Files written by the run.
    #[serde(default)]
    pub output: OutputSection,
}

/// Power-on value for nodes that declare none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum InitialValue {
    /// Unknown.
    #[default]
    #[serde(rename = "x", alias = "X")]
    Unknown,
    /// Logic zero.
    #[serde(rename = "0")]
    Zero,
    /// Logic one.
    #[serde(rename = "1")]
    One,
}

impl InitialValue {
    /// Converts to the simulator's logic value.
    pub fn to_logic(self) -> Logic {
        match self {
            InitialValue::Unknown => Logic::X,
            InitialValue::Zero => Logic::Zero,
            InitialValue::One => Logic::One,
        }
    }
}

/// `[sim]`: how long to run and how to execute.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimSection {
    /// Number of generated vectors (cycles). Ignored when an input vector file is given.
    pub num_vectors: u64,
    /// Coverage target in percent; extends generated runs until reached.
    pub min_coverage: Option<f64>,
    /// Keep extending generated runs while coverage keeps improving.
    pub achieve_best: bool,
    /// Upper bound on the total number of cycles when coverage extends the run.
    pub max_vectors: Option<u64>,
    /// Worker threads evaluating each stage.
    pub workers: usize,
    /// Power-on value for nodes that declare none.
    pub initial_value: InitialValue,
    /// Load memory contents from `.mif` files.
    pub read_mif: bool,
    /// Directory searched for `.mif` files.
    pub mif_dir: Option<String>,
}

impl Default for SimSection {
    fn default() -> Self {
        Self {
            num_vectors: 0,
            min_coverage: None,
            achieve_best: false,
            max_vectors: None,
            workers: 1,
            initial_value: InitialValue::Unknown,
            read_mif: false,
            mif_dir: None,
        }
    }
}

/// `[vectors]`: where inputs come from.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VectorSection {
    /// Input vector file; when absent, vectors are generated.
    pub input: Option<String>,
    /// Seed for generated vectors.
    pub seed: Option<u64>,
    /// Line-name substrings held low for the first cycles, then high.
    pub hold_high: Vec<String>,
    /// Line-name substrings held high for the first cycles, then low.
    pub hold_low: Vec<String>,
    /// Inject unknown values into generated vectors.
    pub three_valued: bool,
    /// Node-name substrings whose outputs are recorded as extra output lines.
    pub additional_pins: Vec<String>,
}

/// `[output]`: files produced by the run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    /// Directory the default file names are placed in.
    pub directory: String,
    /// Output vector file name.
    pub vectors: String,
    /// Applied input vectors, written back out.
    pub input_vectors: String,
    /// Reference file compared against the produced outputs.
    pub expected: Option<String>,
    /// Per-pin activity file.
    pub activity: Option<String>,
    /// ModelSim force script.
    pub modelsim_script: Option<String>,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
            vectors: "output_vectors".to_string(),
            input_vectors: "input_vectors".to_string(),
            expected: None,
            activity: None,
            modelsim_script: None,
        }
    }
}
