//! `gsim sim`: simulate one netlist.
//!
//! Loads `gsim.toml` (if any), applies the command-line overrides, validates
//! the result and runs the simulator. Relative paths in the configuration
//! file are resolved against the directory holding it; paths given on the
//! command line are resolved against the working directory.

use std::error::Error;
use std::path::{Path, PathBuf};

use gsim_config::{load_config, load_config_file, validate_config, InitialValue, ProjectConfig};
use gsim_netlist::Netlist;
use gsim_sim::{GeneratorConfig, RunFiles, SimConfig, VectorInput};

use crate::report::{render_diagnostics, summary_json};
use crate::{GlobalArgs, InitialValueArg, SimArgs};

/// Runs the `gsim sim` command.
///
/// Returns exit code 0 when the run completes and any expected vectors
/// matched, 1 otherwise.
pub fn run(args: &SimArgs, global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let project_dir = resolve_project_dir(global)?;
    let mut config = match global.config.as_deref().map(Path::new) {
        Some(path) if path.is_file() => load_config_file(path)?,
        _ => load_config(&project_dir)?,
    };
    apply_overrides(&mut config, args, &std::env::current_dir()?);
    validate_config(&config)?;

    let netlist = Netlist::load(&args.netlist)?;
    if !global.quiet {
        eprintln!(
            "   Simulating {} ({} nodes, {} nets)",
            netlist.name,
            netlist.nodes.len(),
            netlist.nets.len()
        );
    }

    let sim_config = sim_config(&config, &project_dir);
    let files = run_files(&config, &project_dir)?;
    tracing::debug!(?sim_config, ?files, "resolved run settings");
    let result = gsim_sim::simulate(netlist, &sim_config, &files)?;

    render_diagnostics(&result.diagnostics, global.color);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary_json(&result))?);
    }

    let summary = &result.summary;
    if !global.quiet {
        eprintln!(
            "   Simulated {} cycles ({} added for coverage), coverage {}",
            summary.cycles, summary.extended, summary.coverage
        );
        eprintln!("   Output vectors: {}", files.output_vectors.display());
    }

    match &result.verification {
        Some(report) if !report.passed() => {
            if !global.quiet {
                eprintln!(
                    "   FAILED: {} of {} vectors differ from the expected output",
                    report.mismatches(),
                    report.compared
                );
            }
            Ok(1)
        }
        Some(report) => {
            if !global.quiet {
                eprintln!("   Verified {} vectors", report.compared);
            }
            Ok(0)
        }
        None => Ok(0),
    }
}

/// The directory `gsim.toml` is read from and relative paths resolve against.
fn resolve_project_dir(global: &GlobalArgs) -> Result<PathBuf, Box<dyn Error>> {
    match &global.config {
        Some(config_path) => {
            let path = PathBuf::from(config_path);
            if path.is_file() {
                Ok(path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from(".")))
            } else {
                Ok(path)
            }
        }
        None => Ok(std::env::current_dir()?),
    }
}

fn absolute(cwd: &Path, path: &Path) -> String {
    cwd.join(path).to_string_lossy().into_owned()
}

/// Writes every flag given on the command line over the configuration.
fn apply_overrides(config: &mut ProjectConfig, args: &SimArgs, cwd: &Path) {
    let sim = &mut config.sim;
    if let Some(n) = args.num_vectors {
        sim.num_vectors = n;
    }
    if let Some(coverage) = args.coverage {
        sim.min_coverage = Some(coverage);
    }
    sim.achieve_best |= args.best_coverage;
    if let Some(max) = args.max_vectors {
        sim.max_vectors = Some(max);
    }
    if let Some(workers) = args.workers {
        sim.workers = workers;
    }
    if let Some(value) = args.initial_value {
        sim.initial_value = match value {
            InitialValueArg::X => InitialValue::Unknown,
            InitialValueArg::Zero => InitialValue::Zero,
            InitialValueArg::One => InitialValue::One,
        };
    }
    if let Some(dir) = &args.mif_dir {
        sim.read_mif = true;
        sim.mif_dir = Some(absolute(cwd, dir));
    }

    let vectors = &mut config.vectors;
    if let Some(path) = &args.vectors {
        vectors.input = Some(absolute(cwd, path));
    }
    if args.seed.is_some() {
        vectors.seed = args.seed;
    }
    vectors.three_valued |= args.three_valued;
    vectors.hold_high.extend(args.hold_high.iter().cloned());
    vectors.hold_low.extend(args.hold_low.iter().cloned());
    vectors.additional_pins.extend(args.pins.iter().cloned());

    let output = &mut config.output;
    if let Some(dir) = &args.output_dir {
        output.directory = absolute(cwd, dir);
    }
    if let Some(path) = &args.expected {
        output.expected = Some(absolute(cwd, path));
    }
    if let Some(path) = &args.activity {
        output.activity = Some(absolute(cwd, path));
    }
    if let Some(path) = &args.modelsim {
        output.modelsim_script = Some(absolute(cwd, path));
    }
}

fn sim_config(config: &ProjectConfig, project_dir: &Path) -> SimConfig {
    let sim = &config.sim;
    SimConfig {
        num_vectors: sim.num_vectors,
        min_coverage: sim.min_coverage,
        achieve_best: sim.achieve_best,
        max_vectors: sim.max_vectors,
        workers: sim.workers,
        initial_value: sim.initial_value.to_logic(),
        mif_dir: sim
            .read_mif
            .then(|| project_dir.join(sim.mif_dir.as_deref().unwrap_or("."))),
        additional_pins: config.vectors.additional_pins.clone(),
    }
}

/// Resolves every file of the run and creates the output directory.
fn run_files(config: &ProjectConfig, project_dir: &Path) -> Result<RunFiles, Box<dyn Error>> {
    let vectors = &config.vectors;
    let output = &config.output;
    let out_dir = project_dir.join(&output.directory);
    std::fs::create_dir_all(&out_dir)?;

    let input = match &vectors.input {
        Some(path) => VectorInput::File(project_dir.join(path)),
        None => VectorInput::Generated(GeneratorConfig {
            seed: vectors.seed,
            hold_high: vectors.hold_high.clone(),
            hold_low: vectors.hold_low.clone(),
            three_valued: vectors.three_valued,
        }),
    };
    let mut files = RunFiles::new(input, out_dir.join(&output.vectors));
    files.input_vectors = Some(out_dir.join(&output.input_vectors));
    files.expected = output.expected.as_ref().map(|p| project_dir.join(p));
    files.activity = output.activity.as_ref().map(|p| out_dir.join(p));
    files.modelsim_script = output.modelsim_script.as_ref().map(|p| out_dir.join(p));
    Ok(files)
}
