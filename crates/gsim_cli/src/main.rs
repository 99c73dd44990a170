//! gsim CLI: the command-line front end of the gate-level simulator.
//!
//! Provides `gsim sim` for simulating a JSON netlist against file or random
//! input vectors, and `gsim compare` for checking an output vector file
//! against a reference.

#![warn(missing_docs)]

mod compare;
mod report;
mod sim;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// gsim: cycle-based four-valued gate-level simulation.
#[derive(Parser, Debug)]
#[command(name = "gsim", version, about = "Gate-level netlist simulator")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a `gsim.toml` file, or the directory holding one.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Simulate a netlist.
    Sim(SimArgs),
    /// Compare an output vector file against a reference.
    Compare(CompareArgs),
}

/// Arguments for the `gsim sim` subcommand. Every flag overrides the
/// matching `gsim.toml` setting.
#[derive(Parser, Debug, Default)]
pub struct SimArgs {
    /// JSON netlist to simulate.
    pub netlist: PathBuf,

    /// Input vector file; random vectors are generated when omitted.
    #[arg(short = 't', long)]
    pub vectors: Option<PathBuf>,

    /// Number of random vectors to generate.
    #[arg(short = 'g', long)]
    pub num_vectors: Option<u64>,

    /// Seed for random vectors.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Include unknowns in random vectors.
    #[arg(long)]
    pub three_valued: bool,

    /// Line names held high after the first few cycles.
    #[arg(long, num_args = 1..)]
    pub hold_high: Vec<String>,

    /// Line names held low after the first few cycles.
    #[arg(long, num_args = 1..)]
    pub hold_low: Vec<String>,

    /// Extend random runs until this percentage of pins has toggled.
    #[arg(long)]
    pub coverage: Option<f64>,

    /// Extend random runs while coverage keeps improving.
    #[arg(long)]
    pub best_coverage: bool,

    /// Cap on the total cycles of an extended run.
    #[arg(long)]
    pub max_vectors: Option<u64>,

    /// Concurrent evaluators.
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Power-on value of nodes that declare none.
    #[arg(long, value_enum)]
    pub initial_value: Option<InitialValueArg>,

    /// Load memory contents from `.mif` files in this directory.
    #[arg(long)]
    pub mif_dir: Option<PathBuf>,

    /// Record the outputs of nodes matching these names as extra lines.
    #[arg(short = 'p', long, num_args = 1..)]
    pub pins: Vec<String>,

    /// Directory output files are written to.
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Reference output vectors to verify against.
    #[arg(short = 'T', long)]
    pub expected: Option<PathBuf>,

    /// Write per-pin activity to this file.
    #[arg(long)]
    pub activity: Option<PathBuf>,

    /// Write a ModelSim script replaying the inputs to this file.
    #[arg(long)]
    pub modelsim: Option<PathBuf>,

    /// Print a JSON summary on stdout.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `gsim compare` subcommand.
#[derive(Parser, Debug)]
pub struct CompareArgs {
    /// Reference vector file.
    pub expected: PathBuf,
    /// Produced vector file.
    pub produced: PathBuf,
}

/// Power-on value selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum InitialValueArg {
    /// Unknown.
    X,
    /// Logic zero.
    #[value(name = "0")]
    Zero,
    /// Logic one.
    #[value(name = "1")]
    One,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

/// Installs the log subscriber. `RUST_LOG` wins over the flag-derived level.
fn init_logging(global: &GlobalArgs) {
    use tracing_subscriber::EnvFilter;

    let level = if global.quiet {
        "error"
    } else if global.verbose {
        "debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(global.verbose)
        .with_ansi(global.color)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => std::io::stderr().is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };
    init_logging(&global);

    let result = match cli.command {
        Command::Sim(ref args) => sim::run(args, &global),
        Command::Compare(ref args) => compare::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_sim_defaults() {
        let cli = Cli::parse_from(["gsim", "sim", "design.json"]);
        match cli.command {
            Command::Sim(ref args) => {
                assert_eq!(args.netlist, PathBuf::from("design.json"));
                assert!(args.vectors.is_none());
                assert!(args.num_vectors.is_none());
                assert!(args.pins.is_empty());
                assert!(!args.json);
            }
            _ => panic!("expected Sim command"),
        }
        assert_eq!(cli.color, ColorChoice::Auto);
    }

    #[test]
    fn parse_sim_with_args() {
        let cli = Cli::parse_from([
            "gsim",
            "--quiet",
            "sim",
            "design.json",
            "-g",
            "200",
            "-j",
            "4",
            "--coverage",
            "90",
            "--initial-value",
            "0",
            "-p",
            "count",
            "state",
        ]);
        assert!(cli.quiet);
        match cli.command {
            Command::Sim(ref args) => {
                assert_eq!(args.num_vectors, Some(200));
                assert_eq!(args.workers, Some(4));
                assert_eq!(args.coverage, Some(90.0));
                assert_eq!(args.initial_value, Some(InitialValueArg::Zero));
                assert_eq!(args.pins, vec!["count", "state"]);
            }
            _ => panic!("expected Sim command"),
        }
    }

    #[test]
    fn parse_compare() {
        let cli = Cli::parse_from(["gsim", "compare", "golden.vec", "out.vec", "--color", "never"]);
        assert_eq!(cli.color, ColorChoice::Never);
        match cli.command {
            Command::Compare(ref args) => {
                assert_eq!(args.expected, PathBuf::from("golden.vec"));
                assert_eq!(args.produced, PathBuf::from("out.vec"));
            }
            _ => panic!("expected Compare command"),
        }
    }
}
