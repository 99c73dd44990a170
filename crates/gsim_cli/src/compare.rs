//! `gsim compare`: check produced output vectors against a reference.
//!
//! Unknown bits in the reference match anything. Differences are reported as
//! warnings; the exit code is 1 when any vector mismatches.

use std::error::Error;
use std::fs::File;
use std::io::BufReader;

use gsim_sim::verify_vectors;

use crate::report::render_diagnostics;
use crate::{CompareArgs, GlobalArgs};

/// Runs the `gsim compare` command.
pub fn run(args: &CompareArgs, global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    if !global.quiet {
        eprintln!(
            "   Comparing {} against {}",
            args.produced.display(),
            args.expected.display()
        );
    }
    let report = verify_vectors(
        BufReader::new(File::open(&args.expected)?),
        BufReader::new(File::open(&args.produced)?),
    )?;
    let diagnostics = report.to_diagnostics(
        &args.expected.display().to_string(),
        &args.produced.display().to_string(),
    );
    render_diagnostics(&diagnostics, global.color);

    if report.passed() {
        if !global.quiet {
            eprintln!("   {} vectors match", report.compared);
        }
        Ok(0)
    } else {
        if !global.quiet {
            eprintln!("   FAILED: {} vectors differ", report.mismatches());
        }
        Ok(1)
    }
}
