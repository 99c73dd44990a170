//! Terminal and JSON output shared by the subcommands.

use gsim_diagnostics::{Diagnostic, DiagnosticRenderer, TerminalRenderer};
use gsim_sim::SimResult;
use serde_json::{json, Value};

/// Prints every diagnostic to stderr and returns how many there were.
pub fn render_diagnostics(diagnostics: &[Diagnostic], color: bool) -> usize {
    let renderer = TerminalRenderer::new(color);
    for diag in diagnostics {
        eprintln!("{}", renderer.render(diag));
    }
    diagnostics.len()
}

/// Machine-readable summary of a run.
pub fn summary_json(result: &SimResult) -> Value {
    let summary = &result.summary;
    let verification = result.verification.as_ref().map(|report| {
        json!({
            "compared": report.compared,
            "mismatches": report.mismatches(),
            "passed": report.passed(),
        })
    });
    json!({
        "cycles": summary.cycles,
        "extended": summary.extended,
        "coverage": {
            "covered": summary.coverage.covered,
            "tracked": summary.coverage.tracked,
            "percent": summary.coverage.percent(),
        },
        "warnings": result.diagnostics.len(),
        "verification": verification,
    })
}
