//! Console rendering of diagnostics.

use crate::diagnostic::Diagnostic;
use crate::severity::Severity;

/// Formats a diagnostic for a particular output target.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic into a formatted string.
    fn render(&self, diag: &Diagnostic) -> String;
}

/// Renders diagnostics in a rustc-style terminal format.
///
/// ```text
/// warning[W301]: node has an undriven input pin
///   --> node top^and~3
///    = note: defaulting to x
/// ```
pub struct TerminalRenderer {
    /// Whether to use ANSI color codes in output.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn severity_label(&self, severity: Severity) -> String {
        if !self.color {
            return severity.to_string();
        }
        let ansi = match severity {
            Severity::Error => "31",
            Severity::Warning => "33",
            Severity::Note => "36",
        };
        format!("\x1b[1;{ansi}m{severity}\x1b[0m")
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        let mut out = format!(
            "{}[{}]: {}\n",
            self.severity_label(diag.severity),
            diag.code,
            diag.message
        );
        if let Some(location) = &diag.location {
            out.push_str(&format!("  --> {location}\n"));
        }
        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{Category, DiagnosticCode};

    #[test]
    fn plain_rendering() {
        let diag = Diagnostic::warning(
            DiagnosticCode::new(Category::Warning, 301),
            "node has an undriven input pin",
        )
        .at("node top^and~3")
        .with_note("defaulting to x");
        let text = TerminalRenderer::new(false).render(&diag);
        assert_eq!(
            text,
            "warning[W301]: node has an undriven input pin\n  --> node top^and~3\n   = note: defaulting to x\n"
        );
    }

    #[test]
    fn colored_rendering_wraps_severity() {
        let diag = Diagnostic::error(DiagnosticCode::new(Category::Error, 101), "stall");
        let text = TerminalRenderer::new(true).render(&diag);
        assert!(text.starts_with("\x1b[1;31merror\x1b[0m[E101]"));
    }
}
