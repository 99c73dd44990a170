//! Structured warnings and errors raised while simulating a netlist.
//!
//! [`Diagnostic`] carries a severity, a code such as `W301`, a message and an
//! optional netlist location. The thread-safe [`DiagnosticSink`] collects them
//! from every worker, and [`TerminalRenderer`] formats them for the console.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
