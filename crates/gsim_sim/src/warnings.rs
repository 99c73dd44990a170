//! Diagnostic codes emitted by the simulator.

use gsim_diagnostics::{Category, DiagnosticCode};

/// An input pin with no driving net; it reads as its node's initial value.
pub const UNDRIVEN_PIN: DiagnosticCode = DiagnosticCode::new(Category::Warning, 301);
/// A clock node with no inputs toggles on its own.
pub const INTERNAL_CLOCK: DiagnosticCode = DiagnosticCode::new(Category::Warning, 302);
/// A chained clock read its source before the source was updated.
pub const CLOCK_LAG: DiagnosticCode = DiagnosticCode::new(Category::Warning, 303);
/// A memory has no `.mif` file to load.
pub const MIF_MISSING: DiagnosticCode = DiagnosticCode::new(Category::Warning, 304);
/// An output line could not be matched to any node.
pub const UNMAPPED_LINE: DiagnosticCode = DiagnosticCode::new(Category::Warning, 305);

/// A produced vector disagrees with the reference.
pub const VECTOR_MISMATCH: DiagnosticCode = DiagnosticCode::new(Category::Verification, 1);
/// A produced vector only matches because the reference had unknown bits.
pub const VECTOR_EQUIVALENT: DiagnosticCode = DiagnosticCode::new(Category::Verification, 2);
/// Reference and produced files list different lines.
pub const HEADER_MISMATCH: DiagnosticCode = DiagnosticCode::new(Category::Verification, 3);
/// Reference and produced files hold a different number of vectors.
pub const COUNT_MISMATCH: DiagnosticCode = DiagnosticCode::new(Category::Verification, 4);
/// A vector row in a compared file could not be parsed.
pub const UNPARSABLE_VECTOR: DiagnosticCode = DiagnosticCode::new(Category::Verification, 5);
