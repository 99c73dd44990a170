//! Test vector files: parsing, formatting, sources, sinks and verification.
//!
//! A vector file starts with a header naming one line per column, followed
//! by one row per cycle:
//!
//! ```text
//! clk rst data
//! 1 1 0x00
//! 0 0 0x3f
//! # comments and blank lines are ignored
//! 1 0 01x0
//! ```
//!
//! Binary tokens are written most significant bit first; any character other
//! than `0` or `1` reads as unknown. `0x` tokens are hexadecimal.

use std::collections::VecDeque;
use std::io::{BufRead, Write};

use gsim_common::{Logic, LogicVec};
use gsim_diagnostics::Diagnostic;

use crate::error::SimError;
use crate::lines::LineSet;
use crate::store::Cycle;
use crate::warnings;

/// One value per line, in line order.
pub type TestVector = Vec<LogicVec>;

/// Parses one value token.
///
/// Returns `None` if a hexadecimal token contains a non-hex digit.
pub fn parse_token(token: &str) -> Option<LogicVec> {
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        LogicVec::from_hex_str(hex)
    } else {
        let bits: Vec<Logic> = token.chars().rev().map(Logic::from_vector_char).collect();
        Some(LogicVec::from_bits(&bits))
    }
}

/// Parses a whitespace-separated row of tokens.
pub fn parse_row(row: &str) -> Result<TestVector, String> {
    row.split_whitespace()
        .map(|token| parse_token(token).ok_or_else(|| token.to_string()))
        .collect()
}

/// Formats one value the way output vector files print it.
///
/// Values with an unknown bit, and single-bit values, print in binary with
/// `x` for unknowns; everything else prints as `0X` followed by lowercase hex.
pub fn format_value(value: &LogicVec) -> String {
    let width = value.width();
    if value.has_unknown() || width == 1 {
        return (0..width).rev().map(|i| value.get(i).to_vector_char()).collect();
    }
    let mut text = String::from("0X");
    let mut digit = 0u32;
    for i in (0..width).rev() {
        if value.get(i) == Logic::One {
            digit += 1 << (i % 4);
        }
        if i % 4 == 0 {
            text.push(char::from_digit(digit, 16).unwrap_or('0'));
            digit = 0;
        }
    }
    text
}

/// Formats a row: one token per value, separated by single spaces.
pub fn format_row(vector: &[LogicVec]) -> String {
    vector.iter().map(format_value).collect::<Vec<_>>().join(" ")
}

/// Outcome of comparing a produced value or vector against a reference.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Comparison {
    /// Bit-for-bit identical, allowing zero extension.
    Equal,
    /// Only differs where the reference has unknown bits.
    Equivalent,
    /// A known reference bit differs.
    Mismatch,
}

/// Compares `actual` against `reference`.
///
/// An unknown reference bit accepts any value. When widths differ, the extra
/// high bits of the longer value must be zero.
pub fn compare_values(reference: &LogicVec, actual: &LogicVec) -> Comparison {
    let common = reference.width().min(actual.width());
    let mut outcome = Comparison::Equal;
    for i in 0..common {
        let expected = reference.get(i);
        if expected != actual.get(i) {
            if expected.is_known() {
                return Comparison::Mismatch;
            }
            outcome = Comparison::Equivalent;
        }
    }
    let longer = if reference.width() > actual.width() {
        reference
    } else {
        actual
    };
    if (common..longer.width()).any(|i| longer.get(i) != Logic::Zero) {
        return Comparison::Mismatch;
    }
    outcome
}

/// Compares two vectors line by line; different line counts mismatch.
pub fn compare_vectors(reference: &[LogicVec], actual: &[LogicVec]) -> Comparison {
    if reference.len() != actual.len() {
        return Comparison::Mismatch;
    }
    reference
        .iter()
        .zip(actual)
        .map(|(r, a)| compare_values(r, a))
        .max()
        .unwrap_or(Comparison::Equal)
}

/// Supplies one input vector per cycle.
pub trait VectorSource {
    /// The vector for `cycle`, or `None` when the source is exhausted.
    fn next_vector(&mut self, lines: &LineSet, cycle: Cycle) -> Result<Option<TestVector>, SimError>;

    /// Generated sources run for a planned number of cycles, which coverage
    /// targets may extend. Other sources run until exhausted.
    fn is_generated(&self) -> bool {
        false
    }
}

/// Observes the vectors applied and produced in every cycle.
pub trait VectorSink {
    /// Called once before the first cycle.
    fn begin(&mut self, _inputs: &LineSet, _outputs: &LineSet) -> Result<(), SimError> {
        Ok(())
    }

    /// Called after every cycle.
    fn record(&mut self, cycle: Cycle, inputs: &TestVector, outputs: &TestVector) -> Result<(), SimError>;

    /// Called once after the last cycle.
    fn finish(&mut self, _cycles: Cycle) -> Result<(), SimError> {
        Ok(())
    }
}

/// Reads rows from a vector file, skipping blank and `#` lines.
struct Records<R> {
    reader: R,
    line: usize,
}

impl<R: BufRead> Records<R> {
    fn new(reader: R) -> Self {
        Self { reader, line: 0 }
    }

    fn next_record(&mut self) -> Result<Option<(usize, String)>, SimError> {
        let mut buffer = String::new();
        loop {
            buffer.clear();
            if self.reader.read_line(&mut buffer)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            let trimmed = buffer.trim();
            if !trimmed.is_empty() && !trimmed.starts_with('#') {
                return Ok(Some((self.line, trimmed.to_string())));
            }
        }
    }
}

/// A [`VectorSource`] reading a vector file.
pub struct VectorReader<R> {
    records: Records<R>,
    source_name: String,
    header_checked: bool,
    vectors_read: u64,
}

impl<R: BufRead> VectorReader<R> {
    /// Wraps `reader`; `source_name` labels errors.
    pub fn new(reader: R, source_name: impl Into<String>) -> Self {
        Self {
            records: Records::new(reader),
            source_name: source_name.into(),
            header_checked: false,
            vectors_read: 0,
        }
    }

    /// Reads the header and checks it names `lines` in order.
    pub fn read_header(&mut self, lines: &LineSet) -> Result<(), SimError> {
        let found = self
            .records
            .next_record()?
            .map(|(_, header)| header.split_whitespace().collect::<Vec<_>>().join(" "))
            .unwrap_or_default();
        let expected = lines.header();
        if found != expected {
            return Err(SimError::VectorHeaderMismatch { expected, found });
        }
        self.header_checked = true;
        Ok(())
    }
}

impl<R: BufRead> VectorSource for VectorReader<R> {
    fn next_vector(&mut self, lines: &LineSet, _cycle: Cycle) -> Result<Option<TestVector>, SimError> {
        if !self.header_checked {
            self.read_header(lines)?;
        }
        let Some((line, row)) = self.records.next_record()? else {
            if self.vectors_read == 0 {
                return Err(SimError::VectorExhausted {
                    source_name: self.source_name.clone(),
                });
            }
            return Ok(None);
        };
        let vector = parse_row(&row).map_err(|token| SimError::VectorParse {
            source_name: self.source_name.clone(),
            line,
            token,
        })?;
        if vector.len() != lines.len() {
            return Err(SimError::VectorLineCount {
                source_name: self.source_name.clone(),
                line,
                expected: lines.len(),
                found: vector.len(),
            });
        }
        self.vectors_read += 1;
        Ok(Some(vector))
    }
}

/// A [`VectorSource`] over vectors held in memory.
#[derive(Clone, Debug, Default)]
pub struct VectorList {
    vectors: VecDeque<TestVector>,
}

impl From<Vec<TestVector>> for VectorList {
    fn from(vectors: Vec<TestVector>) -> Self {
        Self {
            vectors: vectors.into(),
        }
    }
}

impl VectorSource for VectorList {
    fn next_vector(&mut self, _lines: &LineSet, _cycle: Cycle) -> Result<Option<TestVector>, SimError> {
        Ok(self.vectors.pop_front())
    }
}

/// Which side of a cycle a [`VectorWriter`] records.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Side {
    /// The applied input vectors.
    Inputs,
    /// The produced output vectors.
    Outputs,
}

/// A [`VectorSink`] writing a vector file.
pub struct VectorWriter<W> {
    out: W,
    side: Side,
}

impl<W: Write> VectorWriter<W> {
    /// Writes the given side of every cycle to `out`.
    pub fn new(out: W, side: Side) -> Self {
        Self { out, side }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> VectorSink for VectorWriter<W> {
    fn begin(&mut self, inputs: &LineSet, outputs: &LineSet) -> Result<(), SimError> {
        let lines = match self.side {
            Side::Inputs => inputs,
            Side::Outputs => outputs,
        };
        writeln!(self.out, "{}", lines.header())?;
        Ok(())
    }

    fn record(&mut self, _cycle: Cycle, inputs: &TestVector, outputs: &TestVector) -> Result<(), SimError> {
        let vector = match self.side {
            Side::Inputs => inputs,
            Side::Outputs => outputs,
        };
        writeln!(self.out, "{}", format_row(vector))?;
        Ok(())
    }

    fn finish(&mut self, _cycles: Cycle) -> Result<(), SimError> {
        self.out.flush()?;
        Ok(())
    }
}

/// A [`VectorSink`] keeping every cycle in memory.
#[derive(Clone, Debug, Default)]
pub struct VectorRecorder {
    /// Applied inputs, one vector per cycle.
    pub inputs: Vec<TestVector>,
    /// Produced outputs, one vector per cycle.
    pub outputs: Vec<TestVector>,
}

impl VectorSink for VectorRecorder {
    fn record(&mut self, _cycle: Cycle, inputs: &TestVector, outputs: &TestVector) -> Result<(), SimError> {
        self.inputs.push(inputs.clone());
        self.outputs.push(outputs.clone());
        Ok(())
    }
}

/// One difference found by [`verify_vectors`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Finding {
    /// The files list different lines.
    HeaderMismatch {
        /// Reference header.
        expected: String,
        /// Produced header.
        actual: String,
    },
    /// A vector differs from the reference.
    Mismatch {
        /// Zero-based vector index.
        vector: usize,
        /// Reference row.
        expected: String,
        /// Produced row.
        actual: String,
    },
    /// A vector only matches thanks to unknown reference bits.
    Equivalent {
        /// Zero-based vector index.
        vector: usize,
        /// Reference row.
        expected: String,
        /// Produced row.
        actual: String,
    },
    /// A row could not be parsed; the vector counts as a mismatch.
    Unparsable {
        /// Zero-based vector index.
        vector: usize,
        /// `true` if the row is in the reference file.
        in_reference: bool,
        /// One-based line number.
        line: usize,
        /// The offending token.
        token: String,
    },
    /// The files hold a different number of vectors.
    CountMismatch {
        /// Vectors in the reference.
        expected: usize,
        /// Vectors produced.
        actual: usize,
    },
}

/// The result of comparing a produced vector file against a reference.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Verification {
    /// Everything that differed, in file order.
    pub findings: Vec<Finding>,
    /// Number of vectors compared.
    pub compared: usize,
}

impl Verification {
    /// Returns `true` if nothing but equivalences were found.
    pub fn passed(&self) -> bool {
        self.findings
            .iter()
            .all(|f| matches!(f, Finding::Equivalent { .. }))
    }

    /// Number of mismatching vectors.
    pub fn mismatches(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| matches!(f, Finding::Mismatch { .. } | Finding::Unparsable { .. }))
            .count()
    }

    /// Converts the findings to verification diagnostics.
    pub fn to_diagnostics(&self, reference_name: &str, produced_name: &str) -> Vec<Diagnostic> {
        self.findings
            .iter()
            .map(|finding| match finding {
                Finding::HeaderMismatch { expected, actual } => {
                    Diagnostic::warning(warnings::HEADER_MISMATCH, "vector headers do not match")
                        .with_note(format!("{reference_name}: {expected}"))
                        .with_note(format!("{produced_name}: {actual}"))
                }
                Finding::Mismatch {
                    vector,
                    expected,
                    actual,
                } => Diagnostic::warning(warnings::VECTOR_MISMATCH, format!("vector {vector} mismatch"))
                    .with_note(format!("{reference_name}: {expected}"))
                    .with_note(format!("{produced_name}: {actual}")),
                Finding::Equivalent {
                    vector,
                    expected,
                    actual,
                } => Diagnostic::warning(
                    warnings::VECTOR_EQUIVALENT,
                    format!("vector {vector} equivalent but produced bits where don't-care was expected"),
                )
                .with_note(format!("{reference_name}: {expected}"))
                .with_note(format!("{produced_name}: {actual}")),
                Finding::Unparsable {
                    vector,
                    in_reference,
                    line,
                    token,
                } => {
                    let file = if *in_reference { reference_name } else { produced_name };
                    Diagnostic::warning(
                        warnings::UNPARSABLE_VECTOR,
                        format!("vector {vector} could not be compared"),
                    )
                    .with_note(format!("{file}:{line}: invalid vector value '{token}'"))
                }
                Finding::CountMismatch { expected, actual } => Diagnostic::warning(
                    warnings::COUNT_MISMATCH,
                    format!("{reference_name} holds {expected} vectors but {actual} were produced"),
                ),
            })
            .collect()
    }
}

/// Compares a produced vector file against a reference file.
///
/// Differing headers stop the comparison. A row that cannot be parsed is
/// reported as a finding and the comparison goes on with the next vector.
pub fn verify_vectors(reference: impl BufRead, produced: impl BufRead) -> Result<Verification, SimError> {
    let mut expected_rows = Records::new(reference);
    let mut actual_rows = Records::new(produced);
    let mut report = Verification::default();

    let expected_header = header_of(expected_rows.next_record()?);
    let actual_header = header_of(actual_rows.next_record()?);
    if expected_header != actual_header {
        report.findings.push(Finding::HeaderMismatch {
            expected: expected_header,
            actual: actual_header,
        });
        return Ok(report);
    }

    let mut expected_count = 0;
    let mut actual_count = 0;
    loop {
        let expected = expected_rows.next_record()?;
        let actual = actual_rows.next_record()?;
        expected_count += usize::from(expected.is_some());
        actual_count += usize::from(actual.is_some());
        let (Some((expected_line, expected)), Some((actual_line, actual))) = (expected, actual) else {
            // Count whatever is left on the longer side.
            while expected_rows.next_record()?.is_some() {
                expected_count += 1;
            }
            while actual_rows.next_record()?.is_some() {
                actual_count += 1;
            }
            break;
        };
        let vector = report.compared;
        report.compared += 1;
        let (reference, produced) = match (parse_row(&expected), parse_row(&actual)) {
            (Ok(reference), Ok(produced)) => (reference, produced),
            (Err(token), _) => {
                report.findings.push(Finding::Unparsable {
                    vector,
                    in_reference: true,
                    line: expected_line,
                    token,
                });
                continue;
            }
            (_, Err(token)) => {
                report.findings.push(Finding::Unparsable {
                    vector,
                    in_reference: false,
                    line: actual_line,
                    token,
                });
                continue;
            }
        };
        match compare_vectors(&reference, &produced) {
            Comparison::Equal => {}
            Comparison::Equivalent => report.findings.push(Finding::Equivalent {
                vector,
                expected,
                actual,
            }),
            Comparison::Mismatch => report.findings.push(Finding::Mismatch {
                vector,
                expected,
                actual,
            }),
        }
    }
    if expected_count != actual_count {
        report.findings.push(Finding::CountMismatch {
            expected: expected_count,
            actual: actual_count,
        });
    }
    Ok(report)
}

fn header_of(record: Option<(usize, String)>) -> String {
    record
        .map(|(_, header)| header.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}
