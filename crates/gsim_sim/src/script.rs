//! ModelSim `.do` script replaying the applied input vectors.
//!
//! Each simulated cycle is half of a 100-unit clock period, so the value for
//! cycle `c` is forced at time `c / 2 * 100`.

use std::io::Write;

use gsim_common::{Logic, LogicVec};

use crate::error::SimError;
use crate::lines::LineSet;
use crate::store::Cycle;
use crate::vectors::{TestVector, VectorSink};

/// A [`VectorSink`] writing a ModelSim script for the input side.
pub struct ModelSimScript<W> {
    out: W,
    names: Vec<String>,
}

impl<W: Write> ModelSimScript<W> {
    /// Writes the script to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out,
            names: Vec::new(),
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Formats a forced value: binary MSB first for unknown or single-bit
/// values, otherwise `16#` and uppercase hex.
fn force_value(value: &LogicVec) -> String {
    let width = value.width();
    if value.has_unknown() || width == 1 {
        return (0..width)
            .rev()
            .map(|i| match value.get(i) {
                Logic::One => '1',
                Logic::Zero => '0',
                Logic::X | Logic::Z => 'x',
            })
            .collect();
    }
    let mut text = String::from("16#");
    let mut digit = 0u32;
    for i in (0..width).rev() {
        if value.get(i) == Logic::One {
            digit += 1 << (i % 4);
        }
        if i % 4 == 0 {
            text.push(char::from_digit(digit, 16).map_or('0', |c| c.to_ascii_uppercase()));
            digit = 0;
        }
    }
    text
}

impl<W: Write> VectorSink for ModelSimScript<W> {
    fn begin(&mut self, inputs: &LineSet, _outputs: &LineSet) -> Result<(), SimError> {
        writeln!(self.out, "add wave *")?;
        for line in inputs.iter().filter(|line| line.clock_ratio.is_some()) {
            writeln!(self.out, "force {} 0 0, 1 50 -repeat 100", line.name)?;
        }
        self.names = inputs.iter().map(|line| line.name.clone()).collect();
        Ok(())
    }

    fn record(&mut self, cycle: Cycle, inputs: &TestVector, _outputs: &TestVector) -> Result<(), SimError> {
        let time = cycle / 2 * 100;
        for (name, value) in self.names.iter().zip(inputs) {
            writeln!(self.out, "force {name} {} {time}", force_value(value))?;
        }
        Ok(())
    }

    fn finish(&mut self, cycles: Cycle) -> Result<(), SimError> {
        writeln!(self.out, "run {}", cycles * 100)?;
        self.out.flush()?;
        Ok(())
    }
}
