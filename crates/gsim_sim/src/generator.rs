//! Random input vector generation.

use gsim_common::{Logic, LogicVec};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::SimError;
use crate::lines::{Line, LineSet};
use crate::store::Cycle;
use crate::vectors::{TestVector, VectorSource};

/// Value every generated clock takes in cycle 0.
const CLOCK_INITIAL_VALUE: Logic = Logic::One;

/// Settings for [`VectorGenerator`].
#[derive(Debug, Clone, Default)]
pub struct GeneratorConfig {
    /// Fixed seed for reproducible vectors; `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Lines containing one of these substrings (case-insensitive) start low
    /// and are held high once every clock has toggled a few times.
    pub hold_high: Vec<String>,
    /// Like `hold_high`, starting high and held low.
    pub hold_low: Vec<String>,
    /// Draw unknowns as well as zeros and ones.
    pub three_valued: bool,
}

/// A [`VectorSource`] producing random vectors.
///
/// Clock lines toggle every `ratio` cycles starting from 1. Held lines take
/// the opposite of their hold value for `3 * clocks` cycles.
pub struct VectorGenerator {
    config: GeneratorConfig,
    rng: StdRng,
    clocks: Vec<Logic>,
}

impl VectorGenerator {
    /// Creates a generator.
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng,
            clocks: Vec::new(),
        }
    }

    fn line_value(&mut self, index: usize, line: &Line, cycle: Cycle, clock_count: u64) -> LogicVec {
        let width = line.width();
        if let Some(ratio) = line.clock_ratio {
            let prev = self.clocks.get(index).copied().unwrap_or(!CLOCK_INITIAL_VALUE);
            let value = if cycle == 0 {
                CLOCK_INITIAL_VALUE
            } else if cycle % ratio.max(1) == 0 {
                Logic::from_bool(prev != Logic::One)
            } else {
                prev
            };
            if self.clocks.len() <= index {
                self.clocks.resize(index + 1, !CLOCK_INITIAL_VALUE);
            }
            self.clocks[index] = value;
            return LogicVec::filled(width, value);
        }

        let settled = cycle >= clock_count * 3;
        if matches_any(&self.config.hold_high, &line.name) {
            return LogicVec::filled(width, Logic::from_bool(settled));
        }
        if matches_any(&self.config.hold_low, &line.name) {
            return LogicVec::filled(width, Logic::from_bool(!settled));
        }

        let mut value = LogicVec::new(0);
        for _ in 0..width {
            let bit = if self.config.three_valued {
                match self.rng.gen_range(0..3) {
                    0 => Logic::Zero,
                    1 => Logic::One,
                    _ => Logic::X,
                }
            } else {
                Logic::from_bool(self.rng.gen_bool(0.5))
            };
            value.push(bit);
        }
        value
    }
}

impl VectorSource for VectorGenerator {
    fn next_vector(&mut self, lines: &LineSet, cycle: Cycle) -> Result<Option<TestVector>, SimError> {
        let clock_count = lines.clock_count() as u64;
        let vector = lines
            .iter()
            .enumerate()
            .map(|(index, line)| self.line_value(index, line, cycle, clock_count))
            .collect();
        Ok(Some(vector))
    }

    fn is_generated(&self) -> bool {
        true
    }
}

/// Case-insensitive substring match against any pattern.
fn matches_any(patterns: &[String], name: &str) -> bool {
    let name = name.to_lowercase();
    patterns
        .iter()
        .any(|pattern| name.contains(&pattern.to_lowercase()))
}
