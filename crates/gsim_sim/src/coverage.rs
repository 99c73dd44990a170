//! Toggle coverage and the run-length policy built on it.

use std::fmt;

/// Covered output pins over tracked output pins.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoverageReport {
    /// Pins that changed between two known values.
    pub covered: usize,
    /// Output pins of every node kind that records coverage.
    pub tracked: usize,
}

impl CoverageReport {
    /// Covered fraction in `[0, 1]`; a netlist with nothing to track is fully covered.
    pub fn fraction(&self) -> f64 {
        if self.tracked == 0 {
            1.0
        } else {
            self.covered as f64 / self.tracked as f64
        }
    }

    /// Covered percentage.
    pub fn percent(&self) -> f64 {
        self.fraction() * 100.0
    }
}

impl fmt::Display for CoverageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} pins ({:.1}%)", self.covered, self.tracked, self.percent())
    }
}

/// Decides how many cycles to append when a generated run reaches its last
/// planned cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct CoverageGoal {
    target: f64,
    best_effort: bool,
    base: u64,
    increment: u64,
    last_seen: Option<f64>,
    stop_on_plateau: bool,
}

/// Starting target in best-effort mode: any coverage at all beats it.
const BEST_EFFORT_FLOOR: f64 = 0.0001;

impl CoverageGoal {
    /// Builds the goal from a minimum coverage in percent and the best-effort
    /// flag. Returns `None` when neither asks for extension.
    ///
    /// `base` is the number of cycles added per extension.
    pub fn new(min_coverage: Option<f64>, achieve_best: bool, base: u64) -> Option<Self> {
        let target = match min_coverage {
            Some(percent) if percent > 0.0 => percent / 100.0,
            _ if achieve_best => BEST_EFFORT_FLOOR,
            _ => return None,
        };
        Some(Self {
            target,
            best_effort: achieve_best,
            base,
            increment: base,
            last_seen: None,
            stop_on_plateau: true,
        })
    }

    /// Target mode keeps extending until the target is met; the caller's
    /// cycle cap is then the only bound. Without it, target mode also stops
    /// once coverage stops improving so the run always ends.
    pub fn capped(mut self) -> Self {
        self.stop_on_plateau = false;
        self
    }

    /// Current target fraction.
    pub fn target(&self) -> f64 {
        self.target
    }

    /// Returns the number of cycles to add given the coverage fraction
    /// reached so far.
    ///
    /// Best-effort mode raises the target to every improvement and adds the
    /// base increment; without improvement the increment halves until it
    /// reaches zero. Target mode adds the base increment while coverage is
    /// below target, and while it is still improving unless [`capped`](Self::capped).
    pub fn extend(&mut self, coverage: f64) -> u64 {
        let previous = self.last_seen.replace(coverage);
        if self.best_effort {
            if coverage > self.target {
                self.target = coverage;
                self.increment = self.base;
                self.base
            } else {
                let added = self.increment;
                self.increment /= 2;
                added
            }
        } else if coverage < self.target
            && (!self.stop_on_plateau || previous.map_or(true, |p| coverage > p))
        {
            self.base
        } else {
            0
        }
    }
}
