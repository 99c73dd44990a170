//! Switching activity of output pins.

use std::io::Write;

use gsim_common::Logic;

use crate::error::SimError;
use crate::store::Cycle;

/// Ones and toggles observed on one output pin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PinActivity {
    /// Cycles the pin was 1.
    pub ones: u64,
    /// Changes from a known previous value.
    pub toggles: u64,
    covered: bool,
    last: Option<Logic>,
}

impl PinActivity {
    /// Records the value written in the current cycle.
    pub fn observe(&mut self, value: Logic) {
        if value == Logic::One {
            self.ones += 1;
        }
        if let Some(last) = self.last.filter(|l| l.is_known()) {
            if value != last {
                self.toggles += 1;
                self.covered |= value.is_known();
            }
        }
        self.last = Some(value);
    }

    /// A pin counts as covered once it has changed between two known values.
    pub fn is_covered(&self) -> bool {
        self.covered
    }

    /// Fraction of `cycles` the pin was 1.
    pub fn static_probability(&self, cycles: Cycle) -> f64 {
        ratio(self.ones, cycles)
    }

    /// Average toggles per cycle.
    pub fn transition_density(&self, cycles: Cycle) -> f64 {
        ratio(self.toggles, cycles)
    }
}

fn ratio(count: u64, cycles: Cycle) -> f64 {
    if cycles == 0 {
        0.0
    } else {
        count as f64 / cycles as f64
    }
}

/// Writes `<pin> <static probability> <transition density>` per pin.
pub fn write_activity<'a>(
    out: &mut impl Write,
    pins: impl IntoIterator<Item = (&'a str, &'a PinActivity)>,
    cycles: Cycle,
) -> Result<(), SimError> {
    for (name, activity) in pins {
        writeln!(
            out,
            "{name} {:.6} {:.6}",
            activity.static_probability(cycles),
            activity.transition_density(cycles)
        )?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsim_common::Logic::{One as I, X, Zero as O};

    #[test]
    fn toggles_need_a_known_previous_value() {
        let mut pin = PinActivity::default();
        for value in [X, I, O, X, I, I] {
            pin.observe(value);
        }
        assert_eq!(pin.ones, 3);
        // X->1 and X->1 do not count; 1->0 and 0->X do.
        assert_eq!(pin.toggles, 2);
        assert!(pin.is_covered());
    }

    #[test]
    fn single_known_toggle_covers() {
        let mut pin = PinActivity::default();
        pin.observe(O);
        pin.observe(I);
        pin.observe(I);
        assert_eq!(pin.toggles, 1);
        assert!(pin.is_covered());
    }

    #[test]
    fn toggle_into_unknown_does_not_cover() {
        let mut pin = PinActivity::default();
        for value in [X, O, X, X] {
            pin.observe(value);
        }
        assert_eq!(pin.toggles, 1);
        assert!(!pin.is_covered());
    }

    #[test]
    fn activity_file_lines() {
        let mut pin = PinActivity::default();
        for value in [O, I, I, O] {
            pin.observe(value);
        }
        let mut out = Vec::new();
        write_activity(&mut out, [("top^q", &pin)], 4).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "top^q 0.500000 0.500000\n");
        assert_eq!(PinActivity::default().static_probability(0), 0.0);
    }
}
