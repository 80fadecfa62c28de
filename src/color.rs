use std::ops::RangeInclusive;

/// Luminance of scRGB 1.0
pub const SCRGB_REFERENCE_NITS: f32 = 80.0;

pub const MIN_NITS: f32 = 0.0;
pub const MAX_NITS: f32 = 10000.0;

pub fn nits_to_scrgb(nits: f32) -> f32 {
    nits / SCRGB_REFERENCE_NITS
}

/// Opaque scRGB gray at the given luminance
pub fn gray(nits: f32) -> [f32; 4] {
    let v = nits_to_scrgb(nits);
    [v, v, v, 1.0]
}

/// How a level is printed in the on-screen readout
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Readout {
    /// Integer part only: `799.9` prints as `799 nits`
    Whole,
    /// Two decimals, for near-black levels
    Fine,
}

impl Readout {
    pub fn format(self, nits: f32) -> String {
        match self {
            Readout::Whole => format!("{} nits", nits.trunc() as i64),
            Readout::Fine => format!("{:.2} nits", nits),
        }
    }
}

/// A luminance value stepped in fixed increments and clamped to a range.
#[derive(Clone, Debug, PartialEq)]
pub struct Level {
    nits: f32,
    step: f32,
    min: f32,
    max: f32,
}

impl Level {
    pub fn new(nits: f32, step: f32, range: RangeInclusive<f32>) -> Self {
        let (min, max) = range.into_inner();
        Self {
            nits: nits.clamp(min, max),
            step,
            min,
            max,
        }
    }

    pub fn nits(&self) -> f32 {
        self.nits
    }

    pub fn set(&mut self, nits: f32) {
        self.nits = nits.clamp(self.min, self.max);
    }

    pub fn increase(&mut self) {
        self.step_by(self.step);
    }

    pub fn decrease(&mut self) {
        self.step_by(-self.step);
    }

    // Rounds away the f32 residue of repeated adds so a level can land exactly on the range ends
    fn step_by(&mut self, delta: f32) {
        let quantum = f64::from(self.step) / 1000.0;
        let nits = ((f64::from(self.nits) + f64::from(delta)) / quantum).round() * quantum;
        // `+ 0.0` turns a -0.0 into 0.0 so the readout never shows "-0.00"
        self.set(nits as f32 + 0.0);
    }

    /// True when sitting on either end of the range
    pub fn is_clamped(&self) -> bool {
        self.nits <= self.min || self.nits >= self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrgb_reference_point() {
        assert_eq!(nits_to_scrgb(80.0), 1.0);
        assert_eq!(nits_to_scrgb(MAX_NITS), 125.0);
        assert_eq!(gray(800.0), [10.0, 10.0, 10.0, 1.0]);
    }

    #[test]
    fn level_clamps_at_both_ends() {
        let mut level = Level::new(9980.0, 50.0, MIN_NITS..=MAX_NITS);
        level.increase();
        assert_eq!(level.nits(), MAX_NITS);
        assert!(level.is_clamped());

        level.set(20.0);
        level.decrease();
        assert_eq!(level.nits(), 0.0);
        assert!(level.is_clamped());
        level.decrease();
        assert_eq!(level.nits(), 0.0);
    }

    #[test]
    fn level_start_value_is_clamped() {
        assert_eq!(Level::new(20000.0, 50.0, 0.0..=10000.0).nits(), 10000.0);
        assert_eq!(Level::new(-5.0, 50.0, 0.0..=10000.0).nits(), 0.0);
    }

    #[test]
    fn fine_steps_print_cleanly() {
        let mut level = Level::new(0.10, 0.01, 0.0..=5.0);
        for _ in 0..25 {
            level.increase();
        }
        assert_eq!(Readout::Fine.format(level.nits()), "0.35 nits");
        for _ in 0..40 {
            level.decrease();
        }
        assert_eq!(level.nits(), 0.0);
    }

    #[test]
    fn black_level_reaches_zero_in_exact_steps() {
        let mut level = Level::new(0.10, 0.01, 0.0..=5.0);
        for _ in 0..9 {
            level.decrease();
            assert!(!level.is_clamped());
        }
        level.decrease();
        assert_eq!(level.nits(), 0.0);
        assert!(level.is_clamped());
        assert_eq!(Readout::Fine.format(level.nits()), "0.00 nits");

        for _ in 0..10 {
            level.increase();
        }
        assert_eq!(Readout::Fine.format(level.nits()), "0.10 nits");
    }

    #[test]
    fn off_grid_start_keeps_its_offset() {
        let mut level = Level::new(825.0, 50.0, MIN_NITS..=MAX_NITS);
        level.increase();
        assert_eq!(level.nits(), 875.0);
        level.decrease();
        level.decrease();
        assert_eq!(level.nits(), 775.0);
    }

    #[test]
    fn readout_formats() {
        assert_eq!(Readout::Whole.format(800.0), "800 nits");
        assert_eq!(Readout::Whole.format(799.9), "799 nits");
        assert_eq!(Readout::Whole.format(0.0), "0 nits");
        assert_eq!(Readout::Fine.format(0.1), "0.10 nits");
    }
}
