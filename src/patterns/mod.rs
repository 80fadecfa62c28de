mod adjustable;
mod dual_mode;
mod static_square;

use crate::color::{gray, MAX_NITS, MIN_NITS};
use crate::config::{Config, Variant};
use crate::geometry::{add_quad, Rect, Vertex};
use crate::input::{Action, RepeatTiming};
use crate::layout::SquareLayout;
use crate::text::HdrTextLabel;
use std::ops::RangeInclusive;

use adjustable::Adjustable;
use dual_mode::DualMode;
use static_square::StaticSquare;

/// Outer square luminance, the PQ ceiling
pub const OUTER_NITS: f32 = MAX_NITS;

pub const WHITE_STEP_NITS: f32 = 50.0;
pub const WHITE_RANGE: RangeInclusive<f32> = MIN_NITS..=MAX_NITS;
pub const BLACK_STEP_NITS: f32 = 0.01;
pub const BLACK_RANGE: RangeInclusive<f32> = MIN_NITS..=5.0;

/// Dark blue, scRGB
pub const TEXT_COLOR: [f32; 4] = [0.0, 0.0, 0.5, 1.0];
pub const TEXT_SIZE: f32 = 24.0;

pub struct PatternOutput {
    pub vertices: Vec<Vertex>,
    pub labels: Vec<HdrTextLabel>,
}

impl PatternOutput {
    fn empty() -> Self {
        Self {
            vertices: Vec::new(),
            labels: Vec::new(),
        }
    }
}

pub trait Pattern {
    fn name(&self) -> &'static str;
    /// Auto-repeat for held step buttons, `None` for edge-only stepping
    fn repeat(&self) -> Option<RepeatTiming>;
    fn handle(&mut self, action: Action);
    fn render(&self, width: u32, height: u32) -> PatternOutput;
}

pub fn create(config: &Config) -> Box<dyn Pattern> {
    match config.variant {
        Variant::Static => Box::new(StaticSquare::new(config.white_nits)),
        Variant::Adjustable => Box::new(Adjustable::new(config.white_nits)),
        Variant::Dual => Box::new(DualMode::new(config.white_nits, config.black_nits)),
    }
}

/// Outer square (when given a luminance) with the inner square on top
fn add_squares(
    vertices: &mut Vec<Vertex>,
    layout: &SquareLayout,
    outer_nits: Option<f32>,
    inner_nits: f32,
    width: u32,
    height: u32,
) {
    if let Some(nits) = outer_nits {
        add_quad(vertices, layout.outer, width, height, gray(nits));
    }
    add_quad(vertices, layout.inner, width, height, gray(inner_nits));
}

fn text_label(text: String, rect: Rect) -> HdrTextLabel {
    HdrTextLabel {
        text,
        rect,
        color: TEXT_COLOR,
        size: TEXT_SIZE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_has_a_pattern() {
        for (variant, name) in [
            (Variant::Static, "Static"),
            (Variant::Adjustable, "Adjustable"),
            (Variant::Dual, "Dual-mode"),
        ] {
            let config = Config {
                variant,
                ..Config::default()
            };
            assert!(create(&config).name().starts_with(name));
        }
    }

    #[test]
    fn outer_is_optional() {
        let layout = SquareLayout::new(1920, 1080).unwrap();
        let mut vertices = Vec::new();
        add_squares(&mut vertices, &layout, None, 800.0, 1920, 1080);
        assert_eq!(vertices.len(), 6);
        add_squares(&mut vertices, &layout, Some(OUTER_NITS), 800.0, 1920, 1080);
        assert_eq!(vertices.len(), 18);
        assert_eq!(vertices[6].color, [125.0, 125.0, 125.0, 1.0]);
    }
}
