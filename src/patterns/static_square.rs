use super::{add_squares, Pattern, PatternOutput, OUTER_NITS};
use crate::input::{Action, RepeatTiming};
use crate::layout::SquareLayout;

/// Fixed pattern: peak outer square around a constant inner square.
pub struct StaticSquare {
    inner_nits: f32,
}

impl StaticSquare {
    pub fn new(inner_nits: f32) -> Self {
        Self { inner_nits }
    }
}

impl Pattern for StaticSquare {
    fn name(&self) -> &'static str {
        "Static pattern"
    }

    fn repeat(&self) -> Option<RepeatTiming> {
        None
    }

    fn handle(&mut self, _action: Action) {}

    fn render(&self, width: u32, height: u32) -> PatternOutput {
        let Some(layout) = SquareLayout::new(width, height) else {
            return PatternOutput::empty();
        };

        let mut vertices = Vec::new();
        add_squares(&mut vertices, &layout, Some(OUTER_NITS), self.inner_nits, width, height);

        PatternOutput {
            vertices,
            labels: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_input_and_has_no_text() {
        let mut pattern = StaticSquare::new(800.0);
        pattern.handle(Action::StepUp);
        pattern.handle(Action::ToggleOuter);

        let output = pattern.render(1920, 1080);
        assert_eq!(output.vertices.len(), 12);
        assert_eq!(output.vertices[6].color, [10.0, 10.0, 10.0, 1.0]);
        assert!(output.labels.is_empty());
    }
}
