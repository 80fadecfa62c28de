use super::{add_squares, text_label, Pattern, PatternOutput, OUTER_NITS, WHITE_RANGE, WHITE_STEP_NITS};
use crate::color::{Level, Readout};
use crate::input::{Action, RepeatTiming};
use crate::layout::SquareLayout;
use tracing::debug;

/// Inner square stepped by single presses, with a nits readout below.
pub struct Adjustable {
    inner: Level,
}

impl Adjustable {
    pub fn new(inner_nits: f32) -> Self {
        Self {
            inner: Level::new(inner_nits, WHITE_STEP_NITS, WHITE_RANGE),
        }
    }
}

impl Pattern for Adjustable {
    fn name(&self) -> &'static str {
        "Adjustable brightness"
    }

    fn repeat(&self) -> Option<RepeatTiming> {
        None
    }

    fn handle(&mut self, action: Action) {
        match action {
            Action::StepDown => self.inner.decrease(),
            Action::StepUp => self.inner.increase(),
            _ => return,
        }
        debug!(nits = self.inner.nits(), clamped = self.inner.is_clamped(), "inner brightness");
    }

    fn render(&self, width: u32, height: u32) -> PatternOutput {
        let Some(layout) = SquareLayout::new(width, height) else {
            return PatternOutput::empty();
        };

        let mut vertices = Vec::new();
        add_squares(&mut vertices, &layout, Some(OUTER_NITS), self.inner.nits(), width, height);

        let labels = vec![text_label(Readout::Whole.format(self.inner.nits()), layout.readout)];

        PatternOutput { vertices, labels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readout(pattern: &Adjustable) -> String {
        pattern.render(1920, 1080).labels[0].text.clone()
    }

    #[test]
    fn steps_by_fifty_within_range() {
        let mut pattern = Adjustable::new(800.0);
        pattern.handle(Action::StepUp);
        assert_eq!(readout(&pattern), "850 nits");
        pattern.handle(Action::StepDown);
        pattern.handle(Action::StepDown);
        assert_eq!(readout(&pattern), "750 nits");

        let mut pattern = Adjustable::new(9990.0);
        pattern.handle(Action::StepUp);
        assert_eq!(readout(&pattern), "10000 nits");

        let mut pattern = Adjustable::new(30.0);
        pattern.handle(Action::StepDown);
        assert_eq!(readout(&pattern), "0 nits");
    }

    #[test]
    fn inner_square_tracks_level() {
        let mut pattern = Adjustable::new(800.0);
        pattern.handle(Action::StepDown);
        let output = pattern.render(1920, 1080);
        assert_eq!(output.vertices[6].color, [9.375, 9.375, 9.375, 1.0]);
    }

    #[test]
    fn toggles_do_nothing() {
        let mut pattern = Adjustable::new(800.0);
        pattern.handle(Action::ToggleMode);
        pattern.handle(Action::ToggleOuter);
        assert_eq!(readout(&pattern), "800 nits");
        assert_eq!(pattern.render(1920, 1080).vertices.len(), 12);
    }

    #[test]
    fn readout_sits_below_outer_square() {
        let output = Adjustable::new(800.0).render(1920, 1080);

        assert_eq!(output.labels.len(), 1);
        assert_eq!(output.labels[0].text, "800 nits");
        assert_eq!(output.labels[0].rect.min.y, 675.0);
        assert_eq!(output.labels[0].color, [0.0, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn no_repeat() {
        assert!(Adjustable::new(800.0).repeat().is_none());
    }
}
