use super::{
    add_squares, text_label, Pattern, PatternOutput, BLACK_RANGE, BLACK_STEP_NITS, OUTER_NITS,
    WHITE_RANGE, WHITE_STEP_NITS,
};
use crate::color::{Level, Readout};
use crate::input::{Action, RepeatTiming};
use crate::layout::SquareLayout;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CalibrationMode {
    MaxWhite,
    MinBlack,
}

impl CalibrationMode {
    fn caption(self) -> &'static str {
        match self {
            CalibrationMode::MaxWhite => "MAX WHITE",
            CalibrationMode::MinBlack => "MIN BLACK",
        }
    }

    fn toggled(self) -> Self {
        match self {
            CalibrationMode::MaxWhite => CalibrationMode::MinBlack,
            CalibrationMode::MinBlack => CalibrationMode::MaxWhite,
        }
    }
}

/// Peak-white and near-black calibration with held-button stepping.
///
/// Each mode keeps its own level. In black mode the outer square shows the
/// current white level so the near-black patch is judged next to the
/// calibrated peak; hiding it shows the patch on pure black.
pub struct DualMode {
    mode: CalibrationMode,
    white: Level,
    black: Level,
    outer_visible: bool,
}

impl DualMode {
    pub fn new(white_nits: f32, black_nits: f32) -> Self {
        Self {
            mode: CalibrationMode::MaxWhite,
            white: Level::new(white_nits, WHITE_STEP_NITS, WHITE_RANGE),
            black: Level::new(black_nits, BLACK_STEP_NITS, BLACK_RANGE),
            outer_visible: true,
        }
    }

    fn active(&mut self) -> &mut Level {
        match self.mode {
            CalibrationMode::MaxWhite => &mut self.white,
            CalibrationMode::MinBlack => &mut self.black,
        }
    }

    fn inner(&self) -> (&Level, Readout) {
        match self.mode {
            CalibrationMode::MaxWhite => (&self.white, Readout::Whole),
            CalibrationMode::MinBlack => (&self.black, Readout::Fine),
        }
    }

    fn outer_nits(&self) -> Option<f32> {
        if !self.outer_visible {
            return None;
        }
        match self.mode {
            CalibrationMode::MaxWhite => Some(OUTER_NITS),
            CalibrationMode::MinBlack => Some(self.white.nits()),
        }
    }
}

impl Pattern for DualMode {
    fn name(&self) -> &'static str {
        "Dual-mode calibration"
    }

    fn repeat(&self) -> Option<RepeatTiming> {
        Some(RepeatTiming::DEFAULT)
    }

    fn handle(&mut self, action: Action) {
        match action {
            Action::StepDown | Action::StepUp => {
                let mode = self.mode;
                let level = self.active();
                if action == Action::StepUp {
                    level.increase();
                } else {
                    level.decrease();
                }
                debug!(
                    ?mode,
                    nits = level.nits(),
                    clamped = level.is_clamped(),
                    "inner brightness"
                );
            }
            Action::ToggleMode => {
                self.mode = self.mode.toggled();
                debug!(mode = ?self.mode, "calibration mode");
            }
            Action::ToggleOuter => {
                self.outer_visible = !self.outer_visible;
                debug!(visible = self.outer_visible, "outer square");
            }
            Action::Quit => {}
        }
    }

    fn render(&self, width: u32, height: u32) -> PatternOutput {
        let Some(layout) = SquareLayout::new(width, height) else {
            return PatternOutput::empty();
        };
        let (inner, readout) = self.inner();

        let mut vertices = Vec::new();
        add_squares(&mut vertices, &layout, self.outer_nits(), inner.nits(), width, height);

        let labels = vec![
            text_label(self.mode.caption().to_string(), layout.caption),
            text_label(readout.format(inner.nits()), layout.readout),
        ];

        PatternOutput { vertices, labels }
    }
}
