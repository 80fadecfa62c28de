use crate::gamepad::GamepadButtons;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    StepDown,
    StepUp,
    ToggleMode,
    ToggleOuter,
    Quit,
}

/// Hold-to-repeat timing for step buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RepeatTiming {
    /// Hold time before the first repeat
    pub delay: Duration,
    /// Time between repeats after that
    pub interval: Duration,
}

impl RepeatTiming {
    pub const DEFAULT: RepeatTiming = RepeatTiming {
        delay: Duration::from_millis(400),
        interval: Duration::from_millis(80),
    };
}

/// Edge detection plus optional auto-repeat for a single logical button.
#[derive(Clone, Debug, Default)]
pub struct ButtonTracker {
    pressed_at: Option<Instant>,
    last_fired: Option<Instant>,
}

impl ButtonTracker {
    /// Feeds the current pressed state; returns true when the action should fire.
    pub fn update(&mut self, pressed: bool, now: Instant, repeat: Option<RepeatTiming>) -> bool {
        if !pressed {
            self.pressed_at = None;
            self.last_fired = None;
            return false;
        }

        let Some(pressed_at) = self.pressed_at else {
            self.pressed_at = Some(now);
            self.last_fired = Some(now);
            return true;
        };

        let Some(timing) = repeat else {
            return false;
        };

        let held = now.saturating_duration_since(pressed_at);
        let since_fire = self
            .last_fired
            .map_or(held, |t| now.saturating_duration_since(t));
        if held >= timing.delay && since_fire >= timing.interval {
            self.last_fired = Some(now);
            return true;
        }
        false
    }
}

/// Keys currently held on the keyboard, fed from window events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyboardState {
    pub left: bool,
    pub right: bool,
    pub mode: bool,
    pub outer: bool,
}

impl KeyboardState {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Merges keyboard and gamepad state into actions, one tracker per logical button.
#[derive(Debug, Default)]
pub struct InputTracker {
    left: ButtonTracker,
    right: ButtonTracker,
    mode: ButtonTracker,
    outer: ButtonTracker,
    quit: ButtonTracker,
}

impl InputTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// `repeat` applies to the step buttons only; toggles and quit are edge-triggered.
    pub fn update(
        &mut self,
        now: Instant,
        keyboard: &KeyboardState,
        gamepad: &GamepadButtons,
        repeat: Option<RepeatTiming>,
    ) -> Vec<Action> {
        let mut actions = Vec::new();

        if self.left.update(keyboard.left || gamepad.left, now, repeat) {
            actions.push(Action::StepDown);
        }
        if self.right.update(keyboard.right || gamepad.right, now, repeat) {
            actions.push(Action::StepUp);
        }
        if self.mode.update(keyboard.mode || gamepad.mode, now, None) {
            actions.push(Action::ToggleMode);
        }
        if self.outer.update(keyboard.outer || gamepad.outer, now, None) {
            actions.push(Action::ToggleOuter);
        }
        if self.quit.update(gamepad.quit, now, None) {
            actions.push(Action::Quit);
        }

        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn fires_once_per_press_without_repeat() {
        let t0 = Instant::now();
        let mut button = ButtonTracker::default();

        assert!(button.update(true, t0, None));
        assert!(!button.update(true, t0 + ms(16), None));
        assert!(!button.update(true, t0 + ms(2000), None));
        assert!(!button.update(false, t0 + ms(2016), None));
        assert!(button.update(true, t0 + ms(2032), None));
    }

    #[test]
    fn repeats_after_delay_then_at_interval() {
        let t0 = Instant::now();
        let timing = Some(RepeatTiming::DEFAULT);
        let mut button = ButtonTracker::default();

        assert!(button.update(true, t0, timing));
        assert!(!button.update(true, t0 + ms(200), timing));
        assert!(!button.update(true, t0 + ms(399), timing));
        assert!(button.update(true, t0 + ms(400), timing));
        assert!(!button.update(true, t0 + ms(440), timing));
        assert!(button.update(true, t0 + ms(480), timing));
        assert!(button.update(true, t0 + ms(560), timing));
    }

    #[test]
    fn release_resets_repeat_delay() {
        let t0 = Instant::now();
        let timing = Some(RepeatTiming::DEFAULT);
        let mut button = ButtonTracker::default();

        button.update(true, t0, timing);
        button.update(true, t0 + ms(500), timing);
        assert!(!button.update(false, t0 + ms(510), timing));

        assert!(button.update(true, t0 + ms(520), timing));
        assert!(!button.update(true, t0 + ms(600), timing));
        assert!(button.update(true, t0 + ms(920), timing));
    }

    #[test]
    fn keyboard_and_gamepad_share_a_button() {
        let t0 = Instant::now();
        let mut input = InputTracker::new();
        let pad = GamepadButtons {
            right: true,
            ..Default::default()
        };
        let keys = KeyboardState {
            right: true,
            ..Default::default()
        };

        assert_eq!(
            input.update(t0, &KeyboardState::default(), &pad, None),
            vec![Action::StepUp]
        );
        // Still held through the other device: no second edge
        assert!(input.update(t0 + ms(16), &keys, &pad, None).is_empty());
        assert!(input.update(t0 + ms(32), &keys, &GamepadButtons::default(), None).is_empty());
    }

    #[test]
    fn held_step_repeats_through_tracker() {
        let t0 = Instant::now();
        let mut input = InputTracker::new();
        let pad = GamepadButtons {
            right: true,
            mode: true,
            ..Default::default()
        };
        let keys = KeyboardState::default();
        let timing = Some(RepeatTiming::DEFAULT);

        assert_eq!(
            input.update(t0, &keys, &pad, timing),
            vec![Action::StepUp, Action::ToggleMode]
        );
        assert!(input.update(t0 + ms(200), &keys, &pad, timing).is_empty());
        assert_eq!(input.update(t0 + ms(400), &keys, &pad, timing), vec![Action::StepUp]);
        assert!(input.update(t0 + ms(440), &keys, &pad, timing).is_empty());
        assert_eq!(input.update(t0 + ms(480), &keys, &pad, timing), vec![Action::StepUp]);
    }

    #[test]
    fn toggles_never_repeat() {
        let t0 = Instant::now();
        let mut input = InputTracker::new();
        let keys = KeyboardState {
            mode: true,
            outer: true,
            ..Default::default()
        };
        let timing = Some(RepeatTiming::DEFAULT);
        let none = GamepadButtons::default();

        assert_eq!(
            input.update(t0, &keys, &none, timing),
            vec![Action::ToggleMode, Action::ToggleOuter]
        );
        assert!(input.update(t0 + ms(1000), &keys, &none, timing).is_empty());
    }

    #[test]
    fn gamepad_quit_is_edge_triggered() {
        let t0 = Instant::now();
        let mut input = InputTracker::new();
        let pad = GamepadButtons {
            quit: true,
            ..Default::default()
        };
        let keys = KeyboardState::default();

        assert_eq!(input.update(t0, &keys, &pad, None), vec![Action::Quit]);
        assert!(input.update(t0 + ms(16), &keys, &pad, None).is_empty());
    }

    #[test]
    fn clear_releases_all_keys() {
        let mut keys = KeyboardState {
            left: true,
            outer: true,
            ..Default::default()
        };
        keys.clear();
        assert_eq!(keys, KeyboardState::default());
    }
}
