// XInput button bits (XINPUT_GAMEPAD_*)
const DPAD_LEFT: u16 = 0x0004;
const DPAD_RIGHT: u16 = 0x0008;
const BUTTON_A: u16 = 0x1000;
const BUTTON_B: u16 = 0x2000;
const BUTTON_X: u16 = 0x4000;

/// Left stick deflection that counts as a d-pad press
pub const STICK_THRESHOLD: i16 = 16000;

/// Highest XInput user index
pub const MAX_USER_INDEX: u32 = 3;

/// Logical buttons read from a controller this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GamepadButtons {
    pub left: bool,
    pub right: bool,
    pub mode: bool,
    pub outer: bool,
    pub quit: bool,
}

impl GamepadButtons {
    pub fn from_raw(buttons: u16, thumb_lx: i16) -> Self {
        Self {
            left: buttons & DPAD_LEFT != 0 || thumb_lx < -STICK_THRESHOLD,
            right: buttons & DPAD_RIGHT != 0 || thumb_lx > STICK_THRESHOLD,
            mode: buttons & BUTTON_A != 0,
            outer: buttons & BUTTON_X != 0,
            quit: buttons & BUTTON_B != 0,
        }
    }
}

/// Reads controller `user_index`, `None` when it is not connected.
#[cfg(windows)]
pub fn poll(user_index: u32) -> Option<GamepadButtons> {
    use windows::Win32::Foundation::ERROR_SUCCESS;
    use windows::Win32::UI::Input::XboxController::{XInputGetState, XINPUT_STATE};

    let mut state = XINPUT_STATE::default();
    let result = unsafe { XInputGetState(user_index, &mut state) };
    if result != ERROR_SUCCESS.0 {
        return None;
    }
    Some(GamepadButtons::from_raw(state.Gamepad.wButtons.0, state.Gamepad.sThumbLX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dpad_and_face_buttons() {
        let pad = GamepadButtons::from_raw(DPAD_LEFT | BUTTON_A, 0);
        assert!(pad.left && pad.mode);
        assert!(!pad.right && !pad.outer && !pad.quit);

        let pad = GamepadButtons::from_raw(DPAD_RIGHT | BUTTON_X | BUTTON_B, 0);
        assert!(pad.right && pad.outer && pad.quit);
    }

    #[test]
    fn stick_needs_to_pass_threshold() {
        assert!(!GamepadButtons::from_raw(0, -STICK_THRESHOLD).left);
        assert!(GamepadButtons::from_raw(0, -STICK_THRESHOLD - 1).left);
        assert!(!GamepadButtons::from_raw(0, STICK_THRESHOLD).right);
        assert!(GamepadButtons::from_raw(0, i16::MAX).right);
        assert_eq!(GamepadButtons::from_raw(0, 0), GamepadButtons::default());
    }
}
