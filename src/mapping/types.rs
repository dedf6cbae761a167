//! Core types for the mapping system: ControllerButton, KeyCode, Modifiers, input events

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A physical controller input that can carry a binding
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerButton {
    // Face buttons
    A,
    B,
    X,
    Y,

    // Shoulders and triggers
    LeftBumper,
    RightBumper,
    LeftTrigger,
    RightTrigger,

    // D-pad
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,

    // System buttons
    Menu,
    View,
    Share,
    Xbox,

    // Stick clicks
    LeftThumbstick,
    RightThumbstick,

    // DualSense extras
    Touchpad,
    Mic,

    // Elite paddles
    PaddleUpperLeft,
    PaddleUpperRight,
    PaddleLowerLeft,
    PaddleLowerRight,
}

impl ControllerButton {
    /// Every button, in display order
    pub const ALL: [ControllerButton; 24] = [
        ControllerButton::A,
        ControllerButton::B,
        ControllerButton::X,
        ControllerButton::Y,
        ControllerButton::LeftBumper,
        ControllerButton::RightBumper,
        ControllerButton::LeftTrigger,
        ControllerButton::RightTrigger,
        ControllerButton::DpadUp,
        ControllerButton::DpadDown,
        ControllerButton::DpadLeft,
        ControllerButton::DpadRight,
        ControllerButton::Menu,
        ControllerButton::View,
        ControllerButton::Share,
        ControllerButton::Xbox,
        ControllerButton::LeftThumbstick,
        ControllerButton::RightThumbstick,
        ControllerButton::Touchpad,
        ControllerButton::Mic,
        ControllerButton::PaddleUpperLeft,
        ControllerButton::PaddleUpperRight,
        ControllerButton::PaddleLowerLeft,
        ControllerButton::PaddleLowerRight,
    ];

    /// Short label used in hints and CLI output
    pub fn short_label(self) -> &'static str {
        match self {
            ControllerButton::A => "A",
            ControllerButton::B => "B",
            ControllerButton::X => "X",
            ControllerButton::Y => "Y",
            ControllerButton::LeftBumper => "LB",
            ControllerButton::RightBumper => "RB",
            ControllerButton::LeftTrigger => "LT",
            ControllerButton::RightTrigger => "RT",
            ControllerButton::DpadUp => "D↑",
            ControllerButton::DpadDown => "D↓",
            ControllerButton::DpadLeft => "D←",
            ControllerButton::DpadRight => "D→",
            ControllerButton::Menu => "Menu",
            ControllerButton::View => "View",
            ControllerButton::Share => "Share",
            ControllerButton::Xbox => "Xbox",
            ControllerButton::LeftThumbstick => "LS",
            ControllerButton::RightThumbstick => "RS",
            ControllerButton::Touchpad => "Touchpad",
            ControllerButton::Mic => "Mic",
            ControllerButton::PaddleUpperLeft => "P1",
            ControllerButton::PaddleUpperRight => "P2",
            ControllerButton::PaddleLowerLeft => "P3",
            ControllerButton::PaddleLowerRight => "P4",
        }
    }
}

impl fmt::Display for ControllerButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_label())
    }
}

/// A macOS virtual key code, or one of the pseudo codes reserved above
/// [`KeyCode::PSEUDO_BASE`] for mouse clicks and special on-screen actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyCode(pub u16);

impl KeyCode {
    pub const A: KeyCode = KeyCode(0x00);
    pub const S: KeyCode = KeyCode(0x01);
    pub const D: KeyCode = KeyCode(0x02);
    pub const F: KeyCode = KeyCode(0x03);
    pub const Z: KeyCode = KeyCode(0x06);
    pub const C: KeyCode = KeyCode(0x08);
    pub const V: KeyCode = KeyCode(0x09);
    pub const W: KeyCode = KeyCode(0x0D);
    pub const RETURN: KeyCode = KeyCode(0x24);
    pub const TAB: KeyCode = KeyCode(0x30);
    pub const SPACE: KeyCode = KeyCode(0x31);
    pub const DELETE: KeyCode = KeyCode(0x33);
    pub const ESCAPE: KeyCode = KeyCode(0x35);
    pub const LEFT_ARROW: KeyCode = KeyCode(0x7B);
    pub const RIGHT_ARROW: KeyCode = KeyCode(0x7C);
    pub const DOWN_ARROW: KeyCode = KeyCode(0x7D);
    pub const UP_ARROW: KeyCode = KeyCode(0x7E);

    /// Start of the pseudo key code range (not real virtual key codes)
    pub const PSEUDO_BASE: u16 = 0xF000;

    pub const MOUSE_LEFT_CLICK: KeyCode = KeyCode(0xF000);
    pub const MOUSE_RIGHT_CLICK: KeyCode = KeyCode(0xF001);
    pub const MOUSE_MIDDLE_CLICK: KeyCode = KeyCode(0xF002);

    pub const SHOW_ON_SCREEN_KEYBOARD: KeyCode = KeyCode(0xF100);
    pub const SHOW_LASER_POINTER: KeyCode = KeyCode(0xF101);
    pub const SHOW_DIRECTORY_NAVIGATOR: KeyCode = KeyCode(0xF102);

    /// Mouse click pseudo codes
    #[inline]
    pub const fn is_mouse_click(self) -> bool {
        self.0 >= 0xF000 && self.0 <= 0xF0FF
    }

    /// Special on-screen-keyboard / overlay pseudo codes
    #[inline]
    pub const fn is_special_action(self) -> bool {
        self.0 >= 0xF100 && self.0 <= 0xF1FF
    }

    /// Whether the code is a real virtual key code
    #[inline]
    pub const fn is_keyboard_key(self) -> bool {
        self.0 < Self::PSEUDO_BASE
    }

    /// Human readable name, falling back to the hex code
    pub fn display_name(self) -> String {
        let name = match self {
            KeyCode::A => "A",
            KeyCode::S => "S",
            KeyCode::D => "D",
            KeyCode::F => "F",
            KeyCode::Z => "Z",
            KeyCode::C => "C",
            KeyCode::V => "V",
            KeyCode::W => "W",
            KeyCode::RETURN => "Return",
            KeyCode::TAB => "Tab",
            KeyCode::SPACE => "Space",
            KeyCode::DELETE => "Delete",
            KeyCode::ESCAPE => "Escape",
            KeyCode::LEFT_ARROW => "←",
            KeyCode::RIGHT_ARROW => "→",
            KeyCode::DOWN_ARROW => "↓",
            KeyCode::UP_ARROW => "↑",
            KeyCode::MOUSE_LEFT_CLICK => "Left Click",
            KeyCode::MOUSE_RIGHT_CLICK => "Right Click",
            KeyCode::MOUSE_MIDDLE_CLICK => "Middle Click",
            KeyCode::SHOW_ON_SCREEN_KEYBOARD => "On-Screen Keyboard",
            KeyCode::SHOW_LASER_POINTER => "Laser Pointer",
            KeyCode::SHOW_DIRECTORY_NAVIGATOR => "Directory Navigator",
            _ => return format!("Key 0x{:02X}", self.0),
        };
        name.to_string()
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// Modifier keys as a bitfield for efficient storage and comparison
///
/// Serialized as an object of named flags so the persisted format stays
/// readable and stable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "ModifierFlags", into = "ModifierFlags")]
pub struct Modifiers(u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const COMMAND: Modifiers = Modifiers(0b0001);
    pub const OPTION: Modifiers = Modifiers(0b0010);
    pub const SHIFT: Modifiers = Modifiers(0b0100);
    pub const CONTROL: Modifiers = Modifiers(0b1000);

    /// Create modifiers from individual flags
    pub const fn new(command: bool, option: bool, shift: bool, control: bool) -> Self {
        let mut bits = 0u8;
        if command {
            bits |= 0b0001;
        }
        if option {
            bits |= 0b0010;
        }
        if shift {
            bits |= 0b0100;
        }
        if control {
            bits |= 0b1000;
        }
        Modifiers(bits)
    }

    #[inline]
    pub const fn command(self) -> bool {
        self.0 & 0b0001 != 0
    }

    #[inline]
    pub const fn option(self) -> bool {
        self.0 & 0b0010 != 0
    }

    #[inline]
    pub const fn shift(self) -> bool {
        self.0 & 0b0100 != 0
    }

    #[inline]
    pub const fn control(self) -> bool {
        self.0 & 0b1000 != 0
    }

    /// Check if no modifiers are held
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Combine two modifier sets
    #[inline]
    pub const fn union(self, other: Modifiers) -> Modifiers {
        Modifiers(self.0 | other.0)
    }

    /// Check if this contains all modifiers in other
    #[inline]
    pub const fn contains(self, other: Modifiers) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // macOS symbol order: ⌃ ⌥ ⇧ ⌘
        if self.control() {
            f.write_str("⌃")?;
        }
        if self.option() {
            f.write_str("⌥")?;
        }
        if self.shift() {
            f.write_str("⇧")?;
        }
        if self.command() {
            f.write_str("⌘")?;
        }
        Ok(())
    }
}

/// Persisted shape of [`Modifiers`]
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
struct ModifierFlags {
    #[serde(default)]
    command: bool,
    #[serde(default)]
    option: bool,
    #[serde(default)]
    shift: bool,
    #[serde(default)]
    control: bool,
}

impl From<ModifierFlags> for Modifiers {
    fn from(flags: ModifierFlags) -> Self {
        Modifiers::new(flags.command, flags.option, flags.shift, flags.control)
    }
}

impl From<Modifiers> for ModifierFlags {
    fn from(mods: Modifiers) -> Self {
        Self {
            command: mods.command(),
            option: mods.option(),
            shift: mods.shift(),
            control: mods.control(),
        }
    }
}

/// A button edge reported by the controller service
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEvent {
    pub button: ControllerButton,
    pub pressed: bool,
    /// Time since the start of the input session
    #[serde(rename = "at_ms", with = "millis")]
    pub at: Duration,
}

impl InputEvent {
    pub fn press(button: ControllerButton, at: Duration) -> Self {
        Self {
            button,
            pressed: true,
            at,
        }
    }

    pub fn release(button: ControllerButton, at: Duration) -> Self {
        Self {
            button,
            pressed: false,
            at,
        }
    }
}

/// Duration (de)serialized as whole milliseconds
pub(crate) mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifiers_empty() {
        let mods = Modifiers::NONE;
        assert!(mods.is_empty());
        assert!(!mods.command());
        assert!(!mods.option());
        assert!(!mods.shift());
        assert!(!mods.control());
    }

    #[test]
    fn test_modifiers_combined() {
        let mods = Modifiers::COMMAND | Modifiers::SHIFT;
        assert!(mods.command());
        assert!(mods.shift());
        assert!(!mods.option());
        assert!(mods.contains(Modifiers::COMMAND));
        assert!(!mods.contains(Modifiers::CONTROL));
    }

    #[test]
    fn test_modifiers_display_uses_mac_order() {
        let mods = Modifiers::COMMAND | Modifiers::CONTROL | Modifiers::SHIFT;
        assert_eq!(mods.to_string(), "⌃⇧⌘");
    }

    #[test]
    fn test_modifiers_serialize_as_named_flags() {
        let json = serde_json::to_string(&(Modifiers::COMMAND | Modifiers::OPTION)).unwrap();
        assert_eq!(
            json,
            r#"{"command":true,"option":true,"shift":false,"control":false}"#
        );

        let parsed: Modifiers = serde_json::from_str(r#"{"shift":true}"#).unwrap();
        assert_eq!(parsed, Modifiers::SHIFT);
    }

    #[test]
    fn test_pseudo_key_ranges() {
        assert!(KeyCode::MOUSE_LEFT_CLICK.is_mouse_click());
        assert!(KeyCode::MOUSE_RIGHT_CLICK.is_mouse_click());
        assert!(!KeyCode::MOUSE_LEFT_CLICK.is_special_action());

        assert!(KeyCode::SHOW_ON_SCREEN_KEYBOARD.is_special_action());
        assert!(!KeyCode::SHOW_ON_SCREEN_KEYBOARD.is_mouse_click());

        assert!(KeyCode::SPACE.is_keyboard_key());
        assert!(!KeyCode::SPACE.is_mouse_click());
        assert!(!KeyCode::SPACE.is_special_action());
    }

    #[test]
    fn test_input_event_json_uses_millis() {
        let event = InputEvent::press(ControllerButton::LeftBumper, Duration::from_millis(250));
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"button":"left_bumper","pressed":true,"at_ms":250}"#);

        let back: InputEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_button_labels_unique() {
        let mut labels: Vec<_> = ControllerButton::ALL.iter().map(|b| b.short_label()).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), ControllerButton::ALL.len());
    }
}
