//! Motion gestures: one action per recognized gesture type

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::action::{Action, HapticStyle};

/// Gyro patterns recognized by the motion service
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionGestureType {
    TiltForward,
    TiltBack,
    TiltLeft,
    TiltRight,
    SteerLeft,
    SteerRight,
    Shake,
}

impl MotionGestureType {
    pub const ALL: [MotionGestureType; 7] = [
        MotionGestureType::TiltForward,
        MotionGestureType::TiltBack,
        MotionGestureType::TiltLeft,
        MotionGestureType::TiltRight,
        MotionGestureType::SteerLeft,
        MotionGestureType::SteerRight,
        MotionGestureType::Shake,
    ];
}

impl fmt::Display for MotionGestureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MotionGestureType::TiltForward => "Tilt Forward",
            MotionGestureType::TiltBack => "Tilt Back",
            MotionGestureType::TiltLeft => "Tilt Left",
            MotionGestureType::TiltRight => "Tilt Right",
            MotionGestureType::SteerLeft => "Steer Left",
            MotionGestureType::SteerRight => "Steer Right",
            MotionGestureType::Shake => "Shake",
        };
        f.write_str(s)
    }
}

/// A gesture recognized by the motion service
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureEvent {
    pub gesture: MotionGestureType,
    #[serde(rename = "at_ms", with = "super::types::millis")]
    pub at: Duration,
}

impl GestureEvent {
    pub fn new(gesture: MotionGestureType, at: Duration) -> Self {
        Self { gesture, at }
    }
}

/// The action bound to one gesture type
///
/// `action` holds a single variant, so assigning a macro replaces a key press
/// (and so on) in one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureMapping {
    pub gesture_type: MotionGestureType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub haptic: Option<HapticStyle>,
}

impl GestureMapping {
    pub fn new(gesture_type: MotionGestureType, action: Action) -> Self {
        Self {
            gesture_type,
            action: Some(action),
            hint: None,
            haptic: None,
        }
    }

    pub fn unmapped(gesture_type: MotionGestureType) -> Self {
        Self {
            gesture_type,
            action: None,
            hint: None,
            haptic: None,
        }
    }

    pub fn has_action(&self) -> bool {
        self.action.as_ref().is_some_and(|a| !a.is_noop())
    }

    /// Replace whatever was bound with `action`
    pub fn set_action(&mut self, action: Action) {
        self.action = Some(action);
    }

    pub fn clear(&mut self) {
        self.action = None;
        self.hint = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::types::KeyCode;
    use uuid::Uuid;

    #[test]
    fn test_has_action() {
        let mut mapping = GestureMapping::unmapped(MotionGestureType::Shake);
        assert!(!mapping.has_action());

        mapping.set_action(Action::key(KeyCode::SPACE));
        assert!(mapping.has_action());

        mapping.clear();
        assert!(!mapping.has_action());
    }

    #[test]
    fn test_set_action_replaces_other_variant() {
        let mut mapping = GestureMapping::new(MotionGestureType::TiltLeft, Action::key(KeyCode::A));
        let macro_id = Uuid::new_v4();
        mapping.set_action(Action::Macro { macro_id });

        assert_eq!(mapping.action, Some(Action::Macro { macro_id }));
        assert_eq!(mapping.action.as_ref().and_then(Action::key_code), None);
    }
}
