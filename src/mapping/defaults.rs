//! The profile that ships with the app
//!
//! Loaded from default_profile.json at project root, or falls back to a
//! hardcoded profile if the embedded file fails to parse.

use std::path::Path;

use super::action::{Action, SystemCommand};
use super::binding::{Binding, RepeatMapping};
use super::chord::ChordMapping;
use super::profile::Profile;
use super::types::{ControllerButton, KeyCode, Modifiers};

/// Default profile JSON embedded at compile time
pub const DEFAULT_PROFILE_JSON: &str = include_str!("../../default_profile.json");

/// Parse the embedded default profile, falling back to [`builtin_profile`]
pub fn load_default_profile() -> Profile {
    match Profile::from_json(DEFAULT_PROFILE_JSON) {
        Ok(profile) => {
            tracing::info!(
                "Loaded embedded default profile ({} bindings, {} layers)",
                profile.button_mappings.len(),
                profile.layers.len()
            );
            profile
        }
        Err(e) => {
            tracing::warn!(
                "Failed to parse embedded default profile: {}, using hardcoded defaults",
                e
            );
            builtin_profile()
        }
    }
}

/// Load a profile JSON file from disk
pub fn load_profile_file(path: &Path) -> anyhow::Result<Profile> {
    let content = std::fs::read_to_string(path)?;
    let profile = Profile::from_json(&content)?;
    Ok(profile)
}

/// Minimal hardcoded profile
pub fn builtin_profile() -> Profile {
    use ControllerButton::*;

    let mut profile = Profile::new("Default");
    let base = [
        (A, Binding::new(Action::key(KeyCode::RETURN))),
        (B, Binding::new(Action::key(KeyCode::ESCAPE))),
        (Y, Binding::new(Action::key(KeyCode::SPACE))),
        (
            LeftTrigger,
            Binding::new(Action::modifiers(Modifiers::COMMAND)).with_hold_modifier(),
        ),
        (RightTrigger, Binding::new(Action::key(KeyCode::MOUSE_LEFT_CLICK))),
        (DpadLeft, Binding::new(Action::key(KeyCode::LEFT_ARROW))),
        (DpadRight, Binding::new(Action::key(KeyCode::RIGHT_ARROW))),
    ];
    for (button, binding) in base {
        profile.button_mappings.insert(button, binding);
    }
    for (button, key) in [(DpadUp, KeyCode::UP_ARROW), (DpadDown, KeyCode::DOWN_ARROW)] {
        let repeat = RepeatMapping {
            enabled: true,
            interval: 0.2,
        };
        profile
            .button_mappings
            .insert(button, Binding::new(Action::key(key)).with_repeat(repeat));
    }
    if let Ok(chord) = ChordMapping::new(
        [View, Menu],
        Action::system(SystemCommand::LaunchApp {
            bundle_id: "com.apple.Safari".to_string(),
            new_window: false,
        }),
    ) {
        profile.chords.push(chord.with_hint("Safari"));
    }
    profile
}
