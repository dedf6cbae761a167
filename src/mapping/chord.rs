//! Chords: an action fired by holding several buttons at once

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::action::{Action, HapticStyle};
use super::error::MappingError;
use super::types::ControllerButton;

/// Simultaneous multi-button trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordMapping {
    pub id: Uuid,
    pub buttons: BTreeSet<ControllerButton>,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub haptic: Option<HapticStyle>,
}

impl ChordMapping {
    pub fn new(
        buttons: impl IntoIterator<Item = ControllerButton>,
        action: Action,
    ) -> Result<Self, MappingError> {
        let buttons: BTreeSet<_> = buttons.into_iter().collect();
        if buttons.len() < 2 {
            return Err(MappingError::TooFewChordButtons(buttons.len()));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            buttons,
            action,
            hint: None,
            haptic: None,
        })
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// True when exactly these buttons are held
    pub fn matches(&self, held: &BTreeSet<ControllerButton>) -> bool {
        self.buttons == *held
    }

    pub fn display_string(&self) -> String {
        self.buttons
            .iter()
            .map(|b| b.short_label())
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

/// A chord (other than `editing`) that already uses exactly `buttons`
///
/// This is the only conflict that blocks saving.
pub fn find_duplicate<'a>(
    buttons: &BTreeSet<ControllerButton>,
    chords: &'a [ChordMapping],
    editing: Option<Uuid>,
) -> Option<&'a ChordMapping> {
    chords
        .iter()
        .filter(|chord| Some(chord.id) != editing)
        .find(|chord| chord.buttons == *buttons)
}

/// Reject a candidate chord that is too small or duplicates another chord
pub fn check_chord(
    buttons: &BTreeSet<ControllerButton>,
    chords: &[ChordMapping],
    editing: Option<Uuid>,
) -> Result<(), MappingError> {
    if buttons.len() < 2 {
        return Err(MappingError::TooFewChordButtons(buttons.len()));
    }
    if let Some(existing) = find_duplicate(buttons, chords, editing) {
        return Err(MappingError::DuplicateChord {
            existing: existing.id,
        });
    }
    Ok(())
}

/// Soft conflicts for a chord editor
///
/// Maps each button not yet selected to the chords that adding it would
/// exactly reproduce, so the editor can grey it out. Only exact set equality
/// blocks saving; this map is advisory.
pub fn button_conflicts(
    selected: &BTreeSet<ControllerButton>,
    chords: &[ChordMapping],
    editing: Option<Uuid>,
) -> BTreeMap<ControllerButton, Vec<Uuid>> {
    let mut conflicts: BTreeMap<ControllerButton, Vec<Uuid>> = BTreeMap::new();

    for chord in chords.iter().filter(|c| Some(c.id) != editing) {
        if !selected.is_subset(&chord.buttons) {
            continue;
        }
        let missing: Vec<_> = chord.buttons.difference(selected).copied().collect();
        if let [button] = missing.as_slice() {
            conflicts.entry(*button).or_default().push(chord.id);
        }
    }

    conflicts
}
