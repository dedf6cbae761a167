//! Profile: the aggregate of every mapping, layer, macro and device setting
//!
//! Profiles are plain values. Edits go through the methods here (called by
//! [`ProfileManager`](crate::store::ProfileManager)) so layer, chord and
//! binding invariants hold after every call.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::action::Action;
use super::binding::Binding;
use super::chord::{self, ChordMapping};
use super::error::MappingError;
use super::gesture::{GestureMapping, MotionGestureType};
use super::layer::{self, Layer, MAX_LAYERS};
use super::sequence::{self, SequenceMapping};
use super::types::{ControllerButton, KeyCode, Modifiers};

// ============================================================================
// Macros and scripts
// ============================================================================

/// One step of a macro
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MacroStep {
    Press {
        key_code: KeyCode,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Hold {
        key_code: KeyCode,
        #[serde(default)]
        modifiers: Modifiers,
        /// Seconds
        duration: f64,
    },
    Delay {
        seconds: f64,
    },
    TypeText {
        text: String,
        /// Characters per second, 0 types instantly
        #[serde(default)]
        speed: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Macro {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub steps: Vec<MacroStep>,
}

impl Macro {
    pub fn new(name: impl Into<String>, steps: Vec<MacroStep>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            steps,
        }
    }

    /// Seconds spent in holds and delays
    pub fn total_wait(&self) -> f64 {
        self.steps
            .iter()
            .map(|step| match step {
                MacroStep::Hold { duration, .. } => *duration,
                MacroStep::Delay { seconds } => *seconds,
                _ => 0.0,
            })
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub id: Uuid,
    pub name: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Script {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            source: source.into(),
            description: None,
        }
    }
}

// ============================================================================
// Device settings
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StickMode {
    #[default]
    None,
    Mouse,
    Scroll,
    Wasd,
    ArrowKeys,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoystickSettings {
    pub left_stick_mode: StickMode,
    pub right_stick_mode: StickMode,
    pub mouse_sensitivity: f64,
    pub scroll_sensitivity: f64,
    /// Radial deadzone, 0.0..1.0 of full deflection
    pub deadzone: f64,
    pub invert_y: bool,
}

impl Default for JoystickSettings {
    fn default() -> Self {
        Self {
            left_stick_mode: StickMode::Mouse,
            right_stick_mode: StickMode::Scroll,
            mouse_sensitivity: 0.5,
            scroll_sensitivity: 0.5,
            deadzone: 0.15,
            invert_y: false,
        }
    }
}

impl JoystickSettings {
    /// Apply the radial deadzone and rescale the remainder to 0..1
    pub fn apply_deadzone(&self, x: f64, y: f64) -> (f64, f64) {
        let magnitude = (x * x + y * y).sqrt();
        let deadzone = self.deadzone.clamp(0.0, 0.99);
        if magnitude <= deadzone {
            return (0.0, 0.0);
        }
        let scaled = ((magnitude - deadzone) / (1.0 - deadzone)).min(1.0);
        let y = if self.invert_y { -y } else { y };
        (x / magnitude * scaled, y / magnitude * scaled)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TouchpadSettings {
    pub enabled: bool,
    pub sensitivity: f64,
    pub tap_to_click: bool,
    pub two_finger_scroll: bool,
}

impl Default for TouchpadSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            sensitivity: 0.5,
            tap_to_click: true,
            two_finger_scroll: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedSettings {
    pub color: LedColor,
    /// 0.0..1.0
    pub brightness: f64,
    pub player_leds: u8,
}

impl Default for LedSettings {
    fn default() -> Self {
        Self {
            color: LedColor {
                red: 0,
                green: 120,
                blue: 255,
            },
            brightness: 1.0,
            player_leds: 0b00100,
        }
    }
}

/// Text snippet offered on the on-screen keyboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickText {
    pub id: Uuid,
    pub text: String,
    /// Run in a terminal instead of typing it
    #[serde(default)]
    pub is_terminal_command: bool,
}

/// App shortcut shown in the on-screen keyboard's app bar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppBarItem {
    pub id: Uuid,
    pub bundle_id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardSettings {
    pub quick_texts: Vec<QuickText>,
    pub app_bar_items: Vec<AppBarItem>,
}

// ============================================================================
// Profile
// ============================================================================

/// Current persisted format version
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub format_version: u32,
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,

    /// Base layer bindings
    #[serde(default)]
    pub button_mappings: BTreeMap<ControllerButton, Binding>,
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub chords: Vec<ChordMapping>,
    #[serde(default)]
    pub sequences: Vec<SequenceMapping>,
    #[serde(default)]
    pub gestures: Vec<GestureMapping>,
    #[serde(default)]
    pub macros: Vec<Macro>,
    #[serde(default)]
    pub scripts: Vec<Script>,

    #[serde(default)]
    pub joystick_settings: JoystickSettings,
    #[serde(default)]
    pub touchpad_settings: TouchpadSettings,
    #[serde(default)]
    pub led_settings: LedSettings,
    #[serde(default)]
    pub keyboard_settings: KeyboardSettings,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            format_version: FORMAT_VERSION,
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: now,
            modified_at: now,
            button_mappings: BTreeMap::new(),
            layers: Vec::new(),
            chords: Vec::new(),
            sequences: Vec::new(),
            gestures: Vec::new(),
            macros: Vec::new(),
            scripts: Vec::new(),
            joystick_settings: JoystickSettings::default(),
            touchpad_settings: TouchpadSettings::default(),
            led_settings: LedSettings::default(),
            keyboard_settings: KeyboardSettings::default(),
        }
    }

    /// Mark the profile as modified now
    pub fn touch(&mut self) {
        self.modified_at = Utc::now();
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    pub fn layer(&self, id: Uuid) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    fn layer_mut(&mut self, id: Uuid) -> Result<&mut Layer, MappingError> {
        self.layers
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(MappingError::UnknownLayer(id))
    }

    /// Layer activated by `button`, if any
    pub fn layer_for_activator(&self, button: ControllerButton) -> Option<&Layer> {
        self.layers
            .iter()
            .find(|l| l.activator_button == Some(button))
    }

    pub fn is_activator(&self, button: ControllerButton) -> bool {
        self.layer_for_activator(button).is_some()
    }

    /// Binding for `button` with `layer` active, falling through to base
    pub fn binding(&self, button: ControllerButton, layer: Option<Uuid>) -> Option<&Binding> {
        let active = layer.and_then(|id| self.layer(id));
        layer::resolve_binding(&self.button_mappings, active, button)
    }

    pub fn chord(&self, id: Uuid) -> Option<&ChordMapping> {
        self.chords.iter().find(|c| c.id == id)
    }

    pub fn sequence(&self, id: Uuid) -> Option<&SequenceMapping> {
        self.sequences.iter().find(|s| s.id == id)
    }

    pub fn gesture(&self, gesture_type: MotionGestureType) -> Option<&GestureMapping> {
        self.gestures.iter().find(|g| g.gesture_type == gesture_type)
    }

    pub fn find_macro(&self, id: Uuid) -> Option<&Macro> {
        self.macros.iter().find(|m| m.id == id)
    }

    pub fn find_script(&self, id: Uuid) -> Option<&Script> {
        self.scripts.iter().find(|s| s.id == id)
    }

    // ------------------------------------------------------------------
    // Base layer bindings
    // ------------------------------------------------------------------

    pub fn set_mapping(
        &mut self,
        button: ControllerButton,
        binding: Binding,
    ) -> Result<&Binding, MappingError> {
        if self.is_activator(button) {
            return Err(MappingError::ActivatorReserved(button));
        }
        self.button_mappings.insert(button, binding);
        Ok(&self.button_mappings[&button])
    }

    pub fn clear_mapping(&mut self, button: ControllerButton) -> Option<Binding> {
        self.button_mappings.remove(&button)
    }

    /// Exchange the bindings of two buttons in the base layer or a named layer
    pub fn swap_mappings(
        &mut self,
        a: ControllerButton,
        b: ControllerButton,
        layer: Option<Uuid>,
    ) -> Result<(), MappingError> {
        for button in [a, b] {
            if self.is_activator(button) {
                return Err(MappingError::ActivatorReserved(button));
            }
        }
        let mappings = match layer {
            Some(id) => &mut self.layer_mut(id)?.button_mappings,
            None => &mut self.button_mappings,
        };
        let first = mappings.remove(&a);
        let second = mappings.remove(&b);
        if let Some(binding) = first {
            mappings.insert(b, binding);
        }
        if let Some(binding) = second {
            mappings.insert(a, binding);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Layers
    // ------------------------------------------------------------------

    fn check_activator(
        &self,
        button: ControllerButton,
        for_layer: Option<Uuid>,
    ) -> Result<(), MappingError> {
        match self.layer_for_activator(button) {
            Some(other) if Some(other.id) != for_layer => Err(MappingError::DuplicateActivator {
                button,
                layer: other.name.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Activators carry no bindings in any layer
    fn reserve_activator(&mut self, button: ControllerButton) {
        let mut removed = usize::from(self.button_mappings.remove(&button).is_some());
        for layer in &mut self.layers {
            removed += usize::from(layer.button_mappings.remove(&button).is_some());
        }
        if removed > 0 {
            tracing::debug!(
                "Removed {} binding(s) for {} now reserved as a layer activator",
                removed,
                button
            );
        }
    }

    pub fn create_layer(
        &mut self,
        name: impl Into<String>,
        activator: Option<ControllerButton>,
    ) -> Result<&Layer, MappingError> {
        if self.layers.len() >= MAX_LAYERS {
            return Err(MappingError::LayerLimit(MAX_LAYERS));
        }
        if let Some(button) = activator {
            self.check_activator(button, None)?;
            self.reserve_activator(button);
        }
        self.layers.push(Layer::new(name, activator));
        Ok(&self.layers[self.layers.len() - 1])
    }

    pub fn rename_layer(&mut self, id: Uuid, name: impl Into<String>) -> Result<&Layer, MappingError> {
        let layer = self.layer_mut(id)?;
        layer.name = name.into();
        Ok(&*layer)
    }

    /// Reassign or clear a layer's activator; a cleared layer is kept
    pub fn set_layer_activator(
        &mut self,
        id: Uuid,
        activator: Option<ControllerButton>,
    ) -> Result<&Layer, MappingError> {
        self.layer_mut(id)?;
        if let Some(button) = activator {
            self.check_activator(button, Some(id))?;
            self.reserve_activator(button);
        }
        let layer = self.layer_mut(id)?;
        layer.activator_button = activator;
        Ok(&*layer)
    }

    /// Remove a layer and all of its bindings
    pub fn delete_layer(&mut self, id: Uuid) -> Result<Layer, MappingError> {
        let index = self
            .layers
            .iter()
            .position(|l| l.id == id)
            .ok_or(MappingError::UnknownLayer(id))?;
        Ok(self.layers.remove(index))
    }

    pub fn set_layer_mapping(
        &mut self,
        id: Uuid,
        button: ControllerButton,
        binding: Binding,
    ) -> Result<&Binding, MappingError> {
        if self.is_activator(button) {
            return Err(MappingError::ActivatorReserved(button));
        }
        let layer = self.layer_mut(id)?;
        layer.button_mappings.insert(button, binding);
        Ok(&layer.button_mappings[&button])
    }

    pub fn clear_layer_mapping(
        &mut self,
        id: Uuid,
        button: ControllerButton,
    ) -> Result<Option<Binding>, MappingError> {
        Ok(self.layer_mut(id)?.button_mappings.remove(&button))
    }

    // ------------------------------------------------------------------
    // Chords
    // ------------------------------------------------------------------

    /// Soft conflicts for a chord being edited
    pub fn chord_conflicts(
        &self,
        selected: &BTreeSet<ControllerButton>,
        editing: Option<Uuid>,
    ) -> BTreeMap<ControllerButton, Vec<Uuid>> {
        chord::button_conflicts(selected, &self.chords, editing)
    }

    pub fn add_chord(&mut self, chord: ChordMapping) -> Result<&ChordMapping, MappingError> {
        chord::check_chord(&chord.buttons, &self.chords, Some(chord.id))?;
        self.chords.push(chord);
        Ok(&self.chords[self.chords.len() - 1])
    }

    pub fn update_chord(&mut self, chord: ChordMapping) -> Result<&ChordMapping, MappingError> {
        let index = self
            .chords
            .iter()
            .position(|c| c.id == chord.id)
            .ok_or(MappingError::UnknownChord(chord.id))?;
        chord::check_chord(&chord.buttons, &self.chords, Some(chord.id))?;
        self.chords[index] = chord;
        Ok(&self.chords[index])
    }

    pub fn remove_chord(&mut self, id: Uuid) -> Result<ChordMapping, MappingError> {
        let index = self
            .chords
            .iter()
            .position(|c| c.id == id)
            .ok_or(MappingError::UnknownChord(id))?;
        Ok(self.chords.remove(index))
    }

    // ------------------------------------------------------------------
    // Sequences
    // ------------------------------------------------------------------

    pub fn add_sequence(
        &mut self,
        sequence: SequenceMapping,
    ) -> Result<&SequenceMapping, MappingError> {
        sequence::check_steps(&sequence.steps)?;
        self.sequences.push(sequence);
        Ok(&self.sequences[self.sequences.len() - 1])
    }

    pub fn update_sequence(
        &mut self,
        sequence: SequenceMapping,
    ) -> Result<&SequenceMapping, MappingError> {
        sequence::check_steps(&sequence.steps)?;
        let index = self
            .sequences
            .iter()
            .position(|s| s.id == sequence.id)
            .ok_or(MappingError::UnknownSequence(sequence.id))?;
        self.sequences[index] = sequence;
        Ok(&self.sequences[index])
    }

    pub fn remove_sequence(&mut self, id: Uuid) -> Result<SequenceMapping, MappingError> {
        let index = self
            .sequences
            .iter()
            .position(|s| s.id == id)
            .ok_or(MappingError::UnknownSequence(id))?;
        Ok(self.sequences.remove(index))
    }

    // ------------------------------------------------------------------
    // Gestures
    // ------------------------------------------------------------------

    /// Add or replace the mapping for the gesture's type
    pub fn set_gesture(&mut self, gesture: GestureMapping) -> &GestureMapping {
        match self
            .gestures
            .iter()
            .position(|g| g.gesture_type == gesture.gesture_type)
        {
            Some(index) => {
                self.gestures[index] = gesture;
                &self.gestures[index]
            }
            None => {
                self.gestures.push(gesture);
                &self.gestures[self.gestures.len() - 1]
            }
        }
    }

    pub fn remove_gesture(&mut self, gesture_type: MotionGestureType) -> Option<GestureMapping> {
        let index = self
            .gestures
            .iter()
            .position(|g| g.gesture_type == gesture_type)?;
        Some(self.gestures.remove(index))
    }

    // ------------------------------------------------------------------
    // Macros and scripts
    // ------------------------------------------------------------------

    /// Add a macro, or replace the one with the same id
    pub fn upsert_macro(&mut self, item: Macro) -> &Macro {
        match self.macros.iter().position(|m| m.id == item.id) {
            Some(index) => {
                self.macros[index] = item;
                &self.macros[index]
            }
            None => {
                self.macros.push(item);
                &self.macros[self.macros.len() - 1]
            }
        }
    }

    pub fn remove_macro(&mut self, id: Uuid) -> Result<Macro, MappingError> {
        let index = self
            .macros
            .iter()
            .position(|m| m.id == id)
            .ok_or(MappingError::UnknownMacro(id))?;
        Ok(self.macros.remove(index))
    }

    /// Add a script, or replace the one with the same id
    pub fn upsert_script(&mut self, item: Script) -> &Script {
        match self.scripts.iter().position(|s| s.id == item.id) {
            Some(index) => {
                self.scripts[index] = item;
                &self.scripts[index]
            }
            None => {
                self.scripts.push(item);
                &self.scripts[self.scripts.len() - 1]
            }
        }
    }

    pub fn remove_script(&mut self, id: Uuid) -> Result<Script, MappingError> {
        let index = self
            .scripts
            .iter()
            .position(|s| s.id == id)
            .ok_or(MappingError::UnknownScript(id))?;
        Ok(self.scripts.remove(index))
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Every configured action with a human readable location
    pub fn actions(&self) -> Vec<(String, &Action)> {
        let mut found = Vec::new();

        for (button, binding) in &self.button_mappings {
            collect_binding_actions(&mut found, "base", *button, binding);
        }
        for layer in &self.layers {
            for (button, binding) in &layer.button_mappings {
                collect_binding_actions(&mut found, &layer.name, *button, binding);
            }
        }
        for chord in &self.chords {
            found.push((format!("chord {}", chord.display_string()), &chord.action));
        }
        for sequence in &self.sequences {
            found.push((
                format!("sequence {}", sequence.display_string()),
                &sequence.action,
            ));
        }
        for gesture in &self.gestures {
            if let Some(action) = &gesture.action {
                found.push((format!("gesture {}", gesture.gesture_type), action));
            }
        }
        found
    }

    /// Structural problems, typically from hand-edited or imported files
    pub fn validate(&self) -> Vec<ProfileIssue> {
        let mut issues = Vec::new();

        if self.layers.len() > MAX_LAYERS {
            issues.push(ProfileIssue::TooManyLayers(self.layers.len()));
        }

        let mut activators = BTreeSet::new();
        for layer in &self.layers {
            if let Some(button) = layer.activator_button {
                if !activators.insert(button) {
                    issues.push(ProfileIssue::DuplicateActivator(button));
                }
            }
        }
        for button in &activators {
            if self.button_mappings.contains_key(button) {
                issues.push(ProfileIssue::BindingOnActivator {
                    button: *button,
                    scope: "base".to_string(),
                });
            }
            for layer in &self.layers {
                if layer.button_mappings.contains_key(button) {
                    issues.push(ProfileIssue::BindingOnActivator {
                        button: *button,
                        scope: layer.name.clone(),
                    });
                }
            }
        }

        for (i, chord) in self.chords.iter().enumerate() {
            if chord.buttons.len() < 2 {
                issues.push(ProfileIssue::UndersizedChord(chord.id));
            }
            if let Some(other) = self.chords[i + 1..]
                .iter()
                .find(|c| c.buttons == chord.buttons)
            {
                issues.push(ProfileIssue::DuplicateChord(chord.id, other.id));
            }
        }

        for sequence in &self.sequences {
            if sequence.steps.len() < 2 {
                issues.push(ProfileIssue::ShortSequence(sequence.id));
            }
        }

        let mut gesture_types = BTreeSet::new();
        for gesture in &self.gestures {
            if !gesture_types.insert(gesture.gesture_type) {
                issues.push(ProfileIssue::DuplicateGesture(gesture.gesture_type));
            }
        }

        let all_bindings = self
            .button_mappings
            .iter()
            .map(|(b, binding)| ("base".to_string(), *b, binding))
            .chain(self.layers.iter().flat_map(|layer| {
                layer
                    .button_mappings
                    .iter()
                    .map(|(b, binding)| (layer.name.clone(), *b, binding))
            }));
        for (scope, button, binding) in all_bindings {
            let thresholds = [
                binding.long_hold().map(|m| m.threshold),
                binding.double_tap().map(|m| m.threshold),
                binding.repeat().filter(|r| r.enabled).map(|r| r.interval),
            ];
            for value in thresholds.into_iter().flatten() {
                if !(value.is_finite() && value > 0.0) {
                    issues.push(ProfileIssue::InvalidTiming {
                        button,
                        scope: scope.clone(),
                        value,
                    });
                }
            }
        }

        for (location, action) in self.actions() {
            match action {
                Action::Macro { macro_id } if self.find_macro(*macro_id).is_none() => {
                    issues.push(ProfileIssue::DanglingMacro {
                        location,
                        macro_id: *macro_id,
                    });
                }
                Action::Script { script_id } if self.find_script(*script_id).is_none() => {
                    issues.push(ProfileIssue::DanglingScript {
                        location,
                        script_id: *script_id,
                    });
                }
                _ => {}
            }
        }

        issues
    }
}

fn collect_binding_actions<'a>(
    found: &mut Vec<(String, &'a Action)>,
    scope: &str,
    button: ControllerButton,
    binding: &'a Binding,
) {
    if let Some(action) = binding.action() {
        found.push((format!("{} {}", scope, button), action));
    }
    if let Some(long_hold) = binding.long_hold() {
        found.push((format!("{} {} long hold", scope, button), &long_hold.action));
    }
    if let Some(double_tap) = binding.double_tap() {
        found.push((format!("{} {} double tap", scope, button), &double_tap.action));
    }
}

/// A structural problem found by [`Profile::validate`]
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileIssue {
    TooManyLayers(usize),
    DuplicateActivator(ControllerButton),
    BindingOnActivator {
        button: ControllerButton,
        scope: String,
    },
    UndersizedChord(Uuid),
    DuplicateChord(Uuid, Uuid),
    ShortSequence(Uuid),
    DuplicateGesture(MotionGestureType),
    InvalidTiming {
        button: ControllerButton,
        scope: String,
        value: f64,
    },
    DanglingMacro {
        location: String,
        macro_id: Uuid,
    },
    DanglingScript {
        location: String,
        script_id: Uuid,
    },
}

impl fmt::Display for ProfileIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileIssue::TooManyLayers(n) => {
                write!(f, "{} layers (maximum is {})", n, MAX_LAYERS)
            }
            ProfileIssue::DuplicateActivator(button) => {
                write!(f, "{} activates more than one layer", button)
            }
            ProfileIssue::BindingOnActivator { button, scope } => {
                write!(f, "{} is a layer activator but has a binding in {}", button, scope)
            }
            ProfileIssue::UndersizedChord(id) => write!(f, "chord {} has fewer than 2 buttons", id),
            ProfileIssue::DuplicateChord(a, b) => {
                write!(f, "chords {} and {} use the same buttons", a, b)
            }
            ProfileIssue::ShortSequence(id) => {
                write!(f, "sequence {} has fewer than 2 steps", id)
            }
            ProfileIssue::DuplicateGesture(gesture) => {
                write!(f, "{} is mapped more than once", gesture)
            }
            ProfileIssue::InvalidTiming {
                button,
                scope,
                value,
            } => write!(f, "{} {} has invalid timing {}", scope, button, value),
            ProfileIssue::DanglingMacro { location, macro_id } => {
                write!(f, "{} refers to missing macro {}", location, macro_id)
            }
            ProfileIssue::DanglingScript {
                location,
                script_id,
            } => write!(f, "{} refers to missing script {}", location, script_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::action::SystemCommand;
    use ControllerButton::*;

    fn space() -> Binding {
        Binding::new(Action::key(KeyCode::SPACE))
    }

    #[test]
    fn test_create_layer_rejects_duplicate_activator() {
        let mut profile = Profile::new("Test");
        profile.create_layer("Combat", Some(LeftBumper)).unwrap();

        let err = profile.create_layer("Menu", Some(LeftBumper)).unwrap_err();
        assert_eq!(
            err,
            MappingError::DuplicateActivator {
                button: LeftBumper,
                layer: "Combat".to_string(),
            }
        );
        assert_eq!(profile.layers.len(), 1);
    }

    #[test]
    fn test_create_layer_respects_limit() {
        let mut profile = Profile::new("Test");
        for i in 0..MAX_LAYERS {
            profile.create_layer(format!("Layer {}", i), None).unwrap();
        }
        assert_eq!(
            profile.create_layer("One too many", None).unwrap_err(),
            MappingError::LayerLimit(MAX_LAYERS)
        );
    }

    #[test]
    fn test_activator_removes_existing_bindings() {
        let mut profile = Profile::new("Test");
        profile.set_mapping(RightBumper, space()).unwrap();
        let layer_id = profile.create_layer("Nav", None).unwrap().id;
        profile.set_layer_mapping(layer_id, RightBumper, space()).unwrap();

        let other = profile.create_layer("Other", None).unwrap().id;
        profile.set_layer_activator(other, Some(RightBumper)).unwrap();

        assert!(profile.button_mappings.get(&RightBumper).is_none());
        assert!(profile.layer(layer_id).unwrap().binding(RightBumper).is_none());
        assert!(profile.validate().is_empty());
    }

    #[test]
    fn test_binding_on_activator_rejected() {
        let mut profile = Profile::new("Test");
        let layer_id = profile.create_layer("Nav", Some(LeftBumper)).unwrap().id;

        assert_eq!(
            profile.set_mapping(LeftBumper, space()).unwrap_err(),
            MappingError::ActivatorReserved(LeftBumper)
        );
        assert_eq!(
            profile
                .set_layer_mapping(layer_id, LeftBumper, space())
                .unwrap_err(),
            MappingError::ActivatorReserved(LeftBumper)
        );
    }

    #[test]
    fn test_clearing_activator_keeps_layer() {
        let mut profile = Profile::new("Test");
        let id = profile.create_layer("Nav", Some(LeftBumper)).unwrap().id;

        profile.set_layer_activator(id, None).unwrap();
        assert_eq!(profile.layers.len(), 1);
        assert!(!profile.is_activator(LeftBumper));

        // The freed button can now activate another layer
        assert!(profile.create_layer("Other", Some(LeftBumper)).is_ok());
    }

    #[test]
    fn test_reassigning_own_activator_is_allowed() {
        let mut profile = Profile::new("Test");
        let id = profile.create_layer("Nav", Some(LeftBumper)).unwrap().id;
        assert!(profile.set_layer_activator(id, Some(LeftBumper)).is_ok());
    }

    #[test]
    fn test_delete_layer_removes_bindings() {
        let mut profile = Profile::new("Test");
        let id = profile.create_layer("Nav", Some(LeftBumper)).unwrap().id;
        profile.set_layer_mapping(id, A, space()).unwrap();

        let removed = profile.delete_layer(id).unwrap();
        assert_eq!(removed.button_mappings.len(), 1);
        assert!(profile.layers.is_empty());
        assert!(profile.binding(A, Some(id)).is_none());
        assert_eq!(
            profile.delete_layer(id).unwrap_err(),
            MappingError::UnknownLayer(id)
        );
    }

    #[test]
    fn test_swap_mappings() {
        let mut profile = Profile::new("Test");
        profile.set_mapping(A, space()).unwrap();

        profile.swap_mappings(A, B, None).unwrap();
        assert!(profile.button_mappings.get(&A).is_none());
        assert_eq!(
            profile.button_mappings.get(&B).and_then(Binding::action),
            Some(&Action::key(KeyCode::SPACE))
        );
    }

    #[test]
    fn test_add_chord_rejects_duplicate_set() {
        let mut profile = Profile::new("Test");
        let first = ChordMapping::new([A, B], Action::key(KeyCode::SPACE)).unwrap();
        let first_id = first.id;
        profile.add_chord(first).unwrap();

        let second = ChordMapping::new([B, A], Action::key(KeyCode::RETURN)).unwrap();
        assert_eq!(
            profile.add_chord(second).unwrap_err(),
            MappingError::DuplicateChord { existing: first_id }
        );
        assert_eq!(profile.chords.len(), 1);
    }

    #[test]
    fn test_update_chord_keeps_identity() {
        let mut profile = Profile::new("Test");
        let chord = ChordMapping::new([A, B], Action::key(KeyCode::SPACE)).unwrap();
        let id = chord.id;
        profile.add_chord(chord).unwrap();

        let mut edited = profile.chord(id).unwrap().clone();
        edited.buttons.insert(X);
        let updated = profile.update_chord(edited).unwrap();
        assert_eq!(updated.buttons.len(), 3);
        assert_eq!(profile.chords.len(), 1);
    }

    #[test]
    fn test_set_gesture_replaces_same_type() {
        let mut profile = Profile::new("Test");
        profile.set_gesture(GestureMapping::new(
            MotionGestureType::Shake,
            Action::key(KeyCode::SPACE),
        ));
        profile.set_gesture(GestureMapping::new(
            MotionGestureType::Shake,
            Action::key(KeyCode::ESCAPE),
        ));

        assert_eq!(profile.gestures.len(), 1);
        assert_eq!(
            profile.gesture(MotionGestureType::Shake).unwrap().action,
            Some(Action::key(KeyCode::ESCAPE))
        );
    }

    #[test]
    fn test_validate_reports_dangling_macro() {
        let mut profile = Profile::new("Test");
        let missing = Uuid::new_v4();
        profile
            .set_mapping(Y, Binding::new(Action::Macro { macro_id: missing }))
            .unwrap();

        let issues = profile.validate();
        assert_eq!(issues.len(), 1);
        assert!(matches!(
            &issues[0],
            ProfileIssue::DanglingMacro { macro_id, .. } if *macro_id == missing
        ));
    }

    #[test]
    fn test_validate_reports_hand_edited_duplicates() {
        let mut profile = Profile::new("Test");
        let a = ChordMapping::new([A, B], Action::key(KeyCode::SPACE)).unwrap();
        let b = ChordMapping::new([A, B], Action::key(KeyCode::TAB)).unwrap();
        profile.chords = vec![a, b];
        profile.layers = vec![
            Layer::new("One", Some(LeftBumper)),
            Layer::new("Two", Some(LeftBumper)),
        ];

        let issues = profile.validate();
        assert!(issues
            .iter()
            .any(|i| matches!(i, ProfileIssue::DuplicateChord(..))));
        assert!(issues.contains(&ProfileIssue::DuplicateActivator(LeftBumper)));
    }

    #[test]
    fn test_actions_lists_every_trigger() {
        let mut profile = Profile::new("Test");
        profile.set_mapping(A, space()).unwrap();
        profile
            .add_chord(
                ChordMapping::new(
                    [LeftBumper, RightBumper],
                    Action::system(SystemCommand::OpenLink {
                        url: "https://example.com".to_string(),
                    }),
                )
                .unwrap(),
            )
            .unwrap();

        let actions = profile.actions();
        assert_eq!(actions.len(), 2);
        assert!(actions.iter().any(|(loc, _)| loc == "base A"));
        assert!(actions.iter().any(|(loc, _)| loc.starts_with("chord")));
    }

    #[test]
    fn test_deadzone() {
        let settings = JoystickSettings {
            deadzone: 0.2,
            ..JoystickSettings::default()
        };
        assert_eq!(settings.apply_deadzone(0.1, 0.1), (0.0, 0.0));

        let (x, y) = settings.apply_deadzone(1.0, 0.0);
        assert!((x - 1.0).abs() < 1e-9);
        assert_eq!(y, 0.0);

        let (x, _) = settings.apply_deadzone(0.6, 0.0);
        assert!((x - 0.5).abs() < 1e-9);
    }
}
