//! Binding: one physical button's configured actions within a layer

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::action::{Action, HapticStyle};
use super::error::MappingError;

/// Seconds a button must be held before a long-hold fires
pub const DEFAULT_LONG_HOLD_THRESHOLD: f64 = 0.5;
/// Seconds between a release and the next press that still count as a double tap
pub const DEFAULT_DOUBLE_TAP_THRESHOLD: f64 = 0.3;
/// Seconds between repeated fires while held
pub const DEFAULT_REPEAT_INTERVAL: f64 = 0.2;

/// Convert a seconds value to a duration, treating invalid values as zero
pub(crate) fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

fn check_threshold(threshold: f64) -> Result<(), MappingError> {
    if threshold.is_finite() && threshold > 0.0 {
        Ok(())
    } else {
        Err(MappingError::InvalidThreshold(threshold))
    }
}

/// Alternate action fired when the button is held past a threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongHoldMapping {
    pub action: Action,
    /// Seconds
    pub threshold: f64,
}

impl LongHoldMapping {
    pub fn new(action: Action, threshold: f64) -> Result<Self, MappingError> {
        check_threshold(threshold)?;
        Ok(Self { action, threshold })
    }

    pub fn threshold_duration(&self) -> Duration {
        secs(self.threshold)
    }

    /// True once a press has lasted at least the threshold
    pub fn is_elapsed(&self, held_for: Duration) -> bool {
        held_for >= self.threshold_duration()
    }
}

/// Alternate action fired when the button is pressed twice in quick succession
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoubleTapMapping {
    pub action: Action,
    /// Seconds between the first release and the second press
    pub threshold: f64,
}

impl DoubleTapMapping {
    pub fn new(action: Action, threshold: f64) -> Result<Self, MappingError> {
        check_threshold(threshold)?;
        Ok(Self { action, threshold })
    }

    pub fn threshold_duration(&self) -> Duration {
        secs(self.threshold)
    }

    /// True while a second press would still count as a double tap
    pub fn is_within_window(&self, since_release: Duration) -> bool {
        since_release <= self.threshold_duration()
    }
}

/// Re-fire the primary action while the button is held
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatMapping {
    pub enabled: bool,
    /// Seconds between fires
    pub interval: f64,
}

impl RepeatMapping {
    pub fn new(interval: f64) -> Result<Self, MappingError> {
        check_threshold(interval)?;
        Ok(Self {
            enabled: true,
            interval,
        })
    }

    /// Build from a rate, as shown in the editor ("fires per second")
    pub fn from_rate(per_second: f64) -> Result<Self, MappingError> {
        check_threshold(per_second)?;
        Self::new(1.0 / per_second)
    }

    pub fn rate_per_second(&self) -> f64 {
        if self.interval > 0.0 {
            1.0 / self.interval
        } else {
            0.0
        }
    }

    pub fn interval_duration(&self) -> Duration {
        secs(self.interval)
    }
}

impl Default for RepeatMapping {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: DEFAULT_REPEAT_INTERVAL,
        }
    }
}

/// A physical button's configured actions within one layer
///
/// Fields are private so every edit goes through a setter that keeps the
/// invariants:
/// - hold-modifier and an enabled repeat are mutually exclusive
/// - long-hold and double-tap are absent when the primary is a mouse click or
///   special action, or when hold-modifier or repeat is active
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawBinding")]
pub struct Binding {
    #[serde(skip_serializing_if = "Option::is_none")]
    action: Option<Action>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    is_hold_modifier: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    long_hold: Option<LongHoldMapping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    double_tap: Option<DoubleTapMapping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    repeat: Option<RepeatMapping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    haptic: Option<HapticStyle>,
}

/// Persisted shape of [`Binding`]; normalized on load
#[derive(Deserialize)]
struct RawBinding {
    #[serde(default)]
    action: Option<Action>,
    #[serde(default)]
    is_hold_modifier: bool,
    #[serde(default)]
    long_hold: Option<LongHoldMapping>,
    #[serde(default)]
    double_tap: Option<DoubleTapMapping>,
    #[serde(default)]
    repeat: Option<RepeatMapping>,
    #[serde(default)]
    hint: Option<String>,
    #[serde(default)]
    haptic: Option<HapticStyle>,
}

impl From<RawBinding> for Binding {
    fn from(raw: RawBinding) -> Self {
        let mut binding = Binding {
            action: raw.action,
            is_hold_modifier: raw.is_hold_modifier,
            long_hold: raw.long_hold,
            double_tap: raw.double_tap,
            repeat: raw.repeat,
            hint: raw.hint,
            haptic: raw.haptic,
        };
        // A hand-edited file may enable both; hold-modifier wins
        if binding.is_hold_modifier {
            binding.disable_repeat();
        }
        binding.normalize();
        binding
    }
}

impl Binding {
    /// Binding with a primary action
    pub fn new(action: Action) -> Self {
        let mut binding = Self {
            action: Some(action),
            ..Self::default()
        };
        binding.normalize();
        binding
    }

    // ------------------------------------------------------------------
    // Builders (silently drop what the invariants forbid)
    // ------------------------------------------------------------------

    pub fn with_hold_modifier(mut self) -> Self {
        self.set_hold_modifier(true);
        self
    }

    pub fn with_repeat(mut self, repeat: RepeatMapping) -> Self {
        self.set_repeat(Some(repeat));
        self
    }

    pub fn with_long_hold(mut self, long_hold: LongHoldMapping) -> Self {
        self.long_hold = Some(long_hold);
        self.normalize();
        self
    }

    pub fn with_double_tap(mut self, double_tap: DoubleTapMapping) -> Self {
        self.double_tap = Some(double_tap);
        self.normalize();
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_haptic(mut self, haptic: HapticStyle) -> Self {
        self.haptic = Some(haptic);
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn action(&self) -> Option<&Action> {
        self.action.as_ref()
    }

    pub fn is_hold_modifier(&self) -> bool {
        self.is_hold_modifier
    }

    pub fn long_hold(&self) -> Option<&LongHoldMapping> {
        self.long_hold.as_ref()
    }

    pub fn double_tap(&self) -> Option<&DoubleTapMapping> {
        self.double_tap.as_ref()
    }

    pub fn repeat(&self) -> Option<&RepeatMapping> {
        self.repeat.as_ref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn haptic(&self) -> Option<HapticStyle> {
        self.haptic
    }

    /// Repeat configured and switched on
    pub fn is_repeat_enabled(&self) -> bool {
        self.repeat.as_ref().is_some_and(|r| r.enabled)
    }

    fn primary_excludes_tap_variants(&self) -> bool {
        self.action
            .as_ref()
            .is_some_and(Action::excludes_tap_variants)
    }

    /// Whether a long-hold action can be attached right now
    pub fn allows_long_hold(&self) -> bool {
        !self.primary_excludes_tap_variants() && !self.is_hold_modifier && !self.is_repeat_enabled()
    }

    /// Whether a double-tap action can be attached right now
    pub fn allows_double_tap(&self) -> bool {
        !self.primary_excludes_tap_variants() && !self.is_hold_modifier && !self.is_repeat_enabled()
    }

    /// No primary action and no modifiers
    ///
    /// Long-hold and double-tap are not considered; see [`has_any_action`](Self::has_any_action).
    pub fn is_empty(&self) -> bool {
        self.action.as_ref().map_or(true, Action::is_noop)
    }

    /// Primary, long-hold or double-tap populated
    pub fn has_any_action(&self) -> bool {
        !self.is_empty() || self.long_hold.is_some() || self.double_tap.is_some()
    }

    // ------------------------------------------------------------------
    // Setters
    // ------------------------------------------------------------------

    /// Replace the primary action
    ///
    /// Switching to a mouse click or special action drops long-hold and
    /// double-tap.
    pub fn set_action(&mut self, action: Option<Action>) {
        self.action = action;
        self.normalize();
    }

    /// Turning hold-modifier on disables repeat and drops long-hold and double-tap
    pub fn set_hold_modifier(&mut self, enabled: bool) {
        self.is_hold_modifier = enabled;
        if enabled {
            self.disable_repeat();
        }
        self.normalize();
    }

    /// Enabling repeat turns hold-modifier off and drops long-hold and double-tap
    pub fn set_repeat(&mut self, repeat: Option<RepeatMapping>) {
        self.repeat = repeat;
        if self.is_repeat_enabled() {
            self.is_hold_modifier = false;
        }
        self.normalize();
    }

    pub fn set_long_hold(&mut self, long_hold: Option<LongHoldMapping>) -> Result<(), MappingError> {
        if let Some(ref mapping) = long_hold {
            check_threshold(mapping.threshold)?;
            if !self.allows_long_hold() {
                return Err(MappingError::TapVariantUnavailable("long hold"));
            }
        }
        self.long_hold = long_hold;
        Ok(())
    }

    pub fn set_double_tap(
        &mut self,
        double_tap: Option<DoubleTapMapping>,
    ) -> Result<(), MappingError> {
        if let Some(ref mapping) = double_tap {
            check_threshold(mapping.threshold)?;
            if !self.allows_double_tap() {
                return Err(MappingError::TapVariantUnavailable("double tap"));
            }
        }
        self.double_tap = double_tap;
        Ok(())
    }

    pub fn set_hint(&mut self, hint: Option<String>) {
        self.hint = hint.filter(|h| !h.trim().is_empty());
    }

    pub fn set_haptic(&mut self, haptic: Option<HapticStyle>) {
        self.haptic = haptic;
    }

    fn disable_repeat(&mut self) {
        if let Some(repeat) = self.repeat.as_mut() {
            repeat.enabled = false;
        }
    }

    fn normalize(&mut self) {
        if !self.allows_long_hold() {
            self.long_hold = None;
        }
        if !self.allows_double_tap() {
            self.double_tap = None;
        }
    }

    /// Short description for listings
    pub fn display_string(&self) -> String {
        if let Some(hint) = &self.hint {
            return hint.clone();
        }
        match &self.action {
            Some(action) if !action.is_noop() => action.to_string(),
            _ if self.has_any_action() => "(long hold / double tap only)".to_string(),
            _ => "Unmapped".to_string(),
        }
    }
}
