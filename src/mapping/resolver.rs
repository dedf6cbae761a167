//! Resolver: turns controller input into configured actions
//!
//! The resolver is driven by three inputs:
//! - [`Resolver::handle_event`] for button presses and releases
//! - [`Resolver::handle_gesture`] for recognized motion gestures
//! - [`Resolver::tick`] from a periodic clock, for long-holds, repeats and
//!   expired double-tap windows
//!
//! Time is always passed in, so tests drive it with a simulated clock.
//!
//! # Priority on press
//!
//! ```text
//! exact chord on held set → layer activator (consumed) → sequence → binding
//! ```
//!
//! Bindings resolve in the active layer, falling through to base. Plain
//! bindings fire on release so a chord completed by a later press never
//! double-fires; hold-modifier bindings fire on press and again on release
//! (to let the key go); repeat bindings fire on press (configurable) and then
//! every interval.
//!
//! A tap on a button with a double-tap action is held back until the window
//! lapses or the button is pressed again. Whatever interrupts it, the held
//! back tap fires first.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use super::action::{Action, HapticStyle};
use super::binding::Binding;
use super::gesture::{GestureEvent, MotionGestureType};
use super::layer::active_layer;
use super::profile::Profile;
use super::sequence::{SequenceTracker, DEFAULT_STEP_TIMEOUT};
use super::types::{ControllerButton, InputEvent};

/// Timing policy for the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverSettings {
    /// Maximum gap between consecutive sequence steps
    pub sequence_step_timeout: Duration,
    /// Fire a repeating binding immediately on press, before the first interval
    pub repeat_fires_on_press: bool,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            sequence_step_timeout: DEFAULT_STEP_TIMEOUT,
            repeat_fires_on_press: true,
        }
    }
}

/// Which configured entity produced a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSource {
    Chord(Uuid),
    Sequence(Uuid),
    Binding {
        button: ControllerButton,
        /// `None` for the base layer
        layer: Option<Uuid>,
    },
    Gesture(MotionGestureType),
}

/// The edge or timing condition that fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Chord, sequence or gesture completed
    Press,
    /// Primary action on release
    Tap,
    /// Hold-modifier pressed; keep the action down
    HoldStart,
    /// Hold-modifier released; let the action go
    HoldEnd,
    LongHold,
    DoubleTap,
    Repeat,
}

/// One resolved action
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub action: Action,
    pub source: MatchSource,
    pub trigger: Trigger,
    pub at: Duration,
    pub hint: Option<String>,
    pub haptic: Option<HapticStyle>,
}

impl Resolution {
    fn new(action: &Action, source: MatchSource, trigger: Trigger, at: Duration) -> Self {
        Self {
            action: action.clone(),
            source,
            trigger,
            at,
            hint: None,
            haptic: None,
        }
    }

    fn with_meta(mut self, hint: Option<&str>, haptic: Option<HapticStyle>) -> Self {
        self.hint = hint.map(str::to_string);
        self.haptic = haptic;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeldState {
    /// Waiting for release (or for a long-hold to elapse)
    Pending,
    /// Used by a chord, sequence, activator, long-hold or double-tap
    Consumed,
    /// Hold-modifier is down
    Holding,
    Repeating { next_fire: Duration },
}

/// A button currently held down
#[derive(Debug, Clone)]
pub struct HeldButton {
    pressed_at: Duration,
    layer: Option<Uuid>,
    /// Binding resolved at press time; layer changes while held do not affect it
    binding: Option<Binding>,
    state: HeldState,
}

impl HeldButton {
    pub fn pressed_at(&self) -> Duration {
        self.pressed_at
    }

    pub fn held_for(&self, now: Duration) -> Duration {
        now.saturating_sub(self.pressed_at)
    }

    /// Whether the binding's long-hold threshold has passed
    pub fn is_long_hold_elapsed(&self, now: Duration) -> bool {
        self.binding
            .as_ref()
            .and_then(Binding::long_hold)
            .is_some_and(|m| m.is_elapsed(self.held_for(now)))
    }
}

/// A released button whose primary waits out the double-tap window
#[derive(Debug, Clone)]
pub struct PendingTap {
    released_at: Duration,
    layer: Option<Uuid>,
    binding: Binding,
}

impl PendingTap {
    pub fn released_at(&self) -> Duration {
        self.released_at
    }

    /// Whether a new press would still count as the second tap
    pub fn is_within_double_tap_window(&self, now: Duration) -> bool {
        self.binding
            .double_tap()
            .is_some_and(|m| m.is_within_window(now.saturating_sub(self.released_at)))
    }
}

/// Input-to-action resolver over a profile snapshot
#[derive(Debug, Clone)]
pub struct Resolver {
    profile: Arc<Profile>,
    settings: ResolverSettings,
    held: BTreeMap<ControllerButton, HeldButton>,
    pending_taps: BTreeMap<ControllerButton, PendingTap>,
    sequences: SequenceTracker,
    /// Settled but not yet handed out, oldest first
    queued: Vec<Resolution>,
}

impl Resolver {
    pub fn new(profile: Arc<Profile>) -> Self {
        Self::with_settings(profile, ResolverSettings::default())
    }

    pub fn with_settings(profile: Arc<Profile>, settings: ResolverSettings) -> Self {
        Self {
            profile,
            settings,
            held: BTreeMap::new(),
            pending_taps: BTreeMap::new(),
            sequences: SequenceTracker::new(settings.sequence_step_timeout),
            queued: Vec::new(),
        }
    }

    pub fn profile(&self) -> &Arc<Profile> {
        &self.profile
    }

    pub fn settings(&self) -> ResolverSettings {
        self.settings
    }

    /// Swap in a new profile snapshot between steps
    ///
    /// Held buttons keep the binding they resolved on press, and released
    /// taps waiting out a double-tap window keep theirs until `tick` settles
    /// them. The active layer is recomputed from the new snapshot, so a
    /// deleted layer falls back to base. Sequence history starts over.
    pub fn set_profile(&mut self, profile: Arc<Profile>) {
        self.profile = profile;
        self.sequences.clear();
    }

    /// Forget all input state (e.g. controller disconnected)
    pub fn reset(&mut self) {
        self.held.clear();
        self.pending_taps.clear();
        self.sequences.clear();
        self.queued.clear();
    }

    pub fn held_buttons(&self) -> BTreeSet<ControllerButton> {
        self.held.keys().copied().collect()
    }

    pub fn held(&self, button: ControllerButton) -> Option<&HeldButton> {
        self.held.get(&button)
    }

    pub fn pending_tap(&self, button: ControllerButton) -> Option<&PendingTap> {
        self.pending_taps.get(&button)
    }

    /// Layer whose activator is currently held, `None` for base
    pub fn active_layer_id(&self) -> Option<Uuid> {
        active_layer(&self.profile.layers, &self.held_buttons()).map(|l| l.id)
    }

    pub fn is_long_hold_elapsed(&self, button: ControllerButton, now: Duration) -> bool {
        self.held
            .get(&button)
            .is_some_and(|h| h.is_long_hold_elapsed(now))
    }

    pub fn is_within_double_tap_window(&self, button: ControllerButton, now: Duration) -> bool {
        self.pending_taps
            .get(&button)
            .is_some_and(|t| t.is_within_double_tap_window(now))
    }

    /// Resolve a press or release
    ///
    /// A press can settle an earlier tap as well as fire its own action (a
    /// tap waiting out its double-tap window whose button then joins a
    /// chord). The oldest resolution is returned; the rest are handed out by
    /// later events or the next [`tick`](Self::tick), in order.
    pub fn handle_event(&mut self, event: InputEvent) -> Option<Resolution> {
        tracing::trace!(
            "{} {} at {:?}",
            event.button,
            if event.pressed { "pressed" } else { "released" },
            event.at
        );
        let fired = if event.pressed {
            self.press(event.button, event.at)
        } else {
            self.release(event.button, event.at)
        };
        self.next_in_order(fired)
    }

    /// Resolve a recognized motion gesture
    pub fn handle_gesture(&mut self, event: GestureEvent) -> Option<Resolution> {
        let fired = self.gesture(event);
        self.next_in_order(fired)
    }

    fn gesture(&self, event: GestureEvent) -> Option<Resolution> {
        let GestureEvent { gesture, at } = event;
        let mapping = self.profile.gesture(gesture).filter(|g| g.has_action())?;
        let action = mapping.action.as_ref()?;
        tracing::debug!("Gesture {} matched", gesture);
        Some(
            Resolution::new(action, MatchSource::Gesture(gesture), Trigger::Press, at)
                .with_meta(mapping.hint.as_deref(), mapping.haptic),
        )
    }

    /// Hand out the oldest settled resolution, queueing `fired` behind it
    fn next_in_order(&mut self, fired: Option<Resolution>) -> Option<Resolution> {
        if self.queued.is_empty() {
            return fired;
        }
        self.queued.extend(fired);
        Some(self.queued.remove(0))
    }

    fn press(&mut self, button: ControllerButton, at: Duration) -> Option<Resolution> {
        if self.held.contains_key(&button) {
            // Repeated press without release; the controller service already
            // reported this edge
            return None;
        }
        let profile = Arc::clone(&self.profile);
        self.held.insert(
            button,
            HeldButton {
                pressed_at: at,
                layer: None,
                binding: None,
                state: HeldState::Pending,
            },
        );
        let held_set = self.held_buttons();

        // 1. Exact chord on the held set
        if held_set.len() >= 2 {
            if let Some(chord) = profile.chords.iter().find(|c| c.matches(&held_set)) {
                tracing::debug!("Chord {} matched", chord.display_string());
                for member in &chord.buttons {
                    self.settle_pending_tap(*member, at);
                    if let Some(held) = self.held.get_mut(member) {
                        // A hold-modifier already down still needs its release
                        if held.state != HeldState::Holding {
                            held.state = HeldState::Consumed;
                        }
                    }
                }
                return Some(
                    Resolution::new(&chord.action, MatchSource::Chord(chord.id), Trigger::Press, at)
                        .with_meta(chord.hint.as_deref(), chord.haptic),
                );
            }
        }

        // 2. Layer activators only switch layers
        if profile.is_activator(button) {
            self.consume(button);
            self.settle_pending_tap(button, at);
            return None;
        }

        // 3. Sequences
        self.sequences.record(button, at);
        if let Some(sequence) = self.sequences.find_match(&profile.sequences) {
            tracing::debug!("Sequence {} matched", sequence.display_string());
            self.sequences.clear();
            self.settle_pending_tap(button, at);
            self.consume(button);
            return Some(
                Resolution::new(
                    &sequence.action,
                    MatchSource::Sequence(sequence.id),
                    Trigger::Press,
                    at,
                )
                .with_meta(sequence.hint.as_deref(), sequence.haptic),
            );
        }

        // 4. Per-button binding in the active layer
        // Record the layer the binding actually came from
        let layer = active_layer(&profile.layers, &held_set)
            .filter(|l| l.binding(button).is_some_and(Binding::has_any_action))
            .map(|l| l.id);
        let Some(binding) = profile.binding(button, layer).cloned() else {
            self.consume(button);
            self.settle_pending_tap(button, at);
            return None;
        };
        let source = MatchSource::Binding { button, layer };

        if let Some(tap) = self.pending_taps.remove(&button) {
            if tap.is_within_double_tap_window(at) {
                self.consume(button);
                self.remember_binding(button, layer, binding);
                return tap.binding.double_tap().map(|m| {
                    Resolution::new(
                        &m.action,
                        MatchSource::Binding {
                            button,
                            layer: tap.layer,
                        },
                        Trigger::DoubleTap,
                        at,
                    )
                    .with_meta(tap.binding.hint(), tap.binding.haptic())
                });
            }
            // The window lapsed before the clock settled it
            self.queue_tap(button, tap, at);
        }

        let fired = if binding.is_hold_modifier() && !binding.is_empty() {
            self.set_state(button, HeldState::Holding);
            binding
                .action()
                .map(|action| Resolution::new(action, source, Trigger::HoldStart, at))
        } else if let (true, Some(action), Some(repeat)) =
            (binding.is_repeat_enabled(), binding.action(), binding.repeat())
        {
            let interval = repeat.interval_duration();
            self.set_state(
                button,
                HeldState::Repeating {
                    next_fire: at + interval,
                },
            );
            self.settings
                .repeat_fires_on_press
                .then(|| Resolution::new(action, source, Trigger::Repeat, at))
        } else {
            None
        };

        self.remember_binding(button, layer, binding.clone());
        fired.map(|r| r.with_meta(binding.hint(), binding.haptic()))
    }

    fn release(&mut self, button: ControllerButton, at: Duration) -> Option<Resolution> {
        let held = self.held.remove(&button)?;
        let binding = held.binding?;
        let source = MatchSource::Binding {
            button,
            layer: held.layer,
        };

        let fired = match held.state {
            HeldState::Consumed | HeldState::Repeating { .. } => None,
            HeldState::Holding => binding
                .action()
                .map(|action| Resolution::new(action, source, Trigger::HoldEnd, at)),
            HeldState::Pending => {
                if let Some(long_hold) = binding
                    .long_hold()
                    .filter(|m| m.is_elapsed(at.saturating_sub(held.pressed_at)))
                {
                    Some(Resolution::new(&long_hold.action, source, Trigger::LongHold, at))
                } else if binding.double_tap().is_some() {
                    self.pending_taps.insert(
                        button,
                        PendingTap {
                            released_at: at,
                            layer: held.layer,
                            binding,
                        },
                    );
                    return None;
                } else {
                    return primary_tap(button, held.layer, &binding, at);
                }
            }
        };
        fired.map(|r| r.with_meta(binding.hint(), binding.haptic()))
    }

    /// Fire elapsed long-holds, due repeats and lapsed double-tap windows
    ///
    /// Resolutions settled by earlier events come first, then at most one
    /// resolution per button per due fire.
    pub fn tick(&mut self, now: Duration) -> Vec<Resolution> {
        let mut fired = std::mem::take(&mut self.queued);

        for (&button, held) in self.held.iter_mut() {
            let Some(binding) = held.binding.as_ref() else {
                continue;
            };
            let source = MatchSource::Binding {
                button,
                layer: held.layer,
            };
            match held.state {
                HeldState::Pending => {
                    if let Some(long_hold) = binding
                        .long_hold()
                        .filter(|m| m.is_elapsed(now.saturating_sub(held.pressed_at)))
                    {
                        held.state = HeldState::Consumed;
                        fired.push(
                            Resolution::new(&long_hold.action, source, Trigger::LongHold, now)
                                .with_meta(binding.hint(), binding.haptic()),
                        );
                    }
                }
                HeldState::Repeating { mut next_fire } => {
                    let (Some(action), Some(repeat)) = (binding.action(), binding.repeat()) else {
                        continue;
                    };
                    let interval = repeat.interval_duration();
                    if interval.is_zero() {
                        continue;
                    }
                    while next_fire <= now {
                        fired.push(
                            Resolution::new(action, source, Trigger::Repeat, next_fire)
                                .with_meta(binding.hint(), binding.haptic()),
                        );
                        next_fire += interval;
                    }
                    held.state = HeldState::Repeating { next_fire };
                }
                HeldState::Consumed | HeldState::Holding => {}
            }
        }

        let lapsed: Vec<ControllerButton> = self
            .pending_taps
            .iter()
            .filter(|(_, tap)| !tap.is_within_double_tap_window(now))
            .map(|(button, _)| *button)
            .collect();
        for button in lapsed {
            if let Some(tap) = self.pending_taps.remove(&button) {
                fired.extend(primary_tap(button, tap.layer, &tap.binding, now));
            }
        }

        fired
    }

    fn set_state(&mut self, button: ControllerButton, state: HeldState) {
        if let Some(held) = self.held.get_mut(&button) {
            held.state = state;
        }
    }

    fn consume(&mut self, button: ControllerButton) {
        self.set_state(button, HeldState::Consumed);
    }

    fn remember_binding(&mut self, button: ControllerButton, layer: Option<Uuid>, binding: Binding) {
        if let Some(held) = self.held.get_mut(&button) {
            held.layer = layer;
            held.binding = Some(binding);
        }
    }

    /// Fire the primary of a tap still waiting on `button`, if any
    fn settle_pending_tap(&mut self, button: ControllerButton, at: Duration) {
        if let Some(tap) = self.pending_taps.remove(&button) {
            self.queue_tap(button, tap, at);
        }
    }

    fn queue_tap(&mut self, button: ControllerButton, tap: PendingTap, at: Duration) {
        self.queued
            .extend(primary_tap(button, tap.layer, &tap.binding, at));
    }
}

fn primary_tap(
    button: ControllerButton,
    layer: Option<Uuid>,
    binding: &Binding,
    at: Duration,
) -> Option<Resolution> {
    if binding.is_empty() {
        return None;
    }
    let action = binding.action()?;
    Some(
        Resolution::new(action, MatchSource::Binding { button, layer }, Trigger::Tap, at)
            .with_meta(binding.hint(), binding.haptic()),
    )
}
