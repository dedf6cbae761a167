//! Controller mapping model and input resolution
//!
//! This module provides the data model for a controller remapping profile
//! and the resolver that turns button edges into actions:
//! - Per-button bindings with long-hold, double-tap, repeat and hold-modifier
//! - Up to four named layers switched by holding an activator button
//! - Chords (simultaneous buttons), sequences (ordered presses) and motion gestures
//! - Macros, scripts and device settings stored alongside the mappings
//!
//! # Architecture
//!
//! ```text
//! InputEvent → Resolver::handle_event() → chord → activator → sequence → binding → Resolution
//!                 Resolver::tick(now)   → long-hold / repeat / lapsed double-tap
//! ```
//!
//! # Loading Profiles
//!
//! ```ignore
//! // Load the embedded default
//! let profile = load_default_profile();
//!
//! // Or load from a JSON file
//! let profile = load_profile_file(Path::new("profile.json"))?;
//! let mut resolver = Resolver::new(Arc::new(profile));
//! ```

mod action;
mod binding;
mod chord;
mod defaults;
mod error;
mod gesture;
mod layer;
mod profile;
mod resolver;
mod sequence;
mod types;

pub use action::{
    Action, ActionKind, HapticStyle, HttpMethod, SystemCommand, SystemCommandCategory,
    SystemCommandForm,
};
pub use binding::{
    Binding, DoubleTapMapping, LongHoldMapping, RepeatMapping, DEFAULT_DOUBLE_TAP_THRESHOLD,
    DEFAULT_LONG_HOLD_THRESHOLD, DEFAULT_REPEAT_INTERVAL,
};
pub use chord::{button_conflicts, check_chord, find_duplicate, ChordMapping};
pub use defaults::{builtin_profile, load_default_profile, load_profile_file, DEFAULT_PROFILE_JSON};
pub use error::MappingError;
pub use gesture::{GestureEvent, GestureMapping, MotionGestureType};
pub use layer::{active_layer, resolve_binding, Layer, MAX_LAYERS};
pub use profile::{
    AppBarItem, JoystickSettings, KeyboardSettings, LedColor, LedSettings, Macro, MacroStep,
    Profile, ProfileIssue, QuickText, Script, StickMode, TouchpadSettings, FORMAT_VERSION,
};
pub use resolver::{
    HeldButton, MatchSource, PendingTap, Resolution, Resolver, ResolverSettings, Trigger,
};
pub use sequence::{check_steps, SequenceMapping, SequenceTracker, DEFAULT_STEP_TIMEOUT};
pub use types::{ControllerButton, InputEvent, KeyCode, Modifiers};
pub(crate) use types::millis;
