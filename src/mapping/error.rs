//! Validation errors raised while editing profiles

use uuid::Uuid;

use super::types::ControllerButton;

/// Configuration-time validation failures
///
/// These are "cannot save" results handed back to the caller. None of them
/// leave the profile partially modified.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MappingError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("a chord needs at least 2 buttons, got {0}")]
    TooFewChordButtons(usize),

    #[error("a sequence needs at least 2 steps, got {0}")]
    TooFewSequenceSteps(usize),

    #[error("a sequence can have at most {0} steps")]
    TooManySequenceSteps(usize),

    #[error("chord {existing} already uses this button combination")]
    DuplicateChord { existing: Uuid },

    #[error("{button} already activates layer \"{layer}\"")]
    DuplicateActivator {
        button: ControllerButton,
        layer: String,
    },

    #[error("{0} is reserved as a layer activator")]
    ActivatorReserved(ControllerButton),

    #[error("profile already has the maximum of {0} layers")]
    LayerLimit(usize),

    #[error("{0} is not available for this binding")]
    TapVariantUnavailable(&'static str),

    #[error("threshold must be a positive number of seconds, got {0}")]
    InvalidThreshold(f64),

    #[error("unknown layer {0}")]
    UnknownLayer(Uuid),

    #[error("unknown chord {0}")]
    UnknownChord(Uuid),

    #[error("unknown sequence {0}")]
    UnknownSequence(Uuid),

    #[error("unknown macro {0}")]
    UnknownMacro(Uuid),

    #[error("unknown script {0}")]
    UnknownScript(Uuid),

    #[error("unknown profile {0}")]
    UnknownProfile(Uuid),

    #[error("the last remaining profile cannot be deleted")]
    LastProfile,
}
