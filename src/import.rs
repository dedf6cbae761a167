//! Importing profiles from outside the app
//!
//! - Community catalog: a JSON list of downloadable profiles. Downloads use
//!   the regular profile JSON format.
//! - Stream Deck: a collaborator parses the export archive into
//!   [`StreamDeckProfile`]; this module translates it into a [`Profile`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::mapping::{
    Action, Binding, ControllerButton, KeyCode, Macro, MacroStep, Modifiers, Profile,
    SystemCommand,
};
use crate::store::PersistError;

// ============================================================================
// Community catalog
// ============================================================================

/// One downloadable profile in the community catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityProfileEntry {
    pub id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "downloadURL")]
    pub download_url: String,
}

/// Parse the catalog, dropping entries without an id or download URL
pub fn parse_catalog(json: &str) -> Result<Vec<CommunityProfileEntry>, serde_json::Error> {
    let entries: Vec<CommunityProfileEntry> = serde_json::from_str(json)?;
    let total = entries.len();
    let entries: Vec<_> = entries
        .into_iter()
        .filter(|e| !e.id.trim().is_empty() && !e.download_url.trim().is_empty())
        .collect();
    if entries.len() != total {
        tracing::debug!(
            "Dropped {} incomplete catalog entries",
            total - entries.len()
        );
    }
    Ok(entries)
}

/// Parse a downloaded catalog profile
pub fn profile_from_download(json: &str) -> Result<Profile, PersistError> {
    Ok(Profile::from_json(json)?)
}

// ============================================================================
// Stream Deck
// ============================================================================

/// Buttons that receive Stream Deck keys, in key-index order
pub const STREAM_DECK_BUTTON_ORDER: [ControllerButton; 16] = [
    ControllerButton::A,
    ControllerButton::B,
    ControllerButton::X,
    ControllerButton::Y,
    ControllerButton::DpadUp,
    ControllerButton::DpadDown,
    ControllerButton::DpadLeft,
    ControllerButton::DpadRight,
    ControllerButton::LeftBumper,
    ControllerButton::RightBumper,
    ControllerButton::LeftTrigger,
    ControllerButton::RightTrigger,
    ControllerButton::PaddleUpperLeft,
    ControllerButton::PaddleUpperRight,
    ControllerButton::PaddleLowerLeft,
    ControllerButton::PaddleLowerRight,
];

/// Already-parsed Stream Deck profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDeckProfile {
    pub name: String,
    #[serde(default)]
    pub keys: Vec<StreamDeckKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDeckKey {
    pub index: usize,
    #[serde(default)]
    pub title: Option<String>,
    pub action: StreamDeckAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamDeckAction {
    Hotkey {
        key_code: KeyCode,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Open {
        path: String,
    },
    Website {
        url: String,
    },
    Text {
        text: String,
    },
    /// Plugin action this app has no equivalent for
    Plugin {
        uuid: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoFreeButton,
    /// Another key with the same index was already imported
    DuplicateIndex,
    Unsupported(String),
    Empty,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoFreeButton => f.write_str("no controller button left for this key"),
            SkipReason::DuplicateIndex => f.write_str("key index already imported"),
            SkipReason::Unsupported(uuid) => write!(f, "unsupported plugin action {}", uuid),
            SkipReason::Empty => f.write_str("action has no content"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedKey {
    pub index: usize,
    pub title: Option<String>,
    pub reason: SkipReason,
}

/// Result of a Stream Deck import
#[derive(Debug, Clone)]
pub struct StreamDeckImport {
    pub profile: Profile,
    pub skipped: Vec<SkippedKey>,
}

impl StreamDeckProfile {
    /// Translate into a profile; keys that cannot be mapped are reported
    pub fn into_profile(self) -> StreamDeckImport {
        let mut profile = Profile::new(self.name);
        let mut skipped = Vec::new();

        for key in self.keys {
            let skip = |reason| SkippedKey {
                index: key.index,
                title: key.title.clone(),
                reason,
            };
            let Some(&button) = STREAM_DECK_BUTTON_ORDER.get(key.index) else {
                skipped.push(skip(SkipReason::NoFreeButton));
                continue;
            };
            if profile.button_mappings.contains_key(&button) {
                skipped.push(skip(SkipReason::DuplicateIndex));
                continue;
            }
            let action = match key.action {
                StreamDeckAction::Hotkey {
                    key_code,
                    modifiers,
                } => Action::key_with(key_code, modifiers),
                StreamDeckAction::Open { ref path } if path.trim().is_empty() => {
                    skipped.push(skip(SkipReason::Empty));
                    continue;
                }
                StreamDeckAction::Open { ref path } => Action::system(SystemCommand::ShellCommand {
                    command: format!("open {}", shell_quote(path.trim())),
                    run_in_terminal: false,
                }),
                StreamDeckAction::Website { ref url } if url.trim().is_empty() => {
                    skipped.push(skip(SkipReason::Empty));
                    continue;
                }
                StreamDeckAction::Website { ref url } => Action::system(SystemCommand::OpenLink {
                    url: url.trim().to_string(),
                }),
                StreamDeckAction::Text { ref text } if text.is_empty() => {
                    skipped.push(skip(SkipReason::Empty));
                    continue;
                }
                StreamDeckAction::Text { ref text } => {
                    let name = key.title.clone().unwrap_or_else(|| format!("Key {}", key.index));
                    let item = Macro::new(
                        name,
                        vec![MacroStep::TypeText {
                            text: text.clone(),
                            speed: 0,
                        }],
                    );
                    let macro_id = item.id;
                    profile.upsert_macro(item);
                    Action::Macro { macro_id }
                }
                StreamDeckAction::Plugin { ref uuid } => {
                    skipped.push(skip(SkipReason::Unsupported(uuid.clone())));
                    continue;
                }
            };

            let mut binding = Binding::new(action);
            if let Some(title) = key.title.as_deref().filter(|t| !t.trim().is_empty()) {
                binding = binding.with_hint(title.trim());
            }
            profile.button_mappings.insert(button, binding);
        }

        for key in &skipped {
            tracing::debug!("Stream Deck key {} skipped: {}", key.index, key.reason);
        }
        tracing::info!(
            "Imported Stream Deck profile \"{}\" ({} bindings, {} skipped)",
            profile.name,
            profile.button_mappings.len(),
            skipped.len()
        );

        StreamDeckImport { profile, skipped }
    }
}

/// Single-quote `arg` for `/bin/sh`; embedded quotes become `'\''`
fn shell_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', "'\\''"))
}
