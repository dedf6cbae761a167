//! Action and SystemCommand sum types
//!
//! An [`Action`] is the outcome a trigger resolves to. Exactly one variant is
//! populated at a time; there are no nullable leftovers from other variants.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::MappingError;
use super::types::{KeyCode, Modifiers};

/// What a resolved trigger does
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Press a key with modifiers. A key press without a key code is a
    /// modifier-only mapping (e.g. holding ⌘).
    KeyPress {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key_code: Option<KeyCode>,
        #[serde(default)]
        modifiers: Modifiers,
    },
    /// Run a macro defined in the profile
    Macro { macro_id: Uuid },
    /// Run a script defined in the profile
    Script { script_id: Uuid },
    /// Run a system command
    SystemCommand { command: SystemCommand },
}

/// Coarse action category, used for statistics and display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    KeyPress,
    MouseClick,
    SpecialAction,
    Macro,
    Script,
    LaunchApp,
    ShellCommand,
    OpenLink,
    Webhook,
    ObsWebSocket,
}

impl Action {
    /// Key press with no modifiers
    pub fn key(key_code: KeyCode) -> Self {
        Action::KeyPress {
            key_code: Some(key_code),
            modifiers: Modifiers::NONE,
        }
    }

    /// Key press with modifiers
    pub fn key_with(key_code: KeyCode, modifiers: Modifiers) -> Self {
        Action::KeyPress {
            key_code: Some(key_code),
            modifiers,
        }
    }

    /// Modifier-only mapping
    pub fn modifiers(modifiers: Modifiers) -> Self {
        Action::KeyPress {
            key_code: None,
            modifiers,
        }
    }

    pub fn system(command: SystemCommand) -> Self {
        Action::SystemCommand { command }
    }

    /// Key code of a key press, if any
    pub fn key_code(&self) -> Option<KeyCode> {
        match self {
            Action::KeyPress { key_code, .. } => *key_code,
            _ => None,
        }
    }

    pub fn is_mouse_click(&self) -> bool {
        self.key_code().is_some_and(KeyCode::is_mouse_click)
    }

    pub fn is_special_action(&self) -> bool {
        self.key_code().is_some_and(KeyCode::is_special_action)
    }

    /// Mouse clicks and special actions get their own double-click and
    /// press-and-hold semantics from the OS, so long-hold and double-tap
    /// variants cannot be layered on top of them.
    pub fn excludes_tap_variants(&self) -> bool {
        self.is_mouse_click() || self.is_special_action()
    }

    /// A key press with neither a key code nor modifiers does nothing
    pub fn is_noop(&self) -> bool {
        matches!(
            self,
            Action::KeyPress {
                key_code: None,
                modifiers
            } if modifiers.is_empty()
        )
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Action::KeyPress { key_code, .. } => match key_code {
                Some(code) if code.is_mouse_click() => ActionKind::MouseClick,
                Some(code) if code.is_special_action() => ActionKind::SpecialAction,
                _ => ActionKind::KeyPress,
            },
            Action::Macro { .. } => ActionKind::Macro,
            Action::Script { .. } => ActionKind::Script,
            Action::SystemCommand { command } => command.kind(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::KeyPress {
                key_code,
                modifiers,
            } => match key_code {
                Some(code) => write!(f, "{}{}", modifiers, code),
                None => write!(f, "{}", modifiers),
            },
            Action::Macro { macro_id } => write!(f, "Macro {}", macro_id),
            Action::Script { script_id } => write!(f, "Script {}", script_id),
            Action::SystemCommand { command } => write!(f, "{}", command),
        }
    }
}

const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// HTTP verb for webhook requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Methods that send the request body
    pub fn carries_body(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// An OS-level side effect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SystemCommand {
    LaunchApp {
        bundle_id: String,
        #[serde(default)]
        new_window: bool,
    },
    ShellCommand {
        command: String,
        #[serde(default)]
        run_in_terminal: bool,
    },
    OpenLink {
        url: String,
    },
    HttpRequest {
        url: String,
        #[serde(default)]
        method: HttpMethod,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        headers: Option<BTreeMap<String, String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,
    },
    ObsWebSocket {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
        request_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_data: Option<String>,
    },
}

impl SystemCommand {
    pub fn category(&self) -> SystemCommandCategory {
        match self {
            SystemCommand::LaunchApp { .. } => SystemCommandCategory::LaunchApp,
            SystemCommand::ShellCommand { .. } => SystemCommandCategory::ShellCommand,
            SystemCommand::OpenLink { .. } => SystemCommandCategory::OpenLink,
            SystemCommand::HttpRequest { .. } => SystemCommandCategory::HttpRequest,
            SystemCommand::ObsWebSocket { .. } => SystemCommandCategory::ObsWebSocket,
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self.category() {
            SystemCommandCategory::LaunchApp => ActionKind::LaunchApp,
            SystemCommandCategory::ShellCommand => ActionKind::ShellCommand,
            SystemCommandCategory::OpenLink => ActionKind::OpenLink,
            SystemCommandCategory::HttpRequest => ActionKind::Webhook,
            SystemCommandCategory::ObsWebSocket => ActionKind::ObsWebSocket,
        }
    }

    /// Headers an HTTP request goes out with
    ///
    /// Methods that carry a body default to `Content-Type: application/json`.
    /// Custom headers are applied on top and replace a default of the same
    /// name, compared case-insensitively. `None` for other commands.
    pub fn effective_headers(&self) -> Option<BTreeMap<String, String>> {
        let SystemCommand::HttpRequest {
            method, headers, ..
        } = self
        else {
            return None;
        };
        let mut merged = BTreeMap::new();
        if method.carries_body() {
            merged.insert("Content-Type".to_string(), DEFAULT_CONTENT_TYPE.to_string());
        }
        for (name, value) in headers.iter().flatten() {
            merged.retain(|existing: &String, _| !existing.eq_ignore_ascii_case(name));
            merged.insert(name.clone(), value.clone());
        }
        Some(merged)
    }

    /// Body bytes an HTTP request sends; empty for methods without a body
    pub fn request_body(&self) -> Option<&[u8]> {
        match self {
            SystemCommand::HttpRequest { method, body, .. } if method.carries_body() => {
                Some(body.as_deref().unwrap_or_default().as_bytes())
            }
            SystemCommand::HttpRequest { .. } => Some(&[][..]),
            _ => None,
        }
    }
}

impl fmt::Display for SystemCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemCommand::LaunchApp { bundle_id, .. } => write!(f, "Launch {}", bundle_id),
            SystemCommand::ShellCommand { command, .. } => write!(f, "Shell: {}", command),
            SystemCommand::OpenLink { url } => write!(f, "Open {}", url),
            SystemCommand::HttpRequest { url, method, .. } => write!(f, "{} {}", method, url),
            SystemCommand::ObsWebSocket { request_type, .. } => {
                write!(f, "OBS: {}", request_type)
            }
        }
    }
}

/// The category selected in a system command editor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemCommandCategory {
    #[default]
    LaunchApp,
    ShellCommand,
    OpenLink,
    HttpRequest,
    ObsWebSocket,
}

/// Raw editor fields for a system command
///
/// Only the fields relevant to `category` are read by [`build`](Self::build).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemCommandForm {
    pub category: SystemCommandCategory,
    pub bundle_id: String,
    pub new_window: bool,
    pub command: String,
    pub run_in_terminal: bool,
    pub url: String,
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub password: String,
    pub request_type: String,
    pub request_data: String,
}

impl SystemCommandForm {
    pub fn new(category: SystemCommandCategory) -> Self {
        Self {
            category,
            ..Self::default()
        }
    }

    /// Prefill the form from an existing command
    pub fn from_command(command: &SystemCommand) -> Self {
        let mut form = Self::new(command.category());
        match command {
            SystemCommand::LaunchApp {
                bundle_id,
                new_window,
            } => {
                form.bundle_id = bundle_id.clone();
                form.new_window = *new_window;
            }
            SystemCommand::ShellCommand {
                command,
                run_in_terminal,
            } => {
                form.command = command.clone();
                form.run_in_terminal = *run_in_terminal;
            }
            SystemCommand::OpenLink { url } => form.url = url.clone(),
            SystemCommand::HttpRequest {
                url,
                method,
                headers,
                body,
            } => {
                form.url = url.clone();
                form.method = *method;
                form.headers = headers
                    .iter()
                    .flatten()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                form.body = body.clone().unwrap_or_default();
            }
            SystemCommand::ObsWebSocket {
                url,
                password,
                request_type,
                request_data,
            } => {
                form.url = url.clone();
                form.password = password.clone().unwrap_or_default();
                form.request_type = request_type.clone();
                form.request_data = request_data.clone().unwrap_or_default();
            }
        }
        form
    }

    /// Build a command from the form, or report the missing required field
    pub fn build(&self) -> Result<SystemCommand, MappingError> {
        match self.category {
            SystemCommandCategory::LaunchApp => Ok(SystemCommand::LaunchApp {
                bundle_id: required(&self.bundle_id, "bundle id")?,
                new_window: self.new_window,
            }),
            SystemCommandCategory::ShellCommand => Ok(SystemCommand::ShellCommand {
                command: required(&self.command, "command")?,
                run_in_terminal: self.run_in_terminal,
            }),
            SystemCommandCategory::OpenLink => Ok(SystemCommand::OpenLink {
                url: required(&self.url, "url")?,
            }),
            SystemCommandCategory::HttpRequest => {
                let url = required(&self.url, "url")?;
                let headers: BTreeMap<String, String> = self
                    .headers
                    .iter()
                    .filter(|(key, _)| !key.trim().is_empty())
                    .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
                    .collect();
                Ok(SystemCommand::HttpRequest {
                    url,
                    method: self.method,
                    headers: (!headers.is_empty()).then_some(headers),
                    body: optional(&self.body),
                })
            }
            SystemCommandCategory::ObsWebSocket => Ok(SystemCommand::ObsWebSocket {
                url: required(&self.url, "url")?,
                password: optional(&self.password),
                request_type: required(&self.request_type, "request type")?,
                request_data: optional(&self.request_data),
            }),
        }
    }
}

fn required(value: &str, field: &'static str) -> Result<String, MappingError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(MappingError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Blank means absent; anything else is kept exactly as typed
fn optional(value: &str) -> Option<String> {
    (!value.trim().is_empty()).then(|| value.to_string())
}

/// Haptic feedback played when a mapping fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HapticStyle {
    Light,
    Medium,
    Heavy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_app_requires_bundle_id() {
        let mut form = SystemCommandForm::new(SystemCommandCategory::LaunchApp);
        form.bundle_id = "   ".to_string();
        assert_eq!(form.build(), Err(MappingError::MissingField("bundle id")));

        form.bundle_id = " com.apple.Safari ".to_string();
        form.new_window = true;
        assert_eq!(
            form.build(),
            Ok(SystemCommand::LaunchApp {
                bundle_id: "com.apple.Safari".to_string(),
                new_window: true,
            })
        );
    }

    #[test]
    fn test_shell_command_requires_text() {
        let form = SystemCommandForm::new(SystemCommandCategory::ShellCommand);
        assert_eq!(form.build(), Err(MappingError::MissingField("command")));
    }

    #[test]
    fn test_open_link_requires_url() {
        let mut form = SystemCommandForm::new(SystemCommandCategory::OpenLink);
        form.url = "\t".to_string();
        assert!(form.build().is_err());

        form.url = "https://example.com".to_string();
        assert_eq!(
            form.build(),
            Ok(SystemCommand::OpenLink {
                url: "https://example.com".to_string()
            })
        );
    }

    #[test]
    fn test_http_request_normalizes_blank_body_and_headers() {
        let mut form = SystemCommandForm::new(SystemCommandCategory::HttpRequest);
        form.url = "https://hooks.example.com/x".to_string();
        form.method = HttpMethod::Put;
        form.body = "  ".to_string();
        form.headers = vec![(" ".to_string(), "ignored".to_string())];

        assert_eq!(
            form.build(),
            Ok(SystemCommand::HttpRequest {
                url: "https://hooks.example.com/x".to_string(),
                method: HttpMethod::Put,
                headers: None,
                body: None,
            })
        );
    }

    #[test]
    fn test_http_request_keeps_headers() {
        let mut form = SystemCommandForm::new(SystemCommandCategory::HttpRequest);
        form.url = "https://hooks.example.com/x".to_string();
        form.headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        form.body = r#"{"on":true}"#.to_string();

        let SystemCommand::HttpRequest { headers, body, .. } = form.build().unwrap() else {
            panic!("expected http request");
        };
        assert_eq!(
            headers.unwrap().get("Content-Type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(body.as_deref(), Some(r#"{"on":true}"#));
    }

    #[test]
    fn test_obs_requires_url_and_request_type() {
        let mut form = SystemCommandForm::new(SystemCommandCategory::ObsWebSocket);
        form.url = "ws://localhost:4455".to_string();
        assert_eq!(form.build(), Err(MappingError::MissingField("request type")));

        form.request_type = "StartRecord".to_string();
        form.password = " ".to_string();
        assert_eq!(
            form.build(),
            Ok(SystemCommand::ObsWebSocket {
                url: "ws://localhost:4455".to_string(),
                password: None,
                request_type: "StartRecord".to_string(),
                request_data: None,
            })
        );
    }

    #[test]
    fn test_form_prefill_round_trips() {
        let command = SystemCommand::ObsWebSocket {
            url: "ws://localhost:4455".to_string(),
            password: Some("secret".to_string()),
            request_type: "SetCurrentProgramScene".to_string(),
            request_data: Some(r#"{"sceneName":"Game"}"#.to_string()),
        };
        assert_eq!(SystemCommandForm::from_command(&command).build(), Ok(command));
    }

    #[test]
    fn test_action_classification() {
        assert!(Action::key(KeyCode::MOUSE_LEFT_CLICK).excludes_tap_variants());
        assert!(Action::key(KeyCode::SHOW_ON_SCREEN_KEYBOARD).excludes_tap_variants());
        assert!(!Action::key(KeyCode::SPACE).excludes_tap_variants());

        assert_eq!(Action::key(KeyCode::MOUSE_RIGHT_CLICK).kind(), ActionKind::MouseClick);
        assert!(Action::modifiers(Modifiers::NONE).is_noop());
        assert!(!Action::modifiers(Modifiers::COMMAND).is_noop());
    }

    #[test]
    fn test_action_json_is_tagged() {
        let action = Action::system(SystemCommand::OpenLink {
            url: "https://example.com".to_string(),
        });
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "system_command");
        assert_eq!(json["command"]["kind"], "open_link");
    }

    #[test]
    fn test_optional_fields_keep_surrounding_whitespace() {
        let mut form = SystemCommandForm::new(SystemCommandCategory::ObsWebSocket);
        form.url = "ws://localhost:4455".to_string();
        form.request_type = "StartRecord".to_string();
        form.password = " hunter2 ".to_string();
        form.request_data = "{\"a\": 1}\n".to_string();

        let SystemCommand::ObsWebSocket {
            password,
            request_data,
            ..
        } = form.build().unwrap()
        else {
            panic!("expected obs request");
        };
        assert_eq!(password.as_deref(), Some(" hunter2 "));
        assert_eq!(request_data.as_deref(), Some("{\"a\": 1}\n"));

        let mut form = SystemCommandForm::new(SystemCommandCategory::HttpRequest);
        form.url = "https://hooks.example.com/x".to_string();
        form.body = "  indented\n".to_string();
        let SystemCommand::HttpRequest { body, .. } = form.build().unwrap() else {
            panic!("expected http request");
        };
        assert_eq!(body.as_deref(), Some("  indented\n"));
    }

    fn webhook(method: HttpMethod, headers: &[(&str, &str)]) -> SystemCommand {
        let headers: BTreeMap<String, String> = headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SystemCommand::HttpRequest {
            url: "https://hooks.example.com/x".to_string(),
            method,
            headers: (!headers.is_empty()).then_some(headers),
            body: Some(r#"{"scene":"Lecture Mode"}"#.to_string()),
        }
    }

    #[test]
    fn test_effective_headers_default_json_and_merge_custom() {
        let post = webhook(HttpMethod::Post, &[("X-API-Key", "obs-key-123")]);
        let headers = post.effective_headers().unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers["Content-Type"], "application/json");
        assert_eq!(headers["X-API-Key"], "obs-key-123");

        let overridden = webhook(HttpMethod::Put, &[("content-type", "text/plain")]);
        let headers = overridden.effective_headers().unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["content-type"], "text/plain");

        for method in [HttpMethod::Get, HttpMethod::Delete] {
            let headers = webhook(method, &[]).effective_headers().unwrap();
            assert!(headers.is_empty(), "{} should not default a content type", method);
        }
        for method in [HttpMethod::Post, HttpMethod::Put, HttpMethod::Patch] {
            let headers = webhook(method, &[]).effective_headers().unwrap();
            assert_eq!(headers.len(), 1, "{}", method);
        }

        let link = SystemCommand::OpenLink {
            url: "https://example.com".to_string(),
        };
        assert_eq!(link.effective_headers(), None);
    }

    #[test]
    fn test_request_body_only_for_body_methods() {
        let body = r#"{"scene":"Lecture Mode"}"#.as_bytes();
        assert_eq!(webhook(HttpMethod::Patch, &[]).request_body(), Some(body));
        assert_eq!(webhook(HttpMethod::Get, &[]).request_body(), Some(&[][..]));
        let shell = SystemCommand::ShellCommand {
            command: "true".to_string(),
            run_in_terminal: false,
        };
        assert_eq!(shell.request_body(), None);
    }
}
