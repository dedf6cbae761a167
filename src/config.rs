//! Engine configuration persistence
//!
//! Stores resolver timing and editing defaults in `~/.config/padmap/config.yaml`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::mapping::{
    Action, Binding, DoubleTapMapping, LongHoldMapping, MappingError, RepeatMapping, ResolverSettings,
    DEFAULT_DOUBLE_TAP_THRESHOLD, DEFAULT_LONG_HOLD_THRESHOLD, DEFAULT_REPEAT_INTERVAL,
    DEFAULT_STEP_TIMEOUT,
};

/// Engine configuration that persists across sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum gap between sequence steps
    pub sequence_step_timeout_ms: u64,
    /// Fire repeating bindings immediately on press
    pub repeat_fires_on_press: bool,
    /// Seconds, used when a new long-hold action is added
    pub default_long_hold_threshold: f64,
    /// Seconds, used when a new double-tap action is added
    pub default_double_tap_threshold: f64,
    /// Seconds between repeats, used when repeat is switched on
    pub default_repeat_interval: f64,
    /// Profile storage directory (defaults to the config directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profiles_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sequence_step_timeout_ms: DEFAULT_STEP_TIMEOUT.as_millis() as u64,
            repeat_fires_on_press: true,
            default_long_hold_threshold: DEFAULT_LONG_HOLD_THRESHOLD,
            default_double_tap_threshold: DEFAULT_DOUBLE_TAP_THRESHOLD,
            default_repeat_interval: DEFAULT_REPEAT_INTERVAL,
            profiles_dir: None,
        }
    }
}

impl EngineConfig {
    /// Load config from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = crate::config_paths::config_file() else {
            tracing::debug!("No config directory available, using defaults");
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load config from `path`, falling back to defaults on any error
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str::<Self>(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config.sanitized()
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config at {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save config to disk
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> Result<(), String> {
        let path = crate::config_paths::config_file()
            .ok_or_else(|| "No config directory available".to_string())?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let content = serde_yaml::to_string(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        std::fs::write(path, content)
            .map_err(|e| format!("Failed to write config to {}: {}", path.display(), e))?;

        tracing::info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Replace out-of-range values with defaults
    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        let fix = |name: &str, value: &mut f64, default: f64| {
            if !(value.is_finite() && *value > 0.0) {
                tracing::warn!("Invalid {} {} in config, using {}", name, value, default);
                *value = default;
            }
        };
        fix(
            "default_long_hold_threshold",
            &mut self.default_long_hold_threshold,
            defaults.default_long_hold_threshold,
        );
        fix(
            "default_double_tap_threshold",
            &mut self.default_double_tap_threshold,
            defaults.default_double_tap_threshold,
        );
        fix(
            "default_repeat_interval",
            &mut self.default_repeat_interval,
            defaults.default_repeat_interval,
        );
        if self.sequence_step_timeout_ms == 0 {
            tracing::warn!("sequence_step_timeout_ms must be positive, using default");
            self.sequence_step_timeout_ms = defaults.sequence_step_timeout_ms;
        }
        self
    }

    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            sequence_step_timeout: Duration::from_millis(self.sequence_step_timeout_ms),
            repeat_fires_on_press: self.repeat_fires_on_press,
        }
    }

    /// Profile storage directory: the configured one, else the config directory
    pub fn storage_dir(&self) -> Option<PathBuf> {
        self.profiles_dir
            .clone()
            .or_else(crate::config_paths::config_dir)
    }

    pub fn long_hold(&self, action: Action) -> Result<LongHoldMapping, MappingError> {
        LongHoldMapping::new(action, self.default_long_hold_threshold)
    }

    pub fn double_tap(&self, action: Action) -> Result<DoubleTapMapping, MappingError> {
        DoubleTapMapping::new(action, self.default_double_tap_threshold)
    }

    pub fn repeat(&self) -> Result<RepeatMapping, MappingError> {
        RepeatMapping::new(self.default_repeat_interval)
    }

    /// Binding for `primary` with the requested variants at the configured
    /// timings
    ///
    /// Variants the binding cannot carry are rejected, not dropped.
    pub fn new_binding(
        &self,
        primary: Action,
        long_hold: Option<Action>,
        double_tap: Option<Action>,
        repeat: bool,
    ) -> Result<Binding, MappingError> {
        let mut binding = Binding::new(primary);
        if repeat {
            binding.set_repeat(Some(self.repeat()?));
        }
        if let Some(action) = long_hold {
            binding.set_long_hold(Some(self.long_hold(action)?))?;
        }
        if let Some(action) = double_tap {
            binding.set_double_tap(Some(self.double_tap(action)?))?;
        }
        Ok(binding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::KeyCode;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: EngineConfig =
            serde_yaml::from_str("repeat_fires_on_press: false\n").unwrap();
        assert!(!config.repeat_fires_on_press);
        assert_eq!(config.sequence_step_timeout_ms, 600);
        assert_eq!(config.default_long_hold_threshold, 0.5);
    }

    #[test]
    fn test_sanitize_replaces_invalid_values() {
        let config: EngineConfig = serde_yaml::from_str(
            "default_repeat_interval: -1.0\nsequence_step_timeout_ms: 0\n",
        )
        .unwrap();
        let config = config.sanitized();
        assert_eq!(config.default_repeat_interval, DEFAULT_REPEAT_INTERVAL);
        assert_eq!(config.sequence_step_timeout_ms, 600);
    }

    #[test]
    fn test_resolver_settings() {
        let config = EngineConfig {
            sequence_step_timeout_ms: 250,
            ..EngineConfig::default()
        };
        let settings = config.resolver_settings();
        assert_eq!(settings.sequence_step_timeout, Duration::from_millis(250));
        assert!(settings.repeat_fires_on_press);
    }

    #[test]
    fn test_mapping_defaults() {
        let config = EngineConfig {
            default_long_hold_threshold: 0.8,
            ..EngineConfig::default()
        };
        let long_hold = config.long_hold(Action::key(KeyCode::ESCAPE)).unwrap();
        assert_eq!(long_hold.threshold, 0.8);
        assert_eq!(config.repeat().unwrap().interval, DEFAULT_REPEAT_INTERVAL);
    }

    #[test]
    fn test_new_binding_uses_configured_timings() {
        let config = EngineConfig {
            default_long_hold_threshold: 0.7,
            default_double_tap_threshold: 0.25,
            ..EngineConfig::default()
        };
        let binding = config
            .new_binding(
                Action::key(KeyCode::SPACE),
                Some(Action::key(KeyCode::ESCAPE)),
                Some(Action::key(KeyCode::TAB)),
                false,
            )
            .unwrap();
        assert_eq!(binding.long_hold().unwrap().threshold, 0.7);
        assert_eq!(binding.double_tap().unwrap().threshold, 0.25);
        assert!(!binding.is_repeat_enabled());
    }

    #[test]
    fn test_new_binding_rejects_tap_variant_on_repeat() {
        let config = EngineConfig::default();
        assert_eq!(
            config.new_binding(
                Action::key(KeyCode::DOWN_ARROW),
                None,
                Some(Action::key(KeyCode::TAB)),
                true,
            ),
            Err(MappingError::TapVariantUnavailable("double tap"))
        );
    }
}
