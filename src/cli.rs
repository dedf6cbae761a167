//! Command-line argument parsing
//!
//! Supports:
//! - Validating profile files
//! - Replaying recorded input through the resolver
//! - Exporting the built-in default profile
//! - Importing Stream Deck exports and listing community catalogs
//! - Binding buttons in the active stored profile
//! - Writing the default config and showing where files live

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::mapping::{ControllerButton, KeyCode};

/// Controller remapping engine
#[derive(Parser, Debug)]
#[command(name = "padmap", version, about = "Controller remapping engine")]
pub struct CliArgs {
    /// Log debug output to the console (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to ~/.config/padmap/config.yaml)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check a profile file for problems
    Validate {
        #[arg(value_name = "PROFILE")]
        path: PathBuf,
    },

    /// Resolve a recorded input script against a profile
    Replay {
        /// Input script (JSON array of steps)
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,

        /// Profile to use instead of the active stored profile
        #[arg(short, long, value_name = "PROFILE")]
        profile: Option<PathBuf>,

        /// Print resolutions as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Write the built-in default profile
    ExportDefault {
        /// Output file (stdout if omitted)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Translate a parsed Stream Deck export into a profile
    ImportStreamDeck {
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Write the profile here instead of adding it to the profile store
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// List the entries of a community catalog file
    Catalog {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    /// List stored profiles
    Profiles,

    /// Bind a button in the active stored profile
    ///
    /// Long-hold, double-tap and repeat use the timings from the config file.
    Bind {
        /// Button name, e.g. `a` or `left_bumper`
        #[arg(value_name = "BUTTON", value_parser = parse_button)]
        button: ControllerButton,

        /// Virtual key code of the primary action
        #[arg(long, value_name = "CODE", value_parser = parse_key_code)]
        key: KeyCode,

        /// Key code fired when the button is held past the threshold
        #[arg(long, value_name = "CODE", value_parser = parse_key_code)]
        long_hold: Option<KeyCode>,

        /// Key code fired on a quick second press
        #[arg(long, value_name = "CODE", value_parser = parse_key_code)]
        double_tap: Option<KeyCode>,

        /// Repeat the primary while held
        #[arg(long)]
        repeat: bool,
    },

    /// Write the default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show config, profile store and log locations
    Paths,
}

/// Parse a button by its profile name
pub fn parse_button(name: &str) -> Result<ControllerButton, String> {
    serde_json::from_value(serde_json::Value::String(name.to_ascii_lowercase()))
        .map_err(|_| format!("unknown button '{}'", name))
}

/// Parse a key code, decimal or `0x` hex
pub fn parse_key_code(value: &str) -> Result<KeyCode, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed
        .map(KeyCode)
        .map_err(|e| format!("invalid key code '{}': {}", value, e))
}
