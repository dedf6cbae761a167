//! padmap - controller remapping engine
//!
//! This crate provides the mapping model (bindings, layers, chords, sequences,
//! gestures) and the resolver that turns controller input into actions, along
//! with profile storage and import.

pub mod cli;
pub mod config;
pub mod config_paths;
pub mod import;
pub mod mapping;
pub mod replay;
pub mod stats;
pub mod store;
pub mod tracing;

// Re-export commonly used types
pub use config::EngineConfig;
pub use mapping::{Action, Binding, Profile, Resolution, Resolver};
pub use store::ProfileManager;
