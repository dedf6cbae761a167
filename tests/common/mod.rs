//! Shared test helpers for integration tests
//!
//! Note: Functions may appear unused because each test file compiles separately.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use padmap::mapping::{
    Action, Binding, ControllerButton, InputEvent, KeyCode, Profile, Resolution, Resolver,
    SystemCommand,
};

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

pub fn press(button: ControllerButton, at: u64) -> InputEvent {
    InputEvent::press(button, ms(at))
}

pub fn release(button: ControllerButton, at: u64) -> InputEvent {
    InputEvent::release(button, ms(at))
}

pub fn key(code: KeyCode) -> Action {
    Action::key(code)
}

pub fn launch(bundle_id: &str) -> Action {
    Action::system(SystemCommand::LaunchApp {
        bundle_id: bundle_id.to_string(),
        new_window: false,
    })
}

/// Profile with a single base binding per entry
pub fn profile_with(bindings: &[(ControllerButton, Action)]) -> Profile {
    let mut profile = Profile::new("Test");
    for (button, action) in bindings {
        profile
            .set_mapping(*button, Binding::new(action.clone()))
            .expect("test binding should be accepted");
    }
    profile
}

pub fn resolver(profile: Profile) -> Resolver {
    Resolver::new(Arc::new(profile))
}

/// Feed events in order, then tick once at `settle_ms`
pub fn run(resolver: &mut Resolver, events: &[InputEvent], settle_ms: u64) -> Vec<Resolution> {
    let mut fired = Vec::new();
    for event in events {
        fired.extend(resolver.handle_event(*event));
    }
    fired.extend(resolver.tick(ms(settle_ms)));
    fired
}

pub fn actions(fired: &[Resolution]) -> Vec<Action> {
    fired.iter().map(|r| r.action.clone()).collect()
}
