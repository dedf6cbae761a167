//! Recorded input scripts replayed through a [`Resolver`]
//!
//! A script is a JSON array of steps:
//!
//! ```text
//! [
//!   {"type": "input", "button": "a", "pressed": true, "at_ms": 0},
//!   {"type": "tick", "at_ms": 100},
//!   {"type": "gesture", "gesture": "shake", "at_ms": 150}
//! ]
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::mapping::{GestureEvent, InputEvent, Resolution, Resolver};
use crate::stats::ActionStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayStep {
    Input(InputEvent),
    Gesture(GestureEvent),
    Tick {
        #[serde(rename = "at_ms", with = "crate::mapping::millis")]
        at: Duration,
    },
}

impl ReplayStep {
    pub fn at(&self) -> Duration {
        match self {
            ReplayStep::Input(event) => event.at,
            ReplayStep::Gesture(event) => event.at,
            ReplayStep::Tick { at } => *at,
        }
    }
}

pub fn parse_script(json: &str) -> Result<Vec<ReplayStep>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Feed every step to `resolver`, in order, recording into `stats`
pub fn replay(
    resolver: &mut Resolver,
    steps: &[ReplayStep],
    stats: &ActionStats,
) -> Vec<Resolution> {
    let mut fired = Vec::new();
    let mut last = Duration::ZERO;
    for step in steps {
        if step.at() < last {
            tracing::warn!(
                "Replay step at {:?} is earlier than the previous step at {:?}",
                step.at(),
                last
            );
        }
        last = last.max(step.at());

        match *step {
            ReplayStep::Input(event) => fired.extend(resolver.handle_event(event)),
            ReplayStep::Gesture(event) => fired.extend(resolver.handle_gesture(event)),
            ReplayStep::Tick { at } => fired.extend(resolver.tick(at)),
        }
    }
    // Settle whatever the last step left due
    fired.extend(resolver.tick(last));
    for resolution in &fired {
        stats.record(resolution);
    }
    fired
}
