//! Usage counters for resolved actions
//!
//! Executors report outcomes from any thread; counters are plain atomics so
//! recording never blocks resolution.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::mapping::{ActionKind, Resolution, Trigger};

const KINDS: [ActionKind; 10] = [
    ActionKind::KeyPress,
    ActionKind::MouseClick,
    ActionKind::SpecialAction,
    ActionKind::Macro,
    ActionKind::Script,
    ActionKind::LaunchApp,
    ActionKind::ShellCommand,
    ActionKind::OpenLink,
    ActionKind::Webhook,
    ActionKind::ObsWebSocket,
];

const TRIGGERS: [Trigger; 7] = [
    Trigger::Press,
    Trigger::Tap,
    Trigger::HoldStart,
    Trigger::HoldEnd,
    Trigger::LongHold,
    Trigger::DoubleTap,
    Trigger::Repeat,
];

#[derive(Debug, Default)]
pub struct ActionStats {
    total: AtomicU64,
    by_kind: [AtomicU64; KINDS.len()],
    by_trigger: [AtomicU64; TRIGGERS.len()],
    webhook_success: AtomicU64,
    webhook_failure: AtomicU64,
}

/// Point-in-time copy of [`ActionStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub total: u64,
    pub by_kind: BTreeMap<ActionKind, u64>,
    pub by_trigger: BTreeMap<Trigger, u64>,
    pub webhook_success: u64,
    pub webhook_failure: u64,
}

impl ActionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, resolution: &Resolution) {
        // Key-up of a held modifier is not a separate use
        if resolution.trigger == Trigger::HoldEnd {
            return;
        }
        self.total.fetch_add(1, Ordering::Relaxed);
        let kind = resolution.action.kind();
        if let Some(i) = KINDS.iter().position(|k| *k == kind) {
            self.by_kind[i].fetch_add(1, Ordering::Relaxed);
        }
        if let Some(i) = TRIGGERS.iter().position(|t| *t == resolution.trigger) {
            self.by_trigger[i].fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Outcome of an HTTP request sent for a webhook action
    pub fn record_webhook(&self, success: bool) {
        let counter = if success {
            &self.webhook_success
        } else {
            &self.webhook_failure
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let nonzero = |counter: &AtomicU64| {
            let n = counter.load(Ordering::Relaxed);
            (n > 0).then_some(n)
        };
        StatsSnapshot {
            total: self.total(),
            by_kind: KINDS
                .iter()
                .zip(&self.by_kind)
                .filter_map(|(kind, c)| nonzero(c).map(|n| (*kind, n)))
                .collect(),
            by_trigger: TRIGGERS
                .iter()
                .zip(&self.by_trigger)
                .filter_map(|(trigger, c)| nonzero(c).map(|n| (*trigger, n)))
                .collect(),
            webhook_success: self.webhook_success.load(Ordering::Relaxed),
            webhook_failure: self.webhook_failure.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        let counters = [&self.total, &self.webhook_success, &self.webhook_failure];
        for counter in counters
            .into_iter()
            .chain(&self.by_kind)
            .chain(&self.by_trigger)
        {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
