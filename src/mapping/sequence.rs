//! Sequences: an action fired by pressing buttons one after another

use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::action::{Action, HapticStyle};
use super::error::MappingError;
use super::types::ControllerButton;

/// Maximum gap between consecutive steps
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_millis(600);

/// Presses remembered for matching; longer sequences cannot match
const HISTORY_CAPACITY: usize = 16;

/// Ordered multi-step trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceMapping {
    pub id: Uuid,
    pub steps: Vec<ControllerButton>,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub haptic: Option<HapticStyle>,
}

impl SequenceMapping {
    pub fn new(steps: Vec<ControllerButton>, action: Action) -> Result<Self, MappingError> {
        check_steps(&steps)?;
        Ok(Self {
            id: Uuid::new_v4(),
            steps,
            action,
            hint: None,
            haptic: None,
        })
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn display_string(&self) -> String {
        self.steps
            .iter()
            .map(|b| b.short_label())
            .collect::<Vec<_>>()
            .join(" → ")
    }
}

pub fn check_steps(steps: &[ControllerButton]) -> Result<(), MappingError> {
    if steps.len() < 2 {
        return Err(MappingError::TooFewSequenceSteps(steps.len()));
    }
    if steps.len() > HISTORY_CAPACITY {
        return Err(MappingError::TooManySequenceSteps(HISTORY_CAPACITY));
    }
    Ok(())
}

/// Recent press history used to match sequences
///
/// A gap longer than the step timeout starts a fresh history, so every
/// adjacent pair still in the history is within the timeout.
#[derive(Debug, Clone)]
pub struct SequenceTracker {
    history: VecDeque<(ControllerButton, Duration)>,
    step_timeout: Duration,
}

impl SequenceTracker {
    pub fn new(step_timeout: Duration) -> Self {
        Self {
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
            step_timeout,
        }
    }

    pub fn step_timeout(&self) -> Duration {
        self.step_timeout
    }

    /// Remember a press
    pub fn record(&mut self, button: ControllerButton, at: Duration) {
        if let Some(&(_, last)) = self.history.back() {
            if at.saturating_sub(last) > self.step_timeout {
                self.history.clear();
            }
        }
        if self.history.len() == HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back((button, at));
    }

    /// Longest sequence whose steps equal the tail of the history
    ///
    /// Ties go to the earlier sequence.
    pub fn find_match<'a>(&self, sequences: &'a [SequenceMapping]) -> Option<&'a SequenceMapping> {
        let mut best: Option<&SequenceMapping> = None;
        for sequence in sequences {
            if !self.ends_with(&sequence.steps) {
                continue;
            }
            if best.map_or(true, |b| sequence.steps.len() > b.steps.len()) {
                best = Some(sequence);
            }
        }
        best
    }

    fn ends_with(&self, steps: &[ControllerButton]) -> bool {
        if steps.is_empty() || steps.len() > self.history.len() {
            return false;
        }
        let offset = self.history.len() - steps.len();
        self.history
            .iter()
            .skip(offset)
            .map(|(button, _)| button)
            .eq(steps.iter())
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

impl Default for SequenceTracker {
    fn default() -> Self {
        Self::new(DEFAULT_STEP_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::types::KeyCode;
    use ControllerButton::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn sequence(steps: &[ControllerButton]) -> SequenceMapping {
        SequenceMapping::new(steps.to_vec(), Action::key(KeyCode::F)).unwrap()
    }

    #[test]
    fn test_sequence_needs_two_steps() {
        assert_eq!(
            SequenceMapping::new(vec![A], Action::key(KeyCode::F)),
            Err(MappingError::TooFewSequenceSteps(1))
        );
    }

    #[test]
    fn test_matches_in_order() {
        let sequences = vec![sequence(&[DpadDown, DpadRight, X])];
        let mut tracker = SequenceTracker::default();

        tracker.record(DpadDown, ms(0));
        assert!(tracker.find_match(&sequences).is_none());
        tracker.record(DpadRight, ms(200));
        assert!(tracker.find_match(&sequences).is_none());
        tracker.record(X, ms(400));
        assert_eq!(tracker.find_match(&sequences), Some(&sequences[0]));
    }

    #[test]
    fn test_wrong_order_does_not_match() {
        let sequences = vec![sequence(&[A, B])];
        let mut tracker = SequenceTracker::default();

        tracker.record(B, ms(0));
        tracker.record(A, ms(100));
        assert!(tracker.find_match(&sequences).is_none());
    }

    #[test]
    fn test_gap_over_timeout_resets() {
        let sequences = vec![sequence(&[A, B])];
        let mut tracker = SequenceTracker::new(ms(600));

        tracker.record(A, ms(0));
        tracker.record(B, ms(601));
        assert!(tracker.find_match(&sequences).is_none());
        assert_eq!(tracker.len(), 1);

        tracker.record(A, ms(1000));
        tracker.record(B, ms(1600));
        assert!(tracker.find_match(&sequences).is_some());
    }

    #[test]
    fn test_longest_match_wins() {
        let sequences = vec![sequence(&[B, A]), sequence(&[Y, B, A])];
        let mut tracker = SequenceTracker::default();

        tracker.record(Y, ms(0));
        tracker.record(B, ms(100));
        tracker.record(A, ms(200));
        assert_eq!(tracker.find_match(&sequences), Some(&sequences[1]));
    }

    #[test]
    fn test_extra_leading_presses_ignored() {
        let sequences = vec![sequence(&[A, B])];
        let mut tracker = SequenceTracker::default();

        tracker.record(X, ms(0));
        tracker.record(A, ms(100));
        tracker.record(B, ms(200));
        assert!(tracker.find_match(&sequences).is_some());
    }
}
