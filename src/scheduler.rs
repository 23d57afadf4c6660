//! Step-scoped timers.
//!
//! Timers are deadlines keyed by (step id, kind) and evaluated against the
//! injected clock during `tick()`. There is never more than one deadline
//! per key: arming an existing key replaces it. Cancellation by step id is
//! idempotent and unconditional, which is what lets the engine guarantee
//! that a timer armed for one step can never fire once a different step is
//! active.

use std::collections::HashMap;
use std::time::Instant;

/// What a timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum TimerKind {
    /// Deferred start of validation and target resolution.
    Reveal,
    /// Validation deadline for an auto-advancing step.
    ValidationTimeout,
    /// Unconditional advance for steps with no validation.
    AutoAdvance,
}

/// Identity of an armed timer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct TimerKey {
    pub step_id: String,
    pub kind: TimerKind,
}

/// Deadline table for the currently active step.
#[derive(Debug, Default)]
pub(crate) struct StepTimers {
    deadlines: HashMap<TimerKey, Instant>,
}

impl StepTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a timer, replacing any existing deadline for the same key.
    pub fn arm(&mut self, step_id: &str, kind: TimerKind, deadline: Instant) {
        self.deadlines.insert(
            TimerKey {
                step_id: step_id.to_string(),
                kind,
            },
            deadline,
        );
    }

    /// Drop every timer belonging to `step_id`. Idempotent.
    pub fn cancel_step(&mut self, step_id: &str) {
        self.deadlines.retain(|key, _| key.step_id != step_id);
    }

    /// Drop all timers.
    pub fn clear(&mut self) {
        self.deadlines.clear();
    }

    /// Remove and return every timer due at `now`, earliest deadline first.
    pub fn take_due(&mut self, now: Instant) -> Vec<TimerKey> {
        let mut due: Vec<(TimerKey, Instant)> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, deadline)| (key.clone(), *deadline))
            .collect();
        due.sort_by_key(|(_, deadline)| *deadline);
        for (key, _) in &due {
            self.deadlines.remove(key);
        }
        due.into_iter().map(|(key, _)| key).collect()
    }

    /// Whether a timer is armed for this key.
    pub fn is_armed(&self, step_id: &str, kind: TimerKind) -> bool {
        self.deadlines.contains_key(&TimerKey {
            step_id: step_id.to_string(),
            kind,
        })
    }

    /// Number of armed timers across all steps.
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_arm_and_take_due() {
        let mut timers = StepTimers::new();
        let now = Instant::now();
        timers.arm("intro", TimerKind::Reveal, now + Duration::from_millis(100));

        assert!(timers.take_due(now).is_empty());
        let due = timers.take_due(now + Duration::from_millis(100));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].kind, TimerKind::Reveal);
        // Firing consumed it.
        assert_eq!(timers.len(), 0);
    }

    #[test]
    fn test_rearm_replaces_existing_deadline() {
        let mut timers = StepTimers::new();
        let now = Instant::now();
        timers.arm("intro", TimerKind::AutoAdvance, now + Duration::from_millis(100));
        timers.arm("intro", TimerKind::AutoAdvance, now + Duration::from_millis(500));

        assert_eq!(timers.len(), 1);
        // The earlier deadline no longer exists.
        assert!(timers.take_due(now + Duration::from_millis(100)).is_empty());
        assert_eq!(timers.take_due(now + Duration::from_millis(500)).len(), 1);
    }

    #[test]
    fn test_cancel_step_drops_all_kinds() {
        let mut timers = StepTimers::new();
        let now = Instant::now();
        timers.arm("intro", TimerKind::Reveal, now);
        timers.arm("intro", TimerKind::ValidationTimeout, now);
        timers.arm("next", TimerKind::AutoAdvance, now);

        timers.cancel_step("intro");
        timers.cancel_step("intro");

        assert!(!timers.is_armed("intro", TimerKind::Reveal));
        assert!(!timers.is_armed("intro", TimerKind::ValidationTimeout));
        assert!(timers.is_armed("next", TimerKind::AutoAdvance));
    }

    #[test]
    fn test_take_due_orders_by_deadline() {
        let mut timers = StepTimers::new();
        let now = Instant::now();
        timers.arm("a", TimerKind::ValidationTimeout, now + Duration::from_millis(300));
        timers.arm("a", TimerKind::Reveal, now + Duration::from_millis(100));

        let due = timers.take_due(now + Duration::from_millis(300));
        let kinds: Vec<_> = due.iter().map(|key| key.kind).collect();
        assert_eq!(kinds, [TimerKind::Reveal, TimerKind::ValidationTimeout]);
    }
}
