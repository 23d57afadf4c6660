//! Runtime evaluation of the active step's validation.
//!
//! At most one [`ActiveValidation`] exists at a time, owned by the engine
//! and discarded the instant its step stops being active. Pollable
//! conditions carry their own next-poll deadline; push-only conditions
//! (click, state snapshot) are answered on demand and never polled.

use serde_json::Value;
use std::time::{Duration, Instant};

use crate::resolver::{UiElement, UiResolver};
use crate::script::StepCondition;

/// Validation state for the currently active step.
#[derive(Debug)]
pub(crate) struct ActiveValidation {
    condition: StepCondition,
    /// Due time of the next poll; `None` for push-only conditions.
    next_poll: Option<Instant>,
}

impl ActiveValidation {
    /// Begin validating a step. Pollable conditions are due immediately.
    pub fn begin(condition: StepCondition, now: Instant) -> Self {
        let next_poll = condition.is_pollable().then_some(now);
        Self {
            condition,
            next_poll,
        }
    }

    /// Whether a poll is due at `now`.
    pub fn poll_due(&self, now: Instant) -> bool {
        self.next_poll.is_some_and(|due| now >= due)
    }

    /// Evaluate a pollable condition. On a miss the next poll is scheduled
    /// one interval out.
    pub fn evaluate_poll(
        &mut self,
        resolver: &dyn UiResolver,
        now: Instant,
        interval: Duration,
    ) -> bool {
        let satisfied = match &self.condition {
            StepCondition::ElementExists(locator) => resolver.resolve(locator).is_some(),
            StepCondition::Custom(predicate) => predicate(),
            // Push-only conditions are never due, so this arm is unreachable
            // through poll_due; answer "not satisfied" regardless.
            StepCondition::ElementClicked(_) | StepCondition::StatePredicate(_) => false,
        };
        if !satisfied {
            self.next_poll = Some(now + interval);
        }
        satisfied
    }

    /// Whether a reported click satisfies this validation.
    pub fn matches_click(&self, resolver: &dyn UiResolver, target: &UiElement) -> bool {
        match &self.condition {
            StepCondition::ElementClicked(locator) => resolver.element_matches(target, locator),
            _ => false,
        }
    }

    /// Whether a pushed state snapshot satisfies this validation.
    pub fn matches_snapshot(&self, snapshot: &Value) -> bool {
        match &self.condition {
            StepCondition::StatePredicate(predicate) => predicate(snapshot),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::BoundingBox;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    struct SetResolver {
        present: Mutex<HashSet<String>>,
    }

    impl SetResolver {
        fn new(present: &[&str]) -> Self {
            Self {
                present: Mutex::new(present.iter().map(ToString::to_string).collect()),
            }
        }
    }

    impl UiResolver for SetResolver {
        fn resolve(&self, locator: &str) -> Option<UiElement> {
            self.present
                .lock()
                .unwrap()
                .contains(locator)
                .then(|| UiElement::new(locator))
        }

        fn bounding_box(&self, _element: &UiElement) -> Option<BoundingBox> {
            None
        }
    }

    #[test]
    fn test_pollable_due_immediately() {
        let now = Instant::now();
        let validation = ActiveValidation::begin(StepCondition::ElementExists("#a".into()), now);
        assert!(validation.poll_due(now));
    }

    #[test]
    fn test_push_only_never_due() {
        let now = Instant::now();
        let validation = ActiveValidation::begin(StepCondition::ElementClicked("#a".into()), now);
        assert!(!validation.poll_due(now + Duration::from_secs(60)));
    }

    #[test]
    fn test_element_exists_miss_reschedules() {
        let resolver = SetResolver::new(&[]);
        let now = Instant::now();
        let interval = Duration::from_millis(500);
        let mut validation =
            ActiveValidation::begin(StepCondition::ElementExists("#board".into()), now);

        assert!(!validation.evaluate_poll(&resolver, now, interval));
        assert!(!validation.poll_due(now + Duration::from_millis(499)));
        assert!(validation.poll_due(now + interval));

        resolver.present.lock().unwrap().insert("#board".into());
        assert!(validation.evaluate_poll(&resolver, now + interval, interval));
    }

    #[test]
    fn test_custom_predicate_polls_external_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let probe = flag.clone();
        let now = Instant::now();
        let interval = Duration::from_millis(500);
        let mut validation = ActiveValidation::begin(
            StepCondition::Custom(Arc::new(move || probe.load(Ordering::SeqCst))),
            now,
        );
        let resolver = SetResolver::new(&[]);

        assert!(!validation.evaluate_poll(&resolver, now, interval));
        flag.store(true, Ordering::SeqCst);
        assert!(validation.evaluate_poll(&resolver, now + interval, interval));
    }

    #[test]
    fn test_click_matching_is_resolver_confirmed() {
        let resolver = SetResolver::new(&["#deal"]);
        let validation = ActiveValidation::begin(
            StepCondition::ElementClicked("#deal".into()),
            Instant::now(),
        );

        assert!(validation.matches_click(&resolver, &UiElement::new("#deal")));
        assert!(!validation.matches_click(&resolver, &UiElement::new("#other")));
    }

    #[test]
    fn test_click_ignored_for_other_kinds() {
        let resolver = SetResolver::new(&["#deal"]);
        let validation = ActiveValidation::begin(
            StepCondition::ElementExists("#deal".into()),
            Instant::now(),
        );
        assert!(!validation.matches_click(&resolver, &UiElement::new("#deal")));
    }

    #[test]
    fn test_snapshot_matching() {
        let validation = ActiveValidation::begin(
            StepCondition::StatePredicate(Arc::new(|snapshot| {
                snapshot.get("cards_played").and_then(Value::as_u64) >= Some(1)
            })),
            Instant::now(),
        );
        assert!(!validation.matches_snapshot(&json!({ "cards_played": 0 })));
        assert!(validation.matches_snapshot(&json!({ "cards_played": 2 })));
    }
}
