//! Step completion conditions.
//!
//! A validation pairs a condition with a timeout. Two condition kinds are
//! pollable by the engine (`ElementExists`, `Custom`); the other two are
//! push-only and complete exclusively through `report_click` /
//! `push_state_snapshot` on the engine.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Timeout applied when a validation does not specify one.
pub const DEFAULT_VALIDATION_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Predicate over a host-pushed application state snapshot.
pub type StatePredicateFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Zero-argument predicate with closure-captured logic.
pub type CustomPredicateFn = Arc<dyn Fn() -> bool + Send + Sync>;

/// What has to hold for a step to be considered complete.
#[derive(Clone)]
pub enum StepCondition {
    /// A resolver lookup for the locator succeeds.
    ElementExists(String),
    /// A reported click target matches the locator.
    ElementClicked(String),
    /// A pushed state snapshot satisfies the predicate. Never polled.
    StatePredicate(StatePredicateFn),
    /// An arbitrary predicate, polled until it returns true.
    Custom(CustomPredicateFn),
}

impl StepCondition {
    /// Whether the engine can evaluate this condition on its own.
    pub fn is_pollable(&self) -> bool {
        matches!(self, Self::ElementExists(_) | Self::Custom(_))
    }
}

impl fmt::Debug for StepCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ElementExists(locator) => f.debug_tuple("ElementExists").field(locator).finish(),
            Self::ElementClicked(locator) => {
                f.debug_tuple("ElementClicked").field(locator).finish()
            }
            Self::StatePredicate(_) => f.write_str("StatePredicate(..)"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Completion condition plus the deadline after which an auto-advancing
/// step is force-advanced.
#[derive(Debug, Clone)]
pub struct StepValidation {
    pub condition: StepCondition,
    pub timeout: Duration,
}

impl StepValidation {
    /// Validation satisfied when the locator resolves to an element.
    pub fn element_exists(locator: impl Into<String>) -> Self {
        Self::from_condition(StepCondition::ElementExists(locator.into()))
    }

    /// Validation satisfied when a reported click matches the locator.
    pub fn element_clicked(locator: impl Into<String>) -> Self {
        Self::from_condition(StepCondition::ElementClicked(locator.into()))
    }

    /// Validation satisfied when a pushed snapshot passes the predicate.
    pub fn state_predicate<F>(predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::from_condition(StepCondition::StatePredicate(Arc::new(predicate)))
    }

    /// Validation satisfied when the predicate returns true under polling.
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self::from_condition(StepCondition::Custom(Arc::new(predicate)))
    }

    fn from_condition(condition: StepCondition) -> Self {
        Self {
            condition,
            timeout: DEFAULT_VALIDATION_TIMEOUT,
        }
    }

    /// Override the default 10s timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
