//! Lifecycle event stream.
//!
//! The engine publishes every externally observable transition through a
//! typed publish/subscribe bus. Delivery is synchronous and in
//! subscription order per kind. A panicking listener is caught and logged
//! at the emission site; it never reaches the mutating operation that
//! triggered the event, and later listeners still run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::error;
use uuid::Uuid;

/// Kinds of lifecycle events the engine emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TutorialEventKind {
    TutorialStarted,
    TutorialCompleted,
    TutorialPaused,
    TutorialResumed,
    TutorialCancelled,
    StepStarted,
    StepCompleted,
    StepSkipped,
}

/// One emitted lifecycle event.
#[derive(Debug, Clone, Serialize)]
pub struct TutorialEvent {
    pub kind: TutorialEventKind,
    pub script_id: String,
    pub step_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Structured, level-gated detail (completion cause, skipped step ids).
    pub payload: Option<Value>,
}

/// Handle returned by `subscribe`, used to unsubscribe.
///
/// Closures are not comparable in Rust, so listener identity is this id
/// rather than the listener itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

type Listener = Box<dyn Fn(&TutorialEvent)>;

/// Typed publish/subscribe registry keyed by event kind.
#[derive(Default)]
pub struct EventBus {
    listeners: HashMap<TutorialEventKind, Vec<(SubscriptionId, Listener)>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for one event kind.
    pub fn subscribe<F>(&mut self, kind: TutorialEventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&TutorialEvent) + 'static,
    {
        let id = SubscriptionId(Uuid::new_v4());
        self.listeners
            .entry(kind)
            .or_default()
            .push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&mut self, kind: TutorialEventKind, id: SubscriptionId) -> bool {
        let Some(listeners) = self.listeners.get_mut(&kind) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Deliver an event to every listener of its kind.
    pub fn emit(&self, event: &TutorialEvent) {
        let Some(listeners) = self.listeners.get(&event.kind) else {
            return;
        };
        for (id, listener) in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                error!(
                    kind = ?event.kind,
                    script_id = %event.script_id,
                    subscription = ?id,
                    "tutorial event listener panicked"
                );
            }
        }
    }

    /// Number of listeners registered for `kind`.
    pub fn listener_count(&self, kind: TutorialEventKind) -> usize {
        self.listeners.get(&kind).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<_, _> = self
            .listeners
            .iter()
            .map(|(kind, listeners)| (kind, listeners.len()))
            .collect();
        f.debug_struct("EventBus").field("listeners", &counts).finish()
    }
}
