//! Tutorial state machine.
//!
//! [`TutorialEngine`] owns the authoritative [`TutorialState`] and is the
//! sole writer of it. Scheduler and validation state are private helpers;
//! they never touch progress directly, they only feed the engine's
//! completion path. The host pumps [`TutorialEngine::tick`] from its event
//! loop; everything else happens inside the engine's own synchronous call
//! chain, so mutating operations are naturally serialized.

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::events::{EventBus, SubscriptionId, TutorialEvent, TutorialEventKind};
use crate::progress::{MemoryStore, ProgressStore, ScriptProgress};
use crate::resolver::{NullResolver, UiElement, UiResolver};
use crate::scheduler::{StepTimers, TimerKey, TimerKind};
use crate::script::{ScriptCatalog, TutorialScript, TutorialStep};
use crate::validation::ActiveValidation;

/// Why a step stopped being active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompletionCause {
    /// Validation succeeded (poll, click, or snapshot).
    Validated,
    /// Explicit `advance()` from the host.
    Manual,
    /// Explicit `skip()` of a skippable step.
    Skipped,
    /// A timer force-advanced an auto-advance step.
    Timeout,
}

impl CompletionCause {
    fn as_str(self) -> &'static str {
        match self {
            Self::Validated => "validated",
            Self::Manual => "manual",
            Self::Skipped => "skipped",
            Self::Timeout => "timeout",
        }
    }
}

/// Snapshot of the engine's runtime state.
///
/// `state()` hands out clones; holders can never mutate the engine through
/// one. Only `progress` inside it is ever persisted.
#[derive(Debug, Clone)]
pub struct TutorialState {
    /// Whether a script is running (false while paused or idle).
    pub active: bool,
    /// The running (or paused) script, if any.
    pub script: Option<Arc<TutorialScript>>,
    /// Index of the current step within `script`.
    pub step_index: usize,
    /// All known progress records, including completed scripts.
    pub progress: Vec<ScriptProgress>,
    /// Whether presentation should highlight the current target.
    pub highlight_visible: bool,
    /// Locator of the current step's target, if it has one.
    pub active_target: Option<String>,
    /// Whether the walkthrough overlay should be shown.
    pub overlay_visible: bool,
}

impl TutorialState {
    /// The step the run is currently on, while a script is loaded.
    pub fn current_step(&self) -> Option<&TutorialStep> {
        self.script.as_ref()?.step(self.step_index)
    }
}

impl Default for TutorialState {
    fn default() -> Self {
        Self {
            active: false,
            script: None,
            step_index: 0,
            progress: Vec::new(),
            highlight_visible: false,
            active_target: None,
            overlay_visible: false,
        }
    }
}

/// Orchestrates script progression, validation, timers, persistence, and
/// the lifecycle event stream.
pub struct TutorialEngine {
    config: EngineConfig,
    catalog: ScriptCatalog,
    resolver: Arc<dyn UiResolver>,
    clock: Arc<dyn Clock>,
    store: Box<dyn ProgressStore>,
    bus: EventBus,
    timers: StepTimers,
    validation: Option<ActiveValidation>,
    state: TutorialState,
}

impl TutorialEngine {
    /// Engine over `catalog` with a null resolver, in-memory store, and
    /// system clock. Swap the seams with the `with_*` builders.
    pub fn new(catalog: ScriptCatalog) -> Self {
        Self {
            config: EngineConfig::default(),
            catalog,
            resolver: Arc::new(NullResolver),
            clock: Arc::new(SystemClock),
            store: Box::new(MemoryStore::new()),
            bus: EventBus::new(),
            timers: StepTimers::new(),
            validation: None,
            state: TutorialState::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn UiResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use `store` for persistence and load whatever progress it holds.
    pub fn with_store(mut self, store: Box<dyn ProgressStore>) -> Self {
        self.store = store;
        self.reload_progress();
        self
    }

    // ---- public operations -------------------------------------------------

    /// Start (or resume) a script. Returns false on unknown id or unmet
    /// prerequisites, leaving all state untouched.
    pub fn start(&mut self, script_id: &str) -> bool {
        let Some(script) = self.catalog.get(script_id).cloned() else {
            debug!(script_id, "start rejected: unknown script");
            return false;
        };
        if !self.prerequisites_met(&script) {
            debug!(script_id, "start rejected: prerequisites not met");
            return false;
        }
        if self.state.script.is_some() {
            info!(script_id, "starting over an active run");
            self.cancel();
        }

        let steps_len = script.steps.len();
        let resume_index = match self
            .state
            .progress
            .iter()
            .position(|r| r.script_id == script_id)
        {
            Some(i) => {
                let record = &self.state.progress[i];
                if record.completed {
                    // Replay of a finished script restarts from the top.
                    0
                } else {
                    record.current_step.min(steps_len - 1)
                }
            }
            None => {
                let record = ScriptProgress::started(script_id, self.clock.utc_now());
                self.state.progress.push(record);
                self.persist_progress();
                0
            }
        };

        self.state.script = Some(script);
        self.state.active = true;
        self.state.overlay_visible = true;

        info!(script_id, resume_index, "tutorial started");
        self.emit(
            TutorialEventKind::TutorialStarted,
            script_id,
            None,
            Some(json!({ "step_index": resume_index })),
        );
        self.activate_step(resume_index);
        true
    }

    /// Complete the current step by host fiat and move on (or finish the
    /// script on the last step). No-op while idle.
    pub fn advance(&mut self) {
        self.complete_current_step(CompletionCause::Manual);
    }

    /// Skip the current step if it allows skipping; otherwise a no-op.
    pub fn skip(&mut self) {
        if !self.state.active {
            return;
        }
        let Some(script) = self.state.script.clone() else {
            return;
        };
        let Some(step) = script.step(self.state.step_index) else {
            return;
        };
        if !step.skippable {
            debug!(step_id = %step.id, "skip rejected: step is not skippable");
            return;
        }
        self.complete_current_step(CompletionCause::Skipped);
    }

    /// Suspend the run without losing the current index. Timers and
    /// validation are torn down; `resume()` re-establishes them.
    pub fn pause(&mut self) {
        if !self.state.active {
            return;
        }
        let Some(script) = self.state.script.clone() else {
            return;
        };
        self.timers.clear();
        self.validation = None;
        self.state.active = false;

        let step_id = script.step(self.state.step_index).map(|s| s.id.clone());
        info!(script_id = %script.id, "tutorial paused");
        self.emit(
            TutorialEventKind::TutorialPaused,
            &script.id,
            step_id.as_deref(),
            None,
        );
    }

    /// Reactivate the current step of a loaded script. Safe to call
    /// repeatedly: activation re-arms timers idempotently and progress is
    /// untouched.
    pub fn resume(&mut self) {
        let Some(script) = self.state.script.clone() else {
            return;
        };
        let index = self.state.step_index;
        self.state.active = true;

        let step_id = script.step(index).map(|s| s.id.clone());
        info!(script_id = %script.id, index, "tutorial resumed");
        self.emit(
            TutorialEventKind::TutorialResumed,
            &script.id,
            step_id.as_deref(),
            None,
        );
        self.activate_step(index);
    }

    /// Abort the run. Stored progress keeps the last *completed* index, so
    /// a later `start` re-runs the abandoned step rather than skipping it.
    pub fn cancel(&mut self) {
        let Some(script) = self.state.script.take() else {
            return;
        };
        self.timers.clear();
        self.validation = None;
        self.state.active = false;
        self.state.step_index = 0;
        self.state.highlight_visible = false;
        self.state.active_target = None;
        self.state.overlay_visible = false;

        info!(script_id = %script.id, "tutorial cancelled");
        self.emit(TutorialEventKind::TutorialCancelled, &script.id, None, None);
    }

    /// Evaluate the current step's state predicate against a host-pushed
    /// snapshot. True means the step just completed. Meaningless (false)
    /// unless a state-predicate validation is active.
    pub fn push_state_snapshot(&mut self, snapshot: &Value) -> bool {
        if !self.state.active {
            return false;
        }
        let satisfied = self
            .validation
            .as_ref()
            .is_some_and(|v| v.matches_snapshot(snapshot));
        if satisfied {
            self.complete_current_step(CompletionCause::Validated);
        }
        satisfied
    }

    /// Report a user click. True means the click matched the current
    /// step's element-clicked validation and completed it.
    pub fn report_click(&mut self, target: &UiElement) -> bool {
        if !self.state.active {
            return false;
        }
        let matched = self
            .validation
            .as_ref()
            .is_some_and(|v| v.matches_click(self.resolver.as_ref(), target));
        if matched {
            self.complete_current_step(CompletionCause::Validated);
        }
        matched
    }

    /// Delete the progress record for one script, or all records. The
    /// in-memory run, if any, is untouched: callers wanting a clean slate
    /// cancel first.
    pub fn reset(&mut self, script_id: Option<&str>) {
        match script_id {
            Some(id) => {
                self.state.progress.retain(|r| r.script_id != id);
                info!(script_id = id, "tutorial progress reset");
            }
            None => {
                self.state.progress.clear();
                info!("all tutorial progress reset");
            }
        }
        self.persist_progress();
    }

    /// Fire due timers and due validation polls. Pumped by the host's
    /// event loop; a paused or idle engine ignores ticks.
    pub fn tick(&mut self) {
        if !self.state.active {
            return;
        }
        let now = self.clock.now();
        // Polls run before timers so a success and a timeout due in the
        // same tick resolve in favor of the success.
        self.try_poll(now);
        for key in self.timers.take_due(now) {
            self.fire_timer(&key);
        }
    }

    // ---- read accessors ----------------------------------------------------

    /// Snapshot of the runtime state.
    pub fn state(&self) -> TutorialState {
        self.state.clone()
    }

    /// Scripts whose prerequisites are all completed.
    pub fn available_scripts(&self) -> Vec<Arc<TutorialScript>> {
        self.catalog
            .iter()
            .filter(|script| self.prerequisites_met(script))
            .cloned()
            .collect()
    }

    pub fn is_script_completed(&self, script_id: &str) -> bool {
        self.state
            .progress
            .iter()
            .any(|r| r.script_id == script_id && r.completed)
    }

    pub fn script_progress(&self, script_id: &str) -> Option<ScriptProgress> {
        self.state
            .progress
            .iter()
            .find(|r| r.script_id == script_id)
            .cloned()
    }

    // ---- subscriptions -----------------------------------------------------

    /// Listen for one lifecycle event kind.
    pub fn subscribe<F>(&mut self, kind: TutorialEventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&TutorialEvent) + 'static,
    {
        self.bus.subscribe(kind, listener)
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&mut self, kind: TutorialEventKind, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(kind, id)
    }

    // ---- internals ---------------------------------------------------------

    fn prerequisites_met(&self, script: &TutorialScript) -> bool {
        script
            .prerequisites
            .iter()
            .all(|id| self.is_script_completed(id))
    }

    /// Make `index` the active step: clear stale timers, publish target
    /// and highlight state, emit `step_started`, then either begin
    /// validation or defer it behind the reveal timer.
    fn activate_step(&mut self, index: usize) {
        let Some(script) = self.state.script.clone() else {
            return;
        };
        let Some(step) = script.step(index) else {
            warn!(script_id = %script.id, index, "activation index out of range");
            return;
        };

        // Only one step is ever active, so every armed timer belongs to a
        // previous activation. Drop them all before anything else.
        self.timers.clear();
        self.validation = None;

        self.state.step_index = index;
        self.state.highlight_visible = step.target.is_some();
        self.state.active_target = step.target.clone();

        debug!(script_id = %script.id, step_id = %step.id, index, "step activated");
        self.emit(
            TutorialEventKind::StepStarted,
            &script.id,
            Some(&step.id),
            None,
        );

        let now = self.clock.now();
        if step.auto_advance && step.validation.is_none() {
            self.timers.arm(
                &step.id,
                TimerKind::AutoAdvance,
                now + self.config.auto_advance_delay(),
            );
        }
        match step.reveal_delay {
            Some(delay) if !delay.is_zero() => {
                self.timers.arm(&step.id, TimerKind::Reveal, now + delay);
            }
            _ => self.begin_validation(),
        }
    }

    /// Install the current step's validation and take the first poll
    /// immediately. An already-true condition completes the step here.
    fn begin_validation(&mut self) {
        let Some(script) = self.state.script.clone() else {
            return;
        };
        let Some(step) = script.step(self.state.step_index) else {
            return;
        };
        let Some(validation) = &step.validation else {
            return;
        };

        let now = self.clock.now();
        self.validation = Some(ActiveValidation::begin(validation.condition.clone(), now));
        if step.auto_advance {
            // Force-advance deadline. Steps that don't auto-advance stall
            // open on timeout instead, so they get no timer at all.
            self.timers
                .arm(&step.id, TimerKind::ValidationTimeout, now + validation.timeout);
        }
        self.try_poll(now);
    }

    fn try_poll(&mut self, now: Instant) {
        if !self.state.active {
            return;
        }
        let interval = self.config.poll_interval();
        let satisfied = match self.validation.as_mut() {
            Some(validation) if validation.poll_due(now) => {
                validation.evaluate_poll(self.resolver.as_ref(), now, interval)
            }
            _ => return,
        };
        if satisfied {
            self.complete_current_step(CompletionCause::Validated);
        }
    }

    fn fire_timer(&mut self, key: &TimerKey) {
        if !self.state.active {
            return;
        }
        let Some(script) = self.state.script.clone() else {
            return;
        };
        let Some(step) = script.step(self.state.step_index) else {
            return;
        };
        // A completion earlier in this tick may have advanced the run; a
        // timer from the previous step must not touch the new one.
        if key.step_id != step.id {
            debug!(timer = ?key, current = %step.id, "stale timer ignored");
            return;
        }
        match key.kind {
            TimerKind::Reveal => self.begin_validation(),
            TimerKind::ValidationTimeout => {
                debug!(step_id = %step.id, "validation timed out; auto-advancing");
                self.complete_current_step(CompletionCause::Timeout);
            }
            TimerKind::AutoAdvance => {
                self.complete_current_step(CompletionCause::Timeout);
            }
        }
    }

    /// The single completion path: every way a step ends funnels through
    /// here. Cancels step-scoped timers and validation first, then updates
    /// and persists progress, then emits, then either finishes the script
    /// or activates the next step.
    fn complete_current_step(&mut self, cause: CompletionCause) {
        if !self.state.active {
            return;
        }
        let Some(script) = self.state.script.clone() else {
            return;
        };
        let index = self.state.step_index;
        let Some(step) = script.step(index) else {
            return;
        };

        self.timers.cancel_step(&step.id);
        self.validation = None;

        let last = script.is_last_step(index);
        let now_utc = self.clock.utc_now();
        let mut skipped_steps = Vec::new();
        if let Some(record) = self
            .state
            .progress
            .iter_mut()
            .find(|r| r.script_id == script.id)
        {
            if cause == CompletionCause::Skipped && !record.skipped_steps.contains(&step.id) {
                record.skipped_steps.push(step.id.clone());
            }
            if last {
                record.completed = true;
                record.completed_at = Some(now_utc);
                record.current_step = index;
            } else {
                record.current_step = index + 1;
            }
            skipped_steps.clone_from(&record.skipped_steps);
        }
        self.persist_progress();

        debug!(
            script_id = %script.id,
            step_id = %step.id,
            cause = cause.as_str(),
            "step completed"
        );
        let kind = if cause == CompletionCause::Skipped {
            TutorialEventKind::StepSkipped
        } else {
            TutorialEventKind::StepCompleted
        };
        self.emit(
            kind,
            &script.id,
            Some(&step.id),
            Some(json!({ "cause": cause.as_str() })),
        );

        if last {
            self.state.active = false;
            self.state.script = None;
            self.state.step_index = 0;
            self.state.highlight_visible = false;
            self.state.active_target = None;
            self.state.overlay_visible = false;

            info!(script_id = %script.id, "tutorial completed");
            self.emit(
                TutorialEventKind::TutorialCompleted,
                &script.id,
                None,
                Some(json!({ "skipped_steps": skipped_steps })),
            );
        } else {
            self.activate_step(index + 1);
        }
    }

    fn emit(
        &self,
        kind: TutorialEventKind,
        script_id: &str,
        step_id: Option<&str>,
        payload: Option<Value>,
    ) {
        let event = TutorialEvent {
            kind,
            script_id: script_id.to_string(),
            step_id: step_id.map(ToString::to_string),
            timestamp: self.clock.utc_now(),
            payload,
        };
        self.bus.emit(&event);
    }

    fn persist_progress(&self) {
        if let Err(error) = self.store.save(&self.state.progress) {
            warn!(%error, "failed to persist tutorial progress");
        }
    }

    fn reload_progress(&mut self) {
        match self.store.load() {
            Ok(records) => self.state.progress = records,
            Err(error) => {
                warn!(%error, "failed to load tutorial progress; starting empty");
                self.state.progress = Vec::new();
            }
        }
    }
}

impl std::fmt::Debug for TutorialEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TutorialEngine")
            .field("config", &self.config)
            .field("catalog_len", &self.catalog.len())
            .field("state", &self.state)
            .field("armed_timers", &self.timers.len())
            .finish_non_exhaustive()
    }
}
