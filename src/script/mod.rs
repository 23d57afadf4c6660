//! Immutable walkthrough definitions.
//!
//! A [`TutorialScript`] is an ordered sequence of [`TutorialStep`]s plus
//! prerequisite script ids. Scripts are built once at startup, registered
//! in a [`ScriptCatalog`], and shared as `Arc<TutorialScript>`; nothing in
//! the engine ever mutates one.

pub mod catalog;
pub mod validation;

pub use catalog::{CatalogError, ScriptCatalog};
pub use validation::{
    CustomPredicateFn, StatePredicateFn, StepCondition, StepValidation,
    DEFAULT_VALIDATION_TIMEOUT,
};

use std::time::Duration;

/// Where presentation should place a tooltip relative to the target.
/// Opaque to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Top,
    Bottom,
    Left,
    Right,
    Center,
}

/// Suggested user action for a step. Informational only; the engine never
/// acts on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    Click,
    Drag,
    Input,
    Hover,
    Observe,
}

/// One unit of guidance inside a script.
#[derive(Debug, Clone)]
pub struct TutorialStep {
    /// Unique within the owning script.
    pub id: String,
    pub title: String,
    pub description: String,
    /// Extra instruction text shown alongside the description.
    pub instruction: Option<String>,
    /// Opaque locator for the element this step is about.
    pub target: Option<String>,
    pub placement: Option<Placement>,
    pub action: Option<StepAction>,
    pub validation: Option<StepValidation>,
    /// Advance on a timer instead of waiting for validation success.
    pub auto_advance: bool,
    /// Defer validation and target resolution after activation.
    pub reveal_delay: Option<Duration>,
    pub skippable: bool,
    /// Presentation hint: discourage abandoning this step early. Does not
    /// affect sequencing.
    pub must_complete: bool,
}

impl TutorialStep {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            instruction: None,
            target: None,
            placement: None,
            action: None,
            validation: None,
            auto_advance: false,
            reveal_delay: None,
            skippable: false,
            must_complete: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    pub fn with_target(mut self, locator: impl Into<String>) -> Self {
        self.target = Some(locator.into());
        self
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = Some(placement);
        self
    }

    pub fn with_action(mut self, action: StepAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_validation(mut self, validation: StepValidation) -> Self {
        self.validation = Some(validation);
        self
    }

    pub fn with_reveal_delay(mut self, delay: Duration) -> Self {
        self.reveal_delay = Some(delay);
        self
    }

    pub fn auto_advance(mut self) -> Self {
        self.auto_advance = true;
        self
    }

    pub fn skippable(mut self) -> Self {
        self.skippable = true;
        self
    }

    pub fn must_complete(mut self) -> Self {
        self.must_complete = true;
        self
    }
}

/// Ordered walkthrough definition.
#[derive(Debug, Clone)]
pub struct TutorialScript {
    /// Unique across the catalog.
    pub id: String,
    pub name: String,
    pub description: String,
    pub steps: Vec<TutorialStep>,
    /// Script ids that must be completed before this one can start.
    pub prerequisites: Vec<String>,
    /// Rough duration shown in script pickers.
    pub estimated_minutes: Option<u32>,
}

impl TutorialScript {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            steps: Vec::new(),
            prerequisites: Vec::new(),
            estimated_minutes: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_step(mut self, step: TutorialStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_prerequisite(mut self, script_id: impl Into<String>) -> Self {
        self.prerequisites.push(script_id.into());
        self
    }

    pub fn with_estimated_minutes(mut self, minutes: u32) -> Self {
        self.estimated_minutes = Some(minutes);
        self
    }

    /// Step at `index`, if the script is long enough.
    pub fn step(&self, index: usize) -> Option<&TutorialStep> {
        self.steps.get(index)
    }

    /// Whether `index` refers to the final step.
    pub fn is_last_step(&self, index: usize) -> bool {
        !self.steps.is_empty() && index == self.steps.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_builder_defaults() {
        let step = TutorialStep::new("welcome", "Welcome");
        assert_eq!(step.id, "welcome");
        assert!(step.target.is_none());
        assert!(!step.auto_advance);
        assert!(!step.skippable);
        assert!(step.validation.is_none());
    }

    #[test]
    fn test_step_builder_chain() {
        let step = TutorialStep::new("play-card", "Play a card")
            .with_description("Drag a card onto the board")
            .with_target("#hand .card")
            .with_placement(Placement::Bottom)
            .with_action(StepAction::Drag)
            .with_validation(StepValidation::element_clicked("#hand .card"))
            .with_reveal_delay(Duration::from_millis(400))
            .skippable();
        assert_eq!(step.target.as_deref(), Some("#hand .card"));
        assert_eq!(step.placement, Some(Placement::Bottom));
        assert_eq!(step.action, Some(StepAction::Drag));
        assert_eq!(step.reveal_delay, Some(Duration::from_millis(400)));
        assert!(step.skippable);
        assert!(!step.must_complete);
    }

    #[test]
    fn test_script_step_lookup() {
        let script = TutorialScript::new("basics", "The basics")
            .with_step(TutorialStep::new("a", "A"))
            .with_step(TutorialStep::new("b", "B"));
        assert_eq!(script.step(1).map(|s| s.id.as_str()), Some("b"));
        assert!(script.step(2).is_none());
        assert!(!script.is_last_step(0));
        assert!(script.is_last_step(1));
    }

    #[test]
    fn test_empty_script_has_no_last_step() {
        let script = TutorialScript::new("empty", "Empty");
        assert!(!script.is_last_step(0));
    }
}
