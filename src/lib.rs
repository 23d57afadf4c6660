//! Waymark - scripted walkthrough engine
//!
//! Guides a user step-by-step through a UI: validates that the expected
//! action happened before advancing, persists progress across sessions,
//! and emits a lifecycle event stream for a presentation layer to render.
//! The engine renders nothing and never mutates the application state it
//! observes; hosts inject a [`resolver::UiResolver`] for locator lookup, a
//! [`progress::ProgressStore`] for persistence, and pump
//! [`engine::TutorialEngine::tick`] from their own event loop.

pub mod clock;
pub mod config;
pub mod engine;
pub mod events;
pub mod progress;
pub mod resolver;
pub mod script;

mod scheduler;
mod validation;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use engine::{TutorialEngine, TutorialState};
pub use events::{SubscriptionId, TutorialEvent, TutorialEventKind};
pub use progress::{JsonFileStore, MemoryStore, ProgressStore, ScriptProgress};
pub use resolver::{BoundingBox, NullResolver, UiElement, UiResolver};
pub use script::{
    CatalogError, Placement, ScriptCatalog, StepAction, StepCondition, StepValidation,
    TutorialScript, TutorialStep,
};
