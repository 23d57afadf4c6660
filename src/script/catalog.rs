//! Registry of walkthrough scripts.
//!
//! Scripts are validated structurally at registration so the engine can
//! assume well-formed definitions everywhere else.

use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

use super::TutorialScript;

/// Structural problems rejected at registration time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("script '{0}' is already registered")]
    DuplicateScript(String),

    #[error("script '{script_id}' contains duplicate step id '{step_id}'")]
    DuplicateStep { script_id: String, step_id: String },

    #[error("script '{0}' has no steps")]
    EmptyScript(String),
}

/// Insertion-ordered collection of registered scripts.
#[derive(Debug, Default)]
pub struct ScriptCatalog {
    scripts: Vec<Arc<TutorialScript>>,
}

impl ScriptCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a script, rejecting structural defects.
    pub fn register(&mut self, script: TutorialScript) -> Result<(), CatalogError> {
        if self.get(&script.id).is_some() {
            return Err(CatalogError::DuplicateScript(script.id));
        }
        if script.steps.is_empty() {
            return Err(CatalogError::EmptyScript(script.id));
        }
        let mut seen = HashSet::new();
        for step in &script.steps {
            if !seen.insert(step.id.as_str()) {
                return Err(CatalogError::DuplicateStep {
                    script_id: script.id.clone(),
                    step_id: step.id.clone(),
                });
            }
        }
        self.scripts.push(Arc::new(script));
        Ok(())
    }

    /// Look up a script by id.
    pub fn get(&self, script_id: &str) -> Option<&Arc<TutorialScript>> {
        self.scripts.iter().find(|s| s.id == script_id)
    }

    /// All registered scripts in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<TutorialScript>> {
        self.scripts.iter()
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::TutorialStep;

    fn one_step_script(id: &str) -> TutorialScript {
        TutorialScript::new(id, id).with_step(TutorialStep::new("only", "Only"))
    }

    #[test]
    fn test_register_and_get() {
        let mut catalog = ScriptCatalog::new();
        catalog.register(one_step_script("basics")).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("basics").is_some());
        assert!(catalog.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_script_rejected() {
        let mut catalog = ScriptCatalog::new();
        catalog.register(one_step_script("basics")).unwrap();
        assert_eq!(
            catalog.register(one_step_script("basics")),
            Err(CatalogError::DuplicateScript("basics".into()))
        );
    }

    #[test]
    fn test_empty_script_rejected() {
        let mut catalog = ScriptCatalog::new();
        assert_eq!(
            catalog.register(TutorialScript::new("empty", "Empty")),
            Err(CatalogError::EmptyScript("empty".into()))
        );
    }

    #[test]
    fn test_duplicate_step_rejected() {
        let mut catalog = ScriptCatalog::new();
        let script = TutorialScript::new("dup", "Dup")
            .with_step(TutorialStep::new("a", "A"))
            .with_step(TutorialStep::new("a", "A again"));
        assert_eq!(
            catalog.register(script),
            Err(CatalogError::DuplicateStep {
                script_id: "dup".into(),
                step_id: "a".into(),
            })
        );
    }

    #[test]
    fn test_iteration_preserves_registration_order() {
        let mut catalog = ScriptCatalog::new();
        catalog.register(one_step_script("first")).unwrap();
        catalog.register(one_step_script("second")).unwrap();
        let ids: Vec<_> = catalog.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["first", "second"]);
    }
}
