//! UI resolver seam.
//!
//! The engine treats target locators as opaque strings and asks the host to
//! interpret them. Any UI technology (DOM, canvas scene graph, TUI widget
//! tree) can sit behind [`UiResolver`]; the engine itself only ever checks
//! existence and click identity, never geometry. `bounding_box` exists for
//! presentation layers that highlight the resolved element.

use std::fmt;

/// Opaque handle to a resolved UI element.
///
/// The string inside is assigned by the resolver and is meaningful only to
/// it. Equality of handles is equality of the underlying element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UiElement(pub String);

impl UiElement {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }
}

impl fmt::Display for UiElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Screen-space rectangle of a resolved element, in host units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Host-supplied locator resolution.
pub trait UiResolver: Send + Sync {
    /// Find the element a locator currently refers to, if any.
    ///
    /// A miss means "not rendered yet", never an error.
    fn resolve(&self, locator: &str) -> Option<UiElement>;

    /// Whether a concrete element (for example a click target) is the one
    /// the locator refers to.
    fn element_matches(&self, element: &UiElement, locator: &str) -> bool {
        self.resolve(locator).as_ref() == Some(element)
    }

    /// Geometry of a resolved element, for highlight placement.
    fn bounding_box(&self, element: &UiElement) -> Option<BoundingBox>;
}

/// Resolver that never finds anything.
///
/// The default for headless embeddings: element-exists validations simply
/// never satisfy, and click reports never match.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullResolver;

impl UiResolver for NullResolver {
    fn resolve(&self, _locator: &str) -> Option<UiElement> {
        None
    }

    fn bounding_box(&self, _element: &UiElement) -> Option<BoundingBox> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SingleResolver;

    impl UiResolver for SingleResolver {
        fn resolve(&self, locator: &str) -> Option<UiElement> {
            (locator == "#present").then(|| UiElement::new("node-1"))
        }

        fn bounding_box(&self, _element: &UiElement) -> Option<BoundingBox> {
            Some(BoundingBox {
                x: 0.0,
                y: 0.0,
                width: 10.0,
                height: 10.0,
            })
        }
    }

    #[test]
    fn test_default_element_matches_uses_resolve() {
        let resolver = SingleResolver;
        let element = UiElement::new("node-1");
        assert!(resolver.element_matches(&element, "#present"));
        assert!(!resolver.element_matches(&element, "#absent"));
        assert!(!resolver.element_matches(&UiElement::new("node-2"), "#present"));
    }

    #[test]
    fn test_null_resolver_never_resolves() {
        assert!(NullResolver.resolve("#anything").is_none());
        assert!(!NullResolver.element_matches(&UiElement::new("x"), "#anything"));
    }
}
