//! Component references.
//!
//! A [`ComponentReference`] identifies a component through any combination
//! of an inline spec, a URL, a content digest, raw text, or a display name.
//! Only already-resolved references (those carrying an inline `spec`) expose
//! inputs and outputs; every other form is treated as declaring none.

use serde::{Deserialize, Serialize};

use crate::component::ComponentSpec;

/// Identifies a component.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<Box<ComponentSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// The authoritative part of a reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReferenceSource<'a> {
    Spec(&'a ComponentSpec),
    Url(&'a str),
    Digest(&'a str),
    Text(&'a str),
    Name(&'a str),
    Empty,
}

impl ComponentReference {
    /// A reference carrying an inline, already-resolved spec.
    pub fn from_spec(spec: ComponentSpec) -> Self {
        ComponentReference {
            name: spec.name.clone(),
            spec: Some(Box::new(spec)),
            ..Default::default()
        }
    }

    /// An unresolved reference to a remote component.
    pub fn from_url(url: impl Into<String>) -> Self {
        ComponentReference {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Picks the authoritative field: `spec`, then `url`, `digest`, `text`,
    /// and finally `name`.
    pub fn source(&self) -> ReferenceSource<'_> {
        if let Some(spec) = &self.spec {
            ReferenceSource::Spec(spec)
        } else if let Some(url) = &self.url {
            ReferenceSource::Url(url)
        } else if let Some(digest) = &self.digest {
            ReferenceSource::Digest(digest)
        } else if let Some(text) = &self.text {
            ReferenceSource::Text(text)
        } else if let Some(name) = &self.name {
            ReferenceSource::Name(name)
        } else {
            ReferenceSource::Empty
        }
    }

    /// The inline spec, if this reference has been resolved.
    pub fn resolved(&self) -> Option<&ComponentSpec> {
        self.spec.as_deref()
    }

    pub fn is_resolved(&self) -> bool {
        self.spec.is_some()
    }

    /// Display name, falling back to the inline spec's name.
    pub fn display_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or_else(|| self.spec.as_ref().and_then(|spec| spec.name.as_deref()))
    }

    /// Declared input names; empty when unresolved.
    pub fn input_names(&self) -> Vec<&str> {
        self.resolved()
            .map(|spec| spec.input_names().collect())
            .unwrap_or_default()
    }

    /// Declared output names; empty when unresolved.
    pub fn output_names(&self) -> Vec<&str> {
        self.resolved()
            .map(|spec| spec.output_names().collect())
            .unwrap_or_default()
    }

    pub fn has_input(&self, name: &str) -> bool {
        self.resolved().is_some_and(|spec| spec.has_input(name))
    }

    pub fn has_output(&self, name: &str) -> bool {
        self.resolved().is_some_and(|spec| spec.has_output(name))
    }

    /// Whether both references point at the same component lineage: equal
    /// digest, equal URL, or (lacking either) equal display name.
    pub fn same_component(&self, other: &ComponentReference) -> bool {
        if let (Some(a), Some(b)) = (&self.digest, &other.digest) {
            if a == b {
                return true;
            }
        }
        if let (Some(a), Some(b)) = (&self.url, &other.url) {
            return a == b;
        }
        match (self.display_name(), other.display_name()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{InputSpec, OutputSpec};

    #[test]
    fn source_prefers_inline_spec() {
        let mut reference = ComponentReference::from_spec(ComponentSpec::container("a", "img"));
        reference.url = Some("https://example.com/a.yaml".into());
        assert!(matches!(reference.source(), ReferenceSource::Spec(_)));

        reference.spec = None;
        assert_eq!(
            reference.source(),
            ReferenceSource::Url("https://example.com/a.yaml")
        );

        assert_eq!(ComponentReference::default().source(), ReferenceSource::Empty);
    }

    #[test]
    fn unresolved_reference_declares_nothing() {
        let reference = ComponentReference::from_url("https://example.com/a.yaml");
        assert!(!reference.is_resolved());
        assert!(reference.input_names().is_empty());
        assert!(reference.output_names().is_empty());
        assert!(!reference.has_output("anything"));
    }

    #[test]
    fn resolved_reference_exposes_io() {
        let spec = ComponentSpec::container("a", "img")
            .with_input(InputSpec::new("x"))
            .with_output(OutputSpec::new("y"));
        let reference = ComponentReference::from_spec(spec);
        assert_eq!(reference.input_names(), vec!["x"]);
        assert_eq!(reference.output_names(), vec!["y"]);
        assert!(reference.has_input("x"));
        assert!(!reference.has_input("y"));
        assert_eq!(reference.display_name(), Some("a"));
    }

    #[test]
    fn same_component_matches_on_url_then_name() {
        let a = ComponentReference::from_url("https://example.com/a.yaml");
        let b = ComponentReference::from_url("https://example.com/a.yaml");
        let c = ComponentReference::from_url("https://example.com/c.yaml");
        assert!(a.same_component(&b));
        assert!(!a.same_component(&c));

        let named = ComponentReference::from_spec(ComponentSpec::container("trainer", "img:1"));
        let newer = ComponentReference::from_spec(ComponentSpec::container("trainer", "img:2"));
        assert!(named.same_component(&newer));
    }
}
