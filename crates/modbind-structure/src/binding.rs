//! Binding nodes and resource references

use crate::markup::Element;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a binding, unique within one structure resource
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingId(String);

impl BindingId {
    /// Create binding id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BindingId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for BindingId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Reference to a server resource (artifact, module, component, folder, shape)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceRef(String);

impl ResourceRef {
    /// Create resource reference
    #[inline]
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// Borrow the URI
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the reference carries no URI
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ResourceRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Property kept verbatim through a decode/encode cycle of one wire form.
///
/// Each codec only re-emits the extras it produced itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Extra {
    /// Child element of a markup binding
    Markup(Element),
    /// Field of a flat-list record
    Field(String, serde_json::Value),
}

/// A node of the module structure.
///
/// Children are owned by [`ModuleStructure`](crate::ModuleStructure), not by the binding.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// Binding identifier
    pub id: BindingId,
    /// Whether the bound artifact is a heading
    pub is_heading: bool,
    /// Wrapped artifact, absent only for the structure root
    pub bound_artifact: Option<ResourceRef>,
    /// Owning module
    pub module: Option<ResourceRef>,
    /// Owning component
    pub component: Option<ResourceRef>,
    /// Uninterpreted properties
    pub extras: Vec<Extra>,
}

impl Binding {
    /// Create a bare binding
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<BindingId>) -> Self {
        Self {
            id: id.into(),
            is_heading: false,
            bound_artifact: None,
            module: None,
            component: None,
            extras: Vec::new(),
        }
    }

    /// Mark as heading
    #[inline]
    #[must_use]
    pub fn heading(mut self) -> Self {
        self.is_heading = true;
        self
    }

    /// With bound artifact
    #[inline]
    #[must_use]
    pub fn with_artifact(mut self, artifact: impl Into<ResourceRef>) -> Self {
        self.bound_artifact = Some(artifact.into());
        self
    }

    /// With owning module
    #[inline]
    #[must_use]
    pub fn with_module(mut self, module: impl Into<ResourceRef>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// With owning component
    #[inline]
    #[must_use]
    pub fn with_component(mut self, component: impl Into<ResourceRef>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// With an uninterpreted property
    #[inline]
    #[must_use]
    pub fn with_extra(mut self, extra: Extra) -> Self {
        self.extras.push(extra);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_builder() {
        let b = Binding::new("b1")
            .heading()
            .with_artifact("https://rm/resources/A1")
            .with_module("https://rm/resources/M1");

        assert!(b.is_heading);
        assert_eq!(b.bound_artifact.as_ref().map(ResourceRef::as_str), Some("https://rm/resources/A1"));
        assert!(b.component.is_none());
    }

    #[test]
    fn binding_id_conversions_agree() {
        let owned = BindingId::from(String::from("https://rm/resources/BI_1"));
        assert_eq!(owned, BindingId::from("https://rm/resources/BI_1"));
        assert_eq!(owned.as_str(), "https://rm/resources/BI_1");
    }

    #[test]
    fn empty_resource_ref() {
        assert!(ResourceRef::new("").is_empty());
        assert!(ResourceRef::new("   ").is_empty());
        assert!(!ResourceRef::new("x").is_empty());
    }
}
