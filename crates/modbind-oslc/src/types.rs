//! Request and response types of the RM collaborator

use indexmap::IndexMap;
use modbind_structure::ResourceRef;
use std::collections::BTreeMap;
use std::fmt;

/// Server-side scope every call runs in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentContext {
    /// Project name as given on the command line
    pub project: String,
    /// Project service provider document
    pub service_provider: ResourceRef,
    /// Project area, parent of the root folder
    pub project_area: ResourceRef,
    pub component: ResourceRef,
    /// Stream or baseline selected for every read and write
    pub configuration: ResourceRef,
}

/// Creation factory with its candidate shapes, in server order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationFactory {
    pub uri: ResourceRef,
    pub shapes: Vec<ResourceRef>,
}

/// Outcome of a creation POST
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationResponse {
    pub status: u16,
    /// `Location` of the created resource
    pub location: Option<ResourceRef>,
}

impl CreationResponse {
    /// Server signalled "created"
    #[inline]
    #[must_use]
    pub fn is_created(&self) -> bool {
        self.status == 201
    }
}

/// Public identity of an artifact
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactSummary {
    /// `dcterms:identifier`
    pub identifier: Option<String>,
    /// `dcterms:title`
    pub title: Option<String>,
}

/// A document body with its concurrency token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tagged<T> {
    pub body: T,
    /// Value of the `ETag` response header
    pub etag: String,
}

/// Outcome of a conditional structure update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResponse {
    pub status: u16,
    /// Job tracker for accepted-but-pending updates
    pub location: Option<ResourceRef>,
}

/// State of a server-side job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Succeeded,
    Failed(String),
}

impl JobStatus {
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Right-hand side of a query filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    /// Quoted string literal
    Literal(String),
    /// Resource URI in angle brackets
    Resource(String),
}

/// Exact-match filter `property=value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFilter {
    /// Prefixed property name, e.g. `dcterms:identifier`
    pub property: String,
    pub value: FilterValue,
}

impl QueryFilter {
    #[inline]
    #[must_use]
    pub fn literal(property: &str, value: impl Into<String>) -> Self {
        Self {
            property: property.to_owned(),
            value: FilterValue::Literal(value.into()),
        }
    }

    #[inline]
    #[must_use]
    pub fn resource(property: &str, uri: impl Into<String>) -> Self {
        Self {
            property: property.to_owned(),
            value: FilterValue::Resource(uri.into()),
        }
    }

    /// Prefix of the property name
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.property.split_once(':').map(|(p, _)| p)
    }
}

impl fmt::Display for QueryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            FilterValue::Literal(v) => {
                write!(f, "{}=\"{}\"", self.property, v.replace('"', "\\\""))
            }
            FilterValue::Resource(uri) => write!(f, "{}=<{uri}>", self.property),
        }
    }
}

/// Query matches keyed by resource, in server order; values keyed by
/// compacted property name
pub type QueryResults = IndexMap<ResourceRef, BTreeMap<String, String>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_rendering() {
        let f = QueryFilter::literal("dcterms:title", "Spec \"A\"");
        assert_eq!(f.to_string(), r#"dcterms:title="Spec \"A\"""#);
        let f = QueryFilter::resource("rdf:type", "http://jazz.net/ns/rm#Module");
        assert_eq!(f.to_string(), "rdf:type=<http://jazz.net/ns/rm#Module>");
        assert_eq!(f.prefix(), Some("rdf"));
    }

    #[test]
    fn job_status_terminal() {
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed("x".into()).is_terminal());
    }
}
