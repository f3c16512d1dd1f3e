//! Error types for module structures

use crate::binding::BindingId;

/// Result alias for structure operations
pub type Result<T> = std::result::Result<T, StructureError>;

/// Structure error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructureError {
    /// The wire document does not describe a rooted ordered tree
    #[error("structure malformed: {0}")]
    Malformed(String),

    /// The insertion policy found no slot in this tree
    #[error("insertion slot not found: {0}")]
    InsertionSlotNotFound(String),

    /// A binding was planned without an artifact to wrap
    #[error("missing artifact reference for new binding")]
    MissingArtifactReference,

    /// Binding id used twice in one structure
    #[error("duplicate binding id: {0}")]
    DuplicateBinding(BindingId),

    /// Node handle does not belong to this tree
    #[error("unknown node: {0}")]
    UnknownNode(usize),

    /// Level events did not balance
    #[error("unbalanced walk: {0}")]
    UnbalancedWalk(&'static str),
}

impl StructureError {
    /// Create a malformed-structure error
    #[inline]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed(reason.into())
    }

    /// Create a slot-not-found error
    #[inline]
    pub fn slot_not_found(reason: impl Into<String>) -> Self {
        Self::InsertionSlotNotFound(reason.into())
    }
}

impl From<quick_xml::Error> for StructureError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Malformed(format!("markup: {err}"))
    }
}

impl From<quick_xml::events::attributes::AttrError> for StructureError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::Malformed(format!("markup attribute: {err}"))
    }
}

impl From<serde_json::Error> for StructureError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(format!("flat list: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StructureError::malformed("no root");
        assert_eq!(err.to_string(), "structure malformed: no root");

        let err = StructureError::DuplicateBinding(BindingId::new("b1"));
        assert!(err.to_string().contains("b1"));
    }
}
