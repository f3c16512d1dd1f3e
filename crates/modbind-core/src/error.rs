//! Error types for modbind core
//!
//! Every failure of the create-and-bind pipeline is a [`BindError`]. Each
//! variant maps onto one [`ErrorKind`]:
//! - `NotFound`: folder, shape, module, artifact, identifier
//! - `Malformed`: unexpected structure shape, missing insertion slot
//! - `ConcurrencyConflict`: stale concurrency token
//! - `RemoteRejected`: non-success status from the server
//! - `Timeout`: asynchronous apply did not finish in time
//! - `Unexpected`: everything else

use crate::mutation::MutationState;
use modbind_oslc::ServiceError;
use modbind_structure::{ResourceRef, StructureError};

/// Coarse failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Malformed,
    ConcurrencyConflict,
    RemoteRejected,
    Timeout,
    Unexpected,
}

/// Main modbind error type
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    /// Target folder path does not resolve
    #[error("folder not found: {0}")]
    FolderNotFound(String),

    /// No creation shape carries the requested type label
    #[error("no resource shape titled {0:?}")]
    ShapeNotFound(String),

    /// Server did not signal "created"
    #[error("artifact creation rejected with status {status}: {reason}")]
    CreationRejected { status: u16, reason: String },

    /// Created resource carries no public identifier
    #[error("identifier unavailable for {0}")]
    IdentifierUnavailable(ResourceRef),

    #[error("module not found: {0}")]
    ModuleNotFound(String),

    #[error("artifact not found: {0}")]
    ArtifactNotFound(String),

    /// Module document lacks a structure link
    #[error("module {0} has no structure resource")]
    StructureUnavailable(ResourceRef),

    /// Structure decoding, slot lookup or planning failed
    #[error(transparent)]
    Structure(#[from] StructureError),

    /// Conditional update lost against a newer version
    #[error("structure was modified on the server since it was read (token {etag})")]
    ConcurrentModification { etag: String },

    /// Non-success status outside the cases above
    #[error("{operation} rejected with status {status}")]
    RemoteRejected { operation: &'static str, status: u16 },

    /// Server-side job reported failure
    #[error("job {job} failed: {message}")]
    JobFailed { job: ResourceRef, message: String },

    /// Server-side job outlived the wait bound
    #[error("job {job} did not finish within {waited_secs}s")]
    Timeout { job: ResourceRef, waited_secs: u64 },

    #[error("illegal mutation transition {from:?} -> {to:?}")]
    IllegalTransition {
        from: MutationState,
        to: MutationState,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl BindError {
    /// Taxonomy bucket of this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FolderNotFound(_)
            | Self::ShapeNotFound(_)
            | Self::IdentifierUnavailable(_)
            | Self::ModuleNotFound(_)
            | Self::ArtifactNotFound(_)
            | Self::StructureUnavailable(_) => ErrorKind::NotFound,
            Self::Structure(StructureError::MissingArtifactReference) => ErrorKind::Unexpected,
            Self::Structure(_) => ErrorKind::Malformed,
            Self::ConcurrentModification { .. } => ErrorKind::ConcurrencyConflict,
            Self::CreationRejected { .. } | Self::RemoteRejected { .. } | Self::JobFailed { .. } => {
                ErrorKind::RemoteRejected
            }
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::IllegalTransition { .. } | Self::Config(_) => ErrorKind::Unexpected,
            Self::Service(err) => match err {
                ServiceError::NotFound { .. } => ErrorKind::NotFound,
                ServiceError::Status { .. } => ErrorKind::RemoteRejected,
                ServiceError::Malformed(_) | ServiceError::Structure(_) => ErrorKind::Malformed,
                ServiceError::Transport(_) | ServiceError::Authentication(_) => {
                    ErrorKind::Unexpected
                }
            },
        }
    }

    /// Worth running the whole invocation again
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ConcurrencyConflict | ErrorKind::Timeout
        )
    }

    /// Create configuration error
    #[inline]
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(
            BindError::FolderNotFound("/F".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            BindError::Structure(StructureError::slot_not_found("empty")).kind(),
            ErrorKind::Malformed
        );
        assert_eq!(
            BindError::ConcurrentModification { etag: "v1".into() }.kind(),
            ErrorKind::ConcurrencyConflict
        );
        assert_eq!(
            BindError::Service(ServiceError::status("create", 500, "u")).kind(),
            ErrorKind::RemoteRejected
        );
        assert_eq!(
            BindError::Service(ServiceError::not_found("project", "P")).kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn retryable() {
        assert!(BindError::ConcurrentModification { etag: "x".into() }.is_retryable());
        assert!(BindError::Timeout {
            job: "j".into(),
            waited_secs: 5
        }
        .is_retryable());
        assert!(!BindError::ModuleNotFound("M".into()).is_retryable());
    }

    #[test]
    fn display_surfaces_status() {
        let err = BindError::RemoteRejected {
            operation: "structure update",
            status: 500,
        };
        assert_eq!(err.to_string(), "structure update rejected with status 500");
    }
}
