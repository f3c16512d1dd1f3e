//! Error types for the RM collaborator

use modbind_structure::StructureError;

/// Collaborator error type
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Connection, TLS or timeout failure below HTTP
    #[error("transport error: {0}")]
    Transport(String),

    /// Server answered with an unexpected status
    #[error("{operation} returned status {status} for {url}")]
    Status {
        operation: &'static str,
        status: u16,
        url: String,
    },

    /// Login refused
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A named server resource does not exist
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    /// Server document lacks what the protocol requires
    #[error("unexpected server document: {0}")]
    Malformed(String),

    /// Server document is not valid markup
    #[error(transparent)]
    Structure(#[from] StructureError),
}

impl ServiceError {
    /// Create not-found error
    #[inline]
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Create malformed-document error
    #[inline]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed(reason.into())
    }

    /// Create status error
    #[inline]
    pub fn status(operation: &'static str, status: u16, url: impl Into<String>) -> Self {
        Self::Status {
            operation,
            status,
            url: url.into(),
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        match (err.status(), err.url()) {
            (Some(status), Some(url)) => Self::status("request", status.as_u16(), url.as_str()),
            _ => Self::Transport(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_names_operation() {
        let err = ServiceError::status("create artifact", 403, "https://rm/factory");
        assert_eq!(
            err.to_string(),
            "create artifact returned status 403 for https://rm/factory"
        );
    }

    #[test]
    fn not_found_display() {
        let err = ServiceError::not_found("folder", "/F");
        assert_eq!(err.to_string(), "folder not found: /F");
    }
}
