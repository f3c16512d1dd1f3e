//! OSLC RM collaborator
//!
//! The core only talks to the server through [`RmService`]. This crate defines
//! that contract, the request and response types it moves, helpers for
//! reading RDF/XML server documents, and [`HttpRmService`], the reqwest-based
//! implementation used by the command line.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod http;
pub mod rdf;
pub mod service;
pub mod types;
pub mod vocab;

pub use error::ServiceError;
pub use http::{Credentials, HttpRmService, ServerSettings};
pub use service::RmService;
pub use types::{
    ArtifactSummary, ComponentContext, CreationFactory, CreationResponse, FilterValue,
    JobStatus, QueryFilter, QueryResults, Tagged, UpdateResponse,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the RM collaborator
    pub use crate::{
        ArtifactSummary, ComponentContext, CreationFactory, JobStatus, QueryFilter, RmService,
        ServiceError, Tagged, UpdateResponse,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
