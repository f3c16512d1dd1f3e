//! modbind core
//!
//! Creates a requirement or heading artifact in a folder and binds it into a
//! module's structure. The server is reached only through
//! [`modbind_oslc::RmService`], so every stage runs unchanged against the
//! HTTP adapter or an in-memory fake.
//!
//! # Example
//!
//! ```rust,ignore
//! use modbind_core::prelude::*;
//!
//! let report = CreateAndBind::new(&service, &config).run(&request).await?;
//! println!("{}", report.artifact.identifier);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod creation;
pub mod error;
pub mod lookup;
pub mod mutation;
pub mod outline;
pub mod pipeline;

pub use config::{BinderConfig, StructureSettings};
pub use creation::{ArtifactCreator, ArtifactRequest, CreatedArtifact};
pub use error::{BindError, ErrorKind};
pub use lookup::{find_module, locate_artifact, ModuleSelector};
pub use mutation::{
    allowed_transitions, validate_transition, MutationOutcome, MutationProgress,
    MutationSettings, MutationState, StructureMutator,
};
pub use outline::{Outline, OutlineEntry};
pub use pipeline::{BindReport, BindRequest, CreateAndBind, Target};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running the pipeline
    pub use crate::{
        ArtifactRequest, BindError, BindReport, BindRequest, BinderConfig, CreateAndBind,
        ErrorKind, ModuleSelector, MutationState, Outline, Target,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
