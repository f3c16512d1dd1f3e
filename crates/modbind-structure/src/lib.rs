//! Module structure model
//!
//! A module's content is a rooted, ordered tree of bindings. This crate holds
//! everything about that tree that does not need a server:
//! - The binding model and the arena-backed [`ModuleStructure`]
//! - A pre-order walk emitting level and node events
//! - Outline section numbering driven by the walk
//! - Insertion policies and the planner that builds new bindings
//! - Codecs for the markup (RDF/XML) and flat-list (JSON) wire forms
//!
//! # Example
//!
//! ```rust,ignore
//! use modbind_structure::prelude::*;
//!
//! let tree = WireDocument::parse(WireForm::Markup, &body)?.decode()?;
//! for (node, label) in tree.section_labels()? {
//!     println!("{label} {}", tree.binding(node).id);
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod binding;
pub mod codec;
pub mod error;
pub mod markup;
pub mod numbering;
pub mod planner;
pub mod tree;
pub mod vocab;
pub mod walk;

pub use binding::{Binding, BindingId, Extra, ResourceRef};
pub use codec::{BindingRecord, WireDocument, WireForm};
pub use error::{Result, StructureError};
pub use markup::{Element, Namespaces, Node, QName};
pub use numbering::{LevelCounter, SectionLabel, SectionNumbering};
pub use planner::{
    AfterSibling, FirstTopLevelSlot, InsertionPlanner, InsertionPolicy, InsertionSlot,
    SlotPosition,
};
pub use tree::{ModuleStructure, NodeId};
pub use walk::{Walk, WalkEvent};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with module structures
    pub use crate::{
        Binding, BindingId, FirstTopLevelSlot, InsertionPlanner, InsertionPolicy,
        ModuleStructure, NodeId, ResourceRef, SectionLabel, SectionNumbering, StructureError,
        WalkEvent, WireDocument, WireForm,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
