//! Wire forms of the module structure resource
//!
//! The server offers the structure either as an RDF/XML containment tree or
//! as a flat JSON list of records linked by id. Both are parsed into a
//! [`WireDocument`] and normalized into a [`ModuleStructure`] right away;
//! nothing downstream looks at the wire shape again.

mod flat_form;
mod markup_form;

pub use flat_form::BindingRecord;

use crate::error::{Result, StructureError};
use crate::markup::{self, Element, Namespaces};
use crate::tree::ModuleStructure;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Wire form selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WireForm {
    /// RDF/XML containment tree
    #[default]
    Markup,
    /// JSON list of records
    FlatList,
}

impl WireForm {
    /// Media type for `Accept` and `Content-Type`
    #[inline]
    #[must_use]
    pub fn media_type(self) -> &'static str {
        match self {
            Self::Markup => "application/rdf+xml",
            Self::FlatList => "application/json",
        }
    }
}

impl fmt::Display for WireForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Markup => "markup",
            Self::FlatList => "flat-list",
        })
    }
}

impl FromStr for WireForm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "markup" | "rdf" | "xml" | "rdf+xml" => Ok(Self::Markup),
            "flat-list" | "flat" | "json" => Ok(Self::FlatList),
            other => Err(format!("unknown wire form: {other}")),
        }
    }
}

/// A parsed structure document in one of the two wire forms
#[derive(Debug, Clone, PartialEq)]
pub enum WireDocument {
    Markup {
        root: Element,
        namespaces: Namespaces,
    },
    FlatList(Vec<BindingRecord>),
}

impl WireDocument {
    /// Parse a response body
    pub fn parse(form: WireForm, body: &str) -> Result<Self> {
        match form {
            WireForm::Markup => {
                let (root, namespaces) = markup::parse_document(body)?;
                Ok(Self::Markup { root, namespaces })
            }
            WireForm::FlatList => Ok(Self::FlatList(serde_json::from_str(body)?)),
        }
    }

    #[inline]
    #[must_use]
    pub fn form(&self) -> WireForm {
        match self {
            Self::Markup { .. } => WireForm::Markup,
            Self::FlatList(_) => WireForm::FlatList,
        }
    }

    /// Normalize into the abstract tree
    pub fn decode(&self) -> Result<ModuleStructure> {
        match self {
            Self::Markup { root, namespaces } => markup_form::decode(root, namespaces),
            Self::FlatList(records) => flat_form::decode(records),
        }
    }

    /// Render a tree in the requested form
    pub fn encode(tree: &ModuleStructure, form: WireForm) -> Self {
        match form {
            WireForm::Markup => {
                let (root, namespaces) = markup_form::encode(tree);
                Self::Markup { root, namespaces }
            }
            WireForm::FlatList => Self::FlatList(flat_form::encode(tree)),
        }
    }

    /// Serialize to a request body
    pub fn to_body(&self) -> Result<String> {
        match self {
            Self::Markup { root, .. } => markup::write_document(root),
            Self::FlatList(records) => serde_json::to_string_pretty(records)
                .map_err(|e| StructureError::malformed(format!("flat list: {e}"))),
        }
    }
}

/// Decode a response body in one step
pub fn decode_body(form: WireForm, body: &str) -> Result<ModuleStructure> {
    WireDocument::parse(form, body)?.decode()
}

/// Encode a tree into a request body in one step
pub fn encode_body(tree: &ModuleStructure, form: WireForm) -> Result<String> {
    WireDocument::encode(tree, form).to_body()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_form_from_str() {
        assert_eq!("markup".parse::<WireForm>().unwrap(), WireForm::Markup);
        assert_eq!("JSON".parse::<WireForm>().unwrap(), WireForm::FlatList);
        assert!("yaml".parse::<WireForm>().is_err());
    }

    #[test]
    fn media_types() {
        assert_eq!(WireForm::Markup.media_type(), "application/rdf+xml");
        assert_eq!(WireForm::FlatList.media_type(), "application/json");
    }

    #[test]
    fn parse_reports_form() {
        let doc = WireDocument::parse(WireForm::FlatList, "[]").unwrap();
        assert_eq!(doc.form(), WireForm::FlatList);
    }
}
