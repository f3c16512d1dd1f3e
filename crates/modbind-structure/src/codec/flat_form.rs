//! Flat JSON list form
//!
//! Every binding is one record; parents list their children by `uri`. The
//! root is whichever record carries `isStructureRoot`, wherever it sits in
//! the list.

use crate::binding::{Binding, Extra, ResourceRef};
use crate::error::{Result, StructureError};
use crate::tree::{ModuleStructure, NodeId};
use crate::walk::WalkEvent;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

/// One record of the flat-list form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingRecord {
    pub uri: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_structure_root: bool,
    #[serde(default)]
    pub is_heading: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound_artifact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default)]
    pub child_bindings: Vec<String>,
    /// Fields the model does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(b: &bool) -> bool {
    !*b
}

pub(super) fn decode(records: &[BindingRecord]) -> Result<ModuleStructure> {
    let mut by_uri: HashMap<&str, &BindingRecord> = HashMap::with_capacity(records.len());
    for record in records {
        if by_uri.insert(record.uri.as_str(), record).is_some() {
            return Err(StructureError::malformed(format!(
                "record {} appears more than once",
                record.uri
            )));
        }
    }

    let roots: Vec<&BindingRecord> = records.iter().filter(|r| r.is_structure_root).collect();
    let root = match roots.as_slice() {
        [root] => *root,
        [] => return Err(StructureError::malformed("no record is flagged isStructureRoot")),
        _ => {
            return Err(StructureError::malformed(format!(
                "{} records are flagged isStructureRoot",
                roots.len()
            )))
        }
    };

    let mut tree = ModuleStructure::new(binding_of(root));
    let mut pending = vec![(tree.root(), root)];
    while let Some((parent, record)) = pending.pop() {
        for child_uri in &record.child_bindings {
            let child = by_uri.get(child_uri.as_str()).ok_or_else(|| {
                StructureError::malformed(format!(
                    "record {} lists missing child {child_uri}",
                    record.uri
                ))
            })?;
            let node = tree
                .append_child(parent, binding_of(child))
                .map_err(|_| {
                    StructureError::malformed(format!("binding {child_uri} has more than one parent"))
                })?;
            pending.push((node, *child));
        }
    }

    let unreachable = records.len() - tree.binding_count();
    if unreachable > 0 {
        return Err(StructureError::malformed(format!(
            "{unreachable} records are not reachable from the structure root"
        )));
    }
    debug!(records = records.len(), "flat-list structure decoded");
    Ok(tree)
}

fn binding_of(record: &BindingRecord) -> Binding {
    Binding {
        id: record.uri.clone().into(),
        is_heading: record.is_heading,
        bound_artifact: record.bound_artifact.clone().map(ResourceRef::from),
        module: record.module.clone().map(ResourceRef::from),
        component: record.component.clone().map(ResourceRef::from),
        extras: record
            .extra
            .iter()
            .map(|(k, v)| Extra::Field(k.clone(), v.clone()))
            .collect(),
    }
}

pub(super) fn encode(tree: &ModuleStructure) -> Vec<BindingRecord> {
    let mut records = Vec::with_capacity(tree.binding_count());
    records.push(record_of(tree, tree.root(), true));
    records.extend(tree.walk().filter_map(|event| match event {
        WalkEvent::Node { node, .. } => Some(record_of(tree, node, false)),
        _ => None,
    }));
    records
}

fn record_of(tree: &ModuleStructure, node: NodeId, is_root: bool) -> BindingRecord {
    let binding = tree.binding(node);
    BindingRecord {
        uri: binding.id.to_string(),
        is_structure_root: is_root,
        is_heading: binding.is_heading,
        component: binding.component.as_ref().map(ToString::to_string),
        bound_artifact: binding.bound_artifact.as_ref().map(ToString::to_string),
        module: binding.module.as_ref().map(ToString::to_string),
        child_bindings: tree
            .children(node)
            .iter()
            .map(|c| tree.binding(*c).id.to_string())
            .collect(),
        extra: binding
            .extras
            .iter()
            .filter_map(|extra| match extra {
                Extra::Field(k, v) => Some((k.clone(), v.clone())),
                Extra::Markup(_) => None,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_body, encode_body, WireForm};
    use serde_json::json;

    fn body(records: Value) -> String {
        records.to_string()
    }

    #[test]
    fn root_found_anywhere_in_list() {
        let doc = body(json!([
            { "uri": "h1", "isHeading": true, "boundArtifact": "A1", "childBindings": ["a"] },
            { "uri": "a", "isHeading": false, "boundArtifact": "A2", "childBindings": [] },
            { "uri": "s", "isStructureRoot": true, "isHeading": false, "childBindings": ["h1"] }
        ]));
        let tree = decode_body(WireForm::FlatList, &doc).unwrap();
        assert_eq!(tree.binding(tree.root()).id.as_str(), "s");
        let h1 = tree.children(tree.root())[0];
        assert_eq!(tree.children(h1).len(), 1);
    }

    #[test]
    fn encode_puts_root_first() {
        let doc = body(json!([
            { "uri": "h1", "isHeading": true, "childBindings": [] },
            { "uri": "s", "isStructureRoot": true, "childBindings": ["h1"] }
        ]));
        let tree = decode_body(WireForm::FlatList, &doc).unwrap();
        let records = encode(&tree);
        assert_eq!(records[0].uri, "s");
        assert!(records[0].is_structure_root);
        assert!(!records[1].is_structure_root);
    }

    #[test]
    fn unflagged_root_is_malformed() {
        let doc = body(json!([
            { "uri": "s", "isHeading": false, "childBindings": ["h1"] },
            { "uri": "h1", "isHeading": true, "childBindings": [] }
        ]));
        let err = decode_body(WireForm::FlatList, &doc).unwrap_err();
        assert!(matches!(err, StructureError::Malformed(m) if m.contains("isStructureRoot")));
    }

    #[test]
    fn two_roots_are_malformed() {
        let doc = body(json!([
            { "uri": "s", "isStructureRoot": true, "childBindings": [] },
            { "uri": "t", "isStructureRoot": true, "childBindings": [] }
        ]));
        assert!(decode_body(WireForm::FlatList, &doc).is_err());
    }

    #[test]
    fn dangling_child_is_malformed() {
        let doc = body(json!([
            { "uri": "s", "isStructureRoot": true, "childBindings": ["ghost"] }
        ]));
        let err = decode_body(WireForm::FlatList, &doc).unwrap_err();
        assert!(matches!(err, StructureError::Malformed(m) if m.contains("ghost")));
    }

    #[test]
    fn shared_child_is_malformed() {
        let doc = body(json!([
            { "uri": "s", "isStructureRoot": true, "childBindings": ["a", "b"] },
            { "uri": "a", "childBindings": ["c"] },
            { "uri": "b", "childBindings": ["c"] },
            { "uri": "c", "childBindings": [] }
        ]));
        let err = decode_body(WireForm::FlatList, &doc).unwrap_err();
        assert!(matches!(err, StructureError::Malformed(m) if m.contains("more than one parent")));
    }

    #[test]
    fn cycle_is_malformed() {
        let doc = body(json!([
            { "uri": "s", "isStructureRoot": true, "childBindings": ["a"] },
            { "uri": "a", "childBindings": ["s"] }
        ]));
        assert!(decode_body(WireForm::FlatList, &doc).is_err());
    }

    #[test]
    fn orphan_record_is_malformed() {
        let doc = body(json!([
            { "uri": "s", "isStructureRoot": true, "childBindings": [] },
            { "uri": "lost", "childBindings": [] }
        ]));
        let err = decode_body(WireForm::FlatList, &doc).unwrap_err();
        assert!(matches!(err, StructureError::Malformed(m) if m.contains("not reachable")));
    }

    #[test]
    fn extra_fields_round_trip() {
        let doc = body(json!([
            { "uri": "s", "isStructureRoot": true, "type": "dng_module:Binding", "childBindings": [] }
        ]));
        let tree = decode_body(WireForm::FlatList, &doc).unwrap();
        let out = encode_body(&tree, WireForm::FlatList).unwrap();
        assert!(out.contains("\"type\": \"dng_module:Binding\""));
        assert_eq!(decode_body(WireForm::FlatList, &out).unwrap(), tree);
    }
}
