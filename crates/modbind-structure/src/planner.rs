//! Insertion policies and the binding planner

use crate::binding::{Binding, BindingId, Extra, ResourceRef};
use crate::error::{Result, StructureError};
use crate::tree::{ModuleStructure, NodeId};
use crate::vocab::BINDING_RECORD_TYPE;
use std::fmt;

/// Where among a parent's children a new binding goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotPosition {
    /// After the current last child
    Last,
    /// Directly after this sibling
    After(NodeId),
}

/// Resolved insertion point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertionSlot {
    pub parent: NodeId,
    pub position: SlotPosition,
}

impl InsertionSlot {
    /// Append to the children of `parent`
    #[inline]
    #[must_use]
    pub fn last_child_of(parent: NodeId) -> Self {
        Self {
            parent,
            position: SlotPosition::Last,
        }
    }
}

/// Decides where a new binding is attached
pub trait InsertionPolicy: Send + Sync + fmt::Debug {
    /// Policy name for logs
    fn name(&self) -> &'static str;

    /// Locate the slot in a decoded tree
    fn locate(&self, tree: &ModuleStructure) -> Result<InsertionSlot>;
}

/// Appends inside the first top-level binding.
///
/// Matches the markup path `Binding/childBindings/Binding/childBindings`
/// taken from the structure root. A module without top-level bindings has
/// no such slot and is rejected instead of being repaired.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstTopLevelSlot;

impl InsertionPolicy for FirstTopLevelSlot {
    fn name(&self) -> &'static str {
        "first-top-level"
    }

    fn locate(&self, tree: &ModuleStructure) -> Result<InsertionSlot> {
        tree.children(tree.root())
            .first()
            .map(|first| InsertionSlot::last_child_of(*first))
            .ok_or_else(|| {
                StructureError::slot_not_found(
                    "module has no top-level binding (Binding/childBindings/Binding/childBindings)",
                )
            })
    }
}

/// Places the new binding directly after an existing one
#[derive(Debug, Clone)]
pub struct AfterSibling {
    anchor: BindingId,
}

impl AfterSibling {
    #[inline]
    #[must_use]
    pub fn new(anchor: impl Into<BindingId>) -> Self {
        Self {
            anchor: anchor.into(),
        }
    }
}

impl InsertionPolicy for AfterSibling {
    fn name(&self) -> &'static str {
        "after-sibling"
    }

    fn locate(&self, tree: &ModuleStructure) -> Result<InsertionSlot> {
        let anchor = tree
            .find(&self.anchor)
            .ok_or_else(|| StructureError::slot_not_found(format!("no binding {}", self.anchor)))?;
        let parent = tree.parent(anchor).ok_or_else(|| {
            StructureError::slot_not_found("the structure root has no siblings")
        })?;
        Ok(InsertionSlot {
            parent,
            position: SlotPosition::After(anchor),
        })
    }
}

/// Builds the binding record for a new artifact.
///
/// The id is a placeholder under the structure resource; the server assigns
/// the durable id when it applies the update.
#[derive(Debug, Clone)]
pub struct InsertionPlanner {
    placeholder: BindingId,
}

impl InsertionPlanner {
    /// Planner whose placeholder is unused in `tree`
    #[must_use]
    pub fn for_structure(tree: &ModuleStructure) -> Self {
        let base = tree.binding(tree.root()).id.as_str().to_owned();
        let placeholder = (1u32..)
            .map(|n| BindingId::new(format!("{base}#{n}")))
            .find(|id| tree.find(id).is_none())
            .unwrap_or_else(|| BindingId::new(format!("{base}#new")));
        Self { placeholder }
    }

    /// Placeholder id the next binding will carry
    #[inline]
    #[must_use]
    pub fn placeholder(&self) -> &BindingId {
        &self.placeholder
    }

    /// Non-heading binding with no children wrapping `artifact`
    pub fn plan(
        &self,
        artifact: &ResourceRef,
        module: &ResourceRef,
        component: &ResourceRef,
    ) -> Result<Binding> {
        if artifact.is_empty() {
            return Err(StructureError::MissingArtifactReference);
        }
        Ok(Binding::new(self.placeholder.clone())
            .with_component(component.clone())
            .with_artifact(artifact.clone())
            .with_module(module.clone())
            .with_extra(Extra::Field(
                "type".to_owned(),
                serde_json::Value::String(BINDING_RECORD_TYPE.to_owned()),
            )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_with_h1() -> ModuleStructure {
        let mut tree = ModuleStructure::new(Binding::new("https://rm/m1/structure"));
        tree.append_child(tree.root(), Binding::new("h1").heading())
            .unwrap();
        tree
    }

    #[test]
    fn plan_builds_leaf_binding() {
        let tree = tree_with_h1();
        let planner = InsertionPlanner::for_structure(&tree);
        let b = planner
            .plan(&"https://rm/a9".into(), &"https://rm/m1".into(), &"https://rm/c1".into())
            .unwrap();
        assert!(!b.is_heading);
        assert_eq!(b.id.as_str(), "https://rm/m1/structure#1");
        assert_eq!(b.bound_artifact, Some(ResourceRef::new("https://rm/a9")));
    }

    #[test]
    fn placeholder_skips_taken_ids() {
        let mut tree = tree_with_h1();
        tree.append_child(tree.root(), Binding::new("https://rm/m1/structure#1"))
            .unwrap();
        let planner = InsertionPlanner::for_structure(&tree);
        assert_eq!(planner.placeholder().as_str(), "https://rm/m1/structure#2");
    }

    #[test]
    fn empty_artifact_rejected() {
        let planner = InsertionPlanner::for_structure(&tree_with_h1());
        let err = planner
            .plan(&"".into(), &"m".into(), &"c".into())
            .unwrap_err();
        assert_eq!(err, StructureError::MissingArtifactReference);
    }

    #[test]
    fn after_sibling_policy() {
        let mut tree = tree_with_h1();
        let h1 = tree.find(&"h1".into()).unwrap();
        let a = tree.append_child(h1, Binding::new("a")).unwrap();
        tree.append_child(h1, Binding::new("c")).unwrap();

        let slot = AfterSibling::new("a").locate(&tree).unwrap();
        assert_eq!(slot.parent, h1);
        assert_eq!(slot.position, SlotPosition::After(a));

        assert!(AfterSibling::new("https://rm/m1/structure").locate(&tree).is_err());
    }
}
