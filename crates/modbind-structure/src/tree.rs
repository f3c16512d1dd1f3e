//! Arena-backed module structure tree

use crate::binding::{Binding, BindingId};
use crate::error::{Result, StructureError};
use crate::markup::Namespaces;
use crate::numbering::{SectionLabel, SectionNumbering};
use crate::planner::{FirstTopLevelSlot, InsertionPolicy, InsertionSlot, SlotPosition};
use crate::walk::Walk;
use std::collections::HashMap;

/// Handle to a binding inside one [`ModuleStructure`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Slot {
    binding: Binding,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Rooted ordered tree of bindings.
///
/// Built from one fetched snapshot; nodes are only ever added, so every
/// non-root binding keeps exactly one parent and the tree stays acyclic.
#[derive(Debug, Clone)]
pub struct ModuleStructure {
    slots: Vec<Slot>,
    index: HashMap<BindingId, NodeId>,
    namespaces: Namespaces,
}

impl ModuleStructure {
    /// Create a tree holding only its root
    #[must_use]
    pub fn new(root: Binding) -> Self {
        let mut index = HashMap::new();
        index.insert(root.id.clone(), NodeId(0));
        Self {
            slots: vec![Slot {
                binding: root,
                parent: None,
                children: Vec::new(),
            }],
            index,
            namespaces: Namespaces::new(),
        }
    }

    /// With namespace bindings seen while decoding
    #[must_use]
    pub fn with_namespaces(mut self, namespaces: Namespaces) -> Self {
        self.namespaces = namespaces;
        self
    }

    /// Namespace bindings carried for markup re-encoding
    #[inline]
    #[must_use]
    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Binding behind a handle
    #[inline]
    #[must_use]
    pub fn get(&self, node: NodeId) -> Option<&Binding> {
        self.slots.get(node.0).map(|s| &s.binding)
    }

    /// Binding behind a handle issued by this tree
    ///
    /// # Panics
    ///
    /// Panics if `node` was issued by another tree.
    #[inline]
    #[must_use]
    pub fn binding(&self, node: NodeId) -> &Binding {
        &self.slots[node.0].binding
    }

    /// Ordered children of a node, empty for unknown handles
    #[inline]
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.slots.get(node.0).map_or(&[], |s| s.children.as_slice())
    }

    #[inline]
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.slots.get(node.0).and_then(|s| s.parent)
    }

    /// Find a binding by id
    #[inline]
    #[must_use]
    pub fn find(&self, id: &BindingId) -> Option<NodeId> {
        self.index.get(id).copied()
    }

    /// Find the binding wrapping an artifact
    #[must_use]
    pub fn find_artifact(&self, artifact: &str) -> Option<NodeId> {
        self.walk().find_map(|event| match event {
            crate::WalkEvent::Node { node, binding, .. }
                if binding.bound_artifact.as_ref().map(|a| a.as_str()) == Some(artifact) =>
            {
                Some(node)
            }
            _ => None,
        })
    }

    /// Number of bindings including the root
    #[inline]
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.slots.len()
    }

    /// Append a binding as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, binding: Binding) -> Result<NodeId> {
        let position = self.children(parent).len();
        self.insert_child(parent, position, binding)
    }

    /// Insert a binding among the children of `parent` at `position`
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        position: usize,
        binding: Binding,
    ) -> Result<NodeId> {
        if parent.0 >= self.slots.len() {
            return Err(StructureError::UnknownNode(parent.0));
        }
        if self.index.contains_key(&binding.id) {
            return Err(StructureError::DuplicateBinding(binding.id));
        }

        let node = NodeId(self.slots.len());
        self.index.insert(binding.id.clone(), node);
        self.slots.push(Slot {
            binding,
            parent: Some(parent),
            children: Vec::new(),
        });

        let children = &mut self.slots[parent.0].children;
        let position = position.min(children.len());
        children.insert(position, node);
        Ok(node)
    }

    /// Place a binding into a slot chosen by an insertion policy
    pub fn insert(&mut self, slot: InsertionSlot, binding: Binding) -> Result<NodeId> {
        match slot.position {
            SlotPosition::Last => self.append_child(slot.parent, binding),
            SlotPosition::After(sibling) => {
                let position = self
                    .children(slot.parent)
                    .iter()
                    .position(|c| *c == sibling)
                    .ok_or(StructureError::UnknownNode(sibling.0))?;
                self.insert_child(slot.parent, position + 1, binding)
            }
        }
    }

    /// Children container of the root's first child binding
    pub fn find_insertion_slot(&self) -> Result<NodeId> {
        FirstTopLevelSlot.locate(self).map(|slot| slot.parent)
    }

    /// Pre-order walk emitting level and node events
    #[inline]
    #[must_use]
    pub fn walk(&self) -> Walk<'_> {
        Walk::new(self)
    }

    /// Section label of every binding below the root, in document order
    pub fn section_labels(&self) -> Result<Vec<(NodeId, SectionLabel)>> {
        let mut numbering = SectionNumbering::new();
        let mut labels = Vec::new();
        for event in self.walk() {
            if let (Some(label), crate::WalkEvent::Node { node, .. }) =
                (numbering.observe(&event)?, event)
            {
                labels.push((node, label));
            }
        }
        Ok(labels)
    }
}

/// Trees are equal when their bindings and child order match; arena layout
/// and namespace bindings are ignored.
impl PartialEq for ModuleStructure {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self.root(), other.root())];
        while let Some((a, b)) = pending.pop() {
            if self.get(a) != other.get(b) {
                return false;
            }
            let (ca, cb) = (self.children(a), other.children(b));
            if ca.len() != cb.len() {
                return false;
            }
            pending.extend(ca.iter().copied().zip(cb.iter().copied()));
        }
        true
    }
}
