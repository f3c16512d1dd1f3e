//! Pre-order walk over a module structure

use crate::binding::Binding;
use crate::tree::{ModuleStructure, NodeId};

/// Event emitted by [`Walk`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WalkEvent<'a> {
    /// A children container opens; `depth` is 1 for the root's children
    EnterLevel { depth: usize },
    /// A binding, visited before its own children container
    Node {
        node: NodeId,
        binding: &'a Binding,
        depth: usize,
    },
    /// The most recently opened container closes
    ExitLevel { depth: usize },
}

#[derive(Debug)]
struct Frame {
    owner: NodeId,
    next: usize,
    depth: usize,
    opened: bool,
}

/// Lazy pre-order walk with an explicit stack.
///
/// The root itself is not reported; its children container is level 1. Every
/// visited binding gets a level pair even when it has no children. The walk
/// borrows the tree, so the snapshot cannot change underneath it.
#[derive(Debug)]
pub struct Walk<'a> {
    tree: &'a ModuleStructure,
    stack: Vec<Frame>,
}

impl<'a> Walk<'a> {
    pub(crate) fn new(tree: &'a ModuleStructure) -> Self {
        Self {
            tree,
            stack: vec![Frame {
                owner: tree.root(),
                next: 0,
                depth: 1,
                opened: false,
            }],
        }
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = WalkEvent<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        let frame = self.stack.last_mut()?;

        if !frame.opened {
            frame.opened = true;
            return Some(WalkEvent::EnterLevel { depth: frame.depth });
        }

        let children = tree.children(frame.owner);
        if let Some(&child) = children.get(frame.next) {
            frame.next += 1;
            let depth = frame.depth;
            self.stack.push(Frame {
                owner: child,
                next: 0,
                depth: depth + 1,
                opened: false,
            });
            let binding = tree.get(child)?;
            return Some(WalkEvent::Node {
                node: child,
                binding,
                depth,
            });
        }

        let depth = frame.depth;
        self.stack.pop();
        Some(WalkEvent::ExitLevel { depth })
    }
}
