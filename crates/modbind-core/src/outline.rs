//! Numbered outline of a module structure

use crate::error::BindError;
use modbind_oslc::{ComponentContext, RmService};
use modbind_structure::{
    BindingId, ModuleStructure, NodeId, ResourceRef, SectionLabel, SectionNumbering, WalkEvent,
};
use std::fmt;

/// One line of the outline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub node: NodeId,
    /// Nesting depth, 1 for top-level bindings
    pub depth: usize,
    pub label: SectionLabel,
    pub binding: BindingId,
    pub artifact: Option<ResourceRef>,
    pub identifier: Option<String>,
    pub title: Option<String>,
}

impl fmt::Display for OutlineEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = "    ".repeat(self.depth.saturating_sub(1));
        write!(
            f,
            "{:>8} {indent}{}",
            self.identifier.as_deref().unwrap_or("-"),
            self.label
        )?;
        if let Some(title) = &self.title {
            write!(f, "  {title}")?;
        }
        Ok(())
    }
}

/// Section-numbered listing of every binding below the root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outline {
    pub entries: Vec<OutlineEntry>,
}

impl Outline {
    /// Number a structure without contacting the server
    pub fn of(tree: &ModuleStructure) -> Result<Self, BindError> {
        let mut numbering = SectionNumbering::new();
        let mut entries = Vec::with_capacity(tree.binding_count().saturating_sub(1));
        for event in tree.walk() {
            let label = numbering.observe(&event)?;
            let (
                Some(label),
                WalkEvent::Node {
                    node,
                    binding,
                    depth,
                },
            ) = (label, event)
            else {
                continue;
            };
            entries.push(OutlineEntry {
                node,
                depth,
                label,
                binding: binding.id.clone(),
                artifact: binding.bound_artifact.clone(),
                identifier: None,
                title: None,
            });
        }
        Ok(Self { entries })
    }

    /// Fill identifiers and titles from the server
    pub async fn describe<S: RmService + ?Sized>(
        &mut self,
        service: &S,
        ctx: &ComponentContext,
    ) -> Result<(), BindError> {
        for entry in &mut self.entries {
            if let Some(artifact) = &entry.artifact {
                let summary = service.artifact_summary(ctx, artifact).await?;
                entry.identifier = summary.identifier;
                entry.title = summary.title;
            }
        }
        Ok(())
    }

    /// Label of one node
    #[must_use]
    pub fn label_of(&self, node: NodeId) -> Option<&SectionLabel> {
        self.entries
            .iter()
            .find(|e| e.node == node)
            .map(|e| &e.label)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Outline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modbind_structure::Binding;
    use pretty_assertions::assert_eq;

    fn tree() -> ModuleStructure {
        let mut tree = ModuleStructure::new(Binding::new("s"));
        let root = tree.root();
        let h1 = tree
            .append_child(root, Binding::new("h1").heading().with_artifact("a/h1"))
            .unwrap();
        tree.append_child(h1, Binding::new("r1").with_artifact("a/r1"))
            .unwrap();
        tree.append_child(root, Binding::new("h2").heading().with_artifact("a/h2"))
            .unwrap();
        tree
    }

    #[test]
    fn labels_and_depths() {
        let outline = Outline::of(&tree()).unwrap();
        let rows: Vec<_> = outline
            .entries
            .iter()
            .map(|e| (e.binding.as_str(), e.depth, e.label.as_str()))
            .collect();
        assert_eq!(rows, vec![("h1", 1, "1"), ("r1", 2, "1-1"), ("h2", 1, "2")]);
    }

    #[test]
    fn rendering() {
        let mut outline = Outline::of(&tree()).unwrap();
        outline.entries[1].identifier = Some("1201".into());
        outline.entries[1].title = Some("Stop".into());
        let text = outline.to_string();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "       - 1");
        assert_eq!(lines[1], "    1201     1-1  Stop");
    }

    #[test]
    fn empty_structure() {
        let outline = Outline::of(&ModuleStructure::new(Binding::new("s"))).unwrap();
        assert!(outline.is_empty());
        assert_eq!(outline.to_string(), "");
    }
}
