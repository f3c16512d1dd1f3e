//! RDF/XML containment form
//!
//! ```text
//! rdf:RDF
//!   rm_modules:Binding (structure root)
//!     rm_modules:childBindings
//!       rm_modules:Binding ...
//! ```
//!
//! An empty container is written as `childBindings rdf:resource="rdf:nil"`.
//! Binding properties the model does not know are carried as raw elements.

use crate::binding::{Binding, Extra, ResourceRef};
use crate::error::{Result, StructureError};
use crate::markup::{Element, Namespaces, QName};
use crate::tree::{ModuleStructure, NodeId};
use crate::vocab::{OSLC_CONFIG, RDF, RDF_NIL, RM_MODULES, XSD_BOOLEAN};
use tracing::{debug, trace};

pub(super) fn decode(root: &Element, namespaces: &Namespaces) -> Result<ModuleStructure> {
    if !root.is(RDF, "RDF") {
        return Err(StructureError::malformed(format!(
            "document element is {}, expected rdf:RDF",
            root.name
        )));
    }
    let top = root
        .child(RM_MODULES, "Binding")
        .ok_or_else(|| StructureError::malformed("no structure root Binding under rdf:RDF"))?;

    let (root_binding, children) = read_binding(top)?;
    let mut tree = ModuleStructure::new(root_binding).with_namespaces(namespaces.clone());
    let mut pending = vec![(tree.root(), children)];

    while let Some((parent, children)) = pending.pop() {
        for element in children {
            let (binding, grandchildren) = read_binding(element)?;
            let node = tree
                .append_child(parent, binding)
                .map_err(|err| match err {
                    StructureError::DuplicateBinding(id) => {
                        StructureError::malformed(format!("binding {id} appears more than once"))
                    }
                    other => other,
                })?;
            pending.push((node, grandchildren));
        }
    }
    debug!(bindings = tree.binding_count(), "markup structure decoded");
    Ok(tree)
}

fn read_binding(element: &Element) -> Result<(Binding, Vec<&Element>)> {
    let id = element
        .about()
        .ok_or_else(|| StructureError::malformed("Binding without rdf:about"))?;
    let mut binding = Binding::new(id);
    let mut container: Option<Vec<&Element>> = None;

    for property in element.elements() {
        if property.is(RM_MODULES, "childBindings") {
            if container.is_some() {
                return Err(StructureError::malformed(format!(
                    "binding {id} has two childBindings containers"
                )));
            }
            container = Some(read_container(id, property)?);
        } else if property.is(RM_MODULES, "isHeading") {
            binding.is_heading = property.text().trim() == "true";
        } else if property.is(RM_MODULES, "boundArtifact") {
            binding.bound_artifact = Some(resource_of(id, property)?);
        } else if property.is(RM_MODULES, "module") {
            binding.module = Some(resource_of(id, property)?);
        } else if property.is(OSLC_CONFIG, "component") {
            binding.component = Some(resource_of(id, property)?);
        } else {
            trace!(%id, property = %property.name, "keeping unknown binding property");
            binding.extras.push(Extra::Markup(property.clone()));
        }
    }

    let children = container.ok_or_else(|| {
        StructureError::malformed(format!("binding {id} has no childBindings container"))
    })?;
    Ok((binding, children))
}

fn read_container<'a>(id: &str, container: &'a Element) -> Result<Vec<&'a Element>> {
    if let Some(resource) = container.resource() {
        if resource != RDF_NIL || container.has_elements() {
            return Err(StructureError::malformed(format!(
                "childBindings of {id} points at {resource} instead of holding bindings"
            )));
        }
        return Ok(Vec::new());
    }
    container
        .elements()
        .map(|child| {
            if child.is(RM_MODULES, "Binding") {
                Ok(child)
            } else {
                Err(StructureError::malformed(format!(
                    "childBindings of {id} contains {}",
                    child.name
                )))
            }
        })
        .collect()
}

fn resource_of(id: &str, property: &Element) -> Result<ResourceRef> {
    property.resource().map(ResourceRef::from).ok_or_else(|| {
        StructureError::malformed(format!(
            "{} of binding {id} has no rdf:resource",
            property.name
        ))
    })
}

struct Names {
    binding: QName,
    child_bindings: QName,
    is_heading: QName,
    bound_artifact: QName,
    module: QName,
    component: QName,
    about: QName,
    resource: QName,
    datatype: QName,
    parse_type: QName,
}

impl Names {
    fn new(ns: &Namespaces) -> Self {
        let rm = |local: &str| ns.name(RM_MODULES, "rm_modules", local);
        let rdf = |local: &str| ns.name(RDF, "rdf", local);
        Self {
            binding: rm("Binding"),
            child_bindings: rm("childBindings"),
            is_heading: rm("isHeading"),
            bound_artifact: rm("boundArtifact"),
            module: rm("module"),
            component: ns.name(OSLC_CONFIG, "oslc_config", "component"),
            about: rdf("about"),
            resource: rdf("resource"),
            datatype: rdf("datatype"),
            parse_type: rdf("parseType"),
        }
    }

    fn reference(&self, name: &QName, target: &ResourceRef) -> Element {
        Element::new(name.clone()).with_attribute(self.resource.clone(), target.as_str())
    }
}

pub(super) fn encode(tree: &ModuleStructure) -> (Element, Namespaces) {
    let mut namespaces = tree.namespaces().clone();
    namespaces.merge(&Namespaces::with_defaults());
    let names = Names::new(&namespaces);

    let mut document = Element::new(namespaces.name(RDF, "rdf", "RDF"));
    for (prefix, uri) in namespaces.iter() {
        document = document.with_declaration(prefix, uri);
    }
    let document = document.with_child(binding_element(tree, tree.root(), &names));
    (document, namespaces)
}

fn binding_element(tree: &ModuleStructure, node: NodeId, names: &Names) -> Element {
    let binding = tree.binding(node);
    let is_heading = if binding.is_heading { "true" } else { "false" };
    let mut element = Element::new(names.binding.clone())
        .with_attribute(names.about.clone(), binding.id.as_str())
        .with_child(
            Element::new(names.is_heading.clone())
                .with_attribute(names.datatype.clone(), XSD_BOOLEAN)
                .with_text(is_heading),
        );

    if let Some(component) = &binding.component {
        element = element.with_child(names.reference(&names.component, component));
    }
    if let Some(artifact) = &binding.bound_artifact {
        element = element.with_child(names.reference(&names.bound_artifact, artifact));
    }
    if let Some(module) = &binding.module {
        element = element.with_child(names.reference(&names.module, module));
    }
    for extra in &binding.extras {
        if let Extra::Markup(property) = extra {
            element = element.with_child(property.clone());
        }
    }

    let children = tree.children(node);
    let container = if children.is_empty() {
        Element::new(names.child_bindings.clone()).with_attribute(names.resource.clone(), RDF_NIL)
    } else {
        children.iter().fold(
            Element::new(names.child_bindings.clone())
                .with_attribute(names.parse_type.clone(), "Collection"),
            |container, child| container.with_child(binding_element(tree, *child, names)),
        )
    };
    element.with_child(container)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_body, encode_body, WireForm};
    use pretty_assertions::assert_eq;

    const STRUCTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:rm_modules="http://jazz.net/ns/rm/dng/module#"
         xmlns:oslc_config="http://open-services.net/ns/config#"
         xmlns:dcterms="http://purl.org/dc/terms/">
  <rm_modules:Binding rdf:about="https://rm/resources/M1/structure">
    <rm_modules:module rdf:resource="https://rm/resources/M1"/>
    <rm_modules:childBindings rdf:parseType="Collection">
      <rm_modules:Binding rdf:about="https://rm/resources/MB_1">
        <rm_modules:isHeading rdf:datatype="http://www.w3.org/2001/XMLSchema#boolean">true</rm_modules:isHeading>
        <oslc_config:component rdf:resource="https://rm/cm/component/C1"/>
        <rm_modules:boundArtifact rdf:resource="https://rm/resources/CA_1"/>
        <rm_modules:module rdf:resource="https://rm/resources/M1"/>
        <dcterms:modified>2024-01-01T00:00:00Z</dcterms:modified>
        <rm_modules:childBindings rdf:resource="http://www.w3.org/1999/02/22-rdf-syntax-ns#nil"/>
      </rm_modules:Binding>
    </rm_modules:childBindings>
  </rm_modules:Binding>
</rdf:RDF>"#;

    #[test]
    fn decode_reads_containment() {
        let tree = decode_body(WireForm::Markup, STRUCTURE).unwrap();
        assert_eq!(tree.binding_count(), 2);

        let h1 = tree.children(tree.root())[0];
        let b = tree.binding(h1);
        assert!(b.is_heading);
        assert_eq!(b.bound_artifact, Some(ResourceRef::new("https://rm/resources/CA_1")));
        assert_eq!(b.component, Some(ResourceRef::new("https://rm/cm/component/C1")));
        assert_eq!(b.extras.len(), 1);
        assert!(tree.children(h1).is_empty());
    }

    #[test]
    fn unknown_properties_survive_round_trip() {
        let tree = decode_body(WireForm::Markup, STRUCTURE).unwrap();
        let body = encode_body(&tree, WireForm::Markup).unwrap();
        assert!(body.contains("dcterms:modified"));
        assert!(body.contains("xmlns:dcterms=\"http://purl.org/dc/terms/\""));
        assert_eq!(decode_body(WireForm::Markup, &body).unwrap(), tree);
    }

    #[test]
    fn empty_container_written_as_nil() {
        let tree = decode_body(WireForm::Markup, STRUCTURE).unwrap();
        let body = encode_body(&tree, WireForm::Markup).unwrap();
        assert!(body.contains(RDF_NIL));
        assert!(body.contains("rdf:parseType=\"Collection\""));
    }

    #[test]
    fn missing_container_is_malformed() {
        let doc = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
                       xmlns:rm_modules="http://jazz.net/ns/rm/dng/module#">
            <rm_modules:Binding rdf:about="s"/></rdf:RDF>"#;
        let err = decode_body(WireForm::Markup, doc).unwrap_err();
        assert!(matches!(err, StructureError::Malformed(m) if m.contains("no childBindings")));
    }

    #[test]
    fn missing_root_binding_is_malformed() {
        let doc = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"/>"#;
        assert!(matches!(
            decode_body(WireForm::Markup, doc),
            Err(StructureError::Malformed(_))
        ));
    }

    #[test]
    fn foreign_element_in_container_is_malformed() {
        let doc = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
                       xmlns:rm_modules="http://jazz.net/ns/rm/dng/module#">
            <rm_modules:Binding rdf:about="s">
              <rm_modules:childBindings><rdf:Description rdf:about="x"/></rm_modules:childBindings>
            </rm_modules:Binding></rdf:RDF>"#;
        assert!(matches!(
            decode_body(WireForm::Markup, doc),
            Err(StructureError::Malformed(_))
        ));
    }

    #[test]
    fn duplicate_binding_is_malformed() {
        let doc = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
                       xmlns:rm_modules="http://jazz.net/ns/rm/dng/module#">
            <rm_modules:Binding rdf:about="s">
              <rm_modules:childBindings rdf:parseType="Collection">
                <rm_modules:Binding rdf:about="a"><rm_modules:childBindings rdf:resource="http://www.w3.org/1999/02/22-rdf-syntax-ns#nil"/></rm_modules:Binding>
                <rm_modules:Binding rdf:about="a"><rm_modules:childBindings rdf:resource="http://www.w3.org/1999/02/22-rdf-syntax-ns#nil"/></rm_modules:Binding>
              </rm_modules:childBindings>
            </rm_modules:Binding></rdf:RDF>"#;
        let err = decode_body(WireForm::Markup, doc).unwrap_err();
        assert!(matches!(err, StructureError::Malformed(m) if m.contains("more than once")));
    }

    #[test]
    fn heading_flag_written_back_when_false() {
        let doc = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
                       xmlns:rm_modules="http://jazz.net/ns/rm/dng/module#">
            <rm_modules:Binding rdf:about="s">
              <rm_modules:isHeading rdf:datatype="http://www.w3.org/2001/XMLSchema#boolean">false</rm_modules:isHeading>
              <rm_modules:childBindings rdf:parseType="Collection">
                <rm_modules:Binding rdf:about="a">
                  <rm_modules:isHeading rdf:datatype="http://www.w3.org/2001/XMLSchema#boolean">false</rm_modules:isHeading>
                  <rm_modules:childBindings rdf:resource="http://www.w3.org/1999/02/22-rdf-syntax-ns#nil"/>
                </rm_modules:Binding>
              </rm_modules:childBindings>
            </rm_modules:Binding></rdf:RDF>"#;
        let tree = decode_body(WireForm::Markup, doc).unwrap();
        let body = encode_body(&tree, WireForm::Markup).unwrap();
        assert_eq!(body.matches(">false</rm_modules:isHeading>").count(), 2);
        assert_eq!(decode_body(WireForm::Markup, &body).unwrap(), tree);
    }

    #[test]
    fn heading_flag_precedes_references() {
        let tree = decode_body(WireForm::Markup, STRUCTURE).unwrap();
        let body = encode_body(&tree, WireForm::Markup).unwrap();
        let flag = body.find(">true</rm_modules:isHeading>").unwrap();
        let artifact = body.find("rm_modules:boundArtifact").unwrap();
        assert!(flag < artifact);
    }
}
