//! Reading RDF/XML server documents
//!
//! Only the striped RDF/XML shapes Jazz servers emit are handled: node
//! elements carrying `rdf:about`, property elements carrying either
//! `rdf:resource` or text.

use crate::types::{QueryFilter, QueryResults};
use crate::vocab::{self, OSLC, RDF, RDFS};
use modbind_structure::{Element, ResourceRef};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// `rdf:resource` of the first matching descendant property
#[must_use]
pub fn resource_of(root: &Element, namespace: &str, local: &str) -> Option<ResourceRef> {
    root.descendants(namespace, local)
        .into_iter()
        .find_map(Element::resource)
        .map(ResourceRef::from)
}

/// All `rdf:resource` values of matching child properties
#[must_use]
pub fn resources_of(node: &Element, namespace: &str, local: &str) -> Vec<ResourceRef> {
    node.elements()
        .filter(|e| e.is(namespace, local))
        .filter_map(Element::resource)
        .map(ResourceRef::from)
        .collect()
}

/// Trimmed text of the first matching descendant, if not blank
#[must_use]
pub fn text_of(root: &Element, namespace: &str, local: &str) -> Option<String> {
    root.descendants(namespace, local)
        .into_iter()
        .map(|e| e.text().trim().to_owned())
        .find(|t| !t.is_empty())
}

/// Simple properties of one node element, keyed by compacted name
#[must_use]
pub fn properties(node: &Element) -> BTreeMap<String, String> {
    let mut props = BTreeMap::new();
    if !node.is(RDF, "Description") {
        props.insert(
            "rdf:type".to_owned(),
            format!(
                "{}{}",
                node.name.namespace.as_deref().unwrap_or_default(),
                node.name.local
            ),
        );
    }
    for property in node.elements() {
        let key = vocab::compact(property.name.namespace.as_deref(), &property.name.local);
        let value = match property.resource() {
            Some(uri) => uri.to_owned(),
            None => property.text().trim().to_owned(),
        };
        props.entry(key).or_insert(value);
    }
    props
}

/// Members of an OSLC query response, in document order
#[must_use]
pub fn query_members(root: &Element) -> QueryResults {
    let mut nodes: HashMap<&str, &Element> = HashMap::new();
    let mut stack = vec![root];
    while let Some(e) = stack.pop() {
        if let Some(about) = e.about() {
            nodes.entry(about).or_insert(e);
        }
        stack.extend(e.elements());
    }

    let mut members: Vec<&str> = Vec::new();
    for member in root.descendants(RDFS, "member") {
        if let Some(uri) = member.resource() {
            members.push(uri);
        } else if let Some(inline) = member.elements().find_map(Element::about) {
            members.push(inline);
        }
    }

    // Some servers omit rdfs:member; then every top-level node that is not
    // the response description is a result.
    if members.is_empty() {
        members = root
            .elements()
            .filter(|e| !e.is(OSLC, "ResponseInfo") && e.child(OSLC, "totalCount").is_none())
            .filter_map(Element::about)
            .collect();
    }

    let mut results = QueryResults::new();
    for uri in members {
        let props = nodes.get(uri).map(|n| properties(n)).unwrap_or_default();
        results.entry(ResourceRef::new(uri)).or_insert(props);
    }
    results
}

/// `oslc.where` value joining filters with `and`
#[must_use]
pub fn where_clause(filters: &[QueryFilter]) -> String {
    filters
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" and ")
}

/// `oslc.prefix` value declaring every prefix the filters use
#[must_use]
pub fn prefix_clause(filters: &[QueryFilter]) -> String {
    let used: BTreeSet<&str> = filters.iter().filter_map(QueryFilter::prefix).collect();
    used.into_iter()
        .filter_map(|p| vocab::namespace_of(p).map(|ns| format!("{p}=<{ns}>")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Service provider capabilities (`oslc:CreationFactory`, `oslc:QueryCapability`)
/// declaring a resource type
#[must_use]
pub fn capabilities<'a>(provider: &'a Element, kind: &str, resource_type: &str) -> Vec<&'a Element> {
    provider
        .descendants(OSLC, kind)
        .into_iter()
        .filter(|cap| {
            cap.elements()
                .filter(|p| p.is(OSLC, "resourceType"))
                .any(|p| p.resource() == Some(resource_type))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::{DCTERMS, REQUIREMENT_TYPE};
    use modbind_structure::markup;
    use pretty_assertions::assert_eq;

    const QUERY: &str = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
        xmlns:rdfs="http://www.w3.org/2000/01/rdf-schema#"
        xmlns:dcterms="http://purl.org/dc/terms/"
        xmlns:nav="http://jazz.net/ns/rm/navigation#"
        xmlns:oslc="http://open-services.net/ns/core#">
      <rdf:Description rdf:about="https://rm/query">
        <rdfs:member rdf:resource="https://rm/resources/A2"/>
        <rdfs:member rdf:resource="https://rm/resources/A1"/>
      </rdf:Description>
      <rdf:Description rdf:about="https://rm/resources/A1">
        <dcterms:identifier>17</dcterms:identifier>
        <nav:parent rdf:resource="https://rm/folders/F"/>
      </rdf:Description>
      <rdf:Description rdf:about="https://rm/resources/A2">
        <dcterms:identifier>17</dcterms:identifier>
      </rdf:Description>
      <oslc:ResponseInfo rdf:about="https://rm/query?x"><oslc:totalCount>2</oslc:totalCount></oslc:ResponseInfo>
    </rdf:RDF>"#;

    #[test]
    fn members_in_document_order() {
        let root = markup::parse(QUERY).unwrap();
        let results = query_members(&root);
        let keys: Vec<_> = results.keys().map(ResourceRef::as_str).collect();
        assert_eq!(keys, vec!["https://rm/resources/A2", "https://rm/resources/A1"]);
        assert_eq!(
            results[&ResourceRef::new("https://rm/resources/A1")].get("nav:parent").map(String::as_str),
            Some("https://rm/folders/F")
        );
    }

    #[test]
    fn typed_node_reports_type() {
        let doc = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
            xmlns:jazz_rm="http://jazz.net/ns/rm#" xmlns:dcterms="http://purl.org/dc/terms/">
            <jazz_rm:Module rdf:about="https://rm/m"><dcterms:title>M</dcterms:title></jazz_rm:Module>
        </rdf:RDF>"#;
        let root = markup::parse(doc).unwrap();
        let results = query_members(&root);
        let props = &results[&ResourceRef::new("https://rm/m")];
        assert_eq!(props["rdf:type"], "http://jazz.net/ns/rm#Module");
        assert_eq!(props["dcterms:title"], "M");
    }

    #[test]
    fn where_and_prefix_clauses() {
        let filters = [
            QueryFilter::literal("dcterms:identifier", "17"),
            QueryFilter::resource("rdf:type", "http://jazz.net/ns/rm#Module"),
        ];
        assert_eq!(
            where_clause(&filters),
            r#"dcterms:identifier="17" and rdf:type=<http://jazz.net/ns/rm#Module>"#
        );
        assert_eq!(
            prefix_clause(&filters),
            format!("dcterms=<{DCTERMS}>,rdf=<{RDF}>")
        );
    }

    #[test]
    fn capability_by_resource_type() {
        let doc = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
            xmlns:oslc="http://open-services.net/ns/core#">
          <oslc:ServiceProvider rdf:about="https://rm/sp">
            <oslc:service><oslc:Service>
              <oslc:creationFactory><oslc:CreationFactory>
                <oslc:resourceType rdf:resource="http://jazz.net/ns/rm#Module"/>
                <oslc:creation rdf:resource="https://rm/factory/modules"/>
              </oslc:CreationFactory></oslc:creationFactory>
              <oslc:creationFactory><oslc:CreationFactory>
                <oslc:resourceType rdf:resource="http://open-services.net/ns/rm#Requirement"/>
                <oslc:creation rdf:resource="https://rm/factory/reqs"/>
                <oslc:resourceShape rdf:resource="https://rm/shapes/1"/>
                <oslc:resourceShape rdf:resource="https://rm/shapes/2"/>
              </oslc:CreationFactory></oslc:creationFactory>
            </oslc:Service></oslc:service>
          </oslc:ServiceProvider>
        </rdf:RDF>"#;
        let root = markup::parse(doc).unwrap();
        let caps = capabilities(&root, "CreationFactory", REQUIREMENT_TYPE);
        assert_eq!(caps.len(), 1);
        assert_eq!(
            resource_of(caps[0], OSLC, "creation").unwrap().as_str(),
            "https://rm/factory/reqs"
        );
        assert_eq!(resources_of(caps[0], OSLC, "resourceShape").len(), 2);
    }
}
