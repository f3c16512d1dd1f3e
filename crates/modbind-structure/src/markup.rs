//! Namespace-aware element tree over quick-xml
//!
//! Server documents are small RDF/XML payloads. They are read into an owned
//! [`Element`] tree whose names are resolved against their namespace, so lookups
//! do not depend on the prefixes a server happens to choose.

use crate::error::{Result, StructureError};
use indexmap::IndexMap;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::{PrefixDeclaration, QName as RawName, ResolveResult};
use quick_xml::reader::NsReader;
use quick_xml::writer::Writer;
use std::fmt;

/// Namespace-qualified name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// Resolved namespace URI
    pub namespace: Option<String>,
    /// Prefix as written
    pub prefix: Option<String>,
    /// Local part
    pub local: String,
}

impl QName {
    /// Create a prefixed name
    #[inline]
    #[must_use]
    pub fn new(namespace: &str, prefix: &str, local: &str) -> Self {
        Self {
            namespace: Some(namespace.to_owned()),
            prefix: (!prefix.is_empty()).then(|| prefix.to_owned()),
            local: local.to_owned(),
        }
    }

    /// Create an unqualified name
    #[inline]
    #[must_use]
    pub fn unqualified(local: &str) -> Self {
        Self {
            namespace: None,
            prefix: None,
            local: local.to_owned(),
        }
    }

    /// Match on namespace and local name
    #[inline]
    #[must_use]
    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.local == local && self.namespace.as_deref() == Some(namespace)
    }

    /// Name as written in a document
    #[must_use]
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.local),
            None => self.local.clone(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{ns}}}{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// Element attribute
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

/// Element content
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// Owned element with resolved names
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: QName,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
    /// Namespace declarations made on this element, `""` for the default namespace
    pub declarations: Vec<(String, String)>,
}

impl Element {
    /// Create empty element
    #[inline]
    #[must_use]
    pub fn new(name: QName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            children: Vec::new(),
            declarations: Vec::new(),
        }
    }

    /// With attribute
    #[must_use]
    pub fn with_attribute(mut self, name: QName, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute {
            name,
            value: value.into(),
        });
        self
    }

    /// With child element
    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// With text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// With namespace declaration
    #[must_use]
    pub fn with_declaration(mut self, prefix: &str, uri: &str) -> Self {
        self.declarations.push((prefix.to_owned(), uri.to_owned()));
        self
    }

    #[inline]
    #[must_use]
    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.name.is(namespace, local)
    }

    /// Attribute value by resolved name
    #[must_use]
    pub fn attribute(&self, namespace: &str, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.is(namespace, local))
            .map(|a| a.value.as_str())
    }

    /// `rdf:resource` of this property element
    #[inline]
    #[must_use]
    pub fn resource(&self) -> Option<&str> {
        self.attribute(crate::vocab::RDF, "resource")
    }

    /// `rdf:about` of this node element
    #[inline]
    #[must_use]
    pub fn about(&self) -> Option<&str> {
        self.attribute(crate::vocab::RDF, "about")
    }

    /// Child elements in document order
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// First child element with this name
    #[must_use]
    pub fn child(&self, namespace: &str, local: &str) -> Option<&Element> {
        self.elements().find(|e| e.is(namespace, local))
    }

    /// All descendants with this name, pre-order, excluding self
    #[must_use]
    pub fn descendants(&self, namespace: &str, local: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        let mut stack: Vec<&Element> = self.elements().collect();
        stack.reverse();
        while let Some(e) = stack.pop() {
            if e.is(namespace, local) {
                found.push(e);
            }
            let mark = stack.len();
            stack.extend(e.elements());
            stack[mark..].reverse();
        }
        found
    }

    /// First descendant with this name
    #[must_use]
    pub fn descendant(&self, namespace: &str, local: &str) -> Option<&Element> {
        self.descendants(namespace, local).into_iter().next()
    }

    /// Concatenated text of this element and its descendants
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// True when the element has child elements
    #[inline]
    #[must_use]
    pub fn has_elements(&self) -> bool {
        self.elements().next().is_some()
    }
}

fn collect_text(element: &Element, out: &mut String) {
    for child in &element.children {
        match child {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => collect_text(e, out),
        }
    }
}

/// Prefix to namespace bindings, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespaces(IndexMap<String, String>);

impl Namespaces {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bindings the codecs always need
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut ns = Self::new();
        for (prefix, uri) in crate::vocab::DEFAULT_PREFIXES {
            ns.declare(prefix, uri);
        }
        ns
    }

    /// Declare a binding; the first binding of a prefix wins
    pub fn declare(&mut self, prefix: &str, uri: &str) {
        self.0
            .entry(prefix.to_owned())
            .or_insert_with(|| uri.to_owned());
    }

    /// Prefix bound to a namespace
    #[must_use]
    pub fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(p, u)| u.as_str() == uri && !p.is_empty())
            .map(|(p, _)| p.as_str())
    }

    /// Fold another set of bindings into this one
    pub fn merge(&mut self, other: &Namespaces) {
        for (prefix, uri) in other.iter() {
            self.declare(prefix, uri);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Name in `namespace`, using the bound prefix or `fallback`
    #[must_use]
    pub fn name(&self, namespace: &str, fallback: &str, local: &str) -> QName {
        let prefix = self.prefix_for(namespace).unwrap_or(fallback);
        QName::new(namespace, prefix, local)
    }
}

/// Parse a document into its root element
pub fn parse(text: &str) -> Result<Element> {
    parse_document(text).map(|(root, _)| root)
}

/// Parse a document, also returning every namespace binding it declares
pub fn parse_document(text: &str) -> Result<(Element, Namespaces)> {
    let mut reader = NsReader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut namespaces = Namespaces::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let element = open_element(&reader, &start, &mut namespaces)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = open_element(&reader, &start, &mut namespaces)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| StructureError::malformed("unexpected closing tag"))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    let text = text.unescape()?;
                    if !text.is_empty() {
                        top.children.push(Node::Text(text.into_owned()));
                    }
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    let raw = data.into_inner();
                    top.children
                        .push(Node::Text(String::from_utf8_lossy(&raw).into_owned()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(StructureError::malformed("unclosed element at end of document"));
    }
    root.map(|r| (r, namespaces))
        .ok_or_else(|| StructureError::malformed("empty document"))
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(element));
        return Ok(());
    }
    if root.is_some() {
        return Err(StructureError::malformed("more than one document element"));
    }
    *root = Some(element);
    Ok(())
}

fn open_element(
    reader: &NsReader<&[u8]>,
    start: &BytesStart<'_>,
    namespaces: &mut Namespaces,
) -> Result<Element> {
    let (ns, local) = reader.resolve_element(start.name());
    let mut element = Element::new(QName {
        namespace: namespace_of(ns)?,
        prefix: prefix_of(start.name()),
        local: String::from_utf8_lossy(local.as_ref()).into_owned(),
    });

    for attr in start.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?.into_owned();
        if let Some(decl) = attr.key.as_namespace_binding() {
            let prefix = match decl {
                PrefixDeclaration::Default => String::new(),
                PrefixDeclaration::Named(p) => String::from_utf8_lossy(p).into_owned(),
            };
            namespaces.declare(&prefix, &value);
            element.declarations.push((prefix, value));
            continue;
        }
        let (ns, local) = reader.resolve_attribute(attr.key);
        element.attributes.push(Attribute {
            name: QName {
                namespace: namespace_of(ns)?,
                prefix: prefix_of(attr.key),
                local: String::from_utf8_lossy(local.as_ref()).into_owned(),
            },
            value,
        });
    }
    Ok(element)
}

fn namespace_of(resolved: ResolveResult<'_>) -> Result<Option<String>> {
    match resolved {
        ResolveResult::Bound(ns) => Ok(Some(String::from_utf8_lossy(ns.0).into_owned())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(StructureError::malformed(format!(
            "undeclared prefix {}",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

fn prefix_of(name: RawName<'_>) -> Option<String> {
    name.prefix()
        .map(|p| String::from_utf8_lossy(p.as_ref()).into_owned())
}

/// Serialize an element as a standalone document
pub fn write_document(root: &Element) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(write_error)?;
    write_element(&mut writer, root)?;
    String::from_utf8(writer.into_inner()).map_err(write_error)
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<()> {
    let name = element.name.qualified();
    let mut start = BytesStart::new(name.as_str());
    for (prefix, uri) in &element.declarations {
        let key = if prefix.is_empty() {
            "xmlns".to_owned()
        } else {
            format!("xmlns:{prefix}")
        };
        start.push_attribute((key.as_str(), uri.as_str()));
    }
    for attr in &element.attributes {
        start.push_attribute((attr.name.qualified().as_str(), attr.value.as_str()));
    }

    if element.children.is_empty() {
        return writer.write_event(Event::Empty(start)).map_err(write_error);
    }

    writer.write_event(Event::Start(start)).map_err(write_error)?;
    for child in &element.children {
        match child {
            Node::Element(e) => write_element(writer, e)?,
            Node::Text(t) => writer
                .write_event(Event::Text(BytesText::new(t)))
                .map_err(write_error)?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(name.as_str())))
        .map_err(write_error)
}

fn write_error(err: impl fmt::Display) -> StructureError {
    StructureError::malformed(format!("markup write: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::RDF;

    const DOC: &str = r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:dcterms="http://purl.org/dc/terms/">
  <rdf:Description rdf:about="https://rm/a1">
    <dcterms:title>Brake &amp; stop</dcterms:title>
    <dcterms:identifier>42</dcterms:identifier>
  </rdf:Description>
</rdf:RDF>"#;

    #[test]
    fn parse_resolves_namespaces() {
        let (root, ns) = parse_document(DOC).unwrap();
        assert!(root.is(RDF, "RDF"));
        assert_eq!(ns.prefix_for("http://purl.org/dc/terms/"), Some("dcterms"));

        let desc = root.child(RDF, "Description").unwrap();
        assert_eq!(desc.about(), Some("https://rm/a1"));
        let title = desc.child("http://purl.org/dc/terms/", "title").unwrap();
        assert_eq!(title.text(), "Brake & stop");
    }

    #[test]
    fn lookup_ignores_chosen_prefix() {
        let doc = r#"<x:RDF xmlns:x="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns:d="http://purl.org/dc/terms/">
            <x:Description x:about="u"><d:title>T</d:title></x:Description></x:RDF>"#;
        let root = parse(doc).unwrap();
        let title = root.descendant("http://purl.org/dc/terms/", "title").unwrap();
        assert_eq!(title.text(), "T");
    }

    #[test]
    fn undeclared_prefix_is_malformed() {
        let err = parse("<a:b/>").unwrap_err();
        assert!(matches!(err, StructureError::Malformed(_)));
    }

    #[test]
    fn empty_document_is_malformed() {
        assert!(parse("   ").is_err());
    }

    #[test]
    fn write_then_parse_keeps_content() {
        let root = parse(DOC).unwrap();
        let text = write_document(&root).unwrap();
        let again = parse(&text).unwrap();
        assert_eq!(root, again);
    }

    #[test]
    fn descendants_are_pre_order() {
        let doc = r#"<r xmlns="urn:t"><a><b n="1"/></a><b n="2"/></r>"#;
        let root = parse(doc).unwrap();
        let found: Vec<_> = root
            .descendants("urn:t", "b")
            .into_iter()
            .filter_map(|e| e.attributes.first().map(|a| a.value.clone()))
            .collect();
        assert_eq!(found, vec!["1", "2"]);
    }
}
