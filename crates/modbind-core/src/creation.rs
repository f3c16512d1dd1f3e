//! Artifact creation
//!
//! A new artifact is created through the requirement creation factory,
//! typed by the resource shape whose title equals the requested type label,
//! and placed in a folder resolved from a `/`-separated path. Its public
//! identifier is read back from the created resource.

use crate::error::BindError;
use modbind_oslc::vocab::{
    DCTERMS, HEADING_TYPE, JAZZ_RM, NAV, OSLC, OSLC_RM, RDF, REQUIREMENT_TYPE, TEXT_TYPE, XHTML,
};
use modbind_oslc::{ComponentContext, CreationFactory, RmService};
use modbind_structure::markup::{self, Element, QName};
use modbind_structure::ResourceRef;
use tracing::{debug, info, warn};

/// Description stamped on every created artifact
pub const CREATION_DESCRIPTION: &str = "Created by modbind";

/// Type label that additionally marks the artifact as a heading
pub const HEADING_LABEL: &str = "Heading";

/// What to create and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRequest {
    /// Title of the resource shape, e.g. `Requirement` or `Heading`
    pub artifact_type: String,
    pub title: String,
    /// Folder path, `/` for the root folder
    pub folder: String,
}

impl ArtifactRequest {
    #[must_use]
    pub fn new(
        artifact_type: impl Into<String>,
        title: impl Into<String>,
        folder: impl Into<String>,
    ) -> Self {
        Self {
            artifact_type: artifact_type.into(),
            title: title.into(),
            folder: folder.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_heading(&self) -> bool {
        self.artifact_type == HEADING_LABEL
    }
}

/// A freshly created artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedArtifact {
    /// `Location` returned by the server
    pub uri: ResourceRef,
    /// Public identifier, `dcterms:identifier`
    pub identifier: String,
    pub shape: ResourceRef,
    pub folder: ResourceRef,
}

pub struct ArtifactCreator<'a, S: RmService + ?Sized> {
    service: &'a S,
}

impl<'a, S: RmService + ?Sized> ArtifactCreator<'a, S> {
    #[must_use]
    pub fn new(service: &'a S) -> Self {
        Self { service }
    }

    /// Create the artifact and read back its identifier
    pub async fn create(
        &self,
        ctx: &ComponentContext,
        request: &ArtifactRequest,
    ) -> Result<CreatedArtifact, BindError> {
        let folder = self
            .service
            .resolve_folder(ctx, &request.folder)
            .await?
            .ok_or_else(|| BindError::FolderNotFound(request.folder.clone()))?;
        debug!(path = %request.folder, %folder, "folder resolved");

        let factory = self.service.creation_factory(ctx, REQUIREMENT_TYPE).await?;
        let shape = self.shape_for(ctx, &factory, &request.artifact_type).await?;

        let payload = creation_payload(request, &shape, &folder)?;
        let response = self
            .service
            .create_resource(ctx, &factory.uri, payload)
            .await?;
        if !response.is_created() {
            return Err(BindError::CreationRejected {
                status: response.status,
                reason: "server did not report the artifact as created".to_owned(),
            });
        }
        let uri = response.location.ok_or_else(|| BindError::CreationRejected {
            status: response.status,
            reason: "no Location header".to_owned(),
        })?;

        let summary = self.service.artifact_summary(ctx, &uri).await?;
        let identifier = summary
            .identifier
            .map(|id| id.trim().to_owned())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| BindError::IdentifierUnavailable(uri.clone()))?;
        info!(%identifier, %uri, artifact_type = %request.artifact_type, "artifact created");

        Ok(CreatedArtifact {
            uri,
            identifier,
            shape,
            folder,
        })
    }

    /// First shape of the factory titled exactly `label`
    async fn shape_for(
        &self,
        ctx: &ComponentContext,
        factory: &CreationFactory,
        label: &str,
    ) -> Result<ResourceRef, BindError> {
        let mut matches = Vec::new();
        for shape in &factory.shapes {
            let title = self.service.shape_title(ctx, shape).await?;
            if title.as_deref() == Some(label) {
                matches.push(shape.clone());
            }
        }
        if matches.len() > 1 {
            warn!(label, count = matches.len(), "several shapes share the title, using the first");
        }
        matches
            .into_iter()
            .next()
            .ok_or_else(|| BindError::ShapeNotFound(label.to_owned()))
    }
}

/// RDF/XML creation document for `request`
pub fn creation_payload(
    request: &ArtifactRequest,
    shape: &ResourceRef,
    folder: &ResourceRef,
) -> Result<String, BindError> {
    let rdf = |local: &str| QName::new(RDF, "rdf", local);
    let resource = |name: QName, uri: &str| Element::new(name).with_attribute(rdf("resource"), uri);

    let mut description = Element::new(rdf("Description"))
        .with_attribute(rdf("about"), "")
        .with_child(resource(rdf("type"), REQUIREMENT_TYPE));
    if request.is_heading() {
        description = description
            .with_child(resource(rdf("type"), HEADING_TYPE))
            .with_child(resource(rdf("type"), TEXT_TYPE));
    }

    let xhtml = |local: &str| QName::new(XHTML, "", local);
    let primary_text = Element::new(QName::new(JAZZ_RM, "jazz_rm", "primaryText"))
        .with_attribute(rdf("parseType"), "Literal")
        .with_child(
            Element::new(xhtml("div"))
                .with_declaration("", XHTML)
                .with_child(
                    Element::new(xhtml("p"))
                        .with_child(Element::new(xhtml("span")).with_text(request.title.as_str())),
                ),
        );

    let literal = |local: &str, text: &str| {
        Element::new(QName::new(DCTERMS, "dcterms", local))
            .with_attribute(rdf("parseType"), "Literal")
            .with_text(text)
    };
    let description = description
        .with_child(literal("description", CREATION_DESCRIPTION))
        .with_child(primary_text)
        .with_child(literal("title", request.title.as_str()))
        .with_child(resource(QName::new(OSLC, "oslc", "instanceShape"), shape.as_str()))
        .with_child(resource(QName::new(NAV, "nav", "parent"), folder.as_str()));

    let root = Element::new(rdf("RDF"))
        .with_declaration("rdf", RDF)
        .with_declaration("dcterms", DCTERMS)
        .with_declaration("jazz_rm", JAZZ_RM)
        .with_declaration("oslc", OSLC)
        .with_declaration("oslc_rm", OSLC_RM)
        .with_declaration("nav", NAV)
        .with_child(description);
    Ok(markup::write_document(&root)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types_of(payload: &str) -> Vec<String> {
        let root = markup::parse(payload).unwrap();
        root.descendants(RDF, "type")
            .into_iter()
            .filter_map(Element::resource)
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn requirement_payload() {
        let request = ArtifactRequest::new("Requirement", "Brake <fast> & hard", "/F");
        let payload =
            creation_payload(&request, &"https://rm/shapes/1".into(), &"https://rm/folders/F".into())
                .unwrap();
        assert_eq!(types_of(&payload), vec![REQUIREMENT_TYPE.to_owned()]);

        let root = markup::parse(&payload).unwrap();
        assert_eq!(
            root.descendant(DCTERMS, "title").unwrap().text(),
            "Brake <fast> & hard"
        );
        assert_eq!(
            root.descendant(DCTERMS, "description").unwrap().text(),
            CREATION_DESCRIPTION
        );
        assert_eq!(
            root.descendant(OSLC, "instanceShape").unwrap().resource(),
            Some("https://rm/shapes/1")
        );
        assert_eq!(
            root.descendant(NAV, "parent").unwrap().resource(),
            Some("https://rm/folders/F")
        );
        let span = root.descendant(XHTML, "span").unwrap();
        assert_eq!(span.text().trim(), "Brake <fast> & hard");

        for (namespace, local) in [
            (DCTERMS, "title"),
            (DCTERMS, "description"),
            (JAZZ_RM, "primaryText"),
        ] {
            let property = root.descendant(namespace, local).unwrap();
            assert_eq!(property.attribute(RDF, "parseType"), Some("Literal"), "{local}");
        }
    }

    #[test]
    fn heading_payload_carries_markers() {
        let request = ArtifactRequest::new("Heading", "Intro", "/");
        assert!(request.is_heading());
        let payload =
            creation_payload(&request, &"https://rm/shapes/h".into(), &"https://rm/folders/root".into())
                .unwrap();
        assert_eq!(
            types_of(&payload),
            vec![
                REQUIREMENT_TYPE.to_owned(),
                HEADING_TYPE.to_owned(),
                TEXT_TYPE.to_owned()
            ]
        );
    }
}
