//! Locating modules and artifacts by query

use crate::error::BindError;
use modbind_oslc::vocab::MODULE_TYPE;
use modbind_oslc::{ComponentContext, QueryFilter, RmService};
use modbind_structure::ResourceRef;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// How the target module is named on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSelector {
    /// All-digit argument, matched against `dcterms:identifier`
    Identifier(String),
    /// Anything else, matched against `dcterms:title`
    Title(String),
}

impl ModuleSelector {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
            Self::Identifier(value.to_owned())
        } else {
            Self::Title(value.to_owned())
        }
    }

    fn filter(&self) -> QueryFilter {
        match self {
            Self::Identifier(id) => QueryFilter::literal("dcterms:identifier", id.as_str()),
            Self::Title(title) => QueryFilter::literal("dcterms:title", title.as_str()),
        }
    }
}

impl FromStr for ModuleSelector {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for ModuleSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(id) => write!(f, "identifier {id}"),
            Self::Title(title) => write!(f, "title {title:?}"),
        }
    }
}

/// Module matching `selector` in the current configuration
pub async fn find_module<S: RmService + ?Sized>(
    service: &S,
    ctx: &ComponentContext,
    selector: &ModuleSelector,
) -> Result<ResourceRef, BindError> {
    let filters = [
        selector.filter(),
        QueryFilter::resource("rdf:type", MODULE_TYPE),
    ];
    let results = service.query_artifacts(ctx, &filters).await?;
    if results.len() > 1 {
        warn!(%selector, count = results.len(), "several modules match, using the first");
    }
    let module = results
        .into_iter()
        .next()
        .map(|(uri, _)| uri)
        .ok_or_else(|| BindError::ModuleNotFound(selector.to_string()))?;
    debug!(%selector, %module, "module found");
    Ok(module)
}

/// Core artifact carrying `identifier` in the current configuration.
///
/// Module usages of an artifact share its identifier; the core artifact is
/// the one that lives in a folder.
pub async fn locate_artifact<S: RmService + ?Sized>(
    service: &S,
    ctx: &ComponentContext,
    identifier: &str,
) -> Result<ResourceRef, BindError> {
    let results = service
        .query_artifacts(ctx, &[QueryFilter::literal("dcterms:identifier", identifier)])
        .await?;
    let artifact = match results.len() {
        0 => None,
        1 => results.into_iter().next().map(|(uri, _)| uri),
        count => {
            debug!(identifier, count, "identifier shared by several resources");
            results
                .into_iter()
                .find(|(_, props)| props.contains_key("nav:parent"))
                .map(|(uri, _)| uri)
        }
    };
    let artifact = artifact.ok_or_else(|| BindError::ArtifactNotFound(identifier.to_owned()))?;
    debug!(identifier, %artifact, "artifact located");
    Ok(artifact)
}
