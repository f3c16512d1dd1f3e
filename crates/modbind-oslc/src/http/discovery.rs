//! Service discovery: rootservices, catalogs, components, configurations, folders

use super::HttpRmService;
use crate::error::ServiceError;
use crate::rdf;
use crate::types::{ComponentContext, QueryFilter};
use crate::vocab::{
    COMPONENT_TYPE, DCTERMS, FOLDER_TYPE, JAZZ_PROCESS, OSLC, OSLC_CONFIG, OSLC_RM_V2, RDFS,
    REQUIREMENT_TYPE,
};
use modbind_structure::{Element, ResourceRef};
use tracing::debug;

impl HttpRmService {
    pub(super) async fn rootservices(&self) -> Result<Element, ServiceError> {
        let url = self.settings.rm_url("rootservices");
        self.document("rootservices", &url, None).await
    }

    /// Service provider and project area of a project, matched by title
    pub(super) async fn find_project(
        &self,
        rootservices: &Element,
        project: &str,
    ) -> Result<(ResourceRef, ResourceRef), ServiceError> {
        let catalog_url = rdf::resource_of(rootservices, OSLC_RM_V2, "rmServiceProviders")
            .ok_or_else(|| ServiceError::malformed("rootservices lists no RM provider catalog"))?;
        let catalog = self
            .document("provider catalog", catalog_url.as_str(), None)
            .await?;

        let provider = catalog
            .descendants(OSLC, "ServiceProvider")
            .into_iter()
            .find(|sp| {
                sp.child(DCTERMS, "title")
                    .is_some_and(|t| t.text().trim() == project)
            })
            .ok_or_else(|| ServiceError::not_found("project", project))?;
        let service_provider = provider
            .about()
            .map(ResourceRef::from)
            .ok_or_else(|| ServiceError::malformed("service provider without rdf:about"))?;
        let project_area = rdf::resource_of(provider, JAZZ_PROCESS, "projectArea")
            .unwrap_or_else(|| service_provider.clone());
        Ok((service_provider, project_area))
    }

    /// Component matched by title through the configuration management provider
    pub(super) async fn find_component(
        &self,
        rootservices: &Element,
        component: &str,
    ) -> Result<ResourceRef, ServiceError> {
        let catalog_url = rdf::resource_of(rootservices, OSLC_CONFIG, "cmServiceProviders")
            .ok_or_else(|| {
                ServiceError::malformed("rootservices lists no configuration management provider")
            })?;
        let catalog = self
            .document("configuration catalog", catalog_url.as_str(), None)
            .await?;

        let mut query_base = component_query_base(&catalog);
        if query_base.is_none() {
            let providers: Vec<String> = catalog
                .descendants(OSLC, "ServiceProvider")
                .into_iter()
                .filter_map(Element::about)
                .map(str::to_owned)
                .collect();
            for provider in providers {
                let doc = self.document("configuration provider", &provider, None).await?;
                query_base = component_query_base(&doc);
                if query_base.is_some() {
                    break;
                }
            }
        }
        let query_base = query_base
            .ok_or_else(|| ServiceError::malformed("no component query capability"))?;

        let results = self
            .query(
                query_base.as_str(),
                &[QueryFilter::literal("dcterms:title", component)],
                None,
            )
            .await?;
        results
            .into_iter()
            .find(|(_, props)| {
                props
                    .get("dcterms:title")
                    .map_or(true, |t| t.trim() == component)
            })
            .map(|(uri, _)| uri)
            .ok_or_else(|| ServiceError::not_found("component", component))
    }

    /// Stream or baseline of a component matched by title
    pub(super) async fn find_configuration(
        &self,
        component: &ResourceRef,
        configuration: &str,
    ) -> Result<ResourceRef, ServiceError> {
        let doc = self.document("component", component.as_str(), None).await?;
        let listing = rdf::resource_of(&doc, OSLC_CONFIG, "configurations").ok_or_else(|| {
            ServiceError::malformed(format!("component {component} lists no configurations"))
        })?;
        let list = self
            .document("configurations", listing.as_str(), None)
            .await?;

        let inline = rdf::query_members(&list);
        let members: Vec<ResourceRef> = list
            .descendants(RDFS, "member")
            .into_iter()
            .filter_map(Element::resource)
            .map(ResourceRef::from)
            .collect();

        for member in members {
            let title = match inline.get(&member).and_then(|p| p.get("dcterms:title")) {
                Some(title) => Some(title.clone()),
                None => {
                    let doc = self.document("configuration", member.as_str(), None).await?;
                    rdf::text_of(&doc, DCTERMS, "title")
                }
            };
            debug!(%member, ?title, "configuration candidate");
            if title.as_deref().map(str::trim) == Some(configuration) {
                return Ok(member);
            }
        }
        Err(ServiceError::not_found("configuration", configuration))
    }

    /// Walk a folder path one segment at a time from the project's root folder
    pub(super) async fn walk_folders(
        &self,
        ctx: &ComponentContext,
        path: &str,
    ) -> Result<Option<ResourceRef>, ServiceError> {
        let base = self.folder_query_base(ctx).await?;
        let Some((mut current, _)) = self
            .child_folders(&base, ctx, &ctx.project_area)
            .await?
            .into_iter()
            .next()
        else {
            return Ok(None);
        };

        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let children = self.child_folders(&base, ctx, &current).await?;
            match children.into_iter().find(|(_, title)| title == segment) {
                Some((folder, _)) => current = folder,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    async fn child_folders(
        &self,
        base: &str,
        ctx: &ComponentContext,
        parent: &ResourceRef,
    ) -> Result<Vec<(ResourceRef, String)>, ServiceError> {
        let results = self
            .query(
                base,
                &[QueryFilter::resource("nav:parent", parent.as_str())],
                Some(ctx),
            )
            .await?;
        Ok(results
            .into_iter()
            .map(|(uri, props)| {
                let title = props
                    .get("dcterms:title")
                    .map(|t| t.trim().to_owned())
                    .unwrap_or_default();
                (uri, title)
            })
            .collect())
    }

    async fn folder_query_base(&self, ctx: &ComponentContext) -> Result<String, ServiceError> {
        let provider = self
            .document("service provider", ctx.service_provider.as_str(), Some(ctx))
            .await?;
        Ok(query_base(&provider, FOLDER_TYPE)
            .unwrap_or_else(|| self.settings.rm_url("folders")))
    }

    pub(super) async fn requirement_query_base(
        &self,
        ctx: &ComponentContext,
    ) -> Result<String, ServiceError> {
        let provider = self
            .document("service provider", ctx.service_provider.as_str(), Some(ctx))
            .await?;
        query_base(&provider, REQUIREMENT_TYPE)
            .or_else(|| {
                provider
                    .descendants(OSLC, "QueryCapability")
                    .into_iter()
                    .find_map(|c| rdf::resource_of(c, OSLC, "queryBase"))
                    .map(|r| r.as_str().to_owned())
            })
            .ok_or_else(|| ServiceError::not_found("query capability", REQUIREMENT_TYPE))
    }
}

fn query_base(provider: &Element, resource_type: &str) -> Option<String> {
    rdf::capabilities(provider, "QueryCapability", resource_type)
        .into_iter()
        .find_map(|c| rdf::resource_of(c, OSLC, "queryBase"))
        .map(|r| r.as_str().to_owned())
}

fn component_query_base(doc: &Element) -> Option<String> {
    query_base(doc, COMPONENT_TYPE)
}
