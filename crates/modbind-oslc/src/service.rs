//! The collaborator contract

use crate::error::ServiceError;
use crate::types::{
    ArtifactSummary, ComponentContext, CreationFactory, CreationResponse, JobStatus,
    QueryFilter, QueryResults, Tagged, UpdateResponse,
};
use async_trait::async_trait;
use modbind_structure::{ResourceRef, WireForm};

/// Everything the create-and-bind pipeline needs from the RM server.
///
/// Methods report what the server said; deciding whether a status is a
/// failure is left to the caller wherever the status carries protocol
/// meaning (creation, structure update).
#[async_trait]
pub trait RmService: Send + Sync {
    /// Resolve project, component and configuration names
    async fn resolve_context(
        &self,
        project: &str,
        component: &str,
        configuration: &str,
    ) -> Result<ComponentContext, ServiceError>;

    /// Folder at a `/`-separated path, `/` being the root folder
    async fn resolve_folder(
        &self,
        ctx: &ComponentContext,
        path: &str,
    ) -> Result<Option<ResourceRef>, ServiceError>;

    /// Creation factory for a resource type
    async fn creation_factory(
        &self,
        ctx: &ComponentContext,
        resource_type: &str,
    ) -> Result<CreationFactory, ServiceError>;

    /// `dcterms:title` of a resource shape
    async fn shape_title(
        &self,
        ctx: &ComponentContext,
        shape: &ResourceRef,
    ) -> Result<Option<String>, ServiceError>;

    /// POST a creation document
    async fn create_resource(
        &self,
        ctx: &ComponentContext,
        factory: &ResourceRef,
        payload: String,
    ) -> Result<CreationResponse, ServiceError>;

    /// Identifier and title of an artifact
    async fn artifact_summary(
        &self,
        ctx: &ComponentContext,
        artifact: &ResourceRef,
    ) -> Result<ArtifactSummary, ServiceError>;

    /// Structure resource of a module
    async fn structure_ref(
        &self,
        ctx: &ComponentContext,
        module: &ResourceRef,
    ) -> Result<Option<ResourceRef>, ServiceError>;

    /// Fetch the structure body with its concurrency token
    async fn fetch_structure(
        &self,
        ctx: &ComponentContext,
        structure: &ResourceRef,
        form: WireForm,
    ) -> Result<Tagged<String>, ServiceError>;

    /// Conditional update guarded by `etag`
    async fn submit_structure(
        &self,
        ctx: &ComponentContext,
        structure: &ResourceRef,
        form: WireForm,
        body: String,
        etag: &str,
    ) -> Result<UpdateResponse, ServiceError>;

    /// Exact-match query over artifacts, all filters combined with `and`
    async fn query_artifacts(
        &self,
        ctx: &ComponentContext,
        filters: &[QueryFilter],
    ) -> Result<QueryResults, ServiceError>;

    /// One look at an asynchronous job
    async fn poll_job(
        &self,
        ctx: &ComponentContext,
        job: &ResourceRef,
    ) -> Result<JobStatus, ServiceError>;
}
