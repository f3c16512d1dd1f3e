//! reqwest implementation of [`RmService`]

mod discovery;

use crate::error::ServiceError;
use crate::rdf;
use crate::service::RmService;
use crate::types::{
    ArtifactSummary, ComponentContext, CreationFactory, CreationResponse, JobStatus,
    QueryFilter, QueryResults, Tagged, UpdateResponse,
};
use crate::vocab::{
    AUTH_MSG_HEADER, CONFIGURATION_CONTEXT_HEADER, DCTERMS, DOORS_REQUEST_TYPE,
    DOORS_REQUEST_TYPE_HEADER, OSLC, OSLC_AUTO, OSLC_CORE_VERSION_HEADER, RM_MODULES,
    VVC_CONFIGURATION_HEADER,
};
use async_trait::async_trait;
use modbind_structure::{markup, Element, ResourceRef, WireForm};
use reqwest::header::{ACCEPT, CONTENT_TYPE, ETAG, IF_MATCH, LOCATION};
use reqwest::{Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

/// Where the server lives and how to talk to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Scheme, host and port, e.g. `https://jazz.example.com:9443`
    pub host: String,
    /// Context root of the Jazz Team Server
    pub jts_context: String,
    /// Context root of the RM application
    pub rm_context: String,
    /// Verify server certificates
    pub verify_tls: bool,
    /// Per-request timeout
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            jts_context: "jts".to_owned(),
            rm_context: "rm".to_owned(),
            verify_tls: false,
            request_timeout_secs: 60,
        }
    }
}

impl ServerSettings {
    /// With host
    #[inline]
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// URL under the RM context root
    #[must_use]
    pub fn rm_url(&self, path: &str) -> String {
        join(&self.host, &self.rm_context, path)
    }

    /// URL under the JTS context root
    #[must_use]
    pub fn jts_url(&self, path: &str) -> String {
        join(&self.host, &self.jts_context, path)
    }
}

fn join(host: &str, context: &str, path: &str) -> String {
    format!(
        "{}/{}/{}",
        host.trim_end_matches('/'),
        context.trim_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Login credentials; the password never appears in `Debug` output
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    password: String,
}

impl Credentials {
    #[inline]
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// RM server session over HTTP
#[derive(Debug, Clone)]
pub struct HttpRmService {
    client: reqwest::Client,
    settings: ServerSettings,
    credentials: Credentials,
}

impl HttpRmService {
    /// Build the client and log in
    pub async fn connect(
        settings: ServerSettings,
        credentials: Credentials,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(!settings.verify_tls)
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        let service = Self {
            client,
            settings,
            credentials,
        };
        service.login().await?;
        Ok(service)
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    /// Form login when the server asks for it; basic auth rides on every
    /// request for servers that accept it instead
    async fn login(&self) -> Result<(), ServiceError> {
        let probe = self.settings.jts_url("authenticated/identity");
        let response = self.authed(Method::GET, &probe).send().await?;
        if !auth_message_is(&response, "authrequired") {
            debug!(status = response.status().as_u16(), "no form login requested");
            return Ok(());
        }

        let login = self.settings.jts_url("j_security_check");
        let response = self
            .client
            .post(&login)
            .form(&[
                ("j_username", self.credentials.username.as_str()),
                ("j_password", self.credentials.password.as_str()),
            ])
            .send()
            .await?;
        if auth_message_is(&response, "authfailed") {
            return Err(ServiceError::Authentication(format!(
                "server rejected credentials of {}",
                self.credentials.username
            )));
        }
        info!(user = %self.credentials.username, "logged in");
        Ok(())
    }

    fn authed(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
    }

    /// OSLC request, scoped to a configuration when one is given
    fn oslc(&self, method: Method, url: &str, ctx: Option<&ComponentContext>) -> RequestBuilder {
        let request = self
            .authed(method, url)
            .header(OSLC_CORE_VERSION_HEADER, "2.0")
            .header(ACCEPT, WireForm::Markup.media_type());
        match ctx {
            Some(ctx) => request.header(CONFIGURATION_CONTEXT_HEADER, ctx.configuration.as_str()),
            None => request,
        }
    }

    /// Module structure API request; it selects the configuration through
    /// its own header and must not carry the OSLC ones
    fn structure(
        &self,
        method: Method,
        url: &str,
        ctx: &ComponentContext,
        form: WireForm,
    ) -> RequestBuilder {
        self.authed(method, url)
            .header(VVC_CONFIGURATION_HEADER, ctx.configuration.as_str())
            .header(DOORS_REQUEST_TYPE_HEADER, DOORS_REQUEST_TYPE)
            .header(ACCEPT, form.media_type())
    }

    /// GET an RDF/XML document, failing on any non-success status
    async fn document(
        &self,
        operation: &'static str,
        url: &str,
        ctx: Option<&ComponentContext>,
    ) -> Result<Element, ServiceError> {
        let response = self.oslc(Method::GET, url, ctx).send().await?;
        let body = success_body(operation, url, response).await?;
        Ok(markup::parse(&body)?)
    }

    /// Run an OSLC query against a query base
    async fn query(
        &self,
        base: &str,
        filters: &[QueryFilter],
        ctx: Option<&ComponentContext>,
    ) -> Result<QueryResults, ServiceError> {
        let where_clause = rdf::where_clause(filters);
        let prefix_clause = rdf::prefix_clause(filters);
        debug!(base, %where_clause, "oslc query");
        let response = self
            .oslc(Method::GET, base, ctx)
            .query(&[
                ("oslc.where", where_clause.as_str()),
                ("oslc.select", "*"),
                ("oslc.prefix", prefix_clause.as_str()),
            ])
            .send()
            .await?;
        let body = success_body("query", base, response).await?;
        Ok(rdf::query_members(&markup::parse(&body)?))
    }
}

fn auth_message_is(response: &Response, value: &str) -> bool {
    response
        .headers()
        .get(AUTH_MSG_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case(value))
}

fn location_of(response: &Response) -> Option<ResourceRef> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(ResourceRef::from)
}

async fn success_body(
    operation: &'static str,
    url: &str,
    response: Response,
) -> Result<String, ServiceError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ServiceError::status(operation, status.as_u16(), url));
    }
    Ok(response.text().await?)
}

#[async_trait]
impl RmService for HttpRmService {
    async fn resolve_context(
        &self,
        project: &str,
        component: &str,
        configuration: &str,
    ) -> Result<ComponentContext, ServiceError> {
        let rootservices = self.rootservices().await?;
        let (service_provider, project_area) =
            self.find_project(&rootservices, project).await?;
        info!(%service_provider, "project found");
        let component_ref = self.find_component(&rootservices, component).await?;
        info!(component = %component_ref, "component found");
        let configuration_ref = self.find_configuration(&component_ref, configuration).await?;
        info!(configuration = %configuration_ref, "configuration found");

        Ok(ComponentContext {
            project: project.to_owned(),
            service_provider,
            project_area,
            component: component_ref,
            configuration: configuration_ref,
        })
    }

    async fn resolve_folder(
        &self,
        ctx: &ComponentContext,
        path: &str,
    ) -> Result<Option<ResourceRef>, ServiceError> {
        self.walk_folders(ctx, path).await
    }

    async fn creation_factory(
        &self,
        ctx: &ComponentContext,
        resource_type: &str,
    ) -> Result<CreationFactory, ServiceError> {
        let provider = self
            .document("service provider", ctx.service_provider.as_str(), Some(ctx))
            .await?;
        let factory = rdf::capabilities(&provider, "CreationFactory", resource_type)
            .into_iter()
            .find_map(|cap| {
                rdf::resource_of(cap, OSLC, "creation").map(|uri| CreationFactory {
                    uri,
                    shapes: rdf::resources_of(cap, OSLC, "resourceShape"),
                })
            })
            .ok_or_else(|| ServiceError::not_found("creation factory", resource_type))?;
        Ok(factory)
    }

    async fn shape_title(
        &self,
        ctx: &ComponentContext,
        shape: &ResourceRef,
    ) -> Result<Option<String>, ServiceError> {
        let doc = self.document("resource shape", shape.as_str(), Some(ctx)).await?;
        Ok(doc
            .descendant(OSLC, "ResourceShape")
            .and_then(|s| s.child(DCTERMS, "title"))
            .map(|t| t.text().trim().to_owned()))
    }

    async fn create_resource(
        &self,
        ctx: &ComponentContext,
        factory: &ResourceRef,
        payload: String,
    ) -> Result<CreationResponse, ServiceError> {
        let response = self
            .oslc(Method::POST, factory.as_str(), Some(ctx))
            .header(CONTENT_TYPE, WireForm::Markup.media_type())
            .body(payload)
            .send()
            .await?;
        Ok(CreationResponse {
            status: response.status().as_u16(),
            location: location_of(&response),
        })
    }

    async fn artifact_summary(
        &self,
        ctx: &ComponentContext,
        artifact: &ResourceRef,
    ) -> Result<ArtifactSummary, ServiceError> {
        let doc = self.document("artifact", artifact.as_str(), Some(ctx)).await?;
        Ok(ArtifactSummary {
            identifier: rdf::text_of(&doc, DCTERMS, "identifier"),
            title: rdf::text_of(&doc, DCTERMS, "title"),
        })
    }

    async fn structure_ref(
        &self,
        ctx: &ComponentContext,
        module: &ResourceRef,
    ) -> Result<Option<ResourceRef>, ServiceError> {
        let doc = self.document("module", module.as_str(), Some(ctx)).await?;
        Ok(rdf::resource_of(&doc, RM_MODULES, "structure"))
    }

    async fn fetch_structure(
        &self,
        ctx: &ComponentContext,
        structure: &ResourceRef,
        form: WireForm,
    ) -> Result<Tagged<String>, ServiceError> {
        let url = structure.as_str();
        let response = self.structure(Method::GET, url, ctx, form).send().await?;
        if !response.status().is_success() {
            return Err(ServiceError::status(
                "fetch structure",
                response.status().as_u16(),
                url,
            ));
        }
        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .ok_or_else(|| ServiceError::malformed(format!("no ETag on {url}")))?;
        let body = success_body("fetch structure", url, response).await?;
        Ok(Tagged { body, etag })
    }

    async fn submit_structure(
        &self,
        ctx: &ComponentContext,
        structure: &ResourceRef,
        form: WireForm,
        body: String,
        etag: &str,
    ) -> Result<UpdateResponse, ServiceError> {
        let response = self
            .structure(Method::PUT, structure.as_str(), ctx, form)
            .header(IF_MATCH, etag)
            .header(CONTENT_TYPE, form.media_type())
            .body(body)
            .send()
            .await?;
        Ok(UpdateResponse {
            status: response.status().as_u16(),
            location: location_of(&response),
        })
    }

    async fn query_artifacts(
        &self,
        ctx: &ComponentContext,
        filters: &[QueryFilter],
    ) -> Result<QueryResults, ServiceError> {
        let base = self.requirement_query_base(ctx).await?;
        self.query(base.as_str(), filters, Some(ctx)).await
    }

    async fn poll_job(
        &self,
        ctx: &ComponentContext,
        job: &ResourceRef,
    ) -> Result<JobStatus, ServiceError> {
        let doc = self.document("job tracker", job.as_str(), Some(ctx)).await?;
        Ok(job_status(&doc))
    }
}

/// Interpret an automation-style tracker document.
///
/// A tracker without `oslc_auto:state` is the finished resource itself.
/// A canceled job counts as failed.
fn job_status(doc: &Element) -> JobStatus {
    let Some(state) = rdf::resource_of(doc, OSLC_AUTO, "state") else {
        return JobStatus::Succeeded;
    };
    if state.as_str().ends_with("#canceled") {
        let message = rdf::text_of(doc, DCTERMS, "description")
            .unwrap_or_else(|| "job canceled".to_owned());
        return JobStatus::Failed(message);
    }
    if !state.as_str().ends_with("#complete") {
        return JobStatus::Running;
    }
    match rdf::resource_of(doc, OSLC_AUTO, "verdict") {
        Some(v) if v.as_str().ends_with("#error") || v.as_str().ends_with("#failed") => {
            let message = rdf::text_of(doc, DCTERMS, "description")
                .unwrap_or_else(|| format!("job verdict {v}"));
            JobStatus::Failed(message)
        }
        _ => JobStatus::Succeeded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_join_cleanly() {
        let s = ServerSettings::default().with_host("https://jazz:9443/");
        assert_eq!(s.rm_url("/rootservices"), "https://jazz:9443/rm/rootservices");
        assert_eq!(
            s.jts_url("j_security_check"),
            "https://jazz:9443/jts/j_security_check"
        );
    }

    #[test]
    fn credentials_debug_hides_password() {
        let c = Credentials::new("alice", "s3cret");
        let shown = format!("{c:?}");
        assert!(shown.contains("alice"));
        assert!(!shown.contains("s3cret"));
    }

    fn tracker(state: &str, verdict: &str) -> Element {
        let doc = format!(
            r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
                xmlns:oslc_auto="http://open-services.net/ns/auto#">
              <oslc_auto:AutomationResult rdf:about="https://rm/jobs/1">
                <oslc_auto:state rdf:resource="http://open-services.net/ns/auto#{state}"/>
                <oslc_auto:verdict rdf:resource="http://open-services.net/ns/auto#{verdict}"/>
              </oslc_auto:AutomationResult></rdf:RDF>"#
        );
        markup::parse(&doc).unwrap()
    }

    #[test]
    fn tracker_states() {
        assert_eq!(job_status(&tracker("inProgress", "unavailable")), JobStatus::Running);
        assert_eq!(job_status(&tracker("complete", "passed")), JobStatus::Succeeded);
        assert!(matches!(
            job_status(&tracker("complete", "error")),
            JobStatus::Failed(_)
        ));
        assert_eq!(
            job_status(&tracker("canceled", "unavailable")),
            JobStatus::Failed("job canceled".into())
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        let settings = ServerSettings {
            request_timeout_secs: 5,
            ..ServerSettings::default().with_host("http://127.0.0.1:9")
        };
        let err = HttpRmService::connect(settings, Credentials::new("alice", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Transport(_)));
    }

    #[test]
    fn default_settings() {
        let s = ServerSettings::default();
        assert_eq!(s.jts_context, "jts");
        assert_eq!(s.rm_context, "rm");
        assert!(!s.verify_tls);
    }
}
