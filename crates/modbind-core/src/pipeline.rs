//! Create-and-bind pipeline
//!
//! Stages run in order and each one fails fast:
//! 1. Resolve project, component and configuration
//! 2. Find the module and its structure resource
//! 3. Create the artifact and read back its identifier
//! 4. Relocate the artifact by identifier in the current configuration
//! 5. Run the structure mutation
//!
//! An artifact created before a later stage fails stays where it is; there
//! is no rollback.

use crate::config::BinderConfig;
use crate::creation::{ArtifactCreator, ArtifactRequest, CreatedArtifact};
use crate::error::BindError;
use crate::lookup::{find_module, locate_artifact, ModuleSelector};
use crate::mutation::{MutationOutcome, MutationSettings, StructureMutator};
use crate::outline::Outline;
use modbind_oslc::{ComponentContext, RmService};
use modbind_structure::{FirstTopLevelSlot, InsertionPolicy, ResourceRef, SectionLabel};
use std::sync::Arc;
use tracing::{info, info_span, Instrument};

/// Server scope named on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub project: String,
    pub component: String,
    pub configuration: String,
}

impl Target {
    #[must_use]
    pub fn new(
        project: impl Into<String>,
        component: impl Into<String>,
        configuration: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            component: component.into(),
            configuration: configuration.into(),
        }
    }
}

/// One create-and-bind invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindRequest {
    pub target: Target,
    pub artifact: ArtifactRequest,
    pub module: ModuleSelector,
}

/// Everything a successful run produced
#[derive(Debug, Clone)]
pub struct BindReport {
    pub context: ComponentContext,
    pub artifact: CreatedArtifact,
    /// Core artifact the new binding wraps
    pub bound_artifact: ResourceRef,
    pub module: ResourceRef,
    pub structure: ResourceRef,
    pub mutation: MutationOutcome,
    pub outline: Outline,
    /// Provisional section label of the new binding
    pub label: Option<SectionLabel>,
}

pub struct CreateAndBind<'a, S: RmService + ?Sized> {
    service: &'a S,
    settings: MutationSettings,
    policy: Arc<dyn InsertionPolicy>,
}

impl<'a, S: RmService + ?Sized> CreateAndBind<'a, S> {
    #[must_use]
    pub fn new(service: &'a S, config: &BinderConfig) -> Self {
        Self {
            service,
            settings: MutationSettings::from(&config.structure),
            policy: Arc::new(FirstTopLevelSlot),
        }
    }

    /// With insertion policy
    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn InsertionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// With mutation settings
    #[must_use]
    pub fn with_settings(mut self, settings: MutationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub async fn run(&self, request: &BindRequest) -> Result<BindReport, BindError> {
        let span = info_span!(
            "create_and_bind",
            title = %request.artifact.title,
            module = %request.module
        );
        self.run_stages(request).instrument(span).await
    }

    async fn run_stages(&self, request: &BindRequest) -> Result<BindReport, BindError> {
        let target = &request.target;
        let context = self
            .service
            .resolve_context(&target.project, &target.component, &target.configuration)
            .await?;
        info!(component = %context.component, configuration = %context.configuration, "context resolved");

        let module = find_module(self.service, &context, &request.module).await?;
        let structure = self
            .service
            .structure_ref(&context, &module)
            .await?
            .ok_or_else(|| BindError::StructureUnavailable(module.clone()))?;

        let artifact = ArtifactCreator::new(self.service)
            .create(&context, &request.artifact)
            .await?;
        let bound_artifact = locate_artifact(self.service, &context, &artifact.identifier).await?;

        let mutation = StructureMutator::new(self.service, self.settings)
            .with_policy(Arc::clone(&self.policy))
            .bind(&context, &structure, &bound_artifact, &module)
            .await?;

        let outline = Outline::of(&mutation.structure)?;
        let label = mutation
            .bound
            .and_then(|node| outline.label_of(node))
            .cloned();
        info!(
            identifier = %artifact.identifier,
            label = label.as_ref().map_or("?", SectionLabel::as_str),
            "artifact bound"
        );

        Ok(BindReport {
            context,
            artifact,
            bound_artifact,
            module,
            structure,
            mutation,
            outline,
            label,
        })
    }
}
