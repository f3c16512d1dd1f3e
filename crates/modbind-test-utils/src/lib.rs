//! Testing utilities for modbind workspace
//!
//! [`InMemoryRm`] is an [`RmService`] holding folders, shapes, artifacts and
//! module structures in memory. Structure updates honour the concurrency
//! token, assign durable ids to new bindings and can be applied directly,
//! through a job that finishes after some polls, or never.

#![allow(missing_docs)]

use async_trait::async_trait;
use indexmap::IndexMap;
use modbind_oslc::vocab::{DCTERMS, MODULE_TYPE, NAV, RDF, REQUIREMENT_TYPE};
use modbind_oslc::{
    ArtifactSummary, ComponentContext, CreationFactory, CreationResponse, FilterValue,
    JobStatus, QueryFilter, QueryResults, RmService, ServiceError, Tagged, UpdateResponse,
};
use modbind_structure::codec::{decode_body, encode_body};
use modbind_structure::{
    markup, BindingId, Element, ModuleStructure, NodeId, ResourceRef, WalkEvent, WireForm,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};

pub const HOST: &str = "https://rm.test";
pub const PROJECT: &str = "Demo Project";
pub const COMPONENT: &str = "Demo Component";
pub const CONFIGURATION: &str = "Demo Stream";

/// First identifier handed out to created artifacts
pub const FIRST_IDENTIFIER: u32 = 1000;

fn rm(path: &str) -> String {
    format!("{HOST}/rm/{path}")
}

/// How submitted structure updates are applied
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UpdateMode {
    /// Applied on submit, status 200
    #[default]
    Immediate,
    /// Status 202; the job finishes on the `polls`-th poll
    Deferred { polls: u32 },
    /// Status 202; the job never finishes
    Stuck,
    /// Status 202; the job reports failure on first poll
    FailJob(String),
    /// Status 202; the job is canceled on the server before it runs
    CancelJob,
    /// Rejected with the given status, nothing applied
    Reject(u16),
}

#[derive(Debug, Clone)]
struct Record {
    identifier: String,
    title: String,
    parent: Option<ResourceRef>,
    types: Vec<String>,
}

impl Record {
    fn matches(&self, filter: &QueryFilter) -> bool {
        match (filter.property.as_str(), &filter.value) {
            ("dcterms:identifier", FilterValue::Literal(v)) => self.identifier == *v,
            ("dcterms:title", FilterValue::Literal(v)) => self.title == *v,
            ("rdf:type", FilterValue::Resource(t)) => self.types.iter().any(|x| x == t),
            ("nav:parent", FilterValue::Resource(p)) => {
                self.parent.as_ref().is_some_and(|parent| parent.as_str() == p)
            }
            _ => false,
        }
    }

    fn properties(&self) -> BTreeMap<String, String> {
        let mut props = BTreeMap::new();
        props.insert("dcterms:identifier".to_owned(), self.identifier.clone());
        props.insert("dcterms:title".to_owned(), self.title.clone());
        if let Some(t) = self.types.first() {
            props.insert("rdf:type".to_owned(), t.clone());
        }
        if let Some(parent) = &self.parent {
            props.insert("nav:parent".to_owned(), parent.to_string());
        }
        props
    }
}

#[derive(Debug)]
struct Stored {
    tree: ModuleStructure,
    version: u64,
}

#[derive(Debug)]
struct Job {
    structure: ResourceRef,
    tree: ModuleStructure,
    remaining: Option<u32>,
    failure: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    folders: IndexMap<String, ResourceRef>,
    shapes: IndexMap<ResourceRef, String>,
    /// Artifacts and modules; a list so identifiers may repeat
    records: Vec<(ResourceRef, Record)>,
    module_structures: HashMap<ResourceRef, ResourceRef>,
    structures: HashMap<ResourceRef, Stored>,
    jobs: HashMap<ResourceRef, Job>,
    finished_jobs: HashSet<ResourceRef>,
    update_mode: UpdateMode,
    creation_status: Option<u16>,
    withhold_identifiers: bool,
    racing_writer: bool,
    next_id: u32,
    payloads: Vec<String>,
    submissions: Vec<String>,
    polls: u32,
}

impl State {
    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn record(&self, uri: &ResourceRef) -> Option<&Record> {
        self.records.iter().find(|(u, _)| u == uri).map(|(_, r)| r)
    }

    fn apply(&mut self, structure: &ResourceRef, tree: ModuleStructure) {
        if let Some(stored) = self.structures.get_mut(structure) {
            stored.tree = tree;
            stored.version += 1;
        }
    }
}

/// In-memory RM server
#[derive(Debug)]
pub struct InMemoryRm {
    context: ComponentContext,
    state: Mutex<State>,
}

impl Default for InMemoryRm {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRm {
    /// Server with a root folder and nothing else
    #[must_use]
    pub fn new() -> Self {
        let mut state = State {
            next_id: FIRST_IDENTIFIER - 1,
            ..State::default()
        };
        state
            .folders
            .insert("/".to_owned(), ResourceRef::new(rm("folders/root")));
        Self {
            context: ComponentContext {
                project: PROJECT.to_owned(),
                service_provider: ResourceRef::new(rm("oslc_rm/demo/services.xml")),
                project_area: ResourceRef::new(rm("process/project-areas/demo")),
                component: ResourceRef::new(rm("cm/component/demo")),
                configuration: ResourceRef::new(rm("cm/stream/demo")),
            },
            state: Mutex::new(state),
        }
    }

    /// With folder at `path` and all its ancestors
    #[must_use]
    pub fn with_folder(mut self, path: &str) -> Self {
        let state = self.state.get_mut();
        let mut current = String::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current.push('/');
            current.push_str(segment);
            let uri = ResourceRef::new(rm(&format!("folders{}", current.replace(' ', "_"))));
            state.folders.entry(current.clone()).or_insert(uri);
        }
        self
    }

    /// With creation shape titled `title`
    #[must_use]
    pub fn with_shape(mut self, title: &str) -> Self {
        let state = self.state.get_mut();
        let uri = ResourceRef::new(rm(&format!("types/_shape{}", state.shapes.len() + 1)));
        state.shapes.insert(uri, title.to_owned());
        self
    }

    /// With an artifact record; `parent` is a folder path, `None` for a module usage
    #[must_use]
    pub fn with_artifact(mut self, identifier: &str, title: &str, parent: Option<&str>) -> Self {
        let state = self.state.get_mut();
        let n = state.next();
        let parent = parent.and_then(|p| state.folders.get(&normalize(p)).cloned());
        state.records.push((
            ResourceRef::new(rm(&format!("resources/AR_{n}"))),
            Record {
                identifier: identifier.to_owned(),
                title: title.to_owned(),
                parent,
                types: vec![REQUIREMENT_TYPE.to_owned()],
            },
        ));
        self
    }

    /// With a module whose structure resource is the root binding of `tree`
    #[must_use]
    pub fn with_module(mut self, title: &str, identifier: &str, tree: ModuleStructure) -> Self {
        let state = self.state.get_mut();
        let module = fixtures::module_uri(identifier);
        let structure = ResourceRef::new(tree.binding(tree.root()).id.as_str());

        let mut bound = Vec::new();
        for event in tree.walk() {
            if let WalkEvent::Node { binding, .. } = event {
                if let Some(artifact) = &binding.bound_artifact {
                    bound.push(artifact.clone());
                }
            }
        }
        for artifact in bound {
            if state.record(&artifact).is_none() {
                let n = state.next();
                let title = artifact
                    .as_str()
                    .rsplit('/')
                    .next()
                    .unwrap_or_default()
                    .to_owned();
                state.records.push((
                    artifact,
                    Record {
                        identifier: n.to_string(),
                        title,
                        parent: state.folders.get("/").cloned(),
                        types: vec![REQUIREMENT_TYPE.to_owned()],
                    },
                ));
            }
        }

        state.records.push((
            module.clone(),
            Record {
                identifier: identifier.to_owned(),
                title: title.to_owned(),
                parent: state.folders.get("/").cloned(),
                types: vec![MODULE_TYPE.to_owned()],
            },
        ));
        state.module_structures.insert(module, structure.clone());
        state.structures.insert(structure, Stored { tree, version: 1 });
        self
    }

    #[must_use]
    pub fn with_update_mode(mut self, mode: UpdateMode) -> Self {
        self.state.get_mut().update_mode = mode;
        self
    }

    /// Answer creation requests with `status` instead of 201
    #[must_use]
    pub fn with_creation_status(mut self, status: u16) -> Self {
        self.state.get_mut().creation_status = Some(status);
        self
    }

    /// Report created artifacts without `dcterms:identifier`
    #[must_use]
    pub fn withholding_identifiers(mut self) -> Self {
        self.state.get_mut().withhold_identifiers = true;
        self
    }

    /// Let another client update every structure right after it is fetched
    #[must_use]
    pub fn with_racing_writer(mut self) -> Self {
        self.state.get_mut().racing_writer = true;
        self
    }

    #[must_use]
    pub fn context(&self) -> ComponentContext {
        self.context.clone()
    }

    /// Current structure of a module
    #[must_use]
    pub fn structure_of(&self, module_identifier: &str) -> Option<ModuleStructure> {
        let state = self.state.lock();
        let structure = state
            .module_structures
            .get(&fixtures::module_uri(module_identifier))?;
        state.structures.get(structure).map(|s| s.tree.clone())
    }

    /// Simulate another client updating a module's structure
    pub fn touch_structure(&self, module_identifier: &str) {
        let mut state = self.state.lock();
        let Some(structure) = state
            .module_structures
            .get(&fixtures::module_uri(module_identifier))
            .cloned()
        else {
            return;
        };
        if let Some(stored) = state.structures.get_mut(&structure) {
            stored.version += 1;
        }
    }

    /// Title and folder of the artifact with `identifier`
    #[must_use]
    pub fn artifact(&self, identifier: &str) -> Option<(ResourceRef, String, Option<ResourceRef>)> {
        let state = self.state.lock();
        state
            .records
            .iter()
            .find(|(_, r)| r.identifier == identifier)
            .map(|(uri, r)| (uri.clone(), r.title.clone(), r.parent.clone()))
    }

    /// URI of the folder at `path`
    #[must_use]
    pub fn folder(&self, path: &str) -> Option<ResourceRef> {
        self.state.lock().folders.get(&normalize(path)).cloned()
    }

    /// Creation documents received, in order
    #[must_use]
    pub fn created_payloads(&self) -> Vec<String> {
        self.state.lock().payloads.clone()
    }

    /// Structure bodies received, in order
    #[must_use]
    pub fn submissions(&self) -> Vec<String> {
        self.state.lock().submissions.clone()
    }

    #[must_use]
    pub fn poll_count(&self) -> u32 {
        self.state.lock().polls
    }
}

fn normalize(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Rebuild `submitted`, giving every binding unknown to `stored` a durable id
fn assign_durable_ids(
    submitted: &ModuleStructure,
    stored: &ModuleStructure,
    next_id: &mut u32,
) -> Result<ModuleStructure, ServiceError> {
    let root = submitted.binding(submitted.root()).clone();
    let mut rebuilt =
        ModuleStructure::new(root).with_namespaces(submitted.namespaces().clone());
    let mut mapped: HashMap<NodeId, NodeId> = HashMap::new();
    mapped.insert(submitted.root(), rebuilt.root());

    for event in submitted.walk() {
        let WalkEvent::Node { node, binding, .. } = event else {
            continue;
        };
        let parent = submitted
            .parent(node)
            .and_then(|p| mapped.get(&p).copied())
            .ok_or_else(|| ServiceError::malformed("binding without parent"))?;
        let mut binding = binding.clone();
        if stored.find(&binding.id).is_none() {
            *next_id += 1;
            binding.id = BindingId::new(rm(&format!("resources/BI_{next_id}")));
        }
        let copy = rebuilt.append_child(parent, binding)?;
        mapped.insert(node, copy);
    }
    Ok(rebuilt)
}

fn etag(version: u64) -> String {
    format!("\"{version}\"")
}

#[async_trait]
impl RmService for InMemoryRm {
    async fn resolve_context(
        &self,
        project: &str,
        component: &str,
        configuration: &str,
    ) -> Result<ComponentContext, ServiceError> {
        if project != PROJECT {
            return Err(ServiceError::not_found("project", project));
        }
        if component != COMPONENT {
            return Err(ServiceError::not_found("component", component));
        }
        if configuration != CONFIGURATION {
            return Err(ServiceError::not_found("configuration", configuration));
        }
        Ok(self.context.clone())
    }

    async fn resolve_folder(
        &self,
        _ctx: &ComponentContext,
        path: &str,
    ) -> Result<Option<ResourceRef>, ServiceError> {
        Ok(self.folder(path))
    }

    async fn creation_factory(
        &self,
        _ctx: &ComponentContext,
        resource_type: &str,
    ) -> Result<CreationFactory, ServiceError> {
        if resource_type != REQUIREMENT_TYPE {
            return Err(ServiceError::not_found("creation factory", resource_type));
        }
        Ok(CreationFactory {
            uri: ResourceRef::new(rm("requirementFactory")),
            shapes: self.state.lock().shapes.keys().cloned().collect(),
        })
    }

    async fn shape_title(
        &self,
        _ctx: &ComponentContext,
        shape: &ResourceRef,
    ) -> Result<Option<String>, ServiceError> {
        Ok(self.state.lock().shapes.get(shape).cloned())
    }

    async fn create_resource(
        &self,
        _ctx: &ComponentContext,
        _factory: &ResourceRef,
        payload: String,
    ) -> Result<CreationResponse, ServiceError> {
        let mut state = self.state.lock();
        state.payloads.push(payload.clone());
        if let Some(status) = state.creation_status {
            return Ok(CreationResponse {
                status,
                location: None,
            });
        }

        let doc = markup::parse(&payload)?;
        let title = doc
            .descendant(DCTERMS, "title")
            .map(|t| t.text().trim().to_owned())
            .unwrap_or_default();
        let parent = doc
            .descendant(NAV, "parent")
            .and_then(Element::resource)
            .map(ResourceRef::from);
        let types = doc
            .descendants(RDF, "type")
            .into_iter()
            .filter_map(Element::resource)
            .map(str::to_owned)
            .collect();

        let n = state.next();
        let uri = ResourceRef::new(rm(&format!("resources/TX_{n}")));
        state.records.push((
            uri.clone(),
            Record {
                identifier: n.to_string(),
                title,
                parent,
                types,
            },
        ));
        Ok(CreationResponse {
            status: 201,
            location: Some(uri),
        })
    }

    async fn artifact_summary(
        &self,
        _ctx: &ComponentContext,
        artifact: &ResourceRef,
    ) -> Result<ArtifactSummary, ServiceError> {
        let state = self.state.lock();
        let record = state
            .record(artifact)
            .ok_or_else(|| ServiceError::status("artifact", 404, artifact.as_str()))?;
        Ok(ArtifactSummary {
            identifier: (!state.withhold_identifiers).then(|| record.identifier.clone()),
            title: Some(record.title.clone()),
        })
    }

    async fn structure_ref(
        &self,
        _ctx: &ComponentContext,
        module: &ResourceRef,
    ) -> Result<Option<ResourceRef>, ServiceError> {
        let state = self.state.lock();
        if state.record(module).is_none() {
            return Err(ServiceError::not_found("module", module.as_str()));
        }
        Ok(state.module_structures.get(module).cloned())
    }

    async fn fetch_structure(
        &self,
        _ctx: &ComponentContext,
        structure: &ResourceRef,
        form: WireForm,
    ) -> Result<Tagged<String>, ServiceError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let stored = state
            .structures
            .get_mut(structure)
            .ok_or_else(|| ServiceError::status("fetch structure", 404, structure.as_str()))?;
        let tagged = Tagged {
            body: encode_body(&stored.tree, form)?,
            etag: etag(stored.version),
        };
        if state.racing_writer {
            stored.version += 1;
        }
        Ok(tagged)
    }

    async fn submit_structure(
        &self,
        _ctx: &ComponentContext,
        structure: &ResourceRef,
        form: WireForm,
        body: String,
        etag_in: &str,
    ) -> Result<UpdateResponse, ServiceError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.submissions.push(body.clone());
        let stored = state
            .structures
            .get(structure)
            .ok_or_else(|| ServiceError::status("update structure", 404, structure.as_str()))?;
        if etag(stored.version) != etag_in {
            return Ok(UpdateResponse {
                status: 412,
                location: None,
            });
        }

        let submitted = decode_body(form, &body)?;
        let tree = assign_durable_ids(&submitted, &stored.tree, &mut state.next_id)?;
        let job = |state: &mut State, remaining, failure| {
            let n = state.next();
            let uri = ResourceRef::new(rm(&format!("jobs/{n}")));
            state.jobs.insert(
                uri.clone(),
                Job {
                    structure: structure.clone(),
                    tree: tree.clone(),
                    remaining,
                    failure,
                },
            );
            UpdateResponse {
                status: 202,
                location: Some(uri),
            }
        };

        let response = match state.update_mode.clone() {
            UpdateMode::Immediate => {
                state.apply(structure, tree.clone());
                UpdateResponse {
                    status: 200,
                    location: None,
                }
            }
            UpdateMode::Deferred { polls } => job(state, Some(polls.max(1)), None),
            UpdateMode::Stuck => job(state, None, None),
            UpdateMode::FailJob(message) => job(state, Some(1), Some(message)),
            UpdateMode::CancelJob => job(state, Some(1), Some("job canceled".to_owned())),
            UpdateMode::Reject(status) => UpdateResponse {
                status,
                location: None,
            },
        };
        Ok(response)
    }

    async fn query_artifacts(
        &self,
        _ctx: &ComponentContext,
        filters: &[QueryFilter],
    ) -> Result<QueryResults, ServiceError> {
        let state = self.state.lock();
        let mut results = QueryResults::new();
        for (uri, record) in &state.records {
            if filters.iter().all(|f| record.matches(f)) {
                results.entry(uri.clone()).or_insert_with(|| record.properties());
            }
        }
        Ok(results)
    }

    async fn poll_job(
        &self,
        _ctx: &ComponentContext,
        job: &ResourceRef,
    ) -> Result<JobStatus, ServiceError> {
        let mut state = self.state.lock();
        state.polls += 1;
        if state.finished_jobs.contains(job) {
            return Ok(JobStatus::Succeeded);
        }
        let pending = state
            .jobs
            .get_mut(job)
            .ok_or_else(|| ServiceError::status("job", 404, job.as_str()))?;
        if let Some(message) = &pending.failure {
            return Ok(JobStatus::Failed(message.clone()));
        }
        let remaining = pending.remaining;
        match remaining {
            None => Ok(JobStatus::Running),
            Some(n) if n > 1 => {
                pending.remaining = Some(n - 1);
                Ok(JobStatus::Running)
            }
            Some(_) => {
                if let Some(done) = state.jobs.remove(job) {
                    state.apply(&done.structure, done.tree);
                }
                state.finished_jobs.insert(job.clone());
                Ok(JobStatus::Succeeded)
            }
        }
    }
}

/// Module structures used across tests
pub mod fixtures {
    use super::rm;
    use modbind_structure::{Binding, ModuleStructure, ResourceRef};

    #[must_use]
    pub fn module_uri(identifier: &str) -> ResourceRef {
        ResourceRef::new(rm(&format!("resources/MD_{identifier}")))
    }

    #[must_use]
    pub fn structure_uri(identifier: &str) -> String {
        rm(&format!("modules/MD_{identifier}/structure"))
    }

    /// Structure with only its root
    #[must_use]
    pub fn empty_module(identifier: &str) -> ModuleStructure {
        ModuleStructure::new(
            Binding::new(structure_uri(identifier)).with_module(module_uri(identifier)),
        )
    }

    /// Structure whose root holds one empty heading per title
    #[must_use]
    pub fn module_with_headings(identifier: &str, titles: &[&str]) -> ModuleStructure {
        let mut tree = empty_module(identifier);
        for (i, title) in titles.iter().enumerate() {
            let binding = Binding::new(rm(&format!("resources/BI_{identifier}_{}", i + 1)))
                .heading()
                .with_artifact(rm(&format!("resources/{}", title.replace(' ', "_"))))
                .with_module(module_uri(identifier));
            let root = tree.root();
            if tree.append_child(root, binding).is_err() {
                break;
            }
        }
        tree
    }

    /// `module_with_headings` plus `leaves` plain bindings under the first heading
    #[must_use]
    pub fn module_with_leaves(identifier: &str, titles: &[&str], leaves: usize) -> ModuleStructure {
        let mut tree = module_with_headings(identifier, titles);
        let Some(first) = tree.children(tree.root()).first().copied() else {
            return tree;
        };
        for i in 0..leaves {
            let binding = Binding::new(rm(&format!("resources/BL_{identifier}_{}", i + 1)))
                .with_artifact(rm(&format!("resources/Leaf_{identifier}_{}", i + 1)))
                .with_module(module_uri(identifier));
            if tree.append_child(first, binding).is_err() {
                break;
            }
        }
        tree
    }
}
