//! Structure mutation protocol
//!
//! One mutation is a single optimistic round trip: fetch the structure with
//! its concurrency token, append one binding locally, submit the whole
//! structure back guarded by that token, then wait for the server to apply
//! it. A stale token fails fast; nothing is retried or merged.
//!
//! ```text
//! Fetched -> Mutated -> Submitted -> Applied
//!                                 -> Pending -> Applied
//!                                            -> TimedOut
//!                                 -> Conflicted
//! ```

use crate::config::StructureSettings;
use crate::error::BindError;
use modbind_oslc::{ComponentContext, JobStatus, RmService};
use modbind_structure::codec::{decode_body, encode_body};
use modbind_structure::{
    BindingId, FirstTopLevelSlot, InsertionPlanner, InsertionPolicy, ModuleStructure, NodeId,
    ResourceRef, WireForm,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Lifecycle of one structure mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationState {
    /// Snapshot and token in hand
    Fetched,
    /// Binding appended locally
    Mutated,
    /// Conditional update sent
    Submitted,
    /// Accepted, applied asynchronously by a server job
    Pending,
    Applied,
    /// Token was stale
    Conflicted,
    /// Job outlived the wait bound
    TimedOut,
}

impl MutationState {
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        allowed_transitions(self).is_empty()
    }
}

/// Validate a mutation state transition
pub fn validate_transition(from: MutationState, to: MutationState) -> Result<(), BindError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(BindError::IllegalTransition { from, to })
    }
}

pub fn allowed_transitions(from: MutationState) -> Vec<MutationState> {
    use MutationState::*;
    match from {
        Fetched => vec![Mutated],
        Mutated => vec![Submitted],
        Submitted => vec![Applied, Pending, Conflicted],
        Pending => vec![Applied, TimedOut],
        Applied | Conflicted | TimedOut => vec![],
    }
}

/// Current state plus every state passed through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationProgress {
    history: Vec<MutationState>,
}

impl MutationProgress {
    #[must_use]
    pub fn start() -> Self {
        Self {
            history: vec![MutationState::Fetched],
        }
    }

    #[must_use]
    pub fn state(&self) -> MutationState {
        self.history
            .last()
            .copied()
            .unwrap_or(MutationState::Fetched)
    }

    pub fn advance(&mut self, to: MutationState) -> Result<(), BindError> {
        validate_transition(self.state(), to)?;
        debug!(from = ?self.state(), ?to, "mutation state");
        self.history.push(to);
        Ok(())
    }

    #[must_use]
    pub fn history(&self) -> &[MutationState] {
        &self.history
    }
}

/// Timing and encoding of a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationSettings {
    pub wire_form: WireForm,
    pub poll_interval: Duration,
    pub job_timeout: Duration,
    pub settle_delay: Duration,
}

impl From<&StructureSettings> for MutationSettings {
    fn from(settings: &StructureSettings) -> Self {
        Self {
            wire_form: settings.wire_form,
            poll_interval: settings.poll_interval(),
            job_timeout: settings.job_timeout(),
            settle_delay: settings.settle_delay(),
        }
    }
}

impl Default for MutationSettings {
    fn default() -> Self {
        Self::from(&StructureSettings::default())
    }
}

/// Result of a successful mutation
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    /// Id the new binding was submitted under
    pub placeholder: BindingId,
    /// Structure as it stands after the update applied
    pub structure: ModuleStructure,
    /// Node wrapping the bound artifact in `structure`
    pub bound: Option<NodeId>,
    pub history: Vec<MutationState>,
    /// Job tracker, when the update applied asynchronously
    pub job: Option<ResourceRef>,
    /// Number of job polls made
    pub polls: u32,
}

/// Runs the mutation protocol against one structure resource
pub struct StructureMutator<'a, S: RmService + ?Sized> {
    service: &'a S,
    settings: MutationSettings,
    policy: Arc<dyn InsertionPolicy>,
}

impl<'a, S: RmService + ?Sized> StructureMutator<'a, S> {
    /// Mutator inserting under the first top-level binding
    #[must_use]
    pub fn new(service: &'a S, settings: MutationSettings) -> Self {
        Self {
            service,
            settings,
            policy: Arc::new(FirstTopLevelSlot),
        }
    }

    /// With insertion policy
    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn InsertionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Bind `artifact` into the structure of `module`
    pub async fn bind(
        &self,
        ctx: &ComponentContext,
        structure: &ResourceRef,
        artifact: &ResourceRef,
        module: &ResourceRef,
    ) -> Result<MutationOutcome, BindError> {
        let form = self.settings.wire_form;
        let snapshot = self.service.fetch_structure(ctx, structure, form).await?;
        let mut progress = MutationProgress::start();
        debug!(%structure, etag = %snapshot.etag, %form, "structure fetched");

        let mut tree = decode_body(form, &snapshot.body)?;
        let slot = self.policy.locate(&tree)?;
        let planner = InsertionPlanner::for_structure(&tree);
        let binding = planner.plan(artifact, module, &ctx.component)?;
        tree.insert(slot, binding)?;
        progress.advance(MutationState::Mutated)?;
        debug!(
            policy = self.policy.name(),
            placeholder = %planner.placeholder(),
            bindings = tree.binding_count(),
            "binding appended"
        );

        let body = encode_body(&tree, form)?;
        let response = self
            .service
            .submit_structure(ctx, structure, form, body, &snapshot.etag)
            .await?;
        progress.advance(MutationState::Submitted)?;
        info!(%structure, status = response.status, "structure update submitted");

        let mut job = None;
        let mut polls = 0;
        let confirmed = match response.status {
            200 | 201 | 204 => {
                progress.advance(MutationState::Applied)?;
                tree
            }
            202 => match response.location {
                Some(tracker) => {
                    progress.advance(MutationState::Pending)?;
                    match self.await_job(ctx, &tracker).await {
                        Ok(count) => polls = count,
                        Err(err @ BindError::Timeout { .. }) => {
                            progress.advance(MutationState::TimedOut)?;
                            return Err(err);
                        }
                        Err(err) => return Err(err),
                    }
                    tokio::time::sleep(self.settings.settle_delay).await;
                    let applied = self.service.fetch_structure(ctx, structure, form).await?;
                    progress.advance(MutationState::Applied)?;
                    job = Some(tracker);
                    decode_body(form, &applied.body)?
                }
                None => {
                    warn!(%structure, "update accepted without a job tracker");
                    progress.advance(MutationState::Applied)?;
                    tree
                }
            },
            412 => {
                progress.advance(MutationState::Conflicted)?;
                warn!(%structure, etag = %snapshot.etag, "structure changed since it was read");
                return Err(BindError::ConcurrentModification {
                    etag: snapshot.etag,
                });
            }
            status => {
                return Err(BindError::RemoteRejected {
                    operation: "structure update",
                    status,
                })
            }
        };

        let bound = confirmed.find_artifact(artifact.as_str());
        if bound.is_none() {
            warn!(%artifact, "applied structure does not contain the new binding");
        }
        Ok(MutationOutcome {
            placeholder: planner.placeholder().clone(),
            structure: confirmed,
            bound,
            history: progress.history().to_vec(),
            job,
            polls,
        })
    }

    /// Poll `job` at the fixed interval until it finishes or the bound elapses
    async fn await_job(&self, ctx: &ComponentContext, job: &ResourceRef) -> Result<u32, BindError> {
        let mut polls = 0u32;
        let waiting = async {
            loop {
                tokio::time::sleep(self.settings.poll_interval).await;
                polls += 1;
                match self.service.poll_job(ctx, job).await? {
                    JobStatus::Running => debug!(%job, polls, "job still running"),
                    JobStatus::Succeeded => return Ok(()),
                    JobStatus::Failed(message) => {
                        return Err(BindError::JobFailed {
                            job: job.clone(),
                            message,
                        })
                    }
                }
            }
        };
        let result = tokio::time::timeout(self.settings.job_timeout, waiting).await;
        match result {
            Ok(Ok(())) => {
                info!(%job, polls, "job finished");
                Ok(polls)
            }
            Ok(Err(err)) => Err(err),
            Err(_) => Err(BindError::Timeout {
                job: job.clone(),
                waited_secs: self.settings.job_timeout.as_secs(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use MutationState::*;

    #[test]
    fn transitions() {
        assert_eq!(allowed_transitions(Submitted), vec![Applied, Pending, Conflicted]);
        assert!(validate_transition(Fetched, Mutated).is_ok());
        assert!(validate_transition(Pending, Applied).is_ok());
        assert!(matches!(
            validate_transition(Fetched, Submitted),
            Err(BindError::IllegalTransition { .. })
        ));
        assert!(validate_transition(Conflicted, Fetched).is_err());
    }

    #[test]
    fn terminal_states() {
        assert!(Applied.is_terminal());
        assert!(Conflicted.is_terminal());
        assert!(TimedOut.is_terminal());
        assert!(!Pending.is_terminal());
    }

    #[test]
    fn progress_records_history() {
        let mut progress = MutationProgress::start();
        progress.advance(Mutated).unwrap();
        progress.advance(Submitted).unwrap();
        assert!(progress.advance(Mutated).is_err());
        progress.advance(Pending).unwrap();
        progress.advance(Applied).unwrap();
        assert_eq!(progress.state(), Applied);
        assert_eq!(
            progress.history(),
            &[Fetched, Mutated, Submitted, Pending, Applied]
        );
    }

    #[test]
    fn settings_from_config() {
        let settings = MutationSettings::from(
            &StructureSettings::default()
                .with_poll_interval_ms(200)
                .with_job_timeout_secs(3),
        );
        assert_eq!(settings.poll_interval, Duration::from_millis(200));
        assert_eq!(settings.job_timeout, Duration::from_secs(3));
    }
}
