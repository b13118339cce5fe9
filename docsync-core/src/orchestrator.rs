//! Runs actions against a single-owner [`PipelineState`].
//!
//! The orchestrator does not decide the order of independent actions; a caller (the
//! fixed plan in [`crate::pipeline`] or an external planner through [`Orchestrator::invoke`])
//! does. What it guarantees:
//!   - the action catalog is a DAG over known ids (checked at construction)
//!   - an action whose dependencies have not completed is rejected before it runs
//!   - each action's delta is merged into a new state value; nothing half-written is
//!     ever visible to the next action
//!   - the first failure aborts the run; later calls return [`PipelineError::RunAborted`]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::action::{Action, ActionContext, ActionDescriptor};
use crate::actions::{action_from_request, catalog};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::state::PipelineState;

/// Check that ids are unique, dependencies are known and the graph is acyclic.
pub fn validate_graph(descriptors: &[&ActionDescriptor]) -> Result<(), PipelineError> {
    let mut by_id: BTreeMap<&str, &ActionDescriptor> = BTreeMap::new();
    for descriptor in descriptors {
        if by_id.insert(descriptor.id, descriptor).is_some() {
            return Err(PipelineError::InvalidActionGraph(format!(
                "duplicate action id '{}'",
                descriptor.id
            )));
        }
    }
    for descriptor in descriptors {
        if let Some(unknown) = descriptor
            .depends_on
            .iter()
            .find(|dep| !by_id.contains_key(*dep))
        {
            return Err(PipelineError::InvalidActionGraph(format!(
                "action '{}' depends on unknown action '{unknown}'",
                descriptor.id
            )));
        }
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit<'a>(
        id: &'a str,
        by_id: &BTreeMap<&'a str, &'a ActionDescriptor>,
        marks: &mut BTreeMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
    ) -> Result<(), PipelineError> {
        match marks.get(id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                path.push(id);
                return Err(PipelineError::InvalidActionGraph(format!(
                    "dependency cycle: {}",
                    path.join(" -> ")
                )));
            }
            None => {}
        }
        marks.insert(id, Mark::Visiting);
        path.push(id);
        for dep in by_id[id].depends_on {
            visit(dep, by_id, marks, path)?;
        }
        path.pop();
        marks.insert(id, Mark::Done);
        Ok(())
    }

    let mut marks = BTreeMap::new();
    for id in by_id.keys().copied() {
        visit(id, &by_id, &mut marks, &mut Vec::new())?;
    }
    Ok(())
}

pub struct Orchestrator {
    ctx: ActionContext,
    catalog: BTreeMap<&'static str, &'static ActionDescriptor>,
    state: PipelineState,
    completed: BTreeSet<&'static str>,
    aborted: bool,
}

impl Orchestrator {
    /// Orchestrator over the documentation pipeline's action catalog.
    pub fn new(ctx: ActionContext, config: Arc<PipelineConfig>) -> Result<Self, PipelineError> {
        Self::with_catalog(ctx, config, catalog())
    }

    pub fn with_catalog(
        ctx: ActionContext,
        config: Arc<PipelineConfig>,
        descriptors: Vec<&'static ActionDescriptor>,
    ) -> Result<Self, PipelineError> {
        validate_graph(&descriptors)?;
        Ok(Self {
            ctx,
            catalog: descriptors.into_iter().map(|d| (d.id, d)).collect(),
            state: PipelineState::new(config),
            completed: BTreeSet::new(),
            aborted: false,
        })
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn into_state(self) -> PipelineState {
        self.state
    }

    pub fn has_completed(&self, id: &str) -> bool {
        self.completed.contains(id)
    }

    /// Ids whose dependencies have all completed, in id order.
    pub fn ready_actions(&self) -> Vec<&'static str> {
        if self.aborted {
            return Vec::new();
        }
        self.catalog
            .values()
            .filter(|d| d.depends_on.iter().all(|dep| self.completed.contains(dep)))
            .map(|d| d.id)
            .collect()
    }

    /// True once every action nothing else depends on has completed.
    pub fn is_complete(&self) -> bool {
        let depended_on: BTreeSet<&str> = self
            .catalog
            .values()
            .flat_map(|d| d.depends_on.iter().copied())
            .collect();
        !self.aborted
            && self
                .catalog
                .keys()
                .filter(|id| !depended_on.contains(*id))
                .all(|id| self.completed.contains(id))
    }

    /// Execute one action and merge its delta.
    pub async fn execute(&mut self, action: &dyn Action) -> Result<(), PipelineError> {
        if self.aborted {
            return Err(PipelineError::RunAborted);
        }
        let requested = action.descriptor();
        let Some(descriptor) = self.catalog.get(requested.id).copied() else {
            error!(action = requested.id, "[PIPELINE][ERROR] Action not in catalog, aborting run");
            self.aborted = true;
            return Err(PipelineError::InvalidParameters {
                action: requested.id.to_string(),
                reason: "action is not part of this pipeline's catalog".to_string(),
            });
        };

        let missing: Vec<String> = descriptor
            .depends_on
            .iter()
            .filter(|dep| !self.completed.contains(*dep))
            .map(|dep| dep.to_string())
            .collect();
        if !missing.is_empty() {
            error!(action = descriptor.id, ?missing, "[PIPELINE][ERROR] Dependencies not satisfied, aborting run");
            self.aborted = true;
            return Err(PipelineError::DependencyUnmet {
                action: descriptor.id.to_string(),
                missing,
            });
        }

        info!(action = descriptor.id, "[PIPELINE] Executing action");
        let delta = match action.execute(&self.state, &self.ctx).await {
            Ok(delta) => delta,
            Err(e) => {
                error!(action = descriptor.id, error = %e, "[PIPELINE][ERROR] Action failed, aborting run");
                self.aborted = true;
                return Err(e);
            }
        };
        debug!(action = descriptor.id, ?delta, "[PIPELINE] Merging action result");

        let config = Arc::clone(&self.state.config);
        let current = std::mem::replace(&mut self.state, PipelineState::new(config));
        match current.merge(delta) {
            Ok(next) => self.state = next,
            Err(e) => {
                error!(action = descriptor.id, error = %e, "[PIPELINE][ERROR] State merge failed, aborting run");
                self.aborted = true;
                return Err(e);
            }
        }
        self.completed.insert(descriptor.id);
        Ok(())
    }

    /// Execute an action requested by an external planner as
    /// `{"action": "<id>", "params": {...}}`. A request that cannot be parsed
    /// aborts the run like any other failure.
    pub async fn invoke(&mut self, request: serde_json::Value) -> Result<(), PipelineError> {
        if self.aborted {
            return Err(PipelineError::RunAborted);
        }
        let action = match parse_request(request) {
            Ok(action) => action,
            Err(e) => {
                error!(error = %e, "[PIPELINE][ERROR] Invalid action request, aborting run");
                self.aborted = true;
                return Err(e);
            }
        };
        self.execute(action.as_ref()).await
    }
}

fn parse_request(request: serde_json::Value) -> Result<Box<dyn Action>, PipelineError> {
    let serde_json::Value::Object(mut fields) = request else {
        return Err(PipelineError::InvalidParameters {
            action: String::new(),
            reason: "request must be a JSON object".to_string(),
        });
    };
    let Some(serde_json::Value::String(id)) = fields.remove("action") else {
        return Err(PipelineError::InvalidParameters {
            action: String::new(),
            reason: "request has no string 'action' field".to_string(),
        });
    };
    let params = fields.remove("params").unwrap_or(serde_json::Value::Null);
    action_from_request(&id, params)
}
