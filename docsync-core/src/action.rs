//! The unit of work the orchestrator runs.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::contract::{ContentGenerator, RepoRef, RepositoryGateway};
use crate::error::PipelineError;
use crate::links::LinkStore;
use crate::state::{PipelineState, StateDelta};

/// One field of an action's parameter struct, for planners and `docsync actions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub required: bool,
    pub description: &'static str,
}

/// Static description of an action: its id, what must run before it and which
/// parameters it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionDescriptor {
    pub id: &'static str,
    pub depends_on: &'static [&'static str],
    pub parameters: &'static [ParamSpec],
}

/// Capabilities and target repository shared by every action of a run.
#[derive(Clone)]
pub struct ActionContext {
    pub repo: RepoRef,
    pub gateway: Arc<dyn RepositoryGateway>,
    pub generator: Arc<dyn ContentGenerator>,
    pub links: Option<Arc<dyn LinkStore>>,
}

impl ActionContext {
    pub fn new(
        repo: RepoRef,
        gateway: Arc<dyn RepositoryGateway>,
        generator: Arc<dyn ContentGenerator>,
    ) -> Self {
        Self {
            repo,
            gateway,
            generator,
            links: None,
        }
    }

    /// Consult and maintain a persisted change-link store during reconciliation.
    pub fn with_links(mut self, links: Arc<dyn LinkStore>) -> Self {
        self.links = Some(links);
        self
    }

    pub fn links(&self) -> Option<&dyn LinkStore> {
        self.links.as_deref()
    }
}

/// A named, dependency-constrained, state-transforming operation.
///
/// Actions never mutate the state they are given; they return a [`StateDelta`] that
/// the orchestrator merges.
#[async_trait]
pub trait Action: Send + Sync {
    fn descriptor(&self) -> &'static ActionDescriptor;

    async fn execute(
        &self,
        state: &PipelineState,
        ctx: &ActionContext,
    ) -> Result<StateDelta, PipelineError>;
}
