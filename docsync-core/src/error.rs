//! Error types for docsync-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::contract::GatewayError;

/// All errors that can abort a pipeline run or a single action.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A credential required to talk to an external service is not configured.
    #[error("missing credential: {name}")]
    MissingCredential { name: String },

    /// The caller supplied malformed or missing action parameters.
    #[error("invalid parameters for action '{action}': {reason}")]
    InvalidParameters { action: String, reason: String },

    /// An action was invoked before its predecessors populated the state it needs.
    #[error("action '{action}' depends on {missing:?}, which have not completed")]
    DependencyUnmet { action: String, missing: Vec<String> },

    /// A gateway or generator call failed.
    #[error("remote operation '{operation}' failed: {message}")]
    RemoteOperationFailed {
        operation: &'static str,
        message: String,
    },

    /// Generated content did not pass the quality gate.
    #[error("generated content for {path} rejected: {reason}")]
    ContentQualityRejected { path: String, reason: String },

    /// A delta tried to replace a set-once state field with a different value.
    #[error("pipeline state conflict on field '{field}'")]
    StateConflict { field: &'static str },

    /// The action catalog references unknown ids or contains a cycle.
    #[error("invalid action graph: {0}")]
    InvalidActionGraph(String),

    /// A previous action failed; the remainder of the run is abandoned.
    #[error("pipeline run was aborted by an earlier failure")]
    RunAborted,

    /// I/O error on the change-link store file.
    #[error("link store I/O error at {path}: {source}")]
    LinkStoreIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The change-link store file is not valid JSON.
    #[error("link store JSON error: {0}")]
    LinkStoreFormat(#[from] serde_json::Error),
}

/// Maps a boxed gateway error into [`PipelineError::RemoteOperationFailed`].
pub(crate) fn remote(operation: &'static str) -> impl FnOnce(GatewayError) -> PipelineError {
    move |e| PipelineError::RemoteOperationFailed {
        operation,
        message: e.to_string(),
    }
}

pub(crate) fn link_io(path: impl Into<PathBuf>, source: std::io::Error) -> PipelineError {
    PipelineError::LinkStoreIo {
        path: path.into(),
        source,
    }
}
