//! Execution backend seam.

use async_trait::async_trait;
use expert_pool::{ExpertDefinition, SessionId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Failure reported by an execution backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("backend error: {0}")]
pub struct BackendError(pub String);

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// One task to run inside an instance's session.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub session_id: SessionId,
    pub task: String,
    pub context: Option<String>,
    /// Template of the instance running the task, for prompt construction.
    pub expert: Arc<ExpertDefinition>,
}

/// Result of running a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutput {
    pub success: bool,
    pub output: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl ExecutionOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Runs tasks inside long-lived sessions.
///
/// Implementations own the sessions; the pool only hands out their ids.
/// Calls are made outside every pool lock and may take as long as they need.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Run `request.task` in `request.session_id`.
    ///
    /// `Ok` with `success == false` means the task ran and failed; `Err` means
    /// the backend could not run it at all.
    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionOutput, BackendError>;
}
