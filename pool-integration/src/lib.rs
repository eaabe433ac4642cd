//! Integration layer for the expert pool.
//!
//! Composes the relevance selector and the [`ExpertPool`](expert_pool::ExpertPool)
//! into a single "give me an agent for this task" call, and forwards task
//! execution to an external [`ExecutionBackend`].
//!
//! # Example
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use expert_pool::{ExpertCatalog, ExpertDefinition, ExpertPool, PoolConfig};
//! use pool_integration::{
//!     BackendError, ExecutionBackend, ExecutionOutput, ExecutionRequest, PoolIntegration,
//! };
//! use std::sync::Arc;
//!
//! struct EchoBackend;
//!
//! #[async_trait]
//! impl ExecutionBackend for EchoBackend {
//!     async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionOutput, BackendError> {
//!         Ok(ExecutionOutput::success(request.task))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = ExpertCatalog::new([
//!         ExpertDefinition::new("backend-architect", "Backend Architect")
//!             .with_triggers(["REST API"]),
//!     ])?;
//!     let pool = Arc::new(ExpertPool::new(Arc::new(catalog), PoolConfig::default()));
//!     let integration = PoolIntegration::new(pool, Arc::new(EchoBackend));
//!
//!     let run = integration.run_task("Design a REST API", None).await?;
//!     println!("{} -> {}", run.handle.expert_id, run.output.output);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod error;
pub mod integration;

pub use backend::{BackendError, ExecutionBackend, ExecutionOutput, ExecutionRequest};
pub use error::{IntegrationError, Result};
pub use integration::{AgentHandle, PoolIntegration, PoolStatus, TaskRun, WorkflowSuggestion};
