//! Expert agent pool.
//!
//! Selects the most relevant expert template for a task and hands out live,
//! stateful instances of it, reusing idle ones where possible and enforcing a
//! per-type capacity.
//!
//! # Modules
//!
//! - [`catalog`] - Immutable expert definitions, in a fixed order
//! - [`selector`] - Relevance scoring of experts against task text
//! - [`agent`] - Instance state machine and the [`ExpertPool`] manager
//! - [`config`] - Pool capacity and idle timeout
//!
//! # Example
//!
//! ```rust
//! use expert_pool::{ExpertCatalog, ExpertDefinition, ExpertPool, PoolConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = ExpertCatalog::new([
//!     ExpertDefinition::new("backend-architect", "Backend Architect")
//!         .with_triggers(["REST API", "database schema"]),
//! ])?;
//! let pool = ExpertPool::new(Arc::new(catalog), PoolConfig::default());
//!
//! let instance = pool.acquire_expert(None, "Design a REST API", true).await?;
//! // ... run the task against instance.session_id() ...
//! pool.release_instance(instance.instance_id(), "done").await?;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod catalog;
pub mod config;
pub mod error;
pub mod selector;

pub use agent::{
    AgentInstance, ExpertPool, ExpertTypeSummary, InstanceId, InstanceStatus, PoolStats,
    SessionId, StatusCounts,
};
pub use catalog::{Boundaries, ExpertCatalog, ExpertDefinition, ExpertTier};
pub use config::PoolConfig;
pub use error::{CatalogError, ConfigError, PoolError, Result};
pub use selector::{ScoreBreakdown, ScoredExpert, SelectionExplanation, Selector};
