//! Expert instances and the pool that owns them.

pub mod instance;
pub mod pool;
mod registry;

pub use instance::{AgentInstance, InstanceId, InstanceStatus, SessionId};
pub use pool::{ExpertPool, ExpertTypeSummary, PoolStats, StatusCounts};
