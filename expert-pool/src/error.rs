use crate::agent::{InstanceId, InstanceStatus};

/// Errors returned by pool operations.
///
/// These describe expected conditions (capacity reached, unknown ids) and are
/// handed back to the caller as values; none of them leave the pool in an
/// inconsistent state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// The task description is empty or only whitespace.
    #[error("task description must not be empty")]
    EmptyTask,

    /// The requested expert id is not in the catalog.
    #[error("unknown expert: {0}")]
    UnknownExpert(String),

    /// The selector scored every catalog entry at zero.
    #[error("no suitable expert found for task")]
    NoSuitableExpert,

    /// Every slot for the expert type is taken and no idle instance could be reused.
    #[error("pool exhausted for expert {expert_id} (max {max_instances} instances)")]
    PoolExhausted {
        expert_id: String,
        max_instances: usize,
    },

    /// No live instance carries this id.
    #[error("instance not found: {0}")]
    NotFound(InstanceId),

    /// The instance is not in a state that allows the requested transition.
    #[error("instance {instance_id} cannot move from {from} to {to}")]
    InvalidTransition {
        instance_id: InstanceId,
        from: InstanceStatus,
        to: InstanceStatus,
    },
}

/// Errors raised while building an [`ExpertCatalog`](crate::catalog::ExpertCatalog).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("duplicate expert id: {0}")]
    DuplicateExpert(String),

    #[error("expert id must not be empty")]
    EmptyExpertId,
}

/// Errors raised while reading pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

pub type Result<T> = std::result::Result<T, PoolError>;
