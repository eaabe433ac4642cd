use crate::backend::BackendError;
use expert_pool::{InstanceId, InstanceStatus, PoolError};

/// Errors returned by the integration layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrationError {
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Tasks run only on instances that are currently active.
    #[error("instance {instance_id} is {status}, not active")]
    InstanceNotActive {
        instance_id: InstanceId,
        status: InstanceStatus,
    },
}

pub type Result<T> = std::result::Result<T, IntegrationError>;
