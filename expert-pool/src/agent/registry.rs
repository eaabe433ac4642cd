use crate::agent::InstanceId;
use dashmap::DashMap;
use tracing::debug;

/// Maps live instance ids to the expert type that owns them, so id-based
/// operations know which per-type slot to lock.
///
/// Entries are written and removed only while the owning slot is locked.
#[derive(Default)]
pub(crate) struct InstanceRegistry {
    owners: DashMap<InstanceId, String>,
}

impl InstanceRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Expert type owning `instance_id`. The returned value is a copy; no map
    /// guard is held afterwards.
    pub(crate) fn owner(&self, instance_id: &InstanceId) -> Option<String> {
        self.owners.get(instance_id).map(|entry| entry.value().clone())
    }

    pub(crate) fn register(&self, instance_id: InstanceId, expert_id: &str) {
        debug!("Registering instance {} for {}", instance_id, expert_id);
        self.owners.insert(instance_id, expert_id.to_string());
    }

    pub(crate) fn unregister(&self, instance_id: &InstanceId) -> bool {
        self.owners.remove(instance_id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.owners.len()
    }
}
