//! Expert pool for managing agent instances per expert type.

use crate::agent::instance::{AgentInstance, InstanceId, InstanceStatus};
use crate::agent::registry::InstanceRegistry;
use crate::catalog::{ExpertCatalog, ExpertTier};
use crate::config::PoolConfig;
use crate::error::{PoolError, Result};
use crate::selector::Selector;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::{debug, info, warn};

type LiveInstances = HashMap<InstanceId, AgentInstance>;

/// One expert type: its fixed capacity and its live instances.
///
/// Each expert type has its own lock, so the idle lookup, the capacity check
/// and the insert happen as one step per type without serializing
/// unrelated types.
struct TypeSlot {
    max_instances: usize,
    live: Mutex<LiveInstances>,
}

/// Least recently used idle instance. Equal timestamps fall back to id order.
fn least_recently_used_idle(live: &mut LiveInstances) -> Option<&mut AgentInstance> {
    live.values_mut()
        .filter(|inst| inst.status() == InstanceStatus::Idle)
        .min_by(|a, b| {
            a.last_used_instant()
                .cmp(&b.last_used_instant())
                .then_with(|| a.instance_id().cmp(b.instance_id()))
        })
}

/// Pool of expert instances.
///
/// The catalog is fixed at construction, so the set of per-type slots never
/// changes; only their contents do.
pub struct ExpertPool {
    config: PoolConfig,
    catalog: Arc<ExpertCatalog>,
    selector: Selector,
    slots: HashMap<String, TypeSlot>,
    registry: InstanceRegistry,
}

impl ExpertPool {
    /// Create an empty pool over `catalog`.
    pub fn new(catalog: Arc<ExpertCatalog>, config: PoolConfig) -> Self {
        let slots = catalog
            .iter()
            .map(|def| {
                let slot = TypeSlot {
                    max_instances: def.max_instances.unwrap_or(config.max_instances_per_type),
                    live: Mutex::new(HashMap::new()),
                };
                (def.expert_id.clone(), slot)
            })
            .collect();

        info!(
            "Creating expert pool with {} expert types (default max {} per type)",
            catalog.len(),
            config.max_instances_per_type
        );

        Self {
            selector: Selector::new(catalog.clone()),
            config,
            catalog,
            slots,
            registry: InstanceRegistry::new(),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<ExpertCatalog> {
        &self.catalog
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Capacity of an expert type, or `None` if the id is not in the catalog.
    pub fn max_instances(&self, expert_id: &str) -> Option<usize> {
        self.slots.get(expert_id).map(|slot| slot.max_instances)
    }

    /// Hand out an active instance for `task`.
    ///
    /// Without `expert_id` the selector picks the expert. With `prefer_reuse`
    /// the least recently used idle instance of the type is reactivated;
    /// otherwise a new instance is created if the type has a free slot.
    /// A blank `task` is rejected with [`PoolError::EmptyTask`] before any
    /// lookup.
    pub async fn acquire_expert(
        &self,
        expert_id: Option<&str>,
        task: &str,
        prefer_reuse: bool,
    ) -> Result<AgentInstance> {
        if task.trim().is_empty() {
            return Err(PoolError::EmptyTask);
        }

        let expert_id = match expert_id {
            Some(id) => id.to_string(),
            None => {
                self.selector
                    .select_best(task, None)
                    .ok_or(PoolError::NoSuitableExpert)?
                    .expert_id
            }
        };

        let slot = self.slots.get(&expert_id).ok_or_else(|| {
            warn!("Expert '{}' not found in catalog", expert_id);
            PoolError::UnknownExpert(expert_id.clone())
        })?;
        let max_instances = slot.max_instances;

        let mut live = slot.live.lock().await;

        if prefer_reuse {
            if let Some(instance) = least_recently_used_idle(&mut live) {
                instance.activate(task)?;
                info!("Reusing idle instance: {}", instance.instance_id());
                return Ok(instance.clone());
            }
        }

        if live.len() >= max_instances {
            warn!(
                "Max instances reached for {} ({}/{})",
                expert_id,
                live.len(),
                max_instances
            );
            return Err(PoolError::PoolExhausted {
                expert_id,
                max_instances,
            });
        }

        let instance = AgentInstance::new_active(&expert_id, task);
        self.registry
            .register(instance.instance_id().clone(), &expert_id);
        live.insert(instance.instance_id().clone(), instance.clone());

        info!(
            "Created new instance: {} for {} ({}/{})",
            instance.instance_id(),
            expert_id,
            live.len(),
            max_instances
        );
        Ok(instance)
    }

    /// Lock the live instances of the type owning `instance_id`.
    async fn owning_slot(&self, instance_id: &InstanceId) -> Result<MutexGuard<'_, LiveInstances>> {
        let not_found = || {
            warn!("Instance {} not found", instance_id);
            PoolError::NotFound(instance_id.clone())
        };

        let expert_id = self.registry.owner(instance_id).ok_or_else(not_found)?;
        let slot = self.slots.get(&expert_id).ok_or_else(not_found)?;
        let live = slot.live.lock().await;

        // Terminated between the registry lookup and taking the lock.
        if !live.contains_key(instance_id) {
            return Err(not_found());
        }
        Ok(live)
    }

    /// Return an active or errored instance to idle.
    ///
    /// Releasing an instance that is already idle is a no-op: `task_count` is
    /// not incremented again. Unknown ids yield [`PoolError::NotFound`].
    pub async fn release_instance(&self, instance_id: &InstanceId, result_summary: &str) -> Result<()> {
        let mut live = self.owning_slot(instance_id).await?;
        let instance = live
            .get_mut(instance_id)
            .ok_or_else(|| PoolError::NotFound(instance_id.clone()))?;

        if instance.release(result_summary) {
            info!(
                "Released instance: {} (tasks completed: {})",
                instance_id,
                instance.task_count()
            );
        } else {
            debug!("Instance {} already idle, release ignored", instance_id);
        }
        Ok(())
    }

    /// Remove an instance regardless of its status, freeing its slot.
    pub async fn terminate_instance(&self, instance_id: &InstanceId) -> Result<()> {
        let mut live = self.owning_slot(instance_id).await?;
        let removed = live
            .remove(instance_id)
            .ok_or_else(|| PoolError::NotFound(instance_id.clone()))?;
        self.registry.unregister(instance_id);

        info!(
            "Terminated instance: {} (was {})",
            instance_id,
            removed.status()
        );
        Ok(())
    }

    /// Move an active instance to error.
    ///
    /// Errored instances keep their slot and are never reused until released
    /// or terminated. Marking an errored instance again is a no-op; marking an
    /// idle one is an [`PoolError::InvalidTransition`].
    pub async fn mark_error(&self, instance_id: &InstanceId) -> Result<()> {
        let mut live = self.owning_slot(instance_id).await?;
        let instance = live
            .get_mut(instance_id)
            .ok_or_else(|| PoolError::NotFound(instance_id.clone()))?;

        if instance.fail()? {
            warn!("Instance {} marked as error", instance_id);
        }
        Ok(())
    }

    /// Terminate every idle instance unused for at least `max_idle`.
    ///
    /// Active and errored instances are never swept. The pool does not call
    /// this on its own; scheduling is up to the caller.
    pub async fn cleanup_idle_instances(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        for expert_id in self.catalog.ids() {
            let Some(slot) = self.slots.get(expert_id) else {
                continue;
            };
            let mut live = slot.live.lock().await;

            let expired: Vec<InstanceId> = live
                .values()
                .filter(|inst| {
                    inst.status() == InstanceStatus::Idle
                        && now.saturating_duration_since(inst.last_used_instant()) >= max_idle
                })
                .map(|inst| inst.instance_id().clone())
                .collect();

            for instance_id in expired {
                live.remove(&instance_id);
                self.registry.unregister(&instance_id);
                info!("Cleaned up idle instance: {}", instance_id);
                removed += 1;
            }
        }

        debug!("Idle sweep removed {} instances", removed);
        removed
    }

    /// [`cleanup_idle_instances`](Self::cleanup_idle_instances) with the configured idle timeout.
    pub async fn cleanup_expired(&self) -> usize {
        self.cleanup_idle_instances(self.config.idle_timeout).await
    }

    /// Snapshot of one instance.
    pub async fn get_instance(&self, instance_id: &InstanceId) -> Option<AgentInstance> {
        let live = self.owning_slot(instance_id).await.ok()?;
        live.get(instance_id).cloned()
    }

    /// Snapshot of every live instance, in catalog order and then by creation time.
    ///
    /// Each expert type is read under its own lock, so the result is
    /// consistent per type but not across types.
    pub async fn list_active_instances(&self) -> Vec<AgentInstance> {
        let mut all = Vec::with_capacity(self.registry.len());

        for expert_id in self.catalog.ids() {
            let Some(slot) = self.slots.get(expert_id) else {
                continue;
            };
            let live = slot.live.lock().await;
            let mut instances: Vec<AgentInstance> = live.values().cloned().collect();
            instances.sort_by(|a, b| {
                a.created_at()
                    .cmp(&b.created_at())
                    .then_with(|| a.instance_id().cmp(b.instance_id()))
            });
            all.extend(instances);
        }

        all
    }

    /// Every expert type in the catalog with its capacity and live count.
    pub async fn list_expert_types(&self) -> Vec<ExpertTypeSummary> {
        let mut types = Vec::with_capacity(self.catalog.len());

        for def in self.catalog.iter() {
            let Some(slot) = self.slots.get(&def.expert_id) else {
                continue;
            };
            let live_instances = slot.live.lock().await.len();
            types.push(ExpertTypeSummary {
                expert_id: def.expert_id.clone(),
                name: def.name.clone(),
                description: def.description.clone(),
                category: def.category.clone(),
                tier: def.tier,
                max_instances: slot.max_instances,
                live_instances,
            });
        }

        types
    }

    /// Get pool statistics.
    pub async fn get_stats(&self) -> PoolStats {
        let mut stats = PoolStats {
            expert_types: self.catalog.len(),
            ..Default::default()
        };

        for expert_id in self.catalog.ids() {
            let Some(slot) = self.slots.get(expert_id) else {
                continue;
            };
            let live = slot.live.lock().await;
            if live.is_empty() {
                continue;
            }

            stats.total_instances += live.len();
            stats
                .instances_per_type
                .insert(expert_id.to_string(), live.len());
            for inst in live.values() {
                stats.by_status.record(inst.status());
            }
        }

        stats
    }
}

/// Summary of one expert type for listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpertTypeSummary {
    pub expert_id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub tier: ExpertTier,
    pub max_instances: usize,
    pub live_instances: usize,
}

/// Instance counts per lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub idle: usize,
    pub active: usize,
    pub error: usize,
}

impl StatusCounts {
    fn record(&mut self, status: InstanceStatus) {
        match status {
            InstanceStatus::Idle => self.idle += 1,
            InstanceStatus::Active => self.active += 1,
            InstanceStatus::Error => self.error += 1,
        }
    }
}

/// Pool statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub total_instances: usize,
    /// Number of expert types in the catalog.
    pub expert_types: usize,
    /// Live instances per expert type; types with no live instances are omitted.
    pub instances_per_type: BTreeMap<String, usize>,
    pub by_status: StatusCounts,
}
