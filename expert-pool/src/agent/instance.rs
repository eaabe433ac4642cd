//! Pooled expert instance and its lifecycle state machine.

use crate::error::{PoolError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// Unique id of a live instance, `<expert_id>_<uuid>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    pub(crate) fn generate(expert_id: &str) -> Self {
        Self(format!("{}_{}", expert_id, Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for InstanceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for InstanceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque handle passed to the execution backend, `session_<uuid>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub(crate) fn generate() -> Self {
        Self(format!("session_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of an instance. Terminated instances are removed, not marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Idle,
    Active,
    Error,
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceStatus::Idle => write!(f, "idle"),
            InstanceStatus::Active => write!(f, "active"),
            InstanceStatus::Error => write!(f, "error"),
        }
    }
}

/// A live expert instance.
///
/// The pool owns the authoritative copy; callers receive clones, so mutating
/// a returned value never affects pool state. `expert_id` refers back into the
/// catalog by id and never changes.
#[derive(Debug, Clone, Serialize)]
pub struct AgentInstance {
    instance_id: InstanceId,
    expert_id: String,
    session_id: SessionId,
    status: InstanceStatus,
    created_at: DateTime<Utc>,
    last_used_at: DateTime<Utc>,
    task_count: u64,
    current_task: Option<String>,
    last_result: Option<String>,
    #[serde(skip)]
    last_used: Instant,
}

impl AgentInstance {
    /// New instance already working on `task`, which the pool has checked is not blank.
    pub(crate) fn new_active(expert_id: &str, task: &str) -> Self {
        let now = Utc::now();
        Self {
            instance_id: InstanceId::generate(expert_id),
            expert_id: expert_id.to_string(),
            session_id: SessionId::generate(),
            status: InstanceStatus::Active,
            created_at: now,
            last_used_at: now,
            task_count: 0,
            current_task: Some(task.to_string()),
            last_result: None,
            last_used: Instant::now(),
        }
    }

    pub fn instance_id(&self) -> &InstanceId {
        &self.instance_id
    }

    pub fn expert_id(&self) -> &str {
        &self.expert_id
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn status(&self) -> InstanceStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_used_at(&self) -> DateTime<Utc> {
        self.last_used_at
    }

    /// Number of completed tasks, counted on each return to idle.
    pub fn task_count(&self) -> u64 {
        self.task_count
    }

    /// Task being worked on. Present only while active.
    pub fn current_task(&self) -> Option<&str> {
        self.current_task.as_deref()
    }

    /// Summary passed to the most recent release, if any was non-empty.
    pub fn last_result(&self) -> Option<&str> {
        self.last_result.as_deref()
    }

    /// Whether this instance has completed at least one task before.
    pub fn is_reused(&self) -> bool {
        self.task_count > 0
    }

    /// Time since the last transition.
    pub fn idle_duration(&self) -> Duration {
        self.last_used.elapsed()
    }

    pub(crate) fn last_used_instant(&self) -> Instant {
        self.last_used
    }

    fn touch(&mut self) {
        self.last_used = Instant::now();
        self.last_used_at = Utc::now();
    }

    fn invalid(&self, to: InstanceStatus) -> PoolError {
        PoolError::InvalidTransition {
            instance_id: self.instance_id.clone(),
            from: self.status,
            to,
        }
    }

    /// IDLE -> ACTIVE.
    pub(crate) fn activate(&mut self, task: &str) -> Result<()> {
        if self.status != InstanceStatus::Idle {
            return Err(self.invalid(InstanceStatus::Active));
        }
        self.status = InstanceStatus::Active;
        self.current_task = Some(task.to_string());
        self.touch();
        Ok(())
    }

    /// ACTIVE | ERROR -> IDLE. Returns `false` when already idle, in which
    /// case nothing changes.
    pub(crate) fn release(&mut self, result_summary: &str) -> bool {
        if self.status == InstanceStatus::Idle {
            return false;
        }
        self.status = InstanceStatus::Idle;
        self.current_task = None;
        self.task_count += 1;
        if !result_summary.is_empty() {
            self.last_result = Some(result_summary.to_string());
        }
        self.touch();
        true
    }

    /// ACTIVE -> ERROR. Returns `false` when already in error.
    pub(crate) fn fail(&mut self) -> Result<bool> {
        match self.status {
            InstanceStatus::Error => Ok(false),
            InstanceStatus::Idle => Err(self.invalid(InstanceStatus::Error)),
            InstanceStatus::Active => {
                self.status = InstanceStatus::Error;
                self.current_task = None;
                self.touch();
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_instance_is_active() {
        let inst = AgentInstance::new_active("python-expert", "write a script");
        assert_eq!(inst.status(), InstanceStatus::Active);
        assert_eq!(inst.current_task(), Some("write a script"));
        assert_eq!(inst.task_count(), 0);
        assert!(!inst.is_reused());
        assert!(inst.instance_id().as_str().starts_with("python-expert_"));
        assert!(inst.session_id().as_str().starts_with("session_"));
    }

    #[test]
    fn test_ids_are_unique() {
        let a = AgentInstance::new_active("x", "t");
        let b = AgentInstance::new_active("x", "t");
        assert_ne!(a.instance_id(), b.instance_id());
        assert_ne!(a.session_id(), b.session_id());
    }

    #[test]
    fn test_release_and_reactivate() {
        let mut inst = AgentInstance::new_active("x", "first");

        assert!(inst.release("done"));
        assert_eq!(inst.status(), InstanceStatus::Idle);
        assert_eq!(inst.current_task(), None);
        assert_eq!(inst.task_count(), 1);
        assert_eq!(inst.last_result(), Some("done"));

        inst.activate("second").unwrap();
        assert_eq!(inst.status(), InstanceStatus::Active);
        assert_eq!(inst.current_task(), Some("second"));
        assert!(inst.is_reused());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_duration_tracks_last_transition() {
        let mut inst = AgentInstance::new_active("x", "task");
        let activated_at = inst.last_used_at();
        assert_eq!(inst.created_at(), activated_at);

        tokio::time::advance(Duration::from_secs(90)).await;
        assert_eq!(inst.idle_duration(), Duration::from_secs(90));

        assert!(inst.release("done"));
        assert_eq!(inst.idle_duration(), Duration::ZERO);
        assert!(inst.last_used_at() >= activated_at);
        assert_eq!(inst.created_at(), activated_at);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(inst.idle_duration(), Duration::from_secs(5));
    }

    #[test]
    fn test_double_release_is_noop() {
        let mut inst = AgentInstance::new_active("x", "task");
        assert!(inst.release(""));
        assert!(!inst.release("again"));
        assert_eq!(inst.task_count(), 1);
        assert_eq!(inst.last_result(), None);
    }

    #[test]
    fn test_activate_requires_idle() {
        let mut inst = AgentInstance::new_active("x", "task");
        let err = inst.activate("other").unwrap_err();
        assert!(matches!(
            err,
            PoolError::InvalidTransition {
                from: InstanceStatus::Active,
                to: InstanceStatus::Active,
                ..
            }
        ));
        assert_eq!(inst.current_task(), Some("task"));
    }

    #[test]
    fn test_error_transitions() {
        let mut inst = AgentInstance::new_active("x", "task");
        assert!(inst.fail().unwrap());
        assert_eq!(inst.status(), InstanceStatus::Error);
        assert_eq!(inst.current_task(), None);
        assert!(!inst.fail().unwrap());

        // An errored instance cannot be handed out again until released.
        assert!(inst.activate("retry").is_err());

        assert!(inst.release(""));
        assert_eq!(inst.status(), InstanceStatus::Idle);
        assert_eq!(inst.task_count(), 1);

        assert!(inst.fail().is_err());
    }

    #[test]
    fn test_serializes_without_monotonic_clock() {
        let inst = AgentInstance::new_active("x", "task");
        let json = serde_json::to_value(&inst).unwrap();
        assert_eq!(json["status"], "active");
        assert_eq!(json["expert_id"], "x");
        assert_eq!(json["task_count"], 0);
        assert!(json.get("last_used").is_none());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(InstanceStatus::Idle.to_string(), "idle");
        assert_eq!(InstanceStatus::Error.to_string(), "error");
    }
}
