//! Integration facade tests against a scripted backend.

use async_trait::async_trait;
use expert_pool::{
    ExpertCatalog, ExpertDefinition, ExpertPool, InstanceId, InstanceStatus, PoolConfig,
    PoolError,
};
use pool_integration::{
    BackendError, ExecutionBackend, ExecutionOutput, ExecutionRequest, IntegrationError,
    PoolIntegration,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// Echoes the task back, or fails when the task mentions "explode".
#[derive(Default)]
struct ScriptedBackend {
    calls: AtomicUsize,
    requests: Mutex<Vec<ExecutionRequest>>,
}

#[async_trait]
impl ExecutionBackend for ScriptedBackend {
    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionOutput, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let task = request.task.clone();
        self.requests.lock().await.push(request);

        if task.contains("explode") {
            return Err(BackendError::new("session crashed"));
        }
        Ok(ExecutionOutput::success(format!("done: {task}")))
    }
}

fn setup(max: usize) -> (PoolIntegration, Arc<ScriptedBackend>) {
    let catalog = ExpertCatalog::new([
        ExpertDefinition::new("backend-architect", "Backend Architect")
            .with_description("Designs reliable server systems")
            .with_category("engineering")
            .with_triggers(["REST API", "database schema"]),
        ExpertDefinition::new("frontend-developer", "Frontend Developer")
            .with_description("Builds accessible interfaces")
            .with_category("engineering")
            .with_triggers(["React component", "CSS"]),
    ])
    .unwrap();
    let pool = Arc::new(ExpertPool::new(
        Arc::new(catalog),
        PoolConfig::default().with_max_instances_per_type(max),
    ));
    let backend = Arc::new(ScriptedBackend::default());
    (PoolIntegration::new(pool, backend.clone()), backend)
}

#[tokio::test]
async fn test_create_agent_selects_expert() {
    let (integration, _) = setup(2);

    let handle = integration
        .create_agent("Design a REST API with a database schema for users.", None, true)
        .await
        .unwrap();

    assert_eq!(handle.expert_id, "backend-architect");
    assert!(!handle.is_reused);
    assert!(handle.session_id.as_str().starts_with("session_"));
}

#[tokio::test]
async fn test_create_agent_reports_reuse() {
    let (integration, _) = setup(2);

    let first = integration
        .create_agent("style it", Some("frontend-developer"), true)
        .await
        .unwrap();
    integration
        .release_agent(&first.instance_id, "styled")
        .await
        .unwrap();

    let second = integration
        .create_agent("style it again", Some("frontend-developer"), true)
        .await
        .unwrap();
    assert_eq!(second.instance_id, first.instance_id);
    assert!(second.is_reused);
}

#[tokio::test]
async fn test_create_agent_errors_are_values() {
    let (integration, _) = setup(1);

    let err = integration
        .create_agent("water the plants", None, true)
        .await
        .unwrap_err();
    assert_eq!(err, IntegrationError::Pool(PoolError::NoSuitableExpert));

    let err = integration
        .create_agent("  ", Some("backend-architect"), true)
        .await
        .unwrap_err();
    assert_eq!(err, IntegrationError::Pool(PoolError::EmptyTask));

    let err = integration
        .create_agent("task", Some("ghost"), true)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        IntegrationError::Pool(PoolError::UnknownExpert("ghost".to_string()))
    );

    integration
        .create_agent("task", Some("backend-architect"), true)
        .await
        .unwrap();
    let err = integration
        .create_agent("task", Some("backend-architect"), true)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        IntegrationError::Pool(PoolError::PoolExhausted { max_instances: 1, .. })
    ));
}

#[tokio::test]
async fn test_execute_task_passes_session_and_expert() {
    let (integration, backend) = setup(2);
    let handle = integration
        .create_agent("build a REST API", None, true)
        .await
        .unwrap();

    let output = integration
        .execute_task(&handle.instance_id, "build a REST API", Some("use postgres"))
        .await
        .unwrap();
    assert!(output.success);
    assert_eq!(output.output, "done: build a REST API");

    let requests = backend.requests.lock().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].session_id, handle.session_id);
    assert_eq!(requests[0].context.as_deref(), Some("use postgres"));
    assert_eq!(requests[0].expert.expert_id, "backend-architect");
}

#[tokio::test]
async fn test_execute_task_requires_active_instance() {
    let (integration, backend) = setup(2);
    let handle = integration
        .create_agent("task", Some("backend-architect"), true)
        .await
        .unwrap();
    integration.release_agent(&handle.instance_id, "").await.unwrap();

    let err = integration
        .execute_task(&handle.instance_id, "task", None)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        IntegrationError::InstanceNotActive {
            instance_id: handle.instance_id.clone(),
            status: InstanceStatus::Idle,
        }
    );

    let missing = InstanceId::from("backend-architect_gone");
    let err = integration
        .execute_task(&missing, "task", None)
        .await
        .unwrap_err();
    assert_eq!(err, IntegrationError::Pool(PoolError::NotFound(missing)));
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_backend_failure_marks_error() {
    let (integration, _) = setup(1);
    let handle = integration
        .create_agent("task", Some("backend-architect"), true)
        .await
        .unwrap();

    let err = integration
        .execute_task(&handle.instance_id, "explode now", None)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        IntegrationError::Backend(BackendError::new("session crashed"))
    );

    let instance = integration
        .pool()
        .get_instance(&handle.instance_id)
        .await
        .unwrap();
    assert_eq!(instance.status(), InstanceStatus::Error);

    // The errored instance still holds the only slot.
    assert!(integration
        .create_agent("task", Some("backend-architect"), true)
        .await
        .is_err());

    integration.terminate_agent(&handle.instance_id).await.unwrap();
    assert!(integration
        .create_agent("task", Some("backend-architect"), true)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_run_task_end_to_end() {
    let (integration, backend) = setup(2);

    let first = integration
        .run_task("Design a REST API", Some("existing database schema"))
        .await
        .unwrap();
    assert_eq!(first.handle.expert_id, "backend-architect");
    assert_eq!(first.output.output, "done: Design a REST API");

    let instance = integration
        .pool()
        .get_instance(&first.handle.instance_id)
        .await
        .unwrap();
    assert_eq!(instance.status(), InstanceStatus::Idle);
    assert_eq!(instance.task_count(), 1);
    assert_eq!(instance.last_result(), Some("done: Design a REST API"));

    let second = integration.run_task("Another REST API", None).await.unwrap();
    assert_eq!(second.handle.instance_id, first.handle.instance_id);
    assert!(second.handle.is_reused);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_run_task_backend_failure_leaves_error() {
    let (integration, _) = setup(2);

    let err = integration
        .run_task("explode the REST API", None)
        .await
        .unwrap_err();
    assert!(matches!(err, IntegrationError::Backend(_)));

    let stats = integration.pool().get_stats().await;
    assert_eq!(stats.by_status.error, 1);
    assert_eq!(stats.by_status.idle, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_run_tasks_concurrently() {
    let (integration, backend) = setup(2);

    let tasks = [
        "REST API one",
        "CSS tweak",
        "REST API two",
        "React component",
        "database schema",
    ];
    let results = integration.run_tasks(&tasks).await;

    assert_eq!(results.len(), 5);
    for (task, result) in tasks.iter().zip(&results) {
        match result {
            Ok(run) => assert_eq!(run.output.output, format!("done: {task}")),
            Err(IntegrationError::Pool(PoolError::PoolExhausted { .. })) => {}
            Err(other) => panic!("unexpected error for {task}: {other}"),
        }
    }

    let stats = integration.pool().get_stats().await;
    assert!(stats.instances_per_type.values().all(|&n| n <= 2));
    assert_eq!(stats.by_status.active, 0);
    assert!(backend.calls.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn test_pool_status() {
    let (integration, _) = setup(2);
    integration
        .create_agent("task", Some("frontend-developer"), true)
        .await
        .unwrap();

    let status = integration.pool_status().await;
    assert_eq!(status.expert_types_count, 2);
    assert_eq!(status.active_instances_count, 1);
    assert_eq!(status.stats.total_instances, 1);
    assert_eq!(status.expert_types[1].live_instances, 1);

    let json = serde_json::to_value(&status).unwrap();
    assert_eq!(json["active_instances"][0]["status"], "active");
    assert_eq!(json["stats"]["by_status"]["active"], 1);
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_idle_instances() {
    let (integration, _) = setup(2);
    let handle = integration
        .create_agent("task", Some("backend-architect"), true)
        .await
        .unwrap();
    integration.release_agent(&handle.instance_id, "").await.unwrap();

    tokio::time::advance(Duration::from_secs(30 * 60)).await;
    assert_eq!(
        integration
            .cleanup_idle_instances(Duration::from_secs(30 * 60))
            .await,
        1
    );
    assert_eq!(integration.pool_status().await.active_instances_count, 0);
}

#[test]
fn test_suggest_experts_for_workflow() {
    let (integration, _) = setup(2);

    let suggestions = integration.suggest_experts_for_workflow(&[
        "Define the database schema",
        "Build the React component",
        "Celebrate",
    ]);

    assert_eq!(suggestions.len(), 3);
    assert_eq!(suggestions[0].expert_id.as_deref(), Some("backend-architect"));
    assert_eq!(suggestions[1].expert_id.as_deref(), Some("frontend-developer"));
    assert_eq!(suggestions[2].expert_id, None);
    assert_eq!(suggestions[2].score, 0.0);
}
