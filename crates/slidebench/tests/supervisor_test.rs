//! Tests for background run tasks.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{RecordingSink, Script, ScriptedGateway};
use slidebench::{MemoryStore, Orchestrator, RunConfig, RunId, RunStatus, RunSupervisor};
use uuid::Uuid;

fn supervisor(gateway: Arc<ScriptedGateway>) -> RunSupervisor {
    let orchestrator = Orchestrator::with_seed(
        Arc::new(MemoryStore::new()),
        gateway,
        Arc::new(RecordingSink::default()),
        9,
    );
    RunSupervisor::new(Arc::new(orchestrator), Duration::ZERO)
}

async fn wait_until_idle(supervisor: &RunSupervisor, run_id: RunId) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while supervisor.is_active(run_id) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("Run task did not finish in time");
}

#[tokio::test]
async fn test_launch_runs_to_completion() {
    let gateway = Arc::new(ScriptedGateway::new(Script::Avoid));
    let supervisor = supervisor(gateway.clone());
    let view = supervisor
        .orchestrator()
        .initialize_run(&RunConfig::new("m".to_string(), 3, 10, 15))
        .expect("Initialize failed");
    let run_id = *view.run.id();

    assert!(supervisor.launch(run_id));
    wait_until_idle(&supervisor, run_id).await;

    let finished = supervisor
        .orchestrator()
        .get_run(run_id)
        .expect("Load failed")
        .expect("Run exists");
    assert_eq!(finished.status(), RunStatus::Failed);
    assert_eq!(*finished.game.move_count(), 10);
    assert_eq!(gateway.calls(), 10);
    assert!(supervisor.active_runs().is_empty());
}

#[tokio::test]
async fn test_second_launch_is_refused_while_active() {
    let gateway = Arc::new(ScriptedGateway::new(Script::Avoid).with_pause(Duration::from_millis(20)));
    let supervisor = supervisor(gateway);
    let view = supervisor
        .orchestrator()
        .initialize_run(&RunConfig::new("m".to_string(), 3, 500, 15))
        .expect("Initialize failed");
    let run_id = *view.run.id();

    assert!(supervisor.launch(run_id));
    assert!(!supervisor.launch(run_id));
    assert_eq!(supervisor.active_runs(), vec![run_id]);

    supervisor.cancel(run_id).await.expect("Cancel failed");
}

#[tokio::test]
async fn test_cancel_stops_task_and_aborts_run() {
    let gateway = Arc::new(ScriptedGateway::new(Script::Avoid).with_pause(Duration::from_millis(10)));
    let supervisor = supervisor(gateway.clone());
    let view = supervisor
        .orchestrator()
        .initialize_run(&RunConfig::new("m".to_string(), 4, 500, 30))
        .expect("Initialize failed");
    let run_id = *view.run.id();

    supervisor.launch(run_id);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let aborted = supervisor
        .cancel(run_id)
        .await
        .expect("Cancel failed")
        .expect("Run exists");
    assert_eq!(aborted.status(), RunStatus::Aborted);
    assert!(!supervisor.is_active(run_id));

    let calls_at_cancel = gateway.calls();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(gateway.calls(), calls_at_cancel);

    let reloaded = supervisor
        .orchestrator()
        .get_run(run_id)
        .expect("Load failed")
        .expect("Run exists");
    assert_eq!(reloaded.status(), RunStatus::Aborted);
    assert_eq!(reloaded.moves.len(), *reloaded.game.move_count() as usize);
}

#[tokio::test]
async fn test_cancel_unknown_run() {
    let supervisor = supervisor(Arc::new(ScriptedGateway::new(Script::Solve)));
    let result = supervisor.cancel(Uuid::new_v4()).await.expect("Cancel failed");
    assert!(result.is_none());
}
