use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use syncer_domain::{DataType, Dataset, TaskStatusUpdate};
use syncer_infrastructure::connectors::ConnectorRegistry;
use syncer_testing_utils::{MockConnector, MockTaskRepository, ReadOutcome, TaskBuilder};
use syncer_worker::{SyncPipeline, SyncWorker, WorkerExitReason};
use tokio::sync::oneshot;

struct Fixture {
    repo: MockTaskRepository,
    source: MockConnector,
    destination: MockConnector,
    pipeline: Arc<SyncPipeline>,
}

impl Fixture {
    fn new(task: TaskBuilder) -> Self {
        let repo = MockTaskRepository::with_tasks(vec![task.build()]);
        let source = MockConnector::new(DataType::Netsuite);
        let destination = MockConnector::new(DataType::SharepointExcel);
        let registry = ConnectorRegistry::new()
            .with(Arc::new(source.clone()))
            .with(Arc::new(destination.clone()));

        Self {
            repo,
            source,
            destination,
            pipeline: Arc::new(SyncPipeline::new(Arc::new(registry))),
        }
    }

    fn worker(&self, task_id: i64) -> SyncWorker {
        SyncWorker::new(task_id, Arc::new(self.repo.clone()), self.pipeline.clone())
    }
}

fn rows() -> ReadOutcome {
    let mut dataset = Dataset::new(vec!["id".to_string()]);
    dataset.push_row(vec![json!(7)]).unwrap();
    ReadOutcome::Rows(dataset)
}

#[tokio::test(start_paused = true)]
async fn test_bounded_task_counts_only_successes() {
    let fixture = Fixture::new(TaskBuilder::new().with_id(1).with_sync_times(3));
    fixture
        .source
        .script([ReadOutcome::Fail, rows(), ReadOutcome::Fail]);

    let (_cancel_tx, cancel_rx) = oneshot::channel();
    let reason = fixture.worker(1).run(cancel_rx).await;

    assert_eq!(reason, WorkerExitReason::Completed { iterations: 3 });
    assert_eq!(fixture.source.reads(), 5);
    assert_eq!(fixture.destination.writes(), 3);
    assert_eq!(
        fixture.repo.iteration_results(1),
        vec![false, true, false, true, true]
    );
    assert!(!fixture.repo.get(1).unwrap().running);
}

#[tokio::test(start_paused = true)]
async fn test_three_successful_iterations_record_three_updates() {
    let fixture = Fixture::new(TaskBuilder::new().with_id(1).with_sync_times(3));

    let started = tokio::time::Instant::now();
    let (_cancel_tx, cancel_rx) = oneshot::channel();
    let reason = fixture.worker(1).run(cancel_rx).await;

    assert_eq!(reason, WorkerExitReason::Completed { iterations: 3 });
    assert_eq!(fixture.repo.iteration_results(1), vec![true, true, true]);
    // 最后一次成功后不再等待
    assert_eq!(started.elapsed(), Duration::from_secs(120));

    let updates = fixture.repo.status_updates();
    assert_eq!(updates.first().unwrap().1, TaskStatusUpdate::running(true));
    assert_eq!(updates.last().unwrap().1, TaskStatusUpdate::running(false));
    let task = fixture.repo.get(1).unwrap();
    assert!(!task.running);
    assert_eq!(task.last_result, Some(true));
    assert!(task.last_run.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_unbounded_task_keeps_running_until_cancelled() {
    let fixture = Fixture::new(TaskBuilder::new().with_id(1).with_sync_times(0));

    let (cancel_tx, cancel_rx) = oneshot::channel();
    let handle = tokio::spawn(fixture.worker(1).run(cancel_rx));

    tokio::time::sleep(Duration::from_secs(601)).await;
    assert!(!handle.is_finished());
    assert_eq!(fixture.source.reads(), 11);
    assert!(fixture.repo.get(1).unwrap().running);

    cancel_tx.send(()).unwrap();
    assert_eq!(handle.await.unwrap(), WorkerExitReason::Cancelled);
    assert_eq!(fixture.source.reads(), 11);
    assert!(!fixture.repo.get(1).unwrap().running);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_wait_exits_without_another_iteration() {
    let fixture = Fixture::new(TaskBuilder::new().with_id(1).with_sync_rate(300));

    let (cancel_tx, cancel_rx) = oneshot::channel();
    let handle = tokio::spawn(fixture.worker(1).run(cancel_rx));

    tokio::time::sleep(Duration::from_secs(30)).await;
    let cancelled_at = tokio::time::Instant::now();
    cancel_tx.send(()).unwrap();

    assert_eq!(handle.await.unwrap(), WorkerExitReason::Cancelled);
    assert!(cancelled_at.elapsed() < Duration::from_secs(1));
    assert_eq!(fixture.source.reads(), 1);
    assert_eq!(fixture.repo.iteration_results(1), vec![true]);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_first_iteration_records_no_result() {
    let fixture = Fixture::new(TaskBuilder::new().with_id(1));

    let (cancel_tx, cancel_rx) = oneshot::channel();
    cancel_tx.send(()).unwrap();
    let reason = fixture.worker(1).run(cancel_rx).await;

    assert_eq!(reason, WorkerExitReason::Cancelled);
    assert_eq!(fixture.source.reads(), 0);
    let updates: Vec<TaskStatusUpdate> = fixture
        .repo
        .status_updates()
        .into_iter()
        .map(|(_, update)| update)
        .collect();
    assert_eq!(
        updates,
        vec![
            TaskStatusUpdate::running(true),
            TaskStatusUpdate::running(false)
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_dropped_cancel_sender_stops_worker() {
    let fixture = Fixture::new(TaskBuilder::new().with_id(1));

    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(fixture.worker(1).run(cancel_rx));
    tokio::time::sleep(Duration::from_secs(10)).await;
    drop(cancel_tx);

    assert_eq!(handle.await.unwrap(), WorkerExitReason::Cancelled);
    assert_eq!(fixture.source.reads(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_status_persistence_failures_are_not_fatal() {
    let fixture = Fixture::new(TaskBuilder::new().with_id(1).with_sync_times(2));
    fixture.repo.fail_status_updates(true);

    let (_cancel_tx, cancel_rx) = oneshot::channel();
    let reason = fixture.worker(1).run(cancel_rx).await;

    assert_eq!(reason, WorkerExitReason::Completed { iterations: 2 });
    assert_eq!(fixture.source.reads(), 2);
    assert!(fixture.repo.status_updates().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_missing_task_fails_to_load() {
    let fixture = Fixture::new(TaskBuilder::new().with_id(1));

    let (_cancel_tx, cancel_rx) = oneshot::channel();
    let reason = fixture.worker(99).run(cancel_rx).await;

    assert_eq!(reason, WorkerExitReason::LoadFailed);
    assert_eq!(fixture.source.reads(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_panicking_connector_still_clears_running_flag() {
    let fixture = Fixture::new(TaskBuilder::new().with_id(1));
    fixture.source.script([ReadOutcome::Panic]);

    let (_cancel_tx, cancel_rx) = oneshot::channel();
    let reason = fixture.worker(1).run(cancel_rx).await;

    assert_eq!(reason, WorkerExitReason::Panicked);
    let task = fixture.repo.get(1).unwrap();
    assert!(!task.running);
    assert!(task.last_run.is_none());
}
