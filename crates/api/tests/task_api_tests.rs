use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use syncer_api::{create_app, AppState};
use syncer_core::{ControllerConfig, DatabaseConfig};
use syncer_dispatcher::{Controller, ControllerHandle};
use syncer_domain::DataType;
use syncer_infrastructure::{connectors::ConnectorRegistry, database::DatabaseManager};
use syncer_testing_utils::{MockConnector, MockTaskRepository, TaskBuilder, TEST_FILE_URL};
use syncer_worker::SyncPipeline;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    database: Arc<DatabaseManager>,
    repo: MockTaskRepository,
    controller: ControllerHandle,
}

impl TestApp {
    async fn new(tasks: Vec<TaskBuilder>) -> Self {
        let repo = MockTaskRepository::with_tasks(tasks.into_iter().map(|t| t.build()).collect());
        let registry = ConnectorRegistry::new()
            .with(Arc::new(MockConnector::new(DataType::Netsuite)))
            .with(Arc::new(MockConnector::new(DataType::SharepointExcel)));
        let pipeline = Arc::new(SyncPipeline::new(Arc::new(registry)));
        let (controller, _join) =
            Controller::spawn(Arc::new(repo.clone()), pipeline, &ControllerConfig::default());

        let database = DatabaseManager::new(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            ..DatabaseConfig::default()
        })
        .await
        .unwrap();
        let database = Arc::new(database);

        let state = AppState::new(database.clone(), Arc::new(repo.clone()), controller.clone());
        Self {
            router: create_app(state, true),
            database,
            repo,
            controller,
        }
    }

    async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

fn task_body(name: &str) -> Value {
    serde_json::to_value(TaskBuilder::new().with_name(name).definition()).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new(vec![]).await;
    let (status, body) = app.request(Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
    assert_eq!(body["service"], "syncer");
}

#[tokio::test]
async fn test_health_check_reports_unavailable_database() {
    let app = TestApp::new(vec![]).await;
    app.database.close().await;

    let (status, body) = app.request(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"], "unavailable");
}

#[tokio::test]
async fn test_list_datatypes() {
    let app = TestApp::new(vec![]).await;
    let (status, body) = app
        .request(Method::GET, "/resources/tasks/datatypes", None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!([
            ["SHAREPOINTEXCEL", "SharePoint Excel"],
            ["NETSUITE", "NetSuite"]
        ])
    );
}

#[tokio::test]
async fn test_create_and_fetch_task() {
    let app = TestApp::new(vec![]).await;

    let mut body = task_body("  customers  ");
    body["source"]["query"] = json!("  SELECT id FROM customer ");
    let (status, created) = app.request(Method::POST, "/resources/tasks", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["data"]["id"].as_i64().unwrap();

    let (status, fetched) = app
        .request(Method::GET, &format!("/resources/tasks/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["data"]["name"], "customers");
    assert_eq!(fetched["data"]["running"], false);
    assert_eq!(fetched["data"]["source"]["datatype"], "NETSUITE");
    assert_eq!(fetched["data"]["source"]["query"], "SELECT id FROM customer");

    let (status, listed) = app.request(Method::GET, "/resources/tasks", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_rejects_invalid_definitions() {
    let app = TestApp::new(vec![]).await;

    let mut fast = task_body("fast");
    fast["sync_rate"] = json!(30);
    let (status, body) = app.request(Method::POST, "/resources/tasks", Some(fast)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "VALIDATION_ERROR");

    let mut slow = task_body("slow");
    slow["sync_rate"] = json!(u64::MAX);
    let (status, body) = app.request(Method::POST, "/resources/tasks", Some(slow)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "VALIDATION_ERROR");

    let mut bad_url = task_body("bad_url");
    bad_url["destination"]["file_url"] = json!("https://example.com/customers.xlsx");
    let (status, body) = app
        .request(Method::POST, "/resources/tasks", Some(bad_url))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Invalid destination file URL");

    let mut unknown_kind = task_body("unknown");
    unknown_kind["source"] = json!({ "datatype": "FTP", "path": "/tmp" });
    let (status, body) = app
        .request(Method::POST, "/resources/tasks", Some(unknown_kind))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "SERIALIZATION_ERROR");

    assert_eq!(app.repo.count(), 0);
}

#[tokio::test]
async fn test_create_duplicate_name_conflicts() {
    let app = TestApp::new(vec![TaskBuilder::new().with_id(1).with_name("customers")]).await;

    let (status, body) = app
        .request(Method::POST, "/resources/tasks", Some(task_body("customers")))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["type"], "TASK_NAME_CONFLICT");
    assert_eq!(app.repo.count(), 1);
}

#[tokio::test]
async fn test_get_missing_task_is_not_found() {
    let app = TestApp::new(vec![]).await;
    let (status, body) = app.request(Method::GET, "/resources/tasks/42", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], 404);
}

#[tokio::test]
async fn test_start_and_stop_through_patch() {
    let app = TestApp::new(vec![TaskBuilder::new().with_id(1)]).await;

    let (status, _) = app
        .request(Method::PATCH, "/resources/tasks/1/start", None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, active) = app.request(Method::GET, "/resources/tasks/active", None).await;
    assert_eq!(active["data"], json!([1]));

    let (status, _) = app
        .request(Method::PATCH, "/resources/tasks/1/stop", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!app.repo.get(1).unwrap().running);

    let (_, active) = app.request(Method::GET, "/resources/tasks/active", None).await;
    assert_eq!(active["data"], json!([]));
}

#[tokio::test]
async fn test_patch_rejects_unknown_action_and_missing_task() {
    let app = TestApp::new(vec![TaskBuilder::new().with_id(1)]).await;

    let (status, body) = app
        .request(Method::PATCH, "/resources/tasks/1/pause", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Invalid action");

    let (status, _) = app
        .request(Method::PATCH, "/resources/tasks/9/start", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert!(app.controller.active_tasks().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_restarts_running_task() {
    let app = TestApp::new(vec![TaskBuilder::new().with_id(1).with_name("before")]).await;
    app.controller.start(1).await.unwrap();

    let (status, _) = app
        .request(Method::PUT, "/resources/tasks/1", Some(task_body("after")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.repo.get(1).unwrap().name, "after");
    assert_eq!(app.controller.active_tasks().await.unwrap(), vec![1]);

    // 旧Worker退出时写回的停止标记
    assert!(app
        .repo
        .status_updates()
        .iter()
        .any(|(id, update)| *id == 1 && update.running == Some(false)));
}

#[tokio::test]
async fn test_update_leaves_idle_task_stopped() {
    let app = TestApp::new(vec![TaskBuilder::new().with_id(1).with_name("before")]).await;

    let mut body = task_body("after");
    body["destination"]["file_url"] = json!(TEST_FILE_URL);
    let (status, _) = app
        .request(Method::PUT, "/resources/tasks/1", Some(body))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.controller.active_tasks().await.unwrap().is_empty());
    assert!(app.repo.status_updates().is_empty());
}

#[tokio::test]
async fn test_update_does_not_revive_finished_task() {
    let app = TestApp::new(vec![TaskBuilder::new().with_id(1).with_sync_times(1)]).await;
    app.controller.start(1).await.unwrap();

    // 等待单次任务完成并写回停止标记
    for _ in 0..100 {
        if !app.controller.active_tasks().await.unwrap().contains(&1) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(app.controller.active_tasks().await.unwrap().is_empty());

    let (status, _) = app
        .request(Method::PUT, "/resources/tasks/1", Some(task_body("after")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.controller.active_tasks().await.unwrap().is_empty());

    let running: Vec<bool> = app
        .repo
        .status_updates()
        .into_iter()
        .filter_map(|(_, update)| update.running)
        .collect();
    assert_eq!(running, vec![true, false]);
}

#[tokio::test]
async fn test_update_missing_task_is_not_found() {
    let app = TestApp::new(vec![]).await;
    let (status, _) = app
        .request(Method::PUT, "/resources/tasks/5", Some(task_body("x")))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_stops_worker_then_removes_task() {
    let app = TestApp::new(vec![TaskBuilder::new().with_id(1)]).await;
    app.controller.start(1).await.unwrap();

    let (status, _) = app
        .request(Method::DELETE, "/resources/tasks/1", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.controller.active_tasks().await.unwrap().is_empty());
    assert!(app.repo.get(1).is_none());

    let (status, _) = app
        .request(Method::DELETE, "/resources/tasks/1", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_commands_after_shutdown_are_unavailable() {
    let app = TestApp::new(vec![TaskBuilder::new().with_id(1)]).await;
    app.controller.shutdown().await.unwrap();

    let (status, body) = app
        .request(Method::PATCH, "/resources/tasks/1/start", None)
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["type"], "CONTROLLER_UNAVAILABLE");
}
