use std::sync::Arc;

use axum::{
    routing::{get, patch},
    Router,
};
use syncer_dispatcher::ControllerHandle;
use syncer_domain::TaskRepository;
use syncer_infrastructure::database::DatabaseManager;

use crate::handlers::{
    health::health_check,
    tasks::{
        active_tasks, control_task, create_task, delete_task, get_task, list_datatypes,
        list_tasks, update_task,
    },
};

/// API应用状态
#[derive(Clone)]
pub struct AppState {
    pub database: Arc<DatabaseManager>,
    pub task_repo: Arc<dyn TaskRepository>,
    pub controller: ControllerHandle,
}

impl AppState {
    pub fn new(
        database: Arc<DatabaseManager>,
        task_repo: Arc<dyn TaskRepository>,
        controller: ControllerHandle,
    ) -> Self {
        Self {
            database,
            task_repo,
            controller,
        }
    }
}

/// 创建API路由
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/resources/tasks", task_routes())
        .with_state(state)
}

fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/datatypes", get(list_datatypes))
        .route("/active", get(active_tasks))
        .route(
            "/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/{id}/{action}", patch(control_task))
}
