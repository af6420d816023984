use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use syncer_domain::{Command, CommandAction, DataType, TaskDefinition};
use syncer_errors::SyncerError;
use tracing::{info, warn};

use crate::{
    error::{ApiError, ApiResult},
    response::{created, done, success},
    routes::AppState,
};

#[derive(Debug, Serialize)]
pub struct CreatedTask {
    pub id: i64,
}

/// 连接器类型及显示名称
pub async fn list_datatypes() -> impl IntoResponse {
    let datatypes: Vec<[&'static str; 2]> = DataType::ALL
        .iter()
        .map(|kind| [kind.as_str(), kind.label()])
        .collect();
    success(datatypes)
}

pub async fn list_tasks(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let tasks = state.task_repo.find_all().await?;
    Ok(success(tasks))
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let task = state
        .task_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| SyncerError::task_not_found(id))?;
    Ok(success(task))
}

/// 当前有Worker运行的任务ID
pub async fn active_tasks(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let ids = state.controller.active_tasks().await?;
    Ok(success(ids))
}

pub async fn create_task(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<impl IntoResponse> {
    let definition = parse_definition(body)?;
    let task = state.task_repo.create(&definition).await?;

    info!(task_id = task.id, task_name = %task.name, "创建同步任务");
    Ok(created(CreatedTask { id: task.id }))
}

/// 更新定义。Worker只在启动时读取快照，运行中的任务需要重启才能生效
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> ApiResult<impl IntoResponse> {
    let definition = parse_definition(body)?;
    let task = state.task_repo.update(id, &definition).await?;
    info!(task_id = id, task_name = %task.name, "更新同步任务");

    match state.controller.restart_if_active(id).await {
        Ok(true) => info!(task_id = id, "运行中的任务已按新定义重启"),
        Ok(false) => {}
        Err(SyncerError::ControllerUnavailable) => {
            return Err(SyncerError::ControllerUnavailable.into())
        }
        Err(e) => {
            warn!("重启任务 {} 失败: {}", id, e);
            return Err(ApiError::BadRequest(e.to_string()));
        }
    }

    Ok(done("任务已更新"))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    ensure_exists(&state, id).await?;

    submit(&state, Command::stop(id)).await?;
    if !state.task_repo.delete(id).await? {
        return Err(SyncerError::task_not_found(id).into());
    }

    info!(task_id = id, "删除同步任务");
    Ok(done("任务已删除"))
}

/// `start`、`stop`、`restart`，等待控制器处理完成后返回
pub async fn control_task(
    State(state): State<AppState>,
    Path((id, action)): Path<(i64, String)>,
) -> ApiResult<impl IntoResponse> {
    ensure_exists(&state, id).await?;

    let action: CommandAction = action
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid action".to_string()))?;
    submit(&state, Command::new(id, action)).await?;

    Ok(done(format!("命令 {} 已执行", action)))
}

fn parse_definition(body: Value) -> ApiResult<TaskDefinition> {
    let definition: TaskDefinition = serde_json::from_value(body)?;
    Ok(definition.validated()?)
}

async fn ensure_exists(state: &AppState, id: i64) -> ApiResult<()> {
    match state.task_repo.find_by_id(id).await? {
        Some(_) => Ok(()),
        None => Err(SyncerError::task_not_found(id).into()),
    }
}

/// 命令执行失败返回 400，控制器不可用保持 503
async fn submit(state: &AppState, command: Command) -> ApiResult<()> {
    match state.controller.submit(command).await {
        Ok(()) => Ok(()),
        Err(SyncerError::ControllerUnavailable) => Err(SyncerError::ControllerUnavailable.into()),
        Err(e) => {
            warn!("命令 {} 执行失败: {}", command, e);
            Err(ApiError::BadRequest(e.to_string()))
        }
    }
}
