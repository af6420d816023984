use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use syncer_errors::{ConnectorError, SyncerError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("同步服务错误: {0}")]
    Syncer(#[from] SyncerError),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("请求参数错误: {0}")]
    BadRequest(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, String, &'static str, Vec<String>) {
        match self {
            ApiError::Syncer(SyncerError::TaskNotFound { id }) => (
                StatusCode::NOT_FOUND,
                format!("任务 ID {} 不存在", id),
                "TASK_NOT_FOUND",
                vec![
                    "请检查任务ID是否正确".to_string(),
                    "使用 GET /resources/tasks 查看所有任务".to_string(),
                ],
            ),
            ApiError::Syncer(SyncerError::TaskNameConflict { name }) => (
                StatusCode::CONFLICT,
                format!("任务名称 '{}' 已存在", name),
                "TASK_NAME_CONFLICT",
                vec!["请使用其他任务名称".to_string()],
            ),
            ApiError::Syncer(SyncerError::Validation(msg)) => (
                StatusCode::BAD_REQUEST,
                msg.clone(),
                "VALIDATION_ERROR",
                vec!["请检查请求参数".to_string()],
            ),
            ApiError::Syncer(SyncerError::ControllerUnavailable) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "任务控制器不可用".to_string(),
                "CONTROLLER_UNAVAILABLE",
                vec!["服务可能正在关闭，请稍后重试".to_string()],
            ),
            ApiError::Syncer(SyncerError::Database(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "数据库操作失败".to_string(),
                "DATABASE_ERROR",
                vec!["请稍后重试".to_string()],
            ),
            ApiError::Syncer(SyncerError::Connector(ConnectorError::Authentication(_))) => (
                StatusCode::BAD_GATEWAY,
                self.to_string(),
                "CONNECTOR_AUTH_ERROR",
                vec!["请检查连接器凭据配置".to_string()],
            ),
            ApiError::Syncer(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                e.to_string(),
                "SYNCER_ERROR",
                vec![],
            ),
            ApiError::Serialization(e) => (
                StatusCode::BAD_REQUEST,
                format!("请求体格式错误: {}", e),
                "SERIALIZATION_ERROR",
                vec!["请检查JSON字段与数据类型".to_string()],
            ),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                msg.clone(),
                "BAD_REQUEST",
                vec![],
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, error_type, suggestions) = self.parts();

        if status.is_server_error() {
            tracing::error!(error_type, "请求处理失败: {}", self);
        } else {
            tracing::debug!(error_type, "请求被拒绝: {}", self);
        }

        let body = Json(json!({
            "error": {
                "message": message,
                "type": error_type,
                "code": status.as_u16(),
                "suggestions": suggestions,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
