use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::routes::AppState;

/// 服务存活且数据库可用时返回200，数据库不可用时返回503
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let (status, database) = match state.database.health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            warn!("数据库健康检查失败: {e:#}");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    };

    let body = json!({
        "status": if status.is_success() { "ok" } else { "degraded" },
        "database": database,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": "syncer",
        "version": env!("CARGO_PKG_VERSION")
    });
    (status, Json(body))
}
