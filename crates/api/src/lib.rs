//! # Syncer API
//!
//! 同步任务的REST接口，基于Axum构建。处理器只做两件事：
//! 通过 `TaskRepository` 读写任务定义，通过 `ControllerHandle`
//! 向控制器提交启动、停止、重启命令并等待处理结果。
//!
//! ## API 端点
//!
//! 所有任务接口挂在 `/resources/tasks` 下：
//!
//! - `GET /datatypes` - 支持的连接器类型 `[name, label]`
//! - `GET /` - 任务列表
//! - `GET /active` - 当前有Worker运行的任务ID
//! - `GET /{id}` - 任务详情
//! - `POST /` - 创建任务，返回 201 和新任务ID
//! - `PUT /{id}` - 更新任务，运行中的任务会被重启
//! - `DELETE /{id}` - 停止并删除任务
//! - `PATCH /{id}/{action}` - `start`、`stop` 或 `restart`
//!
//! 另有 `GET /health` 用于健康检查，数据库不可用时返回 503。
//!
//! ## 响应格式
//!
//! 成功响应统一使用 [`response::ApiResponse`] 包装：
//!
//! ```json
//! {
//!   "success": true,
//!   "data": { "id": 1 },
//!   "message": null,
//!   "timestamp": "2024-01-01T00:00:00Z"
//! }
//! ```
//!
//! 错误响应见 [`error::ApiError`]。

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;

use axum::Router;
use tower::ServiceBuilder;

use middleware::{cors_layer, request_logging, trace_layer};
pub use routes::{create_routes, AppState};

/// 创建带中间件的完整API应用
pub fn create_app(state: AppState, cors_enabled: bool) -> Router {
    let router = create_routes(state).layer(
        ServiceBuilder::new()
            .layer(trace_layer())
            .layer(axum::middleware::from_fn(request_logging)),
    );

    if cors_enabled {
        router.layer(cors_layer())
    } else {
        router
    }
}
