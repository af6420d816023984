//! 领域仓储抽象
//!
//! 定义任务存储的抽象接口，核心只通过这些方法读取快照和写入运行状态

use async_trait::async_trait;
use syncer_errors::{SyncerError, SyncerResult};

use crate::entities::{Task, TaskDefinition, TaskSnapshot, TaskStatusUpdate};

/// 任务仓储抽象
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create(&self, definition: &TaskDefinition) -> SyncerResult<Task>;
    async fn find_by_id(&self, id: i64) -> SyncerResult<Option<Task>>;
    async fn find_all(&self) -> SyncerResult<Vec<Task>>;
    /// 替换任务定义，不改变运行状态字段
    async fn update(&self, id: i64, definition: &TaskDefinition) -> SyncerResult<Task>;
    async fn delete(&self, id: i64) -> SyncerResult<bool>;
    async fn update_status(&self, id: i64, update: &TaskStatusUpdate) -> SyncerResult<()>;
    /// 将所有任务标记为未运行，返回受影响的行数
    async fn reset_running(&self) -> SyncerResult<u64>;

    async fn load(&self, id: i64) -> SyncerResult<TaskSnapshot> {
        self.find_by_id(id)
            .await?
            .map(|task| task.snapshot())
            .ok_or_else(|| SyncerError::task_not_found(id))
    }
}
