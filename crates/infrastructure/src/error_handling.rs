//! Error handling for repository operations with operation context
//!
//! Database errors are logged with the operation and task they belong to
//! before being converted into `SyncerError`.

use chrono::{DateTime, Utc};
use sqlx::Error as SqlxError;
use std::fmt;
use syncer_errors::SyncerError;
use tracing::{error, info, instrument};

/// Operation context for repository operations
#[derive(Debug, Clone)]
pub enum RepositoryOperation {
    Create,
    Read,
    Update,
    Delete,
    Query,
    BatchUpdate,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryOperation::Create => write!(f, "创建"),
            RepositoryOperation::Read => write!(f, "查询"),
            RepositoryOperation::Update => write!(f, "更新"),
            RepositoryOperation::Delete => write!(f, "删除"),
            RepositoryOperation::Query => write!(f, "查询"),
            RepositoryOperation::BatchUpdate => write!(f, "批量更新"),
        }
    }
}

/// Context information for task repository operations
#[derive(Debug, Clone)]
pub struct TaskOperationContext {
    pub operation: RepositoryOperation,
    pub task_id: Option<i64>,
    pub task_name: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl TaskOperationContext {
    pub fn new(operation: RepositoryOperation) -> Self {
        Self {
            operation,
            task_id: None,
            task_name: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_task_id(mut self, task_id: i64) -> Self {
        self.task_id = Some(task_id);
        self
    }

    pub fn with_task_name(mut self, task_name: String) -> Self {
        self.task_name = Some(task_name);
        self
    }

    pub fn entity_description(&self) -> String {
        match (&self.task_name, self.task_id) {
            (Some(name), Some(id)) => format!("任务 '{name}' (ID: {id})"),
            (Some(name), None) => format!("任务 '{name}'"),
            (None, Some(id)) => format!("任务 (ID: {id})"),
            (None, None) => "任务".to_string(),
        }
    }
}

pub struct RepositoryErrorHelpers;

impl RepositoryErrorHelpers {
    /// Convert a database error with task context, mapping the name constraint
    /// to `TaskNameConflict`
    #[instrument(skip_all, fields(
        operation = %context.operation,
        task_id = ?context.task_id,
        task_name = ?context.task_name,
        timestamp = %context.timestamp,
    ))]
    pub fn task_database_error(context: TaskOperationContext, error: SqlxError) -> SyncerError {
        let entity_desc = context.entity_description();
        let operation_desc = context.operation.to_string();

        if let SqlxError::Database(db_error) = &error {
            if db_error.is_unique_violation() {
                let name = context.task_name.unwrap_or_default();
                error!(
                    error = %error,
                    "{}{}时发生唯一约束冲突: 任务名称 '{}' 已存在",
                    operation_desc, entity_desc, name
                );
                return SyncerError::TaskNameConflict { name };
            }
        }

        match &error {
            SqlxError::PoolClosed => {
                error!("{}{}时数据库连接池已关闭", operation_desc, entity_desc)
            }
            SqlxError::PoolTimedOut => {
                error!("{}{}时数据库连接池超时", operation_desc, entity_desc)
            }
            _ => error!(
                error = %error,
                "{}{}时发生数据库错误", operation_desc, entity_desc
            ),
        }
        SyncerError::Database(error)
    }

    pub fn task_serialization_error(
        context: TaskOperationContext,
        error: impl fmt::Display,
    ) -> SyncerError {
        let msg = format!(
            "{}{}时序列化失败: {}",
            context.operation,
            context.entity_description(),
            error
        );
        error!("{}", msg);
        SyncerError::Serialization(msg)
    }

    pub fn log_operation_success(context: TaskOperationContext, additional_info: Option<&str>) {
        let base_msg = format!("{}{}成功", context.operation, context.entity_description());
        match additional_info {
            Some(info) => info!("{}: {}", base_msg, info),
            None => info!("{}", base_msg),
        }
    }
}

/// Macro for creating task operation context easily
#[macro_export]
macro_rules! task_context {
    ($operation:expr) => {
        $crate::error_handling::TaskOperationContext::new($operation)
    };
    ($operation:expr, task_id = $task_id:expr) => {
        $crate::error_handling::TaskOperationContext::new($operation).with_task_id($task_id)
    };
    ($operation:expr, task_name = $task_name:expr) => {
        $crate::error_handling::TaskOperationContext::new($operation)
            .with_task_name($task_name.to_string())
    };
    ($operation:expr, task_id = $task_id:expr, task_name = $task_name:expr) => {
        $crate::error_handling::TaskOperationContext::new($operation)
            .with_task_id($task_id)
            .with_task_name($task_name.to_string())
    };
}
