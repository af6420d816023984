use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use syncer_domain::{
    entities::{Task, TaskDefinition, TaskStatusUpdate},
    repositories::TaskRepository,
    value_objects::{DestinationDescriptor, SourceDescriptor},
};
use syncer_errors::{SyncerError, SyncerResult};
use tracing::{debug, instrument};

use crate::{
    error_handling::{RepositoryErrorHelpers, RepositoryOperation, TaskOperationContext},
    task_context,
};

const TASK_COLUMNS: &str =
    "id, name, running, sync_times, sync_rate, source, destination, last_run, last_result";

pub struct SqliteTaskRepository {
    pool: SqlitePool,
}

impl SqliteTaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 运行数据库迁移
    pub async fn run_migrations(pool: &SqlitePool) -> SyncerResult<()> {
        debug!("Running SQLite database migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                running BOOLEAN NOT NULL DEFAULT 0,
                sync_times INTEGER NOT NULL DEFAULT 0,
                sync_rate INTEGER NOT NULL,
                source TEXT NOT NULL,
                destination TEXT NOT NULL,
                last_run DATETIME,
                last_result BOOLEAN,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_running ON tasks(running)")
            .execute(pool)
            .await?;

        debug!("Successfully completed SQLite database migrations");
        Ok(())
    }

    fn row_to_task(row: &SqliteRow) -> SyncerResult<Task> {
        let source: String = row.try_get("source")?;
        let destination: String = row.try_get("destination")?;
        let sync_times: i64 = row.try_get("sync_times")?;
        let sync_rate: i64 = row.try_get("sync_rate")?;

        Ok(Task {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            running: row.try_get("running")?,
            sync_times: u32::try_from(sync_times)
                .map_err(|_| SyncerError::Internal(format!("无效的同步次数: {sync_times}")))?,
            sync_rate: u64::try_from(sync_rate)
                .map_err(|_| SyncerError::Internal(format!("无效的同步间隔: {sync_rate}")))?,
            source: serde_json::from_str::<SourceDescriptor>(&source)?,
            destination: serde_json::from_str::<DestinationDescriptor>(&destination)?,
            last_run: row.try_get::<Option<DateTime<Utc>>, _>("last_run")?,
            last_result: row.try_get::<Option<bool>, _>("last_result")?,
        })
    }

    fn sync_rate_column(definition: &TaskDefinition) -> SyncerResult<i64> {
        i64::try_from(definition.sync_rate).map_err(|_| {
            SyncerError::validation_error(format!("同步间隔超出范围: {}", definition.sync_rate))
        })
    }

    fn encode_descriptors(
        definition: &TaskDefinition,
        context: &TaskOperationContext,
    ) -> SyncerResult<(String, String)> {
        let source = serde_json::to_string(&definition.source)
            .map_err(|e| RepositoryErrorHelpers::task_serialization_error(context.clone(), e))?;
        let destination = serde_json::to_string(&definition.destination)
            .map_err(|e| RepositoryErrorHelpers::task_serialization_error(context.clone(), e))?;
        Ok((source, destination))
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    #[instrument(skip(self, definition), fields(task_name = %definition.name))]
    async fn create(&self, definition: &TaskDefinition) -> SyncerResult<Task> {
        let context = task_context!(RepositoryOperation::Create, task_name = &definition.name);
        let sync_rate = Self::sync_rate_column(definition)?;
        let (source, destination) = Self::encode_descriptors(definition, &context)?;

        let row = sqlx::query(&format!(
            "INSERT INTO tasks (name, sync_times, sync_rate, source, destination)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(&definition.name)
        .bind(i64::from(definition.sync_times))
        .bind(sync_rate)
        .bind(source)
        .bind(destination)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::task_database_error(context.clone(), e))?;

        let task = Self::row_to_task(&row)?;
        RepositoryErrorHelpers::log_operation_success(
            context.with_task_id(task.id),
            Some(&format!("{} -> {}", task.source.kind(), task.destination.kind())),
        );
        Ok(task)
    }

    #[instrument(skip(self), fields(task_id = %id))]
    async fn find_by_id(&self, id: i64) -> SyncerResult<Option<Task>> {
        let context = task_context!(RepositoryOperation::Read, task_id = id);

        let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::task_database_error(context, e))?;

        match row {
            Some(row) => {
                let task = Self::row_to_task(&row)?;
                debug!("查询任务成功: ID {}, 名称: {}", task.id, task.name);
                Ok(Some(task))
            }
            None => {
                debug!("查询任务不存在: ID {}", id);
                Ok(None)
            }
        }
    }

    #[instrument(skip(self))]
    async fn find_all(&self) -> SyncerResult<Vec<Task>> {
        let context = task_context!(RepositoryOperation::Query);

        let rows = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::task_database_error(context, e))?;

        let tasks = rows
            .iter()
            .map(Self::row_to_task)
            .collect::<SyncerResult<Vec<_>>>()?;
        debug!("查询到 {} 个任务", tasks.len());
        Ok(tasks)
    }

    #[instrument(skip(self, definition), fields(task_id = %id, task_name = %definition.name))]
    async fn update(&self, id: i64, definition: &TaskDefinition) -> SyncerResult<Task> {
        let context = task_context!(
            RepositoryOperation::Update,
            task_id = id,
            task_name = &definition.name
        );
        let sync_rate = Self::sync_rate_column(definition)?;
        let (source, destination) = Self::encode_descriptors(definition, &context)?;

        let row = sqlx::query(&format!(
            "UPDATE tasks
             SET name = ?1, sync_times = ?2, sync_rate = ?3, source = ?4, destination = ?5,
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = ?6
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(&definition.name)
        .bind(i64::from(definition.sync_times))
        .bind(sync_rate)
        .bind(source)
        .bind(destination)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::task_database_error(context.clone(), e))?;

        let task = match row {
            Some(row) => Self::row_to_task(&row)?,
            None => return Err(SyncerError::task_not_found(id)),
        };
        RepositoryErrorHelpers::log_operation_success(context, None);
        Ok(task)
    }

    #[instrument(skip(self), fields(task_id = %id))]
    async fn delete(&self, id: i64) -> SyncerResult<bool> {
        let context = task_context!(RepositoryOperation::Delete, task_id = id);

        let result = sqlx::query("DELETE FROM tasks WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::task_database_error(context.clone(), e))?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            RepositoryErrorHelpers::log_operation_success(context, None);
        } else {
            debug!("删除的任务不存在: ID {}", id);
        }
        Ok(deleted)
    }

    #[instrument(skip(self, update), fields(task_id = %id))]
    async fn update_status(&self, id: i64, update: &TaskStatusUpdate) -> SyncerResult<()> {
        let context = task_context!(RepositoryOperation::Update, task_id = id);

        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET running = COALESCE(?1, running),
                last_run = COALESCE(?2, last_run),
                last_result = COALESCE(?3, last_result),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?4
            "#,
        )
        .bind(update.running)
        .bind(update.last_run)
        .bind(update.last_result)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::task_database_error(context, e))?;

        if result.rows_affected() == 0 {
            return Err(SyncerError::task_not_found(id));
        }

        debug!(
            "任务状态已更新: ID {}, running={:?}, last_result={:?}",
            id, update.running, update.last_result
        );
        Ok(())
    }

    #[instrument(skip(self))]
    async fn reset_running(&self) -> SyncerResult<u64> {
        let context = task_context!(RepositoryOperation::BatchUpdate);

        let result = sqlx::query(
            "UPDATE tasks SET running = 0, updated_at = CURRENT_TIMESTAMP WHERE running = 1",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::task_database_error(context.clone(), e))?;

        let affected = result.rows_affected();
        RepositoryErrorHelpers::log_operation_success(
            context,
            Some(&format!("{affected} 个任务的运行标记已清除")),
        );
        Ok(affected)
    }
}
