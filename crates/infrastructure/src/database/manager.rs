use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use syncer_core::config::models::DatabaseConfig;
use tracing::info;

use super::sqlite::SqliteTaskRepository;

pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let connect_options = SqliteConnectOptions::from_str(&config.url)
            .with_context(|| format!("无效的数据库URL: {}", config.url))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        // 内存数据库每个连接都是独立的库，不能回收连接
        let in_memory = config.url.contains(":memory:");
        let (max_connections, idle_timeout, max_lifetime) = if in_memory {
            (1, None, None)
        } else {
            (
                config.max_connections,
                Some(Duration::from_secs(600)),
                Some(Duration::from_secs(1800)),
            )
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(config.min_connections.min(max_connections))
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .idle_timeout(idle_timeout)
            .max_lifetime(max_lifetime)
            .connect_with(connect_options)
            .await
            .context("连接数据库失败")?;

        info!("数据库连接池已创建: {}", config.url);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        SqliteTaskRepository::run_migrations(&self.pool)
            .await
            .context("数据库迁移失败")
    }

    /// 执行一次最小查询，确认连接池仍可用
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("数据库健康检查失败")?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
