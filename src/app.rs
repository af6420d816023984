use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use syncer_api::{create_app, AppState};
use syncer_core::AppConfig;
use syncer_dispatcher::{Controller, ControllerHandle};
use syncer_domain::{Connector, TaskRepository};
use syncer_infrastructure::{
    connectors::{ConnectorRegistry, NetsuiteConnector, SharepointExcelConnector},
    database::{DatabaseManager, SqliteTaskRepository},
};
use syncer_worker::SyncPipeline;
use tokio::{net::TcpListener, sync::broadcast, task::JoinHandle};
use tracing::{error, info, warn};

/// 主应用程序
pub struct Application {
    config: AppConfig,
    database: Arc<DatabaseManager>,
    task_repo: Arc<dyn TaskRepository>,
    controller: ControllerHandle,
    controller_task: JoinHandle<()>,
}

impl Application {
    /// 创建新的应用实例
    pub async fn new(config: AppConfig) -> Result<Self> {
        Self::with_connectors(config, Vec::new()).await
    }

    /// 额外注册的连接器会覆盖内置的同类型连接器
    pub async fn with_connectors(
        config: AppConfig,
        connectors: Vec<Arc<dyn Connector>>,
    ) -> Result<Self> {
        info!("初始化同步服务");

        let database = DatabaseManager::new(&config.database).await?;
        database.migrate().await?;

        let repository = SqliteTaskRepository::new(database.pool().clone());
        // 上次进程退出时没有机会写回的运行标记
        let reset = repository
            .reset_running()
            .await
            .context("重置任务运行标记失败")?;
        if reset > 0 {
            warn!("已重置 {} 个遗留的运行标记", reset);
        }
        let task_repo: Arc<dyn TaskRepository> = Arc::new(repository);

        let registry = build_registry(&config, connectors)?;
        info!(kinds = ?registry.kinds(), "已注册连接器");
        let pipeline = Arc::new(SyncPipeline::new(Arc::new(registry)));

        let (controller, controller_task) =
            Controller::spawn(task_repo.clone(), pipeline, &config.controller);

        Ok(Self {
            config,
            database: Arc::new(database),
            task_repo,
            controller,
            controller_task,
        })
    }

    pub fn controller(&self) -> ControllerHandle {
        self.controller.clone()
    }

    pub fn task_repository(&self) -> Arc<dyn TaskRepository> {
        self.task_repo.clone()
    }

    pub fn router(&self) -> Router {
        let state = AppState::new(
            self.database.clone(),
            self.task_repo.clone(),
            self.controller.clone(),
        );
        create_app(state, self.config.api.cors_enabled)
    }

    /// 提供HTTP服务直到收到关闭信号，然后停止所有Worker
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let bind_address = self.config.api.bind_address.clone();
        let listener = TcpListener::bind(&bind_address)
            .await
            .with_context(|| format!("绑定地址失败: {}", bind_address))?;

        info!("API服务器启动在 http://{}", bind_address);

        let served = axum::serve(listener, self.router().into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("API服务器收到关闭信号");
            })
            .await;

        if let Err(e) = &served {
            error!("API服务器运行失败: {}", e);
        }

        self.shutdown().await?;
        served.context("API服务器运行失败")
    }

    /// 停止所有Worker并关闭数据库连接
    pub async fn shutdown(self) -> Result<()> {
        info!("正在停止任务控制器");
        if let Err(e) = self.controller.shutdown().await {
            warn!("任务控制器已不可用: {}", e);
        }
        if let Err(e) = self.controller_task.await {
            error!("任务控制器异常退出: {}", e);
        }

        self.database.close().await;
        info!("同步服务已停止");
        Ok(())
    }
}

fn build_registry(
    config: &AppConfig,
    connectors: Vec<Arc<dyn Connector>>,
) -> Result<ConnectorRegistry> {
    let mut registry = ConnectorRegistry::new();

    if config.sharepoint.enabled {
        let sharepoint = SharepointExcelConnector::new(&config.sharepoint)
            .context("创建SharePoint连接器失败")?;
        registry.register(Arc::new(sharepoint));
    }

    if config.netsuite.enabled {
        let netsuite = NetsuiteConnector::new(&config.netsuite).context("创建NetSuite连接器失败")?;
        registry.register(Arc::new(netsuite));
    }

    for connector in connectors {
        registry.register(connector);
    }

    Ok(registry)
}
