//! 同步管道：从源读取数据集，转换后写入目标

use std::sync::Arc;
use std::time::{Duration, Instant};

use syncer_domain::{Dataset, TaskSnapshot};
use syncer_errors::SyncerResult;
use syncer_infrastructure::connectors::ConnectorRegistry;
use tracing::debug;

/// 读取与写入之间对数据集的转换
pub trait Transform: Send + Sync {
    fn apply(&self, dataset: Dataset) -> SyncerResult<Dataset>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl Transform for IdentityTransform {
    fn apply(&self, dataset: Dataset) -> SyncerResult<Dataset> {
        Ok(dataset)
    }
}

/// 一次成功同步的摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub rows: usize,
    pub columns: usize,
    pub elapsed: Duration,
}

#[derive(Clone)]
pub struct SyncPipeline {
    connectors: Arc<ConnectorRegistry>,
    transform: Arc<dyn Transform>,
}

impl SyncPipeline {
    pub fn new(connectors: Arc<ConnectorRegistry>) -> Self {
        Self {
            connectors,
            transform: Arc::new(IdentityTransform),
        }
    }

    pub fn with_transform(mut self, transform: Arc<dyn Transform>) -> Self {
        self.transform = transform;
        self
    }

    /// 执行一次同步。两端的连接器在读取前解析，未注册的类型不会触发读取
    pub async fn synchronize(&self, snapshot: &TaskSnapshot) -> SyncerResult<SyncReport> {
        let started = Instant::now();
        let reader = self.connectors.get(snapshot.source.kind())?;
        let writer = self.connectors.get(snapshot.destination.kind())?;

        let dataset = reader.read(&snapshot.source).await?;
        debug!(
            task_id = snapshot.id,
            rows = dataset.len(),
            "已从 {} 读取数据",
            snapshot.source.kind().label()
        );

        let dataset = self.transform.apply(dataset)?;
        writer.write(&snapshot.destination, &dataset).await?;

        Ok(SyncReport {
            rows: dataset.len(),
            columns: dataset.columns.len(),
            elapsed: started.elapsed(),
        })
    }
}
