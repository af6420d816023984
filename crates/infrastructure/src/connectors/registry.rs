use std::collections::HashMap;
use std::sync::Arc;

use syncer_domain::{Connector, DataType};
use syncer_errors::{SyncerError, SyncerResult};
use tracing::info;

/// 按数据类型索引的连接器表，启动时构建，之后只读
#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    connectors: HashMap<DataType, Arc<dyn Connector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册连接器，同类型的旧连接器被替换
    pub fn register(&mut self, connector: Arc<dyn Connector>) {
        let kind = connector.kind();
        info!("注册连接器: {}", kind.label());
        self.connectors.insert(kind, connector);
    }

    pub fn with(mut self, connector: Arc<dyn Connector>) -> Self {
        self.register(connector);
        self
    }

    pub fn get(&self, kind: DataType) -> SyncerResult<Arc<dyn Connector>> {
        self.connectors
            .get(&kind)
            .cloned()
            .ok_or_else(|| SyncerError::unknown_connector(kind.as_str()))
    }

    pub fn kinds(&self) -> Vec<DataType> {
        DataType::ALL
            .into_iter()
            .filter(|kind| self.connectors.contains_key(kind))
            .collect()
    }
}

impl std::fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
