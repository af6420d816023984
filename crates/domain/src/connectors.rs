use async_trait::async_trait;
use syncer_errors::ConnectorResult;

use crate::dataset::Dataset;
use crate::value_objects::{DataType, DestinationDescriptor, SourceDescriptor};

/// 某一数据类型的读写实现
#[async_trait]
pub trait Connector: Send + Sync {
    fn kind(&self) -> DataType;

    async fn read(&self, source: &SourceDescriptor) -> ConnectorResult<Dataset>;

    async fn write(
        &self,
        destination: &DestinationDescriptor,
        dataset: &Dataset,
    ) -> ConnectorResult<()>;
}
