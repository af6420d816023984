use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncerError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("任务未找到: {id}")]
    TaskNotFound { id: i64 },
    #[error("任务名称已存在: {name}")]
    TaskNameConflict { name: String },
    #[error("数据验证失败: {0}")]
    Validation(String),
    #[error("连接器错误: {0}")]
    Connector(#[from] ConnectorError),
    #[error("未注册的连接器类型: {kind}")]
    UnknownConnector { kind: String },
    #[error("序列化错误: {0}")]
    Serialization(String),
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("控制器不可用")]
    ControllerUnavailable,
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 连接器读写失败的分类
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("认证失败: {0}")]
    Authentication(String),
    #[error("资源不存在: {0}")]
    NotFound(String),
    #[error("传输失败: {0}")]
    Transport(String),
    #[error("不支持的操作: {0}")]
    Unsupported(String),
    #[error("无效的连接器配置: {0}")]
    InvalidDescriptor(String),
    #[error("响应解析失败: {0}")]
    Decode(String),
}

pub type SyncerResult<T> = Result<T, SyncerError>;

pub type ConnectorResult<T> = Result<T, ConnectorError>;

impl SyncerError {
    pub fn task_not_found(id: i64) -> Self {
        Self::TaskNotFound { id }
    }
    pub fn validation_error<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    pub fn unknown_connector<S: Into<String>>(kind: S) -> Self {
        Self::UnknownConnector { kind: kind.into() }
    }
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncerError::TaskNotFound { .. })
    }
    /// 同一迭代下次重试可能成功的错误
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncerError::Database(_)
                | SyncerError::Connector(ConnectorError::Transport(_))
                | SyncerError::Connector(ConnectorError::NotFound(_))
        )
    }
    /// 配置类错误，重试不会改变结果
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SyncerError::UnknownConnector { .. }
                | SyncerError::Validation(_)
                | SyncerError::Configuration(_)
                | SyncerError::Connector(ConnectorError::InvalidDescriptor(_))
                | SyncerError::Connector(ConnectorError::Unsupported(_))
        )
    }
}

impl From<serde_json::Error> for SyncerError {
    fn from(err: serde_json::Error) -> Self {
        SyncerError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for SyncerError {
    fn from(err: anyhow::Error) -> Self {
        SyncerError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests;
