use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use syncer_errors::{SyncerError, SyncerResult};

use crate::value_objects::{DestinationDescriptor, SourceDescriptor};

/// 两次同步之间的最小间隔（秒）
pub const MIN_SYNC_RATE_SECONDS: u64 = 60;

/// 两次同步之间的最大间隔（秒），30天
pub const MAX_SYNC_RATE_SECONDS: u64 = 30 * 24 * 60 * 60;

/// 持久化的同步任务
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub running: bool,
    /// 0 表示无限次同步
    pub sync_times: u32,
    pub sync_rate: u64,
    pub source: SourceDescriptor,
    pub destination: DestinationDescriptor,
    pub last_run: Option<DateTime<Utc>>,
    pub last_result: Option<bool>,
}

impl Task {
    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            id: self.id,
            name: self.name.clone(),
            source: self.source.clone(),
            destination: self.destination.clone(),
            sync_times: self.sync_times,
            sync_rate: self.sync_rate,
        }
    }
}

/// 创建或更新任务时由API层提交的定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub name: String,
    pub sync_times: u32,
    pub sync_rate: u64,
    pub source: SourceDescriptor,
    pub destination: DestinationDescriptor,
}

impl TaskDefinition {
    /// 校验并规范化定义，返回可以直接写入存储的值
    pub fn validated(self) -> SyncerResult<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(SyncerError::validation_error("任务名称不能为空"));
        }
        if self.sync_rate < MIN_SYNC_RATE_SECONDS {
            return Err(SyncerError::validation_error(format!(
                "同步间隔不能小于{MIN_SYNC_RATE_SECONDS}秒"
            )));
        }
        if self.sync_rate > MAX_SYNC_RATE_SECONDS {
            return Err(SyncerError::validation_error(format!(
                "同步间隔不能大于{MAX_SYNC_RATE_SECONDS}秒"
            )));
        }

        Ok(Self {
            name,
            sync_times: self.sync_times,
            sync_rate: self.sync_rate,
            source: self.source.normalized()?,
            destination: self.destination.normalized()?,
        })
    }
}

/// Worker启动时读取的不可变任务快照
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSnapshot {
    pub id: i64,
    pub name: String,
    pub source: SourceDescriptor,
    pub destination: DestinationDescriptor,
    pub sync_times: u32,
    pub sync_rate: u64,
}

impl TaskSnapshot {
    pub fn is_unbounded(&self) -> bool {
        self.sync_times == 0
    }

    pub fn has_remaining(&self, completed: u32) -> bool {
        self.is_unbounded() || completed < self.sync_times
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.sync_rate)
    }
}

/// 运行状态更新，`None` 字段保持不变
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatusUpdate {
    pub running: Option<bool>,
    pub last_run: Option<DateTime<Utc>>,
    pub last_result: Option<bool>,
}

impl TaskStatusUpdate {
    pub fn running(running: bool) -> Self {
        Self {
            running: Some(running),
            ..Self::default()
        }
    }

    pub fn iteration(at: DateTime<Utc>, success: bool) -> Self {
        Self {
            running: None,
            last_run: Some(at),
            last_result: Some(success),
        }
    }

    pub fn is_iteration(&self) -> bool {
        self.last_run.is_some()
    }
}
