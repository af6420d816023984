//! 单个任务的周期同步循环
//!
//! Worker启动时读取一次任务快照并标记运行，然后反复执行同步管道，
//! 每次迭代后记录结果，在两次迭代之间等待 `sync_rate` 或取消信号。
//! 无论以何种方式退出，都会把 `running` 写回 false。

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use syncer_domain::{TaskRepository, TaskSnapshot, TaskStatusUpdate};
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, error, info, warn};

use crate::pipeline::SyncPipeline;

/// Worker退出的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExitReason {
    /// 达到 `sync_times` 次成功同步
    Completed { iterations: u32 },
    Cancelled,
    LoadFailed,
    Panicked,
}

pub struct SyncWorker {
    task_id: i64,
    repository: Arc<dyn TaskRepository>,
    pipeline: Arc<SyncPipeline>,
}

impl SyncWorker {
    pub fn new(
        task_id: i64,
        repository: Arc<dyn TaskRepository>,
        pipeline: Arc<SyncPipeline>,
    ) -> Self {
        Self {
            task_id,
            repository,
            pipeline,
        }
    }

    /// 运行直到完成、取消或出错。取消通道收到值或发送端被丢弃都视为取消
    pub async fn run(self, mut cancel: oneshot::Receiver<()>) -> WorkerExitReason {
        let reason = match self.repository.load(self.task_id).await {
            Ok(snapshot) => {
                info!(
                    task_id = self.task_id,
                    task_name = %snapshot.name,
                    sync_times = snapshot.sync_times,
                    sync_rate = snapshot.sync_rate,
                    "同步任务启动"
                );
                self.record(TaskStatusUpdate::running(true)).await;

                match AssertUnwindSafe(self.iterate(&snapshot, &mut cancel))
                    .catch_unwind()
                    .await
                {
                    Ok(reason) => reason,
                    Err(panic) => {
                        error!(
                            task_id = self.task_id,
                            "同步任务异常退出: {}",
                            panic_message(panic.as_ref())
                        );
                        WorkerExitReason::Panicked
                    }
                }
            }
            Err(e) => {
                error!(task_id = self.task_id, "加载任务快照失败: {}", e);
                WorkerExitReason::LoadFailed
            }
        };

        self.record(TaskStatusUpdate::running(false)).await;
        info!(task_id = self.task_id, reason = ?reason, "同步任务已停止");
        reason
    }

    async fn iterate(
        &self,
        snapshot: &TaskSnapshot,
        cancel: &mut oneshot::Receiver<()>,
    ) -> WorkerExitReason {
        let mut completed = 0u32;
        let mut iteration = 0u64;

        while snapshot.has_remaining(completed) {
            if !matches!(cancel.try_recv(), Err(TryRecvError::Empty)) {
                return WorkerExitReason::Cancelled;
            }

            iteration += 1;
            let success = match self.pipeline.synchronize(snapshot).await {
                Ok(report) => {
                    info!(
                        task_id = snapshot.id,
                        task_name = %snapshot.name,
                        iteration,
                        rows = report.rows,
                        elapsed_ms = elapsed_millis(report.elapsed),
                        "同步成功"
                    );
                    true
                }
                Err(e) => {
                    warn!(
                        task_id = snapshot.id,
                        task_name = %snapshot.name,
                        iteration,
                        retryable = e.is_retryable(),
                        "同步失败: {}",
                        e
                    );
                    false
                }
            };

            self.record(TaskStatusUpdate::iteration(Utc::now(), success))
                .await;

            if success {
                completed += 1;
                if !snapshot.has_remaining(completed) {
                    break;
                }
            }

            debug!(task_id = snapshot.id, "等待 {} 秒后进行下一次同步", snapshot.sync_rate);
            tokio::select! {
                _ = &mut *cancel => return WorkerExitReason::Cancelled,
                _ = tokio::time::sleep(snapshot.interval()) => {}
            }
        }

        WorkerExitReason::Completed {
            iterations: completed,
        }
    }

    /// 状态写入失败只记录日志
    async fn record(&self, update: TaskStatusUpdate) {
        if let Err(e) = self.repository.update_status(self.task_id, &update).await {
            warn!(task_id = self.task_id, "记录任务状态失败: {}", e);
        }
    }
}

/// 毫秒数超出u64时取上限
fn elapsed_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
