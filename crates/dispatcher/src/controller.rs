use std::sync::Arc;
use std::time::Duration;

use syncer_core::config::models::ControllerConfig;
use syncer_domain::{Command, CommandAction, TaskRepository, TaskStatusUpdate};
use syncer_errors::{SyncerError, SyncerResult};
use syncer_worker::{SyncPipeline, SyncWorker, WorkerExitReason};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::registry::{JobRegistry, WorkerHandle};

enum ControlMessage {
    Command {
        command: Command,
        reply: oneshot::Sender<SyncerResult<()>>,
    },
    RestartIfActive {
        task_id: i64,
        reply: oneshot::Sender<SyncerResult<bool>>,
    },
    ActiveTasks {
        reply: oneshot::Sender<Vec<i64>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Worker自行结束时发给控制器的通知
#[derive(Debug)]
struct WorkerExit {
    task_id: i64,
    generation: u64,
    reason: WorkerExitReason,
}

/// 向控制器提交命令的句柄，可以任意克隆
#[derive(Clone)]
pub struct ControllerHandle {
    sender: mpsc::Sender<ControlMessage>,
}

impl ControllerHandle {
    /// 提交命令并等待控制器处理完成
    pub async fn submit(&self, command: Command) -> SyncerResult<()> {
        let (reply, reply_rx) = oneshot::channel();
        self.send(ControlMessage::Command { command, reply }).await?;
        reply_rx
            .await
            .map_err(|_| SyncerError::ControllerUnavailable)?
    }

    pub async fn start(&self, task_id: i64) -> SyncerResult<()> {
        self.submit(Command::start(task_id)).await
    }

    pub async fn stop(&self, task_id: i64) -> SyncerResult<()> {
        self.submit(Command::stop(task_id)).await
    }

    pub async fn restart(&self, task_id: i64) -> SyncerResult<()> {
        self.submit(Command::restart(task_id)).await
    }

    /// 仅当任务有存活的Worker时重启，返回是否发生了重启
    ///
    /// 判断和重启在控制器循环的同一步内完成，不会与Worker自行结束交错。
    pub async fn restart_if_active(&self, task_id: i64) -> SyncerResult<bool> {
        let (reply, reply_rx) = oneshot::channel();
        self.send(ControlMessage::RestartIfActive { task_id, reply })
            .await?;
        reply_rx
            .await
            .map_err(|_| SyncerError::ControllerUnavailable)?
    }

    /// 当前注册了Worker的任务ID，升序
    pub async fn active_tasks(&self) -> SyncerResult<Vec<i64>> {
        let (reply, reply_rx) = oneshot::channel();
        self.send(ControlMessage::ActiveTasks { reply }).await?;
        reply_rx.await.map_err(|_| SyncerError::ControllerUnavailable)
    }

    /// 停止所有Worker并结束控制器循环
    pub async fn shutdown(&self) -> SyncerResult<()> {
        let (reply, reply_rx) = oneshot::channel();
        self.send(ControlMessage::Shutdown { reply }).await?;
        reply_rx.await.map_err(|_| SyncerError::ControllerUnavailable)
    }

    async fn send(&self, message: ControlMessage) -> SyncerResult<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| SyncerError::ControllerUnavailable)
    }
}

pub struct Controller {
    repository: Arc<dyn TaskRepository>,
    pipeline: Arc<SyncPipeline>,
    registry: JobRegistry,
    commands: mpsc::Receiver<ControlMessage>,
    exits_tx: mpsc::UnboundedSender<WorkerExit>,
    exits_rx: mpsc::UnboundedReceiver<WorkerExit>,
    shutdown_timeout: Duration,
}

impl Controller {
    /// 启动控制器循环，返回命令句柄和循环任务的句柄
    pub fn spawn(
        repository: Arc<dyn TaskRepository>,
        pipeline: Arc<SyncPipeline>,
        config: &ControllerConfig,
    ) -> (ControllerHandle, JoinHandle<()>) {
        let (sender, commands) = mpsc::channel(config.command_buffer.max(1));
        let (exits_tx, exits_rx) = mpsc::unbounded_channel();

        let controller = Self {
            repository,
            pipeline,
            registry: JobRegistry::new(),
            commands,
            exits_tx,
            exits_rx,
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_seconds),
        };

        let join = tokio::spawn(controller.run());
        (ControllerHandle { sender }, join)
    }

    async fn run(mut self) {
        info!("任务控制器已启动");

        loop {
            tokio::select! {
                message = self.commands.recv() => match message {
                    Some(ControlMessage::Command { command, reply }) => {
                        let result = self.handle_command(command).await;
                        if let Err(e) = &result {
                            warn!("命令 {} 执行失败: {}", command, e);
                        }
                        let _ = reply.send(result);
                    }
                    Some(ControlMessage::RestartIfActive { task_id, reply }) => {
                        let result = self.restart_if_active(task_id).await;
                        if let Err(e) = &result {
                            warn!("重启任务 {} 失败: {}", task_id, e);
                        }
                        let _ = reply.send(result);
                    }
                    Some(ControlMessage::ActiveTasks { reply }) => {
                        let _ = reply.send(self.registry.active_task_ids());
                    }
                    Some(ControlMessage::Shutdown { reply }) => {
                        self.stop_all().await;
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        self.stop_all().await;
                        break;
                    }
                },
                Some(exit) = self.exits_rx.recv() => self.handle_exit(exit),
            }
        }

        info!("任务控制器已停止");
    }

    #[instrument(skip(self), fields(task_id = command.task_id, action = %command.action))]
    async fn handle_command(&mut self, command: Command) -> SyncerResult<()> {
        match command.action {
            CommandAction::Start => self.start_worker(command.task_id).await,
            CommandAction::Stop => {
                self.stop_worker(command.task_id).await;
                Ok(())
            }
            CommandAction::Restart => {
                self.stop_worker(command.task_id).await;
                self.start_worker(command.task_id).await
            }
        }
    }

    #[instrument(skip(self))]
    async fn restart_if_active(&mut self, task_id: i64) -> SyncerResult<bool> {
        if !self.registry.is_live(task_id) {
            debug!("任务 {} 没有存活的Worker，跳过重启", task_id);
            return Ok(false);
        }

        self.stop_worker(task_id).await;
        self.start_worker(task_id).await?;
        Ok(true)
    }

    async fn start_worker(&mut self, task_id: i64) -> SyncerResult<()> {
        if self.registry.is_live(task_id) {
            debug!("任务 {} 已在运行，忽略启动命令", task_id);
            return Ok(());
        }

        // 已结束但退出通知尚未处理的Worker
        if let Some(finished) = self.registry.remove(task_id) {
            self.reap(task_id, finished.join).await;
        }

        self.repository
            .find_by_id(task_id)
            .await?
            .ok_or_else(|| SyncerError::task_not_found(task_id))?;

        let generation = self.registry.next_generation();
        let (cancel, cancel_rx) = oneshot::channel();
        let worker = SyncWorker::new(task_id, self.repository.clone(), self.pipeline.clone());
        let exits = self.exits_tx.clone();

        let join = tokio::spawn(async move {
            let reason = worker.run(cancel_rx).await;
            let _ = exits.send(WorkerExit {
                task_id,
                generation,
                reason,
            });
            reason
        });

        self.registry.insert(
            task_id,
            WorkerHandle {
                generation,
                join,
                cancel,
            },
        );
        info!(generation, "任务 {} 的Worker已启动", task_id);
        Ok(())
    }

    async fn stop_worker(&mut self, task_id: i64) {
        let Some(handle) = self.registry.remove(task_id) else {
            debug!("任务 {} 没有运行中的Worker", task_id);
            return;
        };

        // Worker可能已经自行结束，发送失败无需处理
        let _ = handle.cancel.send(());
        self.reap(task_id, handle.join).await;
    }

    async fn reap(&self, task_id: i64, join: JoinHandle<WorkerExitReason>) {
        match join.await {
            Ok(reason) => info!(reason = ?reason, "任务 {} 的Worker已退出", task_id),
            Err(e) => {
                error!("任务 {} 的Worker异常终止: {}", task_id, e);
                self.clear_running(task_id).await;
            }
        }
    }

    fn handle_exit(&mut self, exit: WorkerExit) {
        match self.registry.remove_generation(exit.task_id, exit.generation) {
            Some(_) => info!(
                reason = ?exit.reason,
                "任务 {} 的Worker已自行结束并注销",
                exit.task_id
            ),
            None => debug!(
                generation = exit.generation,
                "忽略任务 {} 的过期退出通知",
                exit.task_id
            ),
        }
    }

    async fn stop_all(&mut self) {
        let workers = self.registry.drain();
        if workers.is_empty() {
            return;
        }
        info!("正在停止 {} 个Worker", workers.len());

        let mut pending = Vec::with_capacity(workers.len());
        for (task_id, handle) in workers {
            let _ = handle.cancel.send(());
            pending.push((task_id, handle.join));
        }

        for (task_id, mut join) in pending {
            match tokio::time::timeout(self.shutdown_timeout, &mut join).await {
                Ok(Ok(reason)) => debug!(reason = ?reason, "任务 {} 的Worker已退出", task_id),
                Ok(Err(e)) => {
                    error!("任务 {} 的Worker异常终止: {}", task_id, e);
                    self.clear_running(task_id).await;
                }
                Err(_) => {
                    warn!("任务 {} 的Worker未在超时时间内退出，强制终止", task_id);
                    join.abort();
                    self.clear_running(task_id).await;
                }
            }
        }
    }

    async fn clear_running(&self, task_id: i64) {
        if let Err(e) = self
            .repository
            .update_status(task_id, &TaskStatusUpdate::running(false))
            .await
        {
            warn!("重置任务 {} 的运行标记失败: {}", task_id, e);
        }
    }
}
