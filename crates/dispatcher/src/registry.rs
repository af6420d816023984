use std::collections::HashMap;

use syncer_worker::WorkerExitReason;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// 正在运行的Worker
#[derive(Debug)]
pub struct WorkerHandle {
    pub generation: u64,
    pub join: JoinHandle<WorkerExitReason>,
    pub cancel: oneshot::Sender<()>,
}

impl WorkerHandle {
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// 任务ID到Worker句柄的映射，只由控制器持有
#[derive(Debug, Default)]
pub struct JobRegistry {
    workers: HashMap<i64, WorkerHandle>,
    next_generation: u64,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每个新Worker分配一个递增的代号，用于识别过期的退出通知
    pub fn next_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    /// 已注册且尚未结束
    pub fn is_live(&self, task_id: i64) -> bool {
        self.workers
            .get(&task_id)
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn insert(&mut self, task_id: i64, handle: WorkerHandle) -> Option<WorkerHandle> {
        self.workers.insert(task_id, handle)
    }

    pub fn remove(&mut self, task_id: i64) -> Option<WorkerHandle> {
        self.workers.remove(&task_id)
    }

    /// 仅当注册的Worker仍是该代时移除
    pub fn remove_generation(&mut self, task_id: i64, generation: u64) -> Option<WorkerHandle> {
        match self.workers.get(&task_id) {
            Some(handle) if handle.generation == generation => self.workers.remove(&task_id),
            _ => None,
        }
    }

    pub fn active_task_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .workers
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn drain(&mut self) -> Vec<(i64, WorkerHandle)> {
        self.workers.drain().collect()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn handle(generation: u64, exit_immediately: bool) -> WorkerHandle {
        let (cancel, cancel_rx) = oneshot::channel();
        let join = tokio::spawn(async move {
            if !exit_immediately {
                let _ = cancel_rx.await;
            }
            WorkerExitReason::Cancelled
        });
        WorkerHandle {
            generation,
            join,
            cancel,
        }
    }

    #[tokio::test]
    async fn test_generations_increase() {
        let mut registry = JobRegistry::new();
        let first = registry.next_generation();
        let second = registry.next_generation();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_finished_worker_is_not_live() {
        let mut registry = JobRegistry::new();
        registry.insert(1, handle(1, false));
        registry.insert(2, handle(2, true));

        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(registry.is_live(1));
        assert!(!registry.is_live(2));
        assert!(!registry.is_live(3));
        assert_eq!(registry.active_task_ids(), vec![1]);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_remove_generation_ignores_stale_exit() {
        let mut registry = JobRegistry::new();
        registry.insert(1, handle(5, false));

        assert!(registry.remove_generation(1, 4).is_none());
        assert!(registry.is_live(1));

        let removed = registry.remove_generation(1, 5).unwrap();
        assert_eq!(removed.generation, 5);
        assert!(registry.is_empty());

        removed.cancel.send(()).unwrap();
        assert_eq!(removed.join.await.unwrap(), WorkerExitReason::Cancelled);
    }
}
