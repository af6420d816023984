//! Mock implementations of the repository and connector traits
//!
//! In-memory test doubles that record every interaction so tests can assert
//! on call counts, persisted status updates and worker overlap.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use syncer_domain::{
    Connector, DataType, Dataset, DestinationDescriptor, SourceDescriptor, Task, TaskDefinition,
    TaskRepository, TaskStatusUpdate,
};
use syncer_errors::{ConnectorError, ConnectorResult, SyncerError, SyncerResult};

/// Mock implementation of TaskRepository for testing
#[derive(Debug, Clone)]
pub struct MockTaskRepository {
    tasks: Arc<Mutex<HashMap<i64, Task>>>,
    next_id: Arc<Mutex<i64>>,
    status_updates: Arc<Mutex<Vec<(i64, TaskStatusUpdate)>>>,
    fail_status_updates: Arc<Mutex<bool>>,
    fail_lookups: Arc<Mutex<bool>>,
}

impl MockTaskRepository {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(Mutex::new(1)),
            status_updates: Arc::new(Mutex::new(Vec::new())),
            fail_status_updates: Arc::new(Mutex::new(false)),
            fail_lookups: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let repo = Self::new();
        let mut max_id = 0;
        {
            let mut task_map = repo.tasks.lock().unwrap();
            for task in tasks {
                max_id = max_id.max(task.id);
                task_map.insert(task.id, task);
            }
        }
        *repo.next_id.lock().unwrap() = max_id + 1;
        repo
    }

    pub fn insert(&self, task: Task) {
        self.tasks.lock().unwrap().insert(task.id, task);
    }

    pub fn count(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    pub fn get(&self, id: i64) -> Option<Task> {
        self.tasks.lock().unwrap().get(&id).cloned()
    }

    /// 所有写入过的状态更新，按写入顺序
    pub fn status_updates(&self) -> Vec<(i64, TaskStatusUpdate)> {
        self.status_updates.lock().unwrap().clone()
    }

    /// 某任务记录的迭代结果（last_result）
    pub fn iteration_results(&self, id: i64) -> Vec<bool> {
        self.status_updates
            .lock()
            .unwrap()
            .iter()
            .filter(|(task_id, update)| *task_id == id && update.is_iteration())
            .filter_map(|(_, update)| update.last_result)
            .collect()
    }

    /// 让后续的 update_status 调用失败
    pub fn fail_status_updates(&self, fail: bool) {
        *self.fail_status_updates.lock().unwrap() = fail;
    }

    /// 让后续的 find_by_id 调用失败
    pub fn fail_lookups(&self, fail: bool) {
        *self.fail_lookups.lock().unwrap() = fail;
    }
}

impl Default for MockTaskRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskRepository for MockTaskRepository {
    async fn create(&self, definition: &TaskDefinition) -> SyncerResult<Task> {
        let mut tasks = self.tasks.lock().unwrap();
        if tasks.values().any(|t| t.name == definition.name) {
            return Err(SyncerError::TaskNameConflict {
                name: definition.name.clone(),
            });
        }

        let mut next_id = self.next_id.lock().unwrap();
        let task = Task {
            id: *next_id,
            name: definition.name.clone(),
            running: false,
            sync_times: definition.sync_times,
            sync_rate: definition.sync_rate,
            source: definition.source.clone(),
            destination: definition.destination.clone(),
            last_run: None,
            last_result: None,
        };
        *next_id += 1;

        tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_by_id(&self, id: i64) -> SyncerResult<Option<Task>> {
        if *self.fail_lookups.lock().unwrap() {
            return Err(SyncerError::Internal("mock lookup failure".to_string()));
        }
        Ok(self.tasks.lock().unwrap().get(&id).cloned())
    }

    async fn find_all(&self) -> SyncerResult<Vec<Task>> {
        let mut tasks: Vec<Task> = self.tasks.lock().unwrap().values().cloned().collect();
        tasks.sort_by_key(|t| t.id);
        Ok(tasks)
    }

    async fn update(&self, id: i64, definition: &TaskDefinition) -> SyncerResult<Task> {
        let mut tasks = self.tasks.lock().unwrap();
        if tasks
            .values()
            .any(|t| t.id != id && t.name == definition.name)
        {
            return Err(SyncerError::TaskNameConflict {
                name: definition.name.clone(),
            });
        }

        let task = tasks
            .get_mut(&id)
            .ok_or_else(|| SyncerError::task_not_found(id))?;
        task.name = definition.name.clone();
        task.sync_times = definition.sync_times;
        task.sync_rate = definition.sync_rate;
        task.source = definition.source.clone();
        task.destination = definition.destination.clone();
        Ok(task.clone())
    }

    async fn delete(&self, id: i64) -> SyncerResult<bool> {
        Ok(self.tasks.lock().unwrap().remove(&id).is_some())
    }

    async fn update_status(&self, id: i64, update: &TaskStatusUpdate) -> SyncerResult<()> {
        if *self.fail_status_updates.lock().unwrap() {
            return Err(SyncerError::Internal("mock status failure".to_string()));
        }

        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .get_mut(&id)
            .ok_or_else(|| SyncerError::task_not_found(id))?;
        if let Some(running) = update.running {
            task.running = running;
        }
        if let Some(last_run) = update.last_run {
            task.last_run = Some(last_run);
        }
        if let Some(last_result) = update.last_result {
            task.last_result = Some(last_result);
        }
        self.status_updates.lock().unwrap().push((id, *update));
        Ok(())
    }

    async fn reset_running(&self) -> SyncerResult<u64> {
        let mut tasks = self.tasks.lock().unwrap();
        let mut affected = 0;
        for task in tasks.values_mut().filter(|t| t.running) {
            task.running = false;
            affected += 1;
        }
        Ok(affected)
    }
}

/// 一次读取的预设结果
#[derive(Debug, Clone)]
pub enum ReadOutcome {
    Rows(Dataset),
    Fail,
    Panic,
}

/// Mock connector with scripted read outcomes and concurrency tracking
#[derive(Debug, Clone)]
pub struct MockConnector {
    kind: DataType,
    script: Arc<Mutex<VecDeque<ReadOutcome>>>,
    default_dataset: Dataset,
    fail_writes: Arc<Mutex<bool>>,
    delay: Duration,
    reads: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    written: Arc<Mutex<Vec<Dataset>>>,
}

impl MockConnector {
    pub fn new(kind: DataType) -> Self {
        let mut default_dataset = Dataset::new(vec!["id".to_string()]);
        default_dataset.rows.push(vec![serde_json::json!(1)]);

        Self {
            kind,
            script: Arc::new(Mutex::new(VecDeque::new())),
            default_dataset,
            fail_writes: Arc::new(Mutex::new(false)),
            delay: Duration::ZERO,
            reads: Arc::new(AtomicUsize::new(0)),
            writes: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            written: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// 每次读取前等待的时间，用于制造与其他Worker重叠的窗口
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_dataset(mut self, dataset: Dataset) -> Self {
        self.default_dataset = dataset;
        self
    }

    /// 预设接下来若干次读取的结果，用完后回到默认数据集
    pub fn script(&self, outcomes: impl IntoIterator<Item = ReadOutcome>) {
        self.script.lock().unwrap().extend(outcomes);
    }

    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// 同一时刻处于读取中的最大调用数
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn written(&self) -> Vec<Dataset> {
        self.written.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn kind(&self) -> DataType {
        self.kind
    }

    async fn read(&self, _source: &SourceDescriptor) -> ConnectorResult<Dataset> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let outcome = self.script.lock().unwrap().pop_front();
        match outcome {
            Some(ReadOutcome::Rows(dataset)) => Ok(dataset),
            Some(ReadOutcome::Fail) => Err(ConnectorError::Transport(
                "scripted read failure".to_string(),
            )),
            Some(ReadOutcome::Panic) => panic!("scripted connector panic"),
            None => Ok(self.default_dataset.clone()),
        }
    }

    async fn write(
        &self,
        _destination: &DestinationDescriptor,
        dataset: &Dataset,
    ) -> ConnectorResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if *self.fail_writes.lock().unwrap() {
            return Err(ConnectorError::Transport(
                "scripted write failure".to_string(),
            ));
        }
        self.written.lock().unwrap().push(dataset.clone());
        Ok(())
    }
}
