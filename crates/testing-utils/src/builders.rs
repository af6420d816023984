//! Test data builders for creating test entities
//!
//! Builder patterns with sensible defaults: a NetSuite source feeding a
//! SharePoint Excel destination, synced every minute.

use chrono::{DateTime, Utc};
use syncer_domain::{DestinationDescriptor, SourceDescriptor, Task, TaskDefinition};

pub const TEST_FILE_URL: &str =
    "https://contoso.sharepoint.com/sites/ops/Shared Documents/exports/customers.xlsx";

/// Builder for creating test Task entities
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new() -> Self {
        Self {
            task: Task {
                id: 1,
                name: "test_task".to_string(),
                running: false,
                sync_times: 0,
                sync_rate: 60,
                source: SourceDescriptor::Netsuite {
                    query: "SELECT id, companyname FROM customer".to_string(),
                },
                destination: DestinationDescriptor::SharepointExcel {
                    file_url: TEST_FILE_URL.to_string(),
                    sheet_name: "Customers".to_string(),
                },
                last_run: None,
                last_result: None,
            },
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.task.id = id;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.task.name = name.to_string();
        self
    }

    pub fn with_sync_times(mut self, sync_times: u32) -> Self {
        self.task.sync_times = sync_times;
        self
    }

    pub fn with_sync_rate(mut self, sync_rate: u64) -> Self {
        self.task.sync_rate = sync_rate;
        self
    }

    pub fn with_source(mut self, source: SourceDescriptor) -> Self {
        self.task.source = source;
        self
    }

    pub fn with_destination(mut self, destination: DestinationDescriptor) -> Self {
        self.task.destination = destination;
        self
    }

    pub fn running(mut self) -> Self {
        self.task.running = true;
        self
    }

    pub fn with_last_run(mut self, last_run: DateTime<Utc>, success: bool) -> Self {
        self.task.last_run = Some(last_run);
        self.task.last_result = Some(success);
        self
    }

    pub fn build(self) -> Task {
        self.task
    }

    /// 同一任务的定义部分
    pub fn definition(self) -> TaskDefinition {
        TaskDefinition {
            name: self.task.name,
            sync_times: self.task.sync_times,
            sync_rate: self.task.sync_rate,
            source: self.task.source,
            destination: self.task.destination,
        }
    }
}

impl Default for TaskBuilder {
    fn default() -> Self {
        Self::new()
    }
}
