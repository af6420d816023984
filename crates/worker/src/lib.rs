pub mod pipeline;
pub mod sync_worker;

pub use pipeline::{IdentityTransform, SyncPipeline, SyncReport, Transform};
pub use sync_worker::{SyncWorker, WorkerExitReason};
