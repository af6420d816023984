pub mod commands;
pub mod connectors;
pub mod dataset;
pub mod entities;
pub mod repositories;
pub mod value_objects;

pub use commands::*;
pub use connectors::*;
pub use dataset::*;
pub use entities::*;
pub use repositories::*;
pub use syncer_errors::{ConnectorError, ConnectorResult, SyncerError, SyncerResult};
pub use value_objects::*;
