pub mod netsuite;
pub mod registry;
pub mod sharepoint;

pub use netsuite::NetsuiteConnector;
pub use registry::ConnectorRegistry;
pub use sharepoint::SharepointExcelConnector;
