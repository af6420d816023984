pub mod api_observability;
pub mod app_config;
pub mod controller;
pub mod database;
pub mod netsuite;
pub mod sharepoint;

// Re-export main types for easier imports
pub use api_observability::{ApiConfig, ObservabilityConfig};
pub use app_config::AppConfig;
pub use controller::ControllerConfig;
pub use database::DatabaseConfig;
pub use netsuite::NetsuiteConfig;
pub use sharepoint::SharepointConfig;
