pub mod connectors;
pub mod database;
pub mod error_handling;

pub use connectors::*;
pub use database::*;
