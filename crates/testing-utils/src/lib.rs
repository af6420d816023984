//! # Syncer Testing Utils
//!
//! Shared testing utilities for the sync controller workspace.
//! This crate provides in-memory mock implementations of the repository and
//! connector traits, plus builders for test data.
//!
//! ## Usage
//!
//! Add this crate as a dev-dependency:
//!
//! ```toml
//! [dev-dependencies]
//! syncer-testing-utils = { path = "../testing-utils" }
//! ```
//!
//! Then use the mocks in your tests:
//!
//! ```rust
//! use syncer_testing_utils::{MockConnector, MockTaskRepository, TaskBuilder};
//! ```

pub mod builders;
pub mod mocks;

// Re-export commonly used items
pub use builders::*;
pub use mocks::*;
