//! # Dispatch Testing Utils
//!
//! Shared testing utilities for the dispatch workspace.
//! This crate provides in-memory repository implementations, mock
//! collaborator ports and test data builders used across all other
//! crates in the workspace.
//!
//! Add it as a dev-dependency:
//!
//! ```toml
//! [dev-dependencies]
//! dispatch-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod mocks;

pub use builders::*;
pub use mocks::*;
