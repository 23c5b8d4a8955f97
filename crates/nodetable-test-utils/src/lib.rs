//! Testing utilities for Nodetable.
//!
//! This crate provides an in-memory backend implementing the
//! [`nodetable_client::GraphApi`] contract, a wrapper that records calls and
//! injects failures or delays, `mockall` mocks and a small fixture graph.

pub mod fixtures;
pub mod implementations;
pub mod mocks;

/// Re-export commonly used types for convenience
pub use mockall;

pub use implementations::{Hold, InMemoryGraphApi, RecordingGraphApi};
pub use mocks::MockGraphApi;
