//!
//! Nodetable client - data layer of the Nodetable graph editor
//!
//! The layer is built from four parts, leaf first:
//! - [`api`]: typed access to the REST backend ([`GraphApi`], [`HttpGraphApi`])
//! - [`cache`]: keyed cache of server data with explicit invalidation
//! - [`invalidation`]: which cache keys every write cancels and invalidates
//! - [`session`] and [`editor`]: queries, mutations and read-modify-write
//!   editing of saved tables on top of the three above

/// Backend API module
pub mod api;

/// Query cache module
pub mod cache;

/// Configuration module
pub mod config;

/// Table editing module
pub mod editor;

/// Mutation invalidation rules
pub mod invalidation;

/// Session module
pub mod session;

// Re-export key types
pub use api::{ApiPaths, GraphApi, HttpGraphApi};
pub use cache::{CacheConfig, CacheMetrics, KeyScope, QueryCache, QueryKey, QueryKind};
pub use config::ClientConfig;
pub use editor::TableEditor;
pub use invalidation::{Mutation, MutationPlan};
pub use session::{GraphSession, MutationError, QuerySnapshot, TableView};
