//! Nodetable core
//!
//! Shared data model for the labeled directed graph (nodes, predicates,
//! triples and saved table views), the builder that turns a filter plus a set
//! of dynamic columns into a single row request, and the column state used to
//! edit a table's schema.

pub mod columns;
pub mod error;
pub mod identifiers;
pub mod model;
pub mod query;

// Re-export key types
pub use columns::ColumnSet;
pub use error::{GraphError, GraphResult};
pub use identifiers::{ColumnId, NodeId, PredicateId, ScopeId, TableId};
pub use model::{
    Cell, ColumnDefinition, ColumnFilter, Direction, Filter, NewNode, NewPredicate, Node,
    Predicate, Row, Table, TableDefinition, Triple, WireDirection, WireFilter,
};
pub use query::{TableQuery, TableRequest};
