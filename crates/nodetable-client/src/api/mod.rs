//! Typed access to the Nodetable REST backend.

use async_trait::async_trait;

use nodetable_core::{
    GraphResult, NewPredicate, Node, NodeId, Predicate, Row, Table, TableDefinition, TableId,
    TableRequest, Triple,
};

mod http;
mod paths;

pub use http::{ApiConfig, HttpGraphApi};
pub use paths::ApiPaths;

/// Every backend operation the data layer uses.
///
/// One call is one request: implementations never retry and never batch.
/// Failures are returned as [`nodetable_core::GraphError`] and consumed by the
/// query cache as error state.
#[async_trait]
pub trait GraphApi: Send + Sync {
    /// All nodes of the graph.
    async fn list_nodes(&self) -> GraphResult<Vec<Node>>;

    /// Creates a node and returns its id.
    async fn create_node(&self, label: &str) -> GraphResult<NodeId>;

    /// Sets the label of a node.
    async fn rename_node(&self, id: NodeId, label: &str) -> GraphResult<Node>;

    /// Deletes a node. Triples referencing it are removed by the backend.
    async fn delete_node(&self, id: NodeId) -> GraphResult<NodeId>;

    async fn list_predicates(&self) -> GraphResult<Vec<Predicate>>;

    async fn create_predicate(&self, predicate: &NewPredicate) -> GraphResult<Predicate>;

    async fn list_triples(&self) -> GraphResult<Vec<Triple>>;

    async fn create_triple(&self, triple: &Triple) -> GraphResult<()>;

    /// Deletes every edge matching the full three-tuple.
    async fn delete_triple(&self, triple: &Triple) -> GraphResult<()>;

    /// Rows and column values for an ad-hoc filter in one round trip.
    async fn query_rows(&self, request: &TableRequest) -> GraphResult<Vec<Row>>;

    async fn list_tables(&self) -> GraphResult<Vec<Table>>;

    async fn get_table(&self, id: TableId) -> GraphResult<Table>;

    /// Saves a new table and returns its rows.
    async fn create_table(&self, definition: &TableDefinition) -> GraphResult<Vec<Row>>;

    /// Replaces a table definition as a whole and returns the new rows.
    async fn update_table(&self, id: TableId, definition: &TableDefinition)
        -> GraphResult<Vec<Row>>;

    async fn delete_table(&self, id: TableId) -> GraphResult<()>;
}
