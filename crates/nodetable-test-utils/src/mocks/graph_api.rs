use async_trait::async_trait;
use mockall::mock;

use nodetable_client::GraphApi;
use nodetable_core::{
    GraphResult, NewPredicate, Node, NodeId, Predicate, Row, Table, TableDefinition, TableId,
    TableRequest, Triple,
};

// Generate the mock implementation
mock! {
    pub GraphApi {}

    #[async_trait]
    impl GraphApi for GraphApi {
        async fn list_nodes(&self) -> GraphResult<Vec<Node>>;
        async fn create_node(&self, label: &str) -> GraphResult<NodeId>;
        async fn rename_node(&self, id: NodeId, label: &str) -> GraphResult<Node>;
        async fn delete_node(&self, id: NodeId) -> GraphResult<NodeId>;
        async fn list_predicates(&self) -> GraphResult<Vec<Predicate>>;
        async fn create_predicate(&self, predicate: &NewPredicate) -> GraphResult<Predicate>;
        async fn list_triples(&self) -> GraphResult<Vec<Triple>>;
        async fn create_triple(&self, triple: &Triple) -> GraphResult<()>;
        async fn delete_triple(&self, triple: &Triple) -> GraphResult<()>;
        async fn query_rows(&self, request: &TableRequest) -> GraphResult<Vec<Row>>;
        async fn list_tables(&self) -> GraphResult<Vec<Table>>;
        async fn get_table(&self, id: TableId) -> GraphResult<Table>;
        async fn create_table(&self, definition: &TableDefinition) -> GraphResult<Vec<Row>>;
        async fn update_table(&self, id: TableId, definition: &TableDefinition) -> GraphResult<Vec<Row>>;
        async fn delete_table(&self, id: TableId) -> GraphResult<()>;
    }
}

/// Creates a mock whose reads return empty collections. Writes have no
/// expectations and panic unless the test sets them.
pub fn create_mock_graph_api() -> MockGraphApi {
    let mut mock = MockGraphApi::new();

    mock.expect_list_nodes().returning(|| Ok(Vec::new()));
    mock.expect_list_predicates().returning(|| Ok(Vec::new()));
    mock.expect_list_triples().returning(|| Ok(Vec::new()));
    mock.expect_list_tables().returning(|| Ok(Vec::new()));
    mock.expect_query_rows().returning(|_| Ok(Vec::new()));

    mock
}
