use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};

use nodetable_core::{
    GraphError, GraphResult, NewPredicate, Node, NodeId, Predicate, Row, ScopeId, Table,
    TableDefinition, TableId, TableRequest, Triple,
};
use nodetable_monitoring::ClientMetrics;

use super::{ApiPaths, GraphApi};

/// Configuration for the HTTP backend client
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the backend, without trailing path
    pub base_url: String,
    /// Workspace every endpoint is scoped to, if any
    pub scope_id: Option<ScopeId>,
    /// Timeout in seconds for HTTP requests
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            scope_id: None,
            timeout_secs: 30,
        }
    }
}

/// [`GraphApi`] over HTTP/JSON.
///
/// The client is an explicitly constructed value; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct HttpGraphApi {
    config: ApiConfig,
    paths: ApiPaths,
    client: Client,
}

/// Body returned by node creation and deletion
#[derive(Debug, Deserialize)]
struct NodeResponse {
    node_id: NodeId,
}

impl HttpGraphApi {
    pub fn new(config: ApiConfig) -> GraphResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GraphError::Config(format!("Failed to create HTTP client: {}", e)))?;
        let paths = ApiPaths::new(config.scope_id);

        Ok(Self {
            config,
            paths,
            client,
        })
    }

    /// Creates an unscoped client for the given base URL and timeout
    pub fn with_url_and_timeout(base_url: impl Into<String>, timeout_secs: u64) -> GraphResult<Self> {
        Self::new(ApiConfig {
            base_url: base_url.into(),
            scope_id: None,
            timeout_secs,
        })
    }

    pub fn paths(&self) -> &ApiPaths {
        &self.paths
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Maps a reqwest error to a GraphError
    fn map_http_error(error: reqwest::Error) -> GraphError {
        if error.is_timeout() {
            GraphError::Transport(format!("Request timeout: {}", error))
        } else if error.is_connect() {
            GraphError::Transport(format!("Connection error: {}", error))
        } else if error.is_decode() {
            GraphError::Decode(error.to_string())
        } else {
            GraphError::Transport(format!("HTTP error: {}", error))
        }
    }

    /// Sends one request and turns non-success statuses into errors.
    /// `entity` and `id` describe the target when the backend answers 404.
    async fn send(
        &self,
        request: RequestBuilder,
        entity: &str,
        id: Option<String>,
    ) -> GraphResult<Response> {
        let request = request.build().map_err(Self::map_http_error)?;
        let method = request.method().clone();
        let path = request.url().path().to_string();

        let started = Instant::now();
        let response = self
            .client
            .execute(request)
            .await
            .map_err(Self::map_http_error)?;
        let status = response.status();
        ClientMetrics::record_http_request(&path, method.as_str(), status.as_u16(), started.elapsed());

        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| format!("HTTP error: {}", status));
        match status {
            StatusCode::NOT_FOUND => Err(GraphError::NotFound {
                entity: entity.to_string(),
                id: id.unwrap_or(path),
            }),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(GraphError::Validation(body))
            }
            status => Err(GraphError::Http {
                status: status.as_u16(),
                body,
            }),
        }
    }

    /// Decodes a JSON body. An empty or `null` body is `NoData`.
    async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> GraphResult<T> {
        let bytes = response.bytes().await.map_err(Self::map_http_error)?;
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(GraphError::NoData(what.to_string()));
        }

        let value: serde_json::Value = serde_json::from_slice(&bytes)?;
        if value.is_null() {
            return Err(GraphError::NoData(what.to_string()));
        }
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl GraphApi for HttpGraphApi {
    #[instrument(skip(self))]
    async fn list_nodes(&self) -> GraphResult<Vec<Node>> {
        let request = self.client.get(self.url(&self.paths.nodes()));
        let response = self.send(request, "Nodes", None).await?;
        let nodes: Vec<Node> = Self::decode(response, "nodes").await?;
        debug!("Fetched {} nodes", nodes.len());
        Ok(nodes)
    }

    #[instrument(skip(self))]
    async fn create_node(&self, label: &str) -> GraphResult<NodeId> {
        let request = self
            .client
            .post(self.url(&self.paths.nodes()))
            .query(&[("label", label)]);
        let response = self.send(request, "Node", None).await?;
        let created: NodeResponse = Self::decode(response, "created node").await?;
        debug!(node_id = %created.node_id, "Created node");
        Ok(created.node_id)
    }

    #[instrument(skip(self))]
    async fn rename_node(&self, id: NodeId, label: &str) -> GraphResult<Node> {
        let request = self
            .client
            .put(self.url(&self.paths.node(id)))
            .query(&[("label", label)]);
        let response = self.send(request, "Node", Some(id.to_string())).await?;
        Self::decode(response, "renamed node").await
    }

    #[instrument(skip(self))]
    async fn delete_node(&self, id: NodeId) -> GraphResult<NodeId> {
        let request = self.client.delete(self.url(&self.paths.node(id)));
        let response = self.send(request, "Node", Some(id.to_string())).await?;
        let deleted: NodeResponse = Self::decode(response, "deleted node").await?;
        Ok(deleted.node_id)
    }

    #[instrument(skip(self))]
    async fn list_predicates(&self) -> GraphResult<Vec<Predicate>> {
        let request = self.client.get(self.url(&self.paths.predicates()));
        let response = self.send(request, "Predicates", None).await?;
        Self::decode(response, "predicates").await
    }

    #[instrument(skip(self))]
    async fn create_predicate(&self, predicate: &NewPredicate) -> GraphResult<Predicate> {
        let request = self
            .client
            .post(self.url(&self.paths.predicate()))
            .json(predicate);
        let response = self.send(request, "Predicate", None).await?;
        Self::decode(response, "created predicate").await
    }

    #[instrument(skip(self))]
    async fn list_triples(&self) -> GraphResult<Vec<Triple>> {
        let request = self.client.get(self.url(&self.paths.triples()));
        let response = self.send(request, "Triples", None).await?;
        Self::decode(response, "triples").await
    }

    #[instrument(skip(self))]
    async fn create_triple(&self, triple: &Triple) -> GraphResult<()> {
        let request = self.client.post(self.url(&self.paths.triple())).json(triple);
        self.send(request, "Triple", None).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_triple(&self, triple: &Triple) -> GraphResult<()> {
        let request = self
            .client
            .delete(self.url(&self.paths.triple()))
            .json(triple);
        self.send(request, "Triple", None).await?;
        Ok(())
    }

    #[instrument(skip(self, request), fields(columns = request.columns.len()))]
    async fn query_rows(&self, request: &TableRequest) -> GraphResult<Vec<Row>> {
        let http_request = self.client.post(self.url(&self.paths.rows())).json(request);
        let response = self.send(http_request, "Rows", None).await?;
        let rows: Vec<Row> = Self::decode(response, "rows").await?;
        debug!("Fetched {} rows", rows.len());
        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn list_tables(&self) -> GraphResult<Vec<Table>> {
        let request = self.client.get(self.url(&self.paths.tables()));
        let response = self.send(request, "Tables", None).await?;
        Self::decode(response, "tables").await
    }

    #[instrument(skip(self))]
    async fn get_table(&self, id: TableId) -> GraphResult<Table> {
        let request = self.client.get(self.url(&self.paths.table(id)));
        let response = self.send(request, "Table", Some(id.to_string())).await?;
        Self::decode(response, "table").await
    }

    #[instrument(skip(self, definition), fields(label = %definition.label))]
    async fn create_table(&self, definition: &TableDefinition) -> GraphResult<Vec<Row>> {
        let request = self
            .client
            .post(self.url(&self.paths.new_table()))
            .json(definition);
        let response = self.send(request, "Table", None).await?;
        Self::decode(response, "created table rows").await
    }

    #[instrument(skip(self, definition), fields(label = %definition.label))]
    async fn update_table(
        &self,
        id: TableId,
        definition: &TableDefinition,
    ) -> GraphResult<Vec<Row>> {
        let request = self
            .client
            .put(self.url(&self.paths.table(id)))
            .json(definition);
        let response = self.send(request, "Table", Some(id.to_string())).await?;
        Self::decode(response, "updated table rows").await
    }

    #[instrument(skip(self))]
    async fn delete_table(&self, id: TableId) -> GraphResult<()> {
        let request = self
            .client
            .delete(self.url(&self.paths.table_in_collection(id)));
        self.send(request, "Table", Some(id.to_string())).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodetable_core::{ColumnDefinition, ColumnId, Direction, Filter, PredicateId, TableQuery};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Helper function to start a mock server and create a client pointing to it
    async fn setup_test_client() -> (MockServer, HttpGraphApi) {
        let mock_server = MockServer::start().await;
        let client = HttpGraphApi::with_url_and_timeout(mock_server.uri(), 5).unwrap();
        (mock_server, client)
    }

    #[tokio::test]
    async fn test_list_nodes_success() {
        let (mock_server, client) = setup_test_client().await;

        Mock::given(method("GET"))
            .and(path("/node"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"node_id": 1, "label": "Alice"},
                {"node_id": 2, "label": "Bob"}
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let nodes = client.list_nodes().await.unwrap();
        assert_eq!(
            nodes,
            vec![
                Node { node_id: NodeId(1), label: "Alice".to_string() },
                Node { node_id: NodeId(2), label: "Bob".to_string() },
            ]
        );
    }

    #[tokio::test]
    async fn test_create_node_sends_label_as_query() {
        let (mock_server, client) = setup_test_client().await;

        Mock::given(method("POST"))
            .and(path("/node"))
            .and(query_param("label", "Carol"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"node_id": 3})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let id = client.create_node("Carol").await.unwrap();
        assert_eq!(id, NodeId(3));
    }

    #[tokio::test]
    async fn test_query_rows_posts_whole_request() {
        let (mock_server, client) = setup_test_client().await;

        let request = TableQuery::new(Filter::any())
            .column(ColumnDefinition::new(ColumnId(1), Some(PredicateId(2)), Direction::Out))
            .build();

        Mock::given(method("POST"))
            .and(path("/full-table"))
            .and(body_json(json!({
                "filter": {"node_id": null, "predicate": null, "direction": null},
                "columns": [{"id": 1, "filter": {"direction": "out", "predicate_id": 2}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"node_id": 1, "columns": [{"id": 1, "values": [2]}]}
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let rows = client.query_rows(&request).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cell(ColumnId(1)).unwrap().values, vec![NodeId(2)]);
    }

    #[tokio::test]
    async fn test_delete_triple_sends_full_tuple() {
        let (mock_server, client) = setup_test_client().await;

        Mock::given(method("DELETE"))
            .and(path("/triple"))
            .and(body_json(json!({"subject_id": 1, "predicate_id": 2, "object_id": 3})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let triple = Triple::new(NodeId(1), PredicateId(2), NodeId(3));
        client.delete_triple(&triple).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_table_not_found() {
        let (mock_server, client) = setup_test_client().await;

        Mock::given(method("GET"))
            .and(path("/table/9"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Table not found"))
            .mount(&mock_server)
            .await;

        let error = client.get_table(TableId(9)).await.unwrap_err();
        assert_eq!(error, GraphError::not_found("Table", 9));
    }

    #[tokio::test]
    async fn test_bad_request_is_validation_error() {
        let (mock_server, client) = setup_test_client().await;

        Mock::given(method("PUT"))
            .and(path("/node/4"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Missing label parameter"))
            .mount(&mock_server)
            .await;

        let error = client.rename_node(NodeId(4), "").await.unwrap_err();
        assert_eq!(error, GraphError::Validation("Missing label parameter".to_string()));
    }

    #[tokio::test]
    async fn test_server_error_keeps_status_and_body() {
        let (mock_server, client) = setup_test_client().await;

        Mock::given(method("GET"))
            .and(path("/tables"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;

        let error = client.list_tables().await.unwrap_err();
        assert_eq!(
            error,
            GraphError::Http {
                status: 500,
                body: "boom".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_empty_body_is_no_data() {
        let (mock_server, client) = setup_test_client().await;

        Mock::given(method("GET"))
            .and(path("/predicates"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let error = client.list_predicates().await.unwrap_err();
        assert!(matches!(error, GraphError::NoData(_)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let (mock_server, client) = setup_test_client().await;

        Mock::given(method("GET"))
            .and(path("/node"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
            .mount(&mock_server)
            .await;

        let error = client.list_nodes().await.unwrap_err();
        assert!(matches!(error, GraphError::Decode(_)));
    }

    #[tokio::test]
    async fn test_scoped_client_prefixes_paths() {
        let mock_server = MockServer::start().await;
        let client = HttpGraphApi::new(ApiConfig {
            base_url: format!("{}/", mock_server.uri()),
            scope_id: Some(ScopeId(5)),
            timeout_secs: 5,
        })
        .unwrap();

        Mock::given(method("DELETE"))
            .and(path("/settings/5/tables/2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Table 2 deleted"))
            .expect(1)
            .mount(&mock_server)
            .await;

        client.delete_table(TableId(2)).await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        // Nothing listens on port 1
        let client = HttpGraphApi::with_url_and_timeout("http://127.0.0.1:1", 2).unwrap();
        let error = client.list_nodes().await.unwrap_err();
        assert!(error.is_transport(), "expected transport error, got {:?}", error);
    }
}
