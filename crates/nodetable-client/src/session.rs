//! Data access for views.
//!
//! A [`GraphSession`] owns the backend client and the query cache. Views read
//! through its query methods, which serve fresh cached data or fetch, and
//! write through its mutation methods, which apply the invalidation plan of
//! [`crate::invalidation`].

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, instrument, warn};

use nodetable_core::{
    ColumnDefinition, Direction, Filter, GraphError, GraphResult, NewPredicate, Node, NodeId,
    Predicate, PredicateId, Row, Table, TableDefinition, TableId, TableRequest, Triple,
};
use nodetable_monitoring::ClientMetrics;

use crate::api::{GraphApi, HttpGraphApi};
use crate::cache::{CacheConfig, Cacheable, FetchOutcome, Lookup, QueryCache, QueryKey};
use crate::config::ClientConfig;
use crate::invalidation::{self, Mutation};

/// How often a query is fetched again when its result was superseded by a
/// concurrent invalidation.
const MAX_FETCH_ATTEMPTS: usize = 2;

/// A failed write. The cache is left as it was before the write.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{mutation} failed: {source}")]
pub struct MutationError {
    pub mutation: Mutation,
    #[source]
    pub source: GraphError,
}

impl MutationError {
    pub fn user_message(&self) -> String {
        self.source.user_message()
    }
}

/// What a view renders for one query.
///
/// `data` and `error` are independent: a failed refetch keeps the previous
/// data next to the error.
#[derive(Debug)]
pub struct QuerySnapshot<T> {
    data: Option<Arc<T>>,
    error: Option<GraphError>,
    stale: bool,
    placeholder: bool,
}

impl<T> Clone for QuerySnapshot<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            error: self.error.clone(),
            stale: self.stale,
            placeholder: self.placeholder,
        }
    }
}

impl<T: Cacheable> QuerySnapshot<T> {
    fn from_lookup(lookup: Lookup) -> Self {
        let data = lookup.value.as_ref().and_then(T::from_cached);
        Self {
            stale: data.is_some() && !lookup.fresh,
            data,
            error: lookup.error,
            placeholder: false,
        }
    }

    /// Snapshot right after a fetch completed: data is stale when the fetch
    /// failed and older data was kept, or when a write to the key is still
    /// in progress.
    fn after_fetch(lookup: Lookup) -> Self {
        let data = lookup.value.as_ref().and_then(T::from_cached);
        Self {
            stale: data.is_some() && (lookup.error.is_some() || lookup.pending_write),
            data,
            error: lookup.error,
            placeholder: false,
        }
    }

    fn uncached(result: GraphResult<crate::cache::CachedValue>) -> Self {
        match result {
            Ok(value) => Self {
                data: T::from_cached(&value),
                error: None,
                stale: true,
                placeholder: false,
            },
            Err(error) => Self {
                data: None,
                error: Some(error),
                stale: false,
                placeholder: false,
            },
        }
    }
}

impl<T> QuerySnapshot<T> {
    pub fn data(&self) -> Option<&T> {
        self.data.as_deref()
    }

    pub fn shared(&self) -> Option<Arc<T>> {
        self.data.clone()
    }

    pub fn error(&self) -> Option<&GraphError> {
        self.error.as_ref()
    }

    /// Display text for the error state.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(GraphError::user_message)
    }

    /// Whether the data may be outdated (invalidated, expired or kept after
    /// a failed refetch).
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Whether the data belongs to a previous query and is only shown until
    /// the current one loads.
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    /// The data, unless the last fetch failed.
    pub fn into_result(self) -> GraphResult<Arc<T>> {
        match (self.error, self.data) {
            (Some(error), _) => Err(error),
            (None, Some(data)) => Ok(data),
            (None, None) => Err(GraphError::NoData("query".to_string())),
        }
    }
}

impl QuerySnapshot<Vec<Node>> {
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.data()?.iter().find(|node| node.node_id == id)
    }

    /// Label of a node, if loaded.
    pub fn label_of(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(|node| node.label.as_str())
    }
}

impl QuerySnapshot<Vec<Predicate>> {
    pub fn predicate(&self, id: PredicateId) -> Option<&Predicate> {
        self.data()?.iter().find(|predicate| predicate.id == id)
    }
}

/// Everything the table page needs, loaded in parallel.
#[derive(Debug, Clone)]
pub struct TableView {
    pub nodes: QuerySnapshot<Vec<Node>>,
    pub predicates: QuerySnapshot<Vec<Predicate>>,
    pub table: QuerySnapshot<Table>,
}

/// Backend client plus query cache, shared by every view.
#[derive(Clone)]
pub struct GraphSession {
    api: Arc<dyn GraphApi>,
    cache: Arc<QueryCache>,
}

impl std::fmt::Debug for GraphSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphSession")
            .field("cache", &self.cache)
            .finish()
    }
}

impl GraphSession {
    pub fn new(api: Arc<dyn GraphApi>, cache_config: CacheConfig) -> Self {
        Self {
            api,
            cache: Arc::new(QueryCache::new(cache_config)),
        }
    }

    /// Session against the HTTP backend described by `config`
    pub fn from_config(config: &ClientConfig) -> GraphResult<Self> {
        let api = HttpGraphApi::new(config.api())?;
        Ok(Self::new(Arc::new(api), config.cache.clone()))
    }

    pub fn api(&self) -> &Arc<dyn GraphApi> {
        &self.api
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    // Queries

    pub async fn nodes(&self) -> QuerySnapshot<Vec<Node>> {
        self.query(QueryKey::Nodes, false, || self.api.list_nodes())
            .await
    }

    pub async fn predicates(&self) -> QuerySnapshot<Vec<Predicate>> {
        self.query(QueryKey::Predicates, false, || self.api.list_predicates())
            .await
    }

    pub async fn triples(&self) -> QuerySnapshot<Vec<Triple>> {
        self.query(QueryKey::Triples, false, || self.api.list_triples())
            .await
    }

    pub async fn tables(&self) -> QuerySnapshot<Vec<Table>> {
        self.query(QueryKey::Tables, false, || self.api.list_tables())
            .await
    }

    pub async fn table(&self, id: TableId) -> QuerySnapshot<Table> {
        self.query(QueryKey::Table(id), false, || self.api.get_table(id))
            .await
    }

    /// Reads a table from the backend regardless of what is cached, and
    /// stores the result.
    pub async fn fresh_table(&self, id: TableId) -> GraphResult<Arc<Table>> {
        self.query(QueryKey::Table(id), true, || self.api.get_table(id))
            .await
            .into_result()
    }

    /// Rows of an ad-hoc filter with dynamic columns, in one request.
    pub async fn rows(
        &self,
        filter: Filter,
        columns: &[ColumnDefinition],
    ) -> QuerySnapshot<Vec<Row>> {
        let key = QueryKey::rows(filter, columns);
        let request = Self::rows_request(&key);
        self.query(key, false, || self.api.query_rows(&request))
            .await
    }

    /// What a rows view shows before [`Self::rows`] resolves: the cached rows
    /// for these parameters, or else the previous rows result flagged as a
    /// placeholder.
    pub fn peek_rows(&self, filter: Filter, columns: &[ColumnDefinition]) -> QuerySnapshot<Vec<Row>> {
        let key = QueryKey::rows(filter, columns);
        let snapshot = QuerySnapshot::from_lookup(self.cache.inspect(&key));
        if snapshot.data.is_some() {
            return snapshot;
        }

        match self
            .cache
            .placeholder_rows()
            .as_ref()
            .and_then(<Vec<Row>>::from_cached)
        {
            Some(previous) => QuerySnapshot {
                data: Some(previous),
                error: snapshot.error,
                stale: true,
                placeholder: true,
            },
            None => snapshot,
        }
    }

    /// Ids of the nodes selected by `filter`.
    pub async fn filtered_nodes(&self, filter: Filter) -> QuerySnapshot<BTreeSet<NodeId>> {
        let key = QueryKey::filtered_nodes(filter);
        let request = Self::rows_request(&key);
        self.query(key, false, || self.node_set(&request)).await
    }

    /// Ids of the nodes linked to `node` in `direction`.
    ///
    /// With [`Direction::Any`] the request carries only the anchor node. The
    /// HTTP backend ignores an anchor when neither predicate nor direction is
    /// set and returns every node, while the in-memory test backend returns
    /// the anchor's neighbours in both directions. Pass `In` or `Out` when
    /// the result must be restricted to actual neighbours.
    pub async fn neighbors(
        &self,
        node: NodeId,
        direction: Direction,
    ) -> QuerySnapshot<BTreeSet<NodeId>> {
        let key = QueryKey::neighbors(node, direction);
        let request = Self::rows_request(&key);
        self.query(key, false, || self.node_set(&request)).await
    }

    /// Loads nodes, predicates and one table concurrently.
    #[instrument(skip(self))]
    pub async fn table_view(&self, id: TableId) -> TableView {
        let (nodes, predicates, table) =
            futures::join!(self.nodes(), self.predicates(), self.table(id));
        TableView {
            nodes,
            predicates,
            table,
        }
    }

    // Mutations

    pub async fn create_node(&self, label: &str) -> Result<NodeId, MutationError> {
        Self::require_label(Mutation::CreateNode, label)?;
        self.mutate(Mutation::CreateNode, self.api.create_node(label))
            .await
    }

    pub async fn rename_node(&self, id: NodeId, label: &str) -> Result<Node, MutationError> {
        Self::require_label(Mutation::RenameNode(id), label)?;
        self.mutate(Mutation::RenameNode(id), self.api.rename_node(id, label))
            .await
    }

    pub async fn delete_node(&self, id: NodeId) -> Result<NodeId, MutationError> {
        self.mutate(Mutation::DeleteNode(id), self.api.delete_node(id))
            .await
    }

    pub async fn create_predicate(&self, label: &str) -> Result<Predicate, MutationError> {
        Self::require_label(Mutation::CreatePredicate, label)?;
        let predicate = NewPredicate {
            label: label.to_string(),
        };
        self.mutate(Mutation::CreatePredicate, self.api.create_predicate(&predicate))
            .await
    }

    pub async fn create_triple(&self, triple: Triple) -> Result<(), MutationError> {
        self.mutate(Mutation::CreateTriple(triple), self.api.create_triple(&triple))
            .await
    }

    pub async fn delete_triple(&self, triple: Triple) -> Result<(), MutationError> {
        self.mutate(Mutation::DeleteTriple(triple), self.api.delete_triple(&triple))
            .await
    }

    pub async fn create_table(
        &self,
        definition: &TableDefinition,
    ) -> Result<Vec<Row>, MutationError> {
        self.mutate(Mutation::CreateTable, self.api.create_table(definition))
            .await
    }

    /// Replaces the whole definition of a saved table.
    pub async fn update_table(
        &self,
        id: TableId,
        definition: &TableDefinition,
    ) -> Result<Vec<Row>, MutationError> {
        self.mutate(Mutation::UpdateTable(id), self.api.update_table(id, definition))
            .await
    }

    pub async fn delete_table(&self, id: TableId) -> Result<(), MutationError> {
        self.mutate(Mutation::DeleteTable(id), self.api.delete_table(id))
            .await
    }

    /// Serves fresh cached data, or fetches and stores. A fetch superseded by
    /// a concurrent cancel or invalidate is repeated once, after the writes
    /// pending on its key have finished. Data stored while such a write is
    /// still running is flagged stale.
    async fn query<T, F, Fut>(&self, key: QueryKey, force: bool, fetch: F) -> QuerySnapshot<T>
    where
        T: Cacheable,
        F: Fn() -> Fut,
        Fut: Future<Output = GraphResult<T>>,
    {
        if !force {
            let lookup = self.cache.lookup(&key);
            if lookup.fresh {
                return QuerySnapshot::from_lookup(lookup);
            }
        }

        let mut attempts = 0;
        loop {
            attempts += 1;
            let ticket = self.cache.begin_fetch(&key);
            let result = fetch().await.map(|value| T::into_cached(Arc::new(value)));

            match self.cache.complete_fetch(ticket, result) {
                FetchOutcome::Stored => {
                    return QuerySnapshot::after_fetch(self.cache.inspect(&key));
                }
                FetchOutcome::Discarded(result) if attempts >= MAX_FETCH_ATTEMPTS => {
                    warn!(kind = key.kind().as_str(), "Query superseded repeatedly, returning uncached result");
                    return QuerySnapshot::uncached(result);
                }
                FetchOutcome::Discarded(_) => {
                    self.cache.wait_for_writes(&key).await;
                    debug!(kind = key.kind().as_str(), "Refetching superseded query");
                }
            }
        }
    }

    /// Cancels affected queries, performs the write and invalidates on
    /// success. Readers of the affected keys see the write as pending until
    /// it has finished either way.
    async fn mutate<T, Fut>(&self, mutation: Mutation, write: Fut) -> Result<T, MutationError>
    where
        Fut: Future<Output = GraphResult<T>>,
    {
        let plan = invalidation::plan(&mutation);
        let pending = self.cache.begin_write(&plan.cancel, &plan.invalidate);

        match write.await {
            Ok(value) => {
                let invalidated = pending.complete();
                ClientMetrics::record_mutation(mutation.name(), invalidated, true);
                Ok(value)
            }
            Err(source) => {
                warn!(%mutation, error = %source, "Mutation failed");
                ClientMetrics::record_mutation(mutation.name(), 0, false);
                Err(MutationError { mutation, source })
            }
        }
    }

    async fn node_set(&self, request: &TableRequest) -> GraphResult<BTreeSet<NodeId>> {
        let rows = self.api.query_rows(request).await?;
        Ok(rows.into_iter().map(|row| row.node_id).collect())
    }

    fn rows_request(key: &QueryKey) -> TableRequest {
        key.rows_request().unwrap_or_default()
    }

    fn require_label(mutation: Mutation, label: &str) -> Result<(), MutationError> {
        if label.trim().is_empty() {
            return Err(MutationError {
                mutation,
                source: GraphError::Validation("label must not be empty".to_string()),
            });
        }
        Ok(())
    }
}

