//! GraphApi wrapper that records calls and injects failures or delays.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;

use nodetable_client::GraphApi;
use nodetable_core::{
    GraphError, GraphResult, NewPredicate, Node, NodeId, Predicate, Row, Table, TableDefinition,
    TableId, TableRequest, Triple,
};

/// Pause point for one call. A call held with
/// [`RecordingGraphApi::hold_next`] performs its request, signals
/// [`Hold::reached`] and then waits for [`Hold::release`] before returning,
/// which simulates a slow response carrying data from before the pause. A
/// call paused with [`RecordingGraphApi::pause_next`] waits before the
/// request reaches the wrapped backend, which simulates a slow write that
/// has not been applied yet.
#[derive(Debug, Clone, Default)]
pub struct Hold {
    reached: Arc<Notify>,
    release: Arc<Notify>,
}

impl Hold {
    /// Waits until the held call has its response.
    pub async fn reached(&self) {
        self.reached.notified().await;
    }

    /// Lets the held call return.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

/// Wraps another [`GraphApi`] and records the name of every call.
#[derive(Clone)]
pub struct RecordingGraphApi {
    inner: Arc<dyn GraphApi>,
    calls: Arc<Mutex<Vec<&'static str>>>,
    failures: Arc<Mutex<HashMap<&'static str, VecDeque<GraphError>>>>,
    holds: Arc<Mutex<HashMap<&'static str, Hold>>>,
    pauses: Arc<Mutex<HashMap<&'static str, Hold>>>,
}

impl RecordingGraphApi {
    pub fn new(inner: Arc<dyn GraphApi>) -> Self {
        Self {
            inner,
            calls: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            holds: Arc::new(Mutex::new(HashMap::new())),
            pauses: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Names of all calls so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.calls.lock().iter().filter(|&&c| c == operation).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Makes the next call of `operation` fail with `error` without reaching
    /// the wrapped backend.
    pub fn fail_next(&self, operation: &'static str, error: GraphError) {
        self.failures
            .lock()
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Holds the next call of `operation`; see [`Hold`].
    pub fn hold_next(&self, operation: &'static str) -> Hold {
        let hold = Hold::default();
        self.holds.lock().insert(operation, hold.clone());
        hold
    }

    /// Pauses the next call of `operation` before it reaches the wrapped
    /// backend; see [`Hold`].
    pub fn pause_next(&self, operation: &'static str) -> Hold {
        let hold = Hold::default();
        self.pauses.lock().insert(operation, hold.clone());
        hold
    }

    async fn run<T, F>(&self, operation: &'static str, call: F) -> GraphResult<T>
    where
        F: Future<Output = GraphResult<T>>,
    {
        self.calls.lock().push(operation);

        let failure = self
            .failures
            .lock()
            .get_mut(operation)
            .and_then(VecDeque::pop_front);
        if let Some(error) = failure {
            debug!(operation, %error, "Injected failure");
            return Err(error);
        }

        let pause = self.pauses.lock().remove(operation);
        if let Some(pause) = pause {
            debug!(operation, "Pausing before the call");
            pause.reached.notify_one();
            pause.release.notified().await;
        }

        let result = call.await;

        let hold = self.holds.lock().remove(operation);
        if let Some(hold) = hold {
            debug!(operation, "Holding response");
            hold.reached.notify_one();
            hold.release.notified().await;
        }
        result
    }
}

#[async_trait]
impl GraphApi for RecordingGraphApi {
    async fn list_nodes(&self) -> GraphResult<Vec<Node>> {
        self.run("list_nodes", self.inner.list_nodes()).await
    }

    async fn create_node(&self, label: &str) -> GraphResult<NodeId> {
        self.run("create_node", self.inner.create_node(label)).await
    }

    async fn rename_node(&self, id: NodeId, label: &str) -> GraphResult<Node> {
        self.run("rename_node", self.inner.rename_node(id, label)).await
    }

    async fn delete_node(&self, id: NodeId) -> GraphResult<NodeId> {
        self.run("delete_node", self.inner.delete_node(id)).await
    }

    async fn list_predicates(&self) -> GraphResult<Vec<Predicate>> {
        self.run("list_predicates", self.inner.list_predicates()).await
    }

    async fn create_predicate(&self, predicate: &NewPredicate) -> GraphResult<Predicate> {
        self.run("create_predicate", self.inner.create_predicate(predicate))
            .await
    }

    async fn list_triples(&self) -> GraphResult<Vec<Triple>> {
        self.run("list_triples", self.inner.list_triples()).await
    }

    async fn create_triple(&self, triple: &Triple) -> GraphResult<()> {
        self.run("create_triple", self.inner.create_triple(triple)).await
    }

    async fn delete_triple(&self, triple: &Triple) -> GraphResult<()> {
        self.run("delete_triple", self.inner.delete_triple(triple)).await
    }

    async fn query_rows(&self, request: &TableRequest) -> GraphResult<Vec<Row>> {
        self.run("query_rows", self.inner.query_rows(request)).await
    }

    async fn list_tables(&self) -> GraphResult<Vec<Table>> {
        self.run("list_tables", self.inner.list_tables()).await
    }

    async fn get_table(&self, id: TableId) -> GraphResult<Table> {
        self.run("get_table", self.inner.get_table(id)).await
    }

    async fn create_table(&self, definition: &TableDefinition) -> GraphResult<Vec<Row>> {
        self.run("create_table", self.inner.create_table(definition))
            .await
    }

    async fn update_table(
        &self,
        id: TableId,
        definition: &TableDefinition,
    ) -> GraphResult<Vec<Row>> {
        self.run("update_table", self.inner.update_table(id, definition))
            .await
    }

    async fn delete_table(&self, id: TableId) -> GraphResult<()> {
        self.run("delete_table", self.inner.delete_table(id)).await
    }
}
