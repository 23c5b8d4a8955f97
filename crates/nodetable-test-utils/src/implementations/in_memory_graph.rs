//! In-memory implementation of the GraphApi trait.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use nodetable_client::GraphApi;
use nodetable_core::{
    Cell, ColumnDefinition, GraphError, GraphResult, NewPredicate, Node, NodeId, Predicate,
    PredicateId, Row, Table, TableDefinition, TableId, TableRequest, Triple, WireDirection,
    WireFilter,
};

#[derive(Debug, Default, Clone)]
struct GraphState {
    nodes: BTreeMap<NodeId, String>,
    predicates: BTreeMap<PredicateId, String>,
    triples: Vec<Triple>,
    tables: BTreeMap<TableId, TableDefinition>,
}

impl GraphState {
    /// Whether `triple` links `node` the way `filter` asks: `out` means
    /// `node` is the subject, `in` means it is the object, no direction
    /// accepts either. Unset predicate or anchor match anything.
    fn links(filter: &WireFilter, triple: &Triple, node: NodeId) -> bool {
        if filter.predicate.map_or(false, |p| p != triple.predicate_id) {
            return false;
        }
        let anchored = |other: NodeId| filter.node_id.map_or(true, |anchor| anchor == other);
        let outgoing = triple.subject_id == node && anchored(triple.object_id);
        let incoming = triple.object_id == node && anchored(triple.subject_id);
        match filter.direction {
            Some(WireDirection::Out) => outgoing,
            Some(WireDirection::In) => incoming,
            None => outgoing || incoming,
        }
    }

    /// Base node set of a filter, ordered by id. An anchor-only filter
    /// selects the anchor's neighbours here; the HTTP backend treats it as
    /// unfiltered.
    fn base_nodes(&self, filter: &WireFilter) -> Vec<NodeId> {
        self.nodes
            .keys()
            .copied()
            .filter(|node| {
                filter.is_unfiltered()
                    || self.triples.iter().any(|t| Self::links(filter, t, *node))
            })
            .collect()
    }

    /// Values of one column for the row of `node`.
    fn cell(&self, column: &ColumnDefinition, node: NodeId) -> Cell {
        let mut values = BTreeSet::new();
        for triple in &self.triples {
            if column
                .filter
                .predicate_id
                .map_or(false, |p| p != triple.predicate_id)
            {
                continue;
            }
            let out = matches!(column.filter.direction, None | Some(WireDirection::Out));
            let inc = matches!(column.filter.direction, None | Some(WireDirection::In));
            if out && triple.subject_id == node {
                values.insert(triple.object_id);
            }
            if inc && triple.object_id == node {
                values.insert(triple.subject_id);
            }
        }
        Cell {
            id: column.id,
            values: values.into_iter().collect(),
        }
    }

    fn rows(&self, filter: &WireFilter, columns: &[ColumnDefinition]) -> Vec<Row> {
        self.base_nodes(filter)
            .into_iter()
            .map(|node| Row {
                node_id: node,
                columns: columns.iter().map(|c| self.cell(c, node)).collect(),
            })
            .collect()
    }

    fn table(&self, id: TableId, definition: &TableDefinition) -> Table {
        Table {
            id,
            def: definition.clone(),
            rows: self.rows(&definition.filter, &definition.columns),
        }
    }

    fn require_node(&self, id: NodeId) -> GraphResult<()> {
        if self.nodes.contains_key(&id) {
            Ok(())
        } else {
            Err(GraphError::not_found("Node", id))
        }
    }
}

/// Next id as `max + 1` over existing raw ids.
fn next_id(existing: impl Iterator<Item = i64>) -> i64 {
    existing.max().unwrap_or(0) + 1
}

/// Thread-safe in-memory backend for testing.
///
/// Ids are assigned as `max + 1` per entity. Deleting a node removes the
/// triples that reference it.
#[derive(Clone, Default)]
pub struct InMemoryGraphApi {
    state: Arc<RwLock<GraphState>>,
}

impl fmt::Debug for InMemoryGraphApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("InMemoryGraphApi")
            .field("node_count", &state.nodes.len())
            .field("triple_count", &state.triples.len())
            .field("table_count", &state.tables.len())
            .finish()
    }
}

impl InMemoryGraphApi {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node with a fixed id, bypassing id assignment.
    pub fn insert_node(&self, id: NodeId, label: &str) -> &Self {
        self.state.write().nodes.insert(id, label.to_string());
        self
    }

    /// Adds a predicate with a fixed id.
    pub fn insert_predicate(&self, id: PredicateId, label: &str) -> &Self {
        self.state.write().predicates.insert(id, label.to_string());
        self
    }

    /// Adds a triple without checking its nodes.
    pub fn insert_triple(&self, triple: Triple) -> &Self {
        self.state.write().triples.push(triple);
        self
    }

    /// Stores a table definition under a fixed id.
    pub fn insert_table(&self, id: TableId, definition: TableDefinition) -> &Self {
        self.state.write().tables.insert(id, definition);
        self
    }

    /// Stored definition of a table, for inspection in tests.
    pub fn table_definition(&self, id: TableId) -> Option<TableDefinition> {
        self.state.read().tables.get(&id).cloned()
    }

    /// Snapshot of all triples, for inspection in tests.
    pub fn triples(&self) -> Vec<Triple> {
        self.state.read().triples.clone()
    }

    /// Clears all stored data.
    pub fn clear(&self) {
        *self.state.write() = GraphState::default();
    }
}

#[async_trait]
impl GraphApi for InMemoryGraphApi {
    async fn list_nodes(&self) -> GraphResult<Vec<Node>> {
        Ok(self
            .state
            .read()
            .nodes
            .iter()
            .map(|(id, label)| Node {
                node_id: *id,
                label: label.clone(),
            })
            .collect())
    }

    async fn create_node(&self, label: &str) -> GraphResult<NodeId> {
        let mut state = self.state.write();
        let id = NodeId(next_id(state.nodes.keys().map(|k| k.get())));
        state.nodes.insert(id, label.to_string());
        Ok(id)
    }

    async fn rename_node(&self, id: NodeId, label: &str) -> GraphResult<Node> {
        let mut state = self.state.write();
        let current = state
            .nodes
            .get_mut(&id)
            .ok_or_else(|| GraphError::not_found("Node", id))?;
        *current = label.to_string();
        Ok(Node {
            node_id: id,
            label: label.to_string(),
        })
    }

    async fn delete_node(&self, id: NodeId) -> GraphResult<NodeId> {
        let mut state = self.state.write();
        state.nodes.remove(&id);
        state.triples.retain(|t| !t.involves(id));
        Ok(id)
    }

    async fn list_predicates(&self) -> GraphResult<Vec<Predicate>> {
        Ok(self
            .state
            .read()
            .predicates
            .iter()
            .map(|(id, label)| Predicate {
                id: *id,
                label: label.clone(),
            })
            .collect())
    }

    async fn create_predicate(&self, predicate: &NewPredicate) -> GraphResult<Predicate> {
        let mut state = self.state.write();
        let id = PredicateId(next_id(state.predicates.keys().map(|k| k.get())));
        state.predicates.insert(id, predicate.label.clone());
        Ok(Predicate {
            id,
            label: predicate.label.clone(),
        })
    }

    async fn list_triples(&self) -> GraphResult<Vec<Triple>> {
        Ok(self.state.read().triples.clone())
    }

    async fn create_triple(&self, triple: &Triple) -> GraphResult<()> {
        let mut state = self.state.write();
        state.require_node(triple.subject_id)?;
        state.require_node(triple.object_id)?;
        state.triples.push(*triple);
        Ok(())
    }

    async fn delete_triple(&self, triple: &Triple) -> GraphResult<()> {
        self.state.write().triples.retain(|t| t != triple);
        Ok(())
    }

    async fn query_rows(&self, request: &TableRequest) -> GraphResult<Vec<Row>> {
        Ok(self.state.read().rows(&request.filter, &request.columns))
    }

    async fn list_tables(&self) -> GraphResult<Vec<Table>> {
        let state = self.state.read();
        Ok(state
            .tables
            .iter()
            .map(|(id, definition)| state.table(*id, definition))
            .collect())
    }

    async fn get_table(&self, id: TableId) -> GraphResult<Table> {
        let state = self.state.read();
        let definition = state
            .tables
            .get(&id)
            .ok_or_else(|| GraphError::not_found("Table", id))?;
        Ok(state.table(id, definition))
    }

    async fn create_table(&self, definition: &TableDefinition) -> GraphResult<Vec<Row>> {
        let mut state = self.state.write();
        let id = TableId(next_id(state.tables.keys().map(|k| k.get())));
        state.tables.insert(id, definition.clone());
        Ok(state.rows(&definition.filter, &definition.columns))
    }

    async fn update_table(
        &self,
        id: TableId,
        definition: &TableDefinition,
    ) -> GraphResult<Vec<Row>> {
        let mut state = self.state.write();
        // The backend stores under any id it is given
        state.tables.insert(id, definition.clone());
        Ok(state.rows(&definition.filter, &definition.columns))
    }

    async fn delete_table(&self, id: TableId) -> GraphResult<()> {
        self.state
            .write()
            .tables
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| GraphError::not_found("Table", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, ALICE, BOB, CAROL, KNOWS, WORKS_AT, ACME};
    use nodetable_core::{ColumnId, Direction, Filter, TableQuery};
    use pretty_assertions::assert_eq;

    fn ids(rows: &[Row]) -> Vec<NodeId> {
        rows.iter().map(|r| r.node_id).collect()
    }

    #[tokio::test]
    async fn test_unfiltered_rows_cover_every_node() {
        let api = fixtures::sample_graph();
        let rows = api
            .query_rows(&TableQuery::new(Filter::any()).build())
            .await
            .unwrap();
        assert_eq!(ids(&rows), vec![ALICE, BOB, CAROL, ACME]);
    }

    #[tokio::test]
    async fn test_filter_direction_is_relative_to_row_node() {
        let api = fixtures::sample_graph();

        // Nodes that point at Acme via works_at
        let out = Filter {
            predicate: Some(WORKS_AT),
            direction: Direction::Out,
            another_node: Some(ACME),
        };
        let rows = api.query_rows(&TableQuery::new(out).build()).await.unwrap();
        assert_eq!(ids(&rows), vec![ALICE, CAROL]);

        // Nodes Alice points at via knows
        let incoming = Filter {
            predicate: Some(KNOWS),
            direction: Direction::In,
            another_node: Some(ALICE),
        };
        let rows = api.query_rows(&TableQuery::new(incoming).build()).await.unwrap();
        assert_eq!(ids(&rows), vec![BOB]);
    }

    #[tokio::test]
    async fn test_anchor_only_filter_selects_all_neighbors() {
        let api = fixtures::sample_graph();
        let rows = api
            .query_rows(&TableRequest::neighbors(BOB, Direction::Any))
            .await
            .unwrap();
        assert_eq!(ids(&rows), vec![ALICE, CAROL]);
    }

    #[tokio::test]
    async fn test_column_values_sorted_and_unique() {
        let api = fixtures::sample_graph();
        // Duplicate edge must not produce a duplicate value
        api.insert_triple(Triple::new(ALICE, KNOWS, BOB));

        let request = TableQuery::new(Filter::any())
            .column(ColumnDefinition::new(ColumnId(1), Some(KNOWS), Direction::Any))
            .column(ColumnDefinition::new(ColumnId(2), None, Direction::Out))
            .build();
        let rows = api.query_rows(&request).await.unwrap();

        let bob = rows.iter().find(|r| r.node_id == BOB).unwrap();
        assert_eq!(bob.cell(ColumnId(1)).unwrap().values, vec![ALICE, CAROL]);
        let alice = rows.iter().find(|r| r.node_id == ALICE).unwrap();
        assert_eq!(alice.cell(ColumnId(2)).unwrap().values, vec![BOB, ACME]);
    }

    #[tokio::test]
    async fn test_delete_node_removes_its_triples() {
        let api = fixtures::sample_graph();
        api.delete_node(BOB).await.unwrap();
        assert!(api.triples().iter().all(|t| !t.involves(BOB)));
        assert_eq!(api.create_node("Dave").await.unwrap(), NodeId(5));
    }

    #[tokio::test]
    async fn test_missing_table_is_not_found() {
        let api = InMemoryGraphApi::new();
        assert!(api.get_table(TableId(1)).await.unwrap_err().is_not_found());
        assert!(api.delete_table(TableId(1)).await.unwrap_err().is_not_found());
    }
}
