//! Cache keys and key scopes.

use nodetable_core::{
    ColumnDefinition, Direction, Filter, NodeId, TableId, TableQuery, TableRequest, WireFilter,
};

/// Identity of one cached query. Two reads with equal keys share one entry;
/// different kinds of data can never collide since the variant is part of
/// the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Nodes,
    Predicates,
    Triples,
    Tables,
    Table(TableId),
    /// Ad-hoc rows for a filter plus columns
    Rows(TableRequest),
    /// Node ids selected by a filter, without columns
    FilteredNodes(WireFilter),
    /// Nodes linked to `node` in `direction`
    Neighbors { node: NodeId, direction: Direction },
}

impl QueryKey {
    pub fn rows(filter: Filter, columns: &[ColumnDefinition]) -> Self {
        QueryKey::Rows(
            TableQuery::new(filter)
                .columns(columns.iter().cloned())
                .build(),
        )
    }

    pub fn filtered_nodes(filter: Filter) -> Self {
        QueryKey::FilteredNodes(filter.into())
    }

    pub fn neighbors(node: NodeId, direction: Direction) -> Self {
        QueryKey::Neighbors { node, direction }
    }

    pub fn kind(&self) -> QueryKind {
        match self {
            QueryKey::Nodes => QueryKind::Nodes,
            QueryKey::Predicates => QueryKind::Predicates,
            QueryKey::Triples => QueryKind::Triples,
            QueryKey::Tables => QueryKind::Tables,
            QueryKey::Table(_) => QueryKind::Table,
            QueryKey::Rows(_) => QueryKind::Rows,
            QueryKey::FilteredNodes(_) => QueryKind::FilteredNodes,
            QueryKey::Neighbors { .. } => QueryKind::Neighbors,
        }
    }

    /// Whether entries for this key go stale once `stale_after` has elapsed.
    /// Nodes and predicates only go stale through invalidation.
    pub fn expires_by_time(&self) -> bool {
        !matches!(self.kind(), QueryKind::Nodes | QueryKind::Predicates)
    }

    /// The rows request that answers this key, for keys served by the rows
    /// endpoint.
    pub fn rows_request(&self) -> Option<TableRequest> {
        match self {
            QueryKey::Rows(request) => Some(request.clone()),
            QueryKey::FilteredNodes(filter) => Some(TableQuery::from_wire(*filter).build()),
            QueryKey::Neighbors { node, direction } => {
                Some(TableRequest::neighbors(*node, *direction))
            }
            _ => None,
        }
    }
}

/// Kind of a [`QueryKey`], without its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Nodes,
    Predicates,
    Triples,
    Tables,
    Table,
    Rows,
    FilteredNodes,
    Neighbors,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Nodes => "nodes",
            QueryKind::Predicates => "predicates",
            QueryKind::Triples => "triples",
            QueryKind::Tables => "tables",
            QueryKind::Table => "table",
            QueryKind::Rows => "rows",
            QueryKind::FilteredNodes => "filtered_nodes",
            QueryKind::Neighbors => "neighbors",
        }
    }
}

/// Selects the keys a cancel or invalidate applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyScope {
    Exact(QueryKey),
    /// Every `Table(_)` key
    AllTables,
    /// Every `Rows(_)` key
    AllRows,
    /// Every `FilteredNodes(_)` key
    AllFilteredNodes,
    /// Every `Neighbors { .. }` key
    AllNeighbors,
}

impl KeyScope {
    pub fn matches(&self, key: &QueryKey) -> bool {
        match self {
            KeyScope::Exact(exact) => exact == key,
            KeyScope::AllTables => key.kind() == QueryKind::Table,
            KeyScope::AllRows => key.kind() == QueryKind::Rows,
            KeyScope::AllFilteredNodes => key.kind() == QueryKind::FilteredNodes,
            KeyScope::AllNeighbors => key.kind() == QueryKind::Neighbors,
        }
    }

    /// Every key whose data is derived from nodes and triples: saved tables
    /// with their rows, ad-hoc rows and node sets.
    pub fn row_bearing() -> Vec<KeyScope> {
        vec![
            KeyScope::Exact(QueryKey::Tables),
            KeyScope::AllTables,
            KeyScope::AllRows,
            KeyScope::AllFilteredNodes,
            KeyScope::AllNeighbors,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodetable_core::{ColumnId, PredicateId};

    #[test]
    fn test_equal_parameters_give_equal_keys() {
        let columns = vec![ColumnDefinition::new(ColumnId(1), Some(PredicateId(2)), Direction::In)];
        assert_eq!(
            QueryKey::rows(Filter::any(), &columns),
            QueryKey::rows(Filter::any(), &columns)
        );
        assert_ne!(
            QueryKey::rows(Filter::any(), &columns),
            QueryKey::rows(Filter::any(), &[])
        );
    }

    #[test]
    fn test_kinds_never_share_a_key() {
        // Same request parameters, different kinds
        let rows = QueryKey::rows(Filter::any(), &[]);
        let filtered = QueryKey::filtered_nodes(Filter::any());
        assert_ne!(rows, filtered);
        assert_eq!(rows.rows_request(), filtered.rows_request());
    }

    #[test]
    fn test_scope_matching() {
        let table = QueryKey::Table(TableId(1));
        assert!(KeyScope::AllTables.matches(&table));
        assert!(KeyScope::Exact(QueryKey::Table(TableId(1))).matches(&table));
        assert!(!KeyScope::Exact(QueryKey::Table(TableId(2))).matches(&table));
        assert!(!KeyScope::AllTables.matches(&QueryKey::Tables));
        assert!(!KeyScope::row_bearing()
            .iter()
            .any(|scope| scope.matches(&QueryKey::Predicates)));
    }

    #[test]
    fn test_time_staleness_policy() {
        assert!(!QueryKey::Nodes.expires_by_time());
        assert!(!QueryKey::Predicates.expires_by_time());
        assert!(QueryKey::Tables.expires_by_time());
        assert!(QueryKey::neighbors(NodeId(1), Direction::Any).expires_by_time());
    }
}
