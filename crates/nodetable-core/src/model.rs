//! Graph and table data model.
//!
//! Types come in two flavours where the client and the backend disagree on
//! representation: [`Direction`]/[`Filter`] are what a view edits, while
//! [`WireDirection`]/[`WireFilter`] are what goes over HTTP. "Any" never
//! reaches the wire; it is encoded as `null`.

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};
use crate::identifiers::{ColumnId, NodeId, PredicateId, TableId};

/// A labeled vertex of the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub node_id: NodeId,
    pub label: String,
}

/// Payload for node creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNode {
    pub label: String,
}

/// The label/type of a directed edge. Read-only reference data for views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    pub id: PredicateId,
    pub label: String,
}

/// Payload for predicate creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPredicate {
    pub label: String,
}

/// A directed edge instance. Created and deleted by the full three-tuple;
/// uniqueness is not enforced client-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject_id: NodeId,
    pub predicate_id: PredicateId,
    pub object_id: NodeId,
}

impl Triple {
    pub fn new(subject_id: NodeId, predicate_id: PredicateId, object_id: NodeId) -> Self {
        Self {
            subject_id,
            predicate_id,
            object_id,
        }
    }

    /// Whether the triple touches `node` as subject or object.
    pub fn involves(&self, node: NodeId) -> bool {
        self.subject_id == node || self.object_id == node
    }
}

/// Edge traversal orientation relative to a row's node, as selected in a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    In,
    Out,
    #[default]
    Any,
}

impl Direction {
    /// Encodes the direction for the backend; `Any` becomes `None`.
    pub fn to_wire(self) -> Option<WireDirection> {
        match self {
            Direction::In => Some(WireDirection::In),
            Direction::Out => Some(WireDirection::Out),
            Direction::Any => None,
        }
    }

    /// Decodes a backend direction; `None` becomes `Any`.
    pub fn from_wire(direction: Option<WireDirection>) -> Self {
        match direction {
            Some(WireDirection::In) => Direction::In,
            Some(WireDirection::Out) => Direction::Out,
            None => Direction::Any,
        }
    }
}

/// Direction as understood by the backend. There is no "any" variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireDirection {
    In,
    Out,
}

impl WireDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            WireDirection::In => "in",
            WireDirection::Out => "out",
        }
    }
}

/// Base filter of a table view: "nodes connected to `another_node` via
/// `predicate` in `direction`". Unset fields mean "any".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Filter {
    pub predicate: Option<PredicateId>,
    pub direction: Direction,
    pub another_node: Option<NodeId>,
}

impl Filter {
    /// The fully unconstrained filter.
    pub fn any() -> Self {
        Self::default()
    }

    /// Whether every field is "any".
    pub fn is_any(&self) -> bool {
        self.predicate.is_none() && self.direction == Direction::Any && self.another_node.is_none()
    }
}

/// Filter as sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct WireFilter {
    pub node_id: Option<NodeId>,
    pub predicate: Option<PredicateId>,
    pub direction: Option<WireDirection>,
}

impl WireFilter {
    /// Whether the filter selects the unfiltered full node set.
    pub fn is_unfiltered(&self) -> bool {
        self.node_id.is_none() && self.predicate.is_none() && self.direction.is_none()
    }
}

impl From<Filter> for WireFilter {
    fn from(filter: Filter) -> Self {
        WireFilter {
            node_id: filter.another_node,
            predicate: filter.predicate,
            direction: filter.direction.to_wire(),
        }
    }
}

impl From<WireFilter> for Filter {
    fn from(filter: WireFilter) -> Self {
        Filter {
            predicate: filter.predicate,
            direction: Direction::from_wire(filter.direction),
            another_node: filter.node_id,
        }
    }
}

/// Filter applied per row to list connected nodes. `predicate_id: None`
/// matches any predicate, `direction: None` matches either direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct ColumnFilter {
    pub direction: Option<WireDirection>,
    pub predicate_id: Option<PredicateId>,
}

/// One dynamic column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub id: ColumnId,
    pub filter: ColumnFilter,
}

impl ColumnDefinition {
    pub fn new(id: ColumnId, predicate_id: Option<PredicateId>, direction: Direction) -> Self {
        Self {
            id,
            filter: ColumnFilter {
                predicate_id,
                direction: direction.to_wire(),
            },
        }
    }

    /// Column direction as selected in a view.
    pub fn direction(&self) -> Direction {
        Direction::from_wire(self.filter.direction)
    }

    /// The triple that puts `other` into this column's cell of the row for
    /// `row_node`. An "in" column links `other -> row_node`, an "out" column
    /// links `row_node -> other`.
    pub fn triple_for(&self, row_node: NodeId, other: NodeId) -> GraphResult<Triple> {
        let predicate = self.filter.predicate_id.ok_or_else(|| {
            GraphError::Validation(format!("column {} has no predicate", self.id))
        })?;
        match self.filter.direction {
            Some(WireDirection::In) => Ok(Triple::new(other, predicate, row_node)),
            Some(WireDirection::Out) => Ok(Triple::new(row_node, predicate, other)),
            None => Err(GraphError::Validation(format!(
                "column {} has no direction, cannot tell subject from object",
                self.id
            ))),
        }
    }
}

/// A saved named view. Persisted and edited as a whole document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub label: String,
    pub filter: WireFilter,
    pub columns: Vec<ColumnDefinition>,
}

impl TableDefinition {
    /// Label given to tables created without one.
    pub const DEFAULT_LABEL: &'static str = "New Table";

    /// A definition with the given label, no columns and the "any" filter.
    pub fn empty(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            filter: WireFilter::default(),
            columns: Vec::new(),
        }
    }
}

impl Default for TableDefinition {
    fn default() -> Self {
        Self::empty(Self::DEFAULT_LABEL)
    }
}

/// Values of one column for one row: ids of the connected nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub id: ColumnId,
    pub values: Vec<NodeId>,
}

/// One row per node satisfying the table's base filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub node_id: NodeId,
    pub columns: Vec<Cell>,
}

impl Row {
    /// Looks up the cell of a column by id.
    pub fn cell(&self, column: ColumnId) -> Option<&Cell> {
        self.columns.iter().find(|c| c.id == column)
    }
}

/// A saved table together with its current rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    pub def: TableDefinition,
    pub rows: Vec<Row>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_any_direction_is_null_on_the_wire() {
        let column = ColumnDefinition::new(ColumnId(1), Some(PredicateId(3)), Direction::Any);
        let value = serde_json::to_value(&column).unwrap();
        assert_eq!(
            value,
            json!({"id": 1, "filter": {"direction": null, "predicate_id": 3}})
        );
    }

    #[test]
    fn test_filter_wire_conversion() {
        let filter = Filter {
            predicate: Some(PredicateId(2)),
            direction: Direction::Out,
            another_node: Some(NodeId(9)),
        };
        let wire = WireFilter::from(filter);
        assert_eq!(
            serde_json::to_value(wire).unwrap(),
            json!({"node_id": 9, "predicate": 2, "direction": "out"})
        );
        assert_eq!(Filter::from(wire), filter);
    }

    #[test]
    fn test_any_filter_is_unfiltered() {
        assert!(Filter::any().is_any());
        assert!(WireFilter::from(Filter::any()).is_unfiltered());
    }

    #[test]
    fn test_cell_link_orientation() {
        let incoming = ColumnDefinition::new(ColumnId(1), Some(PredicateId(4)), Direction::In);
        let outgoing = ColumnDefinition::new(ColumnId(2), Some(PredicateId(4)), Direction::Out);

        assert_eq!(
            incoming.triple_for(NodeId(1), NodeId(2)).unwrap(),
            Triple::new(NodeId(2), PredicateId(4), NodeId(1))
        );
        assert_eq!(
            outgoing.triple_for(NodeId(1), NodeId(2)).unwrap(),
            Triple::new(NodeId(1), PredicateId(4), NodeId(2))
        );
    }

    #[test]
    fn test_cell_link_needs_direction_and_predicate() {
        let any = ColumnDefinition::new(ColumnId(1), Some(PredicateId(4)), Direction::Any);
        let placeholder = ColumnDefinition::new(ColumnId(2), None, Direction::In);

        assert!(matches!(
            any.triple_for(NodeId(1), NodeId(2)),
            Err(GraphError::Validation(_))
        ));
        assert!(matches!(
            placeholder.triple_for(NodeId(1), NodeId(2)),
            Err(GraphError::Validation(_))
        ));
    }

    #[test]
    fn test_table_decodes_backend_payload() {
        let payload = json!({
            "id": 4,
            "def": {
                "label": "People",
                "filter": {"node_id": null, "predicate": null, "direction": null},
                "columns": [{"id": 1, "filter": {"predicate_id": 3, "direction": "in"}}]
            },
            "rows": [{"node_id": 10, "columns": [{"id": 1, "values": [11, 12]}]}]
        });
        let table: Table = serde_json::from_value(payload).unwrap();
        assert_eq!(table.id, TableId(4));
        assert_eq!(table.def.columns[0].direction(), Direction::In);
        assert_eq!(
            table.rows[0].cell(ColumnId(1)).map(|c| c.values.clone()),
            Some(vec![NodeId(11), NodeId(12)])
        );
    }
}
