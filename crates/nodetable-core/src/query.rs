//! Graph query builder.
//!
//! Turns a base [`Filter`] and a set of [`ColumnDefinition`]s into the single
//! request body that asks the backend for the whole row set in one round
//! trip. Rows and their per-column values are always fetched together; there
//! is no per-row or per-column request.

use serde::{Deserialize, Serialize};

use crate::identifiers::NodeId;
use crate::model::{ColumnDefinition, Direction, Filter, WireFilter};

/// Request body of the combined rows read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct TableRequest {
    pub filter: WireFilter,
    pub columns: Vec<ColumnDefinition>,
}

impl TableRequest {
    /// Whether the request asks for every node of the graph.
    pub fn is_unfiltered(&self) -> bool {
        self.filter.is_unfiltered()
    }

    /// Request for the nodes connected to `node` in `direction`, without
    /// dynamic columns.
    pub fn neighbors(node: NodeId, direction: Direction) -> Self {
        TableQuery::new(Filter {
            predicate: None,
            direction,
            another_node: Some(node),
        })
        .build()
    }

    /// Request for the node set selected by `filter`, without dynamic columns.
    pub fn filtered_nodes(filter: Filter) -> Self {
        TableQuery::new(filter).build()
    }
}

/// Builder for [`TableRequest`].
#[derive(Debug, Clone, Default)]
pub struct TableQuery {
    filter: WireFilter,
    columns: Vec<ColumnDefinition>,
}

impl TableQuery {
    /// Starts a query from a view filter.
    pub fn new(filter: Filter) -> Self {
        Self {
            filter: filter.into(),
            columns: Vec::new(),
        }
    }

    /// Starts a query from a filter already in wire form, as stored in a
    /// saved table definition.
    pub fn from_wire(filter: WireFilter) -> Self {
        Self {
            filter,
            columns: Vec::new(),
        }
    }

    /// Appends one column.
    pub fn column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    /// Appends columns, keeping their order.
    pub fn columns<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = ColumnDefinition>,
    {
        self.columns.extend(columns);
        self
    }

    pub fn build(self) -> TableRequest {
        TableRequest {
            filter: self.filter,
            columns: self.columns,
        }
    }
}
