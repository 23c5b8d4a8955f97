//! A small sample graph shared by tests.
//!
//! ```text
//! Alice -knows-> Bob -knows-> Carol
//! Alice -works_at-> Acme <-works_at- Carol
//! ```

use nodetable_core::{
    ColumnDefinition, ColumnId, Direction, NodeId, PredicateId, TableDefinition, TableId, Triple,
    WireFilter,
};

use crate::implementations::InMemoryGraphApi;

pub const ALICE: NodeId = NodeId(1);
pub const BOB: NodeId = NodeId(2);
pub const CAROL: NodeId = NodeId(3);
pub const ACME: NodeId = NodeId(4);

pub const KNOWS: PredicateId = PredicateId(1);
pub const WORKS_AT: PredicateId = PredicateId(2);

/// Saved table over every node with a "knows (out)" and a "works_at (out)"
/// column.
pub const PEOPLE_TABLE: TableId = TableId(1);

pub fn people_table() -> TableDefinition {
    TableDefinition {
        label: "People".to_string(),
        filter: WireFilter::default(),
        columns: vec![
            ColumnDefinition::new(ColumnId(1), Some(KNOWS), Direction::Out),
            ColumnDefinition::new(ColumnId(2), Some(WORKS_AT), Direction::Out),
        ],
    }
}

/// Backend holding the sample graph and the people table.
pub fn sample_graph() -> InMemoryGraphApi {
    let api = InMemoryGraphApi::new();
    api.insert_node(ALICE, "Alice")
        .insert_node(BOB, "Bob")
        .insert_node(CAROL, "Carol")
        .insert_node(ACME, "Acme")
        .insert_predicate(KNOWS, "knows")
        .insert_predicate(WORKS_AT, "works_at")
        .insert_triple(Triple::new(ALICE, KNOWS, BOB))
        .insert_triple(Triple::new(BOB, KNOWS, CAROL))
        .insert_triple(Triple::new(ALICE, WORKS_AT, ACME))
        .insert_triple(Triple::new(CAROL, WORKS_AT, ACME))
        .insert_table(PEOPLE_TABLE, people_table());
    api
}
