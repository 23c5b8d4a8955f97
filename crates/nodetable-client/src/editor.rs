//! Editing of saved tables.
//!
//! A table definition is persisted as one document. Every schema edit reads
//! the current definition from the backend, transforms it and writes the
//! whole document back. Concurrent editors are not coordinated: the last
//! write wins.
//!
//! Column ids only grow. The editor remembers the highest id it has seen in
//! any definition it read, so removing the last column and adding another
//! never hands the same id out twice.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use tracing::{debug, instrument};

use nodetable_core::{
    ColumnDefinition, ColumnId, ColumnSet, Direction, Filter, GraphError, NodeId, PredicateId,
    Row, TableDefinition, TableId,
};

use crate::invalidation::Mutation;
use crate::session::{GraphSession, MutationError};

/// Read-modify-write editor for one saved table
#[derive(Debug, Clone)]
pub struct TableEditor {
    session: GraphSession,
    table_id: TableId,
    /// Highest column id seen or handed out, shared by clones
    last_column_id: Arc<AtomicI64>,
}

impl TableEditor {
    pub fn new(session: GraphSession, table_id: TableId) -> Self {
        Self {
            session,
            table_id,
            last_column_id: Arc::new(AtomicI64::new(0)),
        }
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    /// Saves a new empty table. A blank label falls back to
    /// [`TableDefinition::DEFAULT_LABEL`].
    pub async fn create_table(
        session: &GraphSession,
        label: Option<&str>,
    ) -> Result<Vec<Row>, MutationError> {
        let definition = match label.map(str::trim) {
            Some(label) if !label.is_empty() => TableDefinition::empty(label),
            _ => TableDefinition::default(),
        };
        session.create_table(&definition).await
    }

    pub async fn delete_table(self) -> Result<(), MutationError> {
        self.session.delete_table(self.table_id).await
    }

    /// Current definition, read from the backend rather than the cache.
    pub async fn definition(&self) -> Result<TableDefinition, MutationError> {
        let table = self
            .session
            .fresh_table(self.table_id)
            .await
            .map_err(|source| self.error(source))?;
        let highest = ColumnSet::from_definitions(&table.def.columns).last_id();
        self.last_column_id.fetch_max(highest, Ordering::SeqCst);
        Ok(table.def.clone())
    }

    /// Appends a column and returns its id. `predicate` may be left unset
    /// until the user picks one.
    #[instrument(skip(self), fields(table_id = %self.table_id))]
    pub async fn add_column(
        &self,
        predicate: Option<PredicateId>,
        direction: Direction,
    ) -> Result<ColumnId, MutationError> {
        let mut definition = self.definition().await?;
        let (columns, id) = ColumnSet::from_definitions(&definition.columns)
            .with_last_id(self.last_column_id.load(Ordering::SeqCst))
            .append(predicate, direction);
        self.last_column_id.fetch_max(id.get(), Ordering::SeqCst);
        definition.columns = columns.to_definitions();

        self.save(&definition).await?;
        debug!(column_id = %id, "Added column");
        Ok(id)
    }

    /// Changes predicate and/or direction of a column. `None` leaves the
    /// field unchanged.
    #[instrument(skip(self), fields(table_id = %self.table_id))]
    pub async fn change_column(
        &self,
        id: ColumnId,
        predicate: Option<PredicateId>,
        direction: Option<Direction>,
    ) -> Result<Vec<Row>, MutationError> {
        self.modify(|definition| {
            let columns = ColumnSet::from_definitions(&definition.columns)
                .update(id, predicate, direction)?;
            definition.columns = columns.to_definitions();
            Ok(())
        })
        .await
    }

    #[instrument(skip(self), fields(table_id = %self.table_id))]
    pub async fn remove_column(&self, id: ColumnId) -> Result<Vec<Row>, MutationError> {
        self.modify(|definition| {
            let columns = ColumnSet::from_definitions(&definition.columns).remove(id)?;
            definition.columns = columns.to_definitions();
            Ok(())
        })
        .await
    }

    /// Replaces the base filter.
    #[instrument(skip(self), fields(table_id = %self.table_id))]
    pub async fn set_filter(&self, filter: Filter) -> Result<Vec<Row>, MutationError> {
        self.modify(|definition| {
            definition.filter = filter.into();
            Ok(())
        })
        .await
    }

    #[instrument(skip(self), fields(table_id = %self.table_id))]
    pub async fn rename(&self, label: &str) -> Result<Vec<Row>, MutationError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(self.error(GraphError::Validation(
                "table label must not be empty".to_string(),
            )));
        }
        self.modify(|definition| {
            definition.label = label.to_string();
            Ok(())
        })
        .await
    }

    /// Adds `other` to the cell of `column` in the row of `row_node` by
    /// creating the implied triple. Columns without a predicate or with the
    /// "any" direction cannot be edited.
    pub async fn link(
        &self,
        column: &ColumnDefinition,
        row_node: NodeId,
        other: NodeId,
    ) -> Result<(), MutationError> {
        let triple = column
            .triple_for(row_node, other)
            .map_err(|source| self.error(source))?;
        self.session.create_triple(triple).await
    }

    /// Removes `other` from the cell of `column` in the row of `row_node` by
    /// deleting the implied triple.
    pub async fn unlink(
        &self,
        column: &ColumnDefinition,
        row_node: NodeId,
        other: NodeId,
    ) -> Result<(), MutationError> {
        let triple = column
            .triple_for(row_node, other)
            .map_err(|source| self.error(source))?;
        self.session.delete_triple(triple).await
    }

    async fn modify<F>(&self, transform: F) -> Result<Vec<Row>, MutationError>
    where
        F: FnOnce(&mut TableDefinition) -> Result<(), GraphError>,
    {
        let mut definition = self.definition().await?;
        transform(&mut definition).map_err(|source| self.error(source))?;
        self.save(&definition).await
    }

    async fn save(&self, definition: &TableDefinition) -> Result<Vec<Row>, MutationError> {
        self.session.update_table(self.table_id, definition).await
    }

    fn error(&self, source: GraphError) -> MutationError {
        MutationError {
            mutation: Mutation::UpdateTable(self.table_id),
            source,
        }
    }
}
