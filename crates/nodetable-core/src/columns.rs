//! Dynamic column state of a table view.
//!
//! A [`ColumnSet`] is persistent: every operation returns a new set and
//! leaves the receiver untouched, so a view can keep the previous set while a
//! write is in flight. Entries that an operation does not modify are shared
//! with the previous set (same `Arc`).

use std::sync::Arc;

use tracing::debug;

use crate::error::{GraphError, GraphResult};
use crate::identifiers::{ColumnId, PredicateId};
use crate::model::{ColumnDefinition, Direction};

/// Ordered sequence of column definitions plus the id counter.
#[derive(Debug, Clone, Default)]
pub struct ColumnSet {
    columns: Vec<Arc<ColumnDefinition>>,
    /// Highest id ever handed out by this set or seen in its input.
    last_id: i64,
}

impl ColumnSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the state from a stored definition. The id counter starts
    /// after the highest id present.
    pub fn from_definitions(columns: &[ColumnDefinition]) -> Self {
        let last_id = columns.iter().map(|c| c.id.get()).max().unwrap_or(0);
        Self {
            columns: columns.iter().cloned().map(Arc::new).collect(),
            last_id,
        }
    }

    /// Raises the id counter to at least `last_id`, for ids handed out
    /// earlier that are no longer present.
    pub fn with_last_id(mut self, last_id: i64) -> Self {
        self.last_id = self.last_id.max(last_id);
        self
    }

    /// Highest id handed out or seen so far.
    pub fn last_id(&self) -> i64 {
        self.last_id
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ColumnDefinition>> {
        self.columns.iter()
    }

    pub fn get(&self, id: ColumnId) -> Option<&Arc<ColumnDefinition>> {
        self.columns.iter().find(|c| c.id == id)
    }

    /// Appends a column with a fresh id. `predicate` may be `None` as a
    /// placeholder until the user picks one.
    pub fn append(&self, predicate: Option<PredicateId>, direction: Direction) -> (Self, ColumnId) {
        let id = ColumnId(self.last_id + 1);
        let mut columns = self.columns.clone();
        columns.push(Arc::new(ColumnDefinition::new(id, predicate, direction)));
        debug!(column_id = %id, "Appended column");
        (
            Self {
                columns,
                last_id: id.get(),
            },
            id,
        )
    }

    /// Changes the predicate and/or direction of one column. A `None`
    /// argument leaves that field as it was.
    pub fn update(
        &self,
        id: ColumnId,
        predicate: Option<PredicateId>,
        direction: Option<Direction>,
    ) -> GraphResult<Self> {
        let position = self.position(id)?;
        let current = &self.columns[position];

        let mut updated = ColumnDefinition::clone(current);
        if let Some(predicate) = predicate {
            updated.filter.predicate_id = Some(predicate);
        }
        if let Some(direction) = direction {
            updated.filter.direction = direction.to_wire();
        }

        let mut columns = self.columns.clone();
        if updated != **current {
            columns[position] = Arc::new(updated);
        }
        Ok(Self {
            columns,
            last_id: self.last_id,
        })
    }

    /// Removes one column. The id counter is not rewound.
    pub fn remove(&self, id: ColumnId) -> GraphResult<Self> {
        let position = self.position(id)?;
        let mut columns = self.columns.clone();
        columns.remove(position);
        Ok(Self {
            columns,
            last_id: self.last_id,
        })
    }

    /// Plain definitions in order, for persisting.
    pub fn to_definitions(&self) -> Vec<ColumnDefinition> {
        self.columns.iter().map(|c| ColumnDefinition::clone(c)).collect()
    }

    fn position(&self, id: ColumnId) -> GraphResult<usize> {
        self.columns
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| GraphError::not_found("Column", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn three_columns() -> ColumnSet {
        let (set, _) = ColumnSet::new().append(Some(PredicateId(1)), Direction::In);
        let (set, _) = set.append(Some(PredicateId(2)), Direction::Out);
        let (set, _) = set.append(Some(PredicateId(3)), Direction::Any);
        set
    }

    #[test]
    fn test_append_assigns_incrementing_ids() {
        let set = three_columns();
        let ids: Vec<i64> = set.iter().map(|c| c.id.get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_update_changes_only_target_column() {
        let set = three_columns();
        let updated = set
            .update(ColumnId(2), Some(PredicateId(9)), None)
            .unwrap();

        let target = updated.get(ColumnId(2)).unwrap();
        assert_eq!(target.filter.predicate_id, Some(PredicateId(9)));
        // Direction was not given, so it stays "out"
        assert_eq!(target.direction(), Direction::Out);

        // Untouched entries are the very same allocations
        assert!(Arc::ptr_eq(set.get(ColumnId(1)).unwrap(), updated.get(ColumnId(1)).unwrap()));
        assert!(Arc::ptr_eq(set.get(ColumnId(3)).unwrap(), updated.get(ColumnId(3)).unwrap()));
        assert!(!Arc::ptr_eq(set.get(ColumnId(2)).unwrap(), target));
    }

    #[test]
    fn test_direction_only_update() {
        let set = three_columns();
        let updated = set.update(ColumnId(1), None, Some(Direction::Any)).unwrap();
        let column = updated.get(ColumnId(1)).unwrap();
        assert_eq!(column.direction(), Direction::Any);
        assert_eq!(column.filter.predicate_id, Some(PredicateId(1)));
    }

    #[test]
    fn test_noop_update_keeps_allocation() {
        let set = three_columns();
        let updated = set.update(ColumnId(3), None, None).unwrap();
        assert!(Arc::ptr_eq(set.get(ColumnId(3)).unwrap(), updated.get(ColumnId(3)).unwrap()));
    }

    #[test]
    fn test_id_not_reused_after_removal() {
        let set = three_columns();
        let set = set.remove(ColumnId(1)).unwrap();
        let (set, new_id) = set.append(Some(PredicateId(4)), Direction::Out);

        assert_eq!(new_id, ColumnId(4));
        let ids: Vec<ColumnId> = set.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![ColumnId(2), ColumnId(3), ColumnId(4)]);
    }

    #[test]
    fn test_loaded_state_does_not_collide() {
        // Ids with a gap, as left behind by earlier deletions
        let stored = vec![
            ColumnDefinition::new(ColumnId(2), Some(PredicateId(1)), Direction::In),
            ColumnDefinition::new(ColumnId(5), Some(PredicateId(1)), Direction::Out),
        ];
        let set = ColumnSet::from_definitions(&stored);
        let (_, new_id) = set.append(None, Direction::Any);
        assert_eq!(new_id, ColumnId(6));
    }

    #[test]
    fn test_removed_highest_id_is_not_handed_out_again() {
        let stored = vec![
            ColumnDefinition::new(ColumnId(1), Some(PredicateId(1)), Direction::In),
            ColumnDefinition::new(ColumnId(2), Some(PredicateId(1)), Direction::Out),
        ];
        let before = ColumnSet::from_definitions(&stored);
        let after = before.remove(ColumnId(2)).unwrap();

        // Reloaded from the saved definition, the counter needs the old mark
        let reloaded = ColumnSet::from_definitions(&after.to_definitions());
        assert_eq!(reloaded.last_id(), 1);
        let (_, new_id) = reloaded.with_last_id(before.last_id()).append(None, Direction::In);
        assert_eq!(new_id, ColumnId(3));
    }

    #[test]
    fn test_unknown_column_is_not_found() {
        let set = three_columns();
        assert!(set.update(ColumnId(42), None, None).unwrap_err().is_not_found());
        assert!(set.remove(ColumnId(42)).unwrap_err().is_not_found());
    }

    #[test]
    fn test_to_definitions_keeps_order() {
        let stored = vec![
            ColumnDefinition::new(ColumnId(3), Some(PredicateId(7)), Direction::In),
            ColumnDefinition::new(ColumnId(1), None, Direction::Any),
        ];
        let set = ColumnSet::from_definitions(&stored);
        assert_eq!(set.to_definitions(), stored);
    }
}
