//! Identifier types for graph entities.
//!
//! All identifiers are assigned by the backend except [`ColumnId`], which is
//! assigned client-side by [`crate::ColumnSet`].

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Returns the raw integer value.
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

integer_id!(
    /// Identifies a node (vertex) of the graph.
    NodeId
);

integer_id!(
    /// Identifies a predicate, the label of a directed edge.
    PredicateId
);

integer_id!(
    /// Identifies a saved table view.
    TableId
);

integer_id!(
    /// Identifies one dynamic column inside a table definition.
    ColumnId
);

integer_id!(
    /// Identifies the workspace (setting) that scopes every endpoint.
    ScopeId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_as_plain_integers() {
        let id = NodeId(42);
        let serialized = serde_json::to_string(&id).unwrap();
        assert_eq!(serialized, "42");

        let deserialized: NodeId = serde_json::from_str("42").unwrap();
        assert_eq!(deserialized, id);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(TableId(7).to_string(), "7");
        assert_eq!(ScopeId::from(3).get(), 3);
    }
}
