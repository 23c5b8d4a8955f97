//! Which cached queries each write affects.
//!
//! [`plan`] is a pure function of the mutation. The session cancels the
//! planned keys before the write and invalidates them after it succeeds.

use std::fmt;

use nodetable_core::{NodeId, TableId, Triple};

use crate::cache::{KeyScope, QueryKey};

/// Every write the data layer performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CreateNode,
    RenameNode(NodeId),
    DeleteNode(NodeId),
    CreatePredicate,
    CreateTriple(Triple),
    DeleteTriple(Triple),
    CreateTable,
    UpdateTable(TableId),
    DeleteTable(TableId),
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::CreateNode => "create_node",
            Mutation::RenameNode(_) => "rename_node",
            Mutation::DeleteNode(_) => "delete_node",
            Mutation::CreatePredicate => "create_predicate",
            Mutation::CreateTriple(_) => "create_triple",
            Mutation::DeleteTriple(_) => "delete_triple",
            Mutation::CreateTable => "create_table",
            Mutation::UpdateTable(_) => "update_table",
            Mutation::DeleteTable(_) => "delete_table",
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::RenameNode(id) | Mutation::DeleteNode(id) => {
                write!(f, "{} {}", self.name(), id)
            }
            Mutation::UpdateTable(id) | Mutation::DeleteTable(id) => {
                write!(f, "{} {}", self.name(), id)
            }
            Mutation::CreateTriple(t) | Mutation::DeleteTriple(t) => write!(
                f,
                "{} {}-{}->{}",
                self.name(),
                t.subject_id,
                t.predicate_id,
                t.object_id
            ),
            _ => f.write_str(self.name()),
        }
    }
}

/// Keys to cancel before a write and to invalidate after it succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationPlan {
    pub cancel: Vec<KeyScope>,
    pub invalidate: Vec<KeyScope>,
}

impl MutationPlan {
    fn covering(scopes: Vec<KeyScope>) -> Self {
        Self {
            cancel: scopes.clone(),
            invalidate: scopes,
        }
    }

    /// Whether the plan invalidates `key`.
    pub fn invalidates(&self, key: &QueryKey) -> bool {
        self.invalidate.iter().any(|scope| scope.matches(key))
    }
}

pub fn plan(mutation: &Mutation) -> MutationPlan {
    let mut scopes = Vec::new();
    match mutation {
        Mutation::CreateNode => {
            // A new node shows up in unfiltered rows and node sets
            scopes.push(KeyScope::Exact(QueryKey::Nodes));
            scopes.extend(KeyScope::row_bearing());
        }
        Mutation::RenameNode(_) => {
            // Rows and node sets only carry ids, labels are resolved from Nodes
            scopes.push(KeyScope::Exact(QueryKey::Nodes));
        }
        Mutation::DeleteNode(_) => {
            scopes.push(KeyScope::Exact(QueryKey::Nodes));
            scopes.push(KeyScope::Exact(QueryKey::Triples));
            scopes.extend(KeyScope::row_bearing());
        }
        Mutation::CreatePredicate => {
            scopes.push(KeyScope::Exact(QueryKey::Predicates));
        }
        Mutation::CreateTriple(_) | Mutation::DeleteTriple(_) => {
            scopes.push(KeyScope::Exact(QueryKey::Triples));
            scopes.extend(KeyScope::row_bearing());
        }
        Mutation::CreateTable => {
            scopes.push(KeyScope::Exact(QueryKey::Tables));
        }
        Mutation::UpdateTable(id) => {
            // Ad-hoc rows are keyed by filter and columns, not by table
            scopes.push(KeyScope::Exact(QueryKey::Tables));
            scopes.push(KeyScope::Exact(QueryKey::Table(*id)));
        }
        Mutation::DeleteTable(id) => {
            scopes.push(KeyScope::Exact(QueryKey::Tables));
            scopes.push(KeyScope::Exact(QueryKey::Table(*id)));
        }
    }
    MutationPlan::covering(scopes)
}
