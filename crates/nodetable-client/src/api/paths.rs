use nodetable_core::{NodeId, ScopeId, TableId};

/// Endpoint paths, optionally scoped to one settings workspace.
///
/// With a scope every path is prefixed with `/settings/{scope}`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApiPaths {
    prefix: String,
}

impl ApiPaths {
    pub fn new(scope: Option<ScopeId>) -> Self {
        let prefix = match scope {
            Some(scope) => format!("/settings/{}", scope),
            None => String::new(),
        };
        Self { prefix }
    }

    pub fn is_scoped(&self) -> bool {
        !self.prefix.is_empty()
    }

    pub fn nodes(&self) -> String {
        format!("{}/node", self.prefix)
    }

    pub fn node(&self, id: NodeId) -> String {
        format!("{}/node/{}", self.prefix, id)
    }

    pub fn predicates(&self) -> String {
        format!("{}/predicates", self.prefix)
    }

    pub fn predicate(&self) -> String {
        format!("{}/predicate", self.prefix)
    }

    pub fn triples(&self) -> String {
        format!("{}/triples", self.prefix)
    }

    pub fn triple(&self) -> String {
        format!("{}/triple", self.prefix)
    }

    pub fn rows(&self) -> String {
        format!("{}/full-table", self.prefix)
    }

    pub fn tables(&self) -> String {
        format!("{}/tables", self.prefix)
    }

    /// Collection path used for creation, which is singular on the backend.
    pub fn new_table(&self) -> String {
        format!("{}/table", self.prefix)
    }

    pub fn table(&self, id: TableId) -> String {
        format!("{}/table/{}", self.prefix, id)
    }

    /// Deletion lives under the plural collection.
    pub fn table_in_collection(&self, id: TableId) -> String {
        format!("{}/tables/{}", self.prefix, id)
    }
}
