use std::collections::BTreeSet;
use std::sync::Arc;

use nodetable_core::{Node, NodeId, Predicate, Row, Table, Triple};

/// A cached query result. Payloads are shared, so handing a value to a view
/// never copies the data.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Nodes(Arc<Vec<Node>>),
    Predicates(Arc<Vec<Predicate>>),
    Triples(Arc<Vec<Triple>>),
    Tables(Arc<Vec<Table>>),
    Table(Arc<Table>),
    Rows(Arc<Vec<Row>>),
    NodeSet(Arc<BTreeSet<NodeId>>),
}

/// Types that can be stored in the query cache.
pub trait Cacheable: Send + Sync + Sized + 'static {
    fn into_cached(value: Arc<Self>) -> CachedValue;

    /// `None` when the cached value holds a different type.
    fn from_cached(value: &CachedValue) -> Option<Arc<Self>>;
}

macro_rules! cacheable {
    ($ty:ty => $variant:ident) => {
        impl Cacheable for $ty {
            fn into_cached(value: Arc<Self>) -> CachedValue {
                CachedValue::$variant(value)
            }

            fn from_cached(value: &CachedValue) -> Option<Arc<Self>> {
                match value {
                    CachedValue::$variant(inner) => Some(Arc::clone(inner)),
                    _ => None,
                }
            }
        }
    };
}

cacheable!(Vec<Node> => Nodes);
cacheable!(Vec<Predicate> => Predicates);
cacheable!(Vec<Triple> => Triples);
cacheable!(Vec<Table> => Tables);
cacheable!(Table => Table);
cacheable!(Vec<Row> => Rows);
cacheable!(BTreeSet<NodeId> => NodeSet);
