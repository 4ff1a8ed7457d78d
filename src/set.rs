//! The in-memory data model the codec operates on.
//!
//! A [`NestedSet`] is an ordered pair of an [`Order`] and a children node.
//! Children nodes form a rooted DAG: the same node may be reached from many
//! parents, and the codec goes to some length to keep that sharing intact
//! across a serialize/deserialize round trip.
//!
//! Nodes are immutable values behind reference-counted handles. Equality of
//! nested sets is handle identity of their children, not structural
//! comparison; two independently built but structurally equal sets compare
//! unequal until the codec's interner unifies them on the read side.
//!
//! The empty children is `None`. There is no allocated sentinel object, so
//! every empty set of a given order is trivially "the" empty set.

use std::sync::Arc;

/// Traversal orderings a nested set can carry.
///
/// The ordinal is the declaration index and is stable across versions; new
/// kinds append at the end. The codec treats the order as opaque metadata
/// and never reorders children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Order {
    /// Insertion order.
    Stable,
    /// Compile-time dependency order.
    Compile,
    /// Link-time dependency order.
    Link,
    /// Naive left-to-right link order.
    NaiveLink,
}

impl Order {
    /// The wire ordinal of this order kind.
    pub fn ordinal(self) -> u64 {
        self as u64
    }

    /// Looks up an order kind by wire ordinal.
    pub fn from_ordinal(ordinal: u64) -> Option<Self> {
        match ordinal {
            0 => Some(Self::Stable),
            1 => Some(Self::Compile),
            2 => Some(Self::Link),
            3 => Some(Self::NaiveLink),
            _ => None,
        }
    }
}

/// One entry of a branch node: either an element payload held directly, or
/// an edge to another children node.
#[derive(Debug, Clone)]
pub enum Entry<T> {
    /// An element payload.
    Direct(T),
    /// A reference to a shared sub-graph.
    Transitive(Arc<Node<T>>),
}

/// A non-empty children node of the DAG.
///
/// Branch entry sequences have length >= 2 and preserve caller order; the
/// [`NestedSet`] constructors collapse shorter inputs before a branch is
/// ever built.
#[derive(Debug)]
pub enum Node<T> {
    /// A single element.
    Leaf(T),
    /// An ordered sequence of payloads and sub-graph references.
    Branch(Vec<Entry<T>>),
}

/// An immutable (order, children) pair forming a DAG of element payloads.
pub struct NestedSet<T> {
    order: Order,
    children: Option<Arc<Node<T>>>,
}

impl<T> NestedSet<T> {
    /// The empty set of the given order.
    pub fn empty(order: Order) -> Self {
        Self { order, children: None }
    }

    /// A set holding exactly one element.
    pub fn leaf(order: Order, item: T) -> Self {
        Self {
            order,
            children: Some(Arc::new(Node::Leaf(item))),
        }
    }

    /// Builds a set from an entry sequence, preserving entry order.
    ///
    /// Degenerate inputs collapse instead of producing an undersized branch:
    /// no entries yield the empty set, a single payload yields a leaf, and a
    /// single reference adopts the referenced node as the children.
    pub fn from_entries(order: Order, mut entries: Vec<Entry<T>>) -> Self {
        let children = match entries.len() {
            0 => None,
            1 => match entries.remove(0) {
                Entry::Direct(item) => Some(Arc::new(Node::Leaf(item))),
                Entry::Transitive(node) => Some(node),
            },
            _ => Some(Arc::new(Node::Branch(entries))),
        };
        Self { order, children }
    }

    /// Wraps an already-materialized children node.
    pub(crate) fn from_children(order: Order, children: Option<Arc<Node<T>>>) -> Self {
        Self { order, children }
    }

    /// The order kind this set carries.
    pub fn order(&self) -> Order {
        self.order
    }

    /// Whether this is the empty set.
    pub fn is_empty(&self) -> bool {
        self.children.is_none()
    }

    /// The children node, or `None` for the empty set.
    pub fn children(&self) -> Option<&Arc<Node<T>>> {
        self.children.as_ref()
    }

    /// Whether both sets hold the identical children node.
    pub fn same_children(&self, other: &Self) -> bool {
        match (&self.children, &other.children) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// Hand-written so cloning a handle never requires `T: Clone`.
impl<T> Clone for NestedSet<T> {
    fn clone(&self) -> Self {
        Self {
            order: self.order,
            children: self.children.clone(),
        }
    }
}

impl<T> PartialEq for NestedSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order && self.same_children(other)
    }
}

impl<T> Eq for NestedSet<T> {}

impl<T: std::fmt::Debug> std::fmt::Debug for NestedSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NestedSet")
            .field("order", &self.order)
            .field("children", &self.children)
            .finish()
    }
}
