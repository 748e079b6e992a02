use std::fmt;

/// Handle to a node slot in a [`Tree`](super::Tree) arena.
///
/// Handles are only meaningful for the tree that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One value plus its parent/children links
#[derive(Debug, Clone)]
pub struct Node<T> {
    /// `None` only for the synthetic root
    pub(crate) value: Option<T>,
    /// Non-owning back link; `None` for the root and for detached nodes
    pub(crate) parent: Option<NodeId>,
    /// Owned, ordered children
    pub(crate) children: Vec<NodeId>,
}

impl<T> Node<T> {
    pub(crate) fn new(value: Option<T>) -> Self {
        Node {
            value,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}
