//! Generic ordered forest stored in an arena.
//!
//! Nodes are addressed by [`NodeId`] handles. Parent and child links are
//! handles too, so cloning and comparing never chase back-references.
//! Every structural operation validates its targets before it mutates
//! anything: a rejected call leaves the tree exactly as it was.

mod node;

pub use node::{Node, NodeId};

use std::cmp::Ordering;
use std::collections::HashSet;

/// Error type for structural tree operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("structural fault: {0}")]
    StructuralFault(String),
    #[error("tree already has a root")]
    DuplicateRoot,
    #[error("the root node cannot be moved, promoted, demoted, reordered or removed")]
    RootReorganization,
    #[error("cannot move node {node} underneath itself")]
    NodeMoveTarget { node: NodeId },
    #[error("node not found: {0}")]
    NodeNotFound(String),
    #[error("index {index} out of range (max {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("node {node} is already attached to another parent")]
    AlreadyAttached { node: NodeId },
}

/// An ordered forest under a single synthetic root that holds no value
#[derive(Debug, Clone)]
pub struct Tree<T> {
    nodes: Vec<Option<Node<T>>>,
    root: NodeId,
}

impl<T> Default for Tree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Tree<T> {
    pub fn new() -> Self {
        Tree {
            nodes: vec![Some(Node::new(None))],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Drop every node except the root.
    pub fn clear(&mut self) {
        self.nodes = vec![Some(Node::new(None))];
        self.root = NodeId(0);
    }

    pub fn node(&self, id: NodeId) -> Result<&Node<T>, TreeError> {
        self.nodes
            .get(id.0)
            .and_then(|slot| slot.as_ref())
            .ok_or_else(|| TreeError::NodeNotFound(id.to_string()))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node<T>, TreeError> {
        self.nodes
            .get_mut(id.0)
            .and_then(|slot| slot.as_mut())
            .ok_or_else(|| TreeError::NodeNotFound(id.to_string()))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    pub fn value(&self, id: NodeId) -> Option<&T> {
        self.node(id).ok().and_then(|n| n.value.as_ref())
    }

    pub fn value_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.node_mut(id).ok().and_then(|n| n.value.as_mut())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).ok().and_then(|n| n.parent)
    }

    /// Children of `id` in order (empty for unknown handles)
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Number of nodes reachable from the root, excluding the root.
    pub fn len(&self) -> usize {
        self.descendants(self.root).len()
    }

    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    /// Allocate a detached node holding `value`.
    pub fn create(&mut self, value: T) -> NodeId {
        self.alloc(Some(value))
    }

    fn alloc(&mut self, value: Option<T>) -> NodeId {
        self.nodes.push(Some(Node::new(value)));
        NodeId(self.nodes.len() - 1)
    }

    // -----------------------------------------------------------------------
    // Addressing and traversal
    // -----------------------------------------------------------------------

    /// Position of `id` as child indices from the root. The root's path is empty.
    pub fn path(&self, id: NodeId) -> Result<Vec<usize>, TreeError> {
        let mut path = Vec::new();
        let mut current = id;
        self.node(id)?;
        while current != self.root {
            if path.len() >= self.nodes.len() {
                return Err(TreeError::StructuralFault(format!(
                    "parent links of {id} form a cycle"
                )));
            }
            let parent = self.node(current)?.parent.ok_or_else(|| {
                TreeError::NodeNotFound(format!("{id} is not attached to the tree"))
            })?;
            let index = self
                .node(parent)?
                .children
                .iter()
                .position(|&c| c == current)
                .ok_or_else(|| {
                    TreeError::StructuralFault(format!(
                        "{current} is missing from the children of its parent {parent}"
                    ))
                })?;
            path.push(index);
            current = parent;
        }
        path.reverse();
        Ok(path)
    }

    /// Resolve a path produced by [`Tree::path`].
    pub fn node_at(&self, path: &[usize]) -> Result<NodeId, TreeError> {
        let mut current = self.root;
        for &index in path {
            current = *self
                .node(current)?
                .children
                .get(index)
                .ok_or_else(|| TreeError::NodeNotFound(format!("path {:?}", path)))?;
        }
        Ok(current)
    }

    /// All nodes below `id` in depth-first pre-order, excluding `id` itself.
    /// Returns a fresh snapshot on every call.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        out
    }

    /// Parents of `id` from nearest to farthest, excluding the root.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            if parent == self.root || out.len() >= self.nodes.len() {
                break;
            }
            out.push(parent);
            current = self.parent(parent);
        }
        out
    }

    /// True when `ancestor` is `node` or lies on the parent chain of `node`.
    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        let mut steps = 0;
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                return false;
            }
            current = self.parent(id);
        }
        false
    }

    fn index_in_parent(&self, id: NodeId) -> Result<(NodeId, usize), TreeError> {
        let parent = self
            .node(id)?
            .parent
            .ok_or_else(|| TreeError::NodeNotFound(format!("{id} is not attached to the tree")))?;
        let index = self
            .node(parent)?
            .children
            .iter()
            .position(|&c| c == id)
            .ok_or_else(|| {
                TreeError::NodeNotFound(format!("{id} is missing from the children of {parent}"))
            })?;
        Ok((parent, index))
    }

    fn reject_root(&self, nodes: &[NodeId]) -> Result<(), TreeError> {
        if nodes.contains(&self.root) {
            return Err(TreeError::RootReorganization);
        }
        Ok(())
    }

    /// Parents of `nodes`, deduplicated in discovery order.
    fn parent_groups(&self, nodes: &[NodeId]) -> Result<Vec<NodeId>, TreeError> {
        let mut parents = Vec::new();
        for &node in nodes {
            let (parent, _) = self.index_in_parent(node)?;
            if !parents.contains(&parent) {
                parents.push(parent);
            }
        }
        Ok(parents)
    }

    // -----------------------------------------------------------------------
    // Insertion and removal
    // -----------------------------------------------------------------------

    /// Attach a detached `child` under `parent` at `index` (append when `None`).
    /// Adding a child to the parent it already has is a no-op.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        index: Option<usize>,
    ) -> Result<(), TreeError> {
        if child == self.root {
            return Err(TreeError::RootReorganization);
        }
        let len = self.node(parent)?.children.len();
        match self.node(child)?.parent {
            Some(existing) if existing == parent => return Ok(()),
            Some(_) => return Err(TreeError::AlreadyAttached { node: child }),
            None => {}
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(TreeError::NodeMoveTarget { node: child });
        }
        let index = index.unwrap_or(len);
        if index > len {
            return Err(TreeError::IndexOutOfRange { index, len });
        }
        self.node_mut(parent)?.children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    fn split_path(&self, path: &[usize]) -> Result<(NodeId, usize), TreeError> {
        let Some((&index, parent_path)) = path.split_last() else {
            return Err(TreeError::DuplicateRoot);
        };
        let parent = self.node_at(parent_path)?;
        let len = self.node(parent)?.children.len();
        if index > len {
            return Err(TreeError::IndexOutOfRange { index, len });
        }
        Ok((parent, index))
    }

    /// Create a node holding `value` at `path`.
    pub fn insert(&mut self, path: &[usize], value: T) -> Result<NodeId, TreeError> {
        let (parent, index) = self.split_path(path)?;
        let id = self.alloc(Some(value));
        self.add_child(parent, id, Some(index))?;
        Ok(id)
    }

    /// Attach an existing detached node (with its subtree) at `path`.
    pub fn insert_node(&mut self, path: &[usize], node: NodeId) -> Result<(), TreeError> {
        let (parent, index) = self.split_path(path)?;
        self.add_child(parent, node, Some(index))
    }

    /// Detach `node` (with its subtree) from its parent. The subtree stays in
    /// the arena and can be reattached or discarded.
    pub fn remove_node(&mut self, node: NodeId) -> Result<(), TreeError> {
        if node == self.root {
            return Err(TreeError::RootReorganization);
        }
        let (parent, index) = self.index_in_parent(node)?;
        self.node_mut(parent)?.children.remove(index);
        self.node_mut(node)?.parent = None;
        Ok(())
    }

    /// Free a detached subtree, returning its values in pre-order.
    pub fn discard(&mut self, node: NodeId) -> Result<Vec<T>, TreeError> {
        if node == self.root {
            return Err(TreeError::RootReorganization);
        }
        if self.node(node)?.parent.is_some() {
            return Err(TreeError::AlreadyAttached { node });
        }
        let mut ids = vec![node];
        ids.extend(self.descendants(node));
        let mut values = Vec::with_capacity(ids.len());
        for id in ids {
            let slot = self.nodes.get_mut(id.0).and_then(|slot| slot.take());
            if let Some(value) = slot.and_then(|n| n.value) {
                values.push(value);
            }
        }
        Ok(values)
    }

    // -----------------------------------------------------------------------
    // Reorganization
    // -----------------------------------------------------------------------

    /// Re-parent `node` under `new_parent` at `new_index` (append when `None`).
    pub fn move_node(
        &mut self,
        new_parent: NodeId,
        node: NodeId,
        new_index: Option<usize>,
    ) -> Result<(), TreeError> {
        if node == self.root {
            return Err(TreeError::RootReorganization);
        }
        self.node(new_parent)?;
        let old_parent = self.node(node)?.parent;
        if self.is_ancestor_or_self(node, new_parent) {
            return Err(TreeError::NodeMoveTarget { node });
        }
        let mut len = self.node(new_parent)?.children.len();
        if old_parent == Some(new_parent) {
            len -= 1;
        }
        if let Some(index) = new_index
            && index > len
        {
            return Err(TreeError::IndexOutOfRange { index, len });
        }
        if old_parent.is_some() {
            self.remove_node(node)?;
        }
        self.add_child(new_parent, node, new_index)
    }

    /// Move each node up one level, right after its former parent.
    ///
    /// Deepest nodes go first. Nodes directly under the root, or whose
    /// grandparent is the root, are left where they are.
    pub fn promote(&mut self, nodes: &[NodeId]) -> Result<(), TreeError> {
        self.reject_root(nodes)?;
        let mut targets = Vec::with_capacity(nodes.len());
        for (order, &node) in nodes.iter().enumerate() {
            if targets.iter().any(|&(_, _, n)| n == node) {
                continue;
            }
            targets.push((self.path(node)?.len(), order, node));
        }
        targets.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        for (_, _, node) in targets {
            let (parent, _) = self.index_in_parent(node)?;
            let grandparent = match self.node(parent)?.parent {
                Some(gp) if gp != self.root => gp,
                _ => {
                    tracing::trace!(%node, "promote skipped: already at minimum depth");
                    continue;
                }
            };
            let (_, parent_index) = self.index_in_parent(parent)?;
            self.remove_node(node)?;
            self.add_child(grandparent, node, Some(parent_index + 1))?;
        }
        Ok(())
    }

    /// Move each run of adjacent targeted siblings under the untargeted sibling
    /// just before the run, as its trailing children in their original order.
    /// A run with no untargeted sibling before it stays in place.
    pub fn demote(&mut self, nodes: &[NodeId]) -> Result<(), TreeError> {
        self.reject_root(nodes)?;
        let parents = self.parent_groups(nodes)?;
        let targeted: HashSet<NodeId> = nodes.iter().copied().collect();

        for parent in parents {
            let siblings = self.node(parent)?.children.clone();
            // highest original position first
            let mut run: Vec<NodeId> = Vec::new();
            for &sibling in siblings.iter().rev() {
                if targeted.contains(&sibling) {
                    run.push(sibling);
                    continue;
                }
                if run.is_empty() {
                    continue;
                }
                let base = self.node(sibling)?.children.len();
                for &member in &run {
                    self.remove_node(member)?;
                    self.add_child(sibling, member, Some(base))?;
                }
                run.clear();
            }
        }
        Ok(())
    }

    /// One front-to-back pass per sibling group, swapping each targeted node
    /// with an untargeted node directly before it.
    pub fn reorder_up(&mut self, nodes: &[NodeId]) -> Result<(), TreeError> {
        self.reject_root(nodes)?;
        let parents = self.parent_groups(nodes)?;
        let targeted: HashSet<NodeId> = nodes.iter().copied().collect();
        for parent in parents {
            let children = &mut self.node_mut(parent)?.children;
            for i in 1..children.len() {
                if targeted.contains(&children[i]) && !targeted.contains(&children[i - 1]) {
                    children.swap(i - 1, i);
                }
            }
        }
        Ok(())
    }

    /// One back-to-front pass per sibling group, swapping each targeted node
    /// with an untargeted node directly after it.
    pub fn reorder_down(&mut self, nodes: &[NodeId]) -> Result<(), TreeError> {
        self.reject_root(nodes)?;
        let parents = self.parent_groups(nodes)?;
        let targeted: HashSet<NodeId> = nodes.iter().copied().collect();
        for parent in parents {
            let children = &mut self.node_mut(parent)?.children;
            for i in (0..children.len().saturating_sub(1)).rev() {
                if targeted.contains(&children[i]) && !targeted.contains(&children[i + 1]) {
                    children.swap(i, i + 1);
                }
            }
        }
        Ok(())
    }

    /// Stable-sort the children of `parent` by their values.
    pub fn sort_children_by<F>(&mut self, parent: NodeId, mut compare: F) -> Result<(), TreeError>
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let mut children = std::mem::take(&mut self.node_mut(parent)?.children);
        children.sort_by(|&a, &b| match (self.value(a), self.value(b)) {
            (Some(x), Some(y)) => compare(x, y),
            _ => Ordering::Equal,
        });
        self.node_mut(parent)?.children = children;
        Ok(())
    }
}

impl<T: Clone> Tree<T> {
    /// Deep copy of everything reachable from the root into a fresh arena.
    /// Detached and discarded slots are left behind.
    pub fn compacted_clone(&self) -> Tree<T> {
        let mut clone = Tree::new();
        let clone_root = clone.root;
        let mut stack: Vec<(NodeId, NodeId)> = self
            .children(self.root)
            .iter()
            .rev()
            .map(|&child| (child, clone_root))
            .collect();
        while let Some((source, target_parent)) = stack.pop() {
            let value = self.value(source).cloned();
            let copy = clone.alloc(value);
            if let Some(Some(parent)) = clone.nodes.get_mut(target_parent.0) {
                parent.children.push(copy);
            }
            if let Some(Some(node)) = clone.nodes.get_mut(copy.0) {
                node.parent = Some(target_parent);
            }
            stack.extend(self.children(source).iter().rev().map(|&child| (child, copy)));
        }
        clone
    }
}

impl<T: PartialEq> PartialEq for Tree<T> {
    /// Order-sensitive comparison of values and shape below the root.
    fn eq(&self, other: &Self) -> bool {
        let mut stack = vec![(self.root, other.root)];
        while let Some((a, b)) = stack.pop() {
            let (Ok(left), Ok(right)) = (self.node(a), other.node(b)) else {
                return false;
            };
            if left.value != right.value || left.children.len() != right.children.len() {
                return false;
            }
            stack.extend(left.children.iter().copied().zip(right.children.iter().copied()));
        }
        true
    }
}

impl<T: Eq> Eq for Tree<T> {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// root → A → [B, C → [E, F], D]
    fn sample_tree() -> Tree<&'static str> {
        let mut tree = Tree::new();
        tree.insert(&[0], "A").unwrap();
        tree.insert(&[0, 0], "B").unwrap();
        tree.insert(&[0, 1], "C").unwrap();
        tree.insert(&[0, 2], "D").unwrap();
        tree.insert(&[0, 1, 0], "E").unwrap();
        tree.insert(&[0, 1, 1], "F").unwrap();
        tree
    }

    fn find(tree: &Tree<&'static str>, label: &str) -> NodeId {
        tree.descendants(tree.root())
            .into_iter()
            .find(|&id| tree.value(id) == Some(&label))
            .unwrap()
    }

    fn labels(tree: &Tree<&'static str>, parent: NodeId) -> Vec<&'static str> {
        tree.children(parent)
            .iter()
            .map(|&id| *tree.value(id).unwrap())
            .collect()
    }

    fn children_of(tree: &Tree<&'static str>, label: &str) -> Vec<&'static str> {
        labels(tree, find(tree, label))
    }

    // --- insertion and addressing ---

    #[test]
    fn insert_builds_expected_paths() {
        let tree = sample_tree();
        assert_eq!(tree.path(find(&tree, "E")).unwrap(), vec![0, 1, 0]);
        assert_eq!(tree.path(find(&tree, "D")).unwrap(), vec![0, 2]);
        assert_eq!(tree.path(tree.root()).unwrap(), Vec::<usize>::new());
        assert_eq!(tree.node_at(&[0, 1, 1]).unwrap(), find(&tree, "F"));
        assert_eq!(tree.len(), 6);
    }

    #[test]
    fn insert_at_root_path_is_duplicate_root() {
        let mut tree = sample_tree();
        assert_eq!(tree.insert(&[], "X"), Err(TreeError::DuplicateRoot));
    }

    #[test]
    fn insert_past_end_is_out_of_range() {
        let mut tree = sample_tree();
        assert_eq!(
            tree.insert(&[0, 5], "X"),
            Err(TreeError::IndexOutOfRange { index: 5, len: 3 })
        );
        // appending at exactly len is fine
        tree.insert(&[0, 3], "X").unwrap();
        assert_eq!(children_of(&tree, "A"), vec!["B", "C", "D", "X"]);
    }

    #[test]
    fn insert_under_missing_parent_is_not_found() {
        let mut tree = sample_tree();
        assert!(matches!(
            tree.insert(&[4, 0], "X"),
            Err(TreeError::NodeNotFound(_))
        ));
    }

    #[test]
    fn add_child_twice_keeps_one_entry() {
        let mut tree = sample_tree();
        let a = find(&tree, "A");
        let x = tree.create("X");
        tree.add_child(a, x, None).unwrap();
        tree.add_child(a, x, None).unwrap();
        assert_eq!(children_of(&tree, "A"), vec!["B", "C", "D", "X"]);
    }

    #[test]
    fn add_child_rejects_node_with_other_parent() {
        let mut tree = sample_tree();
        let b = find(&tree, "B");
        let e = find(&tree, "E");
        assert_eq!(
            tree.add_child(b, e, None),
            Err(TreeError::AlreadyAttached { node: e })
        );
    }

    #[test]
    fn insert_node_reattaches_detached_subtree() {
        let mut tree = sample_tree();
        let c = find(&tree, "C");
        tree.remove_node(c).unwrap();
        tree.insert_node(&[0, 0], c).unwrap();
        assert_eq!(children_of(&tree, "A"), vec!["C", "B", "D"]);
        assert_eq!(children_of(&tree, "C"), vec!["E", "F"]);
    }

    #[test]
    fn path_reports_corrupted_links() {
        let mut tree = sample_tree();
        let c = find(&tree, "C");
        let e = find(&tree, "E");
        tree.node_mut(c).unwrap().children.retain(|&id| id != e);
        assert!(matches!(tree.path(e), Err(TreeError::StructuralFault(_))));
    }

    #[test]
    fn descendants_are_preorder() {
        let tree = sample_tree();
        let order: Vec<&str> = tree
            .descendants(tree.root())
            .into_iter()
            .map(|id| *tree.value(id).unwrap())
            .collect();
        assert_eq!(order, vec!["A", "B", "C", "E", "F", "D"]);
    }

    // --- removal ---

    #[test]
    fn remove_node_detaches_subtree() {
        let mut tree = sample_tree();
        let c = find(&tree, "C");
        tree.remove_node(c).unwrap();
        assert_eq!(children_of(&tree, "A"), vec!["B", "D"]);
        assert_eq!(tree.parent(c), None);
        assert_eq!(tree.children(c).len(), 2);
        assert!(matches!(tree.remove_node(c), Err(TreeError::NodeNotFound(_))));
        assert!(matches!(tree.path(c), Err(TreeError::NodeNotFound(_))));
    }

    #[test]
    fn remove_root_is_rejected() {
        let mut tree = sample_tree();
        let root = tree.root();
        assert_eq!(tree.remove_node(root), Err(TreeError::RootReorganization));
    }

    #[test]
    fn discard_frees_detached_subtree() {
        let mut tree = sample_tree();
        let c = find(&tree, "C");
        assert_eq!(tree.discard(c), Err(TreeError::AlreadyAttached { node: c }));
        tree.remove_node(c).unwrap();
        assert_eq!(tree.discard(c).unwrap(), vec!["C", "E", "F"]);
        assert!(!tree.contains(c));
        assert_eq!(tree.len(), 3);
    }

    // --- move ---

    #[test]
    fn move_under_own_descendant_leaves_tree_unchanged() {
        let mut tree = sample_tree();
        let before = tree.clone();
        let c = find(&tree, "C");
        let e = find(&tree, "E");
        assert_eq!(
            tree.move_node(e, c, None),
            Err(TreeError::NodeMoveTarget { node: c })
        );
        assert_eq!(
            tree.move_node(c, c, None),
            Err(TreeError::NodeMoveTarget { node: c })
        );
        assert_eq!(tree, before);
    }

    #[test]
    fn move_root_is_rejected() {
        let mut tree = sample_tree();
        let root = tree.root();
        let a = find(&tree, "A");
        assert_eq!(tree.move_node(a, root, None), Err(TreeError::RootReorganization));
    }

    #[test]
    fn move_within_same_parent() {
        let mut tree = sample_tree();
        let a = find(&tree, "A");
        let b = find(&tree, "B");
        tree.move_node(a, b, Some(2)).unwrap();
        assert_eq!(children_of(&tree, "A"), vec!["C", "D", "B"]);
    }

    #[test]
    fn move_with_bad_index_leaves_tree_unchanged() {
        let mut tree = sample_tree();
        let before = tree.clone();
        let a = find(&tree, "A");
        let b = find(&tree, "B");
        assert_eq!(
            tree.move_node(a, b, Some(3)),
            Err(TreeError::IndexOutOfRange { index: 3, len: 2 })
        );
        assert_eq!(tree, before);
    }

    #[test]
    fn move_appends_under_new_parent() {
        let mut tree = sample_tree();
        let b = find(&tree, "B");
        let f = find(&tree, "F");
        tree.move_node(b, f, None).unwrap();
        assert_eq!(children_of(&tree, "B"), vec!["F"]);
        assert_eq!(children_of(&tree, "C"), vec!["E"]);
        assert_eq!(tree.path(f).unwrap(), vec![0, 0, 0]);
    }

    // --- promote ---

    #[test]
    fn promote_places_node_after_former_parent() {
        let mut tree = sample_tree();
        let e = find(&tree, "E");
        tree.promote(&[e]).unwrap();
        assert_eq!(children_of(&tree, "A"), vec!["B", "C", "E", "D"]);
        assert_eq!(children_of(&tree, "C"), vec!["F"]);
    }

    #[test]
    fn promote_near_root_is_noop() {
        let mut tree = sample_tree();
        let before = tree.clone();
        let a = find(&tree, "A");
        let b = find(&tree, "B");
        tree.promote(&[a]).unwrap();
        tree.promote(&[b]).unwrap();
        assert_eq!(tree, before);
    }

    #[test]
    fn promote_root_is_rejected() {
        let mut tree = sample_tree();
        let root = tree.root();
        assert_eq!(tree.promote(&[root]), Err(TreeError::RootReorganization));
    }

    #[test]
    fn promote_chain_goes_deepest_first() {
        let mut tree = sample_tree();
        tree.insert(&[0, 1, 0, 0], "G").unwrap();
        let e = find(&tree, "E");
        let g = find(&tree, "G");
        tree.promote(&[e, g]).unwrap();
        assert_eq!(children_of(&tree, "A"), vec!["B", "C", "E", "D"]);
        assert_eq!(children_of(&tree, "C"), vec!["G", "F"]);
        assert!(children_of(&tree, "E").is_empty());
    }

    // --- demote ---

    #[test]
    fn demote_appends_run_to_preceding_sibling() {
        let mut tree = sample_tree();
        let d = find(&tree, "D");
        tree.demote(&[d]).unwrap();
        assert_eq!(children_of(&tree, "A"), vec!["B", "C"]);
        assert_eq!(children_of(&tree, "C"), vec!["E", "F", "D"]);
    }

    #[test]
    fn demote_keeps_relative_order_of_runs() {
        let mut tree = Tree::new();
        tree.insert(&[0], "A").unwrap();
        for (i, label) in ["B", "C", "D", "E", "F"].into_iter().enumerate() {
            tree.insert(&[0, i], label).unwrap();
        }
        let targets = [find(&tree, "C"), find(&tree, "E"), find(&tree, "F")];
        tree.demote(&targets).unwrap();
        assert_eq!(children_of(&tree, "A"), vec!["B", "D"]);
        assert_eq!(children_of(&tree, "B"), vec!["C"]);
        assert_eq!(children_of(&tree, "D"), vec!["E", "F"]);
    }

    #[test]
    fn demote_first_sibling_is_noop() {
        let mut tree = sample_tree();
        let before = tree.clone();
        let b = find(&tree, "B");
        let c = find(&tree, "C");
        tree.demote(&[b]).unwrap();
        assert_eq!(tree, before);
        // B has nothing before it, so the whole run B, C stays put
        tree.demote(&[b, c]).unwrap();
        assert_eq!(tree, before);
    }

    // --- reorder ---

    #[test]
    fn reorder_up_swaps_with_previous_sibling() {
        let mut tree = sample_tree();
        let c = find(&tree, "C");
        let d = find(&tree, "D");
        tree.reorder_up(&[c, d]).unwrap();
        assert_eq!(children_of(&tree, "A"), vec!["C", "D", "B"]);
    }

    #[test]
    fn reorder_down_swaps_with_next_sibling() {
        let mut tree = sample_tree();
        let b = find(&tree, "B");
        tree.reorder_down(&[b]).unwrap();
        assert_eq!(children_of(&tree, "A"), vec!["C", "B", "D"]);
    }

    #[test]
    fn reorder_at_group_boundary_is_noop() {
        let mut tree = sample_tree();
        let before = tree.clone();
        let b = find(&tree, "B");
        let d = find(&tree, "D");
        tree.reorder_up(&[b]).unwrap();
        tree.reorder_down(&[d]).unwrap();
        assert_eq!(tree, before);
    }

    #[test]
    fn reorder_moves_one_step_per_call() {
        let mut tree = sample_tree();
        let d = find(&tree, "D");
        tree.reorder_up(&[d]).unwrap();
        assert_eq!(children_of(&tree, "A"), vec!["B", "D", "C"]);
        tree.reorder_up(&[d]).unwrap();
        assert_eq!(children_of(&tree, "A"), vec!["D", "B", "C"]);
    }

    #[test]
    fn reorder_root_is_rejected() {
        let mut tree = sample_tree();
        let root = tree.root();
        assert_eq!(tree.reorder_up(&[root]), Err(TreeError::RootReorganization));
        assert_eq!(tree.demote(&[root]), Err(TreeError::RootReorganization));
    }

    // --- clone, equality, sort ---

    #[test]
    fn equality_ignores_arena_layout() {
        let tree = sample_tree();
        let mut other = Tree::new();
        other.insert(&[0], "A").unwrap();
        other.insert(&[0, 0], "D").unwrap();
        other.insert(&[0, 0], "C").unwrap();
        other.insert(&[0, 0], "B").unwrap();
        other.insert(&[0, 1, 0], "F").unwrap();
        other.insert(&[0, 1, 0], "E").unwrap();
        assert_eq!(tree, other);

        other.insert(&[0, 3], "Z").unwrap();
        assert_ne!(tree, other);
    }

    #[test]
    fn compacted_clone_is_independent() {
        let mut tree = sample_tree();
        let b = find(&tree, "B");
        tree.remove_node(b).unwrap();

        let mut clone = tree.compacted_clone();
        assert_eq!(clone, tree);
        assert_eq!(clone.nodes.len(), clone.len() + 1);

        let e = find(&clone, "E");
        clone.promote(&[e]).unwrap();
        assert_ne!(clone, tree);
        assert_eq!(children_of(&tree, "C"), vec!["E", "F"]);
    }

    #[test]
    fn sort_children_by_value() {
        let mut tree = sample_tree();
        let a = find(&tree, "A");
        tree.sort_children_by(a, |x, y| y.cmp(x)).unwrap();
        assert_eq!(children_of(&tree, "A"), vec!["D", "C", "B"]);
    }
}
