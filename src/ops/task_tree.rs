use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::debug;

use crate::model::entity::{Entity, TaskItem, TaskStatus, compare_entities, now};
use crate::tree::{NodeId, Tree, TreeError};

/// Error type for task tree operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskTreeError {
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("entity not registered: {0}")]
    UnregisteredEntity(String),
    #[error("entity already registered: {0}")]
    EntityOverwrite(String),
    #[error("task data is corrupt: {entity_id} references missing parent {parent_id}")]
    TaskData { entity_id: String, parent_id: String },
    #[error("cannot reorganize list {0}: only items can be promoted, demoted or reordered")]
    InvalidReorderTarget(String),
    #[error("not an item: {0}")]
    NotAnItem(String),
    #[error("cannot change the kind of entity {0}")]
    KindMismatch(String),
}

fn fault(message: String) -> TaskTreeError {
    TaskTreeError::Tree(TreeError::StructuralFault(message))
}

/// Lists and items arranged as a forest, with an ID index kept in step with
/// every structural change.
///
/// Lists sit directly under the synthetic root. Items sit under their list or
/// under a parent item of the same list. Every sibling group stays sorted by
/// [`compare_entities`].
#[derive(Debug, Clone, Default)]
pub struct TaskTree {
    tree: Tree<Entity>,
    index: HashMap<String, NodeId>,
}

impl PartialEq for TaskTree {
    fn eq(&self, other: &Self) -> bool {
        self.tree == other.tree
    }
}

impl TaskTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from a flat ID → entity snapshot.
    pub fn from_entities(entities: &IndexMap<String, Entity>) -> Result<Self, TaskTreeError> {
        let mut tree = TaskTree::new();
        tree.build(entities)?;
        Ok(tree)
    }

    // -----------------------------------------------------------------------
    // Build
    // -----------------------------------------------------------------------

    /// Replace the whole structure with `entities`.
    ///
    /// Lists attach under the root, items under their parent item or list.
    /// The input may be in any order; items wait until their parent is
    /// registered. On error the tree is left empty.
    pub fn build(&mut self, entities: &IndexMap<String, Entity>) -> Result<(), TaskTreeError> {
        self.tree.clear();
        self.index.clear();
        if let Err(e) = self.attach_all(entities) {
            self.tree.clear();
            self.index.clear();
            return Err(e);
        }
        self.sort_groups(false)?;
        debug!(entities = self.index.len(), "built task tree");
        Ok(())
    }

    fn attach_all(&mut self, entities: &IndexMap<String, Entity>) -> Result<(), TaskTreeError> {
        let root = self.tree.root();
        let mut pending: Vec<&TaskItem> = Vec::new();
        for entity in entities.values() {
            match entity {
                Entity::List(_) => {
                    self.attach(root, entity.clone(), None)?;
                }
                Entity::Item(item) => pending.push(item),
            }
        }

        while !pending.is_empty() {
            let before = pending.len();
            let mut deferred = Vec::new();
            for item in pending {
                match self.resolve_parent(item)? {
                    Some(parent) => {
                        self.attach(parent, Entity::Item(item.clone()), None)?;
                    }
                    None => deferred.push(item),
                }
            }
            if deferred.len() == before
                && let Some(item) = deferred.first()
            {
                return Err(self.missing_parent(item));
            }
            pending = deferred;
        }
        Ok(())
    }

    /// The node an item belongs under, or `None` if it is not registered yet.
    fn resolve_parent(&self, item: &TaskItem) -> Result<Option<NodeId>, TaskTreeError> {
        let Some(&list_node) = self.index.get(&item.list_id) else {
            return Ok(None);
        };
        if !matches!(self.tree.value(list_node), Some(Entity::List(_))) {
            return Err(TaskTreeError::TaskData {
                entity_id: item.id.clone(),
                parent_id: item.list_id.clone(),
            });
        }
        let Some(parent_id) = &item.parent_item_id else {
            return Ok(Some(list_node));
        };
        let Some(&parent_node) = self.index.get(parent_id) else {
            return Ok(None);
        };
        match self.tree.value(parent_node) {
            Some(Entity::Item(parent)) if parent.list_id == item.list_id => Ok(Some(parent_node)),
            _ => Err(TaskTreeError::TaskData {
                entity_id: item.id.clone(),
                parent_id: parent_id.clone(),
            }),
        }
    }

    fn missing_parent(&self, item: &TaskItem) -> TaskTreeError {
        let parent_id = match &item.parent_item_id {
            Some(parent_id) if self.index.contains_key(&item.list_id) => parent_id.clone(),
            _ => item.list_id.clone(),
        };
        TaskTreeError::TaskData {
            entity_id: item.id.clone(),
            parent_id,
        }
    }

    /// Create a node for `entity` under `parent` and register it.
    fn attach(
        &mut self,
        parent: NodeId,
        entity: Entity,
        index: Option<usize>,
    ) -> Result<NodeId, TaskTreeError> {
        let id = entity.id().to_string();
        if self.index.contains_key(&id) {
            return Err(TaskTreeError::EntityOverwrite(id));
        }
        let node = self.tree.create(entity);
        if let Err(e) = self.tree.add_child(parent, node, index) {
            let _ = self.tree.discard(node);
            return Err(e.into());
        }
        self.index.insert(id, node);
        Ok(node)
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    fn node_for(&self, id: &str) -> Result<NodeId, TaskTreeError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| TaskTreeError::UnregisteredEntity(id.to_string()))
    }

    fn entity_at(&self, node: NodeId) -> Result<&Entity, TaskTreeError> {
        self.tree
            .value(node)
            .ok_or_else(|| fault(format!("indexed node {node} holds no entity")))
    }

    /// Look up an entity by ID.
    pub fn get_entity_for_id(&self, id: &str) -> Result<&Entity, TaskTreeError> {
        self.entity_at(self.node_for(id)?)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Every registered ID, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    /// Every entity in depth-first pre-order.
    pub fn all_entities(&self) -> Vec<&Entity> {
        self.walk().into_iter().map(|(_, entity)| entity).collect()
    }

    /// Every entity in depth-first pre-order with its depth (lists are 0).
    pub fn walk(&self) -> Vec<(usize, &Entity)> {
        let starts = self.tree.children(self.tree.root()).to_vec();
        self.walk_nodes(starts)
    }

    /// The entity `id` and everything below it, with depths relative to it.
    pub fn walk_from(&self, id: &str) -> Result<Vec<(usize, &Entity)>, TaskTreeError> {
        Ok(self.walk_nodes(vec![self.node_for(id)?]))
    }

    fn walk_nodes(&self, starts: Vec<NodeId>) -> Vec<(usize, &Entity)> {
        let mut out = Vec::new();
        let mut stack: Vec<(usize, NodeId)> = starts.into_iter().rev().map(|n| (0, n)).collect();
        while let Some((depth, node)) = stack.pop() {
            if let Some(entity) = self.tree.value(node) {
                out.push((depth, entity));
            }
            stack.extend(self.tree.children(node).iter().rev().map(|&n| (depth + 1, n)));
        }
        out
    }

    /// Children of the entity `id`, or the top-level lists for `None`.
    pub fn children_of(&self, id: Option<&str>) -> Result<Vec<&Entity>, TaskTreeError> {
        let node = match id {
            Some(id) => self.node_for(id)?,
            None => self.tree.root(),
        };
        self.tree
            .children(node)
            .iter()
            .map(|&child| self.entity_at(child))
            .collect()
    }

    /// Parent entity of `id`; `None` for lists.
    pub fn parent_of(&self, id: &str) -> Result<Option<&Entity>, TaskTreeError> {
        let node = self.node_for(id)?;
        Ok(self.tree.parent(node).and_then(|parent| self.tree.value(parent)))
    }

    pub(crate) fn tree(&self) -> &Tree<Entity> {
        &self.tree
    }

    pub(crate) fn index(&self) -> &HashMap<String, NodeId> {
        &self.index
    }

    // -----------------------------------------------------------------------
    // Sibling maintenance
    // -----------------------------------------------------------------------

    /// First position among `parent`'s children where `entity` sorts before
    /// the existing sibling.
    fn insertion_index(&self, parent: NodeId, entity: &Entity) -> usize {
        let children = self.tree.children(parent);
        children
            .iter()
            .position(|&child| {
                self.tree
                    .value(child)
                    .is_some_and(|sibling| compare_entities(sibling, entity).is_gt())
            })
            .unwrap_or(children.len())
    }

    /// Re-derive `previous_sibling_id`, `parent_item_id` and `list_id` for the
    /// items under `parent`. With `renumber`, positions become `0..n` so the
    /// current structural order is also the sort order. `updated_at` moves only
    /// for items whose parent, list or position changed.
    fn refresh_group(&mut self, parent: NodeId, renumber: bool) -> Result<(), TaskTreeError> {
        if parent == self.tree.root() {
            return Ok(());
        }
        let (parent_item_id, list_id) = match self.entity_at(parent)? {
            Entity::List(list) => (None, list.id.clone()),
            Entity::Item(item) => (Some(item.id.clone()), item.list_id.clone()),
        };
        let children = self.tree.children(parent).to_vec();
        let mut previous: Option<String> = None;
        for (position, child) in children.into_iter().enumerate() {
            let Some(Entity::Item(item)) = self.tree.value_mut(child) else {
                return Err(fault(format!("non-item node {child} below {parent}")));
            };
            let renumbered = renumber && item.position != Some(position as i64);
            if item.parent_item_id != parent_item_id || item.list_id != list_id || renumbered {
                item.parent_item_id = parent_item_id.clone();
                item.list_id = list_id.clone();
                item.updated_at = now();
            }
            item.previous_sibling_id = previous.take();
            if renumbered {
                item.position = Some(position as i64);
            }
            previous = Some(item.id.clone());
        }
        Ok(())
    }

    fn sort_groups(&mut self, renumber: bool) -> Result<(), TaskTreeError> {
        let root = self.tree.root();
        let mut groups = vec![root];
        groups.extend(self.tree.descendants(root));
        for parent in groups {
            if self.tree.children(parent).is_empty() {
                continue;
            }
            self.tree.sort_children_by(parent, compare_entities)?;
            self.refresh_group(parent, renumber)?;
        }
        Ok(())
    }

    /// Re-sort every sibling group and refresh sibling links.
    pub fn sort(&mut self) -> Result<(), TaskTreeError> {
        self.sort_groups(false)
    }

    // -----------------------------------------------------------------------
    // Entity CRUD
    // -----------------------------------------------------------------------

    /// Insert a new list or item at its sorted position.
    pub fn add_entity(&mut self, entity: Entity) -> Result<(), TaskTreeError> {
        if self.index.contains_key(entity.id()) {
            return Err(TaskTreeError::EntityOverwrite(entity.id().to_string()));
        }
        let parent = match &entity {
            Entity::List(_) => self.tree.root(),
            Entity::Item(item) => match self.resolve_parent(item)? {
                Some(parent) => parent,
                None => return Err(self.missing_parent(item)),
            },
        };
        let index = self.insertion_index(parent, &entity);
        let id = entity.id().to_string();
        let kind = entity.kind_name();
        self.attach(parent, entity, Some(index))?;
        self.refresh_group(parent, false)?;
        debug!(id = %id, kind, index, "added entity");
        Ok(())
    }

    /// Remove a list with everything below it, or an item whose children
    /// take its place under its former parent. Returns the removed entity.
    pub fn remove_entity(&mut self, id: &str) -> Result<Entity, TaskTreeError> {
        let node = self.node_for(id)?;
        let parent = self
            .tree
            .parent(node)
            .ok_or_else(|| fault(format!("registered entity {id} is detached")))?;

        if self.entity_at(node)?.is_list() {
            self.tree.remove_node(node)?;
            let removed = self.tree.discard(node)?;
            for entity in &removed {
                self.index.remove(entity.id());
            }
            debug!(id, removed = removed.len(), "removed list");
            return removed
                .into_iter()
                .next()
                .ok_or_else(|| fault(format!("list {id} vanished during removal")));
        }

        let index = self
            .tree
            .children(parent)
            .iter()
            .position(|&c| c == node)
            .ok_or_else(|| fault(format!("{id} is missing from its parent's children")))?;
        let children = self.tree.children(node).to_vec();
        self.tree.remove_node(node)?;
        for (offset, &child) in children.iter().enumerate() {
            self.tree.move_node(parent, child, Some(index + offset))?;
        }
        let removed = self.tree.discard(node)?;
        self.index.remove(id);
        self.refresh_group(parent, true)?;
        debug!(id, reparented = children.len(), "removed item");
        removed
            .into_iter()
            .next()
            .ok_or_else(|| fault(format!("item {id} vanished during removal")))
    }

    /// Replace the editable fields (title, and for items status and position)
    /// of an existing entity and move it to its sorted position.
    pub fn update_entity(&mut self, entity: Entity) -> Result<(), TaskTreeError> {
        let id = entity.id().to_string();
        let node = self.node_for(&id)?;
        let current = self
            .tree
            .value_mut(node)
            .ok_or_else(|| fault(format!("indexed node {node} holds no entity")))?;
        match (current, entity) {
            (Entity::List(current), Entity::List(new)) => {
                current.title = new.title;
                current.updated_at = now();
            }
            (Entity::Item(current), Entity::Item(new)) => {
                current.title = new.title;
                current.status = new.status;
                current.position = new.position;
                current.updated_at = now();
            }
            _ => return Err(TaskTreeError::KindMismatch(id)),
        }

        let parent = self
            .tree
            .parent(node)
            .ok_or_else(|| fault(format!("registered entity {id} is detached")))?;
        self.tree.remove_node(node)?;
        let index = {
            let entity = self.entity_at(node)?;
            self.insertion_index(parent, entity)
        };
        self.tree.add_child(parent, node, Some(index))?;
        self.refresh_group(parent, false)?;
        debug!(id = %id, index, "updated entity");
        Ok(())
    }

    /// Set an item's status. Reopening a completed item reopens its completed
    /// ancestors; the new status always cascades to every descendant item.
    /// Returns the IDs whose status changed.
    pub fn update_task_status(
        &mut self,
        id: &str,
        status: TaskStatus,
    ) -> Result<Vec<String>, TaskTreeError> {
        let node = self.node_for(id)?;
        let old = match self.entity_at(node)? {
            Entity::Item(item) => item.status,
            Entity::List(_) => return Err(TaskTreeError::NotAnItem(id.to_string())),
        };

        let mut changed = Vec::new();
        if old == TaskStatus::Completed && status == TaskStatus::NeedsAction {
            for ancestor in self.tree.ancestors(node) {
                self.set_status(ancestor, TaskStatus::NeedsAction, &mut changed);
            }
        }
        self.set_status(node, status, &mut changed);
        for descendant in self.tree.descendants(node) {
            self.set_status(descendant, status, &mut changed);
        }
        debug!(id, ?status, changed = changed.len(), "updated task status");
        Ok(changed)
    }

    fn set_status(&mut self, node: NodeId, status: TaskStatus, changed: &mut Vec<String>) {
        if let Some(Entity::Item(item)) = self.tree.value_mut(node)
            && item.status != status
        {
            item.status = status;
            item.updated_at = now();
            changed.push(item.id.clone());
        }
    }

    // -----------------------------------------------------------------------
    // Reorganization
    // -----------------------------------------------------------------------

    fn item_nodes<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<NodeId>, TaskTreeError> {
        ids.iter()
            .map(|id| {
                let id = id.as_ref();
                let node = self.node_for(id)?;
                if self.entity_at(node)?.is_list() {
                    return Err(TaskTreeError::InvalidReorderTarget(id.to_string()));
                }
                Ok(node)
            })
            .collect()
    }

    /// Run a structural tree operation on items, then refresh every sibling
    /// group the items left or joined.
    fn reorganize<S, F>(&mut self, ids: &[S], operation: &str, op: F) -> Result<(), TaskTreeError>
    where
        S: AsRef<str>,
        F: FnOnce(&mut Tree<Entity>, &[NodeId]) -> Result<(), TreeError>,
    {
        let nodes = self.item_nodes(ids)?;
        let mut groups: Vec<NodeId> = Vec::new();
        for &node in &nodes {
            if let Some(parent) = self.tree.parent(node)
                && !groups.contains(&parent)
            {
                groups.push(parent);
            }
        }
        op(&mut self.tree, &nodes)?;
        for &node in &nodes {
            if let Some(parent) = self.tree.parent(node)
                && !groups.contains(&parent)
            {
                groups.push(parent);
            }
        }
        for &parent in &groups {
            self.refresh_group(parent, true)?;
        }
        debug!(operation, targets = nodes.len(), groups = groups.len(), "reorganized items");
        Ok(())
    }

    /// Make each item a sibling of its parent, right after it.
    pub fn promote_task<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<(), TaskTreeError> {
        self.reorganize(ids, "promote", |tree, nodes| tree.promote(nodes))
    }

    /// Make each run of items children of the sibling before the run.
    pub fn demote_task<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<(), TaskTreeError> {
        self.reorganize(ids, "demote", |tree, nodes| tree.demote(nodes))
    }

    pub fn reorder_task_up<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<(), TaskTreeError> {
        self.reorganize(ids, "reorder_up", |tree, nodes| tree.reorder_up(nodes))
    }

    pub fn reorder_task_down<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<(), TaskTreeError> {
        self.reorganize(ids, "reorder_down", |tree, nodes| tree.reorder_down(nodes))
    }

    // -----------------------------------------------------------------------
    // Baseline
    // -----------------------------------------------------------------------

    /// Independent deep copy in a fresh arena, for diffing after a sync.
    pub fn baseline(&self) -> TaskTree {
        let tree = self.tree.compacted_clone();
        let index = tree
            .descendants(tree.root())
            .into_iter()
            .filter_map(|node| tree.value(node).map(|e| (e.id().to_string(), node)))
            .collect();
        TaskTree { tree, index }
    }

    #[cfg(test)]
    pub(crate) fn tree_mut(&mut self) -> &mut Tree<Entity> {
        &mut self.tree
    }

    #[cfg(test)]
    pub(crate) fn index_mut(&mut self) -> &mut HashMap<String, NodeId> {
        &mut self.index
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
