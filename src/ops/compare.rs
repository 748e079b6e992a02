use std::collections::BTreeSet;

use serde::Serialize;

use crate::ops::task_tree::TaskTree;

/// IDs that differ between a baseline and a working tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TreeDiff {
    pub added: BTreeSet<String>,
    pub deleted: BTreeSet<String>,
    pub updated: BTreeSet<String>,
    /// Items whose position changed with no other edit
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub moved: BTreeSet<String>,
}

impl TreeDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.deleted.is_empty()
            && self.updated.is_empty()
            && self.moved.is_empty()
    }

    pub fn change_count(&self) -> usize {
        self.added.len() + self.deleted.len() + self.updated.len() + self.moved.len()
    }
}

/// Compares a baseline snapshot against the working tree.
///
/// An entity is updated when it exists in both trees and its user-editable
/// content differs (see [`Entity::content_eq`](crate::model::Entity::content_eq)).
/// Pure reordering is not an update; it is reported separately as a move.
pub struct TreeComparator<'a> {
    baseline: &'a TaskTree,
    working: &'a TaskTree,
}

impl<'a> TreeComparator<'a> {
    pub fn new(baseline: &'a TaskTree, working: &'a TaskTree) -> Self {
        TreeComparator { baseline, working }
    }

    /// IDs in the working tree but not the baseline.
    pub fn find_added_ids(&self) -> BTreeSet<String> {
        self.working
            .ids()
            .filter(|id| !self.baseline.contains(id))
            .map(String::from)
            .collect()
    }

    /// IDs in the baseline but not the working tree.
    pub fn find_deleted_ids(&self) -> BTreeSet<String> {
        self.baseline
            .ids()
            .filter(|id| !self.working.contains(id))
            .map(String::from)
            .collect()
    }

    pub fn find_updated_ids(&self) -> BTreeSet<String> {
        self.working
            .ids()
            .filter(|id| {
                match (
                    self.baseline.get_entity_for_id(id),
                    self.working.get_entity_for_id(id),
                ) {
                    (Ok(before), Ok(after)) => !before.content_eq(after),
                    _ => false,
                }
            })
            .map(String::from)
            .collect()
    }

    /// Items present in both trees with equal content but a new position.
    pub fn find_moved_ids(&self) -> BTreeSet<String> {
        self.working
            .ids()
            .filter(|id| {
                match (
                    self.baseline.get_entity_for_id(id),
                    self.working.get_entity_for_id(id),
                ) {
                    (Ok(before), Ok(after)) => {
                        before.content_eq(after)
                            && before.as_item().map(|i| i.position)
                                != after.as_item().map(|i| i.position)
                    }
                    _ => false,
                }
            })
            .map(String::from)
            .collect()
    }

    pub fn diff(&self) -> TreeDiff {
        TreeDiff {
            added: self.find_added_ids(),
            deleted: self.find_deleted_ids(),
            updated: self.find_updated_ids(),
            moved: self.find_moved_ids(),
        }
    }
}
