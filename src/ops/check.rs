use std::collections::HashSet;

use serde::Serialize;

use crate::model::entity::{Entity, TaskStatus, compare_entities};
use crate::ops::task_tree::TaskTree;
use crate::tree::NodeId;

/// Structured result from `tt check`, suitable for --json output.
#[derive(Debug, Default, Serialize)]
pub struct CheckResult {
    pub valid: bool,
    pub errors: Vec<CheckError>,
    pub warnings: Vec<CheckWarning>,
}

/// A broken structural invariant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum CheckError {
    /// An entity in the tree has no index entry, or one pointing elsewhere
    #[serde(rename = "unindexed")]
    Unindexed { entity_id: String },
    /// An index entry points at a node that is not reachable from the root
    #[serde(rename = "stale_index")]
    StaleIndex { entity_id: String },
    /// Lists must sit under the root and items must not
    #[serde(rename = "misplaced")]
    Misplaced { entity_id: String, kind: String },
    /// Two adjacent siblings violate the ordering rule
    #[serde(rename = "out_of_order")]
    OutOfOrder {
        entity_id: String,
        previous_id: String,
    },
    #[serde(rename = "wrong_list")]
    WrongList {
        entity_id: String,
        expected: String,
        found: String,
    },
    #[serde(rename = "wrong_parent")]
    WrongParent {
        entity_id: String,
        expected: Option<String>,
        found: Option<String>,
    },
    #[serde(rename = "wrong_previous_sibling")]
    WrongPreviousSibling {
        entity_id: String,
        expected: Option<String>,
        found: Option<String>,
    },
    /// Parent/child links disagree
    #[serde(rename = "structural_fault")]
    StructuralFault { message: String },
}

/// A legal but suspicious state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum CheckWarning {
    /// Item has no position and sorts after its positioned siblings
    #[serde(rename = "missing_position")]
    MissingPosition { entity_id: String },
    /// Open item below a completed one
    #[serde(rename = "open_under_completed")]
    OpenUnderCompleted {
        entity_id: String,
        parent_id: String,
    },
}

// ---------------------------------------------------------------------------
// Main check entry point
// ---------------------------------------------------------------------------

/// Validate a task tree and return structured results.
///
/// Checks performed:
/// 1. Every reachable entity is indexed at its own node, and every index
///    entry is reachable
/// 2. Lists sit directly under the root, items below a list
/// 3. Every sibling group is sorted
/// 4. `list_id`, `parent_item_id` and `previous_sibling_id` match the
///    structure
pub fn check_tree(tree: &TaskTree) -> CheckResult {
    let mut result = CheckResult::default();
    let arena = tree.tree();
    let root = arena.root();

    let mut reachable: HashSet<NodeId> = HashSet::new();
    let mut groups = vec![root];
    groups.extend(arena.descendants(root));

    for &parent in &groups {
        let parent_entity = arena.value(parent);
        let mut previous: Option<&Entity> = None;
        for &child in arena.children(parent) {
            reachable.insert(child);
            if arena.parent(child) != Some(parent) {
                result.errors.push(CheckError::StructuralFault {
                    message: format!("{child} is listed under {parent} but links elsewhere"),
                });
            }
            let Some(entity) = arena.value(child) else {
                result.errors.push(CheckError::StructuralFault {
                    message: format!("{child} holds no entity"),
                });
                continue;
            };
            if tree.index().get(entity.id()) != Some(&child) {
                result.errors.push(CheckError::Unindexed {
                    entity_id: entity.id().to_string(),
                });
            }
            check_placement(entity, parent_entity, previous, &mut result);
            previous = Some(entity);
        }
    }

    let mut stale: Vec<&String> = tree
        .index()
        .iter()
        .filter(|(_, node)| !reachable.contains(node))
        .map(|(id, _)| id)
        .collect();
    stale.sort();
    for id in stale {
        result.errors.push(CheckError::StaleIndex {
            entity_id: id.clone(),
        });
    }

    result.valid = result.errors.is_empty();
    result
}

// ---------------------------------------------------------------------------
// Per-entity validation
// ---------------------------------------------------------------------------

fn check_placement(
    entity: &Entity,
    parent: Option<&Entity>,
    previous: Option<&Entity>,
    result: &mut CheckResult,
) {
    let entity_id = entity.id().to_string();

    if let Some(previous) = previous
        && compare_entities(previous, entity).is_gt()
    {
        result.errors.push(CheckError::OutOfOrder {
            entity_id: entity_id.clone(),
            previous_id: previous.id().to_string(),
        });
    }

    let (item, parent) = match (entity, parent) {
        (Entity::List(_), None) => return,
        (Entity::Item(item), Some(parent)) => (item, parent),
        _ => {
            result.errors.push(CheckError::Misplaced {
                entity_id,
                kind: entity.kind_name().to_string(),
            });
            return;
        }
    };

    let (expected_list, expected_parent) = match parent {
        Entity::List(list) => (list.id.clone(), None),
        Entity::Item(parent) => (parent.list_id.clone(), Some(parent.id.clone())),
    };
    if item.list_id != expected_list {
        result.errors.push(CheckError::WrongList {
            entity_id: entity_id.clone(),
            expected: expected_list,
            found: item.list_id.clone(),
        });
    }
    if item.parent_item_id != expected_parent {
        result.errors.push(CheckError::WrongParent {
            entity_id: entity_id.clone(),
            expected: expected_parent,
            found: item.parent_item_id.clone(),
        });
    }
    let expected_previous = previous.map(|p| p.id().to_string());
    if item.previous_sibling_id != expected_previous {
        result.errors.push(CheckError::WrongPreviousSibling {
            entity_id: entity_id.clone(),
            expected: expected_previous,
            found: item.previous_sibling_id.clone(),
        });
    }

    if item.position.is_none() {
        result.warnings.push(CheckWarning::MissingPosition {
            entity_id: entity_id.clone(),
        });
    }
    if let Entity::Item(parent) = parent
        && parent.status == TaskStatus::Completed
        && item.status == TaskStatus::NeedsAction
    {
        result.warnings.push(CheckWarning::OpenUnderCompleted {
            entity_id,
            parent_id: parent.id.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entity::{TaskItem, TaskList};
    use indexmap::IndexMap;

    fn sample_tree() -> TaskTree {
        let entities: IndexMap<String, Entity> = [
            Entity::from(TaskList::with_id("L", "Errands")),
            TaskItem::with_id("a", "L", "Bread").at_position(0).into(),
            TaskItem::with_id("b", "L", "Milk").at_position(1).into(),
            TaskItem::with_id("c", "L", "Oat").under("b").at_position(0).into(),
        ]
        .into_iter()
        .map(|e| (e.id().to_string(), e))
        .collect();
        TaskTree::from_entities(&entities).unwrap()
    }

    #[test]
    fn valid_tree_has_no_errors() {
        let result = check_tree(&sample_tree());
        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn empty_tree_is_valid() {
        assert!(check_tree(&TaskTree::new()).valid);
    }

    #[test]
    fn detects_stale_previous_sibling() {
        let mut tree = sample_tree();
        let node = tree.index()["b"];
        if let Some(Entity::Item(item)) = tree.tree_mut().value_mut(node) {
            item.previous_sibling_id = None;
        }
        let result = check_tree(&tree);
        assert!(!result.valid);
        assert_eq!(
            result.errors,
            vec![CheckError::WrongPreviousSibling {
                entity_id: "b".into(),
                expected: Some("a".into()),
                found: None,
            }]
        );
    }

    #[test]
    fn detects_out_of_order_siblings() {
        let mut tree = sample_tree();
        let node = tree.index()["a"];
        if let Some(Entity::Item(item)) = tree.tree_mut().value_mut(node) {
            item.position = Some(9);
        }
        let result = check_tree(&tree);
        assert!(result.errors.contains(&CheckError::OutOfOrder {
            entity_id: "b".into(),
            previous_id: "a".into(),
        }));
    }

    #[test]
    fn detects_stale_index_entry() {
        let mut tree = sample_tree();
        let node = tree.index()["c"];
        tree.index_mut().insert("ghost".into(), node);
        tree.index_mut().remove("c");
        let result = check_tree(&tree);
        assert!(result.errors.contains(&CheckError::Unindexed {
            entity_id: "c".into()
        }));
        assert!(!result.errors.contains(&CheckError::StaleIndex {
            entity_id: "ghost".into()
        }));
    }

    #[test]
    fn detached_index_entry_is_stale() {
        let mut tree = sample_tree();
        let node = tree.index()["c"];
        tree.tree_mut().remove_node(node).unwrap();
        let result = check_tree(&tree);
        assert_eq!(
            result.errors,
            vec![CheckError::StaleIndex {
                entity_id: "c".into()
            }]
        );
    }

    #[test]
    fn warns_about_open_item_under_completed_parent() {
        let mut tree = sample_tree();
        let node = tree.index()["b"];
        if let Some(Entity::Item(item)) = tree.tree_mut().value_mut(node) {
            item.status = TaskStatus::Completed;
        }
        let result = check_tree(&tree);
        assert!(result.valid);
        assert_eq!(
            result.warnings,
            vec![CheckWarning::OpenUnderCompleted {
                entity_id: "c".into(),
                parent_id: "b".into(),
            }]
        );
    }

    #[test]
    fn serializes_with_type_tag() {
        let error = CheckError::StaleIndex {
            entity_id: "x".into(),
        };
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["type"], "stale_index");
        assert_eq!(json["entity_id"], "x");
    }
}
