use serde::Serialize;

use crate::model::config::DisplayConfig;
use crate::model::entity::{Entity, TaskStatus};
use crate::ops::check::{CheckError, CheckResult, CheckWarning};
use crate::ops::compare::TreeDiff;
use crate::ops::sync::SyncReport;
use crate::ops::task_tree::{TaskTree, TaskTreeError};

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct EntityJson {
    pub id: String,
    pub kind: &'static str,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<EntityJson>,
}

#[derive(Serialize)]
pub struct MutationJson<'a> {
    pub changed: &'a [String],
    pub sync: &'a SyncReport,
}

pub fn entity_to_json(tree: &TaskTree, entity: &Entity) -> Result<EntityJson, TaskTreeError> {
    let children = tree
        .children_of(Some(entity.id()))?
        .into_iter()
        .map(|child| entity_to_json(tree, child))
        .collect::<Result<Vec<_>, _>>()?;
    let item = entity.as_item();
    Ok(EntityJson {
        id: entity.id().to_string(),
        kind: entity.kind_name(),
        title: entity.title().to_string(),
        status: item.map(|i| i.status),
        position: item.and_then(|i| i.position),
        updated_at: entity
            .updated_at()
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        children,
    })
}

/// Nested JSON for every list, or for the subtree at `id`.
pub fn tree_to_json(tree: &TaskTree, id: Option<&str>) -> Result<Vec<EntityJson>, TaskTreeError> {
    match id {
        Some(id) => Ok(vec![entity_to_json(tree, tree.get_entity_for_id(id)?)?]),
        None => tree
            .children_of(None)?
            .into_iter()
            .map(|list| entity_to_json(tree, list))
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Text formatting
// ---------------------------------------------------------------------------

fn format_entity(entity: &Entity, display: &DisplayConfig) -> String {
    let mut line = match entity {
        Entity::List(list) => list.title.clone(),
        Entity::Item(item) => format!("[{}] {}", item.status.checkbox_char(), item.title),
    };
    if display.show_ids {
        line.push_str(&format!("  ({})", entity.id()));
    }
    line
}

/// Indented outline of the whole forest, or of the subtree at `id`.
///
/// With `show_completed` off, completed items are hidden together with
/// everything below them.
pub fn render_tree(
    tree: &TaskTree,
    id: Option<&str>,
    display: &DisplayConfig,
) -> Result<String, TaskTreeError> {
    let walked = match id {
        Some(id) => tree.walk_from(id)?,
        None => tree.walk(),
    };
    let mut lines = Vec::new();
    let mut hidden_below: Option<usize> = None;
    for (depth, entity) in walked {
        if let Some(limit) = hidden_below {
            if depth > limit {
                continue;
            }
            hidden_below = None;
        }
        if !display.show_completed
            && entity.as_item().is_some_and(|item| item.status.is_completed())
        {
            hidden_below = Some(depth);
            continue;
        }
        lines.push(format!(
            "{}{}",
            " ".repeat(depth * display.indent),
            format_entity(entity, display)
        ));
    }
    Ok(lines.join("\n"))
}

/// One line per changed ID: `+` added, `-` deleted, `~` updated, `>` moved.
pub fn render_diff(diff: &TreeDiff) -> String {
    let mut lines = Vec::new();
    lines.extend(diff.added.iter().map(|id| format!("+ {id}")));
    lines.extend(diff.deleted.iter().map(|id| format!("- {id}")));
    lines.extend(diff.updated.iter().map(|id| format!("~ {id}")));
    lines.extend(diff.moved.iter().map(|id| format!("> {id}")));
    if lines.is_empty() {
        return "no changes".to_string();
    }
    lines.join("\n")
}

pub fn render_report(report: &SyncReport) -> String {
    let mut out = format!(
        "pushed: {} inserted, {} updated, {} moved, {} deleted",
        report.inserted, report.updated, report.moved, report.deleted
    );
    if report.skipped_updates > 0 {
        out.push_str(&format!(" ({} updates skipped)", report.skipped_updates));
    }
    out
}

pub fn render_check(result: &CheckResult) -> String {
    let mut lines = Vec::new();
    if !result.errors.is_empty() {
        lines.push("Errors:".to_string());
        for err in &result.errors {
            lines.push(format!("  {}", describe_error(err)));
        }
    }
    if !result.warnings.is_empty() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push("Warnings:".to_string());
        for warning in &result.warnings {
            lines.push(format!("  {}", describe_warning(warning)));
        }
    }
    if result.valid {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push("ok".to_string());
    }
    lines.join("\n")
}

fn show_opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("none")
}

fn describe_error(err: &CheckError) -> String {
    match err {
        CheckError::Unindexed { entity_id } => format!("{entity_id} is not indexed at its node"),
        CheckError::StaleIndex { entity_id } => {
            format!("{entity_id} is indexed but not in the tree")
        }
        CheckError::Misplaced { entity_id, kind } => {
            format!("{kind} {entity_id} is at the wrong level")
        }
        CheckError::OutOfOrder {
            entity_id,
            previous_id,
        } => format!("{entity_id} sorts before its previous sibling {previous_id}"),
        CheckError::WrongList {
            entity_id,
            expected,
            found,
        } => format!("{entity_id} has list {found}, expected {expected}"),
        CheckError::WrongParent {
            entity_id,
            expected,
            found,
        } => format!(
            "{entity_id} has parent {}, expected {}",
            show_opt(found),
            show_opt(expected)
        ),
        CheckError::WrongPreviousSibling {
            entity_id,
            expected,
            found,
        } => format!(
            "{entity_id} has previous sibling {}, expected {}",
            show_opt(found),
            show_opt(expected)
        ),
        CheckError::StructuralFault { message } => message.clone(),
    }
}

fn describe_warning(warning: &CheckWarning) -> String {
    match warning {
        CheckWarning::MissingPosition { entity_id } => format!("{entity_id} has no position"),
        CheckWarning::OpenUnderCompleted {
            entity_id,
            parent_id,
        } => format!("{entity_id} is open under completed {parent_id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entity::{TaskItem, TaskList};
    use indexmap::IndexMap;
    use insta::assert_snapshot;

    fn sample_tree() -> TaskTree {
        let entities: IndexMap<String, Entity> = [
            Entity::from(TaskList::with_id("L", "Work")),
            TaskList::with_id("H", "Home").into(),
            TaskItem::with_id("a", "L", "Write report").at_position(0).into(),
            TaskItem::with_id("b", "L", "Review")
                .at_position(1)
                .with_status(TaskStatus::Completed)
                .into(),
            TaskItem::with_id("c", "L", "Check figures")
                .under("b")
                .at_position(0)
                .with_status(TaskStatus::Completed)
                .into(),
            TaskItem::with_id("d", "H", "Water plants").at_position(0).into(),
        ]
        .into_iter()
        .map(|e| (e.id().to_string(), e))
        .collect();
        TaskTree::from_entities(&entities).unwrap()
    }

    #[test]
    fn renders_indented_outline() {
        let text = render_tree(&sample_tree(), None, &DisplayConfig::default()).unwrap();
        assert_snapshot!(text, @r"
Home
  [ ] Water plants
Work
  [ ] Write report
  [x] Review
    [x] Check figures
");
    }

    #[test]
    fn hides_completed_subtrees() {
        let display = DisplayConfig {
            show_completed: false,
            ..DisplayConfig::default()
        };
        let text = render_tree(&sample_tree(), Some("L"), &display).unwrap();
        assert_snapshot!(text, @r"
Work
  [ ] Write report
");
    }

    #[test]
    fn renders_ids_and_custom_indent() {
        let display = DisplayConfig {
            show_ids: true,
            indent: 4,
            ..DisplayConfig::default()
        };
        let text = render_tree(&sample_tree(), Some("b"), &display).unwrap();
        assert_snapshot!(text, @r"
[x] Review  (b)
    [x] Check figures  (c)
");
    }

    #[test]
    fn unknown_subtree_is_error() {
        let result = render_tree(&sample_tree(), Some("zz"), &DisplayConfig::default());
        assert_eq!(result, Err(TaskTreeError::UnregisteredEntity("zz".into())));
    }

    #[test]
    fn json_nests_children() {
        let json = serde_json::to_value(tree_to_json(&sample_tree(), None).unwrap()).unwrap();
        assert_eq!(json[0]["title"], "Home");
        assert_eq!(json[1]["kind"], "list");
        assert_eq!(json[1]["children"][1]["id"], "b");
        assert_eq!(json[1]["children"][1]["status"], "completed");
        assert_eq!(json[1]["children"][1]["children"][0]["id"], "c");
        assert!(json[0].get("status").is_none());
    }

    #[test]
    fn diff_lines() {
        let diff = TreeDiff {
            added: ["n".to_string()].into(),
            deleted: ["a".to_string(), "b".to_string()].into(),
            updated: ["c".to_string()].into(),
            moved: ["d".to_string()].into(),
        };
        assert_snapshot!(render_diff(&diff), @r"
+ n
- a
- b
~ c
> d
");
        assert_eq!(render_diff(&TreeDiff::default()), "no changes");
    }

    #[test]
    fn report_mentions_skipped_updates() {
        let report = SyncReport {
            inserted: 1,
            updated: 0,
            moved: 4,
            deleted: 2,
            skipped_updates: 3,
        };
        assert_eq!(
            render_report(&report),
            "pushed: 1 inserted, 0 updated, 4 moved, 2 deleted (3 updates skipped)"
        );
    }
}
