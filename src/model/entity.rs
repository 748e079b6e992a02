use std::cmp::Ordering;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Item completion status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    NeedsAction,
    Completed,
}

impl TaskStatus {
    /// The character used inside the checkbox `[ ]`
    pub fn checkbox_char(self) -> char {
        match self {
            TaskStatus::NeedsAction => ' ',
            TaskStatus::Completed => 'x',
        }
    }

    pub fn is_completed(self) -> bool {
        self == TaskStatus::Completed
    }
}

/// Current time truncated to whole seconds.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// A fresh globally unique entity ID.
pub fn fresh_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Second-resolution UTC timestamps. Sub-second precision and the source
/// offset are dropped when reading.
mod timestamp {
    use chrono::{DateTime, SubsecRound, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&dt.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc).trunc_subsecs(0))
            .map_err(serde::de::Error::custom)
    }
}

/// A root-level task container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    pub id: String,
    pub title: String,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl TaskList {
    /// Create a new list with a fresh ID
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_id(fresh_id(), title)
    }

    /// Create a list with an ID supplied by the external source
    pub fn with_id(id: impl Into<String>, title: impl Into<String>) -> Self {
        TaskList {
            id: id.into(),
            title: title.into(),
            updated_at: now(),
        }
    }
}

/// A task, nested under a list or under another item of the same list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskItem {
    pub id: String,
    pub title: String,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub status: TaskStatus,
    /// `None` means the item sits directly under its list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_item_id: Option<String>,
    pub list_id: String,
    /// External ordering hint; items without one sort last
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    /// Maintained by the task tree
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_sibling_id: Option<String>,
}

impl TaskItem {
    /// Create a new item directly under `list_id`, with a fresh ID
    pub fn new(list_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self::with_id(fresh_id(), list_id, title)
    }

    /// Create an item with an ID supplied by the external source
    pub fn with_id(
        id: impl Into<String>,
        list_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        TaskItem {
            id: id.into(),
            title: title.into(),
            updated_at: now(),
            status: TaskStatus::NeedsAction,
            parent_item_id: None,
            list_id: list_id.into(),
            position: None,
            previous_sibling_id: None,
        }
    }

    pub fn under(mut self, parent_item_id: impl Into<String>) -> Self {
        self.parent_item_id = Some(parent_item_id.into());
        self
    }

    pub fn at_position(mut self, position: i64) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }
}

/// A list or an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    List(TaskList),
    Item(TaskItem),
}

impl Entity {
    pub fn id(&self) -> &str {
        match self {
            Entity::List(list) => &list.id,
            Entity::Item(item) => &item.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Entity::List(list) => &list.title,
            Entity::Item(item) => &item.title,
        }
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        match self {
            Entity::List(list) => list.updated_at,
            Entity::Item(item) => item.updated_at,
        }
    }

    /// Mark the entity as modified now
    pub fn touch(&mut self) {
        let ts = now();
        match self {
            Entity::List(list) => list.updated_at = ts,
            Entity::Item(item) => item.updated_at = ts,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Entity::List(_) => "list",
            Entity::Item(_) => "item",
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Entity::List(_))
    }

    pub fn as_item(&self) -> Option<&TaskItem> {
        match self {
            Entity::Item(item) => Some(item),
            Entity::List(_) => None,
        }
    }

    pub fn as_item_mut(&mut self) -> Option<&mut TaskItem> {
        match self {
            Entity::Item(item) => Some(item),
            Entity::List(_) => None,
        }
    }

    /// Equality over the fields a user can change. Ignores `updated_at` and
    /// the fields derived from tree position (`position`, `previous_sibling_id`).
    pub fn content_eq(&self, other: &Entity) -> bool {
        match (self, other) {
            (Entity::List(a), Entity::List(b)) => a.id == b.id && a.title == b.title,
            (Entity::Item(a), Entity::Item(b)) => {
                a.id == b.id
                    && a.title == b.title
                    && a.status == b.status
                    && a.parent_item_id == b.parent_item_id
                    && a.list_id == b.list_id
            }
            _ => false,
        }
    }
}

impl From<TaskList> for Entity {
    fn from(list: TaskList) -> Self {
        Entity::List(list)
    }
}

impl From<TaskItem> for Entity {
    fn from(item: TaskItem) -> Self {
        Entity::Item(item)
    }
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

fn compare_title_then_id(a_title: &str, a_id: &str, b_title: &str, b_id: &str) -> Ordering {
    a_title
        .to_lowercase()
        .cmp(&b_title.to_lowercase())
        .then_with(|| a_id.cmp(b_id))
}

/// Lists: title (case-insensitive), then ID.
pub fn compare_lists(a: &TaskList, b: &TaskList) -> Ordering {
    compare_title_then_id(&a.title, &a.id, &b.title, &b.id)
}

/// Items: position ascending with undefined positions last, then title
/// (case-insensitive), then ID.
pub fn compare_items(a: &TaskItem, b: &TaskItem) -> Ordering {
    let by_position = match (a.position, b.position) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_position.then_with(|| compare_title_then_id(&a.title, &a.id, &b.title, &b.id))
}

/// Sibling ordering for any pair of entities. Lists and items never share a
/// sibling group; lists sort first if they are ever compared.
pub fn compare_entities(a: &Entity, b: &Entity) -> Ordering {
    match (a, b) {
        (Entity::List(x), Entity::List(y)) => compare_lists(x, y),
        (Entity::Item(x), Entity::Item(y)) => compare_items(x, y),
        (Entity::List(_), Entity::Item(_)) => Ordering::Less,
        (Entity::Item(_), Entity::List(_)) => Ordering::Greater,
    }
}
