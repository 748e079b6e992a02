use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tempfile::NamedTempFile;

use crate::model::entity::Entity;
use crate::ops::sync::{FetchSource, PushSink};

/// Error type for the entity stores
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    WriteError { path: PathBuf, source: io::Error },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("could not serialize entities: {0}")]
    SerializeError(#[from] serde_json::Error),
    #[error("{operation} rejected for {id}: {reason}")]
    Rejected {
        operation: &'static str,
        id: String,
        reason: &'static str,
    },
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Flat ID → entity collection acting as the external task source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStore {
    entities: IndexMap<String, Entity>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entities(entities: impl IntoIterator<Item = Entity>) -> Self {
        MemoryStore {
            entities: entities
                .into_iter()
                .map(|e| (e.id().to_string(), e))
                .collect(),
        }
    }

    pub fn entities(&self) -> &IndexMap<String, Entity> {
        &self.entities
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl FetchSource for MemoryStore {
    fn list_all_entities(&mut self) -> Result<IndexMap<String, Entity>, StoreError> {
        Ok(self.entities.clone())
    }
}

impl PushSink for MemoryStore {
    fn insert(&mut self, entity: &Entity) -> Result<(), StoreError> {
        if self.entities.contains_key(entity.id()) {
            return Err(StoreError::Rejected {
                operation: "insert",
                id: entity.id().to_string(),
                reason: "already exists",
            });
        }
        self.entities
            .insert(entity.id().to_string(), entity.clone());
        Ok(())
    }

    fn delete(&mut self, entity: &Entity) -> Result<(), StoreError> {
        match self.entities.shift_remove(entity.id()) {
            Some(_) => Ok(()),
            None => Err(StoreError::Rejected {
                operation: "delete",
                id: entity.id().to_string(),
                reason: "not found",
            }),
        }
    }

    fn update(&mut self, entity: &Entity) -> Result<(), StoreError> {
        match self.entities.get_mut(entity.id()) {
            Some(slot) => {
                *slot = entity.clone();
                Ok(())
            }
            None => Err(StoreError::Rejected {
                operation: "update",
                id: entity.id().to_string(),
                reason: "not found",
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// JSON file store
// ---------------------------------------------------------------------------

/// A [`MemoryStore`] loaded from and saved to a JSON object of ID → entity.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
    dirty: bool,
}

impl JsonFileStore {
    /// Load the store at `path`. A missing file is an empty store.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let inner = MemoryStore {
            entities: read_entities(path)?,
        };
        tracing::debug!(path = %path.display(), entities = inner.len(), "opened store");
        Ok(JsonFileStore {
            path: path.to_path_buf(),
            inner,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entities(&self) -> &IndexMap<String, Entity> {
        self.inner.entities()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write pending changes back. Callers doing a read-modify-write hold
    /// the store's [`FileLock`](crate::io::lock::FileLock) across both.
    pub fn save(&mut self) -> Result<(), StoreError> {
        if !self.dirty {
            return Ok(());
        }
        let json = serde_json::to_string_pretty(self.inner.entities())?;
        atomic_write(&self.path, json.as_bytes()).map_err(|e| StoreError::WriteError {
            path: self.path.clone(),
            source: e,
        })?;
        self.dirty = false;
        tracing::debug!(path = %self.path.display(), entities = self.inner.len(), "saved store");
        Ok(())
    }
}

impl FetchSource for JsonFileStore {
    /// Re-reads the file so edits made by other processes are picked up.
    fn list_all_entities(&mut self) -> Result<IndexMap<String, Entity>, StoreError> {
        if !self.dirty {
            self.inner.entities = read_entities(&self.path)?;
        }
        self.inner.list_all_entities()
    }
}

impl PushSink for JsonFileStore {
    fn insert(&mut self, entity: &Entity) -> Result<(), StoreError> {
        self.inner.insert(entity)?;
        self.dirty = true;
        Ok(())
    }

    fn delete(&mut self, entity: &Entity) -> Result<(), StoreError> {
        self.inner.delete(entity)?;
        self.dirty = true;
        Ok(())
    }

    fn update(&mut self, entity: &Entity) -> Result<(), StoreError> {
        self.inner.update(entity)?;
        self.dirty = true;
        Ok(())
    }
}

fn read_entities(path: &Path) -> Result<IndexMap<String, Entity>, StoreError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(IndexMap::new()),
        Err(e) => {
            return Err(StoreError::ReadError {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    if text.trim().is_empty() {
        return Ok(IndexMap::new());
    }
    serde_json::from_str(&text).map_err(|e| StoreError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write to a temp file in the same directory, then rename over `path`.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entity::{TaskItem, TaskList, TaskStatus};
    use tempfile::TempDir;

    fn sample_store() -> MemoryStore {
        MemoryStore::from_entities([
            TaskList::with_id("L", "Groceries").into(),
            TaskItem::with_id("a", "L", "Eggs").at_position(0).into(),
        ])
    }

    #[test]
    fn memory_store_rejects_duplicate_insert() {
        let mut store = sample_store();
        let dup: Entity = TaskList::with_id("L", "Again").into();
        assert!(matches!(
            store.insert(&dup),
            Err(StoreError::Rejected {
                operation: "insert",
                ..
            })
        ));
        assert_eq!(store.get("L").map(Entity::title), Some("Groceries"));
    }

    #[test]
    fn memory_store_update_and_delete() {
        let mut store = sample_store();
        let done: Entity = TaskItem::with_id("a", "L", "Eggs")
            .with_status(TaskStatus::Completed)
            .into();
        store.update(&done).unwrap();
        assert_eq!(store.get("a"), Some(&done));

        store.delete(&done).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.delete(&done).is_err());
    }

    #[test]
    fn missing_file_opens_empty() {
        let tmp = TempDir::new().unwrap();
        let mut store = JsonFileStore::open(&tmp.path().join("tasks.json")).unwrap();
        assert!(store.list_all_entities().unwrap().is_empty());
        assert!(!store.is_dirty());
    }

    #[test]
    fn save_and_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tasks.json");
        let mut store = JsonFileStore::open(&path).unwrap();
        for entity in sample_store().entities().values() {
            store.insert(entity).unwrap();
        }
        assert!(store.is_dirty());
        store.save().unwrap();
        assert!(!store.is_dirty());

        let mut reopened = JsonFileStore::open(&path).unwrap();
        let entities = reopened.list_all_entities().unwrap();
        assert_eq!(&entities, sample_store().entities());
        let keys: Vec<&str> = entities.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["L", "a"]);
    }

    #[test]
    fn saved_file_is_kind_tagged_json() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tasks.json");
        let mut store = JsonFileStore::open(&path).unwrap();
        store
            .insert(&TaskList::with_id("L", "Groceries").into())
            .unwrap();
        store.save().unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["L"]["kind"], "list");
        assert_eq!(json["L"]["title"], "Groceries");
    }

    #[test]
    fn garbage_file_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tasks.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            JsonFileStore::open(&path),
            Err(StoreError::ParseError { .. })
        ));
    }

    #[test]
    fn atomic_write_replaces_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.json");
        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }
}
