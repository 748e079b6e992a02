use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::io::store::StoreError;
use crate::model::config::SyncConfig;
use crate::model::entity::Entity;
use crate::ops::compare::{TreeComparator, TreeDiff};
use crate::ops::task_tree::{TaskTree, TaskTreeError};

/// Supplies the flat ID → entity snapshot a tree is built from.
pub trait FetchSource {
    fn list_all_entities(&mut self) -> Result<IndexMap<String, Entity>, StoreError>;
}

/// Receives the changes found when pushing a working tree.
pub trait PushSink {
    fn insert(&mut self, entity: &Entity) -> Result<(), StoreError>;

    fn delete(&mut self, entity: &Entity) -> Result<(), StoreError>;

    /// Sinks that cannot apply updates may keep the default.
    fn update(&mut self, entity: &Entity) -> Result<(), StoreError> {
        let _ = entity;
        Ok(())
    }
}

/// Error type for fetch/push
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Tree(#[from] TaskTreeError),
}

/// Counts of what a push sent to the sink
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub inserted: usize,
    pub deleted: usize,
    pub updated: usize,
    /// Position-only changes, sent through `update`
    pub moved: usize,
    /// Updates and moves found but not sent because `push_updates` is off
    pub skipped_updates: usize,
}

/// A working tree plus the baseline it last agreed with the source on.
#[derive(Debug, Clone)]
pub struct SyncSession {
    working: TaskTree,
    baseline: TaskTree,
    config: SyncConfig,
    /// Sink calls that succeeded during a push that later failed: the entity
    /// the sink now holds, or `None` once deleted. Cleared on re-baseline.
    applied: IndexMap<String, Option<Entity>>,
}

/// Parent or list differ, so the store must learn the change for its
/// references to stay valid.
fn placement_changed(before: &Entity, after: &Entity) -> bool {
    match (before.as_item(), after.as_item()) {
        (Some(b), Some(a)) => b.parent_item_id != a.parent_item_id || b.list_id != a.list_id,
        _ => false,
    }
}

impl SyncSession {
    /// Build the working tree from `source` and snapshot it as the baseline.
    pub fn fetch(source: &mut dyn FetchSource, config: SyncConfig) -> Result<Self, SyncError> {
        let entities = source.list_all_entities()?;
        let working = TaskTree::from_entities(&entities)?;
        let baseline = working.baseline();
        debug!(entities = working.len(), "fetched task data");
        Ok(SyncSession {
            working,
            baseline,
            config,
            applied: IndexMap::new(),
        })
    }

    /// Discard local state and rebuild both trees from `source`.
    pub fn refetch(&mut self, source: &mut dyn FetchSource) -> Result<(), SyncError> {
        let entities = source.list_all_entities()?;
        self.working.build(&entities)?;
        self.baseline = self.working.baseline();
        self.applied.clear();
        debug!(entities = self.working.len(), "refetched task data");
        Ok(())
    }

    pub fn working(&self) -> &TaskTree {
        &self.working
    }

    pub fn working_mut(&mut self) -> &mut TaskTree {
        &mut self.working
    }

    pub fn baseline(&self) -> &TaskTree {
        &self.baseline
    }

    /// Changes made since the last fetch or push.
    pub fn pending(&self) -> TreeDiff {
        TreeComparator::new(&self.baseline, &self.working).diff()
    }

    /// What the sink holds for `id`, as far as this session knows.
    fn sink_copy(&self, id: &str) -> Option<&Entity> {
        match self.applied.get(id) {
            Some(sent) => sent.as_ref(),
            None => self.baseline.get_entity_for_id(id).ok(),
        }
    }

    /// Send pending changes to `sink` and re-baseline.
    ///
    /// Inserts go parents first, then updates and moves, then deletes
    /// children first. If the sink fails part-way the baseline is kept and
    /// the calls that did succeed are remembered, so the next push resends
    /// only what the sink is still missing.
    ///
    /// With `push_updates` off, updates and moves are skipped unless they
    /// change an item's parent or list.
    pub fn push(&mut self, sink: &mut dyn PushSink) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();
        let entities = self.working.all_entities();

        for &entity in &entities {
            let id = entity.id();
            if self.sink_copy(id).is_some() {
                continue;
            }
            sink.insert(entity)?;
            self.applied.insert(id.to_string(), Some(entity.clone()));
            report.inserted += 1;
        }

        for &entity in &entities {
            let id = entity.id();
            let (updated, moved, placement) = match self.sink_copy(id) {
                Some(held) if held != entity => {
                    let same_content = held.content_eq(entity);
                    let repositioned = held.as_item().map(|i| i.position)
                        != entity.as_item().map(|i| i.position);
                    (
                        !same_content,
                        same_content && repositioned,
                        placement_changed(held, entity),
                    )
                }
                _ => continue,
            };
            if !updated && !moved {
                continue;
            }
            if !self.config.push_updates && !placement {
                warn!(id = %id, "update not pushed");
                report.skipped_updates += 1;
                continue;
            }
            sink.update(entity)?;
            self.applied.insert(id.to_string(), Some(entity.clone()));
            if moved {
                report.moved += 1;
            } else {
                report.updated += 1;
            }
        }

        // entities inserted by a failed push and removed locally since
        let stale: Vec<Entity> = self
            .applied
            .values()
            .rev()
            .flatten()
            .filter(|e| !self.working.contains(e.id()) && !self.baseline.contains(e.id()))
            .cloned()
            .collect();
        let gone = self
            .baseline
            .all_entities()
            .into_iter()
            .rev()
            .filter(|e| !self.working.contains(e.id()))
            .cloned();
        for entity in stale.into_iter().chain(gone) {
            if self.sink_copy(entity.id()).is_none() {
                continue;
            }
            sink.delete(&entity)?;
            self.applied.insert(entity.id().to_string(), None);
            report.deleted += 1;
        }

        self.baseline = self.working.baseline();
        self.applied.clear();
        debug!(
            inserted = report.inserted,
            updated = report.updated,
            moved = report.moved,
            deleted = report.deleted,
            "pushed task data"
        );
        Ok(report)
    }
}
