use std::fs;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::io::storage::Storage;
use crate::model::files::{ArchivedExecFile, ArchivedRecord};
use crate::model::item::{ItemKind, ItemStatus};
use crate::model::project::Project;
use crate::ops::archived::{ArchiveSource, LazyArchivedItem};
use crate::ops::completion::{is_exec_tree_complete, CompletionEvent, CompletionListener};
use crate::ops::navigation::clear_stale_positions;

const EXEC_SUFFIX: &str = ".exec.json";

/// Moves finished work out of the active files into `archive/`.
///
/// Archive files are written before the subtree leaves the active tree, so a
/// failed write leaves the project as it was. The caller saves the project.
#[derive(Debug, Clone)]
pub struct ArchiveManager {
    storage: Storage,
}

impl ArchiveManager {
    pub fn new(storage: Storage) -> Self {
        ArchiveManager { storage }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Archive an objective with its deliverables and actions
    pub fn archive_objective(&self, project: &mut Project, id: Uuid) -> Result<()> {
        let objective = project
            .get(id)
            .ok_or_else(|| Error::not_found(id.to_string()))?;
        if objective.kind != ItemKind::Objective {
            return Err(Error::invalid_op(format!(
                "'{}' is a {}, not an objective",
                objective.slug, objective.kind
            )));
        }

        let mut exec = ArchivedExecFile::default();
        for (position, deliverable) in active_with_positions(project, id) {
            for (action_pos, action) in active_with_positions(project, deliverable) {
                if let Some(item) = project.get(action) {
                    exec.actions.push(ArchivedRecord {
                        item: item.clone(),
                        position: action_pos,
                    });
                }
            }
            if let Some(item) = project.get(deliverable) {
                exec.deliverables.push(ArchivedRecord {
                    item: item.clone(),
                    position,
                });
            }
        }
        self.storage.save_archived_exec(id, &exec)?;
        self.write_strategic_record(project, id)?;

        project.detach_subtree(id, true);
        clear_stale_positions(project);
        tracing::info!(
            objective = %id,
            deliverables = exec.deliverables.len(),
            actions = exec.actions.len(),
            "archived objective"
        );
        Ok(())
    }

    /// Archive a strategic item. Milestones and phases take their active
    /// descendants with them; execution items cannot be archived alone.
    pub fn archive_item(&self, project: &mut Project, id: Uuid) -> Result<()> {
        let item = project
            .get(id)
            .ok_or_else(|| Error::not_found(id.to_string()))?;
        match item.kind {
            ItemKind::Deliverable | ItemKind::Action => Err(Error::invalid_op(format!(
                "{} '{}' is archived together with its objective",
                item.kind, item.slug
            ))),
            ItemKind::Objective => self.archive_objective(project, id),
            ItemKind::Milestone | ItemKind::Phase => {
                let kind = item.kind;
                let children: Vec<Uuid> = project.children(Some(id)).iter().map(|c| c.id).collect();
                for child in children {
                    self.archive_item(project, child)?;
                }
                self.write_strategic_record(project, id)?;
                project.detach_subtree(id, true);
                clear_stale_positions(project);
                tracing::info!(%kind, id = %id, "archived");
                Ok(())
            }
        }
    }

    /// Archive finished siblings of `kind` under `parent_id` (`None` for
    /// phases) ahead of adding a new one. Objectives qualify when their
    /// execution tree is complete; milestones and phases on status alone.
    /// Failures are logged and skipped.
    pub fn archive_completed_siblings(
        &self,
        project: &mut Project,
        parent_id: Option<Uuid>,
        kind: ItemKind,
    ) -> Vec<Uuid> {
        let candidates: Vec<Uuid> = project
            .children(parent_id)
            .iter()
            .filter(|c| c.kind == kind && c.is_completed())
            .filter(|c| kind != ItemKind::Objective || is_exec_tree_complete(project, c.id))
            .map(|c| c.id)
            .collect();

        let mut archived = Vec::new();
        for id in candidates {
            match self.archive_item(project, id) {
                Ok(()) => archived.push(id),
                Err(e) => tracing::warn!(%kind, id = %id, error = %e, "could not archive sibling"),
            }
        }
        archived
    }

    /// Archived strategic items, phases first, each kind in archive order
    pub fn list_archived(&self, kind: Option<ItemKind>) -> Result<Vec<LazyArchivedItem>> {
        let file = self.storage.load_archived_strategic()?;
        Ok(file
            .list(kind)
            .into_iter()
            .map(|r| {
                LazyArchivedItem::preloaded(r.item.clone(), ArchiveSource::Strategic, self.storage.clone())
            })
            .collect())
    }

    /// Find an archived item by id in the strategic archive or any
    /// objective's execution archive
    pub fn get_archived_item(&self, id: Uuid) -> Result<Option<LazyArchivedItem>> {
        let strategic = self.storage.load_archived_strategic()?;
        if let Some(record) = strategic.find(id) {
            return Ok(Some(LazyArchivedItem::preloaded(
                record.item.clone(),
                ArchiveSource::Strategic,
                self.storage.clone(),
            )));
        }

        for objective_id in self.archived_exec_ids() {
            let Some(exec) = self.storage.load_archived_exec(objective_id)? else {
                continue;
            };
            if let Some(record) = exec.find(id) {
                return Ok(Some(LazyArchivedItem::preloaded(
                    record.item.clone(),
                    ArchiveSource::Exec(objective_id),
                    self.storage.clone(),
                )));
            }
        }
        Ok(None)
    }

    fn archived_exec_ids(&self) -> Vec<Uuid> {
        let Ok(entries) = fs::read_dir(self.storage.archive_dir()) else {
            return Vec::new();
        };
        entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name();
                let stem = name.to_str()?.strip_suffix(EXEC_SUFFIX)?.to_string();
                Uuid::parse_str(&stem).ok()
            })
            .collect()
    }

    fn write_strategic_record(&self, project: &Project, id: Uuid) -> Result<()> {
        let item = project
            .get(id)
            .ok_or_else(|| Error::not_found(id.to_string()))?;
        let position = project
            .child_ids(item.parent_id)
            .iter()
            .position(|c| *c == id)
            .unwrap_or(0);
        let mut record = ArchivedRecord {
            item: item.clone(),
            position,
        };
        record.item.status = ItemStatus::Archived;
        record.item.touch();

        let mut file = self.storage.load_archived_strategic()?;
        file.push(record);
        self.storage.save_archived_strategic(&file)?;
        Ok(())
    }
}

/// Active children of `parent` paired with their slot in its child list
fn active_with_positions(project: &Project, parent: Uuid) -> Vec<(usize, Uuid)> {
    project
        .child_ids(Some(parent))
        .iter()
        .enumerate()
        .filter(|(_, id)| project.contains(**id))
        .map(|(i, id)| (i, *id))
        .collect()
}

/// Archives each objective the completion cascade finishes
#[derive(Debug, Clone)]
pub struct AutoArchiver {
    manager: ArchiveManager,
}

impl AutoArchiver {
    pub fn new(manager: ArchiveManager) -> Self {
        AutoArchiver { manager }
    }
}

impl CompletionListener for AutoArchiver {
    fn on_completion(&self, project: &mut Project, event: &CompletionEvent) -> Result<()> {
        let CompletionEvent::StrategicCompleted { id, kind, name } = event;
        if *kind != ItemKind::Objective {
            return Ok(());
        }
        tracing::info!(objective = %name, "auto-archiving completed objective");
        self.manager.archive_objective(project, *id)
    }
}
