use crate::error::Result;
use crate::io::project_io::save_project;
use crate::io::storage::Storage;
use crate::model::item::{Item, ItemKind, ItemStatus};
use crate::model::project::Project;
use crate::ops::archive::{ArchiveManager, AutoArchiver};
use crate::ops::completion::CompletionTracker;
use crate::ops::navigation::{cursor_item, current_item, get_item_path};

/// Drives the task cursor through the current objective's actions.
///
/// Every transition is saved before it is returned. Returned items are
/// snapshots: a completed action may already have left the active tree by
/// the time the caller sees it.
pub struct TaskManager {
    tracker: CompletionTracker,
}

impl TaskManager {
    pub fn new(tracker: CompletionTracker) -> Self {
        TaskManager { tracker }
    }

    /// A manager whose cascade archives finished objectives
    pub fn with_auto_archive(storage: Storage) -> Self {
        let archiver = AutoArchiver::new(ArchiveManager::new(storage));
        Self::new(CompletionTracker::new().with_listener(archiver))
    }

    /// The in-progress action under the cursor, if any
    fn active_action(project: &Project) -> Option<&Item> {
        cursor_item(project)
            .filter(|i| i.kind == ItemKind::Action && i.status == ItemStatus::InProgress)
    }

    /// Start the first pending action of the current objective, or return the
    /// one already in progress. Clears the cursor when nothing is left.
    pub fn start_next_action(&self, project: &mut Project) -> Result<Option<Item>> {
        if let Some(active) = Self::active_action(project) {
            return Ok(Some(active.clone()));
        }

        let next = current_item(project, ItemKind::Objective).and_then(|objective| {
            project
                .children(Some(objective.id))
                .into_iter()
                .filter(|d| !d.is_completed())
                .flat_map(|d| project.children(Some(d.id)))
                .find(|a| a.status == ItemStatus::Pending)
                .map(|a| a.id)
        });

        let Some(id) = next else {
            tracing::info!("no pending actions left");
            project.cursor = None;
            save_project(project)?;
            return Ok(None);
        };

        let path = get_item_path(project, id);
        let started = project.get_mut(id).map(|action| {
            action.status = ItemStatus::InProgress;
            action.touch();
            action.clone()
        });
        project.cursor = path;
        save_project(project)?;
        if let Some(action) = &started {
            tracing::info!(slug = %action.slug, "started action");
        }
        Ok(started)
    }

    /// Complete the in-progress action under the cursor and cascade upward.
    /// Does nothing when no action is in progress.
    pub fn complete_current_action(&self, project: &mut Project) -> Result<Option<Item>> {
        let Some(id) = Self::active_action(project).map(|a| a.id) else {
            return Ok(None);
        };
        let completed = project.get_mut(id).map(|action| {
            action.status = ItemStatus::Completed;
            action.touch();
            action.clone()
        });

        let events = self.tracker.cascade_completion(project, id);
        tracing::info!(cascaded = events.len(), "completed action");
        save_project(project)?;
        Ok(completed)
    }

    /// Complete the current action, then start the next one
    pub fn complete_current_and_start_next(
        &self,
        project: &mut Project,
    ) -> Result<(Option<Item>, Option<Item>)> {
        let completed = self.complete_current_action(project)?;
        let next = self.start_next_action(project)?;
        Ok((completed, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::project_io::{init_project, load_project};
    use crate::ops::crud::{self, NewItem};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        storage: Storage,
        archive: ArchiveManager,
        tasks: TaskManager,
        project: Project,
    }

    impl Fixture {
        fn add(&mut self, kind: &str, name: &str, parent: &str) {
            crud::add(
                &mut self.project,
                &self.archive,
                &NewItem {
                    kind,
                    name,
                    parent_path: Some(parent).filter(|p| !p.is_empty()),
                    ..Default::default()
                },
            )
            .unwrap();
        }

        fn status_at(&self, path: &str) -> Option<ItemStatus> {
            crate::ops::navigation::get_item_by_path(&self.project, path).map(|i| i.status)
        }
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let prism_dir = init_project(dir.path(), false).unwrap();
        let project = load_project(&prism_dir).unwrap();
        let storage = Storage::new(&prism_dir);
        Fixture {
            _dir: dir,
            archive: ArchiveManager::new(storage.clone()),
            tasks: TaskManager::with_auto_archive(storage.clone()),
            storage,
            project,
        }
    }

    /// Alpha/M1/O1/D1/{A1, A2}
    fn scenario() -> Fixture {
        let mut f = fixture();
        f.add("phase", "Alpha", "");
        f.add("milestone", "M1", "/alpha");
        f.add("objective", "O1", "/alpha/m1");
        f.add("deliverable", "D1", "/alpha/m1/o1");
        f.add("action", "A1", "/alpha/m1/o1/d1");
        f.add("action", "A2", "/alpha/m1/o1/d1");
        f
    }

    #[test]
    fn test_full_objective_lifecycle() {
        let mut f = scenario();

        let started = f.tasks.start_next_action(&mut f.project).unwrap().unwrap();
        assert_eq!(started.name, "A1");
        assert_eq!(started.status, ItemStatus::InProgress);

        let done = f.tasks.complete_current_action(&mut f.project).unwrap().unwrap();
        assert_eq!(done.name, "A1");
        assert_eq!(done.status, ItemStatus::Completed);
        assert_eq!(f.status_at("alpha/m1/o1/d1"), Some(ItemStatus::Pending));

        let started = f.tasks.start_next_action(&mut f.project).unwrap().unwrap();
        assert_eq!(started.name, "A2");
        let done = f.tasks.complete_current_action(&mut f.project).unwrap().unwrap();
        assert_eq!(done.name, "A2");

        // D1 and O1 cascaded, and O1 left for the archive
        assert_eq!(f.status_at("alpha/m1/o1"), None);
        let archived = f.storage.load_archived_strategic().unwrap();
        assert_eq!(archived.objectives.len(), 1);
        assert_eq!(archived.objectives[0].item.name, "O1");
        let exec = f
            .storage
            .load_archived_exec(archived.objectives[0].item.id)
            .unwrap()
            .unwrap();
        assert_eq!(exec.deliverables[0].item.status, ItemStatus::Completed);
        assert_eq!(exec.actions.len(), 2);
        assert_eq!(f.project.cursor, None);

        // The saved state matches memory
        let reloaded = load_project(&f.project.dir).unwrap();
        assert_eq!(reloaded.items().len(), 2);
        assert_eq!(reloaded.cursor, None);
    }

    #[test]
    fn test_start_is_idempotent_while_in_progress() {
        let mut f = scenario();
        let first = f.tasks.start_next_action(&mut f.project).unwrap().unwrap();
        let again = f.tasks.start_next_action(&mut f.project).unwrap().unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(f.status_at("alpha/m1/o1/d1/a2"), Some(ItemStatus::Pending));
        assert_eq!(f.project.cursor.as_deref(), Some("alpha/m1/o1/d1/a1"));
    }

    #[test]
    fn test_start_persists_cursor() {
        let mut f = scenario();
        f.tasks.start_next_action(&mut f.project).unwrap();
        let reloaded = load_project(&f.project.dir).unwrap();
        assert_eq!(reloaded.cursor.as_deref(), Some("alpha/m1/o1/d1/a1"));
        let a1 = cursor_item(&reloaded).unwrap();
        assert_eq!(a1.status, ItemStatus::InProgress);
    }

    #[test]
    fn test_complete_without_active_action_is_noop() {
        let mut f = scenario();
        assert!(f.tasks.complete_current_action(&mut f.project).unwrap().is_none());
        assert_eq!(f.status_at("alpha/m1/o1/d1/a1"), Some(ItemStatus::Pending));
    }

    #[test]
    fn test_start_skips_completed_deliverables() {
        let mut f = scenario();
        f.add("deliverable", "D2", "/alpha/m1/o1");
        f.add("action", "B1", "/alpha/m1/o1/d2");
        for path in ["alpha/m1/o1/d1", "alpha/m1/o1/d1/a1"] {
            let id = crate::ops::navigation::get_item_by_path(&f.project, path).unwrap().id;
            f.project.get_mut(id).unwrap().status = ItemStatus::Completed;
        }
        let started = f.tasks.start_next_action(&mut f.project).unwrap().unwrap();
        assert_eq!(started.name, "B1");
    }

    #[test]
    fn test_nothing_pending_clears_cursor() {
        let mut f = fixture();
        f.add("phase", "Alpha", "");
        f.project.cursor = Some("alpha".into());
        assert!(f.tasks.start_next_action(&mut f.project).unwrap().is_none());
        assert_eq!(f.project.cursor, None);
    }

    #[test]
    fn test_complete_and_start_next() {
        let mut f = scenario();
        f.tasks.start_next_action(&mut f.project).unwrap();
        let (done, next) = f.tasks.complete_current_and_start_next(&mut f.project).unwrap();
        assert_eq!(done.map(|a| a.name), Some("A1".to_string()));
        assert_eq!(next.map(|a| a.name), Some("A2".to_string()));

        let (done, next) = f.tasks.complete_current_and_start_next(&mut f.project).unwrap();
        assert_eq!(done.map(|a| a.name), Some("A2".to_string()));
        assert!(next.is_none());
    }

    #[test]
    fn test_tracker_without_listeners_keeps_objective() {
        let mut f = scenario();
        let tasks = TaskManager::new(CompletionTracker::new());
        tasks.start_next_action(&mut f.project).unwrap();
        tasks.complete_current_and_start_next(&mut f.project).unwrap();
        tasks.complete_current_action(&mut f.project).unwrap();
        assert_eq!(f.status_at("alpha/m1/o1"), Some(ItemStatus::Completed));
        assert!(f.storage.load_archived_strategic().unwrap().objectives.is_empty());
    }
}
