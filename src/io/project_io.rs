use std::path::{Path, PathBuf};

use crate::io::storage::{Storage, StorageError};
use crate::model::files::{CursorFile, ExecutionFile, StrategicFile};
use crate::model::item::ItemKind;
use crate::model::project::Project;

/// Name of the per-project data directory
pub const PRISM_DIR: &str = ".prism";

/// Error type for project discovery and loading
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("not a prism project: no .prism/ directory found")]
    NotAProject,
    #[error("prism project already exists at {0}")]
    AlreadyExists(PathBuf),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Discover the project by walking up from the given directory, looking for
/// a `.prism/` subdirectory. Returns the `.prism/` path.
pub fn discover_project(start: &Path) -> Result<PathBuf, ProjectError> {
    let mut current = start.to_path_buf();
    loop {
        let prism_dir = current.join(PRISM_DIR);
        if prism_dir.is_dir() {
            return Ok(prism_dir);
        }
        if !current.pop() {
            return Err(ProjectError::NotAProject);
        }
    }
}

/// Create `.prism/` under `root` with a default config and empty files.
pub fn init_project(root: &Path, force: bool) -> Result<PathBuf, ProjectError> {
    let prism_dir = root.join(PRISM_DIR);
    if prism_dir.join("config.json").exists() && !force {
        return Err(ProjectError::AlreadyExists(prism_dir));
    }
    let storage = Storage::new(&prism_dir);
    storage.ensure_dirs()?;
    storage.save_config(&Default::default())?;
    storage.save_strategic(&StrategicFile::default())?;
    storage.save_execution(&ExecutionFile::default())?;
    storage.save_cursor(&CursorFile::default())?;
    tracing::info!(dir = %prism_dir.display(), "initialized project");
    Ok(prism_dir)
}

/// Load the active tree, config and cursor from a `.prism/` directory.
pub fn load_project(prism_dir: &Path) -> Result<Project, ProjectError> {
    if !prism_dir.is_dir() {
        return Err(ProjectError::NotAProject);
    }
    let storage = Storage::new(prism_dir);
    let config = storage.load_config()?;
    let strategic = storage.load_strategic()?;
    let execution = storage.load_execution()?;
    let cursor = storage.load_cursor()?;

    let items = strategic
        .phases
        .into_iter()
        .chain(strategic.milestones)
        .chain(strategic.objectives)
        .chain(execution.deliverables)
        .chain(execution.actions)
        .collect();

    let mut project = Project::from_parts(prism_dir.to_path_buf(), config, strategic.phase_ids, items);
    project.cursor = cursor.task_cursor;
    project.crud_context = cursor.crud_context;
    Ok(project)
}

/// Persist the active tree and cursor. Each file is written atomically;
/// the set of files is not.
pub fn save_project(project: &Project) -> Result<(), StorageError> {
    let storage = Storage::new(&project.dir);
    let mut strategic = StrategicFile {
        phase_ids: project.phase_ids.clone(),
        ..Default::default()
    };
    let mut execution = ExecutionFile::default();

    for item in project.walk() {
        let bucket = match item.kind {
            ItemKind::Phase => &mut strategic.phases,
            ItemKind::Milestone => &mut strategic.milestones,
            ItemKind::Objective => &mut strategic.objectives,
            ItemKind::Deliverable => &mut execution.deliverables,
            ItemKind::Action => &mut execution.actions,
        };
        bucket.push(item.clone());
    }

    storage.save_strategic(&strategic)?;
    storage.save_execution(&execution)?;
    storage.save_cursor(&CursorFile {
        task_cursor: project.cursor.clone(),
        crud_context: project.crud_context.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::item::Item;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_init_then_load_empty() {
        let dir = TempDir::new().unwrap();
        let prism_dir = init_project(dir.path(), false).unwrap();
        assert!(prism_dir.join("archive").is_dir());
        let project = load_project(&prism_dir).unwrap();
        assert!(project.is_empty());
        assert!(project.cursor.is_none());
    }

    #[test]
    fn test_init_refuses_existing_without_force() {
        let dir = TempDir::new().unwrap();
        init_project(dir.path(), false).unwrap();
        assert!(matches!(
            init_project(dir.path(), false),
            Err(ProjectError::AlreadyExists(_))
        ));
        assert!(init_project(dir.path(), true).is_ok());
    }

    #[test]
    fn test_discover_walks_up() {
        let dir = TempDir::new().unwrap();
        init_project(dir.path(), false).unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(
            discover_project(&nested).unwrap(),
            dir.path().join(PRISM_DIR)
        );
    }

    #[test]
    fn test_save_load_preserves_order_and_cursor() {
        let dir = TempDir::new().unwrap();
        let prism_dir = init_project(dir.path(), false).unwrap();
        let mut project = load_project(&prism_dir).unwrap();

        let mut phase = Item::new(ItemKind::Phase, "Alpha", None);
        phase.slug = "alpha".into();
        let phase_id = project.insert(phase);
        for slug in ["zeta", "beta", "mid"] {
            let mut ms = Item::new(ItemKind::Milestone, slug, Some(phase_id));
            ms.slug = slug.into();
            project.insert(ms);
        }
        project.cursor = Some("alpha/zeta".into());
        save_project(&project).unwrap();

        let loaded = load_project(&prism_dir).unwrap();
        let order: Vec<_> = loaded
            .children(Some(phase_id))
            .iter()
            .map(|m| m.slug.clone())
            .collect();
        assert_eq!(order, vec!["zeta", "beta", "mid"]);
        assert_eq!(loaded.cursor.as_deref(), Some("alpha/zeta"));
        assert_eq!(loaded.get(phase_id), project.get(phase_id));
    }
}
