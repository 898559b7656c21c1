use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::item::{Item, ItemKind, ItemStatus};
use crate::model::project::Project;
use crate::ops::archive::ArchiveManager;
use crate::ops::dates::parse_due_date;
use crate::ops::navigation::{
    clear_stale_positions, current_item, get_crud_context, get_item_by_path, get_item_path,
    resolve_item, resolve_path,
};
use crate::ops::slug::unique_slug;

/// Arguments for [`add`]
#[derive(Debug, Clone, Default)]
pub struct NewItem<'a> {
    pub kind: &'a str,
    pub name: &'a str,
    pub description: Option<&'a str>,
    /// Parent path; inferred from the current position when absent
    pub parent_path: Option<&'a str>,
    pub status: Option<&'a str>,
}

/// Fields to change in [`update`]. At least one must be set.
#[derive(Debug, Clone, Default)]
pub struct ItemUpdate<'a> {
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub due_date: Option<&'a str>,
    pub status: Option<&'a str>,
}

impl ItemUpdate<'_> {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.status.is_none()
    }
}

fn parse_kind(s: &str) -> Result<ItemKind> {
    ItemKind::parse(s).ok_or_else(|| {
        let known: Vec<&str> = ItemKind::ALL.iter().map(|k| k.as_str()).collect();
        Error::validation(format!("unknown kind '{}'; expected one of: {}", s, known.join(", ")))
    })
}

fn parse_status(s: &str) -> Result<ItemStatus> {
    ItemStatus::parse(s).ok_or_else(|| {
        let known: Vec<&str> = ItemStatus::ALL.iter().map(|k| k.as_str()).collect();
        Error::validation(format!("unknown status '{}'; expected one of: {}", s, known.join(", ")))
    })
}

fn non_empty_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("name must not be empty"));
    }
    Ok(trimmed)
}

// ---------------------------------------------------------------------------
// Add
// ---------------------------------------------------------------------------

/// Create a new item and return its id.
///
/// New items never start out completed or archived; those requests are
/// downgraded to pending. Adding a phase, milestone or objective first
/// archives finished siblings of the same kind.
pub fn add(project: &mut Project, archive: &ArchiveManager, new: &NewItem) -> Result<Uuid> {
    let kind = parse_kind(new.kind)?;
    let name = non_empty_name(new.name)?;
    let status = match new.status {
        None => ItemStatus::Pending,
        Some(s) => match parse_status(s)? {
            ItemStatus::Completed | ItemStatus::Archived => {
                tracing::debug!(requested = s, "new items start pending");
                ItemStatus::Pending
            }
            other => other,
        },
    };

    let parent_id = resolve_parent(project, kind, new.parent_path)?;

    if kind.is_strategic() {
        archive.archive_completed_siblings(project, parent_id, kind);
    }

    let slug = {
        let siblings = project.children(parent_id);
        unique_slug(name, siblings.iter().map(|s| s.slug.as_str()), &project.config)
    };

    let mut item = Item::new(kind, name, parent_id);
    item.slug = slug;
    item.status = status;
    item.description = new
        .description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(String::from);
    let id = project.insert(item);
    tracing::info!(%kind, id = %id, path = ?get_item_path(project, id), "added");
    Ok(id)
}

fn resolve_parent(project: &Project, kind: ItemKind, path: Option<&str>) -> Result<Option<Uuid>> {
    let path = path.map(str::trim).filter(|p| !p.is_empty());
    if kind == ItemKind::Phase {
        return match path {
            Some(p) => Err(Error::invalid_op(format!(
                "phases are top-level and cannot be added under '{}'",
                p
            ))),
            None => Ok(None),
        };
    }

    let parent = match path {
        Some(p) => resolve_item(project, Some(p))
            .ok_or_else(|| Error::not_found(format!("parent '{}'", p)))?,
        None => infer_parent(project, kind)
            .and_then(|id| project.get(id))
            .ok_or_else(|| {
                Error::validation(format!("a {} needs a parent and none could be inferred", kind))
            })?,
    };

    if !parent.kind.can_contain(kind) {
        return Err(Error::invalid_op(format!(
            "a {} cannot contain a {}",
            parent.kind, kind
        )));
    }
    if parent.is_frozen() {
        return Err(Error::invalid_op(format!(
            "{} '{}' is {} and accepts no new items",
            parent.kind, parent.slug, parent.status
        )));
    }
    Ok(Some(parent.id))
}

/// Parent to use when none is given: the CRUD context if it has the right
/// kind, else the item of that kind currently in focus
pub fn infer_parent(project: &Project, kind: ItemKind) -> Option<Uuid> {
    let parent_kind = kind.parent_kind()?;
    let context = get_crud_context(project)
        .and_then(|path| get_item_by_path(project, &path))
        .filter(|item| item.kind == parent_kind);
    if let Some(ctx) = context {
        return Some(ctx.id);
    }

    if kind == ItemKind::Action {
        let objective = current_item(project, ItemKind::Objective)?;
        let deliverables = project.children(Some(objective.id));
        return deliverables
            .iter()
            .find(|d| !d.is_completed())
            .or(deliverables.last())
            .map(|d| d.id);
    }
    current_item(project, parent_kind).map(|p| p.id)
}

/// Point both the cursor and the CRUD context at `id`
pub fn navigate_to(project: &mut Project, id: Uuid) -> Result<String> {
    let path = get_item_path(project, id).ok_or_else(|| Error::not_found(id.to_string()))?;
    project.cursor = Some(path.clone());
    project.crud_context = Some(path.clone());
    Ok(path)
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// Apply `changes` to the item at `path`. Everything is validated before
/// anything is changed.
pub fn update(project: &mut Project, path: &str, changes: &ItemUpdate) -> Result<Uuid> {
    let item = resolve_item(project, Some(path))
        .ok_or_else(|| Error::not_found(format!("path '{}'", path)))?;
    if item.is_frozen() {
        return Err(Error::invalid_op(format!(
            "{} '{}' is {} and cannot be edited",
            item.kind, item.slug, item.status
        )));
    }
    if changes.is_empty() {
        return Err(Error::validation("nothing to update"));
    }
    let id = item.id;
    let kind = item.kind;

    let status = changes.status.map(parse_status).transpose()?;
    let due_date = match changes.due_date {
        Some(_) if !kind.accepts_due_date() => {
            return Err(Error::validation(format!("a {} has no due date", kind)));
        }
        Some(input) => Some(parse_due_date(input, &project.config)?),
        None => None,
    };
    let renamed = match changes.name {
        Some(name) => {
            let name = non_empty_name(name)?;
            let siblings = project.children(item.parent_id);
            let slug = unique_slug(
                name,
                siblings.iter().filter(|s| s.id != id).map(|s| s.slug.as_str()),
                &project.config,
            );
            Some((name.to_string(), slug))
        }
        None => None,
    };

    // Paths below a renamed item change, so remember what they point at
    let cursor_id = project.cursor.as_deref().and_then(|p| get_item_by_path(project, p)).map(|i| i.id);
    let context_id = project
        .crud_context
        .as_deref()
        .and_then(|p| get_item_by_path(project, p))
        .map(|i| i.id);

    let item = project
        .get_mut(id)
        .ok_or_else(|| Error::not_found(id.to_string()))?;
    if let Some((name, slug)) = renamed {
        item.name = name;
        item.slug = slug;
    }
    if let Some(description) = changes.description {
        item.description = Some(description.trim().to_string()).filter(|d| !d.is_empty());
    }
    if let Some(date) = due_date {
        item.set_due_date(date);
    }
    if let Some(status) = status {
        item.status = status;
    }
    item.touch();

    if let Some(cid) = cursor_id {
        project.cursor = get_item_path(project, cid);
    }
    if let Some(cid) = context_id {
        project.crud_context = get_item_path(project, cid);
    }
    tracing::info!(%kind, id = %id, "updated");
    Ok(id)
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

/// Remove the item at `path` with everything beneath it and return it
pub fn delete(project: &mut Project, path: &str) -> Result<Item> {
    let resolved = resolve_path(project, Some(path))
        .ok_or_else(|| Error::not_found(format!("path '{}'", path)))?;
    let item = get_item_by_path(project, &resolved)
        .ok_or_else(|| Error::not_found(format!("path '{}'", resolved)))?;
    if item.is_frozen() {
        return Err(Error::invalid_op(format!(
            "{} '{}' is {} and cannot be deleted",
            item.kind, item.slug, item.status
        )));
    }
    if let Some(pid) = item.parent_id
        && !project.contains(pid)
    {
        return Err(Error::not_found(format!("parent of '{}'", resolved)));
    }

    let slug = item.slug.clone();
    let target = project
        .children(item.parent_id)
        .iter()
        .find(|c| c.slug == slug)
        .map(|c| c.id)
        .ok_or_else(|| Error::not_found(format!("'{}' among its siblings", slug)))?;

    let removed = project.detach_subtree(target, false);
    clear_stale_positions(project);
    let count = removed.len();
    let root = removed
        .into_iter()
        .next()
        .ok_or_else(|| Error::not_found(format!("path '{}'", resolved)))?;
    tracing::info!(kind = %root.kind, slug = %root.slug, removed = count, "deleted");
    Ok(root)
}
