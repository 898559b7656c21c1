//! Read-only views over archived items.
//!
//! An archived item is represented by a [`LazyArchivedItem`] holding only
//! its id and kind until one of its fields is read. Reading a field loads
//! the record from the archive store; reading its children loads those too.

use std::cell::RefCell;
use std::hash::{Hash, Hasher};

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::io::storage::Storage;
use crate::model::files::ArchivedRecord;
use crate::model::item::{Item, ItemKind, ItemStatus};
use crate::model::project::Project;

/// Read access shared by active items and archived wrappers
pub trait ItemView {
    fn id(&self) -> Uuid;
    fn kind(&self) -> ItemKind;
    fn is_archived(&self) -> bool;
    fn name(&self) -> Result<String>;
    fn slug(&self) -> Result<String>;
    fn status(&self) -> Result<ItemStatus>;
    fn description(&self) -> Result<Option<String>>;
}

impl ItemView for Item {
    fn id(&self) -> Uuid {
        self.id
    }

    fn kind(&self) -> ItemKind {
        self.kind
    }

    fn is_archived(&self) -> bool {
        false
    }

    fn name(&self) -> Result<String> {
        Ok(self.name.clone())
    }

    fn slug(&self) -> Result<String> {
        Ok(self.slug.clone())
    }

    fn status(&self) -> Result<ItemStatus> {
        Ok(self.status)
    }

    fn description(&self) -> Result<Option<String>> {
        Ok(self.description.clone())
    }
}

/// Which archive file holds a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveSource {
    /// `archive/strategic.json`
    Strategic,
    /// `archive/<objective>.exec.json`
    Exec(Uuid),
}

/// Observable load progress of a wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    NotLoaded,
    Loaded,
    ChildrenLoaded,
}

#[derive(Debug, Clone)]
enum LoadState {
    NotLoaded,
    Loaded(Box<Item>),
    ChildrenLoaded(Box<Item>, Vec<LazyArchivedItem>),
}

/// Deferred reference to an archived item
#[derive(Debug, Clone)]
pub struct LazyArchivedItem {
    id: Uuid,
    kind: ItemKind,
    source: ArchiveSource,
    storage: Storage,
    state: RefCell<LoadState>,
}

impl LazyArchivedItem {
    pub fn new(id: Uuid, kind: ItemKind, source: ArchiveSource, storage: Storage) -> Self {
        LazyArchivedItem {
            id,
            kind,
            source,
            storage,
            state: RefCell::new(LoadState::NotLoaded),
        }
    }

    /// Wrapper whose own fields are already known
    pub(crate) fn preloaded(item: Item, source: ArchiveSource, storage: Storage) -> Self {
        let wrapper = Self::new(item.id, item.kind, source, storage);
        wrapper.populate(item);
        wrapper
    }

    /// Fill in the record. Only the loader calls this; once loaded the
    /// fields never change.
    pub(crate) fn populate(&self, item: Item) {
        let mut state = self.state.borrow_mut();
        if matches!(*state, LoadState::NotLoaded) {
            *state = LoadState::Loaded(Box::new(item));
        }
    }

    pub fn phase(&self) -> LoadPhase {
        match *self.state.borrow() {
            LoadState::NotLoaded => LoadPhase::NotLoaded,
            LoadState::Loaded(_) => LoadPhase::Loaded,
            LoadState::ChildrenLoaded(..) => LoadPhase::ChildrenLoaded,
        }
    }

    fn is_loaded(&self) -> bool {
        self.phase() != LoadPhase::NotLoaded
    }

    fn fetch(&self) -> Result<Item> {
        let record = match self.source {
            ArchiveSource::Strategic => self
                .storage
                .load_archived_strategic()?
                .find(self.id)
                .cloned(),
            ArchiveSource::Exec(objective_id) => self
                .storage
                .load_archived_exec(objective_id)?
                .and_then(|file| file.find(self.id).cloned()),
        };
        record
            .map(|r| r.item)
            .ok_or_else(|| Error::not_found(format!("archived {} {}", self.kind, self.id)))
    }

    fn ensure_loaded(&self) -> Result<()> {
        if self.is_loaded() {
            return Ok(());
        }
        tracing::debug!(id = %self.id, kind = %self.kind, "loading archived item");
        let item = self.fetch()?;
        self.populate(item);
        Ok(())
    }

    /// Run `f` on the loaded record, loading it first if needed
    pub fn with_item<R>(&self, f: impl FnOnce(&Item) -> R) -> Result<R> {
        self.ensure_loaded()?;
        match &*self.state.borrow() {
            LoadState::Loaded(item) | LoadState::ChildrenLoaded(item, _) => Ok(f(item)),
            LoadState::NotLoaded => Err(Error::not_found(self.id.to_string())),
        }
    }

    /// Archived children in stored order. Load failures are logged and give
    /// an empty list so browsing the archive never fails on a bad file.
    pub fn children(&self) -> Vec<LazyArchivedItem> {
        if let LoadState::ChildrenLoaded(_, children) = &*self.state.borrow() {
            return children.clone();
        }
        let children = match self.load_children() {
            Ok(children) => children,
            Err(e) => {
                tracing::warn!(id = %self.id, error = %e, "could not load archived children");
                Vec::new()
            }
        };

        let mut state = self.state.borrow_mut();
        let current = std::mem::replace(&mut *state, LoadState::NotLoaded);
        *state = match current {
            LoadState::Loaded(item) | LoadState::ChildrenLoaded(item, _) => {
                LoadState::ChildrenLoaded(item, children.clone())
            }
            LoadState::NotLoaded => LoadState::NotLoaded,
        };
        children
    }

    fn load_children(&self) -> Result<Vec<LazyArchivedItem>> {
        self.ensure_loaded()?;
        let Some(child_kind) = self.kind.child_kind() else {
            return Ok(Vec::new());
        };

        let (records, source) = match (self.kind, self.source) {
            (ItemKind::Objective, _) => {
                let exec = self.storage.load_archived_exec(self.id)?.unwrap_or_default();
                (exec.deliverables, ArchiveSource::Exec(self.id))
            }
            (ItemKind::Deliverable, ArchiveSource::Exec(objective_id)) => {
                let exec = self
                    .storage
                    .load_archived_exec(objective_id)?
                    .unwrap_or_default();
                (exec.actions, ArchiveSource::Exec(objective_id))
            }
            _ => {
                let strategic = self.storage.load_archived_strategic()?;
                let records = strategic
                    .list(Some(child_kind))
                    .into_iter()
                    .cloned()
                    .collect();
                (records, ArchiveSource::Strategic)
            }
        };

        let mut mine: Vec<ArchivedRecord> = records
            .into_iter()
            .filter(|r| r.item.parent_id == Some(self.id))
            .collect();
        mine.sort_by_key(|r| r.position);
        Ok(mine
            .into_iter()
            .map(|r| LazyArchivedItem::preloaded(r.item, source, self.storage.clone()))
            .collect())
    }

    fn read_only(&self) -> Error {
        Error::ArchivedItem(format!("{} {}", self.kind, self.id))
    }

    // Archived records are immutable; every setter fails.

    pub fn set_name(&mut self, _name: String) -> Result<()> {
        Err(self.read_only())
    }

    pub fn set_description(&mut self, _description: Option<String>) -> Result<()> {
        Err(self.read_only())
    }

    pub fn set_status(&mut self, _status: ItemStatus) -> Result<()> {
        Err(self.read_only())
    }
}

impl ItemView for LazyArchivedItem {
    fn id(&self) -> Uuid {
        self.id
    }

    fn kind(&self) -> ItemKind {
        self.kind
    }

    fn is_archived(&self) -> bool {
        true
    }

    fn name(&self) -> Result<String> {
        self.with_item(|i| i.name.clone())
    }

    fn slug(&self) -> Result<String> {
        self.with_item(|i| i.slug.clone())
    }

    fn status(&self) -> Result<ItemStatus> {
        self.with_item(|i| i.status)
    }

    fn description(&self) -> Result<Option<String>> {
        self.with_item(|i| i.description.clone())
    }
}

/// Loaded wrappers are equal when their ids match; an unloaded wrapper is
/// only equal to itself.
impl PartialEq for LazyArchivedItem {
    fn eq(&self, other: &Self) -> bool {
        if self.is_loaded() && other.is_loaded() {
            self.id == other.id
        } else {
            std::ptr::eq(self, other)
        }
    }
}

impl Eq for LazyArchivedItem {}

impl Hash for LazyArchivedItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

// ---------------------------------------------------------------------------
// Mixed children
// ---------------------------------------------------------------------------

/// A child slot in the combined active + archived view
#[derive(Debug)]
pub enum ChildNode<'a> {
    Active(&'a Item),
    Archived(LazyArchivedItem),
}

impl ChildNode<'_> {
    pub fn view(&self) -> &dyn ItemView {
        match self {
            ChildNode::Active(item) => *item,
            ChildNode::Archived(lazy) => lazy,
        }
    }
}

/// Children of `parent` (`None` = phases): all active children first, then
/// archived ones, each group in stored order.
pub fn children_view<'a>(
    project: &'a Project,
    parent: Option<Uuid>,
    storage: &Storage,
) -> Vec<ChildNode<'a>> {
    let child_kind = match parent {
        None => Some(ItemKind::Phase),
        Some(id) => project.get(id).and_then(|p| p.kind.child_kind()),
    };
    let mut nodes: Vec<ChildNode<'a>> = project
        .children(parent)
        .into_iter()
        .map(ChildNode::Active)
        .collect();

    if let Some(kind) = child_kind {
        // Archived children of an active parent are always strategic; an
        // objective's execution items are only archived together with it.
        let source = match parent {
            Some(pid) if !kind.is_strategic() => ArchiveSource::Exec(pid),
            _ => ArchiveSource::Strategic,
        };
        nodes.extend(
            project
                .archived_child_ids(parent)
                .into_iter()
                .map(|id| ChildNode::Archived(LazyArchivedItem::new(id, kind, source, storage.clone()))),
        );
    }
    nodes
}
