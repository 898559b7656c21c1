use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use uuid::Uuid;

use super::config::Config;
use super::item::{Item, ItemKind};

/// A fully loaded project: the active tree plus cursor state.
///
/// Items are kept in a flat arena. Tree shape lives in `phase_ids` and each
/// item's `child_ids`; the id index is derived and rebuilt after every
/// structural change. Ids listed in a child list but absent from the arena
/// belong to archived items.
#[derive(Debug, Clone)]
pub struct Project {
    /// Path to the `.prism/` directory
    pub dir: PathBuf,
    /// Parsed config.json
    pub config: Config,
    /// Top-level phase order
    pub phase_ids: Vec<Uuid>,
    /// Path of the action currently being worked
    pub cursor: Option<String>,
    /// Explicit base path for relative CRUD paths
    pub crud_context: Option<String>,
    items: Vec<Item>,
    index: HashMap<Uuid, usize>,
}

impl Project {
    pub fn new(dir: PathBuf, config: Config) -> Self {
        Project {
            dir,
            config,
            phase_ids: Vec::new(),
            cursor: None,
            crud_context: None,
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Assemble a project from loaded records
    pub fn from_parts(dir: PathBuf, config: Config, phase_ids: Vec<Uuid>, items: Vec<Item>) -> Self {
        let mut project = Project {
            dir,
            config,
            phase_ids,
            cursor: None,
            crud_context: None,
            items,
            index: HashMap::new(),
        };
        project.rebuild_index();
        project
    }

    /// Recompute the id → arena slot index from scratch
    pub fn rebuild_index(&mut self) {
        self.index = self
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.id, i))
            .collect();
    }

    pub fn get(&self, id: Uuid) -> Option<&Item> {
        self.index.get(&id).map(|&i| &self.items[i])
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut Item> {
        match self.index.get(&id) {
            Some(&i) => self.items.get_mut(i),
            None => None,
        }
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.index.contains_key(&id)
    }

    /// All active items in arena order (not tree order)
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    // -----------------------------------------------------------------------
    // Tree shape
    // -----------------------------------------------------------------------

    /// Stored child order under `parent` (`None` = the phase list), archived
    /// ids included
    pub fn child_ids(&self, parent: Option<Uuid>) -> &[Uuid] {
        match parent {
            None => &self.phase_ids,
            Some(id) => self.get(id).map(|p| p.child_ids.as_slice()).unwrap_or(&[]),
        }
    }

    /// Active children of `parent` in stored order
    pub fn children(&self, parent: Option<Uuid>) -> Vec<&Item> {
        self.child_ids(parent)
            .iter()
            .filter_map(|id| self.get(*id))
            .collect()
    }

    /// Ids listed under `parent` whose records are no longer active
    pub fn archived_child_ids(&self, parent: Option<Uuid>) -> Vec<Uuid> {
        self.child_ids(parent)
            .iter()
            .filter(|id| !self.contains(**id))
            .copied()
            .collect()
    }

    pub fn parent(&self, id: Uuid) -> Option<&Item> {
        self.get(id)?.parent_id.and_then(|p| self.get(p))
    }

    /// Depth-first pre-order walk of the active tree
    pub fn walk(&self) -> Vec<&Item> {
        let mut out = Vec::with_capacity(self.items.len());
        for phase in self.children(None) {
            self.walk_into(phase, &mut out);
        }
        out
    }

    fn walk_into<'a>(&'a self, item: &'a Item, out: &mut Vec<&'a Item>) {
        out.push(item);
        for child in self.children(Some(item.id)) {
            self.walk_into(child, out);
        }
    }

    /// Pre-order descendants of `id`, not including `id` itself
    pub fn descendants(&self, id: Uuid) -> Vec<&Item> {
        let mut out = Vec::new();
        for child in self.children(Some(id)) {
            self.walk_into(child, &mut out);
        }
        out
    }

    /// Active items of one kind in tree order
    pub fn of_kind(&self, kind: ItemKind) -> Vec<&Item> {
        self.walk().into_iter().filter(|i| i.kind == kind).collect()
    }

    // -----------------------------------------------------------------------
    // Structural mutation
    // -----------------------------------------------------------------------

    /// Add `item` as the last child of its parent (or as the last phase) and
    /// rebuild the index. The parent must already be present.
    pub fn insert(&mut self, item: Item) -> Uuid {
        let id = item.id;
        match item.parent_id {
            Some(parent_id) => {
                if let Some(parent) = self.get_mut(parent_id) {
                    parent.child_ids.push(id);
                }
            }
            None => self.phase_ids.push(id),
        }
        self.items.push(item);
        self.rebuild_index();
        id
    }

    /// Remove `id` and all its descendants from the arena, returning them in
    /// pre-order. With `keep_slot` the id stays in its parent's child list so
    /// it can still be shown as an archived child.
    pub fn detach_subtree(&mut self, id: Uuid, keep_slot: bool) -> Vec<Item> {
        let Some(root) = self.get(id) else {
            return Vec::new();
        };
        let parent_id = root.parent_id;
        let mut order = vec![id];
        order.extend(self.descendants(id).iter().map(|i| i.id));
        let doomed: HashSet<Uuid> = order.iter().copied().collect();

        let (mut removed, kept): (Vec<Item>, Vec<Item>) = std::mem::take(&mut self.items)
            .into_iter()
            .partition(|item| doomed.contains(&item.id));
        self.items = kept;

        let position: HashMap<Uuid, usize> =
            order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        removed.sort_by_key(|item| position.get(&item.id).copied().unwrap_or(usize::MAX));

        self.rebuild_index();
        if !keep_slot {
            match parent_id {
                Some(pid) => {
                    if let Some(parent) = self.get_mut(pid) {
                        parent.child_ids.retain(|c| *c != id);
                    }
                }
                None => self.phase_ids.retain(|c| *c != id),
            }
        }
        removed
    }
}
