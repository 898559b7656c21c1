//! Record layouts of the JSON files under `.prism/`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::item::{Item, ItemKind};
use super::orphan::Orphan;

/// `strategic.json`: active phases, milestones and objectives
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategicFile {
    /// Top-level phase order, archived phases included
    #[serde(default)]
    pub phase_ids: Vec<Uuid>,
    #[serde(default)]
    pub phases: Vec<Item>,
    #[serde(default)]
    pub milestones: Vec<Item>,
    #[serde(default)]
    pub objectives: Vec<Item>,
}

/// `execution.json`: active deliverables and actions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionFile {
    #[serde(default)]
    pub deliverables: Vec<Item>,
    #[serde(default)]
    pub actions: Vec<Item>,
}

/// An archived item with its position among its siblings at archive time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedRecord {
    #[serde(flatten)]
    pub item: Item,
    #[serde(default)]
    pub position: usize,
}

/// `archive/strategic.json`: archived strategic items grouped by kind
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchivedStrategicFile {
    #[serde(default)]
    pub phases: Vec<ArchivedRecord>,
    #[serde(default)]
    pub milestones: Vec<ArchivedRecord>,
    #[serde(default)]
    pub objectives: Vec<ArchivedRecord>,
}

impl ArchivedStrategicFile {
    fn group(&self, kind: ItemKind) -> &[ArchivedRecord] {
        match kind {
            ItemKind::Phase => &self.phases,
            ItemKind::Milestone => &self.milestones,
            ItemKind::Objective => &self.objectives,
            ItemKind::Deliverable | ItemKind::Action => &[],
        }
    }

    /// Append a record to the group matching its kind. Execution kinds are
    /// not stored here and are ignored.
    pub fn push(&mut self, record: ArchivedRecord) {
        match record.item.kind {
            ItemKind::Phase => self.phases.push(record),
            ItemKind::Milestone => self.milestones.push(record),
            ItemKind::Objective => self.objectives.push(record),
            ItemKind::Deliverable | ItemKind::Action => {}
        }
    }

    pub fn find(&self, id: Uuid) -> Option<&ArchivedRecord> {
        self.all().find(|r| r.item.id == id)
    }

    /// All records, phases first, each group in stored order
    pub fn all(&self) -> impl Iterator<Item = &ArchivedRecord> {
        self.phases
            .iter()
            .chain(self.milestones.iter())
            .chain(self.objectives.iter())
    }

    pub fn list(&self, kind: Option<ItemKind>) -> Vec<&ArchivedRecord> {
        match kind {
            Some(k) => self.group(k).iter().collect(),
            None => self.all().collect(),
        }
    }
}

/// `archive/<objective-id>.exec.json`: one objective's execution subtree
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchivedExecFile {
    #[serde(default)]
    pub deliverables: Vec<ArchivedRecord>,
    #[serde(default)]
    pub actions: Vec<ArchivedRecord>,
}

impl ArchivedExecFile {
    pub fn find(&self, id: Uuid) -> Option<&ArchivedRecord> {
        self.deliverables
            .iter()
            .chain(self.actions.iter())
            .find(|r| r.item.id == id)
    }
}

/// `cursor.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorFile {
    #[serde(default)]
    pub task_cursor: Option<String>,
    #[serde(default)]
    pub crud_context: Option<String>,
}

/// `orphans.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrphansFile {
    #[serde(default)]
    pub orphans: Vec<Orphan>,
}
