use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The five levels of the hierarchy, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Phase,
    Milestone,
    Objective,
    Deliverable,
    Action,
}

impl ItemKind {
    pub const ALL: [ItemKind; 5] = [
        ItemKind::Phase,
        ItemKind::Milestone,
        ItemKind::Objective,
        ItemKind::Deliverable,
        ItemKind::Action,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Phase => "phase",
            ItemKind::Milestone => "milestone",
            ItemKind::Objective => "objective",
            ItemKind::Deliverable => "deliverable",
            ItemKind::Action => "action",
        }
    }

    /// Parse a kind name, case-insensitive
    pub fn parse(s: &str) -> Option<ItemKind> {
        match s.trim().to_lowercase().as_str() {
            "phase" => Some(ItemKind::Phase),
            "milestone" => Some(ItemKind::Milestone),
            "objective" => Some(ItemKind::Objective),
            "deliverable" => Some(ItemKind::Deliverable),
            "action" => Some(ItemKind::Action),
            _ => None,
        }
    }

    /// The only kind this kind may contain, if any
    pub fn child_kind(self) -> Option<ItemKind> {
        match self {
            ItemKind::Phase => Some(ItemKind::Milestone),
            ItemKind::Milestone => Some(ItemKind::Objective),
            ItemKind::Objective => Some(ItemKind::Deliverable),
            ItemKind::Deliverable => Some(ItemKind::Action),
            ItemKind::Action => None,
        }
    }

    /// The kind a parent of this kind must have (`None` for top-level phases)
    pub fn parent_kind(self) -> Option<ItemKind> {
        match self {
            ItemKind::Phase => None,
            ItemKind::Milestone => Some(ItemKind::Phase),
            ItemKind::Objective => Some(ItemKind::Milestone),
            ItemKind::Deliverable => Some(ItemKind::Objective),
            ItemKind::Action => Some(ItemKind::Deliverable),
        }
    }

    pub fn can_contain(self, child: ItemKind) -> bool {
        self.child_kind() == Some(child)
    }

    /// Phases, milestones and objectives live in `strategic.json`
    pub fn is_strategic(self) -> bool {
        matches!(
            self,
            ItemKind::Phase | ItemKind::Milestone | ItemKind::Objective
        )
    }

    pub fn accepts_due_date(self) -> bool {
        matches!(self, ItemKind::Deliverable | ItemKind::Action)
    }

    /// Depth in the tree, 1-based (phase = 1)
    pub fn depth(self) -> usize {
        match self {
            ItemKind::Phase => 1,
            ItemKind::Milestone => 2,
            ItemKind::Objective => 3,
            ItemKind::Deliverable => 4,
            ItemKind::Action => 5,
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status shared by every kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
    Archived,
}

impl ItemStatus {
    pub const ALL: [ItemStatus; 5] = [
        ItemStatus::Pending,
        ItemStatus::InProgress,
        ItemStatus::Completed,
        ItemStatus::Cancelled,
        ItemStatus::Archived,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::InProgress => "in-progress",
            ItemStatus::Completed => "completed",
            ItemStatus::Cancelled => "cancelled",
            ItemStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<ItemStatus> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(ItemStatus::Pending),
            "in-progress" => Some(ItemStatus::InProgress),
            "completed" => Some(ItemStatus::Completed),
            "cancelled" => Some(ItemStatus::Cancelled),
            "archived" => Some(ItemStatus::Archived),
            _ => None,
        }
    }

    /// Completed and archived items can no longer be edited or deleted
    pub fn is_frozen(self) -> bool {
        matches!(self, ItemStatus::Completed | ItemStatus::Archived)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields only execution items carry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    /// Seconds of tracked work
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent_secs: Option<i64>,
}

/// A node of the hierarchy, of any kind.
///
/// Children are referenced by id through `child_ids`, whose order is the
/// display order. Archived children stay listed there after their records
/// have moved to the archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub kind: ItemKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub slug: String,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub child_ids: Vec<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<ExecFields>,
}

impl Item {
    /// Create a fresh pending item with a new id. The slug is left empty for
    /// the caller to assign.
    pub fn new(kind: ItemKind, name: impl Into<String>, parent_id: Option<Uuid>) -> Self {
        let now = Utc::now();
        Item {
            id: Uuid::new_v4(),
            kind,
            name: name.into(),
            description: None,
            slug: String::new(),
            status: ItemStatus::Pending,
            parent_id,
            created_at: now,
            updated_at: now,
            child_ids: Vec::new(),
            exec: kind.accepts_due_date().then(ExecFields::default),
        }
    }

    /// Refresh `updated_at`
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn is_frozen(&self) -> bool {
        self.status.is_frozen()
    }

    pub fn is_completed(&self) -> bool {
        self.status == ItemStatus::Completed
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.exec.as_ref().and_then(|e| e.due_date)
    }

    pub fn set_due_date(&mut self, date: NaiveDate) {
        self.exec.get_or_insert_with(ExecFields::default).due_date = Some(date);
    }

    pub fn time_spent_secs(&self) -> Option<i64> {
        self.exec.as_ref().and_then(|e| e.time_spent_secs)
    }
}
