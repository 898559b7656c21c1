use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::model::item::{Item, ItemKind, ItemStatus};
use crate::model::orphan::Orphan;
use crate::model::project::Project;
use crate::ops::archived::{ChildNode, ItemView};
use crate::ops::navigation::get_item_path;
use crate::ops::status::{ItemLine, StatusSummary};

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ItemJson {
    pub id: Uuid,
    pub kind: ItemKind,
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct ChildJson {
    pub id: Uuid,
    pub kind: ItemKind,
    pub name: Option<String>,
    pub status: Option<ItemStatus>,
    pub archived: bool,
}

#[derive(Serialize)]
pub struct ShowJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<ItemJson>,
    pub children: Vec<ChildJson>,
}

#[derive(Serialize)]
pub struct NavJson {
    pub cursor: Option<String>,
    pub context: Option<String>,
}

#[derive(Serialize)]
pub struct TaskStepJson {
    pub completed: Option<ItemJson>,
    pub started: Option<ItemJson>,
}

#[derive(Serialize)]
pub struct DeletedJson {
    pub deleted: ItemJson,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

/// JSON form of `item`. `path` is left out for items no longer in the tree.
pub fn item_to_json(project: &Project, item: &Item) -> ItemJson {
    ItemJson {
        id: item.id,
        kind: item.kind,
        name: item.name.clone(),
        slug: item.slug.clone(),
        path: get_item_path(project, item.id),
        status: item.status,
        description: item.description.clone(),
        due_date: item.due_date(),
        created_at: item.created_at,
        updated_at: item.updated_at,
    }
}

pub fn child_to_json(node: &ChildNode) -> ChildJson {
    let view = node.view();
    ChildJson {
        id: view.id(),
        kind: view.kind(),
        name: view.name().ok(),
        status: view.status().ok(),
        archived: view.is_archived(),
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

fn status_char(status: ItemStatus) -> char {
    match status {
        ItemStatus::Pending => ' ',
        ItemStatus::InProgress => '>',
        ItemStatus::Completed => 'x',
        ItemStatus::Cancelled => '-',
        ItemStatus::Archived => '~',
    }
}

/// `[x] objective  Ship the API`
pub fn format_item_line(item: &Item) -> String {
    let due = item
        .due_date()
        .map(|d| format!("  (due {})", d))
        .unwrap_or_default();
    format!(
        "[{}] {:<11} {}{}",
        status_char(item.status),
        item.kind.as_str(),
        item.name,
        due
    )
}

pub fn format_child_line(node: &ChildNode) -> String {
    match node {
        ChildNode::Active(item) => format_item_line(item),
        ChildNode::Archived(lazy) => {
            let name = lazy.name().unwrap_or_else(|_| lazy.id().to_string());
            format!("[~] {:<11} {} (archived)", lazy.kind().as_str(), name)
        }
    }
}

/// Detailed view of one item
pub fn format_item_detail(project: &Project, item: &Item) -> Vec<String> {
    let mut lines = vec![format_item_line(item)];
    if let Some(path) = get_item_path(project, item.id) {
        lines.push(format!("path: {}", path));
    }
    lines.push(format!("status: {}", item.status));
    lines.push(format!("id: {}", item.id));
    lines.push(format!("created: {}", item.created_at.format("%Y-%m-%d %H:%M")));
    lines.push(format!("updated: {}", item.updated_at.format("%Y-%m-%d %H:%M")));
    if let Some(desc) = &item.description {
        lines.push("description:".to_string());
        for line in desc.lines() {
            lines.push(format!("  {}", line));
        }
    }
    lines
}

/// Indented outline of the active tree under `root` (`None` = everything)
pub fn format_tree(project: &Project, root: Option<Uuid>) -> Vec<String> {
    let mut lines = Vec::new();
    for child in project.children(root) {
        push_tree(project, child, 0, &mut lines);
    }
    lines
}

fn push_tree(project: &Project, item: &Item, indent: usize, lines: &mut Vec<String>) {
    lines.push(format!("{}{} [{}]", "  ".repeat(indent), format_item_line(item), item.slug));
    for child in project.children(Some(item.id)) {
        push_tree(project, child, indent + 1, lines);
    }
}

pub fn format_orphan(orphan: &Orphan) -> String {
    let short: String = orphan.id.to_string().chars().take(8).collect();
    format!("{} [{:>4}] {} - {}", short, orphan.priority, orphan.name, orphan.description)
}

fn section_header(title: &str, width: usize) -> String {
    let pad = width.saturating_sub(title.len() + 4);
    format!("== {} {}", title, "=".repeat(pad))
}

fn summary_line(line: &ItemLine) -> String {
    let due = line
        .due_date
        .map(|d| format!("  (due {})", d))
        .unwrap_or_default();
    format!(
        "{}[{}] {}  {}{}",
        "  ".repeat(line.depth),
        status_char(line.status),
        line.path,
        line.name,
        due
    )
}

pub fn format_status(summary: &StatusSummary, header_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(scope) = &summary.scope {
        lines.push(format!("scope: {}", scope));
    }

    lines.push(section_header("Counts", header_width));
    for c in &summary.counts {
        lines.push(format!(
            "{:<12} {:>3} pending  {:>3} completed  {:>3} total",
            c.kind.as_str(),
            c.pending,
            c.completed,
            c.total
        ));
    }

    lines.push(section_header("Focus", header_width));
    let none = "-".to_string();
    lines.push(format!("phase:     {}", summary.focus.phase.as_ref().unwrap_or(&none)));
    lines.push(format!("milestone: {}", summary.focus.milestone.as_ref().unwrap_or(&none)));
    match (&summary.focus.objective, summary.focus.objective_completion) {
        (Some(path), Some(pct)) => lines.push(format!("objective: {} ({}%)", path, pct.overall)),
        (Some(path), None) => lines.push(format!("objective: {}", path)),
        (None, _) => lines.push(format!("objective: {}", none)),
    }

    if !summary.tree.is_empty() {
        lines.push(section_header("Objective", header_width));
        lines.extend(summary.tree.iter().map(summary_line));
    }
    if !summary.overdue.is_empty() {
        lines.push(section_header("Overdue", header_width));
        lines.extend(summary.overdue.iter().map(summary_line));
    }
    if !summary.orphaned.is_empty() {
        lines.push(section_header("Orphaned", header_width));
        lines.extend(summary.orphaned.iter().map(summary_line));
    }
    lines
}
