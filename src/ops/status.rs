use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::item::{Item, ItemKind, ItemStatus};
use crate::model::project::Project;
use crate::ops::completion::{calculate_completion_percentage, CompletionPercentage};
use crate::ops::navigation::{current_item, get_item_path, resolve_item};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KindCount {
    pub kind: ItemKind,
    pub pending: usize,
    pub completed: usize,
    pub total: usize,
}

/// One item as it appears in a summary listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemLine {
    pub path: String,
    pub kind: ItemKind,
    pub name: String,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    /// Nesting below the listing's root
    pub depth: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Focus {
    pub phase: Option<String>,
    pub milestone: Option<String>,
    pub objective: Option<String>,
    pub objective_completion: Option<CompletionPercentage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSummary {
    /// Path of the phase or milestone the summary is limited to
    pub scope: Option<String>,
    pub counts: Vec<KindCount>,
    pub overdue: Vec<ItemLine>,
    pub orphaned: Vec<ItemLine>,
    pub focus: Focus,
    /// Execution tree of the current objective
    pub tree: Vec<ItemLine>,
}

pub fn get_status_summary(project: &Project, filter: Option<&str>) -> Result<StatusSummary> {
    status_summary_on(project, filter, Local::now().date_naive())
}

/// Build the summary as of `today`
pub fn status_summary_on(
    project: &Project,
    filter: Option<&str>,
    today: NaiveDate,
) -> Result<StatusSummary> {
    let (scope, items): (Option<String>, Vec<&Item>) = match filter {
        Some(input) => {
            let root = resolve_item(project, Some(input))
                .ok_or_else(|| Error::not_found(format!("path '{}'", input)))?;
            if !matches!(root.kind, ItemKind::Phase | ItemKind::Milestone) {
                return Err(Error::validation(format!(
                    "status can be limited to a phase or milestone, not a {}",
                    root.kind
                )));
            }
            let mut items = vec![root];
            items.extend(project.descendants(root.id));
            (get_item_path(project, root.id), items)
        }
        None => (None, project.walk()),
    };

    let counts = ItemKind::ALL
        .iter()
        .map(|&kind| {
            let of_kind: Vec<&&Item> = items.iter().filter(|i| i.kind == kind).collect();
            KindCount {
                kind,
                pending: of_kind
                    .iter()
                    .filter(|i| matches!(i.status, ItemStatus::Pending | ItemStatus::InProgress))
                    .count(),
                completed: of_kind.iter().filter(|i| i.is_completed()).count(),
                total: of_kind.len(),
            }
        })
        .filter(|c| c.total > 0)
        .collect();

    let overdue = items
        .iter()
        .filter(|i| i.kind == ItemKind::Action && !i.is_frozen())
        .filter(|i| i.due_date().is_some_and(|d| d < today))
        .filter_map(|i| line(project, i, 0))
        .collect();

    let orphaned = items
        .iter()
        .filter(|i| !i.is_completed())
        .filter(|i| project.parent(i.id).is_some_and(|p| p.is_completed()))
        .filter_map(|i| line(project, i, 0))
        .collect();

    let objective = current_item(project, ItemKind::Objective);
    let focus = Focus {
        phase: current_item(project, ItemKind::Phase).and_then(|i| get_item_path(project, i.id)),
        milestone: current_item(project, ItemKind::Milestone)
            .and_then(|i| get_item_path(project, i.id)),
        objective: objective.and_then(|i| get_item_path(project, i.id)),
        objective_completion: objective
            .and_then(|i| calculate_completion_percentage(project, i.id).ok()),
    };

    let tree = match objective {
        Some(obj) => project
            .descendants(obj.id)
            .into_iter()
            .filter_map(|i| {
                let depth = i.kind.depth().saturating_sub(ItemKind::Deliverable.depth());
                line(project, i, depth)
            })
            .collect(),
        None => Vec::new(),
    };

    Ok(StatusSummary {
        scope,
        counts,
        overdue,
        orphaned,
        focus,
        tree,
    })
}

fn line(project: &Project, item: &Item, depth: usize) -> Option<ItemLine> {
    Some(ItemLine {
        path: get_item_path(project, item.id)?,
        kind: item.kind,
        name: item.name.clone(),
        status: item.status,
        due_date: item.due_date(),
        depth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::Config;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use uuid::Uuid;

    fn add(p: &mut Project, kind: ItemKind, slug: &str, parent: Option<Uuid>, status: ItemStatus) -> Uuid {
        let mut item = Item::new(kind, slug, parent);
        item.slug = slug.to_string();
        item.status = status;
        item.created_at = Utc::now() + Duration::seconds(p.items().len() as i64);
        p.insert(item)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    /// p1/m1/o1/{d1 (done)/{a1 done, a2 pending, late}, d2/a3}, p2/m2
    fn sample() -> Project {
        use ItemStatus::*;
        let mut p = Project::new(PathBuf::from(".prism"), Config::default());
        let p1 = add(&mut p, ItemKind::Phase, "p1", None, Pending);
        let m1 = add(&mut p, ItemKind::Milestone, "m1", Some(p1), Pending);
        let o1 = add(&mut p, ItemKind::Objective, "o1", Some(m1), InProgress);
        let d1 = add(&mut p, ItemKind::Deliverable, "d1", Some(o1), Completed);
        add(&mut p, ItemKind::Action, "a1", Some(d1), Completed);
        add(&mut p, ItemKind::Action, "a2", Some(d1), Pending);
        let late = add(&mut p, ItemKind::Action, "late", Some(d1), Completed);
        p.get_mut(late).unwrap().set_due_date(today() - Duration::days(3));
        let d2 = add(&mut p, ItemKind::Deliverable, "d2", Some(o1), Pending);
        let a3 = add(&mut p, ItemKind::Action, "a3", Some(d2), InProgress);
        p.get_mut(a3).unwrap().set_due_date(today() - Duration::days(1));
        let p2 = add(&mut p, ItemKind::Phase, "p2", None, Pending);
        add(&mut p, ItemKind::Milestone, "m2", Some(p2), Pending);
        // Keep o1 the current objective
        p.get_mut(o1).unwrap().created_at = Utc::now() + Duration::days(1);
        p
    }

    #[test]
    fn test_counts_for_whole_project() {
        let p = sample();
        let s = status_summary_on(&p, None, today()).unwrap();
        assert_eq!(s.scope, None);
        let actions = s.counts.iter().find(|c| c.kind == ItemKind::Action).unwrap();
        assert_eq!((actions.pending, actions.completed, actions.total), (2, 2, 4));
        let phases = s.counts.iter().find(|c| c.kind == ItemKind::Phase).unwrap();
        assert_eq!(phases.total, 2);
    }

    #[test]
    fn test_overdue_skips_completed() {
        let p = sample();
        let s = status_summary_on(&p, None, today()).unwrap();
        let paths: Vec<&str> = s.overdue.iter().map(|l| l.path.as_str()).collect();
        assert_eq!(paths, vec!["p1/m1/o1/d2/a3"]);
    }

    #[test]
    fn test_orphaned_items_under_completed_parent() {
        let p = sample();
        let s = status_summary_on(&p, None, today()).unwrap();
        let paths: Vec<&str> = s.orphaned.iter().map(|l| l.path.as_str()).collect();
        assert_eq!(paths, vec!["p1/m1/o1/d1/a2"]);
    }

    #[test]
    fn test_focus_and_tree() {
        let p = sample();
        let s = status_summary_on(&p, None, today()).unwrap();
        assert_eq!(s.focus.objective.as_deref(), Some("p1/m1/o1"));
        assert_eq!(s.focus.milestone.as_deref(), Some("p1/m1"));
        assert_eq!(s.focus.phase.as_deref(), Some("p1"));
        assert_eq!(s.focus.objective_completion.map(|c| c.overall), Some(50.0));

        let tree: Vec<(&str, usize)> = s.tree.iter().map(|l| (l.name.as_str(), l.depth)).collect();
        assert_eq!(
            tree,
            vec![("d1", 0), ("a1", 1), ("a2", 1), ("late", 1), ("d2", 0), ("a3", 1)]
        );
    }

    #[test]
    fn test_filter_limits_scope() {
        let p = sample();
        let s = status_summary_on(&p, Some("/p2"), today()).unwrap();
        assert_eq!(s.scope.as_deref(), Some("p2"));
        let kinds: Vec<ItemKind> = s.counts.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ItemKind::Phase, ItemKind::Milestone]);
        assert!(s.overdue.is_empty());
    }

    #[test]
    fn test_filter_errors() {
        let p = sample();
        assert!(matches!(
            status_summary_on(&p, Some("/nope"), today()),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            status_summary_on(&p, Some("/p1/m1/o1"), today()),
            Err(Error::Validation(_))
        ));
    }
}
