use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::item::{ItemKind, ItemStatus};
use crate::model::project::Project;

/// Emitted when the cascade completes a strategic item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionEvent {
    StrategicCompleted {
        id: Uuid,
        kind: ItemKind,
        name: String,
    },
}

/// Something that reacts to cascade completions (auto-archival, mostly).
///
/// Listener errors are logged and never undo the completion that fired them.
pub trait CompletionListener {
    fn on_completion(&self, project: &mut Project, event: &CompletionEvent) -> Result<()>;
}

/// Propagates `completed` status upward after an action or deliverable
/// finishes, and notifies its listeners when an objective completes.
#[derive(Default)]
pub struct CompletionTracker {
    listeners: Vec<Box<dyn CompletionListener>>,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listener(mut self, listener: impl CompletionListener + 'static) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    /// Walk upward from a just-completed item. A parent is completed when all
    /// of its children are; the walk stops at objectives, at any parent that
    /// is already completed, and at the first parent with unfinished work.
    pub fn cascade_completion(&self, project: &mut Project, id: Uuid) -> Vec<CompletionEvent> {
        let mut events = Vec::new();
        let mut current = id;

        loop {
            let Some(item) = project.get(current) else {
                break;
            };
            if item.status != ItemStatus::Completed
                || !matches!(item.kind, ItemKind::Action | ItemKind::Deliverable)
            {
                break;
            }
            let Some(parent_id) = item.parent_id else {
                break;
            };
            let Some(parent) = project.get(parent_id) else {
                break;
            };
            if parent.status.is_frozen() {
                break;
            }
            let all_done = project
                .children(Some(parent_id))
                .iter()
                .all(|c| c.status == ItemStatus::Completed);
            if !all_done {
                break;
            }

            let Some(parent) = project.get_mut(parent_id) else {
                break;
            };
            parent.status = ItemStatus::Completed;
            parent.touch();
            tracing::info!(kind = %parent.kind, slug = %parent.slug, "cascade completed");

            if parent.kind == ItemKind::Objective {
                events.push(CompletionEvent::StrategicCompleted {
                    id: parent.id,
                    kind: parent.kind,
                    name: parent.name.clone(),
                });
                break;
            }
            current = parent_id;
        }

        for event in &events {
            for listener in &self.listeners {
                if let Err(e) = listener.on_completion(project, event) {
                    tracing::warn!(error = %e, "completion listener failed");
                }
            }
        }
        events
    }
}

// ---------------------------------------------------------------------------
// Percentages and stats
// ---------------------------------------------------------------------------

/// Per-kind breakdown of an objective's progress
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ByType {
    pub deliverables: f64,
    pub actions: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompletionPercentage {
    pub overall: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_type: Option<ByType>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompletionStats {
    pub deliverables_total: usize,
    pub deliverables_completed: usize,
    pub deliverables_pending: usize,
    pub actions_total: usize,
    pub actions_completed: usize,
    pub actions_pending: usize,
}

/// Decimal places beyond this are dropped
const MAX_PRECISION: u32 = 10;

fn percent(done: usize, total: usize, precision: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = done as f64 / total as f64 * 100.0;
    let scale = 10f64.powi(precision.min(MAX_PRECISION) as i32);
    (raw * scale).round() / scale
}

/// Progress of an item as a percentage of completed children.
///
/// Objectives count deliverables and also report an actions figure across
/// all their deliverables. Empty collections give 0.0.
pub fn calculate_completion_percentage(project: &Project, id: Uuid) -> Result<CompletionPercentage> {
    let item = project
        .get(id)
        .ok_or_else(|| Error::not_found(id.to_string()))?;
    let precision = project.config.percentage_round_precision;

    match item.kind {
        ItemKind::Objective => {
            let stats = get_completion_stats(project, id)?;
            let deliverables = percent(
                stats.deliverables_completed,
                stats.deliverables_total,
                precision,
            );
            Ok(CompletionPercentage {
                overall: deliverables,
                by_type: Some(ByType {
                    deliverables,
                    actions: percent(stats.actions_completed, stats.actions_total, precision),
                }),
            })
        }
        ItemKind::Action => Err(Error::invalid_op("actions have no children to measure")),
        _ => {
            let children = project.children(Some(id));
            let done = children.iter().filter(|c| c.is_completed()).count();
            Ok(CompletionPercentage {
                overall: percent(done, children.len(), precision),
                by_type: None,
            })
        }
    }
}

/// Deliverable and action counts under an objective
pub fn get_completion_stats(project: &Project, objective_id: Uuid) -> Result<CompletionStats> {
    let objective = project
        .get(objective_id)
        .ok_or_else(|| Error::not_found(objective_id.to_string()))?;
    if objective.kind != ItemKind::Objective {
        return Err(Error::invalid_op(format!(
            "'{}' is a {}, not an objective",
            objective.slug, objective.kind
        )));
    }

    let mut stats = CompletionStats::default();
    for deliverable in project.children(Some(objective_id)) {
        stats.deliverables_total += 1;
        if deliverable.is_completed() {
            stats.deliverables_completed += 1;
        }
        for action in project.children(Some(deliverable.id)) {
            stats.actions_total += 1;
            if action.is_completed() {
                stats.actions_completed += 1;
            }
        }
    }
    stats.deliverables_pending = stats.deliverables_total - stats.deliverables_completed;
    stats.actions_pending = stats.actions_total - stats.actions_completed;
    Ok(stats)
}

/// True iff the objective has at least one deliverable and every deliverable
/// and action beneath it is completed
pub fn is_exec_tree_complete(project: &Project, objective_id: Uuid) -> bool {
    match get_completion_stats(project, objective_id) {
        Ok(stats) => {
            stats.deliverables_total > 0
                && stats.deliverables_pending == 0
                && stats.actions_pending == 0
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::Config;
    use crate::model::item::Item;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;

    struct Tree {
        project: Project,
        objective: Uuid,
        d1: Uuid,
        d2: Uuid,
        actions: Vec<Uuid>,
    }

    fn add(project: &mut Project, kind: ItemKind, slug: &str, parent: Option<Uuid>) -> Uuid {
        let mut item = Item::new(kind, slug, parent);
        item.slug = slug.to_string();
        project.insert(item)
    }

    /// objective → d1 {a1, a2}, d2 {a3}
    fn tree() -> Tree {
        let mut project = Project::new(PathBuf::from(".prism"), Config::default());
        let p = add(&mut project, ItemKind::Phase, "p", None);
        let m = add(&mut project, ItemKind::Milestone, "m", Some(p));
        let objective = add(&mut project, ItemKind::Objective, "o", Some(m));
        let d1 = add(&mut project, ItemKind::Deliverable, "d1", Some(objective));
        let a1 = add(&mut project, ItemKind::Action, "a1", Some(d1));
        let a2 = add(&mut project, ItemKind::Action, "a2", Some(d1));
        let d2 = add(&mut project, ItemKind::Deliverable, "d2", Some(objective));
        let a3 = add(&mut project, ItemKind::Action, "a3", Some(d2));
        Tree {
            project,
            objective,
            d1,
            d2,
            actions: vec![a1, a2, a3],
        }
    }

    fn complete(project: &mut Project, id: Uuid) {
        project.get_mut(id).unwrap().status = ItemStatus::Completed;
    }

    fn status(project: &Project, id: Uuid) -> ItemStatus {
        project.get(id).unwrap().status
    }

    #[derive(Clone, Default)]
    struct Recorder {
        seen: Rc<RefCell<Vec<CompletionEvent>>>,
    }

    impl CompletionListener for Recorder {
        fn on_completion(&self, _project: &mut Project, event: &CompletionEvent) -> Result<()> {
            self.seen.borrow_mut().push(event.clone());
            Ok(())
        }
    }

    struct Failing;

    impl CompletionListener for Failing {
        fn on_completion(&self, _project: &mut Project, _event: &CompletionEvent) -> Result<()> {
            Err(Error::invalid_op("archive unavailable"))
        }
    }

    #[test]
    fn test_partial_actions_do_not_cascade() {
        let mut t = tree();
        let tracker = CompletionTracker::new();
        complete(&mut t.project, t.actions[0]);
        let events = tracker.cascade_completion(&mut t.project, t.actions[0]);
        assert!(events.is_empty());
        assert_eq!(status(&t.project, t.d1), ItemStatus::Pending);
    }

    #[test]
    fn test_cascade_to_deliverable_then_objective() {
        let mut t = tree();
        let recorder = Recorder::default();
        let tracker = CompletionTracker::new().with_listener(recorder.clone());

        for &a in &t.actions[..2] {
            complete(&mut t.project, a);
            tracker.cascade_completion(&mut t.project, a);
        }
        assert_eq!(status(&t.project, t.d1), ItemStatus::Completed);
        assert_eq!(status(&t.project, t.objective), ItemStatus::Pending);
        assert!(recorder.seen.borrow().is_empty());

        complete(&mut t.project, t.actions[2]);
        let events = tracker.cascade_completion(&mut t.project, t.actions[2]);
        assert_eq!(status(&t.project, t.d2), ItemStatus::Completed);
        assert_eq!(status(&t.project, t.objective), ItemStatus::Completed);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            CompletionEvent::StrategicCompleted { id, kind: ItemKind::Objective, .. } if *id == t.objective
        ));
        assert_eq!(recorder.seen.borrow().len(), 1);
    }

    #[test]
    fn test_cascade_never_completes_milestone() {
        let mut t = tree();
        let tracker = CompletionTracker::new();
        for a in t.actions.clone() {
            complete(&mut t.project, a);
            tracker.cascade_completion(&mut t.project, a);
        }
        let milestone = t.project.parent(t.objective).unwrap();
        assert_eq!(milestone.status, ItemStatus::Pending);
    }

    #[test]
    fn test_cascade_is_idempotent() {
        let mut t = tree();
        let recorder = Recorder::default();
        let tracker = CompletionTracker::new().with_listener(recorder.clone());
        for a in t.actions.clone() {
            complete(&mut t.project, a);
            tracker.cascade_completion(&mut t.project, a);
        }
        let before: Vec<_> = t.project.items().to_vec();

        let again = tracker.cascade_completion(&mut t.project, t.actions[2]);
        assert!(again.is_empty());
        assert_eq!(t.project.items(), before.as_slice());
        assert_eq!(recorder.seen.borrow().len(), 1);
    }

    #[test]
    fn test_listener_failure_does_not_undo_completion() {
        let mut t = tree();
        let tracker = CompletionTracker::new().with_listener(Failing);
        for a in t.actions.clone() {
            complete(&mut t.project, a);
            tracker.cascade_completion(&mut t.project, a);
        }
        assert_eq!(status(&t.project, t.objective), ItemStatus::Completed);
    }

    #[test]
    fn test_percentages() {
        let mut t = tree();
        complete(&mut t.project, t.actions[0]);
        complete(&mut t.project, t.actions[1]);
        complete(&mut t.project, t.d1);

        let pct = calculate_completion_percentage(&t.project, t.objective).unwrap();
        assert_eq!(pct.overall, 50.0);
        let by_type = pct.by_type.unwrap();
        assert_eq!(by_type.deliverables, 50.0);
        assert_eq!(by_type.actions, 66.7);

        let d2 = calculate_completion_percentage(&t.project, t.d2).unwrap();
        assert_eq!(d2.overall, 0.0);
        assert!(d2.by_type.is_none());
    }

    #[test]
    fn test_empty_collections_yield_zero() {
        let mut t = tree();
        let m = t.project.parent(t.objective).unwrap().id;
        let empty_obj = add(&mut t.project, ItemKind::Objective, "empty", Some(m));
        let empty_del = add(&mut t.project, ItemKind::Deliverable, "d3", Some(t.objective));

        let pct = calculate_completion_percentage(&t.project, empty_obj).unwrap();
        assert_eq!(pct.overall, 0.0);
        assert_eq!(pct.by_type.unwrap().actions, 0.0);
        assert_eq!(
            calculate_completion_percentage(&t.project, empty_del).unwrap().overall,
            0.0
        );
    }

    #[test]
    fn test_percentages_stay_in_bounds() {
        let mut t = tree();
        for id in t.project.items().iter().map(|i| i.id).collect::<Vec<_>>() {
            complete(&mut t.project, id);
        }
        for id in [t.objective, t.d1, t.d2] {
            let pct = calculate_completion_percentage(&t.project, id).unwrap();
            assert!((0.0..=100.0).contains(&pct.overall));
            assert_eq!(pct.overall, 100.0);
        }
    }

    #[test]
    fn test_oversized_precision_is_clamped() {
        let pct = percent(1, 3, 400);
        assert!(pct.is_finite());
        assert!((0.0..=100.0).contains(&pct));
        assert_eq!(percent(1, 3, 400), percent(1, 3, MAX_PRECISION));
        assert_eq!(percent(1, 3, 1), 33.3);
    }

    #[test]
    fn test_exec_tree_complete() {
        let mut t = tree();
        assert!(!is_exec_tree_complete(&t.project, t.objective));
        for a in t.actions.clone() {
            complete(&mut t.project, a);
        }
        // Actions done but deliverables not marked yet
        assert!(!is_exec_tree_complete(&t.project, t.objective));
        complete(&mut t.project, t.d1);
        complete(&mut t.project, t.d2);
        assert!(is_exec_tree_complete(&t.project, t.objective));

        let m = t.project.parent(t.objective).unwrap().id;
        let empty = add(&mut t.project, ItemKind::Objective, "empty", Some(m));
        assert!(!is_exec_tree_complete(&t.project, empty));
    }

    #[test]
    fn test_completion_stats() {
        let mut t = tree();
        complete(&mut t.project, t.actions[2]);
        complete(&mut t.project, t.d2);
        let stats = get_completion_stats(&t.project, t.objective).unwrap();
        assert_eq!(
            stats,
            CompletionStats {
                deliverables_total: 2,
                deliverables_completed: 1,
                deliverables_pending: 1,
                actions_total: 3,
                actions_completed: 1,
                actions_pending: 2,
            }
        );
        assert!(get_completion_stats(&t.project, t.d1).is_err());
    }
}
