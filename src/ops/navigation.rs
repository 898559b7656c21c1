use std::cmp::Ordering;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::item::{Item, ItemKind, ItemStatus};
use crate::model::project::Project;

/// A `:`-prefixed shortcut that stands for a computed path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// Parent of the CRUD context
    Up,
    /// The item of this kind currently in focus
    Current(ItemKind),
    /// The most recent non-completed item of this kind (reverse tree scan)
    Last(ItemKind),
    /// The item after the current one (deliverables and actions only)
    Next(ItemKind),
}

impl Token {
    pub fn parse(s: &str) -> Option<Token> {
        use ItemKind::*;
        let token = match s {
            ":u" | ":up" | ":parent" => Token::Up,
            ":cp" | ":current-phase" => Token::Current(Phase),
            ":cm" | ":current-milestone" => Token::Current(Milestone),
            ":co" | ":current-objective" => Token::Current(Objective),
            ":cd" | ":current-deliverable" => Token::Current(Deliverable),
            ":ca" | ":current-action" => Token::Current(Action),
            ":lp" | ":last-phase" => Token::Last(Phase),
            ":lm" | ":last-milestone" => Token::Last(Milestone),
            ":lo" | ":last-objective" => Token::Last(Objective),
            ":ld" | ":last-deliverable" => Token::Last(Deliverable),
            ":la" | ":last-action" => Token::Last(Action),
            ":nd" | ":next-deliverable" => Token::Next(Deliverable),
            ":na" | ":next-action" => Token::Next(Action),
            _ => return None,
        };
        Some(token)
    }
}

// ---------------------------------------------------------------------------
// Path ↔ item
// ---------------------------------------------------------------------------

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.trim_matches('/').split('/')
}

/// Look up an item by slash-delimited path. Each segment matches a child's
/// slug, or failing that a 1-based position among the active children.
pub fn get_item_by_path<'a>(project: &'a Project, path: &str) -> Option<&'a Item> {
    if path.trim_matches('/').is_empty() {
        return None;
    }
    let mut parent: Option<Uuid> = None;
    let mut found: Option<&Item> = None;
    for segment in segments(path) {
        let children = project.children(parent);
        let item = children
            .iter()
            .find(|c| c.slug == segment)
            .copied()
            .or_else(|| {
                let n: usize = segment.parse().ok()?;
                children.get(n.checked_sub(1)?).copied()
            })?;
        parent = Some(item.id);
        found = Some(item);
    }
    found
}

/// Slug path of `id`, found by depth-first search from the roots
pub fn get_item_path(project: &Project, id: Uuid) -> Option<String> {
    let mut stack: Vec<&str> = Vec::new();
    for phase in project.children(None) {
        if search_path(project, phase, id, &mut stack) {
            return Some(stack.join("/"));
        }
    }
    None
}

fn search_path<'a>(project: &'a Project, item: &'a Item, id: Uuid, stack: &mut Vec<&'a str>) -> bool {
    stack.push(&item.slug);
    if item.id == id {
        return true;
    }
    for child in project.children(Some(item.id)) {
        if search_path(project, child, id, stack) {
            return true;
        }
    }
    stack.pop();
    false
}

/// Path of `id` written as 1-based positions instead of slugs
pub fn get_index_path(project: &Project, id: Uuid) -> Option<String> {
    let mut chain = Vec::new();
    let mut current = project.get(id)?;
    loop {
        let siblings = project.children(current.parent_id);
        let pos = siblings.iter().position(|s| s.id == current.id)?;
        chain.push((pos + 1).to_string());
        match current.parent_id {
            Some(pid) => current = project.get(pid)?,
            None => break,
        }
    }
    chain.reverse();
    Some(chain.join("/"))
}

/// Drop the last segment; `None` for a single-segment path
pub fn parent_path(path: &str) -> Option<String> {
    let trimmed = path.trim_matches('/');
    trimmed.rfind('/').map(|i| trimmed[..i].to_string())
}

// ---------------------------------------------------------------------------
// Current / last / next
// ---------------------------------------------------------------------------

fn latest_of_kind(project: &Project, kind: ItemKind) -> Option<&Item> {
    project
        .walk()
        .into_iter()
        .filter(|i| i.kind == kind && i.status != ItemStatus::Archived)
        .fold(None, |best: Option<&Item>, item| match best {
            Some(b) if b.created_at > item.created_at => Some(b),
            _ => Some(item),
        })
}

/// The action the cursor points at, if it still resolves
pub fn cursor_item(project: &Project) -> Option<&Item> {
    project
        .cursor
        .as_deref()
        .and_then(|path| get_item_by_path(project, path))
}

/// The item of `kind` currently in focus.
///
/// The current objective is the most recently created non-archived one;
/// completed objectives still count until a newer one exists. Milestone and
/// phase follow from it, falling back to their own latest. Deliverable and
/// action come from the cursor.
pub fn current_item(project: &Project, kind: ItemKind) -> Option<&Item> {
    match kind {
        ItemKind::Objective => latest_of_kind(project, kind),
        ItemKind::Milestone | ItemKind::Phase => {
            let below = kind.child_kind().and_then(|k| current_item(project, k));
            below
                .and_then(|c| c.parent_id)
                .and_then(|pid| project.get(pid))
                .filter(|p| p.kind == kind)
                .or_else(|| latest_of_kind(project, kind))
        }
        ItemKind::Action => cursor_item(project).filter(|i| i.kind == ItemKind::Action),
        ItemKind::Deliverable => {
            let action = current_item(project, ItemKind::Action)?;
            project.parent(action.id)
        }
    }
}

/// The most recent item of `kind` that is neither completed nor archived
pub fn last_item(project: &Project, kind: ItemKind) -> Option<&Item> {
    project.walk().into_iter().rev().find(|i| {
        i.kind == kind && !matches!(i.status, ItemStatus::Completed | ItemStatus::Archived)
    })
}

/// The item of `kind` following the current one in tree order. Only
/// deliverables and actions have a "next".
pub fn next_item(project: &Project, kind: ItemKind) -> Option<&Item> {
    if !matches!(kind, ItemKind::Deliverable | ItemKind::Action) {
        return None;
    }
    let current = current_item(project, kind)?;
    let all = project.of_kind(kind);
    let pos = all.iter().position(|i| i.id == current.id)?;
    all.get(pos + 1).copied()
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Path a special token stands for, or `None` for an unknown token or when
/// nothing matches
pub fn resolve_token(project: &Project, token: &str) -> Option<String> {
    let item = match Token::parse(token)? {
        Token::Up => {
            let base = get_crud_context(project)?;
            return parent_path(&base);
        }
        Token::Current(kind) => current_item(project, kind),
        Token::Last(kind) => last_item(project, kind),
        Token::Next(kind) => next_item(project, kind),
    }?;
    get_item_path(project, item.id)
}

/// Turn user input into an absolute path string.
///
/// Empty input means the CRUD context, `:` starts a token, a leading `/`
/// marks an absolute path, and anything else is relative to the context.
pub fn resolve_path(project: &Project, input: Option<&str>) -> Option<String> {
    let input = input.map(str::trim).unwrap_or("");
    let resolved = if input.is_empty() {
        get_crud_context(project)
    } else if input.starts_with(':') {
        resolve_token(project, input)
    } else if let Some(abs) = input.strip_prefix('/') {
        Some(abs.trim_start_matches('/').to_string()).filter(|p| !p.is_empty())
    } else {
        match get_crud_context(project) {
            Some(ctx) => Some(format!("{}/{}", ctx.trim_end_matches('/'), input)),
            None => Some(input.to_string()),
        }
    };
    tracing::debug!(input, resolved = ?resolved, "resolved path");
    resolved
}

/// Resolve input all the way to an item
pub fn resolve_item<'a>(project: &'a Project, input: Option<&str>) -> Option<&'a Item> {
    resolve_path(project, input).and_then(|p| get_item_by_path(project, &p))
}

// ---------------------------------------------------------------------------
// CRUD context
// ---------------------------------------------------------------------------

/// The explicit context if one is set, else the cursor's parent path
pub fn get_crud_context(project: &Project) -> Option<String> {
    if let Some(ctx) = &project.crud_context
        && !ctx.is_empty()
    {
        return Some(ctx.clone());
    }
    project.cursor.as_deref().and_then(parent_path)
}

/// Set the explicit CRUD context. Fails without changing anything when the
/// path does not resolve or lies behind the cursor.
pub fn set_crud_context(project: &mut Project, path: &str) -> Result<String> {
    let item = get_item_by_path(project, path)
        .ok_or_else(|| Error::not_found(format!("path '{}'", path)))?;
    let item_id = item.id;

    if let Some(cursor) = cursor_item(project) {
        let candidate = get_index_path(project, item_id);
        let reference = get_index_path(project, cursor.id);
        if let (Some(candidate), Some(reference)) = (candidate, reference)
            && is_path_behind(&candidate, &reference)
        {
            return Err(Error::invalid_op(format!(
                "'{}' is behind the current task",
                path
            )));
        }
    }

    let canonical = get_item_path(project, item_id)
        .ok_or_else(|| Error::not_found(format!("path '{}'", path)))?;
    project.crud_context = Some(canonical.clone());
    Ok(canonical)
}

/// Whether `path` comes strictly before `reference` in depth-first order
/// without being one of its ancestors.
///
/// Segments are compared pairwise: numbers as integers, anything else as
/// strings. The first differing pair decides; a shared prefix is never
/// behind.
pub fn is_path_behind(path: &str, reference: &str) -> bool {
    for (a, b) in segments(path).zip(segments(reference)) {
        let ord = match (a.parse::<u64>(), b.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            _ => a.cmp(b),
        };
        match ord {
            Ordering::Equal => continue,
            Ordering::Less => return true,
            Ordering::Greater => return false,
        }
    }
    false
}

/// Drop a cursor or context path that no longer resolves
pub fn clear_stale_positions(project: &mut Project) {
    if let Some(cursor) = &project.cursor
        && get_item_by_path(project, cursor).is_none()
    {
        tracing::debug!(cursor = %cursor, "clearing task cursor");
        project.cursor = None;
    }
    if let Some(ctx) = &project.crud_context
        && get_item_by_path(project, ctx).is_none()
    {
        tracing::debug!(context = %ctx, "clearing crud context");
        project.crud_context = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::Config;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    struct Fixture {
        project: Project,
    }

    impl Fixture {
        fn add(&mut self, kind: ItemKind, slug: &str, parent: Option<Uuid>) -> Uuid {
            let mut item = Item::new(kind, slug, parent);
            item.slug = slug.to_string();
            // Strictly increasing creation times keep "latest" deterministic
            item.created_at = Utc::now() + Duration::seconds(self.project.items().len() as i64);
            self.project.insert(item)
        }
    }

    /// phase-1/milestone-1/objective-1/{deliverable-1/{action-1,action-2}, deliverable-2/action-1}
    fn sample() -> Fixture {
        let mut f = Fixture {
            project: Project::new(PathBuf::from(".prism"), Config::default()),
        };
        let p = f.add(ItemKind::Phase, "phase-1", None);
        let m = f.add(ItemKind::Milestone, "milestone-1", Some(p));
        let o = f.add(ItemKind::Objective, "objective-1", Some(m));
        let d1 = f.add(ItemKind::Deliverable, "deliverable-1", Some(o));
        f.add(ItemKind::Action, "action-1", Some(d1));
        f.add(ItemKind::Action, "action-2", Some(d1));
        let d2 = f.add(ItemKind::Deliverable, "deliverable-2", Some(o));
        f.add(ItemKind::Action, "action-1", Some(d2));
        f
    }

    const A1: &str = "phase-1/milestone-1/objective-1/deliverable-1/action-1";

    fn slug_at<'a>(project: &'a Project, path: &str) -> Option<&'a str> {
        get_item_by_path(project, path).map(|i| i.slug.as_str())
    }

    #[test]
    fn test_get_item_by_slug_path() {
        let f = sample();
        assert_eq!(slug_at(&f.project, A1), Some("action-1"));
        assert_eq!(
            slug_at(&f.project, "phase-1/milestone-1/objective-1/deliverable-2"),
            Some("deliverable-2")
        );
    }

    #[test]
    fn test_get_item_by_index_path() {
        let f = sample();
        let by_index = get_item_by_path(&f.project, "1/1/1/2/1").unwrap();
        let by_slug =
            get_item_by_path(&f.project, "phase-1/milestone-1/objective-1/deliverable-2/action-1")
                .unwrap();
        assert_eq!(by_index.id, by_slug.id);
        assert_eq!(slug_at(&f.project, "phase-1/1/objective-1/1/2"), Some("action-2"));
    }

    #[test]
    fn test_get_item_by_path_not_found() {
        let f = sample();
        assert!(get_item_by_path(&f.project, "phase-1/nope").is_none());
        assert!(get_item_by_path(&f.project, "2").is_none());
        assert!(get_item_by_path(&f.project, "0").is_none());
        assert!(get_item_by_path(&f.project, "").is_none());
        assert!(get_item_by_path(&f.project, A1.replace("action-1", "action-9").as_str()).is_none());
    }

    #[test]
    fn test_path_round_trip_for_every_item() {
        let f = sample();
        for item in f.project.walk() {
            let path = get_item_path(&f.project, item.id).unwrap();
            let back = get_item_by_path(&f.project, &path).unwrap();
            assert!(std::ptr::eq(back, item), "round trip failed for {}", path);
        }
        assert!(get_item_path(&f.project, Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_index_path() {
        let f = sample();
        let a = get_item_by_path(&f.project, "phase-1/milestone-1/objective-1/deliverable-2/action-1")
            .unwrap();
        assert_eq!(get_index_path(&f.project, a.id).as_deref(), Some("1/1/1/2/1"));
    }

    #[test]
    fn test_token_table() {
        assert_eq!(Token::parse(":u"), Some(Token::Up));
        assert_eq!(Token::parse(":parent"), Some(Token::Up));
        assert_eq!(Token::parse(":co"), Some(Token::Current(ItemKind::Objective)));
        assert_eq!(Token::parse(":last-action"), Some(Token::Last(ItemKind::Action)));
        assert_eq!(Token::parse(":nd"), Some(Token::Next(ItemKind::Deliverable)));
        assert_eq!(Token::parse(":np"), None);
        assert_eq!(Token::parse(":nm"), None);
        assert_eq!(Token::parse(":no"), None);
        assert_eq!(Token::parse("co"), None);
    }

    #[test]
    fn test_current_strategic_items() {
        let f = sample();
        assert_eq!(resolve_token(&f.project, ":cp").as_deref(), Some("phase-1"));
        assert_eq!(resolve_token(&f.project, ":cm").as_deref(), Some("phase-1/milestone-1"));
        assert_eq!(
            resolve_token(&f.project, ":co").as_deref(),
            Some("phase-1/milestone-1/objective-1")
        );
    }

    #[test]
    fn test_current_objective_is_latest_created_not_archived() {
        let mut f = sample();
        let m = get_item_by_path(&f.project, "phase-1/milestone-1").unwrap().id;
        let o2 = f.add(ItemKind::Objective, "objective-2", Some(m));
        assert_eq!(current_item(&f.project, ItemKind::Objective).map(|o| o.id), Some(o2));

        // Completed still counts as current
        f.project.get_mut(o2).unwrap().status = ItemStatus::Completed;
        assert_eq!(current_item(&f.project, ItemKind::Objective).map(|o| o.id), Some(o2));

        f.project.get_mut(o2).unwrap().status = ItemStatus::Archived;
        assert_eq!(
            current_item(&f.project, ItemKind::Objective).map(|o| o.slug.as_str()),
            Some("objective-1")
        );
    }

    #[test]
    fn test_current_milestone_follows_objective() {
        let mut f = sample();
        let p = get_item_by_path(&f.project, "phase-1").unwrap().id;
        // A newer milestone without objectives does not take focus
        f.add(ItemKind::Milestone, "milestone-2", Some(p));
        assert_eq!(
            current_item(&f.project, ItemKind::Milestone).map(|m| m.slug.as_str()),
            Some("milestone-1")
        );
    }

    #[test]
    fn test_current_exec_items_from_cursor() {
        let mut f = sample();
        assert!(resolve_token(&f.project, ":ca").is_none());
        f.project.cursor = Some(A1.to_string());
        assert_eq!(resolve_token(&f.project, ":ca").as_deref(), Some(A1));
        assert_eq!(
            resolve_token(&f.project, ":cd").as_deref(),
            Some("phase-1/milestone-1/objective-1/deliverable-1")
        );
    }

    #[test]
    fn test_last_tokens_skip_completed() {
        let mut f = sample();
        assert_eq!(resolve_token(&f.project, ":lp").as_deref(), Some("phase-1"));
        assert_eq!(
            resolve_token(&f.project, ":la").as_deref(),
            Some("phase-1/milestone-1/objective-1/deliverable-2/action-1")
        );
        let id = get_item_by_path(&f.project, "phase-1/milestone-1/objective-1/deliverable-2/action-1")
            .unwrap()
            .id;
        f.project.get_mut(id).unwrap().status = ItemStatus::Completed;
        assert_eq!(
            resolve_token(&f.project, ":la").as_deref(),
            Some("phase-1/milestone-1/objective-1/deliverable-1/action-2")
        );
    }

    #[test]
    fn test_next_tokens() {
        let mut f = sample();
        assert!(resolve_token(&f.project, ":na").is_none());
        f.project.cursor = Some(A1.to_string());
        assert_eq!(
            resolve_token(&f.project, ":na").as_deref(),
            Some("phase-1/milestone-1/objective-1/deliverable-1/action-2")
        );
        assert_eq!(
            resolve_token(&f.project, ":nd").as_deref(),
            Some("phase-1/milestone-1/objective-1/deliverable-2")
        );
        f.project.cursor = Some("phase-1/milestone-1/objective-1/deliverable-2/action-1".into());
        assert!(resolve_token(&f.project, ":na").is_none());
    }

    #[test]
    fn test_up_token_uses_context_from_cursor() {
        let mut f = sample();
        f.project.cursor = Some(A1.to_string());
        assert_eq!(
            resolve_token(&f.project, ":u").as_deref(),
            Some("phase-1/milestone-1/objective-1")
        );
    }

    #[test]
    fn test_invalid_token_resolves_to_none() {
        let f = sample();
        assert!(resolve_token(&f.project, ":invalid").is_none());
        assert!(resolve_token(&f.project, "not-a-token").is_none());
    }

    #[test]
    fn test_resolve_path_forms() {
        let mut f = sample();
        f.project.crud_context = Some("phase-1/milestone-1/objective-1".into());
        assert_eq!(
            resolve_path(&f.project, None).as_deref(),
            Some("phase-1/milestone-1/objective-1")
        );
        assert_eq!(
            resolve_path(&f.project, Some("")).as_deref(),
            Some("phase-1/milestone-1/objective-1")
        );
        assert_eq!(
            resolve_path(&f.project, Some("/phase-1/milestone-1")).as_deref(),
            Some("phase-1/milestone-1")
        );
        assert_eq!(
            resolve_path(&f.project, Some("deliverable-1")).as_deref(),
            Some("phase-1/milestone-1/objective-1/deliverable-1")
        );
        assert_eq!(resolve_path(&f.project, Some(":cp")).as_deref(), Some("phase-1"));
        assert_eq!(
            resolve_item(&f.project, Some("2/1")).map(|i| i.slug.as_str()),
            Some("action-1")
        );
    }

    #[test]
    fn test_relative_path_without_context_is_absolute() {
        let f = sample();
        assert_eq!(resolve_path(&f.project, Some("phase-1")).as_deref(), Some("phase-1"));
        assert!(resolve_path(&f.project, None).is_none());
    }

    #[test]
    fn test_crud_context_sources() {
        let mut f = sample();
        assert!(get_crud_context(&f.project).is_none());
        f.project.cursor = Some(A1.to_string());
        assert_eq!(
            get_crud_context(&f.project).as_deref(),
            Some("phase-1/milestone-1/objective-1/deliverable-1")
        );
        f.project.crud_context = Some("explicit/context/path".into());
        assert_eq!(get_crud_context(&f.project).as_deref(), Some("explicit/context/path"));
    }

    #[test]
    fn test_set_crud_context_validation() {
        let mut f = sample();
        assert!(matches!(
            set_crud_context(&mut f.project, "invalid/path"),
            Err(Error::NotFound(_))
        ));
        assert!(f.project.crud_context.is_none());

        f.project.cursor = Some("phase-1/milestone-1/objective-1/deliverable-2/action-1".into());
        // Ancestor is fine
        assert_eq!(
            set_crud_context(&mut f.project, "1/1/1").unwrap(),
            "phase-1/milestone-1/objective-1"
        );
        // Earlier sibling branch is behind the cursor
        let err = set_crud_context(&mut f.project, "phase-1/milestone-1/objective-1/deliverable-1")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));
        assert_eq!(
            f.project.crud_context.as_deref(),
            Some("phase-1/milestone-1/objective-1")
        );
    }

    #[test]
    fn test_is_path_behind() {
        let cursor = "phase-2/milestone-1/objective-1/deliverable-1/action-1";
        assert!(is_path_behind("phase-1", cursor));
        assert!(is_path_behind(
            "phase-1/milestone-1",
            "phase-1/milestone-2/objective-1/deliverable-1/action-1"
        ));
        assert!(!is_path_behind("phase-2", cursor));
        assert!(!is_path_behind("phase-2/milestone-1", cursor));
        assert!(!is_path_behind(cursor, cursor));
        assert!(!is_path_behind(
            "phase-1/milestone-1/objective-1/deliverable-1/action-2",
            "phase-1/milestone-1/objective-1/deliverable-1/action-1"
        ));
        // Numbers compare as integers, not strings
        assert!(is_path_behind("1/9", "1/10"));
        assert!(!is_path_behind("1/10", "1/9"));
    }
}
