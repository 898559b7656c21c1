mod init;
pub use init::cmd_init;

use std::path::PathBuf;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::project_io::{self, ProjectError};
use crate::io::storage::Storage;
use crate::model::item::{ItemKind, ItemStatus};
use crate::model::project::Project;
use crate::ops::archive::{ArchiveManager, AutoArchiver};
use crate::ops::archived::{children_view, ChildNode, ItemView};
use crate::ops::completion::{CompletionEvent, CompletionTracker};
use crate::ops::crud::{self, ItemUpdate, NewItem};
use crate::ops::navigation::{self, get_item_path};
use crate::ops::orphans::OrphanManager;
use crate::ops::status::get_status_summary;
use crate::ops::task::TaskManager;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Where the command runs and how it reports
struct Ctx {
    start: PathBuf,
    json: bool,
}

impl Ctx {
    fn load(&self) -> Result<Project, ProjectError> {
        let prism_dir = project_io::discover_project(&self.start)?;
        project_io::load_project(&prism_dir)
    }
}

fn storage(project: &Project) -> Storage {
    Storage::new(&project.dir)
}

fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let start = match cli.project_dir.as_deref() {
        Some(dir) => std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?,
        None => std::env::current_dir()?,
    };
    let ctx = Ctx {
        start,
        json: cli.json,
    };

    match cli.command {
        Commands::Init(args) => cmd_init(args, cli.project_dir.as_deref()),

        // Items
        Commands::Add(args) => cmd_add(&ctx, args),
        Commands::Edit(args) => cmd_edit(&ctx, args),
        Commands::Delete(args) => cmd_delete(&ctx, args),
        Commands::Show(args) => cmd_show(&ctx, args),
        Commands::Nav(args) => cmd_nav(&ctx, args),

        // Work
        Commands::Task(cmd) => cmd_task(&ctx, cmd.action),

        // Summaries
        Commands::Status(args) => cmd_status(&ctx, args),
        Commands::Archived(args) => cmd_archived(&ctx, args),

        Commands::Orphan(cmd) => cmd_orphan(&ctx, cmd.action),
    }
}

// ---------------------------------------------------------------------------
// Item commands
// ---------------------------------------------------------------------------

fn cmd_add(ctx: &Ctx, args: AddArgs) -> CmdResult {
    let mut project = ctx.load()?;
    let archive = ArchiveManager::new(storage(&project));

    let id = crud::add(
        &mut project,
        &archive,
        &NewItem {
            kind: &args.kind,
            name: &args.name,
            description: args.description.as_deref(),
            parent_path: args.parent.as_deref(),
            status: args.status.as_deref(),
        },
    )?;
    if args.nav {
        crud::navigate_to(&mut project, id)?;
    }
    project_io::save_project(&project)?;

    let item = project.get(id).ok_or("new item vanished")?;
    if ctx.json {
        print_json(&item_to_json(&project, item))
    } else {
        println!("{}", get_item_path(&project, id).unwrap_or_default());
        Ok(())
    }
}

fn cmd_edit(ctx: &Ctx, args: EditArgs) -> CmdResult {
    let mut project = ctx.load()?;
    let path = args.path.as_deref().unwrap_or("");
    let id = crud::update(
        &mut project,
        path,
        &ItemUpdate {
            name: args.name.as_deref(),
            description: args.description.as_deref(),
            due_date: args.due.as_deref(),
            status: args.status.as_deref(),
        },
    )?;

    let snapshot = project.get(id).cloned().ok_or("edited item vanished")?;
    let item_json = item_to_json(&project, &snapshot);

    if snapshot.status == ItemStatus::Completed {
        let archiver = AutoArchiver::new(ArchiveManager::new(storage(&project)));
        let tracker = CompletionTracker::new().with_listener(archiver);
        for event in tracker.cascade_completion(&mut project, id) {
            let CompletionEvent::StrategicCompleted { kind, name, .. } = event;
            if !ctx.json {
                println!("completed {} '{}'", kind, name);
            }
        }
    }
    project_io::save_project(&project)?;

    if ctx.json {
        print_json(&item_json)
    } else {
        println!("{}", format_item_line(&snapshot));
        Ok(())
    }
}

fn cmd_delete(ctx: &Ctx, args: DeleteArgs) -> CmdResult {
    let mut project = ctx.load()?;
    let path = navigation::resolve_path(&project, Some(&args.path));
    let removed = crud::delete(&mut project, &args.path)?;
    project_io::save_project(&project)?;

    if ctx.json {
        let mut deleted = item_to_json(&project, &removed);
        deleted.path = path;
        print_json(&DeletedJson { deleted })
    } else {
        println!("deleted {}", path.unwrap_or(removed.slug));
        Ok(())
    }
}

fn cmd_show(ctx: &Ctx, args: ShowArgs) -> CmdResult {
    let project = ctx.load()?;
    let store = storage(&project);

    let wanted = args.path.as_deref().map(str::trim).filter(|p| !p.is_empty());
    let item = match wanted {
        Some(p) => Some(
            navigation::resolve_item(&project, Some(p))
                .ok_or_else(|| format!("not found: path '{}'", p))?,
        ),
        None => navigation::resolve_item(&project, None),
    };
    let parent = item.map(|i| i.id);

    let children: Vec<ChildNode> = if args.archived {
        children_view(&project, parent, &store)
    } else {
        project.children(parent).into_iter().map(ChildNode::Active).collect()
    };

    if ctx.json {
        return print_json(&ShowJson {
            item: item.map(|i| item_to_json(&project, i)),
            children: children.iter().map(child_to_json).collect(),
        });
    }

    match item {
        Some(item) => {
            for line in format_item_detail(&project, item) {
                println!("{}", line);
            }
            if !children.is_empty() {
                println!();
                for child in &children {
                    println!("  {}", format_child_line(child));
                }
            }
        }
        None => {
            for line in format_tree(&project, None) {
                println!("{}", line);
            }
            if args.archived {
                for child in children.iter().filter(|c| c.view().is_archived()) {
                    println!("{}", format_child_line(child));
                }
            }
        }
    }
    Ok(())
}

fn cmd_nav(ctx: &Ctx, args: NavArgs) -> CmdResult {
    let mut project = ctx.load()?;
    if let Some(input) = args.path.as_deref() {
        let resolved = navigation::resolve_path(&project, Some(input))
            .ok_or_else(|| format!("not found: path '{}'", input))?;
        navigation::set_crud_context(&mut project, &resolved)?;
        project_io::save_project(&project)?;
    }

    let nav = NavJson {
        cursor: project.cursor.clone(),
        context: navigation::get_crud_context(&project),
    };
    if ctx.json {
        print_json(&nav)
    } else {
        println!("cursor:  {}", nav.cursor.as_deref().unwrap_or("-"));
        println!("context: {}", nav.context.as_deref().unwrap_or("-"));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Task commands
// ---------------------------------------------------------------------------

fn cmd_task(ctx: &Ctx, action: TaskAction) -> CmdResult {
    let mut project = ctx.load()?;
    let tasks = TaskManager::with_auto_archive(storage(&project));

    let (completed, started) = match action {
        TaskAction::Start => (None, tasks.start_next_action(&mut project)?),
        TaskAction::Done => (tasks.complete_current_action(&mut project)?, None),
        TaskAction::Next => tasks.complete_current_and_start_next(&mut project)?,
    };

    if ctx.json {
        return print_json(&TaskStepJson {
            completed: completed.as_ref().map(|i| item_to_json(&project, i)),
            started: started.as_ref().map(|i| item_to_json(&project, i)),
        });
    }

    if let Some(item) = &completed {
        println!("done:    {}", item.name);
    }
    match (&action, &started) {
        (_, Some(item)) => println!(
            "working: {}",
            get_item_path(&project, item.id).unwrap_or_else(|| item.name.clone())
        ),
        (TaskAction::Done, None) if completed.is_none() => println!("no action in progress"),
        (TaskAction::Done, None) => {}
        (_, None) => println!("no pending actions"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Summary commands
// ---------------------------------------------------------------------------

fn cmd_status(ctx: &Ctx, args: StatusArgs) -> CmdResult {
    let project = ctx.load()?;
    let (filter, expected) = match (&args.phase, &args.milestone) {
        (Some(p), _) => (Some(p.as_str()), Some(ItemKind::Phase)),
        (None, Some(m)) => (Some(m.as_str()), Some(ItemKind::Milestone)),
        (None, None) => (None, None),
    };
    if let (Some(path), Some(kind)) = (filter, expected)
        && let Some(item) = navigation::resolve_item(&project, Some(path))
        && item.kind != kind
    {
        return Err(format!("'{}' is a {}, not a {}", path, item.kind, kind).into());
    }

    let summary = get_status_summary(&project, filter)?;
    if ctx.json {
        print_json(&summary)
    } else {
        for line in format_status(&summary, project.config.status_header_width) {
            println!("{}", line);
        }
        Ok(())
    }
}

fn cmd_archived(ctx: &Ctx, args: ArchivedArgs) -> CmdResult {
    let project = ctx.load()?;
    let kind = match args.kind.as_deref() {
        Some(k) => {
            let kind = ItemKind::parse(k).ok_or_else(|| format!("unknown kind '{}'", k))?;
            if !kind.is_strategic() {
                return Err(format!("{}s are archived with their objective", kind).into());
            }
            Some(kind)
        }
        None => None,
    };

    let archive = ArchiveManager::new(storage(&project));
    let items = archive.list_archived(kind)?;
    if ctx.json {
        let nodes: Vec<ChildNode> = items.into_iter().map(ChildNode::Archived).collect();
        let out: Vec<ChildJson> = nodes.iter().map(child_to_json).collect();
        return print_json(&out);
    }
    if items.is_empty() {
        println!("nothing archived");
    }
    for item in &items {
        println!(
            "{:<10} {}  {}",
            item.kind().as_str(),
            item.slug()?,
            item.name()?
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Orphans
// ---------------------------------------------------------------------------

fn cmd_orphan(ctx: &Ctx, action: OrphanAction) -> CmdResult {
    let mut project = ctx.load()?;
    let orphans = OrphanManager::new(storage(&project), project.config.clone());

    match action {
        OrphanAction::List => {
            let mut all = orphans.read()?;
            all.sort_by(|a, b| b.priority.cmp(&a.priority));
            if ctx.json {
                return print_json(&all);
            }
            if all.is_empty() {
                println!("no orphans");
            }
            for orphan in &all {
                println!("{}", format_orphan(orphan));
            }
        }
        OrphanAction::Add {
            name,
            description,
            priority,
        } => {
            let orphan = orphans.add(&name, &description, priority.as_deref())?;
            if ctx.json {
                return print_json(&orphan);
            }
            println!("{}", orphan.id);
        }
        OrphanAction::Adopt { id, kind, parent } => {
            let id = orphans.resolve_id(&id)?;
            let orphan = orphans
                .get_by_id(id)?
                .ok_or_else(|| format!("not found: orphan {}", id))?;
            let archive = ArchiveManager::new(storage(&project));
            let new_id = crud::add(
                &mut project,
                &archive,
                &NewItem {
                    kind: &kind,
                    name: &orphan.name,
                    description: Some(&orphan.description),
                    parent_path: parent.as_deref(),
                    status: None,
                },
            )?;
            project_io::save_project(&project)?;
            orphans.remove(id)?;

            let item = project.get(new_id).ok_or("adopted item vanished")?;
            if ctx.json {
                return print_json(&item_to_json(&project, item));
            }
            println!("{}", get_item_path(&project, new_id).unwrap_or_default());
        }
        OrphanAction::Delete { id } => {
            let id = orphans.resolve_id(&id)?;
            let removed = orphans.remove(id)?;
            if ctx.json {
                return print_json(&removed);
            }
            println!("deleted orphan '{}'", removed.name);
        }
    }
    Ok(())
}
