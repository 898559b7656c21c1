use std::path::PathBuf;

use crate::cli::commands::InitArgs;
use crate::io::project_io::{self, PRISM_DIR};

pub fn cmd_init(args: InitArgs, project_dir: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let root = match project_dir {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };
    if !root.is_dir() {
        return Err(format!("not a directory: {}", root.display()).into());
    }

    // Check for an enclosing project and warn
    if let Some(parent) = root.parent()
        && let Ok(outer) = project_io::discover_project(parent)
    {
        eprintln!("Note: enclosing project found at {}", outer.display());
        eprintln!("Creating new project in ./{}/", PRISM_DIR);
    }

    let prism_dir = project_io::init_project(&root, args.force)?;
    println!("Initialized prism project in {}", prism_dir.display());
    Ok(())
}
