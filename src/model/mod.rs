pub mod config;
pub mod files;
pub mod item;
pub mod orphan;
pub mod project;

pub use config::*;
pub use item::*;
pub use orphan::*;
pub use project::*;
