use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An untyped idea waiting to be adopted into the tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Orphan {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub priority: i64,
}

/// Requested priority: a raw number or one of the configured labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Priority {
    Value(i64),
    Label(String),
}

impl Priority {
    /// Parse CLI input: integers become values, anything else a label
    pub fn parse(s: &str) -> Priority {
        match s.trim().parse::<i64>() {
            Ok(n) => Priority::Value(n),
            Err(_) => Priority::Label(s.trim().to_lowercase()),
        }
    }
}
