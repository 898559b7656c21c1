use regex::Regex;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::io::storage::Storage;
use crate::model::config::Config;
use crate::model::files::OrphansFile;
use crate::model::orphan::{Orphan, Priority};

/// Changes for [`OrphanManager::update`]
#[derive(Debug, Clone, Default)]
pub struct OrphanUpdate<'a> {
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub priority: Option<&'a str>,
}

/// Keeps `orphans.json`, the list of ideas not yet placed in the tree
pub struct OrphanManager {
    storage: Storage,
    config: Config,
}

impl OrphanManager {
    pub fn new(storage: Storage, config: Config) -> Self {
        OrphanManager { storage, config }
    }

    pub fn read(&self) -> Result<Vec<Orphan>> {
        Ok(self.storage.load_orphans()?.orphans)
    }

    pub fn write(&self, orphans: &[Orphan]) -> Result<()> {
        self.storage.save_orphans(&OrphansFile {
            orphans: orphans.to_vec(),
        })?;
        Ok(())
    }

    pub fn get_by_id(&self, id: Uuid) -> Result<Option<Orphan>> {
        Ok(self.read()?.into_iter().find(|o| o.id == id))
    }

    /// Case-insensitive name lookup
    pub fn get_by_name(&self, name: &str) -> Result<Option<Orphan>> {
        let wanted = name.trim().to_lowercase();
        Ok(self
            .read()?
            .into_iter()
            .find(|o| o.name.to_lowercase() == wanted))
    }

    /// Resolve a full id or an unambiguous id prefix
    pub fn resolve_id(&self, input: &str) -> Result<Uuid> {
        if let Ok(id) = Uuid::parse_str(input.trim()) {
            return Ok(id);
        }
        let prefix = input.trim().to_lowercase();
        if prefix.is_empty() {
            return Err(Error::validation("orphan id must not be empty"));
        }
        let matches: Vec<Uuid> = self
            .read()?
            .iter()
            .map(|o| o.id)
            .filter(|id| id.to_string().starts_with(&prefix))
            .collect();
        match matches.as_slice() {
            [id] => Ok(*id),
            [] => Err(Error::not_found(format!("orphan '{}'", input))),
            _ => Err(Error::validation(format!("orphan id '{}' is ambiguous", input))),
        }
    }

    pub fn add(&self, name: &str, description: &str, priority: Option<&str>) -> Result<Orphan> {
        let orphan = Orphan {
            id: Uuid::new_v4(),
            name: self.check_name(name)?,
            description: check_description(description)?,
            priority: match priority {
                Some(p) => self.resolve_priority(p)?,
                None => self.config.orphan_default_priority,
            },
        };
        let mut orphans = self.read()?;
        orphans.push(orphan.clone());
        self.write(&orphans)?;
        tracing::info!(id = %orphan.id, name = %orphan.name, "added orphan");
        Ok(orphan)
    }

    pub fn remove(&self, id: Uuid) -> Result<Orphan> {
        let mut orphans = self.read()?;
        let pos = orphans
            .iter()
            .position(|o| o.id == id)
            .ok_or_else(|| Error::not_found(format!("orphan {}", id)))?;
        let removed = orphans.remove(pos);
        self.write(&orphans)?;
        tracing::info!(id = %id, "removed orphan");
        Ok(removed)
    }

    pub fn update(&self, id: Uuid, changes: &OrphanUpdate) -> Result<Orphan> {
        if changes.name.is_none() && changes.description.is_none() && changes.priority.is_none() {
            return Err(Error::validation("nothing to update"));
        }
        let mut orphans = self.read()?;
        let orphan = orphans
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| Error::not_found(format!("orphan {}", id)))?;
        if let Some(name) = changes.name {
            orphan.name = self.check_name(name)?;
        }
        if let Some(description) = changes.description {
            orphan.description = check_description(description)?;
        }
        if let Some(priority) = changes.priority {
            orphan.priority = self.resolve_priority(priority)?;
        }
        let updated = orphan.clone();
        self.write(&orphans)?;
        Ok(updated)
    }

    fn check_name(&self, name: &str) -> Result<String> {
        let name = name.trim();
        let re = Regex::new(&self.config.orphan_name_regex).map_err(|e| {
            Error::validation(format!("invalid orphan_name_regex in config: {}", e))
        })?;
        if name.is_empty() || !re.is_match(name) {
            return Err(Error::validation(format!(
                "orphan name '{}' must match {}",
                name, self.config.orphan_name_regex
            )));
        }
        Ok(name.to_string())
    }

    fn resolve_priority(&self, input: &str) -> Result<i64> {
        let value = match Priority::parse(input) {
            Priority::Value(n) => n,
            Priority::Label(label) => *self
                .config
                .orphan_priority_labels
                .get(&label)
                .ok_or_else(|| {
                    let labels: Vec<&str> =
                        self.config.orphan_priority_labels.keys().map(String::as_str).collect();
                    Error::validation(format!(
                        "unknown priority '{}'; use a number or one of: {}",
                        label,
                        labels.join(", ")
                    ))
                })?,
        };
        let (min, max) = (self.config.orphan_priority_min, self.config.orphan_priority_max);
        if value < min || value > max {
            return Err(Error::validation(format!(
                "priority {} out of range {}..={}",
                value, min, max
            )));
        }
        Ok(value)
    }
}

fn check_description(description: &str) -> Result<String> {
    let description = description.trim();
    if description.is_empty() {
        return Err(Error::validation("orphan description must not be empty"));
    }
    Ok(description.to_string())
}
