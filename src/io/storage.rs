use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::model::config::Config;
use crate::model::files::{
    ArchivedExecFile, ArchivedStrategicFile, CursorFile, ExecutionFile, OrphansFile, StrategicFile,
};

/// Prefix of the temp files written next to their targets
pub const TMP_PREFIX: &str = ".tmp_";

/// Error type for file persistence
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: io::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: io::Error,
    },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("could not serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Atomic file write
// ---------------------------------------------------------------------------

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    atomic_write_with(path, |w| w.write_all(content))
}

/// Stream into a temp file in the target's directory, then rename it over
/// `path`. If `fill` or the rename fails the temp file is dropped (which
/// deletes it) and `path` keeps its previous content.
pub fn atomic_write_with<F>(path: &Path, fill: F) -> io::Result<()>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(TMP_PREFIX)
        .suffix(".json")
        .tempfile_in(dir)?;
    fill(tmp.as_file_mut())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Typed load/save per file
// ---------------------------------------------------------------------------

/// Handle on a `.prism/` directory.
///
/// Every `load_*` returns the file's default when it does not exist; every
/// `save_*` goes through [`atomic_write`].
#[derive(Debug, Clone)]
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Storage { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.dir.join("archive")
    }

    /// Create `.prism/` and `.prism/archive/` if missing
    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        let archive = self.archive_dir();
        fs::create_dir_all(&archive).map_err(|source| StorageError::Write {
            path: archive,
            source,
        })
    }

    fn load<T: DeserializeOwned + Default>(&self, path: PathBuf) -> Result<T, StorageError> {
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "file missing, using default");
                return Ok(T::default());
            }
            Err(source) => return Err(StorageError::Read { path, source }),
        };
        tracing::debug!(path = %path.display(), "loaded");
        serde_json::from_str(&text).map_err(|source| StorageError::Parse { path, source })
    }

    fn save<T: Serialize>(&self, path: PathBuf, value: &T) -> Result<(), StorageError> {
        let bytes = match serde_json::to_vec_pretty(value) {
            Ok(bytes) => bytes,
            Err(source) => return Err(StorageError::Serialize { path, source }),
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StorageError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        atomic_write(&path, &bytes).map_err(|source| StorageError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "saved");
        Ok(())
    }

    pub fn load_strategic(&self) -> Result<StrategicFile, StorageError> {
        self.load(self.dir.join("strategic.json"))
    }

    pub fn save_strategic(&self, data: &StrategicFile) -> Result<(), StorageError> {
        self.save(self.dir.join("strategic.json"), data)
    }

    pub fn load_execution(&self) -> Result<ExecutionFile, StorageError> {
        self.load(self.dir.join("execution.json"))
    }

    pub fn save_execution(&self, data: &ExecutionFile) -> Result<(), StorageError> {
        self.save(self.dir.join("execution.json"), data)
    }

    pub fn load_config(&self) -> Result<Config, StorageError> {
        self.load(self.dir.join("config.json"))
    }

    pub fn save_config(&self, data: &Config) -> Result<(), StorageError> {
        self.save(self.dir.join("config.json"), data)
    }

    pub fn load_orphans(&self) -> Result<OrphansFile, StorageError> {
        self.load(self.dir.join("orphans.json"))
    }

    pub fn save_orphans(&self, data: &OrphansFile) -> Result<(), StorageError> {
        self.save(self.dir.join("orphans.json"), data)
    }

    pub fn load_cursor(&self) -> Result<CursorFile, StorageError> {
        self.load(self.dir.join("cursor.json"))
    }

    pub fn save_cursor(&self, data: &CursorFile) -> Result<(), StorageError> {
        self.save(self.dir.join("cursor.json"), data)
    }

    pub fn load_archived_strategic(&self) -> Result<ArchivedStrategicFile, StorageError> {
        self.load(self.archive_dir().join("strategic.json"))
    }

    pub fn save_archived_strategic(&self, data: &ArchivedStrategicFile) -> Result<(), StorageError> {
        self.save(self.archive_dir().join("strategic.json"), data)
    }

    pub fn archived_exec_path(&self, objective_id: Uuid) -> PathBuf {
        self.archive_dir().join(format!("{}.exec.json", objective_id))
    }

    /// Load one objective's archived execution tree, `None` if never archived
    pub fn load_archived_exec(
        &self,
        objective_id: Uuid,
    ) -> Result<Option<ArchivedExecFile>, StorageError> {
        let path = self.archived_exec_path(objective_id);
        if !path.exists() {
            return Ok(None);
        }
        self.load(path).map(Some)
    }

    pub fn save_archived_exec(
        &self,
        objective_id: Uuid,
        data: &ArchivedExecFile,
    ) -> Result<(), StorageError> {
        self.save(self.archived_exec_path(objective_id), data)
    }
}
