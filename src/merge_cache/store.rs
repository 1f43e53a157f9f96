//! Durable storage for merge decisions.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::MergeOperation;
use crate::atomic_file::write_atomic;
use crate::error::{VaultError, VaultResult};

/// Storage backend for the merge-decision cache.
///
/// `save` receives the complete decision list every time and must replace the
/// stored list atomically: after a crash the store holds either the previous
/// list or the new one.
pub trait CacheStore {
    /// Load the stored decisions. `Ok(None)` means nothing has been stored yet.
    fn load(&self) -> VaultResult<Option<Vec<MergeOperation>>>;

    /// Replace the stored decisions.
    fn save(&mut self, operations: &[MergeOperation]) -> VaultResult<()>;
}

/// JSON file store: a flat, pretty-printed array of merge operations.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheStore for FileStore {
    fn load(&self) -> VaultResult<Option<Vec<MergeOperation>>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let operations: Vec<MergeOperation> = serde_json::from_str(&text)?;
        Ok(Some(operations))
    }

    fn save(&mut self, operations: &[MergeOperation]) -> VaultResult<()> {
        let json = serde_json::to_string_pretty(operations)?;
        write_atomic(&self.path, json.as_bytes())?;
        Ok(())
    }
}

/// In-memory store for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    operations: Option<Vec<MergeOperation>>,
    /// Number of successful `save` calls
    pub save_count: u64,
    /// When true, `save` fails
    pub fail_on_save: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `operations`.
    pub fn with_operations(operations: Vec<MergeOperation>) -> Self {
        Self {
            operations: Some(operations),
            ..Self::default()
        }
    }

    /// The last saved list.
    pub fn operations(&self) -> &[MergeOperation] {
        self.operations.as_deref().unwrap_or(&[])
    }
}

impl CacheStore for MemoryStore {
    fn load(&self) -> VaultResult<Option<Vec<MergeOperation>>> {
        Ok(self.operations.clone())
    }

    fn save(&mut self, operations: &[MergeOperation]) -> VaultResult<()> {
        if self.fail_on_save {
            return Err(VaultError::General("simulated cache save failure".to_string()));
        }
        self.save_count += 1;
        self.operations = Some(operations.to_vec());
        Ok(())
    }
}
