//! Persisted walkthrough progress.
//!
//! One [`ScriptProgress`] record per script, keyed by script id. The engine
//! owns the in-memory list; stores only load and save it. Persistence is
//! synchronous and best-effort: the engine logs store failures and keeps
//! the in-memory list authoritative for the session.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Resume bookmark for one script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptProgress {
    pub script_id: String,
    /// Next step index to run. Monotonically non-decreasing within a run;
    /// only ever written when a step completes, so an abandoned step is
    /// not remembered.
    pub current_step: usize,
    pub completed: bool,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub skipped_steps: Vec<String>,
}

impl ScriptProgress {
    /// Fresh record for a script that was just started.
    pub fn started(script_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            script_id: script_id.into(),
            current_step: 0,
            completed: false,
            started_at,
            completed_at: None,
            skipped_steps: Vec::new(),
        }
    }
}

/// Load/save contract for progress records.
pub trait ProgressStore: Send + Sync {
    /// Read all records. An absent backing store yields an empty list.
    fn load(&self) -> Result<Vec<ScriptProgress>>;

    /// Replace the stored records with `records`.
    fn save(&self, records: &[ScriptProgress]) -> Result<()>;
}

/// Store backed by a pretty-printed JSON file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store records at `path`. Parent directories are created on save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProgressStore for JsonFileStore {
    fn load(&self) -> Result<Vec<ScriptProgress>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path).context("Failed to read progress file")?;
        serde_json::from_str(&contents).context("Failed to parse progress file")
    }

    fn save(&self, records: &[ScriptProgress]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create progress directory")?;
        }
        let contents = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, contents).context("Failed to write progress file")?;
        Ok(())
    }
}

/// Volatile store for tests and embeddings that opt out of persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<ScriptProgress>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressStore for MemoryStore {
    fn load(&self) -> Result<Vec<ScriptProgress>> {
        Ok(self.records.lock().expect("progress store poisoned").clone())
    }

    fn save(&self, records: &[ScriptProgress]) -> Result<()> {
        *self.records.lock().expect("progress store poisoned") = records.to_vec();
        Ok(())
    }
}
