use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{AnalysisError, Result};
use crate::events::{lock, Callback, Emitter, Subscription};
use crate::symbols::SymbolDescriptor;

use super::AnalysisClient;

/// Browse results keyed by module name, as stored in a snapshot file.
pub type Snapshot = BTreeMap<String, Vec<SymbolDescriptor>>;

type Entry = std::result::Result<Vec<SymbolDescriptor>, AnalysisError>;

/// Analysis client serving browse results from an in-memory table.
///
/// The table is usually loaded from a JSON snapshot of earlier browse output
/// and can be edited afterwards, so later refreshes observe new exports.
/// Modules can also be scripted to fail.
#[derive(Debug, Default)]
pub struct SnapshotClient {
    modules: Mutex<BTreeMap<String, Entry>>,
    latency: Option<Duration>,
    browse_calls: AtomicUsize,
    destroyed: Emitter,
}

impl SnapshotClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let client = Self::new();
        {
            let mut modules = lock(&client.modules);
            for (name, symbols) in snapshot {
                modules.insert(name, Ok(symbols));
            }
        }
        client
    }

    /// Parses a snapshot: a JSON object mapping module names to symbol arrays.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(content)?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Delays every browse by `latency`, like a slow analysis process.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Replaces the exports reported for `module`.
    pub fn insert(&self, module: impl Into<String>, symbols: Vec<SymbolDescriptor>) {
        lock(&self.modules).insert(module.into(), Ok(symbols));
    }

    /// Makes every later browse of `module` fail with `error`.
    pub fn fail(&self, module: impl Into<String>, error: AnalysisError) {
        lock(&self.modules).insert(module.into(), Err(error));
    }

    pub fn module_names(&self) -> Vec<String> {
        lock(&self.modules).keys().cloned().collect()
    }

    /// Number of browse requests received so far.
    pub fn browse_calls(&self) -> usize {
        self.browse_calls.load(Ordering::SeqCst)
    }

    /// Tears the connection down, notifying every `on_destroyed` observer.
    pub fn destroy(&self) {
        tracing::debug!("Snapshot client destroyed");
        self.destroyed.emit();
        self.destroyed.clear();
    }

    fn lookup(&self, modules: &[String]) -> Entry {
        let table = lock(&self.modules);
        let mut symbols = Vec::new();
        for module in modules {
            match table.get(module) {
                Some(Ok(exports)) => symbols.extend(exports.iter().cloned()),
                Some(Err(error)) => return Err(error.clone()),
                None => return Err(AnalysisError::ModuleNotFound(module.clone())),
            }
        }
        Ok(symbols)
    }
}

impl AnalysisClient for SnapshotClient {
    async fn run_browse(
        &self,
        _root_dir: &Path,
        modules: &[String],
    ) -> std::result::Result<Vec<SymbolDescriptor>, AnalysisError> {
        self.browse_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.lookup(modules)
    }

    fn on_destroyed(&self, callback: Callback) -> Subscription {
        self.destroyed.subscribe(callback)
    }
}
