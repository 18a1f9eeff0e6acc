//! Module Registry
//!
//! Hands out one live [`ModuleInfo`] per module name and forgets entries
//! once they are destroyed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::analysis::{AnalysisClient, ErrorReporter, TracingReporter};
use crate::config::CacheConfig;
use crate::error::AnalysisError;
use crate::events::{lock, Subscription};

use super::entity::ModuleInfo;

struct RegistryEntry<C: AnalysisClient> {
    module: Arc<ModuleInfo<C>>,
    _on_destroyed: Subscription,
}

type Entries<C> = Arc<Mutex<HashMap<String, RegistryEntry<C>>>>;

/// Registry of module entries sharing one analysis client
pub struct ModuleInfoRegistry<C: AnalysisClient> {
    client: Arc<C>,
    root_dir: PathBuf,
    config: CacheConfig,
    reporter: Arc<dyn ErrorReporter>,
    modules: Entries<C>,
}

impl<C: AnalysisClient> ModuleInfoRegistry<C> {
    pub fn new(client: Arc<C>, root_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            root_dir: root_dir.into(),
            config: CacheConfig::default(),
            reporter: Arc::new(TracingReporter),
            modules: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the live entry for `name`, creating it if needed.
    ///
    /// A new entry starts refreshing immediately; use [`Self::get_ready`] to
    /// wait for the first refresh. An entry that is already destroyed is
    /// replaced. If the client is gone the new entry is born destroyed and
    /// is handed out without being kept.
    pub fn get(&self, name: &str) -> Arc<ModuleInfo<C>> {
        let mut modules = lock(&self.modules);
        let stale = match modules.get(name) {
            Some(entry) if !entry.module.is_destroyed() => return Arc::clone(&entry.module),
            Some(_) => modules.remove(name),
            None => None,
        };

        let module = ModuleInfo::new(
            name,
            Arc::clone(&self.client),
            self.root_dir.clone(),
            &self.config,
            Arc::clone(&self.reporter),
        );
        let on_destroyed = Self::forget_on_destroy(&self.modules, &module);
        if module.is_destroyed() {
            tracing::debug!(module = %name, "Module destroyed while being created, not caching it");
        } else {
            modules.insert(
                name.to_string(),
                RegistryEntry {
                    module: Arc::clone(&module),
                    _on_destroyed: on_destroyed,
                },
            );
        }
        drop(modules);
        drop(stale);
        module
    }

    /// Like [`Self::get`], then waits for the entry's first refresh.
    pub async fn get_ready(&self, name: &str) -> Result<Arc<ModuleInfo<C>>, AnalysisError> {
        let module = self.get(name);
        module.initial_refresh().await?;
        Ok(module)
    }

    pub fn contains(&self, name: &str) -> bool {
        lock(&self.modules).contains_key(name)
    }

    pub fn len(&self) -> usize {
        lock(&self.modules).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.modules).is_empty()
    }

    /// Names of the live entries, sorted
    pub fn module_names(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.modules).keys().cloned().collect();
        names.sort();
        names
    }

    /// Destroys every live entry
    pub fn destroy_all(&self) {
        let entries: Vec<RegistryEntry<C>> = lock(&self.modules).drain().map(|(_, e)| e).collect();
        tracing::debug!(count = entries.len(), "Destroying all modules");
        for entry in &entries {
            entry.module.destroy();
        }
    }

    /// Removes the entry for `module` once it reports destruction. A newer
    /// entry registered under the same name is left alone.
    fn forget_on_destroy(modules: &Entries<C>, module: &Arc<ModuleInfo<C>>) -> Subscription {
        let modules = Arc::downgrade(modules);
        let target = Arc::downgrade(module);
        let name = module.name().to_string();

        module.on_destroyed(Arc::new(move || {
            let Some(modules) = modules.upgrade() else {
                return;
            };
            let removed = {
                let mut modules = lock(&modules);
                let current = modules
                    .get(&name)
                    .is_some_and(|entry| std::ptr::eq(Arc::as_ptr(&entry.module), target.as_ptr()));
                if current {
                    modules.remove(&name)
                } else {
                    None
                }
            };
            if removed.is_some() {
                tracing::debug!(module = %name, "Module removed from registry");
            }
        }))
    }
}

impl<C: AnalysisClient> Drop for ModuleInfoRegistry<C> {
    fn drop(&mut self) {
        self.destroy_all();
    }
}

impl<C: AnalysisClient> std::fmt::Debug for ModuleInfoRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleInfoRegistry")
            .field("root_dir", &self.root_dir)
            .field("modules", &self.module_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SnapshotClient;
    use crate::symbols::{SymbolDescriptor, SymbolType};

    fn registry() -> ModuleInfoRegistry<SnapshotClient> {
        let client = SnapshotClient::new();
        client.insert("Data.List", vec![SymbolDescriptor::new("sortOn", SymbolType::Value)]);
        client.insert("Data.Ord", vec![SymbolDescriptor::new("comparing", SymbolType::Value)]);
        ModuleInfoRegistry::new(Arc::new(client), "/project")
    }

    #[tokio::test]
    async fn test_get_reuses_entry() {
        let registry = registry();
        let first = registry.get("Data.List");
        let second = registry.get("Data.List");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_get_ready_waits_for_symbols() {
        let registry = registry();
        let module = registry.get_ready("Data.Ord").await.unwrap();
        assert_eq!(module.symbols().len(), 1);
        assert_eq!(registry.module_names(), vec!["Data.Ord"]);
    }

    #[tokio::test]
    async fn test_get_ready_propagates_failure() {
        let registry = registry();
        let err = registry.get_ready("Data.Missing").await.unwrap_err();
        assert!(matches!(err, AnalysisError::ModuleNotFound(_)));
        // The failed entry stays cached until it expires or is destroyed.
        assert!(registry.contains("Data.Missing"));
    }

    #[tokio::test]
    async fn test_destroyed_entry_is_forgotten() {
        let registry = registry();
        let module = registry.get("Data.List");
        module.destroy();

        assert!(!registry.contains("Data.List"));
        assert!(registry.is_empty());

        let fresh = registry.get("Data.List");
        assert!(!Arc::ptr_eq(&module, &fresh));
        assert!(!fresh.is_destroyed());
    }

    #[tokio::test]
    async fn test_destroy_all() {
        let registry = registry();
        let list = registry.get("Data.List");
        let ord = registry.get("Data.Ord");

        registry.destroy_all();
        assert!(registry.is_empty());
        assert!(list.is_destroyed());
        assert!(ord.is_destroyed());
    }
}
