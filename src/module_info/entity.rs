//! Cached exports of a single module
//!
//! A [`ModuleInfo`] fetches its symbols from the analysis client as soon as
//! it is built, refetches whenever a tracked document of the same module is
//! saved, and destroys itself once nobody has looked it up for a full TTL or
//! the client goes away.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::analysis::{AnalysisClient, ErrorReporter};
use crate::config::CacheConfig;
use crate::document::{Document, DocumentId};
use crate::error::AnalysisError;
use crate::events::{lock, Callback, Emitter, Subscription};
use crate::symbols::{select_symbols, ImportSpec, ResolvedSymbol, SymbolDescriptor, SymbolType};

use super::ttl::{deadline_after, spawn_expiry, Expiring};

type RefreshOutcome = Result<(), AnalysisError>;

/// Subscriptions held for one tracked document; dropping them unsubscribes.
struct TrackedDocument {
    _on_save: Subscription,
    _on_destroy: Subscription,
}

struct State {
    symbols: Arc<[SymbolDescriptor]>,
    documents: HashMap<DocumentId, TrackedDocument>,
    deadline: Instant,
    client_subscription: Option<Subscription>,
    destroyed: bool,
}

pub struct ModuleInfo<C: AnalysisClient> {
    name: String,
    client: Arc<C>,
    root_dir: PathBuf,
    ttl: Duration,
    reporter: Arc<dyn ErrorReporter>,
    runtime: Handle,
    state: Mutex<State>,
    destroyed: Emitter,
    initial_refresh: watch::Receiver<Option<RefreshOutcome>>,
    expiry: CancellationToken,
}

impl<C: AnalysisClient> ModuleInfo<C> {
    /// Creates the entry and starts its first refresh in the background.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new(
        name: impl Into<String>,
        client: Arc<C>,
        root_dir: impl Into<PathBuf>,
        config: &CacheConfig,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Arc<Self> {
        let ttl = config.ttl();
        let (initial_tx, initial_rx) = watch::channel(None);

        let module = Arc::new(Self {
            name: name.into(),
            client,
            root_dir: root_dir.into(),
            ttl,
            reporter,
            runtime: Handle::current(),
            state: Mutex::new(State {
                symbols: Arc::from(Vec::new()),
                documents: HashMap::new(),
                deadline: deadline_after(ttl),
                client_subscription: None,
                destroyed: false,
            }),
            destroyed: Emitter::new(),
            initial_refresh: initial_rx,
            expiry: CancellationToken::new(),
        });
        tracing::debug!(module = %module.name, "Module created");

        let weak = Arc::downgrade(&module);
        let subscription = module.client.on_destroyed(Arc::new(move || {
            if let Some(module) = weak.upgrade() {
                module.destroy();
            }
        }));
        let rejected = {
            let mut state = lock(&module.state);
            if state.destroyed {
                Some(subscription)
            } else {
                state.client_subscription = Some(subscription);
                None
            }
        };
        drop(rejected);

        spawn_expiry(&module.runtime, Arc::downgrade(&module), module.expiry.clone());

        let refresh = module.refresh();
        let name = module.name.clone();
        module.runtime.spawn(async move {
            let outcome = refresh.await;
            if let Err(error) = &outcome {
                tracing::warn!(module = %name, error = %error, "Initial module refresh failed");
            }
            let _ = initial_tx.send(Some(outcome));
        });

        module
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current export snapshot; empty until the first refresh lands.
    pub fn symbols(&self) -> Arc<[SymbolDescriptor]> {
        Arc::clone(&lock(&self.state).symbols)
    }

    pub fn tracked_documents(&self) -> usize {
        lock(&self.state).documents.len()
    }

    pub fn is_tracking(&self, id: DocumentId) -> bool {
        lock(&self.state).documents.contains_key(&id)
    }

    pub fn is_destroyed(&self) -> bool {
        lock(&self.state).destroyed
    }

    /// Instant at which the entry expires unless looked up again.
    pub fn deadline(&self) -> Instant {
        lock(&self.state).deadline
    }

    /// Waits for the first refresh to settle and returns its outcome.
    ///
    /// Every caller sees the same outcome, however late it asks.
    pub async fn initial_refresh(&self) -> Result<(), AnalysisError> {
        let mut receiver = self.initial_refresh.clone();
        let settled = match receiver.wait_for(Option::is_some).await {
            Ok(outcome) => (*outcome).clone(),
            Err(_) => None,
        };
        settled.unwrap_or_else(|| {
            Err(AnalysisError::Unavailable(format!(
                "initial refresh of {} was abandoned",
                self.name
            )))
        })
    }

    /// Registers an observer for destruction. Observers added after the
    /// entry is destroyed are never called.
    pub fn on_destroyed(&self, callback: Callback) -> Subscription {
        // Checked and subscribed under the state lock so `destroy` cannot
        // emit in between. The emitter has its own lock and never calls out.
        let state = lock(&self.state);
        if state.destroyed {
            return Subscription::empty();
        }
        self.destroyed.subscribe(callback)
    }

    /// Tears the entry down: stops the expiry timer, drops every document
    /// and client subscription, then notifies observers. Later calls do nothing.
    ///
    /// Refreshes already in flight are left to finish; their results are discarded.
    pub fn destroy(&self) {
        let (documents, client_subscription) = {
            let mut state = lock(&self.state);
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            state.symbols = Arc::from(Vec::new());
            (
                std::mem::take(&mut state.documents),
                state.client_subscription.take(),
            )
        };
        tracing::debug!(module = %self.name, "Module destroyed");

        self.expiry.cancel();
        drop(documents);
        drop(client_subscription);

        self.destroyed.emit();
        self.destroyed.clear();
    }

    /// Starts tracking `document` if it declares this module.
    ///
    /// Saving a tracked document refreshes the entry; destroying it stops the
    /// tracking. Documents of other modules, documents already tracked, and
    /// calls on a destroyed entry are ignored. Returns whether the document
    /// became tracked. Does not extend the TTL.
    pub async fn attach_document<D: Document>(self: &Arc<Self>, document: Arc<D>) -> bool {
        if self.is_destroyed() {
            return false;
        }

        let module_name = document.module_name().await;
        if module_name != self.name {
            return false;
        }

        let id = document.id();
        if self.is_destroyed() || lock(&self.state).documents.contains_key(&id) {
            return false;
        }

        // Documents may call back from inside `on_save`/`on_destroy`, so the
        // subscriptions are made without the state lock held.
        let closed = Arc::new(AtomicBool::new(false));
        let weak = Arc::downgrade(self);
        let on_destroy = document.on_destroy(Arc::new({
            let closed = Arc::clone(&closed);
            move || {
                closed.store(true, Ordering::SeqCst);
                if let Some(module) = weak.upgrade() {
                    module.detach_document(id);
                }
            }
        }));

        let weak = Arc::downgrade(self);
        let on_save = document.on_save(Arc::new(move || {
            if let Some(module) = weak.upgrade() {
                tracing::debug!(module = %module.name, "Tracked document saved");
                module.spawn_background_refresh();
            }
        }));

        let tracked = TrackedDocument {
            _on_save: on_save,
            _on_destroy: on_destroy,
        };
        {
            let mut state = lock(&self.state);
            if state.destroyed
                || state.documents.contains_key(&id)
                || closed.load(Ordering::SeqCst)
            {
                drop(state);
                drop(tracked);
                return false;
            }
            state.documents.insert(id, tracked);
        }
        tracing::debug!(module = %self.name, document = id.as_u64(), "Document attached");
        true
    }

    /// Resolves `import` against the cached exports and extends the TTL.
    ///
    /// See [`select_symbols`] for the filtering rules. A destroyed entry
    /// resolves to nothing.
    pub fn select(
        &self,
        import: &Arc<ImportSpec>,
        symbol_types: Option<&[SymbolType]>,
        skip_qualified: bool,
    ) -> Vec<ResolvedSymbol> {
        let symbols = {
            let mut state = lock(&self.state);
            if state.destroyed {
                return Vec::new();
            }
            state.deadline = deadline_after(self.ttl);
            Arc::clone(&state.symbols)
        };
        select_symbols(&symbols, import, symbol_types, skip_qualified)
    }

    fn detach_document(&self, id: DocumentId) {
        let removed = lock(&self.state).documents.remove(&id);
        if removed.is_some() {
            tracing::debug!(module = %self.name, document = id.as_u64(), "Document detached");
        }
    }

    /// Refresh with no caller to hand a failure to; failures go to the reporter.
    fn spawn_background_refresh(self: &Arc<Self>) {
        if self.is_destroyed() {
            return;
        }
        let refresh = self.refresh();
        let reporter = Arc::clone(&self.reporter);
        let name = self.name.clone();
        self.runtime.spawn(async move {
            if let Err(error) = refresh.await {
                reporter.report(&name, &error);
            }
        });
    }

    /// Browses the module and swaps in the result. Only holds a weak
    /// reference while the client works, so a dropped or destroyed entry
    /// is never written to.
    fn refresh(self: &Arc<Self>) -> impl Future<Output = RefreshOutcome> + Send + 'static {
        let weak = Arc::downgrade(self);
        let client = Arc::clone(&self.client);
        let root_dir = self.root_dir.clone();
        let name = self.name.clone();

        async move {
            tracing::debug!(module = %name, "Module updating");
            let symbols = client
                .run_browse(&root_dir, std::slice::from_ref(&name))
                .await?;

            match weak.upgrade() {
                Some(module) => module.replace_symbols(symbols),
                None => tracing::debug!(module = %name, "Module dropped before update landed"),
            }
            Ok(())
        }
    }

    fn replace_symbols(&self, symbols: Vec<SymbolDescriptor>) {
        let mut state = lock(&self.state);
        if state.destroyed {
            tracing::debug!(module = %self.name, "Discarding update for destroyed module");
            return;
        }
        let count = symbols.len();
        state.symbols = Arc::from(symbols);
        tracing::debug!(module = %self.name, symbols = count, "Module updated");
    }
}

impl<C: AnalysisClient> Expiring for ModuleInfo<C> {
    fn deadline(&self) -> Instant {
        ModuleInfo::deadline(self)
    }

    fn expire(&self) {
        tracing::debug!(module = %self.name, "Module idle for {:?}", self.ttl);
        self.destroy();
    }
}

impl<C: AnalysisClient> std::fmt::Debug for ModuleInfo<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("ModuleInfo")
            .field("name", &self.name)
            .field("symbols", &state.symbols.len())
            .field("documents", &state.documents.len())
            .field("destroyed", &state.destroyed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{SnapshotClient, TracingReporter};
    use crate::symbols::SymbolType;

    fn client() -> Arc<SnapshotClient> {
        let client = SnapshotClient::new();
        client.insert(
            "Data.Char",
            vec![
                SymbolDescriptor::new("isDigit", SymbolType::Value),
                SymbolDescriptor::new("ord", SymbolType::Value),
            ],
        );
        Arc::new(client)
    }

    fn module(client: &Arc<SnapshotClient>, name: &str) -> Arc<ModuleInfo<SnapshotClient>> {
        ModuleInfo::new(
            name,
            Arc::clone(client),
            "/project",
            &CacheConfig::default(),
            Arc::new(TracingReporter),
        )
    }

    #[tokio::test]
    async fn test_initial_refresh_fills_symbols() {
        let client = client();
        let info = module(&client, "Data.Char");
        assert_eq!(info.name(), "Data.Char");
        assert_eq!(info.root_dir(), Path::new("/project"));

        info.initial_refresh().await.unwrap();
        let names: Vec<_> = info.symbols().iter().map(|s| s.name.clone()).collect();
        assert_eq!(names, vec!["isDigit", "ord"]);
    }

    #[tokio::test]
    async fn test_initial_refresh_outcome_is_shared() {
        let client = client();
        let info = module(&client, "Missing");

        let first = info.initial_refresh().await.unwrap_err();
        let second = info.initial_refresh().await.unwrap_err();
        assert_eq!(first, AnalysisError::ModuleNotFound("Missing".to_string()));
        assert_eq!(first, second);
        assert!(info.symbols().is_empty());
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent() {
        let client = client();
        let info = module(&client, "Data.Char");
        info.initial_refresh().await.unwrap();

        info.destroy();
        info.destroy();
        assert!(info.is_destroyed());
        assert!(info.symbols().is_empty());
    }

    #[tokio::test]
    async fn test_select_extends_deadline() {
        let client = client();
        let info = module(&client, "Data.Char");
        let before = info.deadline();

        tokio::time::sleep(Duration::from_millis(5)).await;
        info.select(&Arc::new(ImportSpec::new("Data.Char")), None, false);
        assert!(info.deadline() > before);
    }

    #[tokio::test]
    async fn test_late_observer_is_not_registered() {
        let client = client();
        let info = module(&client, "Data.Char");
        info.destroy();

        let _sub = info.on_destroyed(Arc::new(|| panic!("observer called after destroy")));
        info.destroy();
    }
}
