//! Analysis process boundary
//!
//! The cache never talks to the analysis process directly. It goes through
//! [`AnalysisClient`], and failures nobody awaits go to an [`ErrorReporter`].

pub mod snapshot;

use std::future::Future;
use std::path::Path;

use crate::error::AnalysisError;
use crate::events::{Callback, Subscription};
use crate::symbols::SymbolDescriptor;

pub use snapshot::SnapshotClient;

/// Connection to an external analysis process that can list a module's exports.
pub trait AnalysisClient: Send + Sync + 'static {
    /// Lists the exported symbols of `modules`, in the order the process reports them.
    ///
    /// Timeouts, crashes and unparsable output all surface as [`AnalysisError`].
    fn run_browse(
        &self,
        root_dir: &Path,
        modules: &[String],
    ) -> impl Future<Output = Result<Vec<SymbolDescriptor>, AnalysisError>> + Send;

    /// Registers a callback fired when the connection is torn down.
    fn on_destroyed(&self, callback: Callback) -> Subscription;
}

/// Sink for refresh failures that have no caller to return to.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, module: &str, error: &AnalysisError);
}

/// Logs background failures through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, module: &str, error: &AnalysisError) {
        tracing::error!(module = %module, error = %error, "Background module refresh failed");
    }
}
