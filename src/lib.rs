pub mod analysis;
pub mod config;
pub mod document;
pub mod error;
pub mod events;
pub mod module_info;
pub mod symbols;

pub use analysis::{AnalysisClient, ErrorReporter, SnapshotClient, TracingReporter};
pub use config::CacheConfig;
pub use document::{Document, DocumentId, VirtualDocument};
pub use error::{AnalysisError, Error, Result};
pub use events::{Callback, Emitter, Subscription};
pub use module_info::{ModuleInfo, ModuleInfoRegistry};
pub use symbols::{
    select_symbols, ImportItem, ImportSpec, ResolvedSymbol, SymbolDescriptor, SymbolType,
};
