//! Symbol data model and import resolution

pub mod models;
pub mod select;

pub use models::{ImportItem, ImportSpec, ResolvedSymbol, SymbolDescriptor, SymbolType};
pub use select::select_symbols;
