//! Editor document abstraction
//!
//! A module entry only needs three things from a document: which module it
//! declares, when it is saved, and when it goes away.

pub mod overlay;

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::events::{Callback, Subscription};

pub use overlay::VirtualDocument;

/// Identity of an open document, stable for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

impl DocumentId {
    /// Allocates an identity no other document in this process has.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        DocumentId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for DocumentId {
    fn from(id: u64) -> Self {
        DocumentId(id)
    }
}

pub trait Document: Send + Sync + 'static {
    fn id(&self) -> DocumentId;

    /// Name of the module this document declares. May need parsing.
    fn module_name(&self) -> impl Future<Output = String> + Send;

    fn on_save(&self, callback: Callback) -> Subscription;

    fn on_destroy(&self, callback: Callback) -> Subscription;
}

/// Reads the module name from a source header (`module Data.Map (...) where`).
///
/// Leading blank lines, line comments and pragmas are skipped. Sources
/// without a header belong to `Main`.
pub fn parse_module_name(source: &str) -> String {
    for line in source.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("--") || line.starts_with("{-") {
            continue;
        }
        if let Some(rest) = line.strip_prefix("module") {
            if !rest.starts_with(char::is_whitespace) {
                break;
            }
            let name: String = rest
                .trim_start()
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '.' || *c == '_' || *c == '\'')
                .collect();
            if !name.is_empty() {
                return name;
            }
        }
        break;
    }
    "Main".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_module_header() {
        assert_eq!(parse_module_name("module Data.Map where\n"), "Data.Map");
        assert_eq!(
            parse_module_name("module Data.Map(Map, lookup) where"),
            "Data.Map"
        );
    }

    #[test]
    fn test_parse_skips_pragmas_and_comments() {
        let source = "{-# LANGUAGE GADTs #-}\n-- | Docs\n\nmodule Foo.Bar\n  ( x\n  ) where\n";
        assert_eq!(parse_module_name(source), "Foo.Bar");
    }

    #[test]
    fn test_headerless_source_is_main() {
        assert_eq!(parse_module_name("main = pure ()\n"), "Main");
        assert_eq!(parse_module_name(""), "Main");
        assert_eq!(parse_module_name("moduleName = 1"), "Main");
    }

    #[test]
    fn test_document_ids_are_unique() {
        let a = DocumentId::next();
        let b = DocumentId::next();
        assert_ne!(a, b);
    }
}
