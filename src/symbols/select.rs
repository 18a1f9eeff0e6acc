//! Import-driven symbol selection
//!
//! Resolves an [`ImportSpec`] against a module's exported symbols into the
//! names the importing document can see, qualified and unqualified.

use std::sync::Arc;

use super::models::{ImportSpec, ResolvedSymbol, SymbolDescriptor, SymbolType};

/// Resolves `import` against `symbols`.
///
/// Each symbol that survives the import list and the optional kind filter
/// yields up to two records: a qualified one unless `skip_qualified`, and an
/// unqualified one unless the import is `qualified`. Output keeps the order
/// of `symbols`.
pub fn select_symbols(
    symbols: &[SymbolDescriptor],
    import: &Arc<ImportSpec>,
    symbol_types: Option<&[SymbolType]>,
    skip_qualified: bool,
) -> Vec<ResolvedSymbol> {
    let mut resolved = Vec::new();

    for symbol in symbols {
        if !import.exposes(symbol) {
            continue;
        }
        if let Some(types) = symbol_types {
            if !types.contains(&symbol.symbol_type) {
                continue;
            }
        }

        if !skip_qualified {
            resolved.push(ResolvedSymbol {
                name: symbol.name.clone(),
                type_signature: symbol.type_signature.clone(),
                symbol_type: symbol.symbol_type,
                qname: import.qualify(&symbol.name),
                qparent: symbol.parent.as_deref().map(|p| import.qualify(p)),
                import: Arc::clone(import),
            });
        }

        if !import.qualified {
            resolved.push(ResolvedSymbol {
                name: symbol.name.clone(),
                type_signature: symbol.type_signature.clone(),
                symbol_type: symbol.symbol_type,
                qname: symbol.name.clone(),
                qparent: symbol.parent.clone(),
                import: Arc::clone(import),
            });
        }
    }

    resolved
}
