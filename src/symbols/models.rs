use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer};

/// Kind of an exported symbol as reported by the analysis process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolType {
    Value,
    Type,
    Class,
    Constructor,
    Field,
    Module,
    Operator,
}

impl SymbolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolType::Value => "value",
            SymbolType::Type => "type",
            SymbolType::Class => "class",
            SymbolType::Constructor => "constructor",
            SymbolType::Field => "field",
            SymbolType::Module => "module",
            SymbolType::Operator => "operator",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "value" => Some(SymbolType::Value),
            "type" => Some(SymbolType::Type),
            "class" => Some(SymbolType::Class),
            "constructor" | "ctor" => Some(SymbolType::Constructor),
            "field" => Some(SymbolType::Field),
            "module" => Some(SymbolType::Module),
            "operator" | "op" => Some(SymbolType::Operator),
            _ => None,
        }
    }
}

impl std::fmt::Display for SymbolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One exported symbol of a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolDescriptor {
    pub name: String,
    /// Owning type for constructors and fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub type_signature: String,
    pub symbol_type: SymbolType,
}

impl SymbolDescriptor {
    pub fn new(name: impl Into<String>, symbol_type: SymbolType) -> Self {
        Self {
            name: name.into(),
            parent: None,
            type_signature: String::new(),
            symbol_type,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.type_signature = signature.into();
        self
    }
}

/// Entry of an import list.
///
/// Deserializes from either a bare string (`"lookup"`) or a parent
/// reference (`{"parent": "Map"}`) standing for `Map(..)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImportItem {
    Name(String),
    Parent { parent: String },
}

impl ImportItem {
    pub fn name(name: impl Into<String>) -> Self {
        ImportItem::Name(name.into())
    }

    pub fn parent(parent: impl Into<String>) -> Self {
        ImportItem::Parent {
            parent: parent.into(),
        }
    }

    /// Whether this entry names `symbol` directly or covers it through its parent.
    pub fn covers(&self, symbol: &SymbolDescriptor) -> bool {
        match self {
            ImportItem::Name(name) => *name == symbol.name,
            ImportItem::Parent { parent } => symbol.parent.as_deref() == Some(parent.as_str()),
        }
    }
}

/// One import statement as written in a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSpec {
    #[serde(alias = "name")]
    pub module_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default)]
    pub qualified: bool,
    /// Only meaningful together with `import_list`
    #[serde(default)]
    pub hiding: bool,
    /// `None` imports everything
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_list: Option<Vec<ImportItem>>,
}

impl ImportSpec {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            alias: None,
            qualified: false,
            hiding: false,
            import_list: None,
        }
    }

    pub fn qualified(mut self) -> Self {
        self.qualified = true;
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// `import M (items)`
    pub fn showing(mut self, items: impl IntoIterator<Item = ImportItem>) -> Self {
        self.hiding = false;
        self.import_list = Some(items.into_iter().collect());
        self
    }

    /// `import M hiding (items)`
    pub fn hiding(mut self, items: impl IntoIterator<Item = ImportItem>) -> Self {
        self.hiding = true;
        self.import_list = Some(items.into_iter().collect());
        self
    }

    /// Prefix used for qualified names: the alias if present, else the module name.
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.module_name)
    }

    pub fn qualify(&self, name: &str) -> String {
        format!("{}.{}", self.qualifier(), name)
    }

    /// Whether the import list and hiding flag let `symbol` through.
    pub fn exposes(&self, symbol: &SymbolDescriptor) -> bool {
        match &self.import_list {
            None => true,
            Some(list) => {
                let listed = list.iter().any(|item| item.covers(symbol));
                self.hiding != listed
            }
        }
    }
}

/// A symbol as seen through one import, with its display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSymbol {
    pub name: String,
    pub type_signature: String,
    pub symbol_type: SymbolType,
    pub qname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qparent: Option<String>,
    #[serde(rename = "module", serialize_with = "serialize_module_name")]
    pub import: Arc<ImportSpec>,
}

impl ResolvedSymbol {
    pub fn is_qualified(&self) -> bool {
        self.qname != self.name
    }
}

fn serialize_module_name<S: Serializer>(
    import: &Arc<ImportSpec>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&import.module_name)
}
