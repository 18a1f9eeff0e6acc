use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use module_symbols::error::{Error, Result};
use module_symbols::{
    CacheConfig, ImportItem, ImportSpec, ModuleInfoRegistry, ResolvedSymbol, SnapshotClient,
    SymbolType,
};

#[derive(Parser)]
#[command(name = "module-symbols")]
#[command(about = "Inspect module exports and resolve imports against them")]
#[command(version)]
#[command(after_long_help = r#"
EXAMPLES:
    # Everything Data.Map exposes through `import qualified Data.Map as M`
    module-symbols select --snapshot browse.json Data.Map --qualified --alias M

    # `import Data.Map hiding (lookup)`, values only
    module-symbols select --snapshot browse.json Data.Map --hiding --name lookup --kind value

    # `import Data.Maybe (Maybe(..))` as JSON
    module-symbols select --snapshot browse.json Data.Maybe --parent Maybe --format json

    # List modules in a snapshot
    module-symbols modules --snapshot browse.json
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a TOML cache config
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Project root handed to the analysis client
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve an import against a module's exports
    Select {
        /// JSON snapshot of browse results, keyed by module name
        #[arg(long)]
        snapshot: PathBuf,

        #[command(flatten)]
        import: ImportArgs,
    },
    /// List the modules present in a snapshot
    Modules {
        /// JSON snapshot of browse results, keyed by module name
        #[arg(long)]
        snapshot: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// Imported module
    pub module: String,

    /// Alias from `as X`
    #[arg(long)]
    pub alias: Option<String>,

    /// Import is `qualified`
    #[arg(long)]
    pub qualified: bool,

    /// Treat the import list as a hiding list
    #[arg(long)]
    pub hiding: bool,

    /// Names in the import list
    #[arg(long = "name", value_delimiter = ',')]
    pub names: Vec<String>,

    /// Types imported with all their members, as in `Type(..)`
    #[arg(long = "parent", value_delimiter = ',')]
    pub parents: Vec<String>,

    /// Only keep these symbol kinds (value, type, class, constructor, field, module, operator)
    #[arg(long = "kind", value_delimiter = ',')]
    pub kinds: Vec<String>,

    /// Leave out qualified names
    #[arg(long)]
    pub skip_qualified: bool,

    /// Output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,
}

impl ImportArgs {
    pub fn import_spec(&self) -> Result<ImportSpec> {
        let mut spec = ImportSpec::new(self.module.clone());
        if let Some(alias) = &self.alias {
            spec = spec.alias(alias.clone());
        }
        if self.qualified {
            spec = spec.qualified();
        }

        let items: Vec<ImportItem> = self
            .names
            .iter()
            .map(ImportItem::name)
            .chain(self.parents.iter().map(ImportItem::parent))
            .collect();

        if items.is_empty() {
            if self.hiding {
                return Err(Error::InvalidImport(
                    "--hiding needs at least one --name or --parent".to_string(),
                ));
            }
            return Ok(spec);
        }

        Ok(if self.hiding {
            spec.hiding(items)
        } else {
            spec.showing(items)
        })
    }

    pub fn symbol_types(&self) -> Result<Option<Vec<SymbolType>>> {
        if self.kinds.is_empty() {
            return Ok(None);
        }
        self.kinds
            .iter()
            .map(|kind| {
                SymbolType::from_str(kind)
                    .ok_or_else(|| Error::InvalidImport(format!("unknown symbol kind: {}", kind)))
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }
}

pub fn load_config(path: Option<&Path>) -> Result<CacheConfig> {
    match path {
        Some(path) => CacheConfig::load(path),
        None => Ok(CacheConfig::default()),
    }
}

/// Loads `snapshot`, waits for the module's first refresh and resolves the import.
pub async fn resolve(
    snapshot: &Path,
    root: &Path,
    config: CacheConfig,
    args: &ImportArgs,
) -> Result<Vec<ResolvedSymbol>> {
    let import = Arc::new(args.import_spec()?);
    let symbol_types = args.symbol_types()?;

    let client = SnapshotClient::load(snapshot)?;
    let registry = ModuleInfoRegistry::new(Arc::new(client), root).with_config(config);
    let module = registry.get_ready(&import.module_name).await?;

    let resolved = module.select(&import, symbol_types.as_deref(), args.skip_qualified);
    registry.destroy_all();
    Ok(resolved)
}

pub async fn select(
    snapshot: &Path,
    root: &Path,
    config: CacheConfig,
    args: &ImportArgs,
) -> Result<()> {
    let resolved = resolve(snapshot, root, config, args).await?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&resolved)?);
        return Ok(());
    }

    if resolved.is_empty() {
        println!("No symbols exposed by {}", args.module);
        return Ok(());
    }
    for symbol in &resolved {
        println!("{}", format_resolved(symbol));
    }
    Ok(())
}

pub fn list_modules(snapshot: &Path) -> Result<()> {
    let client = SnapshotClient::load(snapshot)?;
    let names = client.module_names();
    if names.is_empty() {
        println!("Snapshot has no modules");
    }
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

fn format_resolved(symbol: &ResolvedSymbol) -> String {
    let mut line = symbol.qname.clone();
    if !symbol.type_signature.is_empty() {
        line.push_str(" :: ");
        line.push_str(&symbol.type_signature);
    }
    line.push_str(&format!("  ({})", symbol.symbol_type));
    if let Some(parent) = &symbol.qparent {
        line.push_str(&format!(" in {}", parent));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SNAPSHOT: &str = r#"{
        "Data.Map": [
            {"name": "lookup", "typeSignature": "Ord k => k -> Map k a -> Maybe a", "symbolType": "value"},
            {"name": "Map", "symbolType": "type"},
            {"name": "empty", "typeSignature": "Map k a", "symbolType": "value"}
        ]
    }"#;

    fn parse(args: &[&str]) -> ImportArgs {
        let mut argv = vec!["module-symbols", "select", "--snapshot", "browse.json"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Select { import, .. } => import,
            Commands::Modules { .. } => panic!("expected select"),
        }
    }

    fn write_snapshot() -> (TempDir, PathBuf) {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("browse.json");
        std::fs::write(&path, SNAPSHOT).expect("Failed to write snapshot");
        (dir, path)
    }

    #[test]
    fn test_qualified_alias_spec() {
        let spec = parse(&["Data.Map", "--qualified", "--alias", "M"])
            .import_spec()
            .unwrap();
        assert_eq!(spec, ImportSpec::new("Data.Map").qualified().alias("M"));
    }

    #[test]
    fn test_hiding_list_spec() {
        let spec = parse(&["Data.Map", "--hiding", "--name", "lookup,insert", "--parent", "Map"])
            .import_spec()
            .unwrap();
        assert!(spec.hiding);
        assert_eq!(
            spec.import_list,
            Some(vec![
                ImportItem::name("lookup"),
                ImportItem::name("insert"),
                ImportItem::parent("Map"),
            ])
        );
    }

    #[test]
    fn test_hiding_without_list_is_rejected() {
        let err = parse(&["Data.Map", "--hiding"]).import_spec().unwrap_err();
        assert!(matches!(err, Error::InvalidImport(_)));
    }

    #[test]
    fn test_symbol_kinds() {
        let args = parse(&["Data.Map", "--kind", "value,type"]);
        assert_eq!(
            args.symbol_types().unwrap(),
            Some(vec![SymbolType::Value, SymbolType::Type])
        );
        assert!(parse(&["Data.Map"]).symbol_types().unwrap().is_none());
        assert!(parse(&["Data.Map", "--kind", "function"]).symbol_types().is_err());
    }

    #[test]
    fn test_unknown_format_is_rejected_by_parser() {
        let result = Cli::try_parse_from([
            "module-symbols",
            "select",
            "--snapshot",
            "browse.json",
            "Data.Map",
            "--format",
            "yaml",
        ]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_resolve_hiding_import() {
        let (dir, path) = write_snapshot();
        let args = parse(&["Data.Map", "--hiding", "--name", "lookup"]);

        let resolved = resolve(&path, dir.path(), CacheConfig::default(), &args)
            .await
            .unwrap();
        let qnames: Vec<_> = resolved.iter().map(|r| r.qname.as_str()).collect();
        assert_eq!(qnames, vec!["Data.Map.Map", "Map", "Data.Map.empty", "empty"]);
    }

    #[tokio::test]
    async fn test_resolve_unknown_module() {
        let (dir, path) = write_snapshot();
        let args = parse(&["Data.Set"]);

        let err = resolve(&path, dir.path(), CacheConfig::default(), &args)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Analysis(_)));
    }

    #[test]
    fn test_format_resolved_line() {
        let symbol = ResolvedSymbol {
            name: "empty".to_string(),
            type_signature: "Map k a".to_string(),
            symbol_type: SymbolType::Value,
            qname: "M.empty".to_string(),
            qparent: None,
            import: Arc::new(ImportSpec::new("Data.Map").alias("M")),
        };
        assert_eq!(format_resolved(&symbol), "M.empty :: Map k a  (value)");
    }

    #[test]
    fn test_missing_config_defaults() {
        assert_eq!(load_config(None).unwrap(), CacheConfig::default());
    }
}
