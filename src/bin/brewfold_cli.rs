use brewfold::logging::config::LogConfig;
use brewfold::logging::{self, LoggingSystem};
use brewfold::{
    load_config, parse_file, BrewFoldConfig, Importer, NodeMapper, SledEntityStore,
};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use serde_json::{json, Value};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a document and print one of its views as JSON
    Parse {
        #[arg(required = true)]
        path: PathBuf,

        #[arg(short, long, value_enum, default_value_t = View::Tree)]
        view: View,
    },
    /// Import a document into the entity store
    Import {
        #[arg(required = true)]
        path: PathBuf,

        /// Owner scoping the imported entities (overrides default_owner)
        #[arg(short, long)]
        owner: Option<String>,
    },
    /// List registered schemas
    Schemas {},
    /// Print entity store statistics
    Stats {},
}

#[derive(Clone, Copy, ValueEnum)]
enum View {
    /// Generic element tree
    Tree,
    /// Children grouped by tag
    Nested,
    /// Schema-mapped records
    Mapped,
}

fn init_logging(config: &BrewFoldConfig) -> Result<(), Box<dyn std::error::Error>> {
    match &config.log_config {
        Some(path) => LoggingSystem::init_with_config(LogConfig::from_file(path)?)?,
        None => logging::init(),
    }
    Ok(())
}

/// Entry point for the brewfold CLI.
///
/// Loads configuration (`-c`, `BREWFOLD_CONFIG` or
/// `config/brewfold_config.json`), then runs the subcommand. Every command
/// writes JSON to stdout; logs go to stderr.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_logging(&config)?;

    let registry = config.load_registry()?;
    info!("Loaded {} schemas", registry.len());

    let output: Value = match cli.command {
        Commands::Parse { path, view } => {
            let tree = parse_file(&path)?;
            match view {
                View::Tree => serde_json::to_value(&tree)?,
                View::Nested => serde_json::to_value(brewfold::parser::nested::to_nested_map(&tree))?,
                View::Mapped => NodeMapper::new(&registry)
                    .with_max_depth(config.max_depth)
                    .map_document(&tree)?
                    .to_json(),
            }
        }
        Commands::Import { path, owner } => {
            let store = SledEntityStore::open(&config.storage_path)?;
            let report = Importer::new(&registry, &store)
                .with_options(config.import_options())
                .import_file(&path, &config.inherited_context(owner.as_deref()))?;
            store.flush()?;
            info!(
                "Imported {}: {} created, {} existing",
                path.display(),
                report.created,
                report.existing
            );
            serde_json::to_value(&report)?
        }
        Commands::Schemas {} => Value::Array(
            registry
                .schemas()
                .map(|schema| {
                    json!({
                        "tag": schema.tag(),
                        "fields": schema.fields().len(),
                        "key_fields": schema.classification().key_fields,
                    })
                })
                .collect(),
        ),
        Commands::Stats {} => {
            let store = SledEntityStore::open(&config.storage_path)?;
            serde_json::to_value(store.stats()?)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
