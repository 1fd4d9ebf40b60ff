//! schemango CLI - prints schema, diff, validator and analysis results as JSON

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use mongodb::bson::Bson;
use serde::Serialize;

use schemango::config::ConfigManager;
use schemango::connection::Namespace;
use schemango::schema::ValidatorStrictness;
use schemango::{DocumentStore, MongoStore, SchemaEngine};

#[derive(Parser)]
#[command(name = "schemango")]
#[command(about = "Infer, compare and validate MongoDB collection schemas", long_about = None)]
struct Cli {
    /// MongoDB connection string
    #[arg(short, long, default_value = "mongodb://localhost:27017")]
    uri: String,

    /// Connection timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Settings directory (defaults to the platform config directory)
    #[arg(long)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Infer the schema of a collection
    Infer {
        /// Collection as `database.collection`
        #[arg(value_parser = parse_namespace)]
        namespace: Namespace,
        #[arg(short, long)]
        sample_size: Option<u64>,
        /// Print only the aggregate counters
        #[arg(long)]
        summary: bool,
    },

    /// Compare the schemas of two collections
    Compare {
        #[arg(value_parser = parse_namespace)]
        source: Namespace,
        #[arg(value_parser = parse_namespace)]
        target: Namespace,
        #[arg(short, long)]
        sample_size: Option<u64>,
    },

    /// Synthesize a $jsonSchema validator
    Validator {
        #[arg(value_parser = parse_namespace)]
        namespace: Namespace,
        /// strict, moderate or relaxed
        #[arg(long)]
        strictness: Option<ValidatorStrictness>,
        #[arg(short, long)]
        sample_size: Option<u64>,
        /// Print the collMod command instead of the validator
        #[arg(long)]
        coll_mod: bool,
    },

    /// Report unused indexes, slow query patterns and schema risks
    Analyze {
        #[arg(value_parser = parse_namespace)]
        namespace: Namespace,
        /// Profiler observation window in seconds (0 skips observation)
        #[arg(long)]
        observe: Option<u64>,
    },

    /// List collections in a database
    Collections { database: String },

    /// Show effective settings
    Settings,
}

fn parse_namespace(value: &str) -> Result<Namespace, String> {
    Namespace::parse(value).ok_or_else(|| format!("expected database.collection, got '{value}'"))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let config = match cli.config_dir {
        Some(dir) => ConfigManager::with_config_dir(dir)?,
        None => ConfigManager::new()?,
    };
    let settings = config.load_settings().context("Failed to load settings")?;

    if let Commands::Settings = cli.command {
        return print_json(&settings);
    }

    let store = MongoStore::connect(&cli.uri, Duration::from_secs(cli.timeout))
        .with_context(|| format!("Failed to connect to {}", cli.uri))?;
    let engine = SchemaEngine::new(store, settings);

    match cli.command {
        Commands::Infer { namespace, sample_size, summary } => {
            let snapshot = engine.infer_schema(&namespace, sample_size)?;
            if summary { print_json(&snapshot.summary()) } else { print_json(&*snapshot) }
        }
        Commands::Compare { source, target, sample_size } => {
            print_json(&engine.compare_schemas(&source, &target, sample_size)?)
        }
        Commands::Validator { namespace, strictness, sample_size, coll_mod } => {
            let validator = engine.generate_validator(&namespace, strictness, sample_size)?;
            if coll_mod {
                let command = Bson::Document(validator.to_coll_mod()?).into_relaxed_extjson();
                print_json(&command)
            } else {
                print_json(&validator)
            }
        }
        Commands::Analyze { namespace, observe } => {
            let window = observe.map(Duration::from_secs);
            print_json(&engine.analyze_query_patterns(&namespace, window)?)
        }
        Commands::Collections { database } => {
            print_json(&engine.store().list_collections(&database)?)
        }
        Commands::Settings => print_json(engine.settings()),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
