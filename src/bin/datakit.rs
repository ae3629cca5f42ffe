//! datakit CLI
//!
//! Reads, edits and checks JSON files through paths and schema definitions.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use datakit::config::OutputFormat;
use datakit::schema::ModelRegistry;
use datakit::{Filter, KitConfig, Registry, RegistryOptions, Schema};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "datakit")]
#[command(about = "Path-addressed JSON editing and schema checks")]
struct Cli {
    /// Config file (defaults to datakit.toml and friends)
    #[arg(short, long)]
    config: Option<String>,

    /// Force compact output
    #[arg(long)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the value at a path
    Get {
        file: PathBuf,
        /// Dotted or bracketed path; empty for the whole document
        #[arg(default_value = "")]
        path: String,
        /// Filters applied to the value, e.g. "toTrim|toUpper"
        #[arg(short, long)]
        filter: Option<String>,
        /// JSON printed when the path does not exist
        #[arg(short, long)]
        default: Option<String>,
    },

    /// Write a value at a path
    Set {
        file: PathBuf,
        path: String,
        /// JSON value; anything that does not parse is taken as a string
        value: String,
        /// Write the result back instead of printing it
        #[arg(short, long)]
        in_place: bool,
    },

    /// Remove the value at a path
    Remove {
        file: PathBuf,
        path: String,
        #[arg(short, long)]
        in_place: bool,
    },

    /// Deep-merge another document into a file
    Merge {
        file: PathBuf,
        other: PathBuf,
        #[arg(short, long)]
        in_place: bool,
    },

    /// Check a document against a schema definition
    Check {
        file: PathBuf,
        /// Schema definition (JSON)
        #[arg(short, long)]
        schema: PathBuf,
        /// Model definitions referenced by the schema
        #[arg(short, long)]
        models: Option<PathBuf>,
    },

    /// Project a schema definition to JSON Schema or OpenAPI
    Project {
        schema: PathBuf,
        #[arg(short, long)]
        models: Option<PathBuf>,
        /// Emit an OpenAPI 3.0 schema object instead of JSON Schema
        #[arg(long)]
        swagger: bool,
    },

    /// Show the effective configuration
    Config {
        /// Write the effective configuration to this file
        #[arg(long)]
        init: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = KitConfig::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    let output = if cli.compact {
        OutputFormat::Compact
    } else {
        config.output.format
    };
    let options = RegistryOptions::from(&config.registry);

    match cli.command {
        Commands::Get {
            file,
            path,
            filter,
            default,
        } => {
            let registry = Registry::with_options(read_json(&file)?, options)?;
            let filters = match filter {
                Some(list) => Filter::parse_list(&list)?,
                None => Vec::new(),
            };
            let default = default.as_deref().map(parse_arg);
            match registry.get_with(&path, default, &filters) {
                Some(value) => println!("{}", output.render(&value)?),
                None => bail!("nothing at '{}'", path),
            }
        }

        Commands::Set {
            file,
            path,
            value,
            in_place,
        } => {
            let mut registry = Registry::with_options(read_json(&file)?, options)?;
            registry.set(&path, parse_arg(&value))?;
            emit(&file, registry.value(), in_place, output)?;
        }

        Commands::Remove { file, path, in_place } => {
            let mut registry = Registry::with_options(read_json(&file)?, options)?;
            registry.remove(&path)?;
            emit(&file, registry.value(), in_place, output)?;
        }

        Commands::Merge { file, other, in_place } => {
            let mut registry = Registry::with_options(read_json(&file)?, options)?;
            registry.extend(read_json(&other)?)?;
            emit(&file, registry.value(), in_place, output)?;
        }

        Commands::Check { file, schema, models } => {
            let schema = load_schema(&schema, models.as_deref(), &config)?;
            match schema.validate(read_json(&file)?) {
                Ok(value) => println!("{}", output.render(&value)?),
                Err(report) => {
                    eprintln!("{} failed with {} issue(s):", file.display(), report.len());
                    eprintln!("{}", report);
                    println!("{}", output.render(&serde_json::to_value(&report)?)?);
                    std::process::exit(1);
                }
            }
        }

        Commands::Project {
            schema,
            models,
            swagger,
        } => {
            let schema = load_schema(&schema, models.as_deref(), &config)?;
            let projected = if swagger {
                schema.build_swagger()
            } else {
                schema.build_schema()
            };
            println!("{}", output.render(&projected)?);
        }

        Commands::Config { init } => {
            if let Some(path) = init {
                config
                    .save(&path)
                    .with_context(|| format!("failed to write {}", path))?;
                println!("Wrote {}", path);
            } else {
                print!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn parse_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn load_schema(path: &Path, models: Option<&Path>, config: &KitConfig) -> anyhow::Result<Schema> {
    let mut registry = ModelRegistry::new();
    if let Some(models) = models {
        registry.load_definitions(&read_json(models)?, &config.schema)?;
    }
    let definition = read_json(path)?;
    Schema::from_definition_with(&definition, &registry, &config.schema)
        .with_context(|| format!("invalid schema definition in {}", path.display()))
}

fn emit(file: &Path, value: &Value, in_place: bool, output: OutputFormat) -> anyhow::Result<()> {
    let rendered = output.render(value)?;
    if in_place {
        std::fs::write(file, rendered + "\n").with_context(|| format!("failed to write {}", file.display()))?;
    } else {
        println!("{}", rendered);
    }
    Ok(())
}
