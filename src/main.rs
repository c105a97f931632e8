use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use shopsearch::config::{self, ShopSearchConfig};
use shopsearch::db::schema::Model;
use shopsearch::db::Database;
use shopsearch::output::{print_json, table};
use shopsearch::search::{self, SearchRequest};

#[derive(Parser)]
#[command(name = "shopsearch", version, about = "Shop admin search: turn search field values into parameterized SQL")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Path to config file (default: ~/.shopsearch/config.toml)
    #[arg(long, global = true, env = "SHOPSEARCH_CONFIG")]
    config: Option<PathBuf>,

    /// Shop database to check queries against (default: empty in-memory schema)
    #[arg(long, global = true, env = "SHOPSEARCH_DB")]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble the search query for a model
    Build {
        /// Model to search: orders or products
        model: String,

        /// Search field value as NAME=VALUE (repeat for several options)
        #[arg(long = "field", value_name = "NAME=VALUE")]
        fields: Vec<String>,

        /// Read field values from a JSON object file
        #[arg(long)]
        request: Option<PathBuf>,

        /// Prepare the query against the shop schema to make sure it is valid
        #[arg(long)]
        check: bool,
    },

    /// List the searchable fields of a model
    Fields {
        /// Model: orders or products
        model: String,
    },

    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the default config file if none exists
    Init,
    /// Show the effective configuration
    Show,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json_output = cli.json;

    let config_path = match cli.config {
        Some(path) => path,
        None => config::config_path()?,
    };

    match cli.command {
        Commands::Build {
            model,
            fields,
            request,
            check,
        } => {
            let model = parse_model(&model)?;
            let settings = ShopSearchConfig::load_from(&config_path)?;
            let searchable = settings.model_fields(model);

            let mut values = match request {
                Some(ref path) => read_request(path)?,
                None => SearchRequest::new(),
            };
            // --field values win over the request file
            values.extend(search::request_from_args(&fields, &searchable)?);

            let assembled =
                search::assemble(model, &searchable, &values, &settings.filter_options())?;

            let checked_against = if check {
                let db = match cli.db {
                    Some(ref path) => Database::open(path)?,
                    None => Database::open_in_memory()?,
                };
                db.check(&assembled.query)?;
                Some(db.location())
            } else {
                None
            };

            let summary = assembled.summary();
            if json_output {
                print_json(&summary)?;
            } else {
                table::print_summary(&summary);
                if let Some(location) = checked_against {
                    println!("\nQuery prepares cleanly against {location}.");
                }
            }
        }

        Commands::Fields { model } => {
            let model = parse_model(&model)?;
            let settings = ShopSearchConfig::load_from(&config_path)?;
            let fields = settings.model_fields(model);

            if json_output {
                print_json(&serde_json::json!({
                    "model": model,
                    "fields": fields,
                }))?;
            } else {
                table::print_fields(model.name(), &fields);
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Init => {
                if config::init_config(&config_path)? {
                    println!("Created {}", config_path.display());
                } else {
                    println!("Config already exists: {}", config_path.display());
                }
            }
            ConfigAction::Show => {
                let settings = ShopSearchConfig::load_from(&config_path)?;
                if json_output {
                    print_json(&settings)?;
                } else {
                    println!("# {}", config_path.display());
                    print!("{}", settings.display()?);
                }
            }
        },
    }

    Ok(())
}

fn parse_model(name: &str) -> Result<Model> {
    match Model::from_str(name) {
        Some(model) => Ok(model),
        None => bail!("Unknown model: {name}. Use: orders, products"),
    }
}

fn read_request(path: &Path) -> Result<SearchRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request: {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Request is not valid JSON: {}", path.display()))?;
    Ok(search::request_from_json(&json)?)
}
