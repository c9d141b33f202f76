use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use keyql::features::default_pipeline;
use keyql::output;
use keyql::services::Services;
use keyql::utils::{self, AppConfig};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "keyql")]
#[command(about = "Compile keyword search queries into backend filter trees")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to the app data directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a query and show the result
    Compile {
        /// Query text
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        query: Vec<String>,

        /// Print the compiled query as JSON
        #[arg(long)]
        json: bool,

        /// Do not contact external services
        #[arg(long)]
        offline: bool,
    },
    /// List registered keyword features in registration order
    Features,
    /// Show the effective configuration
    Config {
        /// Write the default configuration file
        #[arg(long)]
        init: bool,
    },
}

/// Log to stderr, `RUST_LOG` overrides the default level
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init()
        .context("Failed to init tracing")?;
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    }
}

#[cfg(feature = "http")]
fn online_services(config: &AppConfig) -> Result<Services> {
    Services::http(config.service_timeout()).context("Failed to create HTTP client")
}

#[cfg(not(feature = "http"))]
fn online_services(_: &AppConfig) -> Result<Services> {
    tracing::warn!("built without the http feature, external services are disabled");
    Ok(Services::offline())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;
    let color = !cli.no_color;

    match cli.command {
        Commands::Compile {
            query,
            json,
            offline,
        } => {
            let config = load_config(cli.config.as_ref())?;
            let services = if offline {
                Services::offline()
            } else {
                online_services(&config)?
            };
            let pipeline = default_pipeline(&config, &services)
                .context("Failed to register keyword features")?;

            let compiled = pipeline.compile(&query.join(" "));
            if json {
                output::print_compiled_json(&compiled)?;
            } else {
                output::print_compiled(&compiled, color)?;
            }
        }
        Commands::Features => {
            let config = load_config(cli.config.as_ref())?;
            let pipeline = default_pipeline(&config, &Services::offline())
                .context("Failed to register keyword features")?;
            output::print_features(pipeline.features(), color)?;
        }
        Commands::Config { init } => {
            if init {
                let path = match &cli.config {
                    Some(path) => {
                        AppConfig::default().save_to(path)?;
                        path.clone()
                    }
                    None => AppConfig::default().save()?,
                };
                println!("Wrote default config to {}", path.display());
                return Ok(());
            }

            let path = match &cli.config {
                Some(path) => path.clone(),
                None => utils::get_config_path()?,
            };
            let config = load_config(Some(&path))?;
            println!("# {}", path.display());
            println!(
                "{}",
                serde_json::to_string_pretty(&config).context("Failed to serialize config")?
            );
        }
    }

    Ok(())
}
