use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{debug, info};
use std::path::PathBuf;

use route_openapi::{
    builder::{build_openapi_definitions_for_resources, build_openapi_spec},
    generator::Generator,
    manifest::{load_definitions, load_file, ApiConfig, ServiceManifest},
};

/// Builds Swagger 2.0 documents from web service manifests and model definitions
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the full Swagger document
    Build {
        /// Document settings (JSON or YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Web service manifest (JSON or YAML)
        #[arg(short, long)]
        services: PathBuf,

        /// Directory holding model definition files
        #[arg(short, long)]
        definitions: Option<PathBuf>,

        /// Output directory for generated files
        #[arg(short, long, default_value = "./docs")]
        output: PathBuf,

        /// Output types to generate (json,yaml)
        #[arg(long = "ot", default_value = "json,yaml")]
        output_types: String,
    },

    /// Print the definitions needed by the given models
    Definitions {
        /// Document settings (JSON or YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory holding model definition files
        #[arg(short, long)]
        definitions: PathBuf,

        /// Canonical model names
        #[arg(required = true)]
        models: Vec<String>,
    },
}

fn load_api_config(path: Option<&PathBuf>) -> Result<ApiConfig> {
    match path {
        Some(path) => load_file(path).with_context(|| format!("Failed to load config {:?}", path)),
        None => Ok(ApiConfig::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let env = Env::default().filter_or("RUST_LOG", if cli.verbose { "debug" } else { "info" });
    env_logger::init_from_env(env);

    debug!("Starting route-openapi...");

    match &cli.command {
        Commands::Build {
            config,
            services,
            definitions,
            output,
            output_types,
        } => {
            info!("Building Swagger document");

            let output_types: Vec<String> = output_types.split(',').map(|s| s.trim().to_string()).collect();
            let api_config = load_api_config(config.as_ref())?;
            let definitions = match definitions {
                Some(dir) => load_definitions(dir)
                    .with_context(|| format!("Failed to load definitions from {:?}", dir))?,
                None => Default::default(),
            };
            debug!("Loaded {} model definitions", definitions.len());

            let manifest: ServiceManifest = load_file(services)
                .with_context(|| format!("Failed to load services {:?}", services))?;
            let web_services = manifest.into_web_services();
            debug!("Loaded {} web services", web_services.len());

            let config = api_config.into_config(definitions);
            let swagger = build_openapi_spec(&web_services, &config).context("Failed to build Swagger document")?;
            debug!(
                "Built {} paths, {} definitions, {} shared parameters",
                swagger.paths.len(),
                swagger.definitions.len(),
                swagger.parameters.len()
            );

            Generator::new(swagger).generate(output, &output_types)?;
            info!("Swagger documentation generated successfully");
        }
        Commands::Definitions {
            config,
            definitions,
            models,
        } => {
            let api_config = load_api_config(config.as_ref())?;
            let definitions = load_definitions(definitions)
                .with_context(|| format!("Failed to load definitions from {:?}", definitions))?;
            let config = api_config.into_config(definitions);

            let names: Vec<&str> = models.iter().map(String::as_str).collect();
            let swagger = build_openapi_definitions_for_resources(&config, &names)
                .context("Failed to build definitions")?;
            println!("{}", serde_json::to_string_pretty(&swagger.definitions)?);
        }
    }

    Ok(())
}
