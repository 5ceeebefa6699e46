//! mcpforge CLI entrypoint
//! Parses command-line arguments and dispatches to the conversion pipeline.
#![deny(unsafe_code)]

// Internal imports (std, crate)
use mcpforge::conversion::{self, ConversionOptions};
use mcpforge::core::Settings;
use mcpforge::domain::{MetricsFormat, PublicApiSpec, ServerConfig};
use mcpforge::generation::ServerGenerator;
use mcpforge::harness::{EndpointTester, ParameterValues};
use mcpforge::ingest::{CatalogEnricher, CompositeSpecLoader, EnrichedEntry, SpecLoader};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// External imports (alphabetized)
use anyhow::Context;
use clap::Parser;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mcpforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML settings file; defaults apply when omitted
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Convert an OpenAPI document into a server configuration
    Convert {
        /// URL, file path or literal JSON of the OpenAPI document
        #[arg(long)]
        spec: String,
        /// Base URL used when the document declares no absolute server
        #[arg(long)]
        base_url: Option<String>,
        /// Provider name used for environment variable prefixes
        #[arg(long)]
        provider: Option<String>,
        /// Category used to pick default endpoints when the document has none
        #[arg(long)]
        category: Option<String>,
        /// Expose a metrics endpoint in this format (json or prometheus)
        #[arg(long)]
        metrics: Option<MetricsFormat>,
        /// Write the configuration here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Convert a public API catalog entry into a server configuration
    Catalog {
        /// JSON file holding the catalog entry
        #[arg(long)]
        entry: PathBuf,
        /// Skip looking up the entry's OpenAPI document
        #[arg(long)]
        no_enrich: bool,
        /// Expose a metrics endpoint in this format (json or prometheus)
        #[arg(long)]
        metrics: Option<MetricsFormat>,
        /// Write the configuration here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Generate server.js, package.json and .env.example from a configuration
    Generate {
        /// Server configuration JSON file
        #[arg(long)]
        config: PathBuf,
        /// Directory receiving the generated files
        #[arg(long)]
        output_dir: PathBuf,
        /// Port the generated server listens on by default
        #[arg(long)]
        port: Option<u16>,
    },
    /// Call configured endpoints against the live upstream API
    Test {
        /// Server configuration JSON file
        #[arg(long)]
        config: PathBuf,
        /// JSON file of parameter values keyed by endpoint id
        #[arg(long)]
        params: Option<PathBuf>,
        /// Only test this endpoint id
        #[arg(long)]
        endpoint: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with default level INFO
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load(cli.settings.as_deref()).context("Failed to load settings")?;

    match cli.command {
        Commands::Convert {
            spec,
            base_url,
            provider,
            category,
            metrics,
            output,
        } => {
            let loader = CompositeSpecLoader::new(&settings.http)?;
            let document = loader
                .load(&spec)
                .await
                .with_context(|| format!("Failed to load OpenAPI document from {spec}"))?;
            let options = ConversionOptions {
                fallback_base_url: base_url,
                provider,
                category,
                metrics,
                ..ConversionOptions::default()
            };
            let config = conversion::convert_openapi(&document, &options)?;
            emit_config(&config, output.as_deref()).await?;
        }
        Commands::Catalog {
            entry,
            no_enrich,
            metrics,
            output,
        } => {
            let raw = tokio::fs::read_to_string(&entry)
                .await
                .with_context(|| format!("Failed to read catalog entry {}", entry.display()))?;
            let entry: PublicApiSpec =
                serde_json::from_str(&raw).context("Catalog entry is not valid JSON")?;

            let enriched = if no_enrich {
                EnrichedEntry {
                    entry,
                    document: None,
                }
            } else {
                let loader: Arc<dyn SpecLoader> = Arc::new(CompositeSpecLoader::new(&settings.http)?);
                CatalogEnricher::new(loader, settings.catalog.spec_base_url.clone())
                    .enrich(entry)
                    .await
            };
            let options = ConversionOptions {
                metrics,
                ..ConversionOptions::default()
            };
            let config = conversion::convert_catalog_entry(&enriched, &options)?;
            emit_config(&config, output.as_deref()).await?;
        }
        Commands::Generate {
            config,
            output_dir,
            port,
        } => {
            if let Some(port) = port {
                settings.generation.server_port = port;
            }
            let config = read_config(&config).await?;
            let generator = ServerGenerator::new(&settings.generation)?;
            let written = generator.generate(&config)?.write_to(&output_dir).await?;
            for path in written {
                info!("Wrote {}", path.display());
            }
        }
        Commands::Test {
            config,
            params,
            endpoint,
        } => {
            let config = read_config(&config).await?;
            let params: HashMap<String, ParameterValues> = match params {
                Some(path) => {
                    let raw = tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    serde_json::from_str(&raw).context("Parameter file must map endpoint ids to objects")?
                }
                None => HashMap::new(),
            };

            let tester = EndpointTester::new(&settings.harness)?;
            let results = match endpoint {
                Some(id) => {
                    let target = config
                        .endpoint(&id)
                        .with_context(|| format!("No endpoint with id {id}"))?;
                    let values = params
                        .get(&id)
                        .cloned()
                        .unwrap_or_else(|| mcpforge::harness::example_values(target));
                    vec![tester.test_endpoint(&config, target, &values).await]
                }
                None => tester.test_all(&config, &params).await,
            };
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
    }

    Ok(())
}

async fn read_config(path: &Path) -> anyhow::Result<ServerConfig> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read server configuration {}", path.display()))?;
    Ok(ServerConfig::from_json(&raw)?)
}

async fn emit_config(config: &ServerConfig, output: Option<&Path>) -> anyhow::Result<()> {
    let json = config.to_json()?;
    match output {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(
                "Wrote configuration for {} ({} endpoints) to {}",
                config.name,
                config.endpoints.len(),
                path.display()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_convert_arguments() {
        let cli = Cli::try_parse_from([
            "mcpforge",
            "convert",
            "--spec",
            "petstore.json",
            "--metrics",
            "prometheus",
        ])
        .unwrap();
        match cli.command {
            Commands::Convert { spec, metrics, .. } => {
                assert_eq!(spec, "petstore.json");
                assert_eq!(metrics, Some(MetricsFormat::Prometheus));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_emit_config_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = ServerConfig::new("Weather API", "https://api.example.com");
        emit_config(&config, Some(&path)).await.unwrap();
        let restored = read_config(&path).await.unwrap();
        assert_eq!(restored.id(), config.id());
    }
}
