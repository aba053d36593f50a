use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

mod config;
mod output;

use fileid_core::identification::{FileIdentifier, IdentificationService};
use fileid_core::protocol::{ClientOptions, ProtocolClient, SessionCredentials};
use fileid_core::throttle::RequestThrottle;
use fileid_core::{ed2k_link, fingerprint_file};

#[derive(Parser)]
#[command(name = "fileid")]
#[command(author, version, about = "Identify files against the AniDB catalog", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Use a specific config file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the ed2k fingerprint of file(s), without touching the network
    Hash {
        /// Files to hash
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the ed2k link for file(s)
    Link {
        /// Files to link
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Identify file(s) against the AniDB catalog
    Identify {
        /// Files to identify
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the configuration file location
    ConfigPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn init_logging(debug: bool) {
    let default_filter = if debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match cli.command {
        Commands::Hash { paths, format } => hash_command(&paths, format).await,
        Commands::Link { paths } => link_command(&paths).await,
        Commands::Identify { paths, format } => {
            identify_command(&paths, format, cli.config.as_ref()).await
        }
        Commands::ConfigPath => {
            println!("{}", config::default_config_path().display());
            Ok(())
        }
    }
}

async fn hash_command(paths: &[PathBuf], format: OutputFormat) -> Result<()> {
    for path in paths {
        let (fingerprint, size) = fingerprint_file(path)
            .await
            .with_context(|| format!("cannot hash {}", path.display()))?;
        match format {
            OutputFormat::Text => println!("{fingerprint}  {}", path.display()),
            OutputFormat::Json => {
                let line = serde_json::json!({
                    "path": path,
                    "ed2k": fingerprint,
                    "size": size,
                });
                println!("{line}");
            }
        }
    }
    Ok(())
}

async fn link_command(paths: &[PathBuf]) -> Result<()> {
    for path in paths {
        let (fingerprint, size) = fingerprint_file(path)
            .await
            .with_context(|| format!("cannot hash {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        println!("{}", ed2k_link(&name, size, &fingerprint));
    }
    Ok(())
}

async fn identify_command(
    paths: &[PathBuf],
    format: OutputFormat,
    config_path: Option<&PathBuf>,
) -> Result<()> {
    let config = config::load(config_path)?;
    let (Some(username), Some(password)) = (config.auth.username, config.auth.password) else {
        bail!(
            "no credentials configured; set FILEID_AUTH__USERNAME and FILEID_AUTH__PASSWORD \
             or add an [auth] section to {}",
            config::default_config_path().display()
        );
    };

    let throttle = Arc::new(RequestThrottle::default());
    let client = Arc::new(
        ProtocolClient::new(
            ClientOptions {
                server: config.client.server,
                client_name: config.client.name,
                client_version: config.client.version,
                ..Default::default()
            },
            SessionCredentials { username, password },
            throttle,
        )
        .await
        .context("cannot reach the AniDB endpoint")?,
    );
    let service = IdentificationService::new(client.clone());

    let mut missing = 0usize;
    for path in paths {
        let result = service
            .identify(path)
            .await
            .with_context(|| format!("cannot identify {}", path.display()))?;
        if !result.is_identified() {
            missing += 1;
        }
        match format {
            OutputFormat::Text => output::print_identification(path, &result),
            OutputFormat::Json => {
                let line = serde_json::json!({
                    "path": path,
                    "identification": result,
                });
                println!("{line}");
            }
        }
    }

    client.shutdown().await;

    if missing > 0 {
        bail!("{missing} of {} file(s) not in the catalog", paths.len());
    }
    Ok(())
}
