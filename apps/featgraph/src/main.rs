//! # featgraph
//!
//! Command line entry point: parses arguments, installs logging and
//! dispatches to [`featgraph::cli`] or the management server.

use clap::{Parser, Subcommand};
use featgraph::api::{AppState, create_router};
use featgraph::cli::{self, CliError, ConfigAction};
use featgraph::featgraph_core::RangePolicy;
use featgraph::featgraph_core::config::ConfigFacade;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "featgraph", version)]
#[command(about = "Feature dependency translator and configuration manager")]
struct Cli {
    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective range of a floor version
    Range {
        version: String,
        /// Range policy: exact, same-major, same-minor, at-least or a mask macro
        #[arg(long, env = "FEATGRAPH_RANGE_POLICY", default_value = "exact")]
        policy: RangePolicy,
    },
    /// Build every module, feature and conditional of a repository file
    Build {
        repository: PathBuf,
        #[arg(long, env = "FEATGRAPH_RANGE_POLICY", default_value = "exact")]
        policy: RangePolicy,
    },
    /// Show which resources satisfy each requirement of a feature
    Providers {
        repository: PathBuf,
        feature: String,
        #[arg(long, env = "FEATGRAPH_RANGE_POLICY", default_value = "exact")]
        policy: RangePolicy,
    },
    /// Manage configurations
    Config {
        /// Configuration store (redb file, or :memory:)
        #[arg(long, env = "FEATGRAPH_STORE", default_value = "featgraph.redb")]
        store: PathBuf,
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Start the management HTTP server
    Serve {
        #[arg(long, env = "FEATGRAPH_STORE", default_value = "featgraph.redb")]
        store: PathBuf,
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port for HTTP API
        #[arg(short, long, default_value_t = 8080)]
        port: u16,
        /// Policy for requests that do not name one
        #[arg(long, env = "FEATGRAPH_RANGE_POLICY", default_value = "exact")]
        policy: RangePolicy,
    },
}

/// Initialize tracing on stderr so stdout stays clean for command output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("featgraph=info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}

async fn serve(
    store: PathBuf,
    bind: String,
    port: u16,
    policy: RangePolicy,
) -> Result<(), CliError> {
    let admin = cli::open_admin(&store)?;
    let app = create_router(AppState::new(admin, policy));

    let address = format!("{bind}:{port}");
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|source| CliError::Io {
            path: PathBuf::from(&address),
            source,
        })?;
    tracing::info!(%address, store = %store.display(), "featgraph server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|source| CliError::Io {
            path: PathBuf::from(&address),
            source,
        })
}

async fn run(args: Cli) -> Result<Option<String>, CliError> {
    let json = args.json;
    let output = match args.command {
        Commands::Range { version, policy } => cli::cmd_range(&version, &policy, json)?,
        Commands::Build { repository, policy } => cli::cmd_build(&repository, &policy, json)?,
        Commands::Providers {
            repository,
            feature,
            policy,
        } => cli::cmd_providers(&repository, &feature, &policy, json)?,
        Commands::Config { store, action } => {
            let facade = ConfigFacade::new(cli::open_admin(&store)?);
            cli::cmd_config(&facade, action, json)?
        }
        Commands::Serve {
            store,
            bind,
            port,
            policy,
        } => {
            serve(store, bind, port, policy).await?;
            return Ok(None);
        }
    };
    Ok(Some(output))
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();
    init_tracing();

    match run(args).await {
        Ok(Some(output)) => {
            if !output.is_empty() {
                println!("{output}");
            }
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(?err, "command failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
