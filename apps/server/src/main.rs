//! FeatureLens HTTP server.
//!
//! Exposes `POST /analyze`: fetch a repository's source files, filter and
//! assemble them into a prompt context, and return the model's categorized
//! feature inventory.

mod routes;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use tracing::info;

use featurelens_shared::{Credentials, load_config, load_config_from};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// FeatureLens — repository feature inventory service.
#[derive(Parser)]
#[command(
    name = "featurelens-server",
    version,
    about = "Analyze a repository's user-facing features through an LLM.",
    long_about = None,
)]
struct Cli {
    /// Socket address to bind (overrides the config file).
    #[arg(long)]
    bind: Option<String>,

    /// Path to a config file (defaults to ~/.featurelens/featurelens.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text")]
    log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "featurelens=info",
        1 => "featurelens=debug",
        _ => "featurelens=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    // Missing credentials abort startup, not the first request.
    let credentials = Credentials::from_env(&config)?;

    let bind = cli.bind.unwrap_or_else(|| config.server.bind.clone());

    info!(
        %bind,
        allow_origin = %config.server.allow_origin,
        model = %config.openai.model,
        assembly_mode = %config.assembly.mode,
        "starting featurelens server"
    );

    let app = routes::router(config, credentials)?;

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .map_err(|e| eyre!("cannot bind {bind}: {e}"))?;

    axum::serve(listener, app).await?;
    Ok(())
}
