//! Financial Instrument Transformer
//!
//! Serves financial instruments built from the latest FactSet extract.

use clap::Parser;
use infra_master::telemetry::describe_metrics;
use metrics_exporter_prometheus::PrometheusBuilder;
use service_transformer::config::{build_config, CliArgs as ConfigCliArgs, LogFormat};
use service_transformer::server::Server;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Financial Instrument Transformer - REST API over FactSet security master extracts
#[derive(Parser, Debug)]
#[command(name = "service_transformer")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (TOML format)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Host address to bind to
    #[arg(long, env = "FI_TRANSFORMER_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "FI_TRANSFORMER_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "FI_TRANSFORMER_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (text, json)
    #[arg(long, env = "FI_TRANSFORMER_LOG_FORMAT")]
    log_format: Option<String>,

    /// Prefix of the apiUrl values in instrument listings
    #[arg(long, env = "FI_TRANSFORMER_BASE_URL")]
    base_url: Option<String>,

    /// Port of the Prometheus metrics exporter
    #[arg(long, env = "FI_TRANSFORMER_METRICS_PORT")]
    metrics_port: Option<u16>,

    /// Resource loader (fs, http)
    #[arg(long, env = "FI_TRANSFORMER_LOADER")]
    loader: Option<String>,

    /// Bucket name for the http loader
    #[arg(long, env = "FI_TRANSFORMER_BUCKET_NAME")]
    bucket_name: Option<String>,

    /// Object store endpoint for the http loader
    #[arg(long, env = "FI_TRANSFORMER_BUCKET_ENDPOINT")]
    bucket_endpoint: Option<String>,

    /// Bucket directory for the fs loader
    #[arg(long, env = "FI_TRANSFORMER_BUCKET_ROOT", value_name = "DIR")]
    bucket_root: Option<PathBuf>,

    /// Read each folder's resources out of its weekly.zip archive
    #[arg(long, env = "FI_TRANSFORMER_BUNDLE")]
    bundle: bool,

    /// Extract layout (current, legacy)
    #[arg(long, env = "FI_TRANSFORMER_SCHEMA")]
    schema: Option<String>,
}

impl From<Args> for ConfigCliArgs {
    fn from(args: Args) -> Self {
        ConfigCliArgs {
            config_file: args.config,
            host: args.host,
            port: args.port,
            log_level: args.log_level,
            log_format: args.log_format,
            base_url: args.base_url,
            metrics_port: args.metrics_port,
            loader: args.loader,
            bucket_name: args.bucket_name,
            bucket_endpoint: args.bucket_endpoint,
            bucket_root: args.bucket_root,
            bundle: args.bundle,
            schema: args.schema,
        }
    }
}

fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let cli_args: ConfigCliArgs = args.into();
    let config = build_config(&cli_args)?;

    // Initialize tracing
    init_tracing(config.log_level.as_filter_str(), config.log_format);

    tracing::info!("Financial Instrument Transformer v{}", service_transformer::VERSION);
    tracing::info!(
        host = %config.host,
        port = %config.port,
        log_level = %config.log_level,
        loader = %config.loader,
        bundle = config.bundle,
        schema = %config.schema,
        public_entity_filter = %config.public_entity_filter,
        "Service configuration loaded"
    );

    if let Some(port) = config.metrics_port {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], port))
            .install()?;
        describe_metrics();
        tracing::info!(port, "Prometheus exporter listening");
    }

    // Create and start the server
    let server = Server::new(config);
    tracing::info!(address = %server.socket_addr()?, "Starting server");

    server.run().await?;

    Ok(())
}
