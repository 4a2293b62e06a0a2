//! StubGate -- HTTP stub-serving gateway backed by cloud object storage.
//!
//! Every startup is a cold start: persisted stub mappings are bulk-loaded
//! from the object store before the listener binds, so the first request
//! already sees a fully populated stub table.

use std::sync::Arc;

use clap::Parser;
use tracing::info;

/// Command-line arguments for the StubGate server.
#[derive(Parser, Debug)]
#[command(
    name = "stubgate",
    version,
    about = "HTTP stub-serving gateway backed by cloud object storage"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "stubgate.example.yaml")]
    config: String,

    /// Override the bind address (host:port).
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = stubgate::config::load_config(&cli.config)?;

    // Initialize tracing / logging per config; RUST_LOG wins when set.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.clone()));
    if config.logging.format == "json" {
        tracing_subscriber::fmt().with_env_filter(env_filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    info!("Loaded configuration from {}", cli.config);

    let bind_addr = cli
        .bind
        .unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port));

    // Initialize Prometheus metrics recorder and register descriptions.
    if config.observability.metrics {
        stubgate::metrics::init_metrics();
        stubgate::metrics::describe_metrics();
        info!("Prometheus metrics initialized");
    }

    // Initialize the storage backend based on config.
    let store: Arc<dyn stubgate::storage::store::ObjectStore> =
        match config.storage.backend.as_str() {
            "aws" => {
                let aws_config = config.storage.aws.as_ref().ok_or_else(|| {
                    anyhow::anyhow!(
                        "storage.backend is 'aws' but storage.aws config section is missing"
                    )
                })?;
                let backend = stubgate::storage::aws::S3ObjectStore::new(
                    aws_config.bucket.clone(),
                    aws_config.region.clone(),
                    aws_config.prefix.clone(),
                    (!aws_config.endpoint_url.is_empty()).then(|| aws_config.endpoint_url.clone()),
                    aws_config.use_path_style,
                    (!aws_config.access_key_id.is_empty()).then(|| aws_config.access_key_id.clone()),
                    (!aws_config.secret_access_key.is_empty())
                        .then(|| aws_config.secret_access_key.clone()),
                )
                .await?;
                Arc::new(backend)
            }
            "azure" => {
                let azure_config = config.storage.azure.as_ref().ok_or_else(|| {
                    anyhow::anyhow!(
                        "storage.backend is 'azure' but storage.azure config section is missing"
                    )
                })?;
                let backend = stubgate::storage::azure::AzureObjectStore::new(
                    azure_config.container.clone(),
                    azure_config.account.clone(),
                    azure_config.prefix.clone(),
                )
                .await?;
                Arc::new(backend)
            }
            "memory" => {
                info!("Memory storage backend initialized (state will not survive restarts)");
                Arc::new(stubgate::storage::memory::MemoryObjectStore::new())
            }
            other => {
                anyhow::bail!("unknown storage.backend '{other}' (expected memory, aws, or azure)")
            }
        };

    let state = Arc::new(stubgate::AppState::new(config.clone(), store.clone()));

    // Seed default mappings, restored on reset.
    if !config.engine.seed_dir.is_empty() {
        let seeded = stubgate::stores::loader::load_seed_mappings(
            std::path::Path::new(&config.engine.seed_dir),
            &state.engine,
        )
        .await;
        info!("Seeded {seeded} default stub mapping(s)");
    }

    // Cold-start blocking load: the stub table must be fully populated
    // before the first request is served.
    let summary = stubgate::stores::loader::MappingsLoader::new(store)
        .with_concurrency(config.engine.load_concurrency)
        .load_into(&state.engine)
        .await;
    if config.observability.metrics {
        stubgate::metrics::record_mappings_loaded(summary.loaded);
    }

    let app = stubgate::server::app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("StubGate listening on {}", bind_addr);

    // Graceful shutdown: on SIGTERM/SIGINT, stop accepting new
    // connections, wait for in-flight requests, then exit.  No cleanup --
    // durable state already lives in the object store.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("StubGate shut down");

    Ok(())
}

/// Wait for SIGTERM or SIGINT (Ctrl+C), then return to trigger graceful
/// shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        },
    }
}
