//! camgate -- authenticated gateway to a date-partitioned camera bucket.
//!
//! Everything the request path needs (credentials, TLS material, the store
//! client) is loaded here before any listener starts. Any failure while
//! loading is fatal.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use clap::Parser;
use tracing::{info, warn};

use camgate::config::{Config, LoggingConfig, TlsConfig};
use camgate::storage::backend::ObjectStore;

/// Command-line arguments for the camgate server.
#[derive(Parser, Debug)]
#[command(
    name = "camgate",
    version,
    about = "Authenticated gateway to a date-partitioned camera bucket"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "camgate.yaml")]
    config: String,

    /// Override the plaintext HTTP port (0 disables it).
    #[arg(long)]
    http_port: Option<u16>,

    /// Override the HTTPS port (0 disables it).
    #[arg(long)]
    https_port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = camgate::config::load_config(&cli.config)?;
    if let Some(port) = cli.http_port {
        config.server.http_port = port;
    }
    if let Some(port) = cli.https_port {
        config.server.https_port = port;
    }

    init_tracing(&config.logging);
    info!("Loaded configuration from {}", cli.config);

    if config.server.http_port == 0 && config.server.https_port == 0 {
        anyhow::bail!("both server.http_port and server.https_port are 0; nothing to serve");
    }

    if config.observability.metrics {
        camgate::metrics::init_metrics()?;
        camgate::metrics::describe_metrics();
        info!("Prometheus metrics initialized");
    }

    let credentials = camgate::auth::CredentialStore::load(&config.auth.passwords_file)?;
    info!(
        "Loaded {} credential(s) from {}",
        credentials.len(),
        config.auth.passwords_file
    );
    if credentials.is_empty() {
        warn!("Credential file is empty; every request will be rejected");
    }

    let storage = build_storage(&config).await?;

    let state = Arc::new(camgate::AppState {
        config: config.clone(),
        credentials,
        storage,
    });
    let app = camgate::server::app(state);

    let handle = Handle::new();
    let mut servers = tokio::task::JoinSet::new();

    if config.server.https_port != 0 {
        let addr = bind_addr(&config.server.host, config.server.https_port)?;
        let tls = load_tls(&config.tls).await?;
        info!("camgate HTTPS listening on {}", addr);
        let server = axum_server::bind_rustls(addr, tls)
            .handle(handle.clone())
            .serve(app.clone().into_make_service_with_connect_info::<SocketAddr>());
        servers.spawn(server);
    }

    if config.server.http_port != 0 {
        let addr = bind_addr(&config.server.host, config.server.http_port)?;
        info!("camgate HTTP listening on {}", addr);
        let server = axum_server::bind(addr)
            .handle(handle.clone())
            .serve(app.into_make_service_with_connect_info::<SocketAddr>());
        servers.spawn(server);
    }

    tokio::spawn(shutdown_signal(
        handle,
        Duration::from_secs(config.server.shutdown_timeout),
    ));

    while let Some(joined) = servers.join_next().await {
        joined.context("listener task panicked")??;
    }

    info!("camgate shut down");

    Ok(())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `logging.level` when set.
fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    if logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Build the configured object store.
async fn build_storage(config: &Config) -> anyhow::Result<Arc<dyn ObjectStore>> {
    match config.storage.backend.as_str() {
        "aws" => {
            let aws_config = config.storage.aws.as_ref().ok_or_else(|| {
                anyhow::anyhow!(
                    "storage.backend is 'aws' but storage.aws config section is missing"
                )
            })?;
            let endpoint_url =
                (!aws_config.endpoint_url.is_empty()).then(|| aws_config.endpoint_url.clone());
            let store = camgate::storage::aws::AwsObjectStore::new(
                aws_config.bucket.clone(),
                aws_config.region.clone(),
                aws_config.prefix.clone(),
                endpoint_url,
                aws_config.use_path_style,
            )
            .await?;
            Ok(Arc::new(store))
        }
        "memory" => {
            let store = match &config.storage.memory {
                Some(memory) => camgate::storage::memory::MemoryStore::load_dir(&memory.root)?,
                None => {
                    warn!("storage.memory.root is not set; the in-memory store is empty");
                    camgate::storage::memory::MemoryStore::new()
                }
            };
            Ok(Arc::new(store))
        }
        other => anyhow::bail!("unknown storage.backend '{other}' (expected 'aws' or 'memory')"),
    }
}

fn bind_addr(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))
}

/// Read certificate, optional chain, and key from disk.
async fn load_tls(tls: &TlsConfig) -> anyhow::Result<RustlsConfig> {
    // Both rustls crypto backends may be linked in; pick one explicitly.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let mut cert = tokio::fs::read(&tls.cert_path)
        .await
        .with_context(|| format!("reading TLS certificate {}", tls.cert_path))?;
    if let Some(chain_path) = &tls.chain_path {
        let chain = tokio::fs::read(chain_path)
            .await
            .with_context(|| format!("reading TLS chain {chain_path}"))?;
        if !cert.ends_with(b"\n") {
            cert.push(b'\n');
        }
        cert.extend_from_slice(&chain);
    }
    let key = tokio::fs::read(&tls.key_path)
        .await
        .with_context(|| format!("reading TLS key {}", tls.key_path))?;

    RustlsConfig::from_pem(cert, key)
        .await
        .context("building TLS configuration")
}

/// Wait for SIGTERM or SIGINT (Ctrl+C), then shut all listeners down gracefully.
async fn shutdown_signal(handle: Handle, timeout: Duration) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT, shutting down");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        },
    }

    handle.graceful_shutdown(Some(timeout));
}
