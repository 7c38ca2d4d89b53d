//! SelfhostS3 server: a single-bucket S3-compatible store on the local
//! filesystem.
//!
//! # Usage
//!
//! ```text
//! S3_BUCKET=uploads S3_ACCESS_KEY=AKID S3_SECRET_KEY=secret selfhost-s3
//! ```
//!
//! See [`ENV_HELP`] for the full list of environment variables. `RUST_LOG`,
//! when set, overrides `LOG_LEVEL`.
//!
//! `selfhost-s3 --health-check` probes `/health` on the configured port and
//! exits 0 when the server is healthy, 1 otherwise.

use std::sync::Arc;

use anyhow::{Context, Result};
use selfhost_s3_auth::{Credentials, SignatureValidator};
use selfhost_s3_http::config::{ENV_HELP, S3Config};
use selfhost_s3_http::server::serve;
use selfhost_s3_http::service::{S3HttpConfig, S3HttpService};
use selfhost_s3_storage::{Storage, StorageConfig};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Build the [`StorageConfig`] from the application [`S3Config`].
fn build_storage_config(config: &S3Config) -> StorageConfig {
    StorageConfig::builder()
        .root(config.storage_path.as_str())
        .bucket(config.bucket.as_str())
        .prune_empty_dirs(config.prune_empty_dirs)
        .build()
}

/// Build the signature validator from the configured credential triple.
fn build_validator(config: &S3Config) -> SignatureValidator {
    SignatureValidator::new(Credentials::new(
        config.access_key.as_str(),
        config.secret_key.as_str(),
        config.region.as_str(),
    ))
}

/// Open the store, provision the public directory, and assemble the service.
async fn build_service(config: &S3Config) -> Result<S3HttpService> {
    let storage = Storage::open(build_storage_config(config))
        .await
        .with_context(|| format!("failed to open storage at {}", config.storage_path))?;

    if !config.public_prefix.is_empty() {
        storage
            .ensure_directory(&config.public_prefix)
            .await
            .with_context(|| {
                format!("failed to create public directory {}", config.public_prefix)
            })?;
        info!(public_prefix = %config.public_prefix, "public access enabled");
    }

    Ok(S3HttpService::new(
        Arc::new(storage),
        build_validator(config),
        S3HttpConfig::from(config),
    ))
}

/// Resolve when Ctrl-C is received.
async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    info!("received shutdown signal, draining connections");
}

/// Perform a health check by connecting to the server and requesting `/health`.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request = format!("GET /health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.contains("200 OK") && response.contains(r#""status":"ok""#) {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

/// Load the configuration, or print the variable help and exit.
fn load_config() -> S3Config {
    match S3Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}\n\n{ENV_HELP}");
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --health-check flag for Docker HEALTHCHECK.
    if std::env::args().any(|a| a == "--health-check") {
        let config = load_config();
        let addr = format!("127.0.0.1:{}", config.port);
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    let config = load_config();

    init_tracing(&config.log_level)?;

    info!(
        bucket = %config.bucket,
        storage_path = %config.storage_path,
        region = %config.region,
        max_file_size = config.max_file_size,
        version = VERSION,
        "starting SelfhostS3 server",
    );

    let service = build_service(&config).await?;

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service, shutdown_signal()).await;
    info!("exiting");

    Ok(())
}
