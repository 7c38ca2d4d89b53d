//! End-to-end tests for the SelfhostS3 server.
//!
//! Each test starts an in-process server on an ephemeral port over a fresh
//! temporary directory, then drives it with `aws-sdk-s3` or plain `reqwest`.
//!
//! ```text
//! cargo test -p selfhost-s3-integration
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Once};

use aws_sdk_s3::config::{
    BehaviorVersion, Credentials, Region, RequestChecksumCalculation, ResponseChecksumValidation,
};
use selfhost_s3_auth::SignatureValidator;
use selfhost_s3_http::server::serve;
use selfhost_s3_http::service::{S3HttpConfig, S3HttpService};
use selfhost_s3_storage::{Storage, StorageConfig};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Bucket served by every test server.
pub const BUCKET: &str = "test-bucket";
/// Access key accepted by every test server.
pub const ACCESS_KEY: &str = "test-access";
/// Secret key accepted by every test server.
pub const SECRET_KEY: &str = "test-secret";
/// Signing region.
pub const REGION: &str = "us-east-1";

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// An in-process server over a temporary storage root. Shuts down on drop.
#[derive(Debug)]
pub struct TestServer {
    addr: SocketAddr,
    root: TempDir,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    /// Start a server with default settings and the `public/` prefix.
    pub async fn start() -> Self {
        Self::start_with(S3HttpConfig::builder().public_prefix("public/").build()).await
    }

    /// Start a server with the given request-handling settings.
    pub async fn start_with(config: S3HttpConfig) -> Self {
        init_tracing();

        let root = TempDir::new().expect("create temp dir");
        let storage = Storage::open(
            StorageConfig::builder()
                .root(root.path())
                .bucket(BUCKET)
                .build(),
        )
        .await
        .expect("open storage");
        let validator = SignatureValidator::new(selfhost_s3_auth::Credentials::new(
            ACCESS_KEY, SECRET_KEY, REGION,
        ));
        let service = S3HttpService::new(Arc::new(storage), validator, config);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(serve(listener, service, async {
            rx.await.ok();
        }));

        Self {
            addr,
            root,
            shutdown: Some(tx),
        }
    }

    /// Base URL, e.g. `http://127.0.0.1:54321`.
    #[must_use]
    pub fn endpoint_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// URL of `key` in the test bucket.
    #[must_use]
    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{BUCKET}/{key}", self.endpoint_url())
    }

    /// The bucket directory on disk.
    #[must_use]
    pub fn bucket_dir(&self) -> PathBuf {
        self.root.path().join(BUCKET)
    }

    /// An S3 client signing with the server's credentials.
    #[must_use]
    pub fn s3_client(&self) -> aws_sdk_s3::Client {
        self.s3_client_with(ACCESS_KEY, SECRET_KEY)
    }

    /// An S3 client signing with arbitrary credentials.
    #[must_use]
    pub fn s3_client_with(&self, access_key: &str, secret_key: &str) -> aws_sdk_s3::Client {
        let creds = Credentials::new(access_key, secret_key, None, None, "selfhost-s3-test");

        let config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(REGION))
            .credentials_provider(creds)
            .endpoint_url(self.endpoint_url())
            .force_path_style(true)
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .response_checksum_validation(ResponseChecksumValidation::WhenRequired)
            .build();

        aws_sdk_s3::Client::from_conf(config)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

mod test_auth;
mod test_http;
mod test_list;
mod test_object;
