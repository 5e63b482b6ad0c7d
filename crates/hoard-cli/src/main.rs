use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hoard_core::impls::{InMemoryObjectStore, S3ObjectStore};
use hoard_core::ports::ObjectStore;
use hoard_core::{Dispatcher, OutcomeCounts, SinkRegistry, StoreConfig, UploadCoordinator, UploaderConfig};

/// hoard - upload captured artifacts to S3 exactly once
#[derive(Parser)]
#[command(name = "hoard")]
#[command(about = "Content-addressed, deduplicating artifact uploader", long_about = None)]
#[command(version)]
struct Cli {
    /// Target bucket
    #[arg(long, env = "HOARD_S3_BUCKET", default_value = "")]
    bucket: String,

    /// Bucket region
    #[arg(long, env = "HOARD_S3_REGION", default_value = "")]
    region: String,

    /// Custom endpoint for S3-compatible stores
    #[arg(long, env = "HOARD_S3_ENDPOINT")]
    endpoint: Option<String>,

    /// Skip TLS certificate verification (not supported; refused at startup)
    #[arg(long)]
    no_verify: bool,

    #[arg(long, env = "HOARD_S3_ACCESS_KEY_ID")]
    access_key_id: Option<String>,

    #[arg(long, env = "HOARD_S3_SECRET_ACCESS_KEY", hide_env_values = true)]
    secret_access_key: Option<String>,

    /// Timeout for each existence check / write, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Maximum concurrent store calls (0 = unbounded)
    #[arg(long, default_value_t = 16)]
    max_in_flight: usize,

    /// Allow concurrent uploads of the same key
    #[arg(long)]
    no_single_flight: bool,

    /// Use an in-memory store instead of S3 (no network)
    #[arg(long)]
    dry_run: bool,

    /// Newline-delimited JSON event records (defaults to stdin)
    #[arg(long)]
    input: Option<PathBuf>,
}

impl Cli {
    fn store_config(&self) -> StoreConfig {
        StoreConfig {
            bucket: self.bucket.clone(),
            region: self.region.clone(),
            endpoint: self.endpoint.clone(),
            verify: !self.no_verify,
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
            operation_timeout_secs: self.timeout_secs,
        }
    }

    fn uploader_config(&self) -> UploaderConfig {
        UploaderConfig {
            single_flight: !self.no_single_flight,
        }
    }
}

async fn build_store(cli: &Cli, config: &StoreConfig) -> Result<Arc<dyn ObjectStore>> {
    if cli.dry_run {
        let bucket = if config.bucket.is_empty() { "dry-run" } else { config.bucket.as_str() };
        tracing::info!("Dry run: artifacts are kept in memory (bucket={})", bucket);
        return Ok(Arc::new(InMemoryObjectStore::new(bucket)));
    }

    let store = S3ObjectStore::connect(config)
        .await
        .context("invalid object store configuration")?;
    tracing::info!("S3 bucket: {}", config.bucket);
    if let Some(endpoint) = &config.endpoint {
        tracing::info!("S3 endpoint: {}", endpoint);
    }
    store.probe().await;
    Ok(Arc::new(store))
}

/// 1 行 = 1 record。読み終わったら in-flight の upload を全部待つ
async fn pump<R: AsyncBufRead + Unpin>(reader: R, mut dispatcher: Dispatcher) -> Result<OutcomeCounts> {
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.context("failed to read event records")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        dispatcher.submit_json(line);
    }

    tracing::info!("Input exhausted, waiting for {} in-flight uploads", dispatcher.in_flight());
    Ok(dispatcher.drain().await)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = cli.store_config();
    let store = build_store(&cli, &config).await?;

    let coordinator = UploadCoordinator::with_config(store, &cli.uploader_config());
    let mut registry = SinkRegistry::new();
    registry.register(Arc::new(coordinator))?;
    tracing::info!("Registered sinks: {:?}", registry.names());
    let dispatcher = Dispatcher::new(Arc::new(registry)).with_max_in_flight(cli.max_in_flight);

    let counts = match &cli.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?;
            pump(BufReader::new(file), dispatcher).await?
        }
        None => pump(BufReader::new(tokio::io::stdin()), dispatcher).await?,
    };

    tracing::info!("Processed {} artifact events", counts.handled());
    // stdout には集計だけを出す（ログは stderr）
    println!("{}", serde_json::to_string(&counts)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn cli_maps_flags_onto_store_config() {
        let cli = Cli::parse_from([
            "hoard",
            "--bucket",
            "artifacts",
            "--region",
            "eu-west-1",
            "--endpoint",
            "http://localhost:9000",
            "--no-verify",
            "--timeout-secs",
            "30",
        ]);
        let cfg = cli.store_config();
        assert_eq!(cfg.bucket, "artifacts");
        assert_eq!(cfg.endpoint.as_deref(), Some("http://localhost:9000"));
        assert!(!cfg.verify);
        assert_eq!(cfg.operation_timeout(), Some(Duration::from_secs(30)));
        assert!(cli.uploader_config().single_flight);
    }

    #[tokio::test]
    async fn no_verify_fails_before_any_upload() {
        let cli = Cli::parse_from(["hoard", "--bucket", "artifacts", "--region", "us-east-1", "--no-verify"]);
        let err = build_store(&cli, &cli.store_config()).await.err().unwrap();
        assert!(format!("{err:#}").contains("verify"));
    }

    #[tokio::test]
    async fn dry_run_pumps_records_through_memory_store() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        std::fs::write(&file, b"payload").unwrap();

        let input = format!(
            "{}\n\n{}\n",
            serde_json::json!({"eventid": "cowrie.session.file_download", "shasum": "abc", "outfile": file}),
            serde_json::json!({"eventid": "cowrie.session.connect"}),
        );

        let cli = Cli::parse_from(["hoard", "--dry-run"]);
        let store = build_store(&cli, &cli.store_config()).await.unwrap();
        let mut registry = SinkRegistry::new();
        registry
            .register(Arc::new(UploadCoordinator::new(store)))
            .unwrap();

        let counts = pump(input.as_bytes(), Dispatcher::new(Arc::new(registry)))
            .await
            .unwrap();
        assert_eq!(counts.uploaded, 1);
        assert_eq!(counts.ignored, 1);
        assert_eq!(counts.malformed, 0);
    }
}
