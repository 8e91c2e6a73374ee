//! Reel pipeline worker binary.

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reel_media::{check_ffmpeg, check_ffprobe, FfmpegRunner};
use reel_storage::{ObjectStore, R2Client, R2Config};
use reel_store::RedisJobRepository;
use reel_voice::ElevenLabsClient;
use reel_worker::{Backends, ReelService, WorkerConfig};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    if let Err(e) = run().await {
        error!("Worker error: {:#}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}

fn init_tracing() {
    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reel_worker=info,reel_media=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn run() -> anyhow::Result<()> {
    info!("Starting reel-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    if let Some(port) = std::env::var("METRICS_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
    {
        reel_worker::metrics::init_metrics(port).context("installing metrics exporter")?;
        info!("Serving metrics on port {}", port);
    }

    match check_ffmpeg() {
        Ok(path) => info!("Using ffmpeg at {}", path.display()),
        Err(e) => warn!("{}; tone fallback and encoding will fail", e),
    }
    if let Err(e) = check_ffprobe() {
        warn!("{}; finished reels will not be probed", e);
    }

    let repo = RedisJobRepository::from_env().context("creating job store")?;
    repo.ping().await.context("connecting to Redis")?;

    let voice = ElevenLabsClient::from_env().context("creating voice client")?;
    if voice.config().api_key.is_none() {
        warn!("ELEVENLABS_API_KEY not set; every job will use fallback audio");
    }

    let runner = FfmpegRunner::new().with_timeout(config.encode_timeout.as_secs());

    let mut backends = Backends::new(Arc::new(repo), Arc::new(voice), Arc::new(runner));

    match R2Config::from_env() {
        Ok(r2_config) => {
            let key_prefix = r2_config.key_prefix.clone();
            let client = R2Client::new(r2_config).await.context("creating R2 client")?;
            if let Err(e) = client.check_connectivity().await {
                warn!("{}; uploads will be retried per job", e);
            }
            let store: Arc<dyn ObjectStore> = Arc::new(client);
            backends = backends.with_store(store, key_prefix);
        }
        Err(e) => warn!("Object storage disabled ({}); reels stay local", e),
    }

    let service = ReelService::new(config, backends);
    service.init().await.context("preparing work directory")?;

    let poller = Arc::new(service.poller());
    let loop_poller = Arc::clone(&poller);
    let mut poll_task = tokio::spawn(async move { loop_poller.run().await });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, finishing in-flight job");
            poller.shutdown();
        }
        result = &mut poll_task => {
            result.context("poll loop panicked")??;
            return Ok(());
        }
    }

    let grace = service.config().shutdown_timeout;
    match tokio::time::timeout(grace, poll_task).await {
        Ok(result) => result.context("poll loop panicked")??,
        Err(_) => warn!("In-flight job did not finish within {:?}", grace),
    }

    Ok(())
}
