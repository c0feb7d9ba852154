//! Volume rendering HTTP service.
//!
//! Serves `GET /image/<path>` by forwarding each request to a single
//! long-lived rendering engine over its stdin/stdout.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use tapestry_api::config::{ImageFormat, ServiceConfig};
use tapestry_api::engine::EngineChannel;
use tapestry_api::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "tapestry-api")]
#[command(about = "Volume rendering image server")]
struct Args {
    /// Rendering engine executable, launched once with no arguments
    #[arg(long, default_value = "tapestryEngine", env = "ENGINE_EXECUTABLE")]
    engine_executable: PathBuf,

    /// Bind address
    #[arg(long, default_value = "0.0.0.0", env = "TAPESTRY_BIND")]
    bind: String,

    /// Listen port
    #[arg(short, long, default_value_t = 8080, env = "TAPESTRY_PORT")]
    port: u16,

    /// Enable debug logging
    #[arg(long, env = "TAPESTRY_DEBUG")]
    debug: bool,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Number of tokio worker threads (default: number of CPU cores)
    #[arg(long, env = "TAPESTRY_WORKER_THREADS")]
    worker_threads: Option<usize>,

    /// Codec the engine produces
    #[arg(long, value_enum, default_value_t = ImageFormat::Jpeg, env = "TAPESTRY_IMAGE_FORMAT")]
    image_format: ImageFormat,

    /// Renders allowed to wait for the engine before answering 503
    #[arg(long, env = "TAPESTRY_MAX_PENDING_RENDERS")]
    max_pending_renders: Option<usize>,
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder.build()?;
    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<()> {
    // Initialize tracing
    let filter = if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;

    info!(
        engine = %args.engine_executable.display(),
        image_format = ?args.image_format,
        max_pending_renders = ?args.max_pending_renders,
        "Starting tapestry API server"
    );

    let channel = EngineChannel::spawn(&args.engine_executable)
        .with_context(|| format!("failed to start engine {}", args.engine_executable.display()))?;

    let config = ServiceConfig {
        image_format: args.image_format,
        max_pending_renders: args.max_pending_renders,
    };
    let state = Arc::new(AppState::new(channel, &config));

    let app = tapestry_api::router(state, prometheus_handle);

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", args.bind, args.port))?;
    info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
