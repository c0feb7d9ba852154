//! Mock rendering engine.
//!
//! Speaks the engine protocol on stdin/stdout so the API server can run
//! without the real renderer. Like the real engine it takes no arguments;
//! behavior is configured through the environment. Logs go to stderr.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use test_utils::{MockEngine, MockPayload};
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "mock-engine")]
#[command(about = "Stand-in for the tapestry rendering engine")]
struct Args {
    /// Image payload returned for each request
    #[arg(long, value_enum, default_value_t = MockPayload::Jpeg, env = "MOCK_ENGINE_PAYLOAD")]
    payload: MockPayload,

    /// Simulated render time per request, in milliseconds
    #[arg(long, env = "MOCK_ENGINE_DELAY_MS")]
    delay_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut engine = MockEngine::new().with_payload(args.payload);
    if let Some(ms) = args.delay_ms {
        engine = engine.with_delay(Duration::from_millis(ms));
    }

    info!(payload = ?args.payload, "Mock engine ready");

    let served = engine
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;

    info!(served, "Input closed, exiting");
    Ok(())
}
