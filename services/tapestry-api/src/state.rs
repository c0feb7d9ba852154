//! Application state shared across handlers.

use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tracing::info;

use crate::config::{ImageFormat, ServiceConfig};
use crate::engine::{EngineChannel, EngineLiveness};
use crate::metrics::MetricsCollector;

/// Shared application state.
pub struct AppState {
    /// The single engine channel. Held for one full round-trip at a time.
    pub engine: Arc<Mutex<EngineChannel>>,
    /// Readable without taking the engine lock.
    pub engine_liveness: EngineLiveness,
    /// Bounds renders waiting for or holding the engine.
    pub admission: Option<Arc<Semaphore>>,
    pub image_format: ImageFormat,
    pub metrics: MetricsCollector,
}

impl AppState {
    pub fn new(channel: EngineChannel, config: &ServiceConfig) -> Self {
        let engine_liveness = channel.liveness();

        let admission = config.max_pending_renders.map(|permits| {
            info!(permits, "Render admission limit enabled");
            Arc::new(Semaphore::new(permits))
        });

        let metrics = MetricsCollector::new();
        metrics.record_engine_alive(engine_liveness.is_alive());

        Self {
            engine: Arc::new(Mutex::new(channel)),
            engine_liveness,
            admission,
            image_format: config.image_format,
            metrics,
        }
    }
}
