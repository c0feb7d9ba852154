//! Application metrics collection and reporting.

use metrics::{counter, gauge, histogram};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Timings of one completed render, in microseconds.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RenderTimings {
    /// Engine-reported render time.
    pub render_us: u64,
    /// Engine-reported image encode time.
    pub encode_us: u64,
    /// Time spent waiting for the engine lock.
    pub lock_us: u64,
    /// Full round-trip with the engine, as seen from here.
    pub send_us: u64,
}

impl RenderTimings {
    pub fn new(render_us: u64, encode_us: u64, lock_wait: Duration, send: Duration) -> Self {
        Self {
            render_us,
            encode_us,
            lock_us: lock_wait.as_micros() as u64,
            send_us: send.as_micros() as u64,
        }
    }
}

/// Metrics collector for the image API.
#[derive(Debug)]
pub struct MetricsCollector {
    pub image_requests: AtomicU64,
    pub parse_errors: AtomicU64,
    pub engine_errors: AtomicU64,
    pub busy_rejections: AtomicU64,
    pub renders_total: AtomicU64,
    pub image_bytes: AtomicU64,

    render_times: RwLock<TimingStats>,
    encode_times: RwLock<TimingStats>,
    lock_times: RwLock<TimingStats>,
    send_times: RwLock<TimingStats>,

    start_time: Instant,
}

#[derive(Debug, Default)]
struct TimingStats {
    count: u64,
    total_us: u64,
    min_us: u64,
    max_us: u64,
    last_us: u64,
}

impl TimingStats {
    fn record(&mut self, duration_us: u64) {
        self.count += 1;
        self.total_us += duration_us;
        self.last_us = duration_us;
        if self.count == 1 || duration_us < self.min_us {
            self.min_us = duration_us;
        }
        if duration_us > self.max_us {
            self.max_us = duration_us;
        }
    }

    fn summary(&self) -> TimingSummary {
        let avg_ms = if self.count == 0 {
            0.0
        } else {
            (self.total_us as f64 / self.count as f64) / 1000.0
        };
        TimingSummary {
            count: self.count,
            avg_ms,
            min_ms: self.min_us as f64 / 1000.0,
            max_ms: self.max_us as f64 / 1000.0,
            last_ms: self.last_us as f64 / 1000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TimingSummary {
    pub count: u64,
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub last_ms: f64,
}

/// Point-in-time view of the collector, served as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub image_requests: u64,
    pub parse_errors: u64,
    pub engine_errors: u64,
    pub busy_rejections: u64,
    pub renders_total: u64,
    pub image_bytes: u64,
    pub render: TimingSummary,
    pub encode: TimingSummary,
    pub lock_wait: TimingSummary,
    pub round_trip: TimingSummary,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            image_requests: AtomicU64::new(0),
            parse_errors: AtomicU64::new(0),
            engine_errors: AtomicU64::new(0),
            busy_rejections: AtomicU64::new(0),
            renders_total: AtomicU64::new(0),
            image_bytes: AtomicU64::new(0),
            render_times: RwLock::new(TimingStats::default()),
            encode_times: RwLock::new(TimingStats::default()),
            lock_times: RwLock::new(TimingStats::default()),
            send_times: RwLock::new(TimingStats::default()),
            start_time: Instant::now(),
        }
    }

    /// Record an incoming image request
    pub fn record_image_request(&self) {
        self.image_requests.fetch_add(1, Ordering::Relaxed);
        counter!("tapestry_image_requests_total").increment(1);
    }

    /// Record a request rejected for a malformed path
    pub fn record_parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
        counter!("tapestry_parse_errors_total").increment(1);
    }

    /// Record a failed engine round-trip
    pub fn record_engine_error(&self) {
        self.engine_errors.fetch_add(1, Ordering::Relaxed);
        counter!("tapestry_engine_errors_total").increment(1);
    }

    /// Record a request turned away by the admission limit
    pub fn record_busy(&self) {
        self.busy_rejections.fetch_add(1, Ordering::Relaxed);
        counter!("tapestry_busy_rejections_total").increment(1);
    }

    pub fn record_engine_alive(&self, alive: bool) {
        gauge!("tapestry_engine_alive").set(if alive { 1.0 } else { 0.0 });
    }

    /// Record a completed render
    pub async fn record_render(&self, timings: &RenderTimings, image_bytes: usize) {
        self.renders_total.fetch_add(1, Ordering::Relaxed);
        self.image_bytes
            .fetch_add(image_bytes as u64, Ordering::Relaxed);

        counter!("tapestry_renders_total").increment(1);
        counter!("tapestry_image_bytes_total").increment(image_bytes as u64);
        histogram!("tapestry_engine_render_ms").record(timings.render_us as f64 / 1000.0);
        histogram!("tapestry_engine_encode_ms").record(timings.encode_us as f64 / 1000.0);
        histogram!("tapestry_lock_wait_ms").record(timings.lock_us as f64 / 1000.0);
        histogram!("tapestry_round_trip_ms").record(timings.send_us as f64 / 1000.0);

        self.render_times.write().await.record(timings.render_us);
        self.encode_times.write().await.record(timings.encode_us);
        self.lock_times.write().await.record(timings.lock_us);
        self.send_times.write().await.record(timings.send_us);
    }

    pub async fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            image_requests: self.image_requests.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            engine_errors: self.engine_errors.load(Ordering::Relaxed),
            busy_rejections: self.busy_rejections.load(Ordering::Relaxed),
            renders_total: self.renders_total.load(Ordering::Relaxed),
            image_bytes: self.image_bytes.load(Ordering::Relaxed),
            render: self.render_times.read().await.summary(),
            encode: self.encode_times.read().await.summary(),
            lock_wait: self.lock_times.read().await.summary(),
            round_trip: self.send_times.read().await.summary(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
