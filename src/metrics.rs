//! Prometheus-compatible metrics endpoint
//!
//! Default endpoint: http://localhost:9090/metrics

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};

/// Rolling window for tick percentiles
const TICK_HISTORY: usize = 1000;

/// Metrics registry for the game server
#[derive(Debug)]
pub struct Metrics {
    // Lobby
    pub rooms_active: AtomicU64,
    pub rooms_created: AtomicU64,
    pub players_queued: AtomicU64,
    pub players_in_game: AtomicU64,

    // Tick timing (microseconds), across all rooms
    pub tick_time_us: AtomicU64,
    pub tick_time_p95_us: AtomicU64,
    pub tick_time_p99_us: AtomicU64,
    pub tick_time_max_us: AtomicU64,
    pub tick_count: AtomicU64,

    // Network
    pub connections_active: AtomicU64,
    pub snapshots_sent: AtomicU64,
    pub messages_sent: AtomicU64,
    pub messages_received: AtomicU64,

    start_time: Instant,
    tick_history: RwLock<VecDeque<u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            rooms_active: AtomicU64::new(0),
            rooms_created: AtomicU64::new(0),
            players_queued: AtomicU64::new(0),
            players_in_game: AtomicU64::new(0),
            tick_time_us: AtomicU64::new(0),
            tick_time_p95_us: AtomicU64::new(0),
            tick_time_p99_us: AtomicU64::new(0),
            tick_time_max_us: AtomicU64::new(0),
            tick_count: AtomicU64::new(0),
            connections_active: AtomicU64::new(0),
            snapshots_sent: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            start_time: Instant::now(),
            tick_history: RwLock::new(VecDeque::with_capacity(TICK_HISTORY)),
        }
    }

    /// Record a tick time and update percentiles
    pub fn record_tick_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.tick_time_us.store(us, Ordering::Relaxed);
        self.tick_count.fetch_add(1, Ordering::Relaxed);

        let mut history = self.tick_history.write();
        if history.len() == TICK_HISTORY {
            history.pop_front();
        }
        history.push_back(us);
        if history.len() < 10 {
            return;
        }

        let mut sorted: Vec<u64> = history.iter().copied().collect();
        drop(history);
        sorted.sort_unstable();
        self.tick_time_p95_us.store(percentile(&sorted, 0.95), Ordering::Relaxed);
        self.tick_time_p99_us.store(percentile(&sorted, 0.99), Ordering::Relaxed);
        self.tick_time_max_us.store(percentile(&sorted, 1.0), Ordering::Relaxed);
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(2048);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        metric!("sea_turtle_rooms_active", "Rooms currently registered", "gauge",
            self.rooms_active.load(Ordering::Relaxed));
        metric!("sea_turtle_rooms_created_total", "Rooms created since start", "counter",
            self.rooms_created.load(Ordering::Relaxed));
        metric!("sea_turtle_players_queued", "Players waiting for a match", "gauge",
            self.players_queued.load(Ordering::Relaxed));
        metric!("sea_turtle_players_in_game", "Players assigned to a room", "gauge",
            self.players_in_game.load(Ordering::Relaxed));

        metric!("sea_turtle_tick_time_microseconds", "Last room tick time in microseconds", "gauge",
            self.tick_time_us.load(Ordering::Relaxed));
        metric!("sea_turtle_tick_time_p95_microseconds", "95th percentile tick time", "gauge",
            self.tick_time_p95_us.load(Ordering::Relaxed));
        metric!("sea_turtle_tick_time_p99_microseconds", "99th percentile tick time", "gauge",
            self.tick_time_p99_us.load(Ordering::Relaxed));
        metric!("sea_turtle_tick_time_max_microseconds", "Maximum tick time in window", "gauge",
            self.tick_time_max_us.load(Ordering::Relaxed));
        metric!("sea_turtle_tick_count", "Total room ticks processed", "counter",
            self.tick_count.load(Ordering::Relaxed));

        metric!("sea_turtle_connections_active", "Active WebTransport connections", "gauge",
            self.connections_active.load(Ordering::Relaxed));
        metric!("sea_turtle_snapshots_sent_total", "Game state broadcasts", "counter",
            self.snapshots_sent.load(Ordering::Relaxed));
        metric!("sea_turtle_messages_sent_total", "Total messages sent", "counter",
            self.messages_sent.load(Ordering::Relaxed));
        metric!("sea_turtle_messages_received_total", "Total messages received", "counter",
            self.messages_received.load(Ordering::Relaxed));
        metric!("sea_turtle_uptime_seconds", "Server uptime in seconds", "counter",
            self.uptime_seconds());

        output
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Start the metrics HTTP server
pub async fn start_metrics_server(metrics: Arc<Metrics>, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Metrics server listening on http://{}/metrics", addr);

    loop {
        let (mut socket, peer) = listener.accept().await?;
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 1024];
            let n = match socket.read(&mut buffer).await {
                Ok(0) => return,
                Ok(n) => n,
                Err(e) => {
                    debug!("Failed to read from metrics socket {}: {}", peer, e);
                    return;
                }
            };

            let request = String::from_utf8_lossy(&buffer[..n]);
            let response = respond(&request, &metrics);
            if let Err(e) = socket.write_all(response.as_bytes()).await {
                debug!("Failed to write metrics response to {}: {}", peer, e);
            }
        });
    }
}

/// Value at quantile `q` of an ascending slice
fn percentile(sorted: &[u64], q: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let idx = ((sorted.len() as f64 * q) as usize).min(sorted.len() - 1);
    sorted[idx]
}

/// HTTP response for a raw request; only `GET /metrics` is served
fn respond(request: &str, metrics: &Metrics) -> String {
    let is_metrics = request
        .lines()
        .next()
        .map(|line| line.split_whitespace().take(2).eq(["GET", "/metrics"]))
        .unwrap_or(false);

    if !is_metrics {
        return "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string();
    }

    let body = metrics.to_prometheus();
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain; version=0.0.4\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    )
}
