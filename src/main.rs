use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

mod config;
mod handlers;
mod middleware;
mod sampler;
mod server;
mod telemetry;

use config::{Config, SamplingMode};
use sampler::Sampler;
use telemetry::SampleStore;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Rolling window of samples — the sampler writes, handlers read.
    pub store: Arc<SampleStore>,

    /// Outbound telemetry client, shared with the background task.
    pub sampler: Arc<Sampler>,

    /// Whether handlers fetch before answering.
    pub sampling: SamplingMode,
}

impl AppState {
    pub fn new(store: Arc<SampleStore>, sampler: Arc<Sampler>, sampling: SamplingMode) -> Self {
        Self {
            store,
            sampler,
            sampling,
        }
    }

    /// Best-effort fetch ahead of a query, only in on-request mode.
    pub async fn sample_on_request(&self) {
        if self.sampling == SamplingMode::OnRequest {
            self.sampler.sample_into(&self.store).await;
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!();
    println!("╔══════════════════════════════════════════════════╗");
    println!("║   🛰   ALTITUDE MONITOR                          ║");
    println!("╚══════════════════════════════════════════════════╝");
    println!();

    // ── 1. Load configuration ────────────────────────────────────
    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("❌ Invalid configuration: {e}");
        std::process::exit(1);
    });

    // ── 2. Build the outbound client ─────────────────────────────
    let sampler = Sampler::new(&config.sampler).unwrap_or_else(|e| {
        eprintln!("❌ Cannot build HTTP client: {e}");
        std::process::exit(1);
    });
    tracing::info!(
        url = sampler.url(),
        timeout = ?config.sampler.timeout,
        retries = config.sampler.retries,
        "telemetry source configured"
    );

    // ── 3. Build shared state ────────────────────────────────────
    let state = Arc::new(AppState::new(
        Arc::new(SampleStore::new(config.store_capacity)),
        Arc::new(sampler),
        config.sampling,
    ));

    // ── 4. Start the background sampler ──────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sampler_handle = match config.sampling {
        SamplingMode::Interval(period) => Some(tokio::spawn(sampler::run(
            state.sampler.clone(),
            state.store.clone(),
            period,
            shutdown_rx,
        ))),
        SamplingMode::OnRequest => {
            tracing::info!("sampling on request; no background task");
            None
        }
    };

    // ── 5. Build Axum router ─────────────────────────────────────
    let app = server::create_router(state);

    // ── 6. Bind & serve ──────────────────────────────────────────
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            eprintln!("❌ Failed to bind to {addr}: {e}");
            std::process::exit(1);
        });

    println!("Server listening on http://localhost:{}", config.port);
    println!("Stats   → http://localhost:{}/stats", config.port);
    println!("Health  → http://localhost:{}/health", config.port);
    println!();

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("server exited with error: {e}");
    }

    // ── 7. Stop the sampler ──────────────────────────────────────
    let _ = shutdown_tx.send(true);
    if let Some(handle) = sampler_handle {
        // Ignore JoinError — the task may have already finished
        let _ = handle.await;
    }
    tracing::info!("shut down");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("cannot listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("ctrl-c received, draining requests");
}
