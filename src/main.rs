//! Blindstick dashboard server.
//!
//! Polls the device store, forwards emergencies to Telegram and serves the
//! dashboard view.
//!
//! # API Endpoints
//!
//! - `GET /api/snapshot` - Latest dashboard view
//! - `GET /api/alerts/history` - Alert feed
//! - `POST /api/refresh` - Poll the store now
//! - `GET /health` - Health check

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use blindstick::api::{self, AppState};
use blindstick::config::Config;
use blindstick::dashboard::DashboardView;
use blindstick::monitor::Monitor;
use blindstick::notifier::EmergencyNotifier;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing with environment filter
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("blindstick=info".parse()?))
        .init();

    let config = Config::from_env();
    info!(
        port = config.port,
        poll_secs = config.poll_interval.as_secs(),
        cooldown_secs = config.cooldown.as_secs(),
        "Starting Blindstick dashboard"
    );

    let store = config.build_store().await?;
    let channel = config.build_channel();

    let view = Arc::new(RwLock::new(DashboardView::placeholder(Utc::now())));
    let notifier = EmergencyNotifier::new(channel).with_cooldown(config.cooldown_delta());
    let (monitor, monitor_task) = Monitor::new(store, notifier, view.clone())
        .with_poll_interval(config.poll_interval)
        .spawn();

    let app = api::router(AppState { view, monitor });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Blindstick is listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    monitor_task.abort();

    Ok(())
}
