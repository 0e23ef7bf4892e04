mod config;
mod exec;
mod handler;
mod hooks;

use std::net::SocketAddr;
use std::sync::Arc;

use config::DispatcherConfig;
use handler::AppState;

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let json = std::env::var("CAGE_LOG_JSON")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(filter));

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Arc::new(DispatcherConfig::from_env());
    tracing::info!(version = %config.version, workspace_root = %config.workspace_root, "starting yolo-cage dispatcher");

    let state = AppState {
        registry: cage_core::Registry::new(),
        config,
    };

    let app = handler::router(state);

    let addr: SocketAddr = std::env::var("CAGE_DISPATCHER_BIND")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080)));

    tracing::info!(%addr, "dispatcher listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
