use std::{net::SocketAddr, sync::Arc};

use chat_relay::{
    config::Settings,
    logging::init_logging,
    routes::{self, assets},
    services::{backend::build_backend, keep_alive},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _log_guard = init_logging(&settings.log_file)?;
    tracing::info!(?settings, "configuration loaded");

    let backend = build_backend(&settings)?;
    let state = Arc::new(AppState::from_settings(backend, &settings));

    assets::check_bundle(&settings.static_dir);

    let app = routes::create_router(&settings.static_dir)
        .with_state(state)
        .layer(routes::cors_layer(&settings.cors_origins));

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("chat relay listening on http://{addr}");

    let pinger = keep_alive::spawn(settings.self_url.clone(), settings.keep_alive_interval);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pinger.shutdown().await;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
