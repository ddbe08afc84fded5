use std::net::SocketAddr;

use anyhow::Context;
use axum::{Router, middleware, routing::get};
use kards_api::{
    ApiConfig, ApiState, metrics,
    middleware::{
        cors::create_cors_layer, request_id::request_id_middleware,
        security_headers::apply_security_headers,
    },
    router::router,
    tracing::init_tracing,
};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the variables may come from the environment
    dotenvy::dotenv().ok();
    let config = ApiConfig::from_env()?;
    init_tracing(&config.env);

    kards_db::ensure_database(&config.database_url).await?;
    let pool = kards_db::create_pool(&config.database_url, config.db_max_connections).await?;
    kards_db::migrate(&pool).await?;
    tracing::info!(
        max_connections = config.db_max_connections,
        "Database ready"
    );

    let state = ApiState::new(&config, pool.clone());

    let mut app: Router<ApiState> = router();
    if config.metrics_enabled {
        let handle = metrics::init_metrics()?;
        app = app.merge(
            Router::new()
                .route("/metrics", get(metrics::metrics_handler))
                .with_state(handle),
        );
        tracing::info!("Prometheus metrics exposed at /metrics");
    }

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let app = app
        .with_state(state)
        .layer(create_cors_layer(&config.allowed_origins))
        .layer(trace_layer)
        .layer(middleware::from_fn(metrics::track_metrics))
        .layer(middleware::from_fn(request_id_middleware));
    let app = apply_security_headers(app, config.env);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, environment = ?config.env, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    pool.close().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
