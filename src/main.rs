use users_cache_service::{
    datalayer::{CRUD::redis::CacheConfig, initialize_database},
    logging::{init_telemetry, shutdown_telemetry},
    routes::create_router,
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    init_telemetry(None)?;

    tracing::info!("Starting users cache service");

    // Connects with retries, runs migrations and verifies the schema
    let db = initialize_database().await?;
    tracing::info!("Database initialized successfully");

    let cache_config = CacheConfig::default();
    let state = AppState::connect(&db, &cache_config).await?;

    let app = create_router(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        address = %addr,
        endpoints = ?[
            "POST /user",
            "GET /user/:id",
            "GET /user/short-way/:id",
            "GET /health",
            "GET /health/live",
            "GET /health/ready",
        ],
        "Server listening and ready to accept connections"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.shutdown().await;
    shutdown_telemetry();

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::warn!("Shutdown signal received, cleaning up...");
}
