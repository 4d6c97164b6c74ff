use tokio::net::TcpListener;
use tokio::signal;
use scrape_history::{
    config::Config,
    api::routes::create_router,
    schema,
    store::PgStore,
    telemetry,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_telemetry();

    // Load configuration
    let config = Config::load()?;
    let server_addr = config.server_addr;

    let store = PgStore::connect(&config.database).await?;
    tracing::info!(max_connections = config.database.max_connections, "database pool ready");

    if config.database.init_schema {
        schema::bootstrap(store.pool()).await?;
    }

    let pool = store.pool().clone();
    let app = create_router(AppState::new(store));

    let listener = TcpListener::bind(server_addr).await?;
    tracing::info!("Listening on {}", server_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
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

    tracing::info!("shutdown signal received");
}
