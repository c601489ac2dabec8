use medassist_api::api::{create_router, AppState};
use medassist_api::cache::RedisCache;
use medassist_api::config::Settings;
use medassist_api::observability::{init_logging, AppMetrics, LogConfig, LogFormat, MetricsRegistry};
use medassist_api::repositories::MySqlStore;
use medassist_api::services::{ConnectionProvider, RandomSource, SeededRandom, ThreadRandom};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;

    // Initialize logging
    init_logging(&LogConfig {
        level: settings.application.log_level.clone(),
        format: LogFormat::from(settings.application.log_format.as_str()),
        ..LogConfig::default()
    });

    let metrics = Arc::new(AppMetrics::new(Arc::new(MetricsRegistry::new()))?);

    // Neither backend is contacted here; both connect per request.
    let store = MySqlStore::connect_lazy(&settings.database);
    let cache = RedisCache::from_settings(&settings.redis)?;
    let connections = ConnectionProvider::new(Arc::new(store), Arc::new(cache), metrics.clone())
        .with_timeouts(settings.database.connect_timeout(), settings.redis.timeout());

    let random: Arc<dyn RandomSource> = match settings.simulation.seed {
        Some(seed) => Arc::new(SeededRandom::new(seed)),
        None => Arc::new(ThreadRandom),
    };

    let state = AppState::new(
        connections,
        random,
        settings.cache.clone(),
        settings.simulation.clone(),
    );
    let app = create_router(state);

    let addr = format!("{}:{}", settings.application.host, settings.application.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        address = %addr,
        mysql_host = %settings.database.host,
        redis_host = %settings.redis.host,
        payment_failure_rate = settings.simulation.payment_failure_rate,
        "MedAssist API starting up"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("MedAssist API stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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

    info!("shutdown signal received");
}
