use std::net::SocketAddr;
use std::sync::Arc;

use english_learning_backend::config::Config;
use english_learning_backend::db::Database;
use english_learning_backend::logging::{init_tracing, LogSettings};
use english_learning_backend::services::dictionary::FreeDictionaryClient;
use english_learning_backend::services::ingestion::GuardianClient;
use english_learning_backend::state::AppState;

const NEWS_TIMEOUT_SECS: u64 = 15;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = init_tracing(&LogSettings::from_env(&config.log_level));

    if config.jwt_secret.is_none() {
        tracing::warn!("JWT_SECRET not set, authentication endpoints will fail");
    }

    let db = match Database::connect(&config.database_url).await {
        Ok(db) => db,
        Err(err) => {
            tracing::error!(error = %err, url = %config.database_url, "database initialization failed");
            std::process::exit(1);
        }
    };

    let dictionary = Arc::new(FreeDictionaryClient::new(
        config.dictionary_api_url.clone(),
        config.dictionary_timeout,
    ));
    let news = Arc::new(GuardianClient::new(
        config.guardian_api_url.clone(),
        config.guardian_api_key.clone(),
        std::time::Duration::from_secs(NEWS_TIMEOUT_SECS),
    ));

    let addr = config.bind_addr();
    let state = AppState::new(config, db.clone(), dictionary, news);
    let app = english_learning_backend::create_app(state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, %addr, "bind listener failed");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "english-learning backend listening");

    let server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal());

    if let Err(e) = server.await {
        tracing::error!(error = %e, "server error");
    }

    tracing::info!("HTTP server stopped, closing database pool");
    db.close().await;
    tracing::info!("Graceful shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
}
