mod auth;
mod config;
mod db;
mod errors;
mod generation;
mod images;
mod keepalive;
mod llm_client;
mod outcome;
mod posts;
mod response;
mod routes;
mod state;

#[cfg(test)]
mod test_support;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::google::GoogleTokenInfo;
use crate::auth::identity::SupabaseIdentity;
use crate::auth::profiles::PgProfileStore;
use crate::auth::service::AuthService;
use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::generation::generator::ContentGenerator;
use crate::images::{ImageService, PhotoSearch, UnsplashClient};
use crate::keepalive::{KeepAlive, PgKeepAliveStore, KEEP_ALIVE_PERIOD};
use crate::llm_client::LlmClient;
use crate::posts::service::PostService;
use crate::posts::store::PgPostStore;
use crate::routes::health::PgTableProbe;
use crate::routes::{build_router, cors_layer};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Missing identity provider or database settings abort startup here.
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting PostCraft API v{}", env!("CARGO_PKG_VERSION"));

    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;

    let llm = Arc::new(LlmClient::new(config.anthropic_api_key.clone()));
    if config.anthropic_api_key.is_none() {
        warn!("ANTHROPIC_API_KEY not set; content generation will fail");
    }
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let photos: Option<Arc<dyn PhotoSearch>> = match config.unsplash_access_key.as_deref() {
        Some(key) => Some(Arc::new(UnsplashClient::new(key.to_string()))),
        None => {
            warn!("UNSPLASH_ACCESS_KEY not set; placeholder images will be used");
            None
        }
    };

    let identity = Arc::new(SupabaseIdentity::new(
        &config.supabase_url,
        &config.supabase_service_key,
        &config.supabase_anon_key,
    ));

    if config.google_client_id.is_none() {
        warn!("GOOGLE_CLIENT_ID not set; Google sign-in will be refused");
    }
    let google = Arc::new(GoogleTokenInfo::new(config.google_client_id.clone()));

    let state = AppState {
        auth: AuthService::new(
            identity,
            Arc::new(PgProfileStore::new(db.clone())),
            google,
        ),
        posts: PostService::new(
            Arc::new(PgPostStore::new(db.clone())),
            ContentGenerator::new(llm.clone()),
            ImageService::new(llm, photos),
        ),
        probe: Arc::new(PgTableProbe::new(db.clone())),
    };

    let keep_alive = KeepAlive::start(Arc::new(PgKeepAliveStore::new(db)), KEEP_ALIVE_PERIOD);

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config));

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    keep_alive.stop().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
