pub mod health;


use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::auth::handlers as auth;
use crate::config::Config;
use crate::posts::handlers as posts;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health::health_handler))
        .route("/ping", get(health::ping_handler))
        // Auth
        .route("/auth/signup", post(auth::handle_signup))
        .route("/auth/signin", post(auth::handle_signin))
        .route("/auth/google", post(auth::handle_google))
        .route("/auth/me", get(auth::handle_me))
        // Posts
        .route(
            "/posts",
            post(posts::handle_create_post).get(posts::handle_list_posts),
        )
        .route("/posts/stats", get(posts::handle_post_stats))
        .route("/posts/scheduled", get(posts::handle_scheduled_posts))
        .route(
            "/posts/:id",
            get(posts::handle_get_post)
                .put(posts::handle_update_post)
                .delete(posts::handle_delete_post),
        )
        .route("/posts/:id/regenerate", post(posts::handle_regenerate_post))
        .route("/posts/:id/images", put(posts::handle_update_images));

    Router::new().nest("/api/v1", api).with_state(state)
}

/// CORS restricted to the configured origins. Unparseable entries are skipped.
pub fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
