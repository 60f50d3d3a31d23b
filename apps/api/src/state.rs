use std::sync::Arc;

use crate::auth::service::AuthService;
use crate::posts::service::PostService;
use crate::routes::health::TableProbe;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub posts: PostService,
    /// Reachability check for the tables behind `GET /health`.
    pub probe: Arc<dyn TableProbe>,
}
