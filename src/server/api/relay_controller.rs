use axum::{
    Extension, Router,
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{MethodRouter, get},
};

use crate::server::{
    error::AppResult,
    extractors::RelayRequest,
    services::{edge_services::EdgeServices, relay_services::apply_cors_headers},
};

pub struct RelayController;

impl RelayController {
    /// mounted at the root, the paths are what players and older links already use
    pub fn app() -> Router {
        Router::new()
            .route("/video/{*path}", Self::methods())
            .route("/api/video/{*path}", Self::methods())
            .route("/api/video-proxy", Self::methods())
    }

    fn methods() -> MethodRouter {
        get(Self::relay)
            .head(Self::relay)
            .options(Self::preflight)
    }

    async fn relay(
        Extension(services): Extension<EdgeServices>,
        method: Method,
        request: RelayRequest,
    ) -> AppResult<Response> {
        services.relay.authorize(&request)?;
        services.relay.relay(method, request).await
    }

    // answered locally, the media origin never sees a preflight
    async fn preflight() -> impl IntoResponse {
        let mut headers = HeaderMap::new();
        apply_cors_headers(&mut headers);
        (StatusCode::OK, headers)
    }
}
