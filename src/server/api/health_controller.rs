use axum::Extension;
use axum::Json;
use axum::http::StatusCode;
use chrono::Utc;

use crate::server::dtos::health_dto::{HealthResponse, HealthStatus, UpstreamHealth};
use crate::server::services::edge_services::EdgeServices;
use crate::server::{get_app_version, get_uptime_seconds};

/// health endpoint, the service is stateless so there's nothing to ping
/// origins are not probed, this only reports how the service is configured
pub async fn health_endpoint(
    Extension(services): Extension<EdgeServices>,
) -> (StatusCode, Json<HealthResponse>) {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        timestamp: Utc::now(),
        uptime_seconds: get_uptime_seconds(),
        version: get_app_version().to_string(),
        environment: format!("{:?}", services.config.cargo_env).to_lowercase(),
        relay_mode: services.config.relay_mode.as_str().to_string(),
        upstream: UpstreamHealth {
            mode: services.upstream.mode().to_string(),
            signed_links: services.signature_util.is_some(),
            poster_backfill: services.posters.is_some(),
        },
    };

    (StatusCode::OK, Json(response))
}
