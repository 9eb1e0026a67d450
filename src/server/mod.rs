pub mod api;
pub mod dtos;
pub mod error;
pub mod extractors;
pub mod services;
pub mod utils;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::{
    Extension, Router,
    extract::Request,
    http::{HeaderValue, Method, header},
    routing::get,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use tokio::{net::TcpListener, signal};
use tower::Layer;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    normalize_path::NormalizePathLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::config::AppConfig;
use api::{
    catalog_controller::CatalogController, health_controller::health_endpoint,
    media_controller::MediaController, relay_controller::RelayController,
};
use services::edge_services::EdgeServices;

static START_TIME: Lazy<Instant> = Lazy::new(Instant::now);

pub fn get_app_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn get_uptime_seconds() -> u64 {
    START_TIME.elapsed().as_secs()
}

pub struct EdgeApplicationServer;

impl EdgeApplicationServer {
    /// every route except `/metrics`, which needs the process wide recorder
    pub fn router(services: EdgeServices) -> Router {
        let cors = Self::cors_layer(&services.config);

        let api = Router::new()
            .route("/health", get(health_endpoint))
            .nest("/catalog", CatalogController::app())
            .nest("/media", MediaController::app());

        Router::new()
            .nest("/api/v1", api)
            .merge(RelayController::app())
            .layer(Extension(services))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    fn cors_layer(config: &AppConfig) -> CorsLayer {
        let origins = config.cors_origins();

        let allow_origin = if origins.is_empty() {
            AllowOrigin::from(Any)
        } else {
            let values: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!("ignoring unparseable cors origin {}", origin);
                        None
                    }
                })
                .collect();
            AllowOrigin::list(values)
        };

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
            .allow_headers([header::RANGE, header::CONTENT_TYPE])
            .expose_headers([
                header::CONTENT_LENGTH,
                header::CONTENT_RANGE,
                header::ACCEPT_RANGES,
            ])
    }

    pub async fn serve(config: Arc<AppConfig>) -> anyhow::Result<()> {
        Lazy::force(&START_TIME);

        let services = EdgeServices::new(config.clone()).context("failed to start services")?;

        let metrics = PrometheusBuilder::new()
            .install_recorder()
            .context("failed to install prometheus recorder")?;

        let router = Self::router(services).route(
            "/metrics",
            get(move || {
                let metrics = metrics.clone();
                async move { metrics.render() }
            }),
        );

        // trailing slashes are trimmed before routing, `/catalog/html/drama/` and
        // `/catalog/html/drama` are the same listing
        let app = NormalizePathLayer::trim_trailing_slash().layer(router);

        let listener = TcpListener::bind(("0.0.0.0", config.port))
            .await
            .with_context(|| format!("failed to bind port {}", config.port))?;

        info!(
            "listening on {} ({} relay)",
            config.port,
            config.relay_mode.as_str()
        );

        axum::serve(
            listener,
            axum::ServiceExt::<Request>::into_make_service(app),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

        info!("server shutdown complete");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install ctrl+c handler: {}", e);
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
                error!("failed to install SIGTERM handler: {}", e);
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
