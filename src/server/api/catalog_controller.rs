use axum::{
    Extension, Json, Router,
    extract::Path,
    response::{
        Html,
        sse::{Event, KeepAlive, Sse},
    },
    routing::get,
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error};

use crate::server::{
    dtos::catalog_dto::{CatalogQuery, CatalogResponse, HtmlCatalogQuery},
    error::{AppResult, Error},
    extractors::ValidatedQuery,
    services::{catalog_services::CatalogRequest, edge_services::EdgeServices},
};

pub struct CatalogController;

impl CatalogController {
    pub fn app() -> Router {
        Router::new()
            .route("/", get(Self::catalog))
            .route("/stream", get(Self::catalog_stream))
            .route("/html", get(Self::html_root))
            .route("/html/{*path}", get(Self::html))
    }

    /// extracted entries for one listing page
    async fn catalog(
        Extension(services): Extension<EdgeServices>,
        ValidatedQuery(query): ValidatedQuery<CatalogQuery>,
    ) -> AppResult<Json<CatalogResponse>> {
        let request = query.into_request();
        let snapshot = services.catalog.catalog(&request, false).await?;

        Ok(Json(CatalogResponse::new(snapshot.page, &request)))
    }

    /// same page as an event stream: a `snapshot` first, then a `poster` per generated image
    async fn catalog_stream(
        Extension(services): Extension<EdgeServices>,
        ValidatedQuery(query): ValidatedQuery<CatalogQuery>,
    ) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
        let request = query.into_request();
        let snapshot = services.catalog.catalog(&request, true).await?;

        let data = serde_json::to_string(&CatalogResponse::new(snapshot.page, &request))
            .map_err(|e| {
                error!("Failed to serialize catalog snapshot: {}", e);
                Error::InternalServerError
            })?;

        let first = tokio_stream::once(Ok::<_, Infallible>(
            Event::default().event("snapshot").data(data),
        ));

        let posters = ReceiverStream::new(snapshot.updates).map(|update| {
            debug!("Sending poster for {}", update.entry_id);
            let data = serde_json::to_string(&update).unwrap_or_else(|e| {
                format!(r#"{{"error": "serialization failed: {}"}}"#, e)
            });
            Ok::<_, Infallible>(Event::default().event("poster").data(data))
        });

        Ok(Sse::new(first.chain(posters)).keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(15))
                .text("ping"),
        ))
    }

    async fn html_root(
        Extension(services): Extension<EdgeServices>,
        ValidatedQuery(query): ValidatedQuery<HtmlCatalogQuery>,
    ) -> AppResult<Html<String>> {
        let request = CatalogRequest::from_html_path("", query.search)?;
        Ok(Html(services.catalog.fetch_html(&request).await?))
    }

    /// upstream listing html as is, for clients that parse it themselves
    async fn html(
        Extension(services): Extension<EdgeServices>,
        Path(path): Path<String>,
        ValidatedQuery(query): ValidatedQuery<HtmlCatalogQuery>,
    ) -> AppResult<Html<String>> {
        let request = CatalogRequest::from_html_path(&path, query.search)?;
        Ok(Html(services.catalog.fetch_html(&request).await?))
    }
}
