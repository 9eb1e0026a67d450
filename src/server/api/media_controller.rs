use axum::{Extension, Json, Router, routing::get};

use crate::catalog::model::MediaReference;
use crate::server::{
    dtos::media_dto::MediaQuery, error::AppResult, extractors::ValidatedQuery,
    services::edge_services::EdgeServices,
};

pub struct MediaController;

impl MediaController {
    pub fn app() -> Router {
        Router::new().route("/", get(Self::resolve))
    }

    /// playable reference for a detail page, media urls already rewritten to relay links
    async fn resolve(
        Extension(services): Extension<EdgeServices>,
        ValidatedQuery(query): ValidatedQuery<MediaQuery>,
    ) -> AppResult<Json<MediaReference>> {
        let reference = services.media.resolve(query.into_lookup()).await?;
        Ok(Json(reference))
    }
}
