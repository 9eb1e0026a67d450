use std::sync::Arc;

use cinerelay::server::{
    error::Error,
    services::{
        catalog_services::{CatalogRequest, CatalogService, CatalogServiceTrait},
        poster_services::MockPosterGeneratorTrait,
        upstream_services::MockUpstreamResolverTrait,
    },
};

const ORIGIN: &str = "https://catalog.example";

const LISTING: &str = r#"
<article class="movie-item">
  <a href="/troll-2-2025/"></a><h2 class="movie-title">Troll 2 (2025)</h2>
</article>
<article class="movie-item">
  <a href="/heat-1995/"><img src="/wp/heat.jpg"></a><h2 class="movie-title">Heat (1995)</h2>
</article>
"#;

fn upstream_serving(html: &'static str) -> MockUpstreamResolverTrait {
    let mut upstream = MockUpstreamResolverTrait::new();
    upstream
        .expect_fetch()
        .withf(|request| request.url == "https://catalog.example/drama/")
        .times(1)
        .returning(move |_| Ok(reqwest::Response::from(axum::http::Response::new(html))));
    upstream
}

#[tokio::test]
async fn backfill_posters_for_entries_without_art() {
    let mut posters = MockPosterGeneratorTrait::new();
    posters
        .expect_generate()
        .withf(|title| title == "Troll 2")
        .times(1)
        .returning(|_| Ok("https://images.example/troll-2.png".to_string()));

    let service = CatalogService::new(
        Arc::new(upstream_serving(LISTING)),
        Some(Arc::new(posters)),
        ORIGIN,
    );
    let request = CatalogRequest::new(Some("drama".to_string()), None, None);

    let mut snapshot = service.catalog(&request, true).await.unwrap();

    assert_eq!(snapshot.page.entries.len(), 2);
    let troll = &snapshot.page.entries[0];
    assert_eq!(troll.title, "Troll 2");
    assert_eq!(troll.image_url, None);

    let update = snapshot.updates.recv().await.expect("one poster update");
    assert_eq!(update.entry_id, troll.id);
    assert_eq!(update.image_url, "https://images.example/troll-2.png");
    assert!(snapshot.updates.recv().await.is_none());
}

#[tokio::test]
async fn skip_backfill_unless_asked() {
    let mut posters = MockPosterGeneratorTrait::new();
    posters.expect_generate().never();

    let service = CatalogService::new(
        Arc::new(upstream_serving(LISTING)),
        Some(Arc::new(posters)),
        ORIGIN,
    );
    let request = CatalogRequest::new(Some("drama".to_string()), None, None);

    let mut snapshot = service.catalog(&request, false).await.unwrap();

    assert!(snapshot.updates.recv().await.is_none());
}

#[tokio::test]
async fn close_updates_when_generation_fails() {
    let mut posters = MockPosterGeneratorTrait::new();
    posters
        .expect_generate()
        .returning(|_| Err(Error::InternalServerError));

    let service = CatalogService::new(
        Arc::new(upstream_serving(LISTING)),
        Some(Arc::new(posters)),
        ORIGIN,
    );
    let request = CatalogRequest::new(Some("drama".to_string()), None, None);

    let mut snapshot = service.catalog(&request, true).await.unwrap();

    assert!(snapshot.updates.recv().await.is_none());
}

#[tokio::test]
async fn reject_unknown_categories_without_fetching() {
    let mut upstream = MockUpstreamResolverTrait::new();
    upstream.expect_fetch().never();

    let service = CatalogService::new(Arc::new(upstream), None, ORIGIN);
    let request = CatalogRequest::new(Some("drama & more".to_string()), None, None);

    let result = service.fetch_html(&request).await;

    assert!(matches!(result, Err(Error::BadRequest(_))));
}
