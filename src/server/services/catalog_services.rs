// listing pages: fetched from the catalog origin, optionally extracted into entries
use async_trait::async_trait;
use metrics::counter;
use mockall::automock;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::{
    catalog::{
        categories::{ALL_CATEGORY_ID, find_category},
        extractor::extract,
        model::{CatalogEntry, CatalogPage, PosterUpdate, sort_by_year_desc},
    },
    server::error::{AppResult, Error},
};

use super::{
    poster_services::DynPosterGenerator,
    upstream_services::{DynUpstreamResolver, UpstreamRequest},
};

pub type DynCatalogService = Arc<dyn CatalogServiceTrait + Send + Sync>;

static SLUG_SHAPED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*$").expect("static regex should compile"));

/// which listing page to load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRequest {
    /// `None` is the front page listing
    pub category: Option<String>,
    pub page: u32,
    /// search ignores category and page
    pub search: Option<String>,
}

impl Default for CatalogRequest {
    fn default() -> Self {
        Self {
            category: None,
            page: 1,
            search: None,
        }
    }
}

impl CatalogRequest {
    pub fn new(category: Option<String>, page: Option<u32>, search: Option<String>) -> Self {
        let search = search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let category = category
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty() && c != ALL_CATEGORY_ID);

        Self {
            category,
            page: page.unwrap_or(1).max(1),
            search,
        }
    }

    /// `[<category>][/page/<n>]`, the shape of the html pass-through route
    pub fn from_html_path(path: &str, search: Option<String>) -> AppResult<Self> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let (category, page) = match segments.as_slice() {
            [] => (None, None),
            ["page", n] => (None, Some(parse_page(n)?)),
            [category] => (Some(category.to_string()), None),
            [category, "page", n] => (Some(category.to_string()), Some(parse_page(n)?)),
            _ => {
                return Err(Error::BadRequest(
                    "Expected /<category>/page/<n>".to_string(),
                ));
            }
        };

        Ok(Self::new(category, page, search))
    }

    pub fn is_search(&self) -> bool {
        self.search.is_some()
    }

    /// path and query on the catalog origin for this listing
    pub fn upstream_path(&self) -> AppResult<String> {
        if let Some(search) = &self.search {
            return Ok(format!("/?s={}", urlencoding::encode(search)));
        }

        let slug = match self.category.as_deref() {
            None => None,
            Some(id) => match find_category(id) {
                Some(category) if category.slug.is_empty() => None,
                Some(category) => Some(category.slug.to_string()),
                None if SLUG_SHAPED.is_match(id) => Some(id.to_string()),
                None => return Err(Error::BadRequest(format!("Unknown category: {}", id))),
            },
        };

        Ok(match (slug, self.page) {
            (None, 1) => "/".to_string(),
            (None, page) => format!("/page/{}/", page),
            (Some(slug), 1) => format!("/{}/", slug),
            (Some(slug), page) => format!("/{}/page/{}/", slug, page),
        })
    }
}

fn parse_page(raw: &str) -> AppResult<u32> {
    raw.parse::<u32>()
        .ok()
        .filter(|n| *n >= 1)
        .ok_or_else(|| Error::BadRequest(format!("Invalid page: {}", raw)))
}

/// an extracted page plus the posters that are still being generated for it
///
/// `updates` closes once every backfill task is done, right away when there is nothing to do
pub struct CatalogSnapshot {
    pub page: CatalogPage,
    pub updates: mpsc::Receiver<PosterUpdate>,
}

#[automock]
#[async_trait]
pub trait CatalogServiceTrait {
    async fn fetch_html(&self, request: &CatalogRequest) -> AppResult<String>;
    async fn catalog(&self, request: &CatalogRequest, backfill: bool) -> AppResult<CatalogSnapshot>;
}

pub struct CatalogService {
    upstream: DynUpstreamResolver,
    posters: Option<DynPosterGenerator>,
    catalog_origin: String,
}

impl CatalogService {
    pub fn new(
        upstream: DynUpstreamResolver,
        posters: Option<DynPosterGenerator>,
        catalog_origin: &str,
    ) -> Self {
        Self {
            upstream,
            posters,
            catalog_origin: catalog_origin.trim_end_matches('/').to_string(),
        }
    }

    fn spawn_poster_backfill(&self, entries: &[CatalogEntry]) -> mpsc::Receiver<PosterUpdate> {
        let wanted: Vec<&CatalogEntry> = entries.iter().filter(|e| e.needs_poster()).collect();
        let (tx, rx) = mpsc::channel(wanted.len().max(1));

        let Some(generator) = &self.posters else {
            return rx;
        };

        info!("Backfilling {} posters", wanted.len());
        for entry in wanted {
            let tx = tx.clone();
            let generator = generator.clone();
            let entry_id = entry.id.clone();
            let title = entry.title.clone();

            tokio::spawn(async move {
                match generator.generate(&title).await {
                    Ok(image_url) => {
                        if tx.send(PosterUpdate { entry_id, image_url }).await.is_err() {
                            debug!("Poster for '{}' ready after the client left", title);
                        }
                    }
                    Err(e) => error!("Poster backfill for '{}' failed: {}", title, e),
                }
            });
        }

        rx
    }
}

#[async_trait]
impl CatalogServiceTrait for CatalogService {
    async fn fetch_html(&self, request: &CatalogRequest) -> AppResult<String> {
        let path = request.upstream_path()?;
        let url = format!("{}{}", self.catalog_origin, path);
        debug!("Fetching listing {}", url);

        let response = self
            .upstream
            .fetch(UpstreamRequest::get(&url).with_referer(self.catalog_origin.clone()))
            .await
            .map_err(|e| {
                error!("Listing request to {} failed: {}", url, e);
                Error::UpstreamUnavailable(e.without_url().to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("Listing {} answered {}", url, status);
            return Err(Error::UpstreamRejected {
                status,
                resource: path,
            });
        }

        response.text().await.map_err(|e| {
            error!("Failed to read listing body from {}: {}", url, e);
            Error::UpstreamUnavailable(e.without_url().to_string())
        })
    }

    async fn catalog(&self, request: &CatalogRequest, backfill: bool) -> AppResult<CatalogSnapshot> {
        let html = self.fetch_html(request).await?;

        let mut page = extract(&html, &self.catalog_origin);
        if request.is_search() {
            // search results are never paginated
            page.max_page = 1;
            page.max_page_estimated = false;
        }
        sort_by_year_desc(&mut page.entries);

        counter!("catalog_entries_extracted_total").increment(page.entries.len() as u64);
        info!(
            "Extracted {} entries (max page {}{})",
            page.entries.len(),
            page.max_page,
            if page.max_page_estimated { ", estimated" } else { "" }
        );

        let updates = if backfill {
            self.spawn_poster_backfill(&page.entries)
        } else {
            mpsc::channel(1).1
        };

        Ok(CatalogSnapshot { page, updates })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_paths() {
        let path = |c: Option<&str>, p: Option<u32>, s: Option<&str>| {
            CatalogRequest::new(c.map(str::to_string), p, s.map(str::to_string))
                .upstream_path()
                .unwrap()
        };

        assert_eq!(path(None, None, None), "/");
        assert_eq!(path(Some("all"), Some(3), None), "/page/3/");
        assert_eq!(path(Some("drama"), None, None), "/drama/");
        assert_eq!(path(Some("Drama"), Some(2), None), "/drama/page/2/");
        assert_eq!(path(Some("drama"), Some(2), Some("troll 2")), "/?s=troll%202");
        assert_eq!(path(Some("new-releases"), None, None), "/new-releases/");
    }

    #[test]
    fn odd_categories_are_rejected() {
        let request = CatalogRequest::new(Some("../admin".to_string()), None, None);
        assert!(matches!(request.upstream_path(), Err(Error::BadRequest(_))));
    }

    #[test]
    fn html_route_paths() {
        assert_eq!(
            CatalogRequest::from_html_path("", None).unwrap(),
            CatalogRequest::default()
        );
        let request = CatalogRequest::from_html_path("drama/page/4", None).unwrap();
        assert_eq!(request.category.as_deref(), Some("drama"));
        assert_eq!(request.page, 4);
        assert_eq!(CatalogRequest::from_html_path("/page/2/", None).unwrap().page, 2);
        assert!(CatalogRequest::from_html_path("drama/page/zero", None).is_err());
        assert!(CatalogRequest::from_html_path("a/b/c/d", None).is_err());
    }
}
