use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::catalog::model::{CatalogEntry, CatalogPage};
use crate::server::services::catalog_services::CatalogRequest;

#[derive(Debug, Deserialize, Validate)]
pub struct CatalogQuery {
    #[validate(length(max = 64))]
    pub category: Option<String>,

    #[validate(range(min = 1, max = 10000))]
    pub page: Option<u32>,

    #[serde(rename = "s")]
    #[validate(length(max = 200))]
    pub search: Option<String>,
}

impl CatalogQuery {
    pub fn into_request(self) -> CatalogRequest {
        CatalogRequest::new(self.category, self.page, self.search)
    }
}

/// only `s` matters on the html route, the rest comes from the path
#[derive(Debug, Deserialize, Validate)]
pub struct HtmlCatalogQuery {
    #[serde(rename = "s")]
    #[validate(length(max = 200))]
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogResponse {
    pub entries: Vec<CatalogEntry>,
    pub page: u32,
    pub max_page: u32,
    pub max_page_estimated: bool,
    pub search: Option<String>,
}

impl CatalogResponse {
    pub fn new(page: CatalogPage, request: &CatalogRequest) -> Self {
        Self {
            entries: page.entries,
            page: if request.is_search() { 1 } else { request.page },
            max_page: page.max_page,
            max_page_estimated: page.max_page_estimated,
            search: request.search.clone(),
        }
    }
}
