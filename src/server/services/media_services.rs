// detail page -> playable reference, with every media url turned into a relay link
use async_trait::async_trait;
use mockall::automock;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::{
    catalog::{
        extractor::canonical_title,
        field_parser::parse_year,
        locator::{DetailScan, LocatorConfig, MediaProber, resolve as resolve_media},
        model::{AudioTrack, CatalogEntry, Language, MediaReference},
        urls::{origin_of, title_case_slug},
    },
    server::{
        error::{AppResult, Error},
        utils::signature_utils::SignatureUtil,
    },
};

use super::upstream_services::{DynUpstreamResolver, UpstreamRequest};

pub type DynMediaService = Arc<dyn MediaServiceTrait + Send + Sync>;

/// what the client knows about the entry it wants to play
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaLookup {
    pub detail_url: String,
    /// canonical title, read from the detail page when missing
    pub title: Option<String>,
    pub year: Option<String>,
    /// audio languages of the entry, detected from the page when empty
    pub languages: Vec<Language>,
}

#[automock]
#[async_trait]
pub trait MediaServiceTrait {
    async fn resolve(&self, lookup: MediaLookup) -> AppResult<MediaReference>;
}

/// probes candidate files with a two byte range request through the upstream resolver
pub struct HttpMediaProber {
    upstream: DynUpstreamResolver,
    referer: String,
}

impl HttpMediaProber {
    pub fn new(upstream: DynUpstreamResolver, referer: String) -> Self {
        Self { upstream, referer }
    }
}

#[async_trait]
impl MediaProber for HttpMediaProber {
    async fn probe(&self, url: &str) -> bool {
        let request = UpstreamRequest::get(url)
            .with_range(Some("bytes=0-1".to_string()))
            .with_referer(self.referer.clone());

        match self.upstream.fetch(request).await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Probe of {} failed: {}", url, e);
                false
            }
        }
    }
}

pub struct MediaService {
    upstream: DynUpstreamResolver,
    prober: HttpMediaProber,
    locator: LocatorConfig,
    catalog_origin: String,
    signature_util: Option<Arc<SignatureUtil>>,
    link_ttl_secs: i64,
}

impl MediaService {
    pub fn new(
        upstream: DynUpstreamResolver,
        locator: LocatorConfig,
        catalog_origin: &str,
        signature_util: Option<Arc<SignatureUtil>>,
        link_ttl_secs: i64,
    ) -> Self {
        let prober = HttpMediaProber::new(upstream.clone(), locator.media_origin.clone());
        Self {
            upstream,
            prober,
            locator,
            catalog_origin: catalog_origin.trim_end_matches('/').to_string(),
            signature_util,
            link_ttl_secs,
        }
    }

    /// `/video<path>` for urls on the media origin, signed when a secret is configured
    pub fn relay_link(&self, url: &str) -> String {
        let Some(rest) = url.strip_prefix(&self.locator.media_origin) else {
            return url.to_string();
        };
        let raw_path = rest.split('?').next().unwrap_or_default();
        if !raw_path.starts_with('/') {
            return url.to_string();
        }

        match &self.signature_util {
            Some(signer) => {
                // the relay sees the decoded path, so that's what gets signed
                let decoded = urlencoding::decode(raw_path)
                    .map(|p| p.into_owned())
                    .unwrap_or_else(|_| raw_path.to_string());
                format!(
                    "/video{}?{}",
                    raw_path,
                    signer.sign_query(&decoded, self.link_ttl_secs)
                )
            }
            None => format!("/video{}", raw_path),
        }
    }

    fn entry_for(&self, lookup: &MediaLookup, scan: &DetailScan) -> CatalogEntry {
        let heading = scan.heading.as_deref().unwrap_or_default();

        let title = lookup
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| Some(canonical_title(heading)).filter(|t| !t.is_empty()))
            .unwrap_or_else(|| title_from_url(&lookup.detail_url));
        let year = lookup.year.clone().or_else(|| parse_year(heading));

        let languages = if lookup.languages.is_empty() {
            vec![Language::detect(&[heading, &lookup.detail_url]).unwrap_or(Language::DEFAULT)]
        } else {
            lookup.languages.clone()
        };

        let mut entry = CatalogEntry {
            id: String::new(),
            title,
            year,
            image_url: None,
            detail_url: lookup.detail_url.clone(),
            rating: None,
            runtime: None,
            genres: Vec::new(),
            audio_tracks: Vec::new(),
        };
        for language in languages {
            entry.add_audio_track(AudioTrack::new(language, &lookup.detail_url));
        }
        entry
    }
}

/// last path segment of a detail url, `troll-2-hindi` -> `Troll 2 Hindi`
fn title_from_url(detail_url: &str) -> String {
    let slug = detail_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    canonical_title(&title_case_slug(slug).replace('-', " "))
}

#[async_trait]
impl MediaServiceTrait for MediaService {
    async fn resolve(&self, lookup: MediaLookup) -> AppResult<MediaReference> {
        if origin_of(&lookup.detail_url).as_deref() != Some(self.catalog_origin.as_str()) {
            return Err(Error::BadRequest(
                "Detail URL must point at the catalog".to_string(),
            ));
        }

        let response = self
            .upstream
            .fetch(
                UpstreamRequest::get(&lookup.detail_url).with_referer(self.catalog_origin.clone()),
            )
            .await
            .map_err(|e| {
                error!("Detail request to {} failed: {}", lookup.detail_url, e);
                Error::UpstreamUnavailable(e.without_url().to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("Detail page {} answered {}", lookup.detail_url, status);
            let resource = url::Url::parse(&lookup.detail_url)
                .map(|u| u.path().to_string())
                .unwrap_or_default();
            return Err(Error::UpstreamRejected { status, resource });
        }

        let html = response.text().await.map_err(|e| {
            error!("Failed to read detail page {}: {}", lookup.detail_url, e);
            Error::UpstreamUnavailable(e.without_url().to_string())
        })?;

        let scan = DetailScan::new(&html, &lookup.detail_url, &self.locator);
        let entry = self.entry_for(&lookup, &scan);

        let reference = resolve_media(scan, &entry, &self.prober, &self.locator).await;
        info!(
            "Resolved '{}' with {} subtitle tracks and {} audio tracks",
            entry.title,
            reference.subtitle_urls.len(),
            reference.audio_tracks.len()
        );

        Ok(reference.map_urls(|url| self.relay_link(url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::server::services::upstream_services::resolver_from_config;

    fn service(secret: Option<&str>) -> MediaService {
        let upstream = resolver_from_config(&AppConfig::default()).unwrap();
        MediaService::new(
            upstream,
            LocatorConfig::new("https://media.example", "/movies/latest"),
            "https://catalog.example",
            secret.map(|s| Arc::new(SignatureUtil::new(s.to_string()))),
            3600,
        )
    }

    #[test]
    fn relay_links_hide_the_media_origin() {
        let service = service(None);
        assert_eq!(
            service.relay_link("https://media.example/movies/latest/Troll-2.mp4"),
            "/video/movies/latest/Troll-2.mp4"
        );
        assert_eq!(
            service.relay_link("https://catalog.example/troll-2/"),
            "https://catalog.example/troll-2/"
        );
    }

    #[test]
    fn signed_links_verify_against_the_decoded_path() {
        let service = service(Some("secret"));
        let link = service.relay_link("https://media.example/movies/latest/Troll%202.mp4");
        let (path, query) = link.split_once('?').unwrap();
        assert_eq!(path, "/video/movies/latest/Troll%202.mp4");

        let mut token = "";
        let mut expires = 0;
        for pair in query.split('&') {
            match pair.split_once('=').unwrap() {
                ("token", v) => token = v,
                ("expires", v) => expires = v.parse().unwrap(),
                _ => {}
            }
        }
        let signer = SignatureUtil::new("secret".to_string());
        assert!(signer.verify_signature("/movies/latest/Troll 2.mp4", expires, token));
    }

    #[test]
    fn title_falls_back_to_detail_slug() {
        assert_eq!(title_from_url("https://catalog.example/troll-2-hindi/"), "Troll 2");
    }
}
