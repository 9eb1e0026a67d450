// byte range relay to the media origin
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use metrics::counter;
use mockall::automock;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::{
    config::RelayMode,
    server::{
        error::{AppResult, Error},
        extractors::RelayRequest,
        utils::signature_utils::SignatureUtil,
    },
};

use super::upstream_services::{DynUpstreamResolver, UpstreamRequest};

pub type DynRelayService = Arc<dyn RelayServiceTrait + Send + Sync>;

const DEFAULT_CONTENT_TYPE: &str = "video/mp4";

/// the cors headers every relay answer carries, including preflight replies
pub fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, HEAD, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Range"),
    );
}

#[automock]
#[async_trait]
pub trait RelayServiceTrait {
    /// checks and drops the link authorization parameters
    fn authorize(&self, request: &RelayRequest) -> AppResult<()>;
    /// one upstream hop, no retries
    async fn relay(&self, method: Method, request: RelayRequest) -> AppResult<Response>;
}

pub struct RelayService {
    upstream: DynUpstreamResolver,
    media_origin: String,
    mode: RelayMode,
    signature_util: Option<Arc<SignatureUtil>>,
    require_signed_urls: bool,
}

impl RelayService {
    pub fn new(
        upstream: DynUpstreamResolver,
        media_origin: &str,
        mode: RelayMode,
        signature_util: Option<Arc<SignatureUtil>>,
        require_signed_urls: bool,
    ) -> Self {
        Self {
            upstream,
            media_origin: media_origin.trim_end_matches('/').to_string(),
            mode,
            signature_util,
            require_signed_urls,
        }
    }

    fn response_headers(upstream: &HeaderMap) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(
            header::CONTENT_TYPE,
            upstream
                .get(header::CONTENT_TYPE)
                .cloned()
                .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE)),
        );

        // indicate we accept ranges
        headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));

        for name in [header::CONTENT_LENGTH, header::CONTENT_RANGE] {
            if let Some(value) = upstream.get(&name) {
                headers.insert(name, value.clone());
            }
        }

        apply_cors_headers(&mut headers);
        headers
    }

    /// media origin plus the decoded resource path, re-encoded so `#` and `?` stay in the path
    fn upstream_url(&self, path: &str) -> AppResult<String> {
        let mut url = url::Url::parse(&self.media_origin).map_err(|e| {
            error!("Media origin {} is not a url: {}", self.media_origin, e);
            Error::InternalServerErrorWithContext("Media origin is misconfigured".to_string())
        })?;
        url.set_path(path);
        Ok(url.to_string())
    }
}

fn forbidden(reason: &str) -> Error {
    counter!("relay_requests_total", "outcome" => "forbidden").increment(1);
    Error::Forbidden(reason.to_string())
}

#[async_trait]
impl RelayServiceTrait for RelayService {
    fn authorize(&self, request: &RelayRequest) -> AppResult<()> {
        let expires = match request.expires.as_deref() {
            Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
                debug!("Unparseable expiry {:?} for {}", raw, request.path);
                forbidden("Invalid expiry")
            })?),
            None => None,
        };

        if let Some(expires) = expires {
            if SignatureUtil::is_expired(expires) {
                debug!("Expired link for {}", request.path);
                return Err(forbidden("URL expired"));
            }
        }

        let Some(signer) = &self.signature_util else {
            return Ok(());
        };

        match (request.token.as_deref(), expires) {
            (Some(token), Some(expires)) => {
                if !signer.verify_signature(&request.path, expires, token) {
                    error!("Signature invalid for {}, expiry {}", request.path, expires);
                    return Err(forbidden("Invalid token"));
                }
                Ok(())
            }
            (Some(_), None) => Err(forbidden("Invalid token")),
            (None, _) if self.require_signed_urls => Err(forbidden("Signed URL required")),
            (None, _) => Ok(()),
        }
    }

    async fn relay(&self, method: Method, request: RelayRequest) -> AppResult<Response> {
        let upstream_url = self.upstream_url(&request.path)?;
        debug!(
            "Relaying {} {} (range: {:?})",
            method, upstream_url, request.range
        );

        let upstream_response = self
            .upstream
            .fetch(
                UpstreamRequest::get(&upstream_url)
                    .with_method(method)
                    .with_range(request.range.clone())
                    .with_referer(self.media_origin.clone()),
            )
            .await
            .map_err(|e| {
                error!("Upstream request to {} failed: {}", upstream_url, e);
                counter!("relay_requests_total", "outcome" => "upstream_unavailable").increment(1);
                Error::UpstreamUnavailable(e.without_url().to_string())
            })?;

        let status: StatusCode = upstream_response.status();
        if !status.is_success() {
            // full url only goes to the logs, the client just gets the path
            error!("Upstream {} answered {}", upstream_url, status);
            counter!("relay_requests_total", "outcome" => "upstream_rejected").increment(1);
            return Err(Error::UpstreamRejected {
                status,
                resource: request.path,
            });
        }

        let headers = Self::response_headers(upstream_response.headers());

        let body = match self.mode {
            RelayMode::Streaming => Body::from_stream(upstream_response.bytes_stream()),
            RelayMode::Buffered => {
                let bytes = upstream_response.bytes().await.map_err(|e| {
                    error!("Failed to read upstream body from {}: {}", upstream_url, e);
                    counter!("relay_requests_total", "outcome" => "upstream_unavailable")
                        .increment(1);
                    Error::UpstreamUnavailable(e.without_url().to_string())
                })?;
                counter!("relay_bytes_buffered_total").increment(bytes.len() as u64);
                Body::from(bytes)
            }
        };

        counter!("relay_requests_total", "outcome" => "relayed").increment(1);
        info!("Relayed {} with {}", request.path, status);

        Ok((status, headers, body).into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::server::services::upstream_services::resolver_from_config;

    fn service() -> RelayService {
        let upstream = resolver_from_config(&AppConfig::default()).unwrap();
        RelayService::new(upstream, "https://media.example/", RelayMode::Streaming, None, false)
    }

    #[test]
    fn upstream_url_keeps_reserved_characters_in_the_path() {
        let service = service();
        assert_eq!(
            service.upstream_url("/movies/x.mp4").unwrap(),
            "https://media.example/movies/x.mp4"
        );
        assert_eq!(
            service.upstream_url("/movies/Se7en #1.mp4").unwrap(),
            "https://media.example/movies/Se7en%20%231.mp4"
        );
        assert_eq!(
            service.upstream_url("/movies/What?.mp4").unwrap(),
            "https://media.example/movies/What%3F.mp4"
        );
    }
}
