// how the service reaches the catalog and media origins, picked once at startup
use anyhow::Context;
use async_trait::async_trait;
use mockall::automock;
use reqwest::{Method, header};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};

use crate::config::AppConfig;

pub type DynUpstreamResolver = Arc<dyn UpstreamResolverTrait + Send + Sync>;

/// one outbound request to an origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub range: Option<String>,
    pub referer: Option<String>,
}

impl UpstreamRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            range: None,
            referer: None,
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_range(mut self, range: Option<String>) -> Self {
        self.range = range;
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }
}

#[automock]
#[async_trait]
pub trait UpstreamResolverTrait {
    /// `direct` or `proxied`, shown on the health endpoint
    fn mode(&self) -> &'static str;
    async fn fetch(&self, request: UpstreamRequest) -> Result<reqwest::Response, reqwest::Error>;
}

/// talks to the origins straight from this host
pub struct DirectUpstream {
    client: reqwest::Client,
}

impl DirectUpstream {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let client = client_builder(config)
            .build()
            .context("failed to build direct upstream client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UpstreamResolverTrait for DirectUpstream {
    fn mode(&self) -> &'static str {
        "direct"
    }

    async fn fetch(&self, request: UpstreamRequest) -> Result<reqwest::Response, reqwest::Error> {
        send(&self.client, request).await
    }
}

/// routes every origin request through a forward proxy, for hosts the origins block
pub struct ProxiedUpstream {
    client: reqwest::Client,
}

impl ProxiedUpstream {
    pub fn new(config: &AppConfig, proxy_url: &str) -> anyhow::Result<Self> {
        let proxy = reqwest::Proxy::all(proxy_url).context("invalid upstream proxy url")?;
        let client = client_builder(config)
            .proxy(proxy)
            .build()
            .context("failed to build proxied upstream client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UpstreamResolverTrait for ProxiedUpstream {
    fn mode(&self) -> &'static str {
        "proxied"
    }

    async fn fetch(&self, request: UpstreamRequest) -> Result<reqwest::Response, reqwest::Error> {
        send(&self.client, request).await
    }
}

/// proxied when `UPSTREAM_PROXY` is set, direct otherwise
pub fn resolver_from_config(config: &AppConfig) -> anyhow::Result<DynUpstreamResolver> {
    match config.upstream_proxy.as_deref().filter(|p| !p.trim().is_empty()) {
        Some(proxy_url) => {
            info!("upstream requests go through a forward proxy");
            Ok(Arc::new(ProxiedUpstream::new(config, proxy_url)?))
        }
        None => {
            info!("upstream requests go direct");
            Ok(Arc::new(DirectUpstream::new(config)?))
        }
    }
}

// connect + read timeouts instead of a total one, a long movie stream is not a stuck request
fn client_builder(config: &AppConfig) -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .user_agent(config.upstream_user_agent.clone())
        .connect_timeout(Duration::from_secs(config.upstream_connect_timeout_secs))
        .read_timeout(Duration::from_secs(config.upstream_read_timeout_secs))
}

async fn send(
    client: &reqwest::Client,
    request: UpstreamRequest,
) -> Result<reqwest::Response, reqwest::Error> {
    debug!("{} {}", request.method, request.url);

    // bytes are relayed untouched, so ask for them untouched
    let mut builder = client
        .request(request.method, &request.url)
        .header(header::ACCEPT_ENCODING, "identity");

    if let Some(range) = request.range {
        builder = builder.header(header::RANGE, range);
    }
    if let Some(referer) = request.referer {
        builder = builder.header(header::REFERER, referer);
    }

    builder.send().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_setting_picks_resolver() {
        let direct = resolver_from_config(&AppConfig::default()).unwrap();
        assert_eq!(direct.mode(), "direct");

        let config = AppConfig {
            upstream_proxy: Some("http://127.0.0.1:3128".to_string()),
            ..Default::default()
        };
        let proxied = resolver_from_config(&config).unwrap();
        assert_eq!(proxied.mode(), "proxied");
    }

    #[test]
    fn request_builder_helpers() {
        let request = UpstreamRequest::get("https://media.example/x.mp4")
            .with_method(Method::HEAD)
            .with_range(Some("bytes=0-1".to_string()))
            .with_referer("https://media.example");
        assert_eq!(request.method, Method::HEAD);
        assert_eq!(request.range.as_deref(), Some("bytes=0-1"));
        assert_eq!(request.referer.as_deref(), Some("https://media.example"));
    }
}
