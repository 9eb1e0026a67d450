use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    catalog::locator::LocatorConfig,
    config::AppConfig,
    server::{
        services::{
            catalog_services::CatalogService, media_services::MediaService,
            poster_services::OpenAiPosterGenerator, relay_services::RelayService,
            upstream_services::resolver_from_config,
        },
        utils::signature_utils::SignatureUtil,
    },
};

use super::{
    catalog_services::DynCatalogService, media_services::DynMediaService,
    poster_services::DynPosterGenerator, relay_services::DynRelayService,
    upstream_services::DynUpstreamResolver,
};

/// every service a handler can reach, no database and no shared mutable state
#[derive(Clone)]
pub struct EdgeServices {
    pub signature_util: Option<Arc<SignatureUtil>>,
    pub upstream: DynUpstreamResolver,
    pub posters: Option<DynPosterGenerator>,
    pub catalog: DynCatalogService,
    pub media: DynMediaService,
    pub relay: DynRelayService,
    pub config: Arc<AppConfig>,
}

impl EdgeServices {
    pub fn new(config: Arc<AppConfig>) -> anyhow::Result<Self> {
        info!("starting edge services...");

        let signature_util = config
            .relay_url_secret
            .clone()
            .filter(|secret| !secret.is_empty())
            .map(|secret| Arc::new(SignatureUtil::new(secret)));

        if signature_util.is_none() && config.require_signed_urls {
            warn!("REQUIRE_SIGNED_URLS is set without RELAY_URL_SECRET, links can't be signed so it is ignored");
        }

        let upstream = resolver_from_config(&config)?;

        info!("upstream resolver ok ({}), starting remaining services...", upstream.mode());

        let posters = config
            .openai_api_key
            .clone()
            .filter(|key| !key.is_empty())
            .map(|key| {
                Arc::new(OpenAiPosterGenerator::new(key, config.openai_base_url.clone()))
                    as DynPosterGenerator
            });

        let catalog = Arc::new(CatalogService::new(
            upstream.clone(),
            posters.clone(),
            &config.catalog_origin,
        )) as DynCatalogService;

        let media = Arc::new(MediaService::new(
            upstream.clone(),
            LocatorConfig::new(config.media_origin.clone(), config.media_base_path.clone()),
            &config.catalog_origin,
            signature_util.clone(),
            config.relay_url_ttl_secs,
        )) as DynMediaService;

        let relay = Arc::new(RelayService::new(
            upstream.clone(),
            &config.media_origin,
            config.relay_mode,
            signature_util.clone(),
            config.require_signed_urls,
        )) as DynRelayService;

        Ok(Self {
            signature_util,
            upstream,
            posters,
            catalog,
            media,
            relay,
            config,
        })
    }
}
