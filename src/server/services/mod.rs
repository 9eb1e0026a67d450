pub mod catalog_services;
pub mod edge_services;
pub mod media_services;
pub mod poster_services;
pub mod relay_services;
pub mod upstream_services;

pub use catalog_services::DynCatalogService;
pub use media_services::DynMediaService;
pub use poster_services::DynPosterGenerator;
pub use relay_services::DynRelayService;
pub use upstream_services::DynUpstreamResolver;
