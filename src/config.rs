#[derive(clap::ValueEnum, Clone, Debug, Copy)]
pub enum CargoEnv {
    Development,
    Production,
}

/// how the relay hands the upstream body back to the client
#[derive(clap::ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum RelayMode {
    /// pipe upstream chunks through as they arrive
    Streaming,
    /// read the whole upstream body before answering
    Buffered,
}

impl RelayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Streaming => "streaming",
            Self::Buffered => "buffered",
        }
    }
}

#[derive(clap::Parser, Clone, Debug)]
pub struct AppConfig {
    // production or development
    #[clap(long, env, value_enum)]
    pub cargo_env: CargoEnv,

    // port that the app will bind to
    #[clap(long, env, default_value = "5000")]
    pub port: u16,

    // this should be either * for allowing everything, or a comma seperated list of domains like
    // example.com,something.com
    #[clap(long, env, default_value = "*")]
    pub cors_origin: String,

    // optional sentry integration
    #[clap(long, env)]
    pub sentry_dsn: Option<String>,

    // origin that serves the listing and detail pages, e.g. https://catalog.example
    #[clap(long, env)]
    pub catalog_origin: String,

    // origin that serves the actual media files, never shown to clients
    #[clap(long, env)]
    pub media_origin: String,

    // folder on the media origin that constructed file names live under, e.g. /movies/2024
    #[clap(long, env)]
    pub media_base_path: String,

    #[clap(long, env, value_enum, default_value = "streaming")]
    pub relay_mode: RelayMode,

    // if set, every upstream request goes through this forward proxy
    #[clap(long, env)]
    pub upstream_proxy: Option<String>,

    #[clap(long, env, default_value = "10")]
    pub upstream_connect_timeout_secs: u64,

    // per read, not per request, so long streams are fine
    #[clap(long, env, default_value = "30")]
    pub upstream_read_timeout_secs: u64,

    #[clap(
        long,
        env,
        default_value = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
    )]
    pub upstream_user_agent: String,

    // signs relay links handed out by the media endpoint, have it be anything secure
    // like 'openssl rand -base64 32'
    #[clap(long, env)]
    pub relay_url_secret: Option<String>,

    #[clap(long, env, default_value = "3600")]
    pub relay_url_ttl_secs: i64,

    // reject relay requests without a token, only meaningful with a secret
    #[clap(long, env)]
    pub require_signed_urls: bool,

    // poster backfill is skipped without this
    #[clap(long, env)]
    pub openai_api_key: Option<String>,

    #[clap(long, env, default_value = "https://api.openai.com")]
    pub openai_base_url: String,
}

impl AppConfig {
    /// comma separated cors origins, empty when everything is allowed
    pub fn cors_origins(&self) -> Vec<String> {
        if self.cors_origin.trim() == "*" {
            return Vec::new();
        }

        self.cors_origin
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect()
    }
}

impl Default for AppConfig {
    // defaults aren't really needed here but it's here as a bad fallback and for tests
    fn default() -> Self {
        Self {
            cargo_env: CargoEnv::Development,
            port: 5000,
            cors_origin: "*".to_string(),
            sentry_dsn: None,
            catalog_origin: "http://localhost:8081".to_string(),
            media_origin: "http://localhost:8082".to_string(),
            media_base_path: "/movies/latest".to_string(),
            relay_mode: RelayMode::Streaming,
            upstream_proxy: None,
            upstream_connect_timeout_secs: 10,
            upstream_read_timeout_secs: 30,
            upstream_user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36"
                .to_string(),
            relay_url_secret: None,
            relay_url_ttl_secs: 3600,
            require_signed_urls: false,
            openai_api_key: None,
            openai_base_url: "https://api.openai.com".to_string(),
        }
    }
}
