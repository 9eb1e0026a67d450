use axum::extract::{FromRequestParts, Path};
use axum::http::header::RANGE;
use axum::http::request::Parts;
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;
use url::form_urlencoded;

use crate::server::error::{Error, StrategyAttempt};

/// query keys that carry link authorization, never part of the resource path
pub const AUTH_PARAMS: &[&str] = &["token", "expires"];

/// what a relay handler needs from the inbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayRequest {
    /// always starts with `/`, never carries a query
    pub path: String,
    pub token: Option<String>,
    pub expires: Option<String>,
    pub range: Option<String>,
}

/// the parts of a request the path strategies look at
#[derive(Debug, Clone, Default)]
pub struct RequestView {
    /// decoded query pairs in request order
    pub query: Vec<(String, String)>,
    /// route wildcard, already decoded by the router
    pub wildcard: Option<String>,
    /// path and query exactly as received
    pub raw_uri: String,
}

impl RequestView {
    pub fn new(path_and_query: &str, wildcard: Option<String>) -> Self {
        let query = path_and_query
            .split_once('?')
            .map(|(_, q)| {
                form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();

        Self {
            query,
            wildcard,
            raw_uri: path_and_query.to_string(),
        }
    }

    fn values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.query
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn first(&self, key: &str) -> Option<String> {
        self.values(key).next().map(str::to_string)
    }
}

type PathStrategy = fn(&RequestView) -> Option<String>;

const STRATEGIES: &[(&str, PathStrategy)] = &[
    ("query_parameter", from_query_parameter),
    ("path_segments", from_path_segments),
    ("url_pattern", from_url_pattern),
    ("first_query_value", from_first_query_value),
];

type Decoder = fn(&str) -> String;

// path captures are percent-decoded, query captures are form-decoded
static URL_PATTERNS: Lazy<Vec<(Regex, Decoder)>> = Lazy::new(|| {
    [
        (r"/api/video(/[^?]+)", decode_path as Decoder),
        (r"/video(/[^?]+)", decode_path),
        (r"/api/video-proxy[?&](?:path|video)=([^&]+)", decode_form),
    ]
    .into_iter()
    .map(|(p, decoder)| (Regex::new(p).expect("static regex should compile"), decoder))
    .collect()
});

/// runs every strategy in order, the first one that yields a path wins
///
/// # Errors
/// every attempt and its result when none of them produced anything
pub fn resolve_path(view: &RequestView) -> Result<String, Vec<StrategyAttempt>> {
    let mut attempts = Vec::with_capacity(STRATEGIES.len());

    for &(name, strategy) in STRATEGIES {
        let result = match strategy(view) {
            Some(raw) => match normalize_path(&raw) {
                Some(path) => {
                    debug!("Resolved relay path {} via {}", path, name);
                    return Ok(path);
                }
                None => format!("empty path from {:?}", raw),
            },
            None => "no value".to_string(),
        };
        attempts.push(StrategyAttempt {
            strategy: name,
            result,
        });
    }

    Err(attempts)
}

/// makes sure the decoded path is rooted, `None` for an empty path
///
/// `?` and `#` are file name characters here, the upstream url re-encodes them
pub fn normalize_path(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_start_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    Some(format!("/{}", trimmed))
}

fn decode_path(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

fn decode_form(raw: &str) -> String {
    decode_path(&raw.replace('+', " "))
}

fn from_query_parameter(view: &RequestView) -> Option<String> {
    ["path", "video"].iter().find_map(|key| {
        let values: Vec<&str> = view.values(key).collect();
        match values.as_slice() {
            [single] if !single.is_empty() => Some(single.to_string()),
            _ => None,
        }
    })
}

fn from_path_segments(view: &RequestView) -> Option<String> {
    if let Some(wildcard) = view.wildcard.as_deref().filter(|w| !w.is_empty()) {
        return Some(wildcard.to_string());
    }

    let segments: Vec<&str> = view.values("path").filter(|v| !v.is_empty()).collect();
    if segments.len() > 1 {
        return Some(segments.join("/"));
    }
    None
}

fn from_url_pattern(view: &RequestView) -> Option<String> {
    URL_PATTERNS.iter().find_map(|(pattern, decode)| {
        pattern
            .captures(&view.raw_uri)
            .and_then(|caps| caps.get(1))
            .map(|m| decode(m.as_str()))
    })
}

fn from_first_query_value(view: &RequestView) -> Option<String> {
    view.query
        .iter()
        .find(|(k, v)| !AUTH_PARAMS.contains(&k.as_str()) && !v.is_empty())
        .map(|(_, v)| v.clone())
}

impl<S> FromRequestParts<S> for RelayRequest
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // routes without a wildcard simply have no path params
        let wildcard = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .ok()
            .and_then(|Path(params)| params.get("path").cloned());

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| parts.uri.path());

        let view = RequestView::new(path_and_query, wildcard);

        let path = resolve_path(&view).map_err(|attempts| {
            debug!("No relay path in {}", view.raw_uri);
            counter!("relay_requests_total", "outcome" => "malformed").increment(1);
            Error::MalformedRequest(attempts)
        })?;

        let range = parts
            .headers
            .get(RANGE)
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string());

        Ok(RelayRequest {
            path,
            token: view.first("token"),
            expires: view.first("expires"),
            range,
        })
    }
}
