//! Resolves a detail page into something playable.
//!
//! The document is scanned synchronously into a [`DetailScan`] first, so the parsed tree never
//! lives across an await. Only the caption based probing needs the network.

use async_trait::async_trait;
use mockall::automock;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info};
use url::Url;

use super::extractor::canonical_title;
use super::model::{
    CatalogEntry, Language, MediaKind, MediaReference, ResolvedAudioTrack, SubtitleTrack,
};
use super::urls::{is_absolute_http_url, is_placeholder_link, resolve_url, slugify, title_case_slug};

/// checks whether a candidate media url answers a tiny range request
#[automock]
#[async_trait]
pub trait MediaProber: Send + Sync {
    async fn probe(&self, url: &str) -> bool;
}

/// where media files live and how they are recognised in page markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorConfig {
    /// `scheme://host[:port]`, no trailing slash
    pub media_origin: String,
    /// directory candidates are synthesized under, e.g. `/movies/latest`
    pub media_base_path: String,
}

impl LocatorConfig {
    pub fn new(media_origin: impl Into<String>, media_base_path: impl Into<String>) -> Self {
        let media_origin = media_origin.into().trim_end_matches('/').to_string();
        let base = media_base_path.into();
        let media_base_path = format!("/{}", base.trim_matches('/'));
        Self {
            media_origin,
            media_base_path,
        }
    }

    /// `host/first-path-segment`, present in every url that points at real media
    pub fn media_marker(&self) -> String {
        let host = self
            .media_origin
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.media_origin);
        let segment = self
            .media_base_path
            .trim_start_matches('/')
            .split('/')
            .next()
            .unwrap_or_default();
        format!("{}/{}", host, segment)
    }

    /// absolute url for a media reference found on the detail page at `page_url`
    ///
    /// relative values resolve against the page, the way a browser would
    pub fn normalize(&self, raw: &str, page_url: &str) -> Option<String> {
        let trimmed = raw.trim();
        // scheme-less `host/path` values show up in player configs
        if trimmed.starts_with(&self.media_marker()) {
            return Some(format!("https://{}", trimmed));
        }
        if is_placeholder_link(trimmed) {
            return None;
        }
        if trimmed.starts_with("//") || is_absolute_http_url(trimmed) {
            return resolve_url(trimmed, &self.media_origin);
        }
        let joined = Url::parse(page_url).ok()?.join(trimmed).ok()?;
        Some(joined.to_string())
    }
}

type DocumentProbe = fn(&Html, &str) -> Option<String>;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector should parse")
}

static PLAYER_MOUNT: Lazy<Selector> = Lazy::new(|| selector("#video_html5_api"));
static VIDEO: Lazy<Selector> = Lazy::new(|| selector("video"));
static SOURCE: Lazy<Selector> = Lazy::new(|| selector("source"));
static SCRIPT: Lazy<Selector> = Lazy::new(|| selector("script"));
static TRACK: Lazy<Selector> = Lazy::new(|| selector("track[src]"));
static ANY: Lazy<Selector> = Lazy::new(|| selector("*"));

static SCRIPT_MEDIA_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    let mut patterns = vec![Regex::new(r#"https?://[^\s"']+\.mp4"#)];
    for key in ["src", "file", "source", "video", "url"] {
        patterns.push(Regex::new(&format!(
            r#"(?i){}["']?\s*[:=]\s*["']([^"']+\.mp4)["']"#,
            key
        )));
    }
    patterns
        .into_iter()
        .map(|p| p.expect("static regex should compile"))
        .collect()
});

static SCRIPT_CAPTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r#"https?://[^\s"']+\.vtt"#, r#"["']([^"']+\.vtt)["']"#]
        .iter()
        .map(|p| Regex::new(p).expect("static regex should compile"))
        .collect()
});

static LANGUAGE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)-(?:hindi|english)$").expect("static regex should compile"));

const MARKUP_PROBES: &[DocumentProbe] = &[from_player_mount, from_video_elements, from_source_elements];
const DATA_ATTRIBUTE_PROBES: &[DocumentProbe] = &[from_data_attributes];

/// everything the locator needs from the document, read in one synchronous pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DetailScan {
    pub markup_media: Option<String>,
    pub script_media: Option<String>,
    pub captions: Vec<String>,
    pub data_media: Option<String>,
    /// page heading, for callers that only know the detail url
    pub heading: Option<String>,
}

impl DetailScan {
    /// `page_url` is where `html` was fetched from, relative references resolve against it
    pub fn new(html: &str, page_url: &str, config: &LocatorConfig) -> Self {
        let document = Html::parse_document(html);
        let marker = config.media_marker();

        let first = |probes: &[DocumentProbe]| {
            probes
                .iter()
                .find_map(|probe| probe(&document, &marker))
                .and_then(|raw| config.normalize(&raw, page_url))
        };

        let scripts: Vec<String> = document
            .select(&SCRIPT)
            .map(|s| s.text().collect::<String>())
            .collect();

        Self {
            markup_media: first(MARKUP_PROBES),
            script_media: script_media(&scripts, &marker)
                .and_then(|raw| config.normalize(&raw, page_url)),
            captions: captions(&document, &scripts, &marker)
                .iter()
                .filter_map(|raw| config.normalize(raw, page_url))
                .fold(Vec::new(), |mut acc, url| {
                    if !acc.contains(&url) {
                        acc.push(url);
                    }
                    acc
                }),
            data_media: first(DATA_ATTRIBUTE_PROBES),
            heading: heading(&document),
        }
    }
}

/// finds the best playable url for `entry` on its detail page
///
/// never fails, the last resort is a `link` reference to the detail page itself
pub async fn locate(
    html: &str,
    entry: &CatalogEntry,
    prober: &dyn MediaProber,
    config: &LocatorConfig,
) -> MediaReference {
    let scan = DetailScan::new(html, &entry.detail_url, config);
    resolve(scan, entry, prober, config).await
}

/// the part of [`locate`] that runs after the document has been scanned
pub async fn resolve(
    scan: DetailScan,
    entry: &CatalogEntry,
    prober: &dyn MediaProber,
    config: &LocatorConfig,
) -> MediaReference {
    let subtitle_urls: Vec<SubtitleTrack> = scan
        .captions
        .iter()
        .map(|url| SubtitleTrack::from_url(url.clone()))
        .collect();

    let mut found = scan.markup_media.or(scan.script_media);
    if found.is_none() {
        found = probe_caption_siblings(&scan.captions, prober).await;
    }
    let found = found
        .or(scan.data_media)
        .or_else(|| {
            candidate_paths(entry)
                .into_iter()
                .next()
                .map(|file| format!("{}{}/{}", config.media_origin, config.media_base_path, file))
        });

    let (media_url, kind) = match found {
        Some(url) => (url, MediaKind::Stream),
        None => (entry.detail_url.clone(), MediaKind::Link),
    };

    info!("Located {} media for '{}'", kind_label(kind), entry.title);
    debug!("Media url for '{}': {}", entry.title, media_url);

    let audio_tracks = resolve_audio_tracks(entry, &media_url, kind);

    MediaReference {
        media_url,
        kind,
        subtitle_urls,
        audio_tracks,
    }
}

fn kind_label(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Stream => "stream",
        MediaKind::Link => "link",
    }
}

/// file names synthesized from the canonical title, most likely first
pub fn candidate_paths(entry: &CatalogEntry) -> Vec<String> {
    let slug = slugify(&canonical_title(&entry.title));
    if slug.is_empty() {
        return Vec::new();
    }
    let title_case = title_case_slug(&slug);

    let mut paths: Vec<String> = Vec::new();
    for base in [&title_case, &slug] {
        let with_year = entry.year.as_deref().map(|year| format!("{}-{}.mp4", base, year));
        for path in with_year.into_iter().chain([format!("{}.mp4", base)]) {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }
    paths
}

/// per language variant of the primary url, `<dir>/<base>-<Language>.mp4`
pub fn audio_variant(primary: &str, language: Language) -> Option<String> {
    let (dir, file) = primary.rsplit_once('/')?;
    let stem = file.strip_suffix(".mp4")?;
    let base = LANGUAGE_SUFFIX.replace(stem, "");
    if base.is_empty() {
        return None;
    }
    Some(format!("{}/{}-{}.mp4", dir, base, language.label()))
}

fn resolve_audio_tracks(
    entry: &CatalogEntry,
    media_url: &str,
    kind: MediaKind,
) -> Vec<ResolvedAudioTrack> {
    let multi = entry.audio_tracks.len() > 1 && kind == MediaKind::Stream;

    entry
        .audio_tracks
        .iter()
        .map(|track| {
            // variants are not probed, a missing upload shows up as a dead link
            let media_url = if multi {
                audio_variant(media_url, track.language).unwrap_or_else(|| media_url.to_string())
            } else {
                media_url.to_string()
            };
            ResolvedAudioTrack {
                language: track.language,
                label: track.label.clone(),
                source_url: track.source_url.clone(),
                media_url,
            }
        })
        .collect()
}

async fn probe_caption_siblings(captions: &[String], prober: &dyn MediaProber) -> Option<String> {
    for caption in captions {
        let Some(stem) = caption.strip_suffix(".vtt") else {
            continue;
        };
        let sibling = format!("{}.mp4", LANGUAGE_SUFFIX.replace(stem, ""));

        if prober.probe(&sibling).await {
            return Some(sibling);
        }
        let lower = sibling.to_lowercase();
        if lower != sibling && prober.probe(&lower).await {
            return Some(lower);
        }
        debug!("No media next to caption {}", caption);
    }
    None
}

fn accepts(value: &str, marker: &str) -> bool {
    value.contains(marker) || value.contains(".mp4")
}

fn accepted_attr(element: &scraper::ElementRef, names: &[&str], marker: &str) -> Option<String> {
    names.iter().find_map(|name| {
        element
            .value()
            .attr(name)
            .map(str::trim)
            .filter(|value| accepts(value, marker))
            .map(str::to_string)
    })
}

fn from_player_mount(document: &Html, marker: &str) -> Option<String> {
    let mount = document.select(&PLAYER_MOUNT).next()?;
    accepted_attr(&mount, &["src"], marker).or_else(|| {
        mount
            .select(&SOURCE)
            .find_map(|source| accepted_attr(&source, &["src"], marker))
    })
}

fn from_video_elements(document: &Html, marker: &str) -> Option<String> {
    document.select(&VIDEO).find_map(|video| {
        accepted_attr(&video, &["src"], marker)
            .or_else(|| {
                video
                    .select(&SOURCE)
                    .find_map(|source| accepted_attr(&source, &["src"], marker))
            })
            .or_else(|| accepted_attr(&video, &["data-src", "data-video-src"], marker))
    })
}

fn from_source_elements(document: &Html, marker: &str) -> Option<String> {
    document
        .select(&SOURCE)
        .find_map(|source| accepted_attr(&source, &["src", "data-src"], marker))
}

fn from_data_attributes(document: &Html, marker: &str) -> Option<String> {
    document
        .select(&ANY)
        .find_map(|el| accepted_attr(&el, &["data-video", "data-src", "data-url"], marker))
}

fn captured(caps: &regex::Captures) -> String {
    caps.get(1)
        .or_else(|| caps.get(0))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

fn script_media(scripts: &[String], marker: &str) -> Option<String> {
    scripts
        .iter()
        .filter(|body| body.contains(".mp4"))
        .find_map(|body| {
            SCRIPT_MEDIA_PATTERNS.iter().find_map(|pattern| {
                pattern
                    .captures_iter(body)
                    .map(|caps| captured(&caps))
                    .find(|url| url.contains(marker))
            })
        })
}

fn captions(document: &Html, scripts: &[String], marker: &str) -> Vec<String> {
    let from_tracks = document
        .select(&TRACK)
        .filter_map(|track| track.value().attr("src"))
        .filter(|src| src.ends_with(".vtt"))
        .map(str::to_string);

    let from_scripts = scripts
        .iter()
        .filter(|body| body.contains(".vtt"))
        .flat_map(|body| {
            SCRIPT_CAPTION_PATTERNS
                .iter()
                .flat_map(|pattern| {
                    pattern
                        .captures_iter(body)
                        .map(|caps| captured(&caps))
                        .collect::<Vec<_>>()
                })
                .collect::<Vec<_>>()
        })
        .filter(|url| url.contains(marker));

    from_tracks.chain(from_scripts).collect()
}

fn heading(document: &Html) -> Option<String> {
    static OG_TITLE: Lazy<Selector> = Lazy::new(|| selector("meta[property='og:title']"));
    static H1: Lazy<Selector> = Lazy::new(|| selector("h1"));
    static TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));

    document
        .select(&OG_TITLE)
        .filter_map(|meta| meta.value().attr("content"))
        .map(|content| content.trim().to_string())
        .find(|content| !content.is_empty())
        .or_else(|| {
            [&*H1, &*TITLE].into_iter().find_map(|sel| {
                document
                    .select(sel)
                    .map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string())
                    .find(|text| !text.is_empty())
            })
        })
}
